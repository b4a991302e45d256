use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use std::sync::Arc;

use chess_relay_core::{AnalyzeRequest, AnalyzeResult, Transport};

use crate::error::ApiError;
use crate::AppState;

pub async fn analyze<T: Transport>(
    State(state): State<Arc<AppState<T>>>,
    body: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<AnalyzeResult>, ApiError> {
    let Json(request) = body.map_err(|e| {
        tracing::debug!("Rejected analyze body: {e}");
        ApiError::BadRequest("invalid json".to_string())
    })?;

    let result = state.analyzer.analyze_request(&request, state.policy).await?;
    Ok(Json(result))
}

#[cfg(test)]
mod tests {
    use super::super::tests::{app, body_json};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use chess_relay_core::transport::scripted::{EngineScript, ScriptedTransport};
    use chess_relay_core::RequestPolicy;
    use serde_json::json;
    use tower::ServiceExt;

    const SEARCH: &str = "info depth 12 seldepth 15 score cp 31 nodes 50211 nps 501000 pv e7e5 g1f3\nbestmove e7e5 ponder g1f3\n";

    fn post(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/v1/analyze")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_analyze_uci_moves() {
        let app = app(ScriptedTransport::new(EngineScript::answering(SEARCH)), RequestPolicy::Strict);
        let response = app.oneshot(post(r#"{"uci":"e2e4"}"#)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["bestMoveUci"], "e7e5");
        assert_eq!(body["bestMoveSan"], "e5");
        assert_eq!(body["evaluationCp"], -31);
        assert_eq!(body["depth"], 12);
        assert_eq!(body["pv"], json!(["e7e5", "g1f3"]));
        assert_eq!(
            body["positionFen"],
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1"
        );
        assert!(body.get("raw").is_none());
    }

    #[tokio::test]
    async fn test_empty_body_is_bad_request() {
        let app = app(ScriptedTransport::new(EngineScript::answering(SEARCH)), RequestPolicy::Strict);
        let response = app.oneshot(post(r#"{}"#)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({ "error": "fen, pgn, uci or san required" })
        );
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let app = app(ScriptedTransport::new(EngineScript::answering(SEARCH)), RequestPolicy::Strict);
        let response = app.oneshot(post("{not json")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await, json!({ "error": "invalid json" }));
    }

    #[tokio::test]
    async fn test_strict_policy_rejects_two_fields() {
        let transport = ScriptedTransport::new(EngineScript::answering(SEARCH));
        let app = app(transport.clone(), RequestPolicy::Strict);
        let response = app
            .oneshot(post(r#"{"san":"e4","uci":"e2e4"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(transport.spawns(), 0);
    }

    #[tokio::test]
    async fn test_illegal_move_is_bad_request() {
        let app = app(ScriptedTransport::new(EngineScript::answering(SEARCH)), RequestPolicy::Strict);
        let response = app.oneshot(post(r#"{"san":"e4 e4"}"#)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().starts_with("invalid move"));
    }

    #[tokio::test]
    async fn test_engine_failure_is_bad_gateway() {
        let app = app(ScriptedTransport::failing_start(), RequestPolicy::Strict);
        let response = app.oneshot(post(r#"{"fen":"8/8/4k3/8/8/3K4/8/8 w - - 0 1"}"#)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().starts_with("failed to start engine"));
    }
}
