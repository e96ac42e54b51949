use std::sync::{Arc, atomic::Ordering};

use axum::{
	Router,
	body::{self, Body},
	http::{Request, StatusCode},
};
use serde_json::Value;
use tower::util::ServiceExt;

use savor_api::{routes, state::AppState};
use savor_service::{Providers, SavorService};
use savor_testkit::{InMemoryIndex, StoredRecipe, StubEmbedding, StubSparse, test_config};

fn test_app() -> (Router, Arc<InMemoryIndex>) {
	let index = Arc::new(InMemoryIndex::new(vec![
		StoredRecipe::new("a", vec![1.0, 0.0], vec![0.0, 1.0]),
		StoredRecipe::new("b", vec![0.95, 0.31], vec![1.0, 0.0]).lexical(5.0),
		StoredRecipe::new("c", vec![0.0, 1.0], vec![0.6, 0.8]).lexical(9.0),
	]));
	let providers = Providers::new(
		Arc::new(StubEmbedding::new(vec![1.0, 0.0])),
		Arc::new(StubSparse::new(vec![7], vec![1.0])),
		index.clone(),
		index.clone(),
	);
	let service = SavorService::with_providers(test_config(2), providers);

	(routes::router(AppState::with_service(service)), index)
}

async fn call(app: &Router, method: &str, uri: &str, payload: Option<Value>) -> (StatusCode, Value) {
	let builder = Request::builder().method(method).uri(uri);
	let request = match payload {
		Some(payload) => builder
			.header("content-type", "application/json")
			.body(Body::from(payload.to_string())),
		None => builder.body(Body::empty()),
	}
	.expect("Failed to build request.");
	let response = app.clone().oneshot(request).await.expect("Failed to call the router.");
	let status = response.status();
	let body = body::to_bytes(response.into_body(), usize::MAX)
		.await
		.expect("Failed to read response body.");
	let json = if body.is_empty() {
		Value::Null
	} else {
		serde_json::from_slice(&body).expect("Failed to parse response.")
	};

	(status, json)
}

#[tokio::test]
async fn health_ok() {
	let (app, _) = test_app();
	let (status, _) = call(&app, "GET", "/health", None).await;

	assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn retrieve_returns_enriched_candidates_without_vectors() {
	let (app, _) = test_app();
	let (status, json) =
		call(&app, "POST", "/v1/retrieve", Some(serde_json::json!({ "query": "ayam" }))).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(json["query"], "ayam");
	assert_eq!(json["candidates"][0]["id"], "b");
	assert_eq!(json["candidates"][1]["id"], "a");
	assert_eq!(json["candidates"][0]["title"], "Recipe b");
	assert!(json["candidates"][0].get("final_vector").is_none());
}

#[tokio::test]
async fn blank_query_is_a_bad_request() {
	let (app, _) = test_app();
	let (status, json) =
		call(&app, "POST", "/v1/retrieve", Some(serde_json::json!({ "query": " " }))).await;

	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(json["error_code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn backend_outage_is_service_unavailable() {
	let (app, index) = test_app();

	index.fail_dense.store(true, Ordering::SeqCst);
	index.fail_sparse.store(true, Ordering::SeqCst);

	let (status, json) =
		call(&app, "POST", "/v1/sessions", Some(serde_json::json!({ "query": "ayam" }))).await;

	assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
	assert_eq!(json["error_code"], "BACKEND_UNAVAILABLE");
}

#[tokio::test]
async fn session_lifecycle() {
	let (app, _) = test_app();
	let (status, json) =
		call(&app, "POST", "/v1/sessions", Some(serde_json::json!({ "query": "ayam" }))).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(json["recommendation"]["candidate"]["id"], "a");
	assert_eq!(json["recommendation"]["repeat"], false);

	let session_id = json["session_id"].as_str().expect("Missing session id.").to_string();
	let advance = format!("/v1/sessions/{session_id}/advance");
	let (status, json) =
		call(&app, "POST", &advance, Some(serde_json::json!({ "rating": 3 }))).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(json["recommendation"]["candidate"]["id"], "b");

	let (status, json) =
		call(&app, "POST", &advance, Some(serde_json::json!({ "rating": 9 }))).await;

	assert_eq!(status, StatusCode::CONFLICT);
	assert_eq!(json["error_code"], "INVALID_STATE");

	let (status, _) =
		call(&app, "POST", &format!("/v1/sessions/{session_id}/reset"), None).await;

	assert_eq!(status, StatusCode::NO_CONTENT);

	let (status, _) = call(&app, "POST", &advance, Some(serde_json::json!({ "rating": 1 }))).await;

	assert_eq!(status, StatusCode::CONFLICT);

	let (status, json) = call(
		&app,
		"POST",
		&format!("/v1/sessions/{session_id}/start"),
		Some(serde_json::json!({ "query": "ayam", "feedback": 1 })),
	)
	.await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(json["session_id"], session_id.as_str());
	assert_eq!(json["recommendation"]["candidate"]["id"], "a");

	let (status, json) =
		call(&app, "POST", &advance, Some(serde_json::json!({ "rating": 1 }))).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(json["recommendation"]["candidate"]["id"], "b");

	let (status, _) = call(&app, "DELETE", &format!("/v1/sessions/{session_id}"), None).await;

	assert_eq!(status, StatusCode::NO_CONTENT);

	let (status, json) =
		call(&app, "POST", &advance, Some(serde_json::json!({ "rating": 1 }))).await;

	assert_eq!(status, StatusCode::NOT_FOUND);
	assert_eq!(json["error_code"], "SESSION_NOT_FOUND");
}

#[tokio::test]
async fn restarting_an_unknown_session_is_not_found() {
	let (app, _) = test_app();
	let (status, json) = call(
		&app,
		"POST",
		&format!("/v1/sessions/{}/start", uuid::Uuid::nil()),
		Some(serde_json::json!({ "query": "ayam" })),
	)
	.await;

	assert_eq!(status, StatusCode::NOT_FOUND);
	assert_eq!(json["error_code"], "SESSION_NOT_FOUND");
}
