//! Smoke tests for the HTTP surface: routing, the trusted player-id
//! header, and error mapping. Game semantics are covered by the service
//! level tests in `game_flow.rs`.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;
use uuid::Uuid;

use wordpool_backend::config::GameConfig;
use wordpool_backend::models::Prompt;
use wordpool_backend::services::{EmbeddingBackend, StaticSimilarity};
use wordpool_backend::utils::Dictionary;
use wordpool_backend::{build_router, AppState};

async fn state() -> AppState {
    let dictionary = Dictionary::from_text(include_str!("../data/dictionary.txt"));
    let state = AppState::new(
        GameConfig::default(),
        dictionary,
        EmbeddingBackend::Static(StaticSimilarity::new(0.0)),
    );
    state
        .store
        .seed_prompts(vec![Prompt::new("pick an ideal worth defending", None)])
        .await;
    state
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_endpoint_responds() {
    let app = build_router(state().await);
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn player_creation_and_balance() {
    let app = build_router(state().await);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/player")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let created = body_json(response).await;
    assert_eq!(created["balance"], 1000);
    let player_id = created["player_id"].as_str().unwrap().to_string();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/player/balance")
                .header("x-player-id", &player_id)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let balance = body_json(response).await;
    assert_eq!(balance["balance"], 1000);
    assert_eq!(balance["outstanding_prompts"], 0);
}

#[tokio::test]
async fn missing_player_header_is_rejected() {
    let app = build_router(state().await);
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/player/balance")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["error"], "player_not_found");
}

#[tokio::test]
async fn prompt_round_flow_over_http() {
    let engine = state().await;
    let app = build_router(engine.clone());
    let player_id = engine.players.create_player().await.player_id.to_string();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/rounds/prompt")
                .header("x-player-id", &player_id)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let started = body_json(response).await;
    assert_eq!(started["cost"], 100);
    let round_id = started["round_id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/rounds/{round_id}/submit"))
                .header("x-player-id", &player_id)
                .header("content-type", "application/json")
                .body(Body::from(r#"{"phrase": "freedom"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let submitted = body_json(response).await;
    assert_eq!(submitted["phrase_normalized"], "FREEDOM");

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/rounds/available")
                .header("x-player-id", &player_id)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let availability = body_json(response).await;
    // The only waiting prompt is the player's own.
    assert_eq!(availability["prompts_waiting"], 0);
    assert_eq!(availability["can_copy"], false);
    assert_eq!(availability["copy_cost"], 100);
}

#[tokio::test]
async fn validation_errors_surface_with_reason() {
    let engine = state().await;
    let app = build_router(engine.clone());
    let player_id = engine.players.create_player().await.player_id.to_string();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/rounds/prompt")
                .header("x-player-id", &player_id)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let started = body_json(response).await;
    let round_id = started["round_id"].as_str().unwrap().to_string();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/rounds/{round_id}/submit"))
                .header("x-player-id", &player_id)
                .header("content-type", "application/json")
                .body(Body::from(r#"{"phrase": "zzxxyyzz"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "invalid_phrase");
    assert!(json["message"].as_str().unwrap().contains("dictionary"));
}

#[tokio::test]
async fn unknown_round_is_a_404() {
    let engine = state().await;
    let app = build_router(engine.clone());
    let player_id = engine.players.create_player().await.player_id.to_string();

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/rounds/{}", Uuid::new_v4()))
                .header("x-player-id", &player_id)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
