#![allow(non_snake_case)]
use std::{
    collections::HashMap,
    sync::{
        Arc,
        Mutex,
    },
};

use axum::{
    Json,
    Router,
    extract::Query,
    http::StatusCode,
    routing::{
        get,
        post,
    },
};
use bingo_client::api::{
    AdminAction,
    ApiClient,
    ApiError,
    BingoApi,
    GameId,
    GameState,
    PayoutMethod,
    UserId,
};
use serde_json::{
    Value,
    json,
};

type Captured = Arc<Mutex<Option<Value>>>;

async fn serve(router: Router) -> ApiClient {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    ApiClient::new(&format!("http://{addr}/api")).unwrap()
}

/// Route that records the posted JSON body and answers with `reply`.
fn capture(path: &str, reply: Value) -> (Router, Captured) {
    let seen: Captured = Arc::default();
    let sink = seen.clone();
    let router = Router::new().route(
        path,
        post(move |Json(body): Json<Value>| {
            let sink = sink.clone();
            let reply = reply.clone();
            async move {
                *sink.lock().unwrap() = Some(body);
                Json(reply)
            }
        }),
    );
    (router, seen)
}

fn user() -> UserId {
    UserId::new("42")
}

#[tokio::test]
async fn create_game__posts_numeric_user_id_and_reads_reply() {
    // given
    let (router, seen) = capture(
        "/api/create_game",
        json!({"game_id": "MP1", "status": "waiting", "bet_amount": 50}),
    );
    let client = serve(router).await;

    // when
    let created = client.create_game(&user(), 50).await.unwrap();

    // then
    assert_eq!(created.game_id, GameId::new("MP1"));
    assert_eq!(created.state, GameState::Waiting);
    assert_eq!(created.bet_amount, 50);
    assert_eq!(
        seen.lock().unwrap().clone(),
        Some(json!({"user_id": 42, "bet_amount": 50}))
    );
}

#[tokio::test]
async fn create_game__failure_envelope_on_400_is_a_rejection() {
    let router = Router::new().route(
        "/api/create_game",
        post(|| async {
            (
                StatusCode::BAD_REQUEST,
                Json(json!({"status": "failed", "reason": "Insufficient balance"})),
            )
        }),
    );
    let client = serve(router).await;

    let err = client.create_game(&user(), 200).await.unwrap_err();

    assert_eq!(err.rejection(), Some("Insufficient balance"));
    assert!(!err.is_network());
}

#[tokio::test]
async fn select_number__sends_pick_and_decodes_loose_card() {
    // given
    let mut card: Vec<Value> = (1..=24).map(|n| json!(n)).collect();
    card.insert(12, json!("0"));
    let (router, seen) = capture(
        "/api/select_number",
        json!({"status": "success", "card_numbers": card}),
    );
    let client = serve(router).await;

    // when
    let card = client
        .select_number(&user(), &GameId::new("MP1"), 7)
        .await
        .unwrap();

    // then
    assert_eq!(card.value(0), Some(1));
    assert_eq!(card.value(12), Some(0));
    assert_eq!(card.value(24), Some(24));
    assert_eq!(card.label(12), "★");
    assert_eq!(
        seen.lock().unwrap().clone(),
        Some(json!({"user_id": 42, "game_id": "MP1", "selected_number": 7}))
    );
}

#[tokio::test]
async fn game_status__sends_ids_as_query() {
    // given
    let router = Router::new().route(
        "/api/game_status",
        get(|Query(query): Query<HashMap<String, String>>| async move {
            let known = query.get("game_id").map(String::as_str) == Some("MP1")
                && query.get("user_id").map(String::as_str) == Some("42");
            let status = if known { "started" } else { "not_found" };
            Json(json!({
                "status": status,
                "numbers_called": ["5", 7],
                "players": [42, "43"],
                "prize_amount": 300,
            }))
        }),
    );
    let client = serve(router).await;

    // when
    let status = client
        .game_status(&user(), &GameId::new("MP1"))
        .await
        .unwrap();

    // then
    assert_eq!(status.state, GameState::Started);
    assert_eq!(status.numbers_called, vec![5, 7]);
    assert_eq!(status.players, vec![UserId::new("42"), UserId::new("43")]);
    assert_eq!(status.prize_amount, 300);
    assert!(!status.is_won());
}

#[tokio::test]
async fn game_status__non_json_gateway_error_is_unavailable() {
    let router = Router::new().route(
        "/api/game_status",
        get(|| async { (StatusCode::BAD_GATEWAY, "upstream timed out") }),
    );
    let client = serve(router).await;

    let err = client
        .game_status(&user(), &GameId::new("MP1"))
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Unavailable { .. }));
    assert!(err.is_network());
}

#[tokio::test]
async fn user_data__unknown_user_is_rejected() {
    let router = Router::new().route(
        "/api/user_data",
        get(|| async { (StatusCode::NOT_FOUND, Json(json!({"error": "User not found"}))) }),
    );
    let client = serve(router).await;

    let err = client.user_data(&user()).await.unwrap_err();

    assert_eq!(err.rejection(), Some("User not found"));
}

#[tokio::test]
async fn user_data__fractional_wallet_still_registers() {
    let router = Router::new().route(
        "/api/user_data",
        get(|| async {
            Json(json!({"username": "abebe", "wallet": 60.5, "wins": 2, "role": "user"}))
        }),
    );
    let client = serve(router).await;

    let profile = client.user_data(&user()).await.unwrap();

    assert_eq!(profile.wallet.to_string(), "60.5");
    assert_eq!(profile.wins, 2);
}

#[tokio::test]
async fn request_withdrawal__posts_method_in_lowercase() {
    // given
    let (router, seen) = capture(
        "/api/request_withdrawal",
        json!({"status": "requested", "withdraw_id": 17}),
    );
    let client = serve(router).await;

    // when
    let receipt = client
        .request_withdrawal(&user(), 150, PayoutMethod::Cbe)
        .await
        .unwrap();

    // then
    assert_eq!(receipt.withdraw_id, "17");
    assert_eq!(
        seen.lock().unwrap().clone(),
        Some(json!({"user_id": 42, "amount": 150, "method": "cbe"}))
    );
}

#[tokio::test]
async fn admin_action__kick_user_is_posted_to_admin_actions() {
    // given
    let (router, seen) = capture("/api/admin_actions", json!({"status": "kicked"}));
    let client = serve(router).await;

    // when
    let outcome = client
        .admin_action(
            &user(),
            &AdminAction::KickUser {
                target_user_id: UserId::new("99"),
            },
        )
        .await
        .unwrap();

    // then
    assert_eq!(outcome.status, "kicked");
    assert_eq!(
        seen.lock().unwrap().clone(),
        Some(json!({"user_id": 42, "action": "kick_user", "target_user_id": 99}))
    );
}

#[tokio::test]
async fn leaderboard__reads_bare_array() {
    let router = Router::new().route(
        "/api/leaderboard",
        get(|| async {
            Json(json!([
                {"username": "abebe", "score": 12},
                {"username": null, "score": 3},
            ]))
        }),
    );
    let client = serve(router).await;

    let board = client.leaderboard().await.unwrap();

    assert_eq!(board.len(), 2);
    assert_eq!(board[0].username, "abebe");
    assert_eq!(board[1].username, "Anonymous");
}

#[tokio::test]
async fn transport__closed_port_is_a_network_error() {
    // given
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let client = ApiClient::new(&format!("http://{addr}/api")).unwrap();

    // when
    let err = client.user_data(&user()).await.unwrap_err();

    // then
    assert!(matches!(err, ApiError::Transport(_)));
    assert!(err.is_network());
}
