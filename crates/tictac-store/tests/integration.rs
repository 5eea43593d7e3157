//! Integration tests for the `Dragonfly` snapshot store.
//!
//! These tests require a live `Dragonfly` (or Redis) instance. Run with:
//!
//! ```bash
//! docker run -d -p 6379:6379 docker.dragonflydb.io/dragonflydb/dragonfly
//! cargo test -p tictac-store -- --ignored
//! ```
//!
//! All tests are marked `#[ignore]` so they are skipped during normal
//! `cargo test` runs.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use fred::prelude::*;
use tictac_store::{DragonflyStore, SnapshotStore, StoreError};
use tictac_types::{Cell, Mark, ParticipantId, Phase, Seat, SessionId, SessionSnapshot};

/// Dragonfly connection URL for the local Docker instance.
const DRAGONFLY_URL: &str = "redis://localhost:6379";

fn sample_snapshot() -> SessionSnapshot {
    let mut snapshot = SessionSnapshot {
        phase: Phase::InProgress,
        turn: Mark::O,
        revision: 3,
        participants: vec![
            Seat {
                participant: ParticipantId::from("p1"),
                mark: Mark::X,
            },
            Seat {
                participant: ParticipantId::from("p2"),
                mark: Mark::O,
            },
        ],
        ..SessionSnapshot::default()
    };
    snapshot.board.set(1, 1, Cell::X);
    snapshot
}

async fn store() -> DragonflyStore {
    DragonflyStore::connect(DRAGONFLY_URL)
        .await
        .expect("Failed to connect to Dragonfly")
}

/// Separate raw client for inspecting and cleaning up keys.
async fn raw_client() -> Client {
    let config = Config::from_url(DRAGONFLY_URL).expect("invalid URL");
    let client = Builder::from_config(config).build().expect("build failed");
    client.init().await.expect("Failed to connect to Dragonfly");
    client
}

async fn delete(client: &Client, key: &str) {
    let _: u32 = client.del(key).await.unwrap();
}

#[tokio::test]
#[ignore = "requires live Dragonfly instance"]
async fn snapshot_roundtrip() {
    let store = store().await;
    let raw = raw_client().await;
    let session = SessionId::new("it-roundtrip");
    let snapshot = sample_snapshot();

    store.save(&session, &snapshot).await.expect("save failed");
    let loaded = store.load(&session).await.expect("load failed");
    assert_eq!(loaded, Some(snapshot));

    delete(&raw, "game_state:it-roundtrip").await;
    assert_eq!(store.load(&session).await.expect("load failed"), None);
}

#[tokio::test]
#[ignore = "requires live Dragonfly instance"]
async fn value_is_stored_under_game_state_key() {
    let store = store().await;
    let raw = raw_client().await;
    store
        .save(&SessionId::new("it-key"), &sample_snapshot())
        .await
        .unwrap();

    let value: Option<String> = raw.get("game_state:it-key").await.unwrap();
    let json: serde_json::Value = serde_json::from_str(&value.unwrap()).unwrap();
    assert_eq!(json["status"], "in_progress");
    assert_eq!(json["board"][1][1], "X");

    delete(&raw, "game_state:it-key").await;
}

#[tokio::test]
#[ignore = "requires live Dragonfly instance"]
async fn corrupt_value_is_a_serialization_error() {
    let store = store().await;
    let raw = raw_client().await;
    let _: () = raw
        .set("game_state:it-corrupt", "{not json", None, None, false)
        .await
        .unwrap();

    let result = store.load(&SessionId::new("it-corrupt")).await;
    assert!(matches!(result, Err(StoreError::Serialization(_))));

    delete(&raw, "game_state:it-corrupt").await;
}

#[tokio::test]
async fn invalid_url_is_a_config_error() {
    let result = DragonflyStore::connect("not a url").await;
    assert!(matches!(result, Err(StoreError::Config(_))));
}
