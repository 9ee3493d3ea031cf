//! End-to-end routing through the realtime engine, without sockets.

use chrono::Utc;
use serde_json::{Value, json};
use tokio::sync::mpsc;

use roadhelp_core::config::RealtimeConfig;
use roadhelp_core::model::Identity;
use roadhelp_realtime::RealtimeEngine;
use roadhelp_realtime::connection::ConnectionId;

struct Client {
    conn_id: ConnectionId,
    rx: mpsc::Receiver<String>,
}

impl Client {
    fn connect(engine: &RealtimeEngine, id: &str, name: &str) -> Self {
        let (handle, rx) = engine.connections.register(Identity::new(id, name));
        Self {
            conn_id: handle.id,
            rx,
        }
    }

    async fn send(&self, engine: &RealtimeEngine, frame: Value) {
        engine
            .connections
            .handle_inbound(&self.conn_id, &frame.to_string())
            .await;
    }

    fn drain(&mut self) -> Vec<Value> {
        let mut frames = Vec::new();
        while let Ok(raw) = self.rx.try_recv() {
            frames.push(serde_json::from_str(&raw).expect("frame is json"));
        }
        frames
    }
}

fn accept_frame(request_id: &str, helper_id: &str, helper_name: &str) -> Value {
    json!({
        "event": "accept-help",
        "data": {
            "requestId": request_id,
            "helperId": helper_id,
            "helperName": helper_name,
            "location": { "latitude": 10.0, "longitude": 10.02 },
            "acceptedAt": Utc::now(),
            "issue": "battery dead"
        }
    })
}

#[tokio::test]
async fn test_help_request_reaches_everyone_but_the_requester() {
    let engine = RealtimeEngine::new(RealtimeConfig::default());
    let mut requester = Client::connect(&engine, "u1", "Asha");
    let mut helper = Client::connect(&engine, "h1", "Ravi");

    requester
        .send(
            &engine,
            json!({ "event": "send-help-request", "data": { "helpRequestId": "r1" } }),
        )
        .await;

    assert!(requester.drain().is_empty());
    let frames = helper.drain();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0]["event"], "help-requested");
    assert_eq!(frames[0]["data"]["helpRequestId"], "r1");
    assert_eq!(frames[0]["data"]["requesterId"], "u1");
    assert_eq!(engine.metrics.snapshot().requests_announced, 1);
}

#[tokio::test]
async fn test_acceptance_is_broadcast_with_authoritative_requester() {
    let engine = RealtimeEngine::new(RealtimeConfig::default());
    let mut requester = Client::connect(&engine, "u1", "Asha");
    let mut helper = Client::connect(&engine, "h1", "Ravi");
    let mut bystander = Client::connect(&engine, "u2", "Kofi");

    requester
        .send(
            &engine,
            json!({ "event": "send-help-request", "data": { "helpRequestId": "r1" } }),
        )
        .await;
    helper.drain();
    bystander.drain();

    helper.send(&engine, accept_frame("r1", "h1", "Ravi")).await;

    for client in [&mut requester, &mut helper, &mut bystander] {
        let frames = client.drain();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["event"], "help-accepted");
        assert_eq!(frames[0]["data"]["requestId"], "r1");
        assert_eq!(frames[0]["data"]["requesterId"], "u1");
        assert_eq!(frames[0]["data"]["helperName"], "Ravi");
    }
}

#[tokio::test]
async fn test_second_helper_is_rejected() {
    let engine = RealtimeEngine::new(RealtimeConfig::default());
    let requester = Client::connect(&engine, "u1", "Asha");
    let mut first = Client::connect(&engine, "h1", "Ravi");
    let mut second = Client::connect(&engine, "h2", "Lena");

    requester
        .send(
            &engine,
            json!({ "event": "send-help-request", "data": { "helpRequestId": "r1" } }),
        )
        .await;
    first.send(&engine, accept_frame("r1", "h1", "Ravi")).await;
    first.drain();
    second.drain();

    second.send(&engine, accept_frame("r1", "h2", "Lena")).await;

    let frames = second.drain();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0]["event"], "error");
    assert_eq!(frames[0]["data"]["code"], "ALREADY_ACCEPTED");
    assert!(first.drain().is_empty());

    let snapshot = engine.metrics.snapshot();
    assert_eq!(snapshot.acceptances_recorded, 1);
    assert_eq!(snapshot.acceptances_rejected, 1);
}

#[tokio::test]
async fn test_winner_resending_gets_the_recorded_acceptance() {
    let engine = RealtimeEngine::new(RealtimeConfig::default());
    let requester = Client::connect(&engine, "u1", "Asha");
    let mut helper = Client::connect(&engine, "h1", "Ravi");

    requester
        .send(
            &engine,
            json!({ "event": "send-help-request", "data": { "helpRequestId": "r1" } }),
        )
        .await;
    helper.send(&engine, accept_frame("r1", "h1", "Ravi")).await;
    let first_frame = helper.drain().pop().expect("acceptance");

    helper.send(&engine, accept_frame("r1", "h1", "Ravi")).await;

    let frames = helper.drain();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0]["event"], "help-accepted");
    assert_eq!(frames[0]["data"]["acceptedAt"], first_frame["data"]["acceptedAt"]);
}

#[tokio::test]
async fn test_scoped_acceptance_skips_bystanders() {
    let config = RealtimeConfig {
        scope_acceptances: true,
        ..RealtimeConfig::default()
    };
    let engine = RealtimeEngine::new(config);
    let mut requester = Client::connect(&engine, "u1", "Asha");
    let mut helper = Client::connect(&engine, "h1", "Ravi");
    let mut bystander = Client::connect(&engine, "u2", "Kofi");

    requester
        .send(
            &engine,
            json!({ "event": "send-help-request", "data": { "helpRequestId": "r1" } }),
        )
        .await;
    bystander.drain();
    helper.drain();

    helper.send(&engine, accept_frame("r1", "h1", "Ravi")).await;

    assert_eq!(requester.drain().len(), 1);
    assert_eq!(helper.drain().len(), 1);
    assert!(bystander.drain().is_empty());
}

#[tokio::test]
async fn test_claim_for_someone_else_is_invalid() {
    let engine = RealtimeEngine::new(RealtimeConfig::default());
    let requester = Client::connect(&engine, "u1", "Asha");
    let mut impostor = Client::connect(&engine, "h9", "Mallory");

    requester
        .send(
            &engine,
            json!({ "event": "send-help-request", "data": { "helpRequestId": "r1" } }),
        )
        .await;
    impostor.drain();

    impostor.send(&engine, accept_frame("r1", "h1", "Ravi")).await;

    let frames = impostor.drain();
    assert_eq!(frames[0]["data"]["code"], "INVALID_ACCEPTANCE");
    assert!(engine.coordinator.acceptance_for(&"r1".into()).is_none());
}

#[tokio::test]
async fn test_unannounced_request_without_requester_is_unknown() {
    let engine = RealtimeEngine::new(RealtimeConfig::default());
    let mut helper = Client::connect(&engine, "h1", "Ravi");

    helper.send(&engine, accept_frame("r404", "h1", "Ravi")).await;

    let frames = helper.drain();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0]["data"]["code"], "UNKNOWN_REQUEST");
}

#[tokio::test]
async fn test_garbage_frame_gets_error() {
    let engine = RealtimeEngine::new(RealtimeConfig::default());
    let mut client = Client::connect(&engine, "u1", "Asha");

    engine
        .connections
        .handle_inbound(&client.conn_id, "{not json")
        .await;

    let frames = client.drain();
    assert_eq!(frames[0]["event"], "error");
    assert_eq!(frames[0]["data"]["code"], "INVALID_MESSAGE");
}

#[tokio::test]
async fn test_shutdown_drops_connections() {
    let engine = RealtimeEngine::new(RealtimeConfig::default());
    let _a = Client::connect(&engine, "u1", "Asha");
    let _b = Client::connect(&engine, "u2", "Kofi");
    let mut shutdown = engine.shutdown_receiver();

    engine.shutdown();

    assert!(shutdown.recv().await.is_ok());
    assert_eq!(engine.connections.connection_count(), 0);
}

#[tokio::test]
async fn test_connection_infos_lists_live_connections() {
    let engine = RealtimeEngine::new(RealtimeConfig::default());
    let first = Client::connect(&engine, "u1", "Asha");
    let _second = Client::connect(&engine, "h1", "Ravi");

    engine.connections.unregister(&first.conn_id);

    let infos = engine.connections.connection_infos().await;
    assert_eq!(infos.len(), 1);
    assert_eq!(infos[0].display_name, "Ravi");
    assert!(infos[0].alive);
}

#[tokio::test]
async fn test_replaced_connection_is_signalled_closed() {
    let engine = RealtimeEngine::new(RealtimeConfig {
        max_connections_per_user: 1,
        ..RealtimeConfig::default()
    });
    let (oldest, _oldest_rx) = engine.connections.register(Identity::new("u1", "Asha"));
    let (newest, _newest_rx) = engine.connections.register(Identity::new("u1", "Asha"));

    tokio::time::timeout(std::time::Duration::from_secs(1), oldest.closed())
        .await
        .expect("replaced connection closed");
    assert!(newest.is_alive());
    let live: Vec<ConnectionId> = engine
        .connections
        .connection_infos()
        .await
        .iter()
        .map(|info| info.id)
        .collect();
    assert_eq!(live, vec![newest.id]);
}
