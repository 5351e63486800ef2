// Copyright (c) 2024-2026 Tether Contributors
//
// SPDX-License-Identifier: MIT
/// End-to-end tests for the session bridge over real loopback sockets.
///
/// A fake host is built from `HostContext::new`; the test plays the
/// host side (emitting events, publishing bus traffic, consuming the
/// input hook) and real HTTP/WebSocket clients play the peers.
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite, MaybeTlsStream, WebSocketStream};

use tether_bridge::{BridgeConfig, BridgeServer, EventPayload, SessionEvent, ToolCallStatus};
use tether_host::{BusMessage, ConfirmationKind, HostContext, HostEvent, ToolConfirmation};

type WsPeer = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

struct Harness {
    bridge: BridgeServer,
    host: HostContext,
    input_rx: Option<mpsc::Receiver<String>>,
}

impl Harness {
    async fn start(session_id: &str, config: BridgeConfig) -> Self {
        let (host, input_rx) = HostContext::new(session_id, config.port);
        let bridge = BridgeServer::spawn(host.clone(), config)
            .await
            .expect("bridge start")
            .expect("bridge enabled");
        Self {
            bridge,
            host,
            input_rx: Some(input_rx),
        }
    }

    fn http_base(&self) -> String {
        format!("http://{}", self.bridge.local_addr())
    }

    async fn ws_peer(&self) -> WsPeer {
        let url = format!("ws://{}/ws", self.bridge.local_addr());
        let (ws, _) = connect_async(url).await.expect("ws connect");
        // Give the upgrade task a moment to register the peer.
        tokio::time::sleep(Duration::from_millis(50)).await;
        ws
    }

    /// Echo injected input back as model content, like a live host does.
    fn spawn_echo_host(&mut self) {
        let mut input_rx = self.input_rx.take().expect("input hook already taken");
        let host = self.host.clone();
        tokio::spawn(async move {
            while let Some(text) = input_rx.recv().await {
                host.emit(HostEvent::Content { text });
            }
        });
    }
}

fn prompt_message(text: &str) -> tungstenite::Message {
    tungstenite::Message::Text(
        serde_json::json!({
            "jsonrpc": "2.0",
            "method": "message/stream",
            "params": { "message": { "content": { "text": text } } },
        })
        .to_string(),
    )
}

fn confirmation_message(tool_call_id: &str, option: &str) -> tungstenite::Message {
    tungstenite::Message::Text(
        serde_json::json!({
            "jsonrpc": "2.0",
            "method": "message/stream",
            "params": { "message": { "content": { "data": {
                "kind": "TOOL_CALL_CONFIRMATION",
                "tool_call_id": tool_call_id,
                "selected_option_id": option,
            } } } },
        })
        .to_string(),
    )
}

/// Read frames until the next canonical event, failing after a timeout.
async fn next_event(ws: &mut WsPeer) -> SessionEvent {
    let deadline = Duration::from_secs(5);
    loop {
        let msg = tokio::time::timeout(deadline, ws.next())
            .await
            .expect("timed out waiting for event")
            .expect("socket closed")
            .expect("socket error");
        match msg {
            tungstenite::Message::Binary(bytes) => {
                assert_eq!(bytes.last(), Some(&0u8), "frame must be null-terminated");
                return serde_json::from_slice(&bytes[..bytes.len() - 1]).expect("frame JSON");
            }
            tungstenite::Message::Ping(_) | tungstenite::Message::Pong(_) => continue,
            other => panic!("unexpected ws message {other:?}"),
        }
    }
}

fn content_text(event: &SessionEvent) -> Option<&str> {
    match &event.payload {
        EventPayload::TextContent { text, .. } => Some(text),
        _ => None,
    }
}

// ── Scenario 1: metadata fetch ───────────────────────────────────────────────

#[tokio::test]
async fn agent_card_describes_the_protocol() {
    let harness = Harness::start(
        "card-session",
        BridgeConfig {
            port: Some(41243),
            ..BridgeConfig::default()
        },
    )
    .await;

    let card: serde_json::Value = reqwest::get(format!(
        "{}/.well-known/agent-card.json",
        harness.http_base()
    ))
    .await
    .unwrap()
    .json()
    .await
    .unwrap();

    assert_eq!(card["protocolVersion"], "0.3.0");
    assert_eq!(card["capabilities"]["extensions"][0]["required"], true);
    assert_eq!(card["capabilities"]["streaming"], true);

    harness.bridge.stop().await;
}

// ── Scenario 2: prompt round-trip ────────────────────────────────────────────

#[tokio::test]
async fn prompt_round_trip_through_the_framed_socket() {
    let mut harness = Harness::start(
        "round-trip",
        BridgeConfig {
            port: Some(0),
            ..BridgeConfig::default()
        },
    )
    .await;

    // POST /tasks hands out the session identifier.
    let client = reqwest::Client::new();
    let response = client
        .post(format!("{}/tasks", harness.http_base()))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let task: serde_json::Value = response.json().await.unwrap();
    assert_eq!(task["id"], "round-trip");

    harness.spawn_echo_host();
    let mut ws = harness.ws_peer().await;
    ws.send(prompt_message("list files")).await.unwrap();

    // The echo host receives the text through the input hook and emits
    // it back as content; the peer must observe it stamped.
    let event = next_event(&mut ws).await;
    assert_eq!(event.task_id, "round-trip");
    assert_eq!(content_text(&event), Some("list files"));

    harness.bridge.stop().await;
}

// ── Scenario 3: confirmation first-wins ──────────────────────────────────────

#[tokio::test]
async fn first_confirmation_response_wins() {
    let harness = Harness::start(
        "confirm",
        BridgeConfig {
            port: Some(0),
            ..BridgeConfig::default()
        },
    )
    .await;
    let mut bus_rx = harness.host.bus().subscribe();

    let mut peer_a = harness.ws_peer().await;
    let mut peer_b = harness.ws_peer().await;

    harness
        .host
        .bus()
        .publish(BusMessage::ToolConfirmationRequest(ToolConfirmation {
            correlation_id: "c1".to_string(),
            tool_name: "run_shell".to_string(),
            kind: ConfirmationKind::Execute {
                command: "cargo test".to_string(),
            },
        }));

    // Both peers see the pending update with the confirmation attached.
    for ws in [&mut peer_a, &mut peer_b] {
        let event = next_event(ws).await;
        match event.payload {
            EventPayload::ToolCallUpdate(update) => {
                assert_eq!(update.status, ToolCallStatus::Pending);
                assert!(update.confirmation_request.is_some());
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    // Both answer; only the first response may reach the host bus.
    peer_a
        .send(confirmation_message("c1", "proceed_once"))
        .await
        .unwrap();

    // Wait for peer A's answer to land, then race peer B against the
    // already-resolved entry.
    let winner = loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), bus_rx.recv())
            .await
            .expect("no confirmation response reached the bus")
            .unwrap();
        if let BusMessage::ToolConfirmationResponse {
            correlation_id,
            confirmed,
        } = msg
        {
            break (correlation_id, confirmed);
        }
    };
    assert_eq!(winner, ("c1".to_string(), true));

    peer_b
        .send(confirmation_message("c1", "cancel"))
        .await
        .unwrap();

    // The late answer produces nothing further.
    while let Ok(Ok(msg)) =
        tokio::time::timeout(Duration::from_millis(300), bus_rx.recv()).await
    {
        assert!(
            !matches!(msg, BusMessage::ToolConfirmationResponse { .. }),
            "duplicate confirmation response reached the bus"
        );
    }

    harness.bridge.stop().await;
}

// ── Scenario 4: confirmation after the host already answered ─────────────────

#[tokio::test]
async fn peer_response_after_terminal_answer_is_ignored() {
    let harness = Harness::start(
        "late-confirm",
        BridgeConfig {
            port: Some(0),
            ..BridgeConfig::default()
        },
    )
    .await;
    let mut bus_rx = harness.host.bus().subscribe();

    let mut peer = harness.ws_peer().await;

    harness
        .host
        .bus()
        .publish(BusMessage::ToolConfirmationRequest(ToolConfirmation {
            correlation_id: "c1".to_string(),
            tool_name: "edit_file".to_string(),
            kind: ConfirmationKind::Other { title: None },
        }));
    let _pending = next_event(&mut peer).await;

    // The terminal dialog answers first.
    harness
        .host
        .bus()
        .publish(BusMessage::ToolConfirmationResponse {
            correlation_id: "c1".to_string(),
            confirmed: true,
        });
    tokio::time::sleep(Duration::from_millis(100)).await;

    // A late peer response must not produce a second publish.
    peer.send(confirmation_message("c1", "proceed_once"))
        .await
        .unwrap();

    let mut responses = 0;
    while let Ok(Ok(msg)) =
        tokio::time::timeout(Duration::from_millis(300), bus_rx.recv()).await
    {
        if matches!(msg, BusMessage::ToolConfirmationResponse { .. }) {
            responses += 1;
        }
    }
    // Only the terminal's own publish is on the bus.
    assert_eq!(responses, 1);

    harness.bridge.stop().await;
}

// ── Scenario 5: slow peer isolation ──────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn slow_peer_does_not_stall_fast_peer() {
    const TOTAL: usize = 10_000;
    const QUEUE: usize = 2_048;

    // Sequence number from a firehose payload like "7 xxxx...".
    fn seq(text: &str) -> usize {
        text.split(' ')
            .next()
            .and_then(|n| n.parse().ok())
            .expect("firehose payload")
    }

    let harness = Harness::start(
        "firehose",
        BridgeConfig {
            port: Some(0),
            queue_capacity: QUEUE,
            ..BridgeConfig::default()
        },
    )
    .await;

    let mut fast = harness.ws_peer().await;
    let mut slow = harness.ws_peer().await;

    // The fast peer reads concurrently with the emission.
    let fast_reader = tokio::spawn(async move {
        let mut seen = Vec::with_capacity(TOTAL);
        while seen.len() < TOTAL {
            let event = next_event(&mut fast).await;
            if let Some(text) = content_text(&event) {
                seen.push(seq(text));
            }
        }
        seen
    });

    // The slow peer does not read at all while the host emits. Frames
    // are padded so the run cannot hide inside kernel socket buffers,
    // and the firehose is paced in short bursts so the fast peer's
    // writer can drain; the host itself never suspends on a peer.
    let padding = "x".repeat(2048);
    for i in 0..TOTAL {
        harness.host.emit(HostEvent::Content {
            text: format!("{i} {padding}"),
        });
        if i % 64 == 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        } else {
            tokio::task::yield_now().await;
        }
    }

    let seen = tokio::time::timeout(Duration::from_secs(60), fast_reader)
        .await
        .expect("fast peer starved")
        .unwrap();
    assert_eq!(seen, (0..TOTAL).collect::<Vec<_>>());

    // Now drain the slow peer: it lost the oldest frames but kept
    // order, and the newest frame made it through.
    let mut slow_seen: Vec<usize> = Vec::new();
    loop {
        let msg = tokio::time::timeout(Duration::from_millis(500), slow.next()).await;
        match msg {
            Ok(Some(Ok(tungstenite::Message::Binary(bytes)))) => {
                let event: SessionEvent =
                    serde_json::from_slice(&bytes[..bytes.len() - 1]).unwrap();
                if let Some(text) = content_text(&event) {
                    slow_seen.push(seq(text));
                }
            }
            Ok(Some(Ok(_))) => continue,
            _ => break,
        }
    }
    assert!(
        slow_seen.len() < TOTAL,
        "slow peer should have dropped frames, received {}",
        slow_seen.len()
    );
    assert!(!slow_seen.is_empty());
    assert!(
        slow_seen.windows(2).all(|w| w[0] < w[1]),
        "slow peer saw events out of order"
    );
    assert_eq!(*slow_seen.last().unwrap(), TOTAL - 1);

    harness.bridge.stop().await;
}

// ── Scenario 6: fan-out consistency ──────────────────────────────────────────

#[tokio::test]
async fn all_peers_observe_the_same_ordered_stream() {
    let harness = Harness::start(
        "fanout",
        BridgeConfig {
            port: Some(0),
            ..BridgeConfig::default()
        },
    )
    .await;

    let mut peers = Vec::new();
    for _ in 0..3 {
        peers.push(harness.ws_peer().await);
    }

    harness.host.emit(HostEvent::Content { text: "a".into() });
    harness.host.emit(HostEvent::Content { text: "b".into() });
    harness.host.emit(HostEvent::ToolCallRequest {
        id: "t".into(),
        name: "read_file".into(),
        args: serde_json::json!({}),
    });
    harness.host.emit(HostEvent::Content { text: "c".into() });

    for ws in &mut peers {
        for expected in ["a", "b", "t", "c"] {
            let event = next_event(ws).await;
            assert_eq!(event.task_id, "fanout");
            match event.payload {
                EventPayload::TextContent { text, .. } => assert_eq!(text, expected),
                EventPayload::ToolCallUpdate(update) => {
                    assert_eq!(expected, "t");
                    assert_eq!(update.tool_call_id, "t");
                    assert_eq!(update.status, ToolCallStatus::Pending);
                }
                other => panic!("unexpected payload {other:?}"),
            }
        }
    }

    harness.bridge.stop().await;
}

// ── SSE transport ────────────────────────────────────────────────────────────

#[tokio::test]
async fn sse_stream_delivers_enveloped_events() {
    let mut harness = Harness::start(
        "sse-session",
        BridgeConfig {
            port: Some(0),
            ..BridgeConfig::default()
        },
    )
    .await;
    harness.spawn_echo_host();

    let client = reqwest::Client::new();
    let response = client
        .post(format!(
            "{}/tasks/sse-session/messages/stream",
            harness.http_base()
        ))
        .json(&serde_json::json!({
            "jsonrpc": "2.0",
            "method": "message/stream",
            "params": { "message": { "content": { "text": "hello sse" } } },
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    // Collect the first data frame off the stream.
    let mut stream = response.bytes_stream();
    let mut buffer = String::new();
    let envelope = loop {
        let chunk = tokio::time::timeout(Duration::from_secs(5), stream.next())
            .await
            .expect("timed out waiting for SSE frame")
            .expect("stream ended")
            .unwrap();
        buffer.push_str(&String::from_utf8_lossy(&chunk));
        if let Some(frame) = buffer.split("\n\n").next().filter(|f| buffer.contains("\n\n")) {
            let data = frame
                .lines()
                .filter_map(|line| line.strip_prefix("data: "))
                .collect::<String>();
            break serde_json::from_str::<serde_json::Value>(&data).unwrap();
        }
    };

    assert_eq!(envelope["jsonrpc"], "2.0");
    assert_eq!(envelope["id"], "sse-session");
    assert_eq!(envelope["result"]["kind"], "TEXT_CONTENT");
    assert_eq!(envelope["result"]["taskId"], "sse-session");
    assert_eq!(envelope["result"]["text"], "hello sse");

    harness.bridge.stop().await;
}

// ── HTTP error surface ───────────────────────────────────────────────────────

#[tokio::test]
async fn http_error_paths() {
    let harness = Harness::start(
        "errors",
        BridgeConfig {
            port: Some(0),
            ..BridgeConfig::default()
        },
    )
    .await;
    let client = reqwest::Client::new();
    let base = harness.http_base();

    // Unknown route → 404 JSON.
    let response = client
        .get(format!("{base}/definitely/not/a/route"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Not Found");

    // Wrong method on a known path → still 404.
    let response = client.get(format!("{base}/tasks")).send().await.unwrap();
    assert_eq!(response.status(), 404);

    // Wrong task id → 404.
    let response = client
        .post(format!("{base}/tasks/some-other-task/messages/stream"))
        .json(&serde_json::json!({ "method": "message/stream" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    // Malformed JSON body → 400, server keeps running.
    let response = client
        .post(format!("{base}/v1/message:stream"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Invalid JSON payload");

    // Still alive.
    let response = client
        .post(format!("{base}/tasks"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);

    harness.bridge.stop().await;
}

// ── Shutdown quiescence ──────────────────────────────────────────────────────

#[tokio::test]
async fn stop_closes_peers_and_silences_the_stream() {
    let harness = Harness::start(
        "quiesce",
        BridgeConfig {
            port: Some(0),
            ..BridgeConfig::default()
        },
    )
    .await;

    let mut ws = harness.ws_peer().await;
    harness.host.emit(HostEvent::Content { text: "pre".into() });
    let event = next_event(&mut ws).await;
    assert_eq!(content_text(&event), Some("pre"));

    harness.bridge.stop().await;
    assert_eq!(harness.bridge.peer_count(), 0);

    // Events emitted after stop never reach the peer; the socket ends.
    harness.host.emit(HostEvent::Content { text: "post".into() });
    loop {
        match tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("socket did not close after stop")
        {
            Some(Ok(tungstenite::Message::Binary(bytes))) => {
                let event: SessionEvent =
                    serde_json::from_slice(&bytes[..bytes.len() - 1]).unwrap();
                assert_ne!(content_text(&event), Some("post"));
            }
            Some(Ok(tungstenite::Message::Close(_))) | None => break,
            Some(Ok(_)) => continue,
            Some(Err(_)) => break,
        }
    }
}
