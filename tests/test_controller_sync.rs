// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! End-to-end controller sync tests: a real controller instance driven
//! through a WebSocket client, the way the browser UI drives it.

use std::sync::mpsc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio_tungstenite::{connect_async, tungstenite::Message};

use benchlink::prelude::*;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

fn test_config(port: u16) -> BenchlinkConfig {
    let mut config = BenchlinkConfig::default();
    config.server.host = "127.0.0.1".to_string();
    config.server.port = port;
    // Fast cycles keep the tests snappy
    config.sync.interval_ms = 10;
    config
}

async fn start_demo_controller(port: u16) -> Controller {
    let mut controller = Controller::new(test_config(port)).unwrap();

    let params = controller.parameters();
    params
        .register(
            "gain",
            ParameterValue::Float(0.5),
            Constraint::Range { min: 0.0, max: 1.0 },
        )
        .unwrap();
    params
        .register("decimation", ParameterValue::Int(1), Constraint::None)
        .unwrap();

    controller.signals().register("osc_ch1").unwrap();

    controller.start().await.unwrap();
    controller
}

/// Read text frames until one parses as JSON and satisfies the predicate
async fn next_json_matching<S>(stream: &mut S, predicate: impl Fn(&Value) -> bool) -> Value
where
    S: StreamExt<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    tokio::time::timeout(RECV_TIMEOUT, async {
        loop {
            let msg = stream
                .next()
                .await
                .expect("stream ended")
                .expect("stream error");
            if let Message::Text(text) = msg {
                let value: Value = serde_json::from_str(&text).expect("invalid JSON frame");
                if predicate(&value) {
                    return value;
                }
            }
        }
    })
    .await
    .expect("timed out waiting for frame")
}

#[tokio::test]
async fn test_initial_state_reaches_client() {
    let controller = start_demo_controller(30060).await;

    let (mut ws, _) = connect_async("ws://127.0.0.1:30060").await.unwrap();

    // Registered parameters are pending until first transmission; the first
    // non-empty cycle delivers them
    let frame = next_json_matching(&mut ws, |v| v.get("parameters").is_some()).await;
    assert_eq!(frame["parameters"]["gain"], json!(0.5));
    assert_eq!(frame["parameters"]["decimation"], json!(1));

    drop(controller);
}

#[tokio::test]
async fn test_peer_batch_partial_failure_and_callback() {
    let mut controller = Controller::new(test_config(30061)).unwrap();
    let params = controller.parameters();
    params
        .register(
            "gain",
            ParameterValue::Float(0.5),
            Constraint::Range { min: 0.0, max: 1.0 },
        )
        .unwrap();
    params
        .register("decimation", ParameterValue::Int(1), Constraint::None)
        .unwrap();
    controller.signals().register("osc_ch1").unwrap();

    let (callback_tx, callback_rx) = mpsc::channel();
    params.on_change(Box::new(move |name, value| {
        let _ = callback_tx.send((name.to_string(), value.clone()));
    }));

    controller.start().await.unwrap();

    let (mut ws, _) = connect_async("ws://127.0.0.1:30061").await.unwrap();
    // Drain the initial state frame first
    next_json_matching(&mut ws, |v| v.get("parameters").is_some()).await;

    // One invalid field among two valid ones
    let batch = json!({
        "parameters": {
            "gain": 0.25,
            "bogus": true,
            "decimation": 64
        }
    });
    ws.send(Message::Text(batch.to_string())).await.unwrap();

    // Both valid fields applied, exactly one failure reported
    let reply = next_json_matching(&mut ws, |v| v.get("rejected").is_some()).await;
    let rejected = reply["rejected"].as_object().unwrap();
    assert_eq!(rejected.len(), 1);
    assert!(rejected.contains_key("bogus"));

    assert_eq!(params.get("gain").unwrap(), ParameterValue::Float(0.25));
    assert_eq!(params.get("decimation").unwrap(), ParameterValue::Int(64));

    // Device-side callback fired once per applied field
    let mut seen: Vec<(String, ParameterValue)> = Vec::new();
    for _ in 0..2 {
        seen.push(callback_rx.recv_timeout(RECV_TIMEOUT).unwrap());
    }
    seen.sort_by(|a, b| a.0.cmp(&b.0));
    assert_eq!(
        seen,
        vec![
            ("decimation".to_string(), ParameterValue::Int(64)),
            ("gain".to_string(), ParameterValue::Float(0.25)),
        ]
    );

    // Accepted peer writes are not echoed back: no data frame carrying
    // `gain` should arrive; the next observable traffic is signal data
    controller
        .signals()
        .append("osc_ch1", &[0.125, -0.125])
        .unwrap();
    let frame = next_json_matching(&mut ws, |v| v.get("signals").is_some()).await;
    assert!(frame.get("parameters").is_none());
    assert_eq!(frame["signals"]["osc_ch1"], json!([0.125, -0.125]));

    controller.shutdown();
}

#[tokio::test]
async fn test_signal_samples_stream_in_order() {
    let controller = start_demo_controller(30062).await;
    let signals = controller.signals();

    let (mut ws, _) = connect_async("ws://127.0.0.1:30062").await.unwrap();
    next_json_matching(&mut ws, |v| v.get("parameters").is_some()).await;

    signals.append("osc_ch1", &[1.0, 2.0]).unwrap();
    signals.append("osc_ch1", &[3.0]).unwrap();

    let frame = next_json_matching(&mut ws, |v| v.get("signals").is_some()).await;
    let samples: Vec<f64> = frame["signals"]["osc_ch1"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_f64().unwrap())
        .collect();

    // One flush returns a consistent prefix in append order; anything not
    // yet flushed arrives on a later cycle
    assert!(!samples.is_empty());
    assert_eq!(
        samples,
        (1..=samples.len()).map(|v| v as f64).collect::<Vec<_>>()
    );

    drop(controller);
}

#[tokio::test]
async fn test_changes_accumulate_while_disconnected() {
    let controller = start_demo_controller(30063).await;
    let params = controller.parameters();

    {
        let (mut ws, _) = connect_async("ws://127.0.0.1:30063").await.unwrap();
        next_json_matching(&mut ws, |v| v.get("parameters").is_some()).await;
        ws.close(None).await.unwrap();
    }

    // Mutation continues while no session is active
    params.set("gain", ParameterValue::Float(0.75)).unwrap();

    // The server notices the close asynchronously; retry until the new
    // session is accepted
    let mut ws = loop {
        let (mut ws, _) = connect_async("ws://127.0.0.1:30063").await.unwrap();
        match tokio::time::timeout(Duration::from_millis(500), ws.next()).await {
            Ok(Some(Ok(Message::Close(_)))) | Ok(None) => {
                tokio::time::sleep(Duration::from_millis(50)).await;
                continue;
            }
            Ok(Some(Ok(Message::Text(text)))) => {
                let value: Value = serde_json::from_str(&text).unwrap();
                if value.get("parameters").is_some() {
                    assert_eq!(value["parameters"]["gain"], json!(0.75));
                    break ws;
                }
                continue;
            }
            _ => continue,
        }
    };

    // Channel still live for further traffic
    controller.signals().append("osc_ch1", &[9.0]).unwrap();
    next_json_matching(&mut ws, |v| v.get("signals").is_some()).await;

    drop(controller);
}

#[tokio::test]
async fn test_second_client_refused() {
    let controller = start_demo_controller(30064).await;

    let (mut first, _) = connect_async("ws://127.0.0.1:30064").await.unwrap();
    next_json_matching(&mut first, |v| v.get("parameters").is_some()).await;

    // Second connection completes the handshake, then closes immediately
    let (mut second, _) = connect_async("ws://127.0.0.1:30064").await.unwrap();
    let refused = tokio::time::timeout(RECV_TIMEOUT, async {
        loop {
            match second.next().await {
                Some(Ok(Message::Close(_))) | None => break true,
                Some(Ok(_)) => continue,
                Some(Err(_)) => break true,
            }
        }
    })
    .await
    .expect("second client was not refused");
    assert!(refused);

    // First session is unaffected
    controller.signals().append("osc_ch1", &[0.5]).unwrap();
    next_json_matching(&mut first, |v| v.get("signals").is_some()).await;

    drop(controller);
}
