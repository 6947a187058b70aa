// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Simulated Instrument Controller

Runs a benchlink controller with a simulated acquisition front-end: a signal
generator pair feeding two oscilloscope channels. Connect any WebSocket
client to watch parameter/signal sync in action.

Usage:
  cargo run --bin sim_controller [config_path]

Example:
  cargo run --bin sim_controller benchlink_configuration.toml
  BENCHLINK_SERVER_PORT=9100 cargo run --bin sim_controller

Copyright 2025 Neuraville Inc.
Licensed under the Apache License, Version 2.0
*/

use std::env;
use std::f64::consts::TAU;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use benchlink::prelude::*;
use benchlink::observability::{init_logging, parse_debug_flags};
use benchlink::state::ParameterStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let config = match args.get(1) {
        Some(path) => load_config(Some(Path::new(path)), None)?,
        None => load_config(None, None).unwrap_or_default(),
    };

    let debug_flags = parse_debug_flags();
    let _guard = init_logging(&debug_flags, &config.system.log_level)?;

    println!("🔬 benchlink Simulated Controller");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("📡 Server:   ws://{}", config.server.address());
    println!("⏱  Cycle:    {} ms", config.sync.interval_ms);
    println!();

    let mut controller = Controller::new(config)?;

    let params = controller.parameters();
    register_instrument_parameters(&params)?;

    let signals = controller.signals();
    signals.register("osc_ch1")?;
    signals.register("osc_ch2")?;

    // Device-side reaction to accepted UI edits
    params.on_change(Box::new(|name, value| {
        println!("🎛  UI set {} = {:?}", name, value);
    }));

    controller.start().await?;

    // Simulated acquisition: one chunk of generator output per sampling tick
    let sampler = {
        let params = params.clone();
        let signals = signals.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(10));
            let mut phase: f64 = 0.0;
            loop {
                ticker.tick().await;

                if let Ok(ParameterValue::Bool(false)) = params.get("gen_enable") {
                    continue;
                }
                let freq = match params.get("gen_freq") {
                    Ok(ParameterValue::Float(v)) => v,
                    _ => 1000.0,
                };
                let amp = match params.get("gen_amp") {
                    Ok(ParameterValue::Float(v)) => v,
                    _ => 0.5,
                };

                // 64 samples at a nominal 6.4 kS/s after decimation
                let mut ch1 = [0.0f32; 64];
                let mut ch2 = [0.0f32; 64];
                for (i, (a, b)) in ch1.iter_mut().zip(ch2.iter_mut()).enumerate() {
                    let t = phase + i as f64 * freq * TAU / 6400.0;
                    *a = (amp * t.sin()) as f32;
                    *b = (amp * t.cos()) as f32;
                }
                phase += 64.0 * freq * TAU / 6400.0;

                let _ = signals.append("osc_ch1", &ch1);
                let _ = signals.append("osc_ch2", &ch2);
            }
        })
    };

    println!("✅ Running. Press Ctrl-C to stop.");
    tokio::signal::ctrl_c().await?;

    sampler.abort();
    controller.shutdown();
    println!("👋 Controller stopped");

    Ok(())
}

/// Registers the simulated instrument's parameter set: a signal generator
/// and an oscilloscope front-end, with the constraints the hardware would
/// impose
fn register_instrument_parameters(
    params: &Arc<ParameterStore>,
) -> Result<(), Box<dyn std::error::Error>> {
    params.register(
        "gen_freq",
        ParameterValue::Float(1000.0),
        Constraint::Range {
            min: 0.1,
            max: 62_500_000.0,
        },
    )?;
    params.register(
        "gen_amp",
        ParameterValue::Float(0.5),
        Constraint::Range { min: 0.0, max: 1.0 },
    )?;
    params.register(
        "gen_offset",
        ParameterValue::Float(0.0),
        Constraint::Range { min: -1.0, max: 1.0 },
    )?;
    params.register(
        "gen_enable",
        ParameterValue::Bool(true),
        Constraint::None,
    )?;
    params.register(
        "osc_decimation",
        ParameterValue::Int(1),
        Constraint::Enum(vec![
            ParameterValue::Int(1),
            ParameterValue::Int(8),
            ParameterValue::Int(64),
            ParameterValue::Int(1024),
            ParameterValue::Int(8192),
            ParameterValue::Int(65536),
        ]),
    )?;
    params.register(
        "osc_trg_edge",
        ParameterValue::Str("pos".to_string()),
        Constraint::Enum(vec![
            ParameterValue::Str("pos".to_string()),
            ParameterValue::Str("neg".to_string()),
        ]),
    )?;
    params.register(
        "osc_trg_level",
        ParameterValue::Float(0.0),
        Constraint::Range { min: -1.0, max: 1.0 },
    )?;
    Ok(())
}
