//! Simulate command implementation

use crate::config::{Config, PinchConfig};
use anyhow::{Context, Result};
use colored::Colorize;
use glam::{Vec2, Vec3};
use roomview_core::sim::{RecordingScene, SimAssetLoader, SimulatedPlatform};
use roomview_core::{ArSession, PlacementMode, Pose, StatusEvent};
use serde::Serialize;
use tracing::debug;

/// One status event as the user would have seen it
#[derive(Debug, Clone, Serialize)]
pub struct EventRecord {
    pub frame: u64,
    pub message: String,
    pub diagnostic: bool,
}

/// Outcome of a scripted session
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub state: String,
    pub fallback_preview: bool,
    pub frames: u64,
    pub mode: PlacementMode,
    pub placed: usize,
    pub tracked: usize,
    pub anchors_created: usize,
    pub scale: f32,
    pub yaw: f32,
    pub events: Vec<EventRecord>,
}

/// Run the scenario and print its events and summary
pub async fn simulate(config: &Config, json: bool) -> Result<()> {
    let report = run_scenario(config).await?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("failed to encode report")?
        );
        return Ok(());
    }

    for event in &report.events {
        let line = format!("[frame {:>4}] {}", event.frame, event.message);
        if event.diagnostic {
            println!("{}", line.yellow());
        } else {
            println!("{}", line);
        }
    }

    println!();
    println!("{}", "Summary".bold());
    println!("  state:    {}", report.state);
    println!("  frames:   {}", report.frames);
    println!("  mode:     {}", report.mode);
    println!(
        "  placed:   {} ({} tracked, {} anchors created)",
        report.placed, report.tracked, report.anchors_created
    );
    println!("  scale:    {:.2}", report.scale);
    println!("  yaw:      {:.3} rad", report.yaw);
    if report.fallback_preview {
        println!("{}", "AR unavailable, showing static preview".red());
    }

    Ok(())
}

/// Drive a simulated session through the configured scenario
pub async fn run_scenario(config: &Config) -> Result<SimulationReport> {
    let loader = SimAssetLoader::new([config.scenario.asset.clone()]);
    run_scenario_with(config, &loader).await
}

async fn run_scenario_with(config: &Config, loader: &SimAssetLoader) -> Result<SimulationReport> {
    let scenario = &config.scenario;
    let platform = SimulatedPlatform::new(config.simulation.clone());
    let mut session = ArSession::new(RecordingScene::new(), &config.engine);
    let mut events = Vec::new();

    if let Err(e) = session.start(&platform).await {
        debug!(error = %e, "scenario stopped before the first frame");
        record(&mut events, 0, session.drain_events());
        return Ok(report(&session, &platform, events));
    }
    if let Err(e) = session.load_template(loader, &scenario.asset).await {
        debug!(error = %e, "model failed to load, taps will not place");
    }
    record(&mut events, 0, session.drain_events());

    let surface = Pose::from_position(Vec3::from_array(scenario.surface_position));
    let drift_step = Vec3::from_array(scenario.drift_per_frame);

    for frame in 1..=scenario.frames {
        if scenario.reset_at.contains(&frame) {
            session.reset();
        }
        if scenario.tap_at.contains(&frame) {
            session.request_placement();
        }
        if let Some(touches) = scenario.pinch.as_ref().and_then(|p| touches_at(p, frame)) {
            session.on_touches(&touches);
        }

        platform.set_drift(drift_step * frame as f32);
        let mut xr_frame = platform.frame(frame as f64 * scenario.frame_interval_ms);
        if frame >= scenario.surface_from_frame {
            xr_frame = xr_frame.with_hit(surface);
        }
        session.on_frame(&xr_frame);
        record(&mut events, frame, session.drain_events());
    }

    let mut summary = report(&session, &platform, events);
    if scenario.end_session {
        session
            .end_session(&platform)
            .await
            .context("failed to end the simulated session")?;
        record(&mut summary.events, scenario.frames, session.drain_events());
        summary.state = format!("{:?}", session.state());
    }
    Ok(summary)
}

fn record(out: &mut Vec<EventRecord>, frame: u64, events: Vec<StatusEvent>) {
    out.extend(events.into_iter().map(|event| EventRecord {
        frame,
        message: event.to_string(),
        diagnostic: event.is_diagnostic(),
    }));
}

fn report(
    session: &ArSession<RecordingScene>,
    platform: &SimulatedPlatform,
    events: Vec<EventRecord>,
) -> SimulationReport {
    let entities = session.registry().list();
    SimulationReport {
        state: format!("{:?}", session.state()),
        fallback_preview: session.needs_fallback_preview(),
        frames: session.frame_index(),
        mode: session.mode(),
        placed: entities.len(),
        tracked: entities.iter().filter(|e| e.tracking.is_trackable()).count(),
        anchors_created: platform.anchor_count(),
        scale: session.gestures().target_scale(),
        yaw: session.gestures().yaw(),
        events,
    }
}

/// Touch points for `frame`: two fingers spreading linearly over the range,
/// then an empty set on the frame after to release
fn touches_at(pinch: &PinchConfig, frame: u64) -> Option<Vec<Vec2>> {
    if frame == pinch.end_frame + 1 {
        return Some(Vec::new());
    }
    if frame < pinch.start_frame || frame > pinch.end_frame {
        return None;
    }
    let span = (pinch.end_frame - pinch.start_frame).max(1) as f32;
    let t = (frame - pinch.start_frame) as f32 / span;
    let distance = pinch.from_distance + (pinch.to_distance - pinch.from_distance) * t;
    let rise = pinch.twist_px * t;
    Some(vec![Vec2::ZERO, Vec2::new(distance, rise)])
}
