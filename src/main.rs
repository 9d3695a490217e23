use std::path::PathBuf;

use anyhow::{bail, Result};
use chrono::Utc;
use clap::{Parser, ValueEnum};
use serde::Serialize;

use track_follow_rs::camera::{FollowMode, HeadlessMapView, MapView};
use track_follow_rs::frame_loop::{FrameControl, FrameLoop};
use track_follow_rs::geo_math::{destination, haversine_distance};
use track_follow_rs::quality::QualityTier;
use track_follow_rs::{FollowConfig, GeoPoint, PlaybackEvent, PlaybackSession, TrackRecord};

#[derive(Parser, Debug)]
#[command(name = "track_follow")]
#[command(about = "Plays a synthetic track with a follow camera against a headless map view", long_about = None)]
struct Args {
    /// JSON config file (missing fields keep their defaults)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override frame rate
    #[arg(long)]
    fps: Option<f64>,

    /// Playback speed multiplier
    #[arg(long, default_value = "4.0")]
    speed: f64,

    /// Number of synthetic track points
    #[arg(long, default_value = "60")]
    points: usize,

    /// Seconds between synthetic points
    #[arg(long, default_value = "1.0")]
    interval_secs: f64,

    /// Lock the camera onto the vehicle
    #[arg(long)]
    lock_camera: bool,

    /// Camera follow mode
    #[arg(long, value_enum, default_value = "eased")]
    mode: Mode,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    Eased,
    Immediate,
}

impl From<Mode> for FollowMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Eased => FollowMode::Eased,
            Mode::Immediate => FollowMode::Immediate,
        }
    }
}

#[derive(Serialize)]
struct Summary {
    frames: u64,
    poses: usize,
    camera_moves: usize,
    quality_changes: Vec<(QualityTier, QualityTier)>,
    final_tier: QualityTier,
    track_length_m: f64,
    final_position: Option<GeoPoint>,
    final_camera_center: GeoPoint,
    wall_secs: f64,
}

/// Gently curving drive starting in Tucson, ~12 m/s.
fn synthetic_track(points: usize, interval_secs: f64) -> Vec<TrackRecord> {
    let mut records = Vec::with_capacity(points);
    let mut pos = GeoPoint::new(-110.9747, 32.2226);
    let mut bearing: f64 = 30.0;
    let step_ms = (interval_secs * 1000.0).round() as i64;
    for i in 0..points {
        records.push(TrackRecord::new(pos.lng, pos.lat, i as i64 * step_ms));
        bearing += 3.0 * (i as f64 / 10.0).sin();
        pos = destination(&pos, bearing, 12.0 * interval_secs);
    }
    records
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => FollowConfig::from_json_file(path)?,
        None => FollowConfig::default(),
    };
    if let Some(fps) = args.fps {
        config.frame.target_fps = fps;
    }
    if args.points < 2 {
        bail!("need at least 2 track points, got {}", args.points);
    }

    println!("[{}] Track Follow Starting", ts_now());
    println!("  Points: {} every {:.1}s", args.points, args.interval_secs);
    println!("  Speed: {}x", args.speed);
    println!("  Frame rate: {} fps", config.frame.target_fps);
    println!("  Camera: {}", if args.lock_camera { "locked" } else { "free" });

    let records = synthetic_track(args.points, args.interval_secs);
    let track_length_m: f64 = records
        .windows(2)
        .map(|w| {
            haversine_distance(
                &GeoPoint::new(w[0].lng, w[0].lat),
                &GeoPoint::new(w[1].lng, w[1].lat),
            )
        })
        .sum();

    let frame_loop = FrameLoop::new(&config.frame)?;
    let mut session = PlaybackSession::new(config);
    session.load_records(&records)?;
    session.set_speed(args.speed)?;
    session.set_follow_mode(args.mode.into());

    let start = &records[0];
    let mut view = HeadlessMapView::new(GeoPoint::new(start.lng, start.lat), Some(16.0));
    if args.lock_camera {
        session.engage_camera(&view)?;
    }
    session.play();

    let started = Utc::now();
    let mut poses = 0usize;
    let mut camera_moves = 0usize;
    let mut quality_changes = Vec::new();
    let mut failure = None;

    let frames = frame_loop
        .run(|now_ms| {
            let events = match session.on_frame(now_ms, &mut view) {
                Ok(events) => events,
                Err(e) => {
                    failure = Some(e);
                    return FrameControl::Stop;
                }
            };
            let mut finished = false;
            for event in events {
                match event {
                    PlaybackEvent::PoseUpdated(_) => poses += 1,
                    PlaybackEvent::CameraMoved(_) => camera_moves += 1,
                    PlaybackEvent::QualityChanged(change) => {
                        println!(
                            "[{}] Quality {:?} -> {:?} ({:.1}ms avg)",
                            ts_now(),
                            change.from,
                            change.to,
                            change.average_frame_ms
                        );
                        quality_changes.push((change.from, change.to));
                    }
                    PlaybackEvent::PlaybackFinished(pose) => {
                        println!(
                            "[{}] Finished at ({:.6}, {:.6}) bearing {:.1}",
                            ts_now(),
                            pose.position.lng,
                            pose.position.lat,
                            pose.bearing
                        );
                        finished = true;
                    }
                }
            }
            if finished {
                FrameControl::Stop
            } else {
                FrameControl::Continue
            }
        })
        .await;

    if let Some(e) = failure {
        return Err(e.into());
    }

    let summary = Summary {
        frames,
        poses,
        camera_moves,
        quality_changes,
        final_tier: session.tier(),
        track_length_m,
        final_position: session.last_pose().map(|p| p.position),
        final_camera_center: view.center(),
        wall_secs: Utc::now().signed_duration_since(started).num_milliseconds() as f64 / 1000.0,
    };

    println!("\n=== Final Stats ===");
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}

fn ts_now() -> String {
    Utc::now().format("%H:%M:%S").to_string()
}
