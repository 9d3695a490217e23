//! Pushes noisy synthetic fixes through the off-thread estimator and
//! reports how far the smoothed track strays from ground truth.

use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::Utc;
use clap::Parser;
use serde_json::json;

use track_follow_rs::config::EstimatorConfig;
use track_follow_rs::estimator::{EstimatorWorker, PositionUpdateRequest};
use track_follow_rs::geo_math::{destination, haversine_distance, shortest_bearing_delta};
use track_follow_rs::GeoPoint;

#[derive(Parser, Debug)]
struct Args {
    /// Number of fixes
    #[arg(long, default_value = "300")]
    fixes: usize,

    /// Milliseconds between fixes
    #[arg(long, default_value = "1000")]
    interval_ms: u64,

    /// Ground-truth speed (m/s)
    #[arg(long, default_value = "15.0")]
    speed: f64,

    /// Fix noise amplitude (m)
    #[arg(long, default_value = "4.0")]
    noise_m: f64,

    /// Reset the estimator halfway through (exercises generation tagging)
    #[arg(long, default_value_t = false)]
    reset_midway: bool,

    /// Watchdog timeout per response (ms)
    #[arg(long, default_value = "500")]
    timeout_ms: u64,
}

/// Deterministic jitter so runs are comparable
fn jitter(i: usize, salt: f64) -> f64 {
    ((i as f64 * 12.9898 + salt) * 78.233).sin()
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    println!("[{}] Fix replay: {} fixes, {}ms apart", ts_now(), args.fixes, args.interval_ms);

    let mut worker = EstimatorWorker::spawn(EstimatorConfig::default())?;
    let timeout = Duration::from_millis(args.timeout_ms);

    let mut truth = GeoPoint::new(-110.9747, 32.2226);
    let mut truth_bearing: f64 = 60.0;
    let dt_secs = args.interval_ms as f64 / 1000.0;

    let mut raw_err_sum = 0.0;
    let mut smooth_err_sum = 0.0;
    let mut bearing_err_sum = 0.0;
    let mut samples = 0usize;
    let mut stalls = 0usize;

    for i in 0..args.fixes {
        if args.reset_midway && i == args.fixes / 2 {
            worker.reset()?;
            println!("[{}] Estimator reset (generation {})", ts_now(), worker.generation());
        }

        let noise_bearing = jitter(i, 1.0) * 180.0 + 180.0;
        let noise_dist = jitter(i, 7.0).abs() * args.noise_m;
        let raw = destination(&truth, noise_bearing, noise_dist);
        let timestamp_ms = (i as u64 * args.interval_ms) as f64;

        worker.submit(PositionUpdateRequest::RawFix {
            position: raw,
            bearing_hint: (i == 0).then_some(truth_bearing),
            timestamp_ms,
        })?;
        let pose = loop {
            match worker.poll_timeout(timeout)? {
                Some(pose) => break pose,
                None => {
                    stalls += 1;
                    if stalls > 10 {
                        return Err(anyhow!("estimator worker stalled"));
                    }
                }
            }
        };

        // skip the seeding fix and the warm-up after it
        if i > 5 {
            raw_err_sum += haversine_distance(&raw, &truth);
            smooth_err_sum += haversine_distance(&pose.position, &truth);
            bearing_err_sum += shortest_bearing_delta(pose.bearing, truth_bearing).abs();
            samples += 1;
        }

        truth_bearing += 0.5;
        truth = destination(&truth, truth_bearing, args.speed * dt_secs);
    }

    let n = samples.max(1) as f64;
    let stats = json!({
        "fixes": args.fixes,
        "evaluated": samples,
        "mean_raw_error_m": raw_err_sum / n,
        "mean_smoothed_error_m": smooth_err_sum / n,
        "mean_bearing_error_deg": bearing_err_sum / n,
        "stale_responses_dropped": worker.stale_dropped(),
        "watchdog_timeouts": stalls,
    });

    println!("\n=== Replay Stats ===");
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

fn ts_now() -> String {
    Utc::now().format("%H:%M:%S").to_string()
}
