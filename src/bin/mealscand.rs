//! mealscand - live scan daemon
//!
//! This daemon:
//! 1. Ingests frames from the configured camera source
//! 2. Classifies each frame on a producer thread (stub backend in this build;
//!    real inference runtimes plug in behind `ClassifierBackend`)
//! 3. Debounces the label stream into catch events
//! 4. Logs catches and live status changes, auto-resetting after each catch

use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use mealscan_core::{
    CameraSource, LabelTable, LiveScanSession, LiveScanStatus, MealscanConfig, StubClassifier,
};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cfg = MealscanConfig::load()?;
    let labels = match &cfg.labels_path {
        Some(path) => LabelTable::load(path)?,
        None => LabelTable::default_food_labels(),
    };
    log::info!(
        "mealscand running. camera={} classes={} consecutive_frames={}",
        cfg.camera.url,
        labels.len(),
        cfg.debounce.consecutive_frames
    );

    let camera = CameraSource::new(cfg.camera.clone())?;
    let classifier = StubClassifier::new(labels.len());

    let mut session = LiveScanSession::new(cfg.debounce, labels);
    session.start(camera, Box::new(classifier))?;

    let running = Arc::new(AtomicBool::new(true));
    let running_flag = Arc::clone(&running);
    ctrlc::set_handler(move || {
        running_flag.store(false, Ordering::SeqCst);
    })?;

    let mut last_status = LiveScanStatus::Idle;
    let mut last_health_log = Instant::now();
    let mut catch_count = 0u64;

    while running.load(Ordering::SeqCst) {
        if let Some(catch) = session.poll(Duration::from_millis(200)) {
            catch_count += 1;
            log::info!(
                "catch #{}: {} (confidence {:.2})",
                catch_count,
                catch.label,
                catch.confidence
            );
            // A real client would hand the catch to the UI and wait for the
            // user; the daemon just resumes scanning.
            session.reset();
        }

        let update = session.update();
        if update.status != last_status {
            match (&update.label, update.confidence) {
                (Some(label), Some(confidence)) => log::info!(
                    "status {:?} label={} confidence={:.2}",
                    update.status,
                    label,
                    confidence
                ),
                _ => log::info!("status {:?}", update.status),
            }
            last_status = update.status;
        }

        if last_health_log.elapsed() >= Duration::from_secs(5) {
            log::debug!("session running={} catches={}", session.is_running(), catch_count);
            last_health_log = Instant::now();
        }
    }

    log::info!("shutting down after {} catches", catch_count);
    session.stop();
    Ok(())
}
