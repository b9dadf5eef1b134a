//! scan_photo - submit one photo to the remote recognition backend.
//!
//! Uploads the image, subscribes to the job's event channel, and follows the
//! job to its terminal state, rendering server-pushed progress along the way.
//! The recognized nutrition payload is printed to stdout as JSON.

use anyhow::{anyhow, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;

use mealscan_core::ui::Ui;
use mealscan_core::{
    HttpUploadClient, MqttChannelConfig, MqttConnector, ScanJobController, ScanStatus,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Submit a photo for remote food recognition")]
struct Args {
    /// Photo to upload (JPEG).
    photo: PathBuf,

    /// Upload endpoint.
    #[arg(long, env = "MEALSCAN_UPLOAD_URL", default_value = "http://127.0.0.1:8080/scans")]
    upload_url: String,

    /// Bearer token for the upload call.
    #[arg(long, env = "MEALSCAN_UPLOAD_TOKEN")]
    upload_token: Option<String>,

    /// MQTT broker address for the scan channel.
    #[arg(long, env = "MEALSCAN_BROKER_ADDR", default_value = "127.0.0.1:1883")]
    broker_addr: String,

    /// MQTT username for authentication.
    #[arg(long, env = "MEALSCAN_MQTT_USERNAME")]
    mqtt_username: Option<String>,

    /// MQTT password for authentication.
    #[arg(long, env = "MEALSCAN_MQTT_PASSWORD")]
    mqtt_password: Option<String>,

    /// Topic prefix for the scan namespace.
    #[arg(long, env = "MEALSCAN_TOPIC_PREFIX", default_value = "mealscan")]
    topic_prefix: String,

    /// Channel client identifier.
    #[arg(long, env = "MEALSCAN_CLIENT_ID", default_value = "scan_photo")]
    client_id: String,

    /// UI mode for stderr progress (auto|plain|pretty).
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();
    let ui = Ui::from_args(Some(args.ui.as_str()), std::io::stderr().is_terminal());

    let photo = std::fs::read(&args.photo)
        .map_err(|e| anyhow!("failed to read photo {}: {}", args.photo.display(), e))?;

    let channel_config = MqttChannelConfig {
        broker_addr: args.broker_addr.clone(),
        client_id: args.client_id.clone(),
        username: args.mqtt_username.clone(),
        password: args.mqtt_password.clone(),
        topic_prefix: args.topic_prefix.clone(),
    };
    let connector = MqttConnector::new(channel_config);
    let uploader = HttpUploadClient::new(args.upload_url.clone(), args.upload_token.clone());
    let mut controller = ScanJobController::new(connector, uploader);

    let bar = ui.percent("scanning photo");
    let result = controller.start_scan_with(&photo, |job| {
        let message = match job.status {
            ScanStatus::Connecting => "connecting".to_string(),
            ScanStatus::Uploading => "uploading photo".to_string(),
            ScanStatus::Scanning if job.progress_message.is_empty() => "scanning".to_string(),
            ScanStatus::Scanning => job.progress_message.clone(),
            ScanStatus::Completed => "completed".to_string(),
            ScanStatus::Error => job.error.clone().unwrap_or_else(|| "failed".to_string()),
            ScanStatus::Idle => String::new(),
        };
        bar.set(job.progress, &message);
    });

    match result {
        Ok(scan_result) => {
            bar.finish("scan completed");
            println!("{}", serde_json::to_string_pretty(&scan_result)?);
            Ok(())
        }
        Err(e) => {
            bar.finish("scan failed");
            Err(e)
        }
    }
}
