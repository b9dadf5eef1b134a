use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

use crate::camera::CameraConfig;
use crate::debounce::{
    DebounceConfig, DEFAULT_CONFIRM_THRESHOLD, DEFAULT_CONSECUTIVE_FRAMES,
    DEFAULT_PRESENCE_THRESHOLD, DEFAULT_WEAK_THRESHOLD,
};
use crate::scan_job::MqttChannelConfig;

const DEFAULT_CAMERA_URL: &str = "stub://rear_camera";
const DEFAULT_CAMERA_FPS: u32 = 15;
const DEFAULT_CAMERA_WIDTH: u32 = 320;
const DEFAULT_CAMERA_HEIGHT: u32 = 240;
const DEFAULT_UPLOAD_URL: &str = "http://127.0.0.1:8080/scans";
const DEFAULT_BROKER_ADDR: &str = "127.0.0.1:1883";
const DEFAULT_CLIENT_ID: &str = "mealscan";
const DEFAULT_TOPIC_PREFIX: &str = "mealscan";

#[derive(Debug, Deserialize, Default)]
struct MealscanConfigFile {
    detection: Option<DetectionConfigFile>,
    camera: Option<CameraConfigFile>,
    upload: Option<UploadConfigFile>,
    channel: Option<ChannelConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectionConfigFile {
    weak_threshold: Option<f32>,
    presence_threshold: Option<f32>,
    confirm_threshold: Option<f32>,
    consecutive_frames: Option<u32>,
    labels_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    url: Option<String>,
    target_fps: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct UploadConfigFile {
    url: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct ChannelConfigFile {
    broker_addr: Option<String>,
    client_id: Option<String>,
    username: Option<String>,
    password: Option<String>,
    topic_prefix: Option<String>,
}

/// Runtime configuration for the scan core and its binaries.
#[derive(Debug, Clone)]
pub struct MealscanConfig {
    pub debounce: DebounceConfig,
    pub labels_path: Option<PathBuf>,
    pub camera: CameraConfig,
    pub upload_url: String,
    pub channel: MqttChannelConfig,
}

impl MealscanConfig {
    /// Load from the file named by `MEALSCAN_CONFIG` (if set), then apply
    /// `MEALSCAN_*` env overrides, then validate.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("MEALSCAN_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: MealscanConfigFile) -> Self {
        let detection = file.detection.unwrap_or_default();
        let debounce = DebounceConfig {
            weak_threshold: detection.weak_threshold.unwrap_or(DEFAULT_WEAK_THRESHOLD),
            presence_threshold: detection
                .presence_threshold
                .unwrap_or(DEFAULT_PRESENCE_THRESHOLD),
            confirm_threshold: detection
                .confirm_threshold
                .unwrap_or(DEFAULT_CONFIRM_THRESHOLD),
            consecutive_frames: detection
                .consecutive_frames
                .unwrap_or(DEFAULT_CONSECUTIVE_FRAMES),
        };
        let camera_file = file.camera.unwrap_or_default();
        let camera = CameraConfig {
            url: camera_file
                .url
                .unwrap_or_else(|| DEFAULT_CAMERA_URL.to_string()),
            target_fps: camera_file.target_fps.unwrap_or(DEFAULT_CAMERA_FPS),
            width: camera_file.width.unwrap_or(DEFAULT_CAMERA_WIDTH),
            height: camera_file.height.unwrap_or(DEFAULT_CAMERA_HEIGHT),
        };
        let upload_url = file
            .upload
            .and_then(|upload| upload.url)
            .unwrap_or_else(|| DEFAULT_UPLOAD_URL.to_string());
        let channel_file = file.channel.unwrap_or_default();
        let channel = MqttChannelConfig {
            broker_addr: channel_file
                .broker_addr
                .unwrap_or_else(|| DEFAULT_BROKER_ADDR.to_string()),
            client_id: channel_file
                .client_id
                .unwrap_or_else(|| DEFAULT_CLIENT_ID.to_string()),
            username: channel_file.username,
            password: channel_file.password,
            topic_prefix: channel_file
                .topic_prefix
                .unwrap_or_else(|| DEFAULT_TOPIC_PREFIX.to_string()),
        };
        Self {
            debounce,
            labels_path: detection.labels_path,
            camera,
            upload_url,
            channel,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var("MEALSCAN_CAMERA_URL") {
            if !url.trim().is_empty() {
                self.camera.url = url;
            }
        }
        if let Ok(url) = std::env::var("MEALSCAN_UPLOAD_URL") {
            if !url.trim().is_empty() {
                self.upload_url = url;
            }
        }
        if let Ok(addr) = std::env::var("MEALSCAN_BROKER_ADDR") {
            if !addr.trim().is_empty() {
                self.channel.broker_addr = addr;
            }
        }
        if let Ok(prefix) = std::env::var("MEALSCAN_TOPIC_PREFIX") {
            if !prefix.trim().is_empty() {
                self.channel.topic_prefix = prefix;
            }
        }
        if let Ok(path) = std::env::var("MEALSCAN_LABELS_PATH") {
            if !path.trim().is_empty() {
                self.labels_path = Some(PathBuf::from(path));
            }
        }
        if let Ok(frames) = std::env::var("MEALSCAN_CONSECUTIVE_FRAMES") {
            let frames: u32 = frames
                .parse()
                .map_err(|_| anyhow!("MEALSCAN_CONSECUTIVE_FRAMES must be an integer"))?;
            self.debounce.consecutive_frames = frames;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("weak_threshold", self.debounce.weak_threshold),
            ("presence_threshold", self.debounce.presence_threshold),
            ("confirm_threshold", self.debounce.confirm_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(anyhow!("{} must be within [0, 1], got {}", name, value));
            }
        }
        if self.debounce.weak_threshold > self.debounce.presence_threshold {
            return Err(anyhow!(
                "weak_threshold must not exceed presence_threshold"
            ));
        }
        if self.debounce.consecutive_frames == 0 {
            return Err(anyhow!("consecutive_frames must be at least 1"));
        }
        if self.camera.target_fps == 0 {
            return Err(anyhow!("camera target_fps must be at least 1"));
        }
        Url::parse(&self.upload_url)
            .map_err(|e| anyhow!("invalid upload url {}: {}", self.upload_url, e))?;
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<MealscanConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
