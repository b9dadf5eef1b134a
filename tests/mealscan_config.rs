use std::sync::Mutex;

use tempfile::NamedTempFile;

use mealscan_core::MealscanConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "MEALSCAN_CONFIG",
        "MEALSCAN_CAMERA_URL",
        "MEALSCAN_UPLOAD_URL",
        "MEALSCAN_BROKER_ADDR",
        "MEALSCAN_TOPIC_PREFIX",
        "MEALSCAN_LABELS_PATH",
        "MEALSCAN_CONSECUTIVE_FRAMES",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "detection": {
            "confirm_threshold": 0.8,
            "consecutive_frames": 3
        },
        "camera": {
            "url": "stub://test_camera",
            "target_fps": 30,
            "width": 640,
            "height": 480
        },
        "upload": {
            "url": "https://api.example.com/scans"
        },
        "channel": {
            "broker_addr": "broker.example.com:1883",
            "client_id": "test-client",
            "topic_prefix": "meals"
        }
    }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");

    std::env::set_var("MEALSCAN_CONFIG", file.path());
    std::env::set_var("MEALSCAN_BROKER_ADDR", "override.example.com:8883");
    std::env::set_var("MEALSCAN_CONSECUTIVE_FRAMES", "7");

    let cfg = MealscanConfig::load().expect("load config");

    // From the file.
    assert_eq!(cfg.camera.url, "stub://test_camera");
    assert_eq!(cfg.camera.target_fps, 30);
    assert_eq!(cfg.upload_url, "https://api.example.com/scans");
    assert_eq!(cfg.channel.client_id, "test-client");
    assert_eq!(cfg.channel.topic_prefix, "meals");
    assert!((cfg.debounce.confirm_threshold - 0.8).abs() < 1e-6);

    // Env wins over the file.
    assert_eq!(cfg.channel.broker_addr, "override.example.com:8883");
    assert_eq!(cfg.debounce.consecutive_frames, 7);

    clear_env();
}

#[test]
fn defaults_apply_without_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = MealscanConfig::load().expect("load defaults");
    assert_eq!(cfg.camera.url, "stub://rear_camera");
    assert_eq!(cfg.debounce.consecutive_frames, 5);
    assert_eq!(cfg.channel.broker_addr, "127.0.0.1:1883");
    assert!(cfg.labels_path.is_none());
}

#[test]
fn rejects_out_of_range_thresholds() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{ "detection": { "confirm_threshold": 1.5 } }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");
    std::env::set_var("MEALSCAN_CONFIG", file.path());

    let err = MealscanConfig::load().unwrap_err();
    assert!(err.to_string().contains("confirm_threshold"));

    clear_env();
}

#[test]
fn rejects_zero_consecutive_frames() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("MEALSCAN_CONSECUTIVE_FRAMES", "0");
    let err = MealscanConfig::load().unwrap_err();
    assert!(err.to_string().contains("consecutive_frames"));

    clear_env();
}

#[test]
fn rejects_invalid_upload_url() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("MEALSCAN_UPLOAD_URL", "not a url");
    let err = MealscanConfig::load().unwrap_err();
    assert!(err.to_string().contains("invalid upload url"));

    clear_env();
}
