//! Photo upload call.
//!
//! The upload is a plain request/response call, separate from the event
//! channel: the binary image goes up, a `scanId` comes back, and everything
//! after that arrives over the channel.

use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Uploads one captured photo and returns the backend-assigned scan id.
pub trait UploadClient {
    fn upload(&self, photo: &[u8]) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(rename = "scanId")]
    scan_id: String,
}

/// HTTP upload client.
pub struct HttpUploadClient {
    url: String,
    auth_token: Option<String>,
}

impl HttpUploadClient {
    pub fn new(url: String, auth_token: Option<String>) -> Self {
        Self { url, auth_token }
    }
}

impl UploadClient for HttpUploadClient {
    fn upload(&self, photo: &[u8]) -> Result<String> {
        let mut request = ureq::post(&self.url).set("Content-Type", "image/jpeg");
        if let Some(token) = &self.auth_token {
            request = request.set("Authorization", &format!("Bearer {}", token));
        }
        let response = request
            .send_bytes(photo)
            .map_err(|e| anyhow!("photo upload to {} failed: {}", self.url, e))?;
        let body: UploadResponse = response
            .into_json()
            .map_err(|e| anyhow!("invalid upload response: {}", e))?;
        if body.scan_id.is_empty() {
            return Err(anyhow!("upload response carried an empty scanId"));
        }
        log::info!("photo uploaded, scan id {}", body.scan_id);
        Ok(body.scan_id)
    }
}

/// Upload stub for tests: fixed outcome plus a call counter, so tests can
/// assert the controller never issues a second upload for the same job.
pub struct StubUploader {
    outcome: Result<String, String>,
    calls: AtomicUsize,
}

impl StubUploader {
    pub fn ok(scan_id: &str) -> Self {
        Self {
            outcome: Ok(scan_id.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            outcome: Err(message.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl UploadClient for StubUploader {
    fn upload(&self, _photo: &[u8]) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.outcome {
            Ok(scan_id) => Ok(scan_id.clone()),
            Err(message) => Err(anyhow!("{}", message)),
        }
    }
}
