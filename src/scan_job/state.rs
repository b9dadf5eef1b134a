//! Remote scan job state.
//!
//! `ScanStatus` moves strictly forward; the only way back is an explicit reset
//! to `Idle`. The snapshot emitted to the UI layer is plain serializable data.

use serde::{Deserialize, Serialize};

/// Lifecycle of one remote recognition job.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    Idle,
    Connecting,
    Uploading,
    Scanning,
    Completed,
    Error,
}

impl ScanStatus {
    /// True for `Completed` and `Error`: a new scan requires a reset.
    pub fn is_terminal(self) -> bool {
        matches!(self, ScanStatus::Completed | ScanStatus::Error)
    }

    /// Whether the forward graph allows `self -> to`.
    ///
    /// ```text
    /// idle -> connecting -> uploading -> scanning -> completed
    ///                \-> error   \-> error   \-> error
    /// ```
    pub fn can_transition(self, to: ScanStatus) -> bool {
        use ScanStatus::*;
        matches!(
            (self, to),
            (Idle, Connecting)
                | (Connecting, Uploading)
                | (Connecting, Error)
                | (Uploading, Scanning)
                | (Uploading, Error)
                | (Scanning, Completed)
                | (Scanning, Error)
        )
    }
}

/// Nutrition payload returned by the backend.
///
/// An open map of fields (name, calories, macros, quantity, unit, ...); the
/// core relays it untouched rather than validating it field by field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScanResult(pub serde_json::Value);

impl ScanResult {
    pub fn get(&self, field: &str) -> Option<&serde_json::Value> {
        self.0.get(field)
    }
}

/// Snapshot of one remote scan job, as emitted to the UI layer.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScanJob {
    pub scan_id: Option<String>,
    pub status: ScanStatus,
    /// 0-100.
    pub progress: u8,
    pub progress_message: String,
    pub result: Option<ScanResult>,
    pub error: Option<String>,
}

impl ScanJob {
    pub fn idle() -> Self {
        Self {
            scan_id: None,
            status: ScanStatus::Idle,
            progress: 0,
            progress_message: String::new(),
            result: None,
            error: None,
        }
    }
}

impl Default for ScanJob {
    fn default() -> Self {
        Self::idle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [ScanStatus; 6] = [
        ScanStatus::Idle,
        ScanStatus::Connecting,
        ScanStatus::Uploading,
        ScanStatus::Scanning,
        ScanStatus::Completed,
        ScanStatus::Error,
    ];

    #[test]
    fn forward_edges_allowed() {
        assert!(ScanStatus::Idle.can_transition(ScanStatus::Connecting));
        assert!(ScanStatus::Connecting.can_transition(ScanStatus::Uploading));
        assert!(ScanStatus::Uploading.can_transition(ScanStatus::Scanning));
        assert!(ScanStatus::Scanning.can_transition(ScanStatus::Completed));
        for from in [
            ScanStatus::Connecting,
            ScanStatus::Uploading,
            ScanStatus::Scanning,
        ] {
            assert!(from.can_transition(ScanStatus::Error));
        }
    }

    #[test]
    fn no_backward_or_skipping_edges() {
        // Backward edges.
        assert!(!ScanStatus::Scanning.can_transition(ScanStatus::Uploading));
        assert!(!ScanStatus::Uploading.can_transition(ScanStatus::Connecting));
        assert!(!ScanStatus::Completed.can_transition(ScanStatus::Scanning));
        // Skips.
        assert!(!ScanStatus::Idle.can_transition(ScanStatus::Uploading));
        assert!(!ScanStatus::Connecting.can_transition(ScanStatus::Scanning));
        assert!(!ScanStatus::Idle.can_transition(ScanStatus::Completed));
    }

    #[test]
    fn terminal_states_have_no_outgoing_edges() {
        for from in [ScanStatus::Completed, ScanStatus::Error] {
            assert!(from.is_terminal());
            for to in ALL {
                assert!(!from.can_transition(to));
            }
        }
    }

    #[test]
    fn result_is_relayed_opaquely() {
        let payload: serde_json::Value = serde_json::from_str(
            r#"{"name": "margherita pizza", "calories": 820, "unit": "slice", "quantity": 3}"#,
        )
        .unwrap();
        let result = ScanResult(payload.clone());
        assert_eq!(result.get("calories"), payload.get("calories"));
        assert_eq!(serde_json::to_value(&result).unwrap(), payload);
    }
}
