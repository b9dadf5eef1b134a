//! Scan job state machine properties, driven through the controller's public
//! API with scripted channels and a stub uploader.

use mealscan_core::{
    ChannelEvent, ScanJobController, ScanResult, ScanStatus, ScriptedConnector, StubUploader,
};

fn progress(progress: u8, message: &str) -> ChannelEvent {
    ChannelEvent::Progress {
        state: "analyzing".to_string(),
        progress,
        message: message.to_string(),
    }
}

fn completed(json: &str) -> ChannelEvent {
    ChannelEvent::Completed {
        result: ScanResult(serde_json::from_str(json).unwrap()),
    }
}

fn server_error(code: &str, message: &str) -> ChannelEvent {
    ChannelEvent::Error {
        code: code.to_string(),
        message: message.to_string(),
    }
}

/// Every observed status sequence must follow the forward graph: each step
/// either stays in place (progress updates) or takes a legal edge.
fn assert_forward_only(statuses: &[ScanStatus]) {
    for pair in statuses.windows(2) {
        let (from, to) = (pair[0], pair[1]);
        assert!(
            from == to || from.can_transition(to),
            "illegal observed transition {:?} -> {:?}",
            from,
            to
        );
    }
}

#[test]
fn completed_job_ends_with_full_progress_and_closed_channel() {
    let connector = ScriptedConnector::new(vec![
        progress(30, "Detecting food"),
        progress(85, "Estimating portions"),
        completed(r#"{"name":"ramen","calories":540,"quantity":1,"unit":"bowl"}"#),
    ]);
    let probe = connector.probe();
    let mut controller = ScanJobController::new(connector, StubUploader::ok("scan-abc"));

    let mut statuses = Vec::new();
    let result = controller
        .start_scan_with(b"jpeg-bytes", |job| statuses.push(job.status))
        .expect("scan succeeds");

    assert_eq!(result.get("name").unwrap(), "ramen");
    assert_eq!(controller.job().status, ScanStatus::Completed);
    assert_eq!(controller.job().progress, 100);
    assert_eq!(controller.job().progress_message, "");
    assert_eq!(controller.job().error, None);
    assert!(!controller.has_open_channel());
    assert_eq!(probe.close_count(), 1);
    assert_forward_only(&statuses);
}

#[test]
fn error_event_while_scanning_is_terminal_and_ignores_stale_progress() {
    let connector = ScriptedConnector::new(vec![
        progress(40, "Analyzing"),
        server_error("E_UNRECOGNIZED", "X"),
    ]);
    let mut controller = ScanJobController::new(connector, StubUploader::ok("scan-err"));

    let mut statuses = Vec::new();
    let err = controller
        .start_scan_with(b"jpeg-bytes", |job| statuses.push(job.status))
        .unwrap_err();

    assert_eq!(err.to_string(), "X");
    assert_eq!(controller.job().status, ScanStatus::Error);
    assert_eq!(controller.job().error.as_deref(), Some("X"));
    assert!(!controller.has_open_channel());
    assert_forward_only(&statuses);

    // A stale channel delivering more progress changes nothing.
    let progress_before = controller.job().progress;
    controller.apply_event(progress(99, "late delivery"));
    assert_eq!(controller.job().status, ScanStatus::Error);
    assert_eq!(controller.job().progress, progress_before);

    // Even a stale completed event cannot resurrect the job.
    controller.apply_event(completed(r#"{"name":"ghost"}"#));
    assert_eq!(controller.job().status, ScanStatus::Error);
    assert!(controller.job().result.is_none());
}

#[test]
fn no_event_sequence_produces_a_backward_edge() {
    // Throw deliberately out-of-order payloads at the controller; the status
    // stream must still never walk backwards.
    let connector = ScriptedConnector::new(vec![
        progress(90, "late-looking"),
        progress(10, "early-looking"),
        completed(r#"{"name":"apple"}"#),
    ]);
    let mut controller = ScanJobController::new(connector, StubUploader::ok("scan-ooo"));

    let mut statuses = Vec::new();
    controller
        .start_scan_with(b"jpeg-bytes", |job| statuses.push(job.status))
        .expect("scan succeeds");
    assert_forward_only(&statuses);
    // Progress itself may move down (arrival order is relayed as-is).
    assert_eq!(controller.job().progress, 100);
}

#[test]
fn connect_failure_never_reaches_uploading() {
    let connector = ScriptedConnector::failing("broker unreachable");
    let uploader = StubUploader::ok("scan-x");
    let mut controller = ScanJobController::new(connector, uploader);

    let mut statuses = Vec::new();
    let err = controller
        .start_scan_with(b"jpeg-bytes", |job| statuses.push(job.status))
        .unwrap_err();

    assert!(err.to_string().contains("channel connection failed"));
    assert!(!statuses.contains(&ScanStatus::Uploading));
    assert_eq!(controller.job().status, ScanStatus::Error);
    assert_eq!(controller.job().scan_id, None);
}

#[test]
fn upload_failure_closes_channel_and_sets_no_scan_id() {
    let connector = ScriptedConnector::new(vec![]);
    let probe = connector.probe();
    let mut controller = ScanJobController::new(connector, StubUploader::failing("disk full"));

    let err = controller.start_scan(b"jpeg-bytes").unwrap_err();
    assert!(err.to_string().contains("photo upload failed"));
    assert_eq!(controller.job().scan_id, None);
    assert_eq!(probe.open_count(), 1);
    assert_eq!(probe.close_count(), 1);
}

#[test]
fn restarting_tears_down_before_reopening() {
    let connector = ScriptedConnector::new(vec![completed(r#"{"name":"toast"}"#)]);
    let probe = connector.probe();
    let mut controller = ScanJobController::new(connector, StubUploader::ok("scan-r"));

    controller.start_scan(b"one").unwrap();
    controller.start_scan(b"two").unwrap();

    assert_eq!(probe.open_count(), 2);
    assert_eq!(probe.close_count(), 2);
    assert_eq!(probe.subscribed_ids(), vec!["scan-r".to_string(), "scan-r".to_string()]);
    assert!(!controller.has_open_channel());
}

#[test]
fn reset_returns_to_idle_for_a_fresh_job() {
    let connector = ScriptedConnector::new(vec![server_error("E", "nope")]);
    let mut controller = ScanJobController::new(connector, StubUploader::ok("scan-z"));

    let _ = controller.start_scan(b"jpeg-bytes");
    assert_eq!(controller.job().status, ScanStatus::Error);

    controller.reset();
    assert_eq!(controller.job().status, ScanStatus::Idle);
    assert_eq!(controller.job().scan_id, None);
    assert_eq!(controller.job().progress, 0);
    assert!(controller.job().error.is_none());
}
