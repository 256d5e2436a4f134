mod common;

use std::sync::Arc;
use std::time::Duration;

use aula::error::AppError;
use aula::models::{AssignStatus, Capabilities, PluginKind, SubmissionPlugin, SubmissionStatus};
use aula::services::{StatusReconciler, TokioSleeper};
use common::{RecordingSleeper, ScriptedApi, session, text_status, transient};

fn reconciler(api: Arc<ScriptedApi>, sleeper: Arc<RecordingSleeper>) -> StatusReconciler {
    StatusReconciler::new(api).with_sleeper(sleeper)
}

fn file_status() -> AssignStatus {
    AssignStatus {
        status: SubmissionStatus::Pending,
        plugins: vec![SubmissionPlugin {
            kind: PluginKind::File,
            saved_text: None,
            saved_files: Vec::new(),
        }],
    }
}

#[tokio::test]
async fn submitted_text_assignment_resolves_on_first_attempt() {
    let api = Arc::new(ScriptedApi::with_statuses(vec![Ok(text_status(
        "<p>Hi</p>",
        SubmissionStatus::Submitted,
    ))]));
    let sleeper = Arc::new(RecordingSleeper::default());

    let report = reconciler(api.clone(), sleeper.clone())
        .reconcile(&session(), 42)
        .await
        .expect("reconcile failed");

    assert_eq!(report.capabilities, Capabilities::TEXT);
    assert_eq!(report.last_text, "<p>Hi</p>");
    assert_eq!(report.status, SubmissionStatus::Submitted);
    assert_eq!(api.status_calls(), 1);
    assert!(sleeper.delays.lock().unwrap().is_empty());
}

#[tokio::test]
async fn transient_errors_are_retried_with_fixed_delay() {
    let api = Arc::new(ScriptedApi::with_statuses(vec![
        Err(transient()),
        Err(transient()),
        Ok(file_status()),
    ]));
    let sleeper = Arc::new(RecordingSleeper::default());

    let report = reconciler(api.clone(), sleeper.clone())
        .reconcile(&session(), 42)
        .await
        .unwrap();

    assert_eq!(report.capabilities, Capabilities::FILE);
    assert_eq!(api.status_calls(), 3);
    assert_eq!(
        *sleeper.delays.lock().unwrap(),
        vec![Duration::from_millis(700), Duration::from_millis(700)]
    );
}

#[tokio::test]
async fn exhausted_transient_errors_report_no_capabilities() {
    let api = Arc::new(ScriptedApi::with_statuses(vec![
        Err(transient()),
        Err(transient()),
        Err(transient()),
        Ok(file_status()),
    ]));
    let sleeper = Arc::new(RecordingSleeper::default());

    let report = reconciler(api.clone(), sleeper.clone())
        .reconcile(&session(), 42)
        .await
        .expect("transient failures must not surface");

    assert!(report.capabilities.is_empty());
    assert_eq!(report.status, SubmissionStatus::Pending);
    assert_eq!(api.status_calls(), 3);
    // no sleep after the last attempt
    assert_eq!(sleeper.delays.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn non_transient_error_stops_immediately() {
    let api = Arc::new(ScriptedApi::with_statuses(vec![
        Err(AppError::Auth("Token inválido".to_string())),
        Ok(file_status()),
    ]));
    let sleeper = Arc::new(RecordingSleeper::default());

    let err = reconciler(api.clone(), sleeper.clone())
        .reconcile(&session(), 42)
        .await
        .unwrap_err();

    assert!(err.is_auth());
    assert_eq!(api.status_calls(), 1);
    assert!(sleeper.delays.lock().unwrap().is_empty());
}

#[tokio::test]
async fn non_transient_error_after_a_transient_one_still_stops() {
    let api = Arc::new(ScriptedApi::with_statuses(vec![
        Err(transient()),
        Err(AppError::Rejected("assign not found".to_string())),
        Ok(file_status()),
    ]));
    let sleeper = Arc::new(RecordingSleeper::default());

    let err = reconciler(api.clone(), sleeper)
        .reconcile(&session(), 42)
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "assign not found");
    assert_eq!(api.status_calls(), 2);
}

#[tokio::test]
async fn empty_plugin_lists_are_polled_again() {
    let api = Arc::new(ScriptedApi::with_statuses(vec![
        Ok(AssignStatus::default()),
        Ok(text_status("", SubmissionStatus::Pending)),
    ]));
    let sleeper = Arc::new(RecordingSleeper::default());

    let report = reconciler(api.clone(), sleeper.clone())
        .reconcile(&session(), 42)
        .await
        .unwrap();

    assert_eq!(report.capabilities, Capabilities::TEXT);
    assert_eq!(report.last_text, "");
    assert_eq!(api.status_calls(), 2);
    assert_eq!(sleeper.delays.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn never_detected_type_keeps_the_last_reported_status() {
    let submitted_without_plugins = AssignStatus {
        status: SubmissionStatus::Submitted,
        plugins: Vec::new(),
    };
    let api = Arc::new(ScriptedApi::with_statuses(vec![
        Ok(submitted_without_plugins.clone()),
        Ok(submitted_without_plugins.clone()),
        Ok(submitted_without_plugins),
    ]));

    let report = reconciler(api.clone(), Arc::new(RecordingSleeper::default()))
        .reconcile(&session(), 42)
        .await
        .unwrap();

    assert!(report.capabilities.is_empty());
    assert_eq!(report.status, SubmissionStatus::Submitted);
    assert_eq!(api.status_calls(), 3);
}

#[tokio::test]
async fn non_positive_ids_are_invalid_input() {
    let api = Arc::new(ScriptedApi::default());

    for id in [0, -3] {
        let err = StatusReconciler::new(api.clone())
            .with_sleeper(Arc::new(TokioSleeper))
            .reconcile(&session(), id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }
    assert_eq!(api.status_calls(), 0);
}
