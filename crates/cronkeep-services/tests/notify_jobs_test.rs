//! Storage alert and log report integration tests.
//!
//! Run with: `cargo test -p cronkeep-services --test notify_jobs_test`

mod helpers;

use chrono::NaiveDate;
use cronkeep_core::AppError;
use cronkeep_services::log_report::{REPORT_BODY, REPORT_SUBJECT};
use cronkeep_services::storage_alert::ALERT_SUBJECT;
use cronkeep_services::{LogReport, LogReportOptions, StorageAlert};
use helpers::{write_aged, FixedProbe, RecordingNotifier};
use std::path::Path;
use std::sync::Arc;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
}

#[tokio::test]
async fn test_low_space_sends_alert() {
    let notifier = Arc::new(RecordingNotifier::new());
    let alert = StorageAlert::new(Arc::new(FixedProbe::new(1_000, 50)), notifier.clone())
        .with_host("web-01", vec!["10.0.0.5".to_string(), "No IP addr".to_string()]);

    let outcome = alert
        .run(Path::new("/"), 10, "oncall@example.com")
        .await
        .unwrap();

    assert!(outcome.alerted);
    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].recipient, "oncall@example.com");
    assert_eq!(sent[0].subject, ALERT_SUBJECT);
    assert_eq!(
        sent[0].body,
        "There is less than 5.00 % of free space on server: \n\n10.0.0.5\nNo IP addr\nweb-01"
    );
    assert!(sent[0].attachments.is_empty());
}

#[tokio::test]
async fn test_enough_space_sends_nothing() {
    let notifier = Arc::new(RecordingNotifier::new());
    let alert = StorageAlert::new(Arc::new(FixedProbe::new(1_000, 500)), notifier.clone());

    let outcome = alert
        .run(Path::new("/"), 10, "oncall@example.com")
        .await
        .unwrap();

    assert!(!outcome.alerted);
    assert!(notifier.sent().is_empty());
}

#[tokio::test]
async fn test_alert_delivery_failure_is_transport_error() {
    let alert = StorageAlert::new(
        Arc::new(FixedProbe::new(1_000, 0)),
        Arc::new(RecordingNotifier::failing()),
    );

    let err = alert
        .run(Path::new("/"), 10, "oncall@example.com")
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<AppError>(),
        Some(AppError::Transport(_))
    ));
}

#[tokio::test]
async fn test_log_report_attaches_latest_log_per_run() {
    let logs = tempfile::tempdir().unwrap();
    let day = logs.path().join("2026-10-15");
    write_aged(&day.join("checkout_delivery_options/out_0800.log"), b"old", 1);
    write_aged(&day.join("checkout_delivery_options/out_1800.log"), b"new", 1);
    write_aged(&day.join("cart_delivery_options/out_1200.log"), b"cart", 1);
    write_aged(&day.join("login_smoke/out_1200.log"), b"skip", 1);

    let notifier = Arc::new(RecordingNotifier::new());
    let report = LogReport::new(logs.path(), notifier.clone(), LogReportOptions::default());
    let run = report.run_on(today(), "qa@example.com").await.unwrap();

    assert!(run.sent);
    assert_eq!(
        run.attachments.keys().cloned().collect::<Vec<_>>(),
        vec!["cart.txt", "checkout.txt"]
    );

    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    let mail = &sent[0];
    assert_eq!(mail.subject, REPORT_SUBJECT);
    assert_eq!(mail.body, REPORT_BODY);
    assert!(mail.high_priority);
    let attached: Vec<(&str, &[u8])> = mail
        .attachments
        .iter()
        .map(|a| (a.filename.as_str(), a.content.as_slice()))
        .collect();
    assert_eq!(
        attached,
        vec![("cart.txt", &b"cart"[..]), ("checkout.txt", &b"new"[..])]
    );
}

#[tokio::test]
async fn test_log_report_without_matches_sends_nothing() {
    let logs = tempfile::tempdir().unwrap();
    let day = logs.path().join("2026-10-15");
    write_aged(&day.join("checkout_delivery_options/stderr.log"), b"err", 1);

    let notifier = Arc::new(RecordingNotifier::new());
    let report = LogReport::new(logs.path(), notifier.clone(), LogReportOptions::default());
    let run = report.run_on(today(), "qa@example.com").await.unwrap();

    assert!(!run.sent);
    assert!(run.attachments.is_empty());
    assert!(notifier.sent().is_empty());
}

#[tokio::test]
async fn test_log_report_missing_day_is_not_found() {
    let logs = tempfile::tempdir().unwrap();
    let notifier = Arc::new(RecordingNotifier::new());
    let report = LogReport::new(logs.path(), notifier.clone(), LogReportOptions::default());

    let err = report.run_on(today(), "qa@example.com").await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<AppError>(),
        Some(AppError::NotFound(_))
    ));
    assert!(notifier.sent().is_empty());
}
