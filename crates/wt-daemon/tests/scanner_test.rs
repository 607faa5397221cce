mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use common::{harness, harness_with, FakeRepo, RecordingReporter};
use wt_core::types::{CodeAnalysis, IssueKind, RecommendationPriority, Severity};
use wt_daemon::scanner::{ScanError, ScanSettings};

#[tokio::test]
async fn clean_project_gets_the_fixed_low_recommendation() {
    let h = harness(FakeRepo::healthy().file("src/main.rs", "fn main() {}").dir("src"));

    let report = h.scanner.perform_scan().await.unwrap();

    assert!(report.issues.is_empty());
    assert_eq!(report.recommendations.len(), 1);
    let rec = &report.recommendations[0];
    assert_eq!(rec.priority, RecommendationPriority::Low);
    assert_eq!(rec.suggestion, "Keep code reviewed regularly");
    assert_eq!(rec.reason, "No critical issues found");
    // No generate call is needed for a clean report.
    assert!(h.responder.prompts().is_empty());
}

#[tokio::test]
async fn issues_produce_one_high_recommendation_from_the_responder() {
    let h = harness(FakeRepo::new().file("README.md", "# demo").file(".env", "SECRET=1"));

    let report = h.scanner.perform_scan().await.unwrap();

    let kinds: Vec<_> = report.issues.iter().map(|i| (i.kind, i.severity)).collect();
    assert_eq!(
        kinds,
        vec![
            (IssueKind::MissingFile, Severity::Low),
            (IssueKind::MissingFile, Severity::Medium),
            (IssueKind::ForbiddenFile, Severity::High),
        ]
    );
    assert_eq!(report.recommendations.len(), 1);
    let rec = &report.recommendations[0];
    assert_eq!(rec.priority, RecommendationPriority::High);
    assert_eq!(rec.suggestion, "Fix the highest severity issues first.");
    assert_eq!(rec.reason, "Based on 3 detected issues");

    let prompts = h.responder.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains(".env"));
}

#[tokio::test]
async fn analysis_covers_allowed_extensions_up_to_the_limit() {
    let mut repo = FakeRepo::healthy().file("notes.txt", "plain text");
    for i in 0..7 {
        repo = repo.file(&format!("src/m{i}.rs"), "pub fn f() {}");
    }
    let h = harness(repo);

    let report = h.scanner.perform_scan().await.unwrap();

    assert_eq!(report.analysis.len(), 5);
    assert_eq!(report.analysis[0].file, "src/m0.rs");
    assert!(report.analysis.iter().all(|a| a.language == "rust"));
    assert!(matches!(report.analysis[0].analysis, CodeAnalysis::Structured(_)));
}

#[tokio::test]
async fn unreadable_file_is_skipped() {
    let h = harness(
        FakeRepo::healthy()
            .unreadable("src/gone.py")
            .file("src/app.ts", "export {}"),
    );

    let report = h.scanner.perform_scan().await.unwrap();

    assert_eq!(report.analysis.len(), 1);
    assert_eq!(report.analysis[0].file, "src/app.ts");
    assert_eq!(h.responder.analyzed_languages(), vec!["typescript"]);
}

#[tokio::test]
async fn report_is_stored_as_latest() {
    let h = harness(FakeRepo::healthy());
    assert!(h.scanner.get_last().await.is_none());

    let report = h.scanner.perform_scan().await.unwrap();
    let last = h.scanner.get_last().await.unwrap();
    assert_eq!(last.id, report.id);
    assert_eq!(last.structure.files.len(), 3);
}

#[tokio::test]
async fn structure_failure_stores_nothing() {
    let h = harness(FakeRepo::healthy());
    h.repo.set_failing(true);

    let err = h.scanner.perform_scan().await.unwrap_err();

    assert!(matches!(err, ScanError::Structure(_)));
    assert!(h.scanner.get_last().await.is_none());
    assert_eq!(h.detector.count(), 0);
}

#[tokio::test]
async fn detection_failure_keeps_previous_report() {
    let h = harness(FakeRepo::healthy());
    let first = h.scanner.perform_scan().await.unwrap();

    h.detector.fail.store(true, Ordering::SeqCst);
    let err = h.scanner.perform_scan().await.unwrap_err();

    assert!(matches!(err, ScanError::Detection(ref msg) if msg.contains("rule engine crashed")));
    assert_eq!(h.scanner.get_last().await.unwrap().id, first.id);
}

#[tokio::test]
async fn auto_fix_files_one_issue() {
    let reporter = Arc::new(RecordingReporter::default());
    let settings = ScanSettings {
        auto_fix: true,
        ..ScanSettings::default()
    };
    let h = harness_with(FakeRepo::new(), settings, Some(reporter.clone()));

    h.scanner.perform_scan().await.unwrap();

    let filed = reporter.filed();
    assert_eq!(filed.len(), 1);
    assert_eq!(filed[0].title, "Watchtower scan: 3 issues detected");
    assert_eq!(filed[0].labels, vec!["automated", "watchtower"]);
    assert!(filed[0].body.contains("README.md"));
    assert!(filed[0].body.contains("Based on 3 detected issues"));
}

#[tokio::test]
async fn auto_fix_skips_clean_reports_and_disabled_setting() {
    let reporter = Arc::new(RecordingReporter::default());
    let enabled = ScanSettings {
        auto_fix: true,
        ..ScanSettings::default()
    };
    let h = harness_with(FakeRepo::healthy(), enabled, Some(reporter.clone()));
    h.scanner.perform_scan().await.unwrap();

    let h = harness_with(FakeRepo::new(), ScanSettings::default(), Some(reporter.clone()));
    h.scanner.perform_scan().await.unwrap();

    assert!(reporter.filed().is_empty());
}

#[tokio::test]
async fn reporter_failure_does_not_fail_the_scan() {
    let reporter = Arc::new(RecordingReporter::failing());
    let settings = ScanSettings {
        auto_fix: true,
        ..ScanSettings::default()
    };
    let h = harness_with(FakeRepo::new(), settings, Some(reporter.clone()));

    let report = h.scanner.perform_scan().await.unwrap();

    assert_eq!(report.issue_count(), 3);
    assert_eq!(reporter.filed().len(), 1);
    assert!(h.scanner.get_last().await.is_some());
}

#[tokio::test(start_paused = true)]
async fn periodic_scans_run_immediately_then_on_interval() {
    let h = harness(FakeRepo::healthy());

    assert!(h.scanner.start_periodic(Duration::from_secs(60)).await);
    assert!(!h.scanner.start_periodic(Duration::from_secs(60)).await);
    assert!(h.scanner.is_periodic_active().await);

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(h.detector.count(), 1);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(h.detector.count(), 2);

    assert!(h.scanner.stop_periodic().await);
    assert!(!h.scanner.stop_periodic().await);
    assert!(!h.scanner.is_periodic_active().await);

    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(h.detector.count(), 2);
}

#[tokio::test(start_paused = true)]
async fn periodic_loop_survives_failed_scans() {
    let h = harness(FakeRepo::healthy());
    h.detector.fail.store(true, Ordering::SeqCst);

    h.scanner.start_periodic(Duration::from_secs(30)).await;
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(h.detector.count(), 1);
    assert!(h.scanner.get_last().await.is_none());

    h.detector.fail.store(false, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(h.detector.count(), 2);
    assert!(h.scanner.get_last().await.is_some());

    h.scanner.stop_periodic().await;
}

#[tokio::test(start_paused = true)]
async fn scans_within_ttl_share_one_listing() {
    let h = harness(FakeRepo::healthy());

    h.scanner.perform_scan().await.unwrap();
    h.scanner.perform_scan().await.unwrap();
    assert_eq!(h.repo.list_count(), 1);

    tokio::time::advance(Duration::from_secs(6 * 60)).await;
    h.scanner.perform_scan().await.unwrap();
    assert_eq!(h.repo.list_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn zero_interval_is_rejected() {
    let h = harness(FakeRepo::healthy());

    assert!(!h.scanner.start_periodic(Duration::ZERO).await);
    assert!(!h.scanner.is_periodic_active().await);
    assert!(!h.scanner.stop_periodic().await);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(h.detector.count(), 0);

    // A valid interval still starts afterwards.
    assert!(h.scanner.start_periodic(Duration::from_secs(60)).await);
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(h.detector.count(), 1);
    h.scanner.stop_periodic().await;
}
