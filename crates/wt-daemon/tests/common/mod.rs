//! In-test collaborators shared by the daemon integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;
use wt_core::remote::{IssueReceipt, IssueReporter, RemoteError, RemoteReader};
use wt_core::report_cache::ReportCache;
use wt_core::types::{CodeAnalysis, Issue, ProjectStructure, RemoteEntry};
use wt_daemon::detector::{Detector, RuleDetector};
use wt_daemon::scanner::{ScanOrchestrator, ScanSettings};
use wt_intelligence::AiResponder;

// ---------------------------------------------------------------------------
// FakeRepo
// ---------------------------------------------------------------------------

/// Repository listing held in memory.
#[derive(Default)]
pub struct FakeRepo {
    entries: Vec<RemoteEntry>,
    bodies: HashMap<String, String>,
    pub list_calls: AtomicUsize,
    pub fail_list: AtomicBool,
}

impl FakeRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(mut self, path: &str, body: &str) -> Self {
        self.entries.push(RemoteEntry::file(path, body.len() as u64));
        self.bodies.insert(path.to_string(), body.to_string());
        self
    }

    /// A listed file whose body cannot be read.
    pub fn unreadable(mut self, path: &str) -> Self {
        self.entries.push(RemoteEntry::file(path, 10));
        self
    }

    pub fn dir(mut self, path: &str) -> Self {
        self.entries.push(RemoteEntry::dir(path));
        self
    }

    /// README, LICENSE and .gitignore present: no default rule fires.
    pub fn healthy() -> Self {
        Self::new()
            .file("README.md", "# demo")
            .file("LICENSE", "MIT")
            .file(".gitignore", "target/")
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_list.store(failing, Ordering::SeqCst);
    }

    pub fn list_count(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteReader for FakeRepo {
    async fn list(&self, _path: &str) -> Result<Vec<RemoteEntry>, RemoteError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(RemoteError::Network("connection reset".into()));
        }
        Ok(self.entries.clone())
    }

    async fn read_file(&self, path: &str) -> Result<String, RemoteError> {
        self.bodies
            .get(path)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(path.to_string()))
    }
}

// ---------------------------------------------------------------------------
// ScriptedResponder
// ---------------------------------------------------------------------------

/// Answers every prompt with a fixed text and records what it was asked.
pub struct ScriptedResponder {
    pub reply: String,
    pub prompts: Mutex<Vec<String>>,
    pub analyzed: Mutex<Vec<String>>,
}

impl ScriptedResponder {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            prompts: Mutex::new(Vec::new()),
            analyzed: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn analyzed_languages(&self) -> Vec<String> {
        self.analyzed.lock().unwrap().clone()
    }
}

#[async_trait]
impl AiResponder for ScriptedResponder {
    async fn generate(&self, prompt: &str) -> String {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.reply.clone()
    }

    async fn chat(&self, message: &str) -> String {
        self.generate(message).await
    }

    async fn analyze_code(&self, _code: &str, language: &str) -> CodeAnalysis {
        self.analyzed.lock().unwrap().push(language.to_string());
        CodeAnalysis::Structured(json!({"summary": "fine", "language": language}))
    }
}

// ---------------------------------------------------------------------------
// RecordingReporter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct FiledIssue {
    pub title: String,
    pub body: String,
    pub labels: Vec<String>,
}

#[derive(Default)]
pub struct RecordingReporter {
    pub filed: Mutex<Vec<FiledIssue>>,
    pub fail: bool,
}

impl RecordingReporter {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn filed(&self) -> Vec<FiledIssue> {
        self.filed.lock().unwrap().clone()
    }
}

#[async_trait]
impl IssueReporter for RecordingReporter {
    async fn file_issue(
        &self,
        title: &str,
        body: &str,
        labels: &[String],
    ) -> Result<IssueReceipt, RemoteError> {
        self.filed.lock().unwrap().push(FiledIssue {
            title: title.to_string(),
            body: body.to_string(),
            labels: labels.to_vec(),
        });
        if self.fail {
            return Err(RemoteError::Auth("bad credentials".into()));
        }
        Ok(IssueReceipt {
            number: 7,
            url: "https://github.com/acme/site/issues/7".into(),
        })
    }
}

// ---------------------------------------------------------------------------
// CountingDetector
// ---------------------------------------------------------------------------

/// Default rules, counting invocations. Fails on demand.
#[derive(Default)]
pub struct CountingDetector {
    pub calls: AtomicUsize,
    pub fail: AtomicBool,
}

impl CountingDetector {
    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Detector for CountingDetector {
    async fn detect(&self, structure: &ProjectStructure) -> Result<Vec<Issue>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("rule engine crashed");
        }
        RuleDetector::default().detect(structure).await
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

pub struct Harness {
    pub repo: Arc<FakeRepo>,
    pub responder: Arc<ScriptedResponder>,
    pub detector: Arc<CountingDetector>,
    pub scanner: Arc<ScanOrchestrator>,
}

pub fn harness(repo: FakeRepo) -> Harness {
    harness_with(repo, ScanSettings::default(), None)
}

pub fn harness_with(
    repo: FakeRepo,
    settings: ScanSettings,
    reporter: Option<Arc<dyn IssueReporter>>,
) -> Harness {
    let repo = Arc::new(repo);
    let responder = Arc::new(ScriptedResponder::new("Fix the highest severity issues first."));
    let detector = Arc::new(CountingDetector::default());
    let cache = Arc::new(ReportCache::new(repo.clone()));

    let mut scanner =
        ScanOrchestrator::new(cache, repo.clone(), detector.clone(), responder.clone())
            .with_settings(settings);
    if let Some(reporter) = reporter {
        scanner = scanner.with_reporter(reporter);
    }

    Harness {
        repo,
        responder,
        detector,
        scanner: Arc::new(scanner),
    }
}
