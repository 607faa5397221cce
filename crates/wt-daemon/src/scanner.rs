use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use wt_core::config::ScanConfig;
use wt_core::remote::{IssueReporter, RemoteError, RemoteReader};
use wt_core::report_cache::ReportCache;
use wt_core::types::{
    FileAnalysis, Issue, ProjectStructure, Recommendation, RecommendationPriority, Report,
};
use wt_intelligence::AiResponder;

use crate::detector::Detector;

pub const ISSUE_LABELS: [&str; 2] = ["automated", "watchtower"];

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("failed to read project structure: {0}")]
    Structure(#[source] RemoteError),

    #[error("issue detection failed: {0}")]
    Detection(String),
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ScanSettings {
    /// File an issue on the tracker when a scan finds problems.
    pub auto_fix: bool,
    pub max_analyzed_files: usize,
    /// Lower-case extensions, without the dot, eligible for code analysis.
    pub source_extensions: Vec<String>,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self::from(&ScanConfig::default())
    }
}

impl From<&ScanConfig> for ScanSettings {
    fn from(cfg: &ScanConfig) -> Self {
        Self {
            auto_fix: cfg.enable_auto_fix,
            max_analyzed_files: cfg.max_analyzed_files,
            source_extensions: cfg
                .source_extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }
}

/// Language name handed to the responder for a source extension.
pub fn language_for(extension: &str) -> &str {
    match extension {
        "rs" => "rust",
        "js" | "jsx" => "javascript",
        "ts" | "tsx" => "typescript",
        "py" => "python",
        "rb" => "ruby",
        other => other,
    }
}

// ---------------------------------------------------------------------------
// ScanOrchestrator
// ---------------------------------------------------------------------------

struct PeriodicHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Produces project reports and keeps the latest one.
pub struct ScanOrchestrator {
    cache: Arc<ReportCache>,
    reader: Arc<dyn RemoteReader>,
    detector: Arc<dyn Detector>,
    responder: Arc<dyn AiResponder>,
    reporter: Option<Arc<dyn IssueReporter>>,
    settings: ScanSettings,
    last_report: RwLock<Option<Arc<Report>>>,
    periodic: Mutex<Option<PeriodicHandle>>,
}

impl ScanOrchestrator {
    pub fn new(
        cache: Arc<ReportCache>,
        reader: Arc<dyn RemoteReader>,
        detector: Arc<dyn Detector>,
        responder: Arc<dyn AiResponder>,
    ) -> Self {
        Self {
            cache,
            reader,
            detector,
            responder,
            reporter: None,
            settings: ScanSettings::default(),
            last_report: RwLock::new(None),
            periodic: Mutex::new(None),
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn IssueReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn with_settings(mut self, settings: ScanSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn cache(&self) -> &Arc<ReportCache> {
        &self.cache
    }

    pub fn settings(&self) -> &ScanSettings {
        &self.settings
    }

    /// The most recent successful report.
    pub async fn get_last(&self) -> Option<Arc<Report>> {
        self.last_report.read().await.clone()
    }

    /// Run one full scan and store its report as the latest.
    ///
    /// A failed scan leaves the previous report in place.
    pub async fn perform_scan(&self) -> Result<Arc<Report>, ScanError> {
        let started = Instant::now();
        info!("scan starting");

        let structure = self.cache.get().await.map_err(ScanError::Structure)?;
        let issues = self
            .detector
            .detect(&structure)
            .await
            .map_err(|e| ScanError::Detection(format!("{e:#}")))?;
        let analysis = self.analyze_sources(&structure).await;
        let recommendations = self.recommend(&issues).await;

        let report = Arc::new(Report {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            duration_ms: started.elapsed().as_millis() as u64,
            structure: (*structure).clone(),
            issues,
            analysis,
            recommendations,
        });
        *self.last_report.write().await = Some(report.clone());

        info!(
            report_id = %report.id,
            files = report.structure.files.len(),
            issues = report.issue_count(),
            analyzed = report.analysis.len(),
            duration_ms = report.duration_ms,
            "scan completed"
        );

        if self.settings.auto_fix && report.issue_count() > 0 {
            self.file_issue(&report).await;
        }

        Ok(report)
    }

    async fn analyze_sources(&self, structure: &ProjectStructure) -> Vec<FileAnalysis> {
        let candidates = structure
            .files
            .iter()
            .filter_map(|f| {
                let ext = f.extension()?;
                self.settings
                    .source_extensions
                    .contains(&ext)
                    .then_some((f, ext))
            })
            .take(self.settings.max_analyzed_files);

        let mut analysis = Vec::new();
        for (file, ext) in candidates {
            let content = match self.reader.read_file(&file.path).await {
                Ok(content) => content,
                Err(e) => {
                    warn!(file = %file.path, error = %e, "skipping unreadable file");
                    continue;
                }
            };
            let language = language_for(&ext);
            debug!(file = %file.path, language, "analysing source file");
            analysis.push(FileAnalysis {
                file: file.path.clone(),
                language: language.to_string(),
                analysis: self.responder.analyze_code(&content, language).await,
            });
        }
        analysis
    }

    async fn recommend(&self, issues: &[Issue]) -> Vec<Recommendation> {
        if issues.is_empty() {
            return vec![Recommendation {
                priority: RecommendationPriority::Low,
                suggestion: "Keep code reviewed regularly".to_string(),
                reason: "No critical issues found".to_string(),
            }];
        }

        let mut prompt = String::from("A repository scan found these issues:\n");
        for issue in issues {
            let _ = writeln!(prompt, "- [{}] {}: {}", issue.severity, issue.file, issue.message);
        }
        prompt.push_str("\nSuggest the most important next steps to fix them, briefly.");

        vec![Recommendation {
            priority: RecommendationPriority::High,
            suggestion: self.responder.generate(&prompt).await,
            reason: format!("Based on {} detected issues", issues.len()),
        }]
    }

    async fn file_issue(&self, report: &Report) {
        let Some(reporter) = &self.reporter else {
            debug!("auto-fix enabled but no issue reporter configured");
            return;
        };
        let title = format!("Watchtower scan: {} issues detected", report.issue_count());
        let labels: Vec<String> = ISSUE_LABELS.iter().map(|l| l.to_string()).collect();

        match reporter.file_issue(&title, &issue_body(report), &labels).await {
            Ok(receipt) => info!(number = receipt.number, url = %receipt.url, "scan issue filed"),
            Err(e) => warn!(error = %e, report_id = %report.id, "failed to file scan issue"),
        }
    }

    // ------------------------------------------------------------------
    // Periodic scanning
    // ------------------------------------------------------------------

    /// Scan now and then every `interval` until stopped.
    ///
    /// Returns `false` without starting anything when a loop is already
    /// active or `interval` is zero.
    pub async fn start_periodic(self: &Arc<Self>, interval: Duration) -> bool {
        if interval.is_zero() {
            warn!("periodic scan interval must be greater than zero");
            return false;
        }

        let mut periodic = self.periodic.lock().await;
        if periodic.as_ref().is_some_and(|p| !p.task.is_finished()) {
            warn!("periodic scanning already active");
            return false;
        }

        let (stop, mut stop_rx) = watch::channel(false);
        let this = Arc::clone(self);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = stop_rx.changed() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = this.perform_scan().await {
                            error!(error = %e, "periodic scan failed");
                        }
                    }
                }
            }
            debug!("periodic scan loop exited");
        });

        *periodic = Some(PeriodicHandle { stop, task });
        info!(interval_ms = interval.as_millis() as u64, "periodic scanning started");
        true
    }

    /// Stop the periodic loop. A scan already running is allowed to finish.
    ///
    /// Returns whether a loop was active.
    pub async fn stop_periodic(&self) -> bool {
        match self.periodic.lock().await.take() {
            Some(handle) => {
                let _ = handle.stop.send(true);
                info!("periodic scanning stopped");
                true
            }
            None => false,
        }
    }

    pub async fn is_periodic_active(&self) -> bool {
        self.periodic
            .lock()
            .await
            .as_ref()
            .is_some_and(|p| !p.task.is_finished())
    }
}

/// Markdown body for the issue filed after a scan.
pub fn issue_body(report: &Report) -> String {
    let mut body = format!(
        "## Watchtower scan report\n\nScan `{}` at {} found {} issues.\n\n### Issues\n\n",
        report.id,
        report.timestamp.to_rfc3339(),
        report.issue_count()
    );
    for issue in &report.issues {
        let _ = writeln!(body, "- **{}** `{}`: {}", issue.severity, issue.file, issue.message);
    }
    body.push_str("\n### Recommendations\n\n");
    for rec in &report.recommendations {
        let priority = match rec.priority {
            RecommendationPriority::Low => "low",
            RecommendationPriority::Medium => "medium",
            RecommendationPriority::High => "high",
        };
        let _ = writeln!(body, "- **{priority}** {} _({})_", rec.suggestion, rec.reason);
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_normalise_extensions() {
        let cfg = ScanConfig {
            source_extensions: vec![".RS".into(), "py".into()],
            ..ScanConfig::default()
        };
        let settings = ScanSettings::from(&cfg);
        assert_eq!(settings.source_extensions, vec!["rs", "py"]);
        assert_eq!(settings.max_analyzed_files, 5);
        assert!(!settings.auto_fix);
    }

    #[test]
    fn languages_for_known_extensions() {
        assert_eq!(language_for("rs"), "rust");
        assert_eq!(language_for("tsx"), "typescript");
        assert_eq!(language_for("go"), "go");
        assert_eq!(language_for("java"), "java");
    }
}
