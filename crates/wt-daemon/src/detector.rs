use anyhow::Result;
use async_trait::async_trait;
use wt_core::types::{Issue, IssueKind, ProjectStructure, Severity};

/// Inspects a structure snapshot and reports problems.
#[async_trait]
pub trait Detector: Send + Sync {
    async fn detect(&self, structure: &ProjectStructure) -> Result<Vec<Issue>>;
}

/// File every healthy project root should carry.
#[derive(Debug, Clone)]
pub struct RequiredFile {
    pub name: String,
    pub severity: Severity,
}

/// Dependency manifest and the lockfile expected next to it.
#[derive(Debug, Clone)]
pub struct LockfilePair {
    pub manifest: String,
    pub lockfiles: Vec<String>,
}

/// Rule-based [`Detector`] over file and directory names.
#[derive(Debug, Clone)]
pub struct RuleDetector {
    required: Vec<RequiredFile>,
    /// Exact names, or `*.ext` suffix patterns.
    forbidden_files: Vec<String>,
    forbidden_dirs: Vec<String>,
    lockfiles: Vec<LockfilePair>,
}

impl Default for RuleDetector {
    fn default() -> Self {
        let required = [
            ("README.md", Severity::Medium),
            ("LICENSE", Severity::Low),
            (".gitignore", Severity::Medium),
        ]
        .into_iter()
        .map(|(name, severity)| RequiredFile {
            name: name.to_string(),
            severity,
        })
        .collect();

        let lockfiles = [
            ("package.json", &["package-lock.json", "yarn.lock", "pnpm-lock.yaml"][..]),
            ("Cargo.toml", &["Cargo.lock"][..]),
            ("requirements.txt", &["requirements.lock", "poetry.lock"][..]),
            ("go.mod", &["go.sum"][..]),
        ]
        .into_iter()
        .map(|(manifest, locks)| LockfilePair {
            manifest: manifest.to_string(),
            lockfiles: locks.iter().map(|l| l.to_string()).collect(),
        })
        .collect();

        Self {
            required,
            forbidden_files: [".env", ".env.local", "id_rsa", "*.pem", "*.key"]
                .map(String::from)
                .to_vec(),
            forbidden_dirs: ["node_modules", "target", "dist"].map(String::from).to_vec(),
            lockfiles,
        }
    }
}

impl RuleDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_forbidden_file(mut self, pattern: impl Into<String>) -> Self {
        self.forbidden_files.push(pattern.into());
        self
    }

    pub fn with_required_file(mut self, name: impl Into<String>, severity: Severity) -> Self {
        self.required.push(RequiredFile {
            name: name.into(),
            severity,
        });
        self
    }

    fn is_forbidden_file(&self, name: &str) -> bool {
        self.forbidden_files.iter().any(|pattern| match pattern.strip_prefix('*') {
            Some(suffix) => name.ends_with(suffix) && name.len() > suffix.len(),
            None => name == pattern,
        })
    }

    /// Run every rule synchronously.
    pub fn check(&self, structure: &ProjectStructure) -> Vec<Issue> {
        let mut issues = Vec::new();

        for required in &self.required {
            if !structure.has_file(&required.name) {
                issues.push(Issue::new(
                    IssueKind::MissingFile,
                    required.severity,
                    &required.name,
                    format!("{} is missing", required.name),
                ));
            }
        }

        for file in &structure.files {
            if self.is_forbidden_file(&file.name) {
                issues.push(Issue::new(
                    IssueKind::ForbiddenFile,
                    Severity::High,
                    &file.path,
                    format!("{} should not be committed", file.path),
                ));
            }
        }

        for dir in &structure.directories {
            if self.forbidden_dirs.iter().any(|d| *d == dir.name) {
                issues.push(Issue::new(
                    IssueKind::ForbiddenFile,
                    Severity::High,
                    &dir.path,
                    format!("{}/ should not be committed", dir.path),
                ));
            }
        }

        for pair in &self.lockfiles {
            if structure.has_file(&pair.manifest)
                && !pair.lockfiles.iter().any(|l| structure.has_file(l))
            {
                issues.push(Issue::new(
                    IssueKind::Dependency,
                    Severity::Medium,
                    &pair.manifest,
                    format!(
                        "{} has no lockfile (expected one of: {})",
                        pair.manifest,
                        pair.lockfiles.join(", ")
                    ),
                ));
            }
        }

        issues
    }
}

#[async_trait]
impl Detector for RuleDetector {
    async fn detect(&self, structure: &ProjectStructure) -> Result<Vec<Issue>> {
        Ok(self.check(structure))
    }
}
