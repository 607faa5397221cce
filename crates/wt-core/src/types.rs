use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Remote entries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
}

/// One item returned by a remote directory listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteEntry {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(rename = "type")]
    pub kind: EntryKind,
}

impl RemoteEntry {
    pub fn file(path: impl Into<String>, size: u64) -> Self {
        let path = path.into();
        Self {
            name: file_name(&path),
            path,
            size: Some(size),
            kind: EntryKind::File,
        }
    }

    pub fn dir(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            name: file_name(&path),
            path,
            size: None,
            kind: EntryKind::Dir,
        }
    }
}

fn file_name(path: &str) -> String {
    path.rsplit('/').next().unwrap_or(path).to_string()
}

// ---------------------------------------------------------------------------
// ProjectStructure
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: String,
    pub path: String,
    pub size: u64,
}

impl FileEntry {
    /// Lower-cased extension without the dot, if any.
    pub fn extension(&self) -> Option<String> {
        let (stem, ext) = self.name.rsplit_once('.')?;
        if stem.is_empty() {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    pub name: String,
    pub path: String,
}

/// Snapshot of a repository listing, split into files and directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectStructure {
    pub files: Vec<FileEntry>,
    pub directories: Vec<DirEntry>,
    pub captured_at: DateTime<Utc>,
}

impl ProjectStructure {
    /// Partition raw remote entries on their `type` discriminator.
    pub fn from_entries(entries: Vec<RemoteEntry>, captured_at: DateTime<Utc>) -> Self {
        let mut files = Vec::new();
        let mut directories = Vec::new();
        for entry in entries {
            match entry.kind {
                EntryKind::File => files.push(FileEntry {
                    name: entry.name,
                    path: entry.path,
                    size: entry.size.unwrap_or(0),
                }),
                EntryKind::Dir => directories.push(DirEntry {
                    name: entry.name,
                    path: entry.path,
                }),
            }
        }
        Self {
            files,
            directories,
            captured_at,
        }
    }

    pub fn has_file(&self, name: &str) -> bool {
        self.files.iter().any(|f| f.name == name)
    }

    pub fn has_dir(&self, name: &str) -> bool {
        self.directories.iter().any(|d| d.name == name)
    }
}

// ---------------------------------------------------------------------------
// Issues
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    MissingFile,
    ForbiddenFile,
    Dependency,
    Quality,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
        }
    }
}

/// A problem found by a detector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    #[serde(rename = "type")]
    pub kind: IssueKind,
    pub severity: Severity,
    pub file: String,
    pub message: String,
}

impl Issue {
    pub fn new(
        kind: IssueKind,
        severity: Severity,
        file: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            severity,
            file: file.into(),
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Analysis and recommendations
// ---------------------------------------------------------------------------

/// Result of asking the AI to review a file: parsed JSON when the reply
/// was machine-readable, the raw text otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CodeAnalysis {
    Structured(serde_json::Value),
    Raw(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileAnalysis {
    pub file: String,
    pub language: String,
    pub analysis: CodeAnalysis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationPriority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub priority: RecommendationPriority,
    pub suggestion: String,
    pub reason: String,
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Outcome of one scan cycle. Only the latest report is kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub duration_ms: u64,
    pub structure: ProjectStructure,
    pub issues: Vec<Issue>,
    pub analysis: Vec<FileAnalysis>,
    pub recommendations: Vec<Recommendation>,
}

impl Report {
    pub fn issue_count(&self) -> usize {
        self.issues.len()
    }

    pub fn count_by_severity(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
