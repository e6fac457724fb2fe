use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, GenerationError};
use crate::types::{BookId, PdfArtifact};

use super::GenerationStage;

/// Scheduling hint. Accepted and logged; nothing schedules on it yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateOptions {
    /// Regenerate even when the book already has a PDF
    pub force: bool,
    pub priority: Priority,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub book_id: BookId,
    pub requester_id: String,
    pub options: GenerateOptions,
}

impl GenerationRequest {
    pub fn new(book_id: BookId, requester_id: impl Into<String>) -> Self {
        Self {
            book_id,
            requester_id: requester_id.into(),
            options: GenerateOptions::default(),
        }
    }

    pub fn forced(mut self) -> Self {
        self.options.force = true;
        self
    }
}

/// Result of a generation run, success or not
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationOutcome {
    pub success: bool,
    pub pdf_url: Option<String>,
    pub generated_at: Option<DateTime<Utc>>,
    pub page_count: Option<usize>,
    /// Human-readable failure reason
    pub error: Option<String>,
    pub error_kind: Option<ErrorKind>,
    /// Stage the run failed in. `None` for rate-limited requests.
    pub failed_stage: Option<GenerationStage>,
    /// Assets skipped while rendering
    pub warnings: Vec<String>,
}

impl GenerationOutcome {
    pub fn succeeded(artifact: PdfArtifact, page_count: usize, warnings: Vec<String>) -> Self {
        Self {
            success: true,
            pdf_url: Some(artifact.url),
            generated_at: Some(artifact.generated_at),
            page_count: Some(page_count),
            error: None,
            error_kind: None,
            failed_stage: None,
            warnings,
        }
    }

    pub fn failed(err: &GenerationError, stage: Option<GenerationStage>) -> Self {
        Self {
            success: false,
            pdf_url: None,
            generated_at: None,
            page_count: None,
            error: Some(err.to_string()),
            error_kind: Some(err.kind()),
            failed_stage: stage,
            warnings: Vec::new(),
        }
    }
}
