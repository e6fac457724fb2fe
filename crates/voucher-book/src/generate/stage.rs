//! Generation run stages

use std::fmt;

use log::{info, warn};
use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

use crate::types::BookId;

/// Stages of one generation run, in order. `Failed` can follow any
/// non-terminal stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStage {
    Requested,
    LayingOut,
    ResolvingContent,
    Rendering,
    Uploading,
    Completed,
    Failed,
}

impl GenerationStage {
    pub fn as_str(self) -> &'static str {
        match self {
            GenerationStage::Requested => "requested",
            GenerationStage::LayingOut => "laying_out",
            GenerationStage::ResolvingContent => "resolving_content",
            GenerationStage::Rendering => "rendering",
            GenerationStage::Uploading => "uploading",
            GenerationStage::Completed => "completed",
            GenerationStage::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, GenerationStage::Completed | GenerationStage::Failed)
    }

    /// The stage after this one on the success path
    pub fn next(self) -> Option<GenerationStage> {
        match self {
            GenerationStage::Requested => Some(GenerationStage::LayingOut),
            GenerationStage::LayingOut => Some(GenerationStage::ResolvingContent),
            GenerationStage::ResolvingContent => Some(GenerationStage::Rendering),
            GenerationStage::Rendering => Some(GenerationStage::Uploading),
            GenerationStage::Uploading => Some(GenerationStage::Completed),
            GenerationStage::Completed | GenerationStage::Failed => None,
        }
    }

    pub fn can_advance_to(self, next: GenerationStage) -> bool {
        !self.is_terminal() && (next == GenerationStage::Failed || self.next() == Some(next))
    }
}

impl fmt::Display for GenerationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress event sent for every stage a run enters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationUpdate {
    pub book_id: BookId,
    pub stage: GenerationStage,
    /// Failure reason on `Failed`
    pub message: Option<String>,
}

/// Current stage of a run; logs and publishes every move
pub(crate) struct StageTracker {
    book_id: BookId,
    stage: GenerationStage,
    progress: Option<UnboundedSender<GenerationUpdate>>,
}

impl StageTracker {
    pub fn start(book_id: BookId, progress: Option<UnboundedSender<GenerationUpdate>>) -> Self {
        let tracker = Self {
            book_id,
            stage: GenerationStage::Requested,
            progress,
        };
        tracker.publish(None);
        tracker
    }

    pub fn stage(&self) -> GenerationStage {
        self.stage
    }

    pub fn advance(&mut self, next: GenerationStage) {
        self.enter(next, None);
    }

    pub fn fail(&mut self, reason: String) {
        self.enter(GenerationStage::Failed, Some(reason));
    }

    fn enter(&mut self, next: GenerationStage, message: Option<String>) {
        if !self.stage.can_advance_to(next) {
            warn!(
                "Book {}: ignoring stage change {} -> {}",
                self.book_id, self.stage, next
            );
            return;
        }
        info!("Book {}: {} -> {}", self.book_id, self.stage, next);
        self.stage = next;
        self.publish(message);
    }

    fn publish(&self, message: Option<String>) {
        if let Some(progress) = &self.progress {
            // A dropped receiver only means nobody is watching.
            let _ = progress.send(GenerationUpdate {
                book_id: self.book_id,
                stage: self.stage,
                message,
            });
        }
    }
}
