use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use log::{error, info, warn};
use tokio::sync::mpsc::UnboundedSender;

use crate::error::{GenerationError, RepositoryError, Result};
use crate::layout::{LayoutItem, PageSpec, SlotRef, plan_layout};
use crate::options::GeneratorOptions;
use crate::rate_limit::RateLimiter;
use crate::render::{RenderInput, render_book_async};
use crate::resolve::{ContentServices, resolve_content};
use crate::storage::FileStorage;
use crate::store::{BookRepository, PdfCommit};
use crate::types::{PdfArtifact, PlacementContent, PlacementSize};

use super::stage::StageTracker;
use super::{GenerationOutcome, GenerationRequest, GenerationStage, GenerationUpdate};

/// A finished run, before it becomes an outcome
struct Completed {
    artifact: PdfArtifact,
    page_count: usize,
    warnings: Vec<String>,
}

/// Generates and publishes voucher book PDFs.
///
/// Each call to [`generate`](Self::generate) is one independent run: lay out
/// placements, resolve their content, render, upload, then attach the PDF to
/// the book with a guarded update. A failed run leaves the book untouched.
pub struct BookPdfGenerator {
    repository: Arc<dyn BookRepository>,
    services: ContentServices,
    storage: Arc<dyn FileStorage>,
    rate_limiter: Arc<dyn RateLimiter>,
    options: GeneratorOptions,
    progress: Option<UnboundedSender<GenerationUpdate>>,
}

impl BookPdfGenerator {
    pub fn new(
        repository: Arc<dyn BookRepository>,
        services: ContentServices,
        storage: Arc<dyn FileStorage>,
        rate_limiter: Arc<dyn RateLimiter>,
        options: GeneratorOptions,
    ) -> Self {
        Self {
            repository,
            services,
            storage,
            rate_limiter,
            options,
            progress: None,
        }
    }

    /// Publish every stage change on `progress`
    pub fn with_progress(mut self, progress: UnboundedSender<GenerationUpdate>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn options(&self) -> &GeneratorOptions {
        &self.options
    }

    /// Run one generation. Never fails past this boundary: errors are
    /// reported in the outcome.
    pub async fn generate(&self, request: GenerationRequest) -> GenerationOutcome {
        let decision = self
            .rate_limiter
            .check_rate_limit(&request.requester_id)
            .await;
        if !decision.allowed {
            let err = GenerationError::RateLimited {
                retry_after_secs: decision.retry_after.as_secs().max(1),
            };
            warn!(
                "Book {}: requester {} rejected: {}",
                request.book_id, request.requester_id, err
            );
            return GenerationOutcome::failed(&err, None);
        }

        info!(
            "Book {}: PDF requested by {} (priority {}, force {})",
            request.book_id,
            request.requester_id,
            request.options.priority.as_str(),
            request.options.force
        );

        let mut tracker = StageTracker::start(request.book_id, self.progress.clone());
        match self.run(&request, &mut tracker).await {
            Ok(done) => {
                tracker.advance(GenerationStage::Completed);
                info!(
                    "Book {}: PDF published at {} ({} pages)",
                    request.book_id, done.artifact.url, done.page_count
                );
                GenerationOutcome::succeeded(done.artifact, done.page_count, done.warnings)
            }
            Err(err) => {
                let stage = tracker.stage();
                error!("Book {}: generation failed during {}: {}", request.book_id, stage, err);
                tracker.fail(err.to_string());
                GenerationOutcome::failed(&err, Some(stage))
            }
        }
    }

    async fn run(&self, request: &GenerationRequest, tracker: &mut StageTracker) -> Result<Completed> {
        let book_id = request.book_id;

        let book = self
            .repository
            .find_book(book_id)
            .await?
            .ok_or(GenerationError::BookNotFound(book_id))?;
        if !book.status.is_eligible_for_generation() {
            return Err(GenerationError::NotEligible {
                status: book.status,
            });
        }
        if book.pdf.is_some() && !request.options.force {
            return Err(GenerationError::PdfExists);
        }
        let expected_pdf_url = book.pdf_url().map(str::to_string);

        tracker.advance(GenerationStage::LayingOut);
        let pages = self.repository.list_pages(book_id).await?;
        let placements: Vec<_> = self
            .repository
            .list_placements(book_id)
            .await?
            .into_iter()
            .filter(|placement| placement.active)
            .collect();

        let page_numbers: HashMap<_, _> = pages.iter().map(|p| (p.id, p.page_number)).collect();
        let specs: Vec<PageSpec> = pages
            .iter()
            .map(|page| PageSpec {
                page_number: page.page_number,
                layout: page.layout,
                capacity: self.options.capacity(page.layout),
            })
            .collect();

        let mut items = Vec::with_capacity(placements.len());
        for placement in &placements {
            let page_number = *page_numbers.get(&placement.page_id).ok_or_else(|| {
                RepositoryError::Corrupt(format!(
                    "placement {} refers to page {} of another book",
                    placement.id, placement.page_id
                ))
            })?;
            items.push(LayoutItem {
                size: placement.size,
                pin: placement
                    .position
                    .map(|position| SlotRef::new(page_number, position)),
            });
        }

        let plan = plan_layout(&items, &specs, book.total_pages, self.options.units_per_page)?;
        info!(
            "Book {}: {} placements laid out on {} pages",
            book_id,
            items.len(),
            plan.page_count()
        );

        tracker.advance(GenerationStage::ResolvingContent);
        let contents: Vec<PlacementContent> = placements.iter().map(|p| p.content.clone()).collect();
        let locale = book
            .metadata
            .locale
            .as_deref()
            .unwrap_or(&self.options.default_locale);
        let blocks = resolve_content(&self.services, &contents, locale).await?;

        tracker.advance(GenerationStage::Rendering);
        let sizes: Vec<PlacementSize> = placements.iter().map(|p| p.size).collect();
        let input = RenderInput::assemble(&book, &plan, &sizes, blocks);
        let rendered = render_book_async(input, self.options.clone()).await?;
        let warnings: Vec<String> = rendered.warnings.iter().map(|w| w.to_string()).collect();

        tracker.advance(GenerationStage::Uploading);
        let prefix = format!("{}/{}", self.options.storage_prefix, book_id);
        let stored = self.storage.save_file(rendered.bytes, &prefix).await?;

        let artifact = PdfArtifact {
            url: stored.url.clone(),
            generated_at: Utc::now(),
        };
        let commit = PdfCommit {
            book_id,
            expected_pdf_url: expected_pdf_url.clone(),
            artifact: artifact.clone(),
            updated_by: Some(request.requester_id.clone()),
        };
        if let Err(err) = self.repository.commit_pdf(commit).await {
            if let Err(cleanup) = self.storage.delete_file(&stored.url).await {
                warn!("Book {book_id}: could not remove orphaned PDF {}: {cleanup}", stored.url);
            }
            return Err(err.into());
        }

        if let Some(previous) = expected_pdf_url.filter(|url| *url != stored.url) {
            if let Err(err) = self.storage.delete_file(&previous).await {
                warn!("Book {book_id}: could not remove replaced PDF {previous}: {err}");
            }
        }

        Ok(Completed {
            artifact,
            page_count: rendered.page_count,
            warnings,
        })
    }
}
