use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use lopdf::Document;
use uuid::Uuid;
use voucher_book::rate_limit::{FixedWindowRateLimiter, RateLimiter, Unlimited};
use voucher_book::resolve::{
    Discount, FileAssetFetcher, LocalCodeService, LocalizedText, StaticCatalog, VoucherSummary,
};
use voucher_book::*;

struct Fixture {
    repo: Arc<MemoryBookRepository>,
    storage: Arc<MemoryFileStorage>,
    generator: BookPdfGenerator,
    _assets: tempfile::TempDir,
}

fn voucher(id: &str) -> VoucherSummary {
    VoucherSummary {
        id: id.to_string(),
        provider_id: "p-1".to_string(),
        title: LocalizedText::new("en", format!("Voucher {id}")),
        description: LocalizedText::new("en", "Valid at all locations"),
        discount: Discount::percentage(20.0),
        expires_at: None,
    }
}

fn catalog() -> StaticCatalog {
    let mut catalog = StaticCatalog::new().with_provider("p-1", "Corner Cafe");
    for id in ["v-1", "v-2", "v-3", "v-4"] {
        catalog = catalog.with_voucher(voucher(id));
    }
    catalog
}

fn write_png(dir: &std::path::Path) {
    let img = image::RgbImage::from_pixel(8, 8, image::Rgb([200, 40, 40]));
    img.save(dir.join("banner.png")).unwrap();
}

fn fixture_with(catalog: StaticCatalog, limiter: Arc<dyn RateLimiter>) -> Fixture {
    let assets = tempfile::tempdir().unwrap();
    write_png(assets.path());

    let catalog = Arc::new(catalog);
    let services = ContentServices {
        vouchers: catalog.clone(),
        providers: catalog,
        codes: Arc::new(LocalCodeService::new("test-secret", "https://vouchers.test")),
        assets: Arc::new(FileAssetFetcher::with_root(assets.path())),
    };
    let repo = Arc::new(MemoryBookRepository::new());
    let storage = Arc::new(MemoryFileStorage::new());
    let generator = BookPdfGenerator::new(
        repo.clone(),
        services,
        storage.clone(),
        limiter,
        GeneratorOptions::default(),
    );

    Fixture {
        repo,
        storage,
        generator,
        _assets: assets,
    }
}

fn fixture() -> Fixture {
    fixture_with(catalog(), Arc::new(Unlimited))
}

fn page(book_id: BookId, page_number: u32) -> VoucherBookPage {
    VoucherBookPage {
        id: Uuid::new_v4(),
        book_id,
        page_number,
        layout: PageLayout::Standard,
    }
}

fn placement(page_id: PageId, position: Option<u8>, size: PlacementSize, content: PlacementContent) -> AdPlacement {
    AdPlacement {
        id: Uuid::new_v4(),
        page_id,
        position,
        size,
        content,
        active: true,
        display_order: 0,
    }
}

fn voucher_content(id: &str) -> PlacementContent {
    PlacementContent::Voucher {
        voucher_id: id.to_string(),
    }
}

/// Two pages: HALF + QUARTER + SINGLE on page 1, one FULL on page 2
async fn seed_two_page_book(repo: &MemoryBookRepository) -> BookId {
    let book = VoucherBook::draft("Downtown Deals", 2026, Some(3), 2);
    let book_id = book.id;
    repo.insert_book(book).await;

    let first = page(book_id, 1);
    let second = page(book_id, 2);
    let placements = [
        placement(first.id, Some(0), PlacementSize::Half, voucher_content("v-1")),
        placement(
            first.id,
            Some(4),
            PlacementSize::Quarter,
            PlacementContent::Image {
                image_url: "banner.png".into(),
                caption: Some("Spring market".into()),
            },
        ),
        placement(first.id, Some(6), PlacementSize::Single, voucher_content("v-2")),
        placement(second.id, Some(0), PlacementSize::Full, voucher_content("v-3")),
    ];
    repo.insert_page(first).await;
    repo.insert_page(second).await;
    for p in placements {
        repo.insert_placement(p).await;
    }
    book_id
}

async fn seed_single_voucher_book(repo: &MemoryBookRepository) -> BookId {
    let book = VoucherBook::draft("Weekly", 2026, None, 1);
    let book_id = book.id;
    repo.insert_book(book).await;
    let first = page(book_id, 1);
    repo.insert_placement(placement(first.id, None, PlacementSize::Half, voucher_content("v-4")))
        .await;
    repo.insert_page(first).await;
    book_id
}

#[tokio::test]
async fn test_two_page_book_generates() {
    let fx = fixture();
    let book_id = seed_two_page_book(&fx.repo).await;
    let started = Utc::now();

    let outcome = fx.generator.generate(GenerationRequest::new(book_id, "editor-1")).await;
    assert!(outcome.success, "unexpected failure: {:?}", outcome.error);
    assert_eq!(outcome.page_count, Some(2));
    assert!(outcome.warnings.is_empty());

    let url = outcome.pdf_url.clone().unwrap();
    assert!(url.contains("/voucher-books/"));
    assert!(url.contains(&book_id.to_string()));

    let book = fx.repo.find_book(book_id).await.unwrap().unwrap();
    assert_eq!(book.status, BookStatus::ReadyForPrint);
    assert_eq!(book.pdf_url(), Some(url.as_str()));
    let generated_at = book.pdf.as_ref().unwrap().generated_at;
    assert!(generated_at >= started);
    assert_eq!(outcome.generated_at, Some(generated_at));
    assert_eq!(book.updated_by.as_deref(), Some("editor-1"));

    let bytes = fx.storage.get(&url).unwrap();
    let doc = Document::load_mem(&bytes).unwrap();
    assert_eq!(doc.get_pages().len(), 2);
}

#[tokio::test]
async fn test_book_without_content_reports_no_vouchers() {
    let fx = fixture();
    let book = VoucherBook::draft("Empty", 2026, Some(4), 4);
    let book_id = book.id;
    fx.repo.insert_book(book).await;
    fx.repo.insert_page(page(book_id, 1)).await;

    let outcome = fx.generator.generate(GenerationRequest::new(book_id, "editor-1")).await;
    assert!(!outcome.success);
    assert!(outcome.error.as_deref().unwrap().contains("No vouchers found"));
    assert_eq!(outcome.error_kind, Some(ErrorKind::Resolution));
    assert_eq!(outcome.failed_stage, Some(GenerationStage::ResolvingContent));
    assert!(fx.storage.is_empty());
}

#[tokio::test]
async fn test_missing_vouchers_are_listed() {
    let fx = fixture();
    let book = VoucherBook::draft("Missing", 2026, Some(4), 1);
    let book_id = book.id;
    fx.repo.insert_book(book).await;
    let first = page(book_id, 1);
    fx.repo
        .insert_placement(placement(first.id, None, PlacementSize::Single, voucher_content("v-404")))
        .await;
    fx.repo
        .insert_placement(placement(first.id, None, PlacementSize::Single, voucher_content("v-1")))
        .await;
    fx.repo.insert_page(first).await;

    let outcome = fx.generator.generate(GenerationRequest::new(book_id, "editor-1")).await;
    assert!(!outcome.success);
    assert_eq!(outcome.error.as_deref(), Some("Vouchers not found: v-404"));
}

#[tokio::test]
async fn test_existing_pdf_requires_force() {
    let fx = fixture();
    let book_id = seed_single_voucher_book(&fx.repo).await;

    let first = fx.generator.generate(GenerationRequest::new(book_id, "editor-1")).await;
    assert!(first.success);
    let before = fx.repo.find_book(book_id).await.unwrap().unwrap();

    let second = fx.generator.generate(GenerationRequest::new(book_id, "editor-2")).await;
    assert!(!second.success);
    assert_eq!(second.error_kind, Some(ErrorKind::Precondition));
    assert_eq!(second.failed_stage, Some(GenerationStage::Requested));
    assert_eq!(fx.repo.find_book(book_id).await.unwrap().unwrap(), before);
    assert_eq!(fx.storage.len(), 1);

    let forced = fx
        .generator
        .generate(GenerationRequest::new(book_id, "editor-2").forced())
        .await;
    assert!(forced.success);
    assert_ne!(forced.pdf_url, first.pdf_url);

    // The replaced PDF is removed once the new one is attached.
    assert_eq!(fx.storage.len(), 1);
    assert!(fx.storage.get(first.pdf_url.as_deref().unwrap()).is_none());
}

#[tokio::test]
async fn test_published_book_is_not_eligible() {
    let fx = fixture();
    let book_id = seed_single_voucher_book(&fx.repo).await;
    fx.repo
        .update_status(book_id, BookStatus::Published, Some("editor-1"), false)
        .await
        .unwrap();

    let outcome = fx
        .generator
        .generate(GenerationRequest::new(book_id, "editor-1").forced())
        .await;
    assert!(!outcome.success);
    assert!(outcome.error.unwrap().contains("published"));
}

#[tokio::test]
async fn test_unknown_book() {
    let fx = fixture();
    let outcome = fx
        .generator
        .generate(GenerationRequest::new(Uuid::new_v4(), "editor-1"))
        .await;
    assert!(!outcome.success);
    assert_eq!(outcome.error_kind, Some(ErrorKind::Precondition));
}

#[tokio::test]
async fn test_upstream_failure_passes_message_through() {
    let fx = fixture_with(
        catalog().with_failure("Voucher service unavailable"),
        Arc::new(Unlimited),
    );
    let book_id = seed_two_page_book(&fx.repo).await;

    let outcome = fx.generator.generate(GenerationRequest::new(book_id, "editor-1")).await;
    assert!(!outcome.success);
    assert_eq!(outcome.error.as_deref(), Some("Voucher service unavailable"));

    let book = fx.repo.find_book(book_id).await.unwrap().unwrap();
    assert!(book.pdf_url().is_none());
    assert_eq!(book.status, BookStatus::Draft);
}

#[tokio::test]
async fn test_insufficient_pages() {
    let fx = fixture();
    let book = VoucherBook::draft("Tight", 2026, Some(5), 1);
    let book_id = book.id;
    fx.repo.insert_book(book).await;
    let first = page(book_id, 1);
    for id in ["v-1", "v-2", "v-3"] {
        fx.repo
            .insert_placement(placement(first.id, None, PlacementSize::Half, voucher_content(id)))
            .await;
    }
    fx.repo.insert_page(first).await;

    let outcome = fx.generator.generate(GenerationRequest::new(book_id, "editor-1")).await;
    assert!(!outcome.success);
    assert_eq!(outcome.error_kind, Some(ErrorKind::Layout));
    assert!(outcome.error.unwrap().contains("Insufficient pages"));
}

#[tokio::test]
async fn test_upload_failure_leaves_book_untouched() {
    let fx = fixture();
    let book_id = seed_single_voucher_book(&fx.repo).await;
    fx.storage.set_fail_uploads(true);

    let outcome = fx.generator.generate(GenerationRequest::new(book_id, "editor-1")).await;
    assert!(!outcome.success);
    assert_eq!(outcome.error_kind, Some(ErrorKind::Storage));
    assert_eq!(outcome.failed_stage, Some(GenerationStage::Uploading));
    assert!(fx.repo.find_book(book_id).await.unwrap().unwrap().pdf.is_none());
}

#[tokio::test]
async fn test_distinct_books_generate_concurrently() {
    let fx = fixture();
    let mut ids = Vec::new();
    for _ in 0..4 {
        ids.push(seed_two_page_book(&fx.repo).await);
    }

    let outcomes = join_all(
        ids.iter()
            .map(|id| fx.generator.generate(GenerationRequest::new(*id, "editor-1"))),
    )
    .await;

    let mut urls = Vec::new();
    for (id, outcome) in ids.iter().zip(&outcomes) {
        assert!(outcome.success, "book {id} failed: {:?}", outcome.error);
        let url = outcome.pdf_url.clone().unwrap();
        assert!(url.contains(&id.to_string()));
        urls.push(url);
    }
    urls.sort();
    urls.dedup();
    assert_eq!(urls.len(), ids.len());
}

#[tokio::test]
async fn test_same_book_commits_once() {
    let fx = fixture();
    let book_id = seed_two_page_book(&fx.repo).await;

    let outcomes = join_all(
        (0..3).map(|_| fx.generator.generate(GenerationRequest::new(book_id, "editor-1"))),
    )
    .await;

    let winners: Vec<_> = outcomes.iter().filter(|o| o.success).collect();
    assert_eq!(winners.len(), 1);
    for loser in outcomes.iter().filter(|o| !o.success) {
        assert_eq!(loser.error_kind, Some(ErrorKind::Precondition));
    }

    let book = fx.repo.find_book(book_id).await.unwrap().unwrap();
    assert_eq!(book.pdf_url(), winners[0].pdf_url.as_deref());
    assert_eq!(fx.storage.len(), 1);
}

#[tokio::test]
async fn test_rate_limit_rejects_before_work() {
    let fx = fixture_with(
        catalog(),
        Arc::new(FixedWindowRateLimiter::new(1, Duration::from_secs(60))),
    );
    let book_id = seed_single_voucher_book(&fx.repo).await;

    let first = fx.generator.generate(GenerationRequest::new(book_id, "editor-1")).await;
    assert!(first.success);

    let second = fx
        .generator
        .generate(GenerationRequest::new(book_id, "editor-1").forced())
        .await;
    assert!(!second.success);
    assert_eq!(second.error_kind, Some(ErrorKind::RateLimited));
    assert_eq!(second.failed_stage, None);

    // Limits are per requester.
    let other = fx
        .generator
        .generate(GenerationRequest::new(book_id, "editor-2").forced())
        .await;
    assert!(other.success);
}

#[tokio::test]
async fn test_progress_updates_follow_stages() {
    let fx = fixture();
    let book_id = seed_single_voucher_book(&fx.repo).await;
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let generator = fx.generator.with_progress(tx);

    let outcome = generator.generate(GenerationRequest::new(book_id, "editor-1")).await;
    assert!(outcome.success);

    let mut stages = Vec::new();
    while let Ok(update) = rx.try_recv() {
        assert_eq!(update.book_id, book_id);
        stages.push(update.stage);
    }
    assert_eq!(
        stages,
        vec![
            GenerationStage::Requested,
            GenerationStage::LayingOut,
            GenerationStage::ResolvingContent,
            GenerationStage::Rendering,
            GenerationStage::Uploading,
            GenerationStage::Completed,
        ]
    );
}

#[tokio::test]
async fn test_unavailable_image_becomes_warning() {
    let fx = fixture();
    let book = VoucherBook::draft("Pictures", 2026, Some(6), 1);
    let book_id = book.id;
    fx.repo.insert_book(book).await;
    let first = page(book_id, 1);
    fx.repo
        .insert_placement(placement(
            first.id,
            None,
            PlacementSize::Quarter,
            PlacementContent::Image {
                image_url: "missing.png".into(),
                caption: None,
            },
        ))
        .await;
    fx.repo
        .insert_placement(placement(first.id, None, PlacementSize::Single, voucher_content("v-1")))
        .await;
    fx.repo.insert_page(first).await;

    let outcome = fx.generator.generate(GenerationRequest::new(book_id, "editor-1")).await;
    assert!(outcome.success, "unexpected failure: {:?}", outcome.error);
    assert_eq!(outcome.warnings.len(), 1);
    assert!(outcome.warnings[0].starts_with("page 1 position 0"));
}

#[tokio::test]
async fn test_book_of_unavailable_images_is_not_published() {
    let fx = fixture();
    let book = VoucherBook::draft("Broken pictures", 2026, Some(6), 1);
    let book_id = book.id;
    fx.repo.insert_book(book).await;
    let first = page(book_id, 1);
    fx.repo
        .insert_placement(placement(
            first.id,
            None,
            PlacementSize::Quarter,
            PlacementContent::Image {
                image_url: "/does/not/exist.png".into(),
                caption: None,
            },
        ))
        .await;
    fx.repo.insert_page(first).await;

    let outcome = fx.generator.generate(GenerationRequest::new(book_id, "editor-1")).await;
    assert!(!outcome.success);
    assert!(outcome.error.as_deref().unwrap().contains("No vouchers found"));
    assert_eq!(outcome.failed_stage, Some(GenerationStage::ResolvingContent));
    assert!(fx.storage.is_empty());

    let book = fx.repo.find_book(book_id).await.unwrap().unwrap();
    assert_eq!(book.status, BookStatus::Draft);
    assert!(book.pdf.is_none());
}
