//! Runs against the database in `DATABASE_URL`; skipped when it is unset.

use chrono::Utc;
use uuid::Uuid;
use voucher_book::store::{BookRepository, PdfCommit};
use voucher_book::*;
use voucher_book_store::PgBookRepository;

async fn repository() -> Option<PgBookRepository> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let repo = PgBookRepository::connect(&url).await.unwrap();
    repo.migrate().await.unwrap();
    Some(repo)
}

async fn seed(repo: &PgBookRepository) -> (BookId, PageId) {
    let book = VoucherBook::draft("Downtown Deals", 2026, Some(3), 4);
    repo.insert_book(&book).await.unwrap();
    let page = VoucherBookPage {
        id: Uuid::new_v4(),
        book_id: book.id,
        page_number: 1,
        layout: PageLayout::Standard,
    };
    repo.insert_page(&page).await.unwrap();
    (book.id, page.id)
}

fn commit(book_id: BookId, expected: Option<&str>, url: &str) -> PdfCommit {
    PdfCommit {
        book_id,
        expected_pdf_url: expected.map(str::to_string),
        artifact: PdfArtifact {
            url: url.to_string(),
            generated_at: Utc::now(),
        },
        updated_by: Some("editor-1".into()),
    }
}

#[tokio::test]
async fn test_commit_is_guarded() {
    let Some(repo) = repository().await else {
        return;
    };
    let (book_id, _) = seed(&repo).await;

    let book = repo.commit_pdf(commit(book_id, None, "https://cdn.test/a.pdf")).await.unwrap();
    assert_eq!(book.status, BookStatus::ReadyForPrint);
    assert_eq!(book.pdf_url(), Some("https://cdn.test/a.pdf"));

    let err = repo
        .commit_pdf(commit(book_id, None, "https://cdn.test/b.pdf"))
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::Conflict(_)));

    let missing = repo
        .commit_pdf(commit(Uuid::new_v4(), None, "https://cdn.test/c.pdf"))
        .await
        .unwrap_err();
    assert!(matches!(missing, RepositoryError::NotFound(_)));

    repo.delete_book(book_id).await.unwrap();
}

#[tokio::test]
async fn test_placements_round_trip_in_order() {
    let Some(repo) = repository().await else {
        return;
    };
    let (book_id, page_id) = seed(&repo).await;

    let pinned = AdPlacement {
        id: Uuid::new_v4(),
        page_id,
        position: Some(2),
        size: PlacementSize::Quarter,
        content: PlacementContent::Image {
            image_url: "banner.png".into(),
            caption: None,
        },
        active: true,
        display_order: 0,
    };
    let floating = AdPlacement {
        id: Uuid::new_v4(),
        position: None,
        content: PlacementContent::Voucher {
            voucher_id: "v-1".into(),
        },
        ..pinned.clone()
    };
    repo.insert_placement(&floating).await.unwrap();
    repo.insert_placement(&pinned).await.unwrap();

    let placements = repo.list_placements(book_id).await.unwrap();
    assert_eq!(placements, vec![pinned, floating]);

    repo.delete_book(book_id).await.unwrap();
    assert!(repo.list_placements(book_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_removes_distributions() {
    let Some(repo) = repository().await else {
        return;
    };
    let (book_id, _) = seed(&repo).await;
    let distribution = BookDistribution {
        id: Uuid::new_v4(),
        book_id,
        business_location_id: "loc-1".into(),
        quantity: 50,
        status: DistributionStatus::Pending,
        shipped_at: None,
        delivered_at: None,
        created_at: Utc::now(),
    };
    repo.insert_distribution(&distribution).await.unwrap();

    let shipped = repo
        .update_distribution_status(distribution.id, DistributionStatus::Shipped)
        .await
        .unwrap();
    assert!(shipped.shipped_at.is_some());
    assert!(matches!(
        repo.update_distribution_status(distribution.id, DistributionStatus::Pending)
            .await,
        Err(RepositoryError::InvalidTransition { .. })
    ));

    repo.delete_book(book_id).await.unwrap();
    assert!(repo.list_distributions(book_id).await.unwrap().is_empty());
    assert!(repo.find_book(book_id).await.unwrap().is_none());
}
