mod fixture;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use uuid::Uuid;
use voucher_book::rate_limit::{FixedWindowRateLimiter, Unlimited};
use voucher_book::resolve::{FileAssetFetcher, LocalCodeService, StaticCatalog};
use voucher_book::*;
use voucher_book_store::PgBookRepository;

use fixture::{Bundle, LayoutInput};

#[derive(Parser)]
#[command(name = "vbk", about = "Voucher book PDF generator", version)]
struct Cli {
    /// Generator options (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lay out placement sizes and print the plan
    Layout {
        /// Layout input (JSON: total_pages, pages, items)
        #[arg(short, long)]
        input: PathBuf,

        /// Print statistics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Render a book bundle to PDF without a database
    Render {
        /// Book bundle (JSON: book, pages, placements, catalog)
        #[arg(short, long)]
        input: PathBuf,

        /// Output PDF file
        #[arg(short, long)]
        output: PathBuf,

        /// Directory image URLs resolve against (defaults to the bundle's directory)
        #[arg(long)]
        assets: Option<PathBuf>,

        /// Output paper size
        #[arg(long, value_enum)]
        paper: Option<PaperArg>,

        /// Leave out page numbers
        #[arg(long)]
        no_page_numbers: bool,
    },

    /// Load a book bundle into the database
    Import {
        #[arg(long, env = "DATABASE_URL")]
        database_url: String,

        /// Book bundle (JSON); its catalog is ignored
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Generate and publish the PDF of a stored book
    Generate {
        #[arg(long, env = "DATABASE_URL")]
        database_url: String,

        #[arg(long)]
        book_id: Uuid,

        /// Who is asking; rate limits apply per requester
        #[arg(long)]
        requester: String,

        /// Replace an existing PDF
        #[arg(long)]
        force: bool,

        #[arg(long, default_value = "normal", value_enum)]
        priority: PriorityArg,

        /// Voucher and provider catalog (JSON)
        #[arg(long)]
        catalog: PathBuf,

        /// Directory image URLs resolve against
        #[arg(long)]
        assets: Option<PathBuf>,

        /// Where generated PDFs are stored
        #[arg(long, default_value = "voucher-book-files")]
        storage_dir: PathBuf,

        /// Public URL of the storage directory
        #[arg(long, default_value = "http://localhost:8080/files")]
        public_url: String,

        /// Base URL of voucher redemption links
        #[arg(long, default_value = "http://localhost:8080")]
        redeem_url: String,

        /// Secret short codes are derived from
        #[arg(long, env = "VBK_CODE_SECRET", hide_env_values = true)]
        code_secret: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum PaperArg {
    A4,
    A5,
    Letter,
    Legal,
}

#[derive(Clone, Copy, ValueEnum)]
enum PriorityArg {
    Low,
    Normal,
    High,
}

impl From<PaperArg> for PaperSize {
    fn from(arg: PaperArg) -> Self {
        match arg {
            PaperArg::A4 => Self::A4,
            PaperArg::A5 => Self::A5,
            PaperArg::Letter => Self::Letter,
            PaperArg::Legal => Self::Legal,
        }
    }
}

impl From<PriorityArg> for Priority {
    fn from(arg: PriorityArg) -> Self {
        match arg {
            PriorityArg::Low => Self::Low,
            PriorityArg::Normal => Self::Normal,
            PriorityArg::High => Self::High,
        }
    }
}

async fn load_options(config: Option<&Path>) -> Result<GeneratorOptions> {
    match config {
        Some(path) => GeneratorOptions::load(path)
            .await
            .with_context(|| format!("Failed to load options from {}", path.display())),
        None => Ok(GeneratorOptions::default()),
    }
}

fn bundle_dir(input: &Path) -> PathBuf {
    input
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn print_outcome(outcome: &GenerationOutcome) -> Result<()> {
    for warning in &outcome.warnings {
        eprintln!("warning: {warning}");
    }
    if !outcome.success {
        let stage = outcome
            .failed_stage
            .map(|stage| format!(" during {stage}"))
            .unwrap_or_default();
        bail!(
            "Generation failed{stage}: {}",
            outcome.error.as_deref().unwrap_or("unknown error")
        );
    }
    println!("{}", serde_json::to_string_pretty(outcome)?);
    Ok(())
}

async fn run_layout(input: &Path, json: bool, options: &GeneratorOptions) -> Result<()> {
    let layout = LayoutInput::load(input).await?;
    let items = layout.items()?;
    let pages = layout.page_specs(|kind| options.capacity(kind));
    let plan = plan_layout(&items, &pages, layout.total_pages, options.units_per_page)?;
    let stats = calculate_statistics(&plan, &layout.kinds());

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("Layout Plan:");
    for page in &plan.pages {
        let added = if page.allocated { ", added" } else { "" };
        println!(
            "  Page {} ({}, {}/{} units{added})",
            page.page_number,
            page.layout.as_str(),
            page.used_units,
            page.capacity
        );
        for index in plan.items_on_page(page.page_number) {
            println!(
                "    #{index} {} at {}",
                items[index].size.as_str(),
                plan.slots[index].position
            );
        }
    }
    println!("Layout Statistics:");
    println!("  Pages used: {}", stats.pages_used);
    println!("  Pages added: {}", stats.pages_allocated);
    println!("  Units used: {}/{}", stats.units_used, stats.units_total);
    println!("  Fill: {:.0}%", stats.fill_ratio * 100.0);
    Ok(())
}

async fn run_render(
    input: &Path,
    output: &Path,
    assets: Option<PathBuf>,
    options: GeneratorOptions,
) -> Result<()> {
    let bundle = Bundle::load(input).await?;
    let book_id = bundle.book.id;

    let repo = Arc::new(MemoryBookRepository::new());
    bundle.seed_memory(&repo).await;

    let staging = std::env::temp_dir().join(format!("vbk-{}", Uuid::new_v4()));
    let base_url = format!("file://{}", staging.display());
    let storage = Arc::new(LocalFileStorage::new(&staging, base_url).await?);

    let catalog = Arc::new(bundle.catalog);
    let services = ContentServices {
        vouchers: catalog.clone(),
        providers: catalog,
        codes: Arc::new(LocalCodeService::new("offline", "https://example.invalid")),
        assets: Arc::new(FileAssetFetcher::with_root(
            assets.unwrap_or_else(|| bundle_dir(input)),
        )),
    };
    let generator = BookPdfGenerator::new(repo, services, storage.clone(), Arc::new(Unlimited), options);

    let outcome = generator
        .generate(GenerationRequest::new(book_id, "vbk").forced())
        .await;
    let result = match outcome.pdf_url.as_deref() {
        Some(url) if outcome.success => {
            let stored = storage.path_for(url)?;
            tokio::fs::copy(&stored, output)
                .await
                .with_context(|| format!("Failed to write {}", output.display()))?;
            print_outcome(&outcome)
        }
        _ => print_outcome(&outcome),
    };

    if let Err(err) = tokio::fs::remove_dir_all(&staging).await {
        log::warn!("Could not remove {}: {err}", staging.display());
    }
    result?;
    println!("Rendered {} → {}", book_id, output.display());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let mut options = load_options(cli.config.as_deref()).await?;

    match cli.command {
        Commands::Layout { input, json } => {
            run_layout(&input, json, &options).await?;
        }

        Commands::Render {
            input,
            output,
            assets,
            paper,
            no_page_numbers,
        } => {
            if let Some(paper) = paper {
                options.paper_size = paper.into();
            }
            if no_page_numbers {
                options.add_page_numbers = false;
            }
            options.validate()?;
            run_render(&input, &output, assets, options).await?;
        }

        Commands::Import {
            database_url,
            input,
        } => {
            let bundle = Bundle::load(&input).await?;
            let repo = PgBookRepository::connect(&database_url).await?;
            repo.migrate().await?;
            bundle.import(&repo).await?;
            println!(
                "Imported book {} ({} pages, {} placements)",
                bundle.book.id,
                bundle.pages.len(),
                bundle.placements.len()
            );
        }

        Commands::Generate {
            database_url,
            book_id,
            requester,
            force,
            priority,
            catalog,
            assets,
            storage_dir,
            public_url,
            redeem_url,
            code_secret,
        } => {
            let repo = Arc::new(PgBookRepository::connect(&database_url).await?);
            let catalog = Arc::new(StaticCatalog::load(&catalog).await?);
            let services = ContentServices {
                vouchers: catalog.clone(),
                providers: catalog,
                codes: Arc::new(LocalCodeService::new(code_secret, redeem_url)),
                assets: Arc::new(match assets {
                    Some(root) => FileAssetFetcher::with_root(root),
                    None => FileAssetFetcher::new(),
                }),
            };
            let storage = Arc::new(LocalFileStorage::new(storage_dir, public_url).await?);
            let limiter = Arc::new(FixedWindowRateLimiter::from_options(&options.rate_limit));
            let generator = BookPdfGenerator::new(repo, services, storage, limiter, options);

            let mut request = GenerationRequest::new(book_id, requester);
            request.options.force = force;
            request.options.priority = priority.into();
            print_outcome(&generator.generate(request).await)?;
        }
    }

    Ok(())
}
