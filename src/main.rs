use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use vineyard::render::ElementHandle;
use vineyard::{
    AppConfig, AppError, CatalogStore, ConsoleRenderer, FeedbackAction, ItemDescriptor, Renderer,
    ScanOrchestrator, SqliteCatalog, VineApiClient,
};

#[derive(Parser)]
#[command(name = "vineyard", version, about = "Catalogs listed items and keeps their variant pricing fresh")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process one listing page worth of item descriptors (JSON array)
    Visit { descriptors: PathBuf },
    /// Apply a classification: interested, not-interested or hidden
    Mark { action: FeedbackAction, item_key: String },
    /// Render one cataloged item
    Show { item_key: String },
    /// Render the most recently found items
    List {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

fn not_cataloged(item_key: &str) -> AppError {
    AppError::NotFound {
        resource: format!("item {}", item_key),
    }
}

fn init_tracing(config: &AppConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("vineyard={}", config.logging.level)));

    match &config.logging.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, "vineyard.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = AppConfig::from_env().context("Failed to load configuration")?;
    let _guard = init_tracing(&config);

    info!("Starting Vineyard...");

    let catalog = SqliteCatalog::connect(&config.database)
        .await
        .context("Failed to open catalog")?;
    let store: Arc<dyn CatalogStore> = Arc::new(catalog.clone());
    let renderer: Arc<dyn Renderer> = Arc::new(ConsoleRenderer::new(config.render.clone()));

    match cli.command {
        Command::Visit { descriptors } => {
            let raw = tokio::fs::read_to_string(&descriptors)
                .await
                .with_context(|| format!("Failed to read {}", descriptors.display()))?;
            let descriptors: Vec<ItemDescriptor> =
                serde_json::from_str(&raw).context("Descriptors must be a JSON array")?;

            let api = Arc::new(VineApiClient::new(&config.api)?);
            let orchestrator = ScanOrchestrator::new(store, api, renderer, &config);

            orchestrator.visit_page(descriptors).await?;

            let queue = orchestrator.queue();
            if !queue.is_idle() {
                info!(
                    "Waiting for {} deep scans",
                    queue.pending_len() + usize::from(queue.is_busy())
                );
                queue.wait_until_idle().await;
            }
        }
        Command::Mark { action, item_key } => {
            let api = Arc::new(VineApiClient::new(&config.api)?);
            let orchestrator = ScanOrchestrator::new(store, api, renderer, &config);

            if orchestrator.feedback().dispatch(action, &item_key).await?.is_none() {
                return Err(not_cataloged(&item_key).into());
            }
        }
        Command::Show { item_key } => match store.get(&item_key).await? {
            Some(item) => renderer.render(&ElementHandle::for_item(&item), &item),
            None => return Err(not_cataloged(&item_key).into()),
        },
        Command::List { limit } => {
            for item in store.list_recent(limit).await? {
                renderer.render(&ElementHandle::for_item(&item), &item);
            }
        }
    }

    catalog.close().await;
    info!("Shutting down...");

    Ok(())
}
