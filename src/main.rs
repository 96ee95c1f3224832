//! CLI entry point for the food facts rater.
//!
//! Provides subcommands for refreshing the product table from OpenFoodFacts,
//! looking up single products, printing a filtered analysis report and
//! exporting CSV downloads.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use food_facts_rater::config::{Config, PageFailurePolicy};
use food_facts_rater::export::{quality_csv, records_csv, summary_csv, table_csv, write_export};
use food_facts_rater::fetch::{BasicClient, ProductFetcher, WithHeader};
use food_facts_rater::filter::ProductFilter;
use food_facts_rater::output::{REPORT_NUTRIENTS, Report, print_json, print_pretty};
use food_facts_rater::product::ProductTable;
use food_facts_rater::store::DataStore;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

type Fetcher = ProductFetcher<WithHeader<BasicClient>>;

#[derive(Parser)]
#[command(name = "food_facts_rater")]
#[command(about = "Fetch, score and analyze OpenFoodFacts products for a country", long_about = None)]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Settings {
    /// CSV file holding the normalized product table
    #[arg(long, global = true, default_value = "data/processed/openfoodfacts_india.csv")]
    data_file: String,

    /// OpenFoodFacts base URL
    #[arg(long, global = true, env = "OFF_BASE_URL", default_value = "https://world.openfoodfacts.org")]
    base_url: String,

    /// Country tag used to filter products
    #[arg(long, global = true, env = "OFF_COUNTRY", default_value = "india")]
    country: String,

    /// Maximum number of search pages to request
    #[arg(long, global = true, default_value_t = 50)]
    max_pages: u32,

    /// Records requested per page
    #[arg(long, global = true, default_value_t = 1000)]
    page_size: u32,

    /// Retries per failed page before giving up on it
    #[arg(long, global = true, default_value_t = 2)]
    retries: u32,

    /// Stop the whole fetch when a page keeps failing instead of skipping it
    #[arg(long, global = true, default_value_t = false)]
    abort_on_page_failure: bool,

    /// Age in hours after which the saved table is refetched
    #[arg(long, global = true, default_value_t = 24)]
    staleness_hours: u64,
}

impl Settings {
    fn into_config(self) -> Config {
        let mut config = Config::default();
        config.fetch.base_url = self.base_url;
        config.fetch.country = self.country;
        config.fetch.page_size = self.page_size;
        config.fetch.retries = self.retries;
        if self.abort_on_page_failure {
            config.fetch.on_page_failure = PageFailurePolicy::Abort;
        }
        config.store.data_file = self.data_file;
        config.store.max_pages = self.max_pages;
        config.store.staleness = Duration::from_secs(self.staleness_hours * 60 * 60);
        config
    }
}

#[derive(Args)]
struct FilterArgs {
    /// Only include these brands (repeatable)
    #[arg(long = "brand")]
    brands: Vec<String>,

    /// Only include these categories (repeatable)
    #[arg(long = "category")]
    categories: Vec<String>,

    /// Lowest nutrient score to include
    #[arg(long, default_value_t = 0.0)]
    min_score: f64,

    /// Highest nutrient score to include
    #[arg(long, default_value_t = 10.0)]
    max_score: f64,
}

impl From<FilterArgs> for ProductFilter {
    fn from(args: FilterArgs) -> Self {
        ProductFilter {
            brands: args.brands,
            categories: args.categories,
            score_range: (args.min_score, args.max_score),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch all products now and overwrite the saved table
    Fetch,
    /// Look up a single product by its barcode
    Product {
        #[arg(value_name = "CODE")]
        code: String,
    },
    /// Print the analysis report for the (filtered) product table as JSON
    Report {
        #[command(flatten)]
        filter: FilterArgs,

        /// Rows kept in each ranking
        #[arg(short = 'n', long, default_value_t = 10)]
        top: usize,

        /// Nutrient columns to describe (defaults to all per-100g columns)
        #[arg(long = "nutrient")]
        nutrients: Vec<String>,
    },
    /// Write CSV downloads for the (filtered) product table
    Export {
        #[command(flatten)]
        filter: FilterArgs,

        /// Directory to write the CSV files into
        #[arg(short, long, default_value = "exports")]
        output_dir: String,

        /// Rows kept in each ranking
        #[arg(short = 'n', long, default_value_t = 10)]
        top: usize,

        /// Gzip compress the written files
        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/food_facts_rater.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("food_facts_rater.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let config = cli.settings.into_config();
    config.validate()?;

    let client = WithHeader::user_agent(BasicClient::new()?, &config.fetch.user_agent)?;
    let fetcher = ProductFetcher::new(client, config.fetch.clone());
    let store = DataStore::new(&config.store.data_file, config.store.staleness);

    match cli.command {
        Commands::Fetch => {
            let table = store
                .refresh(&fetcher, config.store.max_pages, &config.score)
                .await?;
            info!(rows = table.len(), path = %store.path().display(), "Product table refreshed");
        }
        Commands::Product { code } => match fetcher.fetch_product_by_code(&code).await {
            Some(product) => println!("{}", serde_json::to_string_pretty(&product)?),
            None => warn!(code = %code, "Product not found"),
        },
        Commands::Report {
            filter,
            top,
            nutrients,
        } => {
            let Some(table) = load_filtered(&store, &fetcher, &config, filter.into()).await? else {
                return Ok(());
            };

            let nutrients: Vec<&str> = if nutrients.is_empty() {
                REPORT_NUTRIENTS.to_vec()
            } else {
                nutrients.iter().map(String::as_str).collect()
            };

            let report = Report::build(
                &table,
                top,
                &nutrients,
                config.score.salt.high,
                store.modified_at(),
            )?;
            print_pretty(&report);
            print_json(&report)?;
        }
        Commands::Export {
            filter,
            output_dir,
            top,
            gzip,
        } => {
            let Some(table) = load_filtered(&store, &fetcher, &config, filter.into()).await? else {
                return Ok(());
            };
            export_all(&table, Path::new(&output_dir), top, config.score.salt.high, gzip)?;
        }
    }

    Ok(())
}

/// Loads (or refreshes) the table and applies the filter.
///
/// Returns `None` after telling the user when there is nothing to analyze.
async fn load_filtered(
    store: &DataStore,
    fetcher: &Fetcher,
    config: &Config,
    filter: ProductFilter,
) -> Result<Option<ProductTable>> {
    let table = store
        .load_or_refresh(fetcher, config.store.max_pages, &config.score)
        .await?;
    if table.is_empty() {
        warn!("No data available. Check your internet connection and try again.");
        return Ok(None);
    }

    let filtered = filter.apply(&table);
    if filtered.is_empty() {
        warn!(total = table.len(), "No products match the selected filters");
        return Ok(None);
    }

    info!(total = table.len(), selected = filtered.len(), "Filters applied");
    Ok(Some(filtered))
}

#[tracing::instrument(skip(table), fields(rows = table.len()))]
fn export_all(
    table: &ProductTable,
    output_dir: &Path,
    top: usize,
    salt_limit: f64,
    gzip: bool,
) -> Result<()> {
    let report = Report::build(table, top, &[], salt_limit, None)?;

    let files: Vec<(&str, Vec<u8>)> = vec![
        ("openfoodfacts_filtered.csv", table_csv(table)?),
        ("summary_report.csv", summary_csv(&report.summary)?),
        ("quality_metrics.csv", quality_csv(&report.quality)?),
        ("top_brands.csv", records_csv(&report.top_brands)?),
        ("healthiest_products.csv", records_csv(&report.healthiest)?),
        ("additive_prevalence.csv", records_csv(&report.additives)?),
        ("category_analysis.csv", records_csv(&report.categories)?),
    ];

    let mut written: Vec<PathBuf> = Vec::with_capacity(files.len());
    for (name, bytes) in files {
        written.push(write_export(&output_dir.join(name), &bytes, gzip)?);
    }

    info!(files = written.len(), dir = %output_dir.display(), "Exports written");
    Ok(())
}
