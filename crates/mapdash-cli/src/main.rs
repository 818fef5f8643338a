use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mapdash_category::{CategoryWidgetConfig, CategoryWidgetModel};
use mapdash_events::{FetchResponse, FetchTarget, InMemoryBoundary, WidgetEvent};
use mapdash_windshaft::{Client, ClientOptions, ReqwestTransport};
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Instantiate a map on a tiler, or print the planned request
    Instantiate {
        /// Client options (urlTemplate, userName, endpoint, statTag, forceCors)
        #[arg(short, long)]
        options: PathBuf,

        /// Map definition sent as the layergroup config
        #[arg(short, long)]
        map: PathBuf,

        /// Dataview filters applied at instantiation
        #[arg(short, long)]
        filters: Option<PathBuf>,

        /// Print the request instead of sending it
        #[arg(long)]
        dry_run: bool,

        /// Also print the aggregation url of this dataview
        #[arg(long)]
        dataview: Option<String>,
    },
    /// Run a category widget against recorded aggregation responses
    Simulate {
        /// Widget configuration
        #[arg(short, long)]
        config: PathBuf,

        /// Aggregation response answering the main and range fetches
        #[arg(short, long)]
        payload: PathBuf,

        /// Categories to accept before fetching
        #[arg(long, value_delimiter = ',')]
        accept: Vec<String>,

        /// Categories to reject before fetching
        #[arg(long, value_delimiter = ',')]
        reject: Vec<String>,

        /// Lock the accepted categories
        #[arg(long)]
        lock: bool,

        /// Search query to run after the data arrives
        #[arg(long, requires = "search_payload")]
        search: Option<String>,

        /// Response answering the search fetch
        #[arg(long)]
        search_payload: Option<PathBuf>,

        /// Apply category colors
        #[arg(long)]
        colors: bool,
    },
}

fn read_json(path: &Path) -> Result<Value> {
    let content =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

fn instantiate(
    options: &Path,
    map: &Path,
    filters: Option<&Path>,
    dry_run: bool,
    dataview: Option<&str>,
) -> Result<()> {
    let options: ClientOptions = serde_json::from_value(read_json(options)?)?;
    let client = Client::new(options)?;
    let map_definition = read_json(map)?;
    let filters = filters.map(read_json).transpose()?;

    if dry_run {
        let request = client.build_request(&map_definition, filters.as_ref());
        println!("{}", serde_json::to_string_pretty(&request)?);
        return Ok(());
    }

    let transport = ReqwestTransport::new()?;
    match client.instantiate_map(&map_definition, filters.as_ref(), &transport) {
        Ok(instance) => {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "baseUrl": instance.base_url(),
                    "layergroup": instance.layergroup(),
                    "dataviewUrl": dataview.and_then(|id| instance.dataview_url(id)),
                }))?
            );
            Ok(())
        }
        Err(error) => anyhow::bail!(error.message()),
    }
}

/// Answer every queued request for `target` with `body`.
fn answer(boundary: &InMemoryBoundary, targets: &[FetchTarget], body: &Value) -> Result<()> {
    for request in boundary.take_requests() {
        if targets.contains(&request.target) {
            boundary.publish_response(FetchResponse::success(&request, body.clone()))?;
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn simulate(
    config: &Path,
    payload: &Path,
    accept: Vec<String>,
    reject: Vec<String>,
    lock: bool,
    search: Option<String>,
    search_payload: Option<&Path>,
    colors: bool,
) -> Result<()> {
    let config = CategoryWidgetConfig::load(config)?;
    let payload = read_json(payload)?;
    let boundary = InMemoryBoundary::new();
    let mut model = CategoryWidgetModel::new(config, boundary.clone())?;
    let subscription = model.subscribe();

    if !accept.is_empty() {
        model.accept_filters(accept);
    }
    if !reject.is_empty() {
        model.reject_filters(reject);
    }
    if colors {
        model.apply_category_colors();
    }
    if lock {
        model.lock_categories();
    } else {
        model.fetch();
    }
    answer(&boundary, &[FetchTarget::Main, FetchTarget::Range], &payload)?;
    let handled = model.process_responses();
    info!(handled, size = model.size(), "main data loaded");

    if let (Some(query), Some(search_payload)) = (search, search_payload) {
        model.setup_search();
        model.set_search_query(query);
        if model.apply_search() {
            answer(&boundary, &[FetchTarget::Search], &read_json(search_payload)?)?;
            model.process_responses();
        }
    }

    let events: Vec<WidgetEvent> = subscription.drain();
    let report = json!({
        "url": model.url(),
        "locked": model.is_locked(),
        "totalCount": model.total_count(),
        "totalCategoriesCount": model.total_categories_count(),
        "data": model.data(),
        "search": {
            "query": model.search_query(),
            "applied": model.is_search_applied(),
            "results": model.search_result(),
        },
        "events": events,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    match args.command {
        Command::Instantiate {
            options,
            map,
            filters,
            dry_run,
            dataview,
        } => instantiate(
            &options,
            &map,
            filters.as_deref(),
            dry_run,
            dataview.as_deref(),
        ),
        Command::Simulate {
            config,
            payload,
            accept,
            reject,
            lock,
            search,
            search_payload,
            colors,
        } => simulate(
            &config,
            &payload,
            accept,
            reject,
            lock,
            search,
            search_payload.as_deref(),
            colors,
        ),
    }
}
