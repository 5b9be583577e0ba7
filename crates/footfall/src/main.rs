use anyhow::{Context, Result};
use chrono::{Local, NaiveDate, Timelike};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

mod align;
mod calendar;
mod chart;
mod config;
mod data;
mod db;
mod error;
mod html;
mod parser;
mod server;
mod types;

use config::Settings;
use data::{Dataset, SelectionQuery};

#[derive(Parser, Debug)]
#[command(name = "footfall")]
#[command(about = "Store foot-traffic reports with a calendar-aligned web view")]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,

    /// CSV export or SQLite database with foot counts (overrides FOOTFALL_DATA)
    #[arg(short, long, global = true)]
    data: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the web server (default)
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8050")]
        port: u16,
    },

    /// Render the default report to a static HTML file (no server)
    Build {
        /// Output file
        #[arg(short, long, default_value = "index.html")]
        output: PathBuf,
    },

    /// Log the aligned series for one store
    Show {
        /// Store name as it appears in the data
        store: String,

        /// First day (YYYY-MM-DD), defaults to the trailing window
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Last day (YYYY-MM-DD), defaults to yesterday
        #[arg(long)]
        to: Option<NaiveDate>,
    },

    /// Append the rows of a CSV export to a SQLite database
    Import {
        /// CSV export to read
        csv: PathBuf,

        /// Database to write, created if missing
        #[arg(long, default_value = "data/foot_counts.db")]
        database: PathBuf,
    },
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level))
        .add_directive("hyper=warn".parse().unwrap())
        .add_directive("tower_http=warn".parse().unwrap());

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_max_level(Level::TRACE)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_tracing(&args.log_level);

    let mut settings = Settings::from_env().context("Failed to load settings")?;
    if let Some(path) = args.data {
        settings.data_path = path;
    }

    match args.command {
        None => {
            let dataset = Dataset::load(&settings.data_path)?;
            server::serve(8050, dataset, settings).await?;
        }
        Some(Commands::Serve { port }) => {
            let dataset = Dataset::load(&settings.data_path)?;
            server::serve(port, dataset, settings).await?;
        }
        Some(Commands::Build { output }) => {
            build_command(&settings, &output)?;
        }
        Some(Commands::Show { store, from, to }) => {
            show_command(&settings, store, from, to)?;
        }
        Some(Commands::Import { csv, database }) => {
            let observations = parser::parse_csv(&csv)?;
            let conn = db::init_db(&database)?;
            let inserted = db::import_observations(&conn, &observations)?;
            let total = db::count_observations(&conn)?;
            info!(
                file = %csv.display(),
                database = %database.display(),
                inserted,
                total,
                "Import finished"
            );
        }
    }

    Ok(())
}

fn build_command(settings: &Settings, output: &Path) -> Result<()> {
    let dataset = Dataset::load(&settings.data_path)?;
    let now = Local::now();
    let selection = data::Selection::default_for(now.date_naive(), settings.window_days);
    let report = data::build_report(
        &dataset,
        &selection,
        &settings.preferred_stores,
        &settings.holidays(),
    );
    let stores = align::order_stores(dataset.stores(), &settings.preferred_stores);

    html::generate_html(
        &html::PageView {
            hour: now.hour(),
            stores: &stores,
            report: &report,
            notice: None,
        },
        output,
    )?;
    info!(path = %output.display(), charts = report.charts.len(), "HTML saved");
    Ok(())
}

fn show_command(
    settings: &Settings,
    store: String,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<()> {
    let dataset = Dataset::load(&settings.data_path)?;
    let query = SelectionQuery {
        store: Some(store),
        start: from.map(|d| d.to_string()),
        end: to.map(|d| d.to_string()),
        reset: None,
    };
    let selection = data::resolve_selection(&query, Local::now().date_naive(), settings.window_days)?;
    let report = data::build_report(
        &dataset,
        &selection,
        &settings.preferred_stores,
        &settings.holidays(),
    );

    for chart in &report.charts {
        info!(store = %chart.store, days = chart.points.len(), peak = ?chart.peak(), "Series");
        for (point, label) in chart.points.iter().zip(&chart.labels) {
            match point.count {
                Some(count) => info!(date = %point.date, count, emphasized = label.emphasized, "Day"),
                None => info!(date = %point.date, emphasized = label.emphasized, "Day (no data)"),
            }
        }
        for month in &chart.months {
            info!(month = %month.text, anchor = %month.anchor_date, "Month");
        }
    }

    Ok(())
}
