//! Visa Lookup CLI
//!
//! Resolves visa requirements offline from local copies of the feeds.
//!
//! Usage:
//!   visa-lookup --facts countries.json \
//!               --borders world.geojson \
//!               --passport EGY resolve FRA
//!
//! Without `--matrix` the bundled requirement snapshot is used. A feed left
//! out is reported as failed and its fields degrade to unknown or "N/A".

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use country_data::loader::{self, FeedPaths};
use country_data::resolve::feature_styles;
use country_data::{resolve, CountryKey, Session, DEFAULT_CITY, DEFAULT_PASSPORT};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(
    name = "visa-lookup",
    about = "Look up visa requirements for a passport from local feed files"
)]
struct Args {
    /// Path to the visa requirement matrix JSON file (bundled snapshot if omitted)
    #[arg(short, long)]
    matrix: Option<PathBuf>,

    /// Path to the country facts JSON file (REST Countries format)
    #[arg(short, long)]
    facts: Option<PathBuf>,

    /// Path to the border polygons GeoJSON file
    #[arg(short, long)]
    borders: Option<PathBuf>,

    /// Passport country (three-letter code)
    #[arg(short, long, default_value = DEFAULT_PASSPORT)]
    passport: CountryKey,

    /// Departure city for flight links
    #[arg(long, default_value = DEFAULT_CITY)]
    city: String,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve one destination for the passport
    Resolve {
        /// Destination country (three-letter code)
        destination: CountryKey,
    },
    /// List passports covered by the matrix
    Destinations,
    /// Map color and label for every border feature
    Colors,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::WARN };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut session = Session::with_default(args.passport.clone(), Some(args.city.clone()));
    let paths = FeedPaths {
        borders: args.borders.clone(),
        matrix: args.matrix.clone(),
        facts: args.facts.clone(),
    };
    loader::load_session(&mut session, &paths);
    info!("Session status: {:?}", session.status());

    let output = match &args.command {
        Command::Resolve { destination } => {
            serde_json::to_string_pretty(&resolve(&session, Some(destination)))
        }
        Command::Destinations => serde_json::to_string_pretty(&session.available_destinations()),
        Command::Colors => serde_json::to_string_pretty(&feature_styles(&session)),
    }
    .context("serializing output")?;

    println!("{}", output);

    if !session.is_ready() {
        eprintln!("warning: not every feed loaded; results may be incomplete");
    }

    Ok(())
}
