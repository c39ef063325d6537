//! # coursevec CLI
//!
//! The `coursevec` binary drives the full catalog pipeline. It provides
//! commands for database initialization, catalog loading, embedding
//! generation, search, and starting the HTTP search server.
//!
//! ## Usage
//!
//! ```bash
//! coursevec --config ./config/coursevec.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `coursevec init` | Create the SQLite database and both tables |
//! | `coursevec load <school>` | Load a school's course CSV into the catalog |
//! | `coursevec embed <school>` | Generate embeddings for a school's courses |
//! | `coursevec bootstrap <schools...>` | Load then embed several schools |
//! | `coursevec search "<query>"` | Rank courses against a free-text query |
//! | `coursevec serve` | Start the HTTP search API |
//!
//! Destructive commands (`load`, `embed`, `bootstrap`) replace existing
//! rows by default and prompt for confirmation; pass `--yes` in automation
//! or the `--keep-*` flags to append instead of replace.

use clap::{Parser, Subcommand};
use coursevec::{bootstrap, catalog, config, indexer, schema, search, server};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Semantic course-catalog search.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file with the database path, catalog data root, embedding provider, and
/// server bind address.
#[derive(Parser)]
#[command(
    name = "coursevec",
    about = "Semantic course-catalog search: CSV ingestion, embedding generation, and similarity queries",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/coursevec.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file, the catalog and vector tables,
    /// and their indexes. Idempotent; running it repeatedly is safe.
    Init,

    /// Load a school's course catalog from CSV.
    ///
    /// Replaces the school's existing rows unless `--keep-existing` is
    /// given. The source defaults to
    /// `<data_root>/<school>/<SCHOOL>_courses.csv`.
    Load {
        /// Short code for the school (e.g. ASU, UIUC).
        school: String,

        /// Override path to the source CSV.
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Retain existing rows and append instead of replacing.
        #[arg(long)]
        keep_existing: bool,

        /// Skip the interactive confirmation prompt (use in automation).
        #[arg(long)]
        yes: bool,
    },

    /// Generate embeddings for a school's courses.
    ///
    /// Deletes the school's existing vectors first unless
    /// `--keep-existing` is given; keeping them makes re-insertion fail on
    /// the one-embedding-per-course constraint.
    Embed {
        /// Short code for the school (e.g. ASU, UIUC).
        school: String,

        /// Do not delete existing embeddings first.
        #[arg(long)]
        keep_existing: bool,

        /// Process only the first N courses (useful for smoke tests).
        #[arg(long)]
        limit: Option<i64>,

        /// Skip the interactive confirmation prompt (use in automation).
        #[arg(long)]
        yes: bool,
    },

    /// Load catalogs and generate embeddings for one or more schools.
    ///
    /// Runs the loader then the indexer per school, in the given order,
    /// committing each stage independently.
    Bootstrap {
        /// One or more school short codes (e.g. ASU UIUC UNC).
        #[arg(required = true)]
        schools: Vec<String>,

        /// Do not delete existing course rows before loading.
        #[arg(long)]
        keep_courses: bool,

        /// Do not delete existing embeddings before generating.
        #[arg(long)]
        keep_embeddings: bool,

        /// Generate embeddings for only the first N courses per school.
        #[arg(long)]
        limit: Option<i64>,

        /// Skip the interactive confirmation prompt (use in automation).
        #[arg(long)]
        yes: bool,
    },

    /// Rank courses against a free-text query.
    Search {
        /// The search query string.
        query: String,

        /// Restrict results to one school (blank, `ALL`, or `*` for all).
        #[arg(long)]
        school: Option<String>,

        /// Maximum number of results (clamped to 1..=50, default 10).
        #[arg(long)]
        limit: Option<i64>,
    },

    /// Start the HTTP search API.
    ///
    /// Binds to the address configured in `[server].bind` and serves
    /// `GET /healthz` and `GET|POST /search`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "coursevec=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            schema::run_init(&cfg).await?;
        }
        Commands::Load {
            school,
            csv,
            keep_existing,
            yes,
        } => {
            catalog::run_load(&cfg, &school, csv, keep_existing, yes).await?;
        }
        Commands::Embed {
            school,
            keep_existing,
            limit,
            yes,
        } => {
            indexer::run_embed(&cfg, &school, keep_existing, limit, yes).await?;
        }
        Commands::Bootstrap {
            schools,
            keep_courses,
            keep_embeddings,
            limit,
            yes,
        } => {
            bootstrap::run_bootstrap(&cfg, &schools, keep_courses, keep_embeddings, limit, yes)
                .await?;
        }
        Commands::Search {
            query,
            school,
            limit,
        } => {
            search::run_search(&cfg, &query, school, limit).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
