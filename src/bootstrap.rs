//! Full ingestion pipeline: load each school's catalog, then generate its
//! embeddings.
//!
//! Stages commit independently: the catalog load is one transaction and
//! each embedding insert commits on its own, so a failure in a later stage
//! never rolls back earlier committed work. Re-running the pipeline is the
//! recovery mechanism. Destructive runs are gated behind an injected
//! confirmation capability and abort with zero side effects on refusal.

use anyhow::Result;
use sqlx::SqlitePool;
use std::path::Path;
use thiserror::Error;

use crate::catalog::{self, read_course_rows};
use crate::config::Config;
use crate::confirm::{AssumeYes, DestructiveConfirm, StdinConfirm};
use crate::db;
use crate::embedding::{self, EmbeddingService};
use crate::error::CatalogError;
use crate::indexer;
use crate::progress::{ProgressMode, ProgressReporter};

#[derive(Debug, Clone, Copy)]
pub struct BootstrapOptions {
    pub drop_courses: bool,
    pub drop_embeddings: bool,
    /// Cap embedding generation per school (smoke tests); non-positive or
    /// absent means no cap.
    pub embedding_limit: Option<i64>,
}

/// Per-school counts for the completion summary.
#[derive(Debug, Clone)]
pub struct SchoolStats {
    pub school: String,
    pub courses: u64,
    pub embeddings: u64,
}

#[derive(Debug)]
pub enum BootstrapOutcome {
    Completed {
        courses: u64,
        embeddings: u64,
        per_school: Vec<SchoolStats>,
    },
    /// The confirmation capability refused; nothing was touched.
    Aborted,
}

/// A stage failure partway through the pipeline. Everything counted here
/// was committed before the abort and stands.
#[derive(Debug, Error)]
#[error(
    "bootstrap aborted after {courses} courses and {embeddings} embeddings: {source}"
)]
pub struct BootstrapError {
    pub courses: u64,
    pub embeddings: u64,
    #[source]
    pub source: CatalogError,
}

/// Run the load-then-index pipeline for each school, in the given order.
///
/// When either drop flag is set, `confirm` must approve before any work
/// starts. Each school's catalog source is discovered under `data_root`
/// using the default CSV convention.
pub async fn bootstrap(
    pool: &SqlitePool,
    service: &dyn EmbeddingService,
    data_root: &Path,
    schools: &[String],
    opts: BootstrapOptions,
    confirm: &dyn DestructiveConfirm,
    reporter: &dyn ProgressReporter,
) -> Result<BootstrapOutcome, BootstrapError> {
    if opts.drop_courses || opts.drop_embeddings {
        let roster = schools
            .iter()
            .map(|s| s.to_uppercase())
            .collect::<Vec<_>>()
            .join(", ");
        let action = format!(
            "This will rebuild course and embedding tables for {}.",
            roster
        );
        if !confirm.confirm(&action) {
            return Ok(BootstrapOutcome::Aborted);
        }
    }

    let mut total_courses = 0u64;
    let mut total_embeddings = 0u64;
    let mut per_school = Vec::with_capacity(schools.len());

    for school in schools {
        let csv_path = catalog::default_csv_path(data_root, school);
        let parsed = read_course_rows(&csv_path).map_err(|e| BootstrapError {
            courses: total_courses,
            embeddings: total_embeddings,
            source: e,
        })?;

        // Stage one: the catalog load commits before the indexer reads, so
        // embeddings are never generated against uncommitted rows.
        let loaded = catalog::load_catalog(pool, school, &parsed.rows, opts.drop_courses)
            .await
            .map_err(|e| BootstrapError {
                courses: total_courses,
                embeddings: total_embeddings,
                source: e,
            })?;
        total_courses += loaded;

        // Stage two: embedding generation, committing per course. A
        // partial batch counts what it finished before aborting.
        let generated = indexer::index_embeddings(
            pool,
            service,
            school,
            opts.drop_embeddings,
            opts.embedding_limit,
            reporter,
        )
        .await
        .map_err(|e| BootstrapError {
            courses: total_courses,
            embeddings: total_embeddings + e.completed,
            source: e.source,
        })?;
        total_embeddings += generated;

        per_school.push(SchoolStats {
            school: school.to_uppercase(),
            courses: loaded,
            embeddings: generated,
        });
    }

    Ok(BootstrapOutcome::Completed {
        courses: total_courses,
        embeddings: total_embeddings,
        per_school,
    })
}

/// CLI wrapper for `coursevec bootstrap`.
pub async fn run_bootstrap(
    config: &Config,
    schools: &[String],
    keep_courses: bool,
    keep_embeddings: bool,
    limit: Option<i64>,
    yes: bool,
) -> Result<()> {
    let schools: Vec<String> = schools
        .iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if schools.is_empty() {
        anyhow::bail!("At least one school code must be provided.");
    }

    let confirm: Box<dyn DestructiveConfirm> = if yes {
        Box::new(AssumeYes)
    } else {
        Box::new(StdinConfirm)
    };

    let service = embedding::create_service(&config.embedding)?;
    let pool = db::connect(config).await?;
    let reporter = ProgressMode::default_for_tty().reporter();

    let opts = BootstrapOptions {
        drop_courses: !keep_courses,
        drop_embeddings: !keep_embeddings,
        embedding_limit: limit,
    };

    let outcome = bootstrap(
        &pool,
        service.as_ref(),
        &config.catalog.data_root,
        &schools,
        opts,
        confirm.as_ref(),
        reporter.as_ref(),
    )
    .await;

    pool.close().await;

    match outcome {
        Ok(BootstrapOutcome::Aborted) => {
            println!("Aborting without changes.");
            Ok(())
        }
        Ok(BootstrapOutcome::Completed {
            courses,
            embeddings,
            per_school,
        }) => {
            println!("bootstrap");
            for stats in &per_school {
                println!(
                    "  {}: {} courses, {} embeddings",
                    stats.school, stats.courses, stats.embeddings
                );
            }
            println!(
                "  total: {} courses, {} embeddings, {} school(s)",
                courses,
                embeddings,
                per_school.len()
            );
            println!("ok");
            Ok(())
        }
        Err(e) => {
            println!("bootstrap");
            println!(
                "  committed before failure: {} courses, {} embeddings",
                e.courses, e.embeddings
            );
            Err(e.into())
        }
    }
}
