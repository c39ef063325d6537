//! Embedding generation for a school's catalog.
//!
//! Selects the school's courses in id order, builds the canonical prompt
//! for each, and persists one vector per course. Calls to the embedding
//! service are strictly sequential (the backing model is not assumed safe
//! for concurrent invocation) and each insert commits on its own, so an
//! aborted batch keeps what it finished and a re-run picks up the rest.

use anyhow::{bail, Result};
use sqlx::{Row, SqlitePool};
use thiserror::Error;

use crate::config::Config;
use crate::confirm::{AssumeYes, DestructiveConfirm, StdinConfirm};
use crate::db;
use crate::embedding::{self, EmbeddingService};
use crate::error::CatalogError;
use crate::models::Course;
use crate::progress::{EmbedProgressEvent, ProgressMode, ProgressReporter};
use crate::schema;

/// An indexing failure that may follow partial completion. `completed`
/// embeddings were generated and committed before the batch aborted.
#[derive(Debug, Error)]
#[error("aborted after {completed} embeddings: {source}")]
pub struct IndexError {
    pub completed: u64,
    #[source]
    pub source: CatalogError,
}

impl IndexError {
    fn at_start(source: CatalogError) -> Self {
        Self {
            completed: 0,
            source,
        }
    }
}

/// Generate embeddings for a school's courses.
///
/// Courses are selected in id order; a positive `limit` caps the selection
/// and a non-positive or absent one means no cap. With `drop_existing`,
/// vectors for exactly the selected course ids are deleted first so the
/// rebuild cannot trip the uniqueness constraint; without it, existing
/// vectors stay and re-insertion fails on that constraint. Callers choose
/// replace or skip semantics explicitly.
///
/// Returns the number of embeddings generated. No matching courses is not
/// an error and has no side effects.
pub async fn index_embeddings(
    pool: &SqlitePool,
    service: &dyn EmbeddingService,
    school: &str,
    drop_existing: bool,
    limit: Option<i64>,
    reporter: &dyn ProgressReporter,
) -> Result<u64, IndexError> {
    let school_key = school.to_uppercase();
    // SQLite treats a negative LIMIT as "no limit".
    let cap = limit.filter(|n| *n > 0).unwrap_or(-1);

    schema::ensure_schema(pool)
        .await
        .map_err(IndexError::at_start)?;

    let courses = select_courses(pool, &school_key, cap)
        .await
        .map_err(IndexError::at_start)?;

    if courses.is_empty() {
        return Ok(0);
    }

    if drop_existing {
        // Delete vectors for exactly the selected ids: the same filter and
        // cap that produced the selection above.
        sqlx::query(
            "DELETE FROM course_embeddings WHERE course_id IN \
             (SELECT id FROM courses WHERE school = ? ORDER BY id LIMIT ?)",
        )
        .bind(&school_key)
        .bind(cap)
        .execute(pool)
        .await
        .map_err(|e| IndexError::at_start(e.into()))?;
    }

    let total = courses.len() as u64;
    let mut completed = 0u64;

    for course in &courses {
        let prompt = course.prompt();

        let vector = service
            .embed(&prompt)
            .await
            .map_err(|source| IndexError { completed, source })?;

        sqlx::query(
            "INSERT INTO course_embeddings (description, embedding, course_id) VALUES (?, ?, ?)",
        )
        .bind(&course.description)
        .bind(embedding::vec_to_blob(&vector))
        .bind(course.id)
        .execute(pool)
        .await
        .map_err(|e| IndexError {
            completed,
            source: e.into(),
        })?;

        completed += 1;
        reporter.report(EmbedProgressEvent {
            school: school_key.clone(),
            n: completed,
            total,
        });
    }

    Ok(completed)
}

async fn select_courses(
    pool: &SqlitePool,
    school: &str,
    cap: i64,
) -> Result<Vec<Course>, CatalogError> {
    let rows = sqlx::query(
        "SELECT id, subject, number, name, description FROM courses \
         WHERE school = ? ORDER BY id LIMIT ?",
    )
    .bind(school)
    .bind(cap)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| Course {
            id: row.get("id"),
            subject: row.get("subject"),
            number: row.get("number"),
            name: row.get("name"),
            description: row.get("description"),
        })
        .collect())
}

/// CLI wrapper for `coursevec embed`.
pub async fn run_embed(
    config: &Config,
    school: &str,
    keep_existing: bool,
    limit: Option<i64>,
    yes: bool,
) -> Result<()> {
    if !config.embedding.is_enabled() {
        bail!("Embedding provider is disabled. Set [embedding] provider in config.");
    }

    let school_key = school.to_uppercase();

    if !keep_existing {
        let confirm: Box<dyn DestructiveConfirm> = if yes {
            Box::new(AssumeYes)
        } else {
            Box::new(StdinConfirm)
        };
        let action = format!(
            "This will regenerate embeddings for {} courses.",
            school_key
        );
        if !confirm.confirm(&action) {
            println!("Aborting without changes.");
            return Ok(());
        }
    }

    let service = embedding::create_service(&config.embedding)?;
    let pool = db::connect(config).await?;
    let reporter = ProgressMode::default_for_tty().reporter();

    let result = index_embeddings(
        &pool,
        service.as_ref(),
        school,
        !keep_existing,
        limit,
        reporter.as_ref(),
    )
    .await;

    pool.close().await;

    match result {
        Ok(generated) => {
            println!("embed {}", school_key);
            println!("  generated: {} embeddings", generated);
            println!("ok");
            Ok(())
        }
        Err(e) => {
            // Partial completion stays committed; report it before failing.
            println!("embed {}", school_key);
            println!("  generated before failure: {} embeddings", e.completed);
            Err(e.into())
        }
    }
}
