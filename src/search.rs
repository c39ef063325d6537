//! Similarity search over the course catalog.
//!
//! Embeds the query text, scores every stored course vector by cosine
//! similarity (optionally filtered to one school), and returns the top
//! results in descending score order. Ties keep the store's natural row
//! order: the sort is stable and no secondary key is applied.

use anyhow::Result;
use sqlx::{Row, SqlitePool};
use std::cmp::Ordering;

use crate::config::Config;
use crate::db;
use crate::embedding::{self, EmbeddingService};
use crate::error::CatalogError;
use crate::models::SearchHit;

/// Result-count default before clamping.
pub const DEFAULT_LIMIT: i64 = 10;
/// Hard cap on returned results.
pub const MAX_LIMIT: i64 = 50;

/// Clamp a requested limit into `[1, MAX_LIMIT]`, defaulting to
/// [`DEFAULT_LIMIT`] when absent. Requested 0 → 1, requested 1000 → 50.
pub fn effective_limit(requested: Option<i64>) -> i64 {
    requested.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

/// Normalize the school parameter: uppercase, with the literal values
/// empty-string, `ALL`, and `*` meaning "no filter".
pub fn resolve_school_filter(school: Option<&str>) -> Option<String> {
    let key = school?.trim().to_uppercase();
    match key.as_str() {
        "" | "ALL" | "*" => None,
        _ => Some(key),
    }
}

/// Strip a trailing `hours.` / `hour.` (and surrounding whitespace) from
/// stored credit text; a missing value becomes the empty string and
/// anything else passes through unchanged.
fn normalize_credit_hours(value: Option<String>) -> String {
    let text = value.unwrap_or_default();
    let trimmed = text.trim();

    for suffix in ["hours.", "hour."] {
        if let Some(rest) = trimmed.strip_suffix(suffix) {
            return rest.trim().to_string();
        }
    }

    text
}

/// Rank catalog entries against a free-text query.
///
/// # Errors
///
/// - `InvalidArgument` when `query` is empty after trimming.
/// - `SchemaNotInitialized` when the tables have never been created;
///   callers surface this as a setup problem, not a generic failure.
/// - `Embedding` / `Database` for backend faults.
pub async fn search_courses(
    pool: &SqlitePool,
    service: &dyn EmbeddingService,
    query: &str,
    school: Option<&str>,
    limit: Option<i64>,
) -> Result<Vec<SearchHit>, CatalogError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(CatalogError::invalid_argument("'query' is required."));
    }

    let limit = effective_limit(limit);
    let school_filter = resolve_school_filter(school);

    let query_vec = service.embed(query).await?;

    let rows = match school_filter {
        Some(ref school_key) => {
            sqlx::query(
                "SELECT c.school, c.subject, c.number, c.name, c.description, \
                        c.credit_hours, ce.embedding \
                 FROM course_embeddings AS ce \
                 JOIN courses AS c ON ce.course_id = c.id \
                 WHERE c.school = ?",
            )
            .bind(school_key)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query(
                "SELECT c.school, c.subject, c.number, c.name, c.description, \
                        c.credit_hours, ce.embedding \
                 FROM course_embeddings AS ce \
                 JOIN courses AS c ON ce.course_id = c.id",
            )
            .fetch_all(pool)
            .await?
        }
    };

    let mut hits: Vec<SearchHit> = rows
        .iter()
        .map(|row| {
            let blob: Vec<u8> = row.get("embedding");
            let stored = embedding::blob_to_vec(&blob);
            // Unscorable vectors (dimension drift across model versions)
            // surface as null similarity rather than an error.
            let similarity = embedding::cosine_similarity(&query_vec, &stored);

            SearchHit {
                school: row.get("school"),
                subject: row.get("subject"),
                number: row.get("number"),
                name: row.get("name"),
                description: row.get("description"),
                credit_hours: normalize_credit_hours(row.get("credit_hours")),
                similarity,
            }
        })
        .collect();

    // Stable sort: descending similarity, unscored rows last, ties in
    // store order.
    hits.sort_by(|a, b| match (a.similarity, b.similarity) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    hits.truncate(limit as usize);

    Ok(hits)
}

/// CLI wrapper for `coursevec search`.
pub async fn run_search(
    config: &Config,
    query: &str,
    school: Option<String>,
    limit: Option<i64>,
) -> Result<()> {
    let service = embedding::create_service(&config.embedding)?;
    let pool = db::connect(config).await?;

    let hits = search_courses(&pool, service.as_ref(), query, school.as_deref(), limit).await?;
    pool.close().await;

    if hits.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, hit) in hits.iter().enumerate() {
        let score = hit
            .similarity
            .map(|s| format!("{:.3}", s))
            .unwrap_or_else(|| "n/a".to_string());

        println!(
            "{}. [{}] {} {} {}: {}",
            i + 1,
            score,
            hit.school,
            hit.subject,
            hit.number,
            hit.name
        );
        if !hit.description.is_empty() {
            println!("    {}", hit.description);
        }
        if !hit.credit_hours.is_empty() {
            println!("    credit hours: {}", hit.credit_hours);
        }
        println!();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::load_catalog;
    use crate::embedding::HashService;
    use crate::indexer::index_embeddings;
    use crate::models::CourseRow;
    use crate::progress::NoProgress;
    use crate::testutil::test_pool;

    #[test]
    fn limit_clamps_into_range() {
        assert_eq!(effective_limit(None), 10);
        assert_eq!(effective_limit(Some(0)), 1);
        assert_eq!(effective_limit(Some(-3)), 1);
        assert_eq!(effective_limit(Some(7)), 7);
        assert_eq!(effective_limit(Some(1000)), 50);
    }

    #[test]
    fn school_filter_sentinels_mean_unfiltered() {
        assert_eq!(resolve_school_filter(None), None);
        assert_eq!(resolve_school_filter(Some("")), None);
        assert_eq!(resolve_school_filter(Some("all")), None);
        assert_eq!(resolve_school_filter(Some("*")), None);
        assert_eq!(resolve_school_filter(Some(" asu ")), Some("ASU".to_string()));
    }

    #[test]
    fn credit_hours_normalization() {
        assert_eq!(normalize_credit_hours(Some("3 hours.".to_string())), "3");
        assert_eq!(normalize_credit_hours(Some("1 hour.".to_string())), "1");
        assert_eq!(
            normalize_credit_hours(Some("variable".to_string())),
            "variable"
        );
        assert_eq!(normalize_credit_hours(None), "");
    }

    fn course(subject: &str, number: &str, name: &str, description: &str) -> CourseRow {
        CourseRow {
            subject: subject.to_string(),
            number: number.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            credit_hours: "3 hours.".to_string(),
        }
    }

    async fn seeded_pool() -> (tempfile::TempDir, SqlitePool, HashService) {
        let (tmp, pool) = test_pool().await;
        let service = HashService::new(256);

        load_catalog(
            &pool,
            "NCSU",
            &[
                course(
                    "CSC",
                    "316",
                    "Data Structures",
                    "Lists trees graphs hash tables and algorithm analysis.",
                ),
                course(
                    "CH",
                    "101",
                    "General Chemistry",
                    "Atoms molecules stoichiometry and chemical reactions.",
                ),
            ],
            true,
        )
        .await
        .unwrap();
        load_catalog(
            &pool,
            "UIUC",
            &[course(
                "CS",
                "225",
                "Data Structures",
                "Lists trees graphs and asymptotic analysis.",
            )],
            true,
        )
        .await
        .unwrap();

        index_embeddings(&pool, &service, "NCSU", true, None, &NoProgress)
            .await
            .unwrap();
        index_embeddings(&pool, &service, "UIUC", true, None, &NoProgress)
            .await
            .unwrap();

        (tmp, pool, service)
    }

    #[tokio::test]
    async fn empty_query_is_rejected_before_store_access() {
        let (_tmp, pool) = test_pool().await;
        let service = HashService::new(16);

        let err = search_courses(&pool, &service, "   ", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn uninitialized_store_reports_schema_not_initialized() {
        let (_tmp, pool) = test_pool().await;
        let service = HashService::new(16);

        let err = search_courses(&pool, &service, "algorithms", None, None)
            .await
            .unwrap_err();
        assert!(err.is_schema_missing(), "got: {:?}", err);
    }

    #[tokio::test]
    async fn ranking_is_monotonic_and_semantically_ordered() {
        let (_tmp, pool, service) = seeded_pool().await;

        let hits = search_courses(&pool, &service, "trees graphs algorithm analysis", None, None)
            .await
            .unwrap();
        assert!(!hits.is_empty());

        // The data-structures courses outrank chemistry.
        assert_eq!(hits[0].name, "Data Structures");

        for pair in hits.windows(2) {
            let a = pair[0].similarity.unwrap();
            let b = pair[1].similarity.unwrap();
            assert!(a >= b, "similarity not monotonic: {} < {}", a, b);
        }
        for hit in &hits {
            let s = hit.similarity.unwrap();
            assert!((-1.0..=1.0).contains(&s));
        }
    }

    #[tokio::test]
    async fn school_filter_scopes_results() {
        let (_tmp, pool, service) = seeded_pool().await;

        let hits = search_courses(&pool, &service, "data structures", Some("ncsu"), None)
            .await
            .unwrap();
        assert!(!hits.is_empty());
        assert!(hits.iter().all(|h| h.school == "NCSU"));

        let all = search_courses(&pool, &service, "data structures", Some("ALL"), None)
            .await
            .unwrap();
        assert!(all.iter().any(|h| h.school == "UIUC"));
    }

    #[tokio::test]
    async fn results_are_truncated_to_the_limit() {
        let (_tmp, pool, service) = seeded_pool().await;

        let hits = search_courses(&pool, &service, "course", None, Some(1))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn credit_hours_are_normalized_in_results() {
        let (_tmp, pool, service) = seeded_pool().await;

        let hits = search_courses(&pool, &service, "chemistry", None, None)
            .await
            .unwrap();
        assert!(hits.iter().all(|h| h.credit_hours == "3"));
    }
}
