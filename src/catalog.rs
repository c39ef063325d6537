//! Catalog loading: CSV parsing and bulk insertion for one school.
//!
//! The loader consumes tabular course data produced upstream (the scrapers
//! emit one CSV per school), validates each record, and replaces or extends
//! the school's rows in the shared catalog table. Rows missing a subject,
//! number, or name are skipped, never stored as partial records.

use anyhow::Result;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::confirm::{AssumeYes, DestructiveConfirm, StdinConfirm};
use crate::db;
use crate::error::CatalogError;
use crate::models::CourseRow;
use crate::schema;

/// Outcome of parsing a catalog source.
#[derive(Debug)]
pub struct ParsedCatalog {
    pub rows: Vec<CourseRow>,
    /// Records dropped for missing subject, number, or name.
    pub skipped: u64,
}

/// Default CSV location for a school: `<data_root>/<school>/<SCHOOL>_courses.csv`.
pub fn default_csv_path(data_root: &Path, school: &str) -> PathBuf {
    data_root
        .join(school.to_lowercase())
        .join(format!("{}_courses.csv", school.to_uppercase()))
}

/// Read and validate course records from a CSV file.
///
/// Header names are matched case-insensitively after trimming. The credit
/// column is resolved from the recognized synonyms (`credit hours`,
/// `credit_hours`, `credits`, `credit`, `hours`, or any header containing
/// both "credit" and "hour"). Zero valid rows is not an error.
///
/// # Errors
///
/// `NotFound` when the file does not exist or cannot be opened.
pub fn read_course_rows(path: &Path) -> Result<ParsedCatalog, CatalogError> {
    if !path.exists() {
        return Err(CatalogError::not_found(format!(
            "course CSV not found: {}",
            path.display()
        )));
    }

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| {
            CatalogError::not_found(format!("could not read {}: {}", path.display(), e))
        })?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| CatalogError::not_found(format!("unreadable CSV header: {}", e)))?
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();

    let mut rows = Vec::new();
    let mut skipped = 0u64;

    for record in reader.records() {
        let record = match record {
            Ok(r) => r,
            // Malformed line: drop the row, keep the load going.
            Err(_) => {
                skipped += 1;
                continue;
            }
        };

        let columns: HashMap<&str, String> = headers
            .iter()
            .zip(record.iter())
            .map(|(key, value)| (key.as_str(), value.trim().to_string()))
            .collect();

        match parse_record(&columns) {
            Some(row) => rows.push(row),
            None => skipped += 1,
        }
    }

    Ok(ParsedCatalog { rows, skipped })
}

/// Build a validated row from normalized columns, or `None` when subject,
/// number, or name is missing.
fn parse_record(columns: &HashMap<&str, String>) -> Option<CourseRow> {
    let subject = columns.get("subject").cloned().unwrap_or_default();
    let number = columns.get("number").cloned().unwrap_or_default();
    let name = columns.get("name").cloned().unwrap_or_default();

    if subject.is_empty() || number.is_empty() || name.is_empty() {
        return None;
    }

    Some(CourseRow {
        subject,
        number,
        name,
        description: columns.get("description").cloned().unwrap_or_default(),
        credit_hours: resolve_credit_value(columns),
    })
}

fn resolve_credit_value(columns: &HashMap<&str, String>) -> String {
    const CANDIDATES: [&str; 5] = ["credit hours", "credit_hours", "credits", "credit", "hours"];

    for key in CANDIDATES {
        if let Some(value) = columns.get(key) {
            if !value.is_empty() {
                return value.clone();
            }
        }
    }

    for (key, value) in columns {
        if key.contains("credit") && key.contains("hour") && !value.is_empty() {
            return value.clone();
        }
    }

    String::new()
}

/// Insert a school's course rows into the shared catalog table.
///
/// The school code is normalized to uppercase. With `drop_existing`, all of
/// the school's current rows are deleted first (full replace); without it,
/// rows are appended with no duplicate check (that is the caller's call to
/// make). The delete and inserts commit as one transaction, so a replace
/// either lands whole or not at all.
///
/// Returns the count of rows actually inserted; rows missing subject,
/// number, or name are skipped.
pub async fn load_catalog(
    pool: &SqlitePool,
    school: &str,
    rows: &[CourseRow],
    drop_existing: bool,
) -> Result<u64, CatalogError> {
    let school_key = school.to_uppercase();

    schema::ensure_schema(pool).await?;

    let mut tx = pool.begin().await?;

    if drop_existing {
        sqlx::query("DELETE FROM courses WHERE school = ?")
            .bind(&school_key)
            .execute(&mut *tx)
            .await?;
    }

    let mut inserted = 0u64;
    for row in rows {
        if row.subject.is_empty() || row.number.is_empty() || row.name.is_empty() {
            continue;
        }

        sqlx::query(
            "INSERT INTO courses (school, subject, number, name, description, credit_hours) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&school_key)
        .bind(&row.subject)
        .bind(&row.number)
        .bind(&row.name)
        .bind(&row.description)
        .bind(&row.credit_hours)
        .execute(&mut *tx)
        .await?;

        inserted += 1;
    }

    tx.commit().await?;
    Ok(inserted)
}

/// CLI wrapper for `coursevec load`.
pub async fn run_load(
    config: &Config,
    school: &str,
    csv_override: Option<PathBuf>,
    keep_existing: bool,
    yes: bool,
) -> Result<()> {
    let school_key = school.to_uppercase();

    if !keep_existing {
        let confirm: Box<dyn DestructiveConfirm> = if yes {
            Box::new(AssumeYes)
        } else {
            Box::new(StdinConfirm)
        };
        let action = format!("This will replace the {} course catalog.", school_key);
        if !confirm.confirm(&action) {
            println!("Aborting without changes.");
            return Ok(());
        }
    }

    let csv_path =
        csv_override.unwrap_or_else(|| default_csv_path(&config.catalog.data_root, school));
    let parsed = read_course_rows(&csv_path)?;

    let pool = db::connect(config).await?;
    let inserted = load_catalog(&pool, school, &parsed.rows, !keep_existing).await?;
    pool.close().await;

    println!("load {}", school_key);
    println!("  source: {}", csv_path.display());
    println!("  inserted: {} courses", inserted);
    if parsed.skipped > 0 {
        println!("  skipped invalid: {} rows", parsed.skipped);
    }
    println!("ok");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::test_pool;

    fn columns(pairs: &[(&'static str, &str)]) -> HashMap<&'static str, String> {
        pairs.iter().map(|(k, v)| (*k, v.to_string())).collect()
    }

    #[test]
    fn credit_value_resolves_exact_synonyms() {
        assert_eq!(
            resolve_credit_value(&columns(&[("credit hours", "3")])),
            "3"
        );
        assert_eq!(resolve_credit_value(&columns(&[("credits", "4")])), "4");
        assert_eq!(resolve_credit_value(&columns(&[("hours", "1-3")])), "1-3");
    }

    #[test]
    fn credit_value_resolves_fuzzy_header() {
        let cols = columns(&[("credit hours (min)", "2"), ("subject", "CSC")]);
        assert_eq!(resolve_credit_value(&cols), "2");
    }

    #[test]
    fn credit_value_defaults_empty() {
        assert_eq!(resolve_credit_value(&columns(&[("subject", "CSC")])), "");
    }

    #[test]
    fn parse_record_requires_subject_number_name() {
        let missing_name = columns(&[("subject", "CSC"), ("number", "316"), ("name", "")]);
        assert!(parse_record(&missing_name).is_none());

        let complete = columns(&[
            ("subject", "CSC"),
            ("number", "316"),
            ("name", "Data Structures"),
        ]);
        let row = parse_record(&complete).unwrap();
        assert_eq!(row.description, "");
        assert_eq!(row.credit_hours, "");
    }

    #[test]
    fn read_course_rows_missing_file_is_not_found() {
        let err = read_course_rows(Path::new("/nonexistent/file.csv")).unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(_)));
    }

    #[test]
    fn read_course_rows_skips_incomplete_records() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("courses.csv");
        std::fs::write(
            &path,
            "Subject,Number,Name,Description,Credit Hours\n\
             CSC,316,Data Structures,Lists and trees.,3\n\
             CSC,,Broken Row,No number,3\n\
             MA,141,Calculus I,Limits and derivatives.,4\n",
        )
        .unwrap();

        let parsed = read_course_rows(&path).unwrap();
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.skipped, 1);
        assert_eq!(parsed.rows[0].credit_hours, "3");
    }

    #[test]
    fn default_csv_path_follows_convention() {
        let path = default_csv_path(Path::new("coursedata"), "ncsu");
        assert_eq!(
            path,
            PathBuf::from("coursedata/ncsu/NCSU_courses.csv")
        );
    }

    fn sample_rows() -> Vec<CourseRow> {
        vec![
            CourseRow {
                subject: "CSC".to_string(),
                number: "316".to_string(),
                name: "Data Structures".to_string(),
                description: "Lists and trees.".to_string(),
                credit_hours: "3".to_string(),
            },
            CourseRow {
                subject: "MA".to_string(),
                number: "141".to_string(),
                name: "Calculus I".to_string(),
                description: String::new(),
                credit_hours: "4".to_string(),
            },
        ]
    }

    #[tokio::test]
    async fn load_normalizes_school_to_uppercase() {
        let (_tmp, pool) = test_pool().await;
        let inserted = load_catalog(&pool, "ncsu", &sample_rows(), true).await.unwrap();
        assert_eq!(inserted, 2);

        let schools: Vec<String> = sqlx::query_scalar("SELECT DISTINCT school FROM courses")
            .fetch_all(&pool)
            .await
            .unwrap();
        assert_eq!(schools, vec!["NCSU".to_string()]);
    }

    #[tokio::test]
    async fn replace_reload_is_idempotent() {
        let (_tmp, pool) = test_pool().await;
        let rows = sample_rows();

        let first = load_catalog(&pool, "NCSU", &rows, true).await.unwrap();
        let second = load_catalog(&pool, "NCSU", &rows, true).await.unwrap();
        assert_eq!(first, second);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM courses WHERE school = 'NCSU'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn additive_load_appends_without_deduplication() {
        let (_tmp, pool) = test_pool().await;
        let rows = sample_rows();

        load_catalog(&pool, "NCSU", &rows, true).await.unwrap();
        load_catalog(&pool, "NCSU", &rows, false).await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM courses WHERE school = 'NCSU'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 4);
    }

    #[tokio::test]
    async fn replace_scopes_to_one_school() {
        let (_tmp, pool) = test_pool().await;
        load_catalog(&pool, "NCSU", &sample_rows(), true).await.unwrap();
        load_catalog(&pool, "UIUC", &sample_rows(), true).await.unwrap();

        // Reloading NCSU must leave UIUC untouched.
        load_catalog(&pool, "NCSU", &sample_rows()[..1], true)
            .await
            .unwrap();

        let ncsu: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM courses WHERE school = 'NCSU'")
            .fetch_one(&pool)
            .await
            .unwrap();
        let uiuc: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM courses WHERE school = 'UIUC'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(ncsu, 1);
        assert_eq!(uiuc, 2);
    }

    #[tokio::test]
    async fn zero_valid_rows_is_not_an_error() {
        let (_tmp, pool) = test_pool().await;
        let inserted = load_catalog(&pool, "NCSU", &[], true).await.unwrap();
        assert_eq!(inserted, 0);
    }
}
