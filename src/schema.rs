//! Schema management for the catalog and vector tables.
//!
//! All DDL is idempotent (`IF NOT EXISTS` throughout), so [`ensure_schema`]
//! is safe to call repeatedly and both the loader and the indexer call it
//! before writing. The search path deliberately does not: querying an
//! uninitialized store is reported as a distinct setup problem.

use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;
use crate::error::CatalogError;

/// Create the catalog and vector tables plus their indexes if absent.
///
/// The vector table references the catalog table with cascade delete, so a
/// destructive catalog reload sweeps stale vectors with it, and carries a
/// unique index on `course_id` so each course holds at most one embedding.
pub async fn ensure_schema(pool: &SqlitePool) -> Result<(), CatalogError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS courses (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            school TEXT NOT NULL,
            subject TEXT NOT NULL,
            number TEXT NOT NULL,
            name TEXT NOT NULL,
            description TEXT NOT NULL,
            credit_hours TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_courses_school ON courses (school)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS course_embeddings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            description TEXT NOT NULL,
            embedding BLOB NOT NULL,
            course_id INTEGER NOT NULL REFERENCES courses(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_course_embeddings_course_id \
         ON course_embeddings (course_id)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS uq_course_embeddings_course_id \
         ON course_embeddings (course_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// CLI wrapper for `coursevec init`.
pub async fn run_init(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    ensure_schema(&pool).await?;
    pool.close().await;
    println!("Database initialized successfully.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::test_pool;

    #[tokio::test]
    async fn ensure_schema_is_idempotent() {
        let (_tmp, pool) = test_pool().await;
        ensure_schema(&pool).await.unwrap();
        ensure_schema(&pool).await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM courses")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn deleting_a_course_cascades_to_its_embedding() {
        let (_tmp, pool) = test_pool().await;
        ensure_schema(&pool).await.unwrap();

        sqlx::query(
            "INSERT INTO courses (school, subject, number, name, description, credit_hours) \
             VALUES ('NCSU', 'CSC', '316', 'Data Structures', '', '3')",
        )
        .execute(&pool)
        .await
        .unwrap();
        let course_id: i64 = sqlx::query_scalar("SELECT id FROM courses")
            .fetch_one(&pool)
            .await
            .unwrap();

        sqlx::query(
            "INSERT INTO course_embeddings (description, embedding, course_id) VALUES ('', x'00', ?)",
        )
        .bind(course_id)
        .execute(&pool)
        .await
        .unwrap();

        sqlx::query("DELETE FROM courses WHERE id = ?")
            .bind(course_id)
            .execute(&pool)
            .await
            .unwrap();

        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM course_embeddings")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(remaining, 0);
    }

    #[tokio::test]
    async fn course_id_uniqueness_is_enforced() {
        let (_tmp, pool) = test_pool().await;
        ensure_schema(&pool).await.unwrap();

        sqlx::query(
            "INSERT INTO courses (school, subject, number, name, description, credit_hours) \
             VALUES ('NCSU', 'CSC', '316', 'Data Structures', '', '3')",
        )
        .execute(&pool)
        .await
        .unwrap();
        let course_id: i64 = sqlx::query_scalar("SELECT id FROM courses")
            .fetch_one(&pool)
            .await
            .unwrap();

        sqlx::query(
            "INSERT INTO course_embeddings (description, embedding, course_id) VALUES ('', x'00', ?)",
        )
        .bind(course_id)
        .execute(&pool)
        .await
        .unwrap();

        let dup = sqlx::query(
            "INSERT INTO course_embeddings (description, embedding, course_id) VALUES ('', x'00', ?)",
        )
        .bind(course_id)
        .execute(&pool)
        .await;
        assert!(dup.is_err());
    }
}
