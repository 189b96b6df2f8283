use crate::types::{
    CuratorError, ImageRecord, ImageStatus, NewImageRecord, ProviderKind, Result, SearchTerm,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite};
use std::str::FromStr;
use tracing::info;

/// Durable store for search terms and accepted image records. The review
/// cursor only ever talks to this trait; the concrete engine behind it is
/// swappable.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Wholesale replacement of the term list: every existing term (and its
    /// image records) is dropped, then the new list is inserted in order.
    async fn replace_terms(&self, terms: &[String]) -> Result<()>;

    /// All terms in navigation order.
    async fn list_terms(&self) -> Result<Vec<SearchTerm>>;

    async fn find_term(&self, text: &str) -> Result<Option<SearchTerm>>;

    /// Inserts an accepted image. Fails with [`CuratorError::DuplicateImage`]
    /// when `(source_id, source_api)` is already present, leaving the store
    /// unchanged.
    async fn insert_image(&self, record: NewImageRecord) -> Result<i64>;

    /// Records where a downloaded file landed on disk.
    async fn set_file_path(
        &self,
        source_id: &str,
        source_api: ProviderKind,
        path: &str,
    ) -> Result<()>;

    /// Count of approved records, optionally scoped to one term.
    async fn count_approved(&self, term_id: Option<i64>) -> Result<i64>;

    /// Maintenance action: drop one record by its remote identity.
    async fn delete_image(&self, source_id: &str, source_api: ProviderKind) -> Result<()>;

    /// Stored records, optionally scoped to one provider.
    async fn list_images(&self, source_api: Option<ProviderKind>) -> Result<Vec<ImageRecord>>;
}

pub struct SqliteStore {
    db: Pool<Sqlite>,
}

impl SqliteStore {
    /// Opens (creating if missing) the project database and ensures the
    /// schema exists. The pool is capped at one connection: this is a
    /// single-operator tool and it keeps `sqlite::memory:` databases sound.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let db = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS search_terms (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                term TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&db)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS images (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                source_id TEXT NOT NULL,
                source_api TEXT NOT NULL,
                url_original TEXT,
                url_thumbnail TEXT,
                url_page TEXT,
                extension TEXT,
                file_path TEXT,
                status TEXT NOT NULL DEFAULT 'pending',
                term_id INTEGER REFERENCES search_terms(id),
                created_at TEXT NOT NULL,
                UNIQUE (source_id, source_api)
            )
            "#,
        )
        .execute(&db)
        .await?;

        Ok(Self { db })
    }
}

#[async_trait]
impl ImageStore for SqliteStore {
    async fn replace_terms(&self, terms: &[String]) -> Result<()> {
        let mut tx = self.db.begin().await?;
        sqlx::query("DELETE FROM images").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM search_terms")
            .execute(&mut *tx)
            .await?;

        let now = Utc::now();
        for term in terms {
            let term = term.trim();
            if term.is_empty() {
                continue;
            }
            sqlx::query("INSERT INTO search_terms (term, created_at) VALUES ($1, $2)")
                .bind(term)
                .bind(now)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        info!("Replaced term list with {} terms", terms.len());
        Ok(())
    }

    async fn list_terms(&self) -> Result<Vec<SearchTerm>> {
        let rows = sqlx::query("SELECT id, term, created_at FROM search_terms ORDER BY id")
            .fetch_all(&self.db)
            .await?;

        rows.iter().map(row_to_term).collect()
    }

    async fn find_term(&self, text: &str) -> Result<Option<SearchTerm>> {
        let row = sqlx::query("SELECT id, term, created_at FROM search_terms WHERE term = $1")
            .bind(text)
            .fetch_optional(&self.db)
            .await?;

        row.as_ref().map(row_to_term).transpose()
    }

    async fn insert_image(&self, record: NewImageRecord) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO images
                (source_id, source_api, url_original, url_thumbnail, url_page,
                 extension, status, term_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(&record.source_id)
        .bind(record.source_api.as_str())
        .bind(&record.url_original)
        .bind(&record.url_thumbnail)
        .bind(&record.url_page)
        .bind(&record.extension)
        .bind(record.status.as_str())
        .bind(record.term_id)
        .bind(Utc::now())
        .execute(&self.db)
        .await;

        match result {
            Ok(done) => Ok(done.last_insert_rowid()),
            Err(sqlx::Error::Database(db_err))
                if matches!(db_err.kind(), sqlx::error::ErrorKind::UniqueViolation) =>
            {
                Err(CuratorError::DuplicateImage {
                    source_id: record.source_id,
                    source_api: record.source_api.to_string(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn set_file_path(
        &self,
        source_id: &str,
        source_api: ProviderKind,
        path: &str,
    ) -> Result<()> {
        sqlx::query("UPDATE images SET file_path = $1 WHERE source_id = $2 AND source_api = $3")
            .bind(path)
            .bind(source_id)
            .bind(source_api.as_str())
            .execute(&self.db)
            .await?;
        Ok(())
    }

    async fn count_approved(&self, term_id: Option<i64>) -> Result<i64> {
        let count: i64 = match term_id {
            Some(id) => {
                sqlx::query_scalar(
                    "SELECT COUNT(*) FROM images WHERE status = 'approved' AND term_id = $1",
                )
                .bind(id)
                .fetch_one(&self.db)
                .await?
            }
            None => {
                sqlx::query_scalar("SELECT COUNT(*) FROM images WHERE status = 'approved'")
                    .fetch_one(&self.db)
                    .await?
            }
        };
        Ok(count)
    }

    async fn delete_image(&self, source_id: &str, source_api: ProviderKind) -> Result<()> {
        sqlx::query("DELETE FROM images WHERE source_id = $1 AND source_api = $2")
            .bind(source_id)
            .bind(source_api.as_str())
            .execute(&self.db)
            .await?;
        info!("Deleted image {} from {}", source_id, source_api);
        Ok(())
    }

    async fn list_images(&self, source_api: Option<ProviderKind>) -> Result<Vec<ImageRecord>> {
        let rows = match source_api {
            Some(api) => {
                sqlx::query("SELECT * FROM images WHERE source_api = $1 ORDER BY id")
                    .bind(api.as_str())
                    .fetch_all(&self.db)
                    .await?
            }
            None => {
                sqlx::query("SELECT * FROM images ORDER BY id")
                    .fetch_all(&self.db)
                    .await?
            }
        };

        rows.iter().map(row_to_image).collect()
    }
}

fn row_to_term(row: &SqliteRow) -> Result<SearchTerm> {
    Ok(SearchTerm {
        id: row.try_get("id")?,
        term: row.try_get("term")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

fn row_to_image(row: &SqliteRow) -> Result<ImageRecord> {
    let source_api: String = row.try_get("source_api")?;
    let status: String = row.try_get("status")?;
    Ok(ImageRecord {
        id: row.try_get("id")?,
        source_id: row.try_get("source_id")?,
        source_api: ProviderKind::from_str(&source_api)?,
        url_original: row.try_get("url_original")?,
        url_thumbnail: row.try_get("url_thumbnail")?,
        url_page: row.try_get("url_page")?,
        extension: row.try_get("extension")?,
        file_path: row.try_get("file_path")?,
        status: ImageStatus::from_str(&status)?,
        term_id: row.try_get::<Option<i64>, _>("term_id")?.unwrap_or(0),
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}
