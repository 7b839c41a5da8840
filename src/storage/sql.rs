//! Relational listing store backed by sqlx.
//!
//! One table, two statements: `SELECT` by identity key and a single
//! `INSERT`. Composite fields are stored as JSON text blobs, matching
//! the original `flats` schema.

use serde_json::{Map, Value};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::error::{AppError, Result};
use crate::models::Listing;
use crate::storage::{InsertOutcome, ListingStore};

const CREATE_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS flats (
    uID             TEXT PRIMARY KEY,
    title           TEXT NOT NULL,
    location        TEXT NOT NULL,
    date            TEXT NOT NULL,
    checktags       TEXT NOT NULL,
    flatProps       TEXT NOT NULL,
    hasLocationImg  TEXT NOT NULL,
    images          TEXT NOT NULL,
    path            TEXT NOT NULL
)";

const SELECT_BY_KEY: &str = "SELECT uID FROM flats WHERE uID = ?";

const INSERT_LISTING: &str = r"
INSERT INTO flats (uID, title, location, date, checktags, flatProps, hasLocationImg, images, path)
VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)";

/// SQL listing store over a connection pool.
#[derive(Clone)]
pub struct SqlListingStore {
    pool: SqlitePool,
}

impl SqlListingStore {
    /// Wrap an existing pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to the database at the given URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(AppError::storage)?;
        Ok(Self { pool })
    }

    /// Connect to a private in-memory database.
    ///
    /// A single connection, since every in-memory connection gets its
    /// own database.
    pub async fn connect_in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(AppError::storage)?;
        Ok(Self { pool })
    }

    /// Create the schema if it does not exist yet.
    pub async fn init(&self) -> Result<()> {
        sqlx::query(CREATE_TABLE)
            .execute(&self.pool)
            .await
            .map_err(AppError::storage)?;
        Ok(())
    }

    /// Number of rows stored under an identity key (0 or 1).
    pub async fn count(&self, identity_key: &str) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM flats WHERE uID = ?")
            .bind(identity_key)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::storage)
    }

    /// Render the properties as a JSON object, extraction order kept.
    fn props_json(listing: &Listing) -> Result<String> {
        let map: Map<String, Value> = listing
            .properties
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        Ok(serde_json::to_string(&Value::Object(map))?)
    }
}

#[async_trait::async_trait]
impl ListingStore for SqlListingStore {
    async fn exists(&self, identity_key: &str) -> Result<bool> {
        let row = sqlx::query(SELECT_BY_KEY)
            .bind(identity_key)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::storage)?;
        Ok(row.is_some())
    }

    async fn try_insert(&self, listing: &Listing) -> Result<InsertOutcome> {
        // Serialize outside the transaction so a JSON error never
        // leaves one open.
        let checktags = serde_json::to_string(&listing.checktags)?;
        let props = Self::props_json(listing)?;
        let has_img = serde_json::to_string(&listing.has_location_img)?;
        let images = serde_json::to_string(&listing.images)?;

        let mut tx = self.pool.begin().await.map_err(AppError::storage)?;

        let existing = sqlx::query(SELECT_BY_KEY)
            .bind(&listing.identity_key)
            .fetch_optional(&mut *tx)
            .await;

        match existing {
            Ok(Some(_)) => {
                // Read-only so far; release the connection and report.
                let _ = tx.rollback().await;
                log::info!("Already stored: {}", listing.identity_key);
                return Ok(InsertOutcome::AlreadyExists);
            }
            Ok(None) => {}
            Err(e) => {
                let _ = tx.rollback().await;
                return Err(AppError::storage(e));
            }
        }

        let inserted = sqlx::query(INSERT_LISTING)
            .bind(&listing.identity_key)
            .bind(&listing.title)
            .bind(&listing.location)
            .bind(&listing.date)
            .bind(&checktags)
            .bind(&props)
            .bind(&has_img)
            .bind(&images)
            .bind(&listing.local_path)
            .execute(&mut *tx)
            .await;

        match inserted {
            Ok(_) => {
                tx.commit().await.map_err(AppError::storage)?;
                log::info!("Found new flat in {}!", listing.location);
                Ok(InsertOutcome::Inserted)
            }
            // Raced by another writer between check and insert: the
            // uniqueness constraint held, so it is a duplicate, not a
            // failure.
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                let _ = tx.rollback().await;
                Ok(InsertOutcome::AlreadyExists)
            }
            Err(e) => {
                let _ = tx.rollback().await;
                Err(AppError::storage(e))
            }
        }
    }
}
