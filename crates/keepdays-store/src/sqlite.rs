//! SQLite-backed bucket

use crate::StoreError;
use keepdays_domain::traits::{ArchiveStore, ObjectEntry};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// SQLite-based implementation of ArchiveStore
///
/// Holds any number of named buckets in one database file. Tags follow
/// object-store semantics: writing a tag replaces the object's whole tag set.
///
/// # Thread Safety
///
/// SQLite connections are not thread-safe. Each thread should have its own SqliteBucket instance.
pub struct SqliteBucket {
    conn: Connection,
}

impl SqliteBucket {
    /// Open (or create) a bucket database at the given path
    ///
    /// Use `:memory:` for an in-memory database (useful for testing).
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Open an in-memory database
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::new(":memory:")
    }

    fn initialize_schema(&self) -> Result<(), StoreError> {
        let schema = include_str!("schema.sql");
        self.conn.execute_batch(schema)?;
        Ok(())
    }

    /// Register an object; returns `false` if it already existed
    pub fn put_object(
        &mut self,
        bucket: &str,
        key: &str,
        size: Option<u64>,
    ) -> Result<bool, StoreError> {
        let inserted = self.conn.execute(
            "INSERT INTO objects (bucket, key, size) VALUES (?1, ?2, ?3)
             ON CONFLICT(bucket, key) DO NOTHING",
            params![bucket, key, size.map(|s| s as i64)],
        )?;
        if inserted > 0 {
            tracing::debug!("Registered s3://{}/{}", bucket, key);
        }
        Ok(inserted > 0)
    }

    /// Remove an object and its tags; returns `false` if it did not exist
    pub fn remove_object(&mut self, bucket: &str, key: &str) -> Result<bool, StoreError> {
        let removed = self.conn.execute(
            "DELETE FROM objects WHERE bucket = ?1 AND key = ?2",
            params![bucket, key],
        )?;
        Ok(removed > 0)
    }

    /// Names of buckets holding at least one object
    pub fn buckets(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT bucket FROM objects ORDER BY bucket")?;
        let buckets = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(buckets)
    }

    fn object_exists(&self, bucket: &str, key: &str) -> Result<bool, StoreError> {
        let exists = self
            .conn
            .query_row(
                "SELECT 1 FROM objects WHERE bucket = ?1 AND key = ?2",
                params![bucket, key],
                |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
        Ok(exists)
    }

    fn not_found(bucket: &str, key: &str) -> StoreError {
        StoreError::NotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        }
    }
}

impl ArchiveStore for SqliteBucket {
    type Error = StoreError;

    fn list_objects(&self, bucket: &str) -> Result<Vec<ObjectEntry>, Self::Error> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, size FROM objects WHERE bucket = ?1 ORDER BY key")?;
        let objects = stmt
            .query_map(params![bucket], |row| {
                let size: Option<i64> = row.get(1)?;
                Ok(ObjectEntry {
                    key: row.get(0)?,
                    size: size.map(|s| s as u64),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(objects)
    }

    fn get_tag(&self, bucket: &str, key: &str, tag: &str) -> Result<Option<String>, Self::Error> {
        if !self.object_exists(bucket, key)? {
            return Err(Self::not_found(bucket, key));
        }
        let value = self
            .conn
            .query_row(
                "SELECT value FROM object_tags WHERE bucket = ?1 AND key = ?2 AND tag = ?3",
                params![bucket, key, tag],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn put_tag(
        &mut self,
        bucket: &str,
        key: &str,
        tag: &str,
        value: &str,
    ) -> Result<(), Self::Error> {
        if !self.object_exists(bucket, key)? {
            return Err(Self::not_found(bucket, key));
        }
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM object_tags WHERE bucket = ?1 AND key = ?2",
            params![bucket, key],
        )?;
        tx.execute(
            "INSERT INTO object_tags (bucket, key, tag, value) VALUES (?1, ?2, ?3, ?4)",
            params![bucket, key, tag, value],
        )?;
        tx.commit()?;
        Ok(())
    }
}
