//! Scrape record rows.
//!
//! Each row holds one serialized record keyed by the hash of its URL.
//! Writes are single-statement upserts, so a concurrent reader sees
//! either the previous row or the new one, never a partial record.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

use super::connection::CacheDb;
use super::hash::record_key;
use super::{CacheStore, PurgeFilter};
use crate::Error;

/// Fixed-width UTC timestamps so stored values compare lexically.
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl CacheDb {
    /// Fetch the serialized record for `url` if present and unexpired.
    pub async fn get_record(&self, url: &str) -> Result<Option<String>, Error> {
        let key = record_key(url);
        let now = timestamp(Utc::now());
        self.conn
            .call(move |conn| -> Result<Option<String>, Error> {
                let result = conn.query_row(
                    "SELECT record_json FROM scrape_records
                     WHERE key_hash = ?1 AND (expires_at IS NULL OR expires_at > ?2)",
                    params![key, now],
                    |row| row.get(0),
                );

                match result {
                    Ok(json) => Ok(Some(json)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or overwrite the record for `url`, then enforce `max_entries`.
    pub async fn put_record(&self, url: &str, record_json: &str) -> Result<(), Error> {
        let key = record_key(url);
        let url = url.to_string();
        let record_json = record_json.to_string();
        let now = Utc::now();
        let stored_at = timestamp(now);
        let expires_at = self
            .ttl
            .and_then(|ttl| chrono::Duration::from_std(ttl).ok())
            .map(|ttl| timestamp(now + ttl));

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO scrape_records (key_hash, url, record_json, stored_at, expires_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     ON CONFLICT(key_hash) DO UPDATE SET
                        url = excluded.url,
                        record_json = excluded.record_json,
                        stored_at = excluded.stored_at,
                        expires_at = excluded.expires_at",
                    params![key, url, record_json, stored_at, expires_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)?;

        if let Some(max_entries) = self.max_entries {
            let evicted = self.purge_lru(max_entries).await?;
            if evicted > 0 {
                tracing::debug!(evicted, max_entries, "evicted oldest cache records");
            }
        }
        Ok(())
    }

    /// Remove the record for `url`. Returns whether a row existed.
    pub async fn delete_record(&self, url: &str) -> Result<bool, Error> {
        let key = record_key(url);
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM scrape_records WHERE key_hash = ?1", params![key])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete records whose TTL has elapsed.
    pub async fn purge_expired(&self) -> Result<u64, Error> {
        let now = timestamp(Utc::now());
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute(
                    "DELETE FROM scrape_records WHERE expires_at IS NOT NULL AND expires_at <= ?1",
                    params![now],
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete records whose URL contains `domain`.
    pub async fn purge_by_domain(&self, domain: &str) -> Result<u64, Error> {
        let pattern = format!("%{domain}%");
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM scrape_records WHERE url LIKE ?1", params![pattern])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete the oldest records until at most `max_entries` remain.
    pub async fn purge_lru(&self, max_entries: usize) -> Result<u64, Error> {
        let max = i64::try_from(max_entries).unwrap_or(i64::MAX);
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM scrape_records", [], |row| row.get(0))?;
                if count <= max {
                    return Ok(0);
                }

                let deleted = conn.execute(
                    "DELETE FROM scrape_records WHERE key_hash IN (
                        SELECT key_hash FROM scrape_records ORDER BY stored_at ASC, rowid ASC LIMIT ?1
                    )",
                    params![count - max],
                )?;
                Ok(deleted as u64)
            })
            .await
            .map_err(Error::from)
    }

    pub async fn count_records(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM scrape_records", [], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[async_trait]
impl CacheStore for CacheDb {
    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        self.get_record(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        self.put_record(key, value).await
    }

    async fn purge(&self, filter: &PurgeFilter) -> Result<u64, Error> {
        let mut deleted = 0;
        if filter.expired {
            deleted += self.purge_expired().await?;
        }
        if let Some(domain) = &filter.domain {
            deleted += self.purge_by_domain(domain).await?;
        }
        if let Some(max_entries) = filter.max_entries {
            deleted += self.purge_lru(max_entries).await?;
        }
        Ok(deleted)
    }
}
