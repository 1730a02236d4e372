//! `Dragonfly` (Redis-compatible) hot cache for UDV snapshots.
//!
//! Assembled UDVs are cached so the fifteen experts of a round read one
//! snapshot instead of triggering fifteen adapter fans-out. Keys follow
//! the assembler's `(game_id, rounded_snapshot_time)` scheme and expire
//! on the shortest section TTL, so no cached section outlives its
//! freshness window.
//!
//! # Key Patterns
//!
//! | Pattern | Type | Description |
//! |---------|------|-------------|
//! | `udv:{game}:{ts}` | JSON | Cached UDV snapshot |
//! | `udv:latest:{game}` | String | Key of the newest snapshot |

use std::time::Duration;

use fred::prelude::*;
use serde::Serialize;
use serde::de::DeserializeOwned;

use gridiron_types::{GameId, UniversalGameData};

use crate::error::DbError;

/// Connection handle to a `Dragonfly` (Redis-compatible) instance.
#[derive(Clone)]
pub struct DragonflyPool {
    client: Client,
}

impl DragonflyPool {
    /// Connect to `Dragonfly` at the given URL.
    ///
    /// The URL follows the Redis scheme: `redis://host:port` or
    /// `redis://host:port/db`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] if the URL cannot be parsed.
    /// Returns [`DbError::Dragonfly`] if the connection fails.
    pub async fn connect(url: &str) -> Result<Self, DbError> {
        let config = Config::from_url(url)
            .map_err(|e| DbError::Config(format!("Invalid Dragonfly URL: {e}")))?;

        let client = Builder::from_config(config).build()?;
        client.init().await?;

        tracing::info!("Connected to Dragonfly");
        Ok(Self { client })
    }

    // =========================================================================
    // Generic JSON get/set with expiry
    // =========================================================================

    /// Serialize `value` as JSON and store it at `key` with a TTL.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Serialization`] if serialization fails.
    /// Returns [`DbError::Dragonfly`] if the write fails.
    pub async fn set_json_ttl<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<(), DbError> {
        let json = serde_json::to_string(value)?;
        let expiration = Expiration::EX(i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX));
        let _: () = self
            .client
            .set(key, json.as_str(), Some(expiration), None, false)
            .await?;
        Ok(())
    }

    /// Read the value at `key` and deserialize from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::KeyNotFound`] if the key does not exist.
    /// Returns [`DbError::Serialization`] if deserialization fails.
    /// Returns [`DbError::Dragonfly`] if the read fails.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<T, DbError> {
        let value: Option<String> = self.client.get(key).await?;
        value.map_or_else(
            || Err(DbError::KeyNotFound(key.to_owned())),
            |s| Ok(serde_json::from_str(&s)?),
        )
    }

    /// Delete a key.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Dragonfly`] if the delete fails.
    pub async fn delete(&self, key: &str) -> Result<(), DbError> {
        let _: u32 = self.client.del(key).await?;
        Ok(())
    }

    // =========================================================================
    // UDV snapshot cache
    // =========================================================================

    /// Cache a UDV snapshot under its assembler key.
    ///
    /// Also updates the `udv:latest:{game}` pointer so readers can find
    /// the newest snapshot without knowing its rounded timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] on serialization or write failure.
    pub async fn cache_udv(
        &self,
        cache_key: &str,
        udv: &UniversalGameData,
        ttl: Duration,
    ) -> Result<(), DbError> {
        self.set_json_ttl(cache_key, udv, ttl).await?;

        let latest_key = latest_pointer_key(udv.game_id);
        let expiration = Expiration::EX(i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX));
        let _: () = self
            .client
            .set(&latest_key, cache_key, Some(expiration), None, false)
            .await?;

        tracing::debug!(key = cache_key, game_id = %udv.game_id, "UDV cached");
        Ok(())
    }

    /// Fetch a cached UDV by its exact key.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::KeyNotFound`] on a cache miss.
    pub async fn get_udv(&self, cache_key: &str) -> Result<UniversalGameData, DbError> {
        self.get_json(cache_key).await
    }

    /// Fetch the newest cached UDV for a game, if any.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::KeyNotFound`] when no snapshot is cached.
    pub async fn get_latest_udv(&self, game_id: GameId) -> Result<UniversalGameData, DbError> {
        let latest_key = latest_pointer_key(game_id);
        let pointer: Option<String> = self.client.get(&latest_key).await?;
        match pointer {
            Some(key) => self.get_udv(&key).await,
            None => Err(DbError::KeyNotFound(latest_key)),
        }
    }
}

/// The `udv:latest:{game}` pointer key.
fn latest_pointer_key(game_id: GameId) -> String {
    format!("udv:latest:{game_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_pointer_key_embeds_game_id() {
        let game_id = GameId::new();
        let key = latest_pointer_key(game_id);
        assert!(key.starts_with("udv:latest:"));
        assert!(key.contains(&game_id.to_string()));
    }
}
