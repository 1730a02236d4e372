//! Thin HTTP clients for the external data adapters.
//!
//! Each UDV section has one upstream endpoint. The clients are
//! deliberately dumb: issue the request with a per-call timeout, parse
//! the JSON payload into the section struct, classify failures as
//! transient (retryable) or parse (not). Retry policy, rate limiting,
//! and absence handling all live in the assembler.

use std::time::Duration;

use serde_json::Value;

use gridiron_types::{
    GameId, HistoricalSection, InjuryReport, MarketSection, NewsSection, StatsSection,
    WeatherSection,
};

use crate::UdvError;

/// Default per-call adapter timeout.
const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Configuration for one adapter endpoint.
#[derive(Debug, Clone)]
pub struct AdapterConfig {
    /// Base URL (e.g. `https://odds.example.com/v1`).
    pub base_url: String,
    /// Per-call timeout.
    pub timeout: Duration,
    /// Optional bearer token.
    pub api_key: Option<String>,
}

impl AdapterConfig {
    /// Config with the default timeout and no key.
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_owned(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            api_key: None,
        }
    }
}

/// An HTTP client bound to one adapter.
#[derive(Debug, Clone)]
pub struct AdapterClient {
    client: reqwest::Client,
    config: AdapterConfig,
}

impl AdapterClient {
    /// Build a client for the adapter.
    ///
    /// # Errors
    ///
    /// Returns [`UdvError::Config`] if the HTTP client cannot be built.
    pub fn new(config: AdapterConfig) -> Result<Self, UdvError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| UdvError::Config(format!("client build failed: {e}")))?;
        Ok(Self { client, config })
    }

    /// Issue a GET and return the raw JSON payload.
    async fn fetch_json(&self, path: &str) -> Result<Value, UdvError> {
        let url = format!("{}/{path}", self.config.base_url);
        let mut request = self.client.get(&url);
        if let Some(key) = &self.config.api_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(UdvError::Transient(format!("{url} returned {status}")));
        }
        Ok(response.json::<Value>().await?)
    }

    /// Fetch and parse one typed section payload.
    async fn fetch_section<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<T, UdvError> {
        let json = self.fetch_json(path).await?;
        serde_json::from_value(json).map_err(|e| UdvError::Parse(format!("{path}: {e}")))
    }

    /// Bookmaker lines for a game.
    pub async fn fetch_market(&self, game_id: GameId) -> Result<MarketSection, UdvError> {
        self.fetch_section(&format!("odds/{game_id}")).await
    }

    /// Kickoff forecast for a game.
    pub async fn fetch_weather(&self, game_id: GameId) -> Result<WeatherSection, UdvError> {
        self.fetch_section(&format!("weather/{game_id}")).await
    }

    /// Injury designations for a game.
    pub async fn fetch_injuries(&self, game_id: GameId) -> Result<Vec<InjuryReport>, UdvError> {
        self.fetch_section(&format!("injuries/{game_id}")).await
    }

    /// Rolling and season team aggregates.
    pub async fn fetch_stats(&self, game_id: GameId) -> Result<StatsSection, UdvError> {
        self.fetch_section(&format!("stats/{game_id}")).await
    }

    /// Head-to-head and play-by-play tendency metrics.
    pub async fn fetch_historical(&self, game_id: GameId) -> Result<HistoricalSection, UdvError> {
        self.fetch_section(&format!("historical/{game_id}")).await
    }

    /// News and sentiment summaries.
    pub async fn fetch_news(&self, game_id: GameId) -> Result<NewsSection, UdvError> {
        self.fetch_section(&format!("news/{game_id}")).await
    }

    /// The scheduled games for one season week.
    pub async fn fetch_schedule(
        &self,
        season: u16,
        week: u16,
    ) -> Result<Vec<ScheduledGame>, UdvError> {
        self.fetch_section(&format!("schedule/{season}/{week}")).await
    }
}

/// One scheduled game from the stats adapter's schedule endpoint.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ScheduledGame {
    /// The game.
    pub game_id: GameId,
    /// Home team abbreviation.
    pub home_team: String,
    /// Away team abbreviation.
    pub away_team: String,
    /// Scheduled kickoff.
    pub kickoff: chrono::DateTime<chrono::Utc>,
    /// Venue name.
    pub venue: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = AdapterConfig::new("https://odds.example.com/v1");
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert!(config.api_key.is_none());
    }

    #[test]
    fn client_builds_from_config() {
        let client = AdapterClient::new(AdapterConfig::new("https://odds.example.com/v1"));
        assert!(client.is_ok());
    }

    #[test]
    fn market_payload_parses() {
        let json = serde_json::json!({
            "spread_home": -3.0,
            "moneyline_home": -155,
            "moneyline_away": 135,
            "total": 48.5,
            "bookmaker": "consensus",
            "last_update": "2025-11-02T17:00:00Z"
        });
        let parsed: Result<MarketSection, _> = serde_json::from_value(json);
        assert!(parsed.is_ok());
    }

    #[test]
    fn injuries_payload_parses() {
        let json = serde_json::json!([
            {
                "team": "KC",
                "player": "Some Player",
                "position": "WR",
                "status": "questionable",
                "note": "hamstring, limited Friday"
            }
        ]);
        let parsed: Result<Vec<InjuryReport>, _> = serde_json::from_value(json);
        assert!(parsed.is_ok_and(|list| list.len() == 1));
    }

    #[test]
    fn malformed_payload_is_a_parse_error() {
        let json = serde_json::json!({"spread_home": "not a number"});
        let parsed: Result<MarketSection, _> = serde_json::from_value(json);
        assert!(parsed.is_err());
    }
}
