//! The UDV assembler: retries, presence flags, staleness, cache keys.
//!
//! `assemble` fans out to every adapter, retrying transient failures
//! with exponential backoff (three attempts), and produces a UDV no
//! matter what: sections that could not be fetched are marked absent.
//! Each fetch passes through the adapter's token bucket first, so rate
//! limits pause the assembler rather than erroring it.
//!
//! Snapshots are keyed by `(game_id, rounded_snapshot_time)`; the hot
//! cache stores them under [`cache_key`] with per-section TTLs (odds
//! roughly 15 minutes, weather an hour, stats a day). Staleness past a
//! per-section threshold is a soft warning -- the UDV stays usable.

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};

use gridiron_types::{GameId, SectionSlot, SnapshotId, UdvSection, UniversalGameData};

use crate::adapters::AdapterClient;
use crate::ratelimit::TokenBucket;
use crate::UdvError;

/// Retry attempts per adapter call.
pub const RETRY_ATTEMPTS: u32 = 3;

/// Base backoff between retries; doubles each attempt.
const BACKOFF_BASE_MS: u64 = 200;

/// Snapshot times round down to this granularity for cache keying.
const SNAPSHOT_GRANULARITY_SECS: i64 = 300;

// ---------------------------------------------------------------------------
// Thresholds and TTLs
// ---------------------------------------------------------------------------

/// Per-section staleness thresholds (soft warnings).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StalenessThresholds {
    /// Market lines go stale fast.
    pub market: Duration,
    /// Weather forecasts hold for an hour.
    pub weather: Duration,
    /// Injury reports hold for an hour.
    pub injuries: Duration,
    /// Team aggregates hold for a day.
    pub stats: Duration,
    /// Historical metrics hold for a day.
    pub historical: Duration,
    /// News and sentiment hold for half an hour.
    pub news: Duration,
}

impl Default for StalenessThresholds {
    fn default() -> Self {
        Self {
            market: Duration::from_secs(15 * 60),
            weather: Duration::from_secs(60 * 60),
            injuries: Duration::from_secs(60 * 60),
            stats: Duration::from_secs(24 * 60 * 60),
            historical: Duration::from_secs(24 * 60 * 60),
            news: Duration::from_secs(30 * 60),
        }
    }
}

impl StalenessThresholds {
    /// The threshold for one section.
    pub const fn for_section(&self, section: UdvSection) -> Duration {
        match section {
            UdvSection::Market => self.market,
            UdvSection::Weather => self.weather,
            UdvSection::Injuries => self.injuries,
            UdvSection::Stats => self.stats,
            UdvSection::Historical => self.historical,
            UdvSection::News => self.news,
        }
    }
}

/// Per-section cache TTLs for the hot cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
    /// Odds TTL (about 15 minutes).
    pub market: Duration,
    /// Weather TTL (about an hour).
    pub weather: Duration,
    /// Stats TTL (about a day).
    pub stats: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            market: Duration::from_secs(15 * 60),
            weather: Duration::from_secs(60 * 60),
            stats: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl CacheTtls {
    /// The TTL governing a whole cached snapshot: the shortest section
    /// TTL, so no section outlives its freshness window.
    pub fn snapshot_ttl(&self) -> Duration {
        self.market.min(self.weather).min(self.stats)
    }
}

// ---------------------------------------------------------------------------
// Cache keying
// ---------------------------------------------------------------------------

/// Round a snapshot time down to the cache granularity.
pub fn rounded_snapshot_time(at: DateTime<Utc>) -> DateTime<Utc> {
    let secs = at.timestamp();
    let rounded = secs.saturating_sub(secs.rem_euclid(SNAPSHOT_GRANULARITY_SECS));
    Utc.timestamp_opt(rounded, 0).single().unwrap_or(at)
}

/// The hot-cache key for a snapshot.
pub fn cache_key(game_id: GameId, rounded: DateTime<Utc>) -> String {
    format!("udv:{game_id}:{}", rounded.timestamp())
}

// ---------------------------------------------------------------------------
// Retries
// ---------------------------------------------------------------------------

/// Run an async operation with exponential backoff.
///
/// Retries only [`UdvError::Transient`]; parse and config errors fail
/// immediately. The final error is returned after `attempts` tries.
///
/// # Errors
///
/// Returns the last error once attempts are exhausted.
pub async fn with_retries<T, F, Fut>(attempts: u32, mut op: F) -> Result<T, UdvError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, UdvError>>,
{
    let mut backoff = Duration::from_millis(BACKOFF_BASE_MS);
    let mut last_error = UdvError::Transient(String::from("no attempts made"));

    for attempt in 0..attempts.max(1) {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e @ (UdvError::Parse(_) | UdvError::Config(_))) => return Err(e),
            Err(e) => {
                tracing::debug!(attempt, error = %e, "transient adapter failure");
                last_error = e;
                if attempt.saturating_add(1) < attempts {
                    tokio::time::sleep(backoff).await;
                    backoff = backoff.saturating_mul(2);
                }
            }
        }
    }

    Err(last_error)
}

// ---------------------------------------------------------------------------
// Assembler
// ---------------------------------------------------------------------------

/// Static facts about a game, known at schedule time.
#[derive(Debug, Clone)]
pub struct GameMeta {
    /// The game.
    pub game_id: GameId,
    /// Home team abbreviation.
    pub home_team: String,
    /// Away team abbreviation.
    pub away_team: String,
    /// Scheduled kickoff.
    pub kickoff: DateTime<Utc>,
    /// Venue name.
    pub venue: String,
}

/// The set of adapter clients and their rate buckets.
pub struct UdvAssembler {
    odds: AdapterClient,
    weather: AdapterClient,
    injuries: AdapterClient,
    stats: AdapterClient,
    historical: Option<AdapterClient>,
    news: AdapterClient,
    buckets: AdapterBuckets,
    thresholds: StalenessThresholds,
}

/// One token bucket per adapter.
struct AdapterBuckets {
    odds: TokenBucket,
    weather: TokenBucket,
    injuries: TokenBucket,
    stats: TokenBucket,
    historical: TokenBucket,
    news: TokenBucket,
}

impl Default for AdapterBuckets {
    fn default() -> Self {
        Self {
            odds: TokenBucket::new(10, 2.0),
            weather: TokenBucket::new(10, 1.0),
            injuries: TokenBucket::new(10, 1.0),
            stats: TokenBucket::new(5, 0.5),
            historical: TokenBucket::new(5, 0.5),
            news: TokenBucket::new(10, 1.0),
        }
    }
}

impl UdvAssembler {
    /// Wire up an assembler from adapter clients.
    ///
    /// The historical adapter is optional; when absent its section is
    /// always recorded absent.
    pub fn new(
        odds: AdapterClient,
        weather: AdapterClient,
        injuries: AdapterClient,
        stats: AdapterClient,
        historical: Option<AdapterClient>,
        news: AdapterClient,
    ) -> Self {
        Self {
            odds,
            weather,
            injuries,
            stats,
            historical,
            news,
            buckets: AdapterBuckets::default(),
            thresholds: StalenessThresholds::default(),
        }
    }

    /// Assemble one UDV snapshot.
    ///
    /// Every section fetch is rate-limited, retried on transient
    /// failures, and degraded to absent on final failure. The returned
    /// UDV always exists.
    pub async fn assemble(&self, meta: &GameMeta, snapshot_time: DateTime<Utc>) -> UniversalGameData {
        let game_id = meta.game_id;
        let now = Utc::now();

        self.buckets.odds.acquire().await;
        let market = section_slot(
            with_retries(RETRY_ATTEMPTS, || self.odds.fetch_market(game_id)).await,
            now,
            UdvSection::Market,
        );

        self.buckets.weather.acquire().await;
        let weather = section_slot(
            with_retries(RETRY_ATTEMPTS, || self.weather.fetch_weather(game_id)).await,
            now,
            UdvSection::Weather,
        );

        self.buckets.injuries.acquire().await;
        let injuries = section_slot(
            with_retries(RETRY_ATTEMPTS, || self.injuries.fetch_injuries(game_id)).await,
            now,
            UdvSection::Injuries,
        );

        self.buckets.stats.acquire().await;
        let stats = section_slot(
            with_retries(RETRY_ATTEMPTS, || self.stats.fetch_stats(game_id)).await,
            now,
            UdvSection::Stats,
        );

        let historical = match &self.historical {
            Some(client) => {
                self.buckets.historical.acquire().await;
                section_slot(
                    with_retries(RETRY_ATTEMPTS, || client.fetch_historical(game_id)).await,
                    now,
                    UdvSection::Historical,
                )
            }
            None => SectionSlot::absent(),
        };

        self.buckets.news.acquire().await;
        let news = section_slot(
            with_retries(RETRY_ATTEMPTS, || self.news.fetch_news(game_id)).await,
            now,
            UdvSection::News,
        );

        let udv = UniversalGameData {
            snapshot_id: SnapshotId::new(),
            game_id,
            snapshot_time: rounded_snapshot_time(snapshot_time),
            home_team: meta.home_team.clone(),
            away_team: meta.away_team.clone(),
            kickoff: meta.kickoff,
            venue: meta.venue.clone(),
            market,
            weather,
            injuries,
            stats,
            historical,
            news,
        };

        for (section, age) in stale_sections(&udv, now, &self.thresholds) {
            tracing::warn!(
                game_id = %game_id,
                section = ?section,
                age_secs = age.num_seconds(),
                "UDV section stale; proceeding with flag"
            );
        }

        tracing::info!(
            game_id = %game_id,
            hash = %udv.content_hash(),
            market = udv.market.is_present(),
            weather = udv.weather.is_present(),
            injuries = udv.injuries.is_present(),
            stats = udv.stats.is_present(),
            historical = udv.historical.is_present(),
            news = udv.news.is_present(),
            "UDV assembled"
        );

        udv
    }
}

/// Convert a fetch result into a section slot, logging absences.
fn section_slot<T>(
    result: Result<T, UdvError>,
    now: DateTime<Utc>,
    section: UdvSection,
) -> SectionSlot<T> {
    match result {
        Ok(data) => SectionSlot::present(data, now),
        Err(e) => {
            tracing::warn!(section = ?section, error = %e, "section absent after retries");
            SectionSlot::absent()
        }
    }
}

/// Sections of a UDV older than their staleness threshold.
pub fn stale_sections(
    udv: &UniversalGameData,
    now: DateTime<Utc>,
    thresholds: &StalenessThresholds,
) -> Vec<(UdvSection, chrono::Duration)> {
    gridiron_types::ALL_SECTIONS
        .iter()
        .filter_map(|&section| {
            let age = match section {
                UdvSection::Market => udv.market.age(now),
                UdvSection::Weather => udv.weather.age(now),
                UdvSection::Injuries => udv.injuries.age(now),
                UdvSection::Stats => udv.stats.age(now),
                UdvSection::Historical => udv.historical.age(now),
                UdvSection::News => udv.news.age(now),
            }?;
            let threshold = chrono::Duration::from_std(thresholds.for_section(section)).ok()?;
            (age > threshold).then_some((section, age))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use gridiron_types::MarketSection;

    use super::*;

    #[test]
    fn snapshot_time_rounds_down_to_granularity() {
        let at = Utc.timestamp_opt(1_700_000_123, 0).single().unwrap_or_default();
        let rounded = rounded_snapshot_time(at);
        assert_eq!(rounded.timestamp().rem_euclid(SNAPSHOT_GRANULARITY_SECS), 0);
        assert!(rounded <= at);
    }

    #[test]
    fn cache_key_stable_for_same_rounded_time() {
        let game = GameId::new();
        let a = Utc.timestamp_opt(1_700_000_100, 0).single().unwrap_or_default();
        let b = Utc.timestamp_opt(1_700_000_250, 0).single().unwrap_or_default();
        assert_eq!(
            cache_key(game, rounded_snapshot_time(a)),
            cache_key(game, rounded_snapshot_time(b)),
        );
    }

    #[test]
    fn snapshot_ttl_is_shortest_section_ttl() {
        let ttls = CacheTtls::default();
        assert_eq!(ttls.snapshot_ttl(), ttls.market);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_stop_after_three_transient_failures() {
        let calls = AtomicU32::new(0);
        let result: Result<(), UdvError> = with_retries(RETRY_ATTEMPTS, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                let _ = n;
                Err(UdvError::Transient(String::from("down")))
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), RETRY_ATTEMPTS);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_recover_on_later_success() {
        let calls = AtomicU32::new(0);
        let result = with_retries(RETRY_ATTEMPTS, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(UdvError::Transient(String::from("flaky")))
                } else {
                    Ok(41_u32.saturating_add(1))
                }
            }
        })
        .await;
        assert_eq!(result.ok(), Some(42));
    }

    #[tokio::test]
    async fn parse_errors_do_not_retry() {
        let calls = AtomicU32::new(0);
        let result: Result<(), UdvError> = with_retries(RETRY_ATTEMPTS, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(UdvError::Parse(String::from("bad payload"))) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn stale_sections_flags_old_market() {
        let now = Utc::now();
        let old = now - chrono::Duration::minutes(30);
        let udv = UniversalGameData {
            snapshot_id: SnapshotId::new(),
            game_id: GameId::new(),
            snapshot_time: now,
            home_team: String::from("KC"),
            away_team: String::from("BUF"),
            kickoff: now,
            venue: String::from("Arrowhead Stadium"),
            market: SectionSlot::present(
                MarketSection {
                    spread_home: -3.0,
                    moneyline_home: -155,
                    moneyline_away: 135,
                    total: 48.5,
                    bookmaker: String::from("consensus"),
                    last_update: old,
                },
                old,
            ),
            weather: SectionSlot::absent(),
            injuries: SectionSlot::absent(),
            stats: SectionSlot::absent(),
            historical: SectionSlot::absent(),
            news: SectionSlot::absent(),
        };

        let stale = stale_sections(&udv, now, &StalenessThresholds::default());
        assert_eq!(stale.len(), 1);
        assert!(stale.first().is_some_and(|(s, _)| *s == UdvSection::Market));
    }

    #[test]
    fn absent_sections_are_not_stale() {
        let now = Utc::now();
        let udv = UniversalGameData {
            snapshot_id: SnapshotId::new(),
            game_id: GameId::new(),
            snapshot_time: now,
            home_team: String::from("KC"),
            away_team: String::from("BUF"),
            kickoff: now,
            venue: String::from("Arrowhead Stadium"),
            market: SectionSlot::absent(),
            weather: SectionSlot::absent(),
            injuries: SectionSlot::absent(),
            stats: SectionSlot::absent(),
            historical: SectionSlot::absent(),
            news: SectionSlot::absent(),
        };
        assert!(stale_sections(&udv, now, &StalenessThresholds::default()).is_empty());
    }
}
