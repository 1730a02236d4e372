//! The Universal Data View: one canonical per-game fact packet.
//!
//! Every expert reads the same UDV for a given `(game_id, snapshot_time)`.
//! Fairness depends on this: experts differ only in which sections their
//! personality lets them see and how they weight factors, never in the
//! underlying data.
//!
//! Sections are optional. An adapter outage marks the section absent but
//! the UDV is still produced; downstream code must tolerate missing
//! sections. Each section carries its own `last_fetched_at` so staleness
//! can be warned about per section.
//!
//! UDVs are content-addressed: [`UniversalGameData::content_hash`] is a
//! deterministic UUID v5 digest over the canonical JSON serialization.
//! Snapshots are superseded, never mutated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::enums::{InjuryStatus, UdvSection};
use crate::ids::{GameId, SnapshotId};

/// Namespace UUID for content-hashing UDV snapshots (v5).
const UDV_NAMESPACE: Uuid = Uuid::from_bytes([
    0x75, 0x64, 0x76, 0x2d, 0x6e, 0x73, 0x2d, 0x67, 0x72, 0x69, 0x64, 0x69, 0x72, 0x6f, 0x6e,
    0x21,
]);

// ---------------------------------------------------------------------------
// Section slot
// ---------------------------------------------------------------------------

/// One optional UDV section plus its fetch metadata.
///
/// `data = None` means the section is absent (adapter outage or not yet
/// ingested). `last_fetched_at` survives even when the fetch failed so
/// staleness warnings can reference the last good fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionSlot<T> {
    /// The section payload, if the adapter produced one.
    pub data: Option<T>,
    /// When the payload was last fetched successfully.
    pub last_fetched_at: Option<DateTime<Utc>>,
}

impl<T> SectionSlot<T> {
    /// An absent section.
    pub const fn absent() -> Self {
        Self {
            data: None,
            last_fetched_at: None,
        }
    }

    /// A present section fetched at `at`.
    pub const fn present(data: T, at: DateTime<Utc>) -> Self {
        Self {
            data: Some(data),
            last_fetched_at: Some(at),
        }
    }

    /// Whether the section carries data.
    pub const fn is_present(&self) -> bool {
        self.data.is_some()
    }

    /// Age of the section relative to `now`, if it was ever fetched.
    pub fn age(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        self.last_fetched_at.map(|at| now.signed_duration_since(at))
    }
}

impl<T> Default for SectionSlot<T> {
    fn default() -> Self {
        Self::absent()
    }
}

// ---------------------------------------------------------------------------
// Section payloads
// ---------------------------------------------------------------------------

/// Bookmaker market lines for the game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSection {
    /// Point spread from the home team's perspective (negative = favored).
    pub spread_home: f64,
    /// American moneyline on the home team.
    pub moneyline_home: i32,
    /// American moneyline on the away team.
    pub moneyline_away: i32,
    /// Over/under on the combined score.
    pub total: f64,
    /// Bookmaker identifier.
    pub bookmaker: String,
    /// When the bookmaker last updated these lines.
    pub last_update: DateTime<Utc>,
}

/// Forecast conditions at kickoff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSection {
    /// Temperature in Fahrenheit.
    pub temperature_f: f64,
    /// Sustained wind speed in mph.
    pub wind_mph: f64,
    /// Compass wind direction (e.g. "NW").
    pub wind_direction: String,
    /// Relative humidity percentage.
    pub humidity_pct: f64,
    /// Chance of precipitation in [0, 1].
    pub precipitation_chance: f64,
    /// Free-text conditions summary.
    pub conditions: String,
}

/// A single player injury designation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjuryReport {
    /// Team abbreviation.
    pub team: String,
    /// Player name.
    pub player: String,
    /// Position code.
    pub position: String,
    /// Official designation.
    pub status: InjuryStatus,
    /// Free-text note from the report.
    pub note: String,
}

/// Per-team aggregate statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamStatLine {
    /// Points scored per game.
    pub points_for: f64,
    /// Points allowed per game.
    pub points_against: f64,
    /// Rushing yards per game.
    pub rush_yards: f64,
    /// Passing yards per game.
    pub pass_yards: f64,
    /// Turnovers committed per game.
    pub turnovers: f64,
    /// Third-down conversion rate in [0, 1].
    pub third_down_rate: f64,
    /// Red-zone touchdown rate in [0, 1].
    pub red_zone_rate: f64,
    /// Average time of possession in seconds.
    pub possession_secs: f64,
}

/// Rolling and season-to-date aggregates for both teams.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSection {
    /// Home team, last-N-game rolling window.
    pub home_rolling: TeamStatLine,
    /// Home team, season to date.
    pub home_season: TeamStatLine,
    /// Away team, last-N-game rolling window.
    pub away_rolling: TeamStatLine,
    /// Away team, season to date.
    pub away_season: TeamStatLine,
}

/// One prior meeting between the two teams.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadToHeadGame {
    /// Season the game was played.
    pub season: u16,
    /// Final home score.
    pub home_score: u16,
    /// Final away score.
    pub away_score: u16,
}

/// Head-to-head history and play-by-play tendency metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalSection {
    /// Expected points added per play, home team, recent window.
    pub home_epa_per_play: f64,
    /// Expected points added per play, away team, recent window.
    pub away_epa_per_play: f64,
    /// Play success rate, home team.
    pub home_success_rate: f64,
    /// Play success rate, away team.
    pub away_success_rate: f64,
    /// Prior meetings between the teams, most recent first.
    pub head_to_head: Vec<HeadToHeadGame>,
}

/// News headlines and public-sentiment summaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsSection {
    /// Recent headlines mentioning either team.
    pub headlines: Vec<String>,
    /// Aggregate sentiment toward the home team in [-1, 1].
    pub sentiment_home: f64,
    /// Aggregate sentiment toward the away team in [-1, 1].
    pub sentiment_away: f64,
    /// Share of public bets on the home side in [0, 1].
    pub public_bet_share_home: f64,
}

// ---------------------------------------------------------------------------
// UniversalGameData
// ---------------------------------------------------------------------------

/// The canonical per-game fact packet.
///
/// Built by the assembler from the latest adapter snapshots, cached with
/// per-section TTLs, and handed to every expert for the same game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniversalGameData {
    /// Snapshot row identifier.
    pub snapshot_id: SnapshotId,
    /// The game this snapshot describes.
    pub game_id: GameId,
    /// When this snapshot was assembled (rounded for cache keying).
    pub snapshot_time: DateTime<Utc>,
    /// Home team abbreviation.
    pub home_team: String,
    /// Away team abbreviation.
    pub away_team: String,
    /// Scheduled kickoff.
    pub kickoff: DateTime<Utc>,
    /// Venue name.
    pub venue: String,
    /// Bookmaker lines.
    pub market: SectionSlot<MarketSection>,
    /// Kickoff forecast.
    pub weather: SectionSlot<WeatherSection>,
    /// Injury designations.
    pub injuries: SectionSlot<Vec<InjuryReport>>,
    /// Team aggregates.
    pub stats: SectionSlot<StatsSection>,
    /// Head-to-head and tendency metrics.
    pub historical: SectionSlot<HistoricalSection>,
    /// News and sentiment.
    pub news: SectionSlot<NewsSection>,
}

impl UniversalGameData {
    /// Deterministic content hash of this snapshot.
    ///
    /// UUID v5 over the canonical JSON serialization. Two snapshots with
    /// identical content hash to the same value regardless of when or
    /// where they were assembled, which is what makes the fairness
    /// invariant checkable: experts given the same hash saw the same bytes.
    pub fn content_hash(&self) -> Uuid {
        let canonical = serde_json::to_string(self).unwrap_or_default();
        Uuid::new_v5(&UDV_NAMESPACE, canonical.as_bytes())
    }

    /// Whether a specific section is present.
    pub const fn section_present(&self, section: UdvSection) -> bool {
        match section {
            UdvSection::Market => self.market.is_present(),
            UdvSection::Weather => self.weather.is_present(),
            UdvSection::Injuries => self.injuries.is_present(),
            UdvSection::Stats => self.stats.is_present(),
            UdvSection::Historical => self.historical.is_present(),
            UdvSection::News => self.news.is_present(),
        }
    }

    /// Serialize one section to JSON for delta comparison.
    fn section_json(&self, section: UdvSection) -> String {
        let value = match section {
            UdvSection::Market => serde_json::to_value(&self.market),
            UdvSection::Weather => serde_json::to_value(&self.weather),
            UdvSection::Injuries => serde_json::to_value(&self.injuries),
            UdvSection::Stats => serde_json::to_value(&self.stats),
            UdvSection::Historical => serde_json::to_value(&self.historical),
            UdvSection::News => serde_json::to_value(&self.news),
        };
        value
            .ok()
            .and_then(|v| serde_json::to_string(&v).ok())
            .unwrap_or_default()
    }

    /// Sections whose content differs between `self` and `other`.
    ///
    /// Order is fixed (market, weather, injuries, stats, historical, news)
    /// so callers can treat the first element as the dominant change.
    pub fn changed_sections(&self, other: &Self) -> Vec<UdvSection> {
        ALL_SECTIONS
            .iter()
            .copied()
            .filter(|&s| self.section_json(s) != other.section_json(s))
            .collect()
    }

    /// One-line summary of a section's content for causal chains.
    pub fn section_summary(&self, section: UdvSection) -> String {
        match section {
            UdvSection::Market => self.market.data.as_ref().map_or_else(
                || String::from("market absent"),
                |m| {
                    format!(
                        "spread {:+.1}, total {:.1} ({})",
                        m.spread_home, m.total, m.bookmaker
                    )
                },
            ),
            UdvSection::Weather => self.weather.data.as_ref().map_or_else(
                || String::from("weather absent"),
                |w| format!("{:.0}F, wind {:.0}mph {}", w.temperature_f, w.wind_mph, w.conditions),
            ),
            UdvSection::Injuries => self.injuries.data.as_ref().map_or_else(
                || String::from("injuries absent"),
                |list| format!("{} designations", list.len()),
            ),
            UdvSection::Stats => self.stats.data.as_ref().map_or_else(
                || String::from("stats absent"),
                |s| {
                    format!(
                        "home {:.1} ppg vs away {:.1} ppg",
                        s.home_season.points_for, s.away_season.points_for
                    )
                },
            ),
            UdvSection::Historical => self.historical.data.as_ref().map_or_else(
                || String::from("historical absent"),
                |h| {
                    format!(
                        "EPA {:+.2}/{:+.2}, {} prior meetings",
                        h.home_epa_per_play,
                        h.away_epa_per_play,
                        h.head_to_head.len()
                    )
                },
            ),
            UdvSection::News => self.news.data.as_ref().map_or_else(
                || String::from("news absent"),
                |n| {
                    format!(
                        "{} headlines, public {:.0}% home",
                        n.headlines.len(),
                        n.public_bet_share_home * 100.0
                    )
                },
            ),
        }
    }
}

/// All UDV sections in canonical comparison order.
pub const ALL_SECTIONS: [UdvSection; 6] = [
    UdvSection::Market,
    UdvSection::Weather,
    UdvSection::Injuries,
    UdvSection::Stats,
    UdvSection::Historical,
    UdvSection::News,
];

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_udv() -> UniversalGameData {
        UniversalGameData {
            snapshot_id: SnapshotId::new(),
            game_id: GameId::new(),
            snapshot_time: Utc::now(),
            home_team: String::from("KC"),
            away_team: String::from("BUF"),
            kickoff: Utc::now(),
            venue: String::from("Arrowhead Stadium"),
            market: SectionSlot::absent(),
            weather: SectionSlot::absent(),
            injuries: SectionSlot::absent(),
            stats: SectionSlot::absent(),
            historical: SectionSlot::absent(),
            news: SectionSlot::absent(),
        }
    }

    fn market() -> MarketSection {
        MarketSection {
            spread_home: -3.0,
            moneyline_home: -155,
            moneyline_away: 135,
            total: 48.5,
            bookmaker: String::from("consensus"),
            last_update: Utc::now(),
        }
    }

    #[test]
    fn absent_sections_still_produce_a_udv() {
        let udv = bare_udv();
        assert!(!udv.section_present(UdvSection::Market));
        assert!(!udv.section_present(UdvSection::Weather));
        assert_ne!(udv.content_hash(), Uuid::nil());
    }

    #[test]
    fn content_hash_is_deterministic() {
        let udv = bare_udv();
        assert_eq!(udv.content_hash(), udv.content_hash());

        let copy = udv.clone();
        assert_eq!(udv.content_hash(), copy.content_hash());
    }

    #[test]
    fn content_hash_changes_with_data() {
        let mut a = bare_udv();
        let b = a.clone();
        a.market = SectionSlot::present(market(), Utc::now());
        assert_ne!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn changed_sections_detects_market_move() {
        let mut before = bare_udv();
        before.market = SectionSlot::present(market(), Utc::now());

        let mut after = before.clone();
        let mut moved = market();
        moved.spread_home = -4.5;
        after.market = SectionSlot::present(moved, Utc::now());

        let changed = before.changed_sections(&after);
        assert_eq!(changed, vec![UdvSection::Market]);
    }

    #[test]
    fn changed_sections_empty_for_identical_snapshots() {
        let udv = bare_udv();
        assert!(udv.changed_sections(&udv.clone()).is_empty());
    }

    #[test]
    fn section_age_computed_from_fetch_time() {
        let fetched = Utc::now() - chrono::Duration::minutes(20);
        let slot = SectionSlot::present(market(), fetched);
        let age = slot.age(Utc::now());
        assert!(age.is_some_and(|d| d.num_minutes() >= 19));
    }

    #[test]
    fn section_summary_mentions_spread() {
        let mut udv = bare_udv();
        udv.market = SectionSlot::present(market(), Utc::now());
        let summary = udv.section_summary(UdvSection::Market);
        assert!(summary.contains("spread"));
    }
}
