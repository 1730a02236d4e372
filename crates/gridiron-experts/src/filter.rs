//! The personality filter: projecting the UDV into an expert's view.
//!
//! Fairness lives here. Every expert is offered the same
//! [`UniversalGameData`]; the filter removes the sections the expert's
//! access flags hide and pins the profile version, but never alters the
//! data that survives. Two experts with the same flags see byte-identical
//! sections.
//!
//! Filtering is deterministic: the same `(profile version, access flags,
//! UDV content hash)` always produces the same view hash, which makes
//! "did these experts see the same thing" an equality check.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use gridiron_types::{
    ExpertId, GameId, HistoricalSection, InjuryReport, MarketSection, NewsSection,
    PersonalityProfile, SnapshotId, StatsSection, UniversalGameData, WeatherSection,
};

/// Namespace UUID for view hashes (v5).
const VIEW_NAMESPACE: Uuid = Uuid::from_bytes([
    0x76, 0x69, 0x65, 0x77, 0x2d, 0x6e, 0x73, 0x2d, 0x67, 0x72, 0x69, 0x64, 0x69, 0x72, 0x6f,
    0x6e,
]);

/// A UDV projected through one expert's personality.
///
/// Hidden sections are `None` regardless of whether the underlying UDV
/// carried them; visible sections are verbatim copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilteredView {
    /// The viewing expert.
    pub expert_id: ExpertId,
    /// The game.
    pub game_id: GameId,
    /// The source snapshot.
    pub snapshot_id: SnapshotId,
    /// Profile version pinned at filter time.
    pub profile_version: u32,
    /// Home team abbreviation.
    pub home_team: String,
    /// Away team abbreviation.
    pub away_team: String,
    /// Market lines, if visible and present.
    pub market: Option<MarketSection>,
    /// Weather, if visible and present.
    pub weather: Option<WeatherSection>,
    /// Injuries, if visible and present.
    pub injuries: Option<Vec<InjuryReport>>,
    /// Team stats, if visible and present.
    pub stats: Option<StatsSection>,
    /// Historical metrics, if visible and present.
    pub historical: Option<HistoricalSection>,
    /// News and sentiment, if visible and present.
    pub news: Option<NewsSection>,
    /// Deterministic hash of (profile version, access flags, UDV hash).
    pub view_hash: Uuid,
}

impl FilteredView {
    /// Whether the view carries any section at all.
    pub const fn has_any_section(&self) -> bool {
        self.market.is_some()
            || self.weather.is_some()
            || self.injuries.is_some()
            || self.stats.is_some()
            || self.historical.is_some()
            || self.news.is_some()
    }
}

/// Project a UDV through an expert's personality.
///
/// Sections the expert's access flags hide are dropped; everything else
/// is copied untouched. The view hash commits to the profile version,
/// the access flags, and the UDV content hash.
pub fn filter_view(udv: &UniversalGameData, profile: &PersonalityProfile) -> FilteredView {
    let access = profile.access;
    let flag_bits = format!(
        "{}{}{}{}{}{}",
        u8::from(access.stats),
        u8::from(access.odds),
        u8::from(access.weather),
        u8::from(access.injuries),
        u8::from(access.historical),
        u8::from(access.public_betting),
    );
    let hash_input = format!("{}:{}:{}", profile.version, flag_bits, udv.content_hash());
    let view_hash = Uuid::new_v5(&VIEW_NAMESPACE, hash_input.as_bytes());

    FilteredView {
        expert_id: profile.expert_id,
        game_id: udv.game_id,
        snapshot_id: udv.snapshot_id,
        profile_version: profile.version,
        home_team: udv.home_team.clone(),
        away_team: udv.away_team.clone(),
        market: access.odds.then(|| udv.market.data.clone()).flatten(),
        weather: access.weather.then(|| udv.weather.data.clone()).flatten(),
        injuries: access.injuries.then(|| udv.injuries.data.clone()).flatten(),
        stats: access.stats.then(|| udv.stats.data.clone()).flatten(),
        historical: access
            .historical
            .then(|| udv.historical.data.clone())
            .flatten(),
        news: access
            .public_betting
            .then(|| udv.news.data.clone())
            .flatten(),
        view_hash,
    }
}
