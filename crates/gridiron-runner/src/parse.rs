//! LLM response parsing into schema-valid prediction bundles.
//!
//! The LLM returns raw text (ideally JSON). This module extracts the
//! JSON through several recovery strategies, deserializes it into the
//! loose raw shape, coerces confidences at the boundary (0 and 1 become
//! 0.05 and 0.95), attaches the identity the caller supplies, and runs
//! full schema validation. Validation failure is a *hard reject* -- the
//! bundle is never stored and the failure counts against the expert's
//! eligibility gate.
//!
//! Raw maps never travel deeper than this module: downstream code only
//! ever sees a validated [`PredictionBundle`].

use chrono::Utc;
use serde::Deserialize;

use gridiron_types::bundle::{
    Assertion, Factor, MarginCall, PeriodCall, PlayerPropCall, PredictionBundle, SituationalCall,
    SpreadCall, TeamStatCall, TotalCall, WinnerCall, coerce_confidence,
};
use gridiron_types::{
    BundleStatus, ExpertId, GameId, PickSide, PredictionId, SnapshotId,
};

use crate::error::RunnerError;

// ---------------------------------------------------------------------------
// Identity context
// ---------------------------------------------------------------------------

/// The identity a parsed bundle is stamped with.
///
/// The LLM never supplies identifiers; the orchestrator does.
#[derive(Debug, Clone, Copy)]
pub struct BundleContext {
    /// The predicting expert.
    pub expert_id: ExpertId,
    /// The game.
    pub game_id: GameId,
    /// The UDV snapshot the prediction was made from.
    pub snapshot_id: SnapshotId,
    /// Profile version pinned at predict time.
    pub profile_version: u32,
}

// ---------------------------------------------------------------------------
// Raw (loose) shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawFactor {
    name: String,
    #[serde(default)]
    weight: f64,
    #[serde(default)]
    confidence: f64,
}

#[derive(Debug, Deserialize)]
struct RawAssertionFields {
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    reasoning: String,
    #[serde(default)]
    factors: Vec<RawFactor>,
}

#[derive(Debug, Deserialize)]
struct RawWinner {
    pick: String,
    #[serde(default)]
    win_probability_home: f64,
    #[serde(default)]
    win_probability_away: f64,
    #[serde(flatten)]
    assertion: RawAssertionFields,
}

#[derive(Debug, Deserialize)]
struct RawSpread {
    spread_home: f64,
    #[serde(flatten)]
    assertion: RawAssertionFields,
}

#[derive(Debug, Deserialize)]
struct RawTotal {
    total: f64,
    #[serde(flatten)]
    assertion: RawAssertionFields,
}

#[derive(Debug, Deserialize)]
struct RawMargin {
    margin_home: f64,
    #[serde(flatten)]
    assertion: RawAssertionFields,
}

#[derive(Debug, Deserialize)]
struct RawPeriod {
    label: String,
    home_points: f64,
    away_points: f64,
    #[serde(flatten)]
    assertion: RawAssertionFields,
}

#[derive(Debug, Deserialize)]
struct RawTeamStat {
    side: String,
    stat_key: String,
    value: f64,
    #[serde(flatten)]
    assertion: RawAssertionFields,
}

#[derive(Debug, Deserialize)]
struct RawProp {
    side: String,
    prop_key: String,
    line_value: f64,
    #[serde(default)]
    over: bool,
    #[serde(flatten)]
    assertion: RawAssertionFields,
}

#[derive(Debug, Deserialize)]
struct RawSituational {
    event_key: String,
    #[serde(default)]
    happens: bool,
    #[serde(default)]
    probability: f64,
    #[serde(flatten)]
    assertion: RawAssertionFields,
}

#[derive(Debug, Deserialize)]
struct RawBundle {
    winner: RawWinner,
    spread: RawSpread,
    total: RawTotal,
    margin: RawMargin,
    #[serde(default)]
    periods: Vec<RawPeriod>,
    #[serde(default)]
    team_stats: Vec<RawTeamStat>,
    #[serde(default)]
    player_props: Vec<RawProp>,
    #[serde(default)]
    situational: Vec<RawSituational>,
    #[serde(default)]
    overall_confidence: f64,
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse an LLM response into a schema-valid bundle.
///
/// Recovery strategies, tried in order:
/// 1. Direct `serde_json` deserialization
/// 2. Extract JSON from a markdown code block
/// 3. Strip trailing commas and retry
/// 4. Code block extraction plus trailing-comma strip
///
/// # Errors
///
/// Returns [`RunnerError::Parse`] when no strategy yields JSON, and
/// [`RunnerError::SchemaReject`] when the parsed bundle fails schema
/// validation. Both are hard rejects.
pub fn parse_bundle(raw: &str, context: BundleContext) -> Result<PredictionBundle, RunnerError> {
    let parsed = try_parse(raw)?;
    let bundle = convert(parsed, context)?;
    bundle
        .validate_schema()
        .map_err(|errors| RunnerError::SchemaReject(errors.to_string()))?;
    Ok(bundle)
}

/// Attempt to deserialize the raw text through the recovery strategies.
fn try_parse(raw: &str) -> Result<RawBundle, RunnerError> {
    let trimmed = raw.trim();

    // Strategy 1: direct parse.
    if let Ok(parsed) = serde_json::from_str::<RawBundle>(trimmed) {
        return Ok(parsed);
    }

    // Strategy 2: extract from a markdown code block.
    if let Some(inner) = extract_json_from_codeblock(trimmed)
        && let Ok(parsed) = serde_json::from_str::<RawBundle>(inner)
    {
        return Ok(parsed);
    }

    // Strategy 3: strip trailing commas and retry.
    let cleaned = strip_trailing_commas(trimmed);
    if let Ok(parsed) = serde_json::from_str::<RawBundle>(&cleaned) {
        return Ok(parsed);
    }

    // Strategy 4: code block extraction plus comma strip.
    if let Some(inner) = extract_json_from_codeblock(trimmed) {
        let cleaned_inner = strip_trailing_commas(inner);
        if let Ok(parsed) = serde_json::from_str::<RawBundle>(&cleaned_inner) {
            return Ok(parsed);
        }
    }

    Err(RunnerError::Parse(format!(
        "all parse strategies failed for response of {} chars",
        trimmed.len()
    )))
}

/// Pull the contents of the first fenced code block, if any.
fn extract_json_from_codeblock(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after_fence = text.get(start.saturating_add(3)..)?;
    // Skip an optional language tag on the fence line.
    let body_start = after_fence.find('\n').map_or(0, |i| i.saturating_add(1));
    let body = after_fence.get(body_start..)?;
    let end = body.find("```")?;
    body.get(..end)
}

/// Remove trailing commas before closing braces and brackets.
fn strip_trailing_commas(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == ',' {
            // Look ahead past whitespace for a closer.
            let mut lookahead = chars.clone();
            let mut next_significant = None;
            for n in lookahead.by_ref() {
                if !n.is_whitespace() {
                    next_significant = Some(n);
                    break;
                }
            }
            if matches!(next_significant, Some('}' | ']')) {
                continue;
            }
        }
        result.push(c);
    }
    result
}

// ---------------------------------------------------------------------------
// Conversion
// ---------------------------------------------------------------------------

/// Convert the loose shape into the typed bundle, coercing confidences.
fn convert(raw: RawBundle, context: BundleContext) -> Result<PredictionBundle, RunnerError> {
    let pick = parse_side(&raw.winner.pick)?;

    Ok(PredictionBundle {
        prediction_id: PredictionId::new(),
        expert_id: context.expert_id,
        game_id: context.game_id,
        snapshot_id: context.snapshot_id,
        profile_version: context.profile_version,
        status: BundleStatus::Generated,
        winner: WinnerCall {
            pick,
            win_probability_home: raw.winner.win_probability_home,
            win_probability_away: raw.winner.win_probability_away,
            assertion: convert_assertion(raw.winner.assertion),
        },
        spread: SpreadCall {
            spread_home: raw.spread.spread_home,
            assertion: convert_assertion(raw.spread.assertion),
        },
        total: TotalCall {
            total: raw.total.total,
            assertion: convert_assertion(raw.total.assertion),
        },
        margin: MarginCall {
            margin_home: raw.margin.margin_home,
            assertion: convert_assertion(raw.margin.assertion),
        },
        periods: raw
            .periods
            .into_iter()
            .map(|p| PeriodCall {
                label: p.label.to_lowercase(),
                home_points: p.home_points,
                away_points: p.away_points,
                assertion: convert_assertion(p.assertion),
            })
            .collect(),
        team_stats: raw
            .team_stats
            .into_iter()
            .map(|s| {
                Ok(TeamStatCall {
                    side: parse_side(&s.side)?,
                    stat_key: s.stat_key,
                    value: s.value,
                    assertion: convert_assertion(s.assertion),
                })
            })
            .collect::<Result<Vec<_>, RunnerError>>()?,
        player_props: raw
            .player_props
            .into_iter()
            .map(|p| {
                Ok(PlayerPropCall {
                    side: parse_side(&p.side)?,
                    prop_key: p.prop_key,
                    line_value: p.line_value,
                    over: p.over,
                    assertion: convert_assertion(p.assertion),
                })
            })
            .collect::<Result<Vec<_>, RunnerError>>()?,
        situational: raw
            .situational
            .into_iter()
            .map(|s| SituationalCall {
                event_key: s.event_key,
                happens: s.happens,
                probability: s.probability.clamp(0.0, 1.0),
                assertion: convert_assertion(s.assertion),
            })
            .collect(),
        overall_confidence: coerce_confidence(raw.overall_confidence),
        created_at: Utc::now(),
    })
}

/// Convert a raw assertion, coercing its confidences at the boundary.
fn convert_assertion(raw: RawAssertionFields) -> Assertion {
    Assertion {
        confidence: coerce_confidence(raw.confidence),
        reasoning: raw.reasoning,
        factors: raw
            .factors
            .into_iter()
            .map(|f| Factor {
                name: f.name,
                weight: f.weight,
                confidence: coerce_confidence(f.confidence),
            })
            .collect(),
    }
}

/// Parse a pick side, case-insensitively.
fn parse_side(s: &str) -> Result<PickSide, RunnerError> {
    match s.to_lowercase().as_str() {
        "home" => Ok(PickSide::Home),
        "away" => Ok(PickSide::Away),
        other => Err(RunnerError::Parse(format!("unknown side: {other}"))),
    }
}
