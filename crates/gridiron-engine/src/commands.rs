//! Command implementations for the operational surface.
//!
//! Each command wires the data layer, the UDV assembler, the expert
//! pipeline, the bankroll loop, and the learning coordinator into one
//! operator-facing verb. The sequencing contracts live here: per-game
//! settlement is one transaction, council selection runs once per week,
//! and every confident call leaves a bet or a refusal behind.

use std::collections::BTreeMap;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;

use gridiron_bank::{
    BetRequest, PlacementOutcome, SizerConfig, place_bet, requires_bet,
};
use gridiron_core::{
    CouncilCandidate, CouncilSelector, HeuristicSource, LearningQueue, PredictOutcome,
    PredictRequest, PredictionSource, aggregate, build_memory, incorporate_peer_broadcast,
    peer_broadcast_events, score_prediction, settle_game, settlement_event,
};
use gridiron_core::consensus::{MemberBundle, MemberWeights};
use gridiron_db::{BetStore, MemoryStore, PredictionStore, RevisionStore, RunStore};
use gridiron_experts::{
    CalibrationState, EligibilityGate, ExpertAgent, GateSample, RetrievalConfig, RetrievalQuery,
    filter_view, rank_memories, seed_roster,
};
use gridiron_experts::revision::detect_revision;
use gridiron_runner::{LlmOrchestrator, RunnerConfig};
use gridiron_types::{
    Bankroll, BetCategory, BetSelection, BundleStatus, EliminationRisk, ExpertId, GameId,
    GameOutcome, LearningEventKind, PickSide, PredictionBundle, RunId, RunMetadata,
    UniversalGameData,
};
use gridiron_udv::{AdapterClient, AdapterConfig, GameMeta, UdvAssembler, cache_key};

use crate::error::EngineError;
use crate::metrics::{SettledSample, compute_metrics};

/// Shared handles and run-level settings for every command.
pub struct AppContext {
    /// The Postgres pool.
    pub pg: gridiron_db::PostgresPool,
    /// The Dragonfly hot cache, when configured.
    pub dragonfly: Option<gridiron_db::DragonflyPool>,
    /// Starting bankroll for new runs.
    pub starting_units: Decimal,
    /// Council size K.
    pub council_size: usize,
    /// Whether post-game reflection LLM analysis is enabled.
    pub reflection_enabled: bool,
    /// Whether the shadow backend is enabled.
    pub shadow_enabled: bool,
    /// Expert concurrency cap.
    pub max_parallel_experts: usize,
}

/// The canonical archetype naming convention recorded in run metadata.
const ARCHETYPE_NAMING: &str = "table-v1";

/// Council evaluation window.
const EVALUATION_WINDOW_DAYS: i64 = 28;

// ---------------------------------------------------------------------------
// init-run
// ---------------------------------------------------------------------------

/// Create a run: metadata, seeded roster, bankrolls, gates, calibration.
pub async fn init_run(ctx: &AppContext, run_id: RunId, season: u16) -> Result<(), EngineError> {
    let run_store = RunStore::new(ctx.pg.pool());
    let bet_store = BetStore::new(ctx.pg.pool());

    let metadata = RunMetadata {
        run_id,
        season,
        starting_units: ctx.starting_units,
        max_parallel_experts: ctx.max_parallel_experts,
        shadow_enabled: ctx.shadow_enabled,
        reflection_enabled: ctx.reflection_enabled,
        archetype_naming: String::from(ARCHETYPE_NAMING),
        created_at: Utc::now(),
    };
    run_store.create_run(&metadata).await?;

    for profile in seed_roster() {
        run_store.store_profile(run_id, &profile).await?;
        bet_store
            .seed_bankroll(&Bankroll::fresh(profile.expert_id, run_id, ctx.starting_units))
            .await?;
        run_store
            .store_gate(run_id, &EligibilityGate::fresh(profile.expert_id))
            .await?;
        run_store
            .store_calibration(run_id, profile.expert_id, &CalibrationState::fresh_set())
            .await?;
    }

    println!("run {run_id} initialized: 15 experts, {} units each", ctx.starting_units);
    Ok(())
}

// ---------------------------------------------------------------------------
// ingest
// ---------------------------------------------------------------------------

/// Backfill UDV snapshots for the given weeks of a season.
pub async fn ingest(ctx: &AppContext, season: u16, weeks: &[u16]) -> Result<(), EngineError> {
    let assembler = build_assembler()?;
    let schedule_client = adapter_from_env("STATS_API_URL")?;
    let prediction_store = PredictionStore::new(ctx.pg.pool());

    let mut ingested: u32 = 0;
    for &week in weeks {
        let games = schedule_client.fetch_schedule(season, week).await?;
        tracing::info!(season, week, games = games.len(), "schedule fetched");

        for game in games {
            let meta = GameMeta {
                game_id: game.game_id,
                home_team: game.home_team,
                away_team: game.away_team,
                kickoff: game.kickoff,
                venue: game.venue,
            };
            let udv = assembler.assemble(&meta, Utc::now()).await;
            prediction_store.store_snapshot(&udv).await?;
            cache_snapshot(ctx, &udv).await;
            ingested = ingested.saturating_add(1);
        }
    }

    println!("ingested {ingested} game snapshots across {} weeks", weeks.len());
    Ok(())
}

/// Cache a snapshot in Dragonfly, when the cache is configured.
async fn cache_snapshot(ctx: &AppContext, udv: &UniversalGameData) {
    if let Some(cache) = &ctx.dragonfly {
        let key = cache_key(udv.game_id, udv.snapshot_time);
        let ttl = gridiron_udv::CacheTtls::default().snapshot_ttl();
        if let Err(e) = cache.cache_udv(&key, udv, ttl).await {
            tracing::warn!(error = %e, "UDV cache write failed; proceeding without cache");
        }
    }
}

// ---------------------------------------------------------------------------
// predict
// ---------------------------------------------------------------------------

/// Run one parallel prediction round for a game.
#[allow(clippy::too_many_lines)]
pub async fn predict(ctx: &AppContext, run_id: RunId, game_id: GameId) -> Result<(), EngineError> {
    let run_store = RunStore::new(ctx.pg.pool());
    let prediction_store = PredictionStore::new(ctx.pg.pool());
    let memory_store = MemoryStore::new(ctx.pg.pool());
    let revision_store = RevisionStore::new(ctx.pg.pool());
    let bet_store = BetStore::new(ctx.pg.pool());

    let run = run_store.get_run(run_id).await?;
    let profiles = run_store.latest_profiles(run_id).await?;
    if profiles.is_empty() {
        return Err(EngineError::Validation(format!(
            "run {run_id} has no experts; run init-run first"
        )));
    }

    let udv = load_udv(ctx, &prediction_store, game_id).await?;
    let now = Utc::now();

    // Build one request per active expert: filtered view + memories.
    let retrieval = RetrievalConfig::default();
    let mut requests = Vec::new();
    for profile in &profiles {
        if profile.status != gridiron_types::ExpertStatus::Active {
            continue;
        }
        let view = filter_view(&udv, profile);
        let query = RetrievalQuery {
            text: format!("{} vs {} {}", udv.home_team, udv.away_team, udv.venue),
            embedding: None,
        };
        let candidates = memory_store
            .candidates(profile.expert_id, run_id, None, now)
            .await?;
        let memories = rank_memories(candidates, &query, &retrieval, retrieval.k, now);
        let ids: Vec<_> = memories.iter().map(|m| m.memory.memory_id).collect();
        memory_store.mark_retrieved(&ids).await?;

        requests.push(PredictRequest {
            seed: round_seed(run_id, game_id, profile.expert_id),
            view,
            memories,
            profile: profile.clone(),
        });
    }

    // Collect outcomes: the LLM hot path when configured, the
    // deterministic heuristic otherwise.
    let outcomes = match RunnerConfig::from_env() {
        Ok(config) => {
            let orchestrator = LlmOrchestrator::new(&config, None)?;
            orchestrator.generate_all(requests.clone()).await
        }
        Err(_) => {
            tracing::info!("no LLM backend configured; using the heuristic source");
            let mut source = HeuristicSource::new();
            source.collect(&requests)
        }
    };

    // Gates, persistence, revisions, and bets.
    let mut gates = load_gates(&run_store, run_id, &profiles).await?;
    let mut generated = Vec::new();

    for (expert_id, outcome) in outcomes {
        match outcome {
            PredictOutcome::Generated { bundle, chain, elapsed_ms } => {
                record_gate(&mut gates, expert_id, true, elapsed_ms);
                prediction_store.store_bundle(run_id, &bundle).await?;
                prediction_store.store_chain(run_id, &chain).await?;

                // A second bundle for the same (expert, game) is a
                // revision candidate.
                let history = prediction_store.latest_two(run_id, expert_id, game_id).await?;
                if let (Some(revised), Some(original)) = (history.first(), history.get(1))
                    && let Some(revision) = detect_revision(
                        run_id,
                        original,
                        revised,
                        None,
                        Some(&udv),
                        now,
                    )
                {
                    revision_store.store(&revision).await?;
                }

                generated.push(*bundle);
            }
            PredictOutcome::Failed { expert_id, reason, elapsed_ms } => {
                record_gate(&mut gates, expert_id, false, elapsed_ms);
                prediction_store
                    .store_failure(run_id, expert_id, game_id, udv.snapshot_id, &reason)
                    .await?;
            }
        }
    }

    for gate in gates.values() {
        run_store.store_gate(run_id, gate).await?;
    }

    // Confidence-to-bet coupling: every confident call bets or logs why
    // not.
    let sizer = SizerConfig {
        stake_cap: run.starting_units.checked_mul(Decimal::new(5, 1)),
        ..SizerConfig::default()
    };
    for bundle in &generated {
        place_bets_for_bundle(&bet_store, &profiles, &udv, run_id, bundle, &sizer).await?;
    }

    println!(
        "round complete for {game_id}: {} bundles, {} experts total",
        generated.len(),
        requests.len()
    );
    Ok(())
}

/// Load the newest UDV for a game: hot cache first, Postgres fallback.
async fn load_udv(
    ctx: &AppContext,
    store: &PredictionStore<'_>,
    game_id: GameId,
) -> Result<UniversalGameData, EngineError> {
    if let Some(cache) = &ctx.dragonfly
        && let Ok(udv) = cache.get_latest_udv(game_id).await
    {
        return Ok(udv);
    }
    store
        .latest_snapshot(game_id)
        .await?
        .ok_or_else(|| EngineError::Validation(format!("no UDV snapshot for game {game_id}; run ingest first")))
}

/// Deterministic per-round seed.
fn round_seed(run_id: RunId, game_id: GameId, expert_id: ExpertId) -> u64 {
    let mix = |uuid: uuid::Uuid| -> u64 {
        let bytes = uuid.into_bytes();
        bytes
            .chunks(8)
            .map(|chunk| {
                let mut buf = [0_u8; 8];
                for (slot, b) in buf.iter_mut().zip(chunk.iter()) {
                    *slot = *b;
                }
                u64::from_le_bytes(buf)
            })
            .fold(0_u64, u64::wrapping_add)
    };
    mix(run_id.into_inner())
        .wrapping_add(mix(game_id.into_inner()))
        .wrapping_add(mix(expert_id.into_inner()))
}

/// Load gates for every expert, creating fresh ones where missing.
async fn load_gates(
    run_store: &RunStore<'_>,
    run_id: RunId,
    profiles: &[gridiron_types::PersonalityProfile],
) -> Result<BTreeMap<ExpertId, EligibilityGate>, EngineError> {
    let mut gates: BTreeMap<ExpertId, EligibilityGate> = run_store
        .gates_for_run(run_id)
        .await?
        .into_iter()
        .map(|g| (g.expert_id, g))
        .collect();
    for profile in profiles {
        gates
            .entry(profile.expert_id)
            .or_insert_with(|| EligibilityGate::fresh(profile.expert_id));
    }
    Ok(gates)
}

/// Record one gate sample.
fn record_gate(
    gates: &mut BTreeMap<ExpertId, EligibilityGate>,
    expert_id: ExpertId,
    schema_valid: bool,
    response_ms: u64,
) {
    if let Some(gate) = gates.get_mut(&expert_id) {
        gate.record(GateSample {
            schema_valid,
            response_ms,
        });
    }
}

/// Place (or log refusal for) every confident call in a bundle.
async fn place_bets_for_bundle(
    bet_store: &BetStore<'_>,
    profiles: &[gridiron_types::PersonalityProfile],
    udv: &UniversalGameData,
    run_id: RunId,
    bundle: &PredictionBundle,
    sizer: &SizerConfig,
) -> Result<(), EngineError> {
    let Some(market) = udv.market.data.as_ref() else {
        tracing::debug!(game_id = %bundle.game_id, "no market lines; nothing bettable");
        return Ok(());
    };
    let Some(profile) = profiles.iter().find(|p| p.expert_id == bundle.expert_id) else {
        return Ok(());
    };

    // The three bettable markets with bookmaker quotes.
    let winner_odds = match bundle.winner.pick {
        PickSide::Home => market.moneyline_home,
        PickSide::Away => market.moneyline_away,
    };
    let candidates = [
        (
            BetCategory::Winner,
            BetSelection::Side(bundle.winner.pick),
            None,
            bundle.winner.assertion.confidence,
            winner_odds,
        ),
        (
            BetCategory::Spread,
            BetSelection::Side(bundle.winner.pick),
            Some(match bundle.winner.pick {
                PickSide::Home => market.spread_home,
                PickSide::Away => -market.spread_home,
            }),
            bundle.spread.assertion.confidence,
            -110,
        ),
        (
            BetCategory::Total,
            if bundle.total.total > market.total {
                BetSelection::Over
            } else {
                BetSelection::Under
            },
            Some(market.total),
            bundle.total.assertion.confidence,
            -110,
        ),
    ];

    for (category, selection, line, confidence, odds) in candidates {
        if !requires_bet(confidence) {
            continue;
        }
        let bankroll = bet_store.get_bankroll(bundle.expert_id, run_id).await?;
        if !bankroll.active {
            // Eliminated mid-round: no further placement, by contract.
            continue;
        }
        let request = BetRequest {
            run_id,
            game_id: bundle.game_id,
            category,
            selection,
            line,
            confidence,
            american_odds: odds,
            reasoning: bundle.winner.assertion.reasoning.clone(),
        };
        match place_bet(&request, &bankroll, profile, sizer, Utc::now())? {
            PlacementOutcome::Placed { bet, bankroll } => {
                bet_store.persist_placement(&bet, &bankroll).await?;
            }
            PlacementOutcome::Refused(log) => {
                bet_store.log_refusal(&log).await?;
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// settle
// ---------------------------------------------------------------------------

/// Settle a game's bets and run the learning coordinator.
#[allow(clippy::too_many_lines)]
pub async fn settle(
    ctx: &AppContext,
    run_id: RunId,
    game_id: GameId,
    home_score: u16,
    away_score: u16,
) -> Result<(), EngineError> {
    let run_store = RunStore::new(ctx.pg.pool());
    let prediction_store = PredictionStore::new(ctx.pg.pool());
    let memory_store = MemoryStore::new(ctx.pg.pool());
    let bet_store = BetStore::new(ctx.pg.pool());

    let run = run_store.get_run(run_id).await?;
    let outcome = GameOutcome {
        game_id,
        home_score,
        away_score,
    };

    // One transaction for the whole game's bets.
    let pending = bet_store.pending_bets(run_id, game_id).await?;
    let bankrolls: BTreeMap<ExpertId, Bankroll> = bet_store
        .bankrolls_for_run(run_id)
        .await?
        .into_iter()
        .map(|b| (b.expert_id, b))
        .collect();
    let settlement = settle_game(&pending, &outcome, &bankrolls, Utc::now())?;
    bet_store.persist_settlement(&settlement).await?;

    // Learning: score every bundle, reflect, remember, adjust, enqueue.
    let profiles: BTreeMap<ExpertId, _> = run_store
        .latest_profiles(run_id)
        .await?
        .into_iter()
        .map(|p| (p.expert_id, p))
        .collect();
    let bundles = prediction_store.bundles_for_game(run_id, game_id).await?;
    let expert_ids: Vec<ExpertId> = profiles.keys().copied().collect();

    let mut queue = LearningQueue::default();
    let now = Utc::now();

    for bundle in &bundles {
        let Some(profile) = profiles.get(&bundle.expert_id) else {
            continue;
        };
        let score = score_prediction(bundle, &outcome);
        let agent = ExpertAgent::new(profile.clone());
        let reflection = agent.reflect(bundle, &outcome, run.reflection_enabled);

        let memory = build_memory(run_id, bundle, &outcome, &score, &reflection, now);
        match memory_store.store(&memory).await {
            Ok(_) | Err(gridiron_db::DbError::DuplicateMemory(_)) => {}
            Err(e) => return Err(e.into()),
        }

        let event = settlement_event(run_id, bundle, &score, reflection.confidence_error, now);
        run_store.store_learning_event(&event).await?;
        let _ = queue.push(event);

        // Edge of the winner-market bet, if one was placed.
        let edge = settlement
            .settled_bets
            .iter()
            .find(|b| b.expert_id == bundle.expert_id && b.category == BetCategory::Winner)
            .map(|b| b.edge);
        for peer_event in
            peer_broadcast_events(run_id, bundle, &score, edge, &expert_ids, now)
        {
            run_store.store_learning_event(&peer_event).await?;
            let _ = queue.push(peer_event);
        }
    }

    // Drain the queue: weight updates resolve expert IDs to live
    // profiles at consumption time.
    let mut profiles = profiles;
    let mut drained: u32 = 0;
    while let Some(event) = queue.pop() {
        match &event.kind {
            LearningEventKind::SettledPrediction { prediction_id, score, .. } => {
                if let (Some(profile), Ok(chain)) = (
                    profiles.get_mut(&event.expert_id),
                    prediction_store.get_chain(*prediction_id).await,
                ) {
                    // Only the blended score drives weight updates; the
                    // components are not re-derived at drain time.
                    let learning_score = gridiron_core::LearningScore {
                        winner_component: 0.0,
                        spread_component: 0.0,
                        total_component: 0.0,
                        total: *score,
                    };
                    let _ =
                        gridiron_core::apply_weight_updates(profile, &chain, &learning_score);
                    run_store.store_profile(run_id, profile).await?;
                }
            }
            LearningEventKind::PeerBroadcast { factors, won, score, edge, .. } => {
                if let Some(profile) = profiles.get_mut(&event.expert_id) {
                    let adjustments =
                        incorporate_peer_broadcast(profile, factors, *won, *score, *edge);
                    if !adjustments.is_empty() {
                        for adjustment in &adjustments {
                            profile.apply_factor_adjustment(
                                &adjustment.factor,
                                adjustment.adjustment,
                            );
                        }
                        run_store.store_profile(run_id, profile).await?;
                    }
                }
            }
        }
        run_store.mark_event_processed(event.event_id).await?;
        drained = drained.saturating_add(1);
    }

    let consensus_note = consensus_line(&run_store, &profiles, run_id, game_id, &bundles).await;
    println!(
        "settled {game_id} ({home_score}-{away_score}): {} bets, {drained} learning events{consensus_note}",
        settlement.settled_bets.len()
    );
    Ok(())
}

/// One-line consensus summary for the settled game, if a council exists.
async fn consensus_line(
    run_store: &RunStore<'_>,
    profiles: &BTreeMap<ExpertId, gridiron_types::PersonalityProfile>,
    run_id: RunId,
    game_id: GameId,
    bundles: &[PredictionBundle],
) -> String {
    let Ok(selections) = run_store.completed_selections(run_id).await else {
        return String::new();
    };
    let Some(&(_, week)) = selections.last() else {
        return String::new();
    };
    let Ok(Some(members)) = run_store.council_for_week(run_id, week).await else {
        return String::new();
    };

    let member_bundles: Vec<MemberBundle> = bundles
        .iter()
        .filter(|b| members.contains(&b.expert_id) && b.status == BundleStatus::Generated)
        .filter_map(|b| {
            profiles.get(&b.expert_id).map(|_| MemberBundle {
                expert_id: b.expert_id,
                bundle: b.clone(),
                weights: MemberWeights {
                    accuracy: 0.6,
                    recent: 0.6,
                    specialization_in_category: 0.5,
                },
            })
        })
        .collect();

    aggregate(game_id, &member_bundles).map_or_else(String::new, |c| {
        format!(
            "; council consensus was {:?} at {:.0}% agreement",
            c.pick,
            c.agreement * 100.0
        )
    })
}

// ---------------------------------------------------------------------------
// select-council
// ---------------------------------------------------------------------------

/// Recompute the council for a week.
pub async fn select_council(ctx: &AppContext, run_id: RunId, week: u16) -> Result<(), EngineError> {
    let run_store = RunStore::new(ctx.pg.pool());
    let bet_store = BetStore::new(ctx.pg.pool());

    let since = Utc::now() - Duration::days(EVALUATION_WINDOW_DAYS);
    let events = run_store.events_since(run_id, since).await?;
    let gates: BTreeMap<ExpertId, EligibilityGate> = run_store
        .gates_for_run(run_id)
        .await?
        .into_iter()
        .map(|g| (g.expert_id, g))
        .collect();
    let bankrolls: BTreeMap<ExpertId, Bankroll> = bet_store
        .bankrolls_for_run(run_id)
        .await?
        .into_iter()
        .map(|b| (b.expert_id, b))
        .collect();

    // Specialization: best per-category decided win rate.
    let mut specialization: BTreeMap<ExpertId, f64> = BTreeMap::new();
    for row in bet_store.category_win_counts(run_id).await? {
        if row.decided == 0 {
            continue;
        }
        let rate = f64::from(u32::try_from(row.wins).unwrap_or(0))
            / f64::from(u32::try_from(row.decided).unwrap_or(1).max(1));
        let entry = specialization.entry(ExpertId::from(row.expert_id)).or_insert(0.0);
        *entry = entry.max(rate);
    }

    // Window samples per expert from settled-prediction events.
    let mut samples: BTreeMap<ExpertId, Vec<SettledSample>> = BTreeMap::new();
    for event in &events {
        if let LearningEventKind::SettledPrediction { score, confidence_error, .. } = &event.kind
        {
            samples.entry(event.expert_id).or_default().push(SettledSample {
                settled_at: event.created_at,
                score: *score,
                confidence_error: *confidence_error,
            });
        }
    }

    let now = Utc::now();
    let candidates: Vec<CouncilCandidate> = bankrolls
        .values()
        .map(|bankroll| {
            let expert_samples = samples.get(&bankroll.expert_id).cloned().unwrap_or_default();
            let spec = specialization.get(&bankroll.expert_id).copied().unwrap_or(0.0);
            CouncilCandidate {
                expert_id: bankroll.expert_id,
                metrics: compute_metrics(&expert_samples, spec, now),
                eligible: gates.get(&bankroll.expert_id).is_none_or(|g| g.eligible),
                eliminated: !bankroll.active,
                prediction_count: u32::try_from(expert_samples.len()).unwrap_or(0),
            }
        })
        .collect();

    let mut selector =
        CouncilSelector::with_completed(run_store.completed_selections(run_id).await?);
    let selection = selector.select(run_id, week, &candidates, ctx.council_size, now)?;
    run_store.store_selection(&selection).await?;

    println!(
        "week {week} council ({} of {} requested): {}",
        selection.members.len(),
        ctx.council_size,
        selection
            .members
            .iter()
            .map(ExpertId::short)
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// status
// ---------------------------------------------------------------------------

/// Print per-expert bankroll, eligibility, and recent accuracy.
pub async fn status(ctx: &AppContext, run_id: RunId) -> Result<(), EngineError> {
    let run_store = RunStore::new(ctx.pg.pool());
    let bet_store = BetStore::new(ctx.pg.pool());

    let run = run_store.get_run(run_id).await?;
    let profiles: BTreeMap<ExpertId, _> = run_store
        .latest_profiles(run_id)
        .await?
        .into_iter()
        .map(|p| (p.expert_id, p))
        .collect();
    let gates: BTreeMap<ExpertId, EligibilityGate> = run_store
        .gates_for_run(run_id)
        .await?
        .into_iter()
        .map(|g| (g.expert_id, g))
        .collect();

    let since = Utc::now() - Duration::days(EVALUATION_WINDOW_DAYS);
    let events = run_store.events_since(run_id, since).await?;
    let mut recent_hits: BTreeMap<ExpertId, (u32, u32)> = BTreeMap::new();
    for event in &events {
        if let LearningEventKind::SettledPrediction { score, .. } = &event.kind {
            let entry = recent_hits.entry(event.expert_id).or_insert((0, 0));
            entry.1 = entry.1.saturating_add(1);
            if *score >= 0.5 {
                entry.0 = entry.0.saturating_add(1);
            }
        }
    }

    println!(
        "run {run_id} (season {}, archetypes {}):",
        run.season, run.archetype_naming
    );
    println!(
        "{:<16} {:>10} {:>8} {:>9} {:>13} {:>9} {:>8}",
        "expert", "units", "roi", "risk", "schema_valid", "latency", "recent"
    );

    for bankroll in bet_store.bankrolls_for_run(run_id).await? {
        let name = profiles
            .get(&bankroll.expert_id)
            .map_or_else(|| bankroll.expert_id.short(), |p| p.name.clone());
        let gate = gates.get(&bankroll.expert_id);
        let schema_valid = gate.is_none_or(|g| g.schema_validity_rate >= 0.985);
        let within_latency = gate.is_none_or(|g| g.avg_response_time_ms <= 6_000.0);
        let (hits, total) = recent_hits
            .get(&bankroll.expert_id)
            .copied()
            .unwrap_or((0, 0));
        let recent = if total == 0 {
            String::from("-")
        } else {
            format!("{hits}/{total}")
        };
        let risk = match bankroll.risk_level() {
            EliminationRisk::Safe => "safe",
            EliminationRisk::Warning => "warning",
            EliminationRisk::Danger => "danger",
            EliminationRisk::Critical => "critical",
        };
        let state = if bankroll.active { risk } else { "OUT" };

        println!(
            "{:<16} {:>10} {:>8} {:>9} {:>13} {:>9} {:>8}",
            name,
            bankroll.current_units.round_dp(2),
            bankroll.roi.round_dp(3),
            state,
            schema_valid,
            within_latency,
            recent
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Adapter wiring
// ---------------------------------------------------------------------------

/// Build the UDV assembler from adapter environment variables.
fn build_assembler() -> Result<UdvAssembler, EngineError> {
    Ok(UdvAssembler::new(
        adapter_from_env("ODDS_API_URL")?,
        adapter_from_env("WEATHER_API_URL")?,
        adapter_from_env("INJURIES_API_URL")?,
        adapter_from_env("STATS_API_URL")?,
        adapter_from_env("HISTORICAL_API_URL").ok(),
        adapter_from_env("NEWS_API_URL")?,
    ))
}

/// Build one adapter client from its URL environment variable.
fn adapter_from_env(var: &str) -> Result<AdapterClient, EngineError> {
    let url = std::env::var(var)
        .map_err(|_| EngineError::Validation(format!("missing adapter env var {var}")))?;
    let mut config = AdapterConfig::new(&url);
    config.api_key = std::env::var(format!("{var}_KEY")).ok();
    Ok(AdapterClient::new(config)?)
}
