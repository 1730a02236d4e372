//! The seed roster: fifteen personality-parameterized experts.
//!
//! Every expert is the same strategy object; only the profile differs.
//! Profiles pair an archetype (which drives bet sizing) with a trait
//! vector and section-access flags (which drive what the expert sees and
//! how it reasons). Traits and access flags are immutable for the run;
//! the learned factor weights start empty (neutral) and move only through
//! the learning coordinator.
//!
//! The roster is fixed and deterministic so two runs seeded from it start
//! from identical populations.

use std::collections::BTreeMap;

use gridiron_types::{
    AccessFlags, Archetype, ExpertStatus, PersonalityProfile, PersonalityTraits,
};

/// Number of experts in the council population.
pub const ROSTER_SIZE: usize = 15;

/// One roster entry: everything needed to build a profile.
struct RosterSeed {
    name: &'static str,
    archetype: Archetype,
    traits: PersonalityTraits,
    access: AccessFlags,
    learning_rate: f64,
}

/// Access flags with public betting hidden (for experts who ignore the crowd).
const fn no_crowd() -> AccessFlags {
    AccessFlags {
        stats: true,
        odds: true,
        weather: true,
        injuries: true,
        historical: true,
        public_betting: false,
    }
}

/// Access flags for the pure numbers expert (no news, no weather).
const fn numbers_only() -> AccessFlags {
    AccessFlags {
        stats: true,
        odds: true,
        weather: false,
        injuries: true,
        historical: true,
        public_betting: false,
    }
}

fn roster_seeds() -> Vec<RosterSeed> {
    vec![
        RosterSeed {
            name: "The Sharp",
            archetype: Archetype::Analyst,
            traits: PersonalityTraits {
                risk_tolerance: 0.55,
                contrarianism: 0.45,
                optimism: 0.5,
                recency_bias: 0.35,
                analytics_trust: 0.95,
            },
            access: numbers_only(),
            learning_rate: 0.06,
        },
        RosterSeed {
            name: "The Gambler",
            archetype: Archetype::Gambler,
            traits: PersonalityTraits {
                risk_tolerance: 0.95,
                contrarianism: 0.5,
                optimism: 0.75,
                recency_bias: 0.7,
                analytics_trust: 0.35,
            },
            access: AccessFlags::all(),
            learning_rate: 0.15,
        },
        RosterSeed {
            name: "The Contrarian",
            archetype: Archetype::Rebel,
            traits: PersonalityTraits {
                risk_tolerance: 0.7,
                contrarianism: 0.95,
                optimism: 0.45,
                recency_bias: 0.4,
                analytics_trust: 0.5,
            },
            access: AccessFlags::all(),
            learning_rate: 0.1,
        },
        RosterSeed {
            name: "The Professor",
            archetype: Archetype::Scholar,
            traits: PersonalityTraits {
                risk_tolerance: 0.4,
                contrarianism: 0.3,
                optimism: 0.5,
                recency_bias: 0.25,
                analytics_trust: 0.9,
            },
            access: no_crowd(),
            learning_rate: 0.04,
        },
        RosterSeed {
            name: "The Weatherman",
            archetype: Archetype::Specialist,
            traits: PersonalityTraits {
                risk_tolerance: 0.5,
                contrarianism: 0.4,
                optimism: 0.5,
                recency_bias: 0.5,
                analytics_trust: 0.6,
            },
            access: AccessFlags::all(),
            learning_rate: 0.07,
        },
        RosterSeed {
            name: "The Trainer",
            archetype: Archetype::Specialist,
            traits: PersonalityTraits {
                risk_tolerance: 0.45,
                contrarianism: 0.35,
                optimism: 0.4,
                recency_bias: 0.6,
                analytics_trust: 0.65,
            },
            access: no_crowd(),
            learning_rate: 0.08,
        },
        RosterSeed {
            name: "The Historian",
            archetype: Archetype::Veteran,
            traits: PersonalityTraits {
                risk_tolerance: 0.35,
                contrarianism: 0.4,
                optimism: 0.45,
                recency_bias: 0.15,
                analytics_trust: 0.7,
            },
            access: no_crowd(),
            learning_rate: 0.03,
        },
        RosterSeed {
            name: "The Rookie",
            archetype: Archetype::Rookie,
            traits: PersonalityTraits {
                risk_tolerance: 0.6,
                contrarianism: 0.5,
                optimism: 0.8,
                recency_bias: 0.85,
                analytics_trust: 0.45,
            },
            access: AccessFlags::all(),
            learning_rate: 0.18,
        },
        RosterSeed {
            name: "The Accountant",
            archetype: Archetype::Conservative,
            traits: PersonalityTraits {
                risk_tolerance: 0.15,
                contrarianism: 0.3,
                optimism: 0.4,
                recency_bias: 0.3,
                analytics_trust: 0.8,
            },
            access: numbers_only(),
            learning_rate: 0.04,
        },
        RosterSeed {
            name: "The Fader",
            archetype: Archetype::Rebel,
            traits: PersonalityTraits {
                risk_tolerance: 0.65,
                contrarianism: 0.85,
                optimism: 0.4,
                recency_bias: 0.45,
                analytics_trust: 0.55,
            },
            access: AccessFlags::all(),
            learning_rate: 0.09,
        },
        RosterSeed {
            name: "The Grinder",
            archetype: Archetype::Veteran,
            traits: PersonalityTraits {
                risk_tolerance: 0.3,
                contrarianism: 0.35,
                optimism: 0.5,
                recency_bias: 0.4,
                analytics_trust: 0.75,
            },
            access: no_crowd(),
            learning_rate: 0.05,
        },
        RosterSeed {
            name: "The Optimist",
            archetype: Archetype::Default,
            traits: PersonalityTraits {
                risk_tolerance: 0.55,
                contrarianism: 0.25,
                optimism: 0.9,
                recency_bias: 0.55,
                analytics_trust: 0.5,
            },
            access: AccessFlags::all(),
            learning_rate: 0.1,
        },
        RosterSeed {
            name: "The Skeptic",
            archetype: Archetype::Default,
            traits: PersonalityTraits {
                risk_tolerance: 0.4,
                contrarianism: 0.6,
                optimism: 0.2,
                recency_bias: 0.35,
                analytics_trust: 0.7,
            },
            access: no_crowd(),
            learning_rate: 0.07,
        },
        RosterSeed {
            name: "The Hot Hand",
            archetype: Archetype::Gambler,
            traits: PersonalityTraits {
                risk_tolerance: 0.85,
                contrarianism: 0.45,
                optimism: 0.7,
                recency_bias: 0.95,
                analytics_trust: 0.3,
            },
            access: AccessFlags::all(),
            learning_rate: 0.16,
        },
        RosterSeed {
            name: "The Quant",
            archetype: Archetype::Analyst,
            traits: PersonalityTraits {
                risk_tolerance: 0.5,
                contrarianism: 0.5,
                optimism: 0.5,
                recency_bias: 0.2,
                analytics_trust: 1.0,
            },
            access: numbers_only(),
            learning_rate: 0.05,
        },
    ]
}

/// Build the fifteen-expert seed roster.
///
/// Each call produces fresh expert IDs; the names, archetypes, traits,
/// access flags, and learning rates are fixed. Learning rates are clamped
/// into the permitted band as a belt-and-braces measure.
pub fn seed_roster() -> Vec<PersonalityProfile> {
    roster_seeds()
        .into_iter()
        .map(|seed| PersonalityProfile {
            expert_id: gridiron_types::ExpertId::new(),
            name: String::from(seed.name),
            archetype: seed.archetype,
            traits: seed.traits,
            access: seed.access,
            factor_weights: BTreeMap::new(),
            learning_rate: PersonalityProfile::clamp_learning_rate(seed.learning_rate),
            version: 1,
            status: ExpertStatus::Active,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roster_has_fifteen_experts() {
        assert_eq!(seed_roster().len(), ROSTER_SIZE);
    }

    #[test]
    fn roster_names_are_unique() {
        let roster = seed_roster();
        let mut names: Vec<&str> = roster.iter().map(|p| p.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), ROSTER_SIZE);
    }

    #[test]
    fn roster_ids_are_unique() {
        let roster = seed_roster();
        let mut ids: Vec<_> = roster.iter().map(|p| p.expert_id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), ROSTER_SIZE);
    }

    #[test]
    fn all_learning_rates_in_band() {
        for profile in seed_roster() {
            assert!(profile.learning_rate >= gridiron_types::MIN_LEARNING_RATE);
            assert!(profile.learning_rate <= gridiron_types::MAX_LEARNING_RATE);
        }
    }

    #[test]
    fn every_expert_starts_active_at_version_one() {
        for profile in seed_roster() {
            assert_eq!(profile.status, ExpertStatus::Active);
            assert_eq!(profile.version, 1);
            assert!(profile.factor_weights.is_empty());
        }
    }

    #[test]
    fn roster_spans_multiple_archetypes() {
        let roster = seed_roster();
        let mut archetypes: Vec<_> = roster.iter().map(|p| p.archetype).collect();
        archetypes.sort_by_key(|a| format!("{a:?}"));
        archetypes.dedup();
        assert!(archetypes.len() >= 6);
    }
}
