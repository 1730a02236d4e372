//! Type-safe identifier wrappers around [`Uuid`].
//!
//! Every entity in the platform has a strongly-typed ID so identifiers
//! cannot be mixed at compile time. Entity rows use UUID v7
//! (time-ordered) for efficient database indexing; the CLI parses typed
//! IDs directly via `FromStr`, and log lines use the eight-digit
//! [`short`](ExpertId::short) form.
//!
//! [`MemoryId`] is the exception: episodic memories are content-addressed,
//! so their IDs are *deterministic* UUID v5 digests over
//! `(expert_id, game_id, timestamp)`. Storing the same memory twice yields
//! the same ID, which is how the append-only store rejects duplicates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Declares one strongly-typed ID over [`Uuid`].
///
/// Each ID gets the row constructor (`new`, v7), the raw accessor the
/// store bindings use (`into_inner`), the abbreviated log form
/// (`short`), string parsing for the CLI (`FromStr`), and the usual
/// conversions.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Mint a fresh time-ordered (v7) identifier.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// The raw [`Uuid`], for store bindings.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }

            /// Abbreviated form for log lines and `status` output: the
            /// first eight hex digits, enough to eyeball-match rows.
            pub fn short(&self) -> String {
                self.0.simple().to_string().chars().take(8).collect()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl core::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl From<Uuid> for $name {
            fn from(raw: Uuid) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for an expert in the council population.
    ExpertId
}

define_id! {
    /// Unique identifier for an NFL game.
    GameId
}

define_id! {
    /// Unique identifier for an experiment run. All mutation tables
    /// carry a run ID and all queries filter by it.
    RunId
}

define_id! {
    /// Unique identifier for a Universal Data View snapshot.
    SnapshotId
}

define_id! {
    /// Unique identifier for a stored prediction bundle.
    PredictionId
}

define_id! {
    /// Unique identifier for a belief revision record.
    RevisionId
}

define_id! {
    /// Unique identifier for a virtual bet.
    BetId
}

define_id! {
    /// Unique identifier for a queued learning event.
    LearningEventId
}

// ---------------------------------------------------------------------------
// MemoryId: deterministic, content-addressed
// ---------------------------------------------------------------------------

/// Namespace UUID for deriving deterministic memory IDs (v5).
const MEMORY_NAMESPACE: Uuid = Uuid::from_bytes([
    0x6d, 0x65, 0x6d, 0x6f, 0x72, 0x79, 0x2d, 0x6e, 0x73, 0x2d, 0x67, 0x72, 0x69, 0x64, 0x69,
    0x72,
]);

/// Deterministic identifier for an episodic memory.
///
/// Derived as UUID v5 over the owning expert, the game, and the creation
/// timestamp. The same `(expert, game, timestamp)` triple always produces
/// the same ID; the memory store relies on this to reject re-stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MemoryId(pub Uuid);

impl MemoryId {
    /// Derive the deterministic ID for a memory.
    pub fn derive(expert: ExpertId, game: GameId, created_at: DateTime<Utc>) -> Self {
        let name = format!(
            "{}:{}:{}",
            expert.into_inner(),
            game.into_inner(),
            created_at.timestamp_micros()
        );
        Self(Uuid::new_v5(&MEMORY_NAMESPACE, name.as_bytes()))
    }

    /// The raw [`Uuid`], for store bindings.
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl core::fmt::Display for MemoryId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<Uuid> for MemoryId {
    fn from(raw: Uuid) -> Self {
        Self(raw)
    }
}

impl From<MemoryId> for Uuid {
    fn from(id: MemoryId) -> Self {
        id.0
    }
}
