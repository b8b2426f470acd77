//! # Hero Arena Server
//!
//! Server-authoritative match engine for turn-based, two-player hero battles.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    HERO ARENA SERVER                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── rng.rs      - Deterministic Xorshift128+ PRNG           │
//! │  └── dice.rs     - Dice expressions ("1d8+2")                │
//! │                                                              │
//! │  catalog/        - Read-only hero & ability definitions      │
//! │                                                              │
//! │  game/           - Combat resolution (deterministic)         │
//! │  ├── hero.rs     - Hero instances, statuses, buffs           │
//! │  ├── combat.rs   - Attack rolls, two-pass ability pipeline   │
//! │  ├── auras.rs    - Passive aura recomputation                │
//! │  ├── turns.rs    - Derived turn order, end-of-turn effects   │
//! │  ├── draft.rs    - Ban/pick/swap draft state machine         │
//! │  └── events.rs   - Battle events for broadcast               │
//! │                                                              │
//! │  session/        - Lifecycle & routing                       │
//! │  ├── session.rs  - Match phases and action dispatch          │
//! │  ├── registry.rs - Matchmaking queue, session index          │
//! │  └── view.rs     - Spectator-safe snapshot projections       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! The `core/`, `catalog/`, and `game/` modules are **100% deterministic**:
//! - No floating-point arithmetic in game logic
//! - No HashMap (BTreeMap for sorted iteration)
//! - No system time dependencies in combat resolution
//! - All randomness from one seeded Xorshift128+ per match
//!
//! Given the same seed and the same action script, a match produces an
//! identical event transcript and final snapshot on any platform.
//!
//! Transport, persistence, and authentication are collaborator concerns:
//! the engine exposes only the typed action API on [`SessionRegistry`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod catalog;
pub mod core;
pub mod game;
pub mod session;

// Re-export commonly used types
pub use catalog::{Catalog, HeroDefinition};
pub use core::dice::DiceExpr;
pub use core::rng::DeterministicRng;
pub use game::events::{BattleEvent, Winner};
pub use game::hero::{HeroId, HeroInstance};
pub use session::{
    ActionError, ActionResponse, MatchMode, MatchSession, MatchSessionView,
    Phase, PlayerId, SessionRegistry,
};

pub use game::draft::{HAND_SIZE, TEAM_SIZE};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
