//! Session Layer
//!
//! Match lifecycle, matchmaking, and the action API surface. Wire transport
//! and authentication live outside this crate; everything here is exposed as
//! typed, synchronous calls guarded by per-session locks.

pub mod registry;
pub mod session;
pub mod view;

pub use registry::{JoinOutcome, SessionRegistry};
pub use session::{
    ActionError, MatchMode, MatchSession, Phase, PlayerId, PlayerSlot, SessionId,
};
pub use view::{
    ActionResponse, HeroOutcome, HeroView, MatchOutcome, MatchSessionView,
    PlayerSlotView, Viewer,
};
