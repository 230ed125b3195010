//! Room sessions for cursorparty.
//!
//! This crate is the orchestration core of the relay:
//!
//! 1. **Lifecycle** — [`RoomSession`] walks one connection through
//!    `Connected → Joined → Disconnected`, keeping the shared
//!    [`MembershipRegistry`](cursorparty_room::MembershipRegistry) and the
//!    `join`/`leave` announcements in step.
//! 2. **Moves** — [`BroadcastPipeline`] turns one inbound frame into a
//!    stamped position fanned out to every other member.
//!
//! # How it fits in the stack
//!
//! ```text
//! Server handler (above)  ← one RoomSession per accepted connection
//!     ↕
//! Session layer (this crate)  ← lifecycle + move pipeline
//!     ↕
//! Room layer (below)  ← membership registry, fan-out
//! ```

mod error;
mod pipeline;
mod session;

pub use error::{MoveError, SessionError};
pub use pipeline::BroadcastPipeline;
pub use session::{RoomSession, SessionState};
