//! Room membership for cursorparty.
//!
//! There is exactly one room. This crate tracks which connections are in it
//! and delivers messages to them.
//!
//! # Key types
//!
//! - [`MembershipRegistry`]: the shared member set, with fan-out
//! - [`Announced`]: a join or leave and how its announcement went
//! - [`Recipient`]: everyone, or everyone but the sender
//! - [`Outbound`] / [`PeerSender`]: what a member's writer task receives
//! - [`EmitError`]: a fan-out that missed someone

mod error;
mod registry;

pub use error::EmitError;
pub use registry::{
    Announced, MembershipRegistry, Outbound, PeerReceiver, PeerSender, Recipient,
    peer_channel,
};
