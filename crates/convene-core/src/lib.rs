//! # convene-core
//!
//! Shared vocabulary for the convene crates:
//!
//! - **Branded IDs**: `GroupId`, `UserId`, `ConnectionId` as newtypes
//! - **Records**: `GroupRecord` and `ConnectionRecord`, the two persisted shapes
//! - **Wire**: inbound actions, join responses and the `userJoined` notification
//! - **Logging**: `tracing` subscriber bootstrap shared by every binary

#![deny(unsafe_code)]

pub mod ids;
pub mod logging;
pub mod records;
pub mod wire;

pub use ids::{ConnectionId, GroupId, UserId};
pub use records::{ConnectionRecord, GroupRecord};
