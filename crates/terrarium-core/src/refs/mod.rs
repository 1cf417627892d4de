//! Refs: the persisted mapping from (network, contract) to on-chain ids.
//!
//! The table is owned by a [`RefsStore`]. Updating the table and flushing it
//! to disk are separate steps; callers flush after every mutation that must
//! survive a crash.

pub mod store;
pub mod types;

pub use store::{RefsError, RefsStore, SaveReport, SharedRefs};
pub use types::{ContractInfo, RefsTable};
