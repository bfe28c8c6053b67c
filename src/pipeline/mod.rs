//! Pipeline entry points for draw synchronization.
//!
//! - [`SyncController::run`]: full or incremental sync of one game
//! - [`SyncController::backfill`]: continue loading older history

pub mod sync;

pub use sync::{
    BackfillOutcome, BackfillStatus, SyncController, SyncMode, SyncOutcome, SyncStatus, WalkStop,
};
