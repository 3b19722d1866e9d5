//! Background Tasks Module
//!
//! Work the cache policies run outside the caller's request.
//!
//! # Tasks
//! - Write-behind flush: drains dirty keys into the backing store on an interval
//! - Peer propagation: delivers a replicated write to one peer after a delay

mod flush;
mod propagation;

pub use flush::FlushTask;
pub(crate) use flush::spawn_flush_task;
pub(crate) use propagation::{spawn_propagation, Propagation};
