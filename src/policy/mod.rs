//! Cache Policies
//!
//! Each policy wraps a [`Store`](crate::cache::Store) and adds its own
//! durability or consistency behavior around the baseline get/set/stats
//! bookkeeping:
//!
//! - [`WriteThroughCache`]: backing store first, local entry second
//! - [`WriteBehindCache`]: local entry first, batched backing writes later
//! - [`DependencyCache`]: invalidation through a dependency graph
//! - [`ReplicatedCache`]: delayed propagation to peer caches

mod dependency;
mod replicated;
mod write_behind;
mod write_through;

use std::time::Duration;

pub use dependency::DependencyCache;
pub use replicated::{Peer, ReplicatedCache};
pub use write_behind::WriteBehindCache;
pub use write_through::WriteThroughCache;

pub(crate) use write_behind::WriteBehindShared;

// == Public Constants ==
/// Default bound on a single backing-store or peer call
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(5);

/// Default delay before a write reaches replicated peers
pub const DEFAULT_PROPAGATION_DELAY: Duration = Duration::from_millis(10);
