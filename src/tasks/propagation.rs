//! Peer Propagation Task
//!
//! Delivers one replicated write to one peer after the simulated network
//! delay. Delivery is fire-and-forget: failures and timeouts are logged and
//! dropped, with no retry.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::backing::with_timeout;
use crate::policy::Peer;

/// A single write headed for a single peer.
pub(crate) struct Propagation<V> {
    pub origin: String,
    pub peer_id: String,
    pub peer: Arc<dyn Peer<V>>,
    pub key: String,
    pub value: V,
}

pub(crate) fn spawn_propagation<V>(
    propagation: Propagation<V>,
    delay: Duration,
    timeout: Duration,
) -> JoinHandle<()>
where
    V: Clone + Send + Sync + 'static,
{
    tokio::spawn(async move {
        let Propagation {
            origin,
            peer_id,
            peer,
            key,
            value,
        } = propagation;

        tokio::time::sleep(delay).await;

        match with_timeout(timeout, "replicate", peer.replicate(key.clone(), value)).await {
            Ok(()) => debug!(origin = %origin, peer = %peer_id, key = %key, "write replicated"),
            Err(err) => warn!(
                origin = %origin,
                peer = %peer_id,
                key = %key,
                error = %err,
                "replication to peer failed; dropping"
            ),
        }
    })
}
