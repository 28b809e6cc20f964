// Generation Coalescing Module
//
// Deduplicates concurrent generation of the same cache file.
// When several requests miss the same cache path at once:
// - First request (leader): runs the generator, then signals completion
// - Subsequent requests (followers): wait for the leader, then re-check the cache
// - Requests for different cache paths never wait on each other

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;

/// Tracks in-flight generations keyed by absolute cache path
#[derive(Debug, Clone)]
pub struct GenerationCoalescer {
    /// cache path -> completion channel; the leader sends `true` when done
    in_flight: Arc<Mutex<HashMap<String, watch::Sender<bool>>>>,
}

impl GenerationCoalescer {
    pub fn new() -> Self {
        Self {
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Acquire a slot for `cache_path`
    ///
    /// Returns `CoalescingSlot::Leader` if nobody is generating this path.
    /// The leader generates, then drops (or completes) the guard.
    ///
    /// Returns `CoalescingSlot::Follower` once the current leader has
    /// finished. The leader may have failed, so followers must check the
    /// cache again.
    pub async fn acquire(&self, cache_path: &str) -> CoalescingSlot {
        let mut receiver = {
            let mut in_flight = self.in_flight.lock();
            match in_flight.get(cache_path) {
                Some(sender) => sender.subscribe(),
                None => {
                    let (tx, _rx) = watch::channel(false);
                    in_flight.insert(cache_path.to_string(), tx.clone());
                    return CoalescingSlot::Leader(LeaderGuard {
                        cache_path: cache_path.to_string(),
                        coalescer: self.clone(),
                        sender: tx,
                    });
                }
            }
        };

        let _ = receiver.wait_for(|&completed| completed).await;
        CoalescingSlot::Follower
    }

    /// Number of cache paths currently being generated
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().len()
    }

    fn release(&self, cache_path: &str) {
        self.in_flight.lock().remove(cache_path);
    }
}

impl Default for GenerationCoalescer {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub enum CoalescingSlot {
    /// Nobody else is generating this path; generate, then drop the guard
    Leader(LeaderGuard),

    /// A leader finished generating this path
    Follower,
}

impl CoalescingSlot {
    pub fn is_leader(&self) -> bool {
        matches!(self, CoalescingSlot::Leader(_))
    }

    pub fn is_follower(&self) -> bool {
        matches!(self, CoalescingSlot::Follower)
    }
}

/// Held by the leader; clears the slot and wakes followers when dropped,
/// whether the generation succeeded, failed or was cancelled
#[derive(Debug)]
pub struct LeaderGuard {
    cache_path: String,
    coalescer: GenerationCoalescer,
    sender: watch::Sender<bool>,
}

impl LeaderGuard {
    /// Release the slot now
    pub fn complete(self) {
        drop(self);
    }
}

impl Drop for LeaderGuard {
    fn drop(&mut self) {
        // Clear before waking, so a woken follower that retries becomes leader
        self.coalescer.release(&self.cache_path);
        let _ = self.sender.send(true);
    }
}
