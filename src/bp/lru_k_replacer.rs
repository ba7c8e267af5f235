use super::FrameId;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

struct LruKNode {
    /// Logical timestamps of every recorded access, oldest first.
    history: VecDeque<u64>,
    is_evictable: bool,
}

struct ReplacerState {
    node_store: HashMap<FrameId, LruKNode>,
    current_ts: u64,
    curr_size: usize,
}

/// LRU-K replacement policy.
///
/// The victim is the evictable frame with the largest backward k-distance:
/// `now - t_k`, where `t_k` is the timestamp of the k-th most recent access,
/// or infinity for frames accessed fewer than `k` times. Ties (all-infinity
/// is the common case) fall to the frame whose earliest recorded access is
/// oldest.
pub struct LruKReplacer {
    state: Mutex<ReplacerState>,
    num_frames: usize,
    k: usize,
}

impl LruKReplacer {
    pub fn new(num_frames: usize, k: usize) -> Self {
        LruKReplacer {
            state: Mutex::new(ReplacerState {
                node_store: HashMap::new(),
                current_ts: 0,
                curr_size: 0,
            }),
            num_frames,
            k,
        }
    }

    /// Record an access to `frame_id` at the current logical time.
    /// Out-of-range frame ids are silently ignored.
    pub fn record_access(&self, frame_id: FrameId) {
        if frame_id >= self.num_frames {
            return;
        }
        let mut state = self.state.lock().unwrap();
        let ts = state.current_ts;
        state.current_ts += 1;
        state
            .node_store
            .entry(frame_id)
            .or_insert_with(|| LruKNode {
                history: VecDeque::new(),
                is_evictable: false,
            })
            .history
            .push_back(ts);
    }

    /// Add or remove `frame_id` from the evictable set. Idempotent;
    /// out-of-range and untracked frame ids are silently ignored.
    pub fn set_evictable(&self, frame_id: FrameId, evictable: bool) {
        if frame_id >= self.num_frames {
            return;
        }
        let mut state = self.state.lock().unwrap();
        let state = &mut *state;
        if let Some(node) = state.node_store.get_mut(&frame_id) {
            if node.is_evictable != evictable {
                node.is_evictable = evictable;
                if evictable {
                    state.curr_size += 1;
                } else {
                    state.curr_size -= 1;
                }
            }
        }
    }

    /// Drop `frame_id` and its history from the replacer. A no-op unless the
    /// frame is currently evictable.
    pub fn remove(&self, frame_id: FrameId) {
        let mut state = self.state.lock().unwrap();
        let evictable = state
            .node_store
            .get(&frame_id)
            .map(|node| node.is_evictable)
            .unwrap_or(false);
        if evictable {
            state.node_store.remove(&frame_id);
            state.curr_size -= 1;
        }
    }

    /// Choose and erase a victim, or `None` if nothing is evictable.
    pub fn evict(&self) -> Option<FrameId> {
        let mut state = self.state.lock().unwrap();
        let now = state.current_ts;

        let mut victim: Option<(u64, u64, FrameId)> = None;
        for (&frame_id, node) in state.node_store.iter() {
            if !node.is_evictable {
                continue;
            }
            let distance = if node.history.len() >= self.k {
                now - node.history[node.history.len() - self.k]
            } else {
                u64::MAX
            };
            let first_access = node.history.front().copied().unwrap_or(0);
            let better = match victim {
                None => true,
                Some((best_distance, best_first, _)) => {
                    distance > best_distance
                        || (distance == best_distance && first_access < best_first)
                }
            };
            if better {
                victim = Some((distance, first_access, frame_id));
            }
        }

        let (_, _, frame_id) = victim?;
        state.node_store.remove(&frame_id);
        state.curr_size -= 1;
        Some(frame_id)
    }

    /// Number of currently evictable frames.
    pub fn size(&self) -> usize {
        self.state.lock().unwrap().curr_size
    }

    #[cfg(test)]
    pub(crate) fn is_evictable(&self, frame_id: FrameId) -> bool {
        self.state
            .lock()
            .unwrap()
            .node_store
            .get(&frame_id)
            .map(|node| node.is_evictable)
            .unwrap_or(false)
    }
}
