use std::collections::{BTreeMap, HashMap, HashSet};

use replytree_core::types::ids::ReplyId;
use replytree_infra::LikeState;

/// Like status per reply, kept next to the tree rather than inside it.
#[derive(Debug, Default)]
pub struct LikeCache {
    entries: HashMap<ReplyId, LikeState>,
    pending: HashSet<ReplyId>,
}

impl LikeCache {
    /// Marks a toggle as in flight. Returns `false` if one already is.
    pub fn begin(&mut self, id: &ReplyId) -> bool {
        self.pending.insert(id.clone())
    }

    /// Clears the in-flight mark, storing `state` when the toggle succeeded.
    pub fn finish(&mut self, id: &ReplyId, state: Option<LikeState>) {
        self.pending.remove(id);
        if let Some(state) = state {
            self.entries.insert(id.clone(), state);
        }
    }

    pub fn get(&self, id: &ReplyId) -> LikeState {
        self.entries.get(id).copied().unwrap_or_default()
    }

    pub fn forget(&mut self, id: &ReplyId) {
        self.entries.remove(id);
        self.pending.remove(id);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.pending.clear();
    }

    pub fn snapshot(&self) -> BTreeMap<ReplyId, LikeState> {
        self.entries
            .iter()
            .map(|(id, state)| (id.clone(), *state))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::LikeCache;
    use replytree_core::types::ids::ReplyId;
    use replytree_infra::LikeState;

    fn id(value: &str) -> ReplyId {
        ReplyId::try_from(value).unwrap()
    }

    #[test]
    fn begin_rejects_second_toggle_until_finished() {
        let mut cache = LikeCache::default();
        assert!(cache.begin(&id("r1")));
        assert!(!cache.begin(&id("r1")));
        assert!(cache.begin(&id("r2")));
        cache.finish(&id("r1"), None);
        assert!(cache.begin(&id("r1")));
        assert_eq!(cache.get(&id("r1")), LikeState::default());
    }

    #[test]
    fn finish_stores_successful_state() {
        let mut cache = LikeCache::default();
        cache.begin(&id("r1"));
        let state = LikeState {
            is_liked: true,
            like_count: 2,
        };
        cache.finish(&id("r1"), Some(state));
        assert_eq!(cache.get(&id("r1")), state);
        assert_eq!(cache.snapshot().len(), 1);
    }

    #[test]
    fn unknown_reply_defaults_to_unliked() {
        let cache = LikeCache::default();
        assert_eq!(cache.get(&id("r1")), LikeState::default());
    }

    #[test]
    fn forget_drops_entry_and_pending() {
        let mut cache = LikeCache::default();
        cache.begin(&id("r1"));
        cache.finish(&id("r1"), Some(LikeState::default()));
        cache.begin(&id("r1"));
        cache.forget(&id("r1"));
        assert!(cache.begin(&id("r1")));
        assert!(cache.snapshot().is_empty());
    }
}
