//! In-memory store binding each live conversation to its pending reply slot.
//!
//! One table exists per router instance; state is best-effort and does not
//! survive a restart.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use crate::session::slot::ReplySlot;

#[derive(Debug)]
struct SessionEntry {
    slot: Arc<ReplySlot>,
    opened_at: Instant,
    last_turn_at: Instant,
    turns: u64,
}

impl SessionEntry {
    fn new(slot: Arc<ReplySlot>) -> Self {
        let now = Instant::now();
        Self {
            slot,
            opened_at: now,
            last_turn_at: now,
            turns: 1,
        }
    }
}

/// Conversation id → pending reply slot, with atomic per-key replacement.
#[derive(Debug, Default)]
pub struct SessionTable {
    sessions: DashMap<String, SessionEntry>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Stores `slot` for `conversation_id`, returning whatever slot was held
    /// before. A returned slot that was never spent means the previous turn
    /// was abandoned; the caller decides how loudly to report that.
    ///
    /// Atomic per key: two racing turns for the same conversation serialize
    /// on the map's entry lock, so exactly one of them sees the other's slot
    /// as the previous value.
    pub fn open_or_replace(
        &self,
        conversation_id: &str,
        slot: Arc<ReplySlot>,
    ) -> Option<Arc<ReplySlot>> {
        match self.sessions.entry(conversation_id.to_string()) {
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                entry.last_turn_at = Instant::now();
                entry.turns += 1;
                Some(std::mem::replace(&mut entry.slot, slot))
            }
            Entry::Vacant(vacant) => {
                vacant.insert(SessionEntry::new(slot));
                None
            }
        }
    }

    /// Read without mutation; used when delivering an answer.
    pub fn lookup(&self, conversation_id: &str) -> Option<Arc<ReplySlot>> {
        self.sessions
            .get(conversation_id)
            .map(|entry| entry.slot.clone())
    }

    /// Removes the session. Removing an id that is already gone is a no-op.
    pub fn close(&self, conversation_id: &str) {
        if self.sessions.remove(conversation_id).is_some() {
            debug!(conversation = %conversation_id, "session closed");
        }
    }

    /// Removes the session only if it still holds `slot`. Keeps a stale
    /// timeout from evicting a session that a newer turn has since taken
    /// over.
    pub fn close_if_current(&self, conversation_id: &str, slot: &Arc<ReplySlot>) -> bool {
        self.sessions
            .remove_if(conversation_id, |_, entry| Arc::ptr_eq(&entry.slot, slot))
            .is_some()
    }

    /// Evicts every session; used on transport shutdown. Pending slots are
    /// dropped unfulfilled, closing the underlying calls is the transport's
    /// job.
    pub fn clear(&self) {
        self.sessions.clear();
    }

    /// Evicts sessions with no turn activity for at least `max_idle`,
    /// returning what was removed so the caller can report and disposition
    /// any still-pending slots.
    pub fn evict_idle(&self, max_idle: Duration) -> Vec<(String, Arc<ReplySlot>)> {
        let now = Instant::now();
        let expired: Vec<String> = self
            .sessions
            .iter()
            .filter(|entry| now.duration_since(entry.value().last_turn_at) >= max_idle)
            .map(|entry| entry.key().clone())
            .collect();

        let mut evicted = Vec::with_capacity(expired.len());
        for id in expired {
            let removed = self
                .sessions
                .remove_if(&id, |_, entry| {
                    now.duration_since(entry.last_turn_at) >= max_idle
                });
            if let Some((id, entry)) = removed {
                evicted.push((id, entry.slot));
            }
        }
        evicted
    }

    pub fn contains(&self, conversation_id: &str) -> bool {
        self.sessions.contains_key(conversation_id)
    }

    /// How many turns this conversation has seen so far.
    pub fn turn_count(&self, conversation_id: &str) -> Option<u64> {
        self.sessions.get(conversation_id).map(|entry| entry.turns)
    }

    /// How long this conversation has been open.
    pub fn age(&self, conversation_id: &str) -> Option<Duration> {
        self.sessions
            .get(conversation_id)
            .map(|entry| entry.opened_at.elapsed())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot() -> Arc<ReplySlot> {
        let (slot, _rx) = ReplySlot::channel();
        Arc::new(slot)
    }

    #[tokio::test]
    async fn test_open_creates_one_session() {
        let table = SessionTable::new();
        assert!(table.open_or_replace("abc", slot()).is_none());
        assert!(table.contains("abc"));
        assert_eq!(table.len(), 1);
        assert_eq!(table.turn_count("abc"), Some(1));
    }

    #[tokio::test]
    async fn test_replace_returns_previous_slot() {
        let table = SessionTable::new();
        let first = slot();
        table.open_or_replace("abc", first.clone());

        let previous = table.open_or_replace("abc", slot()).unwrap();
        assert!(Arc::ptr_eq(&previous, &first));
        // still exactly one session for the id
        assert_eq!(table.len(), 1);
        assert_eq!(table.turn_count("abc"), Some(2));
    }

    #[tokio::test]
    async fn test_lookup_does_not_mutate() {
        let table = SessionTable::new();
        table.open_or_replace("abc", slot());
        assert!(table.lookup("abc").is_some());
        assert!(table.lookup("missing").is_none());
        assert_eq!(table.turn_count("abc"), Some(1));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let table = SessionTable::new();
        table.open_or_replace("abc", slot());

        table.close("abc");
        assert!(!table.contains("abc"));

        // closing again is a no-op, not an error
        table.close("abc");
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn test_close_if_current_spares_newer_slot() {
        let table = SessionTable::new();
        let old = slot();
        table.open_or_replace("abc", old.clone());
        let newer = slot();
        table.open_or_replace("abc", newer.clone());

        // the stale owner cannot evict the replacement
        assert!(!table.close_if_current("abc", &old));
        assert!(table.contains("abc"));

        assert!(table.close_if_current("abc", &newer));
        assert!(!table.contains("abc"));
    }

    #[tokio::test]
    async fn test_clear_evicts_everything() {
        let table = SessionTable::new();
        table.open_or_replace("a", slot());
        table.open_or_replace("b", slot());
        table.clear();
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn test_evict_idle() {
        let table = SessionTable::new();
        table.open_or_replace("old", slot());

        tokio::time::sleep(Duration::from_millis(30)).await;
        table.open_or_replace("fresh", slot());

        let evicted = table.evict_idle(Duration::from_millis(20));
        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].0, "old");
        assert!(!table.contains("old"));
        assert!(table.contains("fresh"));
    }
}
