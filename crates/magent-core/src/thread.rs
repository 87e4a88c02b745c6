//! Thread Store
//!
//! In-memory conversation histories keyed by thread. Histories are
//! append-only; the system message is never stored and is prepended on read.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::message::Message;

/// Opaque conversation identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreadId(String);

impl ThreadId {
    /// Fresh random identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ThreadId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ThreadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for ThreadId {
    fn from(id: Uuid) -> Self {
        Self(id.to_string())
    }
}

/// Store key: the reserved default thread or a caller-supplied one
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ThreadKey {
    Default,
    Thread(ThreadId),
}

impl From<Option<&ThreadId>> for ThreadKey {
    fn from(id: Option<&ThreadId>) -> Self {
        id.map_or(Self::Default, |id| Self::Thread(id.clone()))
    }
}

impl From<ThreadId> for ThreadKey {
    fn from(id: ThreadId) -> Self {
        Self::Thread(id)
    }
}

impl std::fmt::Display for ThreadKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Default => write!(f, "default"),
            Self::Thread(id) => write!(f, "{id}"),
        }
    }
}

/// Thread histories plus the system message shared by all of them.
///
/// Appends to one thread from concurrent callers are not ordered with
/// respect to each other; callers serialize turns per thread when ordering
/// matters.
#[derive(Debug, Default)]
pub struct ThreadStore {
    system: Option<Message>,
    threads: RwLock<HashMap<ThreadKey, Vec<Message>>>,
}

impl ThreadStore {
    pub fn new(system: Option<Message>) -> Self {
        Self {
            system,
            threads: RwLock::new(HashMap::new()),
        }
    }

    pub const fn system_message(&self) -> Option<&Message> {
        self.system.as_ref()
    }

    /// Extend a thread's history, creating the thread on first write
    pub fn append(&self, key: &ThreadKey, messages: impl IntoIterator<Item = Message>) {
        let mut threads = self.threads.write().unwrap_or_else(PoisonError::into_inner);
        threads.entry(key.clone()).or_default().extend(messages);
    }

    /// System message followed by the stored history.
    ///
    /// Empty when the thread has never been written.
    pub fn read(&self, key: &ThreadKey) -> Vec<Message> {
        let threads = self.threads.read().unwrap_or_else(PoisonError::into_inner);
        match threads.get(key) {
            Some(history) if !history.is_empty() => self
                .system
                .iter()
                .chain(history.iter())
                .cloned()
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Stored history without the system message
    pub fn history(&self, key: &ThreadKey) -> Vec<Message> {
        let threads = self.threads.read().unwrap_or_else(PoisonError::into_inner);
        threads.get(key).cloned().unwrap_or_default()
    }

    pub fn contains(&self, key: &ThreadKey) -> bool {
        let threads = self.threads.read().unwrap_or_else(PoisonError::into_inner);
        threads.contains_key(key)
    }

    /// Identifiers of every caller-named thread, sorted
    pub fn thread_ids(&self) -> Vec<ThreadId> {
        let threads = self.threads.read().unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<ThreadId> = threads
            .keys()
            .filter_map(|key| match key {
                ThreadKey::Thread(id) => Some(id.clone()),
                ThreadKey::Default => None,
            })
            .collect();
        ids.sort();
        ids
    }

    /// Number of threads written so far, including the default one
    pub fn len(&self) -> usize {
        self.threads.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unwritten_thread_reads_empty() {
        let store = ThreadStore::new(Some(Message::system("You are helpful.")));
        assert!(store.read(&ThreadKey::Default).is_empty());
        assert!(store.history(&ThreadKey::Default).is_empty());
        assert!(!store.contains(&ThreadKey::Default));
    }

    #[test]
    fn test_read_prepends_system_message() {
        let store = ThreadStore::new(Some(Message::system("You are helpful.")));
        let key = ThreadKey::from(ThreadId::from_string("t1"));

        store.append(&key, vec![Message::user("Hi"), Message::assistant("Hello!")]);
        store.append(&key, vec![Message::user("Again")]);

        let messages = store.read(&key);
        assert_eq!(
            messages,
            vec![
                Message::system("You are helpful."),
                Message::user("Hi"),
                Message::assistant("Hello!"),
                Message::user("Again"),
            ]
        );
        // system message is never stored
        assert_eq!(store.history(&key).len(), 3);
    }

    #[test]
    fn test_threads_are_isolated() {
        let store = ThreadStore::new(None);
        let first = ThreadId::from_string("a");
        let second = ThreadId::from_string("b");

        store.append(&ThreadKey::from(Some(&first)), vec![Message::user("one")]);
        store.append(&ThreadKey::Default, vec![Message::user("default")]);

        assert_eq!(store.read(&ThreadKey::from(Some(&first))), vec![Message::user("one")]);
        assert!(store.read(&ThreadKey::from(Some(&second))).is_empty());
        assert_eq!(store.read(&ThreadKey::from(None)), vec![Message::user("default")]);

        assert_eq!(store.thread_ids(), vec![first]);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_thread_id_display() {
        let id = ThreadId::new();
        assert_eq!(id.to_string().len(), 36);
        assert_eq!(ThreadKey::Default.to_string(), "default");
        assert_eq!(ThreadKey::from(ThreadId::from_string("x")).to_string(), "x");
    }
}
