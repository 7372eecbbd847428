//! Per-session chat log with read tracking.
//!
//! Every entry remembers which players have seen it.  Push delivery marks an
//! entry read as soon as it is handed to a player's sink; the poll binding
//! marks entries read when they are returned in a `game_state` snapshot.
//! Read sets only ever grow, so no entry is returned twice to the same player.

use std::collections::HashSet;

use othello_core::protocol::{ChatEntry, SequenceCounter};
use othello_core::Color;

/// A stored chat entry plus the names of the players who have seen it.
#[derive(Debug, Clone)]
struct StoredEntry {
    entry: ChatEntry,
    read_by: HashSet<String>,
}

/// Append-only chat history of one game session.
///
/// Ids come from a [`SequenceCounter`] owned by the log.  [`ChatLog::clear`]
/// drops the entries but keeps the counter, so ids keep increasing across
/// game resets and a client can never confuse an old entry with a new one.
#[derive(Debug, Default)]
pub struct ChatLog {
    entries: Vec<StoredEntry>,
    ids: SequenceCounter,
}

impl ChatLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message and returns the stored entry.
    ///
    /// The sender is recorded as having read it: they always receive their
    /// own message back, either as a push echo or as the reply to the request.
    pub fn append(
        &mut self,
        color: Color,
        player_name: &str,
        message: &str,
        timestamp: u64,
    ) -> ChatEntry {
        let entry = ChatEntry {
            id: self.ids.next(),
            color,
            player_name: player_name.to_string(),
            message: message.to_string(),
            timestamp,
        };
        let mut read_by = HashSet::new();
        read_by.insert(player_name.to_string());
        self.entries.push(StoredEntry {
            entry: entry.clone(),
            read_by,
        });
        entry
    }

    /// Records that `reader` has seen entry `id`.  Unknown ids are ignored.
    pub fn mark_read(&mut self, id: u64, reader: &str) {
        if let Some(stored) = self.entries.iter_mut().find(|s| s.entry.id == id) {
            stored.read_by.insert(reader.to_string());
        }
    }

    /// Returns every entry `reader` has not seen yet, oldest first, and marks
    /// them read.
    pub fn take_unread(&mut self, reader: &str) -> Vec<ChatEntry> {
        self.entries
            .iter_mut()
            .filter(|s| !s.read_by.contains(reader))
            .map(|s| {
                s.read_by.insert(reader.to_string());
                s.entry.clone()
            })
            .collect()
    }

    #[cfg(test)]
    pub fn unread_count(&self, reader: &str) -> usize {
        self.entries
            .iter()
            .filter(|s| !s.read_by.contains(reader))
            .count()
    }

    #[cfg(test)]
    pub fn is_read_by(&self, id: u64, reader: &str) -> bool {
        self.entries
            .iter()
            .any(|s| s.entry.id == id && s.read_by.contains(reader))
    }

    /// Drops all entries.  Ids are not reused.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over all entries, oldest first.
    #[cfg(test)]
    pub fn entries(&self) -> impl Iterator<Item = &ChatEntry> {
        self.entries.iter().map(|s| &s.entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_assigns_increasing_ids_starting_at_one() {
        let mut log = ChatLog::new();

        let first = log.append(Color::Black, "Ana", "hi", 10);
        let second = log.append(Color::White, "Ben", "hello", 20);

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_sender_has_read_own_message() {
        let mut log = ChatLog::new();

        let entry = log.append(Color::Black, "Ana", "hi", 0);

        assert!(log.is_read_by(entry.id, "Ana"));
        assert!(!log.is_read_by(entry.id, "Ben"));
    }

    #[test]
    fn test_take_unread_returns_each_entry_once() {
        // Arrange
        let mut log = ChatLog::new();
        log.append(Color::Black, "Ana", "one", 0);
        log.append(Color::Black, "Ana", "two", 0);

        // Act
        let first = log.take_unread("Ben");
        let second = log.take_unread("Ben");

        // Assert
        assert_eq!(
            first.iter().map(|e| e.message.as_str()).collect::<Vec<_>>(),
            ["one", "two"]
        );
        assert!(second.is_empty());
    }

    #[test]
    fn test_mark_read_removes_entry_from_unread() {
        let mut log = ChatLog::new();
        let entry = log.append(Color::White, "Ben", "gg", 0);

        log.mark_read(entry.id, "Ana");

        assert_eq!(log.unread_count("Ana"), 0);
        assert!(log.take_unread("Ana").is_empty());
    }

    #[test]
    fn test_mark_read_unknown_id_is_ignored() {
        let mut log = ChatLog::new();
        log.append(Color::White, "Ben", "gg", 0);

        log.mark_read(99, "Ana");

        assert_eq!(log.unread_count("Ana"), 1);
    }

    #[test]
    fn test_clear_keeps_id_sequence() {
        let mut log = ChatLog::new();
        log.append(Color::Black, "Ana", "before", 0);

        log.clear();
        let after = log.append(Color::Black, "Ana", "after", 0);

        assert!(log.entries().all(|e| e.message == "after"));
        assert_eq!(after.id, 2);
    }
}
