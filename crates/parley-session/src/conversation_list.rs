//! Recency-ordered list of known conversations

use parley_protocol::ConversationSummary;

/// Conversation list, most recent first. Ids are unique.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationList {
    entries: Vec<ConversationSummary>,
}

impl ConversationList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a server-assigned title.
    ///
    /// An existing entry is retitled in place; an unknown id is inserted at
    /// the head. Returns `true` when a new entry was inserted.
    pub fn upsert_title(&mut self, id: &str, title: &str) -> bool {
        if let Some(entry) = self.entries.iter_mut().find(|c| c.id == id) {
            entry.title = Some(title.to_string());
            return false;
        }
        self.entries
            .insert(0, ConversationSummary::new(id, Some(title.to_string())));
        true
    }

    /// Replace the whole list with the server's view, keeping the first
    /// occurrence of any duplicated id.
    pub fn replace(&mut self, entries: Vec<ConversationSummary>) {
        self.entries.clear();
        for entry in entries {
            if !self.contains(&entry.id) {
                self.entries.push(entry);
            }
        }
    }

    /// Drop an entry. Returns `true` if it was present.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|c| c.id != id);
        self.entries.len() != before
    }

    pub fn get(&self, id: &str) -> Option<&ConversationSummary> {
        self.entries.iter().find(|c| c.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn entries(&self) -> &[ConversationSummary] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(list: &ConversationList) -> Vec<&str> {
        list.entries().iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn test_new_id_inserted_at_head() {
        let mut list = ConversationList::new();
        list.replace(vec![ConversationSummary::new("old", Some("Old".into()))]);
        assert!(list.upsert_title("new", "Fresh"));
        assert_eq!(ids(&list), vec!["new", "old"]);
        assert_eq!(list.get("new").unwrap().title.as_deref(), Some("Fresh"));
    }

    #[test]
    fn test_existing_id_updated_in_place() {
        let mut list = ConversationList::new();
        list.replace(vec![
            ConversationSummary::new("a", None),
            ConversationSummary::new("b", Some("B".into())),
        ]);
        assert!(!list.upsert_title("b", "Renamed"));
        assert_eq!(ids(&list), vec!["a", "b"]);
        assert_eq!(list.get("b").unwrap().title.as_deref(), Some("Renamed"));
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let mut list = ConversationList::new();
        for _ in 0..3 {
            list.upsert_title("c1", "Title");
        }
        assert_eq!(list.len(), 1);

        let snapshot = list.clone();
        list.upsert_title("c1", "Title");
        assert_eq!(list, snapshot);
    }

    #[test]
    fn test_replace_drops_duplicate_ids() {
        let mut list = ConversationList::new();
        list.replace(vec![
            ConversationSummary::new("a", Some("first".into())),
            ConversationSummary::new("a", Some("second".into())),
        ]);
        assert_eq!(list.len(), 1);
        assert_eq!(list.get("a").unwrap().title.as_deref(), Some("first"));
    }

    #[test]
    fn test_remove_twice() {
        let mut list = ConversationList::new();
        list.upsert_title("a", "A");
        assert!(list.remove("a"));
        assert!(!list.remove("a"));
        assert!(list.is_empty());
    }
}
