//! Bookmark bookkeeping across merged documents.
//!
//! Word identifies a bookmark twice: by a numeric `w:id` linking
//! `w:bookmarkStart` to `w:bookmarkEnd`, and by a `w:name` that internal
//! hyperlinks (`w:anchor`) and fields refer to. Both must stay unique in the
//! combined document.

use std::collections::{HashMap, HashSet};

/// Name Word gives the "last edit position" bookmark.
pub const GO_BACK_BOOKMARK: &str = "_GoBack";

/// Bookmark ids and names already used in the combined document.
#[derive(Debug, Clone, Default)]
pub struct BookmarkRegistry {
    names: HashSet<String>,
    next_id: u64,
}

impl BookmarkRegistry {
    /// Create a registry seeded with the bookmarks of the base document.
    ///
    /// # Arguments
    ///
    /// * `names` - Bookmark names in the base document
    /// * `max_id` - Highest numeric bookmark id in the base document
    pub fn new<I, S>(names: I, max_id: u64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            next_id: max_id.saturating_add(1),
        }
    }

    /// Plan renames for the bookmarks of a document about to be appended.
    ///
    /// Every name is registered; names that are already taken get a
    /// `_2`, `_3`, ... suffix. The returned map only holds renamed entries.
    pub fn register_document(&mut self, names: &[String]) -> HashMap<String, String> {
        let mut renames = HashMap::new();

        for name in names {
            if renames.contains_key(name) {
                continue;
            }
            if self.names.insert(name.clone()) {
                continue;
            }
            let mut n = 2;
            let renamed = loop {
                let candidate = format!("{name}_{n}");
                if !self.names.contains(&candidate) && !names.contains(&candidate) {
                    break candidate;
                }
                n += 1;
            };
            self.names.insert(renamed.clone());
            renames.insert(name.clone(), renamed);
        }

        renames
    }

    /// Allocate a fresh numeric bookmark id.
    pub fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id = self.next_id.saturating_add(1);
        id
    }

    /// Whether a name is in use.
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Number of distinct bookmark names in the combined document.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether no bookmark names are registered.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Per-document id mapping, alive while one document is appended.
#[derive(Debug, Default)]
pub struct BookmarkIdMap {
    ids: HashMap<String, u64>,
}

impl BookmarkIdMap {
    /// New id for the `w:id` of a bookmark start.
    pub fn start(&mut self, registry: &mut BookmarkRegistry, old: &str) -> u64 {
        let id = registry.allocate_id();
        self.ids.insert(old.to_string(), id);
        id
    }

    /// New id for the `w:id` of a bookmark end.
    ///
    /// An end without a start still gets a fresh id so it cannot pair with
    /// a bookmark of another document.
    pub fn end(&mut self, registry: &mut BookmarkRegistry, old: &str) -> u64 {
        match self.ids.get(old) {
            Some(id) => *id,
            None => self.start(registry, old),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_without_collisions() {
        let mut registry = BookmarkRegistry::new(["intro"], 3);
        let renames = registry.register_document(&["summary".to_string()]);
        assert!(renames.is_empty());
        assert!(registry.contains("summary"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_register_renames_collisions() {
        let mut registry = BookmarkRegistry::new(["intro", "intro_2"], 0);
        let renames = registry.register_document(&["intro".to_string(), "other".to_string()]);
        assert_eq!(renames.get("intro").map(String::as_str), Some("intro_3"));
        assert!(!renames.contains_key("other"));

        let again = registry.register_document(&["intro".to_string()]);
        assert_eq!(again.get("intro").map(String::as_str), Some("intro_4"));
    }

    #[test]
    fn test_go_back_is_renamed_like_any_other() {
        let mut registry = BookmarkRegistry::new([GO_BACK_BOOKMARK], 0);
        let renames = registry.register_document(&[GO_BACK_BOOKMARK.to_string()]);
        assert_eq!(renames.get(GO_BACK_BOOKMARK).map(String::as_str), Some("_GoBack_2"));
    }

    #[test]
    fn test_huge_base_id_does_not_overflow() {
        let mut registry = BookmarkRegistry::new(Vec::<String>::new(), u64::MAX);
        assert_eq!(registry.allocate_id(), u64::MAX);
        assert_eq!(registry.allocate_id(), u64::MAX);
    }

    #[test]
    fn test_ids_continue_after_base() {
        let mut registry = BookmarkRegistry::new(Vec::<String>::new(), 7);
        let mut ids = BookmarkIdMap::default();
        assert_eq!(ids.start(&mut registry, "0"), 8);
        assert_eq!(ids.start(&mut registry, "1"), 9);
        assert_eq!(ids.end(&mut registry, "0"), 8);
        assert_eq!(ids.end(&mut registry, "42"), 10);
    }
}
