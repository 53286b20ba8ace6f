use std::collections::BTreeMap;

/// Per-tag unread aggregates.
///
/// A tag's count moves by the same delta as any feed carrying it, applied
/// exactly once per feed unread-count change.
#[derive(Debug, Clone, Default)]
pub struct TagStore {
    counts: BTreeMap<String, i64>,
}

impl TagStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tag if it isn't known yet.
    pub fn ensure(&mut self, name: &str) {
        self.counts.entry(name.to_string()).or_insert(0);
    }

    pub fn remove(&mut self, name: &str) {
        self.counts.remove(name);
    }

    pub fn increment(&mut self, name: &str, delta: i64) {
        if let Some(count) = self.counts.get_mut(name) {
            *count += delta;
        }
    }

    pub fn unread(&self, name: &str) -> i64 {
        self.counts.get(name).copied().unwrap_or(0)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.counts.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_increment_tracks_delta() {
        let mut tags = TagStore::new();
        tags.ensure("news");
        tags.increment("news", 3);
        tags.increment("news", -1);
        assert_eq!(tags.unread("news"), 2);
    }

    #[test]
    fn test_increment_unknown_tag_is_noop() {
        let mut tags = TagStore::new();
        tags.increment("ghost", 5);
        assert_eq!(tags.unread("ghost"), 0);
    }

    #[test]
    fn test_names_sorted() {
        let mut tags = TagStore::new();
        tags.ensure("tech");
        tags.ensure("art");
        let names: Vec<&str> = tags.names().collect();
        assert_eq!(names, vec!["art", "tech"]);
    }
}
