use std::collections::HashSet;

/// One normalized content record produced by a catalog adapter.
///
/// Entries are immutable once produced and live only for the duration of a
/// single request; they are re-derived from the cached raw payload on every
/// read, so normalization changes apply retroactively to cached data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    /// Opaque, source-scoped identifier.
    pub id: String,
    pub score: i64,
    /// Lowercase tag set.
    pub tags: HashSet<String>,
    /// Lowercase file extension, without the dot.
    pub extension: String,
    pub image_url: String,
    pub thumb_url: String,
    pub permalink: String,
    pub width: u32,
    pub height: u32,
}

impl Entry {
    /// Filename used when relaying the binary payload.
    pub fn filename(&self) -> String {
        format!("{}.{}", self.id, self.extension)
    }
}

/// Deployment-configured blocklists applied during normalization.
#[derive(Clone, Debug, Default)]
pub struct EntryFilter {
    blocked_tags: HashSet<String>,
    blocked_extensions: HashSet<String>,
}

impl EntryFilter {
    pub fn new(blocked_tags: &[String], blocked_extensions: &[String]) -> Self {
        Self {
            blocked_tags: blocked_tags.iter().map(|t| t.to_lowercase()).collect(),
            blocked_extensions: blocked_extensions
                .iter()
                .map(|e| e.to_lowercase())
                .collect(),
        }
    }

    pub fn allows(&self, entry: &Entry) -> bool {
        if self.blocked_extensions.contains(&entry.extension) {
            return false;
        }
        !entry.tags.iter().any(|t| self.blocked_tags.contains(t))
    }

    /// Drop entries with a blocked extension or a blocked tag. Idempotent.
    pub fn apply(&self, entries: Vec<Entry>) -> Vec<Entry> {
        entries.into_iter().filter(|e| self.allows(e)).collect()
    }
}

#[cfg(test)]
pub(crate) fn entry_with_score(id: &str, score: i64) -> Entry {
    Entry {
        id: id.to_string(),
        score,
        tags: HashSet::new(),
        extension: "png".to_string(),
        image_url: format!("https://cdn.example/{id}.png"),
        thumb_url: format!("https://cdn.example/{id}.thumb.png"),
        permalink: format!("https://example.org/{id}"),
        width: 800,
        height: 600,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tagged(id: &str, tags: &[&str], ext: &str) -> Entry {
        let mut e = entry_with_score(id, 1);
        e.tags = tags.iter().map(|t| t.to_string()).collect();
        e.extension = ext.to_string();
        e
    }

    fn filter() -> EntryFilter {
        EntryFilter::new(
            &["3d".to_string(), "comic".to_string()],
            &["webm".to_string(), "swf".to_string()],
        )
    }

    #[test]
    fn drops_blocked_extensions() {
        let out = filter().apply(vec![
            tagged("a", &[], "png"),
            tagged("b", &[], "webm"),
            tagged("c", &[], "swf"),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "a");
    }

    #[test]
    fn drops_blocked_tags() {
        let out = filter().apply(vec![
            tagged("a", &["pony", "cute"], "png"),
            tagged("b", &["pony", "3d"], "png"),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "a");
    }

    #[test]
    fn filtered_collection_has_no_blocked_content() {
        let f = filter();
        let out = f.apply(vec![
            tagged("a", &["pony"], "png"),
            tagged("b", &["comic"], "png"),
            tagged("c", &["pony"], "webm"),
            tagged("d", &["cute"], "jpg"),
        ]);
        assert!(out.iter().all(|e| f.allows(e)));
    }

    #[test]
    fn filtering_is_idempotent() {
        let f = filter();
        let input = vec![
            tagged("a", &["pony"], "png"),
            tagged("b", &["3d"], "png"),
            tagged("c", &[], "webm"),
        ];
        let once = f.apply(input);
        let twice = f.apply(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn empty_filter_keeps_everything() {
        let f = EntryFilter::default();
        let out = f.apply(vec![tagged("a", &["anything"], "webm")]);
        assert_eq!(out.len(), 1);
    }
}
