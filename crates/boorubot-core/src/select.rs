//! Selection strategies over entry collections.
//!
//! All of these are total: an empty collection yields `None` (or a no-op for
//! the sort), never an error — "no results" is a normal outcome the
//! dispatcher renders as a user-facing message.

use rand::Rng;

use crate::entry::Entry;

/// Entry with the maximum score; ties broken by first occurrence.
pub fn select_top(entries: &[Entry]) -> Option<&Entry> {
    let mut best: Option<&Entry> = None;
    for e in entries {
        match best {
            Some(b) if e.score <= b.score => {}
            _ => best = Some(e),
        }
    }
    best
}

/// Entry with the minimum score; ties broken by first occurrence.
pub fn select_worst(entries: &[Entry]) -> Option<&Entry> {
    let mut worst: Option<&Entry> = None;
    for e in entries {
        match worst {
            Some(w) if e.score >= w.score => {}
            _ => worst = Some(e),
        }
    }
    worst
}

/// Uniformly chosen entry.
pub fn select_random(entries: &[Entry]) -> Option<&Entry> {
    if entries.is_empty() {
        return None;
    }
    let idx = rand::rng().random_range(0..entries.len());
    entries.get(idx)
}

/// Stable sort, descending score (used for multi-result inline responses).
pub fn sort_by_score_desc(entries: &mut [Entry]) {
    entries.sort_by(|a, b| b.score.cmp(&a.score));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::entry_with_score;

    #[test]
    fn empty_collections_yield_no_entry() {
        assert!(select_top(&[]).is_none());
        assert!(select_worst(&[]).is_none());
        assert!(select_random(&[]).is_none());
    }

    #[test]
    fn top_and_worst_pick_extremes() {
        let entries = vec![
            entry_with_score("a", 1),
            entry_with_score("b", 5),
            entry_with_score("c", 3),
        ];
        assert_eq!(select_top(&entries).unwrap().id, "b");
        assert_eq!(select_worst(&entries).unwrap().id, "a");
    }

    #[test]
    fn top_bounds_every_score() {
        let entries = vec![
            entry_with_score("a", -4),
            entry_with_score("b", 0),
            entry_with_score("c", 17),
            entry_with_score("d", 17),
        ];
        let top = select_top(&entries).unwrap();
        let worst = select_worst(&entries).unwrap();
        assert!(entries.iter().all(|e| top.score >= e.score));
        assert!(entries.iter().all(|e| worst.score <= e.score));
    }

    #[test]
    fn ties_break_by_first_occurrence() {
        let entries = vec![
            entry_with_score("first", 7),
            entry_with_score("second", 7),
            entry_with_score("low", 2),
            entry_with_score("low2", 2),
        ];
        assert_eq!(select_top(&entries).unwrap().id, "first");
        assert_eq!(select_worst(&entries).unwrap().id, "low");
    }

    #[test]
    fn random_picks_a_member() {
        let entries = vec![entry_with_score("a", 1), entry_with_score("b", 2)];
        for _ in 0..20 {
            let picked = select_random(&entries).unwrap();
            assert!(entries.iter().any(|e| e.id == picked.id));
        }
    }

    #[test]
    fn sort_desc_is_stable() {
        let mut entries = vec![
            entry_with_score("a", 3),
            entry_with_score("b", 9),
            entry_with_score("c", 3),
        ];
        sort_by_score_desc(&mut entries);
        let ids: Vec<&str> = entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }
}
