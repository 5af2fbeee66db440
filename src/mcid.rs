use std::collections::HashMap;

/// Hands out marked-content identifiers per page.
///
/// Asking the document for "the next free MCID" cannot see references the
/// engine attaches without touching content bytes, so the run owns the
/// counters outright. Identifiers on a page start at 0 and only ever grow;
/// an identifier handed out for an attempt that later fails is not returned.
#[derive(Debug, Default)]
pub struct McidAllocator {
    counters: HashMap<u32, i64>,
}

impl McidAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the next identifier for `page` (1-based page number).
    pub fn next(&mut self, page: u32) -> i64 {
        let counter = self.counters.entry(page).or_insert(0);
        let mcid = *counter;
        *counter += 1;
        mcid
    }

    /// Number of identifiers issued so far on `page`.
    #[cfg(test)]
    fn issued(&self, page: u32) -> i64 {
        self.counters.get(&page).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero_and_increase_per_page() {
        let mut mcids = McidAllocator::new();
        assert_eq!(mcids.next(1), 0);
        assert_eq!(mcids.next(1), 1);
        assert_eq!(mcids.next(2), 0);
        assert_eq!(mcids.next(1), 2);
        assert_eq!(mcids.issued(1), 3);
        assert_eq!(mcids.issued(7), 0);
    }

    #[test]
    fn no_duplicates_within_a_page() {
        let mut mcids = McidAllocator::new();
        let issued: Vec<i64> = (0..50).map(|_| mcids.next(3)).collect();
        assert!(issued.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(issued.first(), Some(&0));
    }
}
