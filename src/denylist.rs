//! # Reject filter
//!
//! Cinema listing pages surround movie titles with site chrome ("Now
//! Showing", "Buy Tickets", footer links) that survives naive extraction.
//! The reject filter keeps that chrome out of the matcher.
//!
//! The denylist is an explicit table, not literals buried in the
//! normalizer, so it can be unit-tested and extended from configuration
//! without touching the normalization rules. Matching is by containment: a
//! normalized title is rejected when any entry appears anywhere inside it.

use crate::normalize::{is_all_digits, normalize};

/// Built-in site-chrome phrases, in normalized form.
pub const DEFAULT_DENYLIST: &[&str] = &[
    "now showing",
    "coming soon",
    "book now",
    "buy tickets",
    "book tickets",
    "view all",
    "read more",
    "see more",
    "showtimes",
    "trailer",
    "faq",
    "vip",
    "imax",
    "4dx",
    "dolby",
    "atmos",
    "screenx",
    "gold class",
    "kids club",
    "offers",
    "promotions",
    "gift card",
    "experiences",
    "select location",
    "sign in",
    "sign up",
    "contact us",
    "about us",
    "terms and conditions",
    "privacy policy",
];

/// Shortest normalized title worth matching.
const MIN_TITLE_LEN: usize = 3;

#[derive(Debug, Clone)]
pub struct RejectList {
    entries: Vec<String>,
}

impl Default for RejectList {
    fn default() -> Self {
        Self::builtin()
    }
}

impl RejectList {
    /// The built-in table only.
    pub fn builtin() -> Self {
        Self {
            entries: DEFAULT_DENYLIST.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Built-in table plus extra phrases from configuration. Extras are
    /// normalized so config entries match the same way built-ins do.
    pub fn with_extra<S: AsRef<str>>(extra: &[S]) -> Self {
        let mut list = Self::builtin();
        for e in extra {
            let n = normalize(e.as_ref());
            if !n.is_empty() && !list.entries.contains(&n) {
                list.entries.push(n);
            }
        }
        list
    }

    /// Reject filter over a raw scraped string: normalizes, then applies
    /// the length floor, the containment denylist, and the digits-only rule.
    pub fn should_skip(&self, raw: &str) -> bool {
        self.should_skip_normalized(&normalize(raw))
    }

    /// Same rules for a title that is already normalized.
    pub fn should_skip_normalized(&self, normalized: &str) -> bool {
        if normalized.chars().count() < MIN_TITLE_LEN {
            return true;
        }
        if is_all_digits(normalized) {
            return true;
        }
        self.entries.iter().any(|e| normalized.contains(e.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_site_chrome() {
        let r = RejectList::builtin();
        assert!(r.should_skip("now showing"));
        assert!(r.should_skip("NOW SHOWING"));
        assert!(r.should_skip("Buy Tickets"));
        assert!(r.should_skip("View All Movies"));
    }

    #[test]
    fn containment_not_just_equality() {
        let r = RejectList::builtin();
        assert!(r.should_skip("movies now showing this week"));
    }

    #[test]
    fn keeps_real_titles() {
        let r = RejectList::builtin();
        assert!(!r.should_skip("Oppenheimer"));
        assert!(!r.should_skip("Dune: Part Two"));
    }

    #[test]
    fn rejects_short_and_digit_only() {
        let r = RejectList::builtin();
        assert!(r.should_skip("Up"));
        assert!(r.should_skip("2023"));
        assert!(r.should_skip(""));
    }

    #[test]
    fn extra_entries_are_normalized_and_applied() {
        let r = RejectList::with_extra(&["Ladies Night!"]);
        assert!(r.should_skip("Ladies Night"));
        assert!(!RejectList::builtin().should_skip("Ladies Night"));
    }
}
