//! Longest-prefix rule matching for incoming request paths.
//!
//! [`RuleTable`] precomputes a length-descending ordering of the
//! configured listener rules; [`resolve`](RuleTable::resolve) scans it
//! linearly and returns the first rule whose prefix matches on a
//! segment boundary. Equal-length prefixes keep declaration order, so
//! the first-declared rule wins ties, and the `/` prefix — shortest of
//! all — lands at the end of the table as the catch-all.

use crate::config::model::RuleConfig;

#[derive(Debug, Clone)]
pub struct Rule {
    pub prefix: String,
    pub rewrite: String,
    pub group: String,
}

impl Rule {
    /// Strip the rewrite prefix from a matched path. The remainder is
    /// either empty or `/`-rooted; the target's base-URI is prepended
    /// later, at URI construction.
    #[must_use]
    pub fn rewrite_path(&self, path: &str) -> String {
        if self.rewrite.is_empty() || !path.starts_with(&self.rewrite) {
            return path.to_string();
        }

        let remainder = &path[self.rewrite.len()..];
        if remainder.is_empty() || remainder.starts_with('/') {
            remainder.to_string()
        } else {
            format!("/{remainder}")
        }
    }
}

#[derive(Debug)]
pub struct RuleTable {
    rules: Vec<Rule>,
}

impl RuleTable {
    /// Build the precomputed table. The sort is stable: among
    /// equal-length prefixes declaration order survives.
    #[must_use]
    pub fn new(configs: &[RuleConfig]) -> Self {
        let mut rules: Vec<Rule> = configs
            .iter()
            .map(|c| Rule {
                prefix: c.prefix.clone(),
                rewrite: c.rewrite.clone(),
                group: c.group.clone(),
            })
            .collect();

        rules.sort_by_key(|r| std::cmp::Reverse(r.prefix.len()));

        Self { rules }
    }

    /// Longest matching rule for a decoded request path, or `None`
    /// (the caller reports 404).
    #[must_use]
    pub fn resolve(&self, path: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| prefix_matches(&r.prefix, path))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// A prefix matches when it equals the path or ends on a segment
/// boundary: `/api` matches `/api` and `/api/v1`, never `/apix`.
fn prefix_matches(prefix: &str, path: &str) -> bool {
    if prefix == "/" {
        return true;
    }

    match path.strip_prefix(prefix) {
        Some("") => true,
        Some(rest) => prefix.ends_with('/') || rest.starts_with('/'),
        None => false,
    }
}
