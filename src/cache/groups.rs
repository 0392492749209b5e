//! Group Invalidator Module
//!
//! Resolves semantic groups (e.g. "blog", "media") to the keys they cover.

use std::collections::{HashMap, HashSet};

use tracing::debug;

/// Group name given to keys no configured prefix covers.
pub const UNGROUPED: &str = "ungrouped";

// == Group Invalidator ==
/// Named sets of key prefixes.
///
/// A group is a query over keys, not a storage structure: a key belongs to a
/// group when it equals or starts with one of the group's prefixes.
#[derive(Debug, Clone, Default)]
pub struct GroupInvalidator {
    groups: HashMap<String, Vec<String>>,
}

impl GroupInvalidator {
    // == Constructor ==
    pub fn new(groups: HashMap<String, Vec<String>>) -> Self {
        Self { groups }
    }

    /// Prefixes registered for `name`, if the group exists.
    pub fn prefixes(&self, name: &str) -> Option<&[String]> {
        self.groups.get(name).map(Vec::as_slice)
    }

    /// Whether `key` falls under group `name`. Unknown groups match nothing.
    pub fn matches(&self, name: &str, key: &str) -> bool {
        self.prefixes(name)
            .is_some_and(|prefixes| prefixes.iter().any(|p| key.starts_with(p.as_str())))
    }

    // == Resolve ==
    /// Returns the subset of `keys` covered by group `name`.
    ///
    /// An unknown group resolves to an empty set rather than an error.
    pub fn resolve<'a, I>(&self, name: &str, keys: I) -> HashSet<String>
    where
        I: IntoIterator<Item = &'a String>,
    {
        if !self.groups.contains_key(name) {
            debug!(group = name, "Unknown cache group resolves to no keys");
            return HashSet::new();
        }

        keys.into_iter()
            .filter(|key| self.matches(name, key))
            .cloned()
            .collect()
    }

    // == Group For Key ==
    /// Group a key is filed under at insertion time.
    ///
    /// The group owning the longest matching prefix wins; ties go to the
    /// lexicographically smaller group name.
    pub fn group_for_key(&self, key: &str) -> String {
        self.groups
            .iter()
            .flat_map(|(name, prefixes)| {
                prefixes
                    .iter()
                    .filter(|p| key.starts_with(p.as_str()))
                    .map(move |p| (p.len(), name))
            })
            .max_by(|(len_a, name_a), (len_b, name_b)| {
                len_a.cmp(len_b).then_with(|| name_b.cmp(name_a))
            })
            .map(|(_, name)| name.clone())
            .unwrap_or_else(|| UNGROUPED.to_string())
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn invalidator() -> GroupInvalidator {
        let mut groups = HashMap::new();
        groups.insert(
            "blog".to_string(),
            vec!["api/blog".to_string(), "api/blog/all".to_string()],
        );
        groups.insert("media".to_string(), vec!["api/media".to_string()]);
        groups.insert("posts".to_string(), vec!["api/blog/post".to_string()]);
        GroupInvalidator::new(groups)
    }

    fn keys(list: &[&str]) -> Vec<String> {
        list.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn test_resolve_matches_equal_and_prefixed_keys() {
        let keys = keys(&["api/blog", "api/blog/post/1", "api/media/3", "api/user/1"]);
        let resolved = invalidator().resolve("blog", &keys);

        assert_eq!(resolved.len(), 2);
        assert!(resolved.contains("api/blog"));
        assert!(resolved.contains("api/blog/post/1"));
    }

    #[test]
    fn test_unknown_group_resolves_empty() {
        let keys = keys(&["api/blog/1"]);
        assert!(invalidator().resolve("blgo", &keys).is_empty());
    }

    #[test]
    fn test_group_for_key_longest_prefix() {
        let groups = invalidator();
        assert_eq!(groups.group_for_key("api/blog/post/42"), "posts");
        assert_eq!(groups.group_for_key("api/blog/all"), "blog");
        assert_eq!(groups.group_for_key("api/media/7"), "media");
        assert_eq!(groups.group_for_key("api/other"), UNGROUPED);
    }

    #[test]
    fn test_matches() {
        let groups = invalidator();
        assert!(groups.matches("media", "api/media/7"));
        assert!(!groups.matches("media", "api/blog/7"));
        assert!(!groups.matches("missing", "api/media/7"));
    }
}
