//! Include paths for eager loading.
//!
//! `"school.people"` names the `school` association of the found records and,
//! on every loaded school, its `people`. A list of paths is merged into a tree
//! so each association is loaded once per level.

/// A path to an association to include.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludePath {
    /// Association name on the parent.
    pub relationship: String,
    /// Nested associations to load on the included records.
    pub nested: Vec<IncludePath>,
}

impl IncludePath {
    /// Create a new include path for a single association.
    #[must_use]
    pub fn new(relationship: impl Into<String>) -> Self {
        Self {
            relationship: relationship.into(),
            nested: Vec::new(),
        }
    }

    /// Add a nested association to load.
    #[must_use]
    pub fn nest(mut self, path: IncludePath) -> Self {
        merge_into(&mut self.nested, path);
        self
    }

    /// Parse a dotted path such as `"school.people.payments"`.
    ///
    /// Returns `None` for an empty path or one with an empty segment.
    pub fn parse(path: &str) -> Option<Self> {
        let parts: Vec<&str> = path.split('.').map(str::trim).collect();
        if parts.iter().any(|p| p.is_empty()) {
            return None;
        }
        Some(Self::build_nested_path(&parts))
    }

    /// Parse and merge several dotted paths.
    ///
    /// Paths sharing a prefix collapse into one node: `["a.b", "a.c"]` gives a
    /// single `a` with nested `b` and `c`. Empty paths are skipped.
    pub fn parse_list<'a, I>(paths: I) -> Vec<IncludePath>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut out = Vec::new();
        for path in paths.into_iter().filter_map(Self::parse) {
            merge_into(&mut out, path);
        }
        out
    }

    fn build_nested_path(parts: &[&str]) -> Self {
        match parts.split_first() {
            Some((first, [])) => Self::new(*first),
            Some((first, rest)) => Self::new(*first).nest(Self::build_nested_path(rest)),
            None => Self::new(""),
        }
    }
}

/// Merge `path` into `paths`, combining with an existing node of the same name.
pub fn merge_into(paths: &mut Vec<IncludePath>, path: IncludePath) {
    match paths.iter_mut().find(|p| p.relationship == path.relationship) {
        Some(existing) => {
            for nested in path.nested {
                merge_into(&mut existing.nested, nested);
            }
        }
        None => paths.push(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single() {
        let path = IncludePath::parse("people").expect("path");
        assert_eq!(path.relationship, "people");
        assert!(path.nested.is_empty());
    }

    #[test]
    fn test_parse_nested() {
        let path = IncludePath::parse("school.people.payments").expect("path");
        assert_eq!(path.relationship, "school");
        assert_eq!(path.nested.len(), 1);
        assert_eq!(path.nested[0].relationship, "people");
        assert_eq!(path.nested[0].nested[0].relationship, "payments");
    }

    #[test]
    fn test_parse_rejects_empty_segments() {
        assert!(IncludePath::parse("").is_none());
        assert!(IncludePath::parse("a..b").is_none());
    }

    #[test]
    fn test_parse_list_merges_prefixes() {
        let paths = IncludePath::parse_list(["school.people", "school.principal", "payments"]);
        assert_eq!(paths.len(), 2);
        assert_eq!(paths[0].relationship, "school");
        let nested: Vec<&str> = paths[0].nested.iter().map(|p| p.relationship.as_str()).collect();
        assert_eq!(nested, vec!["people", "principal"]);
        assert_eq!(paths[1].relationship, "payments");
    }

    #[test]
    fn test_nest_builder() {
        let path = IncludePath::new("school")
            .nest(IncludePath::new("people"))
            .nest(IncludePath::new("people").nest(IncludePath::new("payments")));
        assert_eq!(path.nested.len(), 1);
        assert_eq!(path.nested[0].nested[0].relationship, "payments");
    }
}
