//! Shared detection patterns for checks and the prerequisite gate.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// RFC 4122 textual form (any version, case-insensitive)
    pub static ref UUID_PATTERN: Regex = Regex::new(
        r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$"
    ).unwrap();

    /// Lower kebab-case path segment
    pub static ref KEBAB_SEGMENT_PATTERN: Regex = Regex::new(
        r"^[a-z0-9]+(?:-[a-z0-9]+)*$"
    ).unwrap();

    /// Semantic version 2.0.0
    pub static ref SEMVER_PATTERN: Regex = Regex::new(
        r"^(0|[1-9]\d*)\.(0|[1-9]\d*)\.(0|[1-9]\d*)(?:-[0-9A-Za-z.-]+)?(?:\+[0-9A-Za-z.-]+)?$"
    ).unwrap();

    /// `{name}` placeholders in a path template
    pub static ref TEMPLATE_VARIABLE_PATTERN: Regex = Regex::new(
        r"\{([^{}/]+)\}"
    ).unwrap();
}

/// Words that mark a segment as an action rather than a resource.
pub const ACTION_VERBS: [&str; 12] = [
    "get", "create", "update", "delete", "remove", "list", "fetch", "add", "edit", "set",
    "do", "make",
];

/// Query parameters recognised as pagination controls.
pub const PAGING_PARAMETERS: [&str; 8] = [
    "limit", "page", "page_size", "pageSize", "per_page", "perPage", "offset", "cursor",
];

/// Paging parameters that bound the page size.
pub const PAGE_SIZE_PARAMETERS: [&str; 5] = ["limit", "page_size", "pageSize", "per_page", "perPage"];

pub fn is_uuid(value: &str) -> bool {
    UUID_PATTERN.is_match(value)
}

pub fn is_kebab_segment(segment: &str) -> bool {
    KEBAB_SEGMENT_PATTERN.is_match(segment)
}

pub fn is_semver(value: &str) -> bool {
    SEMVER_PATTERN.is_match(value)
}

/// Placeholder names in a path template, in order of appearance.
pub fn template_variables(path: &str) -> Vec<&str> {
    TEMPLATE_VARIABLE_PATTERN
        .captures_iter(path)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect()
}

/// Literal (non-placeholder) segments of a path template.
pub fn literal_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/')
        .filter(|s| !s.is_empty() && !s.starts_with('{'))
}

/// Whether a literal segment leads with an action verb (`list-users`, `create`).
pub fn starts_with_action_verb(segment: &str) -> bool {
    let end = segment
        .char_indices()
        .skip(1)
        .find(|(_, c)| *c == '-' || *c == '_' || c.is_ascii_uppercase())
        .map(|(i, _)| i)
        .unwrap_or(segment.len());
    let head = segment[..end].to_ascii_lowercase();
    ACTION_VERBS.contains(&head.as_str())
}
