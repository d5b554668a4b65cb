//! Bundle selection and classification over directory listings.
//!
//! These functions never touch the filesystem; callers supply the names
//! they listed so the rules can be exercised without real I/O.

/// Metadata document present in every published bundle.
pub const METADATA_FILE: &str = "metadata.json";

/// Marker file whose presence turns a bundle into a rollback.
pub const ROLLBACK_MARKER: &str = "rollback";

/// Default name of the exported app config document.
pub const DEFAULT_CONFIG_FILE: &str = "expoConfig.json";

/// How a resolved bundle must be served.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BundleKind {
    /// Serve a manifest describing the bundle's assets.
    Normal,
    /// Tell the client to fall back to its embedded bundle.
    Rollback,
}

impl BundleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Rollback => "rollback",
        }
    }
}

/// Parse a bundle directory name as a publish timestamp.
///
/// Only plain non-negative decimal integers qualify; `+5`, `-1`, `1.0` and
/// names with surrounding whitespace are rejected.
pub fn parse_publish_timestamp(name: &str) -> Option<u64> {
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    name.parse().ok()
}

/// Pick the bundle directory with the greatest numeric publish timestamp.
///
/// Ordering is numeric, not lexicographic: among `3`, `10` and `2` the
/// result is `10`. Names that are not timestamps are ignored. Returns
/// `None` when no candidate qualifies.
pub fn select_latest_bundle<'a, I>(names: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    names
        .into_iter()
        .filter_map(|name| parse_publish_timestamp(name).map(|ts| (ts, name)))
        .max_by_key(|(ts, _)| *ts)
        .map(|(_, name)| name)
}

/// Classify a bundle from the names of the entries in its directory.
///
/// The rollback marker is authoritative regardless of what else is present.
pub fn classify_entries<'a, I>(entries: I) -> BundleKind
where
    I: IntoIterator<Item = &'a str>,
{
    if entries.into_iter().any(|name| name == ROLLBACK_MARKER) {
        BundleKind::Rollback
    } else {
        BundleKind::Normal
    }
}
