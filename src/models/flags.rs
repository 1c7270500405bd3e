use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Flag gating the newsletter subscription form.
pub const NEWSLETTER_FORM: &str = "newsletter_form";

/// Flag gating the feedback / lead request form.
pub const FEEDBACK_FORM: &str = "feedback_form";

/// Flag gating the beta tools banner above the catalog.
pub const BETA_TOOLS_BANNER: &str = "beta_tools_banner";

/// Mapping from flag name to enabled state.
///
/// Names are opaque identifiers agreed upon with the remote configuration source.
/// A name that is not present reads as disabled. Keys are unique; the insertion
/// order is kept only so that listings and saved configs stay stable.
///
/// # Related Types
///
/// - [`crate::models::FlagState`]: Holds the current set together with load status
/// - [`crate::state::FlagProvider`]: The only writer of the process-wide set
/// - [`merge`]: Combines two sets, the second one winning on shared keys
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureFlagSet(IndexMap<String, bool>);

impl FeatureFlagSet {
    /// Create an empty flag set
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    /// Built-in defaults used before (or instead of) any remote data
    pub fn defaults() -> Self {
        let mut flags = IndexMap::new();
        flags.insert(NEWSLETTER_FORM.to_string(), true);
        flags.insert(FEEDBACK_FORM.to_string(), true);
        flags.insert(BETA_TOOLS_BANNER.to_string(), false);
        Self(flags)
    }

    /// Look up a flag, `None` when the name is unknown
    pub fn get(&self, name: &str) -> Option<bool> {
        self.0.get(name).copied()
    }

    /// Whether a flag is on. Unknown names are off.
    pub fn is_enabled(&self, name: &str) -> bool {
        self.get(name).unwrap_or(false)
    }

    /// Set a flag, returning the previous value if there was one
    pub fn insert(&mut self, name: impl Into<String>, enabled: bool) -> Option<bool> {
        self.0.insert(name.into(), enabled)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.0.iter().map(|(name, enabled)| (name.as_str(), *enabled))
    }

    /// Names of all flags that are currently on
    pub fn enabled_names(&self) -> Vec<&str> {
        self.iter()
            .filter(|(_, enabled)| *enabled)
            .map(|(name, _)| name)
            .collect()
    }

    /// Overlay `remote` on top of this set in place.
    ///
    /// Returns the names whose value actually changed (including names that were
    /// not present before), in the order they appear in `remote`.
    pub fn apply(&mut self, remote: &FeatureFlagSet) -> Vec<String> {
        let mut changed = Vec::new();

        for (name, enabled) in remote.iter() {
            if self.insert(name, enabled) != Some(enabled) {
                changed.push(name.to_string());
            }
        }

        changed
    }
}

/// Merge `remote` on top of `current`.
///
/// Keys present in `remote` take its value; keys only present in `current` keep
/// theirs. A remote source that reports a subset of flags therefore never turns
/// off the flags it did not mention.
pub fn merge(current: &FeatureFlagSet, remote: &FeatureFlagSet) -> FeatureFlagSet {
    let mut merged = current.clone();
    merged.apply(remote);
    merged
}

impl From<IndexMap<String, bool>> for FeatureFlagSet {
    fn from(flags: IndexMap<String, bool>) -> Self {
        Self(flags)
    }
}

/// Later entries overwrite earlier ones with the same name.
impl<S: Into<String>> FromIterator<(S, bool)> for FeatureFlagSet {
    fn from_iter<I: IntoIterator<Item = (S, bool)>>(iter: I) -> Self {
        let mut flags = FeatureFlagSet::new();
        for (name, enabled) in iter {
            flags.insert(name, enabled);
        }
        flags
    }
}
