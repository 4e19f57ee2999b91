//! Field visibility filtering.
//!
//! A [`PropertyFilter`] is derived from the visible/hidden property lists the
//! authorization layer attaches to a request. Response serialization uses it
//! to strip keys the actor may not see.

use crate::error::FilterError;
use hookwire_types::AttributeMap;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq)]
enum FilterStrategy {
    IncludeAll,
    ExcludeAll,
    Visible(HashSet<String>),
    Hidden(HashSet<String>),
}

impl FilterStrategy {
    fn allows(&self, key: &str) -> bool {
        match self {
            Self::IncludeAll => true,
            Self::ExcludeAll => false,
            Self::Visible(keys) => keys.contains(key),
            Self::Hidden(keys) => !keys.contains(key),
        }
    }
}

/// Decides which resource properties are visible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyFilter {
    strategy: FilterStrategy,
}

impl PropertyFilter {
    /// Builds a filter from visible/hidden property lists.
    ///
    /// `None` means the list was not given. Neither list means everything is
    /// visible; a given visible list hides every other key, even when empty.
    /// Giving both lists is a configuration error.
    pub fn from_properties(
        visible: Option<Vec<String>>,
        hidden: Option<Vec<String>>,
    ) -> Result<Self, FilterError> {
        let strategy = match (visible, hidden) {
            (None, None) => FilterStrategy::IncludeAll,
            (Some(visible), None) => FilterStrategy::Visible(visible.into_iter().collect()),
            (None, Some(hidden)) => FilterStrategy::Hidden(hidden.into_iter().collect()),
            (Some(_), Some(_)) => return Err(FilterError::VisibleAndHidden),
        };
        Ok(Self { strategy })
    }

    pub fn allow_all() -> Self {
        Self {
            strategy: FilterStrategy::IncludeAll,
        }
    }

    pub fn exclude_all() -> Self {
        Self {
            strategy: FilterStrategy::ExcludeAll,
        }
    }

    /// Returns a copy of `data` without forbidden keys, preserving key order.
    pub fn remove_hidden_keys_from_map(&self, data: &AttributeMap) -> AttributeMap {
        data.iter()
            .filter(|(key, _)| self.strategy.allows(key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// Returns the allowed keys of `data`, preserving order.
    pub fn remove_hidden_keys_from_slice<S: AsRef<str>>(&self, data: &[S]) -> Vec<String> {
        data.iter()
            .map(AsRef::as_ref)
            .filter(|key| self.strategy.allows(key))
            .map(str::to_string)
            .collect()
    }

    pub fn is_forbidden(&self, key: &str) -> bool {
        !self.strategy.allows(key)
    }

    /// True only for the include-all strategy; lets callers skip copying.
    pub fn allows_all(&self) -> bool {
        self.strategy == FilterStrategy::IncludeAll
    }
}

impl Default for PropertyFilter {
    fn default() -> Self {
        Self::allow_all()
    }
}
