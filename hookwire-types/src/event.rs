//! Lifecycle event names and handler priorities.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Handler priority. Lower values run first.
pub type Priority = i32;

/// Priority used when an extension does not care about ordering.
pub const DEFAULT_PRIORITY: Priority = 0;

/// Generic resource lifecycle events.
///
/// The CRUD orchestrator fires the create/update/delete pairs inside the
/// request transaction; list and show events are fired by the request
/// layer in front of the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceEvent {
    PreList,
    PostList,
    PreShow,
    PostShow,
    PreCreate,
    PostCreate,
    PreUpdate,
    PostUpdate,
    PreDelete,
    PostDelete,
}

impl ResourceEvent {
    /// All lifecycle events, in firing order of a full CRUD cycle.
    pub const ALL: [ResourceEvent; 10] = [
        Self::PreList,
        Self::PostList,
        Self::PreShow,
        Self::PostShow,
        Self::PreCreate,
        Self::PostCreate,
        Self::PreUpdate,
        Self::PostUpdate,
        Self::PreDelete,
        Self::PostDelete,
    ];

    /// Returns the wire name of the event (e.g. `pre_create`).
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PreList => "pre_list",
            Self::PostList => "post_list",
            Self::PreShow => "pre_show",
            Self::PostShow => "post_show",
            Self::PreCreate => "pre_create",
            Self::PostCreate => "post_create",
            Self::PreUpdate => "pre_update",
            Self::PostUpdate => "post_update",
            Self::PreDelete => "pre_delete",
            Self::PostDelete => "post_delete",
        }
    }

    /// Whether handlers for this event run before the storage operation.
    pub const fn is_pre(&self) -> bool {
        matches!(
            self,
            Self::PreList | Self::PreShow | Self::PreCreate | Self::PreUpdate | Self::PreDelete
        )
    }
}

impl AsRef<str> for ResourceEvent {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for ResourceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceEvent {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|event| event.as_str() == s)
            .ok_or_else(|| crate::Error::UnknownEvent(s.to_string()))
    }
}

/// A schema-declared custom action name (e.g. `reboot`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomEvent(String);

impl CustomEvent {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for CustomEvent {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CustomEvent {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for CustomEvent {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl fmt::Display for CustomEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
