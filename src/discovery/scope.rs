use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref OBJECT_CLASS_CLAUSE: Regex =
        Regex::new(r"\(objectClass=([^)]+)\)").expect("objectClass pattern is valid");
}

/// Opaque identifier of an interest holder.
///
/// Handles are allocated by the discovery front-end; the registry never
/// dereferences them itself, it only hands them to the
/// [`SubscriberResolver`](crate::SubscriberResolver).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberHandle(u64);

impl SubscriberHandle {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn id(&self) -> u64 {
        self.0
    }
}

impl From<u64> for SubscriberHandle {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for SubscriberHandle {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "subscriber#{}", self.0)
    }
}

/// Filter expression over endpoint properties.
///
/// Cloning is cheap; the expression text is shared.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Scope(Arc<str>);

impl Scope {
    pub fn new(filter: impl AsRef<str>) -> Self {
        Self(Arc::from(filter.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Interface name named by the first `(objectClass=...)` clause.
    ///
    /// Returns `None` when the filter does not restrict the object class.
    pub fn object_class(&self) -> Option<&str> {
        OBJECT_CLASS_CLAUSE
            .captures(&self.0)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim())
            .filter(|class| !class.is_empty())
    }
}

impl From<&str> for Scope {
    fn from(filter: &str) -> Self {
        Self::new(filter)
    }
}

impl From<String> for Scope {
    fn from(filter: String) -> Self {
        Self(Arc::from(filter))
    }
}

impl Borrow<str> for Scope {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Scope {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Scope {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.0)
    }
}
