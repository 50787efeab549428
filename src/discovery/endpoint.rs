use std::collections::BTreeMap;
use std::fmt;

/// Description of a remote endpoint found in the coordination store.
///
/// The registry treats it as an opaque payload; the filter matcher and
/// subscribers interpret the properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointDescription {
    /// Unique endpoint id (usually the endpoint address)
    pub id: String,
    /// Interfaces exported by the endpoint
    pub interfaces: Vec<String>,
    /// Framework that exported the endpoint, if known
    pub framework_uuid: Option<String>,
    /// Remaining endpoint properties
    pub properties: BTreeMap<String, String>,
}

impl EndpointDescription {
    pub fn new(
        id: impl Into<String>,
        interfaces: Vec<String>,
    ) -> Self {
        Self {
            id: id.into(),
            interfaces,
            framework_uuid: None,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_framework_uuid(
        mut self,
        uuid: impl Into<String>,
    ) -> Self {
        self.framework_uuid = Some(uuid.into());
        self
    }

    pub fn with_property(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn property(
        &self,
        key: &str,
    ) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn exports(
        &self,
        interface: &str,
    ) -> bool {
        self.interfaces.iter().any(|i| i == interface)
    }
}

impl fmt::Display for EndpointDescription {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{} {:?}", self.id, self.interfaces)
    }
}

/// Kind of change reported by a scope watch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointEvent {
    Added,
    Removed,
}

impl EndpointEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointEvent::Added => "added",
            EndpointEvent::Removed => "removed",
        }
    }
}
