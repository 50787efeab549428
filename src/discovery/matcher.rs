#[cfg(test)]
use mockall::automock;

use super::EndpointDescription;
use super::Scope;

/// Evaluates whether an endpoint's properties satisfy a scope's filter.
#[cfg_attr(test, automock)]
pub trait FilterMatcher: Send + Sync + 'static {
    fn matches(
        &self,
        scope: &Scope,
        endpoint: &EndpointDescription,
    ) -> bool;
}

impl<F> FilterMatcher for F
where
    F: Fn(&Scope, &EndpointDescription) -> bool + Send + Sync + 'static,
{
    fn matches(
        &self,
        scope: &Scope,
        endpoint: &EndpointDescription,
    ) -> bool {
        self(scope, endpoint)
    }
}
