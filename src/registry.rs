//! @ai:module:intent Capability and scope lookups injected into parsers
//! @ai:module:layer domain
//! @ai:module:public_api CapabilityRegistry, StaticRegistry
//! @ai:module:stateless true

use std::collections::BTreeSet;

/// @ai:intent Read-only view of the declared capabilities and authentication scopes
pub trait CapabilityRegistry {
    /// @ai:intent Check whether a capability (vendor tag) name is declared
    fn has_capability(&self, name: &str) -> bool;

    /// @ai:intent Check whether an authentication scope is declared
    fn has_scope(&self, _name: &str) -> bool {
        true
    }
}

/// @ai:intent In-memory registry, mostly used by tests and embedders
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    capabilities: BTreeSet<String>,
    scopes: BTreeSet<String>,
}

impl StaticRegistry {
    pub fn with_capabilities(capabilities: &[&str]) -> Self {
        Self {
            capabilities: capabilities.iter().map(|c| c.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn scopes(mut self, scopes: &[&str]) -> Self {
        self.scopes = scopes.iter().map(|s| s.to_string()).collect();
        self
    }
}

impl CapabilityRegistry for StaticRegistry {
    fn has_capability(&self, name: &str) -> bool {
        self.capabilities.contains(name)
    }

    /// An empty scope list accepts every scope.
    fn has_scope(&self, name: &str) -> bool {
        self.scopes.is_empty() || self.scopes.contains(name)
    }
}
