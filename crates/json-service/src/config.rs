//! Dispatcher configuration

use serde::{Deserialize, Serialize};

use crate::naming::NamingPolicy;

/// Options controlling how the dispatcher shapes its output.
///
/// Deserializable so hosts can embed it in their own configuration files;
/// missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Report malformed JSON as `-32700 Parse error` instead of `-32600 Invalid Request`
    pub strict_parse_errors: bool,
    /// Wrap successful results in `{"jsonrpc":"2.0","result":...,"id":...}`
    pub wrap_results: bool,
    /// Attach the URL-encoded diagnostic trace to internal errors
    pub include_diagnostics: bool,
    /// Naming policy for result keys and named parameters
    pub naming: NamingPolicy,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            strict_parse_errors: false,
            wrap_results: false,
            include_diagnostics: true,
            naming: NamingPolicy::Accessor,
        }
    }
}

impl DispatcherConfig {
    pub fn with_strict_parse_errors(mut self, strict: bool) -> Self {
        self.strict_parse_errors = strict;
        self
    }

    pub fn with_wrapped_results(mut self, wrap: bool) -> Self {
        self.wrap_results = wrap;
        self
    }

    pub fn with_diagnostics(mut self, include: bool) -> Self {
        self.include_diagnostics = include;
        self
    }

    pub fn with_naming(mut self, naming: NamingPolicy) -> Self {
        self.naming = naming;
        self
    }
}
