//! Snapshot of the process environment

use std::collections::HashMap;

/// Environment variables captured once at startup.
///
/// Components receive this explicitly instead of reading `std::env`, so a
/// build is a function of its inputs and tests can supply their own values.
#[derive(Debug, Clone, Default)]
pub struct EnvVars {
    vars: HashMap<String, String>,
}

impl EnvVars {
    /// Capture the current process environment
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    /// Build from explicit key/value pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Get a variable, treating empty values as unset
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Per-key override for a site config value: `CONFIG_<KEY_UPPERCASED>`
    pub fn config_override(&self, key: &str) -> Option<&str> {
        self.get(&format!("CONFIG_{}", key.to_uppercase()))
    }
}
