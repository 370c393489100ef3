//! Output name reservation for batch jobs
//!
//! Inputs are matched case-insensitively and sanitized, so two inputs can
//! map onto one output path. Names are claimed up front, before any parallel
//! work starts, so every job owns its output exclusively.

use std::collections::HashSet;

/// Case-insensitive registry of claimed output names, grouped by scope
/// (usually the output directory)
#[derive(Debug, Default)]
pub struct OutputNames {
    used: HashSet<String>,
}

impl OutputNames {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(scope: &str, name: &str) -> String {
        format!("{}/{}", scope, name).to_lowercase()
    }

    /// Mark a name as taken without handing it out
    pub fn reserve(&mut self, scope: &str, name: &str) {
        self.used.insert(Self::key(scope, name));
    }

    /// `base`, or `base_2`, `base_3`, ... if already claimed in `scope`
    pub fn claim(&mut self, scope: &str, base: &str) -> String {
        let mut out = base.to_string();
        let mut n = 2;
        while self.used.contains(&Self::key(scope, &out)) {
            out = format!("{}_{}", base, n);
            n += 1;
        }
        self.used.insert(Self::key(scope, &out));
        out
    }
}
