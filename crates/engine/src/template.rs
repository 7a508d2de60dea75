// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Placeholder expansion for agent directories and setup commands.
//!
//! Supported placeholders: `${agent}`, `${rig}`, `${city.root}`,
//! `${city.name}` and `${work_dir}`. Expansion fails open: if any
//! placeholder is unknown or a `${` is left unterminated, the input is
//! returned untouched.

use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

/// Regex pattern for ${variable_name} or ${namespace.variable_name}
// Allow expect here as the regex is compile-time verified to be valid
#[allow(clippy::expect_used)]
static VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([a-zA-Z_][a-zA-Z0-9_]*(?:\.[a-zA-Z_][a-zA-Z0-9_-]*)*)\}")
        .expect("constant regex pattern is valid")
});

/// Values available to a template.
#[derive(Debug, Clone, Default)]
pub struct TemplateVars {
    vars: HashMap<&'static str, String>,
}

impl TemplateVars {
    pub fn new(agent: &str, rig: Option<&str>, city_root: &Path, city_name: &str) -> Self {
        let mut vars = HashMap::new();
        vars.insert("agent", agent.to_string());
        vars.insert("rig", rig.unwrap_or_default().to_string());
        vars.insert("city.root", city_root.display().to_string());
        vars.insert("city.name", city_name.to_string());
        Self { vars }
    }

    pub fn with_work_dir(mut self, work_dir: &Path) -> Self {
        self.vars.insert("work_dir", work_dir.display().to_string());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }
}

/// Expand placeholders in `template`, or return it verbatim if it cannot be
/// fully resolved.
pub fn expand(template: &str, vars: &TemplateVars) -> String {
    let opened = template.matches("${").count();
    if opened == 0 {
        return template.to_string();
    }

    let mut resolved = 0;
    let mut unresolved = false;
    let result = VAR_PATTERN
        .replace_all(template, |caps: &regex::Captures| match vars.get(&caps[1]) {
            Some(value) => {
                resolved += 1;
                value.to_string()
            }
            None => {
                unresolved = true;
                caps[0].to_string()
            }
        })
        .into_owned();

    if unresolved || resolved != opened {
        tracing::debug!(template, "template left unexpanded");
        return template.to_string();
    }
    result
}

#[cfg(test)]
#[path = "template_tests.rs"]
mod tests;
