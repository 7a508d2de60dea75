// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `city.toml` loading.
//!
//! The file is read fresh every tick, validated, and turned into the
//! domain types the engine consumes. Relative paths are taken from the
//! city root.

use gc_adapters::Formula;
use gc_core::{
    parse_duration, qualified_name, session_name, validate_name, AgentSpec, Automation,
    AutomationAction, Gate, Isolation, NameError, PoolSpec, MAX_POOL_SIZE,
};
use gc_engine::{instance_name, RigRef};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config file name under the city root.
pub const CITY_FILE: &str = "city.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error(transparent)]
    Name(#[from] NameError),
    #[error("{0}")]
    Invalid(String),
}

fn invalid(msg: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(msg.into())
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CityFile {
    #[serde(default)]
    city: CitySection,
    #[serde(default)]
    rigs: Vec<RigSection>,
    #[serde(default)]
    agents: Vec<AgentSection>,
    #[serde(default)]
    automations: Vec<AutomationSection>,
    #[serde(default)]
    formulas: Vec<Formula>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct CitySection {
    name: Option<String>,
    #[serde(default)]
    suspended: bool,
    session_template: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RigSection {
    name: String,
    path: PathBuf,
    #[serde(default)]
    suspended: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PoolSection {
    #[serde(default)]
    min: u32,
    max: u32,
    check: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AgentSection {
    name: String,
    rig: Option<String>,
    command: String,
    dir: Option<String>,
    #[serde(default)]
    env: BTreeMap<String, String>,
    #[serde(default)]
    suspended: bool,
    #[serde(default)]
    isolation: Isolation,
    #[serde(default)]
    session_setup: Vec<String>,
    session_template: Option<String>,
    pool: Option<PoolSection>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum GateKind {
    Cooldown,
    Condition,
    Manual,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct AutomationSection {
    name: String,
    rig: Option<String>,
    gate: GateKind,
    interval: Option<String>,
    check: Option<String>,
    formula: Option<String>,
    exec: Option<String>,
    pool: Option<String>,
    timeout: Option<String>,
    source_dir: Option<PathBuf>,
    /// City-level only: instantiate once per rig. A rig-level automation of
    /// the same name replaces the copy for that rig.
    #[serde(default)]
    per_rig: bool,
}

/// Validated city configuration.
#[derive(Debug, Clone)]
pub struct CityConfig {
    pub name: String,
    pub root: PathBuf,
    pub rigs: Vec<RigRef>,
    pub agents: Vec<AgentSpec>,
    pub automations: Vec<Automation>,
    pub formulas: Vec<Formula>,
}

/// Load `<city_root>/city.toml`.
pub fn load(city_root: &Path) -> Result<CityConfig, ConfigError> {
    let path = city_root.join(CITY_FILE);
    let text = std::fs::read_to_string(&path)
        .map_err(|source| ConfigError::Read { path: path.clone(), source })?;
    parse(city_root, &text).map_err(|e| match e {
        ConfigError::Parse { source, .. } => ConfigError::Parse { path, source },
        other => other,
    })
}

/// Parse and validate config text for the city at `city_root`.
pub fn parse(city_root: &Path, text: &str) -> Result<CityConfig, ConfigError> {
    let file: CityFile = toml::from_str(text)
        .map_err(|source| ConfigError::Parse { path: PathBuf::from(CITY_FILE), source })?;

    let name = match &file.city.name {
        Some(name) => name.clone(),
        None => city_root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| invalid("city name is not set and cannot be derived from the root"))?,
    };
    if name.trim().is_empty() || name.contains('/') {
        return Err(invalid(format!("invalid city name '{name}'")));
    }

    let mut rigs = Vec::new();
    for rig in &file.rigs {
        validate_name("rig", &rig.name)?;
        if rigs.iter().any(|r: &RigRef| r.name == rig.name) {
            return Err(invalid(format!("duplicate rig '{}'", rig.name)));
        }
        rigs.push(RigRef::new(&rig.name, resolve(city_root, &rig.path)));
    }

    let mut agents = Vec::new();
    let mut seen = HashSet::new();
    for section in &file.agents {
        let agent = build_agent(section, &file, &rigs)?;
        if !seen.insert(agent.qualified_name()) {
            return Err(invalid(format!("duplicate agent '{}'", agent.qualified_name())));
        }
        agents.push(agent);
    }
    check_session_names(&name, &agents)?;

    let automations = build_automations(city_root, &file.automations, &rigs)?;

    Ok(CityConfig {
        name,
        root: city_root.to_path_buf(),
        rigs,
        agents,
        automations,
        formulas: file.formulas,
    })
}

fn resolve(city_root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        city_root.join(path)
    }
}

fn find_rig<'a>(rigs: &'a [RigRef], name: &str) -> Result<&'a RigRef, ConfigError> {
    rigs.iter().find(|r| r.name == name).ok_or_else(|| invalid(format!("unknown rig '{name}'")))
}

fn build_agent(
    section: &AgentSection,
    file: &CityFile,
    rigs: &[RigRef],
) -> Result<AgentSpec, ConfigError> {
    validate_name("agent", &section.name)?;
    if section.command.trim().is_empty() {
        return Err(invalid(format!("agent '{}' has no command", section.name)));
    }

    let mut suspended = section.suspended || file.city.suspended;
    let mut work_dir = section.dir.clone().unwrap_or_default();
    if let Some(rig_name) = &section.rig {
        let rig = find_rig(rigs, rig_name)?;
        suspended |= file.rigs.iter().any(|r| &r.name == rig_name && r.suspended);
        if work_dir.is_empty() {
            work_dir = rig.path.display().to_string();
        }
    }

    let mut agent = AgentSpec::new(&section.name, &section.command)
        .work_dir(work_dir)
        .env(section.env.clone())
        .suspended(suspended)
        .isolation(section.isolation)
        .session_setup(section.session_setup.clone());
    if let Some(rig) = &section.rig {
        agent = agent.rig(rig);
    }
    if let Some(template) = section.session_template.as_ref().or(file.city.session_template.as_ref()) {
        agent = agent.session_template(template);
    }
    if let Some(pool) = &section.pool {
        if pool.min > pool.max {
            return Err(invalid(format!(
                "agent '{}': pool min {} exceeds max {}",
                section.name, pool.min, pool.max
            )));
        }
        if pool.max > MAX_POOL_SIZE {
            return Err(invalid(format!(
                "agent '{}': pool max {} exceeds the limit of {MAX_POOL_SIZE}",
                section.name, pool.max
            )));
        }
        agent = agent.pool(PoolSpec::new(pool.min, pool.max, &pool.check));
    }
    Ok(agent)
}

/// Every instance an agent can ever materialize must own its session
/// name, pool instances `name-1..=max` included.
fn check_session_names(city: &str, agents: &[AgentSpec]) -> Result<(), ConfigError> {
    let mut owners: HashMap<String, String> = HashMap::new();
    for agent in agents {
        let count = agent.pool.as_ref().map_or(1, |p| p.max);
        for index in 1..=count {
            let instance = qualified_name(agent.rig.as_deref(), &instance_name(agent, index));
            let session = session_name(city, &instance, agent.session_template.as_deref());
            if let Some(other) = owners.insert(session.as_str().to_string(), instance.clone()) {
                return Err(invalid(format!(
                    "agents '{other}' and '{instance}' would share session '{session}'"
                )));
            }
        }
    }
    Ok(())
}

fn build_automations(
    city_root: &Path,
    sections: &[AutomationSection],
    rigs: &[RigRef],
) -> Result<Vec<Automation>, ConfigError> {
    let mut automations = Vec::new();
    let mut seen = HashSet::new();

    // Rig-level definitions claim their (name, rig) slot first
    for section in sections.iter().filter(|s| s.rig.is_some()) {
        let automation = build_automation(city_root, section, rigs)?;
        if !seen.insert(automation.scoped_name()) {
            return Err(invalid(format!("duplicate automation '{}'", automation.scoped_name())));
        }
        automations.push(automation);
    }

    for section in sections.iter().filter(|s| s.rig.is_none()) {
        if !section.per_rig {
            let automation = build_automation(city_root, section, rigs)?;
            if !seen.insert(automation.scoped_name()) {
                return Err(invalid(format!("duplicate automation '{}'", automation.scoped_name())));
            }
            automations.push(automation);
            continue;
        }
        for rig in rigs {
            let mut scoped = section.clone();
            scoped.rig = Some(rig.name.clone());
            let automation = build_automation(city_root, &scoped, rigs)?;
            if seen.insert(automation.scoped_name()) {
                automations.push(automation);
            } else {
                tracing::debug!(automation = %section.name, rig = %rig.name, "overridden by rig definition");
            }
        }
    }

    Ok(automations)
}

fn build_automation(
    city_root: &Path,
    section: &AutomationSection,
    rigs: &[RigRef],
) -> Result<Automation, ConfigError> {
    validate_name("automation", &section.name)?;
    let name = &section.name;
    let duration = |field: &str, value: &str| {
        parse_duration(value).map_err(|e| invalid(format!("automation '{name}': {field}: {e}")))
    };

    let action = match (&section.formula, &section.exec) {
        (Some(formula), None) => AutomationAction::Formula { formula: formula.clone() },
        (None, Some(script)) => AutomationAction::Exec { script: script.clone() },
        _ => {
            return Err(invalid(format!(
                "automation '{name}' needs exactly one of 'formula' or 'exec'"
            )))
        }
    };

    let gate = match section.gate {
        GateKind::Cooldown => {
            let interval = section.interval.as_deref().ok_or_else(|| {
                invalid(format!("automation '{name}': cooldown gate needs an interval"))
            })?;
            Gate::Cooldown { interval: duration("interval", interval)? }
        }
        GateKind::Condition => {
            let check = section.check.clone().ok_or_else(|| {
                invalid(format!("automation '{name}': condition gate needs a check"))
            })?;
            Gate::Condition { check }
        }
        GateKind::Manual => Gate::Manual,
    };

    let mut automation = Automation::new(name, gate, action);
    if let Some(rig) = &section.rig {
        find_rig(rigs, rig)?;
        automation = automation.rig(rig);
    }
    if let Some(pool) = &section.pool {
        automation = automation.pool(pool);
    }
    if let Some(timeout) = &section.timeout {
        automation = automation.timeout(duration("timeout", timeout)?);
    }
    if let Some(dir) = &section.source_dir {
        automation = automation.source_dir(resolve(city_root, dir));
    }
    Ok(automation)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
