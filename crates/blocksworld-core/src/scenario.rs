//! The scenario registry (C5): named immutable initial states + rule
//! variant + goal, loaded from a directory of `*.json` files at startup.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::action::{PlanStep, StackConfig};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioInitialState {
    pub stacks: StackConfig,
    #[serde(default)]
    pub holding: Option<char>,
    #[serde(default)]
    pub robot_status: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScenarioGoal {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub target_configurations: Vec<Vec<char>>,
}

/// `{ id, name, description, initial_state, goal, constraint_set_name,
/// optimal_plan }`, immutable after load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub initial_state: ScenarioInitialState,
    #[serde(default)]
    pub goal: ScenarioGoal,
    pub constraint_set: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
    #[serde(default)]
    pub optimal_plan: Option<Vec<PlanStep>>,
}

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("failed to read scenario directory {0}: {1}")]
    ReadDir(PathBuf, std::io::Error),
    #[error("failed to read scenario file {0}: {1}")]
    ReadFile(PathBuf, std::io::Error),
    #[error("failed to parse scenario file {0}: {1}")]
    Parse(PathBuf, serde_json::Error),
}

/// Read-only after initialisation and shareable without synchronisation, per
/// §5. Lookup is O(number of scenarios); duplicate names resolve
/// last-load-wins, matching the reference implementation's
/// clear-then-reload-into-a-name-keyed-map behavior (§9, resolved in
/// DESIGN.md).
#[derive(Debug, Default, Clone)]
pub struct ScenarioRegistry {
    by_name: HashMap<String, Scenario>,
}

impl ScenarioRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// A full-directory reload: clears any previously loaded scenarios and
    /// loads every `*.json` file found directly inside `dir`.
    pub fn load_dir(dir: &Path) -> Result<Self, ScenarioError> {
        let mut by_name = HashMap::new();

        let entries = std::fs::read_dir(dir)
            .map_err(|e| ScenarioError::ReadDir(dir.to_path_buf(), e))?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("json"))
            .collect();
        paths.sort();

        for path in paths {
            let content = std::fs::read_to_string(&path)
                .map_err(|e| ScenarioError::ReadFile(path.clone(), e))?;
            let scenario: Scenario = serde_json::from_str(&content)
                .map_err(|e| ScenarioError::Parse(path.clone(), e))?;
            by_name.insert(scenario.name.clone(), scenario);
        }

        Ok(Self { by_name })
    }

    pub fn get_by_id_or_name(&self, key: &str) -> Option<&Scenario> {
        self.by_name
            .values()
            .find(|s| s.id == key)
            .or_else(|| self.by_name.get(key))
    }

    pub fn exists(&self, key: &str) -> bool {
        self.get_by_id_or_name(key).is_some()
    }

    pub fn list(&self) -> impl Iterator<Item = &Scenario> {
        self.by_name.values()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_scenario(dir: &Path, file_name: &str, id: &str, name: &str) {
        let body = serde_json::json!({
            "id": id,
            "name": name,
            "description": "",
            "initial_state": { "stacks": [["A"], [], []] },
            "goal": {},
            "constraint_set": "base",
        });
        fs::write(dir.join(file_name), serde_json::to_string_pretty(&body).unwrap())
            .expect("failed to write fixture scenario file");
    }

    #[test]
    fn loads_every_json_file_in_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        write_scenario(dir.path(), "a.json", "id-a", "alpha");
        write_scenario(dir.path(), "b.json", "id-b", "beta");
        fs::write(dir.path().join("not-a-scenario.txt"), "ignored").unwrap();

        let registry = ScenarioRegistry::load_dir(dir.path()).unwrap();
        assert_eq!(registry.len(), 2);
        assert!(registry.exists("alpha"));
        assert!(registry.exists("id-b"));
        assert!(!registry.exists("not-a-scenario"));
    }

    #[test]
    fn duplicate_names_resolve_last_load_wins() {
        let dir = tempfile::tempdir().unwrap();
        // Sorted load order (§4.6): "a.json" loads before "b.json", so the
        // second file's id wins for the shared name "dup".
        write_scenario(dir.path(), "a.json", "first", "dup");
        write_scenario(dir.path(), "b.json", "second", "dup");

        let registry = ScenarioRegistry::load_dir(dir.path()).unwrap();
        assert_eq!(registry.len(), 1);
        let scenario = registry.get_by_id_or_name("dup").unwrap();
        assert_eq!(scenario.id, "second");
    }

    #[test]
    fn get_by_id_or_name_checks_id_before_name() {
        let dir = tempfile::tempdir().unwrap();
        write_scenario(dir.path(), "a.json", "the-id", "the-name");

        let registry = ScenarioRegistry::load_dir(dir.path()).unwrap();
        assert_eq!(registry.get_by_id_or_name("the-id").unwrap().name, "the-name");
        assert_eq!(registry.get_by_id_or_name("the-name").unwrap().id, "the-id");
        assert!(registry.get_by_id_or_name("missing").is_none());
    }

    #[test]
    fn reload_clears_previous_entries() {
        let dir = tempfile::tempdir().unwrap();
        write_scenario(dir.path(), "a.json", "id-a", "alpha");
        let first = ScenarioRegistry::load_dir(dir.path()).unwrap();
        assert_eq!(first.len(), 1);

        fs::remove_file(dir.path().join("a.json")).unwrap();
        write_scenario(dir.path(), "b.json", "id-b", "beta");
        let second = ScenarioRegistry::load_dir(dir.path()).unwrap();
        assert_eq!(second.len(), 1);
        assert!(!second.exists("alpha"));
        assert!(second.exists("beta"));
    }
}
