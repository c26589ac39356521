//! Engine configuration.
//!
//! Loaded from JSON; every field is optional:
//!
//! ```json
//! {
//!   "seeds": [{ "name": "Iz", "bias": [1, 0, 0, 0] }],
//!   "refinement": { "epsilon": 0.001, "max_updates_per_node": 64 },
//!   "top_k": 10,
//!   "reference_year": 2025,
//!   "delimiter": ";"
//! }
//! ```

use std::path::Path;

use chrono::Datelike;
use serde::{Deserialize, Serialize};

use crate::algo::Refinement;
use crate::model::Bias;
use crate::storage::FollowGraph;
use crate::{Error, Result};

/// A user whose bias is an input rather than an output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedPreset {
    pub name: String,
    pub bias: Bias,
}

impl SeedPreset {
    pub fn new(name: impl Into<String>, bias: impl Into<Bias>) -> Self {
        Self { name: name.into(), bias: bias.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub seeds: Vec<SeedPreset>,
    /// Worklist refinement after the acyclic pass; off when absent.
    pub refinement: Option<Refinement>,
    /// Size of the influential / influenceable rankings.
    pub top_k: usize,
    /// Year that account creation dates are measured against.
    pub reference_year: i32,
    /// Field separator of the input files.
    pub delimiter: char,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seeds: default_seeds(),
            refinement: None,
            top_k: 10,
            reference_year: chrono::Utc::now().year(),
            delimiter: ';',
        }
    }
}

/// Presets for the bundled test datasets and the Chilean media dataset.
pub fn default_seeds() -> Vec<SeedPreset> {
    vec![
        SeedPreset::new("Iz", [1.0, 0.0, 0.0, 0.0]),
        SeedPreset::new("De", [0.0, 1.0, 0.0, 0.0]),
        SeedPreset::new("Ce", [0.0, 0.0, 1.0, 0.0]),
        SeedPreset::new("Li", [0.0, 0.0, 0.0, 1.0]),
        SeedPreset::new("latercera", [0.0, 0.0, 1.0, 0.0]),
        SeedPreset::new("elmostrador", [0.0, 0.0, 0.0, 1.0]),
        SeedPreset::new("Cooperativa", [1.0, 0.0, 0.0, 0.0]),
        SeedPreset::new("soyvaldiviacl", [0.0, 1.0, 0.0, 0.0]),
    ]
}

impl EngineConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        for seed in &self.seeds {
            if !seed.bias.is_normalized() {
                return Err(Error::Config(format!(
                    "seed '{}' bias must be non-negative and sum to 1, got {:?}",
                    seed.name,
                    seed.bias.weights()
                )));
            }
        }
        if let Some(refinement) = &self.refinement {
            if !(refinement.epsilon >= 0.0 && refinement.epsilon.is_finite()) {
                return Err(Error::Config(format!(
                    "refinement epsilon must be a finite non-negative number, got {}",
                    refinement.epsilon
                )));
            }
        }
        if self.delimiter == '"' || self.delimiter == '\n' {
            return Err(Error::Config(format!("unusable delimiter {:?}", self.delimiter)));
        }
        Ok(())
    }

    pub fn seed_names(&self) -> Vec<&str> {
        self.seeds.iter().map(|seed| seed.name.as_str()).collect()
    }

    /// Pin every preset present in `graph`; absent names are skipped.
    /// Returns how many were applied.
    pub fn apply_seeds(&self, graph: &mut FollowGraph) -> Result<usize> {
        let mut applied = 0;
        for seed in &self.seeds {
            if !graph.contains(&seed.name) {
                tracing::debug!(seed = %seed.name, "seed not in graph, skipped");
                continue;
            }
            graph.set_bias(&seed.name, seed.bias)?;
            applied += 1;
        }
        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Category, User};

    #[test]
    fn test_defaults_from_empty_object() {
        let config = EngineConfig::from_json_str("{}").unwrap();
        assert_eq!(config.seeds.len(), 8);
        assert_eq!(config.top_k, 10);
        assert_eq!(config.delimiter, ';');
        assert!(config.refinement.is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let config = EngineConfig::from_json_str(
            r#"{
                "seeds": [{ "name": "S", "bias": [0.5, 0.5, 0, 0] }],
                "refinement": { "epsilon": 0.01 },
                "top_k": 3,
                "reference_year": 2020,
                "delimiter": ","
            }"#,
        )
        .unwrap();

        assert_eq!(config.seed_names(), vec!["S"]);
        assert_eq!(config.refinement.as_ref().unwrap().epsilon, 0.01);
        assert_eq!(config.refinement.as_ref().unwrap().max_updates_per_node, 64);
        assert_eq!(config.reference_year, 2020);
        assert_eq!(config.delimiter, ',');
    }

    #[test]
    fn test_rejects_bad_seed_bias() {
        let err = EngineConfig::from_json_str(r#"{ "seeds": [{ "name": "S", "bias": [1, 1, 0, 0] }] }"#)
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(EngineConfig::from_json_str("{ seeds"), Err(Error::Json(_))));
    }

    #[test]
    fn test_apply_seeds_skips_unknown() {
        let mut graph = FollowGraph::new();
        graph.add_user(User::new("Iz")).unwrap();
        graph.add_user(User::new("other")).unwrap();

        let applied = EngineConfig::default().apply_seeds(&mut graph).unwrap();

        assert_eq!(applied, 1);
        assert_eq!(graph.user_by_name("Iz").unwrap().bias, Bias::pinned(Category::Left));
        assert_eq!(graph.user_by_name("other").unwrap().bias, Bias::uniform());
    }
}
