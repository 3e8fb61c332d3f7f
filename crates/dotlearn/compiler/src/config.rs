// Dotlanth
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Configuration for a compiler run

use crate::error::{CompileError, CompileResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for the compiler driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompilerConfig {
    /// Directory generated artifacts are written to and read back from
    pub generated_dir: PathBuf,
    /// Directory learned state (`.lc`) and pre-extraction files live in
    pub model_dir: PathBuf,
    /// File extension of generated artifacts
    pub artifact_extension: String,
    /// Run training jobs on a worker pool instead of one after another
    pub concurrent_training: bool,
    /// Upper bound on simultaneously running training jobs
    pub max_parallel_jobs: usize,
    /// Pre-extract features for learners that do not say otherwise
    pub pre_extract: bool,
    /// Learner used when a discrete learning expression has no `with` clause
    pub default_discrete_learner: String,
    /// Learner used when a real learning expression has no `with` clause
    pub default_real_learner: String,
    /// Algorithm used when an inference has no `with` clause
    pub default_inference_algorithm: String,
    /// Metric used for cross-validation when no `testingMetric` clause is given
    pub default_testing_metric: String,
    /// Significance level used for confidence intervals when no `alpha` clause is given
    pub default_alpha: f64,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            generated_dir: PathBuf::from("."),
            model_dir: PathBuf::from("."),
            artifact_extension: "rs".to_string(),
            concurrent_training: false,
            max_parallel_jobs: num_cpus::get(),
            pre_extract: false,
            default_discrete_learner: "MajorityVote".to_string(),
            default_real_learner: "MeanTarget".to_string(),
            default_inference_algorithm: "ExhaustiveSearch".to_string(),
            default_testing_metric: "Accuracy".to_string(),
            default_alpha: 0.05,
        }
    }
}

impl CompilerConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from a TOML file; missing keys keep their defaults
    pub fn from_toml_file(path: impl AsRef<Path>) -> CompileResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| CompileError::io(path, e))?;
        let config: Self = toml::from_str(&text).map_err(|e| CompileError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Set the directory for generated artifacts
    pub fn with_generated_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.generated_dir = dir.into();
        self
    }

    /// Set the directory for learned state and extraction files
    pub fn with_model_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.model_dir = dir.into();
        self
    }

    pub fn with_artifact_extension(mut self, extension: impl Into<String>) -> Self {
        self.artifact_extension = extension.into();
        self
    }

    /// Enable or disable concurrent training
    pub fn with_concurrent_training(mut self, enable: bool) -> Self {
        self.concurrent_training = enable;
        self
    }

    /// Set the maximum number of simultaneously running training jobs
    pub fn with_max_parallel_jobs(mut self, jobs: usize) -> Self {
        self.max_parallel_jobs = jobs;
        self
    }

    /// Enable or disable pre-extraction by default
    pub fn with_pre_extract(mut self, enable: bool) -> Self {
        self.pre_extract = enable;
        self
    }

    pub fn with_default_discrete_learner(mut self, learner: impl Into<String>) -> Self {
        self.default_discrete_learner = learner.into();
        self
    }

    pub fn with_default_real_learner(mut self, learner: impl Into<String>) -> Self {
        self.default_real_learner = learner.into();
        self
    }

    pub fn with_default_inference_algorithm(mut self, algorithm: impl Into<String>) -> Self {
        self.default_inference_algorithm = algorithm.into();
        self
    }

    pub fn with_default_testing_metric(mut self, metric: impl Into<String>) -> Self {
        self.default_testing_metric = metric.into();
        self
    }

    pub fn with_default_alpha(mut self, alpha: f64) -> Self {
        self.default_alpha = alpha;
        self
    }

    /// Reject values no run could work with
    pub fn validate(&self) -> CompileResult<()> {
        if self.max_parallel_jobs == 0 {
            return Err(CompileError::Config("max_parallel_jobs must be at least 1".to_string()));
        }
        if !(self.default_alpha > 0.0 && self.default_alpha < 1.0) {
            return Err(CompileError::Config(format!("default_alpha must lie in (0, 1), got {}", self.default_alpha)));
        }
        if self.artifact_extension.is_empty() || self.artifact_extension.contains('.') {
            return Err(CompileError::Config(format!("invalid artifact extension `{}`", self.artifact_extension)));
        }
        Ok(())
    }

    /// Path of the generated artifact for the named code generator
    pub fn artifact_path(&self, name: &str) -> PathBuf {
        self.generated_dir.join(format!("{name}.{}", self.artifact_extension))
    }

    /// Path of the learned-state file for the named learner
    pub fn model_path(&self, name: &str) -> PathBuf {
        self.model_dir.join(format!("{name}.lc"))
    }

    /// Paths of the pre-extracted example and lexicon files for the named learner
    pub fn extraction_paths(&self, name: &str) -> (PathBuf, PathBuf) {
        (self.model_dir.join(format!("{name}.ex")), self.model_dir.join(format!("{name}.lex")))
    }
}
