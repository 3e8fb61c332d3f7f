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

//! `dotlearn compile`

use super::{Status, ToolError, load_config, read_tree};
use clap::Args;
use dotlearn_compiler::{Compiler, CompilerConfig, RevisionStatus};
use std::path::PathBuf;
use tracing::{error, info};

/// Arguments of the compile command
#[derive(Args, Debug, Clone)]
pub struct CompileArgs {
    /// Syntax tree serialized as JSON
    pub tree: PathBuf,

    /// TOML configuration file; flags override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory for generated artifacts
    #[arg(long)]
    pub generated_dir: Option<PathBuf>,

    /// Directory for learned state, lexicons and pre-extracted examples
    #[arg(long)]
    pub model_dir: Option<PathBuf>,

    /// Train independent learners in parallel
    #[arg(long)]
    pub concurrent: bool,

    /// Maximum number of learners trained at once
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Pre-extract feature vectors before training
    #[arg(long)]
    pub pre_extract: bool,
}

impl CompileArgs {
    /// The file configuration with command-line flags layered on top
    pub fn config(&self) -> Result<CompilerConfig, ToolError> {
        let mut config = load_config(self.config.as_deref())?;
        if let Some(dir) = &self.generated_dir {
            config = config.with_generated_dir(dir);
        }
        if let Some(dir) = &self.model_dir {
            config = config.with_model_dir(dir);
        }
        if self.concurrent {
            config = config.with_concurrent_training(true);
        }
        if let Some(jobs) = self.jobs {
            config = config.with_max_parallel_jobs(jobs);
        }
        if self.pre_extract {
            config = config.with_pre_extract(true);
        }
        config.validate()?;
        Ok(config)
    }
}

/// Run every pass; fails iff a fatal error was recorded
pub fn run_compile(args: &CompileArgs) -> Result<Status, ToolError> {
    let config = args.config()?;
    let tree = read_tree(&args.tree)?;
    info!(tree = %args.tree.display(), generated_dir = %config.generated_dir.display(), "compiling");

    let outcome = Compiler::new(config).compile(&tree);

    if let Some(revision) = &outcome.revision {
        info!(
            revised = revision.count(RevisionStatus::Revised),
            affected = revision.count(RevisionStatus::Affected),
            "revision summary"
        );
    }
    if let Some(training) = &outcome.training {
        for trained in &training.trained {
            match &trained.cross_validation {
                Some(report) => info!(name = %trained.name, examples = trained.examples, "{report}"),
                None => info!(name = %trained.name, examples = trained.examples, "trained"),
            }
        }
    }
    info!(
        emitted = outcome.emitted.len(),
        errors = outcome.error_count(),
        warnings = outcome.warning_count(),
        "compilation finished"
    );

    if outcome.fatal {
        error!("compilation failed");
        return Ok(Status::Failed);
    }
    Ok(Status::Success)
}
