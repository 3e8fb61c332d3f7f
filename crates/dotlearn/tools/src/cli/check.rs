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

//! `dotlearn check`

use super::{Status, ToolError, load_config, read_tree};
use clap::Args;
use dotlearn_compiler::Compiler;
use std::path::PathBuf;
use tracing::info;

#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    /// Syntax tree serialized as JSON
    pub tree: PathBuf,

    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Semantic analysis only; fails on any error
pub fn run_check(args: &CheckArgs) -> Result<Status, ToolError> {
    let config = load_config(args.config.as_deref())?;
    let tree = read_tree(&args.tree)?;

    let mut analysis = Compiler::new(config).analyze(&tree);
    let diagnostics = analysis.diagnostics.flush();
    let errors = diagnostics.iter().filter(|d| d.severity >= dotlearn_common::Severity::Error).count();

    info!(
        declarations = tree.declarations.len(),
        generators = analysis.generators.len(),
        learners = analysis.learning.len(),
        errors,
        warnings = diagnostics.len() - errors,
        "check finished"
    );

    Ok(if errors == 0 { Status::Success } else { Status::Failed })
}
