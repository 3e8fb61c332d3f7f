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

//! Command-line interface of the `dotlearn` binary

pub mod check;
pub mod compile;

use clap::{Parser, Subcommand};
use dotlearn_compiler::ast::SyntaxTree;
use dotlearn_compiler::{CompileError, CompilerConfig};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "dotlearn")]
#[command(about = "dotlearn - classifier specification compiler")]
#[command(version = "0.1.0")]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze, regenerate changed artifacts and train changed learners
    Compile(compile::CompileArgs),
    /// Run semantic analysis only
    Check(check::CheckArgs),
}

/// Errors raised before the compiler gets to run
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not a valid syntax tree: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Config(#[from] CompileError),
}

/// How a command ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Failed,
}

impl From<Status> for ExitCode {
    fn from(status: Status) -> Self {
        match status {
            Status::Success => ExitCode::SUCCESS,
            Status::Failed => ExitCode::FAILURE,
        }
    }
}

impl Cli {
    pub fn execute(self) -> Result<Status, ToolError> {
        match self.command {
            Commands::Compile(args) => compile::run_compile(&args),
            Commands::Check(args) => check::run_check(&args),
        }
    }
}

/// Install the global `tracing` subscriber
pub fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

/// Read a syntax tree serialized as JSON by the front-end
pub fn read_tree(path: &Path) -> Result<SyntaxTree, ToolError> {
    let text = fs::read_to_string(path).map_err(|source| ToolError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ToolError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Configuration from an optional TOML file, defaults otherwise
pub fn load_config(path: Option<&Path>) -> Result<CompilerConfig, ToolError> {
    match path {
        Some(path) => Ok(CompilerConfig::from_toml_file(path)?),
        None => Ok(CompilerConfig::default()),
    }
}
