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

//! Error types for the compiler passes

use dotlearn_learning::LearningError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that stop a declaration or the whole compiler run
///
/// Everything except [`CompileError::ProtectedOverwrite`] is fatal: once recorded,
/// the remaining passes do not start.
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Learning(#[from] LearningError),

    #[error("{path} does not appear to have been generated by dotlearn; refusing to overwrite it")]
    ProtectedOverwrite { path: PathBuf },

    #[error("Interrupted while waiting for training job `{0}`")]
    Interrupted(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl CompileError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CompileError::Io { path: path.into(), source }
    }

    pub fn is_fatal(&self) -> bool {
        !matches!(self, CompileError::ProtectedOverwrite { .. })
    }
}

/// Result type for compiler operations
pub type CompileResult<T> = Result<T, CompileError>;
