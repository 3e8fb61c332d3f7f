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

//! Error types for learning components

use crate::registry::ComponentKind;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while instantiating or running learning components
#[derive(Error, Debug)]
pub enum LearningError {
    #[error("No {expected} named `{name}` is registered")]
    ClassNotFound { name: String, expected: ComponentKind },

    #[error("`{name}` is a {actual}, not a {expected}")]
    NotASubtype { name: String, expected: ComponentKind, actual: ComponentKind },

    #[error("Failed to instantiate `{name}`: {reason}")]
    InstantiationFailed { name: String, reason: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl LearningError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LearningError::Io { path: path.into(), source }
    }
}

/// Result type for learning operations
pub type LearningResult<T> = Result<T, LearningError>;
