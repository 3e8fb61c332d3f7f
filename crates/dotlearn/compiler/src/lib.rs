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

//! Middle-end of the dotlearn classifier specification compiler
//!
//! The compiler consumes a syntax tree produced by an external front-end and runs
//! three passes over it:
//! - semantic analysis ([`semantic`]): names, return types, well-formedness checks,
//!   and the dependor and invoked graphs over declaration names
//! - revision analysis ([`revision`]): per declaration, compares the fingerprint
//!   recorded in the previously generated artifact against the current one
//! - training ([`training`]): schedules the learners that need (re)training over a
//!   dependency DAG and writes fresh artifacts carrying the new fingerprints
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use dotlearn_compiler::{Compiler, CompilerConfig, ast::SyntaxTree};
//!
//! let tree: SyntaxTree = serde_json::from_str(&std::fs::read_to_string("tagger.json").unwrap()).unwrap();
//! let compiler = Compiler::new(CompilerConfig::new().with_generated_dir("gen"));
//! let outcome = compiler.compile(&tree);
//! std::process::exit(if outcome.fatal { 1 } else { 0 });
//! ```

pub mod ast;
pub mod config;
pub mod emit;
pub mod error;
pub mod pipeline;
pub mod revision;
pub mod semantic;
pub mod training;
pub mod types;

pub use config::CompilerConfig;
pub use error::{CompileError, CompileResult};
pub use pipeline::{CompileOutcome, Compiler};
pub use revision::{RevisionAnalyzer, RevisionResult, RevisionStatus};
pub use semantic::{Analysis, SemanticAnalyzer};
pub use training::{TrainingReport, TrainingScheduler};
pub use types::{ClassifierReturnType, TypeTag};
