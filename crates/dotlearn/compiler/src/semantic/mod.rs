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

//! Semantic analysis
//!
//! A single depth-first traversal that names every classifier expression, computes
//! return types, validates well-formedness and builds the dependor and invoked graphs.
//! Results are kept in an [`AnalysisTable`] keyed by [`ExprId`]; the syntax tree itself
//! is never modified.

mod analyzer;
pub mod graph;
pub mod symbol_table;

pub use analyzer::SemanticAnalyzer;
pub use graph::{DependorGraph, InvokedGraph, NameGraph};
pub use symbol_table::{Symbol, SymbolError, SymbolTable};

use crate::ast::shape::{ExpressionNames, ShapePrinter};
use crate::ast::{CachePolicy, ExprId, ExpressionKind, Instantiation, SyntaxTree};
use crate::types::ClassifierReturnType;
use dotlearn_common::{Diagnostics, Position};
use dotlearn_learning::SplitStrategy;
use std::collections::{BTreeMap, HashMap};

/// What analysis computed for one classifier expression
#[derive(Debug, Clone, PartialEq)]
pub struct ExprInfo {
    pub name: String,
    pub input_type: String,
    pub return_type: Option<ClassifierReturnType>,
    pub cache: CachePolicy,
}

/// Analysis results indexed by expression id
#[derive(Debug, Clone, Default)]
pub struct AnalysisTable {
    entries: Vec<Option<ExprInfo>>,
}

impl AnalysisTable {
    pub fn new(size: usize) -> Self {
        Self { entries: vec![None; size] }
    }

    pub fn get(&self, id: ExprId) -> Option<&ExprInfo> {
        self.entries.get(id.0).and_then(Option::as_ref)
    }

    pub(crate) fn insert(&mut self, id: ExprId, info: ExprInfo) {
        if id.0 >= self.entries.len() {
            self.entries.resize(id.0 + 1, None);
        }
        self.entries[id.0] = Some(info);
    }

    pub(crate) fn update<F: FnOnce(&mut ExprInfo)>(&mut self, id: ExprId, f: F) {
        if let Some(Some(info)) = self.entries.get_mut(id.0) {
            f(info);
        }
    }
}

impl ExpressionNames for AnalysisTable {
    fn name_of(&self, id: ExprId) -> Option<&str> {
        self.get(id).map(|info| info.name.as_str())
    }
}

/// Kinds of declarations that produce a generated artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeneratorKind {
    Alias,
    Coded,
    Composite,
    Conjunction,
    Learning,
    InferenceInvocation,
    Constraint,
    Inference,
}

impl GeneratorKind {
    pub fn of(kind: &ExpressionKind) -> Self {
        match kind {
            ExpressionKind::Name { .. } => GeneratorKind::Alias,
            ExpressionKind::Coded { .. } => GeneratorKind::Coded,
            ExpressionKind::Composite { .. } => GeneratorKind::Composite,
            ExpressionKind::Conjunction { .. } => GeneratorKind::Conjunction,
            ExpressionKind::Learning(_) => GeneratorKind::Learning,
            ExpressionKind::InferenceInvocation { .. } => GeneratorKind::InferenceInvocation,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            GeneratorKind::Alias => "alias",
            GeneratorKind::Coded => "coded classifier",
            GeneratorKind::Composite => "composite generator",
            GeneratorKind::Conjunction => "conjunction",
            GeneratorKind::Learning => "learner",
            GeneratorKind::InferenceInvocation => "inference invocation",
            GeneratorKind::Constraint => "constraint",
            GeneratorKind::Inference => "inference",
        }
    }
}

/// Where a code generator's definition lives in the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Index into [`SyntaxTree::declarations`]
    Declaration(usize),
    /// Anonymous sub-expression
    Expression(ExprId),
}

/// A declaration or anonymous sub-expression that gets its own artifact
#[derive(Debug, Clone, PartialEq)]
pub struct CodeGenerator {
    pub name: String,
    pub kind: GeneratorKind,
    pub origin: Origin,
    pub position: Position,
    /// Order of discovery during the traversal; earlier declarations come first
    pub order: usize,
    pub input_type: Option<String>,
    pub return_type: Option<ClassifierReturnType>,
}

/// Cross-validation settings after parsing and default substitution
#[derive(Debug, Clone, PartialEq)]
pub struct CrossValidationSpec {
    pub folds: usize,
    pub strategy: SplitStrategy,
    pub alpha: f64,
    pub metric: Instantiation,
}

/// Everything the training scheduler needs to know about a learning expression
#[derive(Debug, Clone, PartialEq)]
pub struct LearningSpec {
    pub name: String,
    pub expression: ExprId,
    pub order: usize,
    pub return_type: ClassifierReturnType,
    pub input_type: String,
    pub extractor: Option<String>,
    pub labeler: Option<String>,
    pub learner: Instantiation,
    pub parser: Option<Instantiation>,
    pub rounds: usize,
    pub evaluate: Option<String>,
    pub cross_validation: Option<CrossValidationSpec>,
    pub pre_extract: Option<bool>,
    pub progress_interval: Option<usize>,
}

/// Output of semantic analysis, read-only for every later pass
#[derive(Debug)]
pub struct Analysis {
    pub base_name: String,
    pub table: AnalysisTable,
    /// Code generators in traversal order
    pub generators: Vec<CodeGenerator>,
    pub learning: BTreeMap<String, LearningSpec>,
    pub inference_algorithms: BTreeMap<String, Instantiation>,
    pub dependor: DependorGraph,
    pub invoked: InvokedGraph,
    pub diagnostics: Diagnostics,
    generator_index: HashMap<String, usize>,
}

impl Analysis {
    pub fn generator(&self, name: &str) -> Option<&CodeGenerator> {
        self.generator_index.get(name).and_then(|&i| self.generators.get(i))
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }

    /// Canonical shape of a code generator, the source of its fingerprint
    pub fn shape_of(&self, tree: &SyntaxTree, generator: &CodeGenerator) -> String {
        let printer = ShapePrinter::new(tree, &self.table);
        match generator.origin {
            Origin::Declaration(index) => match tree.declarations.get(index) {
                Some(declaration) => printer.declaration(declaration),
                None => format!("<missing declaration {index}>"),
            },
            Origin::Expression(id) => printer.anonymous(
                &generator.name,
                id,
                generator.return_type.as_ref(),
                generator.input_type.as_deref().unwrap_or_default(),
            ),
        }
    }
}
