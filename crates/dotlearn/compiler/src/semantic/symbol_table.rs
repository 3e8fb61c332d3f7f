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

//! Nested lexical scopes
//!
//! Scope 0 is the global scope holding top-level declarations. Coded bodies,
//! blocks, loops and quantifiers push local scopes on top of it.

use crate::types::ClassifierReturnType;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// What a name refers to
#[derive(Debug, Clone, PartialEq)]
pub enum Symbol {
    Classifier {
        return_type: ClassifierReturnType,
        input_type: String,
        learner: bool,
    },
    Constraint {
        input_type: String,
    },
    Inference {
        head_type: String,
    },
    Variable {
        type_name: String,
    },
}

impl Symbol {
    pub fn describe(&self) -> &'static str {
        match self {
            Symbol::Classifier { learner: true, .. } => "learner",
            Symbol::Classifier { .. } => "classifier",
            Symbol::Constraint { .. } => "constraint",
            Symbol::Inference { .. } => "inference",
            Symbol::Variable { .. } => "variable",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SymbolError {
    #[error("`{0}` is already declared")]
    DuplicateDeclaration(String),

    #[error("Cannot resolve `{0}`")]
    UnresolvedName(String),
}

/// Stack of scopes with the global scope at the bottom
#[derive(Debug, Clone)]
pub struct SymbolTable {
    scopes: Vec<HashMap<String, Symbol>>,
    reported: HashSet<String>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            scopes: vec![HashMap::new()],
            reported: HashSet::new(),
        }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    /// Pop the innermost local scope; the global scope is never popped
    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Declare a name in the innermost scope
    ///
    /// Redeclaring in the same scope fails. Shadowing a name of an outer scope is allowed.
    pub fn declare(&mut self, name: &str, symbol: Symbol) -> Result<(), SymbolError> {
        let scope = self.scopes.last_mut().ok_or_else(|| SymbolError::UnresolvedName(name.to_string()))?;
        if scope.contains_key(name) {
            return Err(SymbolError::DuplicateDeclaration(name.to_string()));
        }
        scope.insert(name.to_string(), symbol);
        Ok(())
    }

    /// Look a name up from the innermost scope outward
    pub fn resolve(&self, name: &str) -> Result<&Symbol, SymbolError> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .ok_or_else(|| SymbolError::UnresolvedName(name.to_string()))
    }

    /// Look a name up, reporting a failure for each name only once
    ///
    /// Returns `Ok(None)` when resolution failed before and was already reported;
    /// callers skip further checks in that case.
    pub fn resolve_once(&mut self, name: &str) -> Result<Option<Symbol>, SymbolError> {
        match self.resolve(name) {
            Ok(symbol) => Ok(Some(symbol.clone())),
            Err(error) => {
                if self.reported.insert(name.to_string()) {
                    Err(error)
                } else {
                    Ok(None)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variable(type_name: &str) -> Symbol {
        Symbol::Variable { type_name: type_name.to_string() }
    }

    #[test]
    fn test_duplicate_global_declaration() {
        let mut table = SymbolTable::new();
        table.declare("Tagger", Symbol::Constraint { input_type: "Sentence".into() }).unwrap();
        assert_eq!(
            table.declare("Tagger", Symbol::Constraint { input_type: "Sentence".into() }),
            Err(SymbolError::DuplicateDeclaration("Tagger".into()))
        );
    }

    #[test]
    fn test_local_shadowing_is_allowed() {
        let mut table = SymbolTable::new();
        table.declare("w", variable("Word")).unwrap();
        table.push_scope();
        table.declare("w", variable("String")).unwrap();
        assert_eq!(table.resolve("w"), Ok(&variable("String")));
        table.pop_scope();
        assert_eq!(table.resolve("w"), Ok(&variable("Word")));
    }

    #[test]
    fn test_resolve_walks_outward() {
        let mut table = SymbolTable::new();
        table.declare("Tagger", Symbol::Inference { head_type: "Sentence".into() }).unwrap();
        table.push_scope();
        table.push_scope();
        assert!(table.resolve("Tagger").is_ok());
        assert_eq!(table.resolve("missing"), Err(SymbolError::UnresolvedName("missing".into())));
    }

    #[test]
    fn test_unresolved_name_reported_once() {
        let mut table = SymbolTable::new();
        assert!(table.resolve_once("Ghost").is_err());
        assert_eq!(table.resolve_once("Ghost"), Ok(None));
    }

    #[test]
    fn test_global_scope_is_never_popped() {
        let mut table = SymbolTable::new();
        table.pop_scope();
        assert_eq!(table.depth(), 1);
    }
}
