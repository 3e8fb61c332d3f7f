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

//! Registry of learning components keyed by declared class name
//!
//! Learning expressions name their learner, parser, testing metric, extractor and
//! labeler by class name. The registry maps each name to a factory closure and
//! is consulted once, when a training job is prepared.

use crate::builtin;
use crate::error::{LearningError, LearningResult};
use crate::traits::{Classifier, Learner, Parser, TestingMetric};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub type LearnerFactory = Arc<dyn Fn(&[String]) -> LearningResult<Box<dyn Learner>> + Send + Sync>;
pub type ParserFactory = Arc<dyn Fn(&[String]) -> LearningResult<Box<dyn Parser>> + Send + Sync>;
pub type MetricFactory = Arc<dyn Fn(&[String]) -> LearningResult<Arc<dyn TestingMetric>> + Send + Sync>;
pub type ClassifierFactory = Arc<dyn Fn() -> LearningResult<Arc<dyn Classifier>> + Send + Sync>;

/// The kinds of components a name may be registered as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Learner,
    Parser,
    TestingMetric,
    Classifier,
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ComponentKind::Learner => "learner",
            ComponentKind::Parser => "parser",
            ComponentKind::TestingMetric => "testing metric",
            ComponentKind::Classifier => "classifier",
        };
        f.write_str(name)
    }
}

#[derive(Clone)]
enum Component {
    Learner(LearnerFactory),
    Parser(ParserFactory),
    Metric(MetricFactory),
    Classifier(ClassifierFactory),
}

impl Component {
    fn kind(&self) -> ComponentKind {
        match self {
            Component::Learner(_) => ComponentKind::Learner,
            Component::Parser(_) => ComponentKind::Parser,
            Component::Metric(_) => ComponentKind::TestingMetric,
            Component::Classifier(_) => ComponentKind::Classifier,
        }
    }
}

/// Factory lookup for every pluggable learning component
#[derive(Clone, Default)]
pub struct ComponentRegistry {
    components: HashMap<String, Component>,
}

impl ComponentRegistry {
    /// Create a new, empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the baseline learners, parsers and metrics
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        builtin::register_builtins(&mut registry);
        registry
    }

    pub fn register_learner<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&[String]) -> LearningResult<Box<dyn Learner>> + Send + Sync + 'static,
    {
        self.components.insert(name.into(), Component::Learner(Arc::new(factory)));
    }

    pub fn register_parser<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&[String]) -> LearningResult<Box<dyn Parser>> + Send + Sync + 'static,
    {
        self.components.insert(name.into(), Component::Parser(Arc::new(factory)));
    }

    pub fn register_metric<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&[String]) -> LearningResult<Arc<dyn TestingMetric>> + Send + Sync + 'static,
    {
        self.components.insert(name.into(), Component::Metric(Arc::new(factory)));
    }

    pub fn register_classifier<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> LearningResult<Arc<dyn Classifier>> + Send + Sync + 'static,
    {
        self.components.insert(name.into(), Component::Classifier(Arc::new(factory)));
    }

    /// Check whether any component is registered under `name`
    pub fn contains(&self, name: &str) -> bool {
        self.components.contains_key(name)
    }

    /// The kind `name` is registered as, if any
    pub fn kind_of(&self, name: &str) -> Option<ComponentKind> {
        self.components.get(name).map(Component::kind)
    }

    fn lookup(&self, name: &str, expected: ComponentKind) -> LearningResult<&Component> {
        self.components.get(name).ok_or_else(|| LearningError::ClassNotFound {
            name: name.to_string(),
            expected,
        })
    }

    pub fn learner(&self, name: &str, args: &[String]) -> LearningResult<Box<dyn Learner>> {
        match self.lookup(name, ComponentKind::Learner)? {
            Component::Learner(factory) => factory(args).map_err(|e| instantiation_failed(name, e)),
            other => Err(not_a_subtype(name, ComponentKind::Learner, other)),
        }
    }

    pub fn parser(&self, name: &str, args: &[String]) -> LearningResult<Box<dyn Parser>> {
        match self.lookup(name, ComponentKind::Parser)? {
            Component::Parser(factory) => factory(args).map_err(|e| instantiation_failed(name, e)),
            other => Err(not_a_subtype(name, ComponentKind::Parser, other)),
        }
    }

    pub fn metric(&self, name: &str, args: &[String]) -> LearningResult<Arc<dyn TestingMetric>> {
        match self.lookup(name, ComponentKind::TestingMetric)? {
            Component::Metric(factory) => factory(args).map_err(|e| instantiation_failed(name, e)),
            other => Err(not_a_subtype(name, ComponentKind::TestingMetric, other)),
        }
    }

    pub fn classifier(&self, name: &str) -> LearningResult<Arc<dyn Classifier>> {
        match self.lookup(name, ComponentKind::Classifier)? {
            Component::Classifier(factory) => factory().map_err(|e| instantiation_failed(name, e)),
            other => Err(not_a_subtype(name, ComponentKind::Classifier, other)),
        }
    }
}

fn not_a_subtype(name: &str, expected: ComponentKind, actual: &Component) -> LearningError {
    LearningError::NotASubtype {
        name: name.to_string(),
        expected,
        actual: actual.kind(),
    }
}

fn instantiation_failed(name: &str, error: LearningError) -> LearningError {
    match error {
        LearningError::InstantiationFailed { .. } => error,
        other => LearningError::InstantiationFailed {
            name: name.to_string(),
            reason: other.to_string(),
        },
    }
}
