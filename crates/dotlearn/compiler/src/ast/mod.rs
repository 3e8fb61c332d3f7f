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

//! Syntax tree consumed by the compiler passes
//!
//! The front-end lives outside this crate; trees arrive serialized as JSON. Classifier
//! expressions are stored in an arena and referenced by [`ExprId`], so analysis results
//! can be kept in a parallel table instead of being written back into the nodes.

pub mod shape;

use crate::types::ClassifierReturnType;
use dotlearn_common::Position;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Index of a classifier expression in [`SyntaxTree::expressions`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExprId(pub usize);

/// A whole source file after parsing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyntaxTree {
    /// Path of the source file the tree was parsed from
    pub source_file: String,
    pub declarations: Vec<Declaration>,
    /// Arena of every classifier expression in the file
    #[serde(default)]
    pub expressions: Vec<ClassifierExpression>,
}

impl SyntaxTree {
    pub fn new(source_file: impl Into<String>) -> Self {
        Self {
            source_file: source_file.into(),
            ..Default::default()
        }
    }

    /// File stem of the source file, used to qualify anonymous names
    pub fn base_name(&self) -> String {
        Path::new(&self.source_file)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("anonymous")
            .to_string()
    }

    pub fn expression(&self, id: ExprId) -> Option<&ClassifierExpression> {
        self.expressions.get(id.0)
    }

    /// Append an expression to the arena
    pub fn push_expression(&mut self, kind: ExpressionKind, position: Position) -> ExprId {
        self.expressions.push(ClassifierExpression {
            kind,
            position,
            name: None,
            cache: CachePolicy::default(),
        });
        ExprId(self.expressions.len() - 1)
    }

    pub fn push_declaration(&mut self, declaration: Declaration) {
        self.declarations.push(declaration);
    }
}

/// Top-level declarations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Declaration {
    Classifier(ClassifierDeclaration),
    Constraint(ConstraintDeclaration),
    Inference(InferenceDeclaration),
}

impl Declaration {
    pub fn name(&self) -> &str {
        match self {
            Declaration::Classifier(d) => &d.name,
            Declaration::Constraint(d) => &d.name,
            Declaration::Inference(d) => &d.name,
        }
    }

    pub fn position(&self) -> Position {
        match self {
            Declaration::Classifier(d) => d.position,
            Declaration::Constraint(d) => d.position,
            Declaration::Inference(d) => d.position,
        }
    }
}

/// `<type> Name(<input> <param>) <cache> <- <expression>`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierDeclaration {
    pub name: String,
    pub return_type: ClassifierReturnType,
    pub input_type: String,
    #[serde(default)]
    pub parameter: Option<String>,
    #[serde(default)]
    pub cache: CachePolicy,
    pub expression: ExprId,
    #[serde(default)]
    pub position: Position,
}

/// `constraint Name(<input> <param>) { ... }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintDeclaration {
    pub name: String,
    pub input_type: String,
    pub parameter: String,
    pub body: Vec<Statement>,
    #[serde(default)]
    pub position: Position,
}

/// `inference Name head <type> { head finders, clauses }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceDeclaration {
    pub name: String,
    pub head_type: String,
    #[serde(default)]
    pub head_finders: Vec<HeadFinder>,
    #[serde(default)]
    pub clauses: Vec<InferenceClause>,
    #[serde(default)]
    pub position: Position,
}

/// Method that locates the head object of an inference from some input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadFinder {
    pub input_type: String,
    pub parameter: String,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "clause", rename_all = "snake_case")]
pub enum InferenceClause {
    /// `subject to { ... }`
    SubjectTo { parameter: String, body: Vec<Statement> },
    /// `with <Algorithm(args)>`
    With { algorithm: Instantiation },
    /// `normalizedby <Normalizer(args)>`, optionally for one learner only
    NormalizedBy {
        #[serde(default)]
        learner: Option<String>,
        normalizer: Instantiation,
    },
}

/// Caching behavior of a classifier's generated code
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CachePolicy {
    #[default]
    Uncached,
    CachedInMap,
    CachedInField,
}

impl CachePolicy {
    pub fn keyword(self) -> Option<&'static str> {
        match self {
            CachePolicy::Uncached => None,
            CachePolicy::CachedInMap => Some("cachedinmap"),
            CachePolicy::CachedInField => Some("cached"),
        }
    }
}

/// One node of the classifier-expression algebra
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierExpression {
    pub kind: ExpressionKind,
    #[serde(default)]
    pub position: Position,
    /// Name already assigned by the front-end, if any
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub cache: CachePolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "expr", rename_all = "snake_case")]
pub enum ExpressionKind {
    /// Reference to a declared classifier
    Name { name: String },
    /// Classifier with a hand-written body
    Coded {
        #[serde(default)]
        return_type: Option<ClassifierReturnType>,
        #[serde(default)]
        parameter: Option<String>,
        body: Vec<Statement>,
    },
    /// `a, b, c`
    Composite { children: Vec<ExprId> },
    /// `a && b`
    Conjunction { left: ExprId, right: ExprId },
    Learning(LearningExpression),
    /// `Inference(Learner)`
    InferenceInvocation { inference: String, learner: String },
}

impl ExpressionKind {
    pub fn label(&self) -> &'static str {
        match self {
            ExpressionKind::Name { .. } => "name",
            ExpressionKind::Coded { .. } => "coded",
            ExpressionKind::Composite { .. } => "composite",
            ExpressionKind::Conjunction { .. } => "conjunction",
            ExpressionKind::Learning(_) => "learning",
            ExpressionKind::InferenceInvocation { .. } => "inference invocation",
        }
    }
}

/// `learn <labeler> using <extractor> with ... from ...`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LearningExpression {
    #[serde(default)]
    pub labeler: Option<ExprId>,
    #[serde(default)]
    pub clauses: Vec<LearningClause>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "clause", rename_all = "snake_case")]
pub enum LearningClause {
    Using { extractor: ExprId },
    With { learner: Instantiation },
    From {
        parser: Instantiation,
        #[serde(default)]
        rounds: Option<String>,
    },
    Evaluate { expression: String },
    Cval {
        folds: String,
        #[serde(default)]
        split: Option<String>,
    },
    TestingMetric { metric: Instantiation },
    Alpha { value: String },
    PreExtract { enabled: bool },
    ProgressOutput { interval: String },
}

impl LearningClause {
    pub fn keyword(&self) -> &'static str {
        match self {
            LearningClause::Using { .. } => "using",
            LearningClause::With { .. } => "with",
            LearningClause::From { .. } => "from",
            LearningClause::Evaluate { .. } => "evaluate",
            LearningClause::Cval { .. } => "cval",
            LearningClause::TestingMetric { .. } => "testingMetric",
            LearningClause::Alpha { .. } => "alpha",
            LearningClause::PreExtract { .. } => "preExtract",
            LearningClause::ProgressOutput { .. } => "progressOutput",
        }
    }
}

/// A class name plus constructor arguments, as written in the source
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instantiation {
    pub class: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl Instantiation {
    pub fn new(class: impl Into<String>) -> Self {
        Self { class: class.into(), args: Vec::new() }
    }

    pub fn with_args<I, S>(class: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            class: class.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

/// Statement inside a coded body, head finder or constraint body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub kind: StatementKind,
    #[serde(default)]
    pub position: Position,
}

impl Statement {
    pub fn new(kind: StatementKind, position: Position) -> Self {
        Self { kind, position }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stmt", rename_all = "snake_case")]
pub enum StatementKind {
    /// `sense <name> : <value>;` or `sense <value>;`
    Sense {
        #[serde(default)]
        feature: Option<Expression>,
        value: Expression,
    },
    Return { value: Expression },
    Expression { expression: Expression },
    Local {
        name: String,
        type_name: String,
        #[serde(default)]
        init: Option<Expression>,
    },
    Block { body: Vec<Statement> },
    If {
        condition: Expression,
        then: Vec<Statement>,
        #[serde(default)]
        otherwise: Vec<Statement>,
    },
    /// `for (<type> <variable> : <collection>) { ... }` or `while (<collection>) { ... }`
    Loop {
        #[serde(default)]
        variable: Option<(String, String)>,
        header: Expression,
        body: Vec<Statement>,
    },
    Constraint { constraint: ConstraintExpression },
}

/// Host-language expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "expr", rename_all = "snake_case")]
pub enum Expression {
    Literal { value: String },
    Variable { name: String },
    Invocation {
        #[serde(default)]
        receiver: Option<Box<Expression>>,
        method: String,
        #[serde(default)]
        args: Vec<Expression>,
    },
    Field { receiver: Box<Expression>, field: String },
    Unary { op: String, operand: Box<Expression> },
    Binary { op: String, left: Box<Expression>, right: Box<Expression> },
}

impl Expression {
    pub fn literal(value: impl Into<String>) -> Self {
        Expression::Literal { value: value.into() }
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Expression::Variable { name: name.into() }
    }

    /// Unqualified call `method(args)`
    pub fn call(method: impl Into<String>, args: Vec<Expression>) -> Self {
        Expression::Invocation {
            receiver: None,
            method: method.into(),
            args,
        }
    }
}

/// First-order constraint over classifier outputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "constraint", rename_all = "snake_case")]
pub enum ConstraintExpression {
    Constant { value: bool },
    /// `left :: right` or `left !: right`
    Equality {
        left: Expression,
        right: Expression,
        #[serde(default)]
        negated: bool,
    },
    /// `@Constraint(x)`
    Invocation { expression: Expression },
    Not { operand: Box<ConstraintExpression> },
    Binary {
        op: LogicOp,
        left: Box<ConstraintExpression>,
        right: Box<ConstraintExpression>,
    },
    Quantified {
        quantifier: Quantifier,
        variable: String,
        type_name: String,
        collection: Expression,
        body: Box<ConstraintExpression>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicOp {
    And,
    Or,
    Implies,
    Iff,
}

impl LogicOp {
    pub fn symbol(self) -> &'static str {
        match self {
            LogicOp::And => "/\\",
            LogicOp::Or => "\\/",
            LogicOp::Implies => "=>",
            LogicOp::Iff => "<=>",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "bound", rename_all = "snake_case")]
pub enum Quantifier {
    ForAll,
    Exists,
    AtLeast(String),
    AtMost(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_name() {
        assert_eq!(SyntaxTree::new("src/pos/Tagger.lbj").base_name(), "Tagger");
        assert_eq!(SyntaxTree::new("").base_name(), "anonymous");
    }

    #[test]
    fn test_tree_from_json() {
        let json = r#"{
            "source_file": "demo.lbj",
            "declarations": [
                {"kind": "classifier", "name": "Word", "return_type": {"tag": "DISCRETE"},
                 "input_type": "Token", "expression": 0, "position": {"line": 1, "column": 1}}
            ],
            "expressions": [
                {"kind": {"expr": "coded", "parameter": "t", "body": [
                    {"kind": {"stmt": "return", "value": {"expr": "field", "receiver": {"expr": "variable", "name": "t"}, "field": "form"}}}
                ]}}
            ]
        }"#;

        let tree: SyntaxTree = serde_json::from_str(json).unwrap();
        assert_eq!(tree.declarations.len(), 1);
        assert_eq!(tree.declarations[0].name(), "Word");
        assert!(matches!(tree.expression(ExprId(0)).map(|e| &e.kind), Some(ExpressionKind::Coded { .. })));
    }

    #[test]
    fn test_push_expression_returns_arena_index() {
        let mut tree = SyntaxTree::new("demo.lbj");
        let a = tree.push_expression(ExpressionKind::Name { name: "A".into() }, Position::new(1, 1));
        let b = tree.push_expression(ExpressionKind::Name { name: "B".into() }, Position::new(1, 4));
        assert_eq!(a, ExprId(0));
        assert_eq!(b, ExprId(1));
    }
}
