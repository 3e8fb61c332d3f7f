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

//! Canonical single-line rendering of syntax nodes
//!
//! Two trees that differ only in layout render identically. The rendering of a code
//! generator is its fingerprint source, so children that are code generators in their
//! own right appear by name only: editing a child changes the child's fingerprint, not
//! its parent's.

use super::{
    ClassifierDeclaration, ConstraintDeclaration, ConstraintExpression, Declaration, ExprId, Expression, ExpressionKind, InferenceClause,
    InferenceDeclaration, Instantiation, LearningClause, Quantifier, Statement, StatementKind, SyntaxTree,
};
use crate::types::ClassifierReturnType;

/// Source of the names assigned to classifier expressions
pub trait ExpressionNames {
    fn name_of(&self, id: ExprId) -> Option<&str>;
}

/// Renders classifier expressions and declarations of one tree
pub struct ShapePrinter<'a> {
    tree: &'a SyntaxTree,
    names: &'a dyn ExpressionNames,
}

impl<'a> ShapePrinter<'a> {
    pub fn new(tree: &'a SyntaxTree, names: &'a dyn ExpressionNames) -> Self {
        Self { tree, names }
    }

    /// Shape of a top-level declaration
    pub fn declaration(&self, declaration: &Declaration) -> String {
        match declaration {
            Declaration::Classifier(d) => self.classifier_declaration(d),
            Declaration::Constraint(d) => constraint_declaration(d),
            Declaration::Inference(d) => inference_declaration(d),
        }
    }

    fn classifier_declaration(&self, d: &ClassifierDeclaration) -> String {
        let mut out = format!("{} {}({}", d.return_type, d.name, d.input_type);
        if let Some(parameter) = &d.parameter {
            out.push(' ');
            out.push_str(parameter);
        }
        out.push(')');
        if let Some(keyword) = d.cache.keyword() {
            out.push(' ');
            out.push_str(keyword);
        }
        out.push_str(" <- ");
        out.push_str(&self.expression(d.expression));
        out
    }

    /// Shape of an anonymous code generator named `name`
    pub fn anonymous(&self, name: &str, id: ExprId, return_type: Option<&ClassifierReturnType>, input_type: &str) -> String {
        let rendered_type = return_type.map(ToString::to_string).unwrap_or_else(|| "?".to_string());
        format!("{rendered_type} {name}({input_type}) <- {}", self.expression(id))
    }

    /// Body of a classifier expression
    pub fn expression(&self, id: ExprId) -> String {
        let Some(expression) = self.tree.expression(id) else {
            return format!("<missing #{}>", id.0);
        };
        match &expression.kind {
            ExpressionKind::Name { name } => name.clone(),
            ExpressionKind::Coded { return_type, parameter, body } => {
                let mut out = String::new();
                if let Some(return_type) = return_type {
                    out.push_str(&return_type.to_string());
                    out.push(' ');
                }
                if let Some(parameter) = parameter {
                    out.push_str(&format!("({parameter}) "));
                }
                out.push_str(&block(body));
                out
            }
            ExpressionKind::Composite { children } => children.iter().map(|c| self.child(*c)).collect::<Vec<_>>().join(", "),
            ExpressionKind::Conjunction { left, right } => format!("{} && {}", self.child(*left), self.child(*right)),
            ExpressionKind::Learning(learning) => {
                let mut out = String::from("learn");
                if let Some(labeler) = learning.labeler {
                    out.push(' ');
                    out.push_str(&self.child(labeler));
                }
                for clause in &learning.clauses {
                    out.push(' ');
                    out.push_str(&self.learning_clause(clause));
                }
                out.push_str(" end");
                out
            }
            ExpressionKind::InferenceInvocation { inference, learner } => format!("{inference}({learner})"),
        }
    }

    fn child(&self, id: ExprId) -> String {
        match self.names.name_of(id) {
            Some(name) => name.to_string(),
            None => self.expression(id),
        }
    }

    fn learning_clause(&self, clause: &LearningClause) -> String {
        match clause {
            LearningClause::Using { extractor } => format!("using {}", self.child(*extractor)),
            LearningClause::With { learner } => format!("with {}", instantiation(learner)),
            LearningClause::From { parser, rounds } => match rounds {
                Some(rounds) => format!("from {} {rounds} rounds", instantiation(parser)),
                None => format!("from {}", instantiation(parser)),
            },
            LearningClause::Evaluate { expression } => format!("evaluate {}", normalize(expression)),
            LearningClause::Cval { folds, split } => match split {
                Some(split) => format!("cval {folds} \"{split}\""),
                None => format!("cval {folds}"),
            },
            LearningClause::TestingMetric { metric } => format!("testingMetric {}", instantiation(metric)),
            LearningClause::Alpha { value } => format!("alpha {value}"),
            LearningClause::PreExtract { enabled } => format!("preExtract {enabled}"),
            LearningClause::ProgressOutput { interval } => format!("progressOutput {interval}"),
        }
    }
}

fn constraint_declaration(d: &ConstraintDeclaration) -> String {
    format!("constraint {}({} {}) {}", d.name, d.input_type, d.parameter, block(&d.body))
}

fn inference_declaration(d: &InferenceDeclaration) -> String {
    let mut parts = Vec::with_capacity(d.head_finders.len() + d.clauses.len());
    for finder in &d.head_finders {
        parts.push(format!("{} {} {}", finder.input_type, finder.parameter, block(&finder.body)));
    }
    for clause in &d.clauses {
        parts.push(match clause {
            InferenceClause::SubjectTo { parameter, body } => format!("subjectto ({parameter}) {}", block(body)),
            InferenceClause::With { algorithm } => format!("with {}", instantiation(algorithm)),
            InferenceClause::NormalizedBy { learner: Some(learner), normalizer } => format!("{learner} normalizedby {}", instantiation(normalizer)),
            InferenceClause::NormalizedBy { learner: None, normalizer } => format!("normalizedby {}", instantiation(normalizer)),
        });
    }
    format!("inference {} head {} {{ {} }}", d.name, d.head_type, parts.join(" "))
}

pub fn instantiation(i: &Instantiation) -> String {
    format!("{}({})", i.class, i.args.iter().map(|a| normalize(a)).collect::<Vec<_>>().join(", "))
}

/// Collapse runs of whitespace and drop line breaks
fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn block(body: &[Statement]) -> String {
    if body.is_empty() {
        return "{ }".to_string();
    }
    format!("{{ {} }}", body.iter().map(statement).collect::<Vec<_>>().join(" "))
}

pub fn statement(s: &Statement) -> String {
    match &s.kind {
        StatementKind::Sense { feature: Some(feature), value } => format!("sense {} : {};", expression(feature), expression(value)),
        StatementKind::Sense { feature: None, value } => format!("sense {};", expression(value)),
        StatementKind::Return { value } => format!("return {};", expression(value)),
        StatementKind::Expression { expression: e } => format!("{};", expression(e)),
        StatementKind::Local { name, type_name, init: Some(init) } => format!("{type_name} {name} = {};", expression(init)),
        StatementKind::Local { name, type_name, init: None } => format!("{type_name} {name};"),
        StatementKind::Block { body } => block(body),
        StatementKind::If { condition, then, otherwise } if otherwise.is_empty() => format!("if ({}) {}", expression(condition), block(then)),
        StatementKind::If { condition, then, otherwise } => format!("if ({}) {} else {}", expression(condition), block(then), block(otherwise)),
        StatementKind::Loop {
            variable: Some((type_name, name)),
            header,
            body,
        } => format!("for ({type_name} {name} : {}) {}", expression(header), block(body)),
        StatementKind::Loop { variable: None, header, body } => format!("while ({}) {}", expression(header), block(body)),
        StatementKind::Constraint { constraint: c } => format!("{};", constraint(c)),
    }
}

pub fn expression(e: &Expression) -> String {
    match e {
        Expression::Literal { value } => value.replace('\n', "\\n"),
        Expression::Variable { name } => name.clone(),
        Expression::Invocation { receiver, method, args } => {
            let args = args.iter().map(expression).collect::<Vec<_>>().join(", ");
            match receiver {
                Some(receiver) => format!("{}.{method}({args})", expression(receiver)),
                None => format!("{method}({args})"),
            }
        }
        Expression::Field { receiver, field } => format!("{}.{field}", expression(receiver)),
        Expression::Unary { op, operand } => format!("{op}{}", expression(operand)),
        Expression::Binary { op, left, right } => format!("({} {op} {})", expression(left), expression(right)),
    }
}

pub fn constraint(c: &ConstraintExpression) -> String {
    match c {
        ConstraintExpression::Constant { value } => value.to_string(),
        ConstraintExpression::Equality { left, right, negated } => {
            format!("{} {} {}", expression(left), if *negated { "!:" } else { "::" }, expression(right))
        }
        ConstraintExpression::Invocation { expression: e } => format!("@{}", expression(e)),
        ConstraintExpression::Not { operand } => format!("!({})", constraint(operand)),
        ConstraintExpression::Binary { op, left, right } => format!("({} {} {})", constraint(left), op.symbol(), constraint(right)),
        ConstraintExpression::Quantified {
            quantifier,
            variable,
            type_name,
            collection,
            body,
        } => {
            let head = match quantifier {
                Quantifier::ForAll => "forall".to_string(),
                Quantifier::Exists => "exists".to_string(),
                Quantifier::AtLeast(bound) => format!("atleast {bound} of"),
                Quantifier::AtMost(bound) => format!("atmost {bound} of"),
            };
            format!("{head} ({type_name} {variable} in {}) {}", expression(collection), constraint(body))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{LearningExpression, LogicOp};
    use dotlearn_common::Position;
    use std::collections::HashMap;

    struct Names(HashMap<ExprId, String>);

    impl ExpressionNames for Names {
        fn name_of(&self, id: ExprId) -> Option<&str> {
            self.0.get(&id).map(String::as_str)
        }
    }

    #[test]
    fn test_children_render_by_name() {
        let mut tree = SyntaxTree::new("demo.lbj");
        let word = tree.push_expression(ExpressionKind::Name { name: "Word".into() }, Position::new(1, 1));
        let coded = tree.push_expression(
            ExpressionKind::Coded {
                return_type: Some(ClassifierReturnType::discrete()),
                parameter: Some("t".into()),
                body: vec![Statement::new(StatementKind::Return { value: Expression::literal("\"x\"") }, Position::new(1, 9))],
            },
            Position::new(1, 8),
        );
        let composite = tree.push_expression(ExpressionKind::Composite { children: vec![word, coded] }, Position::new(1, 1));

        let names = Names(HashMap::from([(word, "Word".to_string()), (coded, "demo$F$1".to_string())]));
        let printer = ShapePrinter::new(&tree, &names);
        assert_eq!(printer.expression(composite), "Word, demo$F$1");
        assert_eq!(printer.expression(coded), "discrete (t) { return \"x\"; }");
    }

    #[test]
    fn test_learning_clauses_render_in_order() {
        let mut tree = SyntaxTree::new("demo.lbj");
        let label = tree.push_expression(ExpressionKind::Name { name: "Label".into() }, Position::unknown());
        let word = tree.push_expression(ExpressionKind::Name { name: "Word".into() }, Position::unknown());
        let learn = tree.push_expression(
            ExpressionKind::Learning(LearningExpression {
                labeler: Some(label),
                clauses: vec![
                    LearningClause::Using { extractor: word },
                    LearningClause::From {
                        parser: Instantiation::with_args("JsonLinesParser", ["\"train.jsonl\""]),
                        rounds: Some("5".into()),
                    },
                    LearningClause::Cval { folds: "5".into(), split: Some("kth".into()) },
                ],
            }),
            Position::unknown(),
        );

        let names = Names(HashMap::new());
        let printer = ShapePrinter::new(&tree, &names);
        assert_eq!(
            printer.expression(learn),
            "learn Label using Word from JsonLinesParser(\"train.jsonl\") 5 rounds cval 5 \"kth\" end"
        );
    }

    #[test]
    fn test_rendering_is_single_line() {
        let body = vec![Statement::new(
            StatementKind::Constraint {
                constraint: ConstraintExpression::Binary {
                    op: LogicOp::Implies,
                    left: Box::new(ConstraintExpression::Equality {
                        left: Expression::call("Tagger", vec![Expression::variable("w")]),
                        right: Expression::literal("\"multi\nline\""),
                        negated: false,
                    }),
                    right: Box::new(ConstraintExpression::Constant { value: true }),
                },
            },
            Position::unknown(),
        )];
        let rendered = block(&body);
        assert!(!rendered.contains('\n'));
        assert_eq!(rendered, "{ (Tagger(w) :: \"multi\\nline\" => true); }");
    }
}
