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

use super::graph::{DependorGraph, InvokedGraph};
use super::symbol_table::{Symbol, SymbolError, SymbolTable};
use super::{Analysis, AnalysisTable, CodeGenerator, CrossValidationSpec, ExprInfo, GeneratorKind, LearningSpec, Origin};
use crate::ast::{
    ClassifierDeclaration, ConstraintDeclaration, ConstraintExpression, Declaration, ExprId, Expression, ExpressionKind, InferenceClause,
    InferenceDeclaration, Instantiation, LearningClause, LearningExpression, Quantifier, Statement, StatementKind, SyntaxTree,
};
use crate::config::CompilerConfig;
use crate::types::{ClassifierReturnType, Shape, TypeTag};
use dotlearn_common::{DiagnosticKind, Diagnostics, Position};
use dotlearn_learning::SplitStrategy;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info};

/// Where a statement list appears; decides which statements are legal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Classifier,
    Constraint,
    HeadFinder,
    SubjectTo,
}

struct BodyContext {
    kind: BodyKind,
    return_type: Option<ClassifierReturnType>,
    constraint_statements: usize,
}

impl BodyContext {
    fn new(kind: BodyKind, return_type: Option<ClassifierReturnType>) -> Self {
        Self {
            kind,
            return_type,
            constraint_statements: 0,
        }
    }

    fn senses(&self) -> bool {
        self.kind == BodyKind::Classifier && self.return_type.as_ref().is_some_and(|t| t.tag.senses())
    }
}

/// Single-pass semantic analyzer over one syntax tree
pub struct SemanticAnalyzer<'a> {
    tree: &'a SyntaxTree,
    config: &'a CompilerConfig,
    base_name: String,
    symbols: SymbolTable,
    table: AnalysisTable,
    dependor: DependorGraph,
    invoked: InvokedGraph,
    generators: Vec<CodeGenerator>,
    generator_index: HashMap<String, usize>,
    learning: BTreeMap<String, LearningSpec>,
    inference_algorithms: BTreeMap<String, Instantiation>,
    /// Innermost code generator being visited
    current: Option<String>,
    child_counters: HashMap<String, usize>,
    diagnostics: Diagnostics,
}

impl<'a> SemanticAnalyzer<'a> {
    pub fn new(tree: &'a SyntaxTree, config: &'a CompilerConfig) -> Self {
        Self {
            tree,
            config,
            base_name: tree.base_name(),
            symbols: SymbolTable::new(),
            table: AnalysisTable::new(tree.expressions.len()),
            dependor: DependorGraph::new(),
            invoked: InvokedGraph::new(),
            generators: Vec::new(),
            generator_index: HashMap::new(),
            learning: BTreeMap::new(),
            inference_algorithms: BTreeMap::new(),
            current: None,
            child_counters: HashMap::new(),
            diagnostics: Diagnostics::new("semantic"),
        }
    }

    /// Run the traversal and hand back everything it computed
    pub fn analyze(mut self) -> Analysis {
        let tree = self.tree;
        info!(source = %tree.source_file, declarations = tree.declarations.len(), "semantic analysis started");

        let duplicates = self.declare_globals();
        for (index, declaration) in tree.declarations.iter().enumerate() {
            if duplicates.contains(&index) {
                continue;
            }
            match declaration {
                Declaration::Classifier(d) => self.analyze_classifier(index, d),
                Declaration::Constraint(d) => self.analyze_constraint(index, d),
                Declaration::Inference(d) => self.analyze_inference(index, d),
            }
            self.current = None;
        }

        debug!(
            generators = self.generators.len(),
            learners = self.learning.len(),
            dependor_edges = self.dependor.edge_count(),
            invoked_edges = self.invoked.edge_count(),
            errors = self.diagnostics.error_count(),
            "semantic analysis finished"
        );

        Analysis {
            base_name: self.base_name,
            table: self.table,
            generators: self.generators,
            learning: self.learning,
            inference_algorithms: self.inference_algorithms,
            dependor: self.dependor,
            invoked: self.invoked,
            diagnostics: self.diagnostics,
            generator_index: self.generator_index,
        }
    }

    /// Enter every top-level name first so declarations may reference later ones
    fn declare_globals(&mut self) -> HashSet<usize> {
        let tree = self.tree;
        let mut duplicates = HashSet::new();
        for (index, declaration) in tree.declarations.iter().enumerate() {
            let symbol = match declaration {
                Declaration::Classifier(d) => Symbol::Classifier {
                    return_type: d.return_type.clone(),
                    input_type: d.input_type.clone(),
                    learner: matches!(tree.expression(d.expression).map(|e| &e.kind), Some(ExpressionKind::Learning(_))),
                },
                Declaration::Constraint(d) => Symbol::Constraint {
                    input_type: d.input_type.clone(),
                },
                Declaration::Inference(d) => Symbol::Inference {
                    head_type: d.head_type.clone(),
                },
            };
            if let Err(error) = self.symbols.declare(declaration.name(), symbol) {
                self.diagnostics.error(DiagnosticKind::DuplicateDeclaration, declaration.position(), error.to_string());
                duplicates.insert(index);
            }
        }
        duplicates
    }

    fn analyze_classifier(&mut self, index: usize, d: &ClassifierDeclaration) {
        let tree = self.tree;
        let Some(expression) = tree.expression(d.expression) else {
            self.diagnostics.fatal(format!("classifier `{}` refers to missing expression #{}", d.name, d.expression.0));
            return;
        };
        if !d.return_type.is_valid() {
            self.diagnostics.error(
                DiagnosticKind::TypeMismatch,
                d.position,
                format!("`{}` is not a valid return type for `{}`", d.return_type, d.name),
            );
            return;
        }

        self.register_generator(
            &d.name,
            GeneratorKind::of(&expression.kind),
            Origin::Declaration(index),
            d.position,
            &d.input_type,
            Some(d.return_type.clone()),
        );
        self.current = Some(d.name.clone());

        let actual = self.visit(d.expression, d.name.clone(), Some(&d.return_type), &d.input_type, d.parameter.as_deref());
        if d.cache != Default::default() {
            self.table.update(d.expression, |info| info.cache = d.cache);
        }
        if let Some(actual) = actual {
            if !actual.is_containable_in(&d.return_type) {
                self.diagnostics.error(
                    DiagnosticKind::TypeMismatch,
                    d.position,
                    format!("`{}` is declared as {} but its definition produces {}", d.name, d.return_type, actual),
                );
            }
        }
    }

    fn analyze_constraint(&mut self, index: usize, d: &ConstraintDeclaration) {
        self.register_generator(&d.name, GeneratorKind::Constraint, Origin::Declaration(index), d.position, &d.input_type, None);
        self.current = Some(d.name.clone());

        let mut context = BodyContext::new(BodyKind::Constraint, None);
        self.symbols.push_scope();
        self.declare_local(&d.parameter, &d.input_type, d.position);
        self.visit_statements(&d.body, &mut context);
        self.symbols.pop_scope();

        if context.constraint_statements == 0 {
            self.diagnostics.warning(
                DiagnosticKind::EmptyConstraint,
                d.position,
                format!("constraint `{}` contains no constraint statements", d.name),
            );
        }
    }

    fn analyze_inference(&mut self, index: usize, d: &InferenceDeclaration) {
        self.register_generator(&d.name, GeneratorKind::Inference, Origin::Declaration(index), d.position, &d.head_type, None);
        self.current = Some(d.name.clone());

        if d.head_finders.is_empty() {
            self.diagnostics.error(
                DiagnosticKind::InvalidInference,
                d.position,
                format!("inference `{}` has no head finder methods", d.name),
            );
        }
        for finder in &d.head_finders {
            let mut context = BodyContext::new(BodyKind::HeadFinder, None);
            self.symbols.push_scope();
            self.declare_local(&finder.parameter, &finder.input_type, d.position);
            self.visit_statements(&finder.body, &mut context);
            self.symbols.pop_scope();
        }

        let subject_to = d.clauses.iter().filter(|c| matches!(c, InferenceClause::SubjectTo { .. })).count();
        if subject_to != 1 {
            self.diagnostics.error(
                DiagnosticKind::InvalidInference,
                d.position,
                format!("inference `{}` must have exactly one subject-to clause, found {subject_to}", d.name),
            );
        }

        let mut algorithm = None;
        for clause in &d.clauses {
            match clause {
                InferenceClause::SubjectTo { parameter, body } => {
                    let mut context = BodyContext::new(BodyKind::SubjectTo, None);
                    self.symbols.push_scope();
                    self.declare_local(parameter, &d.head_type, d.position);
                    self.visit_statements(body, &mut context);
                    self.symbols.pop_scope();
                }
                InferenceClause::With { algorithm: instantiation } => {
                    if algorithm.is_some() {
                        self.diagnostics.error(
                            DiagnosticKind::InvalidClause,
                            d.position,
                            format!("inference `{}` has more than one with clause", d.name),
                        );
                    } else {
                        algorithm = Some(instantiation.clone());
                    }
                }
                InferenceClause::NormalizedBy { learner: Some(learner), .. } => {
                    if self.expect_learner(learner, d.position).is_some() {
                        self.dependor.add_dependency(learner, &d.name);
                    }
                }
                InferenceClause::NormalizedBy { learner: None, .. } => {}
            }
        }

        let algorithm = algorithm.unwrap_or_else(|| Instantiation::new(self.config.default_inference_algorithm.clone()));
        self.inference_algorithms.insert(d.name.clone(), algorithm);
    }

    fn register_generator(
        &mut self,
        name: &str,
        kind: GeneratorKind,
        origin: Origin,
        position: Position,
        input_type: &str,
        return_type: Option<ClassifierReturnType>,
    ) {
        if self.generator_index.contains_key(name) {
            self.diagnostics.error(DiagnosticKind::DuplicateDeclaration, position, format!("`{name}` is already declared"));
            return;
        }
        let order = self.generators.len();
        self.generators.push(CodeGenerator {
            name: name.to_string(),
            kind,
            origin,
            position,
            order,
            input_type: Some(input_type.to_string()),
            return_type,
        });
        self.generator_index.insert(name.to_string(), order);
        self.dependor.add_declaration(name);
    }

    /// Record that the current code generator references `dependency`
    fn add_reference(&mut self, dependency: &str, invoked: bool) {
        if let Some(current) = self.current.clone() {
            self.dependor.add_dependency(dependency, &current);
            if invoked {
                self.invoked.add_invocation(&current, dependency);
            }
        }
    }

    /// Name for the next anonymous child of `parent`
    ///
    /// Names are qualified with the source file's base name once: a parent that is
    /// already qualified is extended rather than prefixed again.
    fn anonymous_name(&mut self, parent: &str, assigned: Option<&str>) -> String {
        let counter = self.child_counters.entry(parent.to_string()).or_insert(0);
        let index = *counter;
        *counter += 1;

        let prefix = format!("{}$", self.base_name);
        if let Some(assigned) = assigned.filter(|name| name.starts_with(&prefix)) {
            return assigned.to_string();
        }
        if parent.starts_with(&prefix) {
            format!("{parent}${index}")
        } else {
            format!("{prefix}{parent}${index}")
        }
    }

    fn visit(&mut self, id: ExprId, name: String, expected: Option<&ClassifierReturnType>, input_type: &str, parameter: Option<&str>) -> Option<ClassifierReturnType> {
        let tree = self.tree;
        let Some(expression) = tree.expression(id) else {
            self.diagnostics.fatal(format!("`{name}` refers to missing expression #{}", id.0));
            return None;
        };
        self.table.insert(
            id,
            ExprInfo {
                name: name.clone(),
                input_type: input_type.to_string(),
                return_type: None,
                cache: expression.cache,
            },
        );

        let position = expression.position;
        let computed = match &expression.kind {
            ExpressionKind::Name { name: target } => self.visit_name(target, position),
            ExpressionKind::Coded {
                return_type,
                parameter: own_parameter,
                body,
            } => self.visit_coded(&name, return_type.as_ref().or(expected), own_parameter.as_deref().or(parameter), input_type, body, position),
            ExpressionKind::Composite { children } => self.visit_composite(&name, children, expected, input_type, position),
            ExpressionKind::Conjunction { left, right } => self.visit_conjunction(&name, *left, *right, input_type),
            ExpressionKind::Learning(learning) => self.visit_learning(&name, id, learning, expected, input_type, position),
            ExpressionKind::InferenceInvocation { inference, learner } => self.visit_inference_invocation(inference, learner, position),
        };

        self.table.update(id, |info| info.return_type = computed.clone());
        computed
    }

    /// Visit a child of a composite, conjunction or learning expression
    fn visit_child(&mut self, parent: &str, id: ExprId, expected: Option<&ClassifierReturnType>, input_type: &str) -> Option<ClassifierReturnType> {
        let tree = self.tree;
        let Some(child) = tree.expression(id) else {
            self.diagnostics.fatal(format!("`{parent}` refers to missing expression #{}", id.0));
            return None;
        };

        if let ExpressionKind::Name { name } = &child.kind {
            return self.visit(id, name.clone(), None, input_type, None);
        }

        let name = self.anonymous_name(parent, child.name.as_deref());
        self.register_generator(&name, GeneratorKind::of(&child.kind), Origin::Expression(id), child.position, input_type, None);
        self.add_reference(&name, true);

        let enclosing = self.current.replace(name.clone());
        let computed = self.visit(id, name.clone(), expected, input_type, None);
        self.current = enclosing;

        if let Some(&index) = self.generator_index.get(&name) {
            self.generators[index].return_type = computed.clone();
        }
        computed
    }

    fn visit_name(&mut self, target: &str, position: Position) -> Option<ClassifierReturnType> {
        match self.resolve(target, position)? {
            Symbol::Classifier { return_type, .. } => {
                self.add_reference(target, true);
                Some(return_type)
            }
            other => {
                self.diagnostics.error(
                    DiagnosticKind::TypeMismatch,
                    position,
                    format!("`{target}` is a {}, not a classifier", other.describe()),
                );
                None
            }
        }
    }

    fn visit_coded(
        &mut self,
        name: &str,
        return_type: Option<&ClassifierReturnType>,
        parameter: Option<&str>,
        input_type: &str,
        body: &[Statement],
        position: Position,
    ) -> Option<ClassifierReturnType> {
        let Some(return_type) = return_type.cloned() else {
            self.diagnostics.error(DiagnosticKind::TypeMismatch, position, format!("coded classifier `{name}` has no return type"));
            return None;
        };

        let mut context = BodyContext::new(BodyKind::Classifier, Some(return_type.clone()));
        self.symbols.push_scope();
        if let Some(parameter) = parameter {
            self.declare_local(parameter, input_type, position);
        }
        self.visit_statements(body, &mut context);
        self.symbols.pop_scope();
        Some(return_type)
    }

    fn visit_composite(
        &mut self,
        name: &str,
        children: &[ExprId],
        expected: Option<&ClassifierReturnType>,
        input_type: &str,
        position: Position,
    ) -> Option<ClassifierReturnType> {
        if children.is_empty() {
            self.diagnostics.error(DiagnosticKind::TypeMismatch, position, format!("composite generator `{name}` has no children"));
            return None;
        }

        let element = expected.and_then(ClassifierReturnType::element);
        let mut types = Vec::with_capacity(children.len());
        let mut complete = true;
        for &child in children {
            match self.visit_child(name, child, element.as_ref(), input_type) {
                Some(child_type) => {
                    if let Some(element) = &element {
                        if !child_type.fits_element(element) {
                            let child_name = self.table.get(child).map(|info| info.name.clone()).unwrap_or_default();
                            self.diagnostics.error(
                                DiagnosticKind::TypeMismatch,
                                self.tree.expression(child).map_or(position, |e| e.position),
                                format!("`{child_name}` produces {child_type} but composite generator `{name}` expects {element} features"),
                            );
                            complete = false;
                        }
                    }
                    types.push(child_type);
                }
                None => complete = false,
            }
        }
        // a failed child already reported its own error
        if !complete {
            return None;
        }

        match ClassifierReturnType::composite(&types) {
            Ok(combined) => combined.map(|c| ClassifierReturnType {
                tag: c.tag.as_generator(),
                values: c.values,
            }),
            Err(error) => {
                self.diagnostics.fatal(format!("composite generator `{name}`: {error}"));
                None
            }
        }
    }

    fn visit_conjunction(&mut self, name: &str, left: ExprId, right: ExprId, input_type: &str) -> Option<ClassifierReturnType> {
        let left = self.visit_child(name, left, None, input_type);
        let right = self.visit_child(name, right, None, input_type);
        let (left, right) = (left?, right?);

        match ClassifierReturnType::conjunction(&left, &right) {
            Ok(joined) => Some(joined),
            Err(error) => {
                self.diagnostics.fatal(format!("conjunction `{name}`: {error}"));
                None
            }
        }
    }

    fn visit_inference_invocation(&mut self, inference: &str, learner: &str, position: Position) -> Option<ClassifierReturnType> {
        let inference_ok = match self.resolve(inference, position) {
            Some(Symbol::Inference { .. }) => true,
            Some(other) => {
                self.diagnostics.error(
                    DiagnosticKind::InvalidInference,
                    position,
                    format!("`{inference}` is a {}, not an inference", other.describe()),
                );
                false
            }
            None => false,
        };
        let learner_type = self.expect_learner(learner, position);

        if inference_ok {
            self.add_reference(inference, true);
        }
        if learner_type.is_some() {
            self.add_reference(learner, false);
        }
        if inference_ok { learner_type } else { None }
    }

    /// Resolve `name` and require it to be a learning classifier
    fn expect_learner(&mut self, name: &str, position: Position) -> Option<ClassifierReturnType> {
        match self.resolve(name, position)? {
            Symbol::Classifier {
                return_type, learner: true, ..
            } => Some(return_type),
            other => {
                self.diagnostics.error(
                    DiagnosticKind::InvalidInference,
                    position,
                    format!("`{name}` is a {}, not a learner", other.describe()),
                );
                None
            }
        }
    }

    fn visit_learning(
        &mut self,
        name: &str,
        id: ExprId,
        learning: &LearningExpression,
        expected: Option<&ClassifierReturnType>,
        input_type: &str,
        position: Position,
    ) -> Option<ClassifierReturnType> {
        self.check_clause_counts(name, &learning.clauses, position);

        let labeler = learning.labeler.map(|labeler| (labeler, self.visit_child(name, labeler, None, input_type)));
        let labeler_type = labeler.as_ref().and_then(|(_, t)| t.clone());

        let return_type = match expected.cloned().or_else(|| labeler_type.clone()) {
            Some(return_type) => return_type,
            None => ClassifierReturnType::discrete(),
        };
        if return_type.tag.shape() != Shape::Scalar || !(return_type.tag.is_discrete() || return_type.tag.is_real()) {
            self.diagnostics.error(
                DiagnosticKind::InvalidLearner,
                position,
                format!("learner `{name}` must return a discrete or real scalar, not {return_type}"),
            );
        }
        if let Some(label) = &labeler_type {
            self.check_labeler(name, label, &return_type, position);
        }

        let mut spec = LearningSpec {
            name: name.to_string(),
            expression: id,
            order: self.generator_index.get(name).copied().unwrap_or(self.generators.len()),
            return_type: return_type.clone(),
            input_type: input_type.to_string(),
            extractor: None,
            labeler: labeler.and_then(|(labeler, _)| self.table.get(labeler).map(|info| info.name.clone())),
            learner: Instantiation::new(if return_type.tag == TypeTag::Real {
                self.config.default_real_learner.clone()
            } else {
                self.config.default_discrete_learner.clone()
            }),
            parser: None,
            rounds: 1,
            evaluate: None,
            cross_validation: None,
            pre_extract: None,
            progress_interval: None,
        };

        let mut folds = None;
        let mut metric = None;
        let mut alpha = None;
        for clause in &learning.clauses {
            match clause {
                LearningClause::Using { extractor } => {
                    if spec.extractor.is_none() && self.visit_child(name, *extractor, None, input_type).is_some() {
                        spec.extractor = self.table.get(*extractor).map(|info| info.name.clone());
                    }
                }
                LearningClause::With { learner } => spec.learner = learner.clone(),
                LearningClause::From { parser, rounds } => {
                    spec.parser = Some(parser.clone());
                    if let Some(rounds) = rounds {
                        spec.rounds = self.positive_integer(name, "rounds", rounds, position).unwrap_or(1);
                    }
                }
                LearningClause::Evaluate { expression } => spec.evaluate = Some(expression.clone()),
                LearningClause::Cval { folds: count, split } => {
                    let strategy = match split.as_deref().map(str::parse::<SplitStrategy>) {
                        None => SplitStrategy::default(),
                        Some(Ok(strategy)) => strategy,
                        Some(Err(error)) => {
                            self.diagnostics.error(DiagnosticKind::InvalidClauseArgument, position, format!("learner `{name}`: {error}"));
                            SplitStrategy::default()
                        }
                    };
                    match count.trim().parse::<usize>() {
                        Ok(count) => folds = Some((count, strategy)),
                        Err(_) => self.diagnostics.error(
                            DiagnosticKind::InvalidClauseArgument,
                            position,
                            format!("learner `{name}`: cval fold count `{count}` is not an integer"),
                        ),
                    }
                }
                LearningClause::TestingMetric { metric: instantiation } => metric = Some(instantiation.clone()),
                LearningClause::Alpha { value } => match value.trim().parse::<f64>() {
                    Ok(parsed) if parsed > 0.0 && parsed < 1.0 => alpha = Some(parsed),
                    _ => self.diagnostics.error(
                        DiagnosticKind::InvalidClauseArgument,
                        position,
                        format!("learner `{name}`: alpha `{value}` is not a number between 0 and 1"),
                    ),
                },
                LearningClause::PreExtract { enabled } => spec.pre_extract = Some(*enabled),
                LearningClause::ProgressOutput { interval } => {
                    spec.progress_interval = self.positive_integer(name, "progressOutput", interval, position);
                }
            }
        }

        let has_cval = learning.clauses.iter().any(|c| matches!(c, LearningClause::Cval { .. }));
        for clause in &learning.clauses {
            if matches!(clause, LearningClause::Alpha { .. } | LearningClause::TestingMetric { .. }) && !has_cval {
                self.diagnostics.error(
                    DiagnosticKind::InvalidClause,
                    position,
                    format!("learner `{name}`: {} requires a cval clause", clause.keyword()),
                );
            }
        }
        spec.cross_validation = folds.map(|(folds, strategy)| CrossValidationSpec {
            folds,
            strategy,
            alpha: alpha.unwrap_or(self.config.default_alpha),
            metric: metric.unwrap_or_else(|| Instantiation::new(self.config.default_testing_metric.clone())),
        });

        self.learning.insert(name.to_string(), spec);
        Some(return_type)
    }

    fn check_clause_counts(&mut self, name: &str, clauses: &[LearningClause], position: Position) {
        let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
        for clause in clauses {
            *counts.entry(clause.keyword()).or_default() += 1;
        }

        if counts.get("using").copied().unwrap_or(0) != 1 {
            self.diagnostics.error(
                DiagnosticKind::InvalidClause,
                position,
                format!("learner `{name}` must have exactly one using clause"),
            );
        }
        for (keyword, count) in counts {
            if keyword != "using" && count > 1 {
                self.diagnostics.error(
                    DiagnosticKind::InvalidClause,
                    position,
                    format!("learner `{name}` has {count} {keyword} clauses; at most one is allowed"),
                );
            }
        }
    }

    fn check_labeler(&mut self, name: &str, label: &ClassifierReturnType, declared: &ClassifierReturnType, position: Position) {
        if label.tag.shape() != Shape::Scalar {
            self.diagnostics.error(
                DiagnosticKind::InvalidLearner,
                position,
                format!("labeler of `{name}` must produce a single feature, not {label}"),
            );
        } else if label.tag != declared.tag {
            self.diagnostics.error(
                DiagnosticKind::TypeMismatch,
                position,
                format!("labeler of `{name}` produces {label} but the learner returns {declared}"),
            );
        } else if !declared.values.is_empty() && !label.is_containable_in(declared) {
            self.diagnostics.warning(
                DiagnosticKind::ValueRange,
                position,
                format!("labeler of `{name}` may produce values outside of {declared}"),
            );
        }
    }

    fn positive_integer(&mut self, name: &str, clause: &str, text: &str, position: Position) -> Option<usize> {
        match text.trim().parse::<usize>() {
            Ok(value) if value > 0 => Some(value),
            _ => {
                self.diagnostics.error(
                    DiagnosticKind::InvalidClauseArgument,
                    position,
                    format!("learner `{name}`: {clause} `{text}` is not a positive integer"),
                );
                None
            }
        }
    }

    /// Resolve a name, reporting each unresolved name once
    fn resolve(&mut self, name: &str, position: Position) -> Option<Symbol> {
        match self.symbols.resolve_once(name) {
            Ok(symbol) => symbol,
            Err(error) => {
                self.diagnostics.error(DiagnosticKind::UnresolvedName, position, error.to_string());
                None
            }
        }
    }

    fn declare_local(&mut self, name: &str, type_name: &str, position: Position) {
        let symbol = Symbol::Variable {
            type_name: type_name.to_string(),
        };
        if let Err(error @ SymbolError::DuplicateDeclaration(_)) = self.symbols.declare(name, symbol) {
            self.diagnostics.error(DiagnosticKind::DuplicateDeclaration, position, error.to_string());
        }
    }

    fn visit_statements(&mut self, body: &[Statement], context: &mut BodyContext) {
        for statement in body {
            self.visit_statement(statement, context);
        }
    }

    fn visit_scoped(&mut self, body: &[Statement], context: &mut BodyContext) {
        self.symbols.push_scope();
        self.visit_statements(body, context);
        self.symbols.pop_scope();
    }

    fn visit_statement(&mut self, statement: &Statement, context: &mut BodyContext) {
        let position = statement.position;
        match &statement.kind {
            StatementKind::Sense { feature, value } => {
                if !context.senses() {
                    self.diagnostics.error(
                        DiagnosticKind::IllegalSense,
                        position,
                        "sense statements are only allowed in classifiers returning arrays or generators",
                    );
                }
                if let Some(feature) = feature {
                    self.visit_host(feature, context, position, false);
                }
                self.visit_host(value, context, position, true);
            }
            StatementKind::Return { value } => {
                let legal = match context.kind {
                    BodyKind::Classifier => !context.senses(),
                    BodyKind::HeadFinder => true,
                    BodyKind::Constraint | BodyKind::SubjectTo => false,
                };
                if !legal {
                    self.diagnostics.error(
                        DiagnosticKind::IllegalReturn,
                        position,
                        "return statements are not allowed in generators, array classifiers or constraints",
                    );
                }
                self.visit_host(value, context, position, false);
            }
            StatementKind::Expression { expression } => self.visit_host(expression, context, position, false),
            StatementKind::Local { name, type_name, init } => {
                if let Some(init) = init {
                    self.visit_host(init, context, position, false);
                }
                self.declare_local(name, type_name, position);
            }
            StatementKind::Block { body } => self.visit_scoped(body, context),
            StatementKind::If { condition, then, otherwise } => {
                self.visit_host(condition, context, position, false);
                self.visit_scoped(then, context);
                self.visit_scoped(otherwise, context);
            }
            StatementKind::Loop { variable, header, body } => {
                self.visit_host(header, context, position, false);
                self.symbols.push_scope();
                if let Some((type_name, name)) = variable {
                    self.declare_local(name, type_name, position);
                }
                self.visit_statements(body, context);
                self.symbols.pop_scope();
            }
            StatementKind::Constraint { constraint } => {
                if !matches!(context.kind, BodyKind::Constraint | BodyKind::SubjectTo) {
                    self.diagnostics.error(
                        DiagnosticKind::IllegalStatement,
                        position,
                        "constraint statements are only allowed in constraints and subject-to clauses",
                    );
                }
                context.constraint_statements += 1;
                self.visit_constraint(constraint, context, position);
            }
        }
    }

    fn visit_constraint(&mut self, constraint: &ConstraintExpression, context: &mut BodyContext, position: Position) {
        match constraint {
            ConstraintExpression::Constant { .. } => {}
            ConstraintExpression::Equality { left, right, .. } => {
                self.visit_host(left, context, position, false);
                self.visit_host(right, context, position, false);
            }
            ConstraintExpression::Invocation { expression } => self.visit_host(expression, context, position, false),
            ConstraintExpression::Not { operand } => self.visit_constraint(operand, context, position),
            ConstraintExpression::Binary { left, right, .. } => {
                self.visit_constraint(left, context, position);
                self.visit_constraint(right, context, position);
            }
            ConstraintExpression::Quantified {
                quantifier,
                variable,
                type_name,
                collection,
                body,
            } => {
                if let Quantifier::AtLeast(bound) | Quantifier::AtMost(bound) = quantifier {
                    if bound.trim().parse::<usize>().is_err() {
                        self.diagnostics.error(
                            DiagnosticKind::InvalidClauseArgument,
                            position,
                            format!("quantifier bound `{bound}` is not an integer"),
                        );
                    }
                }
                self.visit_host(collection, context, position, false);
                self.symbols.push_scope();
                self.declare_local(variable, type_name, position);
                self.visit_constraint(body, context, position);
                self.symbols.pop_scope();
            }
        }
    }

    /// Visit a host-language expression; `sense_value` is set for the value of a sense statement
    fn visit_host(&mut self, expression: &Expression, context: &mut BodyContext, position: Position, sense_value: bool) {
        match expression {
            Expression::Literal { .. } => {}
            Expression::Variable { name } => {
                if let Some(symbol) = self.resolve(name, position) {
                    if !matches!(symbol, Symbol::Variable { .. }) {
                        self.add_reference(name, false);
                    }
                }
            }
            Expression::Invocation {
                receiver: Some(receiver),
                args,
                ..
            } => {
                self.visit_receiver(receiver, context, position);
                for arg in args {
                    self.visit_host(arg, context, position, false);
                }
            }
            Expression::Invocation { receiver: None, method, args } => {
                for arg in args {
                    self.visit_host(arg, context, position, false);
                }
                self.visit_invocation(method, args.len(), context, position, sense_value);
            }
            Expression::Field { receiver, .. } => self.visit_receiver(receiver, context, position),
            Expression::Unary { operand, .. } => self.visit_host(operand, context, position, false),
            Expression::Binary { left, right, .. } => {
                self.visit_host(left, context, position, false);
                self.visit_host(right, context, position, false);
            }
        }
    }

    /// Receivers may name host-language types, so a bare unknown name is not an error
    fn visit_receiver(&mut self, receiver: &Expression, context: &mut BodyContext, position: Position) {
        match receiver {
            Expression::Variable { name } if self.symbols.resolve(name).is_err() => {}
            other => self.visit_host(other, context, position, false),
        }
    }

    fn visit_invocation(&mut self, method: &str, arity: usize, context: &BodyContext, position: Position, sense_value: bool) {
        let Some(symbol) = self.resolve(method, position) else {
            return;
        };
        match symbol {
            Symbol::Classifier { return_type, .. } => {
                if arity != 1 {
                    self.diagnostics.error(
                        DiagnosticKind::InvalidInvocation,
                        position,
                        format!("classifier `{method}` takes exactly one argument, found {arity}"),
                    );
                }
                if return_type.tag.shape() == Shape::Generator {
                    let enclosing = context.return_type.as_ref().map(|t| t.tag);
                    let matching = enclosing.is_some_and(|tag| tag == TypeTag::MixedGenerator || tag == return_type.tag);
                    if !(sense_value && context.kind == BodyKind::Classifier && matching) {
                        self.diagnostics.error(
                            DiagnosticKind::InvalidInvocation,
                            position,
                            format!("generator `{method}` may only be invoked as the value of a sense statement in a generator of the same kind"),
                        );
                    }
                }
                self.add_reference(method, true);
            }
            Symbol::Constraint { .. } => {
                if arity != 1 {
                    self.diagnostics.error(
                        DiagnosticKind::InvalidInvocation,
                        position,
                        format!("constraint `{method}` takes exactly one argument, found {arity}"),
                    );
                }
                self.add_reference(method, true);
            }
            other => {
                self.diagnostics.error(
                    DiagnosticKind::InvalidInvocation,
                    position,
                    format!("`{method}` is a {} and cannot be invoked", other.describe()),
                );
            }
        }
    }
}
