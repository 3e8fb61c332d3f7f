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

//! End-to-end compiler runs: emission, training, cross validation and scheduling

use dotlearn_common::{DiagnosticKind, Position, Severity};
use dotlearn_compiler::ast::{
    ClassifierDeclaration, Declaration, ExprId, Expression, ExpressionKind, Instantiation, LearningClause, LearningExpression, Statement, StatementKind,
    SyntaxTree,
};
use dotlearn_compiler::revision::fingerprint::{Header, read_header};
use dotlearn_compiler::training::TrainingEvent;
use dotlearn_compiler::{ClassifierReturnType, CompileOutcome, Compiler, CompilerConfig};
use dotlearn_learning::{ComponentRegistry, Feature};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const TRAINING_DATA: &[(&str, &str)] = &[
    ("dog", "NN"),
    ("runs", "VB"),
    ("cat", "NN"),
    ("sleeps", "VB"),
    ("dog", "NN"),
    ("eats", "VB"),
    ("bird", "NN"),
    ("runs", "VB"),
    ("cat", "NN"),
];

fn write_training_data(dir: &Path) -> PathBuf {
    let path = dir.join("train.jsonl");
    let mut file = fs::File::create(&path).unwrap();
    for (word, tag) in TRAINING_DATA {
        writeln!(file, "{}", serde_json::json!({ "word": word, "tag": tag })).unwrap();
    }
    path
}

fn registry() -> ComponentRegistry {
    let mut registry = ComponentRegistry::with_builtins();
    registry.register_classifier("Word", || {
        Ok(Arc::new(|object: &serde_json::Value| vec![Feature::discrete("word", object["word"].as_str().unwrap_or_default())]))
    });
    registry.register_classifier("Label", || {
        Ok(Arc::new(|object: &serde_json::Value| vec![Feature::discrete("tag", object["tag"].as_str().unwrap_or_default())]))
    });
    registry
}

fn returns(value: &str) -> Vec<Statement> {
    vec![Statement::new(StatementKind::Return { value: Expression::literal(value) }, Position::new(1, 1))]
}

fn declare(tree: &mut SyntaxTree, name: &str, return_type: ClassifierReturnType, expression: ExprId) {
    let line = tree.declarations.len() + 1;
    tree.push_declaration(Declaration::Classifier(ClassifierDeclaration {
        name: name.into(),
        return_type,
        input_type: "Word".into(),
        parameter: Some("w".into()),
        cache: Default::default(),
        expression,
        position: Position::new(line, 1),
    }));
}

fn declare_features(tree: &mut SyntaxTree) {
    let word = tree.push_expression(
        ExpressionKind::Coded {
            return_type: None,
            parameter: Some("w".into()),
            body: returns("w.form"),
        },
        Position::new(1, 1),
    );
    declare(tree, "Word", ClassifierReturnType::discrete(), word);
    let label = tree.push_expression(
        ExpressionKind::Coded {
            return_type: None,
            parameter: Some("w".into()),
            body: returns("w.tag"),
        },
        Position::new(2, 1),
    );
    declare(tree, "Label", ClassifierReturnType::discrete_of(["NN", "VB"]), label);
}

fn declare_learner(tree: &mut SyntaxTree, name: &str, extractor: &str, mut clauses: Vec<LearningClause>) {
    let extractor = tree.push_expression(ExpressionKind::Name { name: extractor.into() }, Position::new(3, 1));
    let labeler = tree.push_expression(ExpressionKind::Name { name: "Label".into() }, Position::new(3, 1));
    clauses.insert(0, LearningClause::Using { extractor });
    let learner = tree.push_expression(
        ExpressionKind::Learning(LearningExpression {
            labeler: Some(labeler),
            clauses,
        }),
        Position::new(3, 1),
    );
    declare(tree, name, ClassifierReturnType::discrete_of(["NN", "VB"]), learner);
}

fn from_file(data: &Path) -> LearningClause {
    LearningClause::From {
        parser: Instantiation::with_args("JsonLinesParser", [format!("\"{}\"", data.display())]),
        rounds: None,
    }
}

/// A tagger trained from `data` with the given extra clauses
fn create_tagger_tree(data: &Path, extra: Vec<LearningClause>) -> SyntaxTree {
    let mut tree = SyntaxTree::new("tagger.lbj");
    declare_features(&mut tree);
    let mut clauses = vec![from_file(data)];
    clauses.extend(extra);
    declare_learner(&mut tree, "Tagger", "Word", clauses);
    tree
}

fn config(dir: &Path) -> CompilerConfig {
    CompilerConfig::new().with_generated_dir(dir.join("gen")).with_model_dir(dir.join("models"))
}

fn compile(tree: &SyntaxTree, config: CompilerConfig) -> CompileOutcome {
    let outcome = Compiler::new(config).with_registry(registry()).compile(tree);
    assert!(!outcome.fatal, "{:?}", outcome.diagnostics);
    outcome
}

#[test]
fn test_compile_trains_and_writes_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let data = write_training_data(dir.path());
    let config = config(dir.path());
    let tree = create_tagger_tree(&data, vec![]);

    let outcome = compile(&tree, config.clone());
    let report = outcome.training.as_ref().expect("the tagger should be trained");
    assert_eq!(report.trained.len(), 1);
    assert_eq!(report.trained[0].examples, TRAINING_DATA.len());
    assert_eq!(outcome.emitted.len(), 2, "Word and Label are emitted, the tagger is written by training");

    assert!(config.model_path("Tagger").exists());
    assert!(matches!(read_header(&config.artifact_path("Tagger")).unwrap(), Header::Generated(_)));

    let second = compile(&tree, config);
    assert!(second.revision.as_ref().unwrap().no_changes);
    assert!(second.training.is_none());
    assert!(second.emitted.is_empty());
}

#[test]
fn test_rounds_replay_the_data() {
    let dir = tempfile::tempdir().unwrap();
    let data = write_training_data(dir.path());
    let mut tree = SyntaxTree::new("tagger.lbj");
    declare_features(&mut tree);
    declare_learner(
        &mut tree,
        "Tagger",
        "Word",
        vec![
            LearningClause::From {
                parser: Instantiation::with_args("JsonLinesParser", [data.display().to_string()]),
                rounds: Some("3".into()),
            },
            LearningClause::ProgressOutput { interval: "4".into() },
        ],
    );

    let outcome = compile(&tree, config(dir.path()));
    let report = outcome.training.unwrap();
    assert_eq!(report.trained[0].examples, 3 * TRAINING_DATA.len());
}

#[test]
fn test_cross_validation_does_not_change_final_model() {
    let dir = tempfile::tempdir().unwrap();
    let data = write_training_data(dir.path());

    let direct = config(&dir.path().join("direct"));
    compile(&create_tagger_tree(&data, vec![]), direct.clone());
    let expected = fs::read(direct.model_path("Tagger")).unwrap();

    for folds in ["1", "3"] {
        let validated = config(&dir.path().join(format!("cval{folds}")));
        let outcome = compile(
            &create_tagger_tree(
                &data,
                vec![LearningClause::Cval {
                    folds: folds.into(),
                    split: Some("kth".into()),
                }],
            ),
            validated.clone(),
        );

        let trained = &outcome.training.unwrap().trained[0];
        assert_eq!(trained.cross_validation.is_some(), folds == "3");
        assert_eq!(fs::read(validated.model_path("Tagger")).unwrap(), expected, "cval {folds}");
    }
}

#[test]
fn test_cross_validation_report() {
    let dir = tempfile::tempdir().unwrap();
    let data = write_training_data(dir.path());
    let tree = create_tagger_tree(
        &data,
        vec![
            LearningClause::Cval {
                folds: "3".into(),
                split: None,
            },
            LearningClause::Alpha { value: "0.1".into() },
        ],
    );

    let outcome = compile(&tree, config(dir.path()));
    let report = outcome.training.unwrap().trained[0].cross_validation.clone().unwrap();
    assert_eq!(report.scores.len(), 3);
    assert_eq!(report.alpha, 0.1);
    assert!(report.scores.iter().all(|s| (0.0..=1.0).contains(s)));
}

#[test]
fn test_pre_extraction_writes_side_files() {
    let dir = tempfile::tempdir().unwrap();
    let data = write_training_data(dir.path());

    let plain = config(&dir.path().join("plain"));
    compile(&create_tagger_tree(&data, vec![]), plain.clone());

    let extracting = config(&dir.path().join("extracting")).with_pre_extract(true);
    let outcome = compile(&create_tagger_tree(&data, vec![]), extracting.clone());
    assert_eq!(outcome.training.unwrap().trained[0].examples, TRAINING_DATA.len());

    let (examples, lexicon) = extracting.extraction_paths("Tagger");
    assert!(examples.exists());
    assert!(lexicon.exists());
    assert!(!plain.extraction_paths("Tagger").0.exists());
}

#[test]
fn test_clause_overrides_pre_extraction_config() {
    let dir = tempfile::tempdir().unwrap();
    let data = write_training_data(dir.path());
    let config = config(dir.path());
    compile(&create_tagger_tree(&data, vec![LearningClause::PreExtract { enabled: true }]), config.clone());
    assert!(config.extraction_paths("Tagger").0.exists());
}

/// Two learners feeding each other; the first one declared is trained first
fn create_cyclic_tree(data: &Path) -> SyntaxTree {
    let mut tree = SyntaxTree::new("cycle.lbj");
    declare_features(&mut tree);
    declare_learner(&mut tree, "First", "Second", vec![from_file(data)]);
    declare_learner(&mut tree, "Second", "First", vec![from_file(data)]);
    tree
}

fn cyclic_registry() -> ComponentRegistry {
    let mut registry = registry();
    for name in ["First", "Second"] {
        registry.register_classifier(name, move || {
            Ok(Arc::new(move |object: &serde_json::Value| {
                vec![Feature::discrete(name, object["word"].as_str().unwrap_or_default())]
            }))
        });
    }
    registry
}

#[test]
fn test_cycle_broken_by_declaration_order() {
    for concurrent in [false, true] {
        let dir = tempfile::tempdir().unwrap();
        let data = write_training_data(dir.path());
        let config = config(dir.path()).with_concurrent_training(concurrent);

        let outcome = Compiler::new(config).with_registry(cyclic_registry()).compile(&create_cyclic_tree(&data));
        assert!(!outcome.fatal, "{:?}", outcome.diagnostics);

        let report = outcome.training.unwrap();
        let first_done = report.position(&TrainingEvent::Finished("First".into())).unwrap();
        let second_started = report.position(&TrainingEvent::Started("Second".into())).unwrap();
        assert!(first_done < second_started, "concurrent = {concurrent}");
    }
}

#[test]
fn test_concurrent_training_of_independent_learners() {
    let dir = tempfile::tempdir().unwrap();
    let data = write_training_data(dir.path());
    let mut tree = SyntaxTree::new("taggers.lbj");
    declare_features(&mut tree);
    for name in ["A", "B", "C"] {
        declare_learner(&mut tree, name, "Word", vec![from_file(&data)]);
    }

    let config = config(dir.path()).with_concurrent_training(true).with_max_parallel_jobs(2);
    let outcome = compile(&tree, config.clone());
    let report = outcome.training.unwrap();
    assert_eq!(report.trained_names().len(), 3);
    for name in ["A", "B", "C"] {
        assert!(config.model_path(name).exists());
    }
}

#[test]
fn test_unknown_learner_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let data = write_training_data(dir.path());
    let tree = create_tagger_tree(
        &data,
        vec![LearningClause::With {
            learner: Instantiation::new("SparsePerceptron"),
        }],
    );
    let config = config(dir.path());

    let outcome = Compiler::new(config.clone()).with_registry(registry()).compile(&tree);
    assert!(outcome.fatal);
    assert!(outcome.diagnostics.iter().any(|d| d.severity == Severity::Fatal && d.message.contains("SparsePerceptron")));
    assert!(!config.model_path("Tagger").exists());
    assert!(!config.artifact_path("Tagger").exists());
}

#[test]
fn test_semantic_errors_skip_generation() {
    let dir = tempfile::tempdir().unwrap();
    let data = write_training_data(dir.path());
    let mut tree = create_tagger_tree(&data, vec![]);
    let missing = tree.push_expression(ExpressionKind::Name { name: "Missing".into() }, Position::new(9, 1));
    declare(&mut tree, "Broken", ClassifierReturnType::discrete(), missing);
    let config = config(dir.path());

    let outcome = Compiler::new(config.clone()).with_registry(registry()).compile(&tree);
    assert!(!outcome.fatal);
    assert!(outcome.error_count() > 0);
    assert!(outcome.diagnostics.iter().any(|d| d.kind == DiagnosticKind::UnresolvedName));
    assert!(outcome.revision.is_some());
    assert!(outcome.training.is_none());
    assert!(!config.artifact_path("Word").exists());
}

#[test]
fn test_tree_read_from_json() {
    let dir = tempfile::tempdir().unwrap();
    let data = write_training_data(dir.path());
    let tree = create_tagger_tree(&data, vec![]);

    let json = serde_json::to_string_pretty(&tree).unwrap();
    let parsed: SyntaxTree = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, tree);

    let outcome = compile(&parsed, config(dir.path()));
    assert_eq!(outcome.training.unwrap().trained.len(), 1);
}
