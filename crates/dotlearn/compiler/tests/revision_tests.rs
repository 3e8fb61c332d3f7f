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

//! Revision analysis against artifacts written by real compiler runs

use dotlearn_common::{DiagnosticKind, Position};
use dotlearn_compiler::ast::{
    ClassifierDeclaration, Declaration, ExprId, Expression, ExpressionKind, Instantiation, LearningClause, LearningExpression, Statement, StatementKind,
    SyntaxTree,
};
use dotlearn_compiler::{ClassifierReturnType, CompileError, Compiler, CompilerConfig, RevisionAnalyzer, RevisionResult, RevisionStatus, TypeTag};
use std::fs;
use std::path::Path;

fn returns(value: &str) -> Vec<Statement> {
    vec![Statement::new(StatementKind::Return { value: Expression::literal(value) }, Position::new(1, 1))]
}

fn coded(tree: &mut SyntaxTree, body: &str) -> ExprId {
    tree.push_expression(
        ExpressionKind::Coded {
            return_type: None,
            parameter: Some("w".into()),
            body: returns(body),
        },
        Position::new(1, 1),
    )
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

struct Edits<'a> {
    word: &'a str,
    suffix: &'a str,
    shape: &'a str,
    /// Add Shape to the composite feature set
    shape_feature: bool,
}

impl Default for Edits<'_> {
    fn default() -> Self {
        Self {
            word: "w.form",
            suffix: "w.suffix",
            shape: "w.shape",
            shape_feature: false,
        }
    }
}

/// Word, an alias chain over it, a composite feature set and a learner without data
fn create_tree(edits: Edits<'_>) -> SyntaxTree {
    let mut tree = SyntaxTree::new("tagger.lbj");

    let word = coded(&mut tree, edits.word);
    declare(&mut tree, "Word", ClassifierReturnType::discrete(), word);

    let alias = tree.push_expression(ExpressionKind::Name { name: "Word".into() }, Position::new(2, 1));
    declare(&mut tree, "Form", ClassifierReturnType::discrete(), alias);
    let alias = tree.push_expression(ExpressionKind::Name { name: "Form".into() }, Position::new(3, 1));
    declare(&mut tree, "Surface", ClassifierReturnType::discrete(), alias);

    let shape = coded(&mut tree, edits.shape);
    declare(&mut tree, "Shape", ClassifierReturnType::discrete(), shape);

    let first = tree.push_expression(ExpressionKind::Name { name: "Word".into() }, Position::new(5, 1));
    let suffix = tree.push_expression(
        ExpressionKind::Coded {
            return_type: Some(ClassifierReturnType::discrete()),
            parameter: Some("w".into()),
            body: returns(edits.suffix),
        },
        Position::new(5, 1),
    );
    let mut children = vec![first, suffix];
    if edits.shape_feature {
        children.push(tree.push_expression(ExpressionKind::Name { name: "Shape".into() }, Position::new(5, 1)));
    }
    let composite = tree.push_expression(ExpressionKind::Composite { children }, Position::new(5, 1));
    declare(&mut tree, "Features", ClassifierReturnType::new(TypeTag::DiscreteGenerator), composite);

    let extractor = tree.push_expression(ExpressionKind::Name { name: "Features".into() }, Position::new(6, 1));
    let learner = tree.push_expression(
        ExpressionKind::Learning(LearningExpression {
            labeler: None,
            clauses: vec![
                LearningClause::Using { extractor },
                LearningClause::With {
                    learner: Instantiation::new("MajorityVote"),
                },
            ],
        }),
        Position::new(6, 1),
    );
    declare(&mut tree, "Tagger", ClassifierReturnType::discrete(), learner);
    tree
}

fn config(dir: &Path) -> CompilerConfig {
    CompilerConfig::new().with_generated_dir(dir.join("gen")).with_model_dir(dir.join("models"))
}

fn revise(tree: &SyntaxTree, config: &CompilerConfig) -> RevisionResult {
    let compiler = Compiler::new(config.clone());
    let analysis = compiler.analyze(tree);
    assert!(!analysis.has_errors(), "{:?}", analysis.diagnostics.entries());
    RevisionAnalyzer::new(tree, &analysis, config).analyze().expect("revision analysis should succeed")
}

fn compile(tree: &SyntaxTree, config: &CompilerConfig) {
    let outcome = Compiler::new(config.clone()).compile(tree);
    assert!(!outcome.fatal, "{:?}", outcome.diagnostics);
}

#[test]
fn test_first_run_revises_everything() {
    let dir = tempfile::tempdir().unwrap();
    let result = revise(&create_tree(Edits::default()), &config(dir.path()));

    assert!(!result.no_changes);
    for name in ["Word", "Form", "Surface", "Shape", "Features", "tagger$Features$0", "Tagger"] {
        assert_eq!(result.status(name), RevisionStatus::Revised, "{name}");
    }
}

#[test]
fn test_revision_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let tree = create_tree(Edits::default());
    compile(&tree, &config);

    for _ in 0..2 {
        let result = revise(&tree, &config);
        assert!(result.no_changes);
        assert!(!result.statuses.is_empty());
        assert!(result.statuses.values().all(|&s| s == RevisionStatus::Unaffected), "{:?}", result.statuses);
    }
}

#[test]
fn test_edit_without_dependors_revises_only_itself() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    compile(&create_tree(Edits::default()), &config);

    let edited = create_tree(Edits {
        shape: "w.shape.lowercase",
        ..Default::default()
    });
    let result = revise(&edited, &config);

    assert!(!result.no_changes);
    for (name, status) in &result.statuses {
        let expected = if name == "Shape" { RevisionStatus::Revised } else { RevisionStatus::Unaffected };
        assert_eq!(*status, expected, "{name}");
    }
}

#[test]
fn test_propagation_along_dependor_chain() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    compile(&create_tree(Edits::default()), &config);

    let result = revise(
        &create_tree(Edits {
            word: "w.form.lowercase",
            ..Default::default()
        }),
        &config,
    );

    assert_eq!(result.status("Word"), RevisionStatus::Revised);
    assert!(result.status("Form") >= RevisionStatus::Affected);
    assert!(result.status("Surface") >= RevisionStatus::Affected);
    assert_eq!(result.status("Features"), RevisionStatus::Affected);
    // the composite was only affected, so the learner is too
    assert_eq!(result.status("Tagger"), RevisionStatus::Affected);
    assert_eq!(result.status("Shape"), RevisionStatus::Unaffected);
}

#[test]
fn test_revised_composite_revises_learner() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    compile(&create_tree(Edits::default()), &config);

    let result = revise(
        &create_tree(Edits {
            shape_feature: true,
            ..Default::default()
        }),
        &config,
    );

    assert_eq!(result.status("Features"), RevisionStatus::Revised);
    assert_eq!(result.status("Tagger"), RevisionStatus::Revised);
    assert_eq!(result.status("tagger$Features$0"), RevisionStatus::Unaffected);
    assert_eq!(result.status("Word"), RevisionStatus::Unaffected);

    // an edited inline child leaves the composite's own shape alone
    let result = revise(
        &create_tree(Edits {
            suffix: "w.suffix(3)",
            ..Default::default()
        }),
        &config,
    );
    assert_eq!(result.status("tagger$Features$0"), RevisionStatus::Revised);
    assert_eq!(result.status("Features"), RevisionStatus::Affected);
    assert_eq!(result.status("Tagger"), RevisionStatus::Affected);
}

#[test]
fn test_code_revision_cases() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let tree = create_tree(Edits::default());
    compile(&tree, &config);

    let analysis = Compiler::new(config.clone()).analyze(&tree);
    let analyzer = RevisionAnalyzer::new(&tree, &analysis, &config);
    let shape = analysis.generator("Shape").unwrap();
    let fingerprint = analyzer.fingerprint(shape);
    let artifact = config.artifact_path("Shape");

    assert_eq!(analyzer.code_revision(shape, &fingerprint).unwrap(), None);

    let contents = fs::read_to_string(&artifact).unwrap();
    let mut lines: Vec<&str> = contents.lines().collect();
    lines[1] = "// 789c030000000001";
    fs::write(&artifact, lines.join("\n")).unwrap();
    assert_eq!(analyzer.code_revision(shape, &fingerprint).unwrap(), Some(RevisionStatus::Revised));

    fs::write(&artifact, "// hand written\nfn shape() {}\n").unwrap();
    assert!(matches!(analyzer.code_revision(shape, &fingerprint), Err(CompileError::ProtectedOverwrite { .. })));

    fs::remove_file(&artifact).unwrap();
    assert_eq!(analyzer.code_revision(shape, &fingerprint).unwrap(), Some(RevisionStatus::Revised));
}

#[test]
fn test_missing_learner_state_revises_learner() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let tree = create_tree(Edits::default());
    compile(&tree, &config);

    fs::remove_file(config.model_path("Tagger")).unwrap();
    let result = revise(&tree, &config);
    assert_eq!(result.status("Tagger"), RevisionStatus::Revised);
    assert_eq!(result.status("Features"), RevisionStatus::Unaffected);
}

#[test]
fn test_protected_artifact_is_never_overwritten() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let tree = create_tree(Edits::default());
    compile(&tree, &config);

    let artifact = config.artifact_path("Shape");
    let hand_written = "// my own shape classifier\nfn shape() {}\n";
    fs::write(&artifact, hand_written).unwrap();

    let edited = create_tree(Edits {
        shape: "w.shape.lowercase",
        ..Default::default()
    });
    let outcome = Compiler::new(config.clone()).compile(&edited);

    assert!(!outcome.fatal);
    assert!(outcome.diagnostics.iter().any(|d| d.kind == DiagnosticKind::ProtectedOverwrite));
    assert!(outcome.revision.as_ref().unwrap().is_protected("Shape"));
    assert_eq!(fs::read_to_string(&artifact).unwrap(), hand_written);
}

#[test]
fn test_hand_edited_learner_without_state_is_protected() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let tree = create_tree(Edits::default());
    compile(&tree, &config);

    let artifact = config.artifact_path("Tagger");
    let hand_written = "// my hand-written tagger\nfn tag() {}\n";
    fs::write(&artifact, hand_written).unwrap();
    fs::remove_file(config.model_path("Tagger")).unwrap();

    let outcome = Compiler::new(config.clone()).compile(&tree);
    assert!(!outcome.fatal, "{:?}", outcome.diagnostics);
    assert!(outcome.revision.as_ref().unwrap().is_protected("Tagger"));
    assert_eq!(fs::read_to_string(&artifact).unwrap(), hand_written);
    assert!(!config.model_path("Tagger").exists());
}

#[test]
fn test_non_utf8_artifact_is_protected_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let tree = create_tree(Edits::default());
    compile(&tree, &config);

    let artifact = config.artifact_path("Shape");
    let hand_written: &[u8] = b"// \xff\xfe hand written\nfn shape() {}\n";
    fs::write(&artifact, hand_written).unwrap();

    let outcome = Compiler::new(config.clone()).compile(&tree);
    assert!(!outcome.fatal, "{:?}", outcome.diagnostics);
    assert!(outcome.diagnostics.iter().any(|d| d.kind == DiagnosticKind::ProtectedOverwrite));
    assert!(outcome.revision.as_ref().unwrap().is_protected("Shape"));
    assert_eq!(fs::read(&artifact).unwrap(), hand_written);
}
