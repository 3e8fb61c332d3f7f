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

//! The compiler pass pipeline
//!
//! Semantic analysis, revision analysis, code emission and training run in that
//! order on the calling thread. Each pass flushes its diagnostics when it finishes,
//! and a fatal finding keeps the following passes from starting.

use crate::ast::SyntaxTree;
use crate::config::CompilerConfig;
use crate::emit::{ArtifactSpec, ArtifactWriter, CodeEmitter, SummaryEmitter};
use crate::error::{CompileError, CompileResult};
use crate::revision::{RevisionAnalyzer, RevisionResult, RevisionStatus};
use crate::semantic::{Analysis, SemanticAnalyzer};
use crate::training::{JobContext, TrainingReport, TrainingScheduler, plan_jobs};
use dotlearn_common::{Diagnostic, DiagnosticKind, Diagnostics, Severity};
use dotlearn_learning::ComponentRegistry;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Results of every pass that ran
#[derive(Debug)]
pub struct CompileOutcome {
    pub analysis: Analysis,
    pub revision: Option<RevisionResult>,
    /// Artifacts written by the emission pass (trained learners are in `training`)
    pub emitted: Vec<PathBuf>,
    pub training: Option<TrainingReport>,
    /// Every finding of every pass, in flush order
    pub diagnostics: Vec<Diagnostic>,
    pub fatal: bool,
}

impl CompileOutcome {
    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.severity >= Severity::Error).count()
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.severity == Severity::Warning).count()
    }
}

/// Runs the passes over syntax trees
#[derive(Clone)]
pub struct Compiler {
    config: Arc<CompilerConfig>,
    registry: Arc<ComponentRegistry>,
    emitter: Arc<dyn CodeEmitter>,
}

impl Compiler {
    /// Create a compiler with the baseline learning components and the summary emitter
    pub fn new(config: CompilerConfig) -> Self {
        Self {
            config: Arc::new(config),
            registry: Arc::new(ComponentRegistry::with_builtins()),
            emitter: Arc::new(SummaryEmitter),
        }
    }

    pub fn with_registry(mut self, registry: ComponentRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    pub fn with_emitter(mut self, emitter: Arc<dyn CodeEmitter>) -> Self {
        self.emitter = emitter;
        self
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Semantic analysis only
    pub fn analyze(&self, tree: &SyntaxTree) -> Analysis {
        SemanticAnalyzer::new(tree, &self.config).analyze()
    }

    /// Run every pass
    #[instrument(skip(self, tree), fields(source = %tree.base_name()))]
    pub fn compile(&self, tree: &SyntaxTree) -> CompileOutcome {
        let mut analysis = self.analyze(tree);
        let mut outcome_diagnostics = analysis.diagnostics.flush();
        let semantic_errors = outcome_diagnostics.iter().any(|d| d.severity >= Severity::Error);

        let mut outcome = CompileOutcome {
            fatal: outcome_diagnostics.iter().any(|d| d.severity == Severity::Fatal),
            analysis,
            revision: None,
            emitted: Vec::new(),
            training: None,
            diagnostics: Vec::new(),
        };
        outcome.diagnostics.append(&mut outcome_diagnostics);
        if outcome.fatal {
            return outcome;
        }

        let revision = RevisionAnalyzer::new(tree, &outcome.analysis, &self.config).analyze();
        let mut revision = match revision {
            Ok(revision) => revision,
            Err(error) => {
                self.fail(&mut outcome, "revision", error.to_string());
                return outcome;
            }
        };
        outcome.diagnostics.extend(revision.diagnostics.flush());

        if semantic_errors {
            warn!("semantic errors present; skipping code generation and training");
            outcome.revision = Some(revision);
            return outcome;
        }
        if revision.no_changes {
            info!("no declarations changed");
        }

        let jobs = plan_jobs(&outcome.analysis, &revision);
        let training: BTreeSet<String> = jobs.iter().map(|job| job.name.clone()).collect();
        let writer = ArtifactWriter::new(&self.config, self.emitter.clone());

        let mut emission = Diagnostics::new("emission");
        let emitted = self.emit(&outcome.analysis, &revision, &training, &writer, &mut emission);
        outcome.diagnostics.extend(emission.flush());
        match emitted {
            Ok(paths) => outcome.emitted = paths,
            Err(error) => {
                self.fail(&mut outcome, "emission", error.to_string());
                outcome.revision = Some(revision);
                return outcome;
            }
        }
        outcome.revision = Some(revision);

        if jobs.is_empty() {
            return outcome;
        }

        let context = JobContext::new(self.registry.clone(), self.config.clone(), writer);
        match TrainingScheduler::new(jobs, context).run() {
            Ok(report) => {
                let mut diagnostics = Diagnostics::new("training");
                for failure in &report.failures {
                    diagnostics.fatal(format!("training `{}` failed: {}", failure.name, failure.error));
                }
                outcome.fatal |= report.is_fatal();
                outcome.diagnostics.extend(diagnostics.flush());
                info!(trained = report.trained.len(), skipped = report.skipped.len(), "training finished");
                outcome.training = Some(report);
            }
            Err(error) => self.fail(&mut outcome, "training", error.to_string()),
        }

        outcome
    }

    /// Write artifacts of changed generators that are neither protected nor about to be retrained
    fn emit(
        &self,
        analysis: &Analysis,
        revision: &RevisionResult,
        training: &BTreeSet<String>,
        writer: &ArtifactWriter,
        diagnostics: &mut Diagnostics,
    ) -> CompileResult<Vec<PathBuf>> {
        let mut written = Vec::new();
        for generator in &analysis.generators {
            let name = &generator.name;
            if revision.status(name) == RevisionStatus::Unaffected || revision.is_protected(name) || training.contains(name) {
                continue;
            }
            let Some(fingerprint) = revision.fingerprints.get(name) else {
                continue;
            };
            let artifact = ArtifactSpec::new(generator, analysis.invoked.invokees(name), fingerprint.clone());
            match writer.write(&artifact) {
                Ok(path) => written.push(path),
                Err(CompileError::ProtectedOverwrite { path }) => diagnostics.error(
                    DiagnosticKind::ProtectedOverwrite,
                    generator.position,
                    format!("{} does not appear to have been generated by dotlearn; `{name}` was not regenerated", path.display()),
                ),
                Err(error) => return Err(error),
            }
        }
        info!(count = written.len(), "artifacts emitted");
        Ok(written)
    }

    fn fail(&self, outcome: &mut CompileOutcome, pass: &str, message: String) {
        let mut diagnostics = Diagnostics::new(pass);
        diagnostics.fatal(message);
        outcome.diagnostics.extend(diagnostics.flush());
        outcome.fatal = true;
    }
}

impl std::fmt::Debug for Compiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compiler").field("config", &self.config).finish_non_exhaustive()
    }
}
