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

//! Incremental revision analysis
//!
//! Decides for every code generator whether its artifact is current (UNAFFECTED),
//! must be regenerated because something it depends on changed (AFFECTED), or was
//! itself edited (REVISED). Statuses only ever move upward within a run.

pub mod fingerprint;

use crate::ast::SyntaxTree;
use crate::config::CompilerConfig;
use crate::error::{CompileError, CompileResult};
use crate::semantic::{Analysis, CodeGenerator, GeneratorKind};
use dotlearn_common::{DiagnosticKind, Diagnostics};
use fingerprint::{Encoding, Fingerprint, Header, read_header};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;
use tracing::{debug, info};

/// Outcome of revision analysis for one name, ordered by severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RevisionStatus {
    Unaffected,
    Affected,
    Revised,
}

impl fmt::Display for RevisionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RevisionStatus::Unaffected => "UNAFFECTED",
            RevisionStatus::Affected => "AFFECTED",
            RevisionStatus::Revised => "REVISED",
        })
    }
}

/// Statuses of every name in the dependor graph
#[derive(Debug, Default)]
pub struct RevisionResult {
    pub statuses: BTreeMap<String, RevisionStatus>,
    /// True iff no declaration was found REVISED before propagation
    pub no_changes: bool,
    /// Declarations whose artifact must not be overwritten this run
    pub protected: BTreeSet<String>,
    /// Current fingerprint of every code generator
    pub fingerprints: BTreeMap<String, Fingerprint>,
    pub diagnostics: Diagnostics,
}

impl RevisionResult {
    pub fn status(&self, name: &str) -> RevisionStatus {
        self.statuses.get(name).copied().unwrap_or(RevisionStatus::Unaffected)
    }

    pub fn is_protected(&self, name: &str) -> bool {
        self.protected.contains(name)
    }

    pub fn count(&self, status: RevisionStatus) -> usize {
        self.statuses.values().filter(|&&s| s == status).count()
    }
}

/// Compares current fingerprints with those recorded in existing artifacts
pub struct RevisionAnalyzer<'a> {
    tree: &'a SyntaxTree,
    analysis: &'a Analysis,
    config: &'a CompilerConfig,
}

impl<'a> RevisionAnalyzer<'a> {
    pub fn new(tree: &'a SyntaxTree, analysis: &'a Analysis, config: &'a CompilerConfig) -> Self {
        Self { tree, analysis, config }
    }

    /// Current fingerprint of a code generator
    pub fn fingerprint(&self, generator: &CodeGenerator) -> Fingerprint {
        Fingerprint::new(self.analysis.shape_of(self.tree, generator), Encoding::for_kind(generator.kind))
    }

    /// Compare one code generator against its artifact on disk
    ///
    /// Returns `Some(Revised)` when the artifact is missing or stale and `None` when it
    /// is current. A learner also needs its learned-state file to be current. An existing
    /// artifact with a foreign header is protected even if the learned state is gone.
    pub fn code_revision(&self, generator: &CodeGenerator, fingerprint: &Fingerprint) -> CompileResult<Option<RevisionStatus>> {
        let artifact = self.config.artifact_path(&generator.name);
        if !artifact.exists() {
            return Ok(Some(RevisionStatus::Revised));
        }

        let current = match read_header(&artifact)? {
            Header::Foreign => return Err(CompileError::ProtectedOverwrite { path: artifact }),
            Header::Generated(encoded) => fingerprint.matches(&encoded),
        };
        if generator.kind == GeneratorKind::Learning && !self.config.model_path(&generator.name).exists() {
            return Ok(Some(RevisionStatus::Revised));
        }
        Ok(if current { None } else { Some(RevisionStatus::Revised) })
    }

    /// Run the whole analysis
    ///
    /// Only I/O errors are returned; protected artifacts are reported as diagnostics.
    pub fn analyze(&self) -> CompileResult<RevisionResult> {
        let mut result = RevisionResult {
            diagnostics: Diagnostics::new("revision"),
            ..Default::default()
        };

        let mut revised = Vec::new();
        for generator in &self.analysis.generators {
            let fingerprint = self.fingerprint(generator);
            match self.code_revision(generator, &fingerprint) {
                Ok(Some(status)) => {
                    debug!(name = %generator.name, %status, "fingerprint differs");
                    result.statuses.insert(generator.name.clone(), status);
                    revised.push(generator.name.clone());
                }
                Ok(None) => {}
                Err(CompileError::ProtectedOverwrite { path }) => {
                    result.diagnostics.error(
                        DiagnosticKind::ProtectedOverwrite,
                        generator.position,
                        format!("{} does not appear to have been generated by dotlearn; `{}` will not be regenerated", path.display(), generator.name),
                    );
                    result.protected.insert(generator.name.clone());
                }
                Err(error) => return Err(error),
            }
            result.fingerprints.insert(generator.name.clone(), fingerprint);
        }
        result.no_changes = revised.is_empty();

        self.propagate(&mut result.statuses, revised);

        for name in self.analysis.dependor.names() {
            result.statuses.entry(name).or_insert(RevisionStatus::Unaffected);
        }

        info!(
            revised = result.count(RevisionStatus::Revised),
            affected = result.count(RevisionStatus::Affected),
            unaffected = result.count(RevisionStatus::Unaffected),
            protected = result.protected.len(),
            "revision analysis finished"
        );
        Ok(result)
    }

    /// Push statuses forward along dependor edges
    ///
    /// Dependors become AFFECTED, except that a learner fed by a REVISED composite
    /// generator becomes REVISED: its learned state is stale, not just its wrapper.
    pub fn propagate(&self, statuses: &mut BTreeMap<String, RevisionStatus>, seeds: Vec<String>) {
        let mut queue: VecDeque<String> = seeds.into();
        while let Some(name) = queue.pop_front() {
            let Some(&status) = statuses.get(&name) else {
                continue;
            };
            let source_is_composite = self.kind_of(&name) == Some(GeneratorKind::Composite);

            for dependor in self.analysis.dependor.dependors(&name) {
                let proposed = if status == RevisionStatus::Revised && source_is_composite && self.kind_of(&dependor) == Some(GeneratorKind::Learning) {
                    RevisionStatus::Revised
                } else {
                    RevisionStatus::Affected
                };
                if statuses.get(&dependor).is_none_or(|&current| current < proposed) {
                    statuses.insert(dependor.clone(), proposed);
                    queue.push_back(dependor);
                }
            }
        }
    }

    fn kind_of(&self, name: &str) -> Option<GeneratorKind> {
        self.analysis.generator(name).map(|g| g.kind)
    }
}
