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

//! Training jobs and the dependency DAG between them

use crate::emit::ArtifactSpec;
use crate::revision::{RevisionResult, RevisionStatus};
use crate::semantic::{Analysis, DependorGraph, LearningSpec};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

/// One learner awaiting training
#[derive(Debug, Clone)]
pub struct TrainingJob {
    pub name: String,
    /// Declaration order; earlier declarations win when breaking cycles
    pub order: usize,
    pub spec: Arc<LearningSpec>,
    /// Artifact to write once training has finished
    pub artifact: ArtifactSpec,
    /// Jobs that must finish before this one starts
    pub dependencies: BTreeSet<String>,
}

/// Whether a learner must be retrained this run
///
/// A learner without a data source has nothing new to learn from, so only an edit
/// of its own definition retrains it.
pub fn needs_training(spec: &LearningSpec, status: RevisionStatus) -> bool {
    match spec.parser {
        Some(_) => status != RevisionStatus::Unaffected,
        None => status == RevisionStatus::Revised,
    }
}

/// Select the learners to train and link them into a DAG
pub fn plan_jobs(analysis: &Analysis, revision: &RevisionResult) -> Vec<TrainingJob> {
    let mut jobs: Vec<TrainingJob> = analysis
        .learning
        .values()
        .filter(|spec| !revision.is_protected(&spec.name) && needs_training(spec, revision.status(&spec.name)))
        .filter_map(|spec| {
            let generator = analysis.generator(&spec.name)?;
            let fingerprint = revision.fingerprints.get(&spec.name)?.clone();
            Some(TrainingJob {
                name: spec.name.clone(),
                order: generator.order,
                spec: Arc::new(spec.clone()),
                artifact: ArtifactSpec::new(generator, analysis.invoked.invokees(&spec.name), fingerprint),
                dependencies: BTreeSet::new(),
            })
        })
        .collect();

    link_jobs(&mut jobs, &analysis.dependor);
    jobs
}

/// Fill in each job's dependencies from pairwise reachability over the dependor graph
///
/// When two jobs reach each other the later-declared one depends on the earlier one,
/// never the other way around. Jobs come back in declaration order.
pub fn link_jobs(jobs: &mut [TrainingJob], graph: &DependorGraph) {
    jobs.sort_by(|a, b| b.order.cmp(&a.order));

    for i in 0..jobs.len() {
        for j in (i + 1)..jobs.len() {
            // jobs[i] was declared after jobs[j]
            let later_needs_earlier = graph.depends_on(&jobs[i].name, &jobs[j].name);
            let earlier_needs_later = graph.depends_on(&jobs[j].name, &jobs[i].name);

            if later_needs_earlier {
                let earlier = jobs[j].name.clone();
                jobs[i].dependencies.insert(earlier);
            } else if earlier_needs_later {
                let later = jobs[i].name.clone();
                jobs[j].dependencies.insert(later);
            }
        }
    }

    jobs.sort_by_key(|job| job.order);
    for job in jobs.iter() {
        debug!(name = %job.name, dependencies = ?job.dependencies, "training job planned");
    }
}
