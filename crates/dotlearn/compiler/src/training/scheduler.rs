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

//! Dependency-ordered execution of training jobs
//!
//! Jobs are released once every job they depend on has finished. Sequential mode
//! runs released jobs one at a time on the calling thread. Concurrent mode hands
//! each released job to the tokio blocking pool, bounded by a semaphore, and the
//! job releases its own dependents when it finishes.

use super::job::TrainingJob;
use super::work::{JobContext, TrainedLearner, run_job};
use crate::error::{CompileError, CompileResult};
use metrics::counter;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Progress of one job, in the order observed by the scheduler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrainingEvent {
    Started(String),
    Finished(String),
    Failed(String),
}

impl TrainingEvent {
    pub fn name(&self) -> &str {
        match self {
            TrainingEvent::Started(name) | TrainingEvent::Finished(name) | TrainingEvent::Failed(name) => name,
        }
    }
}

/// A job that did not complete
#[derive(Debug)]
pub struct JobFailure {
    pub name: String,
    pub error: CompileError,
}

/// Everything that happened during one scheduler run
#[derive(Debug, Default)]
pub struct TrainingReport {
    pub events: Vec<TrainingEvent>,
    pub trained: Vec<TrainedLearner>,
    pub failures: Vec<JobFailure>,
    /// Jobs never started because an earlier job failed
    pub skipped: Vec<String>,
}

impl TrainingReport {
    /// Any failure is fatal for the run
    pub fn is_fatal(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Position of an event in the log
    pub fn position(&self, event: &TrainingEvent) -> Option<usize> {
        self.events.iter().position(|e| e == event)
    }

    pub fn trained_names(&self) -> BTreeSet<&str> {
        self.trained.iter().map(|t| t.name.as_str()).collect()
    }
}

struct SchedulerState {
    /// Unfinished dependencies of every job not yet released
    dependencies: Mutex<BTreeMap<String, BTreeSet<String>>>,
    /// Jobs not yet released; always locked after `dependencies`
    pending: Mutex<BTreeMap<String, TrainingJob>>,
    events: Mutex<Vec<TrainingEvent>>,
    trained: Mutex<Vec<TrainedLearner>>,
    failures: Mutex<Vec<JobFailure>>,
    fatal: AtomicBool,
    permits: Arc<Semaphore>,
    context: JobContext,
}

impl SchedulerState {
    /// Drop `completed` from every remaining dependency set and take the jobs left with none
    fn release(&self, completed: Option<&str>) -> Vec<TrainingJob> {
        let mut dependencies = self.dependencies.lock();
        let mut pending = self.pending.lock();

        let ready: Vec<String> = dependencies
            .iter_mut()
            .filter_map(|(name, unfinished)| {
                if let Some(completed) = completed {
                    unfinished.remove(completed);
                }
                unfinished.is_empty().then(|| name.clone())
            })
            .collect();

        let mut jobs: Vec<TrainingJob> = ready
            .iter()
            .filter_map(|name| {
                dependencies.remove(name);
                pending.remove(name)
            })
            .collect();
        jobs.sort_by_key(|job| job.order);
        jobs
    }

    fn is_fatal(&self) -> bool {
        self.fatal.load(Ordering::SeqCst)
    }

    fn record(&self, event: TrainingEvent) {
        self.events.lock().push(event);
    }

    fn record_failure(&self, name: &str, error: CompileError) {
        error!(name, %error, "training job failed");
        counter!("dotlearn_training_jobs_failed", 1);
        self.record(TrainingEvent::Failed(name.to_string()));
        self.failures.lock().push(JobFailure {
            name: name.to_string(),
            error,
        });
        self.fatal.store(true, Ordering::SeqCst);
    }

    /// Run one job to completion on the current thread; false if it failed
    fn execute(&self, job: TrainingJob) -> bool {
        self.record(TrainingEvent::Started(job.name.clone()));
        match run_job(&job, &self.context) {
            Ok(trained) => {
                counter!("dotlearn_training_jobs_finished", 1);
                self.record(TrainingEvent::Finished(job.name.clone()));
                self.trained.lock().push(trained);
                true
            }
            Err(error) => {
                self.record_failure(&job.name, error);
                false
            }
        }
    }

    fn report(&self, leftover: impl IntoIterator<Item = TrainingJob>) -> TrainingReport {
        let mut skipped: Vec<String> = leftover.into_iter().map(|job| job.name).collect();
        skipped.extend(self.pending.lock().keys().cloned());
        skipped.sort();

        if !skipped.is_empty() {
            warn!(count = skipped.len(), "training jobs skipped after failure");
        }

        TrainingReport {
            events: std::mem::take(&mut *self.events.lock()),
            trained: std::mem::take(&mut *self.trained.lock()),
            failures: std::mem::take(&mut *self.failures.lock()),
            skipped,
        }
    }
}

type JobTask = Pin<Box<dyn Future<Output = ()> + Send>>;
type HandleSender = mpsc::UnboundedSender<(String, JoinHandle<()>)>;

/// Hand each job to the runtime; the handles go to the driver so it can await them
fn dispatch(state: &Arc<SchedulerState>, jobs: Vec<TrainingJob>, handles: &HandleSender) {
    for job in jobs {
        let name = job.name.clone();
        let handle = tokio::spawn(job_task(state.clone(), job, handles.clone()));
        if handles.send((name, handle)).is_err() {
            warn!("scheduler driver stopped before all jobs were dispatched");
        }
    }
}

fn job_task(state: Arc<SchedulerState>, job: TrainingJob, handles: HandleSender) -> JobTask {
    Box::pin(async move {
        let name = job.name.clone();
        let permit = match state.permits.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                error!(name = %name, %e, "semaphore closed");
                state.record_failure(&name, CompileError::Interrupted(name.clone()));
                return;
            }
        };

        let worker = state.clone();
        let succeeded = match tokio::task::spawn_blocking(move || worker.execute(job)).await {
            Ok(succeeded) => succeeded,
            Err(e) => {
                error!(name = %name, %e, "training task did not complete");
                state.record_failure(&name, CompileError::Interrupted(name.clone()));
                false
            }
        };
        drop(permit);

        if succeeded && !state.is_fatal() {
            let ready = state.release(Some(&name));
            dispatch(&state, ready, &handles);
        }
    })
}

/// Runs a set of linked training jobs
pub struct TrainingScheduler {
    state: Arc<SchedulerState>,
    job_count: usize,
}

impl TrainingScheduler {
    pub fn new(jobs: Vec<TrainingJob>, context: JobContext) -> Self {
        let max_parallel_jobs = context.config.max_parallel_jobs.max(1);
        let job_count = jobs.len();
        let dependencies = jobs.iter().map(|job| (job.name.clone(), job.dependencies.clone())).collect();
        let pending = jobs.into_iter().map(|job| (job.name.clone(), job)).collect();

        Self {
            state: Arc::new(SchedulerState {
                dependencies: Mutex::new(dependencies),
                pending: Mutex::new(pending),
                events: Mutex::new(Vec::new()),
                trained: Mutex::new(Vec::new()),
                failures: Mutex::new(Vec::new()),
                fatal: AtomicBool::new(false),
                permits: Arc::new(Semaphore::new(max_parallel_jobs)),
                context,
            }),
            job_count,
        }
    }

    pub fn job_count(&self) -> usize {
        self.job_count
    }

    /// Release the jobs made ready by `completed` finishing, or the initially ready ones for `None`
    pub fn release(&self, completed: Option<&str>) -> Vec<TrainingJob> {
        self.state.release(completed)
    }

    /// Train jobs one after another in dependency order
    pub fn run_sequential(self) -> TrainingReport {
        info!(jobs = self.job_count, "training sequentially");
        let mut ready: VecDeque<TrainingJob> = self.state.release(None).into();

        while let Some(job) = ready.pop_front() {
            let name = job.name.clone();
            if !self.state.execute(job) {
                break;
            }
            ready.extend(self.state.release(Some(&name)));
        }

        self.state.report(ready)
    }

    /// Train independent jobs in parallel; returns once every dispatched job has finished
    pub async fn run_concurrent(self) -> TrainingReport {
        info!(jobs = self.job_count, permits = self.state.permits.available_permits(), "training concurrently");
        let (sender, mut receiver) = mpsc::unbounded_channel();

        let initial = self.state.release(None);
        dispatch(&self.state, initial, &sender);
        drop(sender);

        while let Some((name, handle)) = receiver.recv().await {
            if let Err(e) = handle.await {
                error!(name = %name, %e, "dispatched job was lost");
                self.state.record_failure(&name, CompileError::Interrupted(name.clone()));
            }
        }

        self.state.report(Vec::new())
    }

    /// Run in the configured mode, driving a dedicated runtime for concurrent training
    pub fn run(self) -> CompileResult<TrainingReport> {
        if !self.state.context.config.concurrent_training {
            return Ok(self.run_sequential());
        }

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(|e| CompileError::Internal(format!("failed to start training runtime: {e}")))?;
        Ok(runtime.block_on(self.run_concurrent()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Instantiation;
    use crate::config::CompilerConfig;
    use crate::emit::{ArtifactSpec, ArtifactWriter, SummaryEmitter};
    use crate::revision::fingerprint::{Encoding, Fingerprint};
    use crate::semantic::{GeneratorKind, LearningSpec};
    use crate::types::ClassifierReturnType;
    use dotlearn_learning::ComponentRegistry;

    fn job(name: &str, order: usize, learner: &str, dependencies: &[&str]) -> TrainingJob {
        TrainingJob {
            name: name.to_string(),
            order,
            spec: Arc::new(LearningSpec {
                name: name.to_string(),
                expression: crate::ast::ExprId(order),
                order,
                return_type: ClassifierReturnType::discrete(),
                input_type: "Word".to_string(),
                extractor: None,
                labeler: None,
                learner: Instantiation::new(learner),
                parser: None,
                rounds: 1,
                evaluate: None,
                cross_validation: None,
                pre_extract: None,
                progress_interval: None,
            }),
            artifact: ArtifactSpec {
                name: name.to_string(),
                kind: GeneratorKind::Learning,
                input_type: Some("Word".to_string()),
                return_type: Some(ClassifierReturnType::discrete()),
                invokes: BTreeSet::new(),
                fingerprint: Fingerprint::new(format!("discrete {name}(Word) <- learn"), Encoding::Compressed),
            },
            dependencies: dependencies.iter().map(|d| d.to_string()).collect(),
        }
    }

    fn context(dir: &std::path::Path, concurrent: bool) -> JobContext {
        let config = CompilerConfig::new()
            .with_generated_dir(dir.join("gen"))
            .with_model_dir(dir.join("models"))
            .with_concurrent_training(concurrent)
            .with_max_parallel_jobs(4);
        let writer = ArtifactWriter::new(&config, Arc::new(SummaryEmitter));
        JobContext::new(Arc::new(ComponentRegistry::with_builtins()), Arc::new(config), writer)
    }

    fn diamond() -> Vec<TrainingJob> {
        vec![
            job("Base", 0, "MajorityVote", &[]),
            job("Left", 1, "MajorityVote", &["Base"]),
            job("Right", 2, "MajorityVote", &["Base"]),
            job("Top", 3, "MajorityVote", &["Left", "Right"]),
        ]
    }

    fn assert_dependencies_respected(report: &TrainingReport, jobs: &[TrainingJob]) {
        for job in jobs {
            let started = report.position(&TrainingEvent::Started(job.name.clone())).unwrap();
            for dependency in &job.dependencies {
                let finished = report.position(&TrainingEvent::Finished(dependency.clone())).unwrap();
                assert!(finished < started, "{} started before {} finished", job.name, dependency);
            }
        }
    }

    #[test]
    fn test_release_is_dependency_driven() {
        let dir = tempfile::tempdir().unwrap();
        let scheduler = TrainingScheduler::new(diamond(), context(dir.path(), false));

        let first: Vec<String> = scheduler.release(None).into_iter().map(|j| j.name).collect();
        assert_eq!(first, vec!["Base"]);
        let second: Vec<String> = scheduler.release(Some("Base")).into_iter().map(|j| j.name).collect();
        assert_eq!(second, vec!["Left", "Right"]);
        assert!(scheduler.release(Some("Left")).is_empty());
        let last: Vec<String> = scheduler.release(Some("Right")).into_iter().map(|j| j.name).collect();
        assert_eq!(last, vec!["Top"]);
        assert!(scheduler.release(Some("Top")).is_empty());
    }

    #[test]
    fn test_sequential_run_follows_dag() {
        let dir = tempfile::tempdir().unwrap();
        let jobs = diamond();
        let report = TrainingScheduler::new(jobs.clone(), context(dir.path(), false)).run().unwrap();

        assert!(!report.is_fatal());
        assert_eq!(report.trained.len(), 4);
        assert_dependencies_respected(&report, &jobs);
        assert!(dir.path().join("models/Top.lc").exists());
        assert!(dir.path().join("gen/Top.rs").exists());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_concurrent_run_follows_dag() {
        let dir = tempfile::tempdir().unwrap();
        let jobs = diamond();
        let report = TrainingScheduler::new(jobs.clone(), context(dir.path(), true)).run_concurrent().await;

        assert!(!report.is_fatal());
        assert_eq!(report.trained_names(), BTreeSet::from(["Base", "Left", "Right", "Top"]));
        assert_eq!(report.events.len(), 8);
        assert_dependencies_respected(&report, &jobs);
    }

    #[test]
    fn test_failure_stops_dependents() {
        let dir = tempfile::tempdir().unwrap();
        let jobs = vec![
            job("Broken", 0, "NoSuchLearner", &[]),
            job("Dependent", 1, "MajorityVote", &["Broken"]),
        ];
        let report = TrainingScheduler::new(jobs, context(dir.path(), false)).run_sequential();

        assert!(report.is_fatal());
        assert_eq!(report.failures[0].name, "Broken");
        assert!(matches!(report.failures[0].error, CompileError::Learning(_)));
        assert_eq!(report.skipped, vec!["Dependent"]);
        assert!(report.position(&TrainingEvent::Started("Dependent".to_string())).is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_concurrent_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let jobs = vec![
            job("Broken", 0, "Accuracy", &[]),
            job("Dependent", 1, "MajorityVote", &["Broken"]),
        ];
        let report = TrainingScheduler::new(jobs, context(dir.path(), true)).run_concurrent().await;

        assert!(report.is_fatal());
        assert_eq!(report.skipped, vec!["Dependent"]);
        assert!(!dir.path().join("gen/Dependent.rs").exists());
    }

    #[test]
    fn test_empty_run() {
        let dir = tempfile::tempdir().unwrap();
        let report = TrainingScheduler::new(Vec::new(), context(dir.path(), true)).run().unwrap();
        assert!(report.events.is_empty());
        assert!(!report.is_fatal());
    }
}
