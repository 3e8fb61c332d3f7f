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

//! Body of a single training job

use super::job::TrainingJob;
use crate::config::CompilerConfig;
use crate::emit::ArtifactWriter;
use crate::error::{CompileError, CompileResult};
use dotlearn_learning::persist::write_learner;
use dotlearn_learning::{
    ComponentRegistry, CrossValidation, CrossValidationReport, ExtractedParser, FeaturePipeline, Learner, Parser, TrainingOptions, pre_extract,
    train_rounds,
};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Shared, read-only resources every job draws on
#[derive(Clone)]
pub struct JobContext {
    pub registry: Arc<ComponentRegistry>,
    pub config: Arc<CompilerConfig>,
    pub writer: ArtifactWriter,
}

impl JobContext {
    pub fn new(registry: Arc<ComponentRegistry>, config: Arc<CompilerConfig>, writer: ArtifactWriter) -> Self {
        Self { registry, config, writer }
    }
}

/// What a successful job produced
#[derive(Debug, Clone)]
pub struct TrainedLearner {
    pub name: String,
    /// Examples presented during final training, over all rounds
    pub examples: usize,
    pub cross_validation: Option<CrossValidationReport>,
    pub model: PathBuf,
    pub artifact: PathBuf,
}

/// Train one learner, persist its state and write its artifact
#[instrument(skip(job, context), fields(name = %job.name))]
pub fn run_job(job: &TrainingJob, context: &JobContext) -> CompileResult<TrainedLearner> {
    let spec = &job.spec;
    let mut learner = context.registry.learner(&spec.learner.class, &spec.learner.args)?;

    let mut examples = 0;
    let mut cross_validation = None;
    if let Some(parser_spec) = &spec.parser {
        let pipeline = feature_pipeline(job, context)?;
        let mut parser = context.registry.parser(&parser_spec.class, &parser_spec.args)?;

        if spec.pre_extract.unwrap_or(context.config.pre_extract) {
            parser = extract(job, context, parser, &pipeline)?;
        }

        let options = TrainingOptions {
            rounds: spec.rounds,
            progress_interval: spec.progress_interval,
        };

        if let Some(cval) = &spec.cross_validation {
            if cval.folds < 2 {
                info!(folds = cval.folds, "fewer than two folds requested; skipping cross validation");
            } else {
                let metric = context.registry.metric(&cval.metric.class, &cval.metric.args)?;
                let (report, rewound) =
                    CrossValidation::new(cval.folds, cval.strategy, cval.alpha).run(learner.as_mut(), &pipeline, parser, metric.as_ref(), options)?;
                parser = rewound;
                cross_validation = Some(report);
            }
        }

        examples = train_rounds(learner.as_mut(), &pipeline, parser.as_mut(), options);
    } else {
        debug!("no data source; writing fresh learner state");
    }

    learner.done_learning();
    let model = persist(job, context, learner.as_ref())?;
    let artifact = context.writer.write(&job.artifact)?;

    info!(examples, "learner trained");
    Ok(TrainedLearner {
        name: job.name.clone(),
        examples,
        cross_validation,
        model,
        artifact,
    })
}

fn feature_pipeline(job: &TrainingJob, context: &JobContext) -> CompileResult<FeaturePipeline> {
    let extractor = job
        .spec
        .extractor
        .as_deref()
        .ok_or_else(|| CompileError::Internal(format!("learner `{}` has a data source but no extractor", job.name)))?;
    let labeler = job.spec.labeler.as_deref().map(|name| context.registry.classifier(name)).transpose()?;
    Ok(FeaturePipeline::new(context.registry.classifier(extractor)?, labeler))
}

fn extract(job: &TrainingJob, context: &JobContext, mut parser: Box<dyn Parser>, pipeline: &FeaturePipeline) -> CompileResult<Box<dyn Parser>> {
    let (examples_path, lexicon_path) = context.config.extraction_paths(&job.name);
    ensure_model_dir(&context.config)?;

    let count = pre_extract(parser.as_mut(), pipeline, &examples_path, &lexicon_path)?;
    debug!(count, path = %examples_path.display(), "examples pre-extracted");
    Ok(Box::new(ExtractedParser::open(&examples_path, &lexicon_path)?))
}

fn persist(job: &TrainingJob, context: &JobContext, learner: &dyn Learner) -> CompileResult<PathBuf> {
    let path = context.config.model_path(&job.name);
    ensure_model_dir(&context.config)?;
    write_learner(&path, learner)?;
    Ok(path)
}

fn ensure_model_dir(config: &CompilerConfig) -> CompileResult<()> {
    fs::create_dir_all(&config.model_dir).map_err(|e| CompileError::io(&config.model_dir, e))
}
