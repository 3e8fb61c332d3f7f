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

//! Contracts of pluggable learning components
//!
//! These are the only operations the training scheduler invokes on learners,
//! parsers and testing metrics.

use crate::error::LearningResult;
use crate::example::{Example, Feature, FeatureVector};
use std::io::Write;
use std::sync::Arc;

/// A trainable classifier
pub trait Learner: Send {
    /// Learn from a single labeled example
    fn learn(&mut self, example: &FeatureVector);

    /// Learn from a batch of labeled examples
    fn learn_batch(&mut self, examples: &[FeatureVector]) {
        for example in examples {
            self.learn(example);
        }
    }

    /// Finalization hook called once training is over
    fn done_learning(&mut self) {}

    /// Discard everything learned so far
    fn forget(&mut self);

    /// Predict the label of an unlabeled feature list
    fn predict(&self, features: &[Feature]) -> Option<Feature>;

    /// Serialize the trained state
    fn write(&self, out: &mut dyn Write) -> LearningResult<()>;
}

/// A resettable stream of examples
pub trait Parser: Send {
    /// The next example, or `None` at the end of the stream
    fn next(&mut self) -> Option<Example>;

    /// Rewind to the first example
    fn reset(&mut self);
}

/// Scores a trained learner against an oracle over a stream of examples
pub trait TestingMetric: Send + Sync {
    fn name(&self) -> &str;

    fn test(&self, classifier: &dyn Learner, oracle: &FeaturePipeline, parser: &mut dyn Parser) -> f64;
}

/// A feature-producing classifier applied to raw example objects
///
/// Extractors and labelers of learning expressions implement this.
pub trait Classifier: Send + Sync {
    fn classify(&self, object: &serde_json::Value) -> Vec<Feature>;
}

/// The extractor and optional labeler that turn raw examples into feature vectors
#[derive(Clone)]
pub struct FeaturePipeline {
    extractor: Arc<dyn Classifier>,
    labeler: Option<Arc<dyn Classifier>>,
}

impl FeaturePipeline {
    pub fn new(extractor: Arc<dyn Classifier>, labeler: Option<Arc<dyn Classifier>>) -> Self {
        Self { extractor, labeler }
    }

    /// Extract features and labels; pre-extracted examples pass through untouched
    pub fn vectorize(&self, example: &Example) -> FeatureVector {
        match example {
            Example::Vector(vector) => vector.clone(),
            Example::Object(object) => FeatureVector {
                features: self.extractor.classify(object),
                labels: self.labeler.as_ref().map(|labeler| labeler.classify(object)).unwrap_or_default(),
            },
        }
    }
}

impl<F> Classifier for F
where
    F: Fn(&serde_json::Value) -> Vec<Feature> + Send + Sync,
{
    fn classify(&self, object: &serde_json::Value) -> Vec<Feature> {
        self(object)
    }
}
