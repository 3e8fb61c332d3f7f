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

//! Learning components consumed by the dotlearn training scheduler
//!
//! The compiler never knows how a learner learns. It talks to learners, parsers,
//! testing metrics and feature classifiers only through the traits in [`traits`],
//! and obtains instances by declared class name from a [`ComponentRegistry`].
//!
//! # Example Usage
//!
//! ```rust
//! use dotlearn_learning::{ComponentRegistry, Example, Feature, FeatureVector};
//!
//! let registry = ComponentRegistry::with_builtins();
//! let mut learner = registry.learner("MajorityVote", &[]).unwrap();
//! learner.learn(&FeatureVector::new(
//!     vec![Feature::discrete("word", "the")],
//!     vec![Feature::discrete("tag", "DT")],
//! ));
//! let prediction = learner.predict(&[Feature::discrete("word", "the")]);
//! assert_eq!(prediction, Some(Feature::discrete("tag", "DT")));
//! # let _ = Example::Object(serde_json::Value::Null);
//! ```

pub mod builtin;
pub mod cross_validation;
pub mod error;
pub mod example;
pub mod extraction;
pub mod folds;
pub mod lexicon;
pub mod persist;
pub mod registry;
pub mod session;
pub mod traits;

pub use cross_validation::{CrossValidation, CrossValidationReport, students_t_quantile};
pub use error::{LearningError, LearningResult};
pub use example::{Example, Feature, FeatureKey, FeatureVector};
pub use extraction::{ExtractedParser, IndexedExample, pre_extract};
pub use folds::{FoldMode, FoldParser, SplitStrategy};
pub use lexicon::Lexicon;
pub use registry::{ComponentKind, ComponentRegistry};
pub use session::{TrainingOptions, train_rounds};
pub use traits::{Classifier, FeaturePipeline, Learner, Parser, TestingMetric};
