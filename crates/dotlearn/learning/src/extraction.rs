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

//! Feature pre-extraction
//!
//! Runs the extractor and labeler over the whole data stream once, stores the
//! resulting vectors as lexicon indices, and replays them on later passes so
//! repeated training rounds and cross-validation folds skip feature extraction.

use crate::error::{LearningError, LearningResult};
use crate::example::{Example, FeatureVector};
use crate::lexicon::Lexicon;
use crate::persist;
use crate::traits::{FeaturePipeline, Parser};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// A feature vector stored as (lexicon index, strength) pairs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedExample {
    pub features: Vec<(u32, f64)>,
    pub labels: Vec<(u32, f64)>,
}

impl IndexedExample {
    fn index(vector: &FeatureVector, lexicon: &mut Lexicon) -> Self {
        Self {
            features: vector.features.iter().map(|f| (lexicon.lookup_or_insert(f), f.strength())).collect(),
            labels: vector.labels.iter().map(|f| (lexicon.lookup_or_insert(f), f.strength())).collect(),
        }
    }

    fn resolve(&self, lexicon: &Lexicon) -> LearningResult<FeatureVector> {
        let lookup = |pairs: &[(u32, f64)]| {
            pairs
                .iter()
                .map(|&(idx, strength)| {
                    lexicon
                        .key(idx)
                        .map(|key| key.to_feature(strength))
                        .ok_or_else(|| LearningError::Serialization(format!("lexicon has no entry {idx}")))
                })
                .collect::<LearningResult<Vec<_>>>()
        };
        Ok(FeatureVector {
            features: lookup(&self.features)?,
            labels: lookup(&self.labels)?,
        })
    }
}

/// Extract every example of `parser` into `examples_path`, writing the lexicon to `lexicon_path`
///
/// Returns the number of examples written. The parser is reset afterwards.
pub fn pre_extract(parser: &mut dyn Parser, pipeline: &FeaturePipeline, examples_path: &Path, lexicon_path: &Path) -> LearningResult<usize> {
    let mut lexicon = Lexicon::new();
    let mut examples = Vec::new();

    parser.reset();
    while let Some(example) = parser.next() {
        examples.push(IndexedExample::index(&pipeline.vectorize(&example), &mut lexicon));
    }
    parser.reset();

    persist::write_compressed(examples_path, &examples)?;
    lexicon.write(lexicon_path)?;
    debug!(examples = examples.len(), features = lexicon.len(), "pre-extracted examples to {}", examples_path.display());
    Ok(examples.len())
}

/// Parser replaying pre-extracted examples
pub struct ExtractedParser {
    examples: Vec<IndexedExample>,
    lexicon: Lexicon,
    cursor: usize,
}

impl ExtractedParser {
    pub fn open(examples_path: &Path, lexicon_path: &Path) -> LearningResult<Self> {
        Ok(Self {
            examples: persist::read_compressed(examples_path)?,
            lexicon: Lexicon::read(lexicon_path)?,
            cursor: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }
}

impl Parser for ExtractedParser {
    fn next(&mut self) -> Option<Example> {
        while let Some(indexed) = self.examples.get(self.cursor) {
            self.cursor += 1;
            match indexed.resolve(&self.lexicon) {
                Ok(vector) => return Some(Example::Vector(vector)),
                Err(e) => tracing::warn!("skipping unreadable pre-extracted example: {e}"),
            }
        }
        None
    }

    fn reset(&mut self) {
        self.cursor = 0;
    }
}
