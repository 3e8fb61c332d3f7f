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

//! Training a learner over a parser

use crate::traits::{FeaturePipeline, Learner, Parser};
use tracing::info;

/// Options of one training run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrainingOptions {
    /// Passes over the data; the parser is reset between rounds
    pub rounds: usize,
    /// Log progress every this many examples
    pub progress_interval: Option<usize>,
}

impl Default for TrainingOptions {
    fn default() -> Self {
        Self { rounds: 1, progress_interval: None }
    }
}

/// Train `learner` on every example of `parser` for the configured number of rounds
///
/// Returns the number of examples presented to the learner.
pub fn train_rounds(learner: &mut dyn Learner, pipeline: &FeaturePipeline, parser: &mut dyn Parser, options: TrainingOptions) -> usize {
    let mut presented = 0usize;
    for round in 0..options.rounds.max(1) {
        parser.reset();
        let mut in_round = 0usize;
        while let Some(example) = parser.next() {
            learner.learn(&pipeline.vectorize(&example));
            in_round += 1;
            if let Some(interval) = options.progress_interval.filter(|&n| n > 0) {
                if in_round % interval == 0 {
                    info!(round = round + 1, examples = in_round, "training progress");
                }
            }
        }
        presented += in_round;
    }
    parser.reset();
    presented
}
