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

//! Fold splitting for cross-validation

use crate::error::{LearningError, LearningResult};
use crate::example::Example;
use crate::traits::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::str::FromStr;

/// How examples are assigned to folds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SplitStrategy {
    /// Contiguous blocks of the stream
    #[default]
    Sequential,
    /// Example `i` belongs to fold `i mod k`
    Kth,
    /// Balanced random assignment, reproducible from the seed
    Random { seed: u64 },
}

impl FromStr for SplitStrategy {
    type Err = LearningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sequential" => Ok(SplitStrategy::Sequential),
            "kth" => Ok(SplitStrategy::Kth),
            "random" => Ok(SplitStrategy::Random { seed: 0 }),
            other => Err(LearningError::InvalidArgument(format!("unknown split strategy `{other}`"))),
        }
    }
}

/// Whether a [`FoldParser`] yields the held-out fold or everything else
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoldMode {
    Train,
    Test,
}

/// Parser view over one fold split of an underlying parser
pub struct FoldParser {
    inner: Box<dyn Parser>,
    assignments: Vec<usize>,
    folds: usize,
    pivot: usize,
    mode: FoldMode,
    cursor: usize,
}

impl FoldParser {
    /// Count the examples of `inner` and assign each to one of `folds` folds
    pub fn new(mut inner: Box<dyn Parser>, folds: usize, strategy: SplitStrategy) -> LearningResult<Self> {
        if folds < 2 {
            return Err(LearningError::InvalidArgument(format!("cross-validation needs at least 2 folds, got {folds}")));
        }

        inner.reset();
        let mut total = 0usize;
        while inner.next().is_some() {
            total += 1;
        }
        inner.reset();

        let assignments = match strategy {
            SplitStrategy::Sequential => (0..total).map(|i| i * folds / total.max(1)).collect(),
            SplitStrategy::Kth => (0..total).map(|i| i % folds).collect(),
            SplitStrategy::Random { seed } => {
                let mut assignments: Vec<usize> = (0..total).map(|i| i % folds).collect();
                assignments.shuffle(&mut StdRng::seed_from_u64(seed));
                assignments
            }
        };

        Ok(Self {
            inner,
            assignments,
            folds,
            pivot: 0,
            mode: FoldMode::Train,
            cursor: 0,
        })
    }

    pub fn folds(&self) -> usize {
        self.folds
    }

    /// Number of examples in the underlying stream
    pub fn total(&self) -> usize {
        self.assignments.len()
    }

    /// Select the held-out fold and which side of the split to yield; rewinds the stream
    pub fn select(&mut self, pivot: usize, mode: FoldMode) {
        self.pivot = pivot;
        self.mode = mode;
        self.reset();
    }

    /// Give back the underlying parser, rewound
    pub fn into_inner(mut self) -> Box<dyn Parser> {
        self.inner.reset();
        self.inner
    }
}

impl Parser for FoldParser {
    fn next(&mut self) -> Option<Example> {
        loop {
            let example = self.inner.next()?;
            let fold = self.assignments.get(self.cursor).copied().unwrap_or(self.folds);
            self.cursor += 1;
            let held_out = fold == self.pivot;
            match self.mode {
                FoldMode::Test if held_out => return Some(example),
                FoldMode::Train if !held_out => return Some(example),
                _ => continue,
            }
        }
    }

    fn reset(&mut self) {
        self.inner.reset();
        self.cursor = 0;
    }
}
