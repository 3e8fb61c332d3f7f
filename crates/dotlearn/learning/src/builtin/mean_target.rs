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

use crate::error::LearningResult;
use crate::example::{Feature, FeatureVector};
use crate::persist;
use crate::traits::Learner;
use serde::{Deserialize, Serialize};
use std::io::Write;

/// Real baseline: predicts the mean of every target seen so far
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeanTarget {
    label_name: Option<String>,
    sum: f64,
    count: u64,
}

impl MeanTarget {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Learner for MeanTarget {
    fn learn(&mut self, example: &FeatureVector) {
        if let Some(Feature::Real { name, value }) = example.label() {
            self.label_name.get_or_insert_with(|| name.clone());
            self.sum += value;
            self.count += 1;
        }
    }

    fn forget(&mut self) {
        *self = Self::default();
    }

    fn predict(&self, _features: &[Feature]) -> Option<Feature> {
        (self.count > 0).then(|| Feature::real(self.label_name.clone().unwrap_or_default(), self.sum / self.count as f64))
    }

    fn write(&self, out: &mut dyn Write) -> LearningResult<()> {
        persist::encode_into(self, out)
    }
}
