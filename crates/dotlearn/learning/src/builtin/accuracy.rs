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

use crate::example::Feature;
use crate::traits::{FeaturePipeline, Learner, Parser, TestingMetric};

/// Fraction of examples whose prediction equals the oracle's first label
#[derive(Debug, Clone, Copy, Default)]
pub struct Accuracy;

const REAL_TOLERANCE: f64 = 1e-9;

fn agrees(prediction: &Feature, label: &Feature) -> bool {
    match (prediction, label) {
        (Feature::Discrete { value: p, .. }, Feature::Discrete { value: l, .. }) => p == l,
        (Feature::Real { value: p, .. }, Feature::Real { value: l, .. }) => (p - l).abs() <= REAL_TOLERANCE,
        _ => false,
    }
}

impl TestingMetric for Accuracy {
    fn name(&self) -> &str {
        "Accuracy"
    }

    fn test(&self, classifier: &dyn Learner, oracle: &FeaturePipeline, parser: &mut dyn Parser) -> f64 {
        let (mut correct, mut total) = (0usize, 0usize);
        parser.reset();
        while let Some(example) = parser.next() {
            let vector = oracle.vectorize(&example);
            let Some(label) = vector.label() else {
                continue;
            };
            total += 1;
            if classifier.predict(&vector.features).is_some_and(|p| agrees(&p, label)) {
                correct += 1;
            }
        }
        if total == 0 { 0.0 } else { correct as f64 / total as f64 }
    }
}
