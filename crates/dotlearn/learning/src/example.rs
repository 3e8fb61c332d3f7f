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

//! Examples, features and feature vectors

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single feature produced by a classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Feature {
    Discrete { name: String, value: String },
    Real { name: String, value: f64 },
}

impl Feature {
    pub fn discrete(name: impl Into<String>, value: impl Into<String>) -> Self {
        Feature::Discrete { name: name.into(), value: value.into() }
    }

    pub fn real(name: impl Into<String>, value: f64) -> Self {
        Feature::Real { name: name.into(), value }
    }

    pub fn name(&self) -> &str {
        match self {
            Feature::Discrete { name, .. } | Feature::Real { name, .. } => name,
        }
    }

    /// The identity of this feature, independent of a real feature's value
    pub fn key(&self) -> FeatureKey {
        match self {
            Feature::Discrete { name, value } => FeatureKey::Discrete {
                name: name.clone(),
                value: value.clone(),
            },
            Feature::Real { name, .. } => FeatureKey::Real { name: name.clone() },
        }
    }

    /// Numeric strength; discrete features always have strength 1
    pub fn strength(&self) -> f64 {
        match self {
            Feature::Discrete { .. } => 1.0,
            Feature::Real { value, .. } => *value,
        }
    }
}

/// Identity of a feature in a lexicon
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FeatureKey {
    Discrete { name: String, value: String },
    Real { name: String },
}

impl FeatureKey {
    /// Rebuild a feature from this key and a stored strength
    pub fn to_feature(&self, strength: f64) -> Feature {
        match self {
            FeatureKey::Discrete { name, value } => Feature::discrete(name.clone(), value.clone()),
            FeatureKey::Real { name } => Feature::real(name.clone(), strength),
        }
    }
}

impl fmt::Display for FeatureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureKey::Discrete { name, value } => write!(f, "{name}={value}"),
            FeatureKey::Real { name } => write!(f, "{name}"),
        }
    }
}

/// Extracted features and labels of one example
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub features: Vec<Feature>,
    pub labels: Vec<Feature>,
}

impl FeatureVector {
    pub fn new(features: Vec<Feature>, labels: Vec<Feature>) -> Self {
        Self { features, labels }
    }

    /// The first label, which single-output learners train against
    pub fn label(&self) -> Option<&Feature> {
        self.labels.first()
    }
}

/// An example as produced by a parser
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Example {
    /// Raw object that still needs feature extraction
    Object(serde_json::Value),
    /// Already extracted feature vector (pre-extracted replay)
    Vector(FeatureVector),
}
