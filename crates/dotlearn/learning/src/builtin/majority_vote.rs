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
use std::collections::BTreeMap;
use std::io::Write;

/// Discrete baseline: every active feature votes for the labels it was seen with
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MajorityVote {
    label_name: Option<String>,
    votes: BTreeMap<String, BTreeMap<String, u64>>,
    totals: BTreeMap<String, u64>,
    examples_seen: u64,
}

impl MajorityVote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn examples_seen(&self) -> u64 {
        self.examples_seen
    }

    fn best(counts: &BTreeMap<String, u64>) -> Option<&String> {
        let mut best: Option<(&String, u64)> = None;
        for (label, &count) in counts {
            if best.is_none_or(|(_, top)| count > top) {
                best = Some((label, count));
            }
        }
        best.map(|(label, _)| label)
    }
}

impl Learner for MajorityVote {
    fn learn(&mut self, example: &FeatureVector) {
        self.examples_seen += 1;
        let Some(Feature::Discrete { name, value }) = example.label() else {
            return;
        };
        self.label_name.get_or_insert_with(|| name.clone());
        *self.totals.entry(value.clone()).or_default() += 1;
        for feature in &example.features {
            *self.votes.entry(feature.key().to_string()).or_default().entry(value.clone()).or_default() += 1;
        }
    }

    fn forget(&mut self) {
        *self = Self::default();
    }

    fn predict(&self, features: &[Feature]) -> Option<Feature> {
        let mut tally: BTreeMap<String, u64> = BTreeMap::new();
        for feature in features {
            if let Some(votes) = self.votes.get(&feature.key().to_string()) {
                for (label, count) in votes {
                    *tally.entry(label.clone()).or_default() += count;
                }
            }
        }
        let label = Self::best(&tally).or_else(|| Self::best(&self.totals))?;
        Some(Feature::discrete(self.label_name.clone().unwrap_or_default(), label.clone()))
    }

    fn write(&self, out: &mut dyn Write) -> LearningResult<()> {
        persist::encode_into(self, out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example(word: &str, tag: &str) -> FeatureVector {
        FeatureVector::new(vec![Feature::discrete("word", word)], vec![Feature::discrete("tag", tag)])
    }

    #[test]
    fn test_votes_by_feature() {
        let mut learner = MajorityVote::new();
        learner.learn(&example("the", "DT"));
        learner.learn(&example("dog", "NN"));
        learner.learn(&example("dog", "NN"));
        learner.learn(&example("dog", "VB"));

        assert_eq!(learner.predict(&[Feature::discrete("word", "dog")]), Some(Feature::discrete("tag", "NN")));
        assert_eq!(learner.predict(&[Feature::discrete("word", "the")]), Some(Feature::discrete("tag", "DT")));
    }

    #[test]
    fn test_unknown_features_fall_back_to_majority() {
        let mut learner = MajorityVote::new();
        learner.learn(&example("a", "X"));
        learner.learn(&example("b", "Y"));
        learner.learn(&example("c", "Y"));
        assert_eq!(learner.predict(&[Feature::discrete("word", "zzz")]), Some(Feature::discrete("tag", "Y")));
    }

    #[test]
    fn test_forget_resets_state() {
        let mut learner = MajorityVote::new();
        learner.learn(&example("a", "X"));
        learner.forget();
        assert_eq!(learner, MajorityVote::new());
        assert_eq!(learner.predict(&[Feature::discrete("word", "a")]), None);
    }
}
