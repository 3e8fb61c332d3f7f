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

//! Integration tests for cross-validation and pre-extracted training

use dotlearn_learning::builtin::{Accuracy, MajorityVote, MemoryParser};
use dotlearn_learning::persist::learner_bytes;
use dotlearn_learning::{CrossValidation, Feature, FeaturePipeline, Learner, Parser, SplitStrategy, TrainingOptions, train_rounds};
use serde_json::json;
use std::sync::Arc;

fn tagged_words() -> Vec<serde_json::Value> {
    let words = [("the", "DT"), ("dog", "NN"), ("runs", "VBZ"), ("a", "DT"), ("cat", "NN"), ("sleeps", "VBZ")];
    (0..30).map(|i| {
        let (word, tag) = words[i % words.len()];
        json!({"word": word, "tag": tag})
    }).collect()
}

fn pipeline() -> FeaturePipeline {
    let extractor = |o: &serde_json::Value| vec![Feature::discrete("word", o["word"].as_str().unwrap_or_default())];
    let labeler = |o: &serde_json::Value| vec![Feature::discrete("tag", o["tag"].as_str().unwrap_or_default())];
    FeaturePipeline::new(Arc::new(extractor), Some(Arc::new(labeler)))
}

#[test]
fn test_cross_validation_does_not_change_final_model() {
    let pipeline = pipeline();
    let options = TrainingOptions::default();

    let mut direct = MajorityVote::new();
    let mut parser = MemoryParser::from_objects(tagged_words());
    train_rounds(&mut direct, &pipeline, &mut parser, options);
    direct.done_learning();

    let mut validated = MajorityVote::new();
    let cval = CrossValidation::new(5, SplitStrategy::Kth, 0.05);
    let (report, mut parser) = cval
        .run(&mut validated, &pipeline, Box::new(MemoryParser::from_objects(tagged_words())), &Accuracy, options)
        .unwrap();
    train_rounds(&mut validated, &pipeline, parser.as_mut(), options);
    validated.done_learning();

    assert_eq!(report.scores.len(), 5);
    assert_eq!(learner_bytes(&direct).unwrap(), learner_bytes(&validated).unwrap());
}

#[test]
fn test_perfectly_separable_data_scores_one() {
    let pipeline = pipeline();
    let mut learner = MajorityVote::new();
    let cval = CrossValidation::new(3, SplitStrategy::Sequential, 0.1);
    let (report, mut parser) = cval
        .run(&mut learner, &pipeline, Box::new(MemoryParser::from_objects(tagged_words())), &Accuracy, TrainingOptions::default())
        .unwrap();

    assert!(report.scores.iter().all(|&s| (s - 1.0).abs() < 1e-12));
    assert_eq!(report.half_width, 0.0);
    assert!(parser.next().is_some(), "parser is handed back rewound");
}
