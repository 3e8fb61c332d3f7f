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

//! Baseline components shipped with the compiler
//!
//! Real learning algorithms are external plugins registered by the embedding
//! application. These baselines back the default learner names so a learning
//! expression without a `with` clause still trains.

mod accuracy;
mod majority_vote;
mod mean_target;
mod parsers;

pub use accuracy::Accuracy;
pub use majority_vote::MajorityVote;
pub use mean_target::MeanTarget;
pub use parsers::{JsonLinesParser, MemoryParser};

use crate::error::LearningError;
use crate::registry::ComponentRegistry;
use std::sync::Arc;

pub const MAJORITY_VOTE: &str = "MajorityVote";
pub const MEAN_TARGET: &str = "MeanTarget";
pub const ACCURACY: &str = "Accuracy";
pub const JSON_LINES_PARSER: &str = "JsonLinesParser";

pub(crate) fn register_builtins(registry: &mut ComponentRegistry) {
    registry.register_learner(MAJORITY_VOTE, |_args| Ok(Box::new(MajorityVote::new())));
    registry.register_learner(MEAN_TARGET, |_args| Ok(Box::new(MeanTarget::new())));
    registry.register_metric(ACCURACY, |_args| Ok(Arc::new(Accuracy)));
    registry.register_parser(JSON_LINES_PARSER, |args| {
        let path = args
            .first()
            .ok_or_else(|| LearningError::InvalidArgument("JsonLinesParser expects a file path".to_string()))?;
        Ok(Box::new(JsonLinesParser::open(path.trim_matches('"'))?))
    });
}
