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

//! Training of learning expressions
//!
//! [`plan_jobs`] selects the learners that must be retrained and links them into a
//! DAG; [`TrainingScheduler`] runs the DAG, persisting each learner and rewriting
//! its artifact as it finishes.

mod job;
mod scheduler;
mod work;

pub use job::{TrainingJob, link_jobs, needs_training, plan_jobs};
pub use scheduler::{JobFailure, TrainingEvent, TrainingReport, TrainingScheduler};
pub use work::{JobContext, TrainedLearner, run_job};
