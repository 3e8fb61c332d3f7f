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

//! k-fold cross-validation with a Student-t confidence interval
//!
//! Cross-validation only reports. The learner is forgotten before every fold and
//! once more at the end, so the model trained afterwards on the full data is the
//! same as if cross-validation had never run.

use crate::error::LearningResult;
use crate::folds::{FoldMode, FoldParser, SplitStrategy};
use crate::session::{TrainingOptions, train_rounds};
use crate::traits::{FeaturePipeline, Learner, Parser, TestingMetric};
use std::fmt;
use tracing::{debug, info};

/// Cross-validation settings of a learning expression
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossValidation {
    pub folds: usize,
    pub strategy: SplitStrategy,
    /// Significance level of the reported interval
    pub alpha: f64,
}

impl CrossValidation {
    pub fn new(folds: usize, strategy: SplitStrategy, alpha: f64) -> Self {
        Self { folds, strategy, alpha }
    }

    /// Run the folds; returns the report and the rewound parser
    pub fn run(
        &self,
        learner: &mut dyn Learner,
        pipeline: &FeaturePipeline,
        parser: Box<dyn Parser>,
        metric: &dyn TestingMetric,
        options: TrainingOptions,
    ) -> LearningResult<(CrossValidationReport, Box<dyn Parser>)> {
        let mut folds = FoldParser::new(parser, self.folds, self.strategy)?;
        let mut scores = Vec::with_capacity(self.folds);

        for fold in 0..self.folds {
            learner.forget();
            folds.select(fold, FoldMode::Train);
            let trained_on = train_rounds(learner, pipeline, &mut folds, TrainingOptions { progress_interval: None, ..options });
            learner.done_learning();

            folds.select(fold, FoldMode::Test);
            let score = metric.test(&*learner, pipeline, &mut folds);
            debug!(fold = fold + 1, trained_on, score, "cross-validation fold finished");
            scores.push(score);
        }
        learner.forget();

        let report = CrossValidationReport::from_scores(scores, self.alpha);
        info!(metric = metric.name(), "{report}");
        Ok((report, folds.into_inner()))
    }
}

/// Per-fold scores with their mean and confidence interval
#[derive(Debug, Clone, PartialEq)]
pub struct CrossValidationReport {
    pub scores: Vec<f64>,
    pub mean: f64,
    pub std_dev: f64,
    /// Half width of the two-sided interval around the mean
    pub half_width: f64,
    pub alpha: f64,
}

impl CrossValidationReport {
    pub fn from_scores(scores: Vec<f64>, alpha: f64) -> Self {
        let n = scores.len();
        let mean = if n == 0 { 0.0 } else { scores.iter().sum::<f64>() / n as f64 };
        let std_dev = if n < 2 {
            0.0
        } else {
            (scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / (n - 1) as f64).sqrt()
        };
        let half_width = if n < 2 {
            0.0
        } else {
            students_t_quantile(1.0 - alpha / 2.0, (n - 1) as f64) * std_dev / (n as f64).sqrt()
        };
        Self {
            scores,
            mean,
            std_dev,
            half_width,
            alpha,
        }
    }

    pub fn interval(&self) -> (f64, f64) {
        (self.mean - self.half_width, self.mean + self.half_width)
    }
}

impl fmt::Display for CrossValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let confidence = (1.0 - self.alpha) * 100.0;
        write!(f, "{} folds: mean {:.4} +/- {:.4} ({confidence:.1}% confidence)", self.scores.len(), self.mean, self.half_width)
    }
}

/// Quantile of the Student-t distribution with `df` degrees of freedom
pub fn students_t_quantile(p: f64, df: f64) -> f64 {
    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }
    if p < 0.5 {
        return -students_t_quantile(1.0 - p, df);
    }

    let (mut lo, mut hi) = (0.0f64, 1.0f64);
    while students_t_cdf(hi, df) < p {
        hi *= 2.0;
        if hi > 1e12 {
            return hi;
        }
    }
    for _ in 0..200 {
        let mid = 0.5 * (lo + hi);
        if students_t_cdf(mid, df) < p {
            lo = mid;
        } else {
            hi = mid;
        }
        if hi - lo < 1e-12 {
            break;
        }
    }
    0.5 * (lo + hi)
}

fn students_t_cdf(t: f64, df: f64) -> f64 {
    let x = df / (df + t * t);
    let tail = 0.5 * regularized_incomplete_beta(x, df / 2.0, 0.5);
    if t >= 0.0 { 1.0 - tail } else { tail }
}

fn regularized_incomplete_beta(x: f64, a: f64, b: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }
    let ln_front = ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b) + a * x.ln() + b * (1.0 - x).ln();
    if x < (a + 1.0) / (a + b + 2.0) {
        ln_front.exp() * beta_continued_fraction(x, a, b) / a
    } else {
        1.0 - ln_front.exp() * beta_continued_fraction(1.0 - x, b, a) / b
    }
}

// Lentz's method
fn beta_continued_fraction(x: f64, a: f64, b: f64) -> f64 {
    const TINY: f64 = 1e-300;
    let mut c = 1.0;
    let mut d = 1.0 - (a + b) * x / (a + 1.0);
    if d.abs() < TINY {
        d = TINY;
    }
    d = 1.0 / d;
    let mut h = d;

    for m in 1..=300 {
        let m = m as f64;
        let even = m * (b - m) * x / ((a + 2.0 * m - 1.0) * (a + 2.0 * m));
        d = 1.0 + even * d;
        if d.abs() < TINY {
            d = TINY;
        }
        c = 1.0 + even / c;
        if c.abs() < TINY {
            c = TINY;
        }
        d = 1.0 / d;
        h *= d * c;

        let odd = -(a + m) * (a + b + m) * x / ((a + 2.0 * m) * (a + 2.0 * m + 1.0));
        d = 1.0 + odd * d;
        if d.abs() < TINY {
            d = TINY;
        }
        c = 1.0 + odd / c;
        if c.abs() < TINY {
            c = TINY;
        }
        d = 1.0 / d;
        let delta = d * c;
        h *= delta;
        if (delta - 1.0).abs() < 1e-15 {
            break;
        }
    }
    h
}

// Lanczos approximation, g = 7
fn ln_gamma(x: f64) -> f64 {
    const COEFFICIENTS: [f64; 9] = [
        0.999_999_999_999_809_9,
        676.520_368_121_885_1,
        -1_259.139_216_722_402_8,
        771.323_428_777_653_1,
        -176.615_029_162_140_6,
        12.507_343_278_686_905,
        -0.138_571_095_265_720_12,
        9.984_369_578_019_572e-6,
        1.505_632_735_149_311_6e-7,
    ];
    if x < 0.5 {
        return std::f64::consts::PI.ln() - (std::f64::consts::PI * x).sin().abs().ln() - ln_gamma(1.0 - x);
    }
    let x = x - 1.0;
    let mut sum = COEFFICIENTS[0];
    for (i, coefficient) in COEFFICIENTS.iter().enumerate().skip(1) {
        sum += coefficient / (x + i as f64);
    }
    let t = x + 7.5;
    0.5 * (2.0 * std::f64::consts::PI).ln() + (x + 0.5) * t.ln() - t + sum.ln()
}
