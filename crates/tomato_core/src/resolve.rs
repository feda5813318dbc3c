//! Turns a raw classifier score into a labelled, percentage confidence.

use crate::classifier::Score;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Scores strictly above this are fresh; everything else, including the
/// threshold itself, is rotten.
pub const FRESH_THRESHOLD: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quality {
    Fresh,
    Rotten,
}

impl Quality {
    pub fn short_name(self) -> &'static str {
        match self {
            Quality::Fresh => "Fresh",
            Quality::Rotten => "Rotten",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quality::Fresh => f.write_str("Fresh Tomato"),
            Quality::Rotten => f.write_str("Rotten Tomato"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: Quality,
    /// Percentage in [0,100], rounded to two decimals.
    pub confidence: f64,
}

pub fn resolve(score: Score) -> Prediction {
    let p = score.value();
    let (label, confidence) = if p > FRESH_THRESHOLD {
        (Quality::Fresh, p as f64)
    } else {
        (Quality::Rotten, 1.0 - p as f64)
    };
    Prediction {
        label,
        confidence: round_percent(confidence),
    }
}

fn round_percent(fraction: f64) -> f64 {
    (fraction * 100.0 * 100.0).round() / 100.0
}
