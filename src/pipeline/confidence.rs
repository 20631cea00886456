use std::fmt;

use crate::common::Prediction;

/// Whole-number percentage of a probability, truncated toward zero.
pub fn percentage(probability: f64) -> i64 {
    (probability * 100.0).trunc() as i64
}

/// A prediction that passed the confidence filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelText {
    label: String,
    percentage: i64,
}

impl LabelText {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn percentage(&self) -> i64 {
        self.percentage
    }
}

impl fmt::Display for LabelText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} : {}", self.label, self.percentage)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ConfidenceFilter {
    threshold: i64,
}

impl ConfidenceFilter {
    pub const DEFAULT_THRESHOLD: u32 = 70;

    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold as i64,
        }
    }

    /// Keeps the top entry if its percentage is at least the threshold.
    pub fn accept(&self, prediction: &Prediction) -> Option<LabelText> {
        let (label, probability) = prediction.top()?;
        let percentage = percentage(probability);
        if percentage < self.threshold {
            return None;
        }
        Some(LabelText {
            label: label.to_string(),
            percentage,
        })
    }
}

impl Default for ConfidenceFilter {
    fn default() -> Self {
        Self::new(Self::DEFAULT_THRESHOLD)
    }
}
