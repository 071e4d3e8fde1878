//! Scrap-reason breakdown shown next to the control charts.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{SpcError, SpcResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapReason {
    pub label: String,
    pub percentage: f64,
}

impl ScrapReason {
    pub fn new(label: &str, percentage: f64) -> Self {
        Self { label: label.to_string(), percentage }
    }
}

/// Reason records with unique labels. Percentages are illustrative and
/// need not sum to 100.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScrapReasonDataset {
    reasons: Vec<ScrapReason>,
}

impl ScrapReasonDataset {
    pub fn new(reasons: Vec<ScrapReason>) -> SpcResult<Self> {
        let mut seen = HashSet::new();
        for r in &reasons {
            if !seen.insert(r.label.as_str()) {
                return Err(SpcError::DuplicateReason(r.label.clone()));
            }
            if !r.percentage.is_finite() {
                return Err(SpcError::InvalidInput(format!(
                    "percentage for {} is not finite",
                    r.label
                )));
            }
        }
        Ok(Self { reasons })
    }

    pub fn reasons(&self) -> &[ScrapReason] {
        &self.reasons
    }

    pub fn len(&self) -> usize {
        self.reasons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reasons.is_empty()
    }
}

impl Default for ScrapReasonDataset {
    fn default() -> Self {
        Self {
            reasons: vec![
                ScrapReason::new("Material Defect", 35.0),
                ScrapReason::new("Machine Error", 25.0),
                ScrapReason::new("Operator Error", 20.0),
                ScrapReason::new("Tool Wear", 15.0),
                ScrapReason::new("Other", 5.0),
            ],
        }
    }
}
