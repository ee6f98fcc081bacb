//! Capitalization weighting.

use crate::domain::error::{IdxtrackError, Stage};
use crate::domain::factor::FactorSeries;

pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

/// Frozen instrument → weight mapping for one rebalancing period.
///
/// Weights are non-negative and sum to one.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightVector {
    entries: Vec<(String, f64)>,
}

impl WeightVector {
    /// Wrap pre-computed weights, checking they are non-negative and sum to one.
    pub fn from_pairs(entries: Vec<(String, f64)>) -> Result<Self, IdxtrackError> {
        if let Some((id, w)) = entries.iter().find(|(_, w)| !w.is_finite() || *w < 0.0) {
            return Err(IdxtrackError::InvalidData {
                what: "weight vector".into(),
                reason: format!("weight {} for {}", w, id),
            });
        }
        let sum: f64 = entries.iter().map(|&(_, w)| w).sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(IdxtrackError::InvalidData {
                what: "weight vector".into(),
                reason: format!("weights sum to {}", sum),
            });
        }
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<f64> {
        self.entries.iter().find(|(i, _)| i == id).map(|&(_, w)| w)
    }

    pub fn ids(&self) -> Vec<&str> {
        self.entries.iter().map(|(id, _)| id.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(id, w)| (id.as_str(), *w))
    }

    pub fn sum(&self) -> f64 {
        self.entries.iter().map(|&(_, w)| w).sum()
    }
}

/// `weight_i = cap_i / Σ cap`.
///
/// Non-finite and negative capitalizations are ignored. Fails with
/// `InsufficientData` when nothing usable remains or the total is zero.
pub fn compute_weights(capitalization: &FactorSeries) -> Result<WeightVector, IdxtrackError> {
    if capitalization.is_empty() {
        return Err(IdxtrackError::insufficient(Stage::Weight, "empty constituent set"));
    }

    let usable: Vec<(&str, f64)> = capitalization
        .iter()
        .filter(|&(id, cap)| {
            let ok = cap.is_finite() && cap >= 0.0;
            if !ok {
                tracing::warn!(instrument = id, cap, "ignoring unusable capitalization");
            }
            ok
        })
        .collect();

    let total: f64 = usable.iter().map(|&(_, cap)| cap).sum();
    if total <= 0.0 || !total.is_finite() {
        return Err(IdxtrackError::insufficient(
            Stage::Weight,
            format!(
                "total capitalization of {} constituents is zero",
                capitalization.len()
            ),
        ));
    }

    Ok(WeightVector {
        entries: usable
            .into_iter()
            .map(|(id, cap)| (id.to_string(), cap / total))
            .collect(),
    })
}
