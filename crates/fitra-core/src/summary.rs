//! Submission summary computed from a settled draft.

use serde::{Deserialize, Serialize};

use crate::draft::{DraftState, Selection};

/// One exercise line of a submitted session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub name: String,
    pub weight: f64,
    pub reps: f64,
    pub sets: f64,
    /// `reps * sets`
    pub total_reps: f64,
    /// `weight * total_reps` (kg x reps)
    pub volume: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub rows: Vec<SummaryRow>,
    pub total_volume: f64,
    pub total_sets: f64,
    pub total_reps: f64,
}

impl TrainingSummary {
    /// Build a summary for the selected items in selection order.
    ///
    /// Unset fields count as zero.
    pub fn from_draft(draft: &DraftState, selection: &Selection) -> Self {
        let rows: Vec<SummaryRow> = selection
            .iter()
            .map(|name| {
                let entry = draft.get(name).copied().unwrap_or_default();
                let weight = entry.weight.unwrap_or(0.0);
                let reps = entry.reps.unwrap_or(0.0);
                let sets = entry.sets.unwrap_or(0.0);
                let total_reps = reps * sets;
                SummaryRow {
                    name: name.to_string(),
                    weight,
                    reps,
                    sets,
                    total_reps,
                    volume: weight * total_reps,
                }
            })
            .collect();

        Self {
            total_volume: rows.iter().map(|r| r.volume).sum(),
            total_sets: rows.iter().map(|r| r.sets).sum(),
            total_reps: rows.iter().map(|r| r.total_reps).sum(),
            rows,
        }
    }
}
