use anyhow::Result;
use serde::Serialize;

use marksix_db::models::{Region, ResolvedPrediction, Strategy};

use crate::store::PredictionSource;

pub const DEFAULT_ACCURACY_LIMIT: u32 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct AccuracyReport {
    pub total: u32,
    pub special_hits: u32,
    /// Spécial réel présent parmi les 6 numéros, sans avoir touché le spécial.
    pub normal_hits: u32,
    pub correct: u32,
    pub ratio: f64,
}

/// Taux de réussite sur au plus `limit` prédictions résolues, dans l'ordre reçu.
pub fn accuracy_of(predictions: &[ResolvedPrediction], limit: u32) -> AccuracyReport {
    let mut report = AccuracyReport::default();

    for prediction in predictions
        .iter()
        .filter(|p| p.is_resolved && p.actual_special.is_some())
        .take(limit as usize)
    {
        report.total += 1;
        if prediction.special_hit() {
            report.special_hits += 1;
        } else if prediction.normal_hit() {
            report.normal_hits += 1;
        }
    }

    report.correct = report.special_hits + report.normal_hits;
    report.ratio = if report.total > 0 {
        report.correct as f64 / report.total as f64
    } else {
        0.0
    };
    report
}

pub fn accuracy<S: PredictionSource + ?Sized>(
    source: &S,
    region: Region,
    strategy: Option<Strategy>,
    limit: u32,
) -> Result<AccuracyReport> {
    let predictions = source.resolved_predictions(region, strategy, limit)?;
    Ok(accuracy_of(&predictions, limit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn prediction(normals: [u8; 6], special: u8, actual: Option<u8>) -> ResolvedPrediction {
        ResolvedPrediction {
            strategy: Strategy::Hot,
            period: "001".to_string(),
            predicted_normals: normals.to_vec(),
            predicted_special: special,
            actual_special: actual,
            is_resolved: actual.is_some(),
        }
    }

    #[test]
    fn test_accuracy_counts_both_hit_kinds() {
        let predictions = vec![
            prediction([1, 2, 3, 4, 5, 6], 7, Some(7)),
            prediction([1, 2, 3, 4, 5, 6], 7, Some(4)),
            prediction([1, 2, 3, 4, 5, 6], 7, Some(30)),
            prediction([1, 2, 3, 4, 5, 6], 7, Some(31)),
        ];
        let report = accuracy_of(&predictions, 200);
        assert_eq!(report.total, 4);
        assert_eq!(report.special_hits, 1);
        assert_eq!(report.normal_hits, 1);
        assert_eq!(report.correct, 2);
        assert_eq!(report.ratio, 0.5);
    }

    #[test]
    fn test_accuracy_empty_is_zero() {
        let report = accuracy_of(&[], 200);
        assert_eq!(report.total, 0);
        assert_eq!(report.ratio, 0.0);
    }

    #[test]
    fn test_pending_predictions_ignored() {
        let predictions = vec![
            prediction([1, 2, 3, 4, 5, 6], 7, None),
            prediction([1, 2, 3, 4, 5, 6], 7, Some(7)),
        ];
        let report = accuracy_of(&predictions, 200);
        assert_eq!(report.total, 1);
        assert_eq!(report.ratio, 1.0);
    }

    #[test]
    fn test_limit_keeps_most_recent() {
        let predictions = vec![
            prediction([1, 2, 3, 4, 5, 6], 7, Some(7)),
            prediction([1, 2, 3, 4, 5, 6], 7, Some(40)),
            prediction([1, 2, 3, 4, 5, 6], 7, Some(40)),
        ];
        let report = accuracy_of(&predictions, 1);
        assert_eq!(report.total, 1);
        assert_eq!(report.ratio, 1.0);
    }

    #[test]
    fn test_ratio_is_exact_fraction() {
        let mut predictions = Vec::new();
        for i in 0..7u8 {
            // 3 réussites sur 7.
            let actual = if i < 3 { 7 } else { 40 + i };
            predictions.push(prediction([1, 2, 3, 4, 5, 6], 7, Some(actual)));
        }
        let report = accuracy_of(&predictions, 200);
        assert_eq!(report.ratio, 3.0 / 7.0);
    }

    #[test]
    fn test_accuracy_from_source() {
        let store = MemoryStore::new();
        store.push_prediction(Region::Primary, prediction([1, 2, 3, 4, 5, 6], 7, Some(3)));
        store.push_prediction(Region::Secondary, prediction([1, 2, 3, 4, 5, 6], 7, Some(40)));
        let report = accuracy(&store, Region::Primary, Some(Strategy::Hot), 200).unwrap();
        assert_eq!(report.total, 1);
        assert_eq!(report.normal_hits, 1);
    }
}
