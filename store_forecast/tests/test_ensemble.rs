use assert_approx_eq::assert_approx_eq;
use store_forecast::ensemble::{EnsembleCombiner, EnsembleWeights, ModelOutput};
use store_forecast::models::{ModelKind, ModelVersion};

fn output(kind: ModelKind, point: f64, std: f64) -> ModelOutput {
    ModelOutput {
        kind,
        version: ModelVersion(1),
        point,
        residual_std: std,
    }
}

#[test]
fn test_single_model_passes_through() {
    let combiner = EnsembleCombiner::default();
    let outputs = vec![output(ModelKind::GradientBoost, 50.0, 4.0)];

    let combined = combiner.combine(&outputs).unwrap();

    assert_approx_eq!(combined.point, 50.0);
    // 90% interval: point ± 1.645 * sigma.
    assert_approx_eq!(combined.lower, 50.0 - 1.645 * 4.0, 0.01);
    assert_approx_eq!(combined.upper, 50.0 + 1.645 * 4.0, 0.01);
    assert_eq!(combined.contributions.len(), 1);
    assert_approx_eq!(combined.contributions[0].2, 1.0);
}

#[test]
fn test_weighted_average_of_two_models() {
    let combiner = EnsembleCombiner::default();
    let outputs = vec![
        output(ModelKind::GradientBoost, 50.0, 2.0),
        output(ModelKind::SeasonalTrend, 60.0, 4.0),
    ];

    let combined = combiner.combine(&outputs).unwrap();

    // Default weights 0.7 / 0.3.
    assert_approx_eq!(combined.point, 0.7 * 50.0 + 0.3 * 60.0);

    let sigma = (0.7 * 4.0 + 0.3 * 16.0_f64).sqrt();
    assert_approx_eq!(combined.upper - combined.point, 1.645 * sigma, 0.01);

    let total_weight: f64 = combined.contributions.iter().map(|c| c.2).sum();
    assert_approx_eq!(total_weight, 1.0);
}

#[test]
fn test_lower_bound_clamped_at_zero() {
    let combiner = EnsembleCombiner::default();
    let outputs = vec![output(ModelKind::GradientBoost, 2.0, 10.0)];

    let combined = combiner.combine(&outputs).unwrap();

    assert_eq!(combined.lower, 0.0);
    assert!(combined.upper > combined.point);
}

#[test]
fn test_weights_must_be_normalized_and_non_negative() {
    assert!(EnsembleWeights::new(vec![]).is_err());
    assert!(EnsembleWeights::new(vec![(ModelKind::GradientBoost, -0.2)]).is_err());
    assert!(EnsembleWeights::new(vec![
        (ModelKind::GradientBoost, 0.7),
        (ModelKind::SeasonalTrend, 0.7),
    ])
    .is_err());
    assert!(EnsembleWeights::new(vec![
        (ModelKind::GradientBoost, 0.5),
        (ModelKind::SeasonalTrend, 0.5),
    ])
    .is_ok());
}

#[test]
fn test_confidence_level_validation() {
    let weights = EnsembleWeights::default();
    assert!(EnsembleCombiner::new(weights.clone(), 0.0).is_err());
    assert!(EnsembleCombiner::new(weights.clone(), 1.0).is_err());
    assert!(EnsembleCombiner::new(weights, 0.95).is_ok());
}

#[test]
fn test_empty_outputs_are_rejected() {
    let combiner = EnsembleCombiner::default();
    assert!(combiner.combine(&[]).is_err());
}

#[test]
fn test_zero_sigma_collapses_interval_to_point() {
    let combiner = EnsembleCombiner::default();
    let outputs = vec![output(ModelKind::GradientBoost, 60.0, 0.0)];

    let combined = combiner.combine(&outputs).unwrap();

    assert_approx_eq!(combined.lower, 60.0);
    assert_approx_eq!(combined.upper, 60.0);
}
