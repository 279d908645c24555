//! End-to-end evaluation over a small synthetic dataset.

use tephra_eval::{ResampleTrainer, aggregate};
use tephra_prep::{
    BootstrapConfig, CategoricalColumn, ModelingFrame, NumericColumn, PreprocessConfig,
};
use tephra_rf::ForestConfig;

/// Twenty rows, five per class, with a class-aligned numeric predictor
/// and a categorical predictor.
fn make_dataset() -> (ModelingFrame, Vec<usize>) {
    let mut elevation = Vec::new();
    let mut rock = Vec::new();
    let mut labels = Vec::new();
    for class in 0..4 {
        for i in 0..5 {
            elevation.push(class as f64 * 1000.0 + i as f64 * 10.0);
            rock.push(
                match class {
                    0 => "Andesite",
                    1 => "Basalt",
                    2 => "Dacite",
                    _ => "Rhyolite",
                }
                .to_string(),
            );
            labels.push(class);
        }
    }
    let frame = ModelingFrame::new(
        vec![NumericColumn::new("elevation", elevation).unwrap()],
        vec![CategoricalColumn::new("major_rock_1", rock)],
    )
    .unwrap();
    (frame, labels)
}

fn make_trainer() -> ResampleTrainer {
    ResampleTrainer::new(
        PreprocessConfig::new(),
        ForestConfig::new(25).unwrap().with_seed(42),
        4,
    )
}

#[test]
fn full_evaluation_run() {
    let (frame, labels) = make_dataset();
    let resamples = BootstrapConfig::new(10)
        .unwrap()
        .with_seed(42)
        .draw(frame.n_rows())
        .unwrap();

    let outcomes = make_trainer().run(&frame, &labels, &resamples).unwrap();
    assert_eq!(outcomes.len(), 10);

    // Every prediction row must be out-of-bag for its resample.
    for (outcome, resample) in outcomes.iter().zip(&resamples) {
        for prediction in &outcome.predictions {
            assert!(resample.out_of_bag.contains(&prediction.row));
            assert!(!resample.in_bag.contains(&prediction.row));
        }
    }

    let report = aggregate(&outcomes, 4, frame.n_rows()).unwrap();
    assert!((0.0..=1.0).contains(&report.overall_accuracy));
    assert!((0.0..=1.0).contains(&report.mean_accuracy));
    assert_eq!(report.per_resample.len(), 10);
    for metrics in &report.per_resample {
        if let Some(acc) = metrics.accuracy {
            assert!((0.0..=1.0).contains(&acc));
        }
        if let Some(auc) = metrics.auc {
            assert!((0.0..=1.0).contains(&auc));
        }
    }
    assert_eq!(report.confusion.total(), outcomes
        .iter()
        .map(|o| o.predictions.len())
        .sum::<usize>());
    for entry in &report.spatial {
        assert!(entry.n_correct <= entry.n_appearances);
        assert!((0.0..=1.0).contains(&entry.correct_fraction));
    }
}

#[test]
fn evaluation_is_deterministic() {
    let (frame, labels) = make_dataset();
    let resamples = BootstrapConfig::new(6)
        .unwrap()
        .with_seed(7)
        .draw(frame.n_rows())
        .unwrap();
    let trainer = make_trainer();

    let report_a = aggregate(
        &trainer.run(&frame, &labels, &resamples).unwrap(),
        4,
        frame.n_rows(),
    )
    .unwrap();
    let report_b = aggregate(
        &trainer.run(&frame, &labels, &resamples).unwrap(),
        4,
        frame.n_rows(),
    )
    .unwrap();

    assert_eq!(report_a.overall_accuracy, report_b.overall_accuracy);
    assert_eq!(report_a.mean_accuracy, report_b.mean_accuracy);
    assert_eq!(report_a.mean_auc, report_b.mean_auc);
    assert_eq!(report_a.confusion.as_rows(), report_b.confusion.as_rows());
}

#[test]
fn single_level_categorical_is_tolerated() {
    // A categorical with one level everywhere collapses to zero-variance
    // indicators and drops out; the numeric column still separates classes.
    let mut x = Vec::new();
    let mut cat = Vec::new();
    let mut labels = Vec::new();
    for class in 0..2 {
        for i in 0..8 {
            x.push(class as f64 * 100.0 + i as f64);
            cat.push("Subduction".to_string());
            labels.push(class);
        }
    }
    let frame = ModelingFrame::new(
        vec![NumericColumn::new("x", x).unwrap()],
        vec![CategoricalColumn::new("tectonic_settings", cat)],
    )
    .unwrap();

    let resamples = BootstrapConfig::new(4)
        .unwrap()
        .with_seed(1)
        .draw(frame.n_rows())
        .unwrap();
    let trainer = ResampleTrainer::new(
        PreprocessConfig::new(),
        ForestConfig::new(15).unwrap().with_seed(1),
        2,
    );
    let outcomes = trainer.run(&frame, &labels, &resamples).unwrap();
    let report = aggregate(&outcomes, 2, frame.n_rows()).unwrap();
    assert!(report.overall_accuracy > 0.8);
}
