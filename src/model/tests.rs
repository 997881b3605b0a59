use std::rc::Rc;

use assert_approx_eq::assert_approx_eq;

use super::*;
use crate::{
    constraint::MinMaxConstraint,
    error::Error,
    layers::{Dense, GaussianNoise},
    regularizer::{L1L2, MaximiseDiscrepancy, Regularizer},
    rng::Initializer,
    tensor::Activation,
};

/// Samples of a linear map `3 -> 2`.
fn regression_data() -> (DenseMatrix, DenseMatrix) {
    let mut xs = Vec::new();
    let mut ys = Vec::new();

    for i in 0..64 {
        let a = (i % 8) as f32 / 8.0;
        let b = (i / 8) as f32 / 8.0;
        let c = ((i * 5) % 7) as f32 / 7.0;
        xs.extend_from_slice(&[a, b, c]);
        ys.extend_from_slice(&[a + 2.0 * b - c, 0.5 * c - a]);
    }

    (DenseMatrix::from_samples(3, &xs).unwrap(), DenseMatrix::from_samples(2, &ys).unwrap())
}

fn linear_model(layer: &Rc<Dense>, seed: u64) -> Model {
    let mut builder = ModelBuilder::new("linear", Some(seed));
    let input = builder.input(3).unwrap();
    let out = builder.dense(layer, input).unwrap();
    builder.build(out).unwrap()
}

fn options(epochs: usize) -> FitOptions {
    FitOptions { batch_size: 16, epochs, shuffle: true, verbose: 0, seed: Some(7) }
}

#[test]
fn loss_decreases() {
    let (x, y) = regression_data();
    let layer = Rc::new(Dense::new(2).with_name("out"));
    let mut model = linear_model(&layer, 42);
    model.compile_with(Optimiser::new("adam".parse().unwrap()).with_learning_rate(0.05), &[]);

    let history = model.fit(&x, &y, &options(40)).unwrap();
    let losses = history.losses();

    assert_eq!(losses.len(), 40);
    assert!(losses[39] < 0.5 * losses[0], "{losses:?}");

    let eval = model.evaluate(&x, &y).unwrap();
    assert!(eval.loss < losses[0]);
    assert!(eval.accuracy.is_none());
}

#[test]
fn fit_requires_compile() {
    let (x, y) = regression_data();
    let mut model = linear_model(&Rc::new(Dense::new(2)), 42);
    assert!(matches!(model.fit(&x, &y, &options(1)), Err(Error::NotCompiled(_))));
}

#[test]
fn data_is_checked() {
    let (x, y) = regression_data();
    let mut model = linear_model(&Rc::new(Dense::new(2)), 42);
    model.compile(OptimiserKind::default(), &[]);

    assert!(matches!(model.fit(&y, &y, &options(1)), Err(Error::InvalidData(_))));
    assert!(matches!(model.fit(&x, &x, &options(1)), Err(Error::InvalidData(_))));
    assert!(matches!(model.predict(&y), Err(Error::InvalidData(_))));

    let fewer = y.select_samples(&[0, 1, 2]);
    assert!(matches!(model.evaluate(&x, &fewer), Err(Error::InvalidData(_))));

    let zero_batch = FitOptions { batch_size: 0, ..options(1) };
    assert!(matches!(model.fit(&x, &y, &zero_batch), Err(Error::InvalidConfig(_))));
}

#[test]
fn constraint_holds_after_every_step() {
    let (x, y) = regression_data();
    let layer = Rc::new(
        Dense::new(2)
            .with_name("clipped")
            .with_kernel_initializer(Initializer::random_uniform())
            .with_kernel_constraint(MinMaxConstraint::default())
            .with_bias_constraint(MinMaxConstraint::new(-0.01, 0.01).unwrap()),
    );
    let mut model = linear_model(&layer, 42);
    model.compile("sgd".parse().unwrap(), &[]);

    for _ in 0..3 {
        model.fit(&x, &y, &options(1)).unwrap();

        let kernel = model.weights("clipped/kernel").unwrap();
        assert!(kernel.values().iter().all(|w| (0.0..=9.0).contains(w)), "{kernel:?}");

        let bias = model.weights("clipped/bias").unwrap();
        assert!(bias.values().iter().all(|b| (-0.01..=0.01).contains(b)), "{bias:?}");
    }
}

#[test]
fn activity_penalty_is_part_of_the_loss() {
    let (x, _) = regression_data();
    let reg = MaximiseDiscrepancy::new(0.5, 1.0).unwrap();
    let layer = Rc::new(
        Dense::new(4).with_name("code").with_activation(Activation::Softmax).with_activity_regularizer(reg),
    );

    let mut builder = ModelBuilder::new("sparse", Some(3));
    let input = builder.input(3).unwrap();
    let out = builder.dense(&layer, input).unwrap();
    let mut model = builder.build(out).unwrap();
    model.compile(OptimiserKind::default(), &[Metric::Accuracy]);

    let target = DenseMatrix::zeroed(crate::shape::Shape::new(4, x.num_samples()));
    let eval = model.evaluate(&x, &target).unwrap();

    let prediction = model.predict(&x).unwrap();
    let samples = x.num_samples() as f32;
    let mse = prediction.values().iter().map(|p| p * p).sum::<f32>() / 4.0 / samples;
    let penalty = reg.penalty(prediction.values()) / samples;

    assert_approx_eq!(eval.loss, mse + penalty, 1e-5);
    assert!(eval.accuracy.is_some());
}

#[test]
fn kernel_penalty_counts_once_per_sample() {
    let (x, y) = regression_data();
    let reg = L1L2 { l1: 0.0, l2: 0.1 };
    let layer = Rc::new(Dense::new(2).with_name("decayed").with_kernel_regularizer(reg));
    let mut model = linear_model(&layer, 42);
    model.compile(OptimiserKind::default(), &[]);

    let eval = model.evaluate(&x, &y).unwrap();

    let prediction = model.predict(&x).unwrap();
    let samples = x.num_samples() as f32;
    let mse = prediction.values().iter().zip(y.values()).map(|(p, t)| (p - t) * (p - t)).sum::<f32>() / 2.0 / samples;
    let kernel = model.weights("decayed/kernel").unwrap();

    assert_approx_eq!(eval.loss, mse + reg.penalty(kernel.values()), 1e-4);
}

#[test]
fn softmax_code_becomes_sparser() {
    let (x, _) = regression_data();
    let reg = MaximiseDiscrepancy::new(0.5, 1.0).unwrap();
    let layer = Rc::new(
        Dense::new(4)
            .with_name("code")
            .with_activation(Activation::Softmax)
            .with_activity_regularizer(reg),
    );

    let mut builder = ModelBuilder::new("sparse", Some(11));
    let input = builder.input(3).unwrap();
    let out = builder.dense(&layer, input).unwrap();
    let mut model = builder.build(out).unwrap();
    model.compile(OptimiserKind::Adam(Default::default()), &[]);

    // a uniform target leaves only the penalty to drive the code apart
    let uniform = DenseMatrix::from_samples(4, &vec![0.25; 4 * x.num_samples()]).unwrap();

    let before = reg.penalty(model.predict(&x).unwrap().values());
    model.fit(&x, &uniform, &FitOptions { batch_size: 64, ..options(200) }).unwrap();
    let after = reg.penalty(model.predict(&x).unwrap().values());

    assert!(after > before, "{before} -> {after}");
}

#[test]
fn divergence_is_reported() {
    let (x, y) = regression_data();
    let x = DenseMatrix::from_samples(3, &x.values().iter().map(|v| 100.0 * v + 10.0).collect::<Vec<_>>()).unwrap();
    let mut model = linear_model(&Rc::new(Dense::new(2)), 42);
    model.compile_with(Optimiser::new("sgd".parse().unwrap()).with_learning_rate(1e10), &[]);

    assert!(matches!(model.fit(&x, &y, &options(50)), Err(Error::Diverged { .. })));
}

#[test]
fn accuracy_counts_argmax_matches() {
    let layer = Rc::new(Dense::new(2).with_name("id"));
    let mut builder = ModelBuilder::new("identity", None);
    let input = builder.input(2).unwrap();
    let out = builder.dense(&layer, input).unwrap();
    let mut model = builder.build(out).unwrap();
    model.compile(OptimiserKind::default(), &[Metric::Accuracy]);

    {
        let params = layer.params().unwrap();
        params.kernel.borrow_mut().values.values_mut().copy_from_slice(&[1.0, 0.0, 0.0, 1.0]);
    }

    let x = DenseMatrix::from_samples(2, &[1.0, 0.0, 0.0, 1.0, 0.2, 0.9, 0.7, 0.1]).unwrap();
    let y = DenseMatrix::from_samples(2, &[1.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 1.0]).unwrap();

    let eval = model.evaluate(&x, &y).unwrap();
    assert_eq!(eval.accuracy, Some(0.5));
}

#[test]
fn shared_layers_share_training() {
    let (x, y) = regression_data();
    let hidden = Rc::new(Dense::new(5).with_name("hidden").with_activation(Activation::Sigmoid));
    let head = Rc::new(Dense::new(2).with_name("head"));

    let mut builder = ModelBuilder::new("first", Some(1));
    let input = builder.input(3).unwrap();
    let h = builder.dense(&hidden, input).unwrap();
    let out = builder.dense(&head, h).unwrap();
    let mut first = builder.build(out).unwrap();

    let mut builder = ModelBuilder::new("second", Some(2));
    let input = builder.input(3).unwrap();
    let h = builder.dense(&hidden, input).unwrap();
    let second = builder.build(h).unwrap();

    let before = second.weights("hidden/kernel").unwrap();
    first.compile(OptimiserKind::default(), &[]);
    first.fit(&x, &y, &options(1)).unwrap();

    assert_ne!(second.weights("hidden/kernel").unwrap(), before);
    assert_eq!(second.weights("hidden/kernel").unwrap(), first.weights("hidden/kernel").unwrap());
    assert_eq!(first.num_params(), 3 * 5 + 5 + 5 * 2 + 2);
    assert_eq!(second.num_params(), 20);
}

#[test]
fn layer_names_must_be_unique() {
    let mut builder = ModelBuilder::new("dup", None);
    let input = builder.input(3).unwrap();
    let a = builder.dense(&Rc::new(Dense::new(3).with_name("same")), input).unwrap();
    assert!(matches!(builder.dense(&Rc::new(Dense::new(3).with_name("same")), a), Err(Error::DuplicateId(_))));
}

#[test]
fn summary_table() {
    let layer = Rc::new(Dense::new(4).with_name("encoder_N1").with_activation(Activation::Sigmoid));
    let mut builder = ModelBuilder::new("model_1", None);
    let input = builder.input(6).unwrap();
    let noisy = builder.noise(&GaussianNoise::new(0.1).unwrap(), input).unwrap();
    let out = builder.dense(&layer, noisy).unwrap();
    let model = builder.build(out).unwrap();

    let summary = model.summary();
    assert!(summary.starts_with("Model: \"model_1\""));
    assert!(summary.contains("encoder_N1 (Dense)"));
    assert!(summary.contains("(None, 4)"));
    assert!(summary.contains("GaussianNoise"));
    assert!(summary.contains("Total params: 28"));
}

#[test]
fn summary_lists_reused_layers_once() {
    let name = "a_rather_long_hidden_layer_name";
    let hidden = Rc::new(Dense::new(6).with_name(name).with_activation(Activation::Sigmoid));
    let mut builder = ModelBuilder::new("repeat", None);
    let input = builder.input(6).unwrap();
    let once = builder.dense(&hidden, input).unwrap();
    let twice = builder.dense(&hidden, once).unwrap();
    let model = builder.build(twice).unwrap();

    let summary = model.summary();
    let rows = summary.lines().filter(|line| line.contains(name)).collect::<Vec<_>>();
    assert_eq!(rows.len(), 1, "{summary}");
    assert!(rows[0].contains(&format!("{name} (Dense) (None, 6)")), "{summary}");
    assert!(rows[0].ends_with(" 42"), "{summary}");
    assert!(summary.contains("Total params: 42"));
}

#[test]
fn save_and_load_weights() {
    let (x, _) = regression_data();
    let dir = std::env::temp_dir().join(format!("sae-model-test-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("weights.bin");

    let mut trained = linear_model(&Rc::new(Dense::new(2).with_name("out")), 42);
    trained.save_weights(&path).unwrap();
    let expected = trained.predict(&x).unwrap();

    let mut fresh = linear_model(&Rc::new(Dense::new(2).with_name("out")), 43);
    assert_ne!(fresh.predict(&x).unwrap(), expected);

    fresh.load_weights(&path).unwrap();
    assert_eq!(fresh.predict(&x).unwrap(), expected);

    let mut other = linear_model(&Rc::new(Dense::new(2).with_name("other")), 42);
    assert!(matches!(other.load_weights(&path), Err(Error::UnknownWeights(_))));
    assert!(other.predict(&x).is_ok());

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn failed_load_keeps_current_weights() {
    let (x, y) = regression_data();
    let dir = std::env::temp_dir().join(format!("sae-model-partial-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("weights.bin");

    // `out` is written before `zzz`, so a partial load would already have
    // replaced `out/kernel` when `zzz/kernel` turns out to be unknown.
    let mut builder = ModelBuilder::new("wide", Some(42));
    let input = builder.input(3).unwrap();
    let hidden = builder.dense(&Rc::new(Dense::new(2).with_name("out")), input).unwrap();
    let extra = builder.dense(&Rc::new(Dense::new(2).with_name("zzz")), hidden).unwrap();
    builder.build(extra).unwrap().save_weights(&path).unwrap();

    let mut model = linear_model(&Rc::new(Dense::new(2).with_name("out")), 43);
    model.compile("sgd".parse().unwrap(), &[]);
    model.fit(&x, &y, &options(2)).unwrap();
    let before = model.weights("out/kernel").unwrap();
    let predicted = model.predict(&x).unwrap();

    assert!(matches!(model.load_weights(&path), Err(Error::UnknownWeights(_))));
    assert_eq!(model.weights("out/kernel").unwrap(), before);
    assert_eq!(model.predict(&x).unwrap(), predicted);

    std::fs::remove_dir_all(&dir).unwrap();
}
