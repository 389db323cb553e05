use approx::assert_relative_eq;

use xyfit::fit::{nonlinear_batch, polynomial_batch};
use xyfit::math::{Operand, dot, identity};
use xyfit::nonlinear::{
    BuiltinEquation, CustomEquation, ErrorWeighting, Param, Role, SolverSettings, SolverState,
    Transform,
};
use xyfit::synthetic::{decay_series, linspace, observations_from_model, polynomial_series};
use xyfit::{
    FitError, Matrix, MessageBag, NonlinearOptions, PolynomialEvaluation, XYPoint,
    exponential_decay_regression, exponential_decay_regression_or_sentinel, invert_matrix,
    multiple_linear_regression, nonlinear_regression, nonlinear_regression_observations,
    polynomial_regression, polynomial_regression_with, qr_decompose,
};

fn bits(v: &[f64]) -> Vec<u64> {
    v.iter().map(|x| x.to_bits()).collect()
}

fn assert_matrix_eq(a: &Matrix, b: &Matrix, eps: f64) {
    assert_eq!(a.shape(), b.shape());
    for (x, y) in a.iter().zip(b.iter()) {
        assert_relative_eq!(*x, *y, epsilon = eps);
    }
}

#[test]
fn inverse_of_inverse_is_identity_map() {
    let a = Matrix::from_row_slice(3, 3, &[4.0, 7.0, 2.0, 3.0, 6.0, 1.0, 2.0, 5.0, 3.0]);
    let back = invert_matrix(&invert_matrix(&a).unwrap()).unwrap();
    assert_matrix_eq(&back, &a, 1e-9);

    let prod = dot(
        &Operand::Matrix(a.clone()),
        &Operand::Matrix(invert_matrix(&a).unwrap()),
    )
    .unwrap();
    match prod {
        Operand::Matrix(m) => assert_matrix_eq(&m, &identity(3), 1e-9),
        other => panic!("expected a matrix, got {other:?}"),
    }
}

#[test]
fn qr_factors_of_a_vandermonde_design() {
    let a = Matrix::from_fn(6, 3, |i, j| (i as f64 + 1.0).powi(j as i32));
    let qr = qr_decompose(&a).unwrap();
    let q = xyfit::math::matrix_from_rows(&qr.q).unwrap();
    let r = xyfit::math::matrix_from_rows(&qr.r).unwrap();
    assert_matrix_eq(&(&q * &r), &a, 1e-9);
    assert_matrix_eq(&q.tr_mul(&q), &identity(3), 1e-9);
}

#[test]
fn line_through_multiple_regression() {
    let rows: Vec<Vec<f64>> = (1..=10).map(|i| vec![i as f64, 2.0 * i as f64 + 3.0]).collect();
    let res = multiple_linear_regression(&rows).unwrap();
    assert_relative_eq!(res.slopes[0], 3.0, epsilon = 1e-9);
    assert_relative_eq!(res.slopes[1], 2.0, epsilon = 1e-9);
    assert_relative_eq!(res.rsquared, 1.0, epsilon = 1e-9);
}

#[test]
fn polynomial_modes_share_coefficients() {
    let s = xyfit::domain::series_from_pairs(&[(1.0, 1.0), (2.0, 4.0), (3.0, 9.0), (4.0, 16.0)]);
    let standard = polynomial_regression(&s, 2).unwrap();
    let legacy = polynomial_regression_with(&s, 2, PolynomialEvaluation::LegacyHighestPower).unwrap();

    assert_eq!(standard.slopes, legacy.slopes);
    for (p, q) in standard.points.iter().zip(&s) {
        assert_relative_eq!(p.y, q.y, epsilon = 1e-8);
    }
    // Legacy values are x² times the coefficient sum.
    let total: f64 = legacy.slopes.iter().sum();
    for (p, q) in legacy.points.iter().zip(&s) {
        assert_relative_eq!(p.y, q.x * q.x * total, epsilon = 1e-12);
    }
}

#[test]
fn noisy_polynomial_recovers_coefficients() {
    let xs = linspace(-2.0, 0.1, 41);
    let s = polynomial_series(&[0.5, -1.0, 2.0], &xs, 0.01, 11).unwrap();
    let fit = polynomial_regression(&s, 2).unwrap();
    assert_relative_eq!(fit.slopes[0], 0.5, epsilon = 0.02);
    assert_relative_eq!(fit.slopes[1], -1.0, epsilon = 0.02);
    assert_relative_eq!(fit.slopes[2], 2.0, epsilon = 0.02);
    assert!(fit.rsquared > 0.999);
}

#[test]
fn decay_fit_and_sentinel_agree_on_success() {
    let xs = linspace(0.0, 1.0, 50);
    let s = decay_series(2.0, 5.0, 1.0, &xs, 0.0, 0).unwrap();
    let strict = exponential_decay_regression(&s).unwrap();
    let lenient = exponential_decay_regression_or_sentinel(&s).unwrap();
    assert_eq!(strict, lenient);
    assert!(!strict.is_sentinel());
    let [a, t] = strict.results();
    assert_relative_eq!(a, 2.0, max_relative = 0.05);
    assert_relative_eq!(t, 5.0, max_relative = 0.05);
}

#[test]
fn builtin_decay_through_the_front_door() {
    let xs = linspace(0.0, 0.5, 40);
    let s = decay_series(3.0, 4.0, 1.5, &xs, 0.0, 0).unwrap();
    let opts = NonlinearOptions::new(BuiltinEquation::OffsetDecay, vec![2.8, 1.4, 4.3]);
    let fit = nonlinear_regression(&s, &opts).unwrap().into_converged().unwrap();

    assert_eq!(fit.state, SolverState::Converged);
    assert!(fit.iterations < 200);
    assert_relative_eq!(fit.value(Param::A).unwrap(), 3.0, max_relative = 0.01);
    assert_relative_eq!(fit.value(Param::B).unwrap(), 1.5, max_relative = 0.01);
    assert_relative_eq!(fit.value(Param::C).unwrap(), 4.0, max_relative = 0.01);
    assert!(fit.state.is_terminal());
}

#[test]
fn repeated_nonlinear_fits_are_bit_identical() {
    let xs = linspace(0.0, 0.5, 40);
    let s = decay_series(3.0, 4.0, 1.5, &xs, 0.05, 42).unwrap();
    let opts = NonlinearOptions::new(BuiltinEquation::OffsetDecay, vec![2.8, 1.4, 4.3]);

    let first = nonlinear_regression(&s, &opts).unwrap();
    let second = nonlinear_regression(&s, &opts).unwrap();
    assert_eq!(bits(&first.values()), bits(&second.values()));
    assert_eq!(bits(&first.rms_history), bits(&second.rms_history));
    assert_eq!(first.text, second.text);
    assert_eq!(first.covariance_report, second.covariance_report);
}

#[test]
fn repeated_linear_fits_are_bit_identical() {
    let xs = linspace(-1.0, 2.0, 30);
    let s = polynomial_series(&[0.5, -1.0, 0.2], &xs, 0.3, 5).unwrap();

    let first = polynomial_regression(&s, 2).unwrap();
    let second = polynomial_regression(&s, 2).unwrap();
    assert_eq!(bits(&first.slopes), bits(&second.slopes));
    assert_eq!(first.rsquared.to_bits(), second.rsquared.to_bits());
    let ys = |f: &xyfit::PolynomialFit| f.points.iter().map(|p| p.y).collect::<Vec<_>>();
    assert_eq!(bits(&ys(&first)), bits(&ys(&second)));

    let rows: Vec<Vec<f64>> = s.iter().map(|p| vec![p.x, p.y]).collect();
    let first = multiple_linear_regression(&rows).unwrap();
    let second = multiple_linear_regression(&rows).unwrap();
    assert_eq!(bits(&first.slopes), bits(&second.slopes));
    assert_eq!(first.rsquared.to_bits(), second.rsquared.to_bits());
}

#[test]
fn repeated_decay_fits_are_bit_identical() {
    let xs = linspace(0.0, 1.0, 50);
    let s = decay_series(2.0, 5.0, 1.0, &xs, 0.0, 0).unwrap();

    let first = exponential_decay_regression(&s).unwrap();
    let second = exponential_decay_regression(&s).unwrap();
    assert_eq!(bits(&first.results()), bits(&second.results()));
    assert_eq!(first, second);
}

#[test]
fn two_variable_custom_equation() {
    // y = a·x1 + b·x2²
    let grid: Vec<Vec<f64>> = (0..6)
        .flat_map(|i| (0..5).map(move |j| vec![i as f64, 1.0 + j as f64]))
        .collect();
    let obs = observations_from_model(&grid, |v| 1.5 * v[0] + 0.25 * v[1] * v[1], 0.0, 0).unwrap();

    let eq = CustomEquation::new(
        "a * x1 + b * x2 * x2",
        vec![
            Role::Param(Param::A),
            Role::X,
            Role::Param(Param::B),
            Role::Variable(2),
        ],
        |v| v[0] * v[1] + v[2] * v[3] * v[3],
    );
    let fit = nonlinear_regression_observations(&obs, &NonlinearOptions::new(eq, vec![1.0, 1.0]))
        .unwrap();
    assert_relative_eq!(fit.values()[0], 1.5, epsilon = 1e-6);
    assert_relative_eq!(fit.values()[1], 0.25, epsilon = 1e-6);
    assert_eq!(fit.points[0].x.len(), 2);
    assert!(fit.text.lines().nth(1).unwrap().contains("x2"));
}

#[test]
fn settings_from_json_drive_the_solver() {
    let settings: SolverSettings = serde_json::from_str(
        r#"{"error_weighting": "relative", "centered_derivatives": true, "iterations": 5000}"#,
    )
    .unwrap();
    assert_eq!(settings.error_weighting, ErrorWeighting::Relative);
    assert_eq!(settings.y_transform, Transform::Identity);
    assert_eq!(settings.effective_iterations(), 200);

    let xs = linspace(0.0, 0.5, 40);
    let s = decay_series(3.0, 4.0, 1.5, &xs, 0.0, 0).unwrap();
    let opts = NonlinearOptions::new(BuiltinEquation::OffsetDecay, vec![2.8, 1.4, 4.3])
        .with_settings(settings);
    let fit = nonlinear_regression(&s, &opts).unwrap();
    assert!(fit.converged());
    assert_relative_eq!(fit.values()[2], 4.0, max_relative = 0.01);
}

#[test]
fn batch_helpers_cover_many_series() {
    let xs = linspace(0.0, 0.5, 40);
    let decays: Vec<Vec<XYPoint>> = (0..3)
        .map(|seed| decay_series(3.0, 4.0, 1.5, &xs, 0.01, seed).unwrap())
        .collect();
    let opts = NonlinearOptions::new(BuiltinEquation::OffsetDecay, vec![2.8, 1.4, 4.3]);
    for fit in nonlinear_batch(&decays, &opts) {
        assert_relative_eq!(fit.unwrap().values()[0], 3.0, max_relative = 0.05);
    }

    let fits = polynomial_batch(&decays, 0);
    assert!(fits.iter().all(|f| matches!(f, Err(FitError::InvalidOption(_)))));
}

#[test]
fn message_bag_annotates_outcomes() {
    let xs = linspace(0.0, 1.0, 20);
    let growth: Vec<XYPoint> = xs
        .iter()
        .map(|&x| XYPoint::new(x, 1.0 + 0.1 * (x / 4.0).exp()))
        .collect();

    let mut bag = MessageBag::new();
    match exponential_decay_regression(&growth) {
        Ok(_) => bag.info("decay fitted"),
        Err(e) => bag.danger(e.to_string()),
    }
    assert!(bag.has_danger());
    assert!(bag.danger[0].contains("window"));
}
