use markowitz_core::analysis::{analyze_frontier, FrontierInput};
use markowitz_core::linalg::{mat_vec_multiply, quadratic_form, vec_dot};
use markowitz_core::solver::minimum_variance;
use markowitz_core::{solve, sweep, MarketModel, MarkowitzError};
use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;

const TOL: Decimal = dec!(0.000000001);

fn mu() -> Vec<Decimal> {
    vec![dec!(0.08), dec!(0.12), dec!(0.15)]
}

fn cov() -> Vec<Vec<Decimal>> {
    vec![
        vec![dec!(0.01), dec!(0.003), dec!(0.002)],
        vec![dec!(0.003), dec!(0.0225), dec!(0.009)],
        vec![dec!(0.002), dec!(0.009), dec!(0.04)],
    ]
}

fn model() -> MarketModel {
    MarketModel::new(mu(), cov()).unwrap()
}

/// Minimum-variance weights for three assets computed without inverting the
/// covariance: every feasible portfolio is `w0 + t * d`, where `w0` meets
/// both constraints and `d = 1 x mu` is orthogonal to both. Variance is a
/// parabola in `t` minimized at `t = -(d' S w0) / (d' S d)`.
fn null_space_reference(mu: &[Decimal], cov: &[Vec<Decimal>], target: Decimal) -> Vec<Decimal> {
    let w0 = vec![
        (mu[1] - target) / (mu[1] - mu[0]),
        (target - mu[0]) / (mu[1] - mu[0]),
        Decimal::ZERO,
    ];
    let d = vec![mu[2] - mu[1], mu[0] - mu[2], mu[1] - mu[0]];
    let s_w0 = mat_vec_multiply(cov, &w0).unwrap();
    let t = -vec_dot(&d, &s_w0).unwrap() / quadratic_form(cov, &d).unwrap();
    w0.iter().zip(d.iter()).map(|(a, b)| *a + t * *b).collect()
}

// ---------------------------------------------------------------------------
// Single-target solve
// ---------------------------------------------------------------------------

#[test]
fn test_three_asset_weights_match_independent_solution() {
    let model = model();
    let p = solve(&model, dec!(0.12)).unwrap();
    let reference = null_space_reference(&mu(), &cov(), dec!(0.12));

    for (i, (w, r)) in p.weights.iter().zip(reference.iter()).enumerate() {
        assert!(
            (*w - *r).abs() < TOL,
            "weight {}: solver {} vs reference {}",
            i,
            w,
            r
        );
    }

    let ref_risk = quadratic_form(&cov(), &reference).unwrap().sqrt().unwrap();
    assert!(
        (p.risk - ref_risk).abs() < TOL,
        "risk {} vs reference {}",
        p.risk,
        ref_risk
    );
    assert!((p.expected_return - dec!(0.12)).abs() < TOL);
}

#[test]
fn test_three_asset_weights_in_expected_region() {
    let p = solve(&model(), dec!(0.12)).unwrap();
    assert!((p.weights[0] - dec!(0.2699)).abs() < dec!(0.001));
    assert!((p.weights[1] - dec!(0.3703)).abs() < dec!(0.001));
    assert!((p.weights[2] - dec!(0.3599)).abs() < dec!(0.001));
    assert!((p.risk - dec!(0.1113)).abs() < dec!(0.001));
}

#[test]
fn test_budget_and_return_constraints_across_targets() {
    let model = model();
    let mut target = dec!(-0.10);
    while target <= dec!(0.40) {
        let p = solve(&model, target).unwrap();
        let total: Decimal = p.weights.iter().sum();
        assert!(
            (total - Decimal::ONE).abs() < TOL,
            "target {}: weights sum {}",
            target,
            total
        );
        assert!(
            (vec_dot(&p.weights, &mu()).unwrap() - target).abs() < TOL,
            "target {}: achieved {}",
            target,
            p.expected_return
        );
        assert!(p.risk >= Decimal::ZERO);
        target += dec!(0.025);
    }
}

#[test]
fn test_constraints_hold_for_rescaled_covariance() {
    for factor in [dec!(0.000001), dec!(10000000000), dec!(1000000000000)] {
        let scaled: Vec<Vec<Decimal>> = cov()
            .iter()
            .map(|row| row.iter().map(|x| *x * factor).collect())
            .collect();
        let model = MarketModel::new(mu(), scaled.clone()).unwrap();
        for target in [dec!(0.07), dec!(0.12), dec!(0.16)] {
            let p = solve(&model, target).unwrap();
            let total: Decimal = p.weights.iter().sum();
            assert!(
                (total - Decimal::ONE).abs() < TOL,
                "scale {} target {}: weights sum {}",
                factor,
                target,
                total
            );
            assert!(
                (vec_dot(&p.weights, &mu()).unwrap() - target).abs() < TOL,
                "scale {} target {}: achieved {}",
                factor,
                target,
                p.expected_return
            );

            // Weights do not depend on the covariance scale
            let reference = null_space_reference(&mu(), &cov(), target);
            for (w, r) in p.weights.iter().zip(reference.iter()) {
                assert!((*w - *r).abs() < TOL, "scale {}: {} vs {}", factor, w, r);
            }
        }
    }
}

#[test]
fn test_huge_target_returns_error_instead_of_panicking() {
    let model = model();
    let result = std::panic::catch_unwind(|| solve(&model, dec!(100000000000000)));
    let outcome = result.expect("solve must not panic");
    assert!(
        matches!(outcome, Err(MarkowitzError::ArithmeticOverflow { .. })),
        "{:?}",
        outcome
    );

    let result = std::panic::catch_unwind(|| sweep(&model, Decimal::MIN, Decimal::MAX, 4));
    assert!(result.expect("sweep must not panic").is_err());
}

#[test]
fn test_solve_is_pure() {
    let model = model();
    let first = solve(&model, dec!(0.1)).unwrap();
    let _ = solve(&model, dec!(0.15)).unwrap();
    let again = solve(&model, dec!(0.1)).unwrap();
    assert_eq!(first, again);
    assert_eq!(model.aggregates(), MarketModel::new(mu(), cov()).unwrap().aggregates());
}

// ---------------------------------------------------------------------------
// Error scenarios
// ---------------------------------------------------------------------------

#[test]
fn test_duplicate_asset_is_singular() {
    let cov = vec![
        vec![dec!(0.0225), dec!(0.0225), dec!(0.009)],
        vec![dec!(0.0225), dec!(0.0225), dec!(0.009)],
        vec![dec!(0.009), dec!(0.009), dec!(0.04)],
    ];
    let err = MarketModel::new(mu(), cov).unwrap_err();
    assert!(matches!(err, MarkowitzError::SingularCovariance(_)), "{err}");
}

#[test]
fn test_proportional_returns_are_degenerate() {
    // mu = 0.1 * 1 gives B = 0.1 A and C = 0.01 A, so A*C == B^2
    let model = MarketModel::new(vec![dec!(0.1); 3], cov()).unwrap();
    let err = solve(&model, dec!(0.1)).unwrap_err();
    assert!(matches!(err, MarkowitzError::DegenerateMarket { .. }), "{err}");

    let err = sweep(&model, dec!(0.07), dec!(0.16), 100).unwrap_err();
    assert!(matches!(err, MarkowitzError::DegenerateMarket { .. }), "{err}");

    // The minimum-variance portfolio only needs A > 0
    let gmv = minimum_variance(&model).unwrap();
    assert!((gmv.expected_return - dec!(0.1)).abs() < TOL);
    let total: Decimal = gmv.weights.iter().sum();
    assert!((total - Decimal::ONE).abs() < TOL);
}

#[test]
fn test_dimension_mismatch() {
    let err = MarketModel::new(vec![dec!(0.1), dec!(0.2)], cov()).unwrap_err();
    assert!(matches!(err, MarkowitzError::DimensionMismatch { .. }), "{err}");
}

#[test]
fn test_error_messages() {
    let err = sweep(&model(), dec!(0.2), dec!(0.1), 10).unwrap_err();
    assert!(err.to_string().starts_with("Invalid frontier range"));

    let err = MarketModel::new(vec![dec!(0.1), dec!(0.2)], cov()).unwrap_err();
    assert!(err.to_string().contains("expected_returns"));
}

// ---------------------------------------------------------------------------
// Frontier sweep
// ---------------------------------------------------------------------------

#[test]
fn test_hundred_point_sweep() {
    let model = model();
    let curve = sweep(&model, dec!(0.07), dec!(0.16), 100).unwrap();
    assert_eq!(curve.len(), 100);

    let points = curve.points();
    assert!((points[0].expected_return - dec!(0.07)).abs() < TOL);
    assert!((points[99].expected_return - dec!(0.16)).abs() < TOL);
    for pair in points.windows(2) {
        assert!(
            pair[1].expected_return > pair[0].expected_return,
            "returns not increasing: {} then {}",
            pair[0].expected_return,
            pair[1].expected_return
        );
    }

    let idx = curve.min_risk_index().unwrap();
    assert!(idx > 0 && idx < 99, "min risk at index {}", idx);

    // The fold sits next to the global minimum-variance return
    let gmv = minimum_variance(&model).unwrap();
    let step = (dec!(0.16) - dec!(0.07)) / dec!(99);
    assert!((points[idx].expected_return - gmv.expected_return).abs() <= step);
    assert!(points[idx].risk >= gmv.risk);
}

#[test]
fn test_risk_not_monotonic_along_curve() {
    let curve = sweep(&model(), dec!(0.07), dec!(0.16), 100).unwrap();
    let pairs = curve.risk_return_pairs();
    let idx = curve.min_risk_index().unwrap();
    // Risk falls towards the minimum-variance point, then rises
    assert!(pairs[0].0 > pairs[idx].0);
    assert!(pairs[99].0 > pairs[idx].0);
}

#[test]
fn test_shared_model_across_threads() {
    let model = model();
    let targets = [dec!(0.07), dec!(0.1), dec!(0.13), dec!(0.16)];
    let sequential: Vec<_> = targets.iter().map(|t| solve(&model, *t).unwrap()).collect();

    let parallel: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = targets
            .iter()
            .map(|t| {
                let model = &model;
                s.spawn(move || solve(model, *t).unwrap())
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(sequential, parallel);
}

// ---------------------------------------------------------------------------
// Analysis envelope
// ---------------------------------------------------------------------------

#[test]
fn test_analysis_from_json() {
    let input: FrontierInput = serde_json::from_str(
        r#"{
            "asset_names": ["Bonds", "Equity", "Commodities"],
            "expected_returns": [0.08, 0.12, 0.15],
            "covariance_matrix": [
                [0.01, 0.003, 0.002],
                [0.003, 0.0225, 0.009],
                [0.002, 0.009, 0.04]
            ],
            "target_return": 0.11,
            "frontier_points": 25
        }"#,
    )
    .unwrap();

    let out = analyze_frontier(&input).unwrap();
    assert_eq!(out.result.efficient_frontier.len(), 25);
    assert_eq!(out.result.selected.weights[1].name, "Equity");
    assert!((out.result.selected.expected_return - dec!(0.11)).abs() < TOL);

    let json = serde_json::to_value(&out).unwrap();
    assert!(json["result"]["selected"]["risk"].is_string());
    assert!(json["metadata"]["version"].is_string());
}
