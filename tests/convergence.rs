use approx::assert_abs_diff_eq;

use reflfit_minimizer::{
    HillClimbMinimizer, Minimizer, MinimizerConfig, Problem, StageSpec, StagedHillClimbMinimizer,
    Status,
};

/// Unbounded below as (x, y) approaches the origin.
fn inverse_square(params: &[f64]) -> f64 {
    -1.0 / (params[0] * params[0] + params[1] * params[1])
}

fn origin_problem(config: MinimizerConfig) -> Problem {
    Problem::new(
        vec![2.0, -2.0],
        vec![-4.0, -4.0],
        vec![4.0, 4.0],
        inverse_square,
        config,
    )
    .unwrap()
}

#[test]
fn hill_climb_2d_finds_the_origin() {
    let problem = origin_problem(MinimizerConfig::new(10_000_000).with_seed(2024));

    let result = HillClimbMinimizer::new().minimize(&problem);

    assert_eq!(result.status, Status::BudgetExhausted);
    assert_eq!(result.evaluations, 10_000_000);
    let params = problem.current_parameters();
    assert_abs_diff_eq!(params[0], 0.0, epsilon = 1e-6);
    assert_abs_diff_eq!(params[1], 0.0, epsilon = 1e-6);
}

#[test]
fn parallel_reads_find_the_origin() {
    let config = MinimizerConfig::new(200_000)
        .with_parallel_reads(true)
        .with_batch_size(8)
        .with_seed(7);
    let problem = origin_problem(config);

    let result = HillClimbMinimizer::new().minimize(&problem);

    assert_eq!(result.evaluations, 200_000);
    assert_abs_diff_eq!(result.params[0], 0.0, epsilon = 1e-6);
    assert_abs_diff_eq!(result.params[1], 0.0, epsilon = 1e-6);
}

#[test]
fn staged_run_finds_the_origin_and_keeps_improving() {
    let config = MinimizerConfig::new(100_000)
        .with_stages(vec![StageSpec::new(1.0), StageSpec::new(1e-2)])
        .with_terminal_stage(StageSpec::new(1e-4))
        .with_seed(31);
    let problem = origin_problem(config);

    let result = StagedHillClimbMinimizer::new().minimize(&problem);

    assert_eq!(result.stages.len(), 3);
    assert_eq!(result.evaluations, 300_000);
    assert!(result.penalty <= result.stages[0].penalty);
    assert_abs_diff_eq!(result.params[0], 0.0, epsilon = 1e-6);
    assert_abs_diff_eq!(result.params[1], 0.0, epsilon = 1e-6);
}

#[test]
fn reflectivity_like_scales_all_move() {
    // densities near 1, thickness near 10, background near 1e-7
    let target = [0.71, 12.5, 3.0e-7];
    let penalty = move |params: &[f64]| {
        params
            .iter()
            .zip(&target)
            .map(|(p, t)| ((p - t) / t).powi(2))
            .sum::<f64>()
    };
    let problem = Problem::new(
        vec![0.4, 7.0, 2.0e-6],
        vec![0.3, 3.0, 0.0],
        vec![1.0, 30.0, 1.0e-5],
        penalty,
        MinimizerConfig::new(50_000).with_seed(5),
    )
    .unwrap();

    let result = HillClimbMinimizer::new().minimize(&problem);

    for (value, expected) in result.params.iter().zip(&target) {
        assert_abs_diff_eq!(*value / *expected, 1.0, epsilon = 1e-3);
    }
}
