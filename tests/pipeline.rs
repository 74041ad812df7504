use std::time::Duration;

use optbridge::domain::LINEAR_RELATIONS;
use optbridge::{
    solve_model, Bounds, BranchAndBoundSolver, ConstraintType, LinearExpr, Model, OptError,
    OptimizationType, SolutionStatus, SolveOptions, SolverBackend, SolverService, VariableType,
};

fn options() -> SolveOptions {
    SolveOptions::new()
        .with_backend(SolverBackend::BranchAndBound)
        .with_time_limit(Duration::from_secs(30))
}

#[tokio::test]
async fn single_variable_maximization_reaches_its_bound() {
    let mut model = Model::new();
    let x = model
        .declare_variable("x", VariableType::Continuous, Bounds::new(0.0, 10.0))
        .unwrap();
    model.set_objective(x, OptimizationType::Maximize).unwrap();

    let result = solve_model(&model, &options()).await.unwrap();
    assert_eq!(result.status(), SolutionStatus::Optimal);
    assert!((result.value(x).unwrap() - 10.0).abs() < 1e-9);
    assert!((result.objective_value().unwrap() - 10.0).abs() < 1e-9);
}

#[tokio::test]
async fn knapsack_matches_the_known_optimum() {
    let values = [150.0, 90.0, 120.0, 100.0, 80.0];
    let weights = [7.0, 3.0, 4.0, 5.0, 2.0];

    let mut model = Model::new().with_name("knapsack");
    let items: Vec<_> = (0..values.len())
        .map(|i| {
            model
                .declare_variable(format!("item{}", i), VariableType::Binary, Bounds::binary())
                .unwrap()
        })
        .collect();
    model
        .add_named_constraint(
            "capacity",
            LinearExpr::from_terms(items.iter().copied().zip(weights)),
            ConstraintType::LessThanOrEqual,
            15.0,
        )
        .unwrap();
    model
        .set_objective(
            LinearExpr::from_terms(items.iter().copied().zip(values)),
            OptimizationType::Maximize,
        )
        .unwrap();

    let result = solve_model(&model, &options()).await.unwrap();
    assert!(result.is_optimal());
    assert_eq!(result.objective_value(), Some(390.0));
    let picked: Vec<f64> = items.iter().map(|&h| result.value(h).unwrap()).collect();
    assert_eq!(picked, vec![0.0, 1.0, 1.0, 1.0, 1.0]);
    assert!(result.statistics().nodes_explored >= 1);
    assert!(result.search_tree().is_some());
}

#[tokio::test]
async fn mixed_integer_production_plan() {
    // max 5a + 4b  s.t. 6a + 4b <= 24, a + 2b <= 6, a integer
    let mut model = Model::new();
    let a = model
        .declare_variable("a", VariableType::Integer, Bounds::non_negative())
        .unwrap();
    let b = model
        .declare_variable("b", VariableType::Continuous, Bounds::non_negative())
        .unwrap();
    model
        .add_constraint(a * 6.0 + b * 4.0, ConstraintType::LessThanOrEqual, 24.0)
        .unwrap();
    model
        .add_constraint(a + b * 2.0, ConstraintType::LessThanOrEqual, 6.0)
        .unwrap();
    model
        .set_objective(a * 5.0 + b * 4.0, OptimizationType::Maximize)
        .unwrap();

    let result = solve_model(&model, &options()).await.unwrap();
    assert!(result.is_optimal());
    assert_eq!(result.value(a), Some(3.0));
    assert!((result.value(b).unwrap() - 1.5).abs() < 1e-6);
    assert!((result.objective_value().unwrap() - 21.0).abs() < 1e-6);
}

#[tokio::test]
async fn minimization_with_objective_constant() {
    let mut model = Model::new();
    let x = model
        .declare_variable("x", VariableType::Integer, Bounds::new(0.0, 100.0))
        .unwrap();
    let y = model
        .declare_variable("y", VariableType::Integer, Bounds::new(0.0, 100.0))
        .unwrap();
    model
        .add_constraint(x * 2.0 + y * 3.0, ConstraintType::GreaterThanOrEqual, 12.5)
        .unwrap();
    model
        .set_objective(x * 3.0 + y * 4.0 + 2.0, OptimizationType::Minimize)
        .unwrap();

    let result = solve_model(&model, &options()).await.unwrap();
    assert!(result.is_optimal());
    // cheapest integer cover of 2x + 3y >= 12.5 is x = 2, y = 3
    assert_eq!(result.value(x), Some(2.0));
    assert_eq!(result.value(y), Some(3.0));
    assert_eq!(result.objective_value(), Some(20.0));
}

#[tokio::test]
async fn infeasible_model_has_no_assignment() {
    let mut model = Model::new();
    let x = model
        .declare_variable("x", VariableType::Continuous, Bounds::new(0.0, 5.0))
        .unwrap();
    model
        .add_constraint(x, ConstraintType::GreaterThanOrEqual, 8.0)
        .unwrap();
    model.set_objective(x, OptimizationType::Minimize).unwrap();

    let result = solve_model(&model, &options()).await.unwrap();
    assert_eq!(result.status(), SolutionStatus::Infeasible);
    assert!(!result.has_assignment());
    assert_eq!(result.value(x), None);
}

#[tokio::test]
async fn unbounded_model_is_reported() {
    let mut model = Model::new();
    let x = model
        .declare_variable("x", VariableType::Continuous, Bounds::non_negative())
        .unwrap();
    model.set_objective(x, OptimizationType::Maximize).unwrap();

    let result = solve_model(&model, &options()).await.unwrap();
    assert_eq!(result.status(), SolutionStatus::Unbounded);
    assert!(!result.has_assignment());
}

#[tokio::test]
async fn not_equal_is_rejected_not_relaxed() {
    let mut model = Model::new();
    let x = model
        .declare_variable("x", VariableType::Integer, Bounds::new(0.0, 3.0))
        .unwrap();
    model.add_constraint(x, ConstraintType::NotEqual, 3.0).unwrap();
    model.set_objective(x, OptimizationType::Maximize).unwrap();

    let err = solve_model(&model, &options()).await.unwrap_err();
    assert!(matches!(err, OptError::UnsupportedConstruct { .. }));
    assert!(err.to_string().contains("!="));
}

#[test]
fn duplicate_names_are_refused() {
    let mut model = Model::new();
    model
        .declare_variable("x", VariableType::Continuous, Bounds::non_negative())
        .unwrap();
    let err = model
        .declare_variable("x", VariableType::Integer, Bounds::new(0.0, 1.0))
        .unwrap_err();
    assert!(matches!(err, OptError::DuplicateVariable { ref name } if name == "x"));
    assert_eq!(model.num_variables(), 1);
}

#[test]
fn foreign_handles_are_refused_before_solve() {
    let mut model = Model::new();
    let mut other = Model::new();
    let stranger = other
        .declare_variable("y", VariableType::Continuous, Bounds::non_negative())
        .unwrap();

    let err = model
        .add_constraint(stranger * 2.0, ConstraintType::LessThanOrEqual, 4.0)
        .unwrap_err();
    assert!(matches!(err, OptError::UnboundVariable { .. }));
    assert!(model
        .set_objective(stranger, OptimizationType::Minimize)
        .is_err());
    assert_eq!(model.num_constraints(), 0);
}

#[test]
fn built_in_backend_speaks_only_linear_relations() {
    let caps = BranchAndBoundSolver::new().capabilities();
    assert_eq!(caps.relations, LINEAR_RELATIONS);
    assert!(!caps.supports_relation(ConstraintType::NotEqual));
}

#[tokio::test]
async fn large_coefficients_near_the_integrality_tolerance() {
    let mut model = Model::new();
    let x = model
        .declare_variable("x", VariableType::Integer, Bounds::new(0.0, 10.0))
        .unwrap();
    let y = model
        .declare_variable("y", VariableType::Continuous, Bounds::new(0.0, 10.0))
        .unwrap();
    model
        .add_constraint(x * 1e6 - y * 1e6, ConstraintType::LessThanOrEqual, 0.0)
        .unwrap();
    model
        .add_constraint(y, ConstraintType::LessThanOrEqual, 1.9999995)
        .unwrap();
    model.set_objective(x, OptimizationType::Maximize).unwrap();

    let result = solve_model(&model, &options()).await.unwrap();
    assert_eq!(result.status(), SolutionStatus::Optimal);
    assert_eq!(result.value(x), Some(1.0));
    assert_eq!(result.objective_value(), Some(1.0));
}

#[test]
fn bounds_pinned_at_infinity_are_rejected() {
    let mut model = Model::new();
    for bounds in [
        Bounds::new(f64::INFINITY, f64::INFINITY),
        Bounds::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
    ] {
        let err = model
            .declare_variable("x", VariableType::Continuous, bounds)
            .unwrap_err();
        assert!(matches!(err, OptError::InvalidBounds { .. }));
    }
    assert_eq!(model.num_variables(), 0);
}
