use std::path::PathBuf;
use std::time::Duration;

use optbridge::{
    read_mps_file, solve_model, ConstraintType, OptError, OptimizationType, SolutionStatus,
    SolveOptions, SolverBackend, VariableType,
};

fn data(file: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(file)
}

#[test]
fn reads_the_production_file() {
    let model = read_mps_file(data("production.mps")).unwrap();
    assert_eq!(model.name(), "PRODUCTION");
    assert_eq!(model.num_variables(), 3);
    assert_eq!(model.num_integer_variables(), 2);
    assert_eq!(model.objective().optimization_type, OptimizationType::Maximize);
    assert_eq!(model.objective().constant, 3.0);

    let names: Vec<&str> = model.constraints().iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["wood", "labor", "band_lo", "band_hi"]);
    let band_hi = &model.constraints()[3];
    assert_eq!(band_hi.constraint_type, ConstraintType::LessThanOrEqual);
    assert_eq!(band_hi.rhs, 3.0);

    let z = model.variable(model.handle_of("z").unwrap()).unwrap();
    assert_eq!(z.variable_type, VariableType::Continuous);
    assert_eq!(z.bounds.upper, 1.5);
}

#[tokio::test]
async fn solves_the_imported_model() {
    let model = read_mps_file(data("production.mps")).unwrap();
    let options = SolveOptions::new()
        .with_backend(SolverBackend::BranchAndBound)
        .with_time_limit(Duration::from_secs(30));
    let result = solve_model(&model, &options)
        .await
        .unwrap()
        .ensure_completed()
        .unwrap();

    assert_eq!(result.status(), SolutionStatus::Optimal);
    assert_eq!(result.value_by_name("x"), Some(4.0));
    assert_eq!(result.value_by_name("y"), Some(0.0));
    assert!((result.value_by_name("z").unwrap() - 1.5).abs() < 1e-6);
    assert!((result.objective_value().unwrap() - 24.5).abs() < 1e-6);
}

#[test]
fn missing_file_is_an_io_error() {
    let err = read_mps_file(data("does-not-exist.mps")).unwrap_err();
    assert!(matches!(err, OptError::Io(_)));
}
