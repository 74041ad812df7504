// Mappers: Convert between gRPC protobuf types and domain models
// This keeps protobuf dependencies isolated from business logic (Dependency Inversion)

use tonic::Status;

use crate::config::{time_limit_from_secs, SolveOptions};
use crate::domain::{
    Bounds, ConstraintType, LinearExpr, Model, OptError, OptimizationType, SolutionStatus,
    SolveResult, VariableType,
};

pub mod optbridge {
    tonic::include_proto!("optbridge");
}

use optbridge as proto;

/// Map a domain error to the gRPC status a client should see
pub fn error_to_status(err: &OptError) -> Status {
    let message = format!("[{}] {}", err.code(), err);
    match err {
        OptError::DuplicateVariable { .. }
        | OptError::UnboundVariable { .. }
        | OptError::InvalidBounds { .. }
        | OptError::InvalidCoefficient { .. }
        | OptError::Mps { .. }
        | OptError::Config(_) => Status::invalid_argument(message),
        OptError::UnsupportedConstruct { .. } | OptError::SolverNotAvailable(_) => {
            Status::unimplemented(message)
        }
        OptError::TimedOut { .. } => Status::deadline_exceeded(message),
        OptError::InconsistentResult { .. } => Status::data_loss(message),
        OptError::Failed { .. } | OptError::Io(_) => Status::internal(message),
    }
}

fn variable_type(proto_var: &proto::Variable) -> Result<VariableType, OptError> {
    match proto::variable::VariableType::try_from(proto_var.r#type) {
        Ok(proto::variable::VariableType::Continuous) => Ok(VariableType::Continuous),
        Ok(proto::variable::VariableType::Integer) => Ok(VariableType::Integer),
        Ok(proto::variable::VariableType::Binary) => Ok(VariableType::Binary),
        Err(_) => Err(OptError::Config(format!(
            "invalid type {} for variable '{}'",
            proto_var.r#type, proto_var.name
        ))),
    }
}

fn constraint_type(proto_constr: &proto::Constraint) -> Result<ConstraintType, OptError> {
    use proto::constraint::ConstraintType as Wire;
    match Wire::try_from(proto_constr.r#type) {
        Ok(Wire::LessThanOrEqual) => Ok(ConstraintType::LessThanOrEqual),
        Ok(Wire::Equal) => Ok(ConstraintType::Equal),
        Ok(Wire::GreaterThanOrEqual) => Ok(ConstraintType::GreaterThanOrEqual),
        Ok(Wire::NotEqual) => Ok(ConstraintType::NotEqual),
        Err(_) => Err(OptError::Config(format!(
            "invalid relation {} in constraint '{}'",
            proto_constr.r#type, proto_constr.name
        ))),
    }
}

fn expression(model: &Model, terms: &[proto::Term]) -> Result<LinearExpr, OptError> {
    let mut expr = LinearExpr::new();
    for term in terms {
        let handle = model
            .handle_of(&term.variable)
            .ok_or_else(|| OptError::UnboundVariable {
                variable: format!("'{}'", term.variable),
            })?;
        expr.add_term(handle, term.coefficient);
    }
    Ok(expr)
}

/// Convert a protobuf Model into the model IR; variables are referenced by name
pub fn proto_to_domain_model(proto_model: proto::Model) -> Result<Model, OptError> {
    let mut model = Model::new().with_name(proto_model.name);

    for var in &proto_model.variables {
        let bounds = Bounds::new(
            var.lower_bound.unwrap_or(0.0),
            var.upper_bound.unwrap_or(f64::INFINITY),
        );
        model.declare_variable(var.name.clone(), variable_type(var)?, bounds)?;
    }

    for constr in &proto_model.constraints {
        let expr = expression(&model, &constr.terms)?;
        let relation = constraint_type(constr)?;
        if constr.name.is_empty() {
            model.add_constraint(expr, relation, constr.rhs)?;
        } else {
            model.add_named_constraint(constr.name.clone(), expr, relation, constr.rhs)?;
        }
    }

    if let Some(objective) = proto_model.objective {
        let sense = match proto::objective::OptimizationType::try_from(objective.r#type) {
            Ok(proto::objective::OptimizationType::Maximize) => OptimizationType::Maximize,
            Ok(proto::objective::OptimizationType::Minimize) => OptimizationType::Minimize,
            Err(_) => {
                return Err(OptError::Config(format!(
                    "invalid optimization type {}",
                    objective.r#type
                )))
            }
        };
        let expr = expression(&model, &objective.terms)?.with_constant(objective.constant);
        model.set_objective(expr, sense)?;
    }

    Ok(model)
}

/// Merge request options over the server defaults
pub fn proto_to_solve_options(
    proto_opts: Option<proto::SolveOptions>,
    defaults: &SolveOptions,
) -> Result<SolveOptions, OptError> {
    let mut options = defaults.clone();
    let Some(opts) = proto_opts else {
        return Ok(options);
    };

    if !opts.backend.is_empty() {
        options.backend = opts.backend.parse()?;
    }
    if opts.time_limit_secs != 0.0 {
        options.time_limit = Some(time_limit_from_secs(
            opts.time_limit_secs,
            "options.time_limit_secs",
        )?);
    }
    if opts.node_limit > 0 {
        options.node_limit = Some(opts.node_limit);
    }
    if opts.tolerance > 0.0 {
        options.tolerance = opts.tolerance;
    }
    options.verbose = opts.verbose;
    Ok(options)
}

fn status_to_proto(status: SolutionStatus) -> proto::SolutionStatus {
    match status {
        SolutionStatus::Optimal => proto::SolutionStatus::Optimal,
        SolutionStatus::Feasible => proto::SolutionStatus::Feasible,
        SolutionStatus::Infeasible => proto::SolutionStatus::Infeasible,
        SolutionStatus::Unbounded => proto::SolutionStatus::Unbounded,
        SolutionStatus::TimedOut => proto::SolutionStatus::TimedOut,
        SolutionStatus::Interrupted => proto::SolutionStatus::Interrupted,
        SolutionStatus::NodeLimit => proto::SolutionStatus::NodeLimit,
    }
}

/// Convert a validated result to the protobuf response
pub fn domain_to_proto_result(result: &SolveResult, include_tree: bool) -> proto::SolveResponse {
    let stats = result.statistics();
    let quality = result.quality();

    let search_tree = match (include_tree, result.search_tree()) {
        (true, Some(tree)) => tree
            .nodes()
            .iter()
            .map(|node| proto::SearchNode {
                id: node.id as u64,
                parent: node.parent.map(|p| p as u64),
                depth: node.depth as u32,
                cut: node.cuts.last().map(ToString::to_string).unwrap_or_default(),
                relaxation_value: node.relaxation_value,
                outcome: format!("{:?}", node.outcome),
            })
            .collect(),
        _ => Vec::new(),
    };

    proto::SolveResponse {
        status: status_to_proto(result.status()) as i32,
        objective_value: result.objective_value(),
        values: result
            .assignments()
            .map(|(name, value)| proto::VariableValue {
                name: name.to_string(),
                value,
            })
            .collect(),
        message: result.message().to_string(),
        statistics: Some(proto::SolverStatistics {
            iterations: stats.iterations,
            nodes_explored: stats.nodes_explored,
            solve_time_ms: stats.solve_time_ms,
            num_variables: stats.num_variables,
            num_constraints: stats.num_constraints,
            num_integer_vars: stats.num_integer_vars,
            num_binary_vars: stats.num_binary_vars,
            solver_backend: result.backend().to_string(),
        }),
        quality: Some(proto::SolutionQuality {
            max_bound_violation: quality.max_bound_violation,
            max_integrality_violation: quality.max_integrality_violation,
            max_constraint_violation: quality.max_constraint_violation,
        }),
        search_tree,
    }
}
