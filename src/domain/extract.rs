// Turns raw backend output into a validated `SolveResult`.
//
// Every assignment is checked against the model it claims to solve: finite
// values, declared bounds, integrality and constraint satisfaction, all
// within a tolerance ε. A violation means the backend and the translator
// disagree about the model, so it is reported as
// `OptError::InconsistentResult` and never passed on.

use tracing::warn;

use super::error::{OptError, Result};
use super::models::Model;
use super::solution::{SolutionQuality, SolveResult, SolverStatistics};
use super::solver_service::{RawSolution, RawStatus};
use super::value_objects::SolutionStatus;

pub const DEFAULT_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy)]
pub struct ResultExtractor {
    tolerance: f64,
}

impl ResultExtractor {
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn extract(&self, model: &Model, backend: &str, raw: RawSolution) -> Result<SolveResult> {
        let status = map_status(raw.status);
        let statistics = SolverStatistics {
            iterations: raw.iterations,
            nodes_explored: raw.nodes_explored,
            num_variables: model.num_variables() as u32,
            num_constraints: model.num_constraints() as u32,
            num_integer_vars: model.num_integer_variables() as u32,
            num_binary_vars: model.num_binary_variables() as u32,
            ..SolverStatistics::default()
        };
        let result = SolveResult::new(status, model.id(), backend)
            .with_statistics(statistics)
            .with_message(raw.message.clone())
            .with_search_tree(raw.search_tree);

        let values = match (status, raw.values) {
            (SolutionStatus::Infeasible | SolutionStatus::Unbounded, _) => return Ok(result),
            (SolutionStatus::Optimal | SolutionStatus::Feasible, None) => {
                return Err(OptError::inconsistent(format!(
                    "{} reported {} without an assignment",
                    backend, status
                )));
            }
            (_, None) => return Ok(result),
            (_, Some(values)) => values,
        };

        let (values, quality) = self.validate(model, values)?;
        let objective = model.objective().evaluate(&values);
        if let Some(reported) = raw.objective {
            let scale = objective.abs().max(1.0);
            if (reported - objective).abs() > self.tolerance * 10.0 * scale {
                return Err(OptError::inconsistent(format!(
                    "{} reported objective {} but the assignment evaluates to {}",
                    backend, reported, objective
                )));
            }
        }

        let names = model.variables().iter().map(|v| v.name.clone()).collect();
        Ok(result
            .with_assignment(names, values, objective)
            .with_quality(quality))
    }

    /// Check an assignment against bounds, domains and constraints; integer
    /// values come back snapped, continuous values clamped into their bounds.
    ///
    /// Constraints are checked on the assignment as reported, before any
    /// snapping. The allowed violation of a row is ε times the largest of 1,
    /// `|rhs|` and the row's activity `Σ |aᵢ·xᵢ|`.
    pub fn validate(&self, model: &Model, values: Vec<f64>) -> Result<(Vec<f64>, SolutionQuality)> {
        if values.len() != model.num_variables() {
            return Err(OptError::inconsistent(format!(
                "assignment has {} values for {} variables",
                values.len(),
                model.num_variables()
            )));
        }

        let mut quality = SolutionQuality::default();
        let mut cleaned = values.clone();
        for (variable, value) in model.variables().iter().zip(cleaned.iter_mut()) {
            if !value.is_finite() {
                return Err(OptError::inconsistent(format!(
                    "variable '{}' has non-finite value {}",
                    variable.name, value
                )));
            }

            let bound_violation = variable.bounds.violation(*value);
            if bound_violation > self.tolerance {
                warn!(
                    component = "extractor",
                    variable = %variable.name,
                    value = *value,
                    "value outside declared bounds"
                );
                return Err(OptError::inconsistent(format!(
                    "variable '{}' = {} lies outside {}",
                    variable.name, value, variable.bounds
                )));
            }
            quality.max_bound_violation = quality.max_bound_violation.max(bound_violation);

            if variable.is_integer() {
                let rounded = value.round();
                let gap = (*value - rounded).abs();
                if gap > self.tolerance {
                    return Err(OptError::inconsistent(format!(
                        "{} variable '{}' has fractional value {}",
                        variable.variable_type.as_str(),
                        variable.name,
                        value
                    )));
                }
                quality.max_integrality_violation = quality.max_integrality_violation.max(gap);
                *value = rounded;
            } else {
                *value = variable.bounds.clamp(*value);
            }
        }

        for constraint in model.constraints() {
            let lhs = constraint.lhs(&values);
            let violation = constraint.constraint_type.violation(lhs, constraint.rhs);
            let scale = constraint
                .activity(&values)
                .max(constraint.rhs.abs())
                .max(1.0);
            let allowed = self.tolerance * scale;
            if violation > allowed {
                return Err(OptError::inconsistent(format!(
                    "constraint '{}' violated: {} {} {}",
                    constraint.name, lhs, constraint.constraint_type, constraint.rhs
                )));
            }
            quality.max_constraint_violation = quality.max_constraint_violation.max(violation);
        }

        Ok((cleaned, quality))
    }
}

impl Default for ResultExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERANCE)
    }
}

fn map_status(status: RawStatus) -> SolutionStatus {
    match status {
        RawStatus::Optimal => SolutionStatus::Optimal,
        RawStatus::Feasible => SolutionStatus::Feasible,
        RawStatus::Infeasible => SolutionStatus::Infeasible,
        RawStatus::Unbounded => SolutionStatus::Unbounded,
        RawStatus::TimeLimit => SolutionStatus::TimedOut,
        RawStatus::NodeLimit => SolutionStatus::NodeLimit,
        RawStatus::Interrupted => SolutionStatus::Interrupted,
    }
}
