// COIN-OR CBC Solver Adapter
// Implements the SolverService interface for CBC through good_lp

use good_lp::solvers::{coin_cbc, SolutionStatus as CbcStatus, WithTimeLimit};
use good_lp::{variable, Expression, ProblemVariables, ResolutionError, Solution, SolverModel, Variable};

use crate::domain::{
    Capabilities, ConstraintType, Model, OptError, OptimizationType, RawSolution, RawStatus,
    Result, SessionLimits, SolverService, SolverSession, StopSignal, LINEAR_RELATIONS,
};
use crate::solver::translate::{lower, LoweredModel};

const BACKEND: &str = "COIN-OR CBC";

pub struct CoinCbcSolver;

impl CoinCbcSolver {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CoinCbcSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl SolverService for CoinCbcSolver {
    fn name(&self) -> &str {
        BACKEND
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            relations: LINEAR_RELATIONS,
            integer_domains: true,
        }
    }

    fn open_session(&self, model: &Model) -> Result<Box<dyn SolverSession>> {
        let lowered = lower(model, self.name(), &self.capabilities())?;
        Ok(Box::new(CoinCbcSession { lowered }))
    }
}

struct CoinCbcSession {
    lowered: LoweredModel,
}

impl SolverSession for CoinCbcSession {
    fn solve(&mut self, limits: &SessionLimits, stop: &StopSignal) -> Result<RawSolution> {
        if stop.is_raised() {
            return Ok(RawSolution::new(RawStatus::Interrupted));
        }

        let mut vars = ProblemVariables::new();
        let mut lp_variables: Vec<Variable> = Vec::with_capacity(self.lowered.columns.len());
        for column in &self.lowered.columns {
            let mut definition = variable();
            if column.integer {
                definition = definition.integer();
            }
            if column.lower.is_finite() {
                definition = definition.min(column.lower);
            }
            if column.upper.is_finite() {
                definition = definition.max(column.upper);
            }
            lp_variables.push(vars.add(definition));
        }

        let mut obj_expr: Expression = 0.into();
        for (column, var) in self.lowered.columns.iter().zip(&lp_variables) {
            if column.objective != 0.0 {
                obj_expr += column.objective * *var;
            }
        }

        let unsolved = match self.lowered.sense {
            OptimizationType::Maximize => vars.maximise(obj_expr),
            OptimizationType::Minimize => vars.minimise(obj_expr),
        };
        let mut lp_model = unsolved.using(coin_cbc::coin_cbc);
        if !limits.verbose {
            lp_model.set_parameter("log", "0");
        }
        if limits.time_limit != std::time::Duration::MAX {
            lp_model = lp_model.with_time_limit(limits.time_limit.as_secs_f64());
        }
        if let Some(nodes) = limits.node_limit {
            lp_model.set_parameter("maxN", &nodes.to_string());
        }

        for row in &self.lowered.rows {
            let mut lhs: Expression = 0.into();
            for &(i, coeff) in &row.terms {
                lhs += coeff * lp_variables[i];
            }
            lp_model = match row.relation {
                ConstraintType::LessThanOrEqual => lp_model.with(lhs.leq(row.rhs)),
                ConstraintType::Equal => lp_model.with(lhs.eq(row.rhs)),
                ConstraintType::GreaterThanOrEqual => lp_model.with(lhs.geq(row.rhs)),
                ConstraintType::NotEqual => {
                    return Err(OptError::UnsupportedConstruct {
                        backend: BACKEND.to_string(),
                        construct: format!("relation != in constraint '{}'", row.name),
                    })
                }
            };
        }

        match lp_model.solve() {
            Ok(sol) => {
                let status = cbc_status(sol.status());
                let values: Vec<f64> = lp_variables.iter().map(|v| sol.value(*v)).collect();
                let objective = self.lowered.objective_value(&values);
                Ok(RawSolution::new(status)
                    .with_values(values)
                    .with_objective(objective))
            }
            Err(ResolutionError::Infeasible) => Ok(RawSolution::new(RawStatus::Infeasible)
                .with_message("Problem is infeasible: no solution satisfies all constraints")),
            Err(ResolutionError::Unbounded) => Ok(RawSolution::new(RawStatus::Unbounded)
                .with_message("Problem is unbounded: objective can be improved infinitely")),
            Err(e) => Err(OptError::failed(BACKEND, format!("{:?}", e))),
        }
    }
}

/// CBC stops with an incumbent on optimality, on its time limit or on the
/// gap limit; only the first is a proven optimum.
fn cbc_status(status: CbcStatus) -> RawStatus {
    match status {
        CbcStatus::Optimal => RawStatus::Optimal,
        CbcStatus::TimeLimit => RawStatus::TimeLimit,
        _ => RawStatus::Feasible,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_stops_are_not_optimal() {
        assert_eq!(cbc_status(CbcStatus::Optimal), RawStatus::Optimal);
        assert_eq!(cbc_status(CbcStatus::TimeLimit), RawStatus::TimeLimit);
        assert_eq!(cbc_status(CbcStatus::GapLimit), RawStatus::Feasible);
    }
}
