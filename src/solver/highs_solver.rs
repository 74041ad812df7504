// HiGHS Solver Adapter
// Implements the SolverService interface for HiGHS
// Translates the lowered model into a HiGHS RowProblem (columns first, then rows)

use highs::{HighsModelStatus, RowProblem, Sense};
use tracing::debug;

use crate::domain::{
    Capabilities, ConstraintType, Model, OptError, OptimizationType, RawSolution, RawStatus,
    Result, SessionLimits, SolverService, SolverSession, StopSignal, LINEAR_RELATIONS,
};
use crate::solver::translate::{lower, LoweredModel};

const BACKEND: &str = "HiGHS";

pub struct HighsSolver;

impl HighsSolver {
    pub fn new() -> Self {
        Self
    }
}

impl Default for HighsSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl SolverService for HighsSolver {
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
        Ok(Box::new(HighsSession { lowered }))
    }
}

struct HighsSession {
    lowered: LoweredModel,
}

impl HighsSession {
    fn build(&self) -> Result<RowProblem> {
        let mut pb = RowProblem::default();
        let mut cols = Vec::with_capacity(self.lowered.columns.len());

        for column in &self.lowered.columns {
            let col = if column.integer {
                pb.add_integer_column(column.objective, column.lower..=column.upper)
            } else {
                pb.add_column(column.objective, column.lower..=column.upper)
            };
            cols.push(col);
        }

        for row in &self.lowered.rows {
            let terms: Vec<_> = row.terms.iter().map(|&(i, c)| (cols[i], c)).collect();
            match row.relation {
                ConstraintType::LessThanOrEqual => pb.add_row(..=row.rhs, &terms),
                ConstraintType::Equal => pb.add_row(row.rhs..=row.rhs, &terms),
                ConstraintType::GreaterThanOrEqual => pb.add_row(row.rhs.., &terms),
                ConstraintType::NotEqual => {
                    return Err(OptError::UnsupportedConstruct {
                        backend: BACKEND.to_string(),
                        construct: format!("relation != in constraint '{}'", row.name),
                    })
                }
            }
        }
        Ok(pb)
    }
}

impl SolverSession for HighsSession {
    fn solve(&mut self, limits: &SessionLimits, stop: &StopSignal) -> Result<RawSolution> {
        if stop.is_raised() {
            return Ok(RawSolution::new(RawStatus::Interrupted));
        }

        let sense = match self.lowered.sense {
            OptimizationType::Maximize => Sense::Maximise,
            OptimizationType::Minimize => Sense::Minimise,
        };
        let mut model = self.build()?.optimise(sense);
        model.set_option("output_flag", limits.verbose);
        if limits.time_limit != std::time::Duration::MAX {
            model.set_option("time_limit", limits.time_limit.as_secs_f64());
        }
        if let Some(nodes) = limits.node_limit {
            model.set_option("mip_max_nodes", nodes.min(i32::MAX as u64) as i32);
        }

        let solved = model.solve();
        let status = solved.status();
        debug!(component = "highs", status = ?status, "solve returned");

        // HiGHS exposes no incumbent on limit statuses through this API
        let raw = match status {
            HighsModelStatus::Optimal => {
                let values = solved.get_solution().columns().to_vec();
                let objective = self.lowered.objective_value(&values);
                RawSolution::new(RawStatus::Optimal)
                    .with_values(values)
                    .with_objective(objective)
            }
            HighsModelStatus::Infeasible => RawSolution::new(RawStatus::Infeasible)
                .with_message("Problem is infeasible: no solution satisfies all constraints"),
            HighsModelStatus::Unbounded | HighsModelStatus::UnboundedOrInfeasible => {
                RawSolution::new(RawStatus::Unbounded)
                    .with_message("Problem is unbounded: objective can be improved infinitely")
            }
            HighsModelStatus::ReachedTimeLimit => RawSolution::new(RawStatus::TimeLimit),
            HighsModelStatus::ReachedIterationLimit => RawSolution::new(RawStatus::NodeLimit),
            other => {
                return Err(OptError::failed(
                    BACKEND,
                    format!("HiGHS solver returned status: {:?}", other),
                ))
            }
        };
        Ok(raw)
    }
}
