// Branch-and-bound adapter
// Implements the SolverService interface on top of the pure-Rust search in
// `solver::bnb`, so the default build needs no native solver library.

use tracing::debug;

use crate::domain::{
    Capabilities, Model, RawSolution, Result, SessionLimits, SolverService, SolverSession,
    StopSignal, LINEAR_RELATIONS,
};
use crate::solver::bnb::{BranchAndBound, BACKEND};
use crate::solver::translate::{lower, LoweredModel};

pub struct BranchAndBoundSolver;

impl BranchAndBoundSolver {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BranchAndBoundSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl SolverService for BranchAndBoundSolver {
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
        debug!(
            component = "bnb",
            columns = lowered.columns.len(),
            rows = lowered.rows.len(),
            "model lowered"
        );
        Ok(Box::new(BranchAndBoundSession { lowered }))
    }
}

struct BranchAndBoundSession {
    lowered: LoweredModel,
}

impl SolverSession for BranchAndBoundSession {
    fn solve(&mut self, limits: &SessionLimits, stop: &StopSignal) -> Result<RawSolution> {
        BranchAndBound::new(&self.lowered, limits, stop).run()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::domain::{
        Bounds, ConstraintType, OptError, OptimizationType, RawStatus, VariableType,
    };

    #[test]
    fn rejects_not_equal_at_open() {
        let mut model = Model::new();
        let x = model
            .declare_variable("x", VariableType::Integer, Bounds::new(0.0, 5.0))
            .unwrap();
        model.add_constraint(x, ConstraintType::NotEqual, 2.0).unwrap();
        let err = BranchAndBoundSolver::new().open_session(&model).err().unwrap();
        assert!(matches!(err, OptError::UnsupportedConstruct { .. }));
    }

    #[test]
    fn solves_a_bounded_maximization() {
        let mut model = Model::new();
        let x = model
            .declare_variable("x", VariableType::Continuous, Bounds::new(0.0, 10.0))
            .unwrap();
        model.set_objective(x, OptimizationType::Maximize).unwrap();

        let mut session = BranchAndBoundSolver::new().open_session(&model).unwrap();
        let limits = SessionLimits {
            time_limit: Duration::from_secs(10),
            node_limit: None,
            tolerance: 1e-6,
            verbose: false,
        };
        let raw = session.solve(&limits, &StopSignal::new()).unwrap();
        assert_eq!(raw.status, RawStatus::Optimal);
        assert!((raw.values.unwrap()[0] - 10.0).abs() < 1e-6);
    }

    #[test]
    fn validate_warns_about_empty_models() {
        let warnings = BranchAndBoundSolver::new().validate(&Model::new()).unwrap();
        assert!(warnings.iter().any(|w| w.contains("no variables")));
    }
}
