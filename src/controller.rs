// Solver invocation controller.
//
// Drives one solve through `Idle -> Building -> Solving` and into a terminal
// state. The session runs on tokio's blocking pool. The controller races
// its completion against the time budget and the caller's cancellation
// token. When the deadline or a cancellation wins, the session's stop
// signal is raised. The controller then waits at most the termination grace
// for an incumbent before it returns. The stop signal is also raised
// when the controller future is dropped mid-solve.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::SolveOptions;
use crate::domain::{
    Model, OptError, RawSolution, Result, ResultExtractor, SessionLimits, SolutionStatus,
    SolveResult, SolverService, SolverStatistics, StopSignal,
};
use crate::solver::SolverFactory;

/// Lifecycle of a controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControllerState {
    #[default]
    Idle,
    Building,
    Solving,
    Completed,
    TimedOut,
    Failed,
    Cancelled,
}

impl ControllerState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ControllerState::Completed
                | ControllerState::TimedOut
                | ControllerState::Failed
                | ControllerState::Cancelled
        )
    }
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ControllerState::Idle => "idle",
            ControllerState::Building => "building",
            ControllerState::Solving => "solving",
            ControllerState::Completed => "completed",
            ControllerState::TimedOut => "timed-out",
            ControllerState::Failed => "failed",
            ControllerState::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

/// Raises the stop signal on every exit path of `run`.
struct StopOnDrop(StopSignal);

impl Drop for StopOnDrop {
    fn drop(&mut self) {
        self.0.raise();
    }
}

enum Interruption {
    Deadline,
    Cancelled,
}

pub struct SolveController {
    solver: Arc<dyn SolverService>,
    options: SolveOptions,
    state: ControllerState,
}

impl SolveController {
    pub fn new(solver: Arc<dyn SolverService>, options: SolveOptions) -> Self {
        Self {
            solver,
            options,
            state: ControllerState::Idle,
        }
    }

    /// Controller for the backend named in `options`.
    pub fn from_options(options: SolveOptions) -> Result<Self> {
        let solver = SolverFactory::create_solver(&options)?;
        Ok(Self::new(solver, options))
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn backend(&self) -> &str {
        self.solver.name()
    }

    pub fn options(&self) -> &SolveOptions {
        &self.options
    }

    fn transition(&mut self, next: ControllerState) {
        debug!(
            component = "controller",
            from = %self.state,
            to = %next,
            "state transition"
        );
        self.state = next;
    }

    /// Solve `model` within `budget`.
    ///
    /// A timeout or a cancellation comes back as `Ok` with status `TimedOut`
    /// or `Interrupted`, carrying the session's incumbent when it produced
    /// one in time. Backend errors, panics and inconsistent assignments come
    /// back as `Err` and leave the controller `Failed`.
    pub async fn run(
        &mut self,
        model: &Model,
        budget: Duration,
        cancel: Option<CancellationToken>,
    ) -> Result<SolveResult> {
        let started = Instant::now();
        self.transition(ControllerState::Building);

        let session = match self.solver.open_session(model) {
            Ok(session) => session,
            Err(e) => {
                warn!(
                    component = "controller",
                    operation = "translate",
                    backend = self.solver.name(),
                    error = %e,
                    "model rejected"
                );
                self.transition(ControllerState::Failed);
                return Err(e);
            }
        };

        let cancel = cancel.unwrap_or_default();
        if budget.is_zero() {
            drop(session);
            self.transition(ControllerState::TimedOut);
            return Ok(self.unfinished(model, SolutionStatus::TimedOut, budget, started));
        }
        if cancel.is_cancelled() {
            drop(session);
            self.transition(ControllerState::Cancelled);
            return Ok(self.unfinished(model, SolutionStatus::Interrupted, budget, started));
        }

        self.transition(ControllerState::Solving);
        info!(
            component = "controller",
            operation = "solve",
            backend = self.solver.name(),
            variables = model.num_variables(),
            constraints = model.num_constraints(),
            "solve started"
        );

        let stop = StopSignal::new();
        let _guard = StopOnDrop(stop.clone());
        let limits = SessionLimits {
            time_limit: budget,
            node_limit: self.options.node_limit,
            tolerance: self.options.tolerance,
            verbose: self.options.verbose,
        };
        let session_stop = stop.clone();
        let mut handle = tokio::task::spawn_blocking(move || {
            let mut session = session;
            session.solve(&limits, &session_stop)
        });

        let interruption = tokio::select! {
            joined = &mut handle => return self.finish(model, joined, started),
            _ = tokio::time::sleep(budget) => Interruption::Deadline,
            _ = cancel.cancelled() => Interruption::Cancelled,
        };

        stop.raise();
        let (status, state) = match interruption {
            Interruption::Deadline => (SolutionStatus::TimedOut, ControllerState::TimedOut),
            Interruption::Cancelled => (SolutionStatus::Interrupted, ControllerState::Cancelled),
        };
        warn!(
            component = "controller",
            backend = self.solver.name(),
            status = %status,
            "stopping solver session"
        );

        let grace = self.options.termination_grace;
        let incumbent = match tokio::time::timeout(grace, &mut handle).await {
            Ok(Ok(Ok(raw))) if raw.values.is_some() => Some(raw),
            Ok(_) => None,
            Err(_) => {
                debug!(
                    component = "controller",
                    grace_ms = grace.as_millis() as u64,
                    "session still running after grace, detaching"
                );
                None
            }
        };

        let result = match incumbent {
            Some(raw) => match self.extract(model, raw) {
                Ok(result) => result.with_status(status),
                Err(e) => {
                    self.transition(ControllerState::Failed);
                    return Err(e);
                }
            },
            None => SolveResult::new(status, model.id(), self.solver.name()).with_statistics(
                dimensions(model),
            ),
        };
        self.transition(state);
        Ok(self.stamp(result.with_budget(budget), started))
    }

    fn finish(
        &mut self,
        model: &Model,
        joined: std::result::Result<Result<RawSolution>, JoinError>,
        started: Instant,
    ) -> Result<SolveResult> {
        let raw = match joined {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                error!(
                    component = "controller",
                    backend = self.solver.name(),
                    error = %e,
                    "solver session failed"
                );
                self.transition(ControllerState::Failed);
                return Err(e);
            }
            Err(join_error) => {
                let detail = if join_error.is_panic() {
                    format!("session panicked: {}", panic_message(join_error.into_panic()))
                } else {
                    "session task was aborted".to_string()
                };
                error!(
                    component = "controller",
                    backend = self.solver.name(),
                    detail = %detail,
                    "solver session crashed"
                );
                self.transition(ControllerState::Failed);
                return Err(OptError::failed(self.solver.name(), detail));
            }
        };

        let result = match self.extract(model, raw) {
            Ok(result) => result,
            Err(e) => {
                error!(
                    component = "controller",
                    backend = self.solver.name(),
                    error = %e,
                    "rejected solver output"
                );
                self.transition(ControllerState::Failed);
                return Err(e);
            }
        };

        let state = match result.status() {
            SolutionStatus::TimedOut => ControllerState::TimedOut,
            SolutionStatus::Interrupted => ControllerState::Cancelled,
            _ => ControllerState::Completed,
        };
        self.transition(state);
        let result = self.stamp(result, started);
        info!(
            component = "controller",
            operation = "solve",
            backend = self.solver.name(),
            status = %result.status(),
            elapsed_ms = result.statistics().solve_time_ms,
            "solve finished"
        );
        Ok(result)
    }

    fn extract(&self, model: &Model, raw: RawSolution) -> Result<SolveResult> {
        ResultExtractor::new(self.options.tolerance).extract(model, self.solver.name(), raw)
    }

    fn unfinished(
        &self,
        model: &Model,
        status: SolutionStatus,
        budget: Duration,
        started: Instant,
    ) -> SolveResult {
        let result = SolveResult::new(status, model.id(), self.solver.name())
            .with_statistics(dimensions(model))
            .with_budget(budget);
        self.stamp(result, started)
    }

    fn stamp(&self, mut result: SolveResult, started: Instant) -> SolveResult {
        result.statistics_mut().solve_time_ms = started.elapsed().as_secs_f64() * 1000.0;
        result
    }
}

/// Solve with a backend picked from `options` and its time limit.
pub async fn solve_model(model: &Model, options: &SolveOptions) -> Result<SolveResult> {
    let mut controller = SolveController::from_options(options.clone())?;
    controller.run(model, options.budget(), None).await
}

fn dimensions(model: &Model) -> SolverStatistics {
    SolverStatistics {
        num_variables: model.num_variables() as u32,
        num_constraints: model.num_constraints() as u32,
        num_integer_vars: model.num_integer_variables() as u32,
        num_binary_vars: model.num_binary_variables() as u32,
        ..SolverStatistics::default()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Bounds, OptimizationType, VariableType};
    use crate::solver::BranchAndBoundSolver;

    fn bounded_max() -> Model {
        let mut model = Model::new();
        let x = model
            .declare_variable("x", VariableType::Continuous, Bounds::new(0.0, 10.0))
            .unwrap();
        model.set_objective(x, OptimizationType::Maximize).unwrap();
        model
    }

    fn controller() -> SolveController {
        SolveController::new(Arc::new(BranchAndBoundSolver::new()), SolveOptions::default())
    }

    #[tokio::test]
    async fn completes_a_bounded_maximization() {
        let model = bounded_max();
        let mut controller = controller();
        assert_eq!(controller.state(), ControllerState::Idle);

        let result = controller
            .run(&model, Duration::from_secs(10), None)
            .await
            .unwrap();
        assert_eq!(controller.state(), ControllerState::Completed);
        assert_eq!(result.status(), SolutionStatus::Optimal);
        assert!((result.value_by_name("x").unwrap() - 10.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn zero_budget_times_out_without_solving() {
        let model = bounded_max();
        let mut controller = controller();
        let result = controller.run(&model, Duration::ZERO, None).await.unwrap();
        assert_eq!(controller.state(), ControllerState::TimedOut);
        assert_eq!(result.status(), SolutionStatus::TimedOut);
        assert!(!result.has_assignment());
        assert!(result.ensure_completed().unwrap_err().is_retryable());
    }

    #[tokio::test]
    async fn controller_can_be_reused() {
        let model = bounded_max();
        let mut controller = controller();
        controller.run(&model, Duration::ZERO, None).await.unwrap();
        controller
            .run(&model, Duration::from_secs(10), None)
            .await
            .unwrap();
        assert_eq!(controller.state(), ControllerState::Completed);
    }

    #[test]
    fn terminal_states() {
        assert!(ControllerState::Cancelled.is_terminal());
        assert!(!ControllerState::Solving.is_terminal());
        assert_eq!(ControllerState::TimedOut.to_string(), "timed-out");
    }
}
