// Domain service interface for solver backends
// A backend translates a model into its native form (one session per solve)
// and the session runs that native model under the given limits.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::error::{OptError, Result};
use super::models::Model;
use super::tree::DecisionTree;
use super::value_objects::ConstraintType;

/// Relations every linear backend understands.
pub const LINEAR_RELATIONS: &[ConstraintType] = &[
    ConstraintType::LessThanOrEqual,
    ConstraintType::Equal,
    ConstraintType::GreaterThanOrEqual,
];

/// Constructs a backend can express natively
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub relations: &'static [ConstraintType],
    pub integer_domains: bool,
}

impl Capabilities {
    pub fn supports_relation(&self, relation: ConstraintType) -> bool {
        self.relations.contains(&relation)
    }
}

/// Cooperative stop flag shared between the controller and a running session.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Limits handed to a session for one solve
#[derive(Debug, Clone)]
pub struct SessionLimits {
    pub time_limit: Duration,
    pub node_limit: Option<u64>,
    pub tolerance: f64,
    pub verbose: bool,
}

/// Status code reported by a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawStatus {
    Optimal,
    Feasible,
    Infeasible,
    Unbounded,
    TimeLimit,
    NodeLimit,
    Interrupted,
}

/// Unvalidated backend output: a status plus an optional column assignment.
#[derive(Debug, Clone)]
pub struct RawSolution {
    pub status: RawStatus,
    pub values: Option<Vec<f64>>,
    pub objective: Option<f64>,
    pub iterations: u64,
    pub nodes_explored: u64,
    pub message: String,
    pub search_tree: Option<DecisionTree>,
}

impl RawSolution {
    pub fn new(status: RawStatus) -> Self {
        Self {
            status,
            values: None,
            objective: None,
            iterations: 0,
            nodes_explored: 0,
            message: String::new(),
            search_tree: None,
        }
    }

    pub fn with_values(mut self, values: Vec<f64>) -> Self {
        self.values = Some(values);
        self
    }

    pub fn with_objective(mut self, objective: f64) -> Self {
        self.objective = Some(objective);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

/// One translated model bound to one backend invocation.
pub trait SolverSession: Send {
    /// Run the solver. Implementations check `stop` as often as the backend
    /// allows and return whatever incumbent they hold once it is raised.
    fn solve(&mut self, limits: &SessionLimits, stop: &StopSignal) -> Result<RawSolution>;
}

/// Domain service interface for optimization backends
///
/// This trait defines the contract that all backends must follow, so the
/// controller can swap them without changing the orchestration logic.
pub trait SolverService: Send + Sync {
    /// Get the name of this solver backend
    fn name(&self) -> &str;

    fn capabilities(&self) -> Capabilities;

    /// Check if this solver supports mixed-integer programming
    fn supports_mip(&self) -> bool {
        self.capabilities().integer_domains
    }

    /// Translate `model` and open a session that owns the native form.
    fn open_session(&self, model: &Model) -> Result<Box<dyn SolverSession>>;

    /// Validate a model without solving it; returns warnings.
    fn validate(&self, model: &Model) -> Result<Vec<String>> {
        check_support(model, self.name(), &self.capabilities())?;

        let mut warnings = Vec::new();
        if model.num_variables() == 0 {
            warnings.push("Model has no variables".to_string());
        }
        if model.num_constraints() == 0 {
            warnings.push("Model has no constraints (may be unbounded)".to_string());
        }
        if model.objective().terms.is_empty() {
            warnings.push("Objective is empty; any feasible point is optimal".to_string());
        }
        let num_integer = model.num_integer_variables();
        if num_integer > 100 {
            warnings.push(format!(
                "Model has {} integer variables, may be slow to solve",
                num_integer
            ));
        }
        Ok(warnings)
    }
}

/// Reject constructs the backend cannot express instead of relaxing them.
pub fn check_support(model: &Model, backend: &str, capabilities: &Capabilities) -> Result<()> {
    if !capabilities.integer_domains {
        if let Some(var) = model.variables().iter().find(|v| v.is_integer()) {
            return Err(OptError::UnsupportedConstruct {
                backend: backend.to_string(),
                construct: format!("{} variable '{}'", var.variable_type.as_str(), var.name),
            });
        }
    }
    if let Some(constraint) = model
        .constraints()
        .iter()
        .find(|c| !capabilities.supports_relation(c.constraint_type))
    {
        return Err(OptError::UnsupportedConstruct {
            backend: backend.to_string(),
            construct: format!(
                "relation {} in constraint '{}'",
                constraint.constraint_type, constraint.name
            ),
        });
    }
    Ok(())
}
