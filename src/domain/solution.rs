use std::time::Duration;

use super::error::{OptError, Result};
use super::expr::{ModelId, VariableHandle};
use super::tree::DecisionTree;
use super::value_objects::SolutionStatus;

/// Statistics about the solve process
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolverStatistics {
    pub iterations: u64,
    pub nodes_explored: u64,
    pub solve_time_ms: f64,
    pub num_variables: u32,
    pub num_constraints: u32,
    pub num_integer_vars: u32,
    pub num_binary_vars: u32,
}

/// Largest violations measured while validating the assignment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolutionQuality {
    pub max_bound_violation: f64,
    pub max_integrality_violation: f64,
    pub max_constraint_violation: f64,
}

/// Validated outcome of one solve.
///
/// Built by the result extractor (or by the controller for solves that never
/// reached the backend) and read-only afterwards.
#[derive(Debug, Clone)]
pub struct SolveResult {
    status: SolutionStatus,
    model: ModelId,
    backend: String,
    objective_value: Option<f64>,
    names: Vec<String>,
    values: Option<Vec<f64>>,
    message: String,
    statistics: SolverStatistics,
    quality: SolutionQuality,
    budget: Option<Duration>,
    search_tree: Option<DecisionTree>,
}

impl SolveResult {
    pub(crate) fn new(status: SolutionStatus, model: ModelId, backend: impl Into<String>) -> Self {
        Self {
            status,
            model,
            backend: backend.into(),
            objective_value: None,
            names: Vec::new(),
            values: None,
            message: String::new(),
            statistics: SolverStatistics::default(),
            quality: SolutionQuality::default(),
            budget: None,
            search_tree: None,
        }
    }

    pub(crate) fn with_assignment(mut self, names: Vec<String>, values: Vec<f64>, objective: f64) -> Self {
        self.names = names;
        self.values = Some(values);
        self.objective_value = Some(objective);
        self
    }

    pub(crate) fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub(crate) fn with_statistics(mut self, statistics: SolverStatistics) -> Self {
        self.statistics = statistics;
        self
    }

    pub(crate) fn with_quality(mut self, quality: SolutionQuality) -> Self {
        self.quality = quality;
        self
    }

    pub(crate) fn with_status(mut self, status: SolutionStatus) -> Self {
        self.status = status;
        self
    }

    pub(crate) fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = Some(budget);
        self
    }

    pub(crate) fn with_search_tree(mut self, tree: Option<DecisionTree>) -> Self {
        self.search_tree = tree;
        self
    }

    pub(crate) fn statistics_mut(&mut self) -> &mut SolverStatistics {
        &mut self.statistics
    }

    pub fn status(&self) -> SolutionStatus {
        self.status
    }

    pub fn backend(&self) -> &str {
        &self.backend
    }

    pub fn objective_value(&self) -> Option<f64> {
        self.objective_value
    }

    /// Value of a variable of the solved model; `None` for foreign handles or
    /// when the solve produced no assignment.
    pub fn value(&self, handle: VariableHandle) -> Option<f64> {
        if handle.model_id() != self.model {
            return None;
        }
        self.values.as_ref()?.get(handle.index()).copied()
    }

    pub fn value_by_name(&self, name: &str) -> Option<f64> {
        let index = self.names.iter().position(|n| n == name)?;
        self.values.as_ref()?.get(index).copied()
    }

    /// Column-ordered assignment, if the solve produced one.
    pub fn values(&self) -> Option<&[f64]> {
        self.values.as_deref()
    }

    /// `(name, value)` pairs in declaration order.
    pub fn assignments(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().flatten().copied())
    }

    pub fn has_assignment(&self) -> bool {
        self.values.is_some()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn statistics(&self) -> &SolverStatistics {
        &self.statistics
    }

    pub fn quality(&self) -> &SolutionQuality {
        &self.quality
    }

    pub fn search_tree(&self) -> Option<&DecisionTree> {
        self.search_tree.as_ref()
    }

    pub fn is_optimal(&self) -> bool {
        self.status == SolutionStatus::Optimal
    }

    pub fn is_feasible(&self) -> bool {
        self.status.is_feasible()
    }

    /// Turns a timed-out result into [`OptError::TimedOut`] for callers that
    /// prefer error flow (e.g. to retry with a larger budget).
    pub fn ensure_completed(self) -> Result<Self> {
        if self.status == SolutionStatus::TimedOut {
            return Err(OptError::TimedOut {
                budget: self.budget.unwrap_or_default(),
            });
        }
        Ok(self)
    }
}
