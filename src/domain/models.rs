use std::collections::HashMap;

use tracing::debug;

use super::error::{OptError, Result};
use super::expr::{ConstraintHandle, LinearExpr, ModelId, VariableHandle};
use super::value_objects::{Bounds, ConstraintType, OptimizationType, VariableType};

/// Decision variable registered in a model
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub variable_type: VariableType,
    pub bounds: Bounds,
}

impl Variable {
    pub fn is_integer(&self) -> bool {
        self.variable_type.is_integral()
    }
}

/// Linear constraint `Σ aᵢ·xᵢ (≤ | = | ≥ | ≠) rhs`
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub name: String,
    pub terms: Vec<(VariableHandle, f64)>,
    pub constraint_type: ConstraintType,
    pub rhs: f64,
}

impl Constraint {
    /// Left-hand side evaluated against column values.
    pub fn lhs(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|(v, c)| c * values[v.index()])
            .sum()
    }

    /// `Σ |aᵢ·xᵢ|`, the magnitude the left-hand side is summed from.
    pub fn activity(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|(v, c)| (c * values[v.index()]).abs())
            .sum()
    }
}

/// Objective function to minimize or maximize
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Objective {
    pub optimization_type: OptimizationType,
    pub terms: Vec<(VariableHandle, f64)>,
    pub constant: f64,
}

impl Objective {
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|(v, c)| c * values[v.index()])
            .sum::<f64>()
            + self.constant
    }

    /// Objective coefficient of the variable at `index` (0 when absent).
    pub fn coefficient(&self, index: usize) -> f64 {
        self.terms
            .iter()
            .filter(|(v, _)| v.index() == index)
            .map(|(_, c)| *c)
            .sum()
    }
}

/// Solver-independent optimization model.
///
/// Variables are immutable once declared and are referred to through
/// [`VariableHandle`]s issued by this instance. Every expression registered as
/// a constraint or objective is checked against the model's own variables, so
/// a model is always free of dangling references by the time it is solved.
#[derive(Debug, Clone)]
pub struct Model {
    id: ModelId,
    name: String,
    variables: Vec<Variable>,
    by_name: HashMap<String, u32>,
    constraints: Vec<Constraint>,
    objective: Objective,
}

impl Model {
    pub fn new() -> Self {
        Self {
            id: ModelId::fresh(),
            name: String::new(),
            variables: Vec::new(),
            by_name: HashMap::new(),
            constraints: Vec::new(),
            objective: Objective::default(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn id(&self) -> ModelId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register a decision variable.
    ///
    /// Binary variables have their bounds intersected with `[0, 1]`.
    pub fn declare_variable(
        &mut self,
        name: impl Into<String>,
        variable_type: VariableType,
        bounds: Bounds,
    ) -> Result<VariableHandle> {
        let name = name.into();
        if self.by_name.contains_key(&name) {
            return Err(OptError::DuplicateVariable { name });
        }

        let bounds = match variable_type {
            VariableType::Binary => bounds.intersect(&Bounds::binary()),
            VariableType::Continuous | VariableType::Integer => bounds,
        };
        if !bounds.is_valid() {
            return Err(OptError::InvalidBounds {
                name,
                lower: bounds.lower,
                upper: bounds.upper,
            });
        }

        let index = self.variables.len() as u32;
        self.by_name.insert(name.clone(), index);
        self.variables.push(Variable {
            name,
            variable_type,
            bounds,
        });
        Ok(VariableHandle::new(self.id, index))
    }

    /// Add a constraint named after its position (`c0`, `c1`, ...).
    pub fn add_constraint(
        &mut self,
        expr: impl Into<LinearExpr>,
        constraint_type: ConstraintType,
        rhs: f64,
    ) -> Result<ConstraintHandle> {
        let name = format!("c{}", self.constraints.len());
        self.add_named_constraint(name, expr, constraint_type, rhs)
    }

    pub fn add_named_constraint(
        &mut self,
        name: impl Into<String>,
        expr: impl Into<LinearExpr>,
        constraint_type: ConstraintType,
        rhs: f64,
    ) -> Result<ConstraintHandle> {
        let name = name.into();
        let expr = expr.into();
        if rhs.is_nan() {
            return Err(OptError::InvalidCoefficient {
                context: format!("right-hand side of constraint '{}'", name),
                value: rhs,
            });
        }
        let terms = self.checked_terms(&expr, &name)?;

        let index = self.constraints.len() as u32;
        self.constraints.push(Constraint {
            name,
            terms,
            constraint_type,
            // constants move to the right-hand side
            rhs: rhs - expr.constant_term(),
        });
        Ok(ConstraintHandle::new(self.id, index))
    }

    /// Set the objective, replacing any previous one.
    pub fn set_objective(
        &mut self,
        expr: impl Into<LinearExpr>,
        optimization_type: OptimizationType,
    ) -> Result<()> {
        let expr = expr.into();
        let terms = self.checked_terms(&expr, "objective")?;
        if !expr.constant_term().is_finite() {
            return Err(OptError::InvalidCoefficient {
                context: "objective constant".to_string(),
                value: expr.constant_term(),
            });
        }
        self.objective = Objective {
            optimization_type,
            terms,
            constant: expr.constant_term(),
        };
        debug!(
            component = "model",
            operation = "set_objective",
            status = "success",
            sense = ?optimization_type,
            terms = self.objective.terms.len(),
            "Set objective function"
        );
        Ok(())
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn variable(&self, handle: VariableHandle) -> Result<&Variable> {
        self.ensure_registered(handle)?;
        Ok(&self.variables[handle.index()])
    }

    pub fn handle_of(&self, name: &str) -> Option<VariableHandle> {
        self.by_name
            .get(name)
            .map(|&index| VariableHandle::new(self.id, index))
    }

    pub fn handles(&self) -> impl Iterator<Item = VariableHandle> + '_ {
        (0..self.variables.len() as u32).map(move |i| VariableHandle::new(self.id, i))
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn objective(&self) -> &Objective {
        &self.objective
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn num_integer_variables(&self) -> usize {
        self.variables.iter().filter(|v| v.is_integer()).count()
    }

    pub fn num_binary_variables(&self) -> usize {
        self.variables
            .iter()
            .filter(|v| v.variable_type == VariableType::Binary)
            .count()
    }

    pub fn is_mixed_integer(&self) -> bool {
        self.num_integer_variables() > 0
    }

    fn ensure_registered(&self, handle: VariableHandle) -> Result<()> {
        if handle.model_id() != self.id || handle.index() >= self.variables.len() {
            return Err(OptError::UnboundVariable {
                variable: handle.to_string(),
            });
        }
        Ok(())
    }

    fn checked_terms(&self, expr: &LinearExpr, context: &str) -> Result<Vec<(VariableHandle, f64)>> {
        for &(var, coeff) in expr.terms() {
            self.ensure_registered(var)?;
            if !coeff.is_finite() {
                return Err(OptError::InvalidCoefficient {
                    context: format!("{} (variable '{}')", context, self.variables[var.index()].name),
                    value: coeff,
                });
            }
        }
        Ok(expr.normalized_terms())
    }
}

impl Default for Model {
    fn default() -> Self {
        Self::new()
    }
}
