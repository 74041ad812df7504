// Handles and linear expressions over model variables.

use std::collections::HashMap;
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_MODEL_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one `Model` instance; handles remember which model issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelId(u64);

impl ModelId {
    pub(crate) fn fresh() -> Self {
        Self(NEXT_MODEL_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn inner(self) -> u64 {
        self.0
    }
}

/// Opaque reference to a declared variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VariableHandle {
    model: ModelId,
    index: u32,
}

impl VariableHandle {
    pub(crate) fn new(model: ModelId, index: u32) -> Self {
        Self { model, index }
    }

    /// Column position of the variable in its model.
    pub fn index(self) -> usize {
        self.index as usize
    }

    pub fn model_id(self) -> ModelId {
        self.model
    }
}

impl fmt::Display for VariableHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} of model {}", self.index, self.model.0)
    }
}

/// Opaque reference to an added constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConstraintHandle {
    model: ModelId,
    index: u32,
}

impl ConstraintHandle {
    pub(crate) fn new(model: ModelId, index: u32) -> Self {
        Self { model, index }
    }

    pub fn index(self) -> usize {
        self.index as usize
    }

    pub fn model_id(self) -> ModelId {
        self.model
    }
}

/// Linear expression `Σ cᵢ·xᵢ + constant`.
///
/// Terms are kept in insertion order and may repeat a variable; the model
/// merges duplicates when the expression is registered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearExpr {
    terms: Vec<(VariableHandle, f64)>,
    constant: f64,
}

impl LinearExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn constant(value: f64) -> Self {
        Self {
            terms: Vec::new(),
            constant: value,
        }
    }

    pub fn term(variable: VariableHandle, coefficient: f64) -> Self {
        Self {
            terms: vec![(variable, coefficient)],
            constant: 0.0,
        }
    }

    pub fn from_terms(terms: impl IntoIterator<Item = (VariableHandle, f64)>) -> Self {
        Self {
            terms: terms.into_iter().collect(),
            constant: 0.0,
        }
    }

    /// Sum of variables with unit coefficients.
    pub fn sum(variables: impl IntoIterator<Item = VariableHandle>) -> Self {
        Self::from_terms(variables.into_iter().map(|v| (v, 1.0)))
    }

    pub fn add_term(&mut self, variable: VariableHandle, coefficient: f64) {
        self.terms.push((variable, coefficient));
    }

    pub fn with_constant(mut self, value: f64) -> Self {
        self.constant = value;
        self
    }

    pub fn terms(&self) -> &[(VariableHandle, f64)] {
        &self.terms
    }

    pub fn constant_term(&self) -> f64 {
        self.constant
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn variables(&self) -> impl Iterator<Item = VariableHandle> + '_ {
        self.terms.iter().map(|(v, _)| *v)
    }

    /// Terms with duplicates merged (first-appearance order) and zeros dropped.
    pub fn normalized_terms(&self) -> Vec<(VariableHandle, f64)> {
        let mut positions: HashMap<VariableHandle, usize> = HashMap::with_capacity(self.terms.len());
        let mut merged: Vec<(VariableHandle, f64)> = Vec::with_capacity(self.terms.len());
        for &(var, coeff) in &self.terms {
            match positions.get(&var) {
                Some(&pos) => merged[pos].1 += coeff,
                None => {
                    positions.insert(var, merged.len());
                    merged.push((var, coeff));
                }
            }
        }
        merged.retain(|(_, c)| *c != 0.0);
        merged
    }

    pub fn evaluate(&self, value_of: impl Fn(VariableHandle) -> f64) -> f64 {
        self.terms
            .iter()
            .map(|&(v, c)| c * value_of(v))
            .sum::<f64>()
            + self.constant
    }
}

impl From<VariableHandle> for LinearExpr {
    fn from(variable: VariableHandle) -> Self {
        LinearExpr::term(variable, 1.0)
    }
}

impl From<f64> for LinearExpr {
    fn from(value: f64) -> Self {
        LinearExpr::constant(value)
    }
}

impl AddAssign<LinearExpr> for LinearExpr {
    fn add_assign(&mut self, rhs: LinearExpr) {
        self.terms.extend(rhs.terms);
        self.constant += rhs.constant;
    }
}

impl AddAssign<VariableHandle> for LinearExpr {
    fn add_assign(&mut self, rhs: VariableHandle) {
        self.terms.push((rhs, 1.0));
    }
}

impl Add<LinearExpr> for LinearExpr {
    type Output = LinearExpr;

    fn add(mut self, rhs: LinearExpr) -> LinearExpr {
        self += rhs;
        self
    }
}

impl Add<VariableHandle> for LinearExpr {
    type Output = LinearExpr;

    fn add(mut self, rhs: VariableHandle) -> LinearExpr {
        self += rhs;
        self
    }
}

impl Add<f64> for LinearExpr {
    type Output = LinearExpr;

    fn add(mut self, rhs: f64) -> LinearExpr {
        self.constant += rhs;
        self
    }
}

impl Add<VariableHandle> for VariableHandle {
    type Output = LinearExpr;

    fn add(self, rhs: VariableHandle) -> LinearExpr {
        LinearExpr::from_terms([(self, 1.0), (rhs, 1.0)])
    }
}

impl Add<LinearExpr> for VariableHandle {
    type Output = LinearExpr;

    fn add(self, rhs: LinearExpr) -> LinearExpr {
        LinearExpr::from(self) + rhs
    }
}

impl Neg for LinearExpr {
    type Output = LinearExpr;

    fn neg(self) -> LinearExpr {
        self * -1.0
    }
}

impl Sub<LinearExpr> for LinearExpr {
    type Output = LinearExpr;

    fn sub(self, rhs: LinearExpr) -> LinearExpr {
        self + (-rhs)
    }
}

impl Sub<VariableHandle> for LinearExpr {
    type Output = LinearExpr;

    fn sub(mut self, rhs: VariableHandle) -> LinearExpr {
        self.terms.push((rhs, -1.0));
        self
    }
}

impl Sub<VariableHandle> for VariableHandle {
    type Output = LinearExpr;

    fn sub(self, rhs: VariableHandle) -> LinearExpr {
        LinearExpr::from_terms([(self, 1.0), (rhs, -1.0)])
    }
}

impl Mul<f64> for LinearExpr {
    type Output = LinearExpr;

    fn mul(mut self, rhs: f64) -> LinearExpr {
        for term in &mut self.terms {
            term.1 *= rhs;
        }
        self.constant *= rhs;
        self
    }
}

impl Mul<f64> for VariableHandle {
    type Output = LinearExpr;

    fn mul(self, rhs: f64) -> LinearExpr {
        LinearExpr::term(self, rhs)
    }
}

impl Mul<VariableHandle> for f64 {
    type Output = LinearExpr;

    fn mul(self, rhs: VariableHandle) -> LinearExpr {
        LinearExpr::term(rhs, self)
    }
}

impl Mul<LinearExpr> for f64 {
    type Output = LinearExpr;

    fn mul(self, rhs: LinearExpr) -> LinearExpr {
        rhs * self
    }
}
