// Backend-neutral lowering of the model IR
// Every adapter starts from the same column/row form so that domain and bound
// semantics are decided once, here, and not per backend.

use crate::domain::{
    check_support, Capabilities, ConstraintType, Model, OptimizationType, Result,
};

/// Column of the lowered model (one per declared variable, same order)
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub lower: f64,
    pub upper: f64,
    pub integer: bool,
    pub objective: f64,
}

/// Row of the lowered model with merged, non-zero terms
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub name: String,
    pub terms: Vec<(usize, f64)>,
    pub relation: ConstraintType,
    pub rhs: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoweredModel {
    pub columns: Vec<Column>,
    pub rows: Vec<Row>,
    pub sense: OptimizationType,
    pub objective_constant: f64,
}

impl LoweredModel {
    pub fn integer_columns(&self) -> impl Iterator<Item = usize> + '_ {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.integer)
            .map(|(i, _)| i)
    }

    pub fn objective_value(&self, values: &[f64]) -> f64 {
        self.columns
            .iter()
            .zip(values)
            .map(|(c, v)| c.objective * v)
            .sum::<f64>()
            + self.objective_constant
    }

    /// Whether `values` satisfies every row within `tolerance · max(1, |rhs|)`.
    pub fn satisfies_rows(&self, values: &[f64], tolerance: f64) -> bool {
        self.rows.iter().all(|row| {
            let lhs: f64 = row.terms.iter().map(|&(i, c)| c * values[i]).sum();
            row.relation.violation(lhs, row.rhs) <= tolerance * row.rhs.abs().max(1.0)
        })
    }
}

/// Lower `model` for a backend with the given capabilities.
///
/// Fails with `UnsupportedConstruct` before producing anything if the model
/// uses a relation or a domain the backend cannot express.
pub fn lower(model: &Model, backend: &str, capabilities: &Capabilities) -> Result<LoweredModel> {
    check_support(model, backend, capabilities)?;

    let objective = model.objective();
    let mut columns: Vec<Column> = model
        .variables()
        .iter()
        .map(|v| Column {
            name: v.name.clone(),
            lower: v.bounds.lower,
            upper: v.bounds.upper,
            integer: v.is_integer(),
            objective: 0.0,
        })
        .collect();
    for (var, coeff) in &objective.terms {
        columns[var.index()].objective += coeff;
    }

    let rows = model
        .constraints()
        .iter()
        .map(|c| Row {
            name: c.name.clone(),
            terms: c
                .terms
                .iter()
                .filter(|(_, coeff)| *coeff != 0.0)
                .map(|(v, coeff)| (v.index(), *coeff))
                .collect(),
            relation: c.constraint_type,
            rhs: c.rhs,
        })
        .collect();

    Ok(LoweredModel {
        columns,
        rows,
        sense: objective.optimization_type,
        objective_constant: objective.constant,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Bounds, OptError, VariableType, LINEAR_RELATIONS};

    const MIP: Capabilities = Capabilities {
        relations: LINEAR_RELATIONS,
        integer_domains: true,
    };

    #[test]
    fn keeps_domains_bounds_and_objective() {
        let mut model = Model::new();
        let x = model
            .declare_variable("x", VariableType::Integer, Bounds::new(-2.0, 7.0))
            .unwrap();
        let b = model
            .declare_variable("b", VariableType::Binary, Bounds::free())
            .unwrap();
        let y = model
            .declare_variable("y", VariableType::Continuous, Bounds::non_negative())
            .unwrap();
        model
            .add_constraint(x + b * 3.0 - y, ConstraintType::Equal, 4.0)
            .unwrap();
        model
            .set_objective(x * 2.0 + y + 1.5, OptimizationType::Maximize)
            .unwrap();

        let lowered = lower(&model, "test", &MIP).unwrap();
        assert_eq!(lowered.columns.len(), 3);
        assert!(lowered.columns[0].integer);
        assert!(lowered.columns[1].integer);
        assert!(!lowered.columns[2].integer);
        assert_eq!((lowered.columns[0].lower, lowered.columns[0].upper), (-2.0, 7.0));
        assert_eq!((lowered.columns[1].lower, lowered.columns[1].upper), (0.0, 1.0));
        assert_eq!(lowered.columns[0].objective, 2.0);
        assert_eq!(lowered.columns[1].objective, 0.0);
        assert_eq!(lowered.objective_constant, 1.5);
        assert_eq!(lowered.sense, OptimizationType::Maximize);
        assert_eq!(lowered.rows[0].terms, vec![(0, 1.0), (1, 3.0), (2, -1.0)]);
        assert_eq!(lowered.integer_columns().collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(lowered.objective_value(&[1.0, 0.0, 2.0]), 5.5);
    }

    #[test]
    fn refuses_to_relax_integers() {
        let mut model = Model::new();
        model
            .declare_variable("n", VariableType::Integer, Bounds::new(0.0, 3.0))
            .unwrap();
        let lp_only = Capabilities {
            relations: LINEAR_RELATIONS,
            integer_domains: false,
        };
        assert!(matches!(
            lower(&model, "lp", &lp_only),
            Err(OptError::UnsupportedConstruct { .. })
        ));
    }
}
