// Human-readable rendering of models and results

use std::fmt::{self, Write as _};

use super::expr::VariableHandle;
use super::models::Model;
use super::solution::SolveResult;
use super::tree::{BranchCut, DecisionTree, TreeNode};

fn format_terms(model: &Model, terms: &[(VariableHandle, f64)], constant: f64) -> String {
    let mut out = String::new();
    for (i, (var, coeff)) in terms.iter().enumerate() {
        let name = &model.variables()[var.index()].name;
        let magnitude = coeff.abs();
        match (i, *coeff < 0.0) {
            (0, true) => out.push('-'),
            (0, false) => {}
            (_, true) => out.push_str(" - "),
            (_, false) => out.push_str(" + "),
        }
        if magnitude != 1.0 {
            let _ = write!(out, "{} ", magnitude);
        }
        out.push_str(name);
    }
    if constant != 0.0 || terms.is_empty() {
        if terms.is_empty() {
            let _ = write!(out, "{}", constant);
        } else if constant < 0.0 {
            let _ = write!(out, " - {}", -constant);
        } else {
            let _ = write!(out, " + {}", constant);
        }
    }
    out
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.name().is_empty() {
            writeln!(f, "Model '{}'", self.name())?;
        }
        let objective = self.objective();
        writeln!(f, "Objective")?;
        writeln!(
            f,
            "  {} {}",
            objective.optimization_type.short_label(),
            format_terms(self, &objective.terms, objective.constant)
        )?;

        writeln!(f, "Constraints")?;
        for constraint in self.constraints() {
            writeln!(
                f,
                "  {}: {} {} {}",
                constraint.name,
                format_terms(self, &constraint.terms, 0.0),
                constraint.constraint_type,
                constraint.rhs
            )?;
        }

        writeln!(f, "Variables")?;
        for variable in self.variables() {
            writeln!(
                f,
                "  {} <= {} <= {} ({})",
                variable.bounds.lower,
                variable.name,
                variable.bounds.upper,
                variable.variable_type.as_str()
            )?;
        }
        Ok(())
    }
}

impl fmt::Display for SolveResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Status    : {}", self.status())?;
        writeln!(f, "Backend   : {}", self.backend())?;
        match self.objective_value() {
            Some(value) => writeln!(f, "Objective : {}", value)?,
            None => writeln!(f, "Objective : n/a")?,
        }
        if !self.message().is_empty() {
            writeln!(f, "Message   : {}", self.message())?;
        }
        let stats = self.statistics();
        writeln!(
            f,
            "Stats     : {} nodes, {} iterations, {:.2} ms",
            stats.nodes_explored, stats.iterations, stats.solve_time_ms
        )?;
        if self.has_assignment() {
            writeln!(f, "Variables")?;
            for (name, value) in self.assignments() {
                writeln!(f, "  {} = {}", name, value)?;
            }
        }
        Ok(())
    }
}

/// Per-node report of a search tree: the cut that created each node, its
/// relaxation value, the variable values and the slack `rhs - lhs` of every
/// constraint.
pub struct TreeReport<'a> {
    tree: &'a DecisionTree,
    model: &'a Model,
}

impl DecisionTree {
    /// Render against the model the tree was built from.
    pub fn report<'a>(&'a self, model: &'a Model) -> TreeReport<'a> {
        TreeReport { tree: self, model }
    }
}

impl TreeReport<'_> {
    fn cut(&self, f: &mut fmt::Formatter<'_>, cut: &BranchCut) -> fmt::Result {
        let relation = if cut.upper { "<=" } else { ">=" };
        match self.model.variables().get(cut.column) {
            Some(variable) => write!(f, "cut {}: {} {} {}", cut.id, variable.name, relation, cut.bound),
            None => write!(f, "{}", cut),
        }
    }

    fn node(&self, f: &mut fmt::Formatter<'_>, node: &TreeNode) -> fmt::Result {
        let indent = "  ".repeat(node.depth);
        write!(f, "{}node {} [{:?}]", indent, node.id, node.outcome)?;
        if let Some(value) = node.relaxation_value {
            write!(f, " z = {}", value)?;
        }
        if let Some(cut) = node.cuts.last() {
            write!(f, " (added ")?;
            self.cut(f, cut)?;
            write!(f, ")")?;
        }
        writeln!(f)?;

        // pending, infeasible and unbounded nodes carry no point
        if node.values.len() != self.model.num_variables() {
            return Ok(());
        }
        let values = self
            .model
            .variables()
            .iter()
            .zip(&node.values)
            .map(|(v, x)| format!("{} = {}", v.name, x))
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(f, "{}  values: {}", indent, values)?;
        if self.model.num_constraints() > 0 {
            let slacks = self
                .model
                .constraints()
                .iter()
                .map(|c| format!("{} = {}", c.name, c.rhs - c.lhs(&node.values)))
                .collect::<Vec<_>>()
                .join(", ");
            writeln!(f, "{}  slacks: {}", indent, slacks)?;
        }
        Ok(())
    }
}

impl fmt::Display for TreeReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for node in self.tree.nodes() {
            self.node(f, node)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::{
        BranchCut, Bounds, ConstraintType, DecisionTree, Direction, Model, NodeOutcome,
        OptimizationType, VariableType, ROOT_ID,
    };

    #[test]
    fn tree_report_shows_values_slacks_and_cuts() {
        let mut model = Model::new();
        let x = model
            .declare_variable("x", VariableType::Integer, Bounds::new(0.0, 10.0))
            .unwrap();
        let y = model
            .declare_variable("y", VariableType::Continuous, Bounds::new(0.0, 10.0))
            .unwrap();
        model
            .add_named_constraint("cap", x * 2.0 + y, ConstraintType::LessThanOrEqual, 7.0)
            .unwrap();
        model.set_objective(x + y, OptimizationType::Maximize).unwrap();

        let mut tree = DecisionTree::new();
        let root = tree.get_mut(ROOT_ID).unwrap();
        root.relaxation_value = Some(6.5);
        root.values = vec![0.5, 6.0];
        root.outcome = NodeOutcome::Branched;
        let cut = BranchCut {
            id: 1,
            column: 0,
            upper: true,
            bound: 0.0,
        };
        let left = tree.add_child(ROOT_ID, Direction::Left, cut).unwrap();
        let child = tree.get_mut(left).unwrap();
        child.relaxation_value = Some(7.0);
        child.values = vec![0.0, 7.0];
        child.outcome = NodeOutcome::Incumbent;
        tree.add_child(
            ROOT_ID,
            Direction::Right,
            BranchCut {
                id: 2,
                column: 0,
                upper: false,
                bound: 1.0,
            },
        );

        let text = tree.report(&model).to_string();
        assert!(text.contains("node 0 [Branched] z = 6.5"));
        assert!(text.contains("  values: x = 0.5, y = 6"));
        assert!(text.contains("  slacks: cap = 0"));
        assert!(text.contains("node 1 [Incumbent] z = 7 (added cut 1: x <= 0)"));
        assert!(text.contains("    values: x = 0, y = 7"));
        assert!(text.contains("node 2 [Pending] (added cut 2: x >= 1)"));
        // the pending node has no point to show
        assert_eq!(text.matches("values:").count(), 2);
    }

    #[test]
    fn renders_objective_constraints_and_bounds() {
        let mut model = Model::new().with_name("demo");
        let x = model
            .declare_variable("x", VariableType::Integer, Bounds::new(0.0, 10.0))
            .unwrap();
        let y = model
            .declare_variable("y", VariableType::Continuous, Bounds::non_negative())
            .unwrap();
        model
            .add_constraint(x * 2.0 - y, ConstraintType::GreaterThanOrEqual, 1.0)
            .unwrap();
        model
            .set_objective(x + y * 3.0 + 5.0, OptimizationType::Maximize)
            .unwrap();

        let text = model.to_string();
        assert!(text.contains("Model 'demo'"));
        assert!(text.contains("max x + 3 y + 5"));
        assert!(text.contains("c0: 2 x - y >= 1"));
        assert!(text.contains("0 <= x <= 10 (integer)"));
        assert!(text.contains("0 <= y <= inf (continuous)"));
    }
}
