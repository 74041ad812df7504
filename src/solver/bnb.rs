// Depth-first branch and bound over LP relaxations.
//
// Every node solves the continuous relaxation of the lowered model with the
// node's tightened column bounds through `good_lp`'s pure-Rust `microlp`
// solver. A fractional relaxation is split on the integer column whose
// fractional part is closest to one half: the left child caps it at
// `⌊v⌋`, the right child raises it to `⌈v⌉`. The child that moves the
// column in the direction the objective favours is explored first.
//
// The search checks the stop signal, the time limit and the node limit
// between nodes and hands back the best integral incumbent found so far.

use std::time::Instant;

use good_lp::{
    solvers::microlp::microlp, variable, Expression, ProblemVariables, ResolutionError,
    Solution, SolverModel, Variable,
};
use tracing::{debug, info};

use crate::domain::{
    BranchCut, ConstraintType, DecisionTree, Direction, NodeOutcome, OptError,
    OptimizationType, RawSolution, RawStatus, Result, SessionLimits, StopSignal, ROOT_ID,
};
use crate::solver::translate::LoweredModel;

pub(crate) const BACKEND: &str = "branch-and-bound";

const HALF: f64 = 0.5;

/// Outcome of one LP relaxation
#[derive(Debug, Clone, PartialEq)]
pub enum Relaxation {
    Solved { values: Vec<f64>, objective: f64 },
    Infeasible,
    Unbounded,
}

/// Solve the continuous relaxation of `lowered` under per-column `bounds`.
pub fn solve_relaxation(lowered: &LoweredModel, bounds: &[(f64, f64)]) -> Result<Relaxation> {
    if bounds.iter().any(|(lower, upper)| lower > upper) {
        return Ok(Relaxation::Infeasible);
    }
    if lowered.columns.is_empty() {
        let satisfied = lowered
            .rows
            .iter()
            .all(|row| row.relation.violation(0.0, row.rhs) <= 0.0);
        return Ok(if satisfied {
            Relaxation::Solved {
                values: Vec::new(),
                objective: lowered.objective_constant,
            }
        } else {
            Relaxation::Infeasible
        });
    }

    let mut vars = ProblemVariables::new();
    let columns: Vec<Variable> = bounds
        .iter()
        .map(|&(lower, upper)| {
            let mut definition = variable();
            if lower.is_finite() {
                definition = definition.min(lower);
            }
            if upper.is_finite() {
                definition = definition.max(upper);
            }
            vars.add(definition)
        })
        .collect();

    let mut objective: Expression = 0.into();
    for (column, var) in lowered.columns.iter().zip(&columns) {
        if column.objective != 0.0 {
            objective += column.objective * *var;
        }
    }

    let unsolved = match lowered.sense {
        OptimizationType::Maximize => vars.maximise(objective),
        OptimizationType::Minimize => vars.minimise(objective),
    };
    let mut problem = unsolved.using(microlp);

    for row in &lowered.rows {
        if row.terms.is_empty() {
            if row.relation.violation(0.0, row.rhs) > 0.0 {
                return Ok(Relaxation::Infeasible);
            }
            continue;
        }
        let mut lhs: Expression = 0.into();
        for &(index, coeff) in &row.terms {
            lhs += coeff * columns[index];
        }
        problem = match row.relation {
            ConstraintType::LessThanOrEqual => problem.with(lhs.leq(row.rhs)),
            ConstraintType::Equal => problem.with(lhs.eq(row.rhs)),
            ConstraintType::GreaterThanOrEqual => problem.with(lhs.geq(row.rhs)),
            ConstraintType::NotEqual => {
                return Err(OptError::UnsupportedConstruct {
                    backend: BACKEND.to_string(),
                    construct: format!("relation != in constraint '{}'", row.name),
                })
            }
        };
    }

    match problem.solve() {
        Ok(solution) => {
            let values: Vec<f64> = columns.iter().map(|v| solution.value(*v)).collect();
            let objective = lowered.objective_value(&values);
            Ok(Relaxation::Solved { values, objective })
        }
        Err(ResolutionError::Infeasible) => Ok(Relaxation::Infeasible),
        Err(ResolutionError::Unbounded) => Ok(Relaxation::Unbounded),
        Err(e) => Err(OptError::failed(BACKEND, e.to_string())),
    }
}

struct Pending {
    node: usize,
    bounds: Vec<(f64, f64)>,
}

struct Child {
    node: usize,
    column: usize,
    bounds: (f64, f64),
}

struct Incumbent {
    values: Vec<f64>,
    objective: f64,
}

/// One branch-and-bound run over a lowered model.
pub struct BranchAndBound<'a> {
    lowered: &'a LoweredModel,
    limits: &'a SessionLimits,
    stop: &'a StopSignal,
    tree: DecisionTree,
    incumbent: Option<Incumbent>,
    cut_count: usize,
    nodes_explored: u64,
    relaxations: u64,
}

impl<'a> BranchAndBound<'a> {
    pub fn new(lowered: &'a LoweredModel, limits: &'a SessionLimits, stop: &'a StopSignal) -> Self {
        Self {
            lowered,
            limits,
            stop,
            tree: DecisionTree::new(),
            incumbent: None,
            cut_count: 0,
            nodes_explored: 0,
            relaxations: 0,
        }
    }

    /// Column bounds at the root; integer columns are rounded inward.
    fn root_bounds(&self) -> Vec<(f64, f64)> {
        self.lowered
            .columns
            .iter()
            .map(|c| {
                if c.integer {
                    (c.lower.ceil(), c.upper.floor())
                } else {
                    (c.lower, c.upper)
                }
            })
            .collect()
    }

    pub fn run(mut self) -> Result<RawSolution> {
        let started = Instant::now();
        let mut stack = vec![Pending {
            node: ROOT_ID,
            bounds: self.root_bounds(),
        }];

        let stopped = loop {
            let Some(pending) = stack.pop() else {
                break None;
            };
            if self.stop.is_raised() {
                break Some(RawStatus::Interrupted);
            }
            if started.elapsed() >= self.limits.time_limit {
                break Some(RawStatus::TimeLimit);
            }
            if let Some(limit) = self.limits.node_limit {
                if self.nodes_explored >= limit {
                    break Some(RawStatus::NodeLimit);
                }
            }

            self.nodes_explored += 1;
            let relaxation = solve_relaxation(self.lowered, &pending.bounds)?;
            self.relaxations += 1;

            match relaxation {
                Relaxation::Infeasible => self.mark(pending.node, NodeOutcome::Infeasible),
                Relaxation::Unbounded => {
                    self.mark(pending.node, NodeOutcome::Unbounded);
                    if pending.node == ROOT_ID {
                        return Ok(self.finish(RawStatus::Unbounded));
                    }
                }
                Relaxation::Solved { values, objective } => {
                    let children = self.visit(pending.node, &pending.bounds, values, objective);
                    for child in children.into_iter().rev() {
                        let mut bounds = pending.bounds.clone();
                        bounds[child.column] = child.bounds;
                        stack.push(Pending {
                            node: child.node,
                            bounds,
                        });
                    }
                }
            }
        };

        let status = match (stopped, &self.incumbent) {
            (Some(status), _) => status,
            (None, Some(_)) => RawStatus::Optimal,
            (None, None) => RawStatus::Infeasible,
        };
        if self.limits.verbose {
            info!(
                component = "bnb",
                nodes = self.nodes_explored,
                status = ?status,
                "search finished"
            );
        }
        Ok(self.finish(status))
    }

    /// Classify a solved node. Returns the children to explore, in the order
    /// they should be solved, each with the bounds it gives the split column.
    fn visit(
        &mut self,
        node: usize,
        bounds: &[(f64, f64)],
        values: Vec<f64>,
        objective: f64,
    ) -> Vec<Child> {
        let tolerance = self.limits.tolerance;
        let sense = self.lowered.sense;

        if let Some(entry) = self.tree.get_mut(node) {
            entry.relaxation_value = Some(objective);
            entry.values = values.clone();
        }

        if let Some(best) = &self.incumbent {
            if !sense.improves(objective, best.objective, tolerance) {
                self.mark(node, NodeOutcome::Pruned);
                return Vec::new();
            }
        }

        let column = match self.branching_column(&values) {
            Some(column) => column,
            None => {
                let snapped: Vec<f64> = values
                    .iter()
                    .zip(&self.lowered.columns)
                    .map(|(v, c)| if c.integer { v.round() } else { *v })
                    .collect();
                if self.lowered.satisfies_rows(&snapped, tolerance) {
                    self.accept(node, snapped);
                    return Vec::new();
                }
                // rounding broke a row: split the least integral column instead
                match self.least_integral_column(&values, bounds) {
                    Some(column) => {
                        debug!(component = "bnb", node, column, "snapped point infeasible");
                        column
                    }
                    None => {
                        self.accept(node, snapped);
                        return Vec::new();
                    }
                }
            }
        };

        let value = values[column];
        let (floor, ceil) = (value.floor(), value.ceil());
        let (lower, upper) = bounds[column];

        self.cut_count += 1;
        let left_cut = BranchCut {
            id: self.cut_count,
            column,
            upper: true,
            bound: floor,
        };
        self.cut_count += 1;
        let right_cut = BranchCut {
            id: self.cut_count,
            column,
            upper: false,
            bound: ceil,
        };

        let mut children = Vec::with_capacity(2);
        if let Some(id) = self.tree.add_child(node, Direction::Left, left_cut) {
            children.push(Child {
                node: id,
                column,
                bounds: (lower, floor.min(upper)),
            });
        }
        if let Some(id) = self.tree.add_child(node, Direction::Right, right_cut) {
            children.push(Child {
                node: id,
                column,
                bounds: (ceil.max(lower), upper),
            });
        }
        self.mark(node, NodeOutcome::Branched);
        debug!(component = "bnb", node, column, value, "branching");

        let grows = self.lowered.columns[column].objective > 0.0;
        let up_first = match sense {
            OptimizationType::Minimize => !grows,
            OptimizationType::Maximize => grows,
        };
        if up_first {
            children.reverse();
        }
        children
    }

    fn accept(&mut self, node: usize, snapped: Vec<f64>) {
        let tolerance = self.limits.tolerance;
        let sense = self.lowered.sense;
        let objective = self.lowered.objective_value(&snapped);
        let better = self
            .incumbent
            .as_ref()
            .map_or(true, |best| sense.improves(objective, best.objective, tolerance));
        if better {
            debug!(component = "bnb", node, objective, "new incumbent");
            self.incumbent = Some(Incumbent {
                values: snapped,
                objective,
            });
            self.mark(node, NodeOutcome::Incumbent);
        } else {
            self.mark(node, NodeOutcome::Integral);
        }
    }

    /// Integer column farthest from its nearest integer, among those both
    /// children of a split would tighten.
    fn least_integral_column(&self, values: &[f64], bounds: &[(f64, f64)]) -> Option<usize> {
        self.lowered
            .integer_columns()
            .filter(|&i| bounds[i].0 < values[i].ceil() && values[i].floor() < bounds[i].1)
            .map(|i| (i, (values[i] - values[i].round()).abs()))
            .filter(|&(_, gap)| gap > 0.0)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
    }

    /// Integer column whose fractional part is closest to one half.
    fn branching_column(&self, values: &[f64]) -> Option<usize> {
        let tolerance = self.limits.tolerance;
        self.lowered
            .integer_columns()
            .filter(|&i| (values[i] - values[i].round()).abs() > tolerance)
            .min_by(|&a, &b| {
                let da = (values[a] - values[a].floor() - HALF).abs();
                let db = (values[b] - values[b].floor() - HALF).abs();
                da.total_cmp(&db)
            })
    }

    fn mark(&mut self, node: usize, outcome: NodeOutcome) {
        if let Some(entry) = self.tree.get_mut(node) {
            entry.outcome = outcome;
        }
    }

    fn finish(self, status: RawStatus) -> RawSolution {
        let mut raw = RawSolution::new(status);
        raw.iterations = self.relaxations;
        raw.nodes_explored = self.nodes_explored;
        raw.search_tree = Some(self.tree);
        match self.incumbent {
            Some(best) if status != RawStatus::Unbounded => raw
                .with_values(best.values)
                .with_objective(best.objective),
            _ => raw,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::domain::{Capabilities, Model, VariableType, Bounds, LINEAR_RELATIONS, LinearExpr};
    use crate::solver::translate::lower;

    const MIP: Capabilities = Capabilities {
        relations: LINEAR_RELATIONS,
        integer_domains: true,
    };

    fn limits() -> SessionLimits {
        SessionLimits {
            time_limit: Duration::from_secs(30),
            node_limit: None,
            tolerance: 1e-6,
            verbose: false,
        }
    }

    fn knapsack() -> LoweredModel {
        let mut model = Model::new();
        let values = [150.0, 90.0, 120.0, 100.0, 80.0];
        let weights = [7.0, 3.0, 4.0, 5.0, 2.0];
        let items: Vec<_> = (0..5)
            .map(|i| {
                model
                    .declare_variable(format!("x{}", i), VariableType::Binary, Bounds::binary())
                    .unwrap()
            })
            .collect();
        let weight = LinearExpr::from_terms(items.iter().copied().zip(weights));
        model
            .add_constraint(weight, ConstraintType::LessThanOrEqual, 15.0)
            .unwrap();
        let value = LinearExpr::from_terms(items.iter().copied().zip(values));
        model.set_objective(value, OptimizationType::Maximize).unwrap();
        lower(&model, BACKEND, &MIP).unwrap()
    }

    #[test]
    fn relaxation_of_a_bounded_lp() {
        let mut model = Model::new();
        let x = model
            .declare_variable("x", VariableType::Continuous, Bounds::new(0.0, 10.0))
            .unwrap();
        model.set_objective(x, OptimizationType::Maximize).unwrap();
        let lowered = lower(&model, BACKEND, &MIP).unwrap();

        match solve_relaxation(&lowered, &[(0.0, 10.0)]).unwrap() {
            Relaxation::Solved { values, objective } => {
                assert!((values[0] - 10.0).abs() < 1e-6);
                assert!((objective - 10.0).abs() < 1e-6);
            }
            other => panic!("unexpected relaxation {:?}", other),
        }
        assert_eq!(
            solve_relaxation(&lowered, &[(3.0, 2.0)]).unwrap(),
            Relaxation::Infeasible
        );
    }

    #[test]
    fn keeps_branching_when_rounding_breaks_a_row() {
        let mut model = Model::new();
        let x = model
            .declare_variable("x", VariableType::Integer, Bounds::new(0.0, 10.0))
            .unwrap();
        let y = model
            .declare_variable("y", VariableType::Continuous, Bounds::new(0.0, 10.0))
            .unwrap();
        model
            .add_constraint(x * 1e6 - y * 1e6, ConstraintType::LessThanOrEqual, 0.0)
            .unwrap();
        model
            .add_constraint(y, ConstraintType::LessThanOrEqual, 1.9999995)
            .unwrap();
        model.set_objective(x, OptimizationType::Maximize).unwrap();
        let lowered = lower(&model, BACKEND, &MIP).unwrap();
        let limits = limits();
        let stop = StopSignal::new();
        let raw = BranchAndBound::new(&lowered, &limits, &stop).run().unwrap();

        assert_eq!(raw.status, RawStatus::Optimal);
        let values = raw.values.unwrap();
        assert_eq!(values[0], 1.0);
        assert!(lowered.satisfies_rows(&values, 1e-6));
        assert_eq!(raw.search_tree.unwrap().root().outcome, NodeOutcome::Branched);
    }

    #[test]
    fn finds_knapsack_optimum() {
        let lowered = knapsack();
        let limits = limits();
        let stop = StopSignal::new();
        let raw = BranchAndBound::new(&lowered, &limits, &stop).run().unwrap();

        assert_eq!(raw.status, RawStatus::Optimal);
        assert_eq!(raw.values.as_deref(), Some(&[0.0, 1.0, 1.0, 1.0, 1.0][..]));
        assert!((raw.objective.unwrap() - 390.0).abs() < 1e-6);
        assert!(raw.nodes_explored > 1);

        let tree = raw.search_tree.unwrap();
        assert_eq!(tree.root().outcome, NodeOutcome::Branched);
        assert!(tree.incumbent().is_some());
    }

    #[test]
    fn raised_stop_interrupts_before_the_root() {
        let lowered = knapsack();
        let limits = limits();
        let stop = StopSignal::new();
        stop.raise();
        let raw = BranchAndBound::new(&lowered, &limits, &stop).run().unwrap();
        assert_eq!(raw.status, RawStatus::Interrupted);
        assert!(raw.values.is_none());
        assert_eq!(raw.nodes_explored, 0);
    }

    #[test]
    fn node_limit_stops_the_search() {
        let lowered = knapsack();
        let limits = SessionLimits {
            node_limit: Some(1),
            ..limits()
        };
        let stop = StopSignal::new();
        let raw = BranchAndBound::new(&lowered, &limits, &stop).run().unwrap();
        assert_eq!(raw.status, RawStatus::NodeLimit);
        assert_eq!(raw.nodes_explored, 1);
    }

    #[test]
    fn integer_bounds_are_rounded_inward() {
        let mut model = Model::new();
        let n = model
            .declare_variable("n", VariableType::Integer, Bounds::new(0.5, 3.7))
            .unwrap();
        model.set_objective(n, OptimizationType::Maximize).unwrap();
        let lowered = lower(&model, BACKEND, &MIP).unwrap();
        let limits = limits();
        let stop = StopSignal::new();
        let raw = BranchAndBound::new(&lowered, &limits, &stop).run().unwrap();
        assert_eq!(raw.status, RawStatus::Optimal);
        assert_eq!(raw.values.as_deref(), Some(&[3.0][..]));
    }

    #[test]
    fn integer_infeasibility_is_detected() {
        let mut model = Model::new();
        let n = model
            .declare_variable("n", VariableType::Integer, Bounds::new(0.0, 10.0))
            .unwrap();
        model
            .add_constraint(n * 2.0, ConstraintType::Equal, 3.0)
            .unwrap();
        model.set_objective(n, OptimizationType::Minimize).unwrap();
        let lowered = lower(&model, BACKEND, &MIP).unwrap();
        let limits = limits();
        let stop = StopSignal::new();
        let raw = BranchAndBound::new(&lowered, &limits, &stop).run().unwrap();
        assert_eq!(raw.status, RawStatus::Infeasible);
        assert!(raw.values.is_none());
    }
}
