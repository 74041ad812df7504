// Domain value objects shared by the model IR, the backends and the extractor

use std::fmt;
use std::str::FromStr;

use super::error::OptError;

/// Domain of a decision variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableType {
    /// Continuous real number (x ∈ ℝ)
    Continuous,
    /// Integer number (x ∈ ℤ)
    Integer,
    /// Binary variable (x ∈ {0, 1})
    Binary,
}

impl VariableType {
    pub fn is_integral(self) -> bool {
        matches!(self, VariableType::Integer | VariableType::Binary)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VariableType::Continuous => "continuous",
            VariableType::Integer => "integer",
            VariableType::Binary => "binary",
        }
    }
}

/// Relation between a constraint's left-hand side and its right-hand side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintType {
    /// Less than or equal (≤)
    LessThanOrEqual,
    /// Equal (=)
    Equal,
    /// Greater than or equal (≥)
    GreaterThanOrEqual,
    /// Not equal (≠), a logical relation no linear backend can express
    NotEqual,
}

impl ConstraintType {
    pub fn symbol(self) -> &'static str {
        match self {
            ConstraintType::LessThanOrEqual => "<=",
            ConstraintType::Equal => "=",
            ConstraintType::GreaterThanOrEqual => ">=",
            ConstraintType::NotEqual => "!=",
        }
    }

    /// Amount by which `lhs` misses the relation against `rhs` (0 when satisfied).
    pub fn violation(self, lhs: f64, rhs: f64) -> f64 {
        match self {
            ConstraintType::LessThanOrEqual => (lhs - rhs).max(0.0),
            ConstraintType::Equal => (lhs - rhs).abs(),
            ConstraintType::GreaterThanOrEqual => (rhs - lhs).max(0.0),
            ConstraintType::NotEqual => {
                if lhs == rhs {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
}

impl fmt::Display for ConstraintType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Direction of optimization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OptimizationType {
    /// Minimize the objective function
    #[default]
    Minimize,
    /// Maximize the objective function
    Maximize,
}

impl OptimizationType {
    /// True when `candidate` beats `incumbent` by more than `margin`.
    pub fn improves(self, candidate: f64, incumbent: f64, margin: f64) -> bool {
        match self {
            OptimizationType::Minimize => candidate < incumbent - margin,
            OptimizationType::Maximize => candidate > incumbent + margin,
        }
    }

    pub fn short_label(self) -> &'static str {
        match self {
            OptimizationType::Minimize => "min",
            OptimizationType::Maximize => "max",
        }
    }
}

/// Closed interval `[lower, upper]`; either side may be infinite
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub lower: f64,
    pub upper: f64,
}

impl Bounds {
    pub fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    pub fn free() -> Self {
        Self::new(f64::NEG_INFINITY, f64::INFINITY)
    }

    pub fn non_negative() -> Self {
        Self::new(0.0, f64::INFINITY)
    }

    pub fn fixed(value: f64) -> Self {
        Self::new(value, value)
    }

    pub fn binary() -> Self {
        Self::new(0.0, 1.0)
    }

    /// Non-empty, NaN-free, and not pinned at an infinity.
    pub fn is_valid(&self) -> bool {
        !self.lower.is_nan()
            && !self.upper.is_nan()
            && self.lower <= self.upper
            && self.lower != f64::INFINITY
            && self.upper != f64::NEG_INFINITY
    }

    pub fn intersect(&self, other: &Bounds) -> Bounds {
        Bounds::new(self.lower.max(other.lower), self.upper.min(other.upper))
    }

    /// Distance from `value` to the interval (0 inside).
    pub fn violation(&self, value: f64) -> f64 {
        (self.lower - value).max(value - self.upper).max(0.0)
    }

    pub fn contains(&self, value: f64, tolerance: f64) -> bool {
        self.violation(value) <= tolerance
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.max(self.lower).min(self.upper)
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::non_negative()
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.lower, self.upper)
    }
}

/// Status of a solve as seen by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolutionStatus {
    /// Proven optimal solution
    Optimal,
    /// Feasible solution, optimality not proven
    Feasible,
    /// Problem has no feasible solution
    Infeasible,
    /// Objective can be improved infinitely
    Unbounded,
    /// Time budget exhausted (may carry an incumbent)
    TimedOut,
    /// Solve cancelled by the caller (may carry an incumbent)
    Interrupted,
    /// Node limit reached (may carry an incumbent)
    NodeLimit,
}

impl SolutionStatus {
    pub fn is_feasible(self) -> bool {
        matches!(self, SolutionStatus::Optimal | SolutionStatus::Feasible)
    }

    /// Statuses produced by a solve that ran to its natural end.
    pub fn is_conclusive(self) -> bool {
        matches!(
            self,
            SolutionStatus::Optimal
                | SolutionStatus::Feasible
                | SolutionStatus::Infeasible
                | SolutionStatus::Unbounded
        )
    }
}

impl fmt::Display for SolutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolutionStatus::Optimal => write!(f, "Optimal"),
            SolutionStatus::Feasible => write!(f, "Feasible"),
            SolutionStatus::Infeasible => write!(f, "Infeasible"),
            SolutionStatus::Unbounded => write!(f, "Unbounded"),
            SolutionStatus::TimedOut => write!(f, "Timed Out"),
            SolutionStatus::Interrupted => write!(f, "Interrupted"),
            SolutionStatus::NodeLimit => write!(f, "Node Limit Reached"),
        }
    }
}

/// Solver backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SolverBackend {
    /// Best backend compiled into this build
    #[default]
    Auto,
    /// Built-in branch and bound over microlp relaxations
    BranchAndBound,
    /// COIN-OR CBC
    CoinCbc,
    /// HiGHS
    Highs,
}

impl fmt::Display for SolverBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverBackend::Auto => write!(f, "Auto"),
            SolverBackend::BranchAndBound => write!(f, "Branch and Bound"),
            SolverBackend::CoinCbc => write!(f, "COIN-OR CBC"),
            SolverBackend::Highs => write!(f, "HiGHS"),
        }
    }
}

impl FromStr for SolverBackend {
    type Err = OptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" | "" => Ok(SolverBackend::Auto),
            "bnb" | "branch-and-bound" | "branch_and_bound" => Ok(SolverBackend::BranchAndBound),
            "cbc" | "coin_cbc" | "coin-cbc" => Ok(SolverBackend::CoinCbc),
            "highs" => Ok(SolverBackend::Highs),
            other => Err(OptError::Config(format!("unknown solver backend '{}'", other))),
        }
    }
}
