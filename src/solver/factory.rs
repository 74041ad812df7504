use std::sync::Arc;

use crate::config::SolveOptions;
use crate::domain::{OptError, Result, SolverBackend, SolverService};
use crate::solver::BranchAndBoundSolver;
#[cfg(feature = "coin_cbc")]
use crate::solver::CoinCbcSolver;
#[cfg(feature = "highs")]
use crate::solver::HighsSolver;

/// Factory for creating solver instances based on configuration
pub struct SolverFactory;

impl SolverFactory {
    /// Create the solver named in the options
    pub fn create_solver(options: &SolveOptions) -> Result<Arc<dyn SolverService>> {
        Self::create_from_backend(options.backend)
    }

    /// Create a solver for a specific backend; backends compiled out of this
    /// build are reported as not available.
    pub fn create_from_backend(backend: SolverBackend) -> Result<Arc<dyn SolverService>> {
        match backend {
            SolverBackend::Auto => Ok(Self::auto()),
            SolverBackend::BranchAndBound => Ok(Arc::new(BranchAndBoundSolver::new())),
            #[cfg(feature = "highs")]
            SolverBackend::Highs => Ok(Arc::new(HighsSolver::new())),
            #[cfg(feature = "coin_cbc")]
            SolverBackend::CoinCbc => Ok(Arc::new(CoinCbcSolver::new())),
            #[allow(unreachable_patterns)]
            other => Err(OptError::SolverNotAvailable(format!(
                "backend '{}' is not compiled into this build",
                other
            ))),
        }
    }

    /// Get the default solver: HiGHS when compiled in, else branch and bound
    pub fn default_solver() -> Arc<dyn SolverService> {
        Self::auto()
    }

    /// Backends usable in this build, in order of preference
    pub fn available_backends() -> Vec<SolverBackend> {
        let mut backends = Vec::new();
        #[cfg(feature = "highs")]
        backends.push(SolverBackend::Highs);
        #[cfg(feature = "coin_cbc")]
        backends.push(SolverBackend::CoinCbc);
        backends.push(SolverBackend::BranchAndBound);
        backends
    }

    #[cfg(feature = "highs")]
    fn auto() -> Arc<dyn SolverService> {
        Arc::new(HighsSolver::new())
    }

    #[cfg(not(feature = "highs"))]
    fn auto() -> Arc<dyn SolverService> {
        Arc::new(BranchAndBoundSolver::new())
    }
}
