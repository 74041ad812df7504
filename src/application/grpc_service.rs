use tonic::{Request, Response, Status};
use tracing::{info, warn};

use super::mappers::{self, optbridge};
use crate::config::SolveOptions;
use crate::controller::SolveController;
use crate::domain::{OptError, SolverBackend, SolverService};
use crate::solver::SolverFactory;

/// gRPC service implementation
///
/// Each request gets its own model and controller, so independent requests
/// solve in parallel. Dropping a request future (client gone) stops its
/// solver session.
pub struct GrpcModelSolverService {
    defaults: SolveOptions,
}

impl GrpcModelSolverService {
    pub fn new(defaults: SolveOptions) -> Self {
        Self { defaults }
    }
}

impl Default for GrpcModelSolverService {
    fn default() -> Self {
        Self::new(SolveOptions::default())
    }
}

fn reject(operation: &'static str, err: OptError) -> Status {
    warn!(
        component = "grpc",
        operation,
        status = "error",
        code = err.code(),
        error = %err,
        "request failed"
    );
    mappers::error_to_status(&err)
}

fn backend_id(backend: SolverBackend) -> &'static str {
    match backend {
        SolverBackend::Auto => "auto",
        SolverBackend::BranchAndBound => "bnb",
        SolverBackend::CoinCbc => "cbc",
        SolverBackend::Highs => "highs",
    }
}

#[tonic::async_trait]
impl optbridge::model_solver_server::ModelSolver for GrpcModelSolverService {
    async fn solve(
        &self,
        request: Request<optbridge::SolveRequest>,
    ) -> Result<Response<optbridge::SolveResponse>, Status> {
        let request = request.into_inner();
        let include_tree = request
            .options
            .as_ref()
            .map(|o| o.include_tree)
            .unwrap_or(false);
        let options = mappers::proto_to_solve_options(request.options, &self.defaults)
            .map_err(|e| reject("solve", e))?;
        let model = request
            .model
            .ok_or_else(|| Status::invalid_argument("Model is required"))
            .and_then(|m| mappers::proto_to_domain_model(m).map_err(|e| reject("solve", e)))?;

        info!(
            component = "grpc",
            operation = "solve",
            model = model.name(),
            variables = model.num_variables(),
            constraints = model.num_constraints(),
            "solve requested"
        );

        let budget = options.budget();
        let mut controller =
            SolveController::from_options(options).map_err(|e| reject("solve", e))?;
        let result = controller
            .run(&model, budget, None)
            .await
            .map_err(|e| reject("solve", e))?;

        info!(
            component = "grpc",
            operation = "solve",
            backend = result.backend(),
            status = %result.status(),
            state = %controller.state(),
            "solve answered"
        );
        Ok(Response::new(mappers::domain_to_proto_result(&result, include_tree)))
    }

    async fn validate(
        &self,
        request: Request<optbridge::SolveRequest>,
    ) -> Result<Response<optbridge::ValidationResult>, Status> {
        let request = request.into_inner();
        let options = mappers::proto_to_solve_options(request.options, &self.defaults)
            .map_err(|e| reject("validate", e))?;
        let model = request
            .model
            .ok_or_else(|| Status::invalid_argument("Model is required"))?;

        // mapping errors are validation findings, not transport failures
        let model = match mappers::proto_to_domain_model(model) {
            Ok(model) => model,
            Err(e) => {
                return Ok(Response::new(optbridge::ValidationResult {
                    is_valid: false,
                    errors: vec![e.to_string()],
                    ..Default::default()
                }))
            }
        };

        let solver = SolverFactory::create_solver(&options)
            .map_err(|e| reject("validate", e))?;
        let (errors, warnings) = match solver.validate(&model) {
            Ok(warnings) => (Vec::new(), warnings),
            Err(e) => (vec![e.to_string()], Vec::new()),
        };

        Ok(Response::new(optbridge::ValidationResult {
            is_valid: errors.is_empty(),
            errors,
            warnings,
            num_variables: model.num_variables() as u32,
            num_constraints: model.num_constraints() as u32,
            num_integer_vars: model.num_integer_variables() as u32,
            backend: solver.name().to_string(),
        }))
    }

    async fn list_backends(
        &self,
        _request: Request<optbridge::ListBackendsRequest>,
    ) -> Result<Response<optbridge::AvailableBackends>, Status> {
        let default_name = SolverFactory::create_from_backend(self.defaults.backend)
            .map(|s| s.name().to_string())
            .unwrap_or_default();

        let backends = SolverFactory::available_backends()
            .into_iter()
            .filter_map(|backend| {
                let solver = SolverFactory::create_from_backend(backend).ok()?;
                let caps = solver.capabilities();
                Some(optbridge::BackendInfo {
                    id: backend_id(backend).to_string(),
                    name: solver.name().to_string(),
                    supports_mip: solver.supports_mip(),
                    relations: caps
                        .relations
                        .iter()
                        .map(|r| r.symbol().to_string())
                        .collect(),
                    is_default: solver.name() == default_name,
                })
            })
            .collect();

        Ok(Response::new(optbridge::AvailableBackends { backends }))
    }
}
