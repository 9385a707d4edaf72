pub mod configs;
pub mod error;
mod pipeline;
mod session;

use std::{num::NonZeroUsize, time::Duration};

use atmosphere::{Bandpasses, ProfileGenerator};
use configs::{Adapter, RunSpec};
use stages::{ProcessSolver, Role, SpectrumSolver};
use tokio::runtime::Runtime;

pub use configs::RunConfig;
pub use error::{PipelineError, Result};
pub use pipeline::{LocalPipeline, Pipeline, PipelineState, spawn_in_process};
pub use session::Session;

/// Starts the external solver described by `config` and every stage, then performs the handshake.
///
/// # Errors
/// Returns an `InvalidConfig` before anything starts, or the reason the
/// solver could not be spawned or the handshake failed.
pub fn launch(config: RunConfig) -> Result<Session> {
    log::info!("adapting run config");
    let run = Adapter::new().adapt(config)?;
    let Some(solver) = run.solver.clone() else {
        return Err(PipelineError::InvalidConfig(
            "no solver command configured".into(),
        ));
    };

    let runtime = Runtime::new()?;
    let process = runtime.block_on(async {
        ProcessSolver::spawn(&solver.command, &solver.args).map_err(|e| {
            PipelineError::StageFailed {
                role: Role::Solver,
                detail: e.to_string(),
            }
        })
    })?;

    log::info!("spawned solver {}", solver.command);
    start(runtime, run, process)
}

/// Like [`launch`], but with a solver hosted in this process.
///
/// The config's solver command is ignored, its timeout still applies.
pub fn launch_with<S>(config: RunConfig, solver: S) -> Result<Session>
where
    S: SpectrumSolver + 'static,
{
    log::info!("adapting run config");
    let run = Adapter::new().adapt(config)?;
    let runtime = Runtime::new()?;
    start(runtime, run, solver)
}

fn start<S>(runtime: Runtime, run: RunSpec, solver: S) -> Result<Session>
where
    S: SpectrumSolver + 'static,
{
    let RunSpec {
        generator,
        bandpasses,
        niter,
        solver_timeout,
        ..
    } = run;

    let pipeline = runtime.block_on(connect(generator, solver, bandpasses, niter, solver_timeout))?;
    Ok(Session::new(runtime, pipeline))
}

async fn connect<S>(
    generator: ProfileGenerator,
    solver: S,
    bandpasses: Bandpasses,
    niter: NonZeroUsize,
    solver_timeout: Option<Duration>,
) -> Result<LocalPipeline>
where
    S: SpectrumSolver + 'static,
{
    let mut pipeline = spawn_in_process(generator, solver, bandpasses, niter, solver_timeout);
    pipeline.handshake().await?;
    Ok(pipeline)
}
