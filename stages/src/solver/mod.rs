//! The boundary to the external spectrum solver.

mod process;
mod remote;

use comms::{
    msg::{Command, Msg, Payload},
    specs::{AuxScalars, PipelineSizes},
};
use log::{debug, info};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::{Endpoint, Result, Role, StageErr, endpoint::Event};
pub use process::ProcessSolver;
pub use remote::{RemoteSolver, serve};

/// A black box mapping layer profiles to spectra over a fixed wavenumber grid.
#[allow(unused)]
#[trait_variant::make(SpectrumSolver: Send)]
pub trait SpectrumSolverTemplate {
    /// The solver's wavenumber grid in cm-1, strictly increasing.
    async fn wavenumbers(&mut self) -> Result<Vec<f64>>;

    /// Accepts or refuses the negotiated pipeline sizes.
    async fn configure(&mut self, sizes: &PipelineSizes) -> Result<()>;

    /// Updates the per-iteration scalars, only the present ones change.
    async fn set_auxiliary(&mut self, aux: &AuxScalars) -> Result<()>;

    /// Computes a spectrum.
    ///
    /// # Arguments
    /// * `profile` - The temperature row followed by one row per species.
    /// * `spectrum` - Where to write one value per wavenumber.
    async fn solve(&mut self, profile: &[f64], spectrum: &mut [f64]) -> Result<()>;

    async fn shutdown(&mut self) -> Result<()>;
}

/// Hosts a `SpectrumSolver` as the middle stage of a pipeline.
pub struct SolverStage<S: SpectrumSolver> {
    solver: S,
}

impl<S: SpectrumSolver> SolverStage<S> {
    pub fn new(solver: S) -> Self {
        Self { solver }
    }

    /// Runs the stage until the coordinator disconnects, then shuts the solver down.
    ///
    /// # Errors
    /// Returns `StageErr` on I/O failures, solver failures or protocol violations.
    pub async fn run<R, W>(mut self, mut endpoint: Endpoint<R, W>) -> Result<()>
    where
        R: AsyncRead + Unpin + Send,
        W: AsyncWrite + Unpin + Send,
    {
        let role = Role::Solver;
        let mut data_buf = Vec::new();
        let mut control_buf = Vec::new();

        let wavenumbers = self.solver.wavenumbers().await?;
        let nwave = wavenumbers.len();

        let msg = Msg::Control(Command::ReportWavenumbers { nwave });
        endpoint.data_tx.send(&msg).await?;

        let sizes = endpoint.recv_sizes(role, &mut data_buf).await?;

        if sizes.nwave != nwave {
            let detail = format!("negotiated {} wavenumbers, the grid has {nwave}", sizes.nwave);
            return Err(endpoint.refuse(role, detail).await);
        }

        if let Err(e) = self.solver.configure(&sizes).await {
            return Err(endpoint.refuse(role, e.to_string()).await);
        }

        let msg = Msg::Data(Payload::Wavenumbers(&wavenumbers));
        endpoint.data_tx.send(&msg).await?;
        endpoint.ready().await?;
        info!(role:% = role, nwave = nwave; "stage ready");

        let nprofile = sizes.nprofile();
        let mut spectrum = vec![0.0; nwave];
        let mut iteration = 0;

        loop {
            let event = endpoint
                .next_event(role, iteration, &mut data_buf, &mut control_buf)
                .await?;

            match event {
                Event::Disconnect => break,
                Event::Data(Msg::Control(Command::Auxiliary(aux))) => {
                    self.solver.set_auxiliary(&aux).await?;
                }
                Event::Data(Msg::Data(Payload::Profile(profile))) => {
                    if iteration == sizes.niter {
                        return Err(StageErr::BudgetExceeded {
                            role,
                            niter: sizes.niter,
                        });
                    }

                    if profile.len() != nprofile {
                        return Err(StageErr::LengthMismatch {
                            role,
                            what: "profile",
                            iteration,
                            got: profile.len(),
                            expected: nprofile,
                        });
                    }

                    self.solver.solve(profile, &mut spectrum).await?;
                    debug!(iteration = iteration; "spectrum solved");

                    let msg = Msg::Data(Payload::Spectrum(&spectrum));
                    endpoint.data_tx.send(&msg).await?;
                    iteration += 1;
                }
                Event::Data(other) => {
                    return Err(StageErr::UnexpectedMessage {
                        role,
                        iteration,
                        got: other.kind(),
                    });
                }
            }
        }

        self.solver.shutdown().await?;
        info!(role:% = role, iteration = iteration; "stage finished");
        endpoint.disconnect().await
    }
}
