use std::process::Stdio;

use comms::specs::{AuxScalars, PipelineSizes};
use log::{info, warn};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use super::{RemoteSolver, SpectrumSolver};
use crate::{Result, StageErr};

/// An external solver program talking the remote protocol over its stdio.
pub struct ProcessSolver {
    child: Child,
    remote: RemoteSolver<ChildStdout, ChildStdin>,
}

impl ProcessSolver {
    /// Spawns `program` with piped stdin and stdout, stderr is inherited.
    ///
    /// The child is killed if the solver is dropped before `shutdown`.
    pub fn spawn(program: &str, args: &[String]) -> Result<Self> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| StageErr::Solver(format!("{program} has no piped stdin")))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| StageErr::Solver(format!("{program} has no piped stdout")))?;

        info!(program = program, pid = child.id().unwrap_or_default(); "solver process spawned");

        Ok(Self {
            child,
            remote: RemoteSolver::new(stdout, stdin),
        })
    }
}

impl SpectrumSolver for ProcessSolver {
    async fn wavenumbers(&mut self) -> Result<Vec<f64>> {
        self.remote.wavenumbers().await
    }

    async fn configure(&mut self, sizes: &PipelineSizes) -> Result<()> {
        self.remote.configure(sizes).await
    }

    async fn set_auxiliary(&mut self, aux: &AuxScalars) -> Result<()> {
        self.remote.set_auxiliary(aux).await
    }

    async fn solve(&mut self, profile: &[f64], spectrum: &mut [f64]) -> Result<()> {
        self.remote.solve(profile, spectrum).await
    }

    async fn shutdown(&mut self) -> Result<()> {
        self.remote.shutdown().await?;

        let status = self.child.wait().await?;
        if status.success() {
            info!("solver process exited");
        } else {
            warn!("solver process exited with {status}");
        }

        Ok(())
    }
}
