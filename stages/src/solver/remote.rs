use std::borrow::Cow;

use comms::{
    OnoReceiver, OnoSender,
    msg::{Command, Msg, Payload},
    specs::{AuxScalars, PipelineSizes},
};
use log::{debug, warn};
use tokio::io::{AsyncRead, AsyncWrite};

use super::SpectrumSolver;
use crate::{Result, Role, StageErr};

/// A solver reached over a framed byte stream.
///
/// The far side is expected to speak the protocol implemented by `serve`.
pub struct RemoteSolver<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    rx: OnoReceiver<R>,
    tx: OnoSender<W>,
    buf: Vec<f64>,
    iteration: usize,
}

impl<R, W> RemoteSolver<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(rx: R, tx: W) -> Self {
        let (rx, tx) = comms::channel(rx, tx);
        Self {
            rx,
            tx,
            buf: Vec::new(),
            iteration: 0,
        }
    }
}

fn unexpected(iteration: usize, got: &'static str) -> StageErr {
    StageErr::UnexpectedMessage {
        role: Role::Solver,
        iteration,
        got,
    }
}

impl<R, W> SpectrumSolver for RemoteSolver<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn wavenumbers(&mut self) -> Result<Vec<f64>> {
        self.tx.send(&Msg::Control(Command::Connect)).await?;

        match self.rx.recv_into(&mut self.buf).await? {
            Msg::Data(Payload::Wavenumbers(wn)) => Ok(wn.to_vec()),
            Msg::Err(detail) => Err(StageErr::Solver(detail.into_owned())),
            other => Err(unexpected(self.iteration, other.kind())),
        }
    }

    async fn configure(&mut self, sizes: &PipelineSizes) -> Result<()> {
        self.tx.send(&Msg::Control(Command::Sizes(*sizes))).await?;

        match self.rx.recv_into(&mut self.buf).await? {
            Msg::Control(Command::Ready) => Ok(()),
            Msg::Err(detail) => Err(StageErr::Solver(detail.into_owned())),
            other => Err(unexpected(self.iteration, other.kind())),
        }
    }

    async fn set_auxiliary(&mut self, aux: &AuxScalars) -> Result<()> {
        self.tx.send(&Msg::Control(Command::Auxiliary(*aux))).await?;
        Ok(())
    }

    async fn solve(&mut self, profile: &[f64], spectrum: &mut [f64]) -> Result<()> {
        self.tx.send(&Msg::Data(Payload::Profile(profile))).await?;

        let result = match self.rx.recv_into(&mut self.buf).await? {
            Msg::Data(Payload::Spectrum(values)) if values.len() == spectrum.len() => {
                spectrum.copy_from_slice(values);
                Ok(())
            }
            Msg::Data(Payload::Spectrum(values)) => Err(StageErr::LengthMismatch {
                role: Role::Solver,
                what: "spectrum",
                iteration: self.iteration,
                got: values.len(),
                expected: spectrum.len(),
            }),
            Msg::Err(detail) => Err(StageErr::Solver(detail.into_owned())),
            other => Err(unexpected(self.iteration, other.kind())),
        };

        self.iteration += 1;
        result
    }

    async fn shutdown(&mut self) -> Result<()> {
        self.tx.send(&Msg::Control(Command::Disconnect)).await?;
        while !matches!(
            self.rx.recv_into(&mut self.buf).await?,
            Msg::Control(Command::Disconnect)
        ) {}

        debug!(iterations = self.iteration; "remote solver disconnected");
        Ok(())
    }
}

/// Serves `solver` to a `RemoteSolver` on the other end of `rx` and `tx`.
///
/// Returns once the client disconnects.
///
/// # Errors
/// Returns `StageErr` on I/O failures, unexpected messages or solver failures,
/// which are also reported to the client before returning.
pub async fn serve<S, R, W>(mut solver: S, rx: R, tx: W) -> Result<()>
where
    S: SpectrumSolver,
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    let (mut rx, mut tx) = comms::channel(rx, tx);
    let mut buf: Vec<f64> = Vec::new();
    let mut spectrum = Vec::new();
    let mut iteration = 0;

    loop {
        let result = match rx.recv_into(&mut buf).await? {
            Msg::Control(Command::Connect) => match solver.wavenumbers().await {
                Ok(wn) => {
                    tx.send(&Msg::Data(Payload::Wavenumbers(&wn))).await?;
                    Ok(())
                }
                Err(e) => Err(e),
            },
            Msg::Control(Command::Sizes(sizes)) => match solver.configure(&sizes).await {
                Ok(()) => {
                    spectrum.resize(sizes.nwave, 0.0);
                    tx.send(&Msg::Control(Command::Ready)).await?;
                    Ok(())
                }
                Err(e) => Err(e),
            },
            Msg::Control(Command::Auxiliary(aux)) => solver.set_auxiliary(&aux).await,
            Msg::Data(Payload::Profile(profile)) => match solver.solve(profile, &mut spectrum).await {
                Ok(()) => {
                    tx.send(&Msg::Data(Payload::Spectrum(&spectrum))).await?;
                    iteration += 1;
                    Ok(())
                }
                Err(e) => Err(e),
            },
            Msg::Control(Command::Disconnect) => {
                solver.shutdown().await?;
                tx.send(&Msg::Control(Command::Disconnect)).await?;
                debug!(iterations = iteration; "solver client disconnected");
                return Ok(());
            }
            other => Err(unexpected(iteration, other.kind())),
        };

        if let Err(e) = result {
            warn!(iteration = iteration; "solver failed: {e}");
            let detail = e.to_string();
            tx.send(&Msg::Err(Cow::Borrowed(detail.as_str()))).await?;
            return Err(e);
        }
    }
}
