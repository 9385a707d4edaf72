use std::{num::NonZeroUsize, time::Duration};

use atmosphere::{Bandpasses, ParamLayout, ProfileGenerator};
use comms::{
    msg::{Command, Msg, Payload},
    specs::{AuxScalars, PipelineSizes},
};
use futures::future;
use log::{debug, error, info, warn};
use stages::{
    BandStage, Endpoint, ProfileStage, Role, SolverStage, SpectrumSolver, in_process,
};
use tokio::{
    io::{self, AsyncRead, AsyncWrite, DuplexStream, ReadHalf, WriteHalf},
    task::JoinSet,
};

use crate::{PipelineError, Result};

// Bytes buffered by each in-memory pipe, enough for a full spectrum frame.
const LINK_CAPACITY: usize = 1 << 20;

/// A pipeline whose stages run as tasks of the current runtime.
pub type LocalPipeline = Pipeline<ReadHalf<DuplexStream>, WriteHalf<DuplexStream>>;

/// The lifecycle of a pipeline, it only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Uninitialized,
    Handshake,
    Ready,
    Iterating,
    Terminated,
}

/// The coordinator's side of the link to one stage.
struct StageLink<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    role: Role,
    endpoint: Endpoint<R, W>,
    buf: Vec<f64>,
}

impl<R, W> StageLink<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    fn new(role: Role, endpoint: Endpoint<R, W>) -> Self {
        Self {
            role,
            endpoint,
            buf: Vec::new(),
        }
    }

    async fn send(&mut self, msg: &Msg<'_>) -> io::Result<()> {
        self.endpoint.data_tx.send(msg).await
    }

    async fn recv(&mut self) -> io::Result<Msg<'_>> {
        self.endpoint.data_rx.recv_into(&mut self.buf).await
    }

    /// Sends `Disconnect` on the control channel and waits for the echo.
    async fn disconnect(&mut self) -> io::Result<()> {
        let msg = Msg::Control(Command::Disconnect);
        self.endpoint.control_tx.send(&msg).await?;

        while !matches!(
            self.endpoint.control_rx.recv_into(&mut self.buf).await?,
            Msg::Control(Command::Disconnect)
        ) {}

        debug!(role:% = self.role; "stage disconnected");
        Ok(())
    }
}

/// Drives the profile, solver and band stages once per parameter vector.
pub struct Pipeline<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    profile: StageLink<R, W>,
    solver: StageLink<R, W>,
    bands: StageLink<R, W>,
    layout: ParamLayout,
    niter: NonZeroUsize,
    remaining: usize,
    solver_timeout: Option<Duration>,
    sizes: Option<PipelineSizes>,
    state: PipelineState,
    tasks: JoinSet<(Role, stages::Result<()>)>,
}

/// Spawns the three stages as tasks of the current runtime and links them to a new pipeline.
///
/// Must be called from within a tokio runtime. The returned pipeline still has
/// to perform its handshake.
///
/// # Arguments
/// * `generator` - The profile generator owned by the profile stage.
/// * `solver` - The spectrum solver owned by the solver stage.
/// * `bandpasses` - The filter set owned by the band stage.
/// * `niter` - The iteration budget of the run.
/// * `solver_timeout` - How long to wait for a spectrum before giving up, if at all.
pub fn spawn_in_process<S>(
    generator: ProfileGenerator,
    solver: S,
    bandpasses: Bandpasses,
    niter: NonZeroUsize,
    solver_timeout: Option<Duration>,
) -> LocalPipeline
where
    S: SpectrumSolver + 'static,
{
    let layout = *generator.layout();
    let mut tasks = JoinSet::new();

    let (profile, stage) = in_process(LINK_CAPACITY);
    tasks.spawn(async move {
        let result = ProfileStage::new(generator).run(stage).await;
        (Role::Profile, result)
    });

    let (solver_link, stage) = in_process(LINK_CAPACITY);
    tasks.spawn(async move {
        let result = SolverStage::new(solver).run(stage).await;
        (Role::Solver, result)
    });

    let (bands, stage) = in_process(LINK_CAPACITY);
    tasks.spawn(async move {
        let result = BandStage::new(bandpasses).run(stage).await;
        (Role::Bands, result)
    });

    Pipeline::new(
        [profile, solver_link, bands],
        layout,
        niter,
        solver_timeout,
        tasks,
    )
}

impl<R, W> Pipeline<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Creates a new `Pipeline` over already running stages.
    ///
    /// # Arguments
    /// * `endpoints` - The coordinator side of the profile, solver and band links, in that order.
    /// * `layout` - The layout of the sampler's parameter vectors.
    /// * `niter` - The iteration budget of the run.
    /// * `solver_timeout` - How long to wait for a spectrum before giving up, if at all.
    /// * `tasks` - The stage tasks, joined on termination.
    pub fn new(
        endpoints: [Endpoint<R, W>; 3],
        layout: ParamLayout,
        niter: NonZeroUsize,
        solver_timeout: Option<Duration>,
        tasks: JoinSet<(Role, stages::Result<()>)>,
    ) -> Self {
        let [profile, solver, bands] = endpoints;
        Self {
            profile: StageLink::new(Role::Profile, profile),
            solver: StageLink::new(Role::Solver, solver),
            bands: StageLink::new(Role::Bands, bands),
            layout,
            niter,
            remaining: niter.get(),
            solver_timeout,
            sizes: None,
            state: PipelineState::Uninitialized,
            tasks,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// The negotiated sizes, available once the handshake succeeded.
    pub fn sizes(&self) -> Option<PipelineSizes> {
        self.sizes
    }

    /// Iterations left before the pipeline terminates on its own.
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    fn links_mut(&mut self) -> [&mut StageLink<R, W>; 3] {
        [&mut self.profile, &mut self.solver, &mut self.bands]
    }

    /// Negotiates the run sizes with every stage.
    ///
    /// Any failure is fatal: the stage tasks are aborted and the pipeline terminates.
    ///
    /// # Returns
    /// The sizes every stage agreed on.
    pub async fn handshake(&mut self) -> Result<PipelineSizes> {
        match (self.state, self.sizes) {
            (PipelineState::Uninitialized, _) => {}
            (PipelineState::Terminated, _) => return Err(PipelineError::Terminated),
            (_, Some(sizes)) => return Ok(sizes),
            (_, None) => return Err(PipelineError::NotReady),
        }

        self.state = PipelineState::Handshake;
        match self.negotiate().await {
            Ok(sizes) => {
                info!(
                    nlayers = sizes.nlayers,
                    nspecies = sizes.nspecies,
                    nwave = sizes.nwave,
                    nbands = sizes.nbands,
                    niter = sizes.niter,
                    nfree = sizes.nfree;
                    "pipeline ready"
                );

                self.sizes = Some(sizes);
                self.state = PipelineState::Ready;
                Ok(sizes)
            }
            Err(e) => Err(self.fail(e).await),
        }
    }

    async fn negotiate(&mut self) -> Result<PipelineSizes> {
        let (nlayers, nspecies) = match self.profile.recv().await? {
            Msg::Control(Command::ReportLayers { nlayers, nspecies }) => (nlayers, nspecies),
            other => return Err(refused(Role::Profile, other)),
        };

        let nwave = match self.solver.recv().await? {
            Msg::Control(Command::ReportWavenumbers { nwave }) => nwave,
            other => return Err(refused(Role::Solver, other)),
        };

        let nbands = match self.bands.recv().await? {
            Msg::Control(Command::ReportBands { nbands }) => nbands,
            other => return Err(refused(Role::Bands, other)),
        };

        let reported = [
            (Role::Profile, "nlayers", nlayers),
            (Role::Profile, "nspecies", nspecies),
            (Role::Solver, "nwave", nwave),
            (Role::Bands, "nbands", nbands),
        ];

        if let Some((role, name, _)) = reported.into_iter().find(|&(.., size)| size == 0) {
            return Err(PipelineError::HandshakeMismatch {
                role,
                detail: format!("reported {name} = 0"),
            });
        }

        let sizes = PipelineSizes {
            nlayers,
            nspecies,
            nwave,
            nbands,
            niter: self.niter.get(),
            nfree: self.layout.nfree(),
        };

        let msg = Msg::Control(Command::Sizes(sizes));
        future::try_join_all(self.links_mut().map(|link| link.send(&msg))).await?;

        match self.solver.recv().await? {
            Msg::Data(Payload::Wavenumbers(wavenumbers)) => {
                if wavenumbers.len() != nwave {
                    return Err(PipelineError::HandshakeMismatch {
                        role: Role::Solver,
                        detail: format!(
                            "sent {} wavenumbers after reporting nwave = {nwave}",
                            wavenumbers.len()
                        ),
                    });
                }

                if wavenumbers.windows(2).any(|w| w[0] >= w[1]) {
                    return Err(PipelineError::HandshakeMismatch {
                        role: Role::Solver,
                        detail: "the wavenumber grid is not strictly increasing".into(),
                    });
                }

                let msg = Msg::Data(Payload::Wavenumbers(wavenumbers));
                self.bands.send(&msg).await?;
            }
            other => return Err(refused(Role::Solver, other)),
        }

        for link in self.links_mut() {
            let role = link.role;
            match link.recv().await? {
                Msg::Control(Command::Ready) => debug!(role:% = role; "stage ready"),
                other => return Err(refused(role, other)),
            }
        }

        Ok(sizes)
    }

    /// Runs one iteration of the pipeline.
    ///
    /// # Arguments
    /// * `params` - The sampler's parameter vector, or the termination signal.
    ///
    /// # Returns
    /// The band-integrated observables, all `-1` if the profile was rejected,
    /// or `None` if `params` was the termination signal.
    pub async fn evaluate(&mut self, params: &[f64]) -> Result<Option<Vec<f64>>> {
        let signalled = params.first() == Some(&f64::INFINITY);
        let sizes = match (self.state, self.sizes) {
            (PipelineState::Terminated, _) if signalled => return Ok(None),
            (PipelineState::Terminated, _) => return Err(PipelineError::Terminated),
            (PipelineState::Ready | PipelineState::Iterating, Some(sizes)) => sizes,
            _ => return Err(PipelineError::NotReady),
        };

        if signalled {
            info!("termination signal received");
            self.terminate().await?;
            return Ok(None);
        }

        if params.len() != sizes.nfree {
            return Err(PipelineError::ParameterCount {
                got: params.len(),
                expected: sizes.nfree,
            });
        }

        self.state = PipelineState::Iterating;
        let observables = match self.iterate(params, &sizes).await {
            Ok(observables) => observables,
            Err(e) => return Err(self.fail(e).await),
        };

        self.remaining -= 1;
        if self.remaining == 0 {
            info!(niter = self.niter.get(); "iteration budget exhausted");
            self.terminate().await?;
        }

        Ok(Some(observables))
    }

    async fn iterate(&mut self, params: &[f64], sizes: &PipelineSizes) -> Result<Vec<f64>> {
        let iteration = self.niter.get() - self.remaining;

        self.profile.send(&Msg::Data(Payload::Params(params))).await?;
        match self.profile.recv().await? {
            Msg::Data(Payload::Profile(profile)) if profile.len() == sizes.nprofile() => {
                if self.layout.has_auxiliary() {
                    let aux = auxiliary(&self.layout, params);
                    self.solver.send(&Msg::Control(Command::Auxiliary(aux))).await?;
                }

                self.solver.send(&Msg::Data(Payload::Profile(profile))).await?;
            }
            Msg::Control(Command::Reject { reason }) => {
                debug!(iteration = iteration; "profile rejected: {reason}");
                return Ok(vec![-1.0; sizes.nbands]);
            }
            other => return Err(unexpected(Role::Profile, other)),
        }

        let reply = match self.solver_timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.solver.recv())
                .await
                .map_err(|_| PipelineError::SolverStalled { timeout })??,
            None => self.solver.recv().await?,
        };

        match reply {
            Msg::Data(Payload::Spectrum(spectrum)) if spectrum.len() == sizes.nwave => {
                self.bands.send(&Msg::Data(Payload::Spectrum(spectrum))).await?;
            }
            other => return Err(unexpected(Role::Solver, other)),
        }

        match self.bands.recv().await? {
            Msg::Data(Payload::Bands(bands)) if bands.len() == sizes.nbands => {
                debug!(iteration = iteration; "iteration completed");
                Ok(bands.to_vec())
            }
            other => Err(unexpected(Role::Bands, other)),
        }
    }

    /// Disconnects every stage and waits for their tasks to finish.
    ///
    /// Before the handshake completed the stages cannot observe a disconnect,
    /// so they are aborted instead. Terminating twice is a no-op.
    pub async fn terminate(&mut self) -> Result<()> {
        match self.state {
            PipelineState::Terminated => return Ok(()),
            PipelineState::Ready | PipelineState::Iterating => {}
            PipelineState::Uninitialized | PipelineState::Handshake => {
                self.state = PipelineState::Terminated;
                self.tasks.abort_all();
                return self.join().await;
            }
        }

        self.state = PipelineState::Terminated;
        if let Err(e) = future::try_join_all(self.links_mut().map(StageLink::disconnect)).await {
            return Err(self.fail(e.into()).await);
        }

        self.join().await?;
        info!(remaining = self.remaining; "pipeline terminated");
        Ok(())
    }

    /// Aborts every stage after a fatal error.
    ///
    /// # Returns
    /// The error to report, the failure of a stage when `err` was only the
    /// broken link it left behind.
    async fn fail(&mut self, err: PipelineError) -> PipelineError {
        self.state = PipelineState::Terminated;
        self.tasks.abort_all();

        let cause = self.join().await.err();
        let err = match (err, cause) {
            (PipelineError::Io(_), Some(cause)) => cause,
            (err, _) => err,
        };

        error!("pipeline failed: {err}");
        err
    }

    /// Joins every stage task.
    ///
    /// # Returns
    /// The first stage failure, if any.
    async fn join(&mut self) -> Result<()> {
        let mut failure = None;

        while let Some(joined) = self.tasks.join_next().await {
            match joined {
                Ok((_, Ok(()))) => {}
                Ok((role, Err(e))) => {
                    warn!(role:% = role; "stage finished with an error: {e}");
                    failure.get_or_insert(PipelineError::StageFailed {
                        role,
                        detail: e.to_string(),
                    });
                }
                Err(e) if e.is_cancelled() => {}
                Err(e) => {
                    failure.get_or_insert(PipelineError::Io(e.into()));
                }
            }
        }

        failure.map_or(Ok(()), Err)
    }
}

fn auxiliary(layout: &ParamLayout, params: &[f64]) -> AuxScalars {
    AuxScalars {
        radius: layout.radius(params),
        cloud_top: layout.cloud_top(params),
        scattering: layout.scattering(params),
    }
}

/// Maps a stage's answer during the handshake to the error it stands for.
fn refused(role: Role, msg: Msg<'_>) -> PipelineError {
    match msg {
        Msg::Err(detail) => PipelineError::HandshakeFailed {
            role,
            detail: detail.into_owned(),
        },
        other => unexpected(role, other),
    }
}

fn unexpected(role: Role, msg: Msg<'_>) -> PipelineError {
    match msg {
        Msg::Err(detail) => PipelineError::StageFailed {
            role,
            detail: detail.into_owned(),
        },
        Msg::Data(payload) => PipelineError::Protocol {
            role,
            detail: format!(
                "unexpected {} payload of length {}",
                payload.kind(),
                payload.values().len()
            ),
        },
        other => PipelineError::Protocol {
            role,
            detail: format!("unexpected {} message", other.kind()),
        },
    }
}
