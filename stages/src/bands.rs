use atmosphere::Bandpasses;
use comms::msg::{Command, Msg, Payload};
use log::{debug, info};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::{Endpoint, Result, Role, StageErr, endpoint::Event};

/// Reduces spectra to band-integrated observables.
pub struct BandStage {
    bandpasses: Bandpasses,
}

impl BandStage {
    pub fn new(bandpasses: Bandpasses) -> Self {
        Self { bandpasses }
    }

    /// Runs the stage until the coordinator disconnects.
    ///
    /// The filters are resampled once, when the solver's wavenumber grid is
    /// forwarded during the handshake.
    ///
    /// # Errors
    /// Returns `StageErr` on I/O failures, filters that cannot be resampled
    /// or protocol violations.
    pub async fn run<R, W>(self, mut endpoint: Endpoint<R, W>) -> Result<()>
    where
        R: AsyncRead + Unpin + Send,
        W: AsyncWrite + Unpin + Send,
    {
        let role = Role::Bands;
        let mut data_buf = Vec::new();
        let mut control_buf = Vec::new();

        let nbands = self.bandpasses.nbands();
        let msg = Msg::Control(Command::ReportBands { nbands });
        endpoint.data_tx.send(&msg).await?;

        let sizes = endpoint.recv_sizes(role, &mut data_buf).await?;

        if sizes.nbands != nbands {
            let detail = format!("negotiated {} bands, {nbands} filters are configured", sizes.nbands);
            return Err(endpoint.refuse(role, detail).await);
        }

        let prepared = match endpoint.data_rx.recv_into(&mut data_buf).await? {
            Msg::Data(Payload::Wavenumbers(specwn)) if specwn.len() == sizes.nwave => {
                self.bandpasses.prepare(specwn)
            }
            Msg::Data(Payload::Wavenumbers(specwn)) => {
                return Err(StageErr::LengthMismatch {
                    role,
                    what: "wavenumber grid",
                    iteration: 0,
                    got: specwn.len(),
                    expected: sizes.nwave,
                });
            }
            other => {
                return Err(StageErr::UnexpectedMessage {
                    role,
                    iteration: 0,
                    got: other.kind(),
                });
            }
        };

        let integrator = match prepared {
            Ok(integrator) => integrator,
            Err(e) => return Err(endpoint.refuse(role, e.to_string()).await),
        };

        endpoint.ready().await?;
        info!(role:% = role, nbands = nbands, nwave = sizes.nwave; "stage ready");

        let mut bands = vec![0.0; nbands];
        let mut iteration = 0;

        loop {
            let event = endpoint
                .next_event(role, iteration, &mut data_buf, &mut control_buf)
                .await?;

            let spectrum = match event {
                Event::Disconnect => break,
                Event::Data(Msg::Data(Payload::Spectrum(spectrum))) => spectrum,
                Event::Data(other) => {
                    return Err(StageErr::UnexpectedMessage {
                        role,
                        iteration,
                        got: other.kind(),
                    });
                }
            };

            if iteration == sizes.niter {
                return Err(StageErr::BudgetExceeded {
                    role,
                    niter: sizes.niter,
                });
            }

            if spectrum.len() != sizes.nwave {
                return Err(StageErr::LengthMismatch {
                    role,
                    what: "spectrum",
                    iteration,
                    got: spectrum.len(),
                    expected: sizes.nwave,
                });
            }

            integrator.integrate(spectrum, &mut bands)?;
            debug!(iteration = iteration; "bands integrated");
            endpoint.data_tx.send(&Msg::Data(Payload::Bands(&bands))).await?;

            iteration += 1;
        }

        info!(role:% = role, iteration = iteration; "stage finished");
        endpoint.disconnect().await
    }
}
