use atmosphere::ProfileGenerator;
use comms::msg::{Command, Msg, Payload};
use log::{debug, info};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::{
    Endpoint, Result, Role, StageErr,
    endpoint::Event,
};

/// Turns parameter vectors into flattened layer profiles.
pub struct ProfileStage {
    generator: ProfileGenerator,
}

impl ProfileStage {
    pub fn new(generator: ProfileGenerator) -> Self {
        Self { generator }
    }

    /// Runs the stage until the coordinator disconnects.
    ///
    /// # Arguments
    /// * `endpoint` - The stage side of the link to the coordinator.
    ///
    /// # Errors
    /// Returns `StageErr` on I/O failures, a refused handshake or protocol violations.
    pub async fn run<R, W>(self, mut endpoint: Endpoint<R, W>) -> Result<()>
    where
        R: AsyncRead + Unpin + Send,
        W: AsyncWrite + Unpin + Send,
    {
        let role = Role::Profile;
        let mut data_buf = Vec::new();
        let mut control_buf = Vec::new();

        let nlayers = self.generator.nlayers();
        let nspecies = self.generator.nspecies();
        let nfree = self.generator.layout().nfree();

        let msg = Msg::Control(Command::ReportLayers { nlayers, nspecies });
        endpoint.data_tx.send(&msg).await?;

        let sizes = endpoint.recv_sizes(role, &mut data_buf).await?;

        if sizes.nfree != nfree {
            let detail = format!(
                "the parameter layout has {nfree} free parameters, the sampler provides {}",
                sizes.nfree
            );
            return Err(endpoint.refuse(role, detail).await);
        }

        if (sizes.nlayers, sizes.nspecies) != (nlayers, nspecies) {
            let detail = format!(
                "negotiated {} layers and {} species, the reference atmosphere has {nlayers} and {nspecies}",
                sizes.nlayers, sizes.nspecies
            );
            return Err(endpoint.refuse(role, detail).await);
        }

        endpoint.ready().await?;
        info!(role:% = role, nlayers = nlayers, nspecies = nspecies, nfree = nfree; "stage ready");

        let mut grid = self.generator.grid();
        let mut iteration = 0;

        loop {
            let event = endpoint
                .next_event(role, iteration, &mut data_buf, &mut control_buf)
                .await?;

            let params = match event {
                Event::Disconnect => break,
                Event::Data(Msg::Data(Payload::Params(params))) => params,
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

            if params.len() != nfree {
                return Err(StageErr::LengthMismatch {
                    role,
                    what: "parameter vector",
                    iteration,
                    got: params.len(),
                    expected: nfree,
                });
            }

            match self.generator.generate(params, &mut grid) {
                Ok(()) => {
                    let msg = Msg::Data(Payload::Profile(grid.as_flat()));
                    endpoint.data_tx.send(&msg).await?;
                }
                Err(rejection) => {
                    debug!(iteration = iteration; "rejected: {rejection}");
                    let msg = Msg::Control(Command::Reject {
                        reason: rejection.to_string(),
                    });
                    endpoint.data_tx.send(&msg).await?;
                }
            }

            iteration += 1;
        }

        info!(role:% = role, iteration = iteration; "stage finished");
        endpoint.disconnect().await
    }
}
