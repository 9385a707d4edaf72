use std::borrow::Cow;

use comms::{
    OnoReceiver, OnoSender,
    msg::{Command, Msg},
    specs::PipelineSizes,
};
use tokio::io::{self, AsyncRead, AsyncWrite, DuplexStream, ReadHalf, WriteHalf};

use crate::{Result, Role, StageErr};

/// One side of the link between the coordinator and a stage.
///
/// Handshake and iteration traffic travels over the data channel. The
/// control channel only carries `Disconnect` and its echo.
pub struct Endpoint<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub data_rx: OnoReceiver<R>,
    pub data_tx: OnoSender<W>,
    pub control_rx: OnoReceiver<R>,
    pub control_tx: OnoSender<W>,
}

pub type DuplexEndpoint = Endpoint<ReadHalf<DuplexStream>, WriteHalf<DuplexStream>>;

/// Creates both ends of an in-process link, the first one for the coordinator.
///
/// # Arguments
/// * `buf` - The capacity in bytes of each in-memory pipe.
pub fn in_process(buf: usize) -> (DuplexEndpoint, DuplexEndpoint) {
    let (data_a, data_b) = io::duplex(buf);
    let (control_a, control_b) = io::duplex(buf);
    (
        Endpoint::from_streams(data_a, control_a),
        Endpoint::from_streams(data_b, control_b),
    )
}

impl DuplexEndpoint {
    fn from_streams(data: DuplexStream, control: DuplexStream) -> Self {
        let (data_rx, data_tx) = io::split(data);
        let (control_rx, control_tx) = io::split(control);
        Endpoint::new(data_rx, data_tx, control_rx, control_tx)
    }
}

/// What a stage observed while waiting for work.
pub(crate) enum Event<'a> {
    Data(Msg<'a>),
    Disconnect,
}

impl<R, W> Endpoint<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(data_rx: R, data_tx: W, control_rx: R, control_tx: W) -> Self {
        let (data_rx, data_tx) = comms::channel(data_rx, data_tx);
        let (control_rx, control_tx) = comms::channel(control_rx, control_tx);
        Self {
            data_rx,
            data_tx,
            control_rx,
            control_tx,
        }
    }

    /// Waits for the next data message or a disconnect, whichever comes first.
    ///
    /// The coordinator only writes to the control channel between
    /// iterations, so the pending data read is empty when it gets dropped.
    pub(crate) async fn next_event<'a>(
        &mut self,
        role: Role,
        iteration: usize,
        data_buf: &'a mut Vec<f64>,
        control_buf: &mut Vec<f64>,
    ) -> Result<Event<'a>> {
        tokio::select! {
            biased;

            msg = self.control_rx.recv_into::<Msg, _>(control_buf) => match msg? {
                Msg::Control(Command::Disconnect) => Ok(Event::Disconnect),
                other => Err(StageErr::UnexpectedMessage { role, iteration, got: other.kind() }),
            },
            msg = self.data_rx.recv_into(data_buf) => Ok(Event::Data(msg?)),
        }
    }

    pub(crate) async fn recv_sizes(&mut self, role: Role, buf: &mut Vec<f64>) -> Result<PipelineSizes> {
        match self.data_rx.recv_into(buf).await? {
            Msg::Control(Command::Sizes(sizes)) => Ok(sizes),
            other => Err(StageErr::UnexpectedMessage {
                role,
                iteration: 0,
                got: other.kind(),
            }),
        }
    }

    /// Reports a handshake refusal to the coordinator.
    ///
    /// # Returns
    /// The error the stage finishes with.
    pub(crate) async fn refuse(&mut self, role: Role, detail: String) -> StageErr {
        if let Err(e) = self.data_tx.send(&Msg::Err(Cow::Borrowed(detail.as_str()))).await {
            return e.into();
        }

        StageErr::Handshake { role, detail }
    }

    pub(crate) async fn ready(&mut self) -> Result<()> {
        self.data_tx.send(&Msg::Control(Command::Ready)).await?;
        Ok(())
    }

    /// Echoes the coordinator's disconnect on the control channel.
    pub(crate) async fn disconnect(&mut self) -> Result<()> {
        self.control_tx
            .send(&Msg::Control(Command::Disconnect))
            .await?;
        Ok(())
    }
}
