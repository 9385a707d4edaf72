//! Length-prefixed framing shared by the coordinator, the stages and external solvers.
//!
//! Every frame is a big endian `u64` byte length followed by the encoded message.

mod align;
mod codec;
pub mod msg;
mod receiver;
mod sender;
pub mod specs;

use std::io;

use tokio::io::{AsyncRead, AsyncWrite};

pub use align::Align8;
pub use codec::{Deserialize, Serialize};
pub use receiver::OnoReceiver;
pub use sender::OnoSender;

type LenType = u64;
const LEN_TYPE_SIZE: usize = size_of::<LenType>();

/// The largest frame either end accepts by default, in bytes.
///
/// Far above any spectrum a solver produces, low enough that a corrupted
/// length prefix fails fast instead of allocating.
pub const MAX_FRAME_LEN: usize = 1 << 30;

/// Creates both `OnoReceiver` and `OnoSender` channel parts.
///
/// The halves can come from a socket, an in-memory duplex or a child
/// process' pipes.
///
/// # Arguments
/// * `rx` - An async readable.
/// * `tx` - An async writable.
pub fn channel<R, W>(rx: R, tx: W) -> (OnoReceiver<R>, OnoSender<W>)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    (OnoReceiver::new(rx), OnoSender::new(tx))
}

fn frame_too_large(len: usize, max: usize, kind: io::ErrorKind) -> io::Error {
    io::Error::new(
        kind,
        format!("frame of {len} bytes exceeds the {max} bytes limit"),
    )
}
