use std::io;

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::{LEN_TYPE_SIZE, LenType, MAX_FRAME_LEN, Serialize, frame_too_large};

/// The sending end handle of the communication.
pub struct OnoSender<W>
where
    W: AsyncWrite + Unpin,
{
    tx: W,
    /// Length prefix followed by the owned part of the frame being sent.
    head: Vec<u8>,
}

impl<W: AsyncWrite + Unpin> OnoSender<W> {
    pub(super) fn new(tx: W) -> Self {
        Self {
            tx,
            head: Vec::new(),
        }
    }

    /// Frames `msg` and writes it out, flushing the writer.
    ///
    /// The borrowed tail of the message, if any, is written straight from
    /// `msg` without being copied.
    ///
    /// # Errors
    /// `InvalidInput` if the frame exceeds the frame limit, or any error
    /// raised by the writer.
    pub async fn send<'a, T: Serialize<'a>>(&mut self, msg: &'a T) -> io::Result<()> {
        self.head.clear();
        self.head.extend_from_slice(&[0; LEN_TYPE_SIZE]);

        let tail = msg.serialize(&mut self.head)?.unwrap_or_default();
        let len = self.head.len() - LEN_TYPE_SIZE + tail.len();
        if len > MAX_FRAME_LEN {
            return Err(frame_too_large(len, MAX_FRAME_LEN, io::ErrorKind::InvalidInput));
        }

        self.head[..LEN_TYPE_SIZE].copy_from_slice(&(len as LenType).to_be_bytes());
        self.tx.write_all(&self.head).await?;

        if !tail.is_empty() {
            self.tx.write_all(tail).await?;
        }

        self.tx.flush().await
    }
}
