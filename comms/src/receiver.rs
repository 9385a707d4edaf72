use std::io;

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::{Align8, Deserialize, LEN_TYPE_SIZE, LenType, MAX_FRAME_LEN, frame_too_large};

/// The receiving end handle of the communication.
pub struct OnoReceiver<R: AsyncRead + Unpin> {
    rx: R,
    max_frame: usize,
}

impl<R: AsyncRead + Unpin> OnoReceiver<R> {
    pub(super) fn new(rx: R) -> Self {
        Self {
            rx,
            max_frame: MAX_FRAME_LEN,
        }
    }

    /// Lowers or raises the largest frame this receiver accepts.
    pub fn with_max_frame(mut self, max_frame: usize) -> Self {
        self.max_frame = max_frame;
        self
    }

    /// Waits for the next frame and decodes it from `buf`.
    ///
    /// # Arguments
    /// * `buf` - Storage for the frame, grown as needed. The returned `T`
    ///           borrows from it, and its element type keeps numeric payloads
    ///           aligned.
    ///
    /// # Errors
    /// `UnexpectedEof` if the peer closed the stream, `InvalidData` if the
    /// length prefix exceeds the frame limit or the frame does not decode.
    pub async fn recv_into<'buf, T, B>(&mut self, buf: &'buf mut Vec<B>) -> io::Result<T>
    where
        T: Deserialize<'buf>,
        B: Align8,
    {
        let mut prefix = [0; LEN_TYPE_SIZE];
        self.rx.read_exact(&mut prefix).await?;

        let len = usize::try_from(LenType::from_be_bytes(prefix))
            .ok()
            .filter(|&len| len <= self.max_frame)
            .ok_or_else(|| {
                let len = LenType::from_be_bytes(prefix) as usize;
                frame_too_large(len, self.max_frame, io::ErrorKind::InvalidData)
            })?;

        buf.resize(len.div_ceil(size_of::<B>()), B::zeroed());

        let bytes = &mut bytemuck::cast_slice_mut::<B, u8>(buf.as_mut_slice())[..len];
        self.rx.read_exact(bytes).await?;

        T::deserialize(bytes)
    }
}
