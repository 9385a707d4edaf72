use std::{borrow::Cow, io};

use crate::{
    Deserialize, Serialize,
    specs::{AuxScalars, PipelineSizes},
};

// Eight bytes keep the numeric payload that follows aligned for `f64`.
type Header = u64;
const HEADER_SIZE: usize = size_of::<Header>();

/// The payload data for the `Data` variant of the `Msg` enum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Payload<'a> {
    /// A full parameter vector for one iteration.
    Params(&'a [f64]),
    /// Temperature row followed by one abundance row per species, layer major.
    Profile(&'a [f64]),
    /// The solver's wavenumber grid, sent once during the handshake.
    Wavenumbers(&'a [f64]),
    /// One spectrum value per wavenumber.
    Spectrum(&'a [f64]),
    /// One band-integrated value per filter.
    Bands(&'a [f64]),
}

impl<'a> Payload<'a> {
    pub fn values(&self) -> &'a [f64] {
        match *self {
            Payload::Params(v)
            | Payload::Profile(v)
            | Payload::Wavenumbers(v)
            | Payload::Spectrum(v)
            | Payload::Bands(v) => v,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Params(_) => "params",
            Payload::Profile(_) => "profile",
            Payload::Wavenumbers(_) => "wavenumbers",
            Payload::Spectrum(_) => "spectrum",
            Payload::Bands(_) => "bands",
        }
    }
}

/// The command for the `Control` variant of the `Msg` enum.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    Connect,
    ReportLayers { nlayers: usize, nspecies: usize },
    ReportWavenumbers { nwave: usize },
    ReportBands { nbands: usize },
    Sizes(PipelineSizes),
    Ready,
    Auxiliary(AuxScalars),
    Reject { reason: String },
    Disconnect,
}

/// The application layer message for the entire system.
#[derive(Debug, Clone, PartialEq)]
pub enum Msg<'a> {
    Control(Command),
    Data(Payload<'a>),
    Err(Cow<'a, str>),
}

impl Msg<'_> {
    /// A short name for the message, used in logs and protocol errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Msg::Control(cmd) => match cmd {
                Command::Connect => "connect",
                Command::ReportLayers { .. } => "report_layers",
                Command::ReportWavenumbers { .. } => "report_wavenumbers",
                Command::ReportBands { .. } => "report_bands",
                Command::Sizes(_) => "sizes",
                Command::Ready => "ready",
                Command::Auxiliary(_) => "auxiliary",
                Command::Reject { .. } => "reject",
                Command::Disconnect => "disconnect",
            },
            Msg::Data(payload) => payload.kind(),
            Msg::Err(_) => "err",
        }
    }

    fn buf_is_too_small<T>(size: usize) -> io::Result<T> {
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("The given buffer is too small {size}, must at least be {HEADER_SIZE} bytes"),
        ))
    }

    fn invalid_kind_byte<T>(byte: Header) -> io::Result<T> {
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Received an invalid kind byte {byte}"),
        ))
    }
}

impl<'a> Serialize<'a> for Msg<'a> {
    fn serialize(&'a self, buf: &mut Vec<u8>) -> io::Result<Option<&'a [u8]>> {
        match self {
            Msg::Err(e) => {
                buf.extend_from_slice(&(0 as Header).to_be_bytes());
                Ok(Some(e.as_bytes()))
            }
            Msg::Control(cmd) => {
                buf.extend_from_slice(&(1 as Header).to_be_bytes());
                serde_json::to_writer(buf, cmd)?;
                Ok(None)
            }
            Msg::Data(payload) => {
                let kind: Header = match payload {
                    Payload::Params(_) => 2,
                    Payload::Profile(_) => 3,
                    Payload::Wavenumbers(_) => 4,
                    Payload::Spectrum(_) => 5,
                    Payload::Bands(_) => 6,
                };

                buf.extend_from_slice(&kind.to_be_bytes());
                Ok(Some(bytemuck::cast_slice(payload.values())))
            }
        }
    }
}

impl<'a> Deserialize<'a> for Msg<'a> {
    fn deserialize(buf: &'a [u8]) -> io::Result<Self> {
        let Some((kind_buf, rest)) = buf.split_first_chunk::<HEADER_SIZE>() else {
            return Self::buf_is_too_small(buf.len());
        };

        let kind = Header::from_be_bytes(*kind_buf);

        match kind {
            0 => {
                let string = str::from_utf8(rest)
                    .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;

                Ok(Self::Err(Cow::Borrowed(string)))
            }
            1 => {
                let cmd = serde_json::from_slice(rest)?;
                Ok(Self::Control(cmd))
            }
            2..=6 => {
                let nums: &[f64] = bytemuck::try_cast_slice(rest)
                    .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, format!("{err:?}")))?;

                let payload = match kind {
                    2 => Payload::Params(nums),
                    3 => Payload::Profile(nums),
                    4 => Payload::Wavenumbers(nums),
                    5 => Payload::Spectrum(nums),
                    _ => Payload::Bands(nums),
                };

                Ok(Self::Data(payload))
            }
            byte => Self::invalid_kind_byte(byte),
        }
    }
}
