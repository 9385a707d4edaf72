use std::{fmt, io, time::Duration};

use atmosphere::AtmosphereErr;
use stages::Role;

/// The coordinator's result type.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// All errors that can occur while driving a pipeline.
#[derive(Debug)]
pub enum PipelineError {
    /// Invalid configuration, caught before any stage starts.
    InvalidConfig(String),
    /// A stage reported a size that is zero or disagrees with its peers.
    HandshakeMismatch { role: Role, detail: String },
    /// A stage refused the negotiated sizes.
    HandshakeFailed { role: Role, detail: String },
    /// A stage stopped with an error after the handshake.
    StageFailed { role: Role, detail: String },
    /// A stage answered with a message the protocol does not allow there.
    Protocol { role: Role, detail: String },
    /// The parameter vector does not match the layout, the pipeline keeps going.
    ParameterCount { got: usize, expected: usize },
    /// The solver did not answer within the configured timeout.
    SolverStalled { timeout: Duration },
    /// The pipeline no longer serves evaluations.
    Terminated,
    /// The handshake has not completed yet.
    NotReady,
    Io(io::Error),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            Self::HandshakeMismatch { role, detail } => {
                write!(f, "handshake mismatch in {role} stage: {detail}")
            }
            Self::HandshakeFailed { role, detail } => {
                write!(f, "handshake failed in {role} stage: {detail}")
            }
            Self::StageFailed { role, detail } => write!(f, "{role} stage failed: {detail}"),
            Self::Protocol { role, detail } => {
                write!(f, "protocol violation by {role} stage: {detail}")
            }
            Self::ParameterCount { got, expected } => {
                write!(f, "expected {expected} parameters, got {got}")
            }
            Self::SolverStalled { timeout } => {
                write!(f, "spectrum solver did not answer within {timeout:?}")
            }
            Self::Terminated => write!(f, "pipeline is terminated"),
            Self::NotReady => write!(f, "pipeline handshake has not completed"),
            Self::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for PipelineError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<AtmosphereErr> for PipelineError {
    fn from(e: AtmosphereErr) -> Self {
        Self::InvalidConfig(e.to_string())
    }
}
