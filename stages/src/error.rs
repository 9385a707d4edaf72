use std::{error::Error, fmt, io};

use atmosphere::AtmosphereErr;

use crate::Role;

/// The stages module's result type.
pub type Result<T> = std::result::Result<T, StageErr>;

/// Stage runtime failures.
#[derive(Debug)]
pub enum StageErr {
    Io(io::Error),
    UnexpectedMessage {
        role: Role,
        iteration: usize,
        got: &'static str,
    },
    LengthMismatch {
        role: Role,
        what: &'static str,
        iteration: usize,
        got: usize,
        expected: usize,
    },
    BudgetExceeded {
        role: Role,
        niter: usize,
    },
    Handshake {
        role: Role,
        detail: String,
    },
    Solver(String),
    Atmosphere(AtmosphereErr),
}

impl fmt::Display for StageErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageErr::Io(e) => write!(f, "io error: {e}"),
            StageErr::UnexpectedMessage {
                role,
                iteration,
                got,
            } => write!(
                f,
                "{role} stage got an unexpected message at iteration {iteration}: {got}"
            ),
            StageErr::LengthMismatch {
                role,
                what,
                iteration,
                got,
                expected,
            } => write!(
                f,
                "{role} stage {what} length mismatch at iteration {iteration}: got {got}, expected {expected}"
            ),
            StageErr::BudgetExceeded { role, niter } => {
                write!(f, "{role} stage was asked for more than {niter} iterations")
            }
            StageErr::Handshake { role, detail } => {
                write!(f, "{role} stage refused the handshake: {detail}")
            }
            StageErr::Solver(detail) => write!(f, "spectrum solver failed: {detail}"),
            StageErr::Atmosphere(e) => write!(f, "{e}"),
        }
    }
}

impl Error for StageErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            StageErr::Io(e) => Some(e),
            StageErr::Atmosphere(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for StageErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<AtmosphereErr> for StageErr {
    fn from(value: AtmosphereErr) -> Self {
        Self::Atmosphere(value)
    }
}
