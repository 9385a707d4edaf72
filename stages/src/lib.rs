mod bands;
mod endpoint;
pub mod error;
mod profile;
pub mod solver;

use std::fmt;

pub use bands::BandStage;
pub use endpoint::{DuplexEndpoint, Endpoint, in_process};
pub use error::{Result, StageErr};
pub use profile::ProfileStage;
pub use solver::{ProcessSolver, RemoteSolver, SolverStage, SpectrumSolver};

/// The three persistent roles of a pipeline, in iteration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Profile,
    Solver,
    Bands,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Profile => "profile",
            Role::Solver => "solver",
            Role::Bands => "bands",
        };

        write!(f, "{name}")
    }
}
