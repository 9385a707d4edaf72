mod adapter;
mod run;

pub(super) use adapter::{Adapter, RunSpec};
pub use run::{
    AtmosphereConfig, FilterConfig, FitConfig, ObservationConfig, PtModelConfig, RunConfig,
    SolverConfig, StarConfig,
};
