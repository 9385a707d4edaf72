pub mod bands;
pub mod error;
mod layout;
pub mod profile;
pub mod special;

pub use bands::{BandIntegrator, Bandpasses, FilterCurve, Observation, StellarSpectrum};
pub use error::{AtmosphereErr, Result};
pub use layout::ParamLayout;
pub use profile::{
    InternalTemperature, LayerGrid, ProfileGenerator, PtModel, Rejection, StellarContext,
    TemperatureBounds,
};
