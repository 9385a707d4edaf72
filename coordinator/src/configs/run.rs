use std::{num::NonZeroUsize, path::Path};

use serde::{Deserialize, Serialize};

use crate::{PipelineError, Result};

/// Everything a run needs, loaded once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    pub atmosphere: AtmosphereConfig,
    pub fit: FitConfig,
    pub observation: ObservationConfig,
    pub filters: Vec<FilterConfig>,
    /// The external solver, not needed when the solver is hosted in-process.
    #[serde(default)]
    pub solver: Option<SolverConfig>,
    pub niter: NonZeroUsize,
}

impl RunConfig {
    /// Loads a `RunConfig` from a JSON file.
    ///
    /// # Errors
    /// Returns `InvalidConfig` if the file cannot be read or parsed.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::InvalidConfig(format!("cannot read '{}': {e}", path.display()))
        })?;

        content.parse()
    }
}

impl std::str::FromStr for RunConfig {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(|e| PipelineError::InvalidConfig(format!("invalid JSON: {e}")))
    }
}

/// The reference atmosphere.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AtmosphereConfig {
    /// Layer pressures in bar, strictly monotonic.
    pub pressure: Vec<f64>,
    pub species: Vec<String>,
    /// Reference mole fractions, one row per layer and one column per species.
    pub abundances: Vec<Vec<f64>>,
}

/// What the sampler fits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FitConfig {
    pub pt_model: PtModelConfig,
    /// Species whose abundance profile gets a log10 scale factor.
    #[serde(default)]
    pub molecules: Vec<String>,
    #[serde(default)]
    pub radius: bool,
    #[serde(default)]
    pub cloud_top: bool,
    #[serde(default)]
    pub scattering: bool,
    #[serde(default = "default_t_min")]
    pub t_min: f64,
    #[serde(default = "default_t_max")]
    pub t_max: f64,
}

fn default_t_min() -> f64 {
    400.0
}

fn default_t_max() -> f64 {
    3000.0
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PtModelConfig {
    Isothermal,
    NonInverted,
    Inverted,
    FluxBalance {
        /// Stellar radius in meters.
        r_star: f64,
        t_star: f64,
        /// Semi-major axis in meters.
        sma: f64,
        /// Surface gravity in cm s-2.
        gravity: f64,
        /// Internal temperature, estimated from the irradiation when absent.
        #[serde(default)]
        t_int: Option<f64>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ObservationConfig {
    Transit,
    Eclipse {
        /// Planet to star radius ratio.
        rprs: f64,
        star: StarConfig,
    },
}

/// The stellar flux over wavenumber, in cm-1.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StarConfig {
    pub wavenumber: Vec<f64>,
    pub flux: Vec<f64>,
}

/// A filter transmission curve, over wavenumber in cm-1 or wavelength in microns.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterConfig {
    Wavenumber {
        wavenumber: Vec<f64>,
        transmission: Vec<f64>,
    },
    Wavelength {
        wavelength_um: Vec<f64>,
        transmission: Vec<f64>,
    },
}

/// How to start the external spectrum solver.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SolverConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Seconds to wait for a spectrum before failing the run, forever when absent.
    #[serde(default)]
    pub timeout_secs: Option<f64>,
}
