//! Configuration payloads exchanged in `Control` messages.

use serde::{Deserialize, Serialize};

/// The sizes every stage agrees upon during the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSizes {
    pub nlayers: usize,
    pub nspecies: usize,
    pub nwave: usize,
    pub nbands: usize,
    pub niter: usize,
    pub nfree: usize,
}

impl PipelineSizes {
    /// The length of a flattened profile: a temperature row plus one row per species.
    pub fn nprofile(&self) -> usize {
        (self.nspecies + 1) * self.nlayers
    }
}

/// Scalars forwarded to the spectrum solver before each profile.
///
/// Only the entries the parameter layout carries are set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AuxScalars {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_top: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scattering: Option<f64>,
}

impl AuxScalars {
    pub fn is_empty(&self) -> bool {
        self.radius.is_none() && self.cloud_top.is_none() && self.scattering.is_none()
    }
}
