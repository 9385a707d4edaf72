//! Maps free parameters to a temperature and abundance profile per layer.

mod abundance;
mod pt;
mod smooth;

use std::fmt::{self, Display};

use log::debug;
use ndarray::Array2;

use crate::{
    error::{AtmosphereErr, Result},
    layout::ParamLayout,
};
use abundance::Abundances;
pub use pt::{InternalTemperature, PtModel, StellarContext};
use smooth::GaussianSmoother;

// Gaussian smoothing applied to the Madhusudhan & Seager profiles, in layers.
const SMOOTHING_SIGMA: f64 = 4.0;
const SMOOTHING_TRUNCATE: f64 = 4.0;

/// Why a parameter vector did not produce a usable profile.
///
/// A rejection is an expected per-iteration outcome, the caller answers it
/// with sentinel observables and keeps going.
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    /// A boundary temperature derived by the PT law is negative.
    NonPhysical {
        model: &'static str,
        boundary: &'static str,
        temperature: f64,
    },
    /// A layer temperature is outside the allowed bounds or not finite.
    OutOfBounds { layer: usize, temperature: f64 },
    /// The scaled species alone exceed unity at a layer, or do not sum to a number.
    NegativeFiller { layer: usize, remainder: f64 },
}

impl Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::NonPhysical {
                model,
                boundary,
                temperature,
            } => write!(
                f,
                "non-physical {model} profile, {boundary} = {temperature:.3} K"
            ),
            Rejection::OutOfBounds { layer, temperature } => {
                write!(f, "temperature {temperature:.3} K out of bounds at layer {layer}")
            }
            Rejection::NegativeFiller { layer, remainder } => {
                write!(f, "negative filler remainder {remainder:.3e} at layer {layer}")
            }
        }
    }
}

/// Inclusive range of accepted layer temperatures, in Kelvin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperatureBounds {
    pub min: f64,
    pub max: f64,
}

impl Default for TemperatureBounds {
    fn default() -> Self {
        Self {
            min: 400.0,
            max: 3000.0,
        }
    }
}

impl TemperatureBounds {
    fn contains(&self, t: f64) -> bool {
        t.is_finite() && t >= self.min && t <= self.max
    }
}

/// Per layer temperature and abundances, laid out as the solver expects them:
/// one temperature row followed by one row per species, `nlayers` values each.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerGrid {
    nlayers: usize,
    nspecies: usize,
    data: Vec<f64>,
}

impl LayerGrid {
    pub fn new(nlayers: usize, nspecies: usize) -> Self {
        Self {
            nlayers,
            nspecies,
            data: vec![0.0; (nspecies + 1) * nlayers],
        }
    }

    pub fn nlayers(&self) -> usize {
        self.nlayers
    }

    pub fn nspecies(&self) -> usize {
        self.nspecies
    }

    pub fn as_flat(&self) -> &[f64] {
        &self.data
    }

    pub fn temperature(&self) -> &[f64] {
        &self.data[..self.nlayers]
    }

    pub fn abundance(&self, species: usize) -> &[f64] {
        let start = (species + 1) * self.nlayers;
        &self.data[start..start + self.nlayers]
    }

    /// Total mole fraction at `layer`.
    pub fn layer_total(&self, layer: usize) -> f64 {
        (0..self.nspecies).map(|s| self.abundance(s)[layer]).sum()
    }

    fn split_mut(&mut self) -> (&mut [f64], &mut [f64]) {
        self.data.split_at_mut(self.nlayers)
    }
}

/// Builds a `LayerGrid` from a parameter vector.
#[derive(Debug, Clone)]
pub struct ProfileGenerator {
    pressure: Vec<f64>,
    species: Vec<String>,
    model: PtModel,
    smoother: Option<GaussianSmoother>,
    bounds: TemperatureBounds,
    layout: ParamLayout,
    abundances: Abundances,
}

impl ProfileGenerator {
    /// Creates a new `ProfileGenerator`.
    ///
    /// # Arguments
    /// * `pressure` - Layer pressures in bar, strictly monotonic.
    /// * `species` - Species names, in the order the solver expects them.
    /// * `reference` - Reference abundances, `nlayers x nspecies`.
    /// * `model` - The PT law, its arity must match the layout's PT group.
    /// * `molfit` - Names of the fitted molecules, in parameter order.
    /// * `bounds` - Accepted layer temperature range.
    /// * `layout` - The parameter vector layout.
    ///
    /// # Returns
    /// The generator or the configuration defect that prevents building it.
    pub fn new(
        pressure: Vec<f64>,
        species: Vec<String>,
        reference: Array2<f64>,
        model: PtModel,
        molfit: &[String],
        bounds: TemperatureBounds,
        layout: ParamLayout,
    ) -> Result<Self> {
        validate_pressure(&pressure)?;

        if reference.nrows() != pressure.len() {
            return Err(AtmosphereErr::SizeMismatch {
                a: "reference abundance rows",
                b: "pressure layers",
                got: reference.nrows(),
                expected: pressure.len(),
            });
        }

        if model.arity() != layout.npt() {
            return Err(AtmosphereErr::ArityMismatch {
                model: model.name(),
                got: layout.npt(),
                expected: model.arity(),
            });
        }

        if molfit.len() != layout.nmolfit() {
            return Err(AtmosphereErr::SizeMismatch {
                a: "fitted molecules",
                b: "abundance parameters",
                got: molfit.len(),
                expected: layout.nmolfit(),
            });
        }

        if let PtModel::FluxBalance(ctx) = &model {
            validate_context(ctx)?;
        }

        if !(bounds.min < bounds.max) {
            return Err(AtmosphereErr::InvalidValue {
                what: "temperature bounds",
                value: bounds.min,
            });
        }

        let abundances = Abundances::new(&species, reference, molfit)?;
        let (first, second) = abundances.fillers();
        debug!(
            model = model.name(),
            nlayers = pressure.len(),
            nspecies = species.len();
            "fillers are {} and {}", species[first], species[second]
        );
        let smoother = model
            .is_smoothed()
            .then(|| GaussianSmoother::new(SMOOTHING_SIGMA, SMOOTHING_TRUNCATE));

        Ok(Self {
            pressure,
            species,
            model,
            smoother,
            bounds,
            layout,
            abundances,
        })
    }

    pub fn nlayers(&self) -> usize {
        self.pressure.len()
    }

    pub fn nspecies(&self) -> usize {
        self.species.len()
    }

    pub fn species(&self) -> &[String] {
        &self.species
    }

    pub fn layout(&self) -> &ParamLayout {
        &self.layout
    }

    /// An empty grid with this generator's dimensions.
    pub fn grid(&self) -> LayerGrid {
        LayerGrid::new(self.nlayers(), self.nspecies())
    }

    /// Fills `grid` from `params`.
    ///
    /// Checks run in a fixed order and the first failing one is reported:
    /// the PT law, then the temperature bounds, then the filler remainder.
    ///
    /// # Arguments
    /// * `params` - A full parameter vector, `layout.nfree()` long.
    /// * `grid` - A grid obtained from `self.grid()`, overwritten entirely.
    pub fn generate(&self, params: &[f64], grid: &mut LayerGrid) -> std::result::Result<(), Rejection> {
        debug_assert_eq!(params.len(), self.layout.nfree());
        debug_assert_eq!(grid.as_flat().len(), (self.nspecies() + 1) * self.nlayers());

        let (temperature, rows) = grid.split_mut();
        let pt = self.layout.pt(params);

        match &self.smoother {
            Some(smoother) => {
                let mut raw = vec![0.0; self.nlayers()];
                self.model.temperatures(&self.pressure, pt, &mut raw)?;
                smoother.apply(&raw, temperature);
            }
            None => self.model.temperatures(&self.pressure, pt, temperature)?,
        }

        if let Some((layer, &temperature)) = temperature
            .iter()
            .enumerate()
            .find(|(_, t)| !self.bounds.contains(**t))
        {
            return Err(Rejection::OutOfBounds { layer, temperature });
        }

        self.abundances.fill(self.layout.molecules(params), rows)
    }
}

fn validate_pressure(pressure: &[f64]) -> Result<()> {
    if pressure.is_empty() {
        return Err(AtmosphereErr::SizeMismatch {
            a: "pressure layers",
            b: "minimum layers",
            got: 0,
            expected: 1,
        });
    }

    if let Some(&value) = pressure.iter().find(|p| !p.is_finite() || **p <= 0.0) {
        return Err(AtmosphereErr::InvalidValue {
            what: "pressure",
            value,
        });
    }

    let increasing = pressure.windows(2).all(|w| w[0] < w[1]);
    let decreasing = pressure.windows(2).all(|w| w[0] > w[1]);
    if !increasing && !decreasing {
        return Err(AtmosphereErr::NonMonotonic {
            what: "pressure grid",
        });
    }

    Ok(())
}

fn validate_context(ctx: &StellarContext) -> Result<()> {
    let values = [
        ("stellar radius", ctx.r_star),
        ("stellar temperature", ctx.t_star),
        ("semi-major axis", ctx.sma),
        ("surface gravity", ctx.gravity),
    ];

    match values.iter().find(|(_, v)| !v.is_finite() || *v <= 0.0) {
        Some(&(what, value)) => Err(AtmosphereErr::InvalidValue { what, value }),
        None => Ok(()),
    }
}
