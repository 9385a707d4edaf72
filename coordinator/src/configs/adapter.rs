use std::{num::NonZeroUsize, time::Duration};

use atmosphere::{
    Bandpasses, FilterCurve, InternalTemperature, Observation, ParamLayout, ProfileGenerator,
    PtModel, StellarContext, StellarSpectrum, TemperatureBounds,
};
use log::debug;
use ndarray::Array2;

use super::{
    AtmosphereConfig, FilterConfig, FitConfig, ObservationConfig, PtModelConfig, RunConfig,
    SolverConfig,
};
use crate::error::{PipelineError, Result};

/// The validated inputs of every stage.
pub struct RunSpec {
    pub generator: ProfileGenerator,
    pub bandpasses: Bandpasses,
    pub solver: Option<SolverConfig>,
    pub niter: NonZeroUsize,
    pub solver_timeout: Option<Duration>,
}

pub struct Adapter;

impl Adapter {
    pub fn new() -> Self {
        Self
    }

    /// Validates a run config and turns it into the stages' inputs.
    ///
    /// # Errors
    /// Returns `InvalidConfig` naming the first defect found.
    pub fn adapt(&self, config: RunConfig) -> Result<RunSpec> {
        self.validate_atmosphere(&config.atmosphere)?;
        self.validate_fit(&config.fit)?;

        let solver_timeout = match &config.solver {
            Some(solver) => self.adapt_timeout(solver)?,
            None => None,
        };

        let generator = self.adapt_generator(config.atmosphere, &config.fit)?;
        let bandpasses = self.adapt_bandpasses(config.filters, config.observation)?;
        debug!(
            nfree = generator.layout().nfree(),
            nbands = bandpasses.nbands();
            "run config adapted"
        );

        Ok(RunSpec {
            generator,
            bandpasses,
            solver: config.solver,
            niter: config.niter,
            solver_timeout,
        })
    }

    // -------------------------------------------------------------------------
    // Validation
    // -------------------------------------------------------------------------

    fn validate_atmosphere(&self, atmosphere: &AtmosphereConfig) -> Result<()> {
        let nlayers = atmosphere.pressure.len();
        let nspecies = atmosphere.species.len();

        if nlayers == 0 || nspecies == 0 {
            return Err(PipelineError::InvalidConfig(
                "the atmosphere needs at least one layer and one species".into(),
            ));
        }

        if atmosphere.abundances.len() != nlayers {
            return Err(PipelineError::InvalidConfig(format!(
                "the abundance table has {} rows for {nlayers} layers",
                atmosphere.abundances.len()
            )));
        }

        if let Some((i, row)) = atmosphere
            .abundances
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != nspecies)
        {
            return Err(PipelineError::InvalidConfig(format!(
                "abundance row {i} has {} values for {nspecies} species",
                row.len()
            )));
        }

        Ok(())
    }

    fn validate_fit(&self, fit: &FitConfig) -> Result<()> {
        if let Some((i, molecule)) = fit
            .molecules
            .iter()
            .enumerate()
            .find(|&(i, m)| fit.molecules[..i].contains(m))
        {
            return Err(PipelineError::InvalidConfig(format!(
                "fitted molecule {molecule} appears twice (at {i})"
            )));
        }

        Ok(())
    }

    // -------------------------------------------------------------------------
    // Adaptation
    // -------------------------------------------------------------------------

    fn adapt_timeout(&self, solver: &SolverConfig) -> Result<Option<Duration>> {
        solver
            .timeout_secs
            .map(|secs| {
                Duration::try_from_secs_f64(secs)
                    .ok()
                    .filter(|timeout| !timeout.is_zero())
                    .ok_or_else(|| {
                        PipelineError::InvalidConfig(format!(
                            "solver timeout must be a positive number of seconds, got {secs}"
                        ))
                    })
            })
            .transpose()
    }

    fn adapt_generator(
        &self,
        atmosphere: AtmosphereConfig,
        fit: &FitConfig,
    ) -> Result<ProfileGenerator> {
        let shape = (atmosphere.pressure.len(), atmosphere.species.len());
        let flat = atmosphere.abundances.into_iter().flatten().collect();
        let reference = Array2::from_shape_vec(shape, flat)
            .map_err(|e| PipelineError::InvalidConfig(format!("abundance table: {e}")))?;

        let model = self.adapt_pt_model(fit.pt_model);
        let layout = ParamLayout::new(
            model.arity(),
            fit.radius,
            fit.cloud_top,
            fit.scattering,
            fit.molecules.len(),
        );

        let bounds = TemperatureBounds {
            min: fit.t_min,
            max: fit.t_max,
        };

        let generator = ProfileGenerator::new(
            atmosphere.pressure,
            atmosphere.species,
            reference,
            model,
            &fit.molecules,
            bounds,
            layout,
        )?;

        Ok(generator)
    }

    fn adapt_pt_model(&self, pt_model: PtModelConfig) -> PtModel {
        match pt_model {
            PtModelConfig::Isothermal => PtModel::Isothermal,
            PtModelConfig::NonInverted => PtModel::NonInverted,
            PtModelConfig::Inverted => PtModel::Inverted,
            PtModelConfig::FluxBalance {
                r_star,
                t_star,
                sma,
                gravity,
                t_int,
            } => PtModel::FluxBalance(StellarContext {
                r_star,
                t_star,
                sma,
                gravity,
                internal: t_int.map_or(InternalTemperature::Thorngren, InternalTemperature::Constant),
            }),
        }
    }

    fn adapt_bandpasses(
        &self,
        filters: Vec<FilterConfig>,
        observation: ObservationConfig,
    ) -> Result<Bandpasses> {
        if filters.is_empty() {
            return Err(PipelineError::InvalidConfig(
                "at least one filter is required".into(),
            ));
        }

        let filters = filters
            .into_iter()
            .map(|filter| match filter {
                FilterConfig::Wavenumber {
                    wavenumber,
                    transmission,
                } => FilterCurve::new(wavenumber, transmission),
                FilterConfig::Wavelength {
                    wavelength_um,
                    transmission,
                } => FilterCurve::from_wavelength_microns(&wavelength_um, &transmission),
            })
            .collect::<atmosphere::Result<Vec<_>>>()?;

        let observation = match observation {
            ObservationConfig::Transit => Observation::Transit,
            ObservationConfig::Eclipse { rprs, star } => {
                if !(rprs.is_finite() && rprs > 0.0) {
                    return Err(PipelineError::InvalidConfig(format!(
                        "rprs must be positive, got {rprs}"
                    )));
                }

                let star = StellarSpectrum::new(star.wavenumber, star.flux)?;
                Observation::Eclipse { rprs, star }
            }
        };

        Ok(Bandpasses::new(filters, observation))
    }
}
