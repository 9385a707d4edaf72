#![allow(dead_code)]

use atmosphere::{ParamLayout, ProfileGenerator, PtModel, TemperatureBounds};
use comms::specs::{AuxScalars, PipelineSizes};
use ndarray::Array2;
use stages::{Result, SpectrumSolver, StageErr};

pub const NLAYERS: usize = 10;

/// Wavenumbers 1000..=2000 cm-1 every 10 cm-1.
pub fn grid() -> Vec<f64> {
    (0..=100).map(|i| 1000.0 + 10.0 * i as f64).collect()
}

pub fn sizes(niter: usize) -> PipelineSizes {
    PipelineSizes {
        nlayers: NLAYERS,
        nspecies: 3,
        nwave: 101,
        nbands: 2,
        niter,
        nfree: 2,
    }
}

/// An isothermal H2/He/H2O atmosphere with water fitted.
pub fn generator() -> ProfileGenerator {
    let pressure = (0..NLAYERS).map(|i| 10f64.powi(i as i32 - 6)).collect();
    let species = ["H2", "He", "H2O"].map(String::from).to_vec();

    let mut reference = Array2::zeros((NLAYERS, 3));
    for mut row in reference.rows_mut() {
        row[0] = 0.85;
        row[1] = 0.15;
        row[2] = 1e-4;
    }

    ProfileGenerator::new(
        pressure,
        species,
        reference,
        PtModel::Isothermal,
        &["H2O".to_string()],
        TemperatureBounds::default(),
        ParamLayout::new(1, false, false, false, 1),
    )
    .unwrap()
}

/// Produces a spectrum proportional to the mean layer temperature.
pub struct MockSolver {
    pub grid: Vec<f64>,
    pub radius: f64,
    pub nlayers: usize,
    pub refuse: bool,
}

impl MockSolver {
    pub fn new() -> Self {
        Self {
            grid: grid(),
            radius: 1.0,
            nlayers: 0,
            refuse: false,
        }
    }
}

impl SpectrumSolver for MockSolver {
    async fn wavenumbers(&mut self) -> Result<Vec<f64>> {
        Ok(self.grid.clone())
    }

    async fn configure(&mut self, sizes: &PipelineSizes) -> Result<()> {
        if self.refuse {
            return Err(StageErr::Solver("opacity table not found".into()));
        }
        self.nlayers = sizes.nlayers;
        Ok(())
    }

    async fn set_auxiliary(&mut self, aux: &AuxScalars) -> Result<()> {
        if let Some(radius) = aux.radius {
            self.radius = radius;
        }
        Ok(())
    }

    async fn solve(&mut self, profile: &[f64], spectrum: &mut [f64]) -> Result<()> {
        let mean = profile[..self.nlayers].iter().sum::<f64>() / self.nlayers as f64;
        for (i, s) in spectrum.iter_mut().enumerate() {
            *s = self.radius * mean / 1000.0 * (1.0 + 1e-3 * i as f64);
        }
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<()> {
        Ok(())
    }
}
