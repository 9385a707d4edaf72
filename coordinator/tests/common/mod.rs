#![allow(dead_code)]

use std::{
    num::NonZeroUsize,
    sync::{Arc, Mutex},
};

use atmosphere::{
    Bandpasses, FilterCurve, Observation, ParamLayout, ProfileGenerator, PtModel,
    TemperatureBounds,
};
use comms::specs::{AuxScalars, PipelineSizes};
use coordinator::{LocalPipeline, RunConfig, spawn_in_process};
use ndarray::Array2;
use serde_json::json;
use stages::{Result, SpectrumSolver, StageErr};

pub const NLAYERS: usize = 40;
pub const ACCEPTED: [f64; 6] = [0.99, 0.2, 0.1, 1.0, 1700.0, 1.0];
pub const NEGATIVE_BOUNDARY: [f64; 6] = [0.5, 0.05, 0.01, 10.0, 1000.0, 0.0];

/// Wavenumbers 1000..=2000 cm-1 every 10 cm-1.
pub fn grid() -> Vec<f64> {
    (0..=100).map(|i| 1000.0 + 10.0 * i as f64).collect()
}

pub fn pressure() -> Vec<f64> {
    (0..NLAYERS)
        .map(|i| 10f64.powf(-5.0 + 7.0 * i as f64 / (NLAYERS - 1) as f64))
        .collect()
}

fn reference() -> Array2<f64> {
    let mut reference = Array2::zeros((NLAYERS, 3));
    for mut row in reference.rows_mut() {
        row[0] = 0.85;
        row[1] = 0.15;
        row[2] = 1e-4;
    }
    reference
}

/// A non-inverted H2/He/H2O atmosphere with water fitted.
pub fn generator(radius: bool) -> ProfileGenerator {
    generator_with(ParamLayout::new(5, radius, false, false, 1))
}

/// Same atmosphere as [`generator`] with any auxiliary scalars in `layout`.
pub fn generator_with(layout: ParamLayout) -> ProfileGenerator {
    ProfileGenerator::new(
        pressure(),
        ["H2", "He", "H2O"].map(String::from).to_vec(),
        reference(),
        PtModel::NonInverted,
        &["H2O".to_string()],
        TemperatureBounds::default(),
        layout,
    )
    .unwrap()
}

/// A flat filter and a triangular one, both inside `grid()`.
pub fn filters() -> Vec<FilterCurve> {
    vec![
        FilterCurve::new(vec![1100.0, 1250.0, 1400.0], vec![1.0, 1.0, 1.0]).unwrap(),
        FilterCurve::new(vec![1500.0, 1700.0, 1900.0], vec![0.0, 1.0, 0.0]).unwrap(),
    ]
}

pub fn bandpasses() -> Bandpasses {
    Bandpasses::new(filters(), Observation::Transit)
}

pub fn niter(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).unwrap()
}

pub async fn ready_pipeline<S: SpectrumSolver + 'static>(solver: S, n: usize) -> LocalPipeline {
    let mut pipeline = spawn_in_process(generator(false), solver, bandpasses(), niter(n), None);
    pipeline.handshake().await.unwrap();
    pipeline
}

pub fn expected_sizes(n: usize) -> PipelineSizes {
    PipelineSizes {
        nlayers: NLAYERS,
        nspecies: 3,
        nwave: 101,
        nbands: 2,
        niter: n,
        nfree: 6,
    }
}

/// A run config equivalent to `generator(false)`, `bandpasses()` and `grid()`.
pub fn run_config(n: usize) -> RunConfig {
    let abundances: Vec<Vec<f64>> = (0..NLAYERS).map(|_| vec![0.85, 0.15, 1e-4]).collect();

    serde_json::from_value(json!({
        "atmosphere": {
            "pressure": pressure(),
            "species": ["H2", "He", "H2O"],
            "abundances": abundances,
        },
        "fit": {
            "pt_model": { "kind": "non_inverted" },
            "molecules": ["H2O"],
        },
        "observation": { "mode": "transit" },
        "filters": [
            { "wavenumber": [1100.0, 1250.0, 1400.0], "transmission": [1.0, 1.0, 1.0] },
            { "wavenumber": [1500.0, 1700.0, 1900.0], "transmission": [0.0, 1.0, 0.0] },
        ],
        "niter": n,
    }))
    .unwrap()
}

/// Produces a spectrum from the mean layer temperature and water abundance.
pub struct MockSolver {
    pub grid: Vec<f64>,
    pub radius: f64,
    pub nlayers: usize,
    pub stall: bool,
    /// Every auxiliary message seen, shared with the test.
    pub received: Arc<Mutex<Vec<AuxScalars>>>,
}

impl MockSolver {
    pub fn new() -> Self {
        Self {
            grid: grid(),
            radius: 1.0,
            nlayers: 0,
            stall: false,
            received: Arc::default(),
        }
    }

    pub fn stalling() -> Self {
        Self {
            stall: true,
            ..Self::new()
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

impl SpectrumSolver for MockSolver {
    async fn wavenumbers(&mut self) -> Result<Vec<f64>> {
        Ok(self.grid.clone())
    }

    async fn configure(&mut self, sizes: &PipelineSizes) -> Result<()> {
        if sizes.nspecies != 3 {
            return Err(StageErr::Solver("expected H2, He and H2O".into()));
        }
        self.nlayers = sizes.nlayers;
        Ok(())
    }

    async fn set_auxiliary(&mut self, aux: &AuxScalars) -> Result<()> {
        self.received.lock().unwrap().push(*aux);
        if let Some(radius) = aux.radius {
            self.radius = radius;
        }
        Ok(())
    }

    async fn solve(&mut self, profile: &[f64], spectrum: &mut [f64]) -> Result<()> {
        if self.stall {
            std::future::pending::<()>().await;
        }

        let n = self.nlayers;
        let temperature = mean(&profile[..n]);
        let water = mean(&profile[3 * n..4 * n]);
        for (i, s) in spectrum.iter_mut().enumerate() {
            *s = self.radius * temperature / 1000.0 * (1.0 + 1e-3 * i as f64) * (1.0 + water);
        }
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<()> {
        Ok(())
    }
}
