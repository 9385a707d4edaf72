//! Band integration of a spectrum over instrument filters.

mod filter;

use std::ops::Range;

use log::debug;
use ndarray::{Array1, ArrayView1, Zip, s};

use crate::error::{AtmosphereErr, Result};
pub use filter::{FilterCurve, StellarSpectrum};

/// How the spectrum is turned into an observable.
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    /// Integrates the solver's spectrum as is.
    Transit,
    /// Integrates the planet to star flux ratio, `(spectrum / star) * rprs²`.
    Eclipse { rprs: f64, star: StellarSpectrum },
}

/// Filters and observation mode as configured, before the solver's
/// wavenumber grid is known.
#[derive(Debug, Clone, PartialEq)]
pub struct Bandpasses {
    filters: Vec<FilterCurve>,
    observation: Observation,
}

impl Bandpasses {
    pub fn new(filters: Vec<FilterCurve>, observation: Observation) -> Self {
        Self {
            filters,
            observation,
        }
    }

    pub fn nbands(&self) -> usize {
        self.filters.len()
    }

    /// Resamples every filter (and the stellar spectrum) onto `specwn`.
    ///
    /// # Arguments
    /// * `specwn` - The solver's strictly increasing wavenumber grid.
    ///
    /// # Returns
    /// An integrator ready to reduce spectra over `specwn`, or the first
    /// filter that cannot be resampled.
    pub fn prepare(&self, specwn: &[f64]) -> Result<BandIntegrator> {
        let (Some(&grid_low), Some(&grid_high)) = (specwn.first(), specwn.last()) else {
            return Err(AtmosphereErr::SizeMismatch {
                a: "wavenumber grid",
                b: "minimum samples",
                got: 0,
                expected: 2,
            });
        };

        let wavenumber = Array1::from(specwn.to_vec());

        let bands = self
            .filters
            .iter()
            .enumerate()
            .map(|(i, filter)| {
                let (low, high) = (filter.low(), filter.high());

                if low < grid_low || high > grid_high {
                    return Err(AtmosphereErr::FilterOutOfRange {
                        filter: i,
                        low,
                        high,
                        grid_low,
                        grid_high,
                    });
                }

                let start = specwn.partition_point(|&wn| wn <= low);
                let end = specwn.partition_point(|&wn| wn < high);
                let support = start..end;

                if support.len() < 2 {
                    return Err(AtmosphereErr::EmptyBand { filter: i });
                }

                let x = wavenumber.slice(s![support.clone()]);
                let mut weight = x.mapv(|wn| filter.at(wn));

                let area = trapz(weight.view(), x);
                if !(area > 0.0) {
                    return Err(AtmosphereErr::EmptyBand { filter: i });
                }
                weight /= area;

                if let Observation::Eclipse { rprs, star } = &self.observation {
                    if !star.covers(x[0], x[x.len() - 1]) {
                        return Err(AtmosphereErr::StellarOutOfRange { filter: i });
                    }

                    let rprs2 = rprs * rprs;
                    Zip::from(&mut weight)
                        .and(x)
                        .for_each(|w, &wn| *w *= rprs2 / star.at(wn));
                }

                debug!(filter = i, start = support.start, end = support.end; "band prepared");
                Ok(Band { support, weight })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(BandIntegrator { wavenumber, bands })
    }
}

#[derive(Debug, Clone)]
struct Band {
    support: Range<usize>,
    /// Normalized filter, already divided by the stellar flux in eclipse mode.
    weight: Array1<f64>,
}

/// Reduces spectra over a fixed wavenumber grid to band-integrated values.
#[derive(Debug, Clone)]
pub struct BandIntegrator {
    wavenumber: Array1<f64>,
    bands: Vec<Band>,
}

impl BandIntegrator {
    pub fn nbands(&self) -> usize {
        self.bands.len()
    }

    pub fn nwave(&self) -> usize {
        self.wavenumber.len()
    }

    /// Integrates `spectrum` over every band into `out`, in filter order.
    pub fn integrate(&self, spectrum: &[f64], out: &mut [f64]) -> Result<()> {
        if spectrum.len() != self.nwave() {
            return Err(AtmosphereErr::SizeMismatch {
                a: "spectrum",
                b: "wavenumber grid",
                got: spectrum.len(),
                expected: self.nwave(),
            });
        }

        if out.len() != self.nbands() {
            return Err(AtmosphereErr::SizeMismatch {
                a: "band output",
                b: "filters",
                got: out.len(),
                expected: self.nbands(),
            });
        }

        let spectrum = ArrayView1::from(spectrum);

        for (band, out) in self.bands.iter().zip(out) {
            let x = self.wavenumber.slice(s![band.support.clone()]);
            let y = spectrum.slice(s![band.support.clone()]);

            *out = Zip::from(x.windows(2))
                .and(y.windows(2))
                .and(band.weight.windows(2))
                .fold(0.0, |acc, x, y, w| {
                    acc + 0.5 * (x[1] - x[0]) * (y[0] * w[0] + y[1] * w[1])
                });
        }

        Ok(())
    }
}

/// Trapezoidal integral of `y` over `x`.
pub fn trapz(y: ArrayView1<f64>, x: ArrayView1<f64>) -> f64 {
    Zip::from(x.windows(2))
        .and(y.windows(2))
        .fold(0.0, |acc, x, y| acc + 0.5 * (x[1] - x[0]) * (y[0] + y[1]))
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    fn grid(start: f64, stop: f64, step: f64) -> Vec<f64> {
        let n = ((stop - start) / step).round() as usize + 1;
        (0..n).map(|i| start + step * i as f64).collect()
    }

    fn boxcar(low: f64, high: f64) -> FilterCurve {
        FilterCurve::new(vec![low, low + 1e-3, high - 1e-3, high], vec![1.0; 4]).unwrap()
    }

    #[test]
    fn trapz_of_a_line() {
        let x = array![0.0, 1.0, 2.0, 4.0];
        let y = x.mapv(|v| 2.0 * v);
        assert_eq!(trapz(y.view(), x.view()), 16.0);
    }

    #[test]
    fn support_excludes_filter_edges() {
        let specwn = grid(1000.0, 2000.0, 10.0);
        let bands = Bandpasses::new(vec![boxcar(1200.0, 1300.0)], Observation::Transit);
        let integrator = bands.prepare(&specwn).unwrap();

        let band = &integrator.bands[0];
        assert_eq!(specwn[band.support.start], 1210.0);
        assert_eq!(specwn[band.support.end - 1], 1290.0);
    }

    #[test]
    fn flat_spectrum_integrates_to_its_level() {
        let specwn = grid(1000.0, 2000.0, 10.0);
        let bands = Bandpasses::new(
            vec![boxcar(1100.0, 1400.0), boxcar(1500.0, 1900.0)],
            Observation::Transit,
        );
        let integrator = bands.prepare(&specwn).unwrap();

        let spectrum = vec![0.0123; specwn.len()];
        let mut out = vec![0.0; 2];
        integrator.integrate(&spectrum, &mut out).unwrap();

        for v in out {
            assert!((v - 0.0123).abs() < 1e-12);
        }
    }

    #[test]
    fn eclipse_divides_by_star_and_scales_by_rprs() {
        let specwn = grid(1000.0, 2000.0, 10.0);
        let star = StellarSpectrum::new(vec![900.0, 2100.0], vec![4.0, 4.0]).unwrap();
        let bands = Bandpasses::new(
            vec![boxcar(1200.0, 1800.0)],
            Observation::Eclipse { rprs: 0.1, star },
        );
        let integrator = bands.prepare(&specwn).unwrap();

        let spectrum = vec![2.0; specwn.len()];
        let mut out = vec![0.0];
        integrator.integrate(&spectrum, &mut out).unwrap();

        assert!((out[0] - 0.5 * 0.01).abs() < 1e-12);
    }

    #[test]
    fn filter_outside_grid_is_fatal() {
        let specwn = grid(1000.0, 2000.0, 10.0);
        let bands = Bandpasses::new(
            vec![boxcar(1200.0, 1300.0), boxcar(1900.0, 2100.0)],
            Observation::Transit,
        );

        match bands.prepare(&specwn).unwrap_err() {
            AtmosphereErr::FilterOutOfRange { filter, .. } => assert_eq!(filter, 1),
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn narrow_filter_has_empty_band() {
        let specwn = grid(1000.0, 2000.0, 10.0);
        let bands = Bandpasses::new(vec![boxcar(1201.0, 1209.0)], Observation::Transit);
        assert_eq!(
            bands.prepare(&specwn).unwrap_err(),
            AtmosphereErr::EmptyBand { filter: 0 }
        );
    }

    #[test]
    fn star_must_cover_the_support() {
        let specwn = grid(1000.0, 2000.0, 10.0);
        let star = StellarSpectrum::new(vec![1500.0, 2100.0], vec![1.0, 1.0]).unwrap();
        let bands = Bandpasses::new(
            vec![boxcar(1200.0, 1800.0)],
            Observation::Eclipse { rprs: 0.1, star },
        );
        assert_eq!(
            bands.prepare(&specwn).unwrap_err(),
            AtmosphereErr::StellarOutOfRange { filter: 0 }
        );
    }

    #[test]
    fn wrong_spectrum_length_is_an_error() {
        let specwn = grid(1000.0, 2000.0, 10.0);
        let bands = Bandpasses::new(vec![boxcar(1200.0, 1300.0)], Observation::Transit);
        let integrator = bands.prepare(&specwn).unwrap();

        let mut out = vec![0.0];
        assert!(integrator.integrate(&[1.0; 3], &mut out).is_err());
    }
}
