use crate::error::{AtmosphereErr, Result};

/// An instrument transmission curve over strictly increasing wavenumber (cm-1).
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCurve {
    wavenumber: Vec<f64>,
    transmission: Vec<f64>,
}

impl FilterCurve {
    pub fn new(wavenumber: Vec<f64>, transmission: Vec<f64>) -> Result<Self> {
        validate_curve("filter", &wavenumber, &transmission)?;

        if let Some(&value) = transmission.iter().find(|t| !t.is_finite() || **t < 0.0) {
            return Err(AtmosphereErr::InvalidValue {
                what: "filter transmission",
                value,
            });
        }

        Ok(Self {
            wavenumber,
            transmission,
        })
    }

    /// Builds a curve sampled over increasing wavelength in microns.
    ///
    /// Wavenumber is `1e4 / λ`, so the samples are reversed to keep the
    /// wavenumber axis increasing.
    pub fn from_wavelength_microns(wavelength: &[f64], transmission: &[f64]) -> Result<Self> {
        if let Some(&value) = wavelength.iter().find(|l| !(**l > 0.0)) {
            return Err(AtmosphereErr::InvalidValue {
                what: "filter wavelength",
                value,
            });
        }

        let wavenumber = wavelength.iter().rev().map(|l| 1e4 / l).collect();
        let transmission = transmission.iter().rev().copied().collect();
        Self::new(wavenumber, transmission)
    }

    pub fn wavenumber(&self) -> &[f64] {
        &self.wavenumber
    }

    pub fn transmission(&self) -> &[f64] {
        &self.transmission
    }

    pub(super) fn low(&self) -> f64 {
        self.wavenumber[0]
    }

    pub(super) fn high(&self) -> f64 {
        self.wavenumber[self.wavenumber.len() - 1]
    }

    pub(super) fn at(&self, wn: f64) -> f64 {
        interp(wn, &self.wavenumber, &self.transmission)
    }
}

/// A stellar reference flux over strictly increasing wavenumber (cm-1).
#[derive(Debug, Clone, PartialEq)]
pub struct StellarSpectrum {
    wavenumber: Vec<f64>,
    flux: Vec<f64>,
}

impl StellarSpectrum {
    pub fn new(wavenumber: Vec<f64>, flux: Vec<f64>) -> Result<Self> {
        validate_curve("stellar spectrum", &wavenumber, &flux)?;

        if let Some(&value) = flux.iter().find(|f| !f.is_finite() || **f <= 0.0) {
            return Err(AtmosphereErr::InvalidValue {
                what: "stellar flux",
                value,
            });
        }

        Ok(Self { wavenumber, flux })
    }

    pub(super) fn covers(&self, low: f64, high: f64) -> bool {
        self.wavenumber[0] <= low && high <= self.wavenumber[self.wavenumber.len() - 1]
    }

    pub(super) fn at(&self, wn: f64) -> f64 {
        interp(wn, &self.wavenumber, &self.flux)
    }
}

fn validate_curve(what: &'static str, x: &[f64], y: &[f64]) -> Result<()> {
    if x.len() != y.len() {
        return Err(AtmosphereErr::SizeMismatch {
            a: what,
            b: "its wavenumber samples",
            got: y.len(),
            expected: x.len(),
        });
    }

    if x.len() < 2 {
        return Err(AtmosphereErr::SizeMismatch {
            a: what,
            b: "minimum samples",
            got: x.len(),
            expected: 2,
        });
    }

    if x.iter().any(|v| !v.is_finite()) || !x.windows(2).all(|w| w[0] < w[1]) {
        return Err(AtmosphereErr::NonMonotonic { what });
    }

    Ok(())
}

/// Linear interpolation of `(xp, fp)` at `x`, `xp` strictly increasing.
///
/// Values outside `xp` are clamped to the end samples.
pub(super) fn interp(x: f64, xp: &[f64], fp: &[f64]) -> f64 {
    let i = xp.partition_point(|&v| v <= x);

    if i == 0 {
        return fp[0];
    }
    if i == xp.len() {
        return fp[fp.len() - 1];
    }

    let (x0, x1) = (xp[i - 1], xp[i]);
    let (f0, f1) = (fp[i - 1], fp[i]);
    f0 + (f1 - f0) * (x - x0) / (x1 - x0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wavelength_curve_is_reversed_into_wavenumber() {
        let curve = FilterCurve::from_wavelength_microns(&[1.0, 2.0, 4.0], &[0.1, 0.5, 0.9]).unwrap();

        assert_eq!(curve.wavenumber(), &[2500.0, 5000.0, 10000.0]);
        assert_eq!(curve.transmission(), &[0.9, 0.5, 0.1]);
    }

    #[test]
    fn decreasing_wavenumber_is_rejected() {
        let err = FilterCurve::new(vec![2.0, 1.0], vec![1.0, 1.0]).unwrap_err();
        assert_eq!(err, AtmosphereErr::NonMonotonic { what: "filter" });
    }

    #[test]
    fn interpolation_is_linear_and_clamped() {
        let xp = [0.0, 1.0, 3.0];
        let fp = [0.0, 2.0, 6.0];

        assert_eq!(interp(0.5, &xp, &fp), 1.0);
        assert_eq!(interp(2.0, &xp, &fp), 4.0);
        assert_eq!(interp(1.0, &xp, &fp), 2.0);
        assert_eq!(interp(-1.0, &xp, &fp), 0.0);
        assert_eq!(interp(5.0, &xp, &fp), 6.0);
    }
}
