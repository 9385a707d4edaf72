use super::Rejection;
use crate::special::expint;

const STEFAN_BOLTZMANN: f64 = 5.670_374_419e-8;
// W m-2 to the 1e9 erg s-1 cm-2 unit of the Thorngren fit
const THORNGREN_FLUX_UNIT: f64 = 1e-6;
// bar to barye
const BAR_TO_CGS: f64 = 1e6;

/// How the planet's internal temperature is obtained for the flux-balance law.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InternalTemperature {
    Constant(f64),
    /// Thorngren et al. (2019) fit as a function of the equilibrium temperature.
    Thorngren,
}

/// Stellar and planetary constants the flux-balance law depends on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StellarContext {
    /// Stellar radius in meters.
    pub r_star: f64,
    /// Stellar effective temperature in Kelvin.
    pub t_star: f64,
    /// Semi-major axis in meters.
    pub sma: f64,
    /// Planetary surface gravity in cm s-2.
    pub gravity: f64,
    pub internal: InternalTemperature,
}

impl StellarContext {
    fn dilution(&self) -> f64 {
        (self.r_star / (2.0 * self.sma)).sqrt()
    }

    fn internal_temperature(&self) -> f64 {
        match self.internal {
            InternalTemperature::Constant(t) => t,
            InternalTemperature::Thorngren => {
                let t_eq = self.dilution() * self.t_star;
                let flux = 4.0 * STEFAN_BOLTZMANN * t_eq.powi(4) * THORNGREN_FLUX_UNIT;
                1.24 * t_eq * (-(flux.ln() - 0.14).powi(2) / 2.96).exp()
            }
        }
    }
}

/// The closed set of pressure-temperature laws.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PtModel {
    /// `[T]`
    Isothermal,
    /// `[a1, a2, p1, p3, T3]`, Madhusudhan & Seager (2009) without inversion.
    NonInverted,
    /// `[a1, a2, p1, p2, p3, T3]`, Madhusudhan & Seager (2009) with inversion.
    Inverted,
    /// `[log κ, log γ1, log γ2, α, β]`, Line et al. (2013).
    FluxBalance(StellarContext),
}

impl PtModel {
    pub fn arity(&self) -> usize {
        match self {
            PtModel::Isothermal => 1,
            PtModel::NonInverted => 5,
            PtModel::Inverted => 6,
            PtModel::FluxBalance(_) => 5,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PtModel::Isothermal => "isothermal",
            PtModel::NonInverted => "non-inverted",
            PtModel::Inverted => "inverted",
            PtModel::FluxBalance(_) => "flux-balance",
        }
    }

    /// Whether the raw layer temperatures are Gaussian smoothed afterwards.
    pub fn is_smoothed(&self) -> bool {
        matches!(self, PtModel::NonInverted | PtModel::Inverted)
    }

    /// Evaluates the law at every pressure in `pressure` (bar) into `out`.
    ///
    /// `params` must be exactly `self.arity()` long, which the generator
    /// validates once against its parameter layout.
    pub(crate) fn temperatures(
        &self,
        pressure: &[f64],
        params: &[f64],
        out: &mut [f64],
    ) -> Result<(), Rejection> {
        match (self, params) {
            (PtModel::Isothermal, &[t]) => {
                out.fill(t);
                Ok(())
            }
            (PtModel::NonInverted, &[a1, a2, p1, p3, t3]) => {
                non_inverted(pressure, a1, a2, p1, p3, t3, out)
            }
            (PtModel::Inverted, &[a1, a2, p1, p2, p3, t3]) => {
                inverted(pressure, a1, a2, p1, p2, p3, t3, out)
            }
            (PtModel::FluxBalance(ctx), &[kappa, gamma1, gamma2, alpha, beta]) => {
                flux_balance(pressure, ctx, kappa, gamma1, gamma2, alpha, beta, out);
                Ok(())
            }
            _ => unreachable!("PT parameter count is validated at construction"),
        }
    }
}

fn top_pressure(pressure: &[f64]) -> f64 {
    pressure.iter().copied().fold(f64::INFINITY, f64::min)
}

fn reject_negative(model: &PtModel, boundaries: &[(&'static str, f64)]) -> Result<(), Rejection> {
    match boundaries.iter().find(|(_, t)| *t < 0.0) {
        Some(&(boundary, temperature)) => Err(Rejection::NonPhysical {
            model: model.name(),
            boundary,
            temperature,
        }),
        None => Ok(()),
    }
}

fn non_inverted(
    pressure: &[f64],
    a1: f64,
    a2: f64,
    p1: f64,
    p3: f64,
    t3: f64,
    out: &mut [f64],
) -> Result<(), Rejection> {
    let p0 = top_pressure(pressure);
    let t1 = t3 - ((p3 / p1).ln() / a2).powi(2);
    let t0 = t1 - ((p1 / p0).ln() / a1).powi(2);

    reject_negative(&PtModel::NonInverted, &[("T0", t0), ("T1", t1), ("T3", t3)])?;

    for (t, &p) in out.iter_mut().zip(pressure) {
        *t = if p < p1 {
            ((p / p0).ln() / a1).powi(2) + t0
        } else if p < p3 {
            ((p / p1).ln() / a2).powi(2) + t1
        } else {
            t3
        };
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn inverted(
    pressure: &[f64],
    a1: f64,
    a2: f64,
    p1: f64,
    p2: f64,
    p3: f64,
    t3: f64,
    out: &mut [f64],
) -> Result<(), Rejection> {
    let p0 = top_pressure(pressure);
    let t2 = t3 - ((p3 / p2).ln() / a2).powi(2);
    let t0 = t2 + ((p1 / p2).ln() / a2).powi(2) - ((p1 / p0).ln() / a1).powi(2);
    let t1 = t0 + ((p1 / p0).ln() / a1).powi(2);

    reject_negative(
        &PtModel::Inverted,
        &[("T0", t0), ("T1", t1), ("T2", t2), ("T3", t3)],
    )?;

    for (t, &p) in out.iter_mut().zip(pressure) {
        *t = if p < p1 {
            ((p / p0).ln() / a1).powi(2) + t0
        } else if p < p3 {
            ((p / p2).ln() / a2).powi(2) + t2
        } else {
            t3
        };
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn flux_balance(
    pressure: &[f64],
    ctx: &StellarContext,
    log_kappa: f64,
    log_gamma1: f64,
    log_gamma2: f64,
    alpha: f64,
    beta: f64,
    out: &mut [f64],
) {
    let kappa = 10f64.powf(log_kappa);
    let gamma1 = 10f64.powf(log_gamma1);
    let gamma2 = 10f64.powf(log_gamma2);

    let t_int4 = ctx.internal_temperature().powi(4);
    let t_irr4 = (beta * ctx.dilution() * ctx.t_star).powi(4);

    for (t, &p) in out.iter_mut().zip(pressure) {
        let tau = kappa * p * BAR_TO_CGS / ctx.gravity;
        let xi1 = xi(gamma1, tau);
        let xi2 = xi(gamma2, tau);

        *t = (0.75
            * (t_int4 * (2.0 / 3.0 + tau)
                + t_irr4 * (1.0 - alpha) * xi1
                + t_irr4 * alpha * xi2))
            .powf(0.25);
    }
}

// Line et al. (2013), eq. 14.
fn xi(gamma: f64, tau: f64) -> f64 {
    let gt = gamma * tau;
    (2.0 / 3.0)
        * (1.0
            + (1.0 / gamma) * (1.0 + (0.5 * gt - 1.0) * (-gt).exp())
            + gamma * (1.0 - 0.5 * tau * tau) * expint(2, gt))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log_grid(n: usize, top: f64, bottom: f64) -> Vec<f64> {
        let (lt, lb) = (top.log10(), bottom.log10());
        (0..n)
            .map(|i| 10f64.powf(lt + (lb - lt) * i as f64 / (n - 1) as f64))
            .collect()
    }

    #[test]
    fn isothermal_fills_every_layer() {
        let pressure = log_grid(10, 1e-5, 100.0);
        let mut out = vec![0.0; 10];
        PtModel::Isothermal
            .temperatures(&pressure, &[1450.0], &mut out)
            .unwrap();
        assert!(out.iter().all(|&t| t == 1450.0));
    }

    #[test]
    fn non_inverted_is_continuous_at_region_boundaries() {
        let pressure = log_grid(200, 1e-5, 100.0);
        let (a1, a2, p1, p3, t3) = (0.99, 0.2, 0.1, 1.0, 1700.0);
        let mut out = vec![0.0; 200];
        PtModel::NonInverted
            .temperatures(&pressure, &[a1, a2, p1, p3, t3], &mut out)
            .unwrap();

        let t1 = t3 - ((p3 / p1).ln() / a2).powi(2);
        let t0 = t1 - ((p1 / pressure[0]).ln() / a1).powi(2);
        assert!((out[0] - t0).abs() < 1e-9);
        assert_eq!(*out.last().unwrap(), t3);
        assert!(out.windows(2).all(|w| w[0] <= w[1] + 1e-9));
    }

    #[test]
    fn non_inverted_negative_boundary_is_rejected() {
        let pressure = log_grid(50, 1e-5, 100.0);
        let mut out = vec![0.0; 50];
        // A shallow a2 drives T1 far below zero.
        let rejection = PtModel::NonInverted
            .temperatures(&pressure, &[0.5, 0.05, 0.01, 10.0, 1000.0], &mut out)
            .unwrap_err();

        match rejection {
            Rejection::NonPhysical {
                model, temperature, ..
            } => {
                assert_eq!(model, "non-inverted");
                assert!(temperature < 0.0);
            }
            other => panic!("unexpected rejection {other:?}"),
        }
    }

    #[test]
    fn inverted_reaches_t3_at_depth() {
        let pressure = log_grid(100, 1e-5, 100.0);
        let params = [0.8, 0.4, 1e-3, 1e-2, 1.0, 1500.0];
        let mut out = vec![0.0; 100];
        PtModel::Inverted
            .temperatures(&pressure, &params, &mut out)
            .unwrap();

        assert_eq!(*out.last().unwrap(), 1500.0);
        assert!(out.iter().all(|t| t.is_finite() && *t > 0.0));
    }

    #[test]
    fn flux_balance_is_hotter_at_depth() {
        let ctx = StellarContext {
            r_star: 0.756 * 6.957e8,
            t_star: 5040.0,
            sma: 0.031 * 1.496e11,
            gravity: 2140.0,
            internal: InternalTemperature::Constant(100.0),
        };
        let pressure = log_grid(60, 1e-6, 100.0);
        let mut out = vec![0.0; 60];
        PtModel::FluxBalance(ctx)
            .temperatures(&pressure, &[-1.5, -0.8, -0.8, 0.5, 1.0], &mut out)
            .unwrap();

        assert!(out.iter().all(|t| t.is_finite() && *t > 0.0));
        assert!(out[59] > out[0]);
    }

    #[test]
    fn thorngren_internal_temperature_is_positive() {
        let ctx = StellarContext {
            r_star: 6.957e8,
            t_star: 5800.0,
            sma: 0.05 * 1.496e11,
            gravity: 1000.0,
            internal: InternalTemperature::Thorngren,
        };
        let t_int = ctx.internal_temperature();
        let t_eq = ctx.dilution() * ctx.t_star;
        assert!(t_int > 0.0 && t_int < 1.24 * t_eq);
    }

    #[test]
    fn thorngren_fit_peaks_near_1500_kelvin() {
        // incident flux of exp(0.14) in units of 1e9 erg s-1 cm-2
        let flux = 0.14f64.exp() / THORNGREN_FLUX_UNIT;
        let t_eq = (flux / (4.0 * STEFAN_BOLTZMANN)).powf(0.25);
        assert!((1400.0..1600.0).contains(&t_eq), "{t_eq}");

        let (r_star, t_star) = (6.957e8, 5800.0);
        let dilution = t_eq / t_star;
        let ctx = StellarContext {
            r_star,
            t_star,
            sma: r_star / (2.0 * dilution * dilution),
            gravity: 1000.0,
            internal: InternalTemperature::Thorngren,
        };

        let t_int = ctx.internal_temperature();
        assert!((t_int / (1.24 * t_eq) - 1.0).abs() < 1e-9, "{t_int}");
    }
}
