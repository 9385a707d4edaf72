//! Special functions needed by the analytic temperature laws.

const EULER: f64 = 0.577_215_664_901_532_9;
const MAX_ITER: usize = 200;

/// Generalized exponential integral `E_n(x) = ∫₁^∞ e^{-xt} / tⁿ dt`.
///
/// Uses the power series for `x <= 1` and a modified Lentz continued
/// fraction otherwise. Returns `NaN` for negative `x` and `+inf` for the
/// divergent `x == 0, n <= 1` cases.
pub fn expint(n: u32, x: f64) -> f64 {
    if x.is_nan() || x < 0.0 {
        return f64::NAN;
    }

    if n == 0 {
        return (-x).exp() / x;
    }

    if x == 0.0 {
        return if n == 1 {
            f64::INFINITY
        } else {
            1.0 / (n - 1) as f64
        };
    }

    if x > 1.0 {
        continued_fraction(n, x)
    } else {
        series(n, x)
    }
}

fn continued_fraction(n: u32, x: f64) -> f64 {
    let tiny = f64::MIN_POSITIVE / f64::EPSILON;
    let nm1 = (n - 1) as f64;

    let mut b = x + n as f64;
    let mut c = 1.0 / tiny;
    let mut d = 1.0 / b;
    let mut h = d;

    for i in 1..=MAX_ITER {
        let i = i as f64;
        let an = -i * (nm1 + i);
        b += 2.0;
        d = 1.0 / (an * d + b);
        c = b + an / c;
        let del = c * d;
        h *= del;

        if (del - 1.0).abs() < f64::EPSILON {
            break;
        }
    }

    h * (-x).exp()
}

fn series(n: u32, x: f64) -> f64 {
    let nm1 = n as usize - 1;

    let mut ans = if nm1 != 0 {
        1.0 / nm1 as f64
    } else {
        -x.ln() - EULER
    };
    let mut fact = 1.0;

    for i in 1..=MAX_ITER {
        fact *= -x / i as f64;

        let del = if i != nm1 {
            -fact / (i as f64 - nm1 as f64)
        } else {
            let psi = (1..=nm1).fold(-EULER, |psi, k| psi + 1.0 / k as f64);
            fact * (-x.ln() + psi)
        };

        ans += del;
        if del.abs() < ans.abs() * f64::EPSILON {
            break;
        }
    }

    ans
}
