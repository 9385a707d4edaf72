/// A one dimensional Gaussian filter with nearest-edge padding.
///
/// The kernel extends `truncate * sigma` samples to each side, rounded to the
/// nearest integer, and is normalized to unit sum.
#[derive(Debug, Clone)]
pub struct GaussianSmoother {
    kernel: Vec<f64>,
    radius: usize,
}

impl GaussianSmoother {
    pub fn new(sigma: f64, truncate: f64) -> Self {
        let radius = (truncate * sigma + 0.5) as usize;
        let mut kernel: Vec<f64> = (0..=2 * radius)
            .map(|i| {
                let k = i as f64 - radius as f64;
                (-0.5 * k * k / (sigma * sigma)).exp()
            })
            .collect();

        let total: f64 = kernel.iter().sum();
        kernel.iter_mut().for_each(|w| *w /= total);

        Self { kernel, radius }
    }

    /// Smooths `input` into `out`, both must have the same length.
    pub fn apply(&self, input: &[f64], out: &mut [f64]) {
        let last = input.len().saturating_sub(1) as isize;

        for (i, out) in out.iter_mut().enumerate() {
            *out = self
                .kernel
                .iter()
                .enumerate()
                .map(|(k, w)| {
                    let j = (i as isize + k as isize - self.radius as isize).clamp(0, last);
                    w * input[j as usize]
                })
                .sum();
        }
    }
}
