/// Positions of each parameter group inside a parameter vector.
///
/// The order is fixed: PT parameters, then the optional radius, cloud-top and
/// scattering scalars, then one log10 abundance scale per fitted molecule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamLayout {
    npt: usize,
    radius: bool,
    cloud_top: bool,
    scattering: bool,
    nmolfit: usize,
}

impl ParamLayout {
    /// Creates a new `ParamLayout`.
    ///
    /// # Arguments
    /// * `npt` - The amount of PT profile parameters.
    /// * `radius` - Whether a reference radius is fitted.
    /// * `cloud_top` - Whether a cloud-top pressure is fitted.
    /// * `scattering` - Whether a Rayleigh scattering coefficient is fitted.
    /// * `nmolfit` - The amount of fitted molecules.
    pub fn new(npt: usize, radius: bool, cloud_top: bool, scattering: bool, nmolfit: usize) -> Self {
        Self {
            npt,
            radius,
            cloud_top,
            scattering,
            nmolfit,
        }
    }

    pub fn nfree(&self) -> usize {
        self.npt + self.naux() + self.nmolfit
    }

    pub fn npt(&self) -> usize {
        self.npt
    }

    pub fn nmolfit(&self) -> usize {
        self.nmolfit
    }

    /// Whether any of the auxiliary solver scalars is part of the layout.
    pub fn has_auxiliary(&self) -> bool {
        self.naux() > 0
    }

    fn naux(&self) -> usize {
        self.radius as usize + self.cloud_top as usize + self.scattering as usize
    }

    // The following accessors expect `params` to be exactly `nfree` long.

    pub fn pt<'a>(&self, params: &'a [f64]) -> &'a [f64] {
        &params[..self.npt]
    }

    pub fn radius(&self, params: &[f64]) -> Option<f64> {
        self.radius.then(|| params[self.npt])
    }

    pub fn cloud_top(&self, params: &[f64]) -> Option<f64> {
        self.cloud_top
            .then(|| params[self.npt + self.radius as usize])
    }

    pub fn scattering(&self, params: &[f64]) -> Option<f64> {
        self.scattering
            .then(|| params[self.npt + self.radius as usize + self.cloud_top as usize])
    }

    pub fn molecules<'a>(&self, params: &'a [f64]) -> &'a [f64] {
        &params[self.npt + self.naux()..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_follow_group_order() {
        let layout = ParamLayout::new(5, true, false, true, 2);
        let params = [1., 2., 3., 4., 5., 10., 20., -1., -2.];

        assert_eq!(layout.nfree(), 9);
        assert_eq!(layout.pt(&params), &[1., 2., 3., 4., 5.]);
        assert_eq!(layout.radius(&params), Some(10.));
        assert_eq!(layout.cloud_top(&params), None);
        assert_eq!(layout.scattering(&params), Some(20.));
        assert_eq!(layout.molecules(&params), &[-1., -2.]);
        assert!(layout.has_auxiliary());
    }

    #[test]
    fn layout_without_auxiliary_scalars() {
        let layout = ParamLayout::new(1, false, false, false, 1);
        let params = [1500., 0.5];

        assert!(!layout.has_auxiliary());
        assert_eq!(layout.radius(&params), None);
        assert_eq!(layout.molecules(&params), &[0.5]);
    }
}
