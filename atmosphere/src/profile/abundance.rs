use ndarray::{Array2, ArrayViewMut1, Axis};

use super::Rejection;
use crate::error::{AtmosphereErr, Result};

/// Scales fitted species and rebalances the two filler species.
#[derive(Debug, Clone)]
pub(super) struct Abundances {
    /// `nlayers x nspecies`, never mutated after construction.
    reference: Array2<f64>,
    fitted: Vec<usize>,
    fillers: (usize, usize),
    others: Vec<usize>,
    /// Per layer share of the remainder taken by the first filler.
    share: Vec<f64>,
}

impl Abundances {
    pub(super) fn new(species: &[String], reference: Array2<f64>, molfit: &[String]) -> Result<Self> {
        let (nlayers, nspecies) = reference.dim();

        if nspecies != species.len() {
            return Err(AtmosphereErr::SizeMismatch {
                a: "reference abundance columns",
                b: "species names",
                got: nspecies,
                expected: species.len(),
            });
        }

        if let Some(&value) = reference.iter().find(|x| !x.is_finite() || **x < 0.0) {
            return Err(AtmosphereErr::InvalidValue {
                what: "reference abundance",
                value,
            });
        }

        let fillers = select_fillers(species, &reference)?;

        let fitted = molfit
            .iter()
            .map(|name| {
                let idx = species
                    .iter()
                    .position(|s| s == name)
                    .ok_or_else(|| AtmosphereErr::UnknownSpecies(name.clone()))?;

                if idx == fillers.0 || idx == fillers.1 {
                    return Err(AtmosphereErr::FittedFiller(name.clone()));
                }

                Ok(idx)
            })
            .collect::<Result<Vec<_>>>()?;

        let share = (0..nlayers)
            .map(|layer| {
                let a = reference[[layer, fillers.0]];
                let b = reference[[layer, fillers.1]];

                if a + b > 0.0 {
                    Ok(a / (a + b))
                } else {
                    Err(AtmosphereErr::EmptyFillers { layer })
                }
            })
            .collect::<Result<Vec<_>>>()?;

        let others = (0..nspecies)
            .filter(|&s| s != fillers.0 && s != fillers.1)
            .collect();

        Ok(Self {
            reference,
            fitted,
            fillers,
            others,
            share,
        })
    }

    pub(super) fn fillers(&self) -> (usize, usize) {
        self.fillers
    }

    /// Writes the scaled abundances into `rows`.
    ///
    /// # Arguments
    /// * `scales` - One log10 scale factor per fitted molecule.
    /// * `rows` - `nspecies` consecutive rows of `nlayers` values each.
    pub(super) fn fill(
        &self,
        scales: &[f64],
        rows: &mut [f64],
    ) -> std::result::Result<(), Rejection> {
        let nlayers = self.share.len();

        for (s, row) in rows.chunks_exact_mut(nlayers).enumerate() {
            ArrayViewMut1::from(row).assign(&self.reference.column(s));
        }

        for (&s, scale) in self.fitted.iter().zip(scales) {
            let factor = 10f64.powf(*scale);
            rows[s * nlayers..(s + 1) * nlayers]
                .iter_mut()
                .for_each(|x| *x *= factor);
        }

        let (first, second) = self.fillers;
        for (layer, share) in self.share.iter().enumerate() {
            let remainder = 1.0
                - self
                    .others
                    .iter()
                    .map(|&s| rows[s * nlayers + layer])
                    .sum::<f64>();

            // NaN scales must not pass as an accepted profile
            if !(remainder >= 0.0) {
                return Err(Rejection::NegativeFiller { layer, remainder });
            }

            rows[first * nlayers + layer] = remainder * share;
            rows[second * nlayers + layer] = remainder * (1.0 - share);
        }

        Ok(())
    }
}

/// `H2` and `He` when both are present, otherwise the two species with the
/// largest total reference abundance.
fn select_fillers(species: &[String], reference: &Array2<f64>) -> Result<(usize, usize)> {
    if species.len() < 2 {
        return Err(AtmosphereErr::MissingFillers {
            nspecies: species.len(),
        });
    }

    let position = |name: &str| species.iter().position(|s| s == name);
    if let (Some(h2), Some(he)) = (position("H2"), position("He")) {
        return Ok((h2, he));
    }

    let totals = reference.sum_axis(Axis(0));
    let mut order: Vec<usize> = (0..species.len()).collect();
    order.sort_by(|&a, &b| totals[b].total_cmp(&totals[a]));

    Ok((order[0], order[1]))
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn named_fillers_take_precedence() {
        let species = names(&["H2O", "He", "CO", "H2"]);
        let reference = array![[1e-4, 0.15, 0.5, 0.3]];
        let abundances = Abundances::new(&species, reference, &[]).unwrap();
        assert_eq!(abundances.fillers(), (3, 1));
    }

    #[test]
    fn largest_species_fill_without_hydrogen() {
        let species = names(&["CO2", "N2", "H2O", "O2"]);
        let reference = array![[0.01, 0.78, 1e-3, 0.2], [0.01, 0.78, 1e-3, 0.2]];
        let abundances = Abundances::new(&species, reference, &names(&["H2O"])).unwrap();
        assert_eq!(abundances.fillers(), (1, 3));
    }

    #[test]
    fn construction_errors() {
        let species = names(&["H2", "He", "H2O"]);
        let reference = array![[0.85, 0.15, 1e-4]];

        let err = Abundances::new(&species, reference.clone(), &names(&["CH4"])).unwrap_err();
        assert_eq!(err, AtmosphereErr::UnknownSpecies("CH4".into()));

        let err = Abundances::new(&species, reference.clone(), &names(&["He"])).unwrap_err();
        assert_eq!(err, AtmosphereErr::FittedFiller("He".into()));

        let empty = array![[0.0, 0.0, 1.0]];
        let err = Abundances::new(&species, empty, &[]).unwrap_err();
        assert_eq!(err, AtmosphereErr::EmptyFillers { layer: 0 });

        let err = Abundances::new(&names(&["H2"]), array![[1.0]], &[]).unwrap_err();
        assert_eq!(err, AtmosphereErr::MissingFillers { nspecies: 1 });
    }

    #[test]
    fn scaling_past_unity_is_rejected() {
        let species = names(&["H2", "He", "H2O"]);
        let reference = array![[0.85, 0.15, 0.2], [0.85, 0.15, 0.01]];
        let abundances = Abundances::new(&species, reference, &names(&["H2O"])).unwrap();

        let mut data = vec![0.0; 6];
        let rejection = abundances.fill(&[1.0], &mut data).unwrap_err();
        match rejection {
            Rejection::NegativeFiller { layer, remainder } => {
                assert_eq!(layer, 0);
                assert!(remainder < 0.0);
            }
            other => panic!("unexpected rejection {other:?}"),
        }
    }

    #[test]
    fn non_finite_scale_is_rejected() {
        let species = names(&["H2", "He", "H2O"]);
        let reference = array![[0.85, 0.15, 1e-4], [0.85, 0.15, 1e-4]];
        let abundances = Abundances::new(&species, reference, &names(&["H2O"])).unwrap();

        let mut data = vec![0.0; 6];
        let rejection = abundances.fill(&[f64::NAN], &mut data).unwrap_err();
        match rejection {
            Rejection::NegativeFiller { layer, remainder } => {
                assert_eq!(layer, 0);
                assert!(remainder.is_nan());
            }
            other => panic!("unexpected rejection {other:?}"),
        }

        assert!(abundances.fill(&[f64::INFINITY], &mut data).is_err());
        abundances.fill(&[f64::NEG_INFINITY], &mut data).unwrap();
        assert_eq!(&data[4..], &[0.0, 0.0]);
    }
}
