use std::{
    error::Error,
    fmt::{self, Display},
};

/// The result type used in the entire atmosphere module.
pub type Result<T> = std::result::Result<T, AtmosphereErr>;

/// Errors raised while setting up profile generation or band integration.
///
/// These are configuration defects detected once at startup, as opposed to
/// `Rejection`s which are per-iteration outcomes.
#[derive(Debug, Clone, PartialEq)]
pub enum AtmosphereErr {
    SizeMismatch {
        a: &'static str,
        b: &'static str,
        got: usize,
        expected: usize,
    },
    ArityMismatch {
        model: &'static str,
        got: usize,
        expected: usize,
    },
    NonMonotonic {
        what: &'static str,
    },
    InvalidValue {
        what: &'static str,
        value: f64,
    },
    UnknownSpecies(String),
    FittedFiller(String),
    MissingFillers {
        nspecies: usize,
    },
    EmptyFillers {
        layer: usize,
    },
    FilterOutOfRange {
        filter: usize,
        low: f64,
        high: f64,
        grid_low: f64,
        grid_high: f64,
    },
    EmptyBand {
        filter: usize,
    },
    StellarOutOfRange {
        filter: usize,
    },
}

impl Display for AtmosphereErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AtmosphereErr::SizeMismatch {
                a,
                b,
                got,
                expected,
            } => write!(
                f,
                "There's a size mismatch between {a} and {b}, got {got} and expected {expected}"
            ),
            AtmosphereErr::ArityMismatch {
                model,
                got,
                expected,
            } => write!(
                f,
                "The {model} profile takes {expected} parameters, the layout reserves {got}"
            ),
            AtmosphereErr::NonMonotonic { what } => {
                write!(f, "The {what} must be strictly monotonic")
            }
            AtmosphereErr::InvalidValue { what, value } => {
                write!(f, "Invalid value {value} for {what}")
            }
            AtmosphereErr::UnknownSpecies(name) => {
                write!(f, "Species {name} is not present in the reference atmosphere")
            }
            AtmosphereErr::FittedFiller(name) => {
                write!(f, "Species {name} is a filler and cannot be fitted")
            }
            AtmosphereErr::MissingFillers { nspecies } => write!(
                f,
                "Two filler species are needed, the reference atmosphere has {nspecies}"
            ),
            AtmosphereErr::EmptyFillers { layer } => write!(
                f,
                "The filler species have zero reference abundance at layer {layer}"
            ),
            AtmosphereErr::FilterOutOfRange {
                filter,
                low,
                high,
                grid_low,
                grid_high,
            } => write!(
                f,
                "Wavenumber array ({grid_low:.2} - {grid_high:.2} cm-1) does not cover the filter[{filter}] wavenumber range ({low:.2} - {high:.2} cm-1)"
            ),
            AtmosphereErr::EmptyBand { filter } => write!(
                f,
                "The filter[{filter}] support has fewer than two wavenumber samples or a zero integral"
            ),
            AtmosphereErr::StellarOutOfRange { filter } => write!(
                f,
                "The stellar spectrum does not cover the filter[{filter}] support"
            ),
        }
    }
}

impl Error for AtmosphereErr {}
