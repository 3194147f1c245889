use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Lower and upper clamp applied to bandwidth-scaled distances.
const SCALED_DISTANCE_FLOOR: f64 = 1e-6;
const SCALED_DISTANCE_CEIL: f64 = 1.0 - 1e-6;

/// Weighting scheme applied to the k nearest neighbors.
///
/// Weights are evaluated on the neighbor distance divided by the bandwidth (the
/// distance to the first neighbor outside the k nearest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kernel {
    /// Uniform weights: the plain mean of the k nearest targets.
    Rectangular,
    Triangular,
    Epanechnikov,
    Biweight,
    Triweight,
    Cos,
    /// Inverse distance.
    Inv,
    Gaussian,
}

impl Kernel {
    pub const ALL: [Kernel; 8] = [
        Kernel::Rectangular,
        Kernel::Triangular,
        Kernel::Epanechnikov,
        Kernel::Biweight,
        Kernel::Triweight,
        Kernel::Cos,
        Kernel::Inv,
        Kernel::Gaussian,
    ];

    pub fn is_uniform(self) -> bool {
        self == Kernel::Rectangular
    }

    /// Weight of a neighbor at `scaled_distance` (distance / bandwidth).
    pub fn weight(self, scaled_distance: f64) -> f64 {
        let u = scaled_distance
            .abs()
            .max(SCALED_DISTANCE_FLOOR)
            .min(SCALED_DISTANCE_CEIL);
        match self {
            Kernel::Rectangular => 0.5,
            Kernel::Triangular => 1.0 - u,
            Kernel::Epanechnikov => 0.75 * (1.0 - u * u),
            Kernel::Biweight => 15.0 / 16.0 * (1.0 - u * u).powi(2),
            Kernel::Triweight => 35.0 / 32.0 * (1.0 - u * u).powi(3),
            Kernel::Cos => PI / 4.0 * (PI / 2.0 * u).cos(),
            Kernel::Inv => 1.0 / u,
            Kernel::Gaussian => (-u * u / 2.0).exp() / (2.0 * PI).sqrt(),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Kernel::Rectangular => "rectangular",
            Kernel::Triangular => "triangular",
            Kernel::Epanechnikov => "epanechnikov",
            Kernel::Biweight => "biweight",
            Kernel::Triweight => "triweight",
            Kernel::Cos => "cos",
            Kernel::Inv => "inv",
            Kernel::Gaussian => "gaussian",
        }
    }
}

impl Default for Kernel {
    fn default() -> Self {
        Kernel::Rectangular
    }
}

impl fmt::Display for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Kernel {
    type Err = UnknownKernel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Kernel::ALL
            .iter()
            .copied()
            .find(|k| k.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownKernel(s.to_owned()))
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown kernel {0:?}")]
pub struct UnknownKernel(pub String);
