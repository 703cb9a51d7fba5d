//! Ideal-mask label construction for mask-training losses.
//!
//! Given the mixture spectrum and per-source reference spectra, these
//! build the targets a mask estimator is trained against. All spectra are
//! single-channel `(batch, freq, time)` complex arrays; masks come back as
//! real arrays of the same shape (complex for [`complex_ideal_mask`]).

use std::fmt::{self, Display};
use std::str::FromStr;

use itertools::Itertools;
use ndarray::{Array3, ArrayView3};
use serde::{Deserialize, Serialize};

use crate::{C, F};

const EPS: F = 1e-7;

/// Ideal-mask flavor.
///
/// Binary ([`Ibm`](Self::Ibm)) and ratio ([`Irm`](Self::Irm)) masks compare
/// the references against each other; amplitude and phase-sensitive masks
/// compare each reference against the mixture. Amplitude masks clamp to
/// [0, 1]; the phase-sensitive ones clamp to [−1, 1] (a negative value
/// means the bin is counter-phase to the mixture).
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum MaskType {
    Ibm,
    Irm,
    #[default]
    Iam,
    Psm,
    Npsm,
    #[serde(rename = "PSM^2")]
    PsmSquared,
}

impl Display for MaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaskType::Ibm => write!(f, "IBM"),
            MaskType::Irm => write!(f, "IRM"),
            MaskType::Iam => write!(f, "IAM"),
            MaskType::Psm => write!(f, "PSM"),
            MaskType::Npsm => write!(f, "NPSM"),
            MaskType::PsmSquared => write!(f, "PSM^2"),
        }
    }
}

impl FromStr for MaskType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.to_ascii_uppercase().as_str() {
            "IBM" => Self::Ibm,
            "IRM" => Self::Irm,
            "IAM" => Self::Iam,
            "PSM" => Self::Psm,
            "NPSM" => Self::Npsm,
            "PSM^2" => Self::PsmSquared,
            e => return Err(format!("Unsupported mask type {e:?}")),
        })
    }
}

/// Builds one ideal mask per reference source.
#[must_use]
pub fn mask_label(
    mix: ArrayView3<C>,
    refs: &[ArrayView3<C>],
    mask_type: MaskType,
) -> Vec<Array3<F>> {
    for reference in refs {
        assert_eq!(
            reference.dim(),
            mix.dim(),
            "mixture and reference spectra must agree in shape",
        );
    }
    refs.iter()
        .map(|reference| {
            Array3::from_shape_fn(mix.raw_dim(), |index| {
                let r = reference[index];
                let m = mix[index];
                match mask_type {
                    // 1 where this source dominates every other reference
                    MaskType::Ibm => F::from(u8::from(
                        refs.iter().all(|other| r.norm() >= other[index].norm()),
                    )),
                    MaskType::Irm => {
                        r.norm() / (refs.iter().map(|other| other[index].norm()).sum::<F>() + EPS)
                    }
                    MaskType::Iam => (r.norm() / (m.norm() + EPS)).clamp(0.0, 1.0),
                    MaskType::Psm | MaskType::Npsm => {
                        (r.norm() / (m.norm() + EPS) * cos_theta(r, m)).clamp(-1.0, 1.0)
                    }
                    MaskType::PsmSquared => {
                        (r.norm_sqr() / (m.norm_sqr() + EPS) * cos_theta(r, m)).clamp(-1.0, 1.0)
                    }
                }
            })
        })
        .collect_vec()
}

/// Complex ideal mask `r / mix`, real and imaginary parts each clamped to
/// [−1, 1].
#[must_use]
pub fn complex_ideal_mask(mix: ArrayView3<C>, refs: &[ArrayView3<C>]) -> Vec<Array3<C>> {
    for reference in refs {
        assert_eq!(
            reference.dim(),
            mix.dim(),
            "mixture and reference spectra must agree in shape",
        );
    }
    refs.iter()
        .map(|reference| {
            Array3::from_shape_fn(mix.raw_dim(), |index| {
                let m = mix[index];
                let mask = reference[index] / C::new(m.re + EPS, m.im);
                C::new(mask.re.clamp(-1.0, 1.0), mask.im.clamp(-1.0, 1.0))
            })
        })
        .collect_vec()
}

/// Cosine of the phase difference between a reference bin and the mixture
/// bin: `cos(a − b) = cos a·cos b + sin a·sin b`.
fn cos_theta(r: C, m: C) -> F {
    let phase_r = r / (r.norm() + EPS);
    let phase_m = m / (m.norm() + EPS);
    phase_r.re * phase_m.re + phase_r.im * phase_m.im
}
