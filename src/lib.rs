#![warn(clippy::pedantic)]
#![allow(
    clippy::missing_panics_doc,
    clippy::missing_errors_doc,
    clippy::cast_lossless,
    clippy::cast_precision_loss
)]
//! Mask-based multichannel speech enhancement.
//!
//! Takes time-frequency masks produced by an external estimator, builds
//! spatial covariance statistics from them, designs a beamforming filter
//! (MVDR, MPDR or WPD) per frequency bin and applies it to recover each
//! source. For separation setups with several sources the crate also
//! provides the exhaustive permutation-invariant assignment between
//! references and hypotheses.
//!
//! The STFT/iSTFT pair, the mask estimator and the training loop are
//! collaborators of this crate, not part of it: everything here is a pure
//! function of spectrograms, masks and configuration.

use nalgebra::Complex;

pub mod beamformer;
pub use beamformer::{Beamformer, BeamformerConfig, BeamformerType, MaskSet};
mod error;
pub use error::{Error, Result};
mod linalg;
pub mod loss;
pub mod mask;
pub use mask::MaskType;
pub mod pit;
pub use pit::{permutation_loss, Assignment, Permutation};
pub mod psd;
pub mod reference;
pub use reference::ChannelScorer;

pub type F = f64;
pub type C = Complex<F>;
