#![allow(clippy::module_name_repetitions)]
//! Mask-driven beamforming filter design and application.
//!
//! The closed form is shared between the variants; they differ only in how
//! the interference covariance is built. MVDR estimates it from a noise
//! mask, MPDR substitutes the unweighted observed-signal covariance, and
//! WPD works on a channel-and-delay expanded signal whose covariance is
//! weighted by the inverse speech power, jointly denoising and
//! dereverberating.

use std::fmt::{self, Display};
use std::str::FromStr;

use derive_more::Constructor;
use log::debug;
use nalgebra::{DMatrix, DVector};
use ndarray::{Array2, Array3, ArrayView4};
use num::Zero;
use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;

use crate::reference::ChannelScorer;
use crate::{linalg, psd, reference, Error, Result, C, F};

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BeamformerType {
    #[default]
    Mvdr,
    Mpdr,
    Wpd,
}

impl Display for BeamformerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BeamformerType::Mvdr => write!(f, "mvdr"),
            BeamformerType::Mpdr => write!(f, "mpdr"),
            BeamformerType::Wpd => write!(f, "wpd"),
        }
    }
}

impl FromStr for BeamformerType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "mvdr" => Self::Mvdr,
            "mpdr" => Self::Mpdr,
            "wpd" => Self::Wpd,
            e => return Err(format!("Unsupported beamformer type {e:?}")),
        })
    }
}

#[derive(SmartDefault, Clone, Copy, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct BeamformerConfig {
    pub beamformer_type: BeamformerType,
    /// Index of the fixed reference microphone; a negative value selects
    /// the learned attention reference instead.
    #[default(-1)]
    pub ref_channel: i64,
    /// Number of past frames stacked by the WPD expansion.
    #[default = 5]
    pub btaps: usize,
    /// Prediction delay of the WPD expansion in frames.
    #[default = 3]
    pub bdelay: usize,
    /// Diagonal-loading constant, relative to matrix scale.
    #[default = 1e-7]
    pub eps: F,
}

impl BeamformerConfig {
    /// Validates the configuration and fixes it for the lifetime of the
    /// returned [`Beamformer`].
    ///
    /// `scorer` is required exactly when `ref_channel` is negative.
    pub fn create(self, scorer: Option<Box<dyn ChannelScorer>>) -> Result<Beamformer> {
        let BeamformerConfig {
            beamformer_type,
            ref_channel,
            btaps,
            bdelay,
            eps,
        } = self;
        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        let ref_channel = if ref_channel < 0 {
            if scorer.is_none() {
                return Err(Error::MissingChannelScorer);
            }
            None
        } else {
            Some(ref_channel as usize)
        };
        if beamformer_type == BeamformerType::Wpd && bdelay == 0 {
            return Err(Error::ZeroDelay);
        }
        Ok(Beamformer {
            beamformer_type,
            ref_channel,
            btaps,
            bdelay,
            eps,
            scorer,
        })
    }
}

/// Masks for one forward call: one speech mask per target source, plus the
/// noise mask the MVDR interference estimate needs.
///
/// All masks are `(batch, freq, time)`; per-channel masks go through
/// [`psd::channel_average_mask`] first.
#[derive(Clone, Debug, Constructor)]
pub struct MaskSet {
    pub speech: Vec<Array3<F>>,
    pub noise: Option<Array3<F>>,
}

/// Enhanced spectrograms and the filters that produced them, one entry per
/// target source.
#[derive(Debug)]
pub struct Output {
    /// `(batch, freq, time)` per target; frames past the valid length are
    /// zero.
    pub enhanced: Vec<Array3<C>>,
    /// Designed weights per `(batch, freq)`; length `channels`, or
    /// `channels·(btaps+1)` for WPD.
    pub weights: Vec<Array2<DVector<C>>>,
}

pub struct Beamformer {
    beamformer_type: BeamformerType,
    ref_channel: Option<usize>,
    btaps: usize,
    bdelay: usize,
    eps: F,
    scorer: Option<Box<dyn ChannelScorer>>,
}

impl Beamformer {
    #[must_use]
    pub fn beamformer_type(&self) -> BeamformerType {
        self.beamformer_type
    }

    /// Designs one filter per target source and applies it.
    ///
    /// Each target's own PSD acts as speech; the remaining targets plus the
    /// interference term of the configured variant act as noise. `ilens`
    /// bounds the per-element valid frames and passes through unchanged.
    pub fn design_and_apply(
        &self,
        signal: ArrayView4<C>,
        masks: &MaskSet,
        ilens: &[usize],
    ) -> Result<Output> {
        let (batch, bins, channels, frames) = signal.dim();
        if masks.speech.is_empty() {
            return Err(Error::NoSpeechMask);
        }
        for mask in masks.speech.iter().chain(&masks.noise) {
            if mask.dim() != (batch, bins, frames) {
                return Err(Error::MaskShapeMismatch {
                    mask: mask.shape().to_vec(),
                    signal: signal.shape().to_vec(),
                });
            }
        }
        if ilens.len() != batch {
            return Err(Error::LengthCountMismatch {
                ilens: ilens.len(),
                batch,
            });
        }
        if let Some(channel) = self.ref_channel {
            if channel >= channels {
                return Err(Error::RefChannelOutOfRange { channel, channels });
            }
        }

        let targets = masks.speech.len();
        debug!(
            "designing {} {} filters over {batch}x{bins} bins, {channels} channels",
            targets, self.beamformer_type
        );

        let psd_speech: Vec<_> = masks
            .speech
            .iter()
            .map(|mask| psd::masked_covariance(signal, mask.view(), ilens))
            .collect();

        // Interference statistics shared by every target (per-target for
        // WPD, whose power weighting depends on the target's own mask).
        let psd_interference = match self.beamformer_type {
            BeamformerType::Mvdr => Some(psd::masked_covariance(
                signal,
                masks.noise.as_ref().ok_or(Error::MissingNoiseMask)?.view(),
                ilens,
            )),
            BeamformerType::Mpdr => Some(psd::observed_covariance(signal, ilens)),
            BeamformerType::Wpd => None,
        };
        let psd_expanded: Vec<_> = if self.beamformer_type == BeamformerType::Wpd {
            masks
                .speech
                .iter()
                .map(|mask| {
                    let inverse_power = psd::inverse_power(signal, mask.view(), self.eps);
                    psd::expanded_covariance(
                        signal,
                        inverse_power.view(),
                        self.bdelay,
                        self.btaps,
                        ilens,
                    )
                })
                .collect()
        } else {
            Vec::new()
        };

        let mut enhanced = Vec::with_capacity(targets);
        let mut weights = Vec::with_capacity(targets);
        for i in 0..targets {
            let u = self.reference_vectors(&psd_speech[i], batch, channels)?;
            let mut target_weights = Vec::with_capacity(batch * bins);
            for b in 0..batch {
                let u_b = DVector::from_iterator(channels, u.row(b).iter().map(|&x| C::new(x, 0.0)));
                for f in 0..bins {
                    let psd_s = &psd_speech[i][(b, f)];
                    let w = match self.beamformer_type {
                        BeamformerType::Mvdr => {
                            let noise =
                                psd_interference.as_ref().expect("mvdr interference is computed");
                            let mut psd_i = noise[(b, f)].clone();
                            for (j, other) in psd_speech.iter().enumerate() {
                                if j != i {
                                    psd_i += &other[(b, f)];
                                }
                            }
                            mvdr_weights(psd_s, &psd_i, &u_b, self.eps)
                        }
                        BeamformerType::Mpdr => {
                            let observed =
                                psd_interference.as_ref().expect("mpdr interference is computed");
                            mvdr_weights(psd_s, &observed[(b, f)], &u_b, self.eps)
                        }
                        BeamformerType::Wpd => {
                            wpd_weights(psd_s, &psd_expanded[i][(b, f)], &u_b, self.eps)
                        }
                    }
                    .ok_or(Error::SingularCovariance { batch: b, bin: f })?;
                    if !w.iter().all(|&c| linalg::is_finite(c)) {
                        return Err(Error::NonFiniteWeights { batch: b, bin: f });
                    }
                    target_weights.push(w);
                }
            }
            let target_weights = Array2::from_shape_vec((batch, bins), target_weights)
                .expect("one weight vector per (batch, bin)");
            enhanced.push(match self.beamformer_type {
                BeamformerType::Wpd => apply_wpd_filtering(
                    signal,
                    &target_weights,
                    self.bdelay,
                    self.btaps,
                    ilens,
                ),
                _ => apply_beamforming(signal, &target_weights, ilens),
            });
            weights.push(target_weights);
        }
        Ok(Output { enhanced, weights })
    }

    fn reference_vectors(
        &self,
        psd_speech: &Array2<DMatrix<C>>,
        batch: usize,
        channels: usize,
    ) -> Result<Array2<F>> {
        if let Some(channel) = self.ref_channel {
            let row = reference::one_hot(channels, channel);
            Ok(Array2::from_shape_fn((batch, channels), |(_, c)| row[c]))
        } else {
            let scorer = self
                .scorer
                .as_deref()
                .expect("learned mode without scorer is rejected at construction");
            Ok(reference::attention(psd_speech, scorer))
        }
    }
}

/// Regularized-inverse closed form shared by MVDR and MPDR:
/// `w = (Φi⁻¹ Φs u) / (tr(Φi⁻¹ Φs) + eps)`.
fn mvdr_weights(
    psd_speech: &DMatrix<C>,
    psd_interference: &DMatrix<C>,
    u: &DVector<C>,
    eps: F,
) -> Option<DVector<C>> {
    let numerator = linalg::solve_loaded(psd_interference, psd_speech, eps)?;
    let trace = numerator.trace();
    let ws = numerator / (trace + C::new(eps, 0.0));
    Some(ws * u)
}

/// WPD closed form on the expanded covariance: only the first `C` columns
/// of `R̄⁻¹` matter because the reference vector is zero past the current
/// frame's channels, so `w = (R̄⁻¹[:, :C] Φs u) / (tr((R̄⁻¹[:, :C] Φs)[:C, :]) + eps)`.
fn wpd_weights(
    psd_speech: &DMatrix<C>,
    psd_expanded: &DMatrix<C>,
    u: &DVector<C>,
    eps: F,
) -> Option<DVector<C>> {
    let channels = psd_speech.nrows();
    let inverse_columns = linalg::inverse_columns(psd_expanded, channels, eps)?;
    let numerator = inverse_columns * psd_speech;
    let trace: C = (0..channels).map(|c| numerator[(c, c)]).sum();
    let ws = numerator / (trace + C::new(eps, 0.0));
    Some(ws * u)
}

/// `enhanced[b,f,t] = wᴴ·y[b,f,:,t]`; a plain weighted channel sum.
#[must_use]
pub fn apply_beamforming(
    signal: ArrayView4<C>,
    weights: &Array2<DVector<C>>,
    ilens: &[usize],
) -> Array3<C> {
    let (batch, bins, _, frames) = signal.dim();
    assert_eq!(ilens.len(), batch, "one valid length per batch element");
    Array3::from_shape_fn((batch, bins, frames), |(b, f, t)| {
        if t < ilens[b] {
            weights[(b, f)].dotc(&psd::frame(&signal, b, f, t))
        } else {
            C::zero()
        }
    })
}

/// WPD application: the same inner product taken against the delay-expanded
/// frame stack, zero-filled where the tap history reaches before the signal.
#[must_use]
pub fn apply_wpd_filtering(
    signal: ArrayView4<C>,
    weights: &Array2<DVector<C>>,
    bdelay: usize,
    btaps: usize,
    ilens: &[usize],
) -> Array3<C> {
    let (batch, bins, _, frames) = signal.dim();
    assert_eq!(ilens.len(), batch, "one valid length per batch element");
    Array3::from_shape_fn((batch, bins, frames), |(b, f, t)| {
        if t < ilens[b] {
            weights[(b, f)].dotc(&psd::expanded_frame(&signal, b, f, t, bdelay, btaps))
        } else {
            C::zero()
        }
    })
}
