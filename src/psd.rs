//! Spatial covariance ("power spectral density") estimation.
//!
//! All estimators consume a multichannel spectrogram indexed
//! `(batch, freq, channel, time)` and produce one channel-sized Hermitian
//! matrix per `(batch, freq)`. Covariances are accumulated as rank-1
//! `y·yᴴ` updates, so Hermitian symmetry holds by construction. Time
//! summations stop at the valid length of each batch element; padding
//! frames never enter the statistics.

use nalgebra::{DMatrix, DVector};
use ndarray::{Array2, Array3, ArrayView3, ArrayView4, Axis};
use num::Zero;

use crate::{linalg, C, F};

/// Mask totals at or below this are treated as an all-zero mask.
const MASK_FLOOR: F = 1e-10;

pub(crate) fn frame(signal: &ArrayView4<C>, b: usize, f: usize, t: usize) -> DVector<C> {
    DVector::from_fn(signal.dim().2, |c, _| signal[(b, f, c, t)])
}

/// Frame stack `[y_t, y_{t−bdelay}, …, y_{t−bdelay−btaps+1}]` flattened
/// tap-major; history reaching before the signal start is zero-filled.
pub(crate) fn expanded_frame(
    signal: &ArrayView4<C>,
    b: usize,
    f: usize,
    t: usize,
    bdelay: usize,
    btaps: usize,
) -> DVector<C> {
    let channels = signal.dim().2;
    DVector::from_fn(channels * (btaps + 1), |i, _| {
        let (tap, c) = (i / channels, i % channels);
        let delayed = if tap == 0 {
            Some(t)
        } else {
            t.checked_sub(bdelay + tap - 1)
        };
        delayed.map_or_else(C::zero, |t| signal[(b, f, c, t)])
    })
}

/// Reduces a per-channel mask to the `(batch, freq, time)` shape the
/// estimators consume by averaging across channels.
#[must_use]
pub fn channel_average_mask(mask: ArrayView4<F>) -> Array3<F> {
    mask.mean_axis(Axis(2)).expect("mask has at least one channel")
}

/// Mask-weighted empirical covariance per `(batch, freq)`:
/// `Σ_t m_t · y_t·y_tᴴ / Σ_t m_t`.
///
/// A mask summing to (near) zero for some bin would divide by zero; those
/// bins fall back to uniform time weights, i.e. the unweighted covariance.
#[must_use]
pub fn masked_covariance(
    signal: ArrayView4<C>,
    mask: ArrayView3<F>,
    ilens: &[usize],
) -> Array2<DMatrix<C>> {
    let (batch, bins, channels, frames) = signal.dim();
    assert_eq!(
        (batch, bins, frames),
        mask.dim(),
        "mask and signal must agree on (batch, freq, time)",
    );
    assert_eq!(ilens.len(), batch, "one valid length per batch element");
    Array2::from_shape_fn((batch, bins), |(b, f)| {
        let valid = ilens[b].min(frames);
        let total: F = (0..valid).map(|t| mask[(b, f, t)]).sum();
        let mut psd = linalg::zeros(channels);
        if total > MASK_FLOOR {
            for t in 0..valid {
                let w = mask[(b, f, t)] / total;
                if w != 0.0 {
                    linalg::accumulate_outer(&mut psd, &frame(&signal, b, f, t), w);
                }
            }
        } else if valid > 0 {
            for t in 0..valid {
                linalg::accumulate_outer(&mut psd, &frame(&signal, b, f, t), 1.0 / valid as F);
            }
        }
        psd
    })
}

/// Unweighted full-signal covariance `Σ_t y_t·y_tᴴ` per `(batch, freq)`,
/// the observed-signal term of the MPDR closed form.
#[must_use]
pub fn observed_covariance(signal: ArrayView4<C>, ilens: &[usize]) -> Array2<DMatrix<C>> {
    let (batch, bins, channels, frames) = signal.dim();
    assert_eq!(ilens.len(), batch, "one valid length per batch element");
    Array2::from_shape_fn((batch, bins), |(b, f)| {
        let mut psd = linalg::zeros(channels);
        for t in 0..ilens[b].min(frames) {
            linalg::accumulate_outer(&mut psd, &frame(&signal, b, f, t), 1.0);
        }
        psd
    })
}

/// Inverse of the channel-averaged masked power, `1 / max(p̄_t·m_t, eps)`,
/// the weighting sequence of the WPD covariance.
#[must_use]
pub fn inverse_power(signal: ArrayView4<C>, mask: ArrayView3<F>, eps: F) -> Array3<F> {
    let (batch, bins, channels, frames) = signal.dim();
    assert_eq!(
        (batch, bins, frames),
        mask.dim(),
        "mask and signal must agree on (batch, freq, time)",
    );
    Array3::from_shape_fn((batch, bins, frames), |(b, f, t)| {
        let power = (0..channels)
            .map(|c| signal[(b, f, c, t)].norm_sqr())
            .sum::<F>()
            / channels as F
            * mask[(b, f, t)];
        1.0 / power.max(eps)
    })
}

/// Power-normalized covariance of the channel-and-delay expanded signal,
/// size `(C·(btaps+1))²` per `(batch, freq)`.
///
/// Only frames with a complete tap history contribute; the first
/// `bdelay + btaps − 1` frames are skipped rather than zero-padded so the
/// statistics stay unbiased.
#[must_use]
pub fn expanded_covariance(
    signal: ArrayView4<C>,
    inverse_power: ArrayView3<F>,
    bdelay: usize,
    btaps: usize,
    ilens: &[usize],
) -> Array2<DMatrix<C>> {
    let (batch, bins, channels, frames) = signal.dim();
    assert_eq!(
        (batch, bins, frames),
        inverse_power.dim(),
        "inverse power and signal must agree on (batch, freq, time)",
    );
    assert!(bdelay >= 1, "prediction delay must be at least one frame");
    assert_eq!(ilens.len(), batch, "one valid length per batch element");
    let start = bdelay + btaps - 1;
    Array2::from_shape_fn((batch, bins), |(b, f)| {
        let mut psd = linalg::zeros(channels * (btaps + 1));
        for t in start..ilens[b].min(frames) {
            let y = expanded_frame(&signal, b, f, t, bdelay, btaps);
            linalg::accumulate_outer(&mut psd, &y, inverse_power[(b, f, t)]);
        }
        psd
    })
}
