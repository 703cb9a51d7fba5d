//! Distortion criteria consumed by the assignment solver.
//!
//! Every criterion returns one scalar per batch element, the contract
//! [`crate::permutation_loss`] expects. Spectrum criteria take
//! `(batch, freq, time)` complex arrays, mask criteria their real
//! counterpart, SI-SNR criteria `(batch, samples)` waveforms.

use ndarray::{Array1, ArrayView2, ArrayView3, Axis};

use crate::{C, F};

const EPS: F = 1e-8;

/// Mean squared error over the complex spectrum.
#[must_use]
pub fn spectrum_mse(reference: ArrayView3<C>, hypothesis: ArrayView3<C>) -> Array1<F> {
    per_element(reference, hypothesis, |r, h| (r - h).norm_sqr())
}

/// Mean absolute error over the complex spectrum.
#[must_use]
pub fn spectrum_l1(reference: ArrayView3<C>, hypothesis: ArrayView3<C>) -> Array1<F> {
    per_element(reference, hypothesis, |r, h| (r - h).norm())
}

/// Mean squared error between real masks.
#[must_use]
pub fn mask_mse(reference: ArrayView3<F>, hypothesis: ArrayView3<F>) -> Array1<F> {
    assert_eq!(reference.dim(), hypothesis.dim(), "criterion input shapes must match");
    let (batch, bins, frames) = reference.dim();
    Array1::from_shape_fn(batch, |b| {
        reference
            .index_axis(Axis(0), b)
            .iter()
            .zip(hypothesis.index_axis(Axis(0), b))
            .map(|(&r, &h)| (r - h) * (r - h))
            .sum::<F>()
            / (bins * frames) as F
    })
}

fn per_element(
    reference: ArrayView3<C>,
    hypothesis: ArrayView3<C>,
    distortion: impl Fn(C, C) -> F,
) -> Array1<F> {
    assert_eq!(reference.dim(), hypothesis.dim(), "criterion input shapes must match");
    let (batch, bins, frames) = reference.dim();
    Array1::from_shape_fn(batch, |b| {
        reference
            .index_axis(Axis(0), b)
            .iter()
            .zip(hypothesis.index_axis(Axis(0), b))
            .map(|(&r, &h)| distortion(r, h))
            .sum::<F>()
            / (bins * frames) as F
    })
}

/// Negative scale-invariant SNR on unit-normalized waveforms.
#[must_use]
pub fn si_snr_loss(reference: ArrayView2<F>, hypothesis: ArrayView2<F>) -> Array1<F> {
    assert_eq!(reference.dim(), hypothesis.dim(), "criterion input shapes must match");
    let batch = reference.dim().0;
    Array1::from_shape_fn(batch, |b| {
        let r = reference.index_axis(Axis(0), b);
        let h = hypothesis.index_axis(Axis(0), b);
        let r_norm = norm(&r.to_vec()) + EPS;
        let h_norm = norm(&h.to_vec()) + EPS;
        let r = r.mapv(|x| x / r_norm);
        let h = h.mapv(|x| x / h_norm);
        let dot = r.iter().zip(&h).map(|(&r, &h)| r * h).sum::<F>();
        let target = r.mapv(|x| dot * x);
        let noise = &h - &target;
        -20.0 * (norm(target.as_slice().expect("contiguous"))
            / norm(noise.as_slice().expect("contiguous")))
        .log10()
    })
}

/// Negative scale-invariant SNR with zero-mean preprocessing, the variant
/// used for waveform-domain training losses.
#[must_use]
pub fn si_snr_zero_mean_loss(reference: ArrayView2<F>, hypothesis: ArrayView2<F>) -> Array1<F> {
    assert_eq!(reference.dim(), hypothesis.dim(), "criterion input shapes must match");
    let (batch, samples) = reference.dim();
    Array1::from_shape_fn(batch, |b| {
        let r = reference.index_axis(Axis(0), b);
        let h = hypothesis.index_axis(Axis(0), b);
        let r_mean = r.sum() / samples as F;
        let h_mean = h.sum() / samples as F;
        let target = r.mapv(|x| x - r_mean);
        let estimate = h.mapv(|x| x - h_mean);
        // projection of the estimate onto the target direction
        let dot = target.iter().zip(&estimate).map(|(&t, &e)| t * e).sum::<F>();
        let energy = target.iter().map(|&t| t * t).sum::<F>() + EPS;
        let projection = target.mapv(|t| dot * t / energy);
        let noise = &estimate - &projection;
        let ratio = projection.iter().map(|&p| p * p).sum::<F>()
            / (noise.iter().map(|&n| n * n).sum::<F>() + EPS);
        -10.0 * (ratio + EPS).log10()
    })
}

fn norm(values: &[F]) -> F {
    values.iter().map(|&v| v * v).sum::<F>().sqrt()
}
