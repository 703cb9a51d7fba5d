//! Reference-channel selection.
//!
//! The designed filter is only determined up to a complex scale; a
//! reference vector over the channels anchors it. Either a fixed
//! microphone is configured, or a learned scorer ranks the channels from a
//! feature of the speech PSD and a softmax turns the scores into weights.

use nalgebra::DMatrix;
use ndarray::{Array1, Array2, ArrayView2};

use crate::{C, F};

/// Softmax sharpening applied to the channel scores.
const ATTENTION_SCALING: F = 2.0;

/// Learned projection ranking candidate reference channels.
///
/// This is the externally trained half of the attention reference: the
/// crate computes the PSD feature and normalizes the output, the scorer in
/// between is a collaborator.
pub trait ChannelScorer {
    /// Scores each channel given the `(channels, bins)` off-diagonal PSD
    /// magnitude feature of one batch element; higher means better suited
    /// as a reference.
    fn score(&self, psd_feature: ArrayView2<F>) -> Array1<F>;
}

impl<T: Fn(ArrayView2<F>) -> Array1<F>> ChannelScorer for T {
    fn score(&self, psd_feature: ArrayView2<F>) -> Array1<F> {
        self(psd_feature)
    }
}

/// One-hot reference for a fixed microphone.
pub(crate) fn one_hot(channels: usize, index: usize) -> Array1<F> {
    let mut u = Array1::zeros(channels);
    u[index] = 1.0;
    u
}

/// Attention-weighted reference: per channel, the magnitude of its mean
/// off-diagonal PSD row is scored and softmax-normalized to sum to 1.
pub(crate) fn attention(psd_speech: &Array2<DMatrix<C>>, scorer: &dyn ChannelScorer) -> Array2<F> {
    let (batch, bins) = psd_speech.dim();
    let channels = psd_speech[(0, 0)].nrows();
    let mut u = Array2::zeros((batch, channels));
    for b in 0..batch {
        let feature = Array2::from_shape_fn((channels, bins), |(c, f)| {
            let psd = &psd_speech[(b, f)];
            let row: C = (0..channels).filter(|&e| e != c).map(|e| psd[(c, e)]).sum();
            (row / (channels - 1).max(1) as F).norm()
        });
        let scores = scorer.score(feature.view());
        assert_eq!(scores.len(), channels, "scorer must score every channel");
        u.row_mut(b).assign(&softmax(&scores, ATTENTION_SCALING));
    }
    u
}

fn softmax(scores: &Array1<F>, scaling: F) -> Array1<F> {
    let max = scores
        .iter()
        .map(|&s| scaling * s)
        .fold(F::NEG_INFINITY, F::max);
    let exp = scores.mapv(|s| (scaling * s - max).exp());
    let total = exp.sum();
    exp / total
}
