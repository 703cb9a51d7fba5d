use beamsep::{psd, C, F};
use float_cmp::assert_approx_eq;
use ndarray::{Array3, Array4};

/// Deterministic pseudo-random values in [-1, 1].
fn lcg(seed: &mut u64) -> F {
    *seed = seed
        .wrapping_mul(6_364_136_223_846_793_005)
        .wrapping_add(1_442_695_040_888_963_407);
    (*seed >> 33) as F / (1u64 << 32) as F * 2.0 - 1.0
}

#[test]
fn masked_covariance_is_hermitian() {
    let mut seed = 7;
    let signal = Array4::from_shape_fn((2, 3, 4, 10), |_| C::new(lcg(&mut seed), lcg(&mut seed)));
    let mask = Array3::from_shape_fn((2, 3, 10), |_| (lcg(&mut seed) + 1.0) / 2.0);

    let psds = psd::masked_covariance(signal.view(), mask.view(), &[10, 8]);
    for psd in &psds {
        assert_eq!(psd.nrows(), 4);
        for i in 0..4 {
            assert_approx_eq!(F, psd[(i, i)].im, 0.0, epsilon = 1e-12);
            for j in 0..4 {
                assert_approx_eq!(F, psd[(i, j)].re, psd[(j, i)].re, epsilon = 1e-12);
                assert_approx_eq!(F, psd[(i, j)].im, -psd[(j, i)].im, epsilon = 1e-12);
            }
        }
    }
}

#[test]
fn zero_mask_falls_back_to_unweighted() {
    let mut seed = 21;
    let frames = 6;
    let signal = Array4::from_shape_fn((1, 2, 3, frames), |_| {
        C::new(lcg(&mut seed), lcg(&mut seed))
    });
    let mask = Array3::zeros((1, 2, frames));

    let psds = psd::masked_covariance(signal.view(), mask.view(), &[frames]);
    let observed = psd::observed_covariance(signal.view(), &[frames]);
    for (fallback, observed) in psds.iter().zip(&observed) {
        for (a, b) in fallback.iter().zip(observed.iter()) {
            assert!(a.re.is_finite() && a.im.is_finite());
            // uniform weighting is the unweighted covariance divided by the
            // frame count
            assert_approx_eq!(F, a.re * frames as F, b.re, epsilon = 1e-12);
            assert_approx_eq!(F, a.im * frames as F, b.im, epsilon = 1e-12);
        }
    }
}

#[test]
fn padding_frames_stay_out_of_the_statistics() {
    let mut seed = 3;
    let mut signal =
        Array4::from_shape_fn((1, 2, 2, 8), |_| C::new(lcg(&mut seed), lcg(&mut seed)));
    let mask = Array3::from_elem((1, 2, 8), 1.0);
    let short = psd::masked_covariance(signal.view(), mask.view(), &[5]);

    // garbage in the padding region must not change the result
    for t in 5..8 {
        for f in 0..2 {
            for c in 0..2 {
                signal[(0, f, c, t)] = C::new(1e9, -1e9);
            }
        }
    }
    let padded = psd::masked_covariance(signal.view(), mask.view(), &[5]);
    for (a, b) in short.iter().zip(&padded) {
        for (x, y) in a.iter().zip(b.iter()) {
            assert_approx_eq!(F, x.re, y.re, epsilon = 1e-12);
            assert_approx_eq!(F, x.im, y.im, epsilon = 1e-12);
        }
    }
}

#[test]
fn inverse_power_is_clamped_on_silence() {
    let signal = Array4::from_elem((1, 1, 2, 4), C::new(0.0, 0.0));
    let mask = Array3::from_elem((1, 1, 4), 1.0);
    let inverse = psd::inverse_power(signal.view(), mask.view(), 1e-7);
    for &v in &inverse {
        assert!(v.is_finite());
        assert_approx_eq!(F, v, 1e7, epsilon = 1.0);
    }
}

#[test]
fn channel_average_reduces_per_channel_masks() {
    let mask = Array4::from_shape_fn((1, 2, 2, 3), |(_, _, c, _)| if c == 0 { 1.0 } else { 0.5 });
    let averaged = psd::channel_average_mask(mask.view());
    assert_eq!(averaged.dim(), (1, 2, 3));
    for &v in &averaged {
        assert_approx_eq!(F, v, 0.75, epsilon = 1e-12);
    }
}
