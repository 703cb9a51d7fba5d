use beamsep::{loss, C, F};
use float_cmp::assert_approx_eq;
use ndarray::{Array2, Array3};

fn lcg(seed: &mut u64) -> F {
    *seed = seed
        .wrapping_mul(6_364_136_223_846_793_005)
        .wrapping_add(1_442_695_040_888_963_407);
    (*seed >> 33) as F / (1u64 << 32) as F * 2.0 - 1.0
}

#[test]
fn spectrum_criteria_vanish_on_identical_inputs() {
    let mut seed = 83;
    let spectrum = Array3::from_shape_fn((2, 3, 4), |_| C::new(lcg(&mut seed), lcg(&mut seed)));

    for &v in &loss::spectrum_mse(spectrum.view(), spectrum.view()) {
        assert_approx_eq!(F, v, 0.0, epsilon = 1e-15);
    }
    for &v in &loss::spectrum_l1(spectrum.view(), spectrum.view()) {
        assert_approx_eq!(F, v, 0.0, epsilon = 1e-15);
    }
}

#[test]
fn spectrum_mse_matches_hand_computation() {
    let reference = Array3::from_elem((1, 1, 2), C::new(1.0, 0.0));
    let hypothesis = Array3::from_shape_fn((1, 1, 2), |(_, _, t)| {
        if t == 0 {
            C::new(1.0, 1.0)
        } else {
            C::new(0.0, 0.0)
        }
    });
    // |i|^2 = 1 and |1|^2 = 1 over two bins
    let mse = loss::spectrum_mse(reference.view(), hypothesis.view());
    assert_approx_eq!(F, mse[0], 1.0, epsilon = 1e-12);
}

#[test]
fn mask_mse_is_mean_squared_difference() {
    let reference = Array3::from_elem((1, 2, 2), 0.5);
    let hypothesis = Array3::from_elem((1, 2, 2), 0.25);
    let mse = loss::mask_mse(reference.view(), hypothesis.view());
    assert_approx_eq!(F, mse[0], 0.0625, epsilon = 1e-12);
}

#[test]
fn si_snr_rewards_scaled_copies() {
    let mut seed = 89;
    let reference = Array2::from_shape_fn((2, 64), |_| lcg(&mut seed));
    let scaled = reference.mapv(|x| 0.3 * x);
    let mut noisy = reference.clone();
    for v in &mut noisy {
        *v += lcg(&mut seed);
    }

    // a rescaled copy is a perfect estimate under a scale-invariant metric
    for &v in &loss::si_snr_zero_mean_loss(reference.view(), scaled.view()) {
        assert!(v < -40.0, "scaled copy scored {v}");
    }
    for &v in &loss::si_snr_loss(reference.view(), scaled.view()) {
        assert!(v < -40.0, "scaled copy scored {v}");
    }
    // additive noise must score strictly worse
    let clean = loss::si_snr_zero_mean_loss(reference.view(), scaled.view());
    let noisy = loss::si_snr_zero_mean_loss(reference.view(), noisy.view());
    for (c, n) in clean.iter().zip(&noisy) {
        assert!(c < n);
    }
}
