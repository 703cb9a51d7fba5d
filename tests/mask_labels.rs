use beamsep::mask::{complex_ideal_mask, mask_label};
use beamsep::{MaskType, C, F};
use float_cmp::assert_approx_eq;
use itertools::Itertools;
use ndarray::Array3;

fn lcg(seed: &mut u64) -> F {
    *seed = seed
        .wrapping_mul(6_364_136_223_846_793_005)
        .wrapping_add(1_442_695_040_888_963_407);
    (*seed >> 33) as F / (1u64 << 32) as F * 2.0 - 1.0
}

fn spectra(seed: &mut u64) -> (Array3<C>, Vec<Array3<C>>) {
    let refs = (0..2)
        .map(|_| Array3::from_shape_fn((2, 3, 5), |_| C::new(lcg(seed), lcg(seed))))
        .collect_vec();
    let mix = &refs[0] + &refs[1];
    (mix, refs)
}

#[test]
fn clamp_ranges_hold() {
    let mut seed = 61;
    let (mix, refs) = spectra(&mut seed);
    let views = refs.iter().map(Array3::view).collect_vec();

    for mask in mask_label(mix.view(), &views, MaskType::Iam) {
        assert!(mask.iter().all(|&m| (0.0..=1.0).contains(&m)));
    }
    for mask_type in [MaskType::Psm, MaskType::Npsm, MaskType::PsmSquared] {
        for mask in mask_label(mix.view(), &views, mask_type) {
            assert!(mask.iter().all(|&m| (-1.0..=1.0).contains(&m)));
        }
    }
}

#[test]
fn psm_and_npsm_agree() {
    // both phase-sensitive flavors share the [-1, 1] clamp
    let mut seed = 67;
    let (mix, refs) = spectra(&mut seed);
    let views = refs.iter().map(Array3::view).collect_vec();

    let psm = mask_label(mix.view(), &views, MaskType::Psm);
    let npsm = mask_label(mix.view(), &views, MaskType::Npsm);
    for (a, b) in psm.iter().zip(&npsm) {
        for (&x, &y) in a.iter().zip(b) {
            assert_approx_eq!(F, x, y, epsilon = 0.0);
        }
    }
}

#[test]
fn binary_mask_is_binary_and_exhaustive() {
    let mut seed = 71;
    let (mix, refs) = spectra(&mut seed);
    let views = refs.iter().map(Array3::view).collect_vec();

    let masks = mask_label(mix.view(), &views, MaskType::Ibm);
    for mask in &masks {
        assert!(mask.iter().all(|&m| m == 0.0 || m == 1.0));
    }
    // the dominating source is marked in every bin
    let any = masks.iter().fold(Array3::<f64>::zeros(mix.raw_dim()), |acc, m| acc + m);
    assert!(any.iter().all(|&m| m >= 1.0));
}

#[test]
fn ratio_masks_sum_to_one() {
    let mut seed = 73;
    let (mix, refs) = spectra(&mut seed);
    let views = refs.iter().map(Array3::view).collect_vec();

    let masks = mask_label(mix.view(), &views, MaskType::Irm);
    let total = masks.iter().fold(Array3::zeros(mix.raw_dim()), |acc, m| acc + m);
    for &v in &total {
        assert_approx_eq!(F, v, 1.0, epsilon = 1e-3);
    }
}

#[test]
fn exact_reference_gives_unit_masks() {
    let mut seed = 79;
    let mix = Array3::from_shape_fn((1, 2, 4), |_| C::new(lcg(&mut seed) + 2.0, lcg(&mut seed)));

    let iam = mask_label(mix.view(), &[mix.view()], MaskType::Iam);
    let psm = mask_label(mix.view(), &[mix.view()], MaskType::Psm);
    for mask in iam.iter().chain(&psm) {
        for &v in mask {
            assert_approx_eq!(F, v, 1.0, epsilon = 1e-4);
        }
    }
    let icm = complex_ideal_mask(mix.view(), &[mix.view()]);
    for &v in &icm[0] {
        assert!(v.re <= 1.0 && v.im <= 1.0);
        assert_approx_eq!(F, v.re, 1.0, epsilon = 1e-4);
        assert_approx_eq!(F, v.im, 0.0, epsilon = 1e-4);
    }
}

#[test]
fn names_round_trip() {
    for (name, mask_type) in [
        ("IBM", MaskType::Ibm),
        ("IRM", MaskType::Irm),
        ("IAM", MaskType::Iam),
        ("PSM", MaskType::Psm),
        ("NPSM", MaskType::Npsm),
        ("PSM^2", MaskType::PsmSquared),
    ] {
        assert_eq!(name.parse::<MaskType>(), Ok(mask_type));
        assert_eq!(mask_type.to_string(), name);
    }
    assert!("ICM".parse::<MaskType>().is_err());
}
