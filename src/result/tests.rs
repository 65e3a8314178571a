// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use approx::assert_abs_diff_eq;
use marlu::Jones;
use ndarray::array;

use super::*;

/// A scalar result that depends on spid `spid` with derivative 1.
fn leaf(value: f64, spid: usize, num_spids: usize) -> MeqResult {
    let mut r = MeqResult::from_value(Matrix::real_scalar(value), num_spids);
    r.set_perturbed_value(spid, Matrix::real_scalar(1.0)).unwrap();
    r
}

fn constant(value: c64) -> MeqResult {
    MeqResult::from_value(Matrix::complex_scalar(value), 0)
}

fn d(r: &MeqResult, spid: usize) -> c64 {
    r.perturbed_value(spid).unwrap().get(0, 0)
}

#[test]
fn test_new_has_unset_slots() {
    let r = MeqResult::new(3);
    assert_eq!(r.num_spids(), 3);
    assert_eq!(r.active_spids().count(), 0);
    assert_eq!(
        r.perturbed_value(1),
        Err(ValueError::NoDerivative { spid: 1 })
    );
    assert_eq!(
        r.perturbed_value(3),
        Err(ValueError::SpidOutOfRange {
            spid: 3,
            num_spids: 3
        })
    );
}

#[test]
fn test_perturbed_shape_must_broadcast() {
    let mut r = MeqResult::from_value(Matrix::Real(array![[1.0, 2.0]]), 1);
    assert!(r
        .set_perturbed_value(0, Matrix::Real(array![[1.0], [2.0]]))
        .is_err());
    r.set_perturbed_value(0, Matrix::real_scalar(1.0)).unwrap();
    r.set_perturbed_value(0, Matrix::Real(array![[3.0, 4.0]]))
        .unwrap();
    assert!(r.is_perturbed(0));
}

#[test]
fn test_sum_and_product_rules() {
    let a = leaf(3.0, 0, 2);
    let b = leaf(5.0, 1, 2);

    let sum = a.add(&b).unwrap();
    assert_eq!(sum.value().get(0, 0).re, 8.0);
    assert_eq!(d(&sum, 0).re, 1.0);
    assert_eq!(d(&sum, 1).re, 1.0);

    let diff = a.sub(&b).unwrap();
    assert_eq!(d(&diff, 1).re, -1.0);

    let prod = a.mul(&b).unwrap();
    assert_eq!(prod.value().get(0, 0).re, 15.0);
    // d(ab)/da = b, d(ab)/db = a
    assert_eq!(d(&prod, 0).re, 5.0);
    assert_eq!(d(&prod, 1).re, 3.0);

    let quot = a.div(&b).unwrap();
    assert_abs_diff_eq!(d(&quot, 0).re, 1.0 / 5.0);
    assert_abs_diff_eq!(d(&quot, 1).re, -3.0 / 25.0);
}

#[test]
fn test_inactive_operand_contributes_nothing() {
    let a = leaf(2.0, 0, 2);
    let c = constant(c64::new(4.0, 0.0));
    let prod = a.mul(&c).unwrap();
    assert_eq!(prod.num_spids(), 2);
    assert_eq!(prod.active_spids().collect::<Vec<_>>(), vec![0]);
    assert_eq!(d(&prod, 0).re, 4.0);
}

#[test]
fn test_chain_rule() {
    let x = leaf(0.3, 0, 1);
    assert_abs_diff_eq!(d(&x.cos().unwrap(), 0).re, -(0.3_f64.sin()));
    assert_abs_diff_eq!(d(&x.sin().unwrap(), 0).re, 0.3_f64.cos());
    assert_abs_diff_eq!(d(&x.exp().unwrap(), 0).re, 0.3_f64.exp());
    assert_abs_diff_eq!(d(&x.sqrt().unwrap(), 0).re, 0.5 / 0.3_f64.sqrt());
    assert_abs_diff_eq!(d(&x.neg().unwrap(), 0).re, -1.0);
}

#[test]
fn test_polar_derivatives() {
    let amp = leaf(2.0, 0, 2);
    let phase = leaf(0.7, 1, 2);
    let z = MeqResult::polar(&amp, &phase).unwrap();
    let cis = c64::cis(0.7);
    assert_abs_diff_eq!(z.value().get(0, 0).re, (cis * 2.0).re);
    assert_abs_diff_eq!(d(&z, 0).re, cis.re);
    assert_abs_diff_eq!(d(&z, 0).im, cis.im);
    let expected = c64::i() * cis * 2.0;
    assert_abs_diff_eq!(d(&z, 1).re, expected.re);
    assert_abs_diff_eq!(d(&z, 1).im, expected.im);
}

#[test]
fn test_to_complex_derivatives() {
    let re = leaf(1.0, 0, 2);
    let im = leaf(2.0, 1, 2);
    let z = MeqResult::to_complex(&re, &im).unwrap();
    assert_eq!(z.value().get(0, 0), c64::new(1.0, 2.0));
    assert_eq!(d(&z, 0), c64::new(1.0, 0.0));
    assert_eq!(d(&z, 1), c64::new(0.0, 1.0));
    let conj = z.conj().unwrap();
    assert_eq!(d(&conj, 1), c64::new(0.0, -1.0));
}

#[test]
fn test_compare_drops_derivatives() {
    let a = leaf(2.0, 0, 1);
    let b = leaf(1.5, 0, 1);
    let c = MeqResult::compare(&a, &b).unwrap();
    assert_eq!(c.value().get(0, 0).re, 0.5);
    assert_eq!(c.num_spids(), 0);
}

fn jones_constant(j: [c64; 4]) -> JonesResult {
    JonesResult::new(
        constant(j[0]),
        constant(j[1]),
        constant(j[2]),
        constant(j[3]),
    )
}

fn one_through_eight() -> [c64; 4] {
    [
        c64::new(1.0, 2.0),
        c64::new(3.0, 4.0),
        c64::new(5.0, 6.0),
        c64::new(7.0, 8.0),
    ]
}

#[test]
fn test_jones_mul_agrees_with_marlu() {
    let a = one_through_eight();
    let b = [
        c64::new(-1.0, 0.5),
        c64::new(0.0, 2.0),
        c64::new(3.0, -1.0),
        c64::new(1.0, 1.0),
    ];
    let result = jones_constant(a).mul(&jones_constant(b)).unwrap();
    let expected = Jones::from(a) * Jones::from(b);
    assert_abs_diff_eq!(result.jones_at(0, 0), expected, epsilon = 1e-12);

    let result = jones_constant(a).mul_hermitian(&jones_constant(b)).unwrap();
    let expected = Jones::from(a).mul_hermitian(Jones::from(b));
    assert_abs_diff_eq!(result.jones_at(0, 0), expected, epsilon = 1e-12);
}

#[test]
fn test_jones_inverse() {
    let a = jones_constant(one_through_eight());
    let inv = a.inv().unwrap();
    let ident = a.mul(&inv).unwrap();
    assert_abs_diff_eq!(ident.jones_at(0, 0), Jones::identity(), epsilon = 1e-12);
}

#[test]
fn test_jones_inverse_singular() {
    let a = jones_constant([
        c64::new(1.0, 0.0),
        c64::new(2.0, 0.0),
        c64::new(2.0, 0.0),
        c64::new(4.0, 0.0),
    ]);
    assert!(matches!(
        a.inv(),
        Err(ValueError::SingularMatrix {
            i_freq: 0,
            i_time: 0,
            ..
        })
    ));

    let zero = jones_constant([c64::new(0.0, 0.0); 4]);
    assert!(matches!(
        zero.inv(),
        Err(ValueError::SingularMatrix { .. })
    ));
}

#[test]
fn test_jones_inverse_derivatives() {
    // A = [[p, 1], [2, 3]] with p = 2. A^-1 = [[3, -1], [-2, p]] / (3p - 2).
    let p = 2.0;
    let a = JonesResult::new(
        leaf(p, 0, 1),
        constant(c64::new(1.0, 0.0)),
        constant(c64::new(2.0, 0.0)),
        constant(c64::new(3.0, 0.0)),
    );
    let inv = a.inv().unwrap();
    let det = 3.0 * p - 2.0;
    // d/dp (3 / (3p - 2)) = -9 / det^2
    assert_abs_diff_eq!(d(&inv.r11, 0).re, -9.0 / (det * det), epsilon = 1e-12);
    // d/dp (-1 / (3p - 2)) = 3 / det^2
    assert_abs_diff_eq!(d(&inv.r12, 0).re, 3.0 / (det * det), epsilon = 1e-12);
    // d/dp (p / (3p - 2)) = -2 / det^2
    assert_abs_diff_eq!(d(&inv.r22, 0).re, -2.0 / (det * det), epsilon = 1e-12);
}

#[test]
fn test_diagonal() {
    let j = JonesResult::diagonal(leaf(1.0, 0, 1), constant(c64::new(2.0, 0.0)));
    assert!(j.r12.value().is_zero());
    assert!(j.r21.value().is_zero());
    assert_eq!(j.r12.active_spids().count(), 0);
    assert_eq!(j.num_spids(), 1);
    assert_eq!(j.shape().unwrap(), (1, 1));
}
