// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Useful constants.

use std::f64::consts::{FRAC_PI_2, LN_2};

/// Speed of light \[metres/second\]
pub const VEL_C: f64 = 299_792_458.0;

/// A 2x2 matrix is treated as singular when, in any cell of the grid,
/// `|det(A)| <= SINGULAR_MATRIX_RTOL * ||A||_F^2`. Both sides scale
/// quadratically with the matrix entries, so the test doesn't depend on the
/// units of the matrix.
pub const SINGULAR_MATRIX_RTOL: f64 = 1e-12;

/// The constant in the exponent of a Gaussian envelope, when the major and
/// minor axes are FWHMs \[radians\] and the baseline is in wavelengths.
pub const GAUSSIAN_EXP_CONST: f64 = -(FRAC_PI_2 * FRAC_PI_2) / LN_2;

/// Prefix of the names of station gain parameters, e.g.
/// "gain:11:ampl:CS001".
pub const GAIN_PARM_PREFIX: &str = "gain";
