// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The kinds of nodes that can appear in an [`super::ExprGraph`].

use strum_macros::{Display, IntoStaticStr};

use crate::{c64, ParmId};

/// The number of children a node kind takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(self, n: usize) -> bool {
        match self {
            Arity::Exactly(e) => n == e,
            Arity::AtLeast(min) => n >= min,
        }
    }
}

impl std::fmt::Display for Arity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Arity::Exactly(n) => write!(f, "exactly {n}"),
            Arity::AtLeast(n) => write!(f, "at least {n}"),
        }
    }
}

/// Scalar nodes. Children are scalar nodes too.
#[derive(Debug, Clone, Copy, PartialEq, Display, IntoStaticStr)]
pub enum ExprKind {
    /// A real value, constant over the domain.
    Constant(f64),

    /// A complex value, constant over the domain.
    ComplexConstant(c64),

    /// A leaf that evaluates a parameter.
    Parm(ParmId),

    /// The frequency \[Hz\] at each frequency cell centre.
    Frequency,

    /// The time \[s\] at each time cell centre.
    Time,

    Add,
    Subtract,
    Multiply,
    Divide,
    Negate,
    Cos,
    Sin,
    Exp,
    Sqrt,

    /// Children: real part, imaginary part.
    ToComplex,

    /// Children: amplitude, phase \[radians\].
    AmpPhaseToComplex,

    Conjugate,

    /// `left - right`, without perturbed values. Used to check that two
    /// sub-graphs agree; the largest difference is logged at debug level.
    Compare,
}

impl ExprKind {
    pub fn arity(&self) -> Arity {
        use ExprKind::*;
        match self {
            Constant(_) | ComplexConstant(_) | Parm(_) | Frequency | Time => Arity::Exactly(0),
            Negate | Cos | Sin | Exp | Sqrt | Conjugate => Arity::Exactly(1),
            Add | Subtract | Multiply | Divide | ToComplex | AmpPhaseToComplex | Compare => {
                Arity::Exactly(2)
            }
        }
    }
}

/// 2x2 matrix nodes. These may have scalar children, Jones children, or both;
/// [`JonesKind::arity`] gives the number of each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
pub enum JonesKind {
    /// Scalar children: the four elements, row major.
    Full,

    /// Scalar children: the two diagonal elements. The off-diagonal elements
    /// are zero.
    Diag,

    /// A scalar child multiplying every element of a Jones child.
    Scale,

    /// `A B`.
    Mul2,

    /// `A M B^H`, as in "corrupt, then correlate".
    Mul3,

    /// `A B^H`.
    CMul2,

    /// `A^-1`.
    Invert,

    /// Scalar child: the rotation angle `chi` \[radians\]. The matrix is
    /// `[[cos chi, -sin chi], [sin chi, cos chi]]`.
    Rotation,

    /// Scalar children: Stokes I, Q, U and V. See
    /// [`crate::JonesResult::from_stokes`].
    PointCoherence,

    /// The visibilities of a baseline, read from the graph's
    /// [`crate::VisBuffer`].
    VisData(usize),

    /// The sum of all Jones children.
    Sum,

    /// `A - B`.
    Subtract,
}

impl JonesKind {
    /// The number of (scalar, Jones) children this kind takes.
    pub fn arity(&self) -> (Arity, Arity) {
        use JonesKind::*;
        let (e, j) = match self {
            Full => (Arity::Exactly(4), 0),
            Diag => (Arity::Exactly(2), 0),
            Scale => (Arity::Exactly(1), 1),
            Mul2 | CMul2 | Subtract => (Arity::Exactly(0), 2),
            Mul3 => (Arity::Exactly(0), 3),
            Invert => (Arity::Exactly(0), 1),
            Rotation => (Arity::Exactly(1), 0),
            PointCoherence => (Arity::Exactly(4), 0),
            VisData(_) => (Arity::Exactly(0), 0),
            Sum => return (Arity::Exactly(0), Arity::AtLeast(1)),
        };
        (e, Arity::Exactly(j))
    }
}
