// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with solution-interval bookkeeping.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IntervalError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(#[from] InvalidConfiguration),

    /// An input array did not have the shape required by the interval
    /// geometry. Nothing is mutated when this is returned.
    #[error("The {array} array has shape {found:?}, but {expected} was expected")]
    ShapeMismatch {
        array: &'static str,
        expected: String,
        found: Vec<usize>,
    },

    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),
}

#[derive(Error, Debug, PartialEq)]
pub enum InvalidConfiguration {
    #[error("The '{option}' option must be a positive integer; got {value}")]
    NonPositiveInterval { option: &'static str, value: i64 },

    #[error("The '{option}' option must be positive and finite; got {value}")]
    NonPositiveEps { option: &'static str, value: f64 },

    #[error("The {dim} extent of the model array is 0; all extents must be at least 1")]
    ZeroExtent { dim: &'static str },

    #[error("The model array shape must have 8 dimensions, but has {0}")]
    ModelRank(usize),

    #[error("The model array shape has mismatched {dim} dimensions ({first} vs {second})")]
    ModelDims {
        dim: &'static str,
        first: usize,
        second: usize,
    },

    #[error("The {axis} axis has {found} values, but the model array has {expected} samples along it")]
    AxisLength {
        axis: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Invalid flag layout: {0}")]
    FlagLayout(String),
}
