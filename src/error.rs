// Copyright (c) 2022, Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Collection of errors to be used in fastmsm.
//!
//! The MSM entry points validate their arguments and return an indicative error on
//! malformed inputs. Once inside the compute kernel everything is deterministic pure
//! arithmetic over trusted data, so internal invariant violations are programmer
//! errors and assert rather than returning a wrong group element.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type MsmResult<T> = Result<T, MsmError>;

/// Collection of errors to be used in fastmsm.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum MsmError {
    /// Invalid value was given to the function.
    #[error("Invalid value was given to the function")]
    InvalidInput,

    /// Parallel input arrays do not agree on their length.
    #[error("Expected inputs of matching length, got {0} and {1}")]
    MismatchedLengths(usize, usize),

    /// A deserialized point is not on the curve.
    #[error("Point is not on the curve")]
    PointNotOnCurve,

    /// I/O failure while reading or writing fixture data.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for MsmError {
    fn from(e: std::io::Error) -> Self {
        MsmError::Io(e.to_string())
    }
}

impl From<ark_serialize::SerializationError> for MsmError {
    fn from(e: ark_serialize::SerializationError) -> Self {
        match e {
            ark_serialize::SerializationError::IoError(e) => MsmError::Io(e.to_string()),
            _ => MsmError::InvalidInput,
        }
    }
}
