// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The error taxonomy shared by every generator.  Cancellation is not
//! in here: a cancelled generation is a normal completion mode, see
//! [`Generated`](crate::Generated).

use failure::Fail;

/// Everything that can make a generation request fail outright.
#[derive(Debug, Fail, Clone, PartialEq)]
pub enum FractalError {
    /// The caller handed us parameters we cannot work with: an empty
    /// transform set, a degenerate plane, a negative order, and so on.
    /// The engine that returned this is left exactly as it was.
    #[fail(display = "Invalid input: {}", reason)]
    InvalidInput {
        /// Human-readable description of what was wrong.
        reason: String,
    },

    /// One of the buffer conversion workers panicked.
    #[fail(display = "A conversion worker thread panicked")]
    WorkerPanicked,
}

impl FractalError {
    pub(crate) fn invalid<S: Into<String>>(reason: S) -> Self {
        FractalError::InvalidInput {
            reason: reason.into(),
        }
    }
}

/// Shorthand used throughout the crate.
pub type Result<T> = std::result::Result<T, FractalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_input_displays_its_reason() {
        let e = FractalError::invalid("width must be positive");
        assert_eq!(format!("{}", e), "Invalid input: width must be positive");
    }
}
