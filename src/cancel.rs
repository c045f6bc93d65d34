// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Cooperative cancellation.  The requester owns a
//! [`CancellationToken`], hands a reference to whichever generator it
//! starts, and may flip it from any thread.  Generators only ever read
//! it, at their own safe points, and report back through
//! [`Generated`] whether they ran to the end.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A shared, set-once flag.  Clones observe the same flag.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// A fresh, unset token.
    pub fn new() -> Self {
        CancellationToken(Arc::new(AtomicBool::new(false)))
    }

    /// Ask every generator observing this token to stop.  There is no
    /// way to un-cancel; start the next generation with a new token.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Has anyone asked us to stop?
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// How a generation finished.  Both arms carry the output; for
/// `Cancelled` it is whatever the generator had accumulated, which for
/// some generators is nothing at all.  A cancelled result is never
/// fit for display.
#[derive(Clone, Debug, PartialEq)]
pub enum Generated<T> {
    /// Ran to the end.
    Complete(T),
    /// Stopped early because the token was set.
    Cancelled(T),
}

impl<T> Generated<T> {
    /// True if the token stopped the generation.
    pub fn is_cancelled(&self) -> bool {
        match self {
            Generated::Cancelled(_) => true,
            Generated::Complete(_) => false,
        }
    }

    /// True if the generation ran to the end.
    pub fn is_complete(&self) -> bool {
        !self.is_cancelled()
    }

    /// Borrow the output, complete or not.
    pub fn get(&self) -> &T {
        match self {
            Generated::Complete(t) | Generated::Cancelled(t) => t,
        }
    }

    /// Take the output, complete or not.
    pub fn into_inner(self) -> T {
        match self {
            Generated::Complete(t) | Generated::Cancelled(t) => t,
        }
    }

    /// The output, but only if the generation completed.
    pub fn complete(self) -> Option<T> {
        match self {
            Generated::Complete(t) => Some(t),
            Generated::Cancelled(_) => None,
        }
    }

    /// Transform the output while keeping the completion mode.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Generated<U> {
        match self {
            Generated::Complete(t) => Generated::Complete(f(t)),
            Generated::Cancelled(t) => Generated::Cancelled(f(t)),
        }
    }
}
