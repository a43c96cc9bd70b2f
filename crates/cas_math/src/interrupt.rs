//! Cooperative cancellation hook.
//!
//! Long-running loops poll an [`Interrupt`] (passed as `&dyn Interrupt`) and
//! unwind with `PolyError::Interrupted` once it fires.

use crate::error::PolyError;

pub trait Interrupt {
    fn interrupted(&self) -> bool;

    /// `Err(Interrupted)` once the flag is set.
    #[inline]
    fn check(&self) -> Result<(), PolyError> {
        if self.interrupted() {
            Err(PolyError::Interrupted)
        } else {
            Ok(())
        }
    }
}

/// Never fires.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInterrupt;

impl Interrupt for NoInterrupt {
    #[inline]
    fn interrupted(&self) -> bool {
        false
    }
}

impl<F: Fn() -> bool> Interrupt for F {
    #[inline]
    fn interrupted(&self) -> bool {
        self()
    }
}
