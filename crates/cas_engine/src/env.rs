//! Calculation environment: the three services the core consumes from its
//! host (cancellation, named-constant registry, diagnostics).

use std::cell::RefCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cas_ast::{Assumption, Constant, Context, ExprId};
use cas_math::Interrupt;

use crate::error::CasError;

/// Name of the auxiliary integer index used in periodic solutions.
pub const INDEX_VARIABLE: &str = "n";

/// Shared cancellation flag. Cloning shares the flag.
#[derive(Clone, Debug, Default)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; safe to call from another thread.
    pub fn abort(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Non-fatal advisory produced while computing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A divisor was assumed nonzero without a side condition
    AssumedNonzero(String),
    /// A branch was answered with floating-point approximations
    Approximated(String),
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::AssumedNonzero(e) => write!(f, "assumed {} != 0", e),
            Diagnostic::Approximated(e) => write!(f, "approximated {}", e),
        }
    }
}

#[derive(Debug, Default)]
pub struct CalcEnv {
    abort: AbortHandle,
    diagnostics: RefCell<Vec<Diagnostic>>,
}

impl CalcEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_abort(abort: AbortHandle) -> Self {
        Self {
            abort,
            diagnostics: RefCell::default(),
        }
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    #[inline]
    pub fn is_aborted(&self) -> bool {
        self.abort.is_aborted()
    }

    #[inline]
    pub fn check_abort(&self) -> Result<(), CasError> {
        if self.is_aborted() {
            Err(CasError::Aborted)
        } else {
            Ok(())
        }
    }

    /// Registry lookup: `pi`, `e`, `i` and the integer index variable `n`.
    pub fn lookup(&self, ctx: &mut Context, name: &str) -> Option<ExprId> {
        match name {
            "pi" => Some(ctx.constant(Constant::Pi)),
            "e" => Some(ctx.constant(Constant::E)),
            "i" => Some(ctx.constant(Constant::I)),
            INDEX_VARIABLE => Some(ctx.var_with(INDEX_VARIABLE, Assumption::Integer)),
            _ => None,
        }
    }

    pub fn report(&self, diagnostic: Diagnostic) {
        tracing::warn!(diagnostic = %diagnostic, "calc_diagnostic");
        self.diagnostics.borrow_mut().push(diagnostic);
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.borrow().clone()
    }

    pub fn take_diagnostics(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.diagnostics.borrow_mut())
    }
}

impl Interrupt for CalcEnv {
    #[inline]
    fn interrupted(&self) -> bool {
        self.is_aborted()
    }
}
