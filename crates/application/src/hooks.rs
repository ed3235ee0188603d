//! Hook interface
//!
//! Callers may observe the request lifecycle and read or write the
//! `runtime` variable scope. The core never evaluates the script text
//! attached to requests; a hook implementation is free to do so.
//!
//! Hooks run on the worker executing the request. Failures are
//! recorded as diagnostics unless `strict_hooks` is set in the
//! executor options.

use convoy_domain::Request;

use crate::context::ExecutionContext;
use crate::dispatch::HttpResponse;
use crate::error::HookError;

/// Lifecycle callbacks around request execution.
pub trait Hooks: Send + Sync {
    /// Runs before the request is prepared. May write variables that
    /// the request's templates then see.
    ///
    /// # Errors
    ///
    /// A [`HookError`] describing the failure; fatal only under
    /// `strict_hooks`.
    fn on_prerequest(
        &self,
        request: &Request,
        context: &mut ExecutionContext,
    ) -> Result<(), HookError> {
        let _ = (request, context);
        Ok(())
    }

    /// Runs after the response arrives. Writes to the `runtime` scope
    /// are visible to later requests in sequential mode.
    ///
    /// # Errors
    ///
    /// A [`HookError`] describing the failure; fatal only under
    /// `strict_hooks`.
    fn on_test(
        &self,
        request: &Request,
        response: &HttpResponse,
        context: &mut ExecutionContext,
    ) -> Result<(), HookError> {
        let _ = (request, response, context);
        Ok(())
    }
}

/// A hook implementation that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHooks;

impl Hooks for NoopHooks {}
