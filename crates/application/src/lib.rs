//! Convoy Application - the execution core
//!
//! Composes three subsystems into a request execution pipeline:
//!
//! 1. **Variable resolution** over a layered scope store with template
//!    expansion, dynamic built-ins and cycle protection.
//! 2. **Hierarchical auth resolution** folding collection, folder and
//!    request declarations, then rendering the winner onto the wire.
//! 3. **The executor**, which prepares, dispatches and collects
//!    results for single requests, folders and whole collections, in
//!    sequential or parallel mode with cancellation and structured
//!    failure reporting.
//!
//! HTTP itself is behind the [`Dispatcher`] port; the reqwest adapter
//! lives in the infrastructure crate.

pub mod auth;
pub mod cancel;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod executor;
pub mod extensions;
pub mod hooks;
pub mod prepare;
pub mod resolver;
pub mod results;

pub use auth::{AuthSource, EffectiveAuth, resolve_effective_auth};
pub use cancel::{CancellationReceiver, CancellationToken};
pub use context::{ExecutionContext, Scope};
pub use dispatch::{DispatchOptions, Dispatcher, HttpResponse};
pub use error::{
    AuthConfigError, BodyEncodingError, HookError, HookPhase, PrepareError, TransportError,
    VariableResolutionError,
};
pub use executor::{Executor, ExecutorOptions, PARALLELISM_CAP};
pub use extensions::RequestExtensions;
pub use hooks::{Hooks, NoopHooks};
pub use prepare::{
    MultipartField, MultipartValue, PreparedRequest, RequestPreparer, WireBody, WireRequest,
};
pub use resolver::{ResolvePolicy, Resolution, VariableResolver, resolve};
pub use results::{CollectionExecutionResult, ExecutionResult, FailureKind};
