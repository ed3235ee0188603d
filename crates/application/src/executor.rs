//! Request execution engine
//!
//! The executor composes variable resolution, auth resolution and
//! request preparation into a pipeline, dispatches over the
//! [`Dispatcher`] port and collects results.
//!
//! Two batch modes:
//!
//! - **Sequential** walks the tree in depth-first pre-order with one
//!   mutable context threaded through every request, so hook writes to
//!   the `runtime` scope chain into later requests.
//! - **Parallel** flattens folder scopes into per-request context
//!   snapshots at enqueue time and bounds concurrency with a
//!   semaphore. Writes never cross workers; chained variables are the
//!   documented trade-off.
//!
//! No error unwinds out of request execution; every attempted request
//! produces an [`ExecutionResult`].

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, warn};

use convoy_domain::{Auth, Collection, Folder, Item, Request};

use crate::auth::resolve_effective_auth;
use crate::cancel::{CancellationReceiver, CancellationToken};
use crate::context::ExecutionContext;
use crate::dispatch::{DispatchOptions, Dispatcher};
use crate::error::TransportError;
use crate::extensions::RequestExtensions;
use crate::hooks::{Hooks, NoopHooks};
use crate::prepare::RequestPreparer;
use crate::resolver::ResolvePolicy;
use crate::results::{CollectionExecutionResult, ExecutionResult, FailureKind};

/// Hard ceiling on in-flight requests regardless of configuration.
pub const PARALLELISM_CAP: usize = 64;

/// Executor configuration.
#[derive(Debug, Clone, Copy)]
pub struct ExecutorOptions {
    /// Deadline per request
    pub timeout: std::time::Duration,
    /// Whether 3xx responses are followed
    pub follow_redirects: bool,
    /// Redirect ceiling
    pub max_redirects: u32,
    /// Whether server certificates are verified
    pub verify_tls: bool,
    /// Batch mode: parallel instead of sequential
    pub parallel: bool,
    /// In-flight bound for parallel mode
    pub max_parallelism: usize,
    /// Stop the batch at the first failed request
    pub stop_on_error: bool,
    /// Fail on undefined variables instead of leaving them literal
    pub strict_variables: bool,
    /// Treat hook failures as request failures
    pub strict_hooks: bool,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            timeout: crate::dispatch::DEFAULT_TIMEOUT,
            follow_redirects: true,
            max_redirects: crate::dispatch::DEFAULT_MAX_REDIRECTS,
            verify_tls: true,
            parallel: false,
            max_parallelism: 8,
            stop_on_error: false,
            strict_variables: false,
            strict_hooks: false,
        }
    }
}

impl ExecutorOptions {
    fn dispatch_options(self) -> DispatchOptions {
        DispatchOptions {
            timeout: self.timeout,
            follow_redirects: self.follow_redirects,
            max_redirects: self.max_redirects,
            verify_tls: self.verify_tls,
            proxy: None,
        }
    }

    const fn policy(self) -> ResolvePolicy {
        if self.strict_variables {
            ResolvePolicy::Strict
        } else {
            ResolvePolicy::Lenient
        }
    }

    fn effective_parallelism(self) -> usize {
        self.max_parallelism.clamp(1, PARALLELISM_CAP)
    }
}

/// Orchestrates single-request, folder and collection execution.
pub struct Executor<D> {
    dispatcher: Arc<D>,
    options: ExecutorOptions,
    hooks: Arc<dyn Hooks>,
    cancel: CancellationToken,
}

impl<D: Dispatcher + 'static> Executor<D> {
    /// Creates an executor with default options and no-op hooks.
    #[must_use]
    pub fn new(dispatcher: Arc<D>) -> Self {
        Self {
            dispatcher,
            options: ExecutorOptions::default(),
            hooks: Arc::new(NoopHooks),
            cancel: CancellationToken::new(),
        }
    }

    /// Replaces the options.
    #[must_use]
    pub fn with_options(mut self, options: ExecutorOptions) -> Self {
        self.options = options;
        self
    }

    /// Installs hook callbacks.
    #[must_use]
    pub fn with_hooks(mut self, hooks: Arc<dyn Hooks>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Uses a caller-provided cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// A handle to this executor's cancellation token.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// The active options.
    #[must_use]
    pub const fn options(&self) -> &ExecutorOptions {
        &self.options
    }

    /// Releases network resources. Pending dispatches on other handles
    /// of the dispatcher keep it alive until they finish or cancel.
    pub fn dispose(self) {
        self.cancel.cancel();
        drop(self.dispatcher);
    }

    /// Executes one request against the given context.
    ///
    /// Only the request's own auth declaration applies here; place the
    /// request in a collection and use the batch operations for
    /// hierarchical inheritance.
    pub async fn execute_request(
        &self,
        request: &Request,
        context: &mut ExecutionContext,
        extensions: Option<&RequestExtensions>,
    ) -> ExecutionResult {
        context.enter_request(&request.variables);
        let effective = resolve_effective_auth(request, &[], None);
        run_single(
            &self.dispatcher,
            &self.hooks,
            self.options,
            request,
            effective.auth,
            context,
            extensions,
            self.cancel.subscribe(),
            self.cancel.subscribe(),
        )
        .await
    }

    /// Executes every request in the collection.
    ///
    /// When `context` is `None`, one is created from the collection's
    /// variables; a provided context gets the collection variables
    /// seeded underneath anything already set.
    pub async fn execute_collection(
        &self,
        collection: &Collection,
        context: Option<ExecutionContext>,
    ) -> CollectionExecutionResult {
        let mut context = context.unwrap_or_default();
        context.seed_collection(&collection.variables);

        let entries: Vec<Entry<'_>> = collection
            .walk_requests()
            .map(|e| Entry {
                request: e.request,
                ancestors: e.ancestors,
            })
            .collect();

        self.execute_entries(&collection.info.name, collection, entries, context)
            .await
    }

    /// Executes every request under the named folder.
    ///
    /// The folder is located depth-first; its ancestor folders
    /// contribute variable scopes and participate in auth inheritance
    /// exactly as a full collection run would.
    pub async fn execute_folder(
        &self,
        collection: &Collection,
        folder_name: &str,
        context: Option<ExecutionContext>,
    ) -> Result<CollectionExecutionResult, convoy_domain::DomainError> {
        let chain = folder_chain(&collection.items, folder_name).ok_or_else(|| {
            convoy_domain::DomainError::FolderNotFound(folder_name.to_string())
        })?;

        let mut context = context.unwrap_or_default();
        context.seed_collection(&collection.variables);

        let target = chain[chain.len() - 1];
        let entries: Vec<Entry<'_>> = convoy_domain::walk::RequestWalk::new(&target.items)
            .map(|e| {
                let mut ancestors = chain.clone();
                ancestors.extend(e.ancestors);
                Entry {
                    request: e.request,
                    ancestors,
                }
            })
            .collect();

        Ok(self
            .execute_entries(folder_name, collection, entries, context)
            .await)
    }

    async fn execute_entries(
        &self,
        name: &str,
        collection: &Collection,
        entries: Vec<Entry<'_>>,
        context: ExecutionContext,
    ) -> CollectionExecutionResult {
        let batch_start = Instant::now();
        let mut aggregate = CollectionExecutionResult::new(name);

        if self.options.parallel {
            self.run_parallel(collection, entries, &context, &mut aggregate)
                .await;
        } else {
            self.run_sequential(collection, entries, context, &mut aggregate)
                .await;
        }

        aggregate.total_time = batch_start.elapsed();
        debug!(
            batch = name,
            total = aggregate.total_requests(),
            failed = aggregate.failed(),
            "batch finished"
        );
        aggregate
    }

    async fn run_sequential(
        &self,
        collection: &Collection,
        entries: Vec<Entry<'_>>,
        mut context: ExecutionContext,
        aggregate: &mut CollectionExecutionResult,
    ) {
        let mut open: Vec<&Folder> = Vec::new();

        for entry in &entries {
            if self.cancel.is_cancelled() {
                aggregate.stopped_early = true;
                break;
            }

            // Re-point the folder scope stack at this entry's trail:
            // pop what is no longer an ancestor, push what is new.
            while !is_prefix(&open, &entry.ancestors) {
                open.pop();
                context.pop_folder();
            }
            for folder in &entry.ancestors[open.len()..] {
                context.push_folder(&folder.variables);
                open.push(folder);
            }
            context.enter_request(&entry.request.variables);

            let effective =
                resolve_effective_auth(entry.request, &entry.ancestors, collection.auth.as_ref());
            let result = run_single(
                &self.dispatcher,
                &self.hooks,
                self.options,
                entry.request,
                effective.auth,
                &mut context,
                None,
                self.cancel.subscribe(),
                self.cancel.subscribe(),
            )
            .await;

            let failed = !result.success();
            aggregate.results.push(result);

            if failed && self.options.stop_on_error {
                aggregate.stopped_early = true;
                break;
            }
        }
    }

    async fn run_parallel(
        &self,
        collection: &Collection,
        entries: Vec<Entry<'_>>,
        context: &ExecutionContext,
        aggregate: &mut CollectionExecutionResult,
    ) {
        // First failure under stop_on_error trips this batch token;
        // the caller's own token stays untouched.
        let batch_cancel = CancellationToken::new();
        let semaphore = Arc::new(Semaphore::new(self.options.effective_parallelism()));
        let (tx, mut rx) = mpsc::unbounded_channel::<Option<ExecutionResult>>();

        let total = entries.len();
        for entry in entries {
            // Folder scopes flatten into the worker's context now, so
            // completion order is unconstrained by tree order.
            let mut worker_context = context.snapshot();
            for folder in &entry.ancestors {
                worker_context.push_folder(&folder.variables);
            }
            worker_context.enter_request(&entry.request.variables);

            let effective =
                resolve_effective_auth(entry.request, &entry.ancestors, collection.auth.as_ref());
            let job = Job {
                request: entry.request.clone(),
                auth: effective.auth.cloned(),
                context: worker_context,
            };

            let dispatcher = Arc::clone(&self.dispatcher);
            let hooks = Arc::clone(&self.hooks);
            let options = self.options;
            let semaphore = Arc::clone(&semaphore);
            let caller_rx = self.cancel.subscribe();
            let batch_rx = batch_cancel.subscribe();
            let tx = tx.clone();

            tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire().await else {
                    let _ = tx.send(None);
                    return;
                };
                // A request that has not started when the batch stops
                // is skipped entirely, not reported as cancelled.
                if caller_rx.is_cancelled() || batch_rx.is_cancelled() {
                    let _ = tx.send(None);
                    return;
                }

                let mut context = job.context;
                let result = run_single(
                    &dispatcher,
                    &hooks,
                    options,
                    &job.request,
                    job.auth.as_ref(),
                    &mut context,
                    None,
                    caller_rx,
                    batch_rx,
                )
                .await;
                let _ = tx.send(Some(result));
            });
        }
        drop(tx);

        let mut received = 0;
        while received < total {
            let Some(outcome) = rx.recv().await else {
                break;
            };
            received += 1;
            match outcome {
                Some(result) => {
                    let failed = !result.success();
                    aggregate.results.push(result);
                    if failed && self.options.stop_on_error {
                        batch_cancel.cancel();
                        aggregate.stopped_early = true;
                    }
                }
                None => {
                    aggregate.stopped_early = true;
                }
            }
        }
    }
}

/// A request plus its ancestor trail, borrowed from the tree.
struct Entry<'a> {
    request: &'a Request,
    ancestors: Vec<&'a Folder>,
}

/// Owned per-worker inputs for parallel mode.
struct Job {
    request: Request,
    auth: Option<Auth>,
    context: ExecutionContext,
}

fn is_prefix(open: &[&Folder], ancestors: &[&Folder]) -> bool {
    open.len() <= ancestors.len()
        && open
            .iter()
            .zip(ancestors)
            .all(|(a, b)| std::ptr::eq(*a, *b))
}

/// Finds the path of folders from the root down to the named folder.
fn folder_chain<'a>(items: &'a [Item], name: &str) -> Option<Vec<&'a Folder>> {
    for item in items {
        if let Item::Folder(folder) = item {
            if folder.name == name {
                return Some(vec![folder]);
            }
            if let Some(mut chain) = folder_chain(&folder.items, name) {
                chain.insert(0, folder);
                return Some(chain);
            }
        }
    }
    None
}

/// Runs one request through the whole state machine:
/// hooks, preparation, dispatch, hooks again, result assembly.
#[allow(clippy::too_many_arguments)]
async fn run_single<D: Dispatcher>(
    dispatcher: &Arc<D>,
    hooks: &Arc<dyn Hooks>,
    options: ExecutorOptions,
    request: &Request,
    effective_auth: Option<&Auth>,
    context: &mut ExecutionContext,
    extensions: Option<&RequestExtensions>,
    mut caller_cancel: CancellationReceiver,
    mut batch_cancel: CancellationReceiver,
) -> ExecutionResult {
    let started_at = Utc::now();
    let start = Instant::now();
    let mut diagnostics = Vec::new();

    // Prerequest hook, before any resolution so its writes are seen.
    if let Err(hook_error) = hooks.on_prerequest(request, context) {
        if options.strict_hooks {
            return ExecutionResult::failed(
                &request.name,
                format!("hook for request '{}' failed: {hook_error}", request.name),
                FailureKind::Hook,
                diagnostics,
                start.elapsed(),
                started_at,
            );
        }
        diagnostics.push(hook_error.to_string());
    }

    // Preparing.
    let preparer = RequestPreparer::new(options.policy());
    let prepared = match preparer.prepare(request, effective_auth, context, extensions) {
        Ok(prepared) => prepared,
        Err(error) => {
            warn!(request = %request.name, %error, "preparation failed");
            return ExecutionResult::failed(
                &request.name,
                format!("preparation of request '{}' failed: {error}", request.name),
                FailureKind::from(&error),
                diagnostics,
                start.elapsed(),
                started_at,
            );
        }
    };
    diagnostics.extend(prepared.diagnostics);

    let mut dispatch_options = options.dispatch_options();
    if let Some(timeout) = prepared.wire.timeout {
        dispatch_options.timeout = timeout;
    }

    // Dispatching, raced against both cancellation signals.
    debug!(request = %request.name, url = %prepared.wire.url, "dispatching");
    let outcome = tokio::select! {
        result = dispatcher.dispatch(&prepared.wire, &dispatch_options) => result,
        () = caller_cancel.cancelled() => Err(TransportError::Cancelled),
        () = batch_cancel.cancelled() => Err(TransportError::Cancelled),
    };

    let response = match outcome {
        Ok(response) => response,
        Err(error) => {
            warn!(request = %request.name, %error, "dispatch failed");
            return ExecutionResult::failed(
                &request.name,
                format!("dispatch of request '{}' failed: {error}", request.name),
                FailureKind::from(&error),
                diagnostics,
                start.elapsed(),
                started_at,
            );
        }
    };

    // Scripting: test hook failures demote to diagnostics unless strict.
    if let Err(hook_error) = hooks.on_test(request, &response, context) {
        if options.strict_hooks {
            return ExecutionResult::failed(
                &request.name,
                format!("hook for request '{}' failed: {hook_error}", request.name),
                FailureKind::Hook,
                diagnostics,
                start.elapsed(),
                started_at,
            );
        }
        diagnostics.push(hook_error.to_string());
    }

    ExecutionResult::ok(
        &request.name,
        response,
        diagnostics,
        start.elapsed(),
        started_at,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_match_contract() {
        let options = ExecutorOptions::default();
        assert_eq!(options.timeout.as_millis(), 30_000);
        assert!(options.follow_redirects);
        assert_eq!(options.max_redirects, 10);
        assert!(options.verify_tls);
        assert!(!options.parallel);
        assert_eq!(options.max_parallelism, 8);
        assert!(!options.stop_on_error);
        assert!(!options.strict_variables);
        assert!(!options.strict_hooks);
    }

    #[test]
    fn test_parallelism_clamped() {
        let starved = ExecutorOptions {
            max_parallelism: 0,
            ..ExecutorOptions::default()
        };
        assert_eq!(starved.effective_parallelism(), 1);

        let greedy = ExecutorOptions {
            max_parallelism: 10_000,
            ..ExecutorOptions::default()
        };
        assert_eq!(greedy.effective_parallelism(), PARALLELISM_CAP);
    }

    #[test]
    fn test_folder_chain_nested() {
        let collection = Collection::new("c").with_item(Item::Folder(
            Folder::new("outer").with_item(Item::Folder(
                Folder::new("inner").with_item(Item::Request(Request::new("r"))),
            )),
        ));

        let chain = folder_chain(&collection.items, "inner").expect("found");
        let names: Vec<&str> = chain.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["outer", "inner"]);

        assert!(folder_chain(&collection.items, "absent").is_none());
    }
}
