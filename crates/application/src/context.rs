//! Execution context
//!
//! A layered variable store with six named scopes. Storage is disjoint;
//! precedence is imposed only at lookup time:
//!
//! `runtime` > `request` > innermost folder > ... > outermost folder >
//! `collection` > `environment` > `global`
//!
//! The folder level is a stack so nested folder traversal can push and
//! pop scopes. The `runtime` scope is the only one hooks write to
//! during execution; in sequential mode those writes are visible to
//! later requests, which is how response-token chaining works.

use std::collections::HashMap;

use convoy_domain::Variable;

/// The named scope levels of an [`ExecutionContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Lowest precedence, caller-provided
    Global,
    /// Environment file level
    Environment,
    /// Collection-declared variables
    Collection,
    /// The innermost folder frame
    Folder,
    /// Request-declared variables
    Request,
    /// Highest precedence; written by hooks at run time
    Runtime,
}

/// The layered variable store threaded through request execution.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    global: HashMap<String, String>,
    environment: HashMap<String, String>,
    collection: HashMap<String, String>,
    folders: Vec<HashMap<String, String>>,
    request: HashMap<String, String>,
    runtime: HashMap<String, String>,
}

impl ExecutionContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the environment scope.
    #[must_use]
    pub fn with_environment(mut self, vars: HashMap<String, String>) -> Self {
        self.environment = vars;
        self
    }

    /// Seeds the global scope.
    #[must_use]
    pub fn with_globals(mut self, vars: HashMap<String, String>) -> Self {
        self.global = vars;
        self
    }

    /// Seeds the collection scope from declared variables, skipping
    /// disabled entries.
    #[must_use]
    pub fn with_collection_variables(mut self, vars: &[Variable]) -> Self {
        self.collection = scope_map(vars);
        self
    }

    /// Writes one key into the named scope. Writing to [`Scope::Folder`]
    /// targets the innermost frame, creating one if none is open.
    pub fn set(&mut self, scope: Scope, key: impl Into<String>, value: impl Into<String>) {
        let map = match scope {
            Scope::Global => &mut self.global,
            Scope::Environment => &mut self.environment,
            Scope::Collection => &mut self.collection,
            Scope::Folder => {
                if self.folders.is_empty() {
                    self.folders.push(HashMap::new());
                }
                match self.folders.last_mut() {
                    Some(frame) => frame,
                    None => return,
                }
            }
            Scope::Request => &mut self.request,
            Scope::Runtime => &mut self.runtime,
        };
        map.insert(key.into(), value.into());
    }

    /// Looks a key up across all scopes in precedence order.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.runtime
            .get(key)
            .or_else(|| self.request.get(key))
            .or_else(|| self.folders.iter().rev().find_map(|frame| frame.get(key)))
            .or_else(|| self.collection.get(key))
            .or_else(|| self.environment.get(key))
            .or_else(|| self.global.get(key))
            .map(String::as_str)
    }

    /// Returns true if the key exists in any scope.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Fills the collection scope from declared variables without
    /// overwriting anything the caller already set there.
    pub fn seed_collection(&mut self, vars: &[Variable]) {
        for var in vars.iter().filter(|v| v.enabled) {
            self.collection
                .entry(var.key.clone())
                .or_insert_with(|| var.value.clone());
        }
    }

    /// Opens a folder frame seeded from declared variables, skipping
    /// disabled entries.
    pub fn push_folder(&mut self, vars: &[Variable]) {
        self.folders.push(scope_map(vars));
    }

    /// Closes the innermost folder frame.
    pub fn pop_folder(&mut self) {
        self.folders.pop();
    }

    /// The number of open folder frames.
    #[must_use]
    pub fn folder_depth(&self) -> usize {
        self.folders.len()
    }

    /// Replaces the request scope from declared variables, skipping
    /// disabled entries.
    pub fn enter_request(&mut self, vars: &[Variable]) {
        self.request = scope_map(vars);
    }

    /// Empties one scope. Clearing [`Scope::Folder`] drops every frame.
    pub fn clear(&mut self, scope: Scope) {
        match scope {
            Scope::Global => self.global.clear(),
            Scope::Environment => self.environment.clear(),
            Scope::Collection => self.collection.clear(),
            Scope::Folder => self.folders.clear(),
            Scope::Request => self.request.clear(),
            Scope::Runtime => self.runtime.clear(),
        }
    }

    /// An immutable copy for a parallel worker: every scope except
    /// `runtime`, which starts fresh so writes never cross workers.
    #[must_use]
    pub fn snapshot(&self) -> Self {
        Self {
            global: self.global.clone(),
            environment: self.environment.clone(),
            collection: self.collection.clone(),
            folders: self.folders.clone(),
            request: self.request.clone(),
            runtime: HashMap::new(),
        }
    }

    /// All variables merged with precedence applied, for callers that
    /// want a flat view.
    #[must_use]
    pub fn merged(&self) -> HashMap<String, String> {
        let mut merged = self.global.clone();
        merged.extend(self.environment.clone());
        merged.extend(self.collection.clone());
        for frame in &self.folders {
            merged.extend(frame.clone());
        }
        merged.extend(self.request.clone());
        merged.extend(self.runtime.clone());
        merged
    }
}

fn scope_map(vars: &[Variable]) -> HashMap<String, String> {
    vars.iter()
        .filter(|v| v.enabled)
        .map(|v| (v.key.clone(), v.value.clone()))
        .collect()
}
