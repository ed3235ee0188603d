//! Variable resolution engine
//!
//! Resolves `{{name}}` templates and `:name` path parameters against an
//! [`ExecutionContext`], iteratively: after a pass substitutes values,
//! the result is re-scanned so variables may reference other variables.
//! A per-key visit counter guards against cycles.

pub mod builtins;
pub mod parser;

use std::collections::HashMap;

use crate::context::ExecutionContext;
use crate::error::VariableResolutionError;

use builtins::resolve_builtin;
use parser::parse_references;

/// How undefined references are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolvePolicy {
    /// Fail resolution with the offending name.
    Strict,
    /// Leave the literal reference in place and record the name.
    /// This is the default during preparation for source-document
    /// compatibility.
    #[default]
    Lenient,
}

/// The outcome of resolving one string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// The input with every resolvable reference substituted
    pub value: String,
    /// Names left unresolved under the lenient policy
    pub unresolved: Vec<String>,
}

impl Resolution {
    /// True when every reference was substituted.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }
}

/// Maximum times a single key may be substituted in one resolution.
const MAX_VISITS: u32 = 10;

/// Resolves template strings against a context.
#[derive(Debug)]
pub struct VariableResolver<'a> {
    context: &'a ExecutionContext,
    policy: ResolvePolicy,
}

impl<'a> VariableResolver<'a> {
    /// Creates a lenient resolver.
    #[must_use]
    pub fn new(context: &'a ExecutionContext) -> Self {
        Self {
            context,
            policy: ResolvePolicy::Lenient,
        }
    }

    /// Creates a strict resolver.
    #[must_use]
    pub fn strict(context: &'a ExecutionContext) -> Self {
        Self {
            context,
            policy: ResolvePolicy::Strict,
        }
    }

    /// Creates a resolver with an explicit policy.
    #[must_use]
    pub fn with_policy(context: &'a ExecutionContext, policy: ResolvePolicy) -> Self {
        Self { context, policy }
    }

    /// The active policy.
    #[must_use]
    pub const fn policy(&self) -> ResolvePolicy {
        self.policy
    }

    /// Resolves all references in the input.
    ///
    /// # Errors
    ///
    /// [`VariableResolutionError::Undefined`] under the strict policy,
    /// or [`VariableResolutionError::CycleOrDepth`] when a key is
    /// substituted more than the visit limit allows.
    pub fn resolve(&self, input: &str) -> Result<Resolution, VariableResolutionError> {
        let mut current = input.to_string();
        let mut visits: HashMap<String, u32> = HashMap::new();

        loop {
            let references = parse_references(&current);
            if references.is_empty() {
                return Ok(Resolution {
                    value: current,
                    unresolved: Vec::new(),
                });
            }

            let mut out = String::with_capacity(current.len());
            let mut last_end = 0;
            let mut substituted = false;
            let mut unresolved = Vec::new();

            for reference in &references {
                out.push_str(&current[last_end..reference.span.start]);

                let replacement = if reference.name.starts_with('$') {
                    resolve_builtin(&reference.name)
                } else {
                    self.context.get(&reference.name).map(str::to_string)
                };

                match replacement {
                    Some(value) => {
                        let count = visits.entry(reference.name.clone()).or_insert(0);
                        *count += 1;
                        if *count > MAX_VISITS {
                            return Err(VariableResolutionError::CycleOrDepth {
                                name: reference.name.clone(),
                                limit: MAX_VISITS,
                            });
                        }
                        out.push_str(&value);
                        substituted = true;
                    }
                    None => match self.policy {
                        ResolvePolicy::Strict => {
                            return Err(VariableResolutionError::Undefined {
                                name: reference.name.clone(),
                            });
                        }
                        ResolvePolicy::Lenient => {
                            out.push_str(&current[reference.span.clone()]);
                            unresolved.push(reference.name.clone());
                        }
                    },
                }

                last_end = reference.span.end;
            }

            out.push_str(&current[last_end..]);
            current = out;

            if !substituted {
                unresolved.dedup();
                return Ok(Resolution {
                    value: current,
                    unresolved,
                });
            }
        }
    }

    /// Resolves and returns just the value, discarding diagnostics.
    ///
    /// # Errors
    ///
    /// Same conditions as [`VariableResolver::resolve`].
    pub fn resolve_value(&self, input: &str) -> Result<String, VariableResolutionError> {
        self.resolve(input).map(|r| r.value)
    }
}

/// Standalone resolution for callers outside the execution pipeline.
/// Lenient: unresolved references stay literal.
///
/// # Errors
///
/// [`VariableResolutionError::CycleOrDepth`] on circular references.
pub fn resolve(
    template: &str,
    context: &ExecutionContext,
) -> Result<String, VariableResolutionError> {
    VariableResolver::new(context).resolve_value(template)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Scope;
    use pretty_assertions::assert_eq;

    fn context(pairs: &[(&str, &str)]) -> ExecutionContext {
        let mut ctx = ExecutionContext::new();
        for (k, v) in pairs {
            ctx.set(Scope::Collection, *k, *v);
        }
        ctx
    }

    #[test]
    fn test_no_references_is_identity() {
        let ctx = context(&[]);
        let resolver = VariableResolver::new(&ctx);
        let res = resolver.resolve("plain text, no templates").expect("resolves");
        assert_eq!(res.value, "plain text, no templates");
        assert!(res.is_complete());
    }

    #[test]
    fn test_simple_substitution() {
        let ctx = context(&[("host", "api.example.com")]);
        let resolver = VariableResolver::new(&ctx);
        assert_eq!(
            resolver.resolve_value("https://{{host}}/v1").expect("resolves"),
            "https://api.example.com/v1"
        );
    }

    #[test]
    fn test_two_pass_expansion() {
        let ctx = context(&[("a", "{{b}}"), ("b", "c")]);
        let resolver = VariableResolver::new(&ctx);
        assert_eq!(resolver.resolve_value("{{a}}").expect("resolves"), "c");
    }

    #[test]
    fn test_self_cycle_detected() {
        let ctx = context(&[("a", "{{a}}")]);
        let resolver = VariableResolver::new(&ctx);
        let err = resolver.resolve("{{a}}").expect_err("cycles");
        assert!(matches!(
            err,
            VariableResolutionError::CycleOrDepth { ref name, limit: 10 } if name == "a"
        ));
    }

    #[test]
    fn test_mutual_cycle_detected() {
        let ctx = context(&[("a", "{{b}}"), ("b", "{{a}}")]);
        let resolver = VariableResolver::new(&ctx);
        assert!(resolver.resolve("{{a}}").is_err());
    }

    #[test]
    fn test_lenient_leaves_literal_and_records() {
        let ctx = context(&[("known", "yes")]);
        let resolver = VariableResolver::new(&ctx);
        let res = resolver.resolve("{{known}}/{{unknown}}").expect("resolves");
        assert_eq!(res.value, "yes/{{unknown}}");
        assert_eq!(res.unresolved, vec!["unknown"]);
        assert!(!res.is_complete());
    }

    #[test]
    fn test_strict_fails_on_undefined() {
        let ctx = context(&[]);
        let resolver = VariableResolver::strict(&ctx);
        let err = resolver.resolve("{{missing}}").expect_err("undefined");
        assert!(matches!(
            err,
            VariableResolutionError::Undefined { ref name } if name == "missing"
        ));
    }

    #[test]
    fn test_path_param_resolution() {
        let ctx = context(&[("id", "42"), ("base", "https://api.x"), ("lim", "10")]);
        let resolver = VariableResolver::new(&ctx);
        assert_eq!(
            resolver
                .resolve_value("{{base}}/users/:id?limit={{lim}}")
                .expect("resolves"),
            "https://api.x/users/42?limit=10"
        );
    }

    #[test]
    fn test_resolved_value_with_colon_not_reexpanded() {
        // The substituted value itself contains ":tag", but it lands
        // after an identifier character so it is not a path parameter.
        let ctx = context(&[("ref", "image:tag")]);
        let resolver = VariableResolver::new(&ctx);
        assert_eq!(
            resolver.resolve_value("/pull/{{ref}}").expect("resolves"),
            "/pull/image:tag"
        );
    }

    #[test]
    fn test_builtin_guid() {
        let ctx = context(&[]);
        let resolver = VariableResolver::new(&ctx);
        let value = resolver.resolve_value("{{$guid}}").expect("resolves");
        assert!(uuid::Uuid::parse_str(&value).is_ok());
    }

    #[test]
    fn test_builtins_fresh_per_reference() {
        let ctx = context(&[]);
        let resolver = VariableResolver::new(&ctx);
        let value = resolver.resolve_value("{{$guid}} {{$guid}}").expect("resolves");
        let parts: Vec<&str> = value.split(' ').collect();
        assert_ne!(parts[0], parts[1]);
    }

    #[test]
    fn test_unknown_builtin_is_undefined() {
        let ctx = context(&[]);
        let strict = VariableResolver::strict(&ctx);
        assert!(strict.resolve("{{$bogus}}").is_err());

        let lenient = VariableResolver::new(&ctx);
        let res = lenient.resolve("{{$bogus}}").expect("resolves");
        assert_eq!(res.value, "{{$bogus}}");
    }

    #[test]
    fn test_idempotent_at_fixed_point() {
        let ctx = context(&[("a", "value")]);
        let resolver = VariableResolver::new(&ctx);
        let once = resolver.resolve_value("x-{{a}}-y").expect("resolves");
        let twice = resolver.resolve_value(&once).expect("resolves");
        assert_eq!(once, twice);
    }

    #[test]
    fn test_empty_string_value_substitutes() {
        let ctx = context(&[("blank", "")]);
        let resolver = VariableResolver::new(&ctx);
        assert_eq!(resolver.resolve_value("[{{blank}}]").expect("resolves"), "[]");
    }

    #[test]
    fn test_standalone_resolve_helper() {
        let mut ctx = ExecutionContext::new();
        ctx.set(Scope::Runtime, "token", "abc");
        assert_eq!(resolve("Bearer {{token}}", &ctx).expect("resolves"), "Bearer abc");
    }
}
