//! Hierarchical authentication resolution
//!
//! An item's effective auth is the nearest ancestor-or-self
//! declaration. An explicit `noauth` declaration is itself a decision:
//! it stops the walk and disables inheritance from levels above it.

pub mod apply;

use convoy_domain::{Auth, Folder, Request};

/// Where in the hierarchy the effective auth was decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthSource {
    /// Decided by the request itself
    Request,
    /// Decided by a folder; depth 1 is the immediate parent
    Folder {
        /// Distance from the request, nearest first
        depth: usize,
    },
    /// Decided at the collection level
    Collection,
    /// No declaration anywhere on the path
    None,
}

/// The outcome of walking the ancestor chain.
#[derive(Debug, Clone, Copy)]
pub struct EffectiveAuth<'a> {
    /// The auth to apply; `None` when nothing applies, including the
    /// explicit `noauth` case
    pub auth: Option<&'a Auth>,
    /// The level that decided
    pub source: AuthSource,
}

impl EffectiveAuth<'_> {
    /// True when some auth will actually be rendered onto the wire.
    #[must_use]
    pub const fn applies(&self) -> bool {
        self.auth.is_some()
    }
}

/// Resolves the effective auth for a request.
///
/// `ancestors` is the folder path from the collection root down to the
/// request's immediate parent, as produced by the tree walk.
#[must_use]
pub fn resolve_effective_auth<'a>(
    request: &'a Request,
    ancestors: &[&'a Folder],
    collection_auth: Option<&'a Auth>,
) -> EffectiveAuth<'a> {
    if let Some(auth) = &request.auth {
        return decided(auth, AuthSource::Request);
    }

    for (depth, folder) in ancestors.iter().rev().enumerate() {
        if let Some(auth) = &folder.auth {
            return decided(auth, AuthSource::Folder { depth: depth + 1 });
        }
    }

    if let Some(auth) = collection_auth {
        return decided(auth, AuthSource::Collection);
    }

    EffectiveAuth {
        auth: None,
        source: AuthSource::None,
    }
}

const fn decided(auth: &Auth, source: AuthSource) -> EffectiveAuth<'_> {
    EffectiveAuth {
        auth: if auth.is_noauth() { None } else { Some(auth) },
        source,
    }
}
