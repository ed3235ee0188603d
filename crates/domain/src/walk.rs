//! Depth-first traversal over the collection tree
//!
//! The tree stores only forward edges, so the walk carries the folder
//! trail itself and hands each request its ancestor path, outermost
//! folder first.

use crate::collection::{Folder, Item};
use crate::request::Request;

/// A request paired with its ancestor folders, outermost first.
#[derive(Debug, Clone)]
pub struct RequestEntry<'a> {
    /// The request itself
    pub request: &'a Request,
    /// Ancestor folders from the collection root down to the immediate parent
    pub ancestors: Vec<&'a Folder>,
}

impl RequestEntry<'_> {
    /// The names along the path, outermost folder first, request last.
    #[must_use]
    pub fn path(&self) -> Vec<&str> {
        self.ancestors
            .iter()
            .map(|f| f.name.as_str())
            .chain(std::iter::once(self.request.name.as_str()))
            .collect()
    }
}

/// Lazy depth-first pre-order iterator over all requests in a tree.
pub struct RequestWalk<'a> {
    // Each frame is a slice of siblings and a cursor into it. The trail
    // holds the folder that owns each frame past the first.
    frames: Vec<std::slice::Iter<'a, Item>>,
    trail: Vec<&'a Folder>,
}

impl<'a> RequestWalk<'a> {
    /// Starts a walk over the given root items.
    #[must_use]
    pub fn new(items: &'a [Item]) -> Self {
        Self {
            frames: vec![items.iter()],
            trail: Vec::new(),
        }
    }
}

impl<'a> Iterator for RequestWalk<'a> {
    type Item = RequestEntry<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let frame = self.frames.last_mut()?;
            match frame.next() {
                Some(Item::Request(request)) => {
                    return Some(RequestEntry {
                        request,
                        ancestors: self.trail.clone(),
                    });
                }
                Some(Item::Folder(folder)) => {
                    self.trail.push(folder);
                    self.frames.push(folder.items.iter());
                }
                None => {
                    self.frames.pop();
                    if !self.frames.is_empty() {
                        self.trail.pop();
                    } else {
                        return None;
                    }
                }
            }
        }
    }
}
