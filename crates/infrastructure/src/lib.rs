//! Convoy Infrastructure - adapters around the execution core
//!
//! Two adapters live here:
//!
//! - [`ReqwestDispatcher`], the production implementation of the
//!   dispatcher port.
//! - The collection loader, which reads Postman v2.0/v2.1 documents
//!   into the domain tree.

pub mod dispatcher;
pub mod loader;

pub use dispatcher::ReqwestDispatcher;
pub use loader::{
    LoadError, load_collection_from_path, load_collection_from_slice, load_collection_from_value,
};
