//! Host page model
//!
//! The page a viewer lives in: elements addressable by id, their `data-*`
//! attributes, canvas state, and the location relative URLs resolve against.

mod page;

pub use page::{HostElement, HostError, HostPage, dataset_attribute_name};
