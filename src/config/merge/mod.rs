//! Config composition: defaults policy plus the ordered source merge.

pub mod policy;
pub mod service;
