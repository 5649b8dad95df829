//! Object model shared by the reconciler and its callers.
//!
//! This module provides:
//! - Tagged attribute values and immutable object snapshots
//! - Per-kind descriptors with attribute roles and replacement policies
//! - The managed kinds and their state addresses

mod descriptor;
mod kinds;
mod value;

pub use descriptor::{
    AttributeDescriptor, ID_ATTRIBUTE, ObjectDescriptor, ReplacePolicy, Role, ValueType,
};
pub use kinds::{MEMBER, PROJECT, ResourceAddress, ResourceKind};
pub use value::{Object, Scalar, Value};
