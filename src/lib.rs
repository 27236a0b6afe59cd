//! Typed CloudFormation/SAM templates.
//!
//! - [`shape`]: decoding of properties that accept several JSON shapes.
//! - [`intrinsics`]: constructors for `Ref`/`Fn::*` calls as string tokens,
//!   token expansion and best-effort evaluation.
//! - [`policies`]: `DeletionPolicy`, `UpdatePolicy`, `CreationPolicy`.
//! - [`serverless`] and [`template`]: typed documents built on the above.
pub mod error;
pub mod intrinsics;
pub mod path_de;
pub mod policies;
pub mod serverless;
pub mod shape;
pub mod template;

pub use error::{Error, Result};
pub use shape::{Computed, Polymorphic, Shape};
pub use template::{Resource, ResourceType, Template};
