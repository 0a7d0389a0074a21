//! Cached structural descriptions of types for serialization and mapping layers.
//!
//! A [`TypeDescription`] lists the declared fields of a type, each with an
//! [`annotations::AnnotationsBag`] parsed from its documentation (`@key value`
//! lines), and the declared operations of the type with their visibility.
//! Descriptions are computed once per type by the [`DescriberFactory`] and
//! shared afterwards.
//!
//! The static field and operation tables are emitted by `#[derive(Describe)]`
//! and `#[describe_operations]` (feature `derive`, enabled by default).
//!
//! ```
//! use hydesc::{DescriberFactory, Describe, TypeRef, describe_operations};
//!
//! #[derive(Describe)]
//! #[describe(operations)]
//! struct Banner {
//!     /// @var integer
//!     w: u32,
//! }
//!
//! #[describe_operations]
//! impl Banner {
//!     pub fn w(&self) -> u32 { self.w }
//!     fn clamp(&mut self) {}
//! }
//!
//! let factory = DescriberFactory::new();
//! let banner = Banner { w: 300 };
//! let description = factory.describe(TypeRef::of(&banner)).unwrap();
//! assert_eq!(description.field("w").unwrap().get("var"), Some("integer"));
//! assert_eq!(description.is_public("w"), Some(true));
//! assert_eq!(description.is_public("clamp"), Some(false));
//!
//! assert!(factory.describe("NoSuchType").is_err());
//! ```

extern crate self as hydesc;

pub mod annotations;
pub mod cache;
pub mod config;
pub mod description;
pub mod factory;
pub mod introspect;
pub mod magic;
pub mod registry;
pub mod schema;
pub mod utils;

pub extern crate inventory;

pub use description::TypeDescription;
pub use factory::{DescriberFactory, DescriberFactoryBuilder};
pub use schema::{Describable, DescribeOperations, TypeRef};
pub use utils::error::{HyError, HyResult};

#[cfg(feature = "derive")]
pub use hydesc_derive::{Describe, describe_operations};
