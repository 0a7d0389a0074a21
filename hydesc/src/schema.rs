//! Static field and operation tables.
//!
//! Rust has no runtime reflection, so every describable type carries a
//! `'static` [`TypeSchema`] emitted at compile time by `#[derive(Describe)]`
//! (or written by hand). The introspector only ever walks these tables.

use std::any::{Any, TypeId};

/// A type whose layout can be described.
///
/// Usually derived:
/// ```
/// use hydesc::Describe;
///
/// #[derive(Describe)]
/// struct Banner {
///     /// @var integer
///     /// @required
///     w: u32,
///     h: u32,
/// }
///
/// use hydesc::Describable;
/// assert_eq!(Banner::schema().fields.len(), 2);
/// assert!(Banner::TYPE_NAME.ends_with("::Banner"));
/// ```
pub trait Describable: 'static {
    /// Canonical identifier of the type inside the registry.
    const TYPE_NAME: &'static str;

    /// Static table describing the declared fields and operations.
    fn schema() -> &'static TypeSchema;
}

/// Operation table of a type, emitted by `#[describe_operations]` on an inherent `impl` block.
pub trait DescribeOperations {
    const OPERATIONS: &'static [OperationSchema];
}

/// Static layout of a single type.
#[derive(Debug)]
pub struct TypeSchema {
    pub name: &'static str,
    /// Declared fields, in declaration order.
    pub fields: &'static [FieldSchema],
    /// Declared operations, in declaration order.
    pub operations: &'static [OperationSchema],
}

#[derive(Debug)]
pub struct FieldSchema {
    pub name: &'static str,
    /// Raw documentation attached to the field, one line per `///` comment.
    pub doc: Option<&'static str>,
    pub kind: FieldKind,
}

#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    Plain,
    /// The field embeds another describable type whose fields and operations
    /// are inlined at this position.
    Flatten(fn() -> &'static TypeSchema),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationSchema {
    pub name: &'static str,
    /// `true` only for fully `pub` methods.
    pub public: bool,
}

/// Object-safe view over any [`Describable`] value.
pub trait DescribableInstance: Any {
    fn type_name(&self) -> &'static str;

    /// Id of the concrete type behind the trait object.
    fn concrete_type_id(&self) -> TypeId;

    fn type_schema(&self) -> &'static TypeSchema;
}

impl<T: Describable> DescribableInstance for T {
    fn type_name(&self) -> &'static str {
        T::TYPE_NAME
    }

    fn concrete_type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn type_schema(&self) -> &'static TypeSchema {
        T::schema()
    }
}

/// Reference to a type, as supplied by callers of the describer.
#[derive(Clone, Copy)]
pub enum TypeRef<'a> {
    /// Canonical type identifier, validated against the registry.
    Name(&'a str),
    /// Runtime type id, validated against the registry.
    Id(TypeId),
    /// A value whose concrete type is known statically.
    Instance(&'a dyn DescribableInstance),
}

impl<'a> TypeRef<'a> {
    pub fn of<T: Describable>(value: &'a T) -> Self {
        TypeRef::Instance(value)
    }

    /// Reference the concrete type behind a type-erased value.
    pub fn of_any(value: &'a dyn Any) -> Self {
        TypeRef::Id(value.type_id())
    }
}

impl<'a> From<&'a str> for TypeRef<'a> {
    fn from(value: &'a str) -> Self {
        TypeRef::Name(value)
    }
}

impl<'a> From<&'a String> for TypeRef<'a> {
    fn from(value: &'a String) -> Self {
        TypeRef::Name(value.as_str())
    }
}

impl From<TypeId> for TypeRef<'_> {
    fn from(value: TypeId) -> Self {
        TypeRef::Id(value)
    }
}

impl std::fmt::Debug for TypeRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeRef::Name(name) => f.debug_tuple("Name").field(name).finish(),
            TypeRef::Id(id) => f.debug_tuple("Id").field(id).finish(),
            TypeRef::Instance(instance) => f
                .debug_tuple("Instance")
                .field(&instance.type_name())
                .finish(),
        }
    }
}
