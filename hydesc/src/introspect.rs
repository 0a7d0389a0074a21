//! Construction of [`TypeDescription`]s from static schemas.

use indexmap::{IndexMap, map::Entry};
use log::{trace, warn};
use smallvec::SmallVec;

use crate::{
    annotations::AnnotationsBag,
    description::TypeDescription,
    registry::ResolvedType,
    schema::{FieldKind, TypeSchema},
};

/// Builds the description of a resolved type.
///
/// Implementations must be pure: introspecting the same type twice yields
/// value-equal descriptions, which is what makes racing cache fills harmless.
pub trait Introspect: Send + Sync {
    fn introspect(&self, ty: ResolvedType) -> TypeDescription;
}

/// Default [`Introspect`] implementation walking a [`TypeSchema`].
///
/// Flattened fields are expanded in place, recursively. When the same field
/// or operation name shows up twice, the first occurrence is kept, so a type's
/// own declarations shadow those of an embedded type declared later.
#[derive(Debug, Default, Clone, Copy)]
pub struct Introspector;

struct Walker {
    fields: IndexMap<String, AnnotationsBag>,
    operations: IndexMap<String, bool>,
    stack: SmallVec<&'static TypeSchema, 4>,
}

impl Walker {
    fn enter(&mut self, schema: &'static TypeSchema) -> bool {
        // Identity, not name: distinct schemas may share an identifier
        if self.stack.iter().any(|entered| std::ptr::eq(*entered, schema)) {
            return false;
        }
        self.stack.push(schema);
        true
    }

    fn walk_fields(&mut self, schema: &'static TypeSchema) {
        if !self.enter(schema) {
            warn!(
                "Flatten cycle through '{}' while describing '{}', skipping",
                schema.name,
                self.stack.first().map_or(schema.name, |root| root.name)
            );
            return;
        }

        for field in schema.fields {
            match field.kind {
                FieldKind::Plain => match self.fields.entry(field.name.to_string()) {
                    Entry::Vacant(entry) => {
                        entry.insert(AnnotationsBag::for_field(field.name, field.doc));
                    }
                    Entry::Occupied(_) => {
                        trace!("Field '{}' of '{}' is shadowed", field.name, schema.name);
                    }
                },
                FieldKind::Flatten(embedded) => self.walk_fields(embedded()),
            }
        }
        self.stack.pop();
    }

    /// Own operations first, then those of embedded types in field order.
    fn walk_operations(&mut self, schema: &'static TypeSchema) {
        if !self.enter(schema) {
            return;
        }

        for operation in schema.operations {
            self.operations
                .entry(operation.name.to_string())
                .or_insert(operation.public);
        }
        for field in schema.fields {
            if let FieldKind::Flatten(embedded) = field.kind {
                self.walk_operations(embedded());
            }
        }
        self.stack.pop();
    }
}

impl Introspect for Introspector {
    fn introspect(&self, ty: ResolvedType) -> TypeDescription {
        let mut walker = Walker {
            fields: IndexMap::with_capacity(ty.schema.fields.len()),
            operations: IndexMap::with_capacity(ty.schema.operations.len()),
            stack: SmallVec::new(),
        };
        walker.walk_fields(ty.schema);
        walker.walk_operations(ty.schema);

        TypeDescription::new(ty.name.to_string(), walker.fields, walker.operations)
    }
}
