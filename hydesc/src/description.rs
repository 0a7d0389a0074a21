use std::io::{self, Read, Write};

use borsh::{BorshDeserialize, BorshSerialize};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{
    annotations::AnnotationsBag,
    utils::ordered::{deserialize_map, serialize_map},
};

/// Structured description of a type: its fields with their annotations and its
/// operations with their visibility.
///
/// Immutable once built. Descriptions are shared through `Arc` between every
/// caller hitting the same cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDescription {
    name: String,
    fields: IndexMap<String, AnnotationsBag>,
    operations: IndexMap<String, bool>,
}

impl BorshSerialize for TypeDescription {
    fn serialize<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        BorshSerialize::serialize(&self.name, writer)?;
        serialize_map(&self.fields, writer)?;
        serialize_map(&self.operations, writer)
    }
}

impl BorshDeserialize for TypeDescription {
    fn deserialize_reader<R: Read>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            name: String::deserialize_reader(reader)?,
            fields: deserialize_map(reader)?,
            operations: deserialize_map(reader)?,
        })
    }
}

impl TypeDescription {
    pub(crate) fn new(
        name: String,
        fields: IndexMap<String, AnnotationsBag>,
        operations: IndexMap<String, bool>,
    ) -> Self {
        Self {
            name,
            fields,
            operations,
        }
    }

    /// Canonical identifier of the described type.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &IndexMap<String, AnnotationsBag> {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&AnnotationsBag> {
        self.fields.get(name)
    }

    /// Operations in declaration order, mapped to whether they are public.
    pub fn operations(&self) -> &IndexMap<String, bool> {
        &self.operations
    }

    /// Returns [`None`] if the type declares no operation named `name`.
    pub fn is_public(&self, name: &str) -> Option<bool> {
        self.operations.get(name).copied()
    }

    pub fn public_operations(&self) -> impl Iterator<Item = &str> {
        self.operations
            .iter()
            .filter(|(_, public)| **public)
            .map(|(name, _)| name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn borsh_encoding_keeps_declaration_order() {
        let fields: IndexMap<_, _> = [
            ("w", AnnotationsBag::for_field("w", Some("@var integer"))),
            ("h", AnnotationsBag::for_field("h", None)),
            ("ext", AnnotationsBag::for_field("ext", Some("@var object\n@see Ext"))),
        ]
        .into_iter()
        .map(|(name, bag)| (name.to_string(), bag))
        .collect();
        let operations: IndexMap<_, _> = [("reset", false), ("area", true)]
            .into_iter()
            .map(|(name, public)| (name.to_string(), public))
            .collect();
        let description = TypeDescription::new("proto::Banner".to_string(), fields, operations);

        let bytes = borsh::to_vec(&description).unwrap();
        let decoded = TypeDescription::try_from_slice(&bytes).unwrap();

        assert_eq!(decoded, description);
        assert_eq!(
            decoded.fields().keys().collect::<Vec<_>>(),
            vec!["w", "h", "ext"]
        );
        assert_eq!(
            decoded.field("ext").unwrap().iter().collect::<Vec<_>>(),
            vec![("name", "ext"), ("var", "object"), ("see", "Ext")]
        );
        assert_eq!(decoded.public_operations().collect::<Vec<_>>(), vec!["area"]);
        assert!(TypeDescription::try_from_slice(&bytes[..bytes.len() - 1]).is_err());
    }
}
