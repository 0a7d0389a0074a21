//! Per-field metadata extracted from documentation strings.
//!
//! A documentation line such as `/// @var integer` contributes the entry
//! `var -> "integer"`. The value is stored as opaque text; interpreting it is
//! left to the mapping layer consuming the description.

use std::io::{self, Read, Write};

use borsh::{BorshDeserialize, BorshSerialize};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{
    magic::{ANNOTATION_MARKER, NAME_ANNOTATION_KEY},
    utils::ordered::{deserialize_map, serialize_map},
};

/// Ordered key/value metadata of a single field.
///
/// Always contains the [`NAME_ANNOTATION_KEY`] entry when built through
/// [`AnnotationsBag::for_field`]. Assigning an existing key overwrites its value
/// in place (last write wins, position is kept).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationsBag {
    entries: IndexMap<String, String>,
}

impl BorshSerialize for AnnotationsBag {
    fn serialize<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        serialize_map(&self.entries, writer)
    }
}

impl BorshDeserialize for AnnotationsBag {
    fn deserialize_reader<R: Read>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            entries: deserialize_map(reader)?,
        })
    }
}

impl AnnotationsBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the bag of a field: seed the `name` entry, then parse `doc`.
    pub fn for_field(name: &str, doc: Option<&str>) -> Self {
        let mut bag = Self::new();
        bag.set(NAME_ANNOTATION_KEY, name);
        bag.initialize_doc(doc);
        bag
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    /// Merge every annotation found in `doc` into the bag.
    pub fn initialize_doc(&mut self, doc: Option<&str>) -> &mut Self {
        if let Some(doc) = doc {
            for (key, value) in AnnotationParser::parse(doc) {
                self.set(key, value);
            }
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// The structural name of the field (or the last `@name` annotation).
    pub fn name(&self) -> Option<&str> {
        self.get(NAME_ANNOTATION_KEY)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::ops::Index<&str> for AnnotationsBag {
    type Output = str;

    fn index(&self, key: &str) -> &Self::Output {
        match self.get(key) {
            Some(value) => value,
            None => panic!("no annotation '{}' in bag", key),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for AnnotationsBag {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut bag = Self::new();
        for (key, value) in iter {
            bag.set(key, value);
        }
        bag
    }
}

/// Line-oriented parser for `@key value` annotations.
///
/// Never fails: lines that do not start with a marker (after comment
/// decoration is stripped) are skipped.
pub struct AnnotationParser;

impl AnnotationParser {
    /// Iterate over the `(key, value)` pairs of `doc` in order of appearance.
    pub fn parse(doc: &str) -> impl Iterator<Item = (&str, &str)> {
        doc.lines().filter_map(Self::parse_line)
    }

    /// Parse a single documentation line.
    ///
    /// ```
    /// use hydesc::annotations::AnnotationParser;
    ///
    /// assert_eq!(AnnotationParser::parse_line(" * @var string */"), Some(("var", "string")));
    /// assert_eq!(AnnotationParser::parse_line("@required"), Some(("required", "")));
    /// assert_eq!(AnnotationParser::parse_line("contact: a@b.c"), None);
    /// ```
    pub fn parse_line(line: &str) -> Option<(&str, &str)> {
        let line = Self::strip_decoration(line);
        let rest = line.strip_prefix(ANNOTATION_MARKER)?;

        let key_len = Self::key_len(rest);
        if key_len == 0 {
            return None;
        }
        let (key, value) = rest.split_at(key_len);

        // The key must be followed by whitespace or the end of the line.
        if value.chars().next().is_some_and(|c| !c.is_whitespace()) {
            return None;
        }
        Some((key, value.trim()))
    }

    fn key_len(rest: &str) -> usize {
        let mut chars = rest.char_indices();
        match chars.next() {
            Some((_, c)) if c.is_ascii_alphabetic() || c == '_' => {}
            _ => return 0,
        }
        chars
            .find(|&(_, c)| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ':' | '-')))
            .map(|(idx, _)| idx)
            .unwrap_or(rest.len())
    }

    fn strip_decoration(line: &str) -> &str {
        let mut line = line.trim();
        line = line.strip_suffix("*/").unwrap_or(line).trim_end();
        for prefix in ["/**", "/*", "///", "//"] {
            if let Some(stripped) = line.strip_prefix(prefix) {
                line = stripped;
                break;
            }
        }
        line.trim_start().trim_start_matches('*').trim_start()
    }
}
