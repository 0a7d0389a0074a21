//! Borsh encoding of insertion-ordered maps.
//!
//! A map is written exactly like a `Vec<(K, V)>`: a `u32` length followed by
//! the pairs in iteration order, so the order survives a round trip.

use std::{
    hash::Hash,
    io::{self, Read, Write},
};

use borsh::{BorshDeserialize, BorshSerialize};
use indexmap::IndexMap;

pub(crate) fn serialize_map<K, V, W>(map: &IndexMap<K, V>, writer: &mut W) -> io::Result<()>
where
    K: BorshSerialize,
    V: BorshSerialize,
    W: Write,
{
    let len = u32::try_from(map.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "map too large to encode"))?;
    len.serialize(writer)?;
    for (key, value) in map {
        key.serialize(writer)?;
        value.serialize(writer)?;
    }
    Ok(())
}

pub(crate) fn deserialize_map<K, V, R>(reader: &mut R) -> io::Result<IndexMap<K, V>>
where
    K: BorshDeserialize + Hash + Eq,
    V: BorshDeserialize,
    R: Read,
{
    let pairs = Vec::<(K, V)>::deserialize_reader(reader)?;
    Ok(pairs.into_iter().collect())
}
