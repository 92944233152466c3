//! Header and record values handed to consumers

use crate::hash_ring::{HashRing, InternId};
use std::borrow::Cow;

/// The parsed header line
///
/// Distinct names are interned in first-seen order; `columns` maps each
/// 1-based column to the id of its name, so repeated names share an id.
#[derive(Debug, Clone, Default)]
pub struct Header {
    ring: HashRing,
    columns: Vec<InternId>,
}

impl Header {
    pub(crate) fn new(ring: HashRing, columns: Vec<InternId>) -> Self {
        Header { ring, columns }
    }

    /// The interning table holding the header names
    pub fn ring(&self) -> &HashRing {
        &self.ring
    }

    /// Number of columns in the header line
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Distinct header names in id order
    pub fn names(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.ring.iter().map(|(_, name)| name)
    }

    /// Distinct header names as (lossy UTF-8) strings
    pub fn to_strings(&self) -> Vec<String> {
        self.names()
            .map(|name| String::from_utf8_lossy(name).into_owned())
            .collect()
    }

    /// Id of the name in 1-based `column`
    pub fn id_of_column(&self, column: usize) -> Option<InternId> {
        column
            .checked_sub(1)
            .and_then(|offset| self.columns.get(offset))
            .copied()
    }

    /// Name of 1-based `column`
    pub fn name_of_column(&self, column: usize) -> Option<&[u8]> {
        self.id_of_column(column)
            .and_then(|id| self.ring.reverse(id))
    }

    /// First 1-based column carrying `name`
    pub fn column_of(&self, name: &[u8]) -> Option<usize> {
        let id = self.ring.get(name)?;
        self.columns.iter().position(|c| *c == id).map(|i| i + 1)
    }
}

/// One field of a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// 1-based column index
    pub column: usize,
    /// Field bytes with outer quotes removed and doubled quotes collapsed
    pub value: Vec<u8>,
}

impl Field {
    /// The value as a string, replacing invalid UTF-8
    pub fn as_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.value)
    }
}

/// A data record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// 1-based record number, not counting the header line
    pub index: u64,
    /// Fields in input order
    pub fields: Vec<Field>,
}

impl Record {
    pub fn new(index: u64, fields: Vec<Field>) -> Self {
        Record { index, fields }
    }

    /// Field in 1-based `column`
    pub fn get(&self, column: usize) -> Option<&[u8]> {
        self.fields
            .iter()
            .find(|f| f.column == column)
            .map(|f| f.value.as_slice())
    }

    /// Field under header `name`
    pub fn get_by_name(&self, header: &Header, name: &[u8]) -> Option<&[u8]> {
        self.get(header.column_of(name)?)
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field values in input order
    pub fn values(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.fields.iter().map(|f| f.value.as_slice())
    }

    /// Convert record to vector of strings
    pub fn to_strings(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.as_str().into_owned()).collect()
    }
}
