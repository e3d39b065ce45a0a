//! A sequenced read, in its original (as-sequenced) orientation.

use itertools::Itertools;

#[derive(PartialEq, Eq, Clone)]
pub struct SeqRead {
    /// Read name, unique within a batch.
    pub name: String,
    /// Bases in original read orientation.
    pub bases: Vec<u8>,
    /// Per-base quality scores.
    pub quals: Vec<u8>,
}

impl SeqRead {
    pub fn new(name: impl Into<String>, bases: Vec<u8>, quals: Vec<u8>) -> SeqRead {
        SeqRead {
            name: name.into(),
            bases,
            quals,
        }
    }

    pub fn len(&self) -> usize {
        self.bases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }
}

impl std::fmt::Debug for SeqRead {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeqRead")
            .field("name", &self.name)
            .field("bases", &std::str::from_utf8(&self.bases).unwrap_or("<non-utf8>"))
            .field("quals", &self.quals.iter().map(|q| q.to_string()).join(","))
            .finish()
    }
}
