//! Numerical variant keys
//!
//! A tagged union over the numeric field types an index can be built on.
//! Ordering compares the type tag first, then the payload, which gives the
//! variant a total order usable as a `BTreeMap` key even across mixed tags
//! (and for `F32`, via IEEE total ordering).

use std::cmp::Ordering;

use crate::error::{MemDbError, Result};

/// Type tag for an index key field
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VariantKind {
    U32,
    U64,
    I32,
    I64,
    F32,
    None,
}

impl VariantKind {
    /// Byte width of the field this kind reads
    pub fn width(self) -> usize {
        match self {
            Self::U32 | Self::I32 | Self::F32 => 4,
            Self::U64 | Self::I64 => 8,
            Self::None => 0,
        }
    }

    /// Extract a key of this kind from record bytes at `offset`.
    ///
    /// The caller has already validated that `offset + width` fits the
    /// record; reads are unaligned so the raw slot buffer needs no
    /// alignment guarantee.
    pub(crate) fn read(self, record: &[u8], offset: usize) -> Result<NumericalVariant> {
        let end = offset + self.width();
        let field = record.get(offset..end).ok_or_else(|| {
            MemDbError::InvalidIndex(format!(
                "field at offset {} width {} exceeds record of {} bytes",
                offset,
                self.width(),
                record.len()
            ))
        })?;

        Ok(match self {
            Self::U32 => NumericalVariant::U32(bytemuck::pod_read_unaligned(field)),
            Self::U64 => NumericalVariant::U64(bytemuck::pod_read_unaligned(field)),
            Self::I32 => NumericalVariant::I32(bytemuck::pod_read_unaligned(field)),
            Self::I64 => NumericalVariant::I64(bytemuck::pod_read_unaligned(field)),
            Self::F32 => NumericalVariant::F32(bytemuck::pod_read_unaligned(field)),
            Self::None => NumericalVariant::None,
        })
    }
}

/// A tagged numeric value used as an index key
#[derive(Debug, Clone, Copy)]
pub enum NumericalVariant {
    U32(u32),
    U64(u64),
    I32(i32),
    I64(i64),
    F32(f32),
    None,
}

impl NumericalVariant {
    /// Type tag of this value
    pub fn kind(&self) -> VariantKind {
        match self {
            Self::U32(_) => VariantKind::U32,
            Self::U64(_) => VariantKind::U64,
            Self::I32(_) => VariantKind::I32,
            Self::I64(_) => VariantKind::I64,
            Self::F32(_) => VariantKind::F32,
            Self::None => VariantKind::None,
        }
    }

    /// Rank used to order values of different tags
    fn tag_rank(&self) -> u8 {
        match self {
            Self::U32(_) => 0,
            Self::U64(_) => 1,
            Self::I32(_) => 2,
            Self::I64(_) => 3,
            Self::F32(_) => 4,
            Self::None => 5,
        }
    }
}

impl Ord for NumericalVariant {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::U32(a), Self::U32(b)) => a.cmp(b),
            (Self::U64(a), Self::U64(b)) => a.cmp(b),
            (Self::I32(a), Self::I32(b)) => a.cmp(b),
            (Self::I64(a), Self::I64(b)) => a.cmp(b),
            (Self::F32(a), Self::F32(b)) => a.total_cmp(b),
            (Self::None, Self::None) => Ordering::Equal,
            // Mixed tags: compare by tag rank
            _ => self.tag_rank().cmp(&other.tag_rank()),
        }
    }
}

impl PartialOrd for NumericalVariant {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for NumericalVariant {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for NumericalVariant {}

impl std::fmt::Display for NumericalVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::U32(v) => write!(f, "u32:{}", v),
            Self::U64(v) => write!(f, "u64:{}", v),
            Self::I32(v) => write!(f, "i32:{}", v),
            Self::I64(v) => write!(f, "i64:{}", v),
            Self::F32(v) => write!(f, "f32:{}", v),
            Self::None => write!(f, "none"),
        }
    }
}
