// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Structure-of-arrays column storage.
//!
//! Each registered component owns one column per field, sized to the entity
//! capacity, plus a presence bitmap with one bit per slot. Booleans are
//! stored as bytes so the snapshot codec can treat every column as a plain
//! byte run.

use super::schema::{FieldDef, FieldKind};

/// One field column, capacity-sized at component registration.
#[derive(Debug, Clone)]
pub(crate) enum ColumnData {
    /// Raw Q16.16 values.
    Fixed(Vec<i32>),
    /// Bytes.
    U8(Vec<u8>),
    /// Booleans as 0/1 bytes.
    Bool(Vec<u8>),
    /// Render-only floats.
    F32(Vec<f32>),
}

impl ColumnData {
    pub(crate) fn new(kind: FieldKind, capacity: usize) -> Self {
        match kind {
            FieldKind::Fixed => Self::Fixed(vec![0; capacity]),
            FieldKind::U8 => Self::U8(vec![0; capacity]),
            FieldKind::Bool => Self::Bool(vec![0; capacity]),
            FieldKind::F32 => Self::F32(vec![0.0; capacity]),
        }
    }

    /// Raw value at a row widened to `u32` for hashing/packing. `F32` rows
    /// never reach either and fold as their bit pattern for completeness.
    pub(crate) fn raw_u32(&self, row: usize) -> u32 {
        match self {
            Self::Fixed(v) => v[row] as u32,
            Self::U8(v) => u32::from(v[row]),
            Self::Bool(v) => u32::from(v[row]),
            Self::F32(v) => v[row].to_bits(),
        }
    }
}

/// Per-component storage: presence bitmap plus field columns.
#[derive(Debug, Clone)]
pub(crate) struct ColumnSet {
    presence: Vec<u64>,
    pub(crate) fields: Vec<ColumnData>,
}

impl ColumnSet {
    pub(crate) fn new(fields: &[FieldDef], capacity: usize) -> Self {
        Self {
            presence: vec![0; capacity.div_ceil(64)],
            fields: fields
                .iter()
                .map(|f| ColumnData::new(f.kind, capacity))
                .collect(),
        }
    }

    pub(crate) fn present(&self, row: usize) -> bool {
        (self.presence[row / 64] >> (row % 64)) & 1 == 1
    }

    pub(crate) fn set_present(&mut self, row: usize) {
        self.presence[row / 64] |= 1 << (row % 64);
    }

    pub(crate) fn clear_present(&mut self, row: usize) {
        self.presence[row / 64] &= !(1 << (row % 64));
    }
}
