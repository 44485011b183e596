// Copyright 2024 Saptak Santra
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Columnar component storage
//!
//! A component is described by a [`Schema`] and realized as one column per
//! leaf field, every column indexed by entity id. Stores are owned by the
//! universe, not by a world, so one store can be registered in many worlds.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::entity::EntityId;
use crate::error::{EcsError, Result};

/// Numeric kind of a single field value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    I8,
    U8,
    /// u8 that saturates instead of wrapping when written through `set_clamped`
    U8Clamped,
    I16,
    U16,
    I32,
    U32,
    F32,
    F64,
    /// Entity reference, stored as u32
    Eid,
}

/// Shape of a field: one value, or a fixed-length vector per entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    Scalar(FieldKind),
    Array(FieldKind, usize),
}

impl FieldType {
    pub fn kind(self) -> FieldKind {
        match self {
            FieldType::Scalar(kind) | FieldType::Array(kind, _) => kind,
        }
    }

    /// Values stored per entity
    pub fn stride(self) -> usize {
        match self {
            FieldType::Scalar(_) => 1,
            FieldType::Array(_, len) => len,
        }
    }
}

/// Ordered field list for a component. Nested schemas are flattened into
/// dotted names on insertion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    fields: Vec<(String, FieldType)>,
}

impl Schema {
    /// Empty schema; a store built from it is a tag.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push((name.into(), FieldType::Scalar(kind)));
        self
    }

    pub fn array(mut self, name: impl Into<String>, kind: FieldKind, len: usize) -> Self {
        self.fields.push((name.into(), FieldType::Array(kind, len)));
        self
    }

    pub fn nested(mut self, name: impl Into<String>, inner: Schema) -> Self {
        let prefix = name.into();
        for (field, ty) in inner.fields {
            self.fields.push((format!("{prefix}.{field}"), ty));
        }
        self
    }

    pub fn fields(&self) -> &[(String, FieldType)] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Raw column buffer, one variant per storage width
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    I8(Vec<i8>),
    U8(Vec<u8>),
    I16(Vec<i16>),
    U16(Vec<u16>),
    I32(Vec<i32>),
    U32(Vec<u32>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

macro_rules! with_data {
    ($data:expr, $v:ident => $body:expr) => {
        match $data {
            ColumnData::I8($v) => $body,
            ColumnData::U8($v) => $body,
            ColumnData::I16($v) => $body,
            ColumnData::U16($v) => $body,
            ColumnData::I32($v) => $body,
            ColumnData::U32($v) => $body,
            ColumnData::F32($v) => $body,
            ColumnData::F64($v) => $body,
        }
    };
}

macro_rules! with_data_pair {
    ($a:expr, $b:expr, $x:ident, $y:ident => $body:expr, _ => $other:expr) => {
        match ($a, $b) {
            (ColumnData::I8($x), ColumnData::I8($y)) => $body,
            (ColumnData::U8($x), ColumnData::U8($y)) => $body,
            (ColumnData::I16($x), ColumnData::I16($y)) => $body,
            (ColumnData::U16($x), ColumnData::U16($y)) => $body,
            (ColumnData::I32($x), ColumnData::I32($y)) => $body,
            (ColumnData::U32($x), ColumnData::U32($y)) => $body,
            (ColumnData::F32($x), ColumnData::F32($y)) => $body,
            (ColumnData::F64($x), ColumnData::F64($y)) => $body,
            _ => $other,
        }
    };
}

impl ColumnData {
    fn zeroed(kind: FieldKind, len: usize) -> Self {
        match kind {
            FieldKind::I8 => ColumnData::I8(vec![0; len]),
            FieldKind::U8 | FieldKind::U8Clamped => ColumnData::U8(vec![0; len]),
            FieldKind::I16 => ColumnData::I16(vec![0; len]),
            FieldKind::U16 => ColumnData::U16(vec![0; len]),
            FieldKind::I32 => ColumnData::I32(vec![0; len]),
            FieldKind::U32 | FieldKind::Eid => ColumnData::U32(vec![0; len]),
            FieldKind::F32 => ColumnData::F32(vec![0.0; len]),
            FieldKind::F64 => ColumnData::F64(vec![0.0; len]),
        }
    }

    fn len(&self) -> usize {
        with_data!(self, v => v.len())
    }

    fn resize(&mut self, len: usize) {
        with_data!(self, v => v.resize(len, Default::default()))
    }

    fn zero_range(&mut self, start: usize, end: usize) {
        with_data!(self, v => {
            if let Some(slice) = v.get_mut(start..end) {
                slice.fill(Default::default());
            }
        })
    }
}

/// Rust types that can be read from and written to a column
pub trait FieldValue: Copy + PartialEq + Default + 'static {
    fn slice(data: &ColumnData) -> Option<&[Self]>;
    fn slice_mut(data: &mut ColumnData) -> Option<&mut [Self]>;
}

macro_rules! impl_field_value {
    ($ty:ty, $variant:ident) => {
        impl FieldValue for $ty {
            fn slice(data: &ColumnData) -> Option<&[Self]> {
                match data {
                    ColumnData::$variant(v) => Some(v.as_slice()),
                    _ => None,
                }
            }

            fn slice_mut(data: &mut ColumnData) -> Option<&mut [Self]> {
                match data {
                    ColumnData::$variant(v) => Some(v.as_mut_slice()),
                    _ => None,
                }
            }
        }
    };
}

impl_field_value!(i8, I8);
impl_field_value!(u8, U8);
impl_field_value!(i16, I16);
impl_field_value!(u16, U16);
impl_field_value!(i32, I32);
impl_field_value!(u32, U32);
impl_field_value!(f32, F32);
impl_field_value!(f64, F64);

/// One leaf field's values for every entity row
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    field: FieldType,
    data: ColumnData,
}

impl Column {
    fn new(name: String, field: FieldType, rows: usize) -> Self {
        Self {
            data: ColumnData::zeroed(field.kind(), rows * field.stride()),
            name,
            field,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_type(&self) -> FieldType {
        self.field
    }

    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    /// Number of entity rows
    pub fn rows(&self) -> usize {
        match self.field.stride() {
            0 => 0,
            stride => self.data.len() / stride,
        }
    }

    fn row_range(&self, row: usize) -> (usize, usize) {
        let stride = self.field.stride();
        (row * stride, (row + 1) * stride)
    }

    fn resize(&mut self, rows: usize) {
        self.data.resize(rows * self.field.stride());
    }

    fn reset_row(&mut self, row: usize) {
        let (start, end) = self.row_range(row);
        self.data.zero_range(start, end);
    }

    fn typed<T: FieldValue>(&self) -> Result<&[T]> {
        T::slice(&self.data).ok_or_else(|| self.mismatch())
    }

    fn typed_mut<T: FieldValue>(&mut self) -> Result<&mut [T]> {
        let Column { name, field, data } = self;
        T::slice_mut(data).ok_or_else(|| EcsError::FieldTypeMismatch {
            field: name.clone(),
            expected: field.kind(),
        })
    }

    fn mismatch(&self) -> EcsError {
        EcsError::FieldTypeMismatch {
            field: self.name.clone(),
            expected: self.field.kind(),
        }
    }

    /// Compare `row` against `shadow` and copy the current values over.
    /// Returns true if anything differed.
    pub(crate) fn sync_shadow(&self, shadow: &mut Column, row: usize) -> bool {
        let (start, end) = self.row_range(row);
        with_data_pair!(&self.data, &mut shadow.data, cur, old => {
            match (cur.get(start..end), old.get_mut(start..end)) {
                (Some(cur), Some(old)) => {
                    if cur != old {
                        old.copy_from_slice(cur);
                        true
                    } else {
                        false
                    }
                }
                _ => false,
            }
        }, _ => false)
    }

    /// Extend a shadow copy after the column was resized, seeding the new
    /// rows from current values.
    pub(crate) fn grow_shadow(&self, shadow: &mut Column) {
        let have = shadow.data.len();
        if have >= self.data.len() {
            return;
        }
        with_data_pair!(&self.data, &mut shadow.data, cur, old => {
            old.extend_from_slice(&cur[have..]);
        }, _ => {});
    }
}

/// Typed columnar storage for one component
#[derive(Debug, Clone)]
pub struct ComponentStore {
    schema: Schema,
    columns: Vec<Column>,
    column_index: FxHashMap<String, usize>,
    capacity: usize,
}

impl ComponentStore {
    pub fn new(schema: Schema, capacity: usize) -> Self {
        let mut columns = Vec::with_capacity(schema.fields().len());
        let mut column_index = FxHashMap::default();
        for (name, field) in schema.fields() {
            column_index.insert(name.clone(), columns.len());
            columns.push(Column::new(name.clone(), *field, capacity));
        }

        Self {
            schema,
            columns,
            column_index,
            capacity,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Existence-only component with no columns
    pub fn is_tag(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Flattened leaf columns in schema order
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    fn column_ref(&self, name: &str) -> Result<&Column> {
        let idx = self
            .column_index
            .get(name)
            .ok_or_else(|| EcsError::FieldNotFound(name.to_string()))?;
        Ok(&self.columns[*idx])
    }

    fn column_ref_mut(&mut self, name: &str) -> Result<&mut Column> {
        let idx = *self
            .column_index
            .get(name)
            .ok_or_else(|| EcsError::FieldNotFound(name.to_string()))?;
        Ok(&mut self.columns[idx])
    }

    fn check_row(&self, entity: EntityId) -> Result<usize> {
        if entity.index() >= self.capacity {
            return Err(EcsError::CapacityExceeded {
                attempted: entity.index(),
                capacity: self.capacity,
            });
        }
        Ok(entity.index())
    }

    /// Whole column as a typed slice. Array fields are flat with their stride.
    pub fn column<T: FieldValue>(&self, name: &str) -> Result<&[T]> {
        self.column_ref(name)?.typed()
    }

    pub fn column_mut<T: FieldValue>(&mut self, name: &str) -> Result<&mut [T]> {
        self.column_ref_mut(name)?.typed_mut()
    }

    /// Read a scalar field.
    pub fn get<T: FieldValue>(&self, name: &str, entity: EntityId) -> Result<T> {
        let row = self.check_row(entity)?;
        let column = self.column_ref(name)?;
        if column.field.stride() != 1 {
            return Err(column.mismatch());
        }
        Ok(column.typed::<T>()?[row])
    }

    /// Write a scalar field.
    pub fn set<T: FieldValue>(&mut self, name: &str, entity: EntityId, value: T) -> Result<()> {
        let row = self.check_row(entity)?;
        let column = self.column_ref_mut(name)?;
        if column.field.stride() != 1 {
            return Err(column.mismatch());
        }
        column.typed_mut::<T>()?[row] = value;
        Ok(())
    }

    /// Write a `U8Clamped` field, saturating to 0..=255 and rounding half to even.
    pub fn set_clamped(&mut self, name: &str, entity: EntityId, value: f64) -> Result<()> {
        let row = self.check_row(entity)?;
        let column = self.column_ref_mut(name)?;
        if column.field != FieldType::Scalar(FieldKind::U8Clamped) {
            return Err(column.mismatch());
        }
        let clamped = if value.is_nan() {
            0
        } else {
            value.clamp(0.0, 255.0).round_ties_even() as u8
        };
        column.typed_mut::<u8>()?[row] = clamped;
        Ok(())
    }

    /// One entity's slice of an array field (length 1 for scalars).
    pub fn element<T: FieldValue>(&self, name: &str, entity: EntityId) -> Result<&[T]> {
        let row = self.check_row(entity)?;
        let column = self.column_ref(name)?;
        let (start, end) = column.row_range(row);
        Ok(&column.typed::<T>()?[start..end])
    }

    pub fn element_mut<T: FieldValue>(&mut self, name: &str, entity: EntityId) -> Result<&mut [T]> {
        let row = self.check_row(entity)?;
        let column = self.column_ref_mut(name)?;
        let (start, end) = column.row_range(row);
        Ok(&mut column.typed_mut::<T>()?[start..end])
    }

    /// Zero every field of `entity`. Rows past capacity are ignored.
    pub fn reset_for(&mut self, entity: EntityId) {
        if entity.index() >= self.capacity {
            return;
        }
        for column in &mut self.columns {
            column.reset_row(entity.index());
        }
    }

    /// Resize every column, keeping rows below `capacity`.
    pub fn resize(&mut self, capacity: usize) {
        for column in &mut self.columns {
            column.resize(capacity);
        }
        self.capacity = capacity;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position() -> Schema {
        Schema::new()
            .field("x", FieldKind::F32)
            .field("y", FieldKind::F32)
    }

    #[test]
    fn test_tag_store() {
        let store = ComponentStore::new(Schema::new(), 16);
        assert!(store.is_tag());
        assert!(store.columns().is_empty());
    }

    #[test]
    fn test_scalar_get_set() -> Result<()> {
        let mut store = ComponentStore::new(position(), 16);
        let e = EntityId::new(3);
        store.set::<f32>("x", e, 1.5)?;
        assert_eq!(store.get::<f32>("x", e)?, 1.5);
        assert_eq!(store.get::<f32>("y", e)?, 0.0);
        assert_eq!(store.column::<f32>("x")?.len(), 16);
        Ok(())
    }

    #[test]
    fn test_typed_access_errors() {
        let mut store = ComponentStore::new(position(), 4);
        let e = EntityId::new(1);
        assert_eq!(
            store.get::<f32>("z", e),
            Err(EcsError::FieldNotFound("z".to_string()))
        );
        assert!(matches!(
            store.set::<u8>("x", e, 1),
            Err(EcsError::FieldTypeMismatch { .. })
        ));
        assert!(matches!(
            store.get::<f32>("x", EntityId::new(4)),
            Err(EcsError::CapacityExceeded {
                attempted: 4,
                capacity: 4
            })
        ));
    }

    #[test]
    fn test_array_field() -> Result<()> {
        let schema = Schema::new().array("path", FieldKind::I16, 3);
        let mut store = ComponentStore::new(schema, 8);
        let e = EntityId::new(2);
        store.element_mut::<i16>("path", e)?.copy_from_slice(&[4, 5, 6]);
        assert_eq!(store.element::<i16>("path", e)?, &[4, 5, 6]);
        assert_eq!(store.element::<i16>("path", EntityId::new(1))?, &[0, 0, 0]);
        assert_eq!(store.column::<i16>("path")?.len(), 24);
        // scalar accessors refuse array fields
        assert!(store.get::<i16>("path", e).is_err());
        Ok(())
    }

    #[test]
    fn test_nested_schema_is_flattened() -> Result<()> {
        let schema = Schema::new()
            .field("id", FieldKind::Eid)
            .nested("position", position());
        let mut store = ComponentStore::new(schema, 4);
        let names: Vec<_> = store.columns().iter().map(Column::name).collect();
        assert_eq!(names, vec!["id", "position.x", "position.y"]);

        store.set::<u32>("id", EntityId::new(0), 9)?;
        store.set::<f32>("position.y", EntityId::new(0), 2.0)?;
        assert_eq!(store.get::<f32>("position.y", EntityId::new(0))?, 2.0);
        Ok(())
    }

    #[test]
    fn test_clamped_write() -> Result<()> {
        let schema = Schema::new().field("alpha", FieldKind::U8Clamped);
        let mut store = ComponentStore::new(schema, 2);
        let e = EntityId::new(0);
        store.set_clamped("alpha", e, 300.0)?;
        assert_eq!(store.get::<u8>("alpha", e)?, 255);
        store.set_clamped("alpha", e, -4.0)?;
        assert_eq!(store.get::<u8>("alpha", e)?, 0);
        store.set_clamped("alpha", e, 2.5)?;
        assert_eq!(store.get::<u8>("alpha", e)?, 2);
        Ok(())
    }

    #[test]
    fn test_reset_for() -> Result<()> {
        let schema = position().array("v", FieldKind::F64, 2);
        let mut store = ComponentStore::new(schema, 4);
        let e = EntityId::new(1);
        store.set::<f32>("x", e, 3.0)?;
        store.element_mut::<f64>("v", e)?.copy_from_slice(&[1.0, 2.0]);
        store.set::<f32>("x", EntityId::new(2), 7.0)?;

        store.reset_for(e);
        store.reset_for(EntityId::new(100));
        assert_eq!(store.get::<f32>("x", e)?, 0.0);
        assert_eq!(store.element::<f64>("v", e)?, &[0.0, 0.0]);
        assert_eq!(store.get::<f32>("x", EntityId::new(2))?, 7.0);
        Ok(())
    }

    #[test]
    fn test_resize_preserves_values() -> Result<()> {
        let mut store = ComponentStore::new(position(), 4);
        store.set::<f32>("x", EntityId::new(3), 8.0)?;
        store.resize(10);
        assert_eq!(store.capacity(), 10);
        assert_eq!(store.get::<f32>("x", EntityId::new(3))?, 8.0);
        store.set::<f32>("x", EntityId::new(9), 1.0)?;

        store.resize(4);
        assert_eq!(store.get::<f32>("x", EntityId::new(3))?, 8.0);
        assert!(store.get::<f32>("x", EntityId::new(9)).is_err());
        Ok(())
    }

    #[test]
    fn test_shadow_sync() -> Result<()> {
        let schema = Schema::new().array("v", FieldKind::U16, 2);
        let mut store = ComponentStore::new(schema, 4);
        let e = EntityId::new(0);
        let mut shadow = store.columns()[0].clone();

        assert!(!store.columns()[0].sync_shadow(&mut shadow, 0));
        store.element_mut::<u16>("v", e)?[1] = 5;
        assert!(store.columns()[0].sync_shadow(&mut shadow, 0));
        assert!(!store.columns()[0].sync_shadow(&mut shadow, 0));

        store.resize(6);
        store.element_mut::<u16>("v", EntityId::new(5))?[0] = 1;
        store.columns()[0].grow_shadow(&mut shadow);
        assert_eq!(shadow.rows(), 6);
        assert!(!store.columns()[0].sync_shadow(&mut shadow, 5));
        Ok(())
    }
}
