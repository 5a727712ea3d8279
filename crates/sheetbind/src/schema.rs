//! Column layout of a record type.
//!
//! A [`Schema`] is derived once per type from its static [`FieldDef`] table
//! and cached process-wide keyed by `TypeId`.

use std::any::TypeId;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use sheetbind_common::{FieldDef, FieldKind};

use crate::SheetRow;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Position in the record's declared field table.
    pub index: usize,
    pub name: &'static str,
    pub alias: Option<&'static str>,
    pub kind: FieldKind,
    pub optional: bool,
    /// Expands into one column per map entry instead of a cell of its own.
    pub flattenable: bool,
}

impl FieldDescriptor {
    /// Header text: the display alias when present, otherwise the field name.
    pub fn logical_name(&self) -> &'static str {
        self.alias.unwrap_or(self.name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: Vec<FieldDescriptor>,
    by_name: FxHashMap<String, usize>,
    expand: Option<usize>,
}

impl Schema {
    pub fn from_defs(defs: &[FieldDef]) -> Self {
        let mut schema = Schema::default();
        for (index, def) in defs.iter().enumerate() {
            if def.sheet_name {
                continue;
            }
            let desc = FieldDescriptor {
                index,
                name: def.name,
                alias: def.display,
                kind: def.kind,
                optional: def.optional,
                flattenable: def.expand,
            };
            let pos = schema.fields.len();
            if desc.flattenable {
                if schema.expand.is_none() {
                    schema.expand = Some(pos);
                }
            } else {
                schema
                    .by_name
                    .entry(desc.logical_name().to_lowercase())
                    .or_insert(pos);
            }
            schema.fields.push(desc);
        }
        schema
    }

    /// Descriptors in declaration order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Case-insensitive match of a header against scalar logical names.
    /// Duplicates resolve to the first declared field.
    pub fn lookup(&self, header: &str) -> Option<&FieldDescriptor> {
        self.by_name
            .get(&header.trim().to_lowercase())
            .map(|&pos| &self.fields[pos])
    }

    pub fn expand_field(&self) -> Option<&FieldDescriptor> {
        self.expand.map(|pos| &self.fields[pos])
    }
}

static SCHEMAS: Lazy<RwLock<FxHashMap<TypeId, Arc<Schema>>>> =
    Lazy::new(|| RwLock::new(FxHashMap::default()));

fn cached(key: TypeId, defs: &[FieldDef]) -> Arc<Schema> {
    if let Some(schema) = SCHEMAS.read().get(&key) {
        return Arc::clone(schema);
    }
    let mut map = SCHEMAS.write();
    Arc::clone(
        map.entry(key)
            .or_insert_with(|| Arc::new(Schema::from_defs(defs))),
    )
}

/// Schema of `T`, built on first use.
pub fn describe<T: SheetRow + 'static>() -> Arc<Schema> {
    cached(TypeId::of::<T>(), T::fields())
}

/// Schema of the concrete type behind `row`.
pub fn describe_row<R: SheetRow + ?Sized>(row: &R) -> Arc<Schema> {
    cached(row.type_key(), row.field_defs())
}
