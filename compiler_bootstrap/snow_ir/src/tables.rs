use std::sync::Mutex;

use indexmap::IndexMap;
use snow_common::ConstantValue;

/// Process-wide map from fully-qualified name (`module.const`) to an
/// interned constant value. Populated during the AST pre-scan and queried
/// by the IR builder for cross-module constant folding. Thread-safe and
/// insertion-ordered (for debug dumps that want a stable listing order).
#[derive(Default)]
pub struct GlobalConstantTable {
    entries: Mutex<IndexMap<String, ConstantValue>>,
}

impl GlobalConstantTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, fq_name: impl Into<String>, value: ConstantValue) {
        self.entries.lock().unwrap().insert(fq_name.into(), value);
    }

    pub fn get(&self, fq_name: &str) -> Option<ConstantValue> {
        self.entries.lock().unwrap().get(fq_name).cloned()
    }
}

/// Maps fully-qualified function name to its declared return-type name.
/// Consulted when emitting `Call` so a void-returning callee produces no
/// destination store.
#[derive(Default)]
pub struct GlobalFunctionTable {
    entries: Mutex<IndexMap<String, String>>,
}

impl GlobalFunctionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, fq_name: impl Into<String>, return_type: impl Into<String>) {
        self.entries
            .lock()
            .unwrap()
            .insert(fq_name.into(), return_type.into());
    }

    pub fn return_type_of(&self, fq_name: &str) -> Option<String> {
        self.entries.lock().unwrap().get(fq_name).cloned()
    }
}

/// A struct's field layout: field name to contiguous field index, plus an
/// optional parent struct name for inheritance.
#[derive(Debug, Clone, Default)]
pub struct StructLayout {
    pub fields: IndexMap<String, usize>,
    pub parent: Option<String>,
}

/// Maps struct name to its `StructLayout`. Field indices address
/// contiguous reference-typed slots in a struct object.
#[derive(Default)]
pub struct StructLayoutTable {
    layouts: Mutex<IndexMap<String, StructLayout>>,
}

impl StructLayoutTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, name: impl Into<String>, layout: StructLayout) {
        self.layouts.lock().unwrap().insert(name.into(), layout);
    }

    /// Resolves `field` on `struct_name`, climbing the parent chain when the
    /// field is inherited. Own fields are flattened after the parent's, so
    /// an inherited field's index is `parent_field_count + parent_index`.
    pub fn field_index(&self, struct_name: &str, field: &str) -> Option<usize> {
        let layouts = self.layouts.lock().unwrap();
        let mut current = layouts.get(struct_name)?;
        if let Some(&idx) = current.fields.get(field) {
            return Some(idx);
        }
        let mut base = current.fields.len();
        while let Some(parent_name) = &current.parent {
            current = layouts.get(parent_name)?;
            if let Some(&idx) = current.fields.get(field) {
                return Some(base + idx);
            }
            base += current.fields.len();
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_table_round_trips() {
        let table = GlobalConstantTable::new();
        table.register("M.K", ConstantValue::I32(42));
        assert_eq!(table.get("M.K"), Some(ConstantValue::I32(42)));
        assert_eq!(table.get("M.Missing"), None);
    }

    #[test]
    fn function_table_reports_return_type() {
        let table = GlobalFunctionTable::new();
        table.register("f", "void");
        assert_eq!(table.return_type_of("f").as_deref(), Some("void"));
    }

    #[test]
    fn struct_field_index_climbs_parent_chain() {
        let table = StructLayoutTable::new();
        let mut base_fields = IndexMap::new();
        base_fields.insert("x".to_string(), 0);
        table.register(
            "Base",
            StructLayout {
                fields: base_fields,
                parent: None,
            },
        );
        let mut child_fields = IndexMap::new();
        child_fields.insert("y".to_string(), 0);
        table.register(
            "Child",
            StructLayout {
                fields: child_fields,
                parent: Some("Base".to_string()),
            },
        );
        assert_eq!(table.field_index("Child", "y"), Some(0));
        assert_eq!(table.field_index("Child", "x"), Some(1));
        assert_eq!(table.field_index("Child", "missing"), None);
    }
}
