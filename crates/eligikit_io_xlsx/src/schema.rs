//! Statically declared column-descriptor tables for exportable record types.
//!
//! A record type opts into export by implementing [`ExportRecord`] and
//! returning a [`SpecRecordSchema`] that lists its fields in declaration
//! order, each with an accessor and optional display metadata.

use std::fmt;

use crate::spec::EnumCellValue;

type FnCellAccessor<T> = Box<dyn Fn(&T) -> EnumCellValue + Send + Sync>;

/// One exportable field of `T`.
pub struct SpecColumnDescriptor<T> {
    name: String,
    display_name: Option<String>,
    order: Option<i64>,
    accessor: FnCellAccessor<T>,
}

impl<T> SpecColumnDescriptor<T> {
    /// Create a descriptor with no display metadata.
    pub fn new<F>(name: impl Into<String>, accessor: F) -> Self
    where
        F: Fn(&T) -> EnumCellValue + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            display_name: None,
            order: None,
            accessor: Box::new(accessor),
        }
    }

    /// Attach a display-order hint (lower sorts first).
    pub fn with_order(mut self, order: i64) -> Self {
        self.order = Some(order);
        self
    }

    /// Attach a human-readable display name.
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Optional display name.
    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    /// Optional display-order hint.
    pub fn order(&self) -> Option<i64> {
        self.order
    }

    /// Read this field's value from `record`.
    pub fn read(&self, record: &T) -> EnumCellValue {
        (self.accessor)(record)
    }
}

impl<T> fmt::Debug for SpecColumnDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpecColumnDescriptor")
            .field("name", &self.name)
            .field("display_name", &self.display_name)
            .field("order", &self.order)
            .finish_non_exhaustive()
    }
}

/// Ordered column-descriptor table for `T`.
pub struct SpecRecordSchema<T> {
    columns: Vec<SpecColumnDescriptor<T>>,
}

impl<T> SpecRecordSchema<T> {
    /// Create an empty schema.
    pub fn new() -> Self {
        Self { columns: vec![] }
    }

    /// Append a field in declaration order.
    pub fn column<V, F>(self, name: impl Into<String>, accessor: F) -> Self
    where
        T: 'static,
        V: Into<EnumCellValue>,
        F: Fn(&T) -> V + Send + Sync + 'static,
    {
        self.push(SpecColumnDescriptor::new(name, move |record: &T| {
            accessor(record).into()
        }))
    }

    /// Append a field carrying a display-order hint.
    pub fn column_with_order<V, F>(self, name: impl Into<String>, order: i64, accessor: F) -> Self
    where
        T: 'static,
        V: Into<EnumCellValue>,
        F: Fn(&T) -> V + Send + Sync + 'static,
    {
        self.push(
            SpecColumnDescriptor::new(name, move |record: &T| accessor(record).into())
                .with_order(order),
        )
    }

    /// Append a fully configured descriptor.
    pub fn push(mut self, descriptor: SpecColumnDescriptor<T>) -> Self {
        self.columns.push(descriptor);
        self
    }

    /// Descriptors in declaration order.
    pub fn columns(&self) -> &[SpecColumnDescriptor<T>] {
        &self.columns
    }

    /// Field names in declaration order.
    pub fn names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Number of declared fields.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether no field is declared.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl<T> Default for SpecRecordSchema<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for SpecRecordSchema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpecRecordSchema")
            .field("columns", &self.columns)
            .finish()
    }
}

/// Record types that expose a column-descriptor table.
pub trait ExportRecord: Sized {
    /// Column descriptors in field declaration order.
    fn schema() -> SpecRecordSchema<Self>;
}
