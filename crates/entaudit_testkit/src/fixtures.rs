//! Sample schemas.
//!
//! A small billing domain exercising every shape the engine handles:
//!
//! - `Customer`: plain audited type
//! - `Invoice`: versioned, with a quoted column, a column needing conversion
//!   SQL, an owning many-to-one and an inverse one-to-many
//! - `LineItem`: composite identifier
//! - `Shipment`: many-to-one onto `LineItem` through two join columns
//! - `Tag`: known to the metadata but not audited

use chrono::{NaiveDate, NaiveDateTime};
use entaudit_core::{
    AssociationDescriptor, ColumnType, EntityData, EntityRef, EntityTypeDescriptor,
    FieldDescriptor, MetadataRegistry,
};

/// `Customer` type name.
pub const CUSTOMER: &str = "Customer";
/// `Invoice` type name.
pub const INVOICE: &str = "Invoice";
/// `LineItem` type name.
pub const LINE_ITEM: &str = "LineItem";
/// `Shipment` type name.
pub const SHIPMENT: &str = "Shipment";
/// `Tag` type name.
pub const TAG: &str = "Tag";

/// Customer descriptor.
pub fn customer() -> EntityTypeDescriptor {
    EntityTypeDescriptor::new(CUSTOMER, "customer")
        .with_identifier(&["id"])
        .with_field(FieldDescriptor::new("id", ColumnType::Integer))
        .with_field(FieldDescriptor::new("name", ColumnType::String))
}

/// Invoice descriptor.
pub fn invoice() -> EntityTypeDescriptor {
    EntityTypeDescriptor::new(INVOICE, "invoice")
        .with_identifier(&["id"])
        .with_version_field("version")
        .with_field(FieldDescriptor::new("id", ColumnType::Integer))
        .with_field(FieldDescriptor::new("amount", ColumnType::Integer))
        .with_field(FieldDescriptor::new("issuedOn", ColumnType::Date).column("issued_on"))
        .with_field(FieldDescriptor::new("order", ColumnType::Integer).quoted())
        .with_field(FieldDescriptor::new("payload", ColumnType::Json).requires_sql_conversion())
        .with_field(FieldDescriptor::new("version", ColumnType::Integer))
        .with_association(
            AssociationDescriptor::many_to_one("customer", CUSTOMER)
                .join_column("customer_id", "id"),
        )
        .with_association(AssociationDescriptor::one_to_many("lines", LINE_ITEM))
}

/// Line item descriptor, keyed by `(invoiceId, lineNo)`.
pub fn line_item() -> EntityTypeDescriptor {
    EntityTypeDescriptor::new(LINE_ITEM, "line_item")
        .with_identifier(&["invoiceId", "lineNo"])
        .with_field(FieldDescriptor::new("invoiceId", ColumnType::Integer).column("invoice_id"))
        .with_field(FieldDescriptor::new("lineNo", ColumnType::SmallInt).column("line_no"))
        .with_field(FieldDescriptor::new("description", ColumnType::Text))
}

/// Shipment descriptor.
pub fn shipment() -> EntityTypeDescriptor {
    EntityTypeDescriptor::new(SHIPMENT, "shipment")
        .with_identifier(&["id"])
        .with_field(FieldDescriptor::new("id", ColumnType::Integer))
        .with_field(FieldDescriptor::new("carrier", ColumnType::String))
        .with_association(
            AssociationDescriptor::many_to_one("line", LINE_ITEM)
                .join_column("line_invoice_id", "invoice_id")
                .join_column("line_no", "line_no"),
        )
}

/// Tag descriptor.
pub fn tag() -> EntityTypeDescriptor {
    EntityTypeDescriptor::new(TAG, "tag")
        .with_identifier(&["id"])
        .with_field(FieldDescriptor::new("id", ColumnType::Integer))
        .with_field(FieldDescriptor::new("label", ColumnType::String))
}

/// Registry with every billing type; all but `Tag` are audited.
pub fn billing_registry() -> MetadataRegistry {
    let mut registry = MetadataRegistry::new();
    registry
        .audit(customer())
        .audit(invoice())
        .audit(line_item())
        .audit(shipment())
        .register(tag());
    registry
}

/// The instant every harness revision is stamped with.
pub fn epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 1)
        .and_then(|d| d.and_hms_opt(9, 30, 0))
        .unwrap_or_default()
}

/// The issue date used by [`invoice_data`].
pub fn issue_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap_or_default()
}

/// Customer state.
pub fn customer_data(name: &str) -> EntityData {
    EntityData::new().with_value("name", name)
}

/// Invoice state for `amount`, optionally billed to `customer`.
pub fn invoice_data(amount: i64, customer: Option<EntityRef>) -> EntityData {
    EntityData::new()
        .with_value("amount", amount)
        .with_value("issuedOn", issue_date())
        .with_value("order", 1i64)
        .with_value("payload", serde_json::json!({"currency": "EUR"}))
        .with_value("version", 1i64)
        .with_association("customer", customer)
}

/// Line item state.
pub fn line_item_data(invoice_id: i64, line_no: i64, description: &str) -> EntityData {
    EntityData::new()
        .with_value("invoiceId", invoice_id)
        .with_value("lineNo", line_no)
        .with_value("description", description)
}

/// Shipment state, optionally for `line`.
pub fn shipment_data(carrier: &str, line: Option<EntityRef>) -> EntityData {
    EntityData::new()
        .with_value("carrier", carrier)
        .with_association("line", line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use entaudit_core::MetadataSource;

    #[test]
    fn registry_audits_all_but_tag() {
        let registry = billing_registry();
        assert_eq!(registry.len(), 5);
        for name in [CUSTOMER, INVOICE, LINE_ITEM, SHIPMENT] {
            assert!(registry.is_audited(name), "{name} should be audited");
        }
        assert!(!registry.is_audited(TAG));
    }

    #[test]
    fn shipment_join_columns_map_to_line_item_fields() {
        let line = line_item();
        for join in &shipment().association("line").unwrap().join_columns {
            assert!(line.field_for_column(&join.target).is_some(), "{}", join.target);
        }
    }
}
