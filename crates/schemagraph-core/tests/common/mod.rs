//! Catalog row fixtures shared by the integration tests.

#![allow(dead_code)]

use schemagraph_core::{CatalogRows, ColumnRow, ConstraintRow, IndexRow};

pub fn column(table: &str, name: &str, ordinal: u32, data_type: &str) -> ColumnRow {
    ColumnRow {
        schema_name: "public".into(),
        table_name: table.into(),
        column_name: name.into(),
        ordinal_position: ordinal,
        data_type: data_type.into(),
        is_nullable: true,
        ..Default::default()
    }
}

pub fn primary_key(table: &str, columns: &[&str]) -> Vec<ConstraintRow> {
    columns
        .iter()
        .enumerate()
        .map(|(i, column)| ConstraintRow {
            schema_name: "public".into(),
            table_name: table.into(),
            constraint_name: format!("{table}_pkey"),
            constraint_type: "PRIMARY KEY".into(),
            column_name: (*column).into(),
            ordinal_position: i as u32 + 1,
            ..Default::default()
        })
        .collect()
}

pub fn foreign_key(name: &str, table: &str, column: &str, target: &str) -> ConstraintRow {
    ConstraintRow {
        schema_name: "public".into(),
        table_name: table.into(),
        constraint_name: name.into(),
        constraint_type: "FOREIGN KEY".into(),
        column_name: column.into(),
        ordinal_position: 1,
        referenced_schema: Some("public".into()),
        referenced_table: Some(target.into()),
        referenced_column: Some("id".into()),
        update_rule: Some("NO ACTION".into()),
        delete_rule: Some("CASCADE".into()),
        match_option: Some("SIMPLE".into()),
        ..Default::default()
    }
}

pub fn primary_key_index(table: &str, columns: &[&str]) -> Vec<IndexRow> {
    columns
        .iter()
        .enumerate()
        .map(|(i, column)| IndexRow {
            schema_name: "public".into(),
            table_name: table.into(),
            index_name: format!("{table}_pkey"),
            column_name: (*column).into(),
            ordinal_position: i as u32 + 1,
            is_unique: true,
            is_primary_key: true,
            ..Default::default()
        })
        .collect()
}

/// `size`, `color`, `vendor`, `product`, `cart` and the `line_item` join table.
pub fn shop_rows() -> CatalogRows {
    let mut rows = CatalogRows::default();

    for table in ["size", "color", "vendor", "cart"] {
        rows.columns.push(column(table, "id", 1, "integer"));
        rows.columns.push(column(table, "name", 2, "character varying(50)"));
    }
    rows.columns.push(column("product", "id", 1, "integer"));
    rows.columns.push(column("product", "color_id", 2, "integer"));
    rows.columns.push(column("product", "size_id", 3, "integer"));
    rows.columns.push(column("product", "vendor_id", 4, "integer"));
    rows.columns.push(column("line_item", "product_id", 1, "integer"));
    rows.columns.push(column("line_item", "cart_id", 2, "integer"));
    rows.columns.push(column("line_item", "quantity", 3, "integer"));

    for table in ["size", "color", "vendor", "cart", "product"] {
        rows.indexes.extend(primary_key_index(table, &["id"]));
        rows.constraints.extend(primary_key(table, &["id"]));
    }
    rows.indexes
        .extend(primary_key_index("line_item", &["product_id", "cart_id"]));
    rows.constraints
        .extend(primary_key("line_item", &["product_id", "cart_id"]));

    rows.constraints.extend([
        foreign_key("product_color_id_fkey", "product", "color_id", "color"),
        foreign_key("product_size_id_fkey", "product", "size_id", "size"),
        foreign_key("product_vendor_id_fkey", "product", "vendor_id", "vendor"),
        foreign_key("line_item_product_id_fkey", "line_item", "product_id", "product"),
        foreign_key("line_item_cart_id_fkey", "line_item", "cart_id", "cart"),
    ]);
    rows
}

/// `account` and `post`, where `post` references `account` twice.
pub fn blog_rows() -> CatalogRows {
    let mut rows = CatalogRows::default();
    rows.columns.push(column("account", "id", 1, "integer"));
    rows.columns.push(column("post", "id", 1, "integer"));
    rows.columns.push(column("post", "author_id", 2, "integer"));
    rows.columns.push(column("post", "editor_id", 3, "integer"));

    rows.constraints.extend(primary_key("account", &["id"]));
    rows.constraints.extend(primary_key("post", &["id"]));
    rows.constraints.extend([
        foreign_key("post_author_id_fkey", "post", "author_id", "account"),
        foreign_key("post_editor_id_fkey", "post", "editor_id", "account"),
    ]);
    rows
}
