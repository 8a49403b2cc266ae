//! Integration tests for relation inference and naming.

mod common;

use common::{blog_rows, column, foreign_key, primary_key, shop_rows};
use schemagraph_core::ingest::ingest;
use schemagraph_core::{
    Cardinality, CatalogRows, Database, GraphConfig, NamingStrategy, Relation, SelfJoinPolicy,
    TableId,
};
use std::sync::Arc;

fn table(db: &Database, name: &str) -> TableId {
    db.table_by_name("public", name).unwrap().id
}

fn targets(db: &Database, relations: &[Relation]) -> Vec<String> {
    relations
        .iter()
        .map(|r| db.table(r.target).name.clone())
        .collect()
}

fn names(db: &Database, table: TableId, strategy: NamingStrategy) -> Vec<String> {
    db.named_relations_with(table, strategy)
        .iter()
        .map(|r| r.name.clone())
        .collect()
}

#[test]
fn test_many_to_one_and_one_to_many() {
    let db = ingest(&shop_rows(), "shop", GraphConfig::default()).unwrap();
    let product = table(&db, "product");
    let color = table(&db, "color");

    let m2o = db.many_to_one_relations(product);
    assert_eq!(targets(&db, &m2o), vec!["color", "size", "vendor"]);
    assert!(m2o.iter().all(|r| r.cardinality == Cardinality::ManyToOne));

    let o2m = db.one_to_many_relations(color);
    assert_eq!(o2m.len(), 1);
    assert_eq!(o2m[0].source, color);
    assert_eq!(o2m[0].target, product);
    assert_eq!(o2m[0].inverse(), m2o[0]);
}

#[test]
fn test_many_to_many_through_line_item() {
    let db = ingest(&shop_rows(), "shop", GraphConfig::default()).unwrap();
    let cart = table(&db, "cart");
    let product = table(&db, "product");
    let line_item = table(&db, "line_item");

    let cart_m2m = db.many_to_many_relations(cart);
    assert_eq!(cart_m2m.len(), 1);
    assert_eq!(cart_m2m[0].source, cart);
    assert_eq!(cart_m2m[0].join_table, Some(line_item));
    assert_eq!(cart_m2m[0].target, product);
    assert_eq!(*db.many_to_many_relations_pk(cart), *cart_m2m);

    let product_pk = db.many_to_many_relations_pk(product);
    assert_eq!(product_pk.len(), 1);
    assert_eq!(product_pk[0], cart_m2m[0].inverse());

    // `product` itself joins size, color and vendor, but not through its primary key.
    let size = table(&db, "size");
    assert_eq!(targets(&db, &db.many_to_many_relations(size)), vec!["color", "vendor"]);
    assert!(db.many_to_many_relations_pk(size).is_empty());
    assert_eq!(targets(&db, &db.many_to_many_relations(product)), vec!["cart"]);
}

#[test]
fn test_combined_relations_and_table_views() {
    let db = ingest(&shop_rows(), "shop", GraphConfig::default()).unwrap();
    let product = table(&db, "product");

    let all = db.relations(product);
    let kinds: Vec<_> = all.iter().map(|r| r.cardinality).collect();
    assert_eq!(
        kinds,
        vec![
            Cardinality::OneToMany,
            Cardinality::ManyToOne,
            Cardinality::ManyToOne,
            Cardinality::ManyToOne,
            Cardinality::ManyToMany
        ]
    );

    let full = |ids: Arc<Vec<TableId>>| -> Vec<String> {
        ids.iter().map(|&id| db.table_full_name(id)).collect()
    };
    assert_eq!(full(db.has_many_tables(product)), vec!["public.line_item"]);
    assert_eq!(
        full(db.belongs_to_tables(product)),
        vec!["public.color", "public.size", "public.vendor"]
    );
    assert_eq!(full(db.belongs_to_many_tables(product)), vec!["public.cart"]);
    assert_eq!(full(db.belongs_to_many_tables_pk(product)), vec!["public.cart"]);

    let fk_columns: Vec<_> = db
        .foreign_key_columns(product)
        .iter()
        .map(|&c| db.column(c).name.clone())
        .collect();
    assert_eq!(fk_columns, vec!["color_id", "size_id", "vendor_id"]);
    assert_eq!(db.foreign_key_constraints_to(product).len(), 1);
}

#[test]
fn test_column_index_views() {
    let db = ingest(&shop_rows(), "shop", GraphConfig::default()).unwrap();
    let line_item = table(&db, "line_item");
    let cart_id = db.table(line_item).column_id("cart_id").unwrap();

    assert_eq!(db.column_indexes(cart_id).len(), 1);
    assert_eq!(db.unique_indexes(cart_id).len(), 1);
    assert!(db.unique_indexes_no_pk(cart_id).is_empty());
    assert!(db.is_primary_key(cart_id));

    let cart = table(&db, "cart");
    let referenced = db.referenced_columns(cart_id);
    assert_eq!(referenced, vec![db.table(cart).column_id("id").unwrap()]);
}

#[test]
fn test_default_names() {
    let db = ingest(&shop_rows(), "shop", GraphConfig::default()).unwrap();
    let product = table(&db, "product");
    assert_eq!(
        names(&db, product, NamingStrategy::Complex),
        vec!["line_item", "color", "size", "vendor", "cart"]
    );
    assert_eq!(
        names(&db, table(&db, "cart"), NamingStrategy::Complex),
        vec!["line_item", "product"]
    );
}

#[test]
fn test_collisions_simple_vs_complex() {
    let db = ingest(&blog_rows(), "blog", GraphConfig::default()).unwrap();
    let account = table(&db, "account");

    assert_eq!(names(&db, account, NamingStrategy::Simple), vec!["post", "post"]);
    assert_eq!(
        names(&db, account, NamingStrategy::Complex),
        vec!["post_post_author_id_fkey", "post_post_editor_id_fkey"]
    );
    assert_eq!(
        names(&db, table(&db, "post"), NamingStrategy::Complex),
        vec!["author", "editor"]
    );
    // No collisions: both strategies agree.
    let post = table(&db, "post");
    assert_eq!(
        names(&db, post, NamingStrategy::Simple),
        names(&db, post, NamingStrategy::Complex)
    );
}

#[test]
fn test_named_relations_uses_configured_strategy() {
    let config = GraphConfig::default().with_naming(NamingStrategy::Simple);
    let db = ingest(&blog_rows(), "blog", config).unwrap();
    let account = table(&db, "account");
    let named: Vec<_> = db
        .named_relations(account)
        .iter()
        .map(|r| r.name.clone())
        .collect();
    assert_eq!(named, vec!["post", "post"]);
}

#[test]
fn test_annotation_names() {
    let mut rows = blog_rows();
    rows.columns[1].table_annotations = Some(serde_json::json!({
        "name": {
            "belongsTo": { "post_author_id_fkey": "writer" },
            "hasMany": { "post_editor_id_fkey": "edited_posts" }
        }
    }));
    let db = ingest(&rows, "blog", GraphConfig::default()).unwrap();

    assert_eq!(
        names(&db, table(&db, "post"), NamingStrategy::Complex),
        vec!["writer", "editor"]
    );
    assert_eq!(
        names(&db, table(&db, "account"), NamingStrategy::Complex),
        vec!["post", "edited_posts"]
    );
}

#[test]
fn test_many_to_many_annotation_prefix() {
    let mut rows = shop_rows();
    for row in rows.columns.iter_mut().filter(|r| r.table_name == "line_item") {
        row.table_annotations = Some(serde_json::json!({ "name": { "m2m": "purchased" } }));
    }
    let db = ingest(&rows, "shop", GraphConfig::default()).unwrap();
    let cart = table(&db, "cart");
    let named = db.named_relations(cart);
    assert_eq!(named[1].name, "purchased_product");
}

#[test]
fn test_constraint_name_hints() {
    let mut rows = CatalogRows::default();
    rows.columns.push(column("account", "id", 1, "integer"));
    rows.columns.push(column("post", "id", 1, "integer"));
    rows.columns.push(column("post", "account_ref", 2, "integer"));
    rows.constraints.extend(primary_key("account", &["id"]));
    rows.constraints.extend(primary_key("post", &["id"]));
    rows.constraints.push(foreign_key(
        "author,authored_posts,",
        "post",
        "account_ref",
        "account",
    ));
    let db = ingest(&rows, "blog", GraphConfig::default()).unwrap();

    assert_eq!(names(&db, table(&db, "post"), NamingStrategy::Simple), vec!["author"]);
    assert_eq!(
        names(&db, table(&db, "account"), NamingStrategy::Simple),
        vec!["authored_posts"]
    );
}

#[test]
fn test_missing_id_suffix_uses_prefix() {
    let mut rows = CatalogRows::default();
    rows.columns.push(column("account", "id", 1, "integer"));
    rows.columns.push(column("post", "id", 1, "integer"));
    rows.columns.push(column("post", "owner", 2, "integer"));
    rows.constraints.extend(primary_key("account", &["id"]));
    rows.constraints
        .push(foreign_key("post_owner_fkey", "post", "owner", "account"));

    let db = ingest(&rows, "blog", GraphConfig::default()).unwrap();
    let post = table(&db, "post");
    assert_eq!(db.relation_name(&db.many_to_one_relations(post)[0]), "related_account");

    let db = ingest(
        &rows,
        "blog",
        GraphConfig::default().with_relation_prefix("linked"),
    )
    .unwrap();
    let post = table(&db, "post");
    assert_eq!(db.relation_name(&db.many_to_one_relations(post)[0]), "linked_account");
}

#[test]
fn test_self_join_policy() {
    let db = ingest(&blog_rows(), "blog", GraphConfig::default()).unwrap();
    assert!(db.many_to_many_relations(table(&db, "account")).is_empty());

    let config = GraphConfig::default().with_self_join(SelfJoinPolicy::Permit);
    let db = ingest(&blog_rows(), "blog", config).unwrap();
    let account = table(&db, "account");
    let m2m = db.many_to_many_relations(account);
    assert_eq!(m2m.len(), 2);
    assert!(m2m
        .iter()
        .all(|r| r.source == account && r.target == account));
    assert_ne!(m2m[0].constraint, m2m[1].constraint);
}
