//! Integration tests for version-stamped caching of derived views.

mod common;

use common::shop_rows;
use schemagraph_core::ingest::ingest;
use schemagraph_core::{
    ColumnType, Database, DefaultValue, GraphConfig, NewColumn, NewConstraint, NewTable, TableId,
};
use std::sync::Arc;

fn blog(config: GraphConfig) -> (Database, TableId, TableId) {
    let mut db = Database::new("blog", config);
    let public = db.add_schema("public").unwrap();
    let account = db.add_table(public, NewTable::new("account")).unwrap();
    db.add_column(account, NewColumn::new("id", 1, ColumnType::new("integer")))
        .unwrap();
    db.add_constraint(account, NewConstraint::primary_key("account_pkey", ["id"]))
        .unwrap();

    let post = db.add_table(public, NewTable::new("post")).unwrap();
    db.add_column(post, NewColumn::new("id", 1, ColumnType::new("integer")))
        .unwrap();
    db.add_column(post, NewColumn::new("author_id", 2, ColumnType::new("integer")))
        .unwrap();
    (db, account, post)
}

#[test]
fn test_column_append_refreshes_views() {
    let (mut db, _, post) = blog(GraphConfig::default());
    assert!(db.serial_columns(post).is_empty());
    let before = db.serial_columns(post);

    let seq = db
        .add_column(
            post,
            NewColumn::new("seq", 3, ColumnType::new("bigint")).with_default(DefaultValue {
                raw: "nextval('post_seq'::regclass)".into(),
                value: "nextval('post_seq'::regclass)".into(),
            }),
        )
        .unwrap();

    assert!(before.is_empty());
    assert_eq!(*db.serial_columns(post), vec![seq]);
}

#[test]
fn test_constraint_append_refreshes_relations() {
    let (mut db, account, post) = blog(GraphConfig::default());
    assert!(db.one_to_many_relations(account).is_empty());
    assert!(db.foreign_key_columns(post).is_empty());
    assert!(db.named_relations(account).is_empty());

    db.add_constraint(
        post,
        NewConstraint::foreign_key("post_author_id_fkey", ["author_id"], "public", "account", ["id"]),
    )
    .unwrap();

    assert_eq!(db.one_to_many_relations(account).len(), 1);
    assert_eq!(db.many_to_one_relations(post).len(), 1);
    assert_eq!(db.foreign_key_columns(post).len(), 1);
    let named = db.named_relations(account);
    assert_eq!(named.len(), 1);
    assert_eq!(named[0].name, "post");
}

#[test]
fn test_target_lists_are_cached_and_refreshed() {
    let (mut db, account, post) = blog(GraphConfig::default());
    let before = db.has_many_tables(account);
    assert!(before.is_empty());
    assert!(Arc::ptr_eq(&before, &db.has_many_tables(account)));

    db.add_constraint(
        post,
        NewConstraint::foreign_key("post_author_id_fkey", ["author_id"], "public", "account", ["id"]),
    )
    .unwrap();

    assert_eq!(*db.has_many_tables(account), vec![post]);
    assert_eq!(*db.belongs_to_tables(post), vec![account]);

    let settled = db.cache_stats().recomputations;
    let again = db.belongs_to_tables(post);
    assert_eq!(*again, vec![account]);
    assert_eq!(db.cache_stats().recomputations, settled);
}

#[test]
fn test_frozen_reads_are_stable() {
    let db = ingest(&shop_rows(), "shop", GraphConfig::default()).unwrap();
    let cart = db.table_by_name("public", "cart").unwrap().id;

    let first = db.relations(cart);
    let second = db.relations(cart);
    let third = db.named_relations(cart);
    let fourth = db.named_relations(cart);

    assert!(Arc::ptr_eq(&first, &second));
    assert!(Arc::ptr_eq(&third, &fourth));
    assert!(db.cache_stats().hits >= 2);

    let settled = db.cache_stats().recomputations;
    let _ = db.relations(cart);
    let _ = db.named_relations(cart);
    let _ = db.many_to_many_relations_pk(cart);
    assert_eq!(db.cache_stats().recomputations, settled);
}

#[test]
fn test_disabled_cache_recomputes() {
    let db = ingest(&shop_rows(), "shop", GraphConfig::default().without_cache()).unwrap();
    let product = db.table_by_name("public", "product").unwrap().id;

    let first = db.many_to_one_relations(product);
    let after_first = db.cache_stats().recomputations;
    let second = db.many_to_one_relations(product);

    assert_eq!(first, second);
    assert!(!Arc::ptr_eq(&first, &second));
    assert!(db.cache_stats().recomputations > after_first);
    assert_eq!(db.cache_stats().hits, 0);
}

#[test]
fn test_concurrent_reads_after_freeze() {
    let db = ingest(&shop_rows(), "shop", GraphConfig::default()).unwrap();
    let tables: Vec<TableId> = db.all_tables().map(|t| t.id).collect();
    let expected: Vec<_> = tables
        .iter()
        .map(|&t| {
            let fresh = ingest(&shop_rows(), "shop", GraphConfig::default().without_cache())
                .unwrap();
            (*fresh.named_relations(t)).clone()
        })
        .collect();

    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                for (table, expected) in tables.iter().zip(&expected) {
                    assert_eq!(*db.named_relations(*table), *expected);
                    assert!(!db.relations(*table).is_empty());
                }
            });
        }
    });
}
