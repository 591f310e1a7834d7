use bazaar_query::{Clause, FilterSpec, Query, Sort, fields};
use bazaar_store::{Collection, MemoryStore, StoreError};
use bson::oid::ObjectId;
use bson::{Bson, doc};

fields! {
    enum ProductField {
        Name => "name",
        Price => "price",
        Category => "category",
    }
}

const PRODUCTS: &str = "products";

fn seeded() -> (MemoryStore, Vec<ObjectId>) {
    let store = MemoryStore::new();
    let products = store.collection(PRODUCTS);
    let mut ids = Vec::new();
    for (name, price, category) in [
        ("Glossy Tile", 120, "Tiles"),
        ("Matte Tile", 80, "Tiles"),
        ("Oak Plank", 300, "Wood"),
        ("Wall Paint", 45, "Paint"),
        ("Primer", 30, "Paint"),
    ] {
        let inserted = products
            .insert(doc! { "name": name, "price": price, "category": category })
            .unwrap();
        ids.push(inserted.get_object_id("_id").unwrap());
    }
    (store, ids)
}

#[test]
fn insert_assigns_id_and_timestamps() {
    let store = MemoryStore::new();
    let coll = store.collection("brands");
    let doc = coll.insert(doc! { "name": "Kajaria" }).unwrap();

    assert_eq!(doc.keys().next().map(String::as_str), Some("_id"));
    assert!(matches!(doc.get("createdAt"), Some(Bson::DateTime(_))));
    assert!(matches!(doc.get("updatedAt"), Some(Bson::DateTime(_))));
    assert_eq!(coll.len(), 1);
}

#[test]
fn insert_rejects_duplicate_and_non_object_ids() {
    let store = MemoryStore::new();
    let coll = store.collection("brands");
    let id = ObjectId::new();
    coll.insert(doc! { "_id": id, "name": "a" }).unwrap();

    assert!(matches!(
        coll.insert(doc! { "_id": id, "name": "b" }),
        Err(StoreError::DuplicateId(dup)) if dup == id
    ));
    assert!(matches!(
        coll.insert(doc! { "_id": "brand-1" }),
        Err(StoreError::InvalidDocument(_))
    ));
}

#[test]
fn collection_handles_share_data() {
    let store = MemoryStore::new();
    store.collection("users").insert(doc! { "fname": "Asha" }).unwrap();
    assert_eq!(store.collection("users").len(), 1);
    assert_eq!(store.collection_names(), vec!["users".to_string()]);
    assert!(store.drop_collection("users"));
    assert!(store.collection("users").is_empty());
}

#[test]
fn find_filters_sorts_and_pages() {
    let (store, _) = seeded();
    let products = store.collection(PRODUCTS);

    let filter = FilterSpec::new().with(Clause::one_of(
        ProductField::Category,
        vec![Bson::String("Tiles".into()), Bson::String("Paint".into())],
    ));
    let query = Query::new(filter.clone()).sort(Sort::asc(ProductField::Price));
    let names: Vec<String> = products
        .find(&query)
        .unwrap()
        .iter()
        .map(|d| d.get_str("name").unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["Primer", "Wall Paint", "Matte Tile", "Glossy Tile"]);
    assert_eq!(products.count(&filter).unwrap(), 4);

    let paged = Query {
        skip: Some(1),
        take: Some(2),
        ..query
    };
    let names: Vec<String> = products
        .find(&paged)
        .unwrap()
        .iter()
        .map(|d| d.get_str("name").unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["Wall Paint", "Matte Tile"]);
}

#[test]
fn newest_first_follows_insertion_order() {
    let (store, ids) = seeded();
    let products = store.collection(PRODUCTS);
    let found = products
        .find(&Query::default().sort(Sort::newest_first()))
        .unwrap();
    let found_ids: Vec<ObjectId> = found
        .iter()
        .map(|d| d.get_object_id("_id").unwrap())
        .collect();
    let mut expected = ids.clone();
    expected.reverse();
    assert_eq!(found_ids, expected);
}

#[test]
fn get_many_keeps_requested_order_and_skips_missing() {
    let (store, ids) = seeded();
    let products = store.collection(PRODUCTS);
    let found = products
        .get_many(&[ids[2], ObjectId::new(), ids[0]])
        .unwrap();
    assert_eq!(found.len(), 2);
    assert_eq!(found[0].get_str("name").unwrap(), "Oak Plank");
    assert_eq!(found[1].get_str("name").unwrap(), "Glossy Tile");
}

#[test]
fn update_merges_fields_but_never_the_id() {
    let (store, ids) = seeded();
    let products = store.collection(PRODUCTS);
    let updated = products
        .update(&ids[0], doc! { "_id": ObjectId::new(), "price": 99 })
        .unwrap()
        .unwrap();
    assert_eq!(updated.get_object_id("_id").unwrap(), ids[0]);
    assert_eq!(updated.get_i32("price").unwrap(), 99);
    assert_eq!(updated.get_str("name").unwrap(), "Glossy Tile");

    assert!(products.update(&ObjectId::new(), doc! {}).unwrap().is_none());
}

#[test]
fn replace_requires_existing_document() {
    let (store, ids) = seeded();
    let products = store.collection(PRODUCTS);

    let mut doc = products.get(&ids[1]).unwrap().unwrap();
    doc.insert("name", "Satin Tile");
    let replaced = products.replace(doc).unwrap().unwrap();
    assert_eq!(replaced.get_str("name").unwrap(), "Satin Tile");

    assert!(products.replace(doc! { "_id": ObjectId::new() }).unwrap().is_none());
    assert!(matches!(
        products.replace(doc! { "name": "no id" }),
        Err(StoreError::InvalidDocument(_))
    ));
}

#[test]
fn modify_commits_or_leaves_untouched() {
    let (store, ids) = seeded();
    let products = store.collection(PRODUCTS);

    let changed = products
        .modify(&ids[0], &mut |doc| {
            doc.insert("_id", ObjectId::new());
            doc.insert("price", 150);
            true
        })
        .unwrap()
        .unwrap();
    assert_eq!(changed.get_object_id("_id").unwrap(), ids[0]);
    assert_eq!(changed.get_i32("price").unwrap(), 150);

    let declined = products
        .modify(&ids[0], &mut |doc| {
            doc.insert("price", 1);
            false
        })
        .unwrap()
        .unwrap();
    assert_eq!(declined.get_i32("price").unwrap(), 150);
    assert_eq!(products.get(&ids[0]).unwrap().unwrap().get_i32("price").unwrap(), 150);

    let mut called = false;
    let missing = products
        .modify(&ObjectId::new(), &mut |_| {
            called = true;
            true
        })
        .unwrap();
    assert!(missing.is_none());
    assert!(!called);
}

#[test]
fn modify_serialises_concurrent_writers() {
    let store = MemoryStore::new();
    let counters = store.collection("counters");
    let id = counters
        .insert(doc! { "n": 0_i64 })
        .unwrap()
        .get_object_id("_id")
        .unwrap();

    std::thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| {
                for _ in 0..50 {
                    counters
                        .modify(&id, &mut |doc| {
                            let n = doc.get_i64("n").unwrap();
                            doc.insert("n", n + 1);
                            true
                        })
                        .unwrap();
                }
            });
        }
    });
    assert_eq!(counters.get(&id).unwrap().unwrap().get_i64("n").unwrap(), 400);
}

#[test]
fn insert_unless_skips_when_guard_matches() {
    let (store, _) = seeded();
    let products = store.collection(PRODUCTS);
    let primer = FilterSpec::new().with(Clause::equals(ProductField::Name, "Primer"));

    let skipped = products
        .insert_unless(doc! { "name": "Primer", "price": 35 }, &primer)
        .unwrap();
    assert!(skipped.is_none());
    assert_eq!(products.count(&primer).unwrap(), 1);

    let grout = FilterSpec::new().with(Clause::equals(ProductField::Name, "Grout"));
    let inserted = products
        .insert_unless(doc! { "name": "Grout", "price": 20 }, &grout)
        .unwrap()
        .unwrap();
    assert!(matches!(inserted.get("createdAt"), Some(Bson::DateTime(_))));
    assert_eq!(products.len(), 6);
}

#[test]
fn deletes() {
    let (store, ids) = seeded();
    let products = store.collection(PRODUCTS);

    assert!(products.delete(&ids[0]).unwrap().is_some());
    assert!(products.delete(&ids[0]).unwrap().is_none());
    assert_eq!(products.delete_many(&[ids[1], ids[2], ObjectId::new()]).unwrap(), 2);

    let paint = FilterSpec::new().with(Clause::equals(ProductField::Category, "Paint"));
    assert_eq!(products.delete_where(&paint).unwrap(), 2);
    assert!(products.is_empty());
}

#[test]
fn find_one_returns_first_match() {
    let (store, _) = seeded();
    let products = store.collection(PRODUCTS);
    let filter = FilterSpec::new().with(Clause::equals(ProductField::Name, "Primer"));
    let found = products.find_one(&filter).unwrap().unwrap();
    assert_eq!(found.get_i32("price").unwrap(), 30);

    let none = FilterSpec::new().with(Clause::equals(ProductField::Name, "Nope"));
    assert!(products.find_one(&none).unwrap().is_none());
}
