//! End-to-end round trips through registered class shapes.

use indexmap::IndexMap;
use tatami::{
    AnyValue, ClassDef, ClassLinks, ClassRef, FieldDef, JsonErrorKind, QualifierSet, Registry,
    Type, any_bridge, classes,
};

#[derive(Debug, Clone, PartialEq, Default)]
struct User {
    name: String,
    followers_count: i32,
}

#[derive(Debug, Clone, PartialEq, Default)]
struct Tweet {
    id: i64,
    text: String,
    geo: Option<Vec<f64>>,
    user: User,
}

#[derive(Debug, Clone, PartialEq, Default)]
struct Employee {
    name: String,
    reports: Vec<Employee>,
}

any_bridge!(User, Tweet, Employee);

fn user_class() -> ClassRef {
    ClassDef::new::<User>("User")
        .construct_with(|| AnyValue::new(User::default()))
        .field(FieldDef::new::<User, String>(
            "name",
            Type::of::<String>(),
            |u| u.name.clone(),
            |u, v| u.name = v,
        ))
        .field(FieldDef::new::<User, i32>(
            "followers_count",
            Type::of::<i32>(),
            |u| u.followers_count,
            |u, v| u.followers_count = v,
        ))
        .register()
}

fn tweet_class() -> ClassRef {
    let user = user_class();
    ClassDef::new::<Tweet>("Tweet")
        .construct_with(|| AnyValue::new(Tweet::default()))
        .field(FieldDef::new::<Tweet, i64>(
            "id",
            Type::of::<i64>(),
            |t| t.id,
            |t, v| t.id = v,
        ))
        .field(FieldDef::new::<Tweet, String>(
            "text",
            Type::of::<String>(),
            |t| t.text.clone(),
            |t, v| t.text = v,
        ))
        .field(FieldDef::new::<Tweet, Option<Vec<f64>>>(
            "geo",
            Type::of::<Vec<f64>>(),
            |t| t.geo.clone(),
            |t, v| t.geo = v,
        ))
        .field(FieldDef::new::<Tweet, User>(
            "user",
            user.ty(),
            |t| t.user.clone(),
            |t, v| t.user = v,
        ))
        .register()
}

fn employee_class() -> ClassRef {
    ClassDef::new::<Employee>("Employee")
        .construct_with(|| AnyValue::new(Employee::default()))
        .field(FieldDef::new::<Employee, String>(
            "name",
            Type::of::<String>(),
            |e| e.name.clone(),
            |e, v| e.name = v,
        ))
        .register_linked(|employee| ClassLinks {
            fields: vec![FieldDef::new::<Employee, Vec<Employee>>(
                "reports",
                classes::list().of(vec![employee.ty()]),
                |e| e.reports.clone(),
                |e, v| e.reports = v,
            )],
            ..ClassLinks::default()
        })
}

#[test]
fn nested_object_round_trips_byte_for_byte() {
    let tweet = tweet_class();
    let registry = Registry::builder().build();
    let adapter = registry.adapter(&tweet.ty(), &QualifierSet::empty()).unwrap();

    let doc = r#"{"id":912345678901,"text":"hi","geo":null,"user":{"name":"j","followers_count":41}}"#;
    let value: Tweet = adapter.read(doc).unwrap();
    assert_eq!(
        value,
        Tweet {
            id: 912345678901,
            text: "hi".to_owned(),
            geo: None,
            user: User {
                name: "j".to_owned(),
                followers_count: 41,
            },
        }
    );
    assert_eq!(adapter.write_value(value).unwrap(), doc);
}

#[test]
fn scalar_array_round_trips() {
    let registry = Registry::builder().build();
    let adapter = registry.adapter_of::<Vec<i32>>().unwrap();
    let numbers: Vec<i32> = adapter.read("[1,2,3]").unwrap();
    assert_eq!(numbers, vec![1, 2, 3]);
    assert_eq!(adapter.write_value(numbers).unwrap(), "[1,2,3]");
}

#[test]
fn unknown_names_skip_by_default_and_fail_when_asked() {
    #[derive(Debug, Clone, PartialEq, Default)]
    struct OnlyA {
        a: i64,
    }
    any_bridge!(OnlyA);

    let class = ClassDef::new::<OnlyA>("OnlyA")
        .construct_with(|| AnyValue::new(OnlyA::default()))
        .field(FieldDef::new::<OnlyA, i64>(
            "a",
            Type::of::<i64>(),
            |v| v.a,
            |v, a| v.a = a,
        ))
        .register();
    let registry = Registry::builder().build();
    let adapter = registry.adapter(&class.ty(), &QualifierSet::empty()).unwrap();

    let value: OnlyA = adapter.read(r#"{"a":1,"b":2}"#).unwrap();
    assert_eq!(value, OnlyA { a: 1 });

    let err = adapter
        .fail_on_unknown()
        .read::<OnlyA>(r#"{"a":1,"b":2}"#)
        .unwrap_err();
    assert_eq!(err.path.as_deref(), Some("$.b"));
    assert!(matches!(err.kind, JsonErrorKind::UnknownName { .. }));
}

#[test]
fn unknown_name_suggestions_name_the_closest_field() {
    let tweet = tweet_class();
    let registry = Registry::builder().build();
    let adapter = registry.adapter(&tweet.ty(), &QualifierSet::empty()).unwrap();
    let err = adapter
        .fail_on_unknown()
        .from_json_str(r#"{"tex":"typo"}"#)
        .unwrap_err();
    match err.kind {
        JsonErrorKind::UnknownName { name, suggestion, .. } => {
            assert_eq!(name, "tex");
            assert_eq!(suggestion.as_deref(), Some("text"));
        }
        other => panic!("unexpected kind {other:?}"),
    }
}

#[test]
fn duplicate_map_keys_fail_with_both_values() {
    let registry = Registry::builder().build();
    let adapter = registry.adapter_of::<IndexMap<String, i64>>().unwrap();
    let err = adapter.from_json_str(r#"{"a":1,"a":2}"#).unwrap_err();
    assert_eq!(err.path.as_deref(), Some("$.a"));
    match err.kind {
        JsonErrorKind::DuplicateKey { first, second, .. } => {
            assert_eq!(first, "1");
            assert_eq!(second, "2");
        }
        other => panic!("unexpected kind {other:?}"),
    }
}

#[test]
fn map_round_trips_in_insertion_order() {
    let registry = Registry::builder().build();
    let adapter = registry.adapter_of::<IndexMap<String, i64>>().unwrap();
    let map: IndexMap<String, i64> = adapter.read(r#"{"z":1,"a":2}"#).unwrap();
    assert_eq!(map.get_index(0), Some((&"z".to_owned(), &1)));
    assert_eq!(adapter.write_value(map).unwrap(), r#"{"z":1,"a":2}"#);
}

#[test]
fn sets_ignore_order() {
    use std::collections::HashSet;
    let registry = Registry::builder().build();
    let adapter = registry.adapter_of::<HashSet<i64>>().unwrap();
    let set: HashSet<i64> = adapter.read("[3,1,2]").unwrap();
    assert_eq!(set, HashSet::from([1, 2, 3]));
}

#[test]
fn self_referential_shape_resolves_and_round_trips() {
    let employee = employee_class();
    let registry = Registry::builder().build();
    let adapter = registry
        .adapter(&employee.ty(), &QualifierSet::empty())
        .unwrap();

    let doc = r#"{"name":"a","reports":[{"name":"b","reports":[]}]}"#;
    let boss: Employee = adapter.read(doc).unwrap();
    assert_eq!(boss.name, "a");
    assert_eq!(boss.reports.len(), 1);
    assert_eq!(boss.reports[0].name, "b");
    assert_eq!(adapter.write_value(boss).unwrap(), doc);
}

#[test]
fn tree_values_round_trip_through_the_object_adapter() {
    let registry = Registry::builder().build();
    let adapter = registry.adapter_of::<tatami::JsonValue>().unwrap();
    let doc = r#"{"a":[1,2.5,"x",true,null],"b":{"c":false}}"#;
    let tree: tatami::JsonValue = adapter.read(doc).unwrap();
    assert_eq!(adapter.write_value(tree).unwrap(), doc);
}
