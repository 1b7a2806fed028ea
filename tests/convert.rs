//! User converter methods: transform and streaming styles, conflicts,
//! direction fallback, null handling, and error unwrapping.

use std::sync::Arc;

use tatami::{
    AnyValue, ClassDef, ClassRef, Converters, ErrorCategory, JsonErrorKind, MethodSig,
    QualifierSet, Registry, Type, any_bridge,
};

#[derive(Debug, Clone, PartialEq)]
struct Point {
    x: i32,
    y: i32,
}

any_bridge!(Point);

fn point_class() -> ClassRef {
    ClassDef::new::<Point>("Point").register()
}

#[test]
fn transform_converters_round_trip_a_point_as_a_pair() {
    let point = point_class();
    let converters = Converters::new()
        .map_to_json::<Point, Vec<i32>>(MethodSig::of(point.ty()), |p| Ok(vec![p.x, p.y]))
        .map_from_json::<Point, Vec<i32>>(MethodSig::of(point.ty()), |pair| {
            match pair.as_slice() {
                [x, y] => Ok(Point { x: *x, y: *y }),
                _ => Err("expected a two-element array".into()),
            }
        });
    let registry = Registry::builder().add_converters(converters).unwrap().build();
    let adapter = registry.adapter(&point.ty(), &QualifierSet::empty()).unwrap();

    assert_eq!(adapter.write_value(Point { x: 3, y: 4 }).unwrap(), "[3,4]");
    let point: Point = adapter.read("[3,4]").unwrap();
    assert_eq!(point, Point { x: 3, y: 4 });
}

#[test]
fn streaming_converters_drive_the_tokenizers_directly() {
    let point = point_class();
    let delegates = vec![(Type::of::<i32>(), QualifierSet::empty())];
    let converters = Converters::new()
        .write_with(MethodSig::of(point.ty()), delegates.clone(), |writer, value, adapters| {
            let p = value.get::<Point>().ok_or("not a point")?;
            writer.begin_object()?;
            writer.name("x")?;
            adapters[0].to_json(writer, &AnyValue::new(p.x))?;
            writer.name("y")?;
            adapters[0].to_json(writer, &AnyValue::new(p.y))?;
            writer.end_object()?;
            Ok(())
        })
        .read_with(MethodSig::of(point.ty()), delegates, |reader, adapters| {
            let mut x = 0;
            let mut y = 0;
            reader.begin_object()?;
            while reader.has_next()? {
                match reader.next_name()?.as_str() {
                    "x" => x = *adapters[0].from_json(reader)?.get::<i32>().ok_or("bad x")?,
                    "y" => y = *adapters[0].from_json(reader)?.get::<i32>().ok_or("bad y")?,
                    _ => reader.skip_value()?,
                }
            }
            reader.end_object()?;
            Ok(AnyValue::new(Point { x, y }))
        });
    let registry = Registry::builder().add_converters(converters).unwrap().build();
    let adapter = registry.adapter(&point.ty(), &QualifierSet::empty()).unwrap();

    assert_eq!(
        adapter.write_value(Point { x: 1, y: 2 }).unwrap(),
        r#"{"x":1,"y":2}"#
    );
    let read: Point = adapter.read(r#"{"y":2,"x":1}"#).unwrap();
    assert_eq!(read, Point { x: 1, y: 2 });
}

#[test]
fn conflicting_registrations_fail_at_build() {
    let point = point_class();
    let converters = Converters::new()
        .map_to_json::<Point, Vec<i32>>(MethodSig::of(point.ty()), |p| Ok(vec![p.x, p.y]))
        .map_to_json::<Point, String>(MethodSig::of(point.ty()), |p| Ok(format!("{},{}", p.x, p.y)));
    let err = Registry::builder().add_converters(converters).unwrap_err();
    assert!(matches!(err.kind, JsonErrorKind::ConflictingConverters { .. }));
    assert_eq!(err.category(), ErrorCategory::Registration);
}

#[test]
fn missing_direction_without_fallback_fails_on_first_use() {
    // Point has no fields and no constructor, so nothing later in the
    // chain can read it.
    let point = point_class();
    let converters = Converters::new()
        .map_to_json::<Point, Vec<i32>>(MethodSig::of(point.ty()), |p| Ok(vec![p.x, p.y]));
    let registry = Registry::builder().add_converters(converters).unwrap().build();
    let adapter = registry.adapter(&point.ty(), &QualifierSet::empty()).unwrap();

    assert_eq!(adapter.write_value(Point { x: 5, y: 6 }).unwrap(), "[5,6]");
    let err = adapter.from_json_str("[5,6]").unwrap_err();
    assert!(matches!(err.kind, JsonErrorKind::NoAdapter { .. }));
}

#[test]
fn null_short_circuits_unless_the_method_is_nullable() {
    let point = point_class();
    let converters = Converters::new()
        .map_to_json::<Point, Vec<i32>>(MethodSig::of(point.ty()), |_| {
            Err("the converter must not see null".into())
        })
        .map_from_json::<Point, Vec<i32>>(MethodSig::of(point.ty()), |_| {
            Err("the converter must not see null".into())
        });
    let registry = Registry::builder().add_converters(converters).unwrap().build();
    let adapter = registry.adapter(&point.ty(), &QualifierSet::empty()).unwrap();

    assert_eq!(adapter.to_json_string(&AnyValue::null()).unwrap(), "null");
    assert!(adapter.from_json_str("null").unwrap().is_null());
}

#[test]
fn user_errors_become_data_errors_with_a_path() {
    let point = point_class();
    let converters = Converters::new().map_from_json::<Point, Vec<i32>>(
        MethodSig::of(point.ty()),
        |_| Err("three coordinates required".into()),
    );
    let registry = Registry::builder().add_converters(converters).unwrap().build();
    let adapter = registry.adapter(&point.ty(), &QualifierSet::empty()).unwrap();

    let err = adapter.from_json_str("[1,2]").unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Data);
    assert!(err.to_string().contains("three coordinates required"));
}

#[test]
fn io_causes_pass_through_unchanged() {
    let point = point_class();
    let converters = Converters::new().map_from_json::<Point, Vec<i32>>(
        MethodSig::of(point.ty()),
        |_| {
            Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "pipe closed",
            )))
        },
    );
    let registry = Registry::builder().add_converters(converters).unwrap().build();
    let adapter = registry.adapter(&point.ty(), &QualifierSet::empty()).unwrap();

    let err = adapter.from_json_str("[1,2]").unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Io);
}

#[test]
fn qualified_converters_coexist_with_plain_ones() {
    use tatami::Qualifier;
    let point = point_class();
    let compact = QualifierSet::of(&[Qualifier("Compact")]);
    let converters = Converters::new()
        .map_to_json::<Point, Vec<i32>>(MethodSig::of(point.ty()), |p| Ok(vec![p.x, p.y]))
        .map_to_json::<Point, String>(
            MethodSig::of(point.ty()).qualified(compact.clone()),
            |p| Ok(format!("{}x{}", p.x, p.y)),
        );
    let registry = Registry::builder().add_converters(converters).unwrap().build();

    let plain = registry.adapter(&point.ty(), &QualifierSet::empty()).unwrap();
    assert_eq!(plain.write_value(Point { x: 1, y: 2 }).unwrap(), "[1,2]");

    let qualified = registry.adapter(&point.ty(), &compact).unwrap();
    assert_eq!(qualified.write_value(Point { x: 1, y: 2 }).unwrap(), "\"1x2\"");
}
