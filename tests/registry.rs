//! Registry lookup, wrappers, qualifiers, enums, and the audit hook.

use std::sync::{Arc, Mutex};

use tatami::{
    AnyAdapter, AnyValue, Buffer, ClassDef, EnumDef, ErrorCategory, FieldDef, JsonAudit,
    JsonErrorKind, JsonReader, JsonWriter, Qualifier, QualifierSet, Registry, Result, Type,
    any_bridge, classes,
};

#[test]
fn lookup_failure_is_a_registration_error() {
    let registry = Registry::builder().build();
    let orphan = Type::variable("T", classes::list());
    let err = registry
        .adapter(&orphan, &QualifierSet::empty())
        .unwrap_err();
    assert!(matches!(err.kind, JsonErrorKind::NoAdapter { .. }));
    assert_eq!(err.category(), ErrorCategory::Registration);
}

#[test]
fn adapters_are_cached_per_key() {
    let registry = Registry::builder().build();
    let a = registry.adapter_of::<Vec<i64>>().unwrap();
    let b = registry.adapter_of::<Vec<i64>>().unwrap();
    assert!(Arc::ptr_eq(a.erased(), b.erased()));
    let c = registry.adapter_of::<Vec<i32>>().unwrap();
    assert!(!Arc::ptr_eq(a.erased(), c.erased()));
}

#[test]
fn null_safe_and_non_null_do_not_stack() {
    let registry = Registry::builder().build();
    let adapter = registry.adapter_of::<i64>().unwrap();
    let null_safe = adapter.null_safe();
    assert!(Arc::ptr_eq(null_safe.erased(), null_safe.null_safe().erased()));
    let non_null = adapter.non_null();
    assert!(Arc::ptr_eq(non_null.erased(), non_null.non_null().erased()));
}

#[test]
fn non_null_refuses_nulls_on_both_sides() {
    let registry = Registry::builder().build();
    let adapter = registry.adapter_of::<Vec<i64>>().unwrap().non_null();
    let err = adapter.from_json_str("null").unwrap_err();
    assert!(matches!(err.kind, JsonErrorKind::UnexpectedNull { .. }));
    let err = adapter.to_json_string(&AnyValue::null()).unwrap_err();
    assert!(matches!(err.kind, JsonErrorKind::UnexpectedNull { .. }));
}

#[test]
fn lenient_wrapper_restores_the_flag() {
    let registry = Registry::builder().build();
    let adapter = registry.adapter_of::<f64>().unwrap();

    let err = adapter.from_json_str("NaN").unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Syntax);

    let lenient = adapter.lenient();
    let mut reader = JsonReader::new(Buffer::from("NaN NaN"));
    reader.set_lenient(true); // multi-value document
    let value = lenient.from_json(&mut reader).unwrap();
    assert!(value.get::<f64>().unwrap().is_nan());
    assert!(reader.is_lenient());
}

#[test]
fn indent_wrapper_overrides_and_restores() {
    let registry = Registry::builder().build();
    let adapter = registry.adapter_of::<Vec<i64>>().unwrap();
    let pretty = adapter.indent("  ");
    assert_eq!(
        pretty.write_value(vec![1i64, 2]).unwrap(),
        "[\n  1,\n  2\n]"
    );

    use tatami::IntoAny;
    let mut buffer = Buffer::new();
    let mut writer = JsonWriter::new(&mut buffer);
    writer.begin_array().unwrap();
    pretty.to_json(&mut writer, &vec![1i64].into_any()).unwrap();
    assert_eq!(writer.indent(), "");
    writer.end_array().unwrap();
    writer.close().unwrap();
}

#[test]
fn qualified_adapters_dispatch_before_builtins() {
    struct HexAdapter;

    impl AnyAdapter for HexAdapter {
        fn read(&self, reader: &mut JsonReader) -> Result<AnyValue> {
            let text = reader.next_string()?;
            let digits = text.trim_start_matches("0x");
            let value = i64::from_str_radix(digits, 16)
                .map_err(|e| tatami::JsonError::invalid_value(e.to_string()))?;
            Ok(AnyValue::new(value))
        }

        fn write(&self, writer: &mut JsonWriter<'_>, value: &AnyValue) -> Result<()> {
            let n = value
                .get::<i64>()
                .ok_or_else(|| tatami::JsonError::invalid_value("not an i64"))?;
            writer.value_str(&format!("{n:#x}"))
        }
    }

    #[derive(Debug, Clone, PartialEq, Default)]
    struct Device {
        id: i64,
    }
    any_bridge!(Device);

    let hex = QualifierSet::of(&[Qualifier("Hex")]);
    let class = ClassDef::new::<Device>("Device")
        .construct_with(|| AnyValue::new(Device::default()))
        .field(
            FieldDef::new::<Device, i64>("id", Type::of::<i64>(), |d| d.id, |d, v| d.id = v)
                .qualified(hex.clone()),
        )
        .register();

    let registry = Registry::builder()
        .add_adapter(Type::of::<i64>(), hex, Arc::new(HexAdapter))
        .build();
    let adapter = registry.adapter(&class.ty(), &QualifierSet::empty()).unwrap();

    let device: Device = adapter.read(r#"{"id":"0xff"}"#).unwrap();
    assert_eq!(device.id, 255);
    assert_eq!(adapter.write_value(device).unwrap(), r#"{"id":"0xff"}"#);
}

#[test]
fn next_qualifier_strips_for_delegation() {
    let set = QualifierSet::of(&[Qualifier("Hex"), Qualifier("Padded")]);
    let stripped = set.next_qualifier(Qualifier("Padded")).unwrap();
    assert_eq!(stripped, QualifierSet::of(&[Qualifier("Hex")]));
    assert!(stripped.next_qualifier(Qualifier("Padded")).is_none());
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Suit {
    Clubs,
    Spades,
}

fn suit_class() -> tatami::ClassRef {
    EnumDef::<Suit>::new("Suit")
        .constant("CLUBS", Suit::Clubs)
        .constant_named("SPADES", "spades!", Suit::Spades)
        .register()
}

#[test]
fn enums_use_wire_names() {
    let registry = Registry::builder().build();
    let adapter = registry
        .adapter(&suit_class().ty(), &QualifierSet::empty())
        .unwrap();

    let value = adapter.from_json_str("\"spades!\"").unwrap();
    assert_eq!(value.get::<Suit>(), Some(&Suit::Spades));
    assert_eq!(adapter.to_json_string(&AnyValue::new(Suit::Clubs)).unwrap(), "\"CLUBS\"");
}

#[test]
fn unknown_enum_fails_without_an_audit_hook() {
    let registry = Registry::builder().build();
    let adapter = registry
        .adapter(&suit_class().ty(), &QualifierSet::empty())
        .unwrap();
    let err = adapter.from_json_str("\"HEARTS\"").unwrap_err();
    match err.kind {
        JsonErrorKind::UnknownEnum { value, constants } => {
            assert_eq!(value, "HEARTS");
            assert_eq!(constants, vec!["CLUBS".to_owned(), "spades!".to_owned()]);
        }
        other => panic!("unexpected kind {other:?}"),
    }
}

#[derive(Default)]
struct RecordingAudit {
    events: Mutex<Vec<(String, String)>>,
}

impl JsonAudit for RecordingAudit {
    fn unknown_enum(&self, path: &str, name: &str) {
        self.events
            .lock()
            .unwrap()
            .push((path.to_owned(), name.to_owned()));
    }
}

#[test]
fn audit_hook_reports_and_returns_null() {
    let registry = Registry::builder().build();
    let adapter = registry
        .adapter(&suit_class().ty(), &QualifierSet::empty())
        .unwrap();

    let audit = Arc::new(RecordingAudit::default());
    let mut reader =
        JsonReader::new(Buffer::from("[\"HEARTS\"]")).with_audit(audit.clone());
    reader.begin_array().unwrap();
    let value = adapter.from_json(&mut reader).unwrap();
    assert!(value.is_null());
    reader.end_array().unwrap();

    let events = audit.events.lock().unwrap();
    assert_eq!(*events, vec![("$[0]".to_owned(), "HEARTS".to_owned())]);
}

#[test]
fn object_adapter_resolves_runtime_classes_on_write() {
    #[derive(Debug, Clone, PartialEq, Default)]
    struct Tag {
        label: String,
    }
    any_bridge!(Tag);

    ClassDef::new::<Tag>("Tag")
        .construct_with(|| AnyValue::new(Tag::default()))
        .field(FieldDef::new::<Tag, String>(
            "label",
            Type::of::<String>(),
            |t| t.label.clone(),
            |t, v| t.label = v,
        ))
        .register();

    let registry = Registry::builder().build();
    let adapter = registry.adapter_of::<tatami::JsonValue>().unwrap();
    let out = adapter
        .to_json_string(&AnyValue::new(Tag {
            label: "x".to_owned(),
        }))
        .unwrap();
    assert_eq!(out, r#"{"label":"x"}"#);
}

#[test]
fn platform_classes_are_refused() {
    #[derive(Debug, Clone, PartialEq)]
    struct Opaque;
    let class = ClassDef::new::<Opaque>("std::process::Child").register();
    let registry = Registry::builder().build();
    let err = registry
        .adapter(&class.ty(), &QualifierSet::empty())
        .unwrap_err();
    assert!(matches!(err.kind, JsonErrorKind::PlatformClass { .. }));
}
