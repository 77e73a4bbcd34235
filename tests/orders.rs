use chrono::NaiveDate;
use fixedlen_rs::{
    BindError, FieldDef, FixedLengthFormat, FromRecord, ModelRegistry, Record, RecordDef, Result,
    TransformRegistry, TypedResult, Value, load_model_file,
};
use std::fs;
use std::path::{Path, PathBuf};

fn spec(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("specs").join(name)
}

fn order_format() -> FixedLengthFormat {
    let registry = load_model_file(spec("order.toml"), &TransformRegistry::with_builtins()).unwrap();
    FixedLengthFormat::new(&registry, "Order").unwrap()
}

fn orders() -> String {
    fs::read_to_string(spec("orders.data")).unwrap()
}

#[test]
fn test_one_line_binds_linked_types() {
    let result = order_format().unmarshal_str(&orders()).unwrap();
    assert_eq!(result.entries.len(), 2);

    let first = &result.entries[0];
    assert_eq!(first.root().get("id"), Some(&Value::Int(1)));
    assert_eq!(
        first.root().get("date"),
        Some(&Value::Date(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()))
    );
    assert_eq!(first.linked("client").and_then(|c| c.text("name")), Some("ACME"));

    let lines = first.collection("Order", "lines");
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].text("sku"), Some("AB12"));
    assert_eq!(lines[0].get("qty"), Some(&Value::Int(5)));
    assert_eq!(lines[0].get("price"), Some(&Value::Double(12.5)));

    let second = &result.entries[1];
    assert_eq!(second.get("OrderLine").and_then(|l| l.get("qty")), Some(&Value::Int(10)));
    assert_eq!(second.line(), 2);
}

#[test]
fn test_orders_marshal_with_transformed_names() {
    let format = order_format();
    let result = format.unmarshal_str(&orders()).unwrap();
    let expected = orders().replace("acme", "ACME").replace("initech", "INITECH");
    assert_eq!(format.marshal(&result).unwrap(), expected);
}

#[test]
fn test_missing_order_id() {
    let input = "00000020240115acme      AB12 005   12.50\n";
    let err = order_format().unmarshal_str(input).unwrap_err();
    match err {
        BindError::MandatoryFieldEmpty { record, field, position, line } => {
            assert_eq!(record, "Order");
            assert_eq!(field, "id");
            assert_eq!(position, 1);
            assert_eq!(line, 1);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_bad_date_is_a_conversion_error() {
    let input = "00000120241315acme      AB12 005   12.50\n";
    let err = order_format().unmarshal_str(input).unwrap_err();
    assert!(matches!(err, BindError::Conversion { position: 7, line: 1, .. }));
}

#[derive(Debug, PartialEq)]
struct Order {
    id: i64,
    client: String,
    total: f64,
}

impl FromRecord for Order {
    fn from_record(record: &Record) -> Result<Self> {
        let line = record.get("OrderLine");
        let qty = line.and_then(|l| l.get("qty")).and_then(Value::as_f64).unwrap_or_default();
        let price = line.and_then(|l| l.get("price")).and_then(Value::as_f64).unwrap_or_default();
        Ok(Self {
            id: record.root().require("id")?.as_i64().unwrap_or_default(),
            client: record
                .linked("client")
                .and_then(|c| c.text("name"))
                .unwrap_or_default()
                .to_string(),
            total: qty * price,
        })
    }
}

#[test]
fn test_typed_orders() {
    let result = order_format().unmarshal_str(&orders()).unwrap();
    let typed: TypedResult<Order, Record, Record> = result.into_typed().unwrap();
    assert_eq!(
        typed.entries,
        vec![
            Order { id: 1, client: "ACME".into(), total: 62.5 },
            Order { id: 2, client: "INITECH".into(), total: 1000.0 },
        ]
    );
}

#[test]
fn test_position_clash_across_linked_types() {
    let mut registry = ModelRegistry::new();
    registry
        .register(
            RecordDef::new("Order")
                .field(FieldDef::new("id", 1).length(6))
                .link("client", "Client"),
        )
        .unwrap()
        .register(RecordDef::new("Client").field(FieldDef::new("name", 1).length(10)))
        .unwrap();

    let err = FixedLengthFormat::new(&registry, "Order").unwrap_err();
    assert!(matches!(err, BindError::DuplicatePosition { position: 1, .. }));
    assert!(err.is_configuration());
}
