use fixedlen_rs::{Align, FieldDef, FixedLengthFormat, LayoutDef, ModelRegistry, RecordDef, trim_padding};
use proptest::prelude::*;

fn two_column_format() -> FixedLengthFormat {
    let mut registry = ModelRegistry::new();
    registry
        .register(
            RecordDef::new("Row")
                .field(FieldDef::new("left", 1).length(8).trim(true).align(Align::Left))
                .field(FieldDef::new("right", 9).length(8).trim(true).align(Align::Right))
                .layout(LayoutDef::new().length(16).crlf("UNIX")),
        )
        .unwrap();
    FixedLengthFormat::new(&registry, "Row").unwrap()
}

proptest! {
    #[test]
    fn trim_never_touches_the_aligned_side(text in "[A-Z]{1,6}", pad in 0usize..6) {
        let padding = ".".repeat(pad);
        let left = format!("{text}{padding}");
        let right = format!("{padding}{text}");
        prop_assert_eq!(trim_padding(&left, '.', Align::Left), text.as_str());
        prop_assert_eq!(trim_padding(&right, '.', Align::Right), text.as_str());
        prop_assert_eq!(trim_padding(&right, '.', Align::Left), right.as_str());
    }

    #[test]
    fn padded_columns_survive_a_round_trip(left in "[A-Z]{1,8}", right in "[A-Z]{1,8}") {
        let format = two_column_format();
        let line = format!("{left:<8}{right:>8}\n");
        let result = format.unmarshal_str(&line).unwrap();
        prop_assert_eq!(result.entries[0].root().text("left"), Some(left.as_str()));
        prop_assert_eq!(result.entries[0].root().text("right"), Some(right.as_str()));
        prop_assert_eq!(format.marshal(&result).unwrap(), line);
    }
}
