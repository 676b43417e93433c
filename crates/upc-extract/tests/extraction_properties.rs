use proptest::prelude::*;
use std::collections::BTreeMap;
use upc_catalog::{ParameterValue, Scalar, ValueType};
use upc_extract::{ExtractorConfig, SysVarExtractor};
use upc_symbol::SymbolTable;

#[derive(Debug, Clone)]
enum Entry {
    Known(String, i64),
    Unknown(String),
}

fn entry() -> impl Strategy<Value = Entry> {
    prop_oneof![
        3 => ("[a-z][a-z_]{0,10}", 0i64..100_000).prop_map(|(n, v)| Entry::Known(n, v)),
        1 => "[a-z][a-z_]{0,10}".prop_map(Entry::Unknown),
    ]
}

fn render(entries: &[Entry]) -> String {
    let mut text = String::from("package variable\n\nvar defaultSysVars = []*SysVar{\n");
    for (i, entry) in entries.iter().enumerate() {
        let line = match entry {
            Entry::Known(name, value) => {
                format!("\t{{Scope: ScopeGlobal, Name: \"{name}\", Value: {value}}},\n")
            }
            Entry::Unknown(name) => {
                format!("\t{{Scope: ScopeGlobal, Name: \"{name}\", Value: MissingDefault{i}}},\n")
            }
        };
        text.push_str(&line);
    }
    text.push_str("}\n");
    text
}

proptest! {
    #[test]
    fn prop_extraction_is_deterministic_and_omits_unknowns(
        entries in proptest::collection::vec(entry(), 0..16)
    ) {
        let config = ExtractorConfig::default();
        let table = SymbolTable::default();
        let extractor = SysVarExtractor::new(&table, &config);
        let text = render(&entries);

        let first = extractor.extract_text(&text);
        let second = extractor.extract_text(&text);
        prop_assert_eq!(&first, &second);

        let mut expected = BTreeMap::new();
        for entry in &entries {
            if let Entry::Known(name, value) = entry {
                expected.insert(name.clone(), ParameterValue::new(Scalar::Int(*value), ValueType::Int));
            }
        }
        let actual: BTreeMap<_, _> = first.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        prop_assert_eq!(actual, expected);
    }
}
