use fabric_recon::ToolError;
use fabric_recon::error::RangeError;
use fabric_recon::model::{Record, Table, Value, record};
use fabric_recon::pipeline::interface::{PROFILE_COLUMNS, profile_expansion_plan};
use fabric_recon::range::{ExpansionPlan, FieldShape, RangeToken, expand, expand_table};

fn profile(dn: &str, node: &str, label: &str, number: &str, group: &str) -> Record {
    record([
        ("dn", dn),
        ("_nodeid", node),
        ("_intf_p", label),
        ("_intf_n", number),
        ("_policyGrp", group),
    ])
}

fn text(row: &Record, column: &str) -> String {
    row.get(column).and_then(Value::as_text).unwrap_or_default()
}

#[test]
fn node_range_expands_per_node_keeping_other_fields() {
    let row = profile(
        "uni/infra/accportprof-lif-1103-1104/hports-p3-typ-range",
        "1103-1104",
        "p3",
        "3",
        "vpc-leaf1103-1104-p3",
    );
    let expanded = expand(&row, &profile_expansion_plan()).expect("expanded");

    assert_eq!(expanded.len(), 2);
    let nodes: Vec<String> = expanded.iter().map(|r| text(r, "_nodeid")).collect();
    assert_eq!(nodes, ["1103", "1104"]);
    for row in &expanded {
        assert_eq!(text(row, "_intf_p"), "p3");
        assert_eq!(text(row, "_intf_n"), "3");
        assert_eq!(text(row, "_policyGrp"), "vpc-leaf1103-1104-p3");
    }
}

#[test]
fn port_label_and_number_ranges_are_zipped() {
    let row = profile(
        "uni/infra/accportprof-lif-1201/hports-p16-17-typ-range",
        "1201",
        "p16-17",
        "16-17",
        "server",
    );
    let expanded = expand(&row, &profile_expansion_plan()).expect("expanded");

    assert_eq!(expanded.len(), 2);
    let pairs: Vec<(String, String)> = expanded
        .iter()
        .map(|r| (text(r, "_intf_p"), text(r, "_intf_n")))
        .collect();
    assert_eq!(
        pairs,
        [
            ("p16".to_string(), "16".to_string()),
            ("p17".to_string(), "17".to_string())
        ]
    );
}

#[test]
fn prefixed_range_accepts_repeated_prefix() {
    let token = RangeToken::parse("_intf_p", "p1-p2", FieldShape::Prefixed).expect("parsed");
    assert_eq!(token.units(), ["p1", "p2"]);
    assert!(token.is_range());

    let single = RangeToken::parse("_nodeid", "1101", FieldShape::Integer).expect("parsed");
    assert_eq!(single.units(), ["1101"]);
    assert_eq!(single.len(), 1);
}

#[test]
fn independent_ranges_form_a_cartesian_product() {
    let plan = ExpansionPlan::new()
        .independent("node", FieldShape::Integer)
        .independent("port", FieldShape::Integer);
    let row = record([("node", "101-103"), ("port", "1-4")]);

    let expanded = expand(&row, &plan).expect("expanded");
    assert_eq!(expanded.len(), 3 * 4);
    assert_eq!(text(&expanded[0], "node"), "101");
    assert_eq!(text(&expanded[0], "port"), "1");
    assert_eq!(text(&expanded[4], "node"), "102");
}

#[test]
fn zipped_ranges_of_different_length_are_rejected() {
    let row = profile("dn", "1101", "p1-3", "1-2", "grp");
    let error = expand(&row, &profile_expansion_plan()).expect_err("length mismatch");
    assert!(matches!(error, RangeError::LengthMismatch { ref lengths, .. } if lengths == &vec![3, 2]));
}

#[test]
fn malformed_records_are_skipped_and_reported() {
    let table = Table::from_rows(
        "intf_prof",
        &PROFILE_COLUMNS,
        [
            profile("a", "1102", "p1-2", "1-2", "grp-a"),
            profile("b", "1101", "p5-3", "5-3", "grp-b"),
            profile("c", "abc", "p1", "1", "grp-c"),
            profile("d", "1101", "p7", "7", "grp-d"),
        ],
    );

    let expansion = expand_table(&table, &profile_expansion_plan()).expect("expanded");
    let skipped: Vec<usize> = expansion.skipped.iter().map(|s| s.index).collect();
    assert_eq!(skipped, [1, 2]);
    assert!(matches!(expansion.skipped[0].error, RangeError::Reversed { .. }));
    assert!(matches!(expansion.skipped[1].error, RangeError::Malformed { .. }));

    let order: Vec<(String, String)> = expansion
        .table
        .rows
        .iter()
        .map(|r| (text(r, "_nodeid"), text(r, "_intf_n")))
        .collect();
    assert_eq!(
        order,
        [
            ("1101".to_string(), "7".to_string()),
            ("1102".to_string(), "1".to_string()),
            ("1102".to_string(), "2".to_string()),
        ]
    );
    assert_eq!(expansion.table.columns, PROFILE_COLUMNS);
}

#[test]
fn missing_value_is_reported_per_record() {
    let mut row = profile("dn", "1101", "p1", "1", "grp");
    row.remove("_intf_n");
    let error = expand(&row, &profile_expansion_plan()).expect_err("missing value");
    assert_eq!(
        error,
        RangeError::MissingValue {
            field: "_intf_n".to_string()
        }
    );
}

#[test]
fn missing_range_column_is_a_schema_error() {
    let table = Table::new("intf_prof", &["dn", "_nodeid"]);
    let error = expand_table(&table, &profile_expansion_plan()).expect_err("schema error");
    assert!(matches!(error, ToolError::MissingColumn { ref column, .. } if column == "_intf_p"));
}

#[test]
fn null_range_fields_pass_through_once() {
    let mut row = profile(
        "uni/infra/accportprof-Leaf101_Prof/hports-srv01-typ-range",
        "",
        "",
        "",
        "ipg-db",
    );
    for field in ["_nodeid", "_intf_p", "_intf_n"] {
        row.insert(field.to_string(), Value::Null);
    }

    let expanded = expand(&row, &profile_expansion_plan()).expect("expanded");
    assert_eq!(expanded, vec![row]);
}

#[test]
fn oversized_ranges_are_rejected() {
    let error = RangeToken::parse("_nodeid", "1-4000000000", FieldShape::Integer)
        .expect_err("too large");
    assert!(matches!(error, RangeError::TooLarge { limit: 65_536, .. }));

    let error = RangeToken::parse("_nodeid", "0-18446744073709551615", FieldShape::Integer)
        .expect_err("too large");
    assert!(matches!(error, RangeError::TooLarge { .. }));

    let widest = RangeToken::parse("_intf_p", "p1-1024", FieldShape::Prefixed).expect("parsed");
    assert_eq!(widest.len(), 1_024);
    assert!(RangeToken::parse("_intf_p", "p1-1025", FieldShape::Prefixed).is_err());
}

#[test]
fn oversized_record_is_skipped_and_the_rest_expands() {
    let table = Table::from_rows(
        "intf_prof",
        &PROFILE_COLUMNS,
        [
            profile("a", "1-4000000000", "p1", "1", "grp-a"),
            profile("b", "1101", "p2", "2", "grp-b"),
        ],
    );

    let expansion = expand_table(&table, &profile_expansion_plan()).expect("expanded");
    assert_eq!(expansion.skipped.len(), 1);
    assert_eq!(expansion.skipped[0].index, 0);
    assert!(matches!(expansion.skipped[0].error, RangeError::TooLarge { .. }));
    assert_eq!(expansion.table.len(), 1);
    assert_eq!(text(&expansion.table.rows[0], "_policyGrp"), "grp-b");
}
