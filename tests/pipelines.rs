use fabric_recon::ToolError;
use fabric_recon::model::{Record, Table, TableSet, Value};
use fabric_recon::pipeline::{PipelineKind, PipelineOptions, PipelineOutput};

fn table(name: &str, columns: &[&str], rows: &[&[&str]]) -> Table {
    Table::from_rows(
        name,
        columns,
        rows.iter().map(|values| {
            columns
                .iter()
                .zip(values.iter())
                .map(|(column, value)| (column.to_string(), Value::from_optional(Some(value.to_string()))))
                .collect::<Record>()
        }),
    )
}

fn text(output: &Table, row: usize, column: &str) -> Option<String> {
    output.rows[row].get(column).and_then(Value::as_text)
}

const PHYS: [&str; 9] = [
    "dn", "id", "descr", "portT", "mode", "layer", "usage", "adminSt", "autoNeg",
];

fn interface_tables() -> TableSet {
    let mut top_row = vec!["topology/pod-1/node-1103", "leaf1103", "1103"];
    top_row.extend(std::iter::repeat_n("", 14));
    let top_columns = [
        "dn",
        "name",
        "id",
        "fabricId",
        "podId",
        "role",
        "serial",
        "state",
        "version",
        "oobMgmtAddr",
        "inbMgmtAddr",
        "inbMgmtGateway",
        "lastRebootTime",
        "lastResetReason",
        "systemUpTime",
        "tepPool",
        "address",
    ];

    [
        table("topSystem", &top_columns, &[top_row.as_slice()]),
        table(
            "l1PhysIf",
            &PHYS,
            &[
                &["topology/pod-1/node-1104/sys/phys-[eth1/3]", "eth1/3", "vpc b", "leaf", "trunk", "Layer2", "epg", "up", "on"],
                &["topology/pod-1/node-1101/sys/phys-[eth1/10]", "eth1/10", "", "leaf", "trunk", "Layer2", "discovery", "up", "on"],
                &["topology/pod-1/node-1103/sys/phys-[eth1/3]", "eth1/3", "vpc a", "leaf", "trunk", "Layer2", "epg", "up", "on"],
            ],
        ),
        table(
            "ethpmPhysIf",
            &[
                "dn",
                "lastLinkStChg",
                "nativeVlan",
                "operSpeed",
                "operDuplex",
                "operSt",
                "operStQual",
                "bundleIndex",
                "operVlans",
            ],
            &[
                &["topology/pod-1/node-1103/sys/phys-[eth1/3]/phys", "", "", "10G", "full", "up", "none", "po1", "100,200"],
                &["topology/pod-1/node-1104/sys/phys-[eth1/3]/phys", "", "", "10G", "full", "up", "none", "po1", "100,200"],
            ],
        ),
        table(
            "ethpmFcot",
            &["dn", "guiCiscoEID", "guiName", "guiSN"],
            &[&["topology/pod-1/node-1103/sys/phys-[eth1/3]/phys/fcot", "SFP-10G-SR", "CISCO", "SN1"]],
        ),
        table(
            "fvRsPathAtt",
            &["dn", "encap", "instrImedcy", "mode", "tDn"],
            &[
                &[
                    "uni/tn-T/ap-A/epg-web/rspathAtt-[topology/pod-1/protpaths-1103-1104/pathep-[vpc-leaf1103-1104-p3]]",
                    "vlan-200",
                    "immediate",
                    "regular",
                    "topology/pod-1/protpaths-1103-1104/pathep-[vpc-leaf1103-1104-p3]",
                ],
                &[
                    "uni/tn-T/ap-A/epg-db/rspathAtt-[topology/pod-1/protpaths-1103-1104/pathep-[vpc-leaf1103-1104-p3]]",
                    "vlan-100",
                    "immediate",
                    "regular",
                    "topology/pod-1/protpaths-1103-1104/pathep-[vpc-leaf1103-1104-p3]",
                ],
            ],
        ),
        table(
            "vlanCktEp",
            &["ctrl", "dn", "encap", "epgDn", "fabEncap", "id", "pcTag"],
            &[&["", "topology/pod-1/node-1103/sys/ctx-[vxlan-1]/bd-[vxlan-2]/vlan-[vlan-100]", "vlan-100", "uni/tn-T/ap-A/epg-db", "vxlan-3", "12", "49153"]],
        ),
        table(
            "infraRsAccBaseGrp",
            &["dn", "tCl", "tDn"],
            &[
                &[
                    "uni/infra/accportprof-lif-1103-1104/hports-p3-typ-range/rsaccBaseGrp",
                    "infraAccBndlGrp",
                    "uni/infra/funcprof/accbundle-vpc-leaf1103-1104-p3",
                ],
                &[
                    "uni/infra/accportprof-lif-1201/hports-p16-17-typ-range/rsaccBaseGrp",
                    "infraAccPortGrp",
                    "uni/infra/funcprof/accportgrp-server",
                ],
                &[
                    "uni/infra/accportprof-Leaf101_Prof/hports-srv01-typ-range/rsaccBaseGrp",
                    "infraAccPortGrp",
                    "uni/infra/funcprof/accportgrp-ipg-db",
                ],
            ],
        ),
        table(
            "infraAccBndlGrp",
            &["dn", "name", "descr"],
            &[&["uni/infra/funcprof/accbundle-vpc-leaf1103-1104-p3", "vpc-leaf1103-1104-p3", ""]],
        ),
    ]
    .into_iter()
    .collect()
}

fn contract_tables() -> TableSet {
    [
        table(
            "fvSubnet",
            &["dn", "ip", "scope"],
            &[
                &["uni/tn-T/BD-bd1/subnet-[10.0.0.1/24]", "10.0.0.1/24", "public"],
                &["uni/tn-T/ap-A/epg-db/subnet-[10.9.0.1/16]", "10.9.0.1/16", "private"],
            ],
        ),
        table(
            "fvRsBd",
            &["dn", "tDn"],
            &[
                &["uni/tn-T/ap-A/epg-web/rsbd", "uni/tn-T/BD-bd1"],
                &["uni/tn-T/ap-A/epg-db/rsbd", "uni/tn-T/BD-bd2"],
                &["uni/tn-T/ap-A/epg-app/rsbd", "uni/tn-T/BD-bd3"],
            ],
        ),
        table(
            "fvRsCons",
            &["dn", "tDn"],
            &[&["uni/tn-T/ap-A/epg-web/rscons-web2db", "uni/tn-T/brc-web2db"]],
        ),
        table(
            "fvRsProv",
            &["dn", "tDn"],
            &[&["uni/tn-T/ap-A/epg-db/rsprov-web2db", "uni/tn-T/brc-web2db"]],
        ),
        table(
            "vzRsSubjFiltAtt",
            &["dn", "tnVzFilterName", "action"],
            &[
                &["uni/tn-T/brc-web2db/subj-s1/rssubjFiltAtt-sql", "sql", "permit"],
                &["uni/tn-T/brc-web2db/subj-s1/rssubjFiltAtt-icmp", "icmp", "permit"],
            ],
        ),
    ]
    .into_iter()
    .collect()
}

fn run(kind: PipelineKind, tables: &TableSet) -> PipelineOutput {
    kind.run(tables, &PipelineOptions::default()).expect("pipeline ran")
}

#[test]
fn interface_pipeline_emits_fixed_sheets() {
    let output = run(PipelineKind::Interface, &interface_tables());
    assert_eq!(
        output.table_names(),
        [
            "topSystem",
            "interface",
            "sfp_sn",
            "all_encap",
            "epg_encap",
            "intf_encap",
            "leaf_encap",
            "intf_prof_split"
        ]
    );
    assert_eq!(output.skipped_records, 0);
}

#[test]
fn interface_rows_carry_policy_group_from_expanded_profile() {
    let output = run(PipelineKind::Interface, &interface_tables());
    let interface = output.table("interface").expect("interface sheet");

    assert_eq!(interface.columns.len(), 21);
    assert_eq!(interface.len(), 3);

    let nodes: Vec<Option<String>> = (0..3).map(|row| text(interface, row, "_nodeid")).collect();
    assert_eq!(nodes, ["1101", "1103", "1104"].map(|node| Some(node.to_string())));

    assert_eq!(text(interface, 0, "_policyGrp"), None);
    assert_eq!(text(interface, 1, "_policyGrp").as_deref(), Some("vpc-leaf1103-1104-p3"));
    assert_eq!(text(interface, 2, "_policyGrp").as_deref(), Some("vpc-leaf1103-1104-p3"));

    assert_eq!(text(interface, 1, "_intf").as_deref(), Some("eth1/3"));
    assert_eq!(text(interface, 1, "_intf_p").as_deref(), Some("p3"));
    assert_eq!(text(interface, 1, "_intf_n").as_deref(), Some("3"));
    assert_eq!(text(interface, 1, "guiCiscoEID").as_deref(), Some("SFP-10G-SR"));
    assert_eq!(text(interface, 1, "operSpeed").as_deref(), Some("10G"));
    assert_eq!(text(interface, 0, "operSpeed"), None);
}

#[test]
fn interface_profile_split_expands_nodes_and_ports() {
    let output = run(PipelineKind::Interface, &interface_tables());
    let split = output.table("intf_prof_split").expect("split sheet");

    let rows: Vec<(String, String)> = (0..split.len())
        .map(|row| {
            (
                text(split, row, "_nodeid").unwrap_or_default(),
                text(split, row, "_intf_p").unwrap_or_default(),
            )
        })
        .collect();
    assert_eq!(
        rows,
        [
            ("1103".to_string(), "p3".to_string()),
            ("1104".to_string(), "p3".to_string()),
            ("1201".to_string(), "p16".to_string()),
            ("1201".to_string(), "p17".to_string()),
            (String::new(), String::new()),
        ]
    );
    assert_eq!(text(split, 2, "_policyGrp").as_deref(), Some("server"));
    assert_eq!(text(split, 4, "_policyGrp").as_deref(), Some("ipg-db"));
    assert_eq!(output.skipped_records, 0);
}

#[test]
fn encapsulation_maps_strip_vlan_prefix() {
    let output = run(PipelineKind::Interface, &interface_tables());

    let epg_encap = output.table("epg_encap").expect("epg_encap sheet");
    assert_eq!(epg_encap.columns, ["dn", "encap"]);
    assert_eq!(text(epg_encap, 0, "dn").as_deref(), Some("uni/tn-T/ap-A/epg-db"));
    assert_eq!(text(epg_encap, 0, "encap").as_deref(), Some("100"));

    let intf_encap = output.table("intf_encap").expect("intf_encap sheet");
    assert_eq!(intf_encap.columns, ["tDn", "path_nodes", "path_ep", "encap"]);
    assert_eq!(intf_encap.len(), 1);
    assert_eq!(text(intf_encap, 0, "path_nodes").as_deref(), Some("1103-1104"));
    assert_eq!(text(intf_encap, 0, "path_ep").as_deref(), Some("vpc-leaf1103-1104-p3"));
    assert_eq!(text(intf_encap, 0, "encap").as_deref(), Some("100,200"));
}

#[test]
fn troubleshoot_adds_intermediate_tables() {
    let options = PipelineOptions { troubleshoot: true };
    let output = PipelineKind::Interface
        .run(&interface_tables(), &options)
        .expect("pipeline ran");
    for name in ["l1PhysIf", "ethpmPhysIf", "fvRsPathAtt", "intf_prof", "vpc_prof"] {
        assert!(output.table(name).is_some(), "{name} missing");
    }
}

#[test]
fn missing_column_names_table_and_column() {
    let mut tables = interface_tables();
    let physical = tables.get("l1PhysIf").expect("present").drop_columns(&["autoNeg"]);
    tables.insert(physical);

    let error = PipelineKind::Interface
        .run(&tables, &PipelineOptions::default())
        .expect_err("schema error");
    match error {
        ToolError::MissingColumn { table, column } => {
            assert_eq!(table, "l1PhysIf");
            assert_eq!(column, "autoNeg");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn contract_pipeline_emits_fixed_sheets() {
    let output = run(PipelineKind::Contract, &contract_tables());
    assert_eq!(
        output.table_names(),
        ["epgbd_ip", "filter", "contract", "contract_epgip"]
    );
}

#[test]
fn epg_subnets_union_epg_and_bridge_domain_gateways() {
    let output = run(PipelineKind::Contract, &contract_tables());
    let epgbd = output.table("epgbd_ip").expect("epgbd_ip sheet");

    assert_eq!(epgbd.columns, ["epg", "bd", "gateway", "subnet"]);
    assert_eq!(epgbd.len(), 3);
    assert_eq!(text(epgbd, 0, "epg").as_deref(), Some("uni/tn-T/ap-A/epg-app"));
    assert_eq!(text(epgbd, 0, "gateway"), None);
    assert_eq!(text(epgbd, 1, "subnet").as_deref(), Some("10.9.0.0/16"));
    assert_eq!(text(epgbd, 2, "gateway").as_deref(), Some("10.0.0.1/24"));
    assert_eq!(text(epgbd, 2, "subnet").as_deref(), Some("10.0.0.0/24"));
}

#[test]
fn contract_rows_carry_subnets_of_both_sides() {
    let output = run(PipelineKind::Contract, &contract_tables());
    let rows = output.table("contract_epgip").expect("contract_epgip sheet");

    assert_eq!(
        rows.columns,
        [
            "contract",
            "consumer_epg",
            "consumer_subnet",
            "provider_epg",
            "provider_subnet",
            "filter"
        ]
    );
    assert_eq!(rows.len(), 1);
    assert_eq!(text(rows, 0, "contract").as_deref(), Some("uni/tn-T/brc-web2db"));
    assert_eq!(text(rows, 0, "consumer_subnet").as_deref(), Some("10.0.0.0/24"));
    assert_eq!(text(rows, 0, "provider_subnet").as_deref(), Some("10.9.0.0/16"));
    assert_eq!(text(rows, 0, "filter").as_deref(), Some("icmp,sql"));
}

#[test]
fn missing_table_is_reported_by_name() {
    let tables: TableSet = contract_tables()
        .iter()
        .filter(|table| table.name != "fvRsBd")
        .cloned()
        .collect();
    let error = PipelineKind::Contract
        .run(&tables, &PipelineOptions::default())
        .expect_err("schema error");
    assert!(matches!(error, ToolError::MissingTable(ref name) if name == "fvRsBd"));
}
