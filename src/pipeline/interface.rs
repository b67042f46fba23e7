//! Interface inventory: physical ports joined with operational state,
//! transceivers and the access policy group bound to each port, plus the
//! VLAN encapsulation maps from static path bindings.

use tracing::{info, instrument};

use crate::dn::RulesetKind;
use crate::error::Result;
use crate::join::{GroupConcat, JoinKeys, JoinKind, group_concat, join};
use crate::model::{Table, TableSet};
use crate::normalize::Normalization;
use crate::pipeline::{PipelineOptions, PipelineOutput};
use crate::range::{ExpansionPlan, FieldShape, expand_table};

pub const TOP_SYSTEM: &str = "topSystem";
pub const TRANSCEIVER: &str = "ethpmFcot";
pub const PHYSICAL_INTERFACE: &str = "l1PhysIf";
pub const OPERATIONAL_STATE: &str = "ethpmPhysIf";
pub const PATH_ATTACHMENT: &str = "fvRsPathAtt";
pub const LEAF_VLAN: &str = "vlanCktEp";
pub const INTERFACE_PROFILE: &str = "infraRsAccBaseGrp";
pub const BUNDLE_GROUP: &str = "infraAccBndlGrp";

const TOP_SYSTEM_COLUMNS: [&str; 17] = [
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

/// Columns of the `interface` output sheet, in order.
pub const INTERFACE_COLUMNS: [&str; 21] = [
    "dn",
    "_nodeid",
    "_intf",
    "_intf_p",
    "_intf_n",
    "descr",
    "portT",
    "layer",
    "usage",
    "operSpeed",
    "operDuplex",
    "autoNeg",
    "adminSt",
    "operSt",
    "operStQual",
    "guiCiscoEID",
    "bundleIndex",
    "operVlans",
    "nativeVlan",
    "_policyGrp",
    "lastLinkStChg",
];

const PORT_COLUMNS: [&str; 20] = [
    "dn",
    "_nodeid",
    "_intf",
    "_intf_p",
    "_intf_n",
    "descr",
    "portT",
    "layer",
    "usage",
    "operSpeed",
    "operDuplex",
    "autoNeg",
    "adminSt",
    "operSt",
    "operStQual",
    "guiCiscoEID",
    "bundleIndex",
    "operVlans",
    "nativeVlan",
    "lastLinkStChg",
];

/// Columns of the `intf_prof_split` output sheet.
pub const PROFILE_COLUMNS: [&str; 5] = ["dn", "_nodeid", "_intf_p", "_intf_n", "_policyGrp"];

/// Normalizes the access port selector bindings: node range, port label
/// and policy group, before range expansion.
pub fn interface_profile(raw: &Table) -> Result<Table> {
    Normalization::new("intf_prof")
        .project(&["dn", "tCl", "tDn"])
        .key(
            "dn",
            RulesetKind::InterfaceProfile,
            &[("parent", "dn"), ("node", "_nodeid"), ("port_label", "_intf_p")],
        )
        .rewrite("_intf_p", "_intf_n", r"[pP](\d+)", "$1")
        .key("tDn", RulesetKind::PolicyGroup, &[("policy_group", "_policyGrp")])
        .sort_by(&["dn"])
        .output(&PROFILE_COLUMNS)
        .apply(raw)
}

/// Node range crossed with the zipped port label and port number, ordered
/// by node then port.
pub fn profile_expansion_plan() -> ExpansionPlan {
    ExpansionPlan::new()
        .independent("_nodeid", FieldShape::Integer)
        .zipped(&[("_intf_p", FieldShape::Prefixed), ("_intf_n", FieldShape::Integer)])
        .order_by(&["_nodeid", "_intf_n"])
}

/// Physical interfaces with operational state and transceiver columns,
/// keyed by node id and port label parsed from the DN.
pub fn ports(tables: &TableSet) -> Result<Table> {
    let physical = physical_interfaces(tables.require(PHYSICAL_INTERFACE)?)?;
    let state = operational_state(tables.require(OPERATIONAL_STATE)?)?;
    let transceivers = transceivers(tables.require(TRANSCEIVER)?)?;

    let merged = join(&physical, &state, &JoinKeys::on(&["dn"]), JoinKind::Left)?;
    let merged = join(&merged, &transceivers, &JoinKeys::on(&["dn"]), JoinKind::Left)?;

    Normalization::new("interface")
        .project(&merged.columns.iter().map(String::as_str).collect::<Vec<_>>())
        .key(
            "dn",
            RulesetKind::PhysicalInterface,
            &[("node", "_nodeid"), ("port_label", "_intf_p"), ("port", "_intf_n")],
        )
        .rename(&[("id", "_intf")])
        .output(&PORT_COLUMNS)
        .apply(&merged)
}

fn physical_interfaces(raw: &Table) -> Result<Table> {
    Normalization::new(PHYSICAL_INTERFACE)
        .project(&[
            "dn", "id", "descr", "portT", "mode", "layer", "usage", "adminSt", "autoNeg",
        ])
        .sort_by(&["dn"])
        .apply(raw)
}

fn operational_state(raw: &Table) -> Result<Table> {
    Normalization::new(OPERATIONAL_STATE)
        .project(&[
            "dn",
            "lastLinkStChg",
            "nativeVlan",
            "operSpeed",
            "operDuplex",
            "operSt",
            "operStQual",
            "bundleIndex",
            "operVlans",
        ])
        .key("dn", RulesetKind::OperationalState, &[("parent", "dn")])
        .sort_by(&["dn"])
        .apply(raw)
}

fn transceivers(raw: &Table) -> Result<Table> {
    Normalization::new("sfp_sn")
        .project(&["dn", "guiCiscoEID", "guiName", "guiSN"])
        .key("dn", RulesetKind::Transceiver, &[("parent", "dn")])
        .apply(raw)
}

fn path_attachments(raw: &Table) -> Result<Table> {
    Normalization::new("all_encap")
        .project(&["dn", "encap", "instrImedcy", "mode", "tDn"])
        .key("dn", RulesetKind::PathAttachment, &[("parent", "dn")])
        .rewrite("encap", "encap", "^vlan-", "")
        .apply(raw)
}

/// Encapsulations per EPG and per interface path, comma-joined.
pub fn encap_maps(attachments: &Table) -> Result<(Table, Table)> {
    let epg_encap = group_concat(attachments, &["dn"], "encap", &GroupConcat::default())?
        .named("epg_encap");

    let intf_encap = group_concat(attachments, &["tDn"], "encap", &GroupConcat::default())?;
    let intf_encap = Normalization::new("intf_encap")
        .project(&["tDn", "encap"])
        .key(
            "tDn",
            RulesetKind::PathEndpoint,
            &[("path_nodes", "path_nodes"), ("path_ep", "path_ep")],
        )
        .output(&["tDn", "path_nodes", "path_ep", "encap"])
        .sort_by(&["tDn"])
        .apply(&intf_encap)?;

    Ok((epg_encap, intf_encap))
}

/// Builds the interface workbook tables.
#[instrument(level = "info", skip_all, fields(troubleshoot = options.troubleshoot))]
pub fn run(tables: &TableSet, options: &PipelineOptions) -> Result<PipelineOutput> {
    let top_system = Normalization::new(TOP_SYSTEM)
        .project(&TOP_SYSTEM_COLUMNS)
        .sort_by(&["id"])
        .apply(tables.require(TOP_SYSTEM)?)?;

    let sfp_sn = transceivers(tables.require(TRANSCEIVER)?)?;
    let ports = ports(tables)?;

    let all_encap = path_attachments(tables.require(PATH_ATTACHMENT)?)?;
    let (epg_encap, intf_encap) = encap_maps(&all_encap)?;

    let leaf_encap = Normalization::new("leaf_encap")
        .project(&["ctrl", "dn", "encap", "epgDn", "fabEncap", "id", "pcTag"])
        .output(&["dn", "epgDn", "ctrl", "encap", "fabEncap", "id", "pcTag"])
        .apply(tables.require(LEAF_VLAN)?)?;

    let profiles = interface_profile(tables.require(INTERFACE_PROFILE)?)?;
    let expansion = expand_table(&profiles, &profile_expansion_plan())?;
    let profile_split = expansion.table.named("intf_prof_split");

    let interface = join(
        &ports,
        &profile_split,
        &JoinKeys::on(&["_nodeid", "_intf_p"]),
        JoinKind::Left,
    )?
    .rename(&[("dn_x", "dn"), ("_intf_n_x", "_intf_n")])
    .select(&INTERFACE_COLUMNS)?
    .named("interface");

    info!(
        interfaces = interface.len(),
        profiles = profile_split.len(),
        epgs = epg_encap.len(),
        skipped = expansion.skipped.len(),
        "interface tables reconciled"
    );

    let mut output = vec![
        top_system,
        interface,
        sfp_sn,
        all_encap,
        epg_encap,
        intf_encap,
        leaf_encap,
        profile_split,
    ];

    if options.troubleshoot {
        let vpc_profile = Normalization::new("vpc_prof")
            .project(&["dn", "name", "descr"])
            .sort_by(&["dn"])
            .apply(tables.require(BUNDLE_GROUP)?)?;
        output.extend([
            physical_interfaces(tables.require(PHYSICAL_INTERFACE)?)?,
            operational_state(tables.require(OPERATIONAL_STATE)?)?,
            path_attachments(tables.require(PATH_ATTACHMENT)?)?.named(PATH_ATTACHMENT),
            profiles,
            vpc_profile,
        ]);
    }

    Ok(PipelineOutput {
        tables: output,
        skipped_records: expansion.skipped.len(),
    })
}
