//! Contract map: consumer and provider EPGs per contract, the filters the
//! contract carries, and the subnets behind each side.

use tracing::{info, instrument};

use crate::dn::RulesetKind;
use crate::error::Result;
use crate::join::{GroupConcat, JoinKeys, JoinKind, group_concat, join};
use crate::model::{Table, TableSet};
use crate::normalize::Normalization;
use crate::pipeline::{PipelineOptions, PipelineOutput};
use crate::subnet::network_value;

pub const SUBNET: &str = "fvSubnet";
pub const EPG_BRIDGE_DOMAIN: &str = "fvRsBd";
pub const CONSUMER: &str = "fvRsCons";
pub const PROVIDER: &str = "fvRsProv";
pub const FILTER: &str = "vzRsSubjFiltAtt";

/// Columns of the `contract_epgip` output sheet, in order.
pub const CONTRACT_EPG_COLUMNS: [&str; 6] = [
    "contract",
    "consumer_epg",
    "consumer_subnet",
    "provider_epg",
    "provider_subnet",
    "filter",
];

/// Subnet gateways keyed by owning parent DN (bridge domain or EPG).
pub fn subnets(raw: &Table) -> Result<Table> {
    Normalization::new(SUBNET)
        .project(&["dn", "ip"])
        .key("dn", RulesetKind::Subnet, &[("parent", "dn")])
        .apply(raw)
}

/// EPG → bridge-domain bindings as `epg`, `bd` DNs.
pub fn epg_bridge_domains(raw: &Table) -> Result<Table> {
    Normalization::new(EPG_BRIDGE_DOMAIN)
        .project(&["dn", "tDn"])
        .key("dn", RulesetKind::EpgBridgeDomain, &[("parent", "dn")])
        .rename(&[("dn", "epg"), ("tDn", "bd")])
        .apply(raw)
}

/// Every EPG with its bridge domain and the gateways reachable through
/// either: subnets defined on the EPG itself and subnets of its bridge
/// domain. EPGs without subnets keep one row with empty gateway.
pub fn epg_subnets(bindings: &Table, subnets: &Table) -> Result<Table> {
    let on_epg = join(
        bindings,
        subnets,
        &JoinKeys::columns(&["epg"], &["dn"]),
        JoinKind::Inner,
    )?
    .drop_columns(&["dn"]);
    let on_bd = join(
        bindings,
        subnets,
        &JoinKeys::columns(&["bd"], &["dn"]),
        JoinKind::Inner,
    )?
    .drop_columns(&["dn"]);
    let gateways = on_epg.concat(&on_bd);

    let combined = join(
        bindings,
        &gateways,
        &JoinKeys::on(&["epg", "bd"]),
        JoinKind::Left,
    )?
    .sort_by(&["epg"])?
    .rename(&[("ip", "gateway")]);

    Ok(combined
        .with_column("subnet", |row| {
            network_value(row.get("gateway").unwrap_or(&Default::default()))
        })
        .named("epgbd_ip"))
}

fn relation(raw: &Table, name: &str, kind: RulesetKind, epg_column: &str) -> Result<Table> {
    Normalization::new(name)
        .project(&["dn", "tDn"])
        .key("dn", kind, &[("parent", "dn")])
        .rename(&[("dn", epg_column), ("tDn", "contract")])
        .apply(raw)
}

/// Filter attachments keyed by contract DN, one row per attachment.
pub fn filters(raw: &Table) -> Result<Table> {
    Normalization::new("filter")
        .project(&["dn", "tnVzFilterName", "action"])
        .key("dn", RulesetKind::FilterAttachment, &[("parent", "dn")])
        .rename(&[("dn", "contract"), ("tnVzFilterName", "filter")])
        .sort_by(&["contract"])
        .apply(raw)
}

/// Consumer, provider and filters per contract, outer-joined so contracts
/// missing either side still appear.
pub fn contract_bindings(consumers: &Table, providers: &Table, filters: &Table) -> Result<Table> {
    let grouped = group_concat(filters, &["contract"], "filter", &GroupConcat::default())?;
    let bindings = join(
        consumers,
        providers,
        &JoinKeys::on(&["contract"]),
        JoinKind::Outer,
    )?;
    Ok(join(&bindings, &grouped, &JoinKeys::on(&["contract"]), JoinKind::Outer)?.named("contract"))
}

/// Attaches the subnet behind the consumer and the provider EPG of every
/// contract binding.
pub fn contract_subnets(contracts: &Table, epg_subnets: &Table) -> Result<Table> {
    let subnet_by_epg = epg_subnets.select(&["epg", "subnet"])?;
    let with_consumer = join(
        contracts,
        &subnet_by_epg,
        &JoinKeys::columns(&["consumer_epg"], &["epg"]),
        JoinKind::Left,
    )?
    .rename(&[("subnet", "consumer_subnet")]);
    let with_provider = join(
        &with_consumer,
        &subnet_by_epg,
        &JoinKeys::columns(&["provider_epg"], &["epg"]),
        JoinKind::Left,
    )?
    .rename(&[("subnet", "provider_subnet")]);
    Ok(with_provider
        .select(&CONTRACT_EPG_COLUMNS)?
        .named("contract_epgip"))
}

/// Builds the contract workbook tables.
#[instrument(level = "info", skip_all, fields(troubleshoot = options.troubleshoot))]
pub fn run(tables: &TableSet, options: &PipelineOptions) -> Result<PipelineOutput> {
    let subnets = subnets(tables.require(SUBNET)?)?;
    let bindings = epg_bridge_domains(tables.require(EPG_BRIDGE_DOMAIN)?)?;
    let epgbd_ip = epg_subnets(&bindings, &subnets)?;

    let consumers = relation(
        tables.require(CONSUMER)?,
        CONSUMER,
        RulesetKind::ConsumerContract,
        "consumer_epg",
    )?;
    let providers = relation(
        tables.require(PROVIDER)?,
        PROVIDER,
        RulesetKind::ProviderContract,
        "provider_epg",
    )?;
    let filters = filters(tables.require(FILTER)?)?;

    let contracts = contract_bindings(&consumers, &providers, &filters)?;
    let contract_epgip = contract_subnets(&contracts, &epgbd_ip)?;

    info!(
        epgs = epgbd_ip.len(),
        contracts = contracts.len(),
        rows = contract_epgip.len(),
        "contract tables reconciled"
    );

    let mut output = vec![epgbd_ip, filters, contracts, contract_epgip];
    if options.troubleshoot {
        output.extend([bindings, subnets, consumers, providers]);
    }

    Ok(PipelineOutput {
        tables: output,
        skipped_records: 0,
    })
}
