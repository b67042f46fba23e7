//! Distinguished Name decomposition.
//!
//! A DN such as `uni/tn-T/ap-A/epg-E/rsbd` is turned into named fields by a
//! [`Ruleset`]: an ordered list of [`ExtractionRule`]s, each pairing a
//! [`Matcher`] with output templates. The first rule whose matcher accepts
//! the DN produces every field; fields the rule leaves empty, or all fields
//! when no rule matches, come back as [`Value::Null`].
//!
//! Rules that strip a child suffix (`/rsbd`, `/rscons-<name>`,
//! `/subnet-[<ip>]`, ...) make that suffix optional, so decomposing an
//! already-stripped parent DN yields the same parent key.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::model::{Record, Value};

/// Which `/`-separated segment a segment pattern is applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentIndex {
    At(usize),
    Last,
}

/// How a rule recognises a DN.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Pattern applied to the whole DN.
    Whole(Regex),
    /// Patterns applied to individual segments of the bracket-aware split.
    /// Every listed segment must match; named captures are merged.
    Segments(Vec<(SegmentIndex, Regex)>),
}

impl Matcher {
    fn captures<'a>(&self, dn: &'a str) -> Option<BTreeMap<String, &'a str>> {
        match self {
            Matcher::Whole(pattern) => pattern.captures(dn).map(|caps| named_captures(pattern, &caps)),
            Matcher::Segments(patterns) => {
                let segments = split_dn(dn);
                let mut merged = BTreeMap::new();
                for (index, pattern) in patterns {
                    let segment = match index {
                        SegmentIndex::At(position) => segments.get(*position).copied(),
                        SegmentIndex::Last => segments.last().copied(),
                    }?;
                    let caps = pattern.captures(segment)?;
                    merged.extend(named_captures(pattern, &caps));
                }
                Some(merged)
            }
        }
    }
}

fn named_captures<'a>(pattern: &Regex, caps: &regex::Captures<'a>) -> BTreeMap<String, &'a str> {
    pattern
        .capture_names()
        .flatten()
        .filter_map(|name| caps.name(name).map(|m| (name.to_string(), m.as_str())))
        .collect()
}

/// One extraction rule: a matcher plus `(field, template)` outputs.
///
/// Templates reference named captures as `$name` or `${name}`; any other
/// character is copied verbatim, so `p$port` renders `p10`.
#[derive(Debug, Clone)]
pub struct ExtractionRule {
    pub name: &'static str,
    pub matcher: Matcher,
    pub outputs: Vec<(&'static str, &'static str)>,
}

impl ExtractionRule {
    fn whole(name: &'static str, pattern: &str, outputs: &[(&'static str, &'static str)]) -> Self {
        Self {
            name,
            matcher: Matcher::Whole(compile(pattern)),
            outputs: outputs.to_vec(),
        }
    }

    fn segments(
        name: &'static str,
        patterns: &[(SegmentIndex, &str)],
        outputs: &[(&'static str, &'static str)],
    ) -> Self {
        Self {
            name,
            matcher: Matcher::Segments(
                patterns
                    .iter()
                    .map(|(index, pattern)| (*index, compile(pattern)))
                    .collect(),
            ),
            outputs: outputs.to_vec(),
        }
    }

    /// Applies the rule, returning `None` when the matcher rejects the DN.
    pub fn apply(&self, dn: &str) -> Option<Record> {
        let captures = self.matcher.captures(dn)?;
        Some(
            self.outputs
                .iter()
                .map(|(field, template)| {
                    let rendered = render(template, &captures);
                    (field.to_string(), Value::from_optional(Some(rendered)))
                })
                .collect(),
        )
    }
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("invalid built-in DN pattern")
}

/// Named DN shapes the decomposer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RulesetKind {
    /// `fvRsBd` DNs: EPG → bridge-domain binding.
    EpgBridgeDomain,
    /// `fvSubnet` DNs owned by a bridge domain or an EPG.
    Subnet,
    /// `l1PhysIf` DNs: `topology/pod-1/node-1101/sys/phys-[eth1/10]`. Only
    /// module 1 ports get a port label; other cards keep the node alone.
    PhysicalInterface,
    /// `ethpmPhysIf` DNs: physical interface DN plus `/phys`.
    OperationalState,
    /// `ethpmFcot` DNs: physical interface DN plus `/phys/fcot`.
    Transceiver,
    /// `infraRsAccBaseGrp` DNs under an access port profile.
    InterfaceProfile,
    /// Policy-group target DNs under `uni/infra/funcprof`.
    PolicyGroup,
    /// `fvRsPathAtt` DNs: EPG static path bindings.
    PathAttachment,
    /// Path endpoint target DNs: `topology/pod-1/paths-1101/pathep-[eth1/10]`.
    PathEndpoint,
    /// `fvRsCons` DNs.
    ConsumerContract,
    /// `fvRsProv` DNs.
    ProviderContract,
    /// Contract DNs: `uni/tn-T/brc-C`.
    ContractRef,
    /// `vzRsSubjFiltAtt` DNs.
    FilterAttachment,
}

impl RulesetKind {
    pub const ALL: [RulesetKind; 13] = [
        RulesetKind::EpgBridgeDomain,
        RulesetKind::Subnet,
        RulesetKind::PhysicalInterface,
        RulesetKind::OperationalState,
        RulesetKind::Transceiver,
        RulesetKind::InterfaceProfile,
        RulesetKind::PolicyGroup,
        RulesetKind::PathAttachment,
        RulesetKind::PathEndpoint,
        RulesetKind::ConsumerContract,
        RulesetKind::ProviderContract,
        RulesetKind::ContractRef,
        RulesetKind::FilterAttachment,
    ];

    /// The compiled ruleset for this shape.
    pub fn ruleset(self) -> &'static Ruleset {
        &RULESETS[self as usize]
    }
}

/// Ordered extraction rules and the fields they declare.
#[derive(Debug, Clone)]
pub struct Ruleset {
    pub kind: RulesetKind,
    pub fields: Vec<&'static str>,
    pub rules: Vec<ExtractionRule>,
}

impl Ruleset {
    /// Decomposes `dn`; see [`decompose`].
    pub fn decompose(&self, dn: &str) -> Record {
        let mut fields: Record = self
            .fields
            .iter()
            .map(|field| (field.to_string(), Value::Null))
            .collect();
        if let Some(extracted) = self.rules.iter().find_map(|rule| rule.apply(dn)) {
            fields.extend(extracted);
        }
        fields
    }

    /// Name of the first rule accepting `dn`, if any.
    pub fn matching_rule(&self, dn: &str) -> Option<&'static str> {
        self.rules
            .iter()
            .find(|rule| rule.matcher.captures(dn).is_some())
            .map(|rule| rule.name)
    }
}

/// Decomposes a DN into the fields declared by the ruleset of `kind`.
///
/// The result always carries every declared field; unmatched DNs yield
/// nulls rather than an error.
pub fn decompose(dn: &str, kind: RulesetKind) -> Record {
    kind.ruleset().decompose(dn)
}

/// Extracts a single field, `None` when the DN does not provide it.
pub fn extract(dn: &str, kind: RulesetKind, field: &str) -> Option<String> {
    decompose(dn, kind).get(field).and_then(Value::as_text)
}

/// Splits a DN on `/`, ignoring separators inside `[...]` brackets so that
/// `phys-[eth1/10]` stays one segment.
pub fn split_dn(dn: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (idx, ch) in dn.char_indices() {
        match ch {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            '/' if depth == 0 => {
                segments.push(&dn[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    segments.push(&dn[start..]);
    segments
}

fn render(template: &str, captures: &BTreeMap<String, &str>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '$' {
            out.push(ch);
            continue;
        }
        let mut name = String::new();
        if chars.peek() == Some(&'{') {
            chars.next();
            for next in chars.by_ref() {
                if next == '}' {
                    break;
                }
                name.push(next);
            }
        } else {
            while let Some(&next) = chars.peek() {
                if next.is_ascii_alphanumeric() || next == '_' {
                    name.push(next);
                    chars.next();
                } else {
                    break;
                }
            }
        }
        if name.is_empty() {
            out.push('$');
        } else if let Some(value) = captures.get(&name) {
            out.push_str(value);
        }
    }
    out
}

const EPG: &str = r"uni/tn-(?P<tenant>[^/]+)/ap-(?P<ap>[^/]+)/epg-(?P<epg>[^/]+)";
const EPG_OUTPUTS: [(&str, &str); 4] = [
    ("parent", "$parent"),
    ("tenant", "$tenant"),
    ("ap", "$ap"),
    ("epg", "$epg"),
];
const PORT_LABEL: &str = r"[pP]\d+(?:-[pP]?\d+)?";

static RULESETS: LazyLock<Vec<Ruleset>> =
    LazyLock::new(|| RulesetKind::ALL.iter().map(|kind| build(*kind)).collect());

fn epg_child(kind: RulesetKind, suffix: &str, extra: &[(&'static str, &'static str)]) -> Ruleset {
    let mut outputs = EPG_OUTPUTS.to_vec();
    outputs.extend_from_slice(extra);
    let fields = outputs.iter().map(|(field, _)| *field).collect();
    Ruleset {
        kind,
        fields,
        rules: vec![
            ExtractionRule::whole("epg", &format!(r"^(?P<parent>{EPG})(?:{suffix})?$"), &outputs),
            ExtractionRule::whole(
                "any-parent",
                &format!(r"^(?P<parent>.+?)(?:{suffix})?$"),
                &[("parent", "$parent")]
                    .into_iter()
                    .chain(extra.iter().copied())
                    .collect::<Vec<_>>(),
            ),
        ],
    }
}

fn build(kind: RulesetKind) -> Ruleset {
    use SegmentIndex::{At, Last};

    match kind {
        RulesetKind::EpgBridgeDomain => epg_child(kind, "/rsbd", &[]),
        RulesetKind::Subnet => {
            let suffix = r"(?:/subnet-\[(?P<gateway>[^\]]+)\])?$";
            Ruleset {
                kind,
                fields: vec!["parent", "tenant", "bd", "ap", "epg", "gateway"],
                rules: vec![
                    ExtractionRule::whole(
                        "bridge-domain",
                        &format!(r"^(?P<parent>uni/tn-(?P<tenant>[^/]+)/BD-(?P<bd>[^/]+)){suffix}"),
                        &[
                            ("parent", "$parent"),
                            ("tenant", "$tenant"),
                            ("bd", "$bd"),
                            ("gateway", "$gateway"),
                        ],
                    ),
                    ExtractionRule::whole(
                        "epg",
                        &format!(r"^(?P<parent>{EPG}){suffix}"),
                        &[
                            ("parent", "$parent"),
                            ("tenant", "$tenant"),
                            ("ap", "$ap"),
                            ("epg", "$epg"),
                            ("gateway", "$gateway"),
                        ],
                    ),
                    ExtractionRule::whole(
                        "any-parent",
                        &format!(r"^(?P<parent>.+?){suffix}"),
                        &[("parent", "$parent"), ("gateway", "$gateway")],
                    ),
                ],
            }
        }
        RulesetKind::PhysicalInterface => Ruleset {
            kind,
            fields: vec!["pod", "node", "module", "port", "port_label"],
            rules: vec![
                ExtractionRule::segments(
                    "front-panel",
                    &[
                        (At(1), r"^pod-(?P<pod>\d+)$"),
                        (At(2), r"^node-(?P<node>\d+)$"),
                        (At(4), r"^phys-\[eth(?P<module>1)/(?P<port>\d+)\]$"),
                    ],
                    &[
                        ("pod", "$pod"),
                        ("node", "$node"),
                        ("module", "$module"),
                        ("port", "$port"),
                        ("port_label", "p$port"),
                    ],
                ),
                ExtractionRule::whole("node-only", r"node-(?P<node>\d+)", &[("node", "$node")]),
            ],
        },
        RulesetKind::OperationalState => Ruleset {
            kind,
            fields: vec!["parent"],
            rules: vec![ExtractionRule::whole(
                "strip-phys",
                r"^(?P<parent>.+?)(?:/phys)?$",
                &[("parent", "$parent")],
            )],
        },
        RulesetKind::Transceiver => Ruleset {
            kind,
            fields: vec!["parent"],
            rules: vec![ExtractionRule::whole(
                "strip-fcot",
                r"^(?P<parent>.+?)(?:/phys/fcot)?$",
                &[("parent", "$parent")],
            )],
        },
        RulesetKind::InterfaceProfile => Ruleset {
            kind,
            fields: vec!["parent", "profile", "node", "port_label"],
            rules: vec![
                ExtractionRule::whole(
                    "port-selector",
                    &format!(
                        r"^(?P<parent>uni/infra/accportprof-(?P<profile>[A-Za-z_]*-?(?P<node>\d+(?:-\d+)?))/hports-(?P<port_label>{PORT_LABEL})-typ-range)(?:/rsaccBaseGrp)?$"
                    ),
                    &[
                        ("parent", "$parent"),
                        ("profile", "$profile"),
                        ("node", "$node"),
                        ("port_label", "$port_label"),
                    ],
                ),
                ExtractionRule::whole(
                    "any-parent",
                    r"^(?P<parent>.+?)(?:/rsaccBaseGrp)?$",
                    &[("parent", "$parent")],
                ),
            ],
        },
        RulesetKind::PolicyGroup => Ruleset {
            kind,
            fields: vec!["group_kind", "policy_group"],
            rules: vec![ExtractionRule::whole(
                "funcprof",
                r"^uni/infra/funcprof/(?P<kind>accportgrp|accbundle)-(?P<name>.+)$",
                &[("group_kind", "$kind"), ("policy_group", "$name")],
            )],
        },
        RulesetKind::PathAttachment => {
            epg_child(kind, r"/rspathAtt-\[(?P<path>.+)\]", &[("path", "$path")])
        }
        RulesetKind::PathEndpoint => Ruleset {
            kind,
            fields: vec!["pod", "path_nodes", "path_ep"],
            rules: vec![ExtractionRule::segments(
                "pathep",
                &[
                    (At(0), r"^topology$"),
                    (At(1), r"^pod-(?P<pod>\d+)$"),
                    (At(2), r"^(?:prot)?paths-(?P<nodes>\d+(?:-\d+)?)$"),
                    (Last, r"^pathep-\[(?P<ep>.+)\]$"),
                ],
                &[("pod", "$pod"), ("path_nodes", "$nodes"), ("path_ep", "$ep")],
            )],
        },
        RulesetKind::ConsumerContract => {
            epg_child(kind, r"/rscons-(?P<contract>[^/]+)", &[("contract", "$contract")])
        }
        RulesetKind::ProviderContract => {
            epg_child(kind, r"/rsprov-(?P<contract>[^/]+)", &[("contract", "$contract")])
        }
        RulesetKind::ContractRef => Ruleset {
            kind,
            fields: vec!["tenant", "contract"],
            rules: vec![ExtractionRule::segments(
                "brc",
                &[
                    (At(0), r"^uni$"),
                    (At(1), r"^tn-(?P<tenant>.+)$"),
                    (At(2), r"^brc-(?P<contract>.+)$"),
                ],
                &[("tenant", "$tenant"), ("contract", "$contract")],
            )],
        },
        RulesetKind::FilterAttachment => {
            let suffix = r"(?:/subj-(?P<subject>[^/]+)/rssubjFiltAtt-(?P<filter>[^/]+))?$";
            Ruleset {
                kind,
                fields: vec!["parent", "tenant", "contract", "subject", "filter"],
                rules: vec![
                    ExtractionRule::whole(
                        "subject-filter",
                        &format!(r"^(?P<parent>uni/tn-(?P<tenant>[^/]+)/brc-(?P<contract>[^/]+)){suffix}"),
                        &[
                            ("parent", "$parent"),
                            ("tenant", "$tenant"),
                            ("contract", "$contract"),
                            ("subject", "$subject"),
                            ("filter", "$filter"),
                        ],
                    ),
                    ExtractionRule::whole(
                        "any-parent",
                        &format!(r"^(?P<parent>.+?){suffix}"),
                        &[("parent", "$parent"), ("subject", "$subject"), ("filter", "$filter")],
                    ),
                ],
            }
        }
    }
}
