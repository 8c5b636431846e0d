//! Protocol rules that extend the dispatch proposal.
//!
//! Each rule pairs a predicate over the document with the catalog agent it
//! forces onto the roster. Rules only ever add agents; the union with the
//! proposal is then filtered by capability preconditions.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use super::catalog::{
    self, FORWARD_ANALYST, FRAMING_CRITIC, NUMBERS_AUDITOR, POLICY_ANALYST, SOURCE_AUDITOR,
    VISUAL_ANALYST,
};
use super::report::{DispatchDecision, ProtocolOverride, RosterExclusion};
use crate::document::Document;

// Currency-adjacent digits, percentages, then any standalone number.
static NUMERIC: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r"(?i)[€$£¥]\s?\d|\d\s?(?:%|percent\b|per cent\b)|\d[\d,.]*\s?(?:euros?|dollars?|pounds?|million|billion|bn)\b|\b\d+(?:[.,]\d+)*\b",
    )
});

static QUOTATION: LazyLock<Regex> = LazyLock::new(|| {
    compile(r#""[^"\n]{2,}"|“[^”\n]{2,}”|«[^»\n]{2,}»|„[^“”\n]{2,}[“”]"#)
});

static FORWARD_LOOKING: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r"(?i)\b(?:will|plans? to|planned|expected to|forecasts?|forecasted|projected to|on track to|(?:by|until|target(?:s|ed)? for) 20\d\d)\b",
    )
});

static ATTRIBUTION: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r"(?i)\b(?:according to|sources? (?:say|said|told)|said|says|told|stated|claimed)\b",
    )
});

static POLICY: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r"(?i)\b(?:bill|legislation|budget|ministers?|Dáil|Oireachtas|Seanad|referendum|regulations?|statutory|white paper)\b",
    )
});

/// Compiles a built-in pattern. The patterns are constants covered by the
/// tests below, so a failure here is a programming error.
#[allow(clippy::panic)]
fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid protocol pattern {pattern}: {e}"))
}

/// What a rule looks for.
#[derive(Debug, Clone, Copy)]
pub enum Trigger {
    /// A regex over the title and body.
    Pattern(&'static LazyLock<Regex>),
    /// The document carries at least one image.
    HasImages,
}

/// A deterministic roster rule.
#[derive(Debug, Clone, Copy)]
pub struct ProtocolRule {
    /// Catalog agent the rule forces onto the roster.
    pub agent: &'static str,
    /// Predicate over the document.
    pub trigger: Trigger,
    /// Human-readable description of the trigger.
    pub reason: &'static str,
}

impl ProtocolRule {
    /// Returns the trigger reason if the rule fires for this document.
    #[must_use]
    pub fn evaluate(&self, document: &Document, text: &str) -> Option<String> {
        match self.trigger {
            Trigger::Pattern(pattern) => pattern
                .find(text)
                .map(|m| format!("{}: \"{}\"", self.reason, m.as_str().trim())),
            Trigger::HasImages => document.has_images().then(|| {
                format!("{} ({} attached)", self.reason, document.images.len())
            }),
        }
    }
}

/// The rule set, evaluated in order.
pub static PROTOCOL_RULES: [ProtocolRule; 6] = [
    ProtocolRule {
        agent: NUMBERS_AUDITOR,
        trigger: Trigger::Pattern(&NUMERIC),
        reason: "article contains figures",
    },
    ProtocolRule {
        agent: FRAMING_CRITIC,
        trigger: Trigger::Pattern(&QUOTATION),
        reason: "article contains a direct quotation",
    },
    ProtocolRule {
        agent: FORWARD_ANALYST,
        trigger: Trigger::Pattern(&FORWARD_LOOKING),
        reason: "article uses forward-looking language",
    },
    ProtocolRule {
        agent: SOURCE_AUDITOR,
        trigger: Trigger::Pattern(&ATTRIBUTION),
        reason: "article attributes claims to sources",
    },
    ProtocolRule {
        agent: POLICY_ANALYST,
        trigger: Trigger::Pattern(&POLICY),
        reason: "article discusses legislation or policy",
    },
    ProtocolRule {
        agent: VISUAL_ANALYST,
        trigger: Trigger::HasImages,
        reason: "article carries images",
    },
];

/// Final roster after protocol rules and preconditions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterResolution {
    /// Agents that will run.
    pub final_roster: BTreeSet<String>,
    /// Agents added by rules, in rule order.
    pub overrides: Vec<ProtocolOverride>,
    /// Agents dropped because their precondition failed.
    pub exclusions: Vec<RosterExclusion>,
}

/// Unions the proposal with every firing rule, then drops agents whose
/// capability precondition is not met.
///
/// Rules already satisfied by the proposal record nothing, and an agent is
/// overridden at most once.
#[must_use]
pub fn apply_overrides(document: &Document, decision: &DispatchDecision) -> RosterResolution {
    let text = document.full_text();
    let mut roster = decision.proposed_agents.clone();
    let mut overrides = Vec::new();

    for rule in &PROTOCOL_RULES {
        if roster.contains(rule.agent) {
            continue;
        }
        if let Some(trigger_reason) = rule.evaluate(document, &text) {
            debug!(agent = rule.agent, reason = %trigger_reason, "protocol override");
            roster.insert(rule.agent.to_string());
            overrides.push(ProtocolOverride {
                agent_name: rule.agent.to_string(),
                trigger_reason,
            });
        }
    }

    let image_count = document.images.len();
    let mut exclusions = Vec::new();
    roster.retain(|name| match catalog::find(name) {
        Some(spec) if spec.precondition_met(image_count) => true,
        Some(spec) => {
            warn!(agent = spec.name, "excluded: document has no images");
            exclusions.push(RosterExclusion {
                agent_name: spec.name.to_string(),
                reason: format!("{} capability requires at least one image", spec.capability),
            });
            false
        }
        None => {
            exclusions.push(RosterExclusion {
                agent_name: name.clone(),
                reason: "not in the agent catalog".to_string(),
            });
            false
        }
    });

    RosterResolution {
        final_roster: roster,
        overrides,
        exclusions,
    }
}
