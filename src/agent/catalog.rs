//! Static catalog of specialist agents.
//!
//! The catalog is a fixed, typed table: dispatch proposes names from it,
//! protocol rules may only add names from it, and the runtime picks an
//! execution strategy from each entry's [`Capability`].

use std::fmt;

use serde::{Deserialize, Serialize};

use super::prompt;

/// How an agent is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// One completion over the article text.
    PlainText,
    /// Completion with a bounded web-search round.
    ToolUse,
    /// Completion with the article's images as multimodal inputs.
    Vision,
}

impl Capability {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PlainText => "plain_text",
            Self::ToolUse => "tool_use",
            Self::Vision => "vision",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where in the run an agent executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    /// Leaf agent, runs in the concurrent fan-out over the article.
    Specialist,
    /// Runs after the fan-out barrier over the leaf reports.
    ForwardSynthesis,
}

impl AgentRole {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Specialist => "specialist",
            Self::ForwardSynthesis => "forward_synthesis",
        }
    }
}

/// A catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentSpec {
    /// Stable identifier used in dispatch decisions and reports.
    pub name: &'static str,
    /// Display symbol.
    pub icon: &'static str,
    /// Execution strategy.
    pub capability: Capability,
    /// Stage the agent runs in.
    pub role: AgentRole,
    /// One-line description shown to the dispatch manager.
    pub description: &'static str,
    /// Default system prompt.
    pub system_prompt: &'static str,
}

impl AgentSpec {
    /// Returns `true` for leaf agents run in the fan-out.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.role == AgentRole::Specialist
    }

    /// Returns `true` if the agent can run on a document with the given
    /// number of images.
    #[must_use]
    pub const fn precondition_met(&self, image_count: usize) -> bool {
        match self.capability {
            Capability::Vision => image_count > 0,
            Capability::PlainText | Capability::ToolUse => true,
        }
    }
}

/// Checks claims against outside sources.
pub const FACT_CHECKER: &str = "fact_checker";
/// Audits figures, currency amounts and percentages.
pub const NUMBERS_AUDITOR: &str = "numbers_auditor";
/// Critiques framing, loaded language and quote selection.
pub const FRAMING_CRITIC: &str = "framing_critic";
/// Audits attribution and sourcing.
pub const SOURCE_AUDITOR: &str = "source_auditor";
/// Researches background and history.
pub const CONTEXT_RESEARCHER: &str = "context_researcher";
/// Explains the policy or legislation at stake.
pub const POLICY_ANALYST: &str = "policy_analyst";
/// Analyses the article's images.
pub const VISUAL_ANALYST: &str = "visual_analyst";
/// Projects consequences from forward-looking claims.
pub const FORWARD_ANALYST: &str = "forward_analyst";

/// Name reserved for the final editor, which is never part of a roster.
pub const EDITOR: &str = "editor";

/// The catalog, in report order.
pub const AGENT_CATALOG: &[AgentSpec] = &[
    AgentSpec {
        name: FACT_CHECKER,
        icon: "🔎",
        capability: Capability::ToolUse,
        role: AgentRole::Specialist,
        description: "Verifies the article's central factual claims, searching the web once for corroboration.",
        system_prompt: prompt::FACT_CHECKER_PROMPT,
    },
    AgentSpec {
        name: NUMBERS_AUDITOR,
        icon: "🔢",
        capability: Capability::PlainText,
        role: AgentRole::Specialist,
        description: "Audits numbers, currency amounts, percentages and statistics for context and plausibility.",
        system_prompt: prompt::NUMBERS_AUDITOR_PROMPT,
    },
    AgentSpec {
        name: FRAMING_CRITIC,
        icon: "🗣️",
        capability: Capability::PlainText,
        role: AgentRole::Specialist,
        description: "Critiques framing, loaded language, headline spin and the selection of direct quotations.",
        system_prompt: prompt::FRAMING_CRITIC_PROMPT,
    },
    AgentSpec {
        name: SOURCE_AUDITOR,
        icon: "📚",
        capability: Capability::PlainText,
        role: AgentRole::Specialist,
        description: "Checks who is quoted or cited, anonymous sourcing, and whose voices are missing.",
        system_prompt: prompt::SOURCE_AUDITOR_PROMPT,
    },
    AgentSpec {
        name: CONTEXT_RESEARCHER,
        icon: "🧭",
        capability: Capability::ToolUse,
        role: AgentRole::Specialist,
        description: "Supplies historical and political background the article omits, searching the web once.",
        system_prompt: prompt::CONTEXT_RESEARCHER_PROMPT,
    },
    AgentSpec {
        name: POLICY_ANALYST,
        icon: "🏛️",
        capability: Capability::PlainText,
        role: AgentRole::Specialist,
        description: "Explains the policy, bill, budget line or legislation involved and who it affects.",
        system_prompt: prompt::POLICY_ANALYST_PROMPT,
    },
    AgentSpec {
        name: VISUAL_ANALYST,
        icon: "🖼️",
        capability: Capability::Vision,
        role: AgentRole::Specialist,
        description: "Examines the article's images for what they show, imply, or leave out. Requires images.",
        system_prompt: prompt::VISUAL_ANALYST_PROMPT,
    },
    AgentSpec {
        name: FORWARD_ANALYST,
        icon: "🔮",
        capability: Capability::PlainText,
        role: AgentRole::ForwardSynthesis,
        description: "Reads all specialist reports and projects likely consequences of announced plans or forecasts.",
        system_prompt: prompt::FORWARD_ANALYST_PROMPT,
    },
];

/// Returns the full catalog.
#[must_use]
pub const fn catalog() -> &'static [AgentSpec] {
    AGENT_CATALOG
}

/// Looks up an agent by name.
#[must_use]
pub fn find(name: &str) -> Option<&'static AgentSpec> {
    AGENT_CATALOG.iter().find(|spec| spec.name == name)
}

/// Position of an agent in catalog order, used to order reports.
#[must_use]
pub fn position(name: &str) -> usize {
    AGENT_CATALOG
        .iter()
        .position(|spec| spec.name == name)
        .unwrap_or(usize::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_names_unique() {
        let names: HashSet<&str> = AGENT_CATALOG.iter().map(|s| s.name).collect();
        assert_eq!(names.len(), AGENT_CATALOG.len());
        assert!(!names.contains(EDITOR));
    }

    #[test]
    fn test_single_forward_synthesizer() {
        let forward: Vec<_> = AGENT_CATALOG.iter().filter(|s| !s.is_leaf()).collect();
        assert_eq!(forward.len(), 1);
        assert_eq!(forward[0].name, FORWARD_ANALYST);
        assert_eq!(forward[0].capability, Capability::PlainText);
    }

    #[test]
    fn test_every_capability_represented() {
        for cap in [Capability::PlainText, Capability::ToolUse, Capability::Vision] {
            assert!(AGENT_CATALOG.iter().any(|s| s.capability == cap), "{cap}");
        }
    }

    #[test]
    fn test_prompts_and_descriptions_present() {
        for spec in AGENT_CATALOG {
            assert!(!spec.system_prompt.is_empty(), "{}", spec.name);
            assert!(!spec.description.is_empty(), "{}", spec.name);
            assert!(!spec.icon.is_empty(), "{}", spec.name);
        }
    }

    #[test]
    fn test_find_and_position() {
        assert_eq!(find(NUMBERS_AUDITOR).map(|s| s.icon), Some("🔢"));
        assert!(find("astrologer").is_none());
        assert!(position(FACT_CHECKER) < position(FORWARD_ANALYST));
        assert_eq!(position("astrologer"), usize::MAX);
    }

    #[test]
    fn test_vision_precondition() {
        let vision = find(VISUAL_ANALYST).unwrap_or_else(|| unreachable!());
        assert!(!vision.precondition_met(0));
        assert!(vision.precondition_met(2));
        let plain = find(FRAMING_CRITIC).unwrap_or_else(|| unreachable!());
        assert!(plain.precondition_met(0));
    }
}
