use serde::{Deserialize, Serialize};

/// Security sandbox rule set
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SecurityConfig {
    #[serde(default)]
    pub rules: Vec<SecurityRuleConfig>,
}

/// What a rule applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleTarget {
    /// Filesystem paths
    Path,
    /// Shell command lines
    Command,
}

/// What a matching rule does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    /// Deny, unless the actor's level clears the rule's threshold
    Block,
    /// Permit, gated by the rule's threshold when one is set
    Allow,
    /// Reads always pass; writes require clearing the threshold
    Protect,
}

/// A single sandbox rule as persisted
///
/// `level` is deliberately tri-state: `None` means "no bypass for
/// block, unconditional for allow", which is different from any
/// numeric threshold.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SecurityRuleConfig {
    pub id: i64,
    pub name: String,
    pub target: RuleTarget,
    pub action: RuleAction,
    /// Literal substring, or a delimited regex (`/…/`, `#…#`, `~…~`,
    /// `@…@`, optional trailing `i` flag)
    pub pattern: String,
    #[serde(default)]
    pub level: Option<i64>,
    /// Lower priorities are evaluated first
    #[serde(default = "default_priority")]
    pub priority: i64,
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Shown to the caller when the rule blocks
    #[serde(default)]
    pub description: String,
}

const fn default_true() -> bool {
    true
}

const fn default_priority() -> i64 {
    100
}
