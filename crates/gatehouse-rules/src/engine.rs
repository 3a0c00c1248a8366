use std::sync::LazyLock;

use fancy_regex::Regex;
use gatehouse_config::{RuleAction, RuleTarget, SecurityConfig, SecurityRuleConfig};
use serde::Serialize;
use tracing::warn;

use crate::pattern::Pattern;

/// Absolute path tokens inside a command line
static COMMAND_PATHS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s)(/[^\s]+)").unwrap());

/// Paths that appear in nearly every shell invocation and carry no
/// access-control meaning
const IGNORED_COMMAND_PATHS: [&str; 3] = ["/dev/null", "/dev/stdout", "/dev/stderr"];

/// A compiled, active rule
#[derive(Debug)]
struct Rule {
    id: i64,
    name: String,
    target: RuleTarget,
    action: RuleAction,
    pattern: Pattern,
    level: Option<i64>,
    priority: i64,
    description: String,
}

impl Rule {
    fn as_ref(&self) -> RuleRef {
        RuleRef {
            id: self.id,
            name: self.name.clone(),
            action: self.action,
        }
    }

    /// Reason shown when this rule blocks
    fn deny_reason(&self) -> String {
        if self.description.is_empty() {
            self.name.clone()
        } else {
            self.description.clone()
        }
    }
}

/// Lightweight handle to a rule, reported in decisions
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleRef {
    pub id: i64,
    pub name: String,
    pub action: RuleAction,
}

/// Outcome of evaluating one subject
///
/// `decided_by` is `None` exactly when no rule was decisive and the
/// engine fell through to its permissive default. Callers that audit
/// can distinguish "allowed by rule" from "allowed by absence of
/// rules".
#[derive(Debug, Clone, Serialize)]
pub struct Decision {
    pub allowed: bool,
    pub reason: String,
    pub decided_by: Option<RuleRef>,
    /// Every rule whose pattern matched, decisive or not, in
    /// evaluation order
    pub matched: Vec<RuleRef>,
}

impl Decision {
    fn fail_open() -> Self {
        Self {
            allowed: true,
            reason: "No matching rule".to_string(),
            decided_by: None,
            matched: Vec::new(),
        }
    }
}

/// A decisive result from scanning the rule table
struct Verdict {
    allowed: bool,
    reason: String,
    decided_by: RuleRef,
}

/// The sandbox rule engine
///
/// Built once from configuration; evaluation is read-only and cheap
/// enough to run inline on every tool call.
#[derive(Debug, Default)]
pub struct RuleEngine {
    rules: Vec<Rule>,
}

impl RuleEngine {
    /// Compile the active rules, ordered by ascending priority with
    /// id as the tiebreak
    ///
    /// A rule whose pattern looks like a regex but cannot compile is
    /// kept as a literal matcher and logged, never rejected: dropping
    /// a block rule over a typo would widen access.
    pub fn new(config: &SecurityConfig) -> Self {
        let mut rules: Vec<Rule> = config
            .rules
            .iter()
            .filter(|r| r.is_active)
            .map(Self::compile)
            .collect();
        rules.sort_by_key(|r| (r.priority, r.id));
        Self { rules }
    }

    fn compile(config: &SecurityRuleConfig) -> Rule {
        let (pattern, malformed) = Pattern::parse(&config.pattern);
        if malformed {
            warn!(
                rule_id = config.id,
                rule_name = %config.name,
                pattern = %config.pattern,
                "rule pattern is not a valid regex, matching it as a literal"
            );
        }
        Rule {
            id: config.id,
            name: config.name.clone(),
            target: config.target,
            action: config.action,
            pattern,
            level: config.level,
            priority: config.priority,
            description: config.description.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Evaluate a path access
    pub fn check_path(&self, path: &str, actor_level: Option<i64>, is_write: bool) -> Decision {
        self.evaluate(RuleTarget::Path, path, actor_level, is_write)
    }

    /// Evaluate a command line
    ///
    /// Absolute paths embedded in the command are additionally checked
    /// against the path rules, so `cat /etc/passwd` cannot sidestep a
    /// path block just by arriving as a command.
    pub fn check_command(
        &self,
        command: &str,
        actor_level: Option<i64>,
        is_write: bool,
    ) -> Decision {
        self.evaluate(RuleTarget::Command, command, actor_level, is_write)
    }

    /// Evaluate a subject against the rule table
    ///
    /// Rules are scanned in priority order. Every pattern match lands
    /// in `matched`; the first rule that produces a verdict decides.
    /// A block whose level the actor clears, or a gated allow the
    /// actor does not clear, matches without deciding and scanning
    /// continues. No verdict at all falls open.
    pub fn evaluate(
        &self,
        target: RuleTarget,
        subject: &str,
        actor_level: Option<i64>,
        is_write: bool,
    ) -> Decision {
        let mut matched = Vec::new();
        let mut verdict = self.scan(target, subject, actor_level, is_write, &mut matched);

        // A blocked path inside a command wins over whatever the
        // command rules said, unless the command is already denied.
        // Every embedded path is checked, as a read: a path the
        // command merely references is not being written by the rule
        // engine's definition, and one allowed path must not shadow a
        // blocked one later in the same command line.
        if target == RuleTarget::Command && !verdict.as_ref().is_some_and(|v| !v.allowed) {
            for path in embedded_paths(subject) {
                let sub = self.scan(RuleTarget::Path, &path, actor_level, false, &mut matched);
                if let Some(sub) = sub
                    && !sub.allowed
                {
                    verdict = Some(Verdict {
                        allowed: false,
                        reason: format!("Path in command blocked: {}", sub.reason),
                        decided_by: sub.decided_by,
                    });
                    break;
                }
            }
        }

        match verdict {
            Some(v) => Decision {
                allowed: v.allowed,
                reason: v.reason,
                decided_by: Some(v.decided_by),
                matched,
            },
            None => Decision {
                matched,
                ..Decision::fail_open()
            },
        }
    }

    fn scan(
        &self,
        target: RuleTarget,
        subject: &str,
        actor_level: Option<i64>,
        is_write: bool,
        matched: &mut Vec<RuleRef>,
    ) -> Option<Verdict> {
        let mut verdict = None;
        for rule in self.rules.iter().filter(|r| r.target == target) {
            if !rule.pattern.matches(subject) {
                continue;
            }
            matched.push(rule.as_ref());
            if verdict.is_none() {
                verdict = Self::apply(rule, actor_level, is_write);
            }
        }
        verdict
    }

    /// One rule's verdict for an actor, `None` when the rule matched
    /// but does not decide
    fn apply(rule: &Rule, actor_level: Option<i64>, is_write: bool) -> Option<Verdict> {
        match rule.action {
            RuleAction::Block => {
                // Lower level means more privileged; a sufficiently
                // privileged actor walks through the block.
                if clears(actor_level, rule.level) {
                    return None;
                }
                Some(Verdict {
                    allowed: false,
                    reason: rule.deny_reason(),
                    decided_by: rule.as_ref(),
                })
            }
            RuleAction::Allow => {
                if rule.level.is_some() && !clears(actor_level, rule.level) {
                    return None;
                }
                Some(Verdict {
                    allowed: true,
                    reason: format!("Allowed by: {}", rule.name),
                    decided_by: rule.as_ref(),
                })
            }
            RuleAction::Protect => {
                if !is_write {
                    return Some(Verdict {
                        allowed: true,
                        reason: "Read allowed (protected path)".to_string(),
                        decided_by: rule.as_ref(),
                    });
                }
                // Writing under a protected rule with no level set is
                // denied outright: there is no threshold to clear.
                if rule.level.is_some() && clears(actor_level, rule.level) {
                    Some(Verdict {
                        allowed: true,
                        reason: "Write allowed (sufficient level)".to_string(),
                        decided_by: rule.as_ref(),
                    })
                } else {
                    Some(Verdict {
                        allowed: false,
                        reason: format!("Write requires higher level: {}", rule.name),
                        decided_by: rule.as_ref(),
                    })
                }
            }
        }
    }
}

/// Whether the actor's level clears a rule's threshold
fn clears(actor_level: Option<i64>, rule_level: Option<i64>) -> bool {
    matches!((actor_level, rule_level), (Some(actor), Some(rule)) if actor <= rule)
}

/// Absolute paths embedded in a command line, minus the device-file
/// noise every pipeline carries
fn embedded_paths(command: &str) -> Vec<String> {
    COMMAND_PATHS
        .captures_iter(command)
        .filter_map(Result::ok)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|p| !IGNORED_COMMAND_PATHS.contains(&p.as_str()))
        .collect()
}
