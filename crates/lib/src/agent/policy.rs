//! Reply policy: ordered keyword rules, first match wins.

/// Placeholder replaced by the inbound text when a reply is rendered.
pub const MESSAGE_PLACEHOLDER: &str = "{message}";

/// Replies with `reply` when the text contains any keyword (case-insensitive substring).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyRule {
    keywords: Vec<String>,
    reply: String,
}

impl ReplyRule {
    /// Blank keywords are dropped; a rule with no keywords never matches.
    pub fn new<I, S>(keywords: I, reply: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self {
            keywords,
            reply: reply.into(),
        }
    }

    pub fn matches(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        self.keywords.iter().any(|k| text.contains(k.as_str()))
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }
}

/// Ordered rules plus an optional fallback used when nothing matches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplyPolicy {
    rules: Vec<ReplyRule>,
    fallback: Option<String>,
}

impl ReplyPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rule(mut self, rule: ReplyRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn with_fallback(mut self, reply: impl Into<String>) -> Self {
        self.fallback = Some(reply.into());
        self
    }

    /// Reply for `text`: the first matching rule, else the fallback, else None.
    pub fn respond(&self, text: &str) -> Option<String> {
        self.rules
            .iter()
            .find(|r| r.matches(text))
            .map(|r| r.reply.as_str())
            .or(self.fallback.as_deref())
            .map(|template| template.replace(MESSAGE_PLACEHOLDER, text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strategy_policy() -> ReplyPolicy {
        ReplyPolicy::new()
            .with_rule(ReplyRule::new(["strategy"], "strategic"))
            .with_fallback("hello: {message}")
    }

    #[test]
    fn keyword_match_is_case_insensitive() {
        let p = strategy_policy();
        assert_eq!(p.respond("Our STRATEGY for Q3").as_deref(), Some("strategic"));
        assert_eq!(p.respond("strategyless").as_deref(), Some("strategic"));
    }

    #[test]
    fn fallback_renders_the_message() {
        let p = strategy_policy();
        assert_eq!(p.respond("Hello agent").as_deref(), Some("hello: Hello agent"));
    }

    #[test]
    fn first_matching_rule_wins() {
        let p = ReplyPolicy::new()
            .with_rule(ReplyRule::new(["budget"], "first"))
            .with_rule(ReplyRule::new(["budget", "cost"], "second"));
        assert_eq!(p.respond("budget and cost").as_deref(), Some("first"));
        assert_eq!(p.respond("cost only").as_deref(), Some("second"));
    }

    #[test]
    fn no_fallback_means_no_reply() {
        let p = ReplyPolicy::new().with_rule(ReplyRule::new(["strategy", "decision"], "x"));
        assert_eq!(p.respond("lunch?"), None);
        assert_eq!(p.respond("a Decision is due").as_deref(), Some("x"));
    }

    #[test]
    fn blank_keywords_never_match() {
        let rule = ReplyRule::new(["", "  "], "x");
        assert!(rule.keywords().is_empty());
        assert!(!rule.matches("anything"));
    }
}
