use fancy_regex::Regex;

/// Delimiters recognized as opening a regex pattern
const DELIMITERS: [char; 4] = ['/', '#', '~', '@'];

/// Inline flags accepted after the closing delimiter
const FLAGS: [char; 4] = ['i', 'm', 's', 'x'];

/// A rule pattern, decided once at rule-load time
///
/// Patterns wrapped in a matched delimiter pair compile to a regex;
/// everything else is a case-sensitive substring test. A pattern that
/// looks like a regex but fails to compile (unbalanced delimiter,
/// invalid syntax) degrades to a literal test on the raw pattern text
/// so a broken rule can never take down evaluation.
#[derive(Debug)]
pub enum Pattern {
    Literal(String),
    Regex(Regex),
}

impl Pattern {
    /// Parse a pattern string
    ///
    /// Returns the pattern and whether it was malformed (regex-shaped
    /// but unusable, now demoted to a literal).
    pub fn parse(raw: &str) -> (Self, bool) {
        let trimmed = raw.trim();

        let Some(delim) = trimmed.chars().next().filter(|c| DELIMITERS.contains(c)) else {
            return (Self::Literal(trimmed.to_string()), false);
        };

        // Closing delimiter is the last occurrence; anything after it
        // must be flags, otherwise this is a plain literal that merely
        // starts with a delimiter character (e.g. "/etc/passwd").
        let close = trimmed[delim.len_utf8()..]
            .rfind(delim)
            .map(|i| i + delim.len_utf8());

        let Some(close) = close else {
            // Opened like a regex but never closed
            return (Self::Literal(trimmed.to_string()), true);
        };

        let flags = &trimmed[close + delim.len_utf8()..];
        if !flags.chars().all(|c| FLAGS.contains(&c)) {
            return (Self::Literal(trimmed.to_string()), false);
        }

        let inner = &trimmed[delim.len_utf8()..close];
        if inner.is_empty() {
            return (Self::Literal(trimmed.to_string()), true);
        }

        let source = if flags.is_empty() {
            inner.to_string()
        } else {
            format!("(?{flags}){inner}")
        };

        match Regex::new(&source) {
            Ok(regex) => (Self::Regex(regex), false),
            Err(_) => (Self::Literal(trimmed.to_string()), true),
        }
    }

    /// Test a subject against this pattern
    ///
    /// Regex matches are substring searches unless the pattern itself
    /// anchors. A regex engine error at match time (possible with
    /// backtracking limits) counts as no match.
    pub fn matches(&self, subject: &str) -> bool {
        match self {
            Self::Literal(text) => subject.contains(text.as_str()),
            Self::Regex(regex) => regex.is_match(subject).unwrap_or(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_substring() {
        let (p, malformed) = Pattern::parse(".env");
        assert!(!malformed);
        assert!(p.matches("/project/.env"));
        assert!(p.matches("/project/.env.example"));
        assert!(!p.matches("/project/config.toml"));
    }

    #[test]
    fn delimited_regex_with_anchor() {
        let (p, malformed) = Pattern::parse(r"/\.env$/");
        assert!(!malformed);
        assert!(p.matches("/project/.env"));
        assert!(!p.matches("/project/.env.example"));
    }

    #[test]
    fn lookahead_is_supported() {
        let (p, malformed) = Pattern::parse("#^/home/(?!admin)#");
        assert!(!malformed);
        assert!(p.matches("/home/guest/x"));
        assert!(!p.matches("/home/admin/x"));
    }

    #[test]
    fn case_insensitive_flag() {
        let (p, malformed) = Pattern::parse("/secret/i");
        assert!(!malformed);
        assert!(p.matches("/opt/SECRET/key"));
    }

    #[test]
    fn unbalanced_delimiter_degrades_to_literal() {
        let (p, malformed) = Pattern::parse("/broken[");
        assert!(malformed);
        // Literal match is on the raw pattern text, delimiter included
        assert!(p.matches("run /broken[ now"));
        assert!(!p.matches("/broken"));
    }

    #[test]
    fn invalid_regex_degrades_to_literal() {
        let (p, malformed) = Pattern::parse("/a(b/");
        assert!(malformed);
        assert!(matches!(p, Pattern::Literal(_)));
        assert!(p.matches("this has /a(b/ inside"));
    }

    #[test]
    fn path_that_starts_with_slash_stays_literal() {
        let (p, malformed) = Pattern::parse("/etc/passwd");
        assert!(!malformed);
        assert!(p.matches("cat /etc/passwd"));
        assert!(!p.matches("/etc/shadow"));
    }
}
