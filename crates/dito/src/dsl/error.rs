use std::fmt;

/// A rule that does not follow the DSL grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrammarError {
    rule: String,
    position: usize,
    message: String,
}

impl GrammarError {
    pub(crate) fn new(rule: &str, position: usize, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            rule: rule.to_owned(),
            position,
            message: if message.is_empty() {
                "unexpected input".to_owned()
            } else {
                message
            },
        }
    }

    /// The rule text that failed to parse.
    pub fn rule(&self) -> &str {
        &self.rule
    }

    /// Byte offset into the rule where parsing stopped.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for GrammarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid rule `{}` at position {}: {}",
            self.rule, self.position, self.message
        )
    }
}

impl std::error::Error for GrammarError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GrammarError::new("Method(", 7, "expected `)`");
        assert_eq!(
            err.to_string(),
            "invalid rule `Method(` at position 7: expected `)`"
        );
    }

    #[test]
    fn test_empty_message_is_replaced() {
        let err = GrammarError::new("=>", 2, "");
        assert_eq!(err.message(), "unexpected input");
        assert_eq!(err.position(), 2);
        assert_eq!(err.rule(), "=>");
    }
}
