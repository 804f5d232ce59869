/// Spots messages where the user tells us something about themselves.
///
/// Matching is a case-insensitive substring check against a fixed list of
/// trigger phrases. The fact stored is the message itself, trimmed.
#[derive(Debug, Clone)]
pub struct DisclosureDetector {
    triggers: Vec<String>,
}

impl DisclosureDetector {
    pub fn new(triggers: &[String]) -> Self {
        Self {
            triggers: triggers
                .iter()
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    pub fn detect(&self, text: &str) -> Option<String> {
        let fact = text.trim();
        if fact.is_empty() {
            return None;
        }

        let lower = fact.to_lowercase();
        self.triggers
            .iter()
            .any(|t| lower.contains(t.as_str()))
            .then(|| fact.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> DisclosureDetector {
        DisclosureDetector::new(&[
            "my name is".to_string(),
            "i study".to_string(),
            "i like".to_string(),
            "i am a".to_string(),
        ])
    }

    #[test]
    fn test_detects_case_insensitively() {
        assert_eq!(
            detector().detect("  My Name Is Dana "),
            Some("My Name Is Dana".to_string())
        );
        assert!(detector().detect("I study marine biology").is_some());
    }

    #[test]
    fn test_ignores_ordinary_questions() {
        assert!(detector().detect("What's the weather?").is_none());
        assert!(detector().detect("").is_none());
    }
}
