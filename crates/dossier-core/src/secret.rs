use std::fmt;

/// Wrapper for sensitive strings with redacted Debug/Display.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_and_display_are_redacted() {
        let s = Secret::new("ghp_abc");
        assert_eq!(format!("{s:?}"), "[REDACTED]");
        assert_eq!(s.to_string(), "[REDACTED]");
        assert_eq!(s.expose(), "ghp_abc");
    }

    #[test]
    fn redacted_inside_containers() {
        let s = Some(Secret::new("key"));
        assert_eq!(format!("{s:?}"), "Some([REDACTED])");
    }
}
