use regex::{Captures, Regex};
use std::sync::LazyLock;

/// Redacts credentials from text before it reaches a log line.
///
/// Engine error bodies sometimes echo request headers or JWT claims back, so
/// every body the engine client logs goes through here first.
pub struct SecretScrubber {
    bearer_pattern: Option<Regex>,
    jwt_pattern: Option<Regex>,
    field_pattern: Option<Regex>,
}

static SCRUBBER: LazyLock<SecretScrubber> = LazyLock::new(SecretScrubber::new);

/// Scrub with the shared scrubber.
pub fn scrub_secrets(message: &str) -> String {
    SCRUBBER.scrub(message)
}

impl SecretScrubber {
    pub fn new() -> Self {
        Self {
            // Bearer tokens in Authorization headers
            bearer_pattern: Regex::new(r"Bearer\s+[A-Za-z0-9\-_\.=]+").ok(),
            // Bare JWTs: header.payload.signature
            jwt_pattern: Regex::new(r"eyJ[A-Za-z0-9\-_]+\.[A-Za-z0-9\-_]+\.[A-Za-z0-9\-_]+").ok(),
            // token / password / secret fields in JSON or key=value text
            field_pattern: Regex::new(
                r#"(["']?(?:access_token|token|password|secret)["']?\s*[:=]\s*)["']?[^"'\s,}]+["']?"#,
            )
            .ok(),
        }
    }

    pub fn scrub(&self, message: &str) -> String {
        let mut scrubbed = message.to_string();
        if let Some(re) = &self.bearer_pattern {
            scrubbed = re.replace_all(&scrubbed, "Bearer [TOKEN_REDACTED]").into_owned();
        }
        if let Some(re) = &self.jwt_pattern {
            scrubbed = re.replace_all(&scrubbed, "[TOKEN_REDACTED]").into_owned();
        }
        if let Some(re) = &self.field_pattern {
            scrubbed = re
                .replace_all(&scrubbed, |caps: &Captures| format!("{}[REDACTED]", &caps[1]))
                .into_owned();
        }
        scrubbed
    }
}

impl Default for SecretScrubber {
    fn default() -> Self {
        Self::new()
    }
}
