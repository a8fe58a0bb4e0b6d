use anyhow::{Context, Result};

/// Default idea-signaling tokens (lowercased substring match). The set is
/// configuration, not tuned behavior — override via `IDEA_KEYWORDS`.
const DEFAULT_IDEA_KEYWORDS: &str = "ідея,бізнес,відкрити,запустити,стартап,хочу";
/// Default continue/affirmative tokens — override via `CONTINUE_KEYWORDS`.
const DEFAULT_CONTINUE_KEYWORDS: &str =
    "так,далі,продовжуй,фінанс,наступн,ok,добре,yes,next,ага,плюс,+";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// Generative-language API key. Optional: without it the advisor
    /// degrades to deterministic canned replies instead of failing.
    pub google_api_key: Option<String>,
    pub llm_model: String,
    pub port: u16,
    pub rust_log: String,
    /// Tokens that signal a new business idea in a user message.
    pub idea_keywords: Vec<String>,
    /// Tokens that signal assent to advance the validation stepper.
    pub continue_keywords: Vec<String>,
    /// TTL for the per-conversation chat lock, in seconds.
    pub chat_lock_ttl_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            google_api_key: std::env::var("GOOGLE_API_KEY")
                .ok()
                .filter(|s| !s.is_empty()),
            llm_model: std::env::var("GOOGLE_LLM_MODEL")
                .unwrap_or_else(|_| "gemini-2.5-flash".to_string()),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            idea_keywords: parse_keywords(
                &std::env::var("IDEA_KEYWORDS")
                    .unwrap_or_else(|_| DEFAULT_IDEA_KEYWORDS.to_string()),
            ),
            continue_keywords: parse_keywords(
                &std::env::var("CONTINUE_KEYWORDS")
                    .unwrap_or_else(|_| DEFAULT_CONTINUE_KEYWORDS.to_string()),
            ),
            chat_lock_ttl_secs: std::env::var("CHAT_LOCK_TTL_SECS")
                .unwrap_or_else(|_| "120".to_string())
                .parse::<u64>()
                .context("CHAT_LOCK_TTL_SECS must be a number of seconds")?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_keywords(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keywords_trims_and_lowercases() {
        let kw = parse_keywords(" Так , далі ,OK,, + ");
        assert_eq!(kw, vec!["так", "далі", "ok", "+"]);
    }

    #[test]
    fn test_default_keyword_sets_parse() {
        assert!(parse_keywords(DEFAULT_IDEA_KEYWORDS).contains(&"стартап".to_string()));
        assert!(parse_keywords(DEFAULT_CONTINUE_KEYWORDS).contains(&"+".to_string()));
    }
}
