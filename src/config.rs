use crate::error::{AppError, Result};

pub const MARKETPLACE_URL: &str = "https://sg.carousell.com";
pub const TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// Default scan cadence: every five minutes, on the minute boundary.
/// Six fields, seconds first (tokio-cron-scheduler syntax).
pub const CRON_EXPRESSION: &str = "0 */5 * * * *";

/// Upper bound on a single snapshot acquisition (seconds).
pub const SNAPSHOT_TIMEOUT_SECS: u64 = 60;

/// Timeout for a single messaging-gateway request (seconds).
pub const DISPATCH_TIMEOUT_SECS: u64 = 30;

/// Desktop user agent sent with search page requests. The marketplace serves
/// a stripped page without the embedded state document to unknown agents.
pub const USER_AGENT: &str = concat!(
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 ",
    "(KHTML, like Gecko) Chrome/68.0.3419.0 Safari/537.36",
);

/// Above-fold component kinds marking a recency-bumped card.
pub const BUMP_COMPONENTS: &[&str] = &["active_bump", "bump"];

#[derive(Debug, Clone)]
pub struct Config {
    /// Query terms to watch, in iteration order (ITEM, comma-separated).
    pub queries: Vec<String>,
    /// Messaging gateway credential (BOT_TOKEN).
    pub bot_token: String,
    /// Recipient channel identifier (BOT_CHATID).
    pub chat_id: String,
    pub cron_expression: String,
    pub marketplace_url: String,
    pub telegram_api_url: String,
    pub snapshot_timeout_secs: u64,
    pub log_level: String,
    pub api_port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // A missing .env is normal in deployed environments.
        let _ = dotenvy::dotenv();

        let queries = parse_queries(&std::env::var("ITEM").unwrap_or_default());
        if queries.is_empty() {
            return Err(AppError::Config(
                "ITEM must list at least one query term (comma-separated)".to_string(),
            ));
        }

        Ok(Self {
            queries,
            bot_token: required("BOT_TOKEN")?,
            chat_id: required("BOT_CHATID")?,
            cron_expression: std::env::var("CRON_EXPRESSION")
                .unwrap_or_else(|_| CRON_EXPRESSION.to_string()),
            marketplace_url: std::env::var("MARKETPLACE_URL")
                .unwrap_or_else(|_| MARKETPLACE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            telegram_api_url: std::env::var("TELEGRAM_API_URL")
                .unwrap_or_else(|_| TELEGRAM_API_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            snapshot_timeout_secs: std::env::var("SNAPSHOT_TIMEOUT_SECS")
                .unwrap_or_else(|_| SNAPSHOT_TIMEOUT_SECS.to_string())
                .parse::<u64>()
                .map_err(|_| {
                    AppError::Config(
                        "SNAPSHOT_TIMEOUT_SECS must be a whole number of seconds".to_string(),
                    )
                })?,
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| {
                    AppError::Config("API_PORT must be a valid port number".to_string())
                })?,
        })
    }
}

fn required(key: &str) -> Result<String> {
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(AppError::Config(format!("{key} must be set"))),
    }
}

/// Split the ITEM list into trimmed, non-empty, de-duplicated terms.
/// First occurrence wins so the configured iteration order is kept.
pub fn parse_queries(raw: &str) -> Vec<String> {
    let mut queries: Vec<String> = Vec::new();
    for term in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !queries.iter().any(|q| q == term) {
            queries.push(term.to_string());
        }
    }
    queries
}

/// Config pointing at the given endpoints, for tests that never read the
/// environment.
#[cfg(test)]
pub(crate) fn test_config(
    queries: &[&str],
    marketplace_url: &str,
    telegram_api_url: &str,
) -> Config {
    Config {
        queries: queries.iter().map(|q| q.to_string()).collect(),
        bot_token: "token".to_string(),
        chat_id: "chat".to_string(),
        cron_expression: CRON_EXPRESSION.to_string(),
        marketplace_url: marketplace_url.to_string(),
        telegram_api_url: telegram_api_url.to_string(),
        snapshot_timeout_secs: 5,
        log_level: "info".to_string(),
        api_port: 3000,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_and_trims_terms() {
        let q = parse_queries("nintendo switch, herman miller ,  ,lego");
        assert_eq!(q, vec!["nintendo switch", "herman miller", "lego"]);
    }

    #[test]
    fn duplicate_terms_keep_first_position() {
        let q = parse_queries("lego, switch, lego");
        assert_eq!(q, vec!["lego", "switch"]);
    }

    #[test]
    fn empty_list_yields_no_terms() {
        assert!(parse_queries("").is_empty());
        assert!(parse_queries(" , ,").is_empty());
    }
}
