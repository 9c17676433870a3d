use std::{env, fs, path::Path, time::Duration};

use regex::Regex;

use crate::{errors::Error, Result};

/// Typed configuration, loaded once at startup and immutable afterwards.
#[derive(Clone, Debug)]
pub struct Config {
    // Core
    pub telegram_bot_token: String,

    // Catalogs
    pub derpibooru_api_key: Option<String>,
    pub derpibooru_max_rps: f64,
    pub e621_max_rps: f64,

    // Content filtering
    pub blocked_tags: Vec<String>,
    pub blocked_extensions: Vec<String>,
    pub restricted_terms: Vec<String>,

    // Cache
    pub cache_ttl: Duration,
    pub cache_capacity: u64,

    // Network ceilings
    pub http_timeout: Duration,
    pub poll_timeout: Duration,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let telegram_bot_token = env_str("TELEGRAM_BOT_TOKEN").unwrap_or_default();
        if telegram_bot_token.trim().is_empty() {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let derpibooru_api_key = env_str("DERPIBOORU_API_KEY").and_then(non_empty);
        let derpibooru_max_rps = env_f64("DERPIBOORU_MAX_RPS").unwrap_or(10.0);
        let e621_max_rps = env_f64("E621_MAX_RPS").unwrap_or(1.0);

        // Blocklists and the restricted vocabulary are deployment settings;
        // the defaults come from the last deployed iteration of the bot.
        let blocked_tags = parse_csv_lower(
            env_str("BLOCKED_TAGS").or_else(|| Some("3d,cgi,comic".to_string())),
        );
        let blocked_extensions = parse_csv_lower(
            env_str("BLOCKED_EXTENSIONS").or_else(|| Some("webm,swf".to_string())),
        );
        let restricted_terms = parse_csv_lower(
            env_str("RESTRICTED_TERMS").or_else(|| Some("explicit,clop,nsfw,sex".to_string())),
        );

        let cache_ttl = Duration::from_secs(env_u64("CACHE_TTL_SECS").unwrap_or(600));
        let cache_capacity = env_u64("CACHE_CAPACITY").unwrap_or(100);

        let http_timeout = Duration::from_secs(env_u64("HTTP_TIMEOUT_SECS").unwrap_or(30));
        let poll_timeout = Duration::from_secs(env_u64("POLL_TIMEOUT_SECS").unwrap_or(20));

        Ok(Self {
            telegram_bot_token,
            derpibooru_api_key,
            derpibooru_max_rps,
            e621_max_rps,
            blocked_tags,
            blocked_extensions,
            restricted_terms,
            cache_ttl,
            cache_capacity,
            http_timeout,
            poll_timeout,
        })
    }
}

/// Compile the restricted-vocabulary terms into a single word-boundary
/// pattern. `None` when the term list is empty (nothing is restricted).
pub fn restricted_pattern(terms: &[String]) -> Result<Option<Regex>> {
    let escaped: Vec<String> = terms
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(regex::escape)
        .collect();
    if escaped.is_empty() {
        return Ok(None);
    }

    let pattern = format!(r"(?i)\b({})\b", escaped.join("|"));
    Regex::new(&pattern)
        .map(Some)
        .map_err(|e| Error::Config(format!("bad restricted term pattern: {e}")))
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_f64(key: &str) -> Option<f64> {
    env_str(key).and_then(|s| s.trim().parse::<f64>().ok())
}

fn parse_csv_lower(v: Option<String>) -> Vec<String> {
    v.unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_parsing_trims_and_lowercases() {
        let out = parse_csv_lower(Some(" Webm, SWF ,,gif ".to_string()));
        assert_eq!(out, vec!["webm", "swf", "gif"]);
    }

    #[test]
    fn restricted_pattern_matches_whole_words_only() {
        let terms = vec!["clop".to_string(), "nsfw".to_string()];
        let re = restricted_pattern(&terms).unwrap().unwrap();

        assert!(re.is_match("some clop please"));
        assert!(re.is_match("NSFW stuff"));
        assert!(!re.is_match("cyclops"));
    }

    #[test]
    fn restricted_pattern_empty_list_restricts_nothing() {
        assert!(restricted_pattern(&[]).unwrap().is_none());
    }

    #[test]
    fn restricted_pattern_escapes_metacharacters() {
        let terms = vec!["a.b".to_string()];
        let re = restricted_pattern(&terms).unwrap().unwrap();
        assert!(re.is_match("tag a.b here"));
        assert!(!re.is_match("tag axb here"));
    }
}
