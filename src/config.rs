//! Configuration management

use crate::policy::{DelayRange, EngagementOdds};
use crate::schedule::{IntervalSpec, ScheduleError};
use std::path::PathBuf;

/// Posting interval used when none is configured
pub const DEFAULT_FREQUENCY: &str = "25m";

/// Errors raised while loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },

    #[error(transparent)]
    Frequency(#[from] ScheduleError),
}

/// Who may be followed (and favorited)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FollowPolicy {
    /// Follow anyone who follows us
    AllowAll,
    /// Only the owner and people following the owner
    #[default]
    OwnerAndFollowersOfOwner,
}

impl FollowPolicy {
    /// `all` selects `AllowAll`; anything else is the restrictive default
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("all") {
            FollowPolicy::AllowAll
        } else {
            FollowPolicy::OwnerAndFollowersOfOwner
        }
    }
}

/// The bot's owner, if one is configured.
///
/// Every owner-dependent branch goes through `handle()`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Owner(Option<String>);

impl Owner {
    pub fn new(handle: Option<&str>) -> Self {
        Self(
            handle
                .map(normalize_handle)
                .filter(|h| !h.is_empty()),
        )
    }

    pub fn none() -> Self {
        Self(None)
    }

    /// The owner's handle, or `None` when no owner is configured
    pub fn handle(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

/// Agent configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// The bot's own handle
    pub username: String,

    /// Owner receiving alerts
    pub owner: Owner,

    /// Handles the agent never engages with
    pub blacklist: Vec<String>,

    pub follow_policy: FollowPolicy,

    /// Interval of the unprompted posting job
    pub frequency: IntervalSpec,

    /// Corpus file backing the text model
    pub model_path: PathBuf,

    /// Range of the randomized pre-action delay
    pub delay: DelayRange,

    /// Seed for reproducible engagement decisions
    pub seed: Option<u64>,

    pub odds: EngagementOdds,

    /// Handles the dry-run transport reports as following the owner
    pub dry_run_followers: Vec<String>,
}

impl Config {
    /// Minimal configuration for a bot called `username`
    pub fn new(username: &str) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| match key {
            "CLONEBOT_USERNAME" => Some(username.to_string()),
            _ => None,
        })
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key/value source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let username = lookup("CLONEBOT_USERNAME")
            .map(|u| normalize_handle(&u))
            .filter(|u| !u.is_empty())
            .ok_or(ConfigError::Missing("CLONEBOT_USERNAME"))?;

        let owner = Owner::new(lookup("CLONEBOT_OWNER").as_deref());

        let blacklist = lookup("CLONEBOT_BLACKLIST")
            .map(|s| parse_handles(&s))
            .unwrap_or_default();

        let dry_run_followers = lookup("CLONEBOT_DRY_RUN_FOLLOWERS")
            .map(|s| parse_handles(&s))
            .unwrap_or_default();

        let follow_policy = lookup("CLONEBOT_FOLLOWS")
            .map(|v| FollowPolicy::parse(&v))
            .unwrap_or_default();

        let frequency = IntervalSpec::parse(
            &lookup("CLONEBOT_FREQUENCY").unwrap_or_else(|| DEFAULT_FREQUENCY.to_string()),
        )?;

        let model_path = match lookup("CLONEBOT_MODEL_PATH") {
            Some(path) => PathBuf::from(path),
            None => {
                let model = lookup("CLONEBOT_MODEL").unwrap_or_else(|| username.clone());
                PathBuf::from("model").join(format!("{}.model", model))
            }
        };

        let delay_min = parse_number(&lookup, "CLONEBOT_DELAY_MIN")?.unwrap_or(1);
        let delay_max = parse_number(&lookup, "CLONEBOT_DELAY_MAX")?.unwrap_or(6);
        let seed = parse_number(&lookup, "CLONEBOT_SEED")?;

        Ok(Self {
            username,
            owner,
            blacklist,
            follow_policy,
            frequency,
            model_path,
            delay: DelayRange::from_secs(delay_min, delay_max),
            seed,
            odds: EngagementOdds::default(),
            dry_run_followers,
        })
    }
}

fn parse_number<F>(lookup: &F, key: &'static str) -> Result<Option<u64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(None),
    }
}

/// Comma-separated handle list; blanks are dropped
fn parse_handles(list: &str) -> Vec<String> {
    list.split(',')
        .map(normalize_handle)
        .filter(|h| !h.is_empty())
        .collect()
}

/// Strip whitespace and a leading '@'
pub fn normalize_handle(handle: &str) -> String {
    handle.trim().trim_start_matches('@').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    fn load(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("CLONEBOT_USERNAME", "@clone_ebooks")]).unwrap();
        assert_eq!(config.username, "clone_ebooks");
        assert_eq!(config.owner.handle(), None);
        assert!(config.blacklist.is_empty());
        assert_eq!(config.follow_policy, FollowPolicy::OwnerAndFollowersOfOwner);
        assert_eq!(config.frequency.original(), "25m");
        assert_eq!(config.frequency.period(), Duration::from_secs(25 * 60));
        assert_eq!(config.model_path, PathBuf::from("model/clone_ebooks.model"));
        assert_eq!(config.delay, DelayRange::from_secs(1, 6));
        assert_eq!(config.seed, None);
        assert!(config.dry_run_followers.is_empty());
    }

    #[test]
    fn test_full_configuration() {
        let config = load(&[
            ("CLONEBOT_USERNAME", "clone_ebooks"),
            ("CLONEBOT_OWNER", "@owner"),
            ("CLONEBOT_BLACKLIST", "spam1, @spam2,,"),
            ("CLONEBOT_FOLLOWS", "ALL"),
            ("CLONEBOT_FREQUENCY", "1h30m"),
            ("CLONEBOT_MODEL", "owner"),
            ("CLONEBOT_DELAY_MIN", "2"),
            ("CLONEBOT_DELAY_MAX", "4"),
            ("CLONEBOT_SEED", "42"),
            ("CLONEBOT_DRY_RUN_FOLLOWERS", "@friend, pal"),
        ])
        .unwrap();

        assert_eq!(config.owner.handle(), Some("owner"));
        assert_eq!(config.blacklist, vec!["spam1", "spam2"]);
        assert_eq!(config.follow_policy, FollowPolicy::AllowAll);
        assert_eq!(config.frequency.period(), Duration::from_secs(90 * 60));
        assert_eq!(config.model_path, PathBuf::from("model/owner.model"));
        assert_eq!(config.delay, DelayRange::from_secs(2, 4));
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.dry_run_followers, vec!["friend", "pal"]);
    }

    #[test]
    fn test_model_path_override() {
        let config = load(&[
            ("CLONEBOT_USERNAME", "bot"),
            ("CLONEBOT_MODEL", "ignored"),
            ("CLONEBOT_MODEL_PATH", "/data/corpus.txt"),
        ])
        .unwrap();
        assert_eq!(config.model_path, PathBuf::from("/data/corpus.txt"));
    }

    #[test]
    fn test_missing_username() {
        let err = load(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("CLONEBOT_USERNAME")));
    }

    #[test]
    fn test_invalid_values() {
        let err = load(&[("CLONEBOT_USERNAME", "bot"), ("CLONEBOT_SEED", "abc")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "CLONEBOT_SEED", .. }));

        let err = load(&[("CLONEBOT_USERNAME", "bot"), ("CLONEBOT_FREQUENCY", "often")]).unwrap_err();
        assert!(matches!(err, ConfigError::Frequency(_)));
    }

    #[test]
    fn test_empty_owner_is_no_owner() {
        assert_eq!(Owner::new(Some("  ")).handle(), None);
        assert_eq!(Owner::new(Some("@")).handle(), None);
        assert_eq!(Owner::none().handle(), None);
    }
}
