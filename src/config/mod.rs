use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;

use anyhow::{Context, Result};
use config::{Config, ConfigError, File, FileFormat};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub features: FeaturesConfig,
    #[serde(default)]
    pub pagination: PaginationConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

impl ApiConfig {
    pub fn load() -> Result<Self> {
        let configured_path =
            std::env::var("BACKLOG_API_CONFIG").unwrap_or_else(|_| "config/api.toml".to_string());
        assert!(
            !configured_path.is_empty(),
            "Configuration path must be non-empty"
        );
        assert!(
            configured_path.len() < 4096,
            "Configuration path length exceeds hard limit"
        );

        let mut builder = Config::builder()
            .add_source(File::new(&configured_path, FileFormat::Toml).required(true));

        if let Ok(env_override) = std::env::var("BACKLOG_API_ENV") {
            if !env_override.is_empty() {
                let env_file = format!("config/api.{}.toml", env_override);
                if Path::new(&env_file).exists() {
                    builder = builder.add_source(File::new(&env_file, FileFormat::Toml));
                }
            }
        }

        let settings = builder
            .build()
            .map_err(|err| map_config_error(err, &configured_path))?;
        let config: Self = settings
            .try_deserialize()
            .context("Failed to deserialize API configuration")?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        assert!(
            !self.database.url.is_empty(),
            "Database URL must be specified"
        );
        assert!(
            self.server.port > 0,
            "Server port must be greater than zero"
        );
        self.features.ensure_bounds()?;
        self.pagination.ensure_bounds()?;
        self.cache.ensure_bounds()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: Option<IpAddr>,
    pub port: u16,
}

impl ServerConfig {
    pub fn address(&self) -> SocketAddr {
        let host = self.host.unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert!(self.port != 0, "HTTP port cannot be zero");
        assert!(self.port < 65535, "HTTP port must be below 65535");
        SocketAddr::new(host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: Option<u32>,
}

/// Behavioral toggles gating votes, comments, and authorization. Held in
/// `AppState` so every handler sees one immutable snapshot per process,
/// never ambient global state.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FeaturesConfig {
    pub voting: VotingConfig,
    pub comments: CommentsConfig,
    pub permissions: PermissionsConfig,
}

impl FeaturesConfig {
    fn ensure_bounds(&self) -> Result<()> {
        if let Some(max) = self.voting.max_votes_per_voter {
            assert!(max > 0, "Vote quota must be positive when configured");
            assert!(max <= 100_000, "Vote quota exceeds defensive limit");
        }
        assert!(
            !self.permissions.manage.is_empty(),
            "Manage capability name must not be empty"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VotingConfig {
    pub enabled: bool,
    pub allow_vote_change: bool,
    pub require_authentication: bool,
    pub max_votes_per_voter: Option<u64>,
}

impl Default for VotingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allow_vote_change: true,
            require_authentication: true,
            max_votes_per_voter: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CommentsConfig {
    pub enabled: bool,
    pub moderation_required: bool,
    pub allow_anonymous: bool,
}

impl Default for CommentsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            moderation_required: false,
            allow_anonymous: false,
        }
    }
}

/// Capability names checked by the access policy. The identity layer in
/// front of this service decides which actors hold which capabilities.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PermissionsConfig {
    pub manage: String,
    pub submit: String,
    pub vote: String,
    pub comment: String,
}

impl Default for PermissionsConfig {
    fn default() -> Self {
        Self {
            manage: "manage_feature_requests".to_string(),
            submit: "submit_feature_requests".to_string(),
            vote: "vote_feature_requests".to_string(),
            comment: "comment_feature_requests".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    pub default_page_size: u64,
    pub max_page_size: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page_size: 20,
            max_page_size: 100,
        }
    }
}

impl PaginationConfig {
    fn ensure_bounds(&self) -> Result<()> {
        assert!(
            self.default_page_size > 0,
            "Default page size must be positive"
        );
        assert!(
            self.max_page_size >= self.default_page_size,
            "Max page size must be >= default page size"
        );
        assert!(
            self.max_page_size <= 1_000,
            "Max page size exceeds defensive limit"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub requests_max_capacity: u64,
    pub requests_ttl_seconds: u64,
    pub statistics_max_capacity: u64,
    pub statistics_ttl_seconds: u64,
    pub categories_max_capacity: u64,
    pub categories_ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_max_capacity: 1_000,
            requests_ttl_seconds: 60,
            statistics_max_capacity: 100,
            statistics_ttl_seconds: 60,
            categories_max_capacity: 100,
            categories_ttl_seconds: 300,
        }
    }
}

impl CacheConfig {
    fn ensure_bounds(&self) -> Result<()> {
        assert!(
            self.requests_max_capacity >= 10,
            "Request cache capacity must be at least 10"
        );
        assert!(
            self.requests_ttl_seconds <= 86_400,
            "Request cache TTL cannot exceed one day"
        );
        assert!(
            self.statistics_ttl_seconds <= 86_400,
            "Statistics cache TTL cannot exceed one day"
        );
        assert!(
            self.categories_ttl_seconds <= 86_400,
            "Category cache TTL cannot exceed one day"
        );
        Ok(())
    }
}

fn map_config_error(err: ConfigError, path: &str) -> ConfigError {
    match err {
        ConfigError::NotFound(_) => ConfigError::NotFound(path.to_string()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feature_defaults_are_permissive_but_authenticated() {
        let features = FeaturesConfig::default();
        assert!(features.voting.enabled);
        assert!(features.voting.allow_vote_change);
        assert!(features.voting.require_authentication);
        assert!(features.voting.max_votes_per_voter.is_none());
        assert!(features.comments.enabled);
        assert!(!features.comments.moderation_required);
        assert!(!features.comments.allow_anonymous);
    }

    #[test]
    fn pagination_defaults_within_bounds() {
        let pagination = PaginationConfig::default();
        assert!(pagination.ensure_bounds().is_ok());
        assert!(pagination.default_page_size <= pagination.max_page_size);
    }

    #[test]
    fn capability_names_are_distinct() {
        let permissions = PermissionsConfig::default();
        let names = [
            permissions.manage.as_str(),
            permissions.submit.as_str(),
            permissions.vote.as_str(),
            permissions.comment.as_str(),
        ];
        for (i, a) in names.iter().enumerate() {
            for b in names.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }
}
