use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the banner service binary.
#[derive(Debug, Parser)]
#[command(
    name = "banner-service",
    version,
    about = "Banner resolution and cache-consistency engine"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "BANNER_CONFIG_FILE",
        value_name = "PATH",
        value_hint = ValueHint::FilePath,
        global = true
    )]
    pub config_file: Option<PathBuf>,

    /// Access token identifying the caller.
    #[arg(
        long = "token",
        env = "BANNER_TOKEN",
        value_name = "TOKEN",
        hide_env_values = true,
        global = true
    )]
    pub token: Option<String>,

    #[command(flatten)]
    pub overrides: SettingsOverrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Resolve the banner for a (tag, feature) pair.
    #[command(name = "user-banner")]
    UserBanner(UserBannerArgs),
    /// Create a banner with its tag-set and feature.
    Create(CreateArgs),
    /// Partially update a banner.
    Update(UpdateArgs),
    /// Delete a banner and its assignments.
    Delete(DeleteArgs),
    /// List banners filtered by tag and/or feature.
    List(ListArgs),
    /// Check whether a (tag-set, feature) slot is free.
    #[command(name = "check-unique")]
    CheckUnique(CheckUniqueArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct SettingsOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,

    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL", global = true)]
    pub database_url: Option<String>,

    /// Override the database pool size.
    #[arg(long = "database-max-connections", value_name = "COUNT", global = true)]
    pub database_max_connections: Option<u32>,

    /// Use a Redis cache at this URL instead of the in-process cache.
    #[arg(long = "redis-url", value_name = "URL", global = true)]
    pub redis_url: Option<String>,

    /// Override the cache time-to-live.
    #[arg(long = "cache-ttl-seconds", value_name = "SECONDS", global = true)]
    pub cache_ttl_seconds: Option<u64>,

    /// Override the per-operation deadline.
    #[arg(long = "request-timeout-ms", value_name = "MILLIS", global = true)]
    pub request_timeout_ms: Option<u64>,
}

#[derive(Debug, Args, Clone)]
pub struct UserBannerArgs {
    #[arg(long = "tag-id", value_name = "ID")]
    pub tag_id: i64,

    #[arg(long = "feature-id", value_name = "ID")]
    pub feature_id: i64,

    /// Bypass the cache and read the latest stored revision.
    #[arg(long = "use-last-revision", action = clap::ArgAction::SetTrue)]
    pub use_last_revision: bool,
}

#[derive(Debug, Args, Clone)]
pub struct CreateArgs {
    #[arg(
        long = "tag-ids",
        value_name = "ID",
        value_delimiter = ',',
        num_args = 1..,
        required = true
    )]
    pub tag_ids: Vec<i64>,

    #[arg(long = "feature-id", value_name = "ID")]
    pub feature_id: i64,

    #[arg(long)]
    pub title: String,

    #[arg(long)]
    pub text: String,

    #[arg(long)]
    pub url: String,

    #[arg(
        long = "is-active",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        default_value = "true"
    )]
    pub is_active: bool,
}

#[derive(Debug, Args, Clone)]
pub struct UpdateArgs {
    #[arg(value_name = "BANNER_ID")]
    pub id: i64,

    /// Replace the whole tag-set.
    #[arg(long = "tag-ids", value_name = "ID", value_delimiter = ',', num_args = 1..)]
    pub tag_ids: Option<Vec<i64>>,

    #[arg(long = "feature-id", value_name = "ID")]
    pub feature_id: Option<i64>,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub text: Option<String>,

    #[arg(long)]
    pub url: Option<String>,

    #[arg(
        long = "is-active",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub is_active: Option<bool>,
}

#[derive(Debug, Args, Clone)]
pub struct DeleteArgs {
    #[arg(value_name = "BANNER_ID")]
    pub id: i64,
}

#[derive(Debug, Args, Clone)]
pub struct ListArgs {
    #[arg(long = "tag-id", value_name = "ID")]
    pub tag_id: Option<i64>,

    #[arg(long = "feature-id", value_name = "ID")]
    pub feature_id: Option<i64>,

    #[arg(long, value_name = "COUNT")]
    pub limit: Option<u32>,

    #[arg(long, value_name = "COUNT")]
    pub offset: Option<u64>,
}

#[derive(Debug, Args, Clone)]
pub struct CheckUniqueArgs {
    #[arg(
        long = "tag-ids",
        value_name = "ID",
        value_delimiter = ',',
        num_args = 1..,
        required = true
    )]
    pub tag_ids: Vec<i64>,

    #[arg(long = "feature-id", value_name = "ID")]
    pub feature_id: i64,

    /// Ignore this banner when looking for collisions.
    #[arg(long = "excluding", value_name = "BANNER_ID")]
    pub excluding: Option<i64>,
}
