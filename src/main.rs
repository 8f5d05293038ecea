use std::{process, sync::Arc};

use banner_service::{
    application::{
        banners::{BannerService, CreateBannerCommand, UpdateBannerCommand, UserBannerRequest},
        context::RequestContext,
        error::AppError,
        pagination::{DEFAULT_PAGE_LIMIT, PageWindow},
        repos::{BannerContentPatch, BannerQueryFilter},
        tokens::TokenService,
    },
    cache::{BannerCache, CacheConfig, MemoryBannerCache},
    config::{self, Command},
    domain::{
        entities::BannerContent,
        types::{BannerId, FeatureId, ReadMode, TagId},
    },
    infra::{db::PostgresStore, error::InfraError, redis_cache::RedisBannerCache, telemetry},
};
use serde::Serialize;
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(error.exit_code());
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_max_level(Level::ERROR)
        .with_writer(std::io::stderr)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

struct Engine {
    banners: BannerService,
    tokens: TokenService,
    settings: config::Settings,
}

impl Engine {
    fn context(&self) -> RequestContext {
        RequestContext::with_timeout(self.settings.engine.request_timeout)
    }
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    let engine = build_engine(settings).await?;
    let access = engine
        .tokens
        .authorize(&engine.context(), cli_args.token.as_deref())
        .await?;

    match cli_args.command {
        Command::UserBanner(args) => {
            let content = engine
                .banners
                .get_user_banner(
                    &engine.context(),
                    UserBannerRequest {
                        tag_id: TagId::new(args.tag_id),
                        feature_id: FeatureId::new(args.feature_id),
                        mode: ReadMode::from_flag(args.use_last_revision),
                        access,
                    },
                )
                .await?;
            print_json(&content)
        }
        Command::Create(args) => {
            TokenService::require_admin(access)?;
            let id = engine
                .banners
                .create_banner(
                    &engine.context(),
                    CreateBannerCommand {
                        tag_ids: args.tag_ids.into_iter().map(TagId::new).collect(),
                        feature_id: FeatureId::new(args.feature_id),
                        content: BannerContent {
                            title: args.title,
                            text: args.text,
                            url: args.url,
                        },
                        is_active: args.is_active,
                    },
                )
                .await?;
            print_json(&CreatedBanner { banner_id: id })
        }
        Command::Update(args) => {
            TokenService::require_admin(access)?;
            engine
                .banners
                .update_banner(
                    &engine.context(),
                    UpdateBannerCommand {
                        id: BannerId::new(args.id),
                        tag_ids: args
                            .tag_ids
                            .map(|ids| ids.into_iter().map(TagId::new).collect()),
                        feature_id: args.feature_id.map(FeatureId::new),
                        content: BannerContentPatch {
                            title: args.title,
                            text: args.text,
                            url: args.url,
                        },
                        is_active: args.is_active,
                    },
                )
                .await?;
            Ok(())
        }
        Command::Delete(args) => {
            TokenService::require_admin(access)?;
            engine
                .banners
                .delete_banner(&engine.context(), BannerId::new(args.id))
                .await?;
            Ok(())
        }
        Command::List(args) => {
            TokenService::require_admin(access)?;
            let window = PageWindow::new(
                args.limit.unwrap_or(DEFAULT_PAGE_LIMIT),
                args.offset.unwrap_or(0),
            )?;
            let filter = BannerQueryFilter {
                tag: args.tag_id.map(TagId::new),
                feature: args.feature_id.map(FeatureId::new),
            };
            let banners = engine
                .banners
                .list_banners(&engine.context(), filter, window)
                .await?;
            print_json(&banners)
        }
        Command::CheckUnique(args) => {
            TokenService::require_admin(access)?;
            let unique = engine
                .banners
                .check_unique(
                    &engine.context(),
                    args.tag_ids.into_iter().map(TagId::new).collect(),
                    FeatureId::new(args.feature_id),
                    args.excluding.map(BannerId::new),
                )
                .await?;
            print_json(&UniqueCheck { unique })
        }
    }
}

#[derive(Serialize)]
struct CreatedBanner {
    banner_id: BannerId,
}

#[derive(Serialize)]
struct UniqueCheck {
    unique: bool,
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|err| AppError::unexpected(format!("failed to encode output: {err}")))?;
    println!("{rendered}");
    Ok(())
}

async fn build_engine(settings: config::Settings) -> Result<Engine, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool = PostgresStore::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;
    let store = Arc::new(PostgresStore::new(pool));
    store
        .health_check()
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    let cache_config = CacheConfig::from(&settings.cache);
    let cache: Arc<dyn BannerCache> = match settings.cache.redis_url.as_deref() {
        Some(url) => {
            let redis = RedisBannerCache::connect(url, cache_config)
                .await
                .map_err(|err| AppError::from(InfraError::cache(err.to_string())))?;
            redis
                .ping()
                .await
                .map_err(|err| AppError::from(InfraError::cache(err.to_string())))?;
            info!(ttl_secs = cache_config.ttl.as_secs(), "Using Redis banner cache");
            Arc::new(redis)
        }
        None => {
            info!(
                ttl_secs = cache_config.ttl.as_secs(),
                "Using in-process banner cache"
            );
            Arc::new(MemoryBannerCache::new(cache_config))
        }
    };

    Ok(Engine {
        banners: BannerService::new(store.clone(), cache),
        tokens: TokenService::new(store),
        settings,
    })
}
