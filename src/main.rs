use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tutor_match::config::{Settings, StoreBackend};
use tutor_match::error::{handle_json_payload_error, handle_path_error, handle_query_payload_error};
use tutor_match::routes::{self, AppState};
use tutor_match::services::{CacheManager, DataStore, MemoryStore, PostgresStore, RestStore, SessionResolver, StoreError};

async fn build_store(settings: &Settings) -> Result<Arc<dyn DataStore>, StoreError> {
    let store: Arc<dyn DataStore> = match settings.store.backend {
        StoreBackend::Postgres => {
            let db = &settings.database;
            Arc::new(
                PostgresStore::from_settings(
                    &db.url,
                    db.max_connections,
                    db.min_connections,
                    db.acquire_timeout_secs,
                    db.idle_timeout_secs,
                )
                .await?,
            )
        }
        StoreBackend::Rest => Arc::new(RestStore::new(
            settings.supabase.url.clone(),
            settings.supabase.service_key.clone(),
            Duration::from_secs(settings.supabase.timeout_secs.unwrap_or(30)),
        )?),
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
    };

    Ok(store)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    // Load configuration
    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()));
        }
    };

    // Initialize logging; RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if settings.logging.format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.compact().init();
    }

    info!("Starting Tutor Match service...");

    let store = build_store(&settings).await.map_err(|e| {
        error!("Failed to initialize {:?} store: {}", settings.store.backend, e);
        std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
    })?;

    info!("Data store initialized ({})", store.backend());

    // Initialize cache manager; Redis is optional
    let cache_ttl = settings.cache.ttl_secs.unwrap_or(300);
    let l1_cache_size = settings.cache.l1_cache_size.unwrap_or(1000);

    let cache = match CacheManager::new(settings.cache.redis_url.as_deref(), l1_cache_size, cache_ttl).await {
        Ok(c) => {
            info!(
                "Cache manager initialized (L1: {} entries, TTL: {}s, redis: {})",
                l1_cache_size,
                cache_ttl,
                c.has_redis()
            );
            Arc::new(c)
        }
        Err(e) => {
            error!("Failed to connect to Redis ({}), running with in-process cache only", e);
            Arc::new(CacheManager::in_memory(l1_cache_size, cache_ttl))
        }
    };

    if settings.supabase.jwt_secret.is_empty() {
        error!("supabase.jwt_secret is not set; every authenticated call will be rejected");
    }

    let sessions = Arc::new(SessionResolver::new(
        &settings.supabase.jwt_secret,
        settings.supabase.jwt_audience.as_deref().filter(|aud| !aud.is_empty()),
        store.clone(),
        cache,
    ));

    // Build application state
    let app_state = AppState::new(store, sessions);

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .app_data(web::PathConfig::default().error_handler(handle_path_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
