use crate::config::ServerConfig;
use crate::error::{Error, Result};
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::{response::IntoResponse, routing::get, Router};
use cinedb_app::rest_api::TOTAL_COUNT_HEADER;
use cinedb_app::state::{AppConfig, AppState};
use cinedb_store::{file_store::FILES_URL_PREFIX, BlobStore, FileStore, StorageBackend};
use futures::FutureExt;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

pub async fn run(args: ServerConfig) -> Result<()> {
    let state = build_state(&args).await?;
    run_with_state(args, state).await
}

pub async fn run_with_state(args: ServerConfig, state: AppState) -> Result<()> {
    let shutdown = tokio::signal::ctrl_c().map(|_| ());
    run_graceful_with_state(args, state, shutdown).await
}

pub async fn run_graceful_with_state<S>(
    args: ServerConfig,
    state: AppState,
    shutdown_signal: S,
) -> Result<()>
where
    S: std::future::Future<Output = ()> + Send + 'static,
{
    let app = main_router(&args, state)?;

    let ip: std::net::IpAddr = args.listen_address.parse()?;
    let addr = std::net::SocketAddr::from((ip, args.port));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server stopped");
    Ok(())
}

fn cors_layer(allowed_origins: &[String]) -> Result<CorsLayer> {
    let origins = allowed_origins
        .iter()
        .map(|o| o.trim())
        .filter(|o| !o.is_empty())
        .map(|o| HeaderValue::from_str(o).map_err(|_| Error::InvalidOrigin(o.to_string())))
        .collect::<Result<Vec<_>>>()?;
    let allow_origin = if origins.is_empty() {
        debug!("No allowed origins configured, allowing any origin");
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins)
    };
    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([HeaderName::from_static(TOTAL_COUNT_HEADER)]))
}

pub fn main_router(args: &ServerConfig, state: AppState) -> Result<Router<()>> {
    let mut router = Router::new()
        .nest(
            "/api/generos",
            cinedb_app::rest_api::genre::router(&state),
        )
        .nest(
            "/api/actores",
            cinedb_app::rest_api::actor::router(&state),
        )
        .layer(DefaultBodyLimit::max(args.upload_limit()))
        .route("/health", get(health));

    if let StorageBackend::Local(store) = state.storage() {
        router = router.nest_service(
            &format!("/{FILES_URL_PREFIX}"),
            ServeDir::new(store.root()),
        );
    }

    Ok(router
        .with_state(state)
        .layer(cors_layer(&args.allowed_origins)?)
        .layer(TraceLayer::new_for_http()))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    match cinedb_dal::ping(state.pool()).await {
        Ok(()) => (StatusCode::OK, "OK"),
        Err(e) => {
            error!("Health check failed: {e}");
            (StatusCode::SERVICE_UNAVAILABLE, "Database unavailable")
        }
    }
}

pub async fn build_state(config: &ServerConfig) -> Result<AppState> {
    let data_dir = config.data_dir();
    if !data_dir.is_dir() {
        tokio::fs::create_dir_all(&data_dir).await?;
        info!("Created data directory {data_dir:?}");
    }

    let app_config: AppConfig = config.into();

    let storage: StorageBackend = match &config.storage_connection {
        Some(connection) => {
            let store = BlobStore::from_connection_string(connection)?;
            info!("Photos are stored in blob storage");
            store.into()
        }
        None => {
            let files_dir = config.files_dir();
            if !files_dir.is_dir() {
                tokio::fs::create_dir_all(&files_dir).await?;
                info!("Created directory for stored files {files_dir:?}");
            }
            info!("Photos are stored locally in {files_dir:?}");
            FileStore::new(files_dir, config.base_url.clone()).into()
        }
    };

    let pool = cinedb_dal::new_pool(&config.database_url()).await?;
    cinedb_dal::migrate(&pool).await?;
    debug!("Database migrated");

    Ok(AppState::new(app_config, pool, storage))
}
