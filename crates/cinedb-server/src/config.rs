use std::{path::PathBuf, time::Duration};

pub use clap::Parser;
use url::Url;

#[derive(Debug, Clone, clap::Parser)]
pub struct ServerConfig {
    #[arg(
        short,
        long,
        default_value_t = 3000,
        env = "CINEDB_LISTEN_PORT",
        help = "Port to listen on"
    )]
    pub port: u16,
    #[arg(
        short,
        long,
        default_value = "127.0.0.1",
        env = "CINEDB_LISTEN_ADDRESS",
        help = "Address to listen on"
    )]
    pub listen_address: String,

    #[arg(
        long,
        env = "CINEDB_BASE_URL",
        default_value = "http://localhost:3000",
        help = "Base URL of server as visible to clients, used for Location headers and URLs of locally stored files"
    )]
    pub base_url: Url,

    #[arg(
        long,
        env = "CINEDB_DATABASE_URL",
        help = "Database URL e.g. sqlite://file.db, default is sqlite://[data-dir]/cinedb.db, where data-dir is set by --data-dir"
    )]
    database_url: Option<String>,

    #[arg(
        long,
        env = "CINEDB_DATA_DIR",
        help = "Data directory (database, stored files), default is system default like ~/.local/share/cinedb",
        default_value_os_t = default_data_dir()
    )]
    data_dir: PathBuf,

    #[arg(
        long,
        env = "CINEDB_FILES_DIR",
        help = "Directory for locally stored photos, default data_dir/files"
    )]
    files_dir: Option<PathBuf>,

    #[arg(
        long,
        env = "CINEDB_STORAGE_CONNECTION",
        help = "Blob storage connection string (BlobEndpoint=...;SharedAccessSignature=...), photos are stored locally in files-dir if not set",
        hide_env_values = true
    )]
    pub storage_connection: Option<String>,

    #[arg(
        long,
        env = "CINEDB_ALLOWED_ORIGINS",
        value_delimiter = ',',
        help = "Comma separated origins allowed by CORS, any origin is allowed if not set"
    )]
    pub allowed_origins: Vec<String>,

    #[arg(
        long,
        env = "CINEDB_CACHE_TTL",
        default_value = "60s",
        help = "How long are GET responses cached in human friendly format (e.g. 1m, 30s)",
        value_parser = humantime::parse_duration
    )]
    pub cache_ttl: Duration,

    #[arg(
        long,
        env = "CINEDB_RETRY_COUNT",
        default_value_t = cinedb_app::retry::DEFAULT_RETRIES,
        help = "How many times to repeat database or storage operation failing with transient error"
    )]
    pub retry_count: u32,

    #[arg(
        long,
        env = "CINEDB_RETRY_DELAY",
        default_value = "2s",
        help = "Delay between retries in human friendly format",
        value_parser = humantime::parse_duration
    )]
    pub retry_delay: Duration,

    #[arg(
        long,
        env = "CINEDB_UPLOAD_LIMIT_MB",
        default_value = "10",
        help = "Maximum upload size in MB"
    )]
    pub upload_limit_mb: usize,
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|p| p.join("cinedb"))
        .unwrap_or_else(|| PathBuf::from("cinedb"))
}

impl ServerConfig {
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone()
    }

    pub fn files_dir(&self) -> PathBuf {
        self.files_dir
            .clone()
            .unwrap_or_else(|| self.data_dir().join("files"))
    }

    pub fn database_url(&self) -> String {
        self.database_url
            .clone()
            .unwrap_or_else(|| format!("sqlite://{}/cinedb.db", self.data_dir.display()))
    }

    pub fn upload_limit(&self) -> usize {
        self.upload_limit_mb * 1024 * 1024
    }
}

impl From<&ServerConfig> for cinedb_app::state::AppConfig {
    fn from(config: &ServerConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            cache_ttl: config.cache_ttl,
            retry: cinedb_app::retry::RetryPolicy::new(config.retry_count, config.retry_delay),
        }
    }
}
