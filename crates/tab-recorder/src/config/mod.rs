mod logging_config;
mod recording_config;
mod server_config;
mod storage_config;
#[allow(clippy::module_inception)]
mod config;

pub(crate) use {
    config::Config, logging_config::LoggingConfig, recording_config::RecordingConfig,
    server_config::ServerConfig, storage_config::StorageConfig,
};

pub(crate) const DEFAULT_HOST: &str = "127.0.0.1";
pub(crate) const DEFAULT_PORT: u16 = 7878;
pub(crate) const DEFAULT_STOP_TIMEOUT_SECS: u64 = 30;
pub(crate) const DEFAULT_LOG_FILTER: &str = "tab_recorder=info,tab_recorder_core=info";
pub(crate) const STATE_FILE_NAME: &str = "session.json";

pub(crate) fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

pub(crate) fn default_port() -> u16 {
    DEFAULT_PORT
}

pub(crate) fn default_stop_timeout_secs() -> u64 {
    DEFAULT_STOP_TIMEOUT_SECS
}

pub(crate) fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}
