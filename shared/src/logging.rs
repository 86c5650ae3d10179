use std::time::Duration;

use serde::Serialize;

/// Installs the process logger. `RUST_LOG` overrides the default `info` filter.
pub fn init_logger() {
    let env = env_logger::Env::default().default_filter_or("info");
    // A second call (tests, embedded use) keeps the logger that is already installed.
    let _ = env_logger::Builder::from_env(env).try_init();
}

/// One handled HTTP request, logged after the response has been produced.
#[derive(Serialize, Clone, Debug, Default)]
pub struct HttpLogEntry {
    pub remote_addr: String,
    pub method: String,
    pub path: String,
    pub protocol: String,
    pub status_code: u16,
    pub response_size: u64,
    pub response_time: Duration,
    pub user_agent: String,
    pub referer: String,
}

impl HttpLogEntry {
    pub fn format_line(&self) -> String {
        format!(
            "{} - - \"{} {} {}\" {} {} \"{}\" \"{}\" {:.3}",
            self.remote_addr,
            self.method,
            self.path,
            self.protocol,
            self.status_code,
            self.response_size,
            self.referer,
            self.user_agent,
            self.response_time.as_secs_f64(),
        )
    }

    pub fn record(self) {
        log::info!("{}", self.format_line());
    }
}
