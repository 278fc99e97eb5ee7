use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{service} answered with status {status}")]
    Status {
        service: &'static str,
        status: reqwest::StatusCode,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config file: {0}")]
    Config(#[from] serde_yaml::Error),
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error("Unknown timezone `{0}`")]
    Timezone(String),
    #[error("Display failure: {0}")]
    Display(String),
    #[error("Config directory is not available")]
    NoConfigDir,
}

pub type Result<T> = std::result::Result<T, Error>;
