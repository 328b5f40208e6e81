use thiserror::Error;

#[derive(Error, Debug)]
pub enum AltError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Setup error: {0}")]
    Setup(String),

    #[error("Unknown provider \"{0}\". Supported providers: anthropic, google, openai")]
    UnknownProvider(String),

    #[error("{0} environment variable is not set")]
    MissingApiKey(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Reference file error: {0}")]
    Reference(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("File not found: {0}")]
    FileNotFound(String),
}

pub type Result<T> = std::result::Result<T, AltError>;
