use thiserror::Error;

/// Application-specific errors for the CLI
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Missing required argument: {arg}")]
    MissingArgument { arg: String },

    #[error("Cannot read config {path}: {source}")]
    Config {
        path: String,
        #[source]
        source: srpair::Error,
    },

    #[error(transparent)]
    Dataset(#[from] srpair::Error),

    #[error("Sentinel Hub error: {0}")]
    SentinelHub(#[from] srpair::SentinelHubError),
}
