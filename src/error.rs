/// Top-level error type returned by collector functions and the plugin.
#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),
}

/// Malformed or missing configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found: {path}")]
    NotFound { path: String },

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Credential '{name}' is missing required field '{field}'")]
    MissingField { name: String, field: &'static str },

    #[error("Credential '{name}' has an invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint {
        name: String,
        endpoint: String,
        reason: &'static str,
    },

    #[error("Credential '{name}' has an invalid port: {port}")]
    InvalidPort { name: String, port: u16 },

    #[error("Duplicate account identifier: {id}")]
    DuplicateAccount { id: String },

    #[error("Failed to build HTTP client for {host}: {message}")]
    Client { host: String, message: String },
}

/// Failures talking to Prism Central.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request to {url} timed out")]
    Timeout { url: String },

    #[error("{url} returned HTTP {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("Failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },
}

impl ApiError {
    pub(crate) fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout {
                url: url.to_string(),
            }
        } else if err.is_decode() {
            ApiError::Decode {
                url: url.to_string(),
                message: err.to_string(),
            }
        } else {
            ApiError::Request {
                url: url.to_string(),
                source: err,
            }
        }
    }
}

/// Violations of the resource graph's structural rules.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("Parent node {parent} is not part of the graph")]
    UnknownParent { parent: String },

    #[error("A {child} may not be attached below a {parent}")]
    InvalidEdge { parent: String, child: String },

    #[error("Resource {key} is already attached below {existing_parent}")]
    AlreadyAttached { key: String, existing_parent: String },

    #[error("Resource {key} has no edge from a declared predecessor")]
    Orphan { key: String },
}

/// Failures of a resource operation that was rejected before it could run.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ResourceError {
    #[error("Invalid tag key {key:?} on {kind} {id}")]
    InvalidTag {
        kind: &'static str,
        id: String,
        key: String,
    },
}

pub type Result<T> = std::result::Result<T, CollectorError>;
