use std::path::PathBuf;

/// Error returned while building or loading a [`TrustPolicy`](crate::TrustPolicy)
///
/// These only happen at startup and should be treated as fatal.
#[derive(Debug, thiserror::Error)]
pub enum PolicyLoadError {
    #[error("invalid trusted proxy `{value}`: {source}")]
    InvalidProxy {
        value: String,
        #[source]
        source: ipnet::AddrParseError,
    },
    #[error("invalid header name `{0}`")]
    InvalidHeaderName(String),
    #[error("scheme header `{0}` has no secure or insecure token")]
    MissingTokens(String),
    #[error("invalid scheme header specification `{0}`")]
    InvalidSchemeHeader(String),
    #[error("invalid chain direction `{0}`, expected `left-most` or `right-most`")]
    InvalidChainDirection(String),
    #[error("invalid boolean `{value}` for {var}")]
    InvalidBool { var: String, value: String },
    #[error("unable to read policy file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unable to parse policy: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("a trust policy is already installed")]
    AlreadyInstalled,
}

/// Why a forwarding header was not used
///
/// Never surfaced to the client, normalization falls back to the observed values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub(crate) enum Ignored {
    #[error("peer is not a trusted proxy")]
    UntrustedPeer,
    #[error("malformed value `{value}` in `{header}`")]
    MalformedHeaderValue { header: String, value: String },
    #[error("unrecognized token `{value}` in `{header}`")]
    UnrecognizedToken { header: String, value: String },
}

impl Ignored {
    pub(crate) fn malformed(header: &str, value: &str) -> Self {
        Self::MalformedHeaderValue {
            header: header.to_string(),
            value: value.to_string(),
        }
    }

    pub(crate) fn unrecognized(header: &str, value: &str) -> Self {
        Self::UnrecognizedToken {
            header: header.to_string(),
            value: value.to_string(),
        }
    }
}
