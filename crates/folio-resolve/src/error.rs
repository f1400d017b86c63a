use miette::Diagnostic;
use smol_str::SmolStr;
use thiserror::Error;

/// Failures while resolving mentions, link metadata or embed content.
///
/// These never reach the author directly: callers fold them into fallback values.
#[derive(Debug, Error, Diagnostic)]
#[non_exhaustive]
pub enum ResolveError {
    #[error("request to {url} failed")]
    #[diagnostic(code(resolve::http))]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with status {status}")]
    #[diagnostic(code(resolve::status))]
    Status { url: String, status: u16 },

    #[error("lookup timed out")]
    #[diagnostic(code(resolve::timeout))]
    Timeout,

    #[error("invalid URL {url}: {message}")]
    #[diagnostic(code(resolve::url))]
    InvalidUrl { url: String, message: String },

    #[error("no {provider} identity lookup is configured")]
    #[diagnostic(code(resolve::unconfigured))]
    Unconfigured { provider: SmolStr },

    #[error("malformed response: {message}")]
    #[diagnostic(code(resolve::decode))]
    Decode { message: String },

    #[error("embed cache I/O failed")]
    #[diagnostic(code(resolve::cache))]
    Cache(#[from] std::io::Error),

    #[error("lookup was cancelled before it completed")]
    #[diagnostic(code(resolve::cancelled))]
    Cancelled,
}

impl ResolveError {
    pub(crate) fn http(url: impl Into<String>, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            ResolveError::Timeout
        } else {
            ResolveError::Http {
                url: url.into(),
                source,
            }
        }
    }
}
