use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EtlError {
    #[error("{url} answered HTTP {status}")]
    Status { url: String, status: StatusCode },

    #[error("no country matched {0:?}")]
    NoMatch(String),

    #[error("listing entry #{index} has no {field}")]
    MissingElement { index: usize, field: &'static str },

    #[error("price {0:?} is not a number")]
    Price(String),
}
