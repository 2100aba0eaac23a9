//! Error types for the NetCare+ engine.
//!
//! Remote-provider failures never show up here: the telecom client absorbs
//! them into simulated responses.

use thiserror::Error;

use crate::models::CaseStatus;

#[derive(Debug, Error)]
pub enum NetcareError {
    #[error("case {0} not found")]
    CaseNotFound(String),

    #[error("invalid patient data: {0}")]
    InvalidPatient(#[from] validator::ValidationErrors),

    #[error("case {case_id} cannot move from {from} to {to}")]
    InvalidTransition {
        case_id: String,
        from: CaseStatus,
        to: CaseStatus,
    },

    #[error("case {case_id} is {status}, expected active")]
    CaseNotActive { case_id: String, status: CaseStatus },

    #[error("could not allocate a unique case id")]
    CaseIdExhausted,

    #[error("case {0} already exists")]
    DuplicateCase(String),

    #[error("invalid provider base url: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),

    #[error("http client setup failed: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

pub type Result<T, E = NetcareError> = std::result::Result<T, E>;
