//! Mapping of engine errors onto HTTP responses.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;

use crate::error::NetcareError;

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl ResponseError for NetcareError {
    fn status_code(&self) -> StatusCode {
        match self {
            NetcareError::CaseNotFound(_) => StatusCode::NOT_FOUND,
            NetcareError::InvalidPatient(_) => StatusCode::UNPROCESSABLE_ENTITY,
            NetcareError::InvalidTransition { .. }
            | NetcareError::CaseNotActive { .. }
            | NetcareError::DuplicateCase(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, "request rejected");
        }
        HttpResponse::build(status).json(ErrorBody {
            error: self.to_string(),
        })
    }
}
