use std::error::Error as StdError;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{
    application::content::ContentError, infra::error::InfraError,
    presentation::views::TemplateRenderError,
};

#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    public_message: &'static str,
    report: ErrorReport,
}

impl HttpError {
    pub fn new(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        detail: impl Into<String>,
    ) -> Self {
        let report = ErrorReport::from_message(source, status, detail);
        Self {
            status,
            public_message,
            report,
        }
    }

    pub fn from_error(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        error: &dyn StdError,
    ) -> Self {
        let report = ErrorReport::from_error(source, status, error);
        Self {
            status,
            public_message,
            report,
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.public_message).into_response();
        self.report.attach(&mut response);
        response
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Content(ContentError::NotFound { .. }) => StatusCode::NOT_FOUND,
            AppError::Content(ContentError::InvalidCursor(_)) => StatusCode::BAD_REQUEST,
            AppError::Content(_) => StatusCode::BAD_GATEWAY,
            AppError::Infra(InfraError::Http { .. }) => StatusCode::BAD_GATEWAY,
            AppError::Infra(InfraError::Configuration { .. }) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Infra(InfraError::Telemetry(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Infra(InfraError::Io(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn presentation_message(&self) -> &'static str {
        match self {
            AppError::Content(ContentError::NotFound { .. }) => "Resource not found",
            AppError::Content(ContentError::InvalidCursor(_)) => "Request could not be processed",
            AppError::Content(ContentError::Timeout(_)) => "Content service timed out",
            AppError::Content(_) | AppError::Infra(InfraError::Http { .. }) => {
                "Content service unavailable"
            }
            AppError::Infra(InfraError::Configuration { .. }) => "Service misconfigured",
            AppError::Infra(InfraError::Telemetry(_)) => "Logging subsystem could not start",
            AppError::Infra(InfraError::Io(_)) => "I/O failure during request",
            AppError::Unexpected(_) => "Unexpected error occurred",
        }
    }

    pub fn report(&self, source: &'static str) -> ErrorReport {
        ErrorReport::from_error(source, self.status_code(), self)
    }
}

impl From<TemplateRenderError> for AppError {
    fn from(err: TemplateRenderError) -> Self {
        AppError::unexpected(format!("{}: {}", err.source, err.error))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.presentation_message();
        let report = ErrorReport::from_error("application::error::AppError", status, &self);
        let mut response = (status, message).into_response();
        report.attach(&mut response);
        response
    }
}
