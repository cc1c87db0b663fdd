use actix_web::{http::StatusCode, ResponseError};
use log::error;
use sea_orm::{DbErr, TransactionError};
use thiserror::Error;

use crate::response::response_from_error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i32 },
    #[error("{entity} {id} does not exist")]
    Referential { entity: &'static str, id: i32 },
    #[error("system_exception")]
    System,
}

impl AppError {
    pub fn param_error(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(entity: &'static str, id: i32) -> Self {
        Self::NotFound { entity, id }
    }

    pub fn missing_ref(entity: &'static str, id: i32) -> Self {
        Self::Referential { entity, id }
    }

    pub fn code(&self) -> i32 {
        match self {
            Self::Validation(_) => 1,
            Self::NotFound { .. } => 4,
            Self::Referential { .. } => 5,
            Self::System => 99,
        }
    }

    pub fn msg(&self) -> String {
        self.to_string()
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        error!("database error: {}", err);
        Self::System
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        StatusCode::OK
    }

    fn error_response(&self) -> actix_web::HttpResponse {
        response_from_error(self)
    }
}

pub fn map_tx_error(err: TransactionError<AppError>) -> AppError {
    match err {
        TransactionError::Connection(e) => e.into(),
        TransactionError::Transaction(app) => app,
    }
}
