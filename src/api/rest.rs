use crate::config::ApiConfig;
use crate::error::Error;
use anyhow::Result;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use log::{error, info};
use serde::Serialize;
use sqlx::SqlitePool;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

pub mod detection_controller;

// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db_pool: Arc<SqlitePool>,
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

const OPAQUE_MESSAGE: &str = "Internal server error";

#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(rename = "error")]
    pub message: String,
    #[serde(skip)]
    pub status: u16,
}

impl ApiError {
    fn internal() -> Self {
        ApiError {
            message: OPAQUE_MESSAGE.to_string(),
            status: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::Validation(_) => ApiError {
                message: err.to_string(),
                status: StatusCode::BAD_REQUEST.as_u16(),
            },
            Error::InvalidField(_) => ApiError {
                message: err.to_string(),
                status: StatusCode::UNPROCESSABLE_ENTITY.as_u16(),
            },
            Error::Config(_) | Error::Database(_) => {
                error!("Request failed: {}", err);
                ApiError::internal()
            }
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        if let Some(err) = err.downcast_ref::<Error>() {
            return (*err).clone().into();
        }

        error!("Request failed: {:#}", err);
        ApiError::internal()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError {
            message: rejection.body_text(),
            status: rejection.status().as_u16(),
        }
    }
}

/// Implement IntoResponse for ApiError
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = Json(self);
        (status, body).into_response()
    }
}

/// Build the API router with all routes and the CORS layer
pub fn router(state: AppState) -> Router {
    // Any origin may call the API; the frontend is hosted elsewhere
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .allow_credentials(false)
        .max_age(Duration::from_secs(3600));

    Router::new()
        .route("/", get(detection_controller::index))
        .route(
            "/api/report_detection",
            post(detection_controller::report_detection),
        )
        .route("/api/get_results", get(detection_controller::get_results))
        .route("/api/health", get(detection_controller::health))
        .with_state(state)
        .layer(cors)
}

pub struct RestApi {
    config: ApiConfig,
    db_pool: Arc<SqlitePool>,
}

impl RestApi {
    pub fn new(config: &ApiConfig, db_pool: Arc<SqlitePool>) -> Self {
        Self {
            config: config.clone(),
            db_pool,
        }
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests
    pub async fn run<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let state = AppState {
            db_pool: Arc::clone(&self.db_pool),
        };
        let app = router(state);

        // Build the server address
        let addr = self.config.address.clone() + ":" + &self.config.port.to_string();
        let addr: SocketAddr = addr.parse()?;

        info!("API server listening on {}", addr);

        let listener = TcpListener::bind(addr).await?;

        axum::Server::from_tcp(listener.into_std()?)?
            .serve(app.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("API server stopped");

        Ok(())
    }
}
