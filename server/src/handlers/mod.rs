use axum::response::Response;
use serde::Serialize;

use crate::utils::error::AppError;
use crate::utils::response::success;

pub mod orders;

pub use orders::create_order;

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
}

pub async fn health_check() -> Response {
    let payload = HealthPayload {
        status: "ok",
        service: "tickets-api",
    };

    success(payload, "Health check successful")
}

pub async fn get_order() -> Result<Response, AppError> {
    Err(AppError::Unimplemented("GetOrder not implemented".to_string()))
}

pub async fn list_orders() -> Result<Response, AppError> {
    Err(AppError::Unimplemented("ListOrders not implemented".to_string()))
}

pub async fn get_concert_session() -> Result<Response, AppError> {
    Err(AppError::Unimplemented(
        "GetConcertSession not implemented".to_string(),
    ))
}

pub async fn list_concert_sessions() -> Result<Response, AppError> {
    Err(AppError::Unimplemented(
        "ListConcertSessions not implemented".to_string(),
    ))
}

pub async fn get_available_tickets() -> Result<Response, AppError> {
    Err(AppError::Unimplemented(
        "GetAvailableTickets not implemented".to_string(),
    ))
}
