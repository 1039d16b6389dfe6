use axum::extract::State;
use axum::response::Response;
use axum::Json;
use tracing::info;

use crate::repository::UnitOfWorkProvider;
use crate::service::CreateOrderRequest;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::success;

/// `CreateOrder` RPC.
///
/// The allocation runs on its own task: if the client disconnects, the request
/// future is dropped but the unit of work still finishes with a commit or a
/// rollback. A committed order is never undone by cancellation.
pub async fn create_order<P: UnitOfWorkProvider>(
    State(state): State<AppState<P>>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<Response, AppError> {
    info!(
        user_id = request.user_id,
        concert_session_id = request.concert_session_id,
        number_of_tickets = request.number_of_tickets,
        "Creating order via RPC"
    );

    let orders = state.orders.clone();
    let order = tokio::spawn(async move { orders.create_order(&request).await })
        .await
        .map_err(|e| AppError::Internal(format!("allocation task failed: {e}")))??;

    info!(
        order_id = order.order_id,
        status = %order.status,
        tickets = order.ticket_ids.len(),
        "Order created successfully via RPC"
    );

    Ok(success(order, "Order created"))
}
