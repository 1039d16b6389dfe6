use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, create_security_headers_layer, Config};
use crate::handlers::{
    create_order, get_available_tickets, get_concert_session, get_order, health_check,
    list_concert_sessions, list_orders,
};
use crate::repository::UnitOfWorkProvider;
use crate::state::AppState;

pub const RPC_PREFIX: &str = "/rpc/tickets.TicketsService";

pub fn create_routes<P: UnitOfWorkProvider>(state: AppState<P>, config: &Config) -> Router {
    let rpc = Router::new()
        .route("/CreateOrder", post(create_order::<P>))
        .route("/GetOrder", post(get_order))
        .route("/ListOrders", post(list_orders))
        .route("/GetConcertSession", post(get_concert_session))
        .route("/ListConcertSessions", post(list_concert_sessions))
        .route("/GetAvailableTickets", post(get_available_tickets))
        .with_state(state);

    Router::new()
        .route("/health", get(health_check))
        .nest(RPC_PREFIX, rpc)
        .layer(TraceLayer::new_for_http())
        .layer(create_security_headers_layer(config.mode.is_release()))
        .layer(create_cors_layer(&config.allowed_origins))
}
