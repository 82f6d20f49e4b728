use crate::state::AppState;
use axum::Router;

pub mod classify;
mod dto;
pub mod handlers;
pub mod repo;

pub fn router() -> Router<AppState> {
    handlers::health_routes()
}
