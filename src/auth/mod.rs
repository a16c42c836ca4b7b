use crate::state::AppState;
use axum::Router;

pub mod claims;
mod dto;
pub mod errors;
pub(crate) mod extractors;
pub mod guard;
pub mod handlers;
pub mod jwt;
pub mod password;
pub mod repo;
mod repo_types;
pub mod services;

pub(crate) use dto::SignupRequest;

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::auth_routes())
}
