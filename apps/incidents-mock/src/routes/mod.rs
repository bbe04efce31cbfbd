pub mod health;
pub mod mock;
pub mod prometheus;

use axum::Router;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(mock::router())
        .merge(prometheus::router())
        .with_state(state)
}
