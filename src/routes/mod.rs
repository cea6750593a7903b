mod flashcards;
mod history;
mod practice;
mod users;

use crate::state::AppState;
use axum::Router;

/// Backend-relayed resources, mounted under `/api`.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(flashcards::router())
        .merge(practice::router())
        .merge(history::router())
        .merge(users::router())
}
