//! HTTP front end
//!
//! Pages are rendered on the server from `tera` templates. Organizer actions
//! are plain form posts answered with a redirect back to `/maries`.

mod console;
mod error;
mod handlers;
mod render;

use axum::routing::{get, post};
use axum::Router;

use crate::TableFinder;

pub use console::{Consoles, CONSOLE_COOKIE};
pub use error::AppError;

#[derive(Clone)]
pub struct AppState {
    pub app: TableFinder,
    pub consoles: Consoles,
}

impl AppState {
    pub fn new(app: TableFinder) -> Self {
        let consoles = Consoles::from_config(app.config());
        Self { app, consoles }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/healthz", get(handlers::healthz))
        // Public
        .route("/", get(handlers::landing))
        .route(
            "/invites",
            get(handlers::directory_page).post(handlers::directory_search),
        )
        // Organizer
        .route("/maries", get(handlers::organizer_page))
        .route("/maries/login", post(handlers::login))
        .route("/maries/mode", post(handlers::toggle_mode))
        .route("/maries/logout", post(handlers::logout))
        .route("/maries/guests", post(handlers::save_guest))
        .route("/maries/guests/new", post(handlers::new_guest))
        .route("/maries/guests/cancel", post(handlers::cancel_form))
        .route("/maries/guests/delete/confirm", post(handlers::confirm_delete))
        .route("/maries/guests/{id}/edit", post(handlers::edit_guest))
        .route("/maries/guests/{id}/delete", post(handlers::delete_guest))
        .fallback(handlers::not_found)
        .with_state(state)
}
