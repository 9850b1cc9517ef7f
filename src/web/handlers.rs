use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, Redirect};
use axum::Form;
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use tokio::sync::OwnedMutexGuard;
use tracing::debug;

use super::console::{run_exclusive, Console};
use super::error::AppError;
use super::render::{self, Waiting};
use super::AppState;
use crate::guest::{GuestForm, GuestId};
use crate::views::{messages, OrganizerArea, Route, Screen};

/// How long a page waits for the first session signal before showing the
/// loading screen
const READY_WAIT: Duration = Duration::from_secs(5);

/// Where an action dropped on a busy console lands
const BUSY_REDIRECT: &str = "/maries?busy=true";

type Page = Result<Html<String>, AppError>;
type OrganizerRedirect = Result<(CookieJar, Redirect), AppError>;

// ── Public pages ─────────────────────────────────────────────────────────────

pub async fn healthz() -> StatusCode {
    StatusCode::OK
}

pub async fn not_found() -> AppError {
    AppError::NotFound
}

pub async fn landing(State(state): State<AppState>) -> Page {
    Ok(Html(render::landing(&state.app.landing())?))
}

pub async fn directory_page(State(state): State<AppState>) -> Page {
    Ok(Html(render::directory(&state.app.directory())?))
}

#[derive(Debug, Deserialize)]
pub struct LookupRequest {
    #[serde(default)]
    pub surname: String,
    #[serde(default)]
    pub given_name: String,
}

pub async fn directory_search(
    State(state): State<AppState>,
    Form(request): Form<LookupRequest>,
) -> Page {
    let mut view = state.app.directory();
    view.set_surname(&request.surname);
    view.set_given_name(&request.given_name);
    let outcome = view.search().await;
    debug!(?outcome, "guest lookup");
    Ok(Html(render::directory(&view)?))
}

// ── Organizer area ───────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct OrganizerQuery {
    #[serde(default)]
    pub busy: bool,
}

pub async fn organizer_page(
    State(state): State<AppState>,
    Query(query): Query<OrganizerQuery>,
    jar: CookieJar,
) -> Page {
    let notice = query.busy.then_some(messages::CONSOLE_BUSY);

    let Some(console) = state.consoles.find(&jar).await else {
        // Nothing is stored until the browser posts to the organizer area
        let mut area = state.app.open_console();
        return organizer_screen(&mut area, notice).await;
    };
    let Ok(mut area) = console.try_lock() else {
        return Ok(Html(render::organizer_waiting(Waiting::Action, notice)?));
    };
    organizer_screen(&mut area, notice).await
}

async fn organizer_screen(area: &mut OrganizerArea, notice: Option<&str>) -> Page {
    let screen = tokio::time::timeout(READY_WAIT, area.ready())
        .await
        .unwrap_or(Screen::Loading);
    Ok(Html(render::organizer(screen, area, notice)?))
}

/// Run `action` on `console` and send the browser back to the organizer
/// page, flagged when the console was busy and the action dropped
async fn run_on_console<F, Fut>(jar: CookieJar, console: Option<Console>, action: F) -> OrganizerRedirect
where
    F: FnOnce(OwnedMutexGuard<OrganizerArea>) -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    let ran = match console {
        Some(console) => run_exclusive(&console, action).await?.is_some(),
        None => true,
    };
    let target = if ran {
        Route::Organizer.path()
    } else {
        BUSY_REDIRECT
    };
    Ok((jar, Redirect::to(target)))
}

/// An action on this browser's existing console. Without one there is no
/// session to act on, so the browser just goes back to the login form.
async fn organizer_action<F, Fut>(state: AppState, jar: CookieJar, action: F) -> OrganizerRedirect
where
    F: FnOnce(OwnedMutexGuard<OrganizerArea>) -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    let console = state.consoles.find(&jar).await;
    run_on_console(jar, console, action).await
}

/// An action on the login form, opening a console if the browser has none
async fn login_action<F, Fut>(state: AppState, jar: CookieJar, action: F) -> OrganizerRedirect
where
    F: FnOnce(OwnedMutexGuard<OrganizerArea>) -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    let (jar, console) = state.consoles.open(jar, &state.app).await;
    run_on_console(jar, Some(console), action).await
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(request): Form<LoginRequest>,
) -> OrganizerRedirect {
    login_action(state, jar, move |mut area| async move {
        let view = area.login_mut();
        view.set_email(&request.email);
        view.set_password(&request.password);
        let outcome = view.submit().await;
        // The password never outlives the request
        view.set_password("");
        debug!(?outcome, "login submitted");
    })
    .await
}

pub async fn toggle_mode(State(state): State<AppState>, jar: CookieJar) -> OrganizerRedirect {
    login_action(state, jar, |mut area| async move {
        area.login_mut().toggle_mode();
    })
    .await
}

pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> OrganizerRedirect {
    organizer_action(state, jar, |mut area| async move {
        area.sign_out().await;
    })
    .await
}

pub async fn new_guest(State(state): State<AppState>, jar: CookieJar) -> OrganizerRedirect {
    organizer_action(state, jar, |mut area| async move {
        if let Some(roster) = area.roster_mut() {
            roster.open_create();
        }
    })
    .await
}

pub async fn save_guest(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(draft): Form<GuestForm>,
) -> OrganizerRedirect {
    organizer_action(state, jar, move |mut area| async move {
        if let Some(roster) = area.roster_mut() {
            roster.set_draft(draft);
            let outcome = roster.submit().await;
            debug!(?outcome, "guest form submitted");
        }
    })
    .await
}

pub async fn cancel_form(State(state): State<AppState>, jar: CookieJar) -> OrganizerRedirect {
    organizer_action(state, jar, |mut area| async move {
        if let Some(roster) = area.roster_mut() {
            roster.cancel();
        }
    })
    .await
}

pub async fn edit_guest(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(id): Path<String>,
) -> OrganizerRedirect {
    let id = GuestId::new(id);
    organizer_action(state, jar, move |mut area| async move {
        if let Some(roster) = area.roster_mut() {
            roster.start_edit(&id);
        }
    })
    .await
}

pub async fn delete_guest(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(id): Path<String>,
) -> OrganizerRedirect {
    let id = GuestId::new(id);
    organizer_action(state, jar, move |mut area| async move {
        if let Some(roster) = area.roster_mut() {
            roster.request_delete(&id);
        }
    })
    .await
}

#[derive(Debug, Deserialize)]
pub struct ConfirmRequest {
    #[serde(default)]
    pub confirm: String,
}

pub async fn confirm_delete(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(request): Form<ConfirmRequest>,
) -> OrganizerRedirect {
    let confirmed = request.confirm == "oui";
    organizer_action(state, jar, move |mut area| async move {
        if let Some(roster) = area.roster_mut() {
            let outcome = roster.confirm_delete(confirmed).await;
            debug!(?outcome, "delete confirmation answered");
        }
    })
    .await
}
