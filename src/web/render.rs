//! Server-side HTML for each screen
//!
//! Pages are `tera` templates compiled into the binary from `templates/`.
//! Every `.html` template is autoescaped, so view text goes in as is.

use serde::Serialize;
use std::sync::OnceLock;
use tera::{Context, Tera};

use crate::guest::GuestForm;
use crate::views::{
    messages, row_table_label, table_label, FormState, GuestDirectory, Landing, LoginView,
    OrganizerArea, RosterManager, Route, Screen,
};

const TEMPLATES: [(&str, &str); 7] = [
    ("base.html", include_str!("../../templates/base.html")),
    ("back.html", include_str!("../../templates/back.html")),
    ("guest_form.html", include_str!("../../templates/guest_form.html")),
    ("landing.html", include_str!("../../templates/landing.html")),
    ("directory.html", include_str!("../../templates/directory.html")),
    ("organizer.html", include_str!("../../templates/organizer.html")),
    ("error.html", include_str!("../../templates/error.html")),
];

fn templates() -> Result<&'static Tera, tera::Error> {
    static COMPILED: OnceLock<Result<Tera, String>> = OnceLock::new();
    COMPILED
        .get_or_init(|| {
            let mut tera = Tera::default();
            tera.add_raw_templates(TEMPLATES)
                .map(|_| tera)
                .map_err(|e| format!("{e:?}"))
        })
        .as_ref()
        .map_err(|e| tera::Error::msg(e.clone()))
}

fn render(name: &str, context: &Context) -> Result<String, tera::Error> {
    templates()?.render(name, context)
}

/// Why the organizer page cannot show the session yet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waiting {
    /// The first session signal has not arrived
    Session,
    /// Another action is running on this console
    Action,
}

#[derive(Serialize)]
struct Link {
    path: &'static str,
    label: &'static str,
}

#[derive(Serialize)]
struct Found {
    name: String,
    table: String,
}

#[derive(Serialize)]
struct LoginModel<'a> {
    title: &'static str,
    subtitle: &'static str,
    email: &'a str,
    error: Option<&'a str>,
    message: Option<&'static str>,
    submit_label: &'static str,
    toggle_label: &'static str,
}

#[derive(Serialize)]
struct EmptyState {
    text: &'static str,
    hint: &'static str,
}

#[derive(Serialize)]
struct Row {
    id: String,
    name: String,
    table: String,
    editing: bool,
}

#[derive(Serialize)]
struct RosterModel<'a> {
    header: String,
    creating: bool,
    draft: &'a GuestForm,
    error: Option<&'static str>,
    pending: Option<String>,
    delete_confirm: &'static str,
    empty: Option<EmptyState>,
    rows: Vec<Row>,
}

fn page_context(title: &str) -> Context {
    let mut context = Context::new();
    context.insert("title", title);
    context
}

pub fn error_page(message: &str) -> Result<String, tera::Error> {
    render("error.html", &page_context(message))
}

pub fn landing(landing: &Landing) -> Result<String, tera::Error> {
    let (verse, reference) = landing.verse();
    let actions: Vec<Link> = landing
        .actions()
        .iter()
        .map(|action| Link {
            path: action.route.path(),
            label: action.label,
        })
        .collect();

    let mut context = page_context(landing.title());
    context.insert("subtitle", &landing.subtitle());
    context.insert("verse", verse);
    context.insert("reference", reference);
    context.insert("actions", &actions);
    render("landing.html", &context)
}

pub fn directory(view: &GuestDirectory) -> Result<String, tera::Error> {
    let found = view.result().map(|guest| Found {
        name: guest.display_name(),
        table: table_label(guest.table_number),
    });

    let mut context = page_context("Espace Invités");
    context.insert("action", Route::GuestDirectory.path());
    context.insert("surname", view.surname());
    context.insert("given_name", view.given_name());
    context.insert("error", &view.error());
    context.insert("found", &found);
    render("directory.html", &context)
}

fn login_model(view: &LoginView) -> LoginModel<'_> {
    LoginModel {
        title: view.title(),
        subtitle: view.subtitle(),
        email: view.email(),
        error: view.error(),
        message: view.message(),
        submit_label: view.submit_label(),
        toggle_label: view.toggle_label(),
    }
}

fn roster_model(roster: &RosterManager) -> RosterModel<'_> {
    let editing = match roster.form() {
        FormState::Editing(id) => Some(id),
        _ => None,
    };
    let rows = roster
        .guests()
        .iter()
        .map(|guest| Row {
            id: guest.id.to_string(),
            name: guest.display_name(),
            table: row_table_label(guest.table_number),
            editing: editing == Some(&guest.id),
        })
        .collect();

    RosterModel {
        header: roster.header(),
        creating: *roster.form() == FormState::Creating,
        draft: roster.draft(),
        error: roster.error(),
        pending: roster.pending_delete().map(|guest| guest.display_name()),
        delete_confirm: messages::DELETE_CONFIRM,
        empty: roster
            .empty_state()
            .map(|(text, hint)| EmptyState { text, hint }),
        rows,
    }
}

fn organizer_context(notice: Option<&str>) -> Context {
    let mut context = page_context("Espace Mariés");
    context.insert("notice", &notice);
    context.insert("refresh", &false);
    context
}

/// The organizer page for a console whose session is known
pub fn organizer(screen: Screen, area: &OrganizerArea, notice: Option<&str>) -> Result<String, tera::Error> {
    let mut context = organizer_context(notice);
    match (screen, area.roster()) {
        (Screen::Roster, Some(roster)) => {
            context.insert("screen", "roster");
            context.insert("roster", &roster_model(roster));
        }
        (Screen::Login, _) => {
            context.insert("screen", "login");
            context.insert("login", &login_model(area.login()));
        }
        _ => return organizer_waiting(Waiting::Session, notice),
    }
    render("organizer.html", &context)
}

/// A self-refreshing placeholder while the console cannot answer
pub fn organizer_waiting(waiting: Waiting, notice: Option<&str>) -> Result<String, tera::Error> {
    let mut context = organizer_context(notice);
    context.insert("screen", "waiting");
    context.insert("refresh", &true);
    context.insert(
        "loading",
        match waiting {
            Waiting::Session => messages::LOADING,
            Waiting::Action => messages::ACTION_RUNNING,
        },
    );
    render("organizer.html", &context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use std::sync::Arc;

    #[test]
    fn every_template_compiles() {
        assert!(templates().is_ok());
    }

    #[test]
    fn landing_links_both_areas() {
        let html = landing(&Landing::new(Default::default())).unwrap();
        assert!(html.contains("href=\"/maries\""));
        assert!(html.contains("href=\"/invites\""));
        assert!(html.contains("Anne &amp; Alain-Gray"));
    }

    #[tokio::test]
    async fn guest_text_is_escaped() {
        let backend = MemoryBackend::new();
        backend.seed_guest("<script>alert(1)</script>", "Jean", None);

        let mut view = GuestDirectory::new(Arc::new(backend));
        view.set_surname("<script>alert(1)</script>");
        view.set_given_name("Jean");
        view.search().await;

        let html = directory(&view).unwrap();
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[tokio::test]
    async fn roster_rows_show_the_table_and_the_open_form() {
        let backend = MemoryBackend::new();
        let paul = backend.seed_guest("Mba", "Paul", Some(5));
        backend.seed_guest("Ondo", "Marie", None);

        let mut roster = RosterManager::new(Arc::new(backend));
        roster.load().await;
        roster.start_edit(&paul);
        roster.set_draft(GuestForm::new("Mba", "Paul", "6"));

        let model = roster_model(&roster);
        assert!(!model.creating);
        assert_eq!(model.rows.len(), 2);
        assert!(model.rows.iter().any(|r| r.editing && r.name == "Paul Mba"));
        assert!(model.rows.iter().any(|r| r.table == "Table : —"));
    }

    #[test]
    fn waiting_page_refreshes_itself() {
        let html = organizer_waiting(Waiting::Action, Some(messages::CONSOLE_BUSY)).unwrap();
        assert!(html.contains("http-equiv=\"refresh\""));
        assert!(html.contains(messages::ACTION_RUNNING));
        assert!(html.contains("Une action est déjà en cours"));
    }
}
