//! Entry screen

use crate::config::EventDetails;

/// Top-level screens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Landing,
    GuestDirectory,
    Organizer,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Landing => "/",
            Route::GuestDirectory => "/invites",
            Route::Organizer => "/maries",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavAction {
    pub label: &'static str,
    pub route: Route,
}

const VERSE: &str = "C'est pourquoi l'homme quittera son père et sa mère, et s'attachera à sa femme, \
                     et ils deviendront une seule chair.";
const VERSE_REFERENCE: &str = "Genèse 2:24";

/// Static landing page content with its two ways in
#[derive(Debug, Clone)]
pub struct Landing {
    event: EventDetails,
}

impl Landing {
    pub fn new(event: EventDetails) -> Self {
        Self { event }
    }

    pub fn title(&self) -> &str {
        &self.event.title
    }

    /// "14 Février 2026 • Port-Gentil"
    pub fn subtitle(&self) -> String {
        format!("{} • {}", self.event.date, self.event.venue)
    }

    pub fn verse(&self) -> (&'static str, &'static str) {
        (VERSE, VERSE_REFERENCE)
    }

    pub fn actions(&self) -> [NavAction; 2] {
        [
            NavAction {
                label: "👰🤵 Espace Mariés",
                route: Route::Organizer,
            },
            NavAction {
                label: "🎉 Espace Invités",
                route: Route::GuestDirectory,
            },
        ]
    }
}
