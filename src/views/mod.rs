//! Screens of the application, independent of how they are rendered
//!
//! Each view owns its form state and talks to the backend only through the
//! traits in [`crate::backend`].

pub mod directory;
pub mod landing;
pub mod login;
pub mod messages;
pub mod organizer;
pub mod roster;
pub mod session_gate;

pub use directory::{table_label, GuestDirectory, LookupOutcome};
pub use landing::{Landing, NavAction, Route};
pub use login::{AuthMode, LoginOutcome, LoginView};
pub use organizer::{OrganizerArea, Screen};
pub use roster::{row_table_label, DeleteOutcome, FormState, RosterManager, SaveOutcome};
pub use session_gate::{GateStatus, SessionGate};
