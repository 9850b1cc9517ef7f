//! Organizer guest list with inline add, edit and delete
//!
//! The list shown is always the last successful read. Writes never touch it
//! directly: a successful insert, update or delete is followed by a fresh
//! `list_guests`, so ids and ordering come from the backend.

use std::sync::Arc;
use tracing::{error, info, warn};

use super::messages;
use crate::backend::GuestStore;
use crate::guest::{Guest, GuestForm, GuestId};

/// Which form is open. Creating and editing exclude each other.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FormState {
    #[default]
    Closed,
    Creating,
    Editing(GuestId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    /// Local validation failed; nothing was sent
    Invalid,
    /// The backend refused; the form stays open with its values
    Failed,
    /// Another save or delete is still running
    Busy,
    NoForm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Declined,
    /// Logged only; the list keeps showing the last read
    Failed,
    Busy,
    NothingPending,
}

/// "Table : 5" in a roster row, "Table : —" when unassigned
pub fn row_table_label(table_number: Option<u32>) -> String {
    match table_number {
        Some(n) => format!("Table : {}", n),
        None => "Table : —".to_string(),
    }
}

pub struct RosterManager {
    store: Arc<dyn GuestStore>,
    guests: Vec<Guest>,
    loading: bool,
    form: FormState,
    draft: GuestForm,
    saving: bool,
    error: Option<&'static str>,
    pending_delete: Option<GuestId>,
}

impl RosterManager {
    pub fn new(store: Arc<dyn GuestStore>) -> Self {
        Self {
            store,
            guests: Vec::new(),
            loading: true,
            form: FormState::Closed,
            draft: GuestForm::default(),
            saving: false,
            error: None,
            pending_delete: None,
        }
    }

    pub fn guests(&self) -> &[Guest] {
        &self.guests
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    pub fn form(&self) -> &FormState {
        &self.form
    }

    pub fn draft(&self) -> &GuestForm {
        &self.draft
    }

    pub fn error(&self) -> Option<&'static str> {
        self.error
    }

    pub fn pending_delete(&self) -> Option<&Guest> {
        let id = self.pending_delete.as_ref()?;
        self.guests.iter().find(|g| &g.id == id)
    }

    pub fn header(&self) -> String {
        messages::guest_count(self.guests.len())
    }

    /// Empty-state text and hint, once loaded with no guests
    pub fn empty_state(&self) -> Option<(&'static str, &'static str)> {
        (!self.loading && self.guests.is_empty())
            .then_some((messages::ROSTER_EMPTY, messages::ROSTER_EMPTY_HINT))
    }

    /// Re-read the whole list. A failure keeps the previous rows.
    pub async fn load(&mut self) {
        self.loading = true;
        match self.store.list_guests().await {
            Ok(guests) => self.guests = guests,
            Err(e) => error!(error = %e, "failed to load guests"),
        }
        self.loading = false;
    }

    pub fn open_create(&mut self) -> bool {
        if self.saving {
            return false;
        }
        self.open(FormState::Creating, GuestForm::default());
        true
    }

    /// Open the edit form for `id`, prefilled from the current list
    pub fn start_edit(&mut self, id: &GuestId) -> bool {
        if self.saving {
            return false;
        }
        let Some(guest) = self.guests.iter().find(|g| &g.id == id) else {
            return false;
        };
        let draft = GuestForm::from_guest(guest);
        self.open(FormState::Editing(id.clone()), draft);
        true
    }

    fn open(&mut self, form: FormState, draft: GuestForm) {
        self.form = form;
        self.draft = draft;
        self.error = None;
    }

    /// Close whichever form is open without writing anything
    pub fn cancel(&mut self) {
        if self.saving {
            return;
        }
        self.open(FormState::Closed, GuestForm::default());
    }

    pub fn set_draft(&mut self, draft: GuestForm) {
        if self.form != FormState::Closed && !self.saving {
            self.draft = draft;
        }
    }

    /// Submit the open form, then re-list on success
    pub async fn submit(&mut self) -> SaveOutcome {
        if self.saving {
            return SaveOutcome::Busy;
        }
        if self.form == FormState::Closed {
            return SaveOutcome::NoForm;
        }

        let guest = match self.draft.validate() {
            Ok(guest) => guest,
            Err(e) => {
                self.error = Some(e.message());
                return SaveOutcome::Invalid;
            }
        };

        self.saving = true;
        self.error = None;
        let result = match &self.form {
            FormState::Editing(id) => self
                .store
                .update_guest(id, &guest)
                .await
                .map_err(|e| (e, messages::EDIT_FAILED)),
            _ => self
                .store
                .insert_guest(&guest)
                .await
                .map_err(|e| (e, messages::ADD_FAILED)),
        };

        let outcome = match result {
            Ok(()) => {
                info!(surname = %guest.surname, given_name = %guest.given_name, "guest saved");
                self.open(FormState::Closed, GuestForm::default());
                self.load().await;
                SaveOutcome::Saved
            }
            Err((e, message)) => {
                error!(error = %e, form = ?self.form, "failed to save guest");
                self.error = Some(message);
                SaveOutcome::Failed
            }
        };
        self.saving = false;

        outcome
    }

    /// Ask for confirmation before deleting `id`
    pub fn request_delete(&mut self, id: &GuestId) -> bool {
        if self.saving || !self.guests.iter().any(|g| &g.id == id) {
            return false;
        }
        self.pending_delete = Some(id.clone());
        true
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    /// Answer the pending confirmation. Declining issues no call.
    pub async fn confirm_delete(&mut self, confirmed: bool) -> DeleteOutcome {
        if self.saving {
            return DeleteOutcome::Busy;
        }
        let Some(id) = self.pending_delete.take() else {
            return DeleteOutcome::NothingPending;
        };
        if !confirmed {
            return DeleteOutcome::Declined;
        }

        self.saving = true;
        let outcome = match self.store.delete_guest(&id).await {
            Ok(()) => {
                info!(%id, "guest deleted");
                if self.form == FormState::Editing(id) {
                    self.open(FormState::Closed, GuestForm::default());
                }
                self.load().await;
                DeleteOutcome::Deleted
            }
            Err(e) => {
                warn!(error = %e, %id, "failed to delete guest");
                DeleteOutcome::Failed
            }
        };
        self.saving = false;

        outcome
    }
}
