//! Public table lookup

use std::sync::Arc;
use tracing::error;

use super::messages;
use crate::backend::GuestStore;
use crate::guest::Guest;

/// How a lookup ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    Found(Guest),
    NotFound,
    /// A field was blank; nothing was sent to the backend
    MissingFields,
    Failed,
}

/// "Table 5" or "Table Non attribuée"
pub fn table_label(table_number: Option<u32>) -> String {
    match table_number {
        Some(n) => format!("Table {}", n),
        None => format!("Table {}", messages::TABLE_UNASSIGNED),
    }
}

/// Guest-facing "find my table" form
pub struct GuestDirectory {
    store: Arc<dyn GuestStore>,
    surname: String,
    given_name: String,
    result: Option<Guest>,
    error: Option<&'static str>,
    searching: bool,
}

impl GuestDirectory {
    pub fn new(store: Arc<dyn GuestStore>) -> Self {
        Self {
            store,
            surname: String::new(),
            given_name: String::new(),
            result: None,
            error: None,
            searching: false,
        }
    }

    pub fn set_surname(&mut self, value: &str) {
        self.surname = value.to_string();
    }

    pub fn set_given_name(&mut self, value: &str) {
        self.given_name = value.to_string();
    }

    pub fn surname(&self) -> &str {
        &self.surname
    }

    pub fn given_name(&self) -> &str {
        &self.given_name
    }

    pub fn result(&self) -> Option<&Guest> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&'static str> {
        self.error
    }

    pub fn is_searching(&self) -> bool {
        self.searching
    }

    /// Look the guest up. Clears the previous result first; the search
    /// control is disabled while `is_searching` holds.
    pub async fn search(&mut self) -> LookupOutcome {
        self.result = None;
        self.error = None;

        let surname = self.surname.trim().to_lowercase();
        let given_name = self.given_name.trim().to_lowercase();
        if surname.is_empty() || given_name.is_empty() {
            self.error = Some(messages::LOOKUP_FIELDS_REQUIRED);
            return LookupOutcome::MissingFields;
        }

        self.searching = true;
        let outcome = match self.store.find_guest(&surname, &given_name).await {
            Ok(Some(guest)) => {
                self.result = Some(guest.clone());
                LookupOutcome::Found(guest)
            }
            Ok(None) => {
                self.error = Some(messages::LOOKUP_NOT_FOUND);
                LookupOutcome::NotFound
            }
            Err(e) => {
                error!(error = %e, "guest lookup failed");
                self.error = Some(messages::LOOKUP_FAILED);
                LookupOutcome::Failed
            }
        };
        self.searching = false;

        outcome
    }
}
