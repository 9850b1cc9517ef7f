//! Guest records and the form that edits them

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::views::messages;

/// Backend-assigned guest identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct GuestId(String);

impl GuestId {
    pub fn new(id: impl Into<String>) -> Self {
        GuestId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GuestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// uuid primary keys arrive as strings, serial ones as numbers
impl<'de> Deserialize<'de> for GuestId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(i64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => GuestId(s),
            Raw::Number(n) => GuestId(n.to_string()),
        })
    }
}

/// A stored guest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guest {
    pub id: GuestId,
    #[serde(rename = "nom")]
    pub surname: String,
    #[serde(rename = "prenom")]
    pub given_name: String,
    /// `None` means no table assigned yet
    #[serde(rename = "numero_table")]
    pub table_number: Option<u32>,
}

impl Guest {
    /// "Paul Mba"
    pub fn display_name(&self) -> String {
        format!("{} {}", self.given_name, self.surname)
    }
}

/// Fields written on insert and update. `table_number` always serializes,
/// as `null` when unassigned, so an update clears a previous table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewGuest {
    #[serde(rename = "nom")]
    pub surname: String,
    #[serde(rename = "prenom")]
    pub given_name: String,
    #[serde(rename = "numero_table")]
    pub table_number: Option<u32>,
}

/// Why a guest form was not submitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormError {
    MissingName,
    InvalidTable,
}

impl FormError {
    pub fn message(&self) -> &'static str {
        match self {
            FormError::MissingName => messages::NAME_REQUIRED,
            FormError::InvalidTable => messages::TABLE_INVALID,
        }
    }
}

impl fmt::Display for FormError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Raw text inputs of the add/edit form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestForm {
    #[serde(default)]
    pub surname: String,
    #[serde(default)]
    pub given_name: String,
    #[serde(default)]
    pub table_number: String,
}

impl GuestForm {
    pub fn new(surname: &str, given_name: &str, table_number: &str) -> Self {
        Self {
            surname: surname.to_string(),
            given_name: given_name.to_string(),
            table_number: table_number.to_string(),
        }
    }

    /// Prefill from a stored guest for editing
    pub fn from_guest(guest: &Guest) -> Self {
        Self {
            surname: guest.surname.clone(),
            given_name: guest.given_name.clone(),
            table_number: guest
                .table_number
                .map(|n| n.to_string())
                .unwrap_or_default(),
        }
    }

    /// Trim the names, require both, and turn the table input into a
    /// positive number or `None` when left empty.
    pub fn validate(&self) -> Result<NewGuest, FormError> {
        let surname = self.surname.trim();
        let given_name = self.given_name.trim();
        if surname.is_empty() || given_name.is_empty() {
            return Err(FormError::MissingName);
        }

        Ok(NewGuest {
            surname: surname.to_string(),
            given_name: given_name.to_string(),
            table_number: parse_table_number(&self.table_number)?,
        })
    }
}

fn parse_table_number(input: &str) -> Result<Option<u32>, FormError> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }
    match input.parse::<u32>() {
        Ok(n) if n > 0 => Ok(Some(n)),
        _ => Err(FormError::InvalidTable),
    }
}
