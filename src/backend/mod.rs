//! The hosted backend the views talk to
//!
//! Views only see the two traits below. [`SupabaseBackend`] forwards every
//! call to a Supabase project; [`MemoryBackend`] keeps everything in process
//! for tests and demo runs.

mod memory;
mod supabase;

use async_trait::async_trait;

use table_finder_auth::{AuthError, AuthSubscription, Session, SignUpResponse};

use crate::error::Result;
use crate::guest::{Guest, GuestId, NewGuest};

pub use memory::{BackendCall, MemoryBackend, CALL_LOG_LIMIT};
pub use supabase::SupabaseBackend;

/// Guest table operations
#[async_trait]
pub trait GuestStore: Send + Sync {
    /// Every guest, ordered by surname ascending
    async fn list_guests(&self) -> Result<Vec<Guest>>;

    /// First guest whose surname and given name both match, ignoring case
    async fn find_guest(&self, surname: &str, given_name: &str) -> Result<Option<Guest>>;

    async fn insert_guest(&self, guest: &NewGuest) -> Result<()>;

    /// Replace all three fields of the guest with `id`
    async fn update_guest(&self, id: &GuestId, guest: &NewGuest) -> Result<()>;

    async fn delete_guest(&self, id: &GuestId) -> Result<()>;
}

/// Organizer authentication
#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, AuthError>;

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        redirect_to: Option<&str>,
    ) -> Result<SignUpResponse, AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;

    async fn get_session(&self) -> Option<Session>;

    /// Stream of sign in/out events; drop the subscription to release it
    fn on_auth_state_change(&self) -> AuthSubscription;
}
