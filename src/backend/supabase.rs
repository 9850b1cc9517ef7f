use async_trait::async_trait;
use reqwest::Client;

use table_finder_auth::{
    Auth, AuthError, AuthOptions, AuthSubscription, Session, SignUpResponse,
};
use table_finder_postgrest::{escape_like, PostgrestClient, SortOrder};

use super::{AuthBackend, GuestStore};
use crate::config::AppConfig;
use crate::error::Result;
use crate::guest::{Guest, GuestId, NewGuest};

const GUEST_COLUMNS: &str = "id,nom,prenom,numero_table";

/// Supabase project reached over GoTrue and PostgREST.
///
/// Each instance owns its own auth session: build one per organizer console
/// with [`SupabaseBackend::new`] and never share it between browsers.
#[derive(Clone)]
pub struct SupabaseBackend {
    url: String,
    key: String,
    table: String,
    http_client: Client,
    auth: Auth,
}

impl SupabaseBackend {
    pub fn new(config: &AppConfig, http_client: Client) -> Self {
        let auth = Auth::new(
            &config.supabase_url,
            &config.supabase_anon_key,
            http_client.clone(),
            AuthOptions::default(),
        );

        Self {
            url: config.supabase_url.clone(),
            key: config.supabase_anon_key.clone(),
            table: config.guests_table.clone(),
            http_client,
            auth,
        }
    }

    pub fn auth(&self) -> &Auth {
        &self.auth
    }

    fn guests(&self) -> PostgrestClient {
        PostgrestClient::new(&self.url, &self.key, &self.table, self.http_client.clone())
    }

    // Row level security only lets signed-in organizers write
    async fn authorized_guests(&self) -> Result<PostgrestClient> {
        let client = self.guests();
        match self.auth.access_token().await {
            Some(token) => Ok(client.with_auth(&token)?),
            None => Ok(client),
        }
    }
}

#[async_trait]
impl GuestStore for SupabaseBackend {
    async fn list_guests(&self) -> Result<Vec<Guest>> {
        let guests = self
            .authorized_guests()
            .await?
            .select(GUEST_COLUMNS)
            .order("nom", SortOrder::Ascending)
            .execute::<Guest>()
            .await?;
        Ok(guests)
    }

    async fn find_guest(&self, surname: &str, given_name: &str) -> Result<Option<Guest>> {
        let guest = self
            .guests()
            .select(GUEST_COLUMNS)
            .ilike("nom", &escape_like(surname))
            .ilike("prenom", &escape_like(given_name))
            .execute_one::<Guest>()
            .await?;
        Ok(guest)
    }

    async fn insert_guest(&self, guest: &NewGuest) -> Result<()> {
        self.authorized_guests().await?.insert(guest).await?;
        Ok(())
    }

    async fn update_guest(&self, id: &GuestId, guest: &NewGuest) -> Result<()> {
        self.authorized_guests()
            .await?
            .eq("id", id.as_str())
            .update(guest)
            .await?;
        Ok(())
    }

    async fn delete_guest(&self, id: &GuestId) -> Result<()> {
        self.authorized_guests()
            .await?
            .eq("id", id.as_str())
            .delete()
            .await?;
        Ok(())
    }
}

#[async_trait]
impl AuthBackend for SupabaseBackend {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        self.auth.sign_in_with_password(email, password).await
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        redirect_to: Option<&str>,
    ) -> Result<SignUpResponse, AuthError> {
        self.auth.sign_up(email, password, redirect_to).await
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.auth.sign_out().await
    }

    async fn get_session(&self) -> Option<Session> {
        self.auth.get_session().await
    }

    fn on_auth_state_change(&self) -> AuthSubscription {
        self.auth.on_auth_state_change()
    }
}
