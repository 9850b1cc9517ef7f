//! Wedding guest table finder
//!
//! Guests look up their table by name; the couple signs in to manage the
//! guest list. Storage and authentication live in a Supabase project, reached
//! through the `table-finder-auth` and `table-finder-postgrest` crates.

pub mod backend;
pub mod config;
pub mod error;
pub mod guest;
pub mod views;
pub mod web;

use std::sync::Arc;
use reqwest::Client;
use tracing::info;

use crate::backend::{AuthBackend, GuestStore, MemoryBackend, SupabaseBackend};
use crate::config::AppConfig;
use crate::error::Result;
use crate::views::{GuestDirectory, Landing, OrganizerArea};

#[derive(Clone)]
enum Backend {
    Supabase(SupabaseBackend),
    Memory(MemoryBackend),
}

/// The main entry point: builds views wired to the configured backend
#[derive(Clone)]
pub struct TableFinder {
    config: AppConfig,
    http_client: Client,
    backend: Backend,
}

impl TableFinder {
    /// Connect to the Supabase project named in `config`
    ///
    /// # Example
    ///
    /// ```
    /// use table_finder::{config::AppConfig, TableFinder};
    ///
    /// let config = AppConfig::default()
    ///     .with_supabase("https://your-project-url.supabase.co", "your-anon-key");
    /// let app = TableFinder::new(config).unwrap();
    /// assert!(!app.is_demo());
    /// ```
    pub fn new(config: AppConfig) -> Result<Self> {
        config.require_backend()?;
        let http_client = Self::http_client(&config)?;
        let backend = Backend::Supabase(SupabaseBackend::new(&config, http_client.clone()));

        Ok(Self {
            config,
            http_client,
            backend,
        })
    }

    /// Run against an in-process backend instead of Supabase
    pub fn with_memory_backend(config: AppConfig, backend: MemoryBackend) -> Result<Self> {
        let http_client = Self::http_client(&config)?;
        info!("using the in-memory backend");

        Ok(Self {
            config,
            http_client,
            backend: Backend::Memory(backend),
        })
    }

    fn http_client(config: &AppConfig) -> Result<Client> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        Ok(builder.build()?)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn is_demo(&self) -> bool {
        matches!(self.backend, Backend::Memory(_))
    }

    pub fn landing(&self) -> Landing {
        Landing::new(self.config.event.clone())
    }

    /// A fresh guest lookup form. It never signs in, so it can share the
    /// anonymous backend.
    pub fn directory(&self) -> GuestDirectory {
        let store: Arc<dyn GuestStore> = match &self.backend {
            Backend::Supabase(backend) => Arc::new(backend.clone()),
            Backend::Memory(backend) => Arc::new(backend.clone()),
        };
        GuestDirectory::new(store)
    }

    /// Mount a new organizer console with a session of its own. Must be
    /// called inside a tokio runtime.
    pub fn open_console(&self) -> OrganizerArea {
        let (store, auth): (Arc<dyn GuestStore>, Arc<dyn AuthBackend>) = match &self.backend {
            Backend::Supabase(_) => {
                let backend = Arc::new(SupabaseBackend::new(&self.config, self.http_client.clone()));
                (backend.clone(), backend)
            }
            Backend::Memory(backend) => {
                let backend = Arc::new(backend.console());
                (backend.clone(), backend)
            }
        };
        OrganizerArea::mount(store, auth, self.config.public_origin.clone())
    }
}

/// A convenience module for common imports
pub mod prelude {
    pub use crate::TableFinder;
    pub use crate::config::AppConfig;
    pub use crate::error::{Error, Result};
    pub use crate::guest::{Guest, GuestForm, GuestId};
}
