//! Configuration for the table-finder application

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use crate::error::{Error, Result};

/// Event shown on the landing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDetails {
    pub title: String,
    pub date: String,
    pub venue: String,
}

impl Default for EventDetails {
    fn default() -> Self {
        Self {
            title: "Anne & Alain-Gray".to_string(),
            date: "14 Février 2026".to_string(),
            venue: "Port-Gentil".to_string(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Base URL of the Supabase project
    pub supabase_url: String,

    /// Anonymous (publishable) API key
    pub supabase_anon_key: String,

    /// Table holding the guests
    pub guests_table: String,

    /// Where confirmation emails send new organizers back to
    pub public_origin: Option<String>,

    /// Address the web server listens on
    pub bind_addr: SocketAddr,

    /// Upper bound on every backend call
    pub request_timeout: Option<Duration>,

    /// Organizer consoles unused for this long are dropped
    pub console_idle_timeout: Duration,

    /// Most organizer consoles kept at once; the least recently used goes first
    pub max_consoles: usize,

    pub event: EventDetails,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            guests_table: "invites".to_string(),
            public_origin: None,
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            request_timeout: Some(Duration::from_secs(30)),
            console_idle_timeout: Duration::from_secs(30 * 60),
            max_consoles: 256,
            event: EventDetails::default(),
        }
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl AppConfig {
    /// Load from the process environment, reading `.env` first if present.
    /// `SUPABASE_URL` and `SUPABASE_ANON_KEY` are only checked by
    /// [`AppConfig::require_backend`], so demo runs need neither.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let mut config = Self::default();
        if let Some(url) = var("SUPABASE_URL") {
            config.supabase_url = url;
        }
        if let Some(key) = var("SUPABASE_ANON_KEY") {
            config.supabase_anon_key = key;
        }
        if let Some(table) = var("GUESTS_TABLE") {
            config.guests_table = table;
        }
        config.public_origin = var("PUBLIC_ORIGIN");
        if let Some(addr) = var("BIND_ADDR") {
            config.bind_addr = addr
                .parse()
                .map_err(|e| Error::config(format!("BIND_ADDR {addr:?}: {e}")))?;
        }
        if let Some(secs) = var("REQUEST_TIMEOUT_SECS") {
            let secs: u64 = secs
                .parse()
                .map_err(|e| Error::config(format!("REQUEST_TIMEOUT_SECS {secs:?}: {e}")))?;
            config.request_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(minutes) = var("CONSOLE_IDLE_MINUTES") {
            let minutes: u64 = minutes
                .parse()
                .map_err(|e| Error::config(format!("CONSOLE_IDLE_MINUTES {minutes:?}: {e}")))?;
            config.console_idle_timeout = Duration::from_secs(minutes * 60);
        }
        if let Some(max) = var("MAX_CONSOLES") {
            config.max_consoles = max
                .parse()
                .map_err(|e| Error::config(format!("MAX_CONSOLES {max:?}: {e}")))?;
        }
        if let Some(title) = var("EVENT_TITLE") {
            config.event.title = title;
        }
        if let Some(date) = var("EVENT_DATE") {
            config.event.date = date;
        }
        if let Some(venue) = var("EVENT_VENUE") {
            config.event.venue = venue;
        }

        Ok(config)
    }

    /// Fail unless the Supabase endpoint and key are set
    pub fn require_backend(&self) -> Result<()> {
        if self.supabase_url.is_empty() {
            return Err(Error::config("SUPABASE_URL is not set"));
        }
        if self.supabase_anon_key.is_empty() {
            return Err(Error::config("SUPABASE_ANON_KEY is not set"));
        }
        url::Url::parse(&self.supabase_url)
            .map_err(|e| Error::config(format!("SUPABASE_URL: {e}")))?;
        Ok(())
    }

    pub fn with_supabase(mut self, url: &str, anon_key: &str) -> Self {
        self.supabase_url = url.to_string();
        self.supabase_anon_key = anon_key.to_string();
        self
    }

    pub fn with_guests_table(mut self, value: &str) -> Self {
        self.guests_table = value.to_string();
        self
    }

    pub fn with_public_origin(mut self, value: Option<&str>) -> Self {
        self.public_origin = value.map(str::to_string);
        self
    }

    pub fn with_bind_addr(mut self, value: SocketAddr) -> Self {
        self.bind_addr = value;
        self
    }

    pub fn with_request_timeout(mut self, value: Option<Duration>) -> Self {
        self.request_timeout = value;
        self
    }

    pub fn with_console_limits(mut self, idle_timeout: Duration, max_consoles: usize) -> Self {
        self.console_idle_timeout = idle_timeout;
        self.max_consoles = max_consoles;
        self
    }

    pub fn with_event(mut self, value: EventDetails) -> Self {
        self.event = value;
        self
    }
}
