//! Organizer consoles, one per browser
//!
//! A console is an [`OrganizerArea`] with its own auth session, found again
//! through the `tf_console` cookie. Only browsers that post to the organizer
//! area get one. Consoles left idle are dropped, and the map never holds more
//! than its capacity: the least recently used console makes room.
//!
//! Actions on a console are exclusive: one arriving while another is still
//! running is dropped, which is the server side of a disabled submit button.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use super::error::AppError;
use crate::config::AppConfig;
use crate::views::OrganizerArea;
use crate::TableFinder;

pub const CONSOLE_COOKIE: &str = "tf_console";

pub type Console = Arc<Mutex<OrganizerArea>>;

struct Entry {
    console: Console,
    last_used: Instant,
}

#[derive(Clone)]
pub struct Consoles {
    inner: Arc<Mutex<HashMap<Uuid, Entry>>>,
    idle_timeout: Duration,
    capacity: usize,
}

impl Consoles {
    pub fn new(idle_timeout: Duration, capacity: usize) -> Self {
        Self {
            inner: Arc::default(),
            idle_timeout,
            capacity: capacity.max(1),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.console_idle_timeout, config.max_consoles)
    }

    fn cookie_id(jar: &CookieJar) -> Option<Uuid> {
        jar.get(CONSOLE_COOKIE)
            .and_then(|c| Uuid::parse_str(c.value()).ok())
    }

    fn is_idle(&self, entry: &Entry) -> bool {
        entry.last_used.elapsed() >= self.idle_timeout
    }

    /// The live console named by the cookie, if any. Never creates one.
    pub async fn find(&self, jar: &CookieJar) -> Option<Console> {
        let id = Self::cookie_id(jar)?;
        let mut consoles = self.inner.lock().await;
        let entry = consoles.get_mut(&id)?;
        if self.is_idle(entry) {
            consoles.remove(&id);
            info!(console = %id, "organizer console expired");
            return None;
        }
        entry.last_used = Instant::now();
        Some(entry.console.clone())
    }

    /// The console named by the cookie, or a new one with a cookie to match
    pub async fn open(&self, jar: CookieJar, app: &TableFinder) -> (CookieJar, Console) {
        if let Some(console) = self.find(&jar).await {
            return (jar, console);
        }

        let id = Uuid::new_v4();
        let console = Arc::new(Mutex::new(app.open_console()));
        {
            let mut consoles = self.inner.lock().await;
            self.remove_idle(&mut consoles);
            while consoles.len() >= self.capacity {
                let Some(oldest) = consoles
                    .iter()
                    .min_by_key(|(_, entry)| entry.last_used)
                    .map(|(id, _)| *id)
                else {
                    break;
                };
                consoles.remove(&oldest);
                info!(console = %oldest, "organizer console evicted");
            }
            consoles.insert(
                id,
                Entry {
                    console: console.clone(),
                    last_used: Instant::now(),
                },
            );
        }
        info!(console = %id, "opening organizer console");

        let cookie = Cookie::build((CONSOLE_COOKIE, id.to_string()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax);
        (jar.add(cookie), console)
    }

    fn remove_idle(&self, consoles: &mut HashMap<Uuid, Entry>) -> usize {
        let before = consoles.len();
        consoles.retain(|_, entry| !self.is_idle(entry));
        before - consoles.len()
    }

    /// Drop every idle console. Returns how many went.
    pub async fn sweep(&self) -> usize {
        let removed = self.remove_idle(&mut *self.inner.lock().await);
        if removed > 0 {
            info!(removed, "idle organizer consoles dropped");
        }
        removed
    }

    /// Sweep every `period` until the returned task is aborted
    pub fn spawn_sweeper(&self, period: Duration) -> JoinHandle<()> {
        let consoles = self.clone();
        tokio::spawn(async move {
            let mut ticks = tokio::time::interval(period);
            loop {
                ticks.tick().await;
                consoles.sweep().await;
            }
        })
    }

    pub async fn count(&self) -> usize {
        self.inner.lock().await.len()
    }
}

/// Run `action` on the console unless another action holds it. The action
/// runs in its own task, so a dropped request cannot stop a write halfway.
/// Returns `None` when the console was busy.
pub async fn run_exclusive<F, Fut, T>(console: &Console, action: F) -> Result<Option<T>, AppError>
where
    F: FnOnce(OwnedMutexGuard<OrganizerArea>) -> Fut,
    Fut: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let Ok(guard) = console.clone().try_lock_owned() else {
        debug!("console busy, action dropped");
        return Ok(None);
    };
    let value = tokio::spawn(action(guard)).await?;
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;

    fn app() -> TableFinder {
        TableFinder::with_memory_backend(AppConfig::default(), MemoryBackend::new()).unwrap()
    }

    fn consoles() -> Consoles {
        Consoles::from_config(&AppConfig::default())
    }

    #[tokio::test]
    async fn cookie_finds_the_same_console() {
        let app = app();
        let consoles = consoles();

        let (jar, first) = consoles.open(CookieJar::new(), &app).await;
        assert!(jar.get(CONSOLE_COOKIE).is_some());

        let (_, again) = consoles.open(jar, &app).await;
        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(consoles.count().await, 1);
    }

    #[tokio::test]
    async fn unknown_cookie_gets_a_new_console() {
        let app = app();
        let consoles = consoles();
        let jar = CookieJar::new().add(Cookie::new(CONSOLE_COOKIE, "not-a-uuid"));

        let (jar, _) = consoles.open(jar, &app).await;
        let value = jar.get(CONSOLE_COOKIE).map(|c| c.value().to_string()).unwrap();
        assert!(Uuid::parse_str(&value).is_ok());
    }

    #[tokio::test]
    async fn lookups_without_a_cookie_store_nothing() {
        let consoles = consoles();
        for _ in 0..1000 {
            assert!(consoles.find(&CookieJar::new()).await.is_none());
        }
        assert_eq!(consoles.count().await, 0);
    }

    #[tokio::test]
    async fn cookie_less_opens_stay_within_capacity() {
        let app = app();
        let consoles = Consoles::new(Duration::from_secs(600), 8);
        for _ in 0..1000 {
            consoles.open(CookieJar::new(), &app).await;
        }
        assert_eq!(consoles.count().await, 8);
    }

    #[tokio::test]
    async fn full_map_evicts_the_least_recently_used() {
        let app = app();
        let consoles = Consoles::new(Duration::from_secs(600), 2);

        let (first, _) = consoles.open(CookieJar::new(), &app).await;
        let (second, _) = consoles.open(CookieJar::new(), &app).await;
        assert!(consoles.find(&first).await.is_some());

        consoles.open(CookieJar::new(), &app).await;
        assert_eq!(consoles.count().await, 2);
        assert!(consoles.find(&second).await.is_none());
        assert!(consoles.find(&first).await.is_some());
    }

    #[tokio::test]
    async fn idle_consoles_expire() {
        let app = app();
        let consoles = Consoles::new(Duration::ZERO, 8);

        let (jar, _) = consoles.open(CookieJar::new(), &app).await;
        consoles.open(CookieJar::new(), &app).await;
        assert_eq!(consoles.sweep().await, 1);
        assert!(consoles.find(&jar).await.is_none());
        assert_eq!(consoles.count().await, 0);
    }

    #[tokio::test]
    async fn busy_console_drops_the_action() {
        let app = app();
        let consoles = consoles();
        let (_, console) = consoles.open(CookieJar::new(), &app).await;

        let held = console.clone().lock_owned().await;
        let ran = run_exclusive(&console, |_area| async {}).await.unwrap();
        assert!(ran.is_none());

        drop(held);
        let ran = run_exclusive(&console, |_area| async { 7 }).await.unwrap();
        assert_eq!(ran, Some(7));
    }
}
