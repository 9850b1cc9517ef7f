use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use table_finder::backend::{BackendCall, MemoryBackend};
use table_finder::config::AppConfig;
use table_finder::web::{build_router, AppState, CONSOLE_COOKIE};
use table_finder::TableFinder;

fn state(backend: &MemoryBackend) -> AppState {
    let app = TableFinder::with_memory_backend(AppConfig::default(), backend.clone()).unwrap();
    AppState::new(app)
}

fn router(backend: &MemoryBackend) -> Router {
    build_router(state(backend))
}

struct Page {
    status: StatusCode,
    location: Option<String>,
    cookie: Option<String>,
    body: String,
}

async fn send(router: &Router, request: Request<Body>) -> Page {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let location = response
        .headers()
        .get(header::LOCATION)
        .map(|v| v.to_str().unwrap().to_string());
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .map(|v| v.to_str().unwrap().split(';').next().unwrap().to_string());
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();

    Page {
        status,
        location,
        cookie,
        body: String::from_utf8_lossy(&body).to_string(),
    }
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn post(uri: &str, cookie: Option<&str>, form: &str) -> Request<Body> {
    let mut builder = Request::post(uri).header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(form.to_string())).unwrap()
}

#[tokio::test]
async fn test_landing_and_health() {
    let router = router(&MemoryBackend::new());

    let page = send(&router, get("/", None)).await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("Espace Mariés"));
    assert!(page.body.contains("Genèse 2:24"));

    let page = send(&router, get("/healthz", None)).await;
    assert_eq!(page.status, StatusCode::OK);

    let page = send(&router, get("/nowhere", None)).await;
    assert_eq!(page.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_lookup_page() {
    let backend = MemoryBackend::new();
    backend.seed_guest("Dupont", "Jean", Some(7));
    let router = router(&backend);

    let page = send(&router, post("/invites", None, "surname=dupont&given_name=JEAN")).await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("Jean Dupont"));
    assert!(page.body.contains("Table 7"));

    let page = send(&router, post("/invites", None, "surname=&given_name=Jean")).await;
    assert!(page.body.contains("Veuillez remplir le nom et le prénom."));
    assert_eq!(backend.calls().len(), 1);
}

#[tokio::test]
async fn test_organizer_flow() {
    let backend = MemoryBackend::new().with_account("maries@example.com", "secret123");
    let router = router(&backend);

    let page = send(&router, get("/maries", None)).await;
    assert!(page.body.contains("Connexion"));
    assert!(page.cookie.is_none());

    let page = send(
        &router,
        post("/maries/login", None, "email=maries%40example.com&password=wrongpass"),
    )
    .await;
    assert_eq!(page.status, StatusCode::SEE_OTHER);
    assert_eq!(page.location.as_deref(), Some("/maries"));
    let cookie = page.cookie.expect("console cookie");
    assert!(cookie.starts_with(CONSOLE_COOKIE));
    let cookie = Some(cookie.as_str());

    let page = send(&router, get("/maries", cookie)).await;
    assert!(page.body.contains("Email ou mot de passe incorrect."));

    send(
        &router,
        post("/maries/login", cookie, "email=maries%40example.com&password=secret123"),
    )
    .await;
    let page = send(&router, get("/maries", cookie)).await;
    assert!(page.body.contains("0 invité(s) enregistré(s)"));

    send(&router, post("/maries/guests/new", cookie, "")).await;
    send(
        &router,
        post("/maries/guests", cookie, "surname=Mba&given_name=Paul&table_number=5"),
    )
    .await;
    let page = send(&router, get("/maries", cookie)).await;
    assert!(page.body.contains("Paul Mba"));
    assert!(page.body.contains("Table : 5"));

    let id = backend.guests()[0].id.to_string();
    send(&router, post(&format!("/maries/guests/{id}/delete"), cookie, "")).await;
    let page = send(&router, get("/maries", cookie)).await;
    assert!(page.body.contains("Êtes-vous sûr de vouloir supprimer cet invité ?"));

    send(&router, post("/maries/guests/delete/confirm", cookie, "confirm=non")).await;
    assert!(!backend
        .calls()
        .iter()
        .any(|c| matches!(c, BackendCall::DeleteGuest(_))));

    send(&router, post(&format!("/maries/guests/{id}/delete"), cookie, "")).await;
    send(&router, post("/maries/guests/delete/confirm", cookie, "confirm=oui")).await;
    assert!(backend.guests().is_empty());

    send(&router, post("/maries/logout", cookie, "")).await;
    let page = send(&router, get("/maries", cookie)).await;
    assert!(page.body.contains("Connexion"));
}

#[tokio::test]
async fn test_browsers_get_separate_sessions() {
    let backend = MemoryBackend::new().with_account("maries@example.com", "secret123");
    let router = router(&backend);

    let first = send(
        &router,
        post("/maries/login", None, "email=maries%40example.com&password=secret123"),
    )
    .await
    .cookie
    .unwrap();
    let page = send(&router, get("/maries", Some(&first))).await;
    assert!(page.body.contains("0 invité(s) enregistré(s)"));

    let page = send(&router, get("/maries", None)).await;
    assert!(page.body.contains("Connexion"));
    assert!(!page.body.contains("invité(s) enregistré(s)"));
}

#[tokio::test]
async fn test_cookie_less_visits_open_no_console() {
    let state = state(&MemoryBackend::new());
    let router = build_router(state.clone());

    for _ in 0..100 {
        let page = send(&router, get("/maries", None)).await;
        assert!(page.body.contains("Connexion"));
        assert!(page.cookie.is_none());
    }
    let page = send(&router, post("/maries/guests/new", None, "")).await;
    assert_eq!(page.location.as_deref(), Some("/maries"));

    assert_eq!(state.consoles.count().await, 0);
}

#[tokio::test]
async fn test_busy_redirect_explains_the_dropped_action() {
    let router = router(&MemoryBackend::new());

    let page = send(&router, get("/maries?busy=true", None)).await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("Une action est déjà en cours."));
}
