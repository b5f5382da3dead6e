mod support;

use std::{
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use axum::{
    Router,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
    routing::get,
};
use parking_lot::Mutex;
use recipe_images::{
    Fetcher, HttpFetcher, ImageCache, ImageCacheConfig, ImageCacheError,
};
use support::png_bytes;
use tempfile::TempDir;
use tokio::net::TcpListener;

#[derive(Default)]
struct Origin {
    hits: AtomicUsize,
    last_agent: Mutex<Option<String>>,
}

async fn image(
    State(origin): State<Arc<Origin>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    origin.hits.fetch_add(1, Ordering::SeqCst);
    *origin.last_agent.lock() = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    ([(header::CONTENT_TYPE, "image/png")], png_bytes(24, 16))
}

async fn slow_image() -> impl IntoResponse {
    tokio::time::sleep(Duration::from_secs(5)).await;
    png_bytes(1, 1)
}

async fn spawn_origin() -> (SocketAddr, Arc<Origin>) {
    let origin = Arc::new(Origin::default());
    let app = Router::new()
        .route("/recipes/pasta.png", get(image))
        .route("/recipes/missing.png", get(|| async { StatusCode::NOT_FOUND }))
        .route(
            "/recipes/broken.png",
            get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        )
        .route("/recipes/empty.png", get(|| async { StatusCode::OK }))
        .route("/recipes/slow.png", get(slow_image))
        .with_state(origin.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, origin)
}

fn fetcher() -> HttpFetcher {
    HttpFetcher::new(&ImageCacheConfig::default()).unwrap()
}

#[tokio::test]
async fn success_returns_body_bytes() {
    let (addr, origin) = spawn_origin().await;

    let bytes = fetcher()
        .fetch(&format!("http://{addr}/recipes/pasta.png"))
        .await
        .unwrap();

    assert_eq!(bytes, png_bytes(24, 16));
    assert_eq!(origin.hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn sends_configured_user_agent() {
    let (addr, origin) = spawn_origin().await;
    let mut config = ImageCacheConfig::default();
    config.user_agent = "recipe-browser-tests/1".to_string();

    HttpFetcher::new(&config)
        .unwrap()
        .fetch(&format!("http://{addr}/recipes/pasta.png"))
        .await
        .unwrap();

    assert_eq!(
        origin.last_agent.lock().as_deref(),
        Some("recipe-browser-tests/1")
    );
}

#[tokio::test]
async fn non_success_status_is_reported() {
    let (addr, _origin) = spawn_origin().await;

    let missing = fetcher()
        .fetch(&format!("http://{addr}/recipes/missing.png"))
        .await
        .unwrap_err();
    let broken = fetcher()
        .fetch(&format!("http://{addr}/recipes/broken.png"))
        .await
        .unwrap_err();

    assert_eq!(missing, ImageCacheError::BadStatus(404));
    assert!(!missing.is_retryable());
    assert_eq!(broken, ImageCacheError::BadStatus(500));
    assert!(broken.is_retryable());
}

#[tokio::test]
async fn empty_body_is_invalid_data() {
    let (addr, _origin) = spawn_origin().await;

    let err = fetcher()
        .fetch(&format!("http://{addr}/recipes/empty.png"))
        .await
        .unwrap_err();

    assert!(matches!(err, ImageCacheError::InvalidData(_)));
}

#[tokio::test]
async fn refused_connection_is_transport_failure() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = fetcher()
        .fetch(&format!("http://{addr}/recipes/pasta.png"))
        .await
        .unwrap_err();

    assert!(matches!(err, ImageCacheError::TransportFailed(_)));
}

#[tokio::test]
async fn timeout_is_transport_failure() {
    let (addr, _origin) = spawn_origin().await;
    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(100))
        .build()
        .unwrap();

    let err = HttpFetcher::with_client(client)
        .fetch(&format!("http://{addr}/recipes/slow.png"))
        .await
        .unwrap_err();

    assert!(matches!(err, ImageCacheError::TransportFailed(_)));
}

#[tokio::test]
async fn empty_identifier_is_invalid() {
    let err = fetcher().fetch("").await.unwrap_err();
    assert!(matches!(err, ImageCacheError::InvalidIdentifier(_)));
}

#[tokio::test]
async fn cache_over_http_fetches_once() {
    let (addr, origin) = spawn_origin().await;
    let dir = TempDir::new().unwrap();
    let config = ImageCacheConfig::default()
        .with_cache_dir(dir.path().join("ImageCache"));
    let cache = ImageCache::open(&config).await.unwrap();
    let url = format!("http://{addr}/recipes/pasta.png");

    let first = cache.get_image(&url).await.unwrap();
    cache.memory().clear();
    let second = cache.get_image(&url).await.unwrap();

    assert_eq!((first.width(), first.height()), (24, 16));
    assert_eq!((second.width(), second.height()), (24, 16));
    assert_eq!(origin.hits.load(Ordering::SeqCst), 1);
    assert!(cache.cache_file_path(&url).is_file());
}
