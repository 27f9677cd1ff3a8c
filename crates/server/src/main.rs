//! Matchdeck Server
//!
//! Axum server exposing the scan flow, the results page and shared views,
//! plus CLI subcommands that run the same flow without a server.

mod api;

use axum::{
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use clap::{Parser, Subcommand};
use std::{env, net::SocketAddr, path::PathBuf, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use utoipa::OpenApi;

use matchdeck_core::results::ResultPage;
use matchdeck_core::scan::ScanOrchestrator;
use matchdeck_core::state::{MatchDb, PayloadStore, ShareManager, SharedEntity};
use matchdeck_core::config::CONFIG_PATH;
use matchdeck_core::{Backends, MatchdeckConfig};

/// Reads `MATCHDECK_*` overrides; the process environment outside tests
pub type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Application state
pub struct AppState {
    pub config: MatchdeckConfig,
    /// Where `PATCH /config` persists changes
    pub config_path: PathBuf,
    pub env_lookup: EnvLookup,
    pub backends: Backends,
    pub orchestrator: ScanOrchestrator,
    /// Local store, written by `PUT /results/{id}` in either backend mode
    pub payloads: PayloadStore,
    pub shares: ShareManager,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(config: MatchdeckConfig, db: &MatchDb) -> anyhow::Result<Self> {
        let backends = Backends::from_config(&config, db)?;
        let orchestrator = ScanOrchestrator::new(Arc::clone(&backends.resolver))
            .with_phase_scale(config.phase_scale);

        Ok(Self {
            payloads: PayloadStore::new(db),
            shares: ShareManager::new(db),
            orchestrator,
            backends,
            config,
            config_path: PathBuf::from(CONFIG_PATH),
            env_lookup: Arc::new(|key: &str| env::var(key).ok()),
        })
    }

    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = path.into();
        self
    }

    pub fn with_env_lookup(mut self, lookup: EnvLookup) -> Self {
        self.env_lookup = lookup;
        self
    }
}

#[derive(Parser, Clone, Debug)]
#[command(author, version, about = "Matchdeck - startup scan and investor match results")]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Shorthand for --log-level debug
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Subcommand, Clone, Debug)]
enum CliCommand {
    /// Start the Matchdeck server (default)
    Serve {
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Scan a startup URL and print the navigation decision
    Scan {
        /// The URL to scan
        url: String,
    },
    /// Load the results page for a URL and print its state
    Results {
        url: String,
    },
    /// Share a list of entities read from a JSON file
    Share {
        /// Display name of the shared list
        name: String,
        /// JSON array of {id, name, firm?, note?}
        entities: PathBuf,
    },
}

// === OpenAPI ===

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Matchdeck API",
        version = "1.0.0",
        description = "Startup scan, investor match results and shared views"
    ),
    paths(
        api::config::get_config,
        api::config::update_config,
        api::scan::start_scan,
        api::scan::scan_stream,
        api::results::get_results,
        api::results::put_results,
        api::share::create_share,
        api::share::get_share,
        api::share::add_comment
    ),
    components(
        schemas(
            api::ErrorResponse,
            api::config::ConfigResponse,
            api::scan::ScanRequest,
            api::scan::ScanResponse,
            api::results::ResultsResponse,
            api::results::StoredResponse,
            api::share::CreateShareRequest,
            api::share::CommentRequest
        )
    ),
    tags(
        (name = "config", description = "Configuration management"),
        (name = "scan", description = "Scan activations"),
        (name = "results", description = "Results page"),
        (name = "share", description = "Shared views")
    )
)]
struct ApiDoc;

async fn serve_openapi() -> impl IntoResponse {
    let doc = ApiDoc::openapi().to_json().unwrap_or_default();
    ([(header::CONTENT_TYPE, "application/json")], doc)
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not Found")
}

pub fn app(state: SharedState) -> Router {
    Router::new()
        .nest(
            "/api/v1",
            api::routes().route("/openapi.json", get(serve_openapi)),
        )
        .fallback(not_found)
        .with_state(state)
}

// === Logging ===

fn init_logging(args: &Args) {
    use std::sync::Once;
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let level = match &args.log_level {
            Some(level) => level.to_lowercase(),
            None if args.verbose => "debug".to_string(),
            None => env::var("MATCHDECK_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        };

        let mut filter = EnvFilter::from_default_env();

        if env::var("RUST_LOG").is_err() {
            for directive in [
                format!("matchdeck={}", level),
                format!("matchdeck_core={}", level),
                format!("matchdeck_server={}", level),
                "hyper=warn".to_string(),
                "reqwest=warn".to_string(),
            ] {
                match directive.parse() {
                    Ok(directive) => filter = filter.add_directive(directive),
                    Err(_) => eprintln!("Invalid log directive '{}', skipping", directive),
                }
            }
        }

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    });
}

// === Entry ===

async fn run_server(state: SharedState, port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    tracing::info!("Matchdeck server running at http://{}", addr);
    tracing::info!("Backend: {:?}", state.config.backend);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app(state)).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::from_path(".matchdeck/.env");
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    init_logging(&args);

    let config = MatchdeckConfig::load().await;
    config.validate()?;
    let db = MatchDb::open_at(&config.db_path)?;
    let state: SharedState = Arc::new(AppState::new(config, &db)?);

    match args.command.unwrap_or(CliCommand::Serve { port: None }) {
        CliCommand::Serve { port } => {
            let port = port.unwrap_or(state.config.port);
            run_server(state, port).await?;
        }
        CliCommand::Scan { url } => {
            let decision = state.orchestrator.run(&url).await?;
            println!("{}", serde_json::to_string_pretty(&decision)?);
            println!("Navigate to: {}", decision.destination.to_path());
        }
        CliCommand::Results { url } => {
            let mut page = ResultPage::new();
            let page_state = page.load(state.backends.fetcher.as_ref(), &url).await?;
            println!("{}", serde_json::to_string_pretty(page_state)?);
        }
        CliCommand::Share { name, entities } => {
            let raw = tokio::fs::read_to_string(&entities).await?;
            let entities: Vec<SharedEntity> = serde_json::from_str(&raw)?;
            let list = state.shares.create(&name, &entities)?;
            println!("Shared '{}' as /share/{}", list.display_name, list.token);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn test_app() -> Router {
        let db = MatchDb::open_in_memory().unwrap();
        let config = MatchdeckConfig {
            phase_scale: 0.0,
            ..MatchdeckConfig::default()
        };
        app(Arc::new(AppState::new(config, &db).unwrap()))
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, String) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(body) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(body.to_string())
            }
            None => Body::empty(),
        };
        let response = app
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    fn contract_json() -> Value {
        json!({
            "top5": [
                {"investor": {"id": "inv_1", "name": "Ada Ventures"}, "signal": 91.0, "fit": "strong"},
                {"investor": {"id": "inv_2", "name": "Northwind"}, "signal": 72.0, "fit": "good"}
            ],
            "misaligned": [
                {"investor": {"id": "inv_9", "name": "Legacy Partners"}, "signal": 20.0, "fit": "weak"}
            ]
        })
    }

    #[tokio::test]
    async fn test_scan_rejects_invalid_url() {
        let app = test_app();
        let (status, body) = send(&app, "POST", "/api/v1/scan", Some(json!({"url": "   "}))).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body.contains("Please enter a startup URL"));
    }

    #[tokio::test]
    async fn test_scan_then_results_round_trip() {
        let app = test_app();

        let (status, body) = send(&app, "POST", "/api/v1/scan", Some(json!({"url": "www.Acme.io"}))).await;
        assert_eq!(status, StatusCode::OK);
        let scan: Value = serde_json::from_str(&body).unwrap();
        let startup_id = scan["outcome"]["startup_id"].as_str().unwrap().to_string();
        let navigate_to = scan["navigateTo"].as_str().unwrap().to_string();
        assert!(navigate_to.starts_with("/results?url=www.Acme.io&startupId="));

        // Nothing stored yet
        let query = navigate_to.trim_start_matches("/results");
        let (status, body) = send(&app, "GET", &format!("/api/v1/results{}", query), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(serde_json::from_str::<Value>(&body).unwrap()["status"], "not_found");

        let (status, _) = send(
            &app,
            "PUT",
            &format!("/api/v1/results/{}", startup_id),
            Some(contract_json()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = send(&app, "GET", &format!("/api/v1/results{}", query), None).await;
        let page: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(page["status"], "live");
        assert_eq!(page["page"]["row_count"], 3);
        let kinds: Vec<&str> = page["page"]["sections"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|s| s["kind"].as_str())
            .collect();
        assert_eq!(kinds, vec!["top_matches", "misaligned"]);
    }

    #[tokio::test]
    async fn test_results_by_url_and_degraded_destination() {
        let app = test_app();

        let (_, body) = send(
            &app,
            "GET",
            "/api/v1/results?url=nobody.dev&reason=scan_failed&error=backend%20down",
            None,
        )
        .await;
        let page: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(page["status"], "not_found");
        assert_eq!(page["scanWarning"], "backend down");

        let (status, _) = send(&app, "GET", "/api/v1/results", None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_put_results_rejects_malformed_contract() {
        let app = test_app();
        let (status, _) = send(
            &app,
            "PUT",
            "/api/v1/results/st_1",
            Some(json!({"top5": []})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_scan_stream_ends_with_decision() {
        let app = test_app();

        let (status, body) = send(&app, "GET", "/api/v1/scan/stream?url=acme.io", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("scan_started"));
        assert!(body.contains("navigation_decided"));
        assert!(!body.contains("torn_down"));

        let (status, _) = send(&app, "GET", "/api/v1/scan/stream?url=%2Fpath-only", None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_share_lifecycle() {
        let app = test_app();

        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/share",
            Some(json!({
                "displayName": "Seed shortlist",
                "entities": [{"id": "inv_1", "name": "Ada Ventures"}]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let token = serde_json::from_str::<Value>(&body).unwrap()["token"]
            .as_str()
            .unwrap()
            .to_string();

        let (status, _) = send(
            &app,
            "POST",
            &format!("/api/v1/share/{}/comments", token),
            Some(json!({"author": "Sam", "body": "Looks right"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = send(&app, "GET", &format!("/api/v1/share/{}", token), None).await;
        assert_eq!(status, StatusCode::OK);
        let list: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(list["comments"][0]["body"], "Looks right");

        let (status, _) = send(&app, "GET", "/api/v1/share/abcdef0123456789", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(
            &app,
            "POST",
            &format!("/api/v1/share/{}/comments", token),
            Some(json!({"body": "  "})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn config_app(path: &std::path::Path, lookup: EnvLookup) -> Router {
        let db = MatchDb::open_in_memory().unwrap();
        let state = AppState::new(MatchdeckConfig::default(), &db)
            .unwrap()
            .with_config_path(path)
            .with_env_lookup(lookup);
        app(Arc::new(state))
    }

    #[tokio::test]
    async fn test_config_patch_persists_and_validates() {
        let dir = std::env::temp_dir().join(format!("matchdeck-server-{}", unique_suffix()));
        let path = dir.join("config.json");
        let app = config_app(&path, Arc::new(no_env));

        let (status, body) = send(&app, "PATCH", "/api/v1/config", Some(json!({"port": 9999}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(serde_json::from_str::<Value>(&body).unwrap()["config"]["port"], 9999);
        let saved = MatchdeckConfig::load_from(&path).await;
        assert_eq!(saved.port, 9999);

        // Running config is unchanged until restart
        let (_, body) = send(&app, "GET", "/api/v1/config", None).await;
        assert_eq!(serde_json::from_str::<Value>(&body).unwrap()["config"]["port"], 8080);

        let (status, _) = send(&app, "PATCH", "/api/v1/config", Some(json!({"backend": "remote"}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = send(&app, "PATCH", "/api/v1/config", Some(json!({"phase_scale": 1e30}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_config_patch_validates_with_env_overrides() {
        let dir = std::env::temp_dir().join(format!("matchdeck-server-env-{}", unique_suffix()));
        let path = dir.join("config.json");
        let lookup: EnvLookup = Arc::new(|key: &str| {
            (key == "MATCHDECK_REMOTE_URL").then(|| "https://api.example.com".to_string())
        });
        let app = config_app(&path, lookup);

        let (status, _) = send(&app, "PATCH", "/api/v1/config", Some(json!({"backend": "remote"}))).await;
        assert_eq!(status, StatusCode::OK);

        // The override is not written back
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(!written.contains("api.example.com"));
        assert_eq!(
            MatchdeckConfig::load_from(&path).await.backend,
            matchdeck_core::config::BackendMode::Remote
        );

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_config_patch_keeps_unparseable_file() {
        let dir = std::env::temp_dir().join(format!("matchdeck-server-bad-{}", unique_suffix()));
        let path = dir.join("config.json");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(&path, "{ \"port\": 70").unwrap();
        let app = config_app(&path, Arc::new(no_env));

        let (status, body) = send(&app, "PATCH", "/api/v1/config", Some(json!({"port": 9999}))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body.contains("not valid JSON"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ \"port\": 70");

        let _ = std::fs::remove_dir_all(dir);
    }

    fn unique_suffix() -> u128 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_openapi_lists_routes() {
        let app = test_app();
        let (status, body) = send(&app, "GET", "/api/v1/openapi.json", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("/api/v1/scan/stream"));
        assert!(body.contains("/api/v1/share/{token}/comments"));
        assert!(body.contains("/api/v1/config"));
    }
}
