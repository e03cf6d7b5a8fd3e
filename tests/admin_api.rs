//! Service tests: admin API, backend client and tick loop against a fake
//! ranch backend.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use herdsim::config::UpstreamConfig;
use herdsim::simulation::Simulator;
use herdsim::upstream::RanchClient;
use herdsim::web::{router, AppState};
use herdsim::{CattleRegistry, GeoPoint, HerdConfig, HerdEngine, Pasture};
use serde_json::{json, Value};
use tokio::sync::Mutex;

#[derive(Default)]
struct Backend {
    pushes: Mutex<Vec<Value>>,
    push_delay: Duration,
    fail_pushes: bool,
}

async fn ranch_config() -> Json<Value> {
    Json(json!({
        "ranchCenter": {"lat": 40.0, "lon": -105.0},
        "fence": {"coordinates": [[-105.05, 39.95], [-104.95, 39.95], [-104.95, 40.05], [-105.05, 40.05]]}
    }))
}

async fn herd_config() -> Json<Value> {
    Json(json!({"config": {"totalCattleCount": 30, "strayPercentage": 20}}))
}

async fn ingest(State(backend): State<Arc<Backend>>, Json(body): Json<Value>) -> StatusCode {
    tokio::time::sleep(backend.push_delay).await;
    if backend.fail_pushes {
        return StatusCode::INTERNAL_SERVER_ERROR;
    }
    backend.pushes.lock().await.push(body);
    StatusCode::OK
}

async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn spawn_backend(backend: Arc<Backend>) -> SocketAddr {
    let app = Router::new()
        .route("/api/config", get(ranch_config))
        .route("/api/simulator/herd/config", get(herd_config))
        .route("/api/herd", post(ingest))
        .with_state(backend);
    serve(app).await
}

fn client_for(addr: SocketAddr) -> RanchClient {
    RanchClient::new(&UpstreamConfig {
        base_url: format!("http://{}", addr),
        timeout_ms: 2_000,
    })
}

fn simulator(client: RanchClient, interval: Duration) -> Arc<Simulator<RanchClient>> {
    let engine = HerdEngine::new_with_seed(
        HerdConfig::default(),
        Pasture::default(),
        CattleRegistry::default(),
        2024,
    );
    Arc::new(Simulator::new(engine, client, interval))
}

async fn spawn_admin(sim: Arc<Simulator<RanchClient>>) -> String {
    let state = Arc::new(AppState::new(sim));
    let addr = serve(router(state)).await;
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_client_reads_pasture_and_herd_config() {
    let addr = spawn_backend(Arc::new(Backend::default())).await;
    let client = client_for(addr);

    let pasture = client.fetch_pasture().await.unwrap();
    assert_eq!(pasture.center, GeoPoint::new(40.0, -105.0));
    assert!(pasture.fence.unwrap().contains(&GeoPoint::new(40.0, -105.0)));

    let patch = client.fetch_herd_config().await.unwrap();
    let merged = HerdConfig::default().merged(&patch).unwrap();
    assert_eq!(merged.total_cattle_count, 30);
    assert_eq!(merged.stray_percentage, 20.0);
}

#[tokio::test]
async fn test_unreachable_backend_falls_back_to_defaults() {
    // Bind then drop to get a port nothing listens on
    let addr = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .unwrap()
        .local_addr()
        .unwrap();
    let client = client_for(addr);

    assert!(client.fetch_pasture().await.is_err());
    let pasture = client.load_pasture_or_default().await;
    assert_eq!(pasture.center, Pasture::default().center);
    assert!(pasture.fence.is_none());
}

#[tokio::test]
async fn test_tick_pushes_herd_to_backend() {
    let backend = Arc::new(Backend::default());
    let addr = spawn_backend(Arc::clone(&backend)).await;
    let sim = simulator(client_for(addr), Duration::from_secs(60));

    sim.tick_once().await;

    let pushes = backend.pushes.lock().await;
    assert_eq!(pushes.len(), 1);
    let body = &pushes[0];
    assert_eq!(body["herd"].as_array().unwrap().len(), 50);
    assert_eq!(body["positions"].as_array().unwrap().len(), 50);
    assert_eq!(body["cattle"].as_array().unwrap().len(), 50);
    assert_eq!(body["cattle"][0]["id"], body["herd"][0]["id"]);
    assert!(body["herd"][0]["isStray"].is_boolean());
    assert!(body["herd"][0]["earTag"].is_string());
    assert_eq!(body["config"]["totalCattleCount"], 50);
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_failed_push_still_advances_herd() {
    let backend = Arc::new(Backend {
        fail_pushes: true,
        ..Default::default()
    });
    let addr = spawn_backend(Arc::clone(&backend)).await;
    let sim = simulator(client_for(addr), Duration::from_millis(10));

    let before = sim.with_engine(|e| e.herd().iter().map(|a| a.position).collect::<Vec<_>>()).await;
    assert!(sim.start().await);
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(sim.is_running().await);
    sim.stop().await;

    let (ticks, after) = sim
        .with_engine(|e| (e.tick_count(), e.herd().iter().map(|a| a.position).collect::<Vec<_>>()))
        .await;
    assert!(ticks >= 2);
    assert_ne!(before, after);
    assert!(backend.pushes.lock().await.is_empty());
}

#[tokio::test]
async fn test_reset_waits_for_slow_push() {
    let backend = Arc::new(Backend {
        push_delay: Duration::from_millis(300),
        ..Default::default()
    });
    let addr = spawn_backend(Arc::clone(&backend)).await;
    let sim = simulator(client_for(addr), Duration::from_secs(60));
    let admin = spawn_admin(Arc::clone(&sim)).await;

    let ticking = {
        let sim = Arc::clone(&sim);
        tokio::spawn(async move { sim.tick_once().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let started = Instant::now();
    let response = reqwest::Client::new()
        .post(format!("{admin}/reset"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert!(started.elapsed() >= Duration::from_millis(150));
    assert_eq!(backend.pushes.lock().await.len(), 1);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["cattleCount"], 50);
    assert_eq!(body["strayCount"], 5);
    ticking.await.unwrap();
}

#[tokio::test]
async fn test_config_endpoints() {
    let sim = simulator(client_for("127.0.0.1:9".parse().unwrap()), Duration::from_secs(60));
    let admin = spawn_admin(Arc::clone(&sim)).await;
    let http = reqwest::Client::new();

    let config: Value = http.get(format!("{admin}/config")).send().await.unwrap().json().await.unwrap();
    assert_eq!(config["herdCohesion"], 0.1);

    // Out of range: rejected as a whole
    let response = http
        .post(format!("{admin}/config"))
        .json(&json!({"herdCohesion": 1.5, "movementSpeed": 0.001}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("herdCohesion"));
    assert_eq!(sim.config().await, HerdConfig::default());

    // Negative percentage
    let response = http
        .post(format!("{admin}/config"))
        .json(&json!({"strayPercentage": -5}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    // Not JSON at all
    let response = http
        .post(format!("{admin}/config"))
        .header("content-type", "application/json")
        .body("cows")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    // Valid partial update
    let response = http
        .post(format!("{admin}/config"))
        .json(&json!({"strayPercentage": 20, "clusterRadius": 0.02}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["config"]["strayPercentage"], 20.0);
    assert_eq!(body["config"]["clusterRadius"], 0.02);
    assert_eq!(body["config"]["herdCohesion"], 0.1);
    assert!(body["message"].is_string());

    let reset: Value = http.post(format!("{admin}/reset")).send().await.unwrap().json().await.unwrap();
    assert_eq!(reset["strayCount"], 10);
}

#[tokio::test]
async fn test_start_stop_and_inspection() {
    let backend = Arc::new(Backend::default());
    let addr = spawn_backend(Arc::clone(&backend)).await;
    let sim = simulator(client_for(addr), Duration::from_millis(20));
    let admin = spawn_admin(Arc::clone(&sim)).await;
    let http = reqwest::Client::new();

    let stats: Value = http.get(format!("{admin}/stats")).send().await.unwrap().json().await.unwrap();
    assert_eq!(stats["isRunning"], false);
    assert_eq!(stats["totalCattle"], 50);
    assert_eq!(stats["designatedStrayCount"], 5);
    assert_eq!(stats["mainHerdCount"], 45);

    let started: Value = http.post(format!("{admin}/start")).send().await.unwrap().json().await.unwrap();
    assert_eq!(started["success"], true);
    let again: Value = http.post(format!("{admin}/start")).send().await.unwrap().json().await.unwrap();
    assert_eq!(again["success"], false);

    tokio::time::sleep(Duration::from_millis(120)).await;

    let health: Value = http.get(format!("{admin}/health")).send().await.unwrap().json().await.unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["isRunning"], true);
    assert_eq!(health["cattleCount"], 50);
    assert_eq!(health["updateIntervalMs"], 20);
    assert_eq!(health["ranchOsUrl"], format!("http://{}", addr));

    let stopped: Value = http.post(format!("{admin}/stop")).send().await.unwrap().json().await.unwrap();
    assert_eq!(stopped["success"], true);
    let again: Value = http.post(format!("{admin}/stop")).send().await.unwrap().json().await.unwrap();
    assert_eq!(again["success"], false);

    let stats: Value = http.get(format!("{admin}/stats")).send().await.unwrap().json().await.unwrap();
    assert_eq!(stats["isRunning"], false);
    assert!(stats["tick"].as_u64().unwrap() >= 2);
    assert!(!backend.pushes.lock().await.is_empty());

    let herd: Value = http.get(format!("{admin}/herd")).send().await.unwrap().json().await.unwrap();
    assert_eq!(herd["herd"].as_array().unwrap().len(), 50);
    assert_eq!(herd["stats"]["tick"], stats["tick"]);
    assert!(herd["config"]["movementLimit"].is_number());

    let strays: Value = http.get(format!("{admin}/strays")).send().await.unwrap().json().await.unwrap();
    let alerts = strays["alerts"].as_array().unwrap();
    let away = herd["herd"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|c| c["isStray"] == true)
        .count();
    assert_eq!(alerts.len(), away);
}

#[tokio::test]
async fn test_boundary_reload() {
    let addr = spawn_backend(Arc::new(Backend::default())).await;
    let sim = simulator(client_for(addr), Duration::from_secs(60));
    let admin = spawn_admin(Arc::clone(&sim)).await;
    let http = reqwest::Client::new();
    assert!(sim.with_engine(|e| e.pasture().fence.is_none()).await);

    let response = http.post(format!("{admin}/boundary/reload")).send().await.unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["fenced"], true);
    assert_eq!(body["center"]["lat"], 40.0);

    let (center, fenced) = sim
        .with_engine(|e| (e.pasture().center, e.pasture().fence.is_some()))
        .await;
    assert_eq!(center, GeoPoint::new(40.0, -105.0));
    assert!(fenced);

    // Anchors follow the new centre after a reset
    http.post(format!("{admin}/reset")).send().await.unwrap();
    let near = sim
        .with_engine(|e| e.herd().iter().all(|a| a.anchor.distance(&center) < 0.1))
        .await;
    assert!(near);
}

#[tokio::test]
async fn test_boundary_reload_keeps_pasture_when_backend_down() {
    let addr = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .unwrap()
        .local_addr()
        .unwrap();
    let sim = simulator(client_for(addr), Duration::from_secs(60));
    let admin = spawn_admin(Arc::clone(&sim)).await;

    let response = reqwest::Client::new()
        .post(format!("{admin}/boundary/reload"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 502);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].is_string());
    assert_eq!(sim.with_engine(|e| e.pasture().center).await, Pasture::default().center);
}
