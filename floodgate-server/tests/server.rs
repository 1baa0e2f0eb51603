//! End-to-end tests against a live listener on an ephemeral port.

use axum::Router;
use axum::routing::get;
use floodgate_server::config::{LimiterConfig, ShutdownConfig};
use floodgate_server::http::{AppState, router};
use floodgate_server::lifecycle::{Coordinator, State};
use floodgate_server::movies::MovieStore;
use floodgate_server::notify::Notifier;
use floodgate_server::supervisor::TaskSupervisor;
use floodgate_server::throttle::ThrottleActor;
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

fn limiter(enabled: bool, rps: f64, burst: u32) -> LimiterConfig {
    LimiterConfig {
        enabled,
        rps,
        burst,
        sweep_interval: Duration::from_secs(60),
        staleness: Duration::from_secs(180),
    }
}

fn drain_deadlines() -> ShutdownConfig {
    ShutdownConfig {
        request_drain_timeout: Duration::from_secs(5),
        task_drain_timeout: Duration::from_secs(5),
    }
}

fn app_state(limiter_config: LimiterConfig, supervisor: TaskSupervisor) -> AppState {
    AppState {
        throttle: ThrottleActor::spawn(&limiter_config),
        supervisor,
        movies: MovieStore::new(),
        notifier: Notifier::new(),
        env: "test".to_string(),
    }
}

struct TestServer {
    addr: SocketAddr,
    shutdown_tx: oneshot::Sender<()>,
    serve_handle: JoinHandle<anyhow::Result<()>>,
    state_rx: watch::Receiver<State>,
}

impl TestServer {
    async fn start(app: Router, supervisor: TaskSupervisor) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let coordinator = Coordinator::new(supervisor, drain_deadlines());
        let state_rx = coordinator.state();

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let serve_handle = tokio::spawn(coordinator.serve(listener, app, async move {
            let _ = shutdown_rx.await;
        }));

        TestServer {
            addr,
            shutdown_tx,
            serve_handle,
            state_rx,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    async fn stop(self) -> State {
        self.shutdown_tx.send(()).unwrap();
        self.serve_handle.await.unwrap().unwrap();
        *self.state_rx.borrow()
    }
}

#[tokio::test]
async fn test_healthcheck_round_trip() {
    let supervisor = TaskSupervisor::new();
    let state = app_state(limiter(false, 1.0, 1), supervisor.clone());
    let server = TestServer::start(router(state), supervisor).await;

    let body: Value = reqwest::get(server.url("/v1/healthcheck"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["status"], "available");
    assert_eq!(body["system_info"]["environment"], "test");

    assert_eq!(server.stop().await, State::Stopped);
}

#[tokio::test]
async fn test_burst_exhaustion_returns_429() {
    let supervisor = TaskSupervisor::new();
    // Effectively no refill within the test.
    let state = app_state(limiter(true, 1e-9, 4), supervisor.clone());
    let server = TestServer::start(router(state), supervisor).await;

    let client = reqwest::Client::new();
    for i in 0..4 {
        let response = client.get(server.url("/v1/healthcheck")).send().await.unwrap();
        assert_eq!(response.status(), 200, "request {} within burst", i + 1);
    }

    let response = client.get(server.url("/v1/healthcheck")).send().await.unwrap();
    assert_eq!(response.status(), 429);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "rate limit exceeded");

    server.stop().await;
}

#[tokio::test]
async fn test_create_then_fetch_movie() {
    let supervisor = TaskSupervisor::new();
    let state = app_state(limiter(false, 1.0, 1), supervisor.clone());
    let server = TestServer::start(router(state), supervisor.clone()).await;

    let client = reqwest::Client::new();
    let response = client
        .post(server.url("/v1/movies"))
        .json(&json!({
            "title": "Stand by Me",
            "year": 1986,
            "runtime": 102,
            "genres": ["drama"]
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 201);
    let location = response
        .headers()
        .get("location")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert_eq!(location, "/v1/movies/1");

    let body: Value = client
        .get(server.url(&location))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["movie"]["title"], "Stand by Me");

    // The create scheduled a notification task; it must drain cleanly.
    assert!(supervisor.wait_idle(Duration::from_secs(5)).await);

    assert_eq!(server.stop().await, State::Stopped);
}

#[tokio::test]
async fn test_missing_movie_is_404() {
    let supervisor = TaskSupervisor::new();
    let state = app_state(limiter(false, 1.0, 1), supervisor.clone());
    let server = TestServer::start(router(state), supervisor).await;

    let response = reqwest::get(server.url("/v1/movies/999")).await.unwrap();
    assert_eq!(response.status(), 404);

    server.stop().await;
}

#[tokio::test]
async fn test_shutdown_drains_requests_and_tasks() {
    let supervisor = TaskSupervisor::new();
    let state = app_state(limiter(false, 1.0, 1), supervisor.clone());

    // An extra slow route so a request is verifiably in flight when the
    // shutdown signal lands.
    let app = router(state).route(
        "/slow",
        get(|| async {
            tokio::time::sleep(Duration::from_millis(300)).await;
            "done"
        }),
    );
    let server = TestServer::start(app, supervisor.clone()).await;

    let client = reqwest::Client::new();
    let slow_url = server.url("/slow");
    let in_flight = tokio::spawn(async move { client.get(slow_url).send().await });

    // Let the request reach the server, then schedule a background task and
    // pull the plug while both are still running.
    tokio::time::sleep(Duration::from_millis(50)).await;
    supervisor.spawn("pre-shutdown-task", async {
        tokio::time::sleep(Duration::from_millis(200)).await;
        Ok(())
    });

    let final_state = server.stop().await;

    let response = in_flight.await.unwrap().unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "done");

    assert_eq!(final_state, State::Stopped);
    assert_eq!(supervisor.outstanding(), 0);
}

#[tokio::test]
async fn test_no_new_connections_after_stop() {
    let supervisor = TaskSupervisor::new();
    let state = app_state(limiter(false, 1.0, 1), supervisor.clone());
    let server = TestServer::start(router(state), supervisor).await;

    let url = server.url("/v1/healthcheck");
    assert_eq!(server.stop().await, State::Stopped);

    let result = reqwest::Client::new()
        .get(url)
        .timeout(Duration::from_secs(1))
        .send()
        .await;
    assert!(result.is_err());
}
