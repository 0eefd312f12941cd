//! End-to-end tests for the Lectern server over real sockets.

use async_trait::async_trait;
use lectern_mail::{Email, Mailer, MailerQueueExt, Transport};
use lectern_queue::{JobPriority, QueueConfig};
use lectern_server::config::KeepWarmSettings;
use lectern_server::{AppState, KeepWarm, drain_queue, serve};
use serde_json::Value;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Slow;

#[async_trait]
impl Transport for Slow {
    async fn send(&self, _email: &Email) -> lectern_mail::Result<()> {
        tokio::time::sleep(Duration::from_millis(200)).await;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "slow"
    }
}

fn present(names: &[&str]) -> BTreeMap<String, bool> {
    names.iter().map(|n| (n.to_string(), true)).collect()
}

fn missing(names: &[&str]) -> BTreeMap<String, bool> {
    names.iter().map(|n| (n.to_string(), *n != "BREVO_API_KEY")).collect()
}

fn email(subject: &str) -> Email {
    Email::new()
        .from("noreply@iccict.org")
        .to("author@iccict.org")
        .subject(subject)
        .text("body")
}

struct Running {
    addr: SocketAddr,
    stop: oneshot::Sender<()>,
    handle: JoinHandle<std::io::Result<()>>,
}

async fn start(state: AppState) -> Running {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel::<()>();

    let handle = tokio::spawn(serve(listener, Arc::new(state), async {
        let _ = stopped.await;
    }));

    Running { addr, stop, handle }
}

fn state() -> AppState {
    let queue = Mailer::new(Slow).into_queue(QueueConfig::default()).unwrap();
    AppState::new(queue, "production")
        .with_required_env(&["BREVO_API_KEY", "BREVO_FROM_EMAIL"])
        .with_presence_probe(present)
}

async fn get_json(addr: SocketAddr, path: &str) -> (u16, Value) {
    let response = reqwest::get(format!("http://{addr}{path}")).await.unwrap();
    let status = response.status().as_u16();
    (status, response.json().await.unwrap())
}

#[tokio::test]
async fn test_health_endpoints_over_http() {
    let running = start(state()).await;

    let (status, body) = get_json(running.addr, "/health").await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "healthy");

    let (status, body) = get_json(running.addr, "/health/detailed").await;
    assert_eq!(status, 200);
    assert_eq!(body["appEnvironment"], "production");
    assert_eq!(body["environment"]["BREVO_FROM_EMAIL"], true);

    let (status, _) = get_json(running.addr, "/nope").await;
    assert_eq!(status, 404);

    running.stop.send(()).unwrap();
    running.handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_detailed_reports_missing_key() {
    let running = start(state().with_presence_probe(missing)).await;

    let (status, body) = get_json(running.addr, "/health/detailed").await;
    assert_eq!(status, 503);
    assert_eq!(body["status"], "unhealthy");
    assert_eq!(body["environment"]["BREVO_API_KEY"], false);

    running.stop.send(()).unwrap();
    running.handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_email_queue_endpoint_tracks_queue() {
    let state = state();
    let queue = state.queue.clone();
    let running = start(state).await;

    queue.enqueue(email("first"), JobPriority::Normal);
    queue.enqueue(email("second"), JobPriority::High);
    tokio::time::sleep(Duration::from_millis(50)).await;

    let (status, body) = get_json(running.addr, "/health/email-queue").await;
    assert_eq!(status, 200);
    assert_eq!(body["queueLength"], 2);
    assert_eq!(body["processing"], 1);
    assert_eq!(body["pending"], 1);

    queue.wait_idle().await;
    let (_, body) = get_json(running.addr, "/health/email-queue").await;
    assert_eq!(body["queueLength"], 0);
    assert_eq!(body["completed"], 2);

    running.stop.send(()).unwrap();
    running.handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_shutdown_stops_accepting_then_drains() {
    let state = state();
    let queue = state.queue.clone();
    let running = start(state).await;

    queue.enqueue(email("in flight"), JobPriority::Normal);
    running.stop.send(()).unwrap();
    running.handle.await.unwrap().unwrap();

    assert!(reqwest::get(format!("http://{}/health", running.addr)).await.is_err());

    assert_eq!(drain_queue(&queue, Duration::from_secs(5)).await, 0);
    assert_eq!(queue.status().completed, 1);
}

#[tokio::test]
async fn test_keep_warm_ping_sends_user_agent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .and(header("user-agent", "Lectern-KeepWarm/1.0"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let settings = KeepWarmSettings {
        url: Some(format!("{}/", server.uri())),
        ..KeepWarmSettings::default()
    };
    let url = lectern_server::keep_warm::resolve_url(&settings, |_| None);
    let keep_warm = KeepWarm::new(&settings, url).unwrap();

    assert_eq!(keep_warm.ping().await.unwrap().as_u16(), 200);
}

#[tokio::test]
async fn test_keep_warm_ping_reports_unreachable_host() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let settings = KeepWarmSettings {
        timeout_secs: 1,
        ..KeepWarmSettings::default()
    };
    let keep_warm = KeepWarm::new(&settings, format!("http://{addr}/health")).unwrap();
    assert!(keep_warm.ping().await.is_err());
}
