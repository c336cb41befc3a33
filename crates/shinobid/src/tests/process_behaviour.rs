//! Behavioural tests covering the server process lifecycle and its runtime
//! files.

use std::cell::RefCell;
use std::fs;
use std::net::{Ipv4Addr, TcpListener};
use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::thread;
use std::time::{Duration, Instant};

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use serde_json::Value;

use crate::process::LaunchError;
use crate::process::launch::{LaunchPlan, ProcessControl, ServiceDeps, run_server_with};

use super::support::{
    ChannelShutdown, HealthEvent, RecordingHealthReporter, TestConfigLoader, UnprivilegedIdentity,
};

const WAIT_TIMEOUT: Duration = Duration::from_secs(10);
const POLL_INTERVAL: Duration = Duration::from_millis(25);

type StepResult = Result<(), String>;

#[fixture]
fn world() -> RefCell<ServerWorld> {
    RefCell::new(ServerWorld::new())
}

#[given("a development server on a free port")]
fn given_free_port(world: &RefCell<ServerWorld>) {
    assert!(world.borrow().occupied.is_none());
}

#[given("a development server on a port held by another listener")]
fn given_busy_port(world: &RefCell<ServerWorld>) -> StepResult {
    world.borrow_mut().occupy_port()
}

#[given("a development server with database url {url}")]
fn given_database_url(world: &RefCell<ServerWorld>, url: String) {
    world
        .borrow_mut()
        .configure(|loader| loader.with_database_url(url.trim_matches('"')));
}

#[given("a development server with log filter {filter}")]
fn given_log_filter(world: &RefCell<ServerWorld>, filter: String) {
    world
        .borrow_mut()
        .configure(|loader| loader.with_log_filter(filter.trim_matches('"')));
}

#[when("the server starts")]
fn when_server_starts(world: &RefCell<ServerWorld>) -> StepResult {
    world.borrow_mut().start_background()?;
    world.borrow().wait_for_status("ready").map(|_| ())
}

#[when("the server runs to completion")]
fn when_server_runs_to_completion(world: &RefCell<ServerWorld>) {
    world.borrow_mut().run_foreground();
}

#[when("shutdown is triggered")]
fn when_shutdown_triggered(world: &RefCell<ServerWorld>) -> StepResult {
    world.borrow_mut().trigger_shutdown()
}

#[when("the server run completes")]
fn when_server_completes(world: &RefCell<ServerWorld>) -> StepResult {
    world.borrow_mut().join_background()
}

#[then("the pid file records the current process")]
fn then_pid_file_records_process(world: &RefCell<ServerWorld>) {
    let content =
        fs::read_to_string(world.borrow().loader.pid_path()).expect("pid file should be readable");
    assert_eq!(content.trim(), std::process::id().to_string());
}

#[then("the health snapshot reads ready")]
fn then_health_ready(world: &RefCell<ServerWorld>) {
    let snapshot = world
        .borrow()
        .wait_for_status("ready")
        .expect("ready snapshot");
    assert_eq!(snapshot["pid"], std::process::id());
    assert!(snapshot["timestamp"].as_u64().is_some());
}

#[then("the health endpoint reports running")]
fn then_health_endpoint_running(world: &RefCell<ServerWorld>) {
    let url = format!("http://127.0.0.1:{}/health", world.borrow().loader.port());
    let runtime = tokio::runtime::Runtime::new().expect("client runtime");
    let (status, body) = runtime.block_on(async {
        let response = reqwest::get(&url).await.expect("health request");
        let status = response.status();
        let body: Value = response.json().await.expect("health body");
        (status, body)
    });
    assert_eq!(status, reqwest::StatusCode::OK);
    assert_eq!(body["status"], "running");
}

#[then("the server run succeeds")]
fn then_run_succeeds(world: &RefCell<ServerWorld>) {
    let binding = world.borrow();
    let result = binding.result.as_ref().expect("a recorded server result");
    assert!(result.is_ok(), "server run should succeed: {result:?}");
}

#[then("the runtime files are removed")]
fn then_runtime_files_removed(world: &RefCell<ServerWorld>) {
    let binding = world.borrow();
    assert!(
        !binding.loader.pid_path().exists(),
        "pid file should be removed"
    );
    assert!(
        !binding.loader.health_path().exists(),
        "health file should be removed"
    );
}

#[then("the reporter saw the server stop")]
fn then_reporter_saw_stop(world: &RefCell<ServerWorld>) {
    let events = world.borrow().reporter.events();
    assert!(events.contains(&HealthEvent::ServerListening));
    assert_eq!(events.last(), Some(&HealthEvent::ServerStopped));
}

#[then("the launch fails because the address is in use")]
fn then_address_in_use(world: &RefCell<ServerWorld>) {
    let binding = world.borrow();
    let error = binding.launch_error();
    assert!(
        matches!(error, LaunchError::AddressInUse { .. }),
        "unexpected error: {error}"
    );
    assert_eq!(
        error.to_string(),
        format!("address 127.0.0.1:{} is already in use", binding.loader.port())
    );
}

#[then("the launch fails during bootstrap")]
fn then_bootstrap_failed(world: &RefCell<ServerWorld>) {
    let binding = world.borrow();
    let error = binding.launch_error();
    assert!(
        matches!(error, LaunchError::Bootstrap { .. }),
        "unexpected error: {error}"
    );
}

#[then("the launch fails configuring telemetry")]
fn then_telemetry_failed(world: &RefCell<ServerWorld>) {
    let binding = world.borrow();
    let error = binding.launch_error();
    assert!(
        matches!(error, LaunchError::Telemetry { .. }),
        "unexpected error: {error}"
    );
}

#[then("the server port is still free")]
fn then_port_free(world: &RefCell<ServerWorld>) {
    let port = world.borrow().loader.port();
    TcpListener::bind((Ipv4Addr::LOCALHOST, port)).expect("port should not have been bound");
}

struct ServerWorld {
    loader: TestConfigLoader,
    reporter: Arc<RecordingHealthReporter>,
    occupied: Option<TcpListener>,
    trigger: Option<Sender<()>>,
    handle: Option<thread::JoinHandle<Result<(), LaunchError>>>,
    result: Option<Result<(), LaunchError>>,
}

impl ServerWorld {
    fn new() -> Self {
        Self {
            loader: TestConfigLoader::new(),
            reporter: Arc::new(RecordingHealthReporter::default()),
            occupied: None,
            trigger: None,
            handle: None,
            result: None,
        }
    }

    fn configure(&mut self, change: impl FnOnce(TestConfigLoader) -> TestConfigLoader) {
        self.loader = change(self.loader.clone());
    }

    fn occupy_port(&mut self) -> StepResult {
        let listener =
            TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).map_err(|error| error.to_string())?;
        let port = listener.local_addr().map_err(|error| error.to_string())?.port();
        self.configure(|loader| loader.with_port(port));
        self.occupied = Some(listener);
        Ok(())
    }

    fn plan(
        &self,
        shutdown: ChannelShutdown,
    ) -> LaunchPlan<TestConfigLoader, UnprivilegedIdentity, ChannelShutdown> {
        LaunchPlan {
            process: ProcessControl {
                identity: UnprivilegedIdentity,
                shutdown,
            },
            services: ServiceDeps {
                loader: self.loader.clone(),
                reporter: Arc::clone(&self.reporter) as Arc<dyn crate::health::HealthReporter>,
            },
        }
    }

    fn start_background(&mut self) -> StepResult {
        if self.handle.is_some() {
            return Err("server already running".to_owned());
        }
        let (trigger, shutdown) = ChannelShutdown::new();
        let plan = self.plan(shutdown);
        self.trigger = Some(trigger);
        self.handle = Some(thread::spawn(move || run_server_with(plan)));
        Ok(())
    }

    /// Runs with a shutdown request already pending, so a launch that
    /// unexpectedly succeeds still returns.
    fn run_foreground(&mut self) {
        let (trigger, shutdown) = ChannelShutdown::new();
        drop(trigger);
        self.result = Some(run_server_with(self.plan(shutdown)));
    }

    fn trigger_shutdown(&mut self) -> StepResult {
        let trigger = self
            .trigger
            .take()
            .ok_or_else(|| "server not running".to_owned())?;
        trigger.send(()).map_err(|error| error.to_string())
    }

    fn join_background(&mut self) -> StepResult {
        let handle = self
            .handle
            .take()
            .ok_or_else(|| "server not running".to_owned())?;
        let outcome = handle
            .join()
            .map_err(|_| "server thread panicked".to_owned())?;
        self.result = Some(outcome);
        Ok(())
    }

    fn wait_for_status(&self, expected: &str) -> Result<Value, String> {
        let deadline = Instant::now() + WAIT_TIMEOUT;
        while Instant::now() < deadline {
            if let Ok(raw) = fs::read_to_string(self.loader.health_path())
                && let Ok(snapshot) = serde_json::from_str::<Value>(&raw)
                && snapshot["status"] == expected
            {
                return Ok(snapshot);
            }
            thread::sleep(POLL_INTERVAL);
        }
        Err(format!("server did not publish a {expected} health snapshot"))
    }

    fn launch_error(&self) -> &LaunchError {
        self.result
            .as_ref()
            .expect("a recorded server result")
            .as_ref()
            .err()
            .expect("the launch should fail")
    }
}

#[scenario(
    path = "tests/features/server_process.feature",
    name = "The server serves until shutdown and removes its runtime files"
)]
fn server_serves_until_shutdown(world: RefCell<ServerWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/server_process.feature",
    name = "A busy port fails before runtime files are written"
)]
fn busy_port_fails_fast(world: RefCell<ServerWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/server_process.feature",
    name = "A bootstrap failure removes the runtime files"
)]
fn bootstrap_failure_cleans_up(world: RefCell<ServerWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/server_process.feature",
    name = "An invalid log filter is rejected before the port is bound"
)]
fn invalid_log_filter_fails_before_binding(world: RefCell<ServerWorld>) {
    drop(world);
}
