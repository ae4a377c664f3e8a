use super::*;
use crate::collector::{BeatCollector, BeatEvent, Collector, Publisher};
use crate::config::ZfsbeatConfig;
use crate::error::{Result, ZfsbeatError, EXIT_CONFIG, EXIT_FAULT, EXIT_INIT, EXIT_OK};
use crate::logging::LogSink;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

const RUNNING_LINE: &str = "zfsbeat is running";

#[derive(Debug, Clone, Copy, PartialEq)]
enum Behavior {
    Normal,
    FailInit,
    FailClose,
    ExitImmediately,
    FailRun,
    IgnoreCancel,
    Panic,
}

#[derive(Default)]
struct Probe {
    initialized: AtomicUsize,
    runs: AtomicUsize,
    closed: AtomicUsize,
}

struct MockCollector {
    behavior: Behavior,
    probe: Arc<Probe>,
}

#[async_trait]
impl Collector for MockCollector {
    fn name(&self) -> &str {
        "mock"
    }

    async fn initialize(&mut self) -> Result<()> {
        self.probe.initialized.fetch_add(1, Ordering::SeqCst);
        if self.behavior == Behavior::FailInit {
            return Err(ZfsbeatError::initialization("mock", "device unavailable"));
        }
        Ok(())
    }

    async fn run(&mut self, cancel: CancellationToken) -> Result<()> {
        self.probe.runs.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            Behavior::ExitImmediately => Ok(()),
            Behavior::FailRun => Err(ZfsbeatError::system("pool vanished")),
            Behavior::Panic => panic!("collector bug"),
            Behavior::IgnoreCancel => {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            }
            _ => {
                cancel.cancelled().await;
                Ok(())
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.probe.closed.fetch_add(1, Ordering::SeqCst);
        if self.behavior == Behavior::FailClose {
            return Err(ZfsbeatError::shutdown("publisher refused to close"));
        }
        Ok(())
    }
}

fn create_test_config() -> ZfsbeatConfig {
    let mut config = ZfsbeatConfig::default();
    config.beat.path = "/tmp/x/log/*".to_string();
    config.shutdown.stop_timeout_ms = 200;
    config
}

fn create_controller(
    config: ZfsbeatConfig,
    behavior: Behavior,
) -> (BeatController, Arc<Probe>, Arc<LogSink>) {
    let probe = Arc::new(Probe::default());
    let sink = Arc::new(LogSink::in_memory());
    let collector = MockCollector {
        behavior,
        probe: Arc::clone(&probe),
    };
    let controller = BeatController::new(config, Box::new(collector), Arc::clone(&sink));
    (controller, probe, sink)
}

#[tokio::test]
async fn test_start_then_shutdown_exits_cleanly() {
    let (mut controller, probe, sink) = create_controller(create_test_config(), Behavior::Normal);
    assert_eq!(controller.state(), ProcessState::Starting);

    let handle = controller.start().await.unwrap();
    assert_eq!(handle.state(), ProcessState::Running);
    assert_eq!(sink.count_matching(RUNNING_LINE), 1);
    assert_eq!(probe.initialized.load(Ordering::SeqCst), 1);

    assert!(handle.request_shutdown());
    let exit_code = timeout(Duration::from_secs(2), controller.await_shutdown())
        .await
        .unwrap();

    assert_eq!(exit_code, EXIT_OK);
    assert_eq!(controller.state(), ProcessState::Stopped);
    assert_eq!(handle.state(), ProcessState::Stopped);
    assert_eq!(probe.runs.load(Ordering::SeqCst), 1);
    assert_eq!(probe.closed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_running_line_precedes_stop() {
    let (mut controller, _probe, sink) = create_controller(create_test_config(), Behavior::Normal);

    let handle = controller.start().await.unwrap();
    handle.request_shutdown();
    controller.await_shutdown().await;

    let running = sink.position(RUNNING_LINE).unwrap();
    let initiated = sink.position("Shutdown initiated").unwrap();
    let stopped = sink.position("stopped with exit code 0").unwrap();
    assert!(running < initiated);
    assert!(initiated < stopped);
    assert_eq!(sink.count_matching(RUNNING_LINE), 1);
}

#[tokio::test]
async fn test_double_shutdown_request_is_idempotent() {
    let (mut controller, probe, sink) = create_controller(create_test_config(), Behavior::Normal);

    let handle = controller.start().await.unwrap();
    let second = handle.clone();

    assert!(handle.request_shutdown());
    assert!(!second.request_shutdown());

    let exit_code = controller.await_shutdown().await;
    assert_eq!(exit_code, EXIT_OK);
    assert_eq!(sink.count_matching("Shutdown initiated"), 1);
    assert_eq!(probe.closed.load(Ordering::SeqCst), 1);

    // Requests after the fact change nothing either
    assert!(!handle.request_shutdown());
    assert_eq!(controller.state(), ProcessState::Stopped);
}

#[tokio::test]
async fn test_invalid_config_never_reports_running() {
    let mut config = create_test_config();
    config.beat.path = String::new();
    let (mut controller, probe, sink) = create_controller(config, Behavior::Normal);

    let err = controller.start().await.unwrap_err();
    assert!(matches!(err, ZfsbeatError::Config(_)));
    assert_eq!(err.exit_code(), EXIT_CONFIG);

    assert!(!sink.contains("is running"));
    assert!(sink.contains("Invalid configuration"));
    assert_eq!(controller.state(), ProcessState::Stopped);
    assert_eq!(probe.initialized.load(Ordering::SeqCst), 0);

    // Nothing to wait for once startup failed
    assert_eq!(controller.await_shutdown().await, EXIT_FAULT);
}

#[tokio::test]
async fn test_initialization_failure_releases_collector() {
    let (mut controller, probe, sink) = create_controller(create_test_config(), Behavior::FailInit);

    let err = controller.start().await.unwrap_err();
    assert!(matches!(err, ZfsbeatError::Initialization { .. }));
    assert_eq!(err.exit_code(), EXIT_INIT);

    assert!(!sink.contains("is running"));
    assert_eq!(probe.closed.load(Ordering::SeqCst), 1);
    assert_eq!(probe.runs.load(Ordering::SeqCst), 0);
    assert_eq!(controller.state(), ProcessState::Stopped);
}

#[tokio::test]
async fn test_close_failure_keeps_graceful_exit_code() {
    let (mut controller, probe, sink) = create_controller(create_test_config(), Behavior::FailClose);

    let handle = controller.start().await.unwrap();
    handle.request_shutdown();

    assert_eq!(controller.await_shutdown().await, EXIT_OK);
    assert!(sink.contains("Error closing collector mock"));
    assert_eq!(probe.closed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_collector_exit_triggers_shutdown() {
    let (mut controller, _probe, sink) =
        create_controller(create_test_config(), Behavior::ExitImmediately);

    controller.start().await.unwrap();
    let exit_code = timeout(Duration::from_secs(2), controller.await_shutdown())
        .await
        .unwrap();

    assert_eq!(exit_code, EXIT_OK);
    assert!(sink.contains("Shutdown initiated: collector exited"));
}

#[tokio::test]
async fn test_collector_failure_is_a_fault() {
    let (mut controller, probe, sink) = create_controller(create_test_config(), Behavior::FailRun);

    controller.start().await.unwrap();
    let exit_code = timeout(Duration::from_secs(2), controller.await_shutdown())
        .await
        .unwrap();

    assert_eq!(exit_code, EXIT_FAULT);
    assert!(sink.contains("pool vanished"));
    assert_eq!(probe.closed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_stuck_collector_hits_stop_timeout() {
    let (mut controller, probe, sink) =
        create_controller(create_test_config(), Behavior::IgnoreCancel);

    let handle = controller.start().await.unwrap();
    handle.request_shutdown();

    let exit_code = timeout(Duration::from_secs(2), controller.await_shutdown())
        .await
        .unwrap();

    assert_eq!(exit_code, EXIT_OK);
    assert!(sink.contains("did not stop within"));
    assert_eq!(probe.closed.load(Ordering::SeqCst), 1);
    assert_eq!(controller.state(), ProcessState::Stopped);
}

#[tokio::test]
async fn test_panicking_collector_is_still_closed() {
    let (mut controller, probe, sink) = create_controller(create_test_config(), Behavior::Panic);

    let handle = controller.start().await.unwrap();
    handle.request_shutdown();

    let exit_code = timeout(Duration::from_secs(2), controller.await_shutdown())
        .await
        .unwrap();

    assert_eq!(exit_code, EXIT_FAULT);
    assert!(sink.contains("collector worker failed"));
    assert_eq!(probe.closed.load(Ordering::SeqCst), 1);
}

/// Publisher that accepts a connection and then never completes a send
#[derive(Default)]
struct StalledPublisher {
    closes: AtomicUsize,
}

#[async_trait]
impl Publisher for StalledPublisher {
    async fn connect(&self) -> Result<()> {
        Ok(())
    }

    async fn publish(&self, _event: &BeatEvent) -> Result<()> {
        std::future::pending().await
    }

    async fn close(&self) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn test_stalled_publisher_is_released_on_shutdown() {
    let mut config = create_test_config();
    config.beat.period_ms = 10;
    let publisher = Arc::new(StalledPublisher::default());
    let collector = BeatCollector::new(&config.beat, publisher.clone());
    let mut controller =
        BeatController::new(config, Box::new(collector), Arc::new(LogSink::in_memory()));
    let sink = controller.sink();

    let handle = controller.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    handle.request_shutdown();

    let exit_code = timeout(Duration::from_secs(2), controller.await_shutdown())
        .await
        .unwrap();

    assert_eq!(exit_code, EXIT_OK);
    assert!(!sink.contains("did not stop within"));
    assert_eq!(publisher.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_second_start_is_rejected() {
    let (mut controller, _probe, sink) = create_controller(create_test_config(), Behavior::Normal);

    let handle = controller.start().await.unwrap();
    assert!(controller.start().await.is_err());
    assert_eq!(sink.count_matching(RUNNING_LINE), 1);

    handle.request_shutdown();
    assert_eq!(controller.await_shutdown().await, EXIT_OK);
}

#[tokio::test]
async fn test_custom_name_in_running_line() {
    let mut config = create_test_config();
    config.beat.name = "tankbeat".to_string();
    let (mut controller, _probe, sink) = create_controller(config, Behavior::Normal);

    assert_eq!(controller.name(), "tankbeat");

    let handle = controller.start().await.unwrap();
    assert!(sink.contains("tankbeat is running"));
    handle.request_shutdown();
    controller.await_shutdown().await;
}

#[tokio::test]
async fn test_run_stops_on_supervisor_request() {
    let (mut controller, probe, sink) = create_controller(create_test_config(), Behavior::Normal);
    let handle = controller.shutdown_handle();

    let supervisor = tokio::spawn(async move {
        let mut state = handle.subscribe();
        let running = state
            .wait_for(|state| *state == ProcessState::Running)
            .await
            .is_ok();
        if running {
            handle.request_shutdown();
        }
    });

    let exit_code = timeout(Duration::from_secs(5), controller.run()).await.unwrap();
    supervisor.await.unwrap();

    assert_eq!(exit_code, EXIT_OK);
    assert!(sink.contains("Shutdown initiated: supervisor request"));
    assert_eq!(probe.closed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_run_reports_startup_failure() {
    let (mut controller, _probe, sink) = create_controller(create_test_config(), Behavior::FailInit);

    let exit_code = timeout(Duration::from_secs(5), controller.run()).await.unwrap();
    assert_eq!(exit_code, EXIT_INIT);
    assert!(!sink.contains("is running"));
}
