//! Dispatch integration tests: registration, fan-out and the enable switch
//! through the public API only.

use async_trait::async_trait;
use houston::{
    DispatchOutcome, Error, FailureStage, Houston, InitFlag, Message, ToolError, ToolFailure,
    TrackingTool,
};
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

const ID: &str = "I believe we've had a problem here.";
const KEY: &str = "problem";
const VALUE: &str = "explosion and rupture of oxygen tank 2";

/// Records every message it receives.
#[derive(Default)]
struct Capturer {
    initialized: InitFlag,
    init_calls: AtomicUsize,
    fail_with: Option<&'static str>,
    init_failures_left: AtomicUsize,
    messages: Mutex<Vec<Message>>,
}

impl Capturer {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn failing(error: &'static str) -> Arc<Self> {
        Arc::new(Self {
            fail_with: Some(error),
            ..Default::default()
        })
    }

    /// Fails its first `attempts` initializations, then succeeds.
    fn flaky_init(attempts: usize) -> Arc<Self> {
        Arc::new(Self {
            init_failures_left: AtomicUsize::new(attempts),
            ..Default::default()
        })
    }

    fn messages(&self) -> Vec<Message> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl TrackingTool for Capturer {
    fn is_initialized(&self) -> bool {
        self.initialized.get()
    }

    fn set_initialized(&self, initialized: bool) {
        self.initialized.set(initialized);
    }

    async fn initialize(&self) -> Result<(), ToolError> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .init_failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(ToolError::failed("analytics backend unreachable"));
        }
        Ok(())
    }

    async fn send(&self, message: &Message) -> Result<(), ToolError> {
        self.messages.lock().unwrap().push(message.clone());
        match self.fail_with {
            Some(error) => Err(ToolError::failed(error)),
            None => Ok(()),
        }
    }
}

fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[tokio::test]
async fn test_zero_tools_send_is_noop() {
    let houston = Houston::init().launch().await.unwrap();

    let outcome = houston.send("x").over().await.unwrap();

    assert_eq!(outcome, DispatchOutcome::Delivered { delivered: 0, failed: 0 });
}

#[tokio::test]
async fn test_single_tool_receives_message() {
    let a = Capturer::new();
    let houston = Houston::init().add_arc(a.clone()).launch().await.unwrap();

    houston.send("test").with("foo", "bar").over().await.unwrap();

    let messages = a.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].name(), "test");
    assert_eq!(messages[0].parameters(), &params(&[("foo", "bar")]));
}

#[tokio::test]
async fn test_sending_a_message_to_multiple_receivers() {
    let jack = Capturer::new();
    let william = Capturer::new();
    let vance = Capturer::new();

    let houston = Houston::init()
        .add_arc(jack.clone())
        .add_arc(william.clone())
        .add_arc(vance.clone())
        .launch()
        .await
        .unwrap();

    for tool in [&jack, &william, &vance] {
        assert!(tool.is_initialized());
        assert_eq!(tool.init_calls.load(Ordering::SeqCst), 1);
    }

    houston.send(ID).with(KEY, VALUE).over().await.unwrap();

    for tool in [&jack, &william, &vance] {
        let messages = tool.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].name(), ID);
        assert_eq!(messages[0].get(KEY), Some(VALUE));
    }
}

#[tokio::test]
async fn test_last_write_wins_on_duplicate_keys() {
    let a = Capturer::new();
    let houston = Houston::init().add_arc(a.clone()).launch().await.unwrap();

    houston
        .send("screen_view")
        .with("screen", "home")
        .with("source", "push")
        .with("screen", "settings")
        .over()
        .await
        .unwrap();

    assert_eq!(
        a.messages()[0].parameters(),
        &params(&[("screen", "settings"), ("source", "push")])
    );
}

#[tokio::test]
async fn test_disable_then_enable() {
    let a = Capturer::new();
    let houston = Houston::init().add_arc(a.clone()).launch().await.unwrap();

    houston.set_enabled(false).await;
    assert!(!houston.is_enabled());
    let outcome = houston.send("test").over().await.unwrap();
    assert_eq!(outcome, DispatchOutcome::Disabled);
    assert!(a.messages().is_empty());

    houston.set_enabled(true).await;
    houston.send("test2").over().await.unwrap();

    let messages = a.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].name(), "test2");
}

#[tokio::test]
async fn test_disabled_suppresses_every_tool() {
    let tools: Vec<Arc<Capturer>> = (0..5).map(|_| Capturer::new()).collect();
    let builder = tools
        .iter()
        .fold(Houston::init(), |b, t| b.add_arc(t.clone()));
    let houston = builder.enabled(false).launch().await.unwrap();

    for i in 0..10 {
        houston.send(format!("event_{i}")).over().await.unwrap();
    }

    assert!(tools.iter().all(|t| t.messages().is_empty()));
}

#[tokio::test]
async fn test_every_message_delivered_exactly_once() {
    let a = Capturer::new();
    let b = Capturer::new();
    let houston = Houston::init()
        .add_arc(a.clone())
        .add_arc(b.clone())
        .launch()
        .await
        .unwrap();

    for i in 0..20 {
        houston.send(format!("event_{i}")).over().await.unwrap();
    }

    for tool in [&a, &b] {
        let ids: Vec<_> = tool.messages().iter().map(|m| m.id().clone()).collect();
        assert_eq!(ids.len(), 20);
        let mut unique = ids.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 20);
    }
}

#[tokio::test]
async fn test_sending_a_message_and_crash() {
    let jack = Capturer::new();
    let william = Capturer::failing("An exception appeared");
    let vance = Capturer::new();
    let errors: Arc<Mutex<Vec<String>>> = Arc::default();
    let sink = errors.clone();

    let houston = Houston::init()
        .add_arc(jack.clone())
        .add_arc(william.clone())
        .add_arc(vance.clone())
        .error_handler(move |failure: &ToolFailure| {
            sink.lock().unwrap().push(failure.error.to_string());
        })
        .launch()
        .await
        .unwrap();

    houston.send(ID).with(KEY, VALUE).over().await.unwrap();

    // All messages should still be sent
    for tool in [&jack, &william, &vance] {
        assert_eq!(tool.messages().len(), 1);
        assert_eq!(tool.messages()[0].get(KEY), Some(VALUE));
    }
    assert_eq!(
        *errors.lock().unwrap(),
        vec!["tool error: An exception appeared".to_string()]
    );
}

#[tokio::test]
async fn test_failed_launch_initialization_is_retried_lazily() {
    let flaky = Capturer::flaky_init(2);
    let steady = Capturer::new();
    let failures: Arc<Mutex<Vec<(FailureStage, Option<String>)>>> = Arc::default();
    let sink = failures.clone();

    let houston = Houston::init()
        .add_arc(flaky.clone())
        .add_arc(steady.clone())
        .error_handler(move |failure: &ToolFailure| {
            sink.lock().unwrap().push((failure.stage, failure.message_name.clone()));
        })
        .launch()
        .await
        .unwrap();

    assert_eq!(*failures.lock().unwrap(), vec![(FailureStage::Initialize, None)]);
    assert_eq!(houston.get_stats().await.initialization_failures, 1);
    assert!(!flaky.is_initialized());
    assert!(steady.is_initialized());

    // The retry on first delivery fails again, so the tool misses this message
    let outcome = houston.send("first").over().await.unwrap();
    assert_eq!(outcome, DispatchOutcome::Delivered { delivered: 1, failed: 1 });
    assert!(flaky.messages().is_empty());
    assert_eq!(
        failures.lock().unwrap().last(),
        Some(&(FailureStage::Initialize, Some("first".to_string())))
    );

    houston.send("second").over().await.unwrap();

    let names: Vec<_> = flaky.messages().iter().map(|m| m.name().to_string()).collect();
    assert_eq!(names, vec!["second"]);
    assert_eq!(steady.messages().len(), 2);
    assert!(flaky.is_initialized());
    assert_eq!(flaky.init_calls.load(Ordering::SeqCst), 3);
    assert_eq!(steady.init_calls.load(Ordering::SeqCst), 1);

    let stats = houston.get_stats().await;
    assert_eq!(stats.initialization_failures, 2);
    assert_eq!(stats.deliveries_succeeded, 3);
    assert_eq!(stats.deliveries_failed, 1);
}

#[tokio::test]
async fn test_relaunch_replaces_tool_set() {
    let first = Capturer::new();
    let second = Capturer::new();

    let old = Houston::init().add_arc(first.clone()).launch().await.unwrap();
    let new = Houston::init().add_arc(second.clone()).launch().await.unwrap();
    drop(old);

    new.send("after_relaunch").over().await.unwrap();

    assert!(first.messages().is_empty());
    assert_eq!(second.messages().len(), 1);
}

#[tokio::test]
async fn test_empty_event_name_is_rejected() {
    let a = Capturer::new();
    let houston = Houston::init().add_arc(a.clone()).launch().await.unwrap();

    let err = houston.send("").over().await.unwrap_err();

    assert!(matches!(err, Error::Validation(_)));
    assert!(a.messages().is_empty());
}

#[tokio::test]
async fn test_concurrent_senders() {
    let a = Capturer::new();
    let houston = Houston::init().add_arc(a.clone()).launch().await.unwrap();

    let mut handles = Vec::new();
    for i in 0..16 {
        let houston = houston.clone();
        handles.push(tokio::spawn(async move {
            houston.send("parallel").with("n", i.to_string()).over().await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(a.messages().len(), 16);
    assert_eq!(a.init_calls.load(Ordering::SeqCst), 1);
}
