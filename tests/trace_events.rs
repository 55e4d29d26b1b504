use std::sync::{Arc, Mutex};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{layer::Context, Layer, Registry};

/// Custom Layer to collect emitted event messages.
struct EventCollector {
    events: Arc<Mutex<Vec<String>>>,
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        self.events.lock().unwrap().push(format!("{:?}", event));
    }
}

#[tokio::test]
async fn emits_trace_initialised_and_failure_events() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let collector = EventCollector {
        events: events.clone(),
    };
    let subscriber = Registry::default().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    use purr::cli::{run, Cli, Commands, HtmlCombineArgs};

    let tmp = tempfile::tempdir().unwrap();
    let cli = Cli {
        command: Commands::HtmlCombine(HtmlCombineArgs {
            input: tmp.path().join("missing"),
            output: Some(tmp.path().join("out")),
            ..HtmlCombineArgs::default()
        }),
    };

    let result = run(cli).await;
    assert!(result.is_err(), "missing input must fail");

    let event_msgs = events.lock().unwrap();
    assert!(
        event_msgs.iter().any(|msg| msg.contains("trace_initialised")),
        "Expected a 'trace_initialised' trace event, got: {:?}",
        event_msgs
    );
    assert!(
        event_msgs.iter().any(|msg| msg.contains("Combine failed")),
        "Expected a 'Combine failed' event, got: {:?}",
        event_msgs
    );
}
