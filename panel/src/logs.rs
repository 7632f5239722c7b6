//! Per-request log capture, so a video request can hand its own log back to the user.

use std::{
    fmt::Write as _,
    future::Future,
    sync::{Arc, Mutex},
};
use tracing::{
    field::{Field, Visit},
    Event, Subscriber,
};
use tracing_subscriber::{layer::Context, Layer};

tokio::task_local! {
    static BUFFER: LogBuffer;
}

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<String>>>);

impl LogBuffer {
    fn push(&self, line: String) {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).push(line);
    }

    fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.0.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

#[derive(Default)]
struct LineVisitor {
    message: String,
    fields: String,
}

impl Visit for LineVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}

/// Copies every event emitted inside [`capture`] into that call's buffer.
/// Events outside a capture scope pass through untouched.
pub struct CaptureLayer;

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let _ = BUFFER.try_with(|buf| {
            let mut v = LineVisitor::default();
            event.record(&mut v);
            let level = event.metadata().level();
            buf.push(format!("{level} {}{}", v.message, v.fields).trim_end().to_string());
        });
    }
}

/// Runs `fut` and returns its output with the log lines it emitted.
///
/// Only events from the same task are seen; work spawned onto other tasks is not captured.
pub async fn capture<F: Future>(fut: F) -> (F::Output, Vec<String>) {
    let buf = LogBuffer::default();
    let out = BUFFER.scope(buf.clone(), fut).await;
    (out, buf.take())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::{info, warn};
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    #[tokio::test]
    async fn collects_only_events_inside_the_scope() {
        let _guard = tracing_subscriber::registry().with(CaptureLayer).set_default();
        info!("before");
        let (value, lines) = capture(async {
            info!(task = 7, "Start Generating Video");
            warn!(path = "out", "cannot open task folder");
            42
        })
        .await;
        info!("after");

        assert_eq!(value, 42);
        assert_eq!(lines, vec!["INFO Start Generating Video task=7", "WARN cannot open task folder path=out"]);
    }

    #[tokio::test]
    async fn nothing_is_captured_without_events() {
        let _guard = tracing_subscriber::registry().with(CaptureLayer).set_default();
        let ((), lines) = capture(async {}).await;
        assert!(lines.is_empty());
    }
}
