//! Span capture for asserting on fetch, install and activation spans.

use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id, Record};
use tracing::{Dispatch, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::Registry;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;

/// A captured span with the fields it was created or recorded with.
#[derive(Debug, Clone)]
pub struct CapturedSpan {
    pub id: u64,
    pub parent_id: Option<u64>,
    pub name: String,
    pub fields: Vec<(String, String)>,
}

impl CapturedSpan {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

fn is_captured(name: &str) -> bool {
    name.starts_with("swcache.") || name == "offload_task"
}

#[derive(Default)]
struct FieldVisitor {
    fields: Vec<(String, String)>,
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.fields.push((field.name().to_owned(), format!("{value:?}")));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.fields.push((field.name().to_owned(), value.to_owned()));
    }
}

struct SpanCaptureLayer {
    spans: Arc<Mutex<Vec<CapturedSpan>>>,
}

impl<S> Layer<S> for SpanCaptureLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let name = attrs.metadata().name();
        if !is_captured(name) {
            return;
        }

        let mut visitor = FieldVisitor::default();
        attrs.record(&mut visitor);
        let parent_id = attrs
            .parent()
            .cloned()
            .or_else(|| {
                attrs
                    .is_contextual()
                    .then(|| ctx.current_span().id().cloned())
                    .flatten()
            })
            .map(|id| id.into_u64());

        self.spans.lock().unwrap().push(CapturedSpan {
            id: id.into_u64(),
            parent_id,
            name: name.to_owned(),
            fields: visitor.fields,
        });
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        if !is_captured(span.metadata().name()) {
            return;
        }

        let mut visitor = FieldVisitor::default();
        values.record(&mut visitor);
        let span_id = id.into_u64();
        let mut spans = self.spans.lock().unwrap();
        if let Some(captured) = spans.iter_mut().find(|s| s.id == span_id) {
            for (key, value) in visitor.fields {
                match captured.fields.iter_mut().find(|(k, _)| *k == key) {
                    Some(existing) => existing.1 = value,
                    None => captured.fields.push((key, value)),
                }
            }
        }
    }
}

/// Captured spans plus the dispatch feeding them.
#[derive(Clone)]
pub struct SpanCollector {
    spans: Arc<Mutex<Vec<CapturedSpan>>>,
    dispatch: Dispatch,
}

/// Create a collector. Install its dispatch with
/// [`tracing::dispatcher::set_default`] for the duration of a test.
pub fn create_span_collector() -> SpanCollector {
    let spans = Arc::new(Mutex::new(Vec::new()));
    let subscriber = Registry::default().with(SpanCaptureLayer {
        spans: spans.clone(),
    });
    SpanCollector {
        spans,
        dispatch: Dispatch::new(subscriber),
    }
}

/// Run `f` with span capture enabled.
pub fn with_span_capture<F, R>(f: F) -> (R, SpanCollector)
where
    F: FnOnce() -> R,
{
    let collector = create_span_collector();
    let result = tracing::dispatcher::with_default(collector.dispatch(), f);
    (result, collector)
}

impl SpanCollector {
    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    pub fn spans(&self) -> Vec<CapturedSpan> {
        self.spans.lock().unwrap().clone()
    }

    pub fn span_names(&self) -> Vec<String> {
        self.spans
            .lock()
            .unwrap()
            .iter()
            .map(|s| s.name.clone())
            .collect()
    }

    /// All spans named `name`, in creation order.
    pub fn spans_named(&self, name: &str) -> Vec<CapturedSpan> {
        self.spans
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.name == name)
            .cloned()
            .collect()
    }

    pub fn has_span(&self, name: &str) -> bool {
        self.spans.lock().unwrap().iter().any(|s| s.name == name)
    }

    /// Field of the last span named `span_name`.
    pub fn get_field(&self, span_name: &str, field_name: &str) -> Option<String> {
        self.spans
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|s| s.name == span_name)
            .and_then(|s| s.field(field_name).map(str::to_owned))
    }

    pub fn clear(&self) {
        self.spans.lock().unwrap().clear();
    }

    /// Assert that `expected` appear in this order, other spans allowed in
    /// between.
    pub fn assert_span_sequence(&self, expected: &[&str]) {
        let names = self.span_names();
        let mut remaining = expected.iter().peekable();
        for name in &names {
            if remaining.peek().is_some_and(|next| name == *next) {
                remaining.next();
            }
        }
        assert!(
            remaining.peek().is_none(),
            "expected span sequence {expected:?}, captured {names:?}"
        );
    }
}
