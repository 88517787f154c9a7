use crate::logging::log_message::LogMessage;
use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt::{self, Write as _};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

/// One JSON object per line, shaped for CloudWatch Logs Insights.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct CloudEncoder(());

impl CloudEncoder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CloudEncoder {
    fn encode_inner(
        &self,
        time: DateTime<Utc>,
        event: &Event<'_>,
        span: Option<String>,
    ) -> LogMessage {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        LogMessage {
            severity: event.metadata().level().as_str().to_owned(),
            message: visitor.finish(),
            time: time.to_rfc3339_opts(SecondsFormat::Millis, true),
            target: event.metadata().target().to_owned(),
            span,
        }
    }
}

impl<S, N> FormatEvent<S, N> for CloudEncoder
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let span = ctx.lookup_current().map(|span| span.name().to_owned());
        let message = self.encode_inner(Utc::now(), event, span);
        let line = serde_json::to_string(&message).map_err(|_| fmt::Error)?;
        writeln!(writer, "{line}")
    }
}

/// Folds structured fields into the message as `key=value`.
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl MessageVisitor {
    fn finish(self) -> String {
        match (self.message.is_empty(), self.fields.is_empty()) {
            (_, true) => self.message,
            (true, false) => self.fields,
            (false, false) => format!("{} {}", self.message, self.fields),
        }
    }

    fn push_field(&mut self, field: &Field, value: fmt::Arguments<'_>) {
        if !self.fields.is_empty() {
            self.fields.push(' ');
        }
        let _ = write!(self.fields, "{}={}", field.name(), value);
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_owned();
        } else {
            self.push_field(field, format_args!("{value}"));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.push_field(field, format_args!("{value:?}"));
        }
    }
}
