//! Console line formatting.
//!
//! Multi-line messages (error chains, backtraces) are hard to read once
//! several requests interleave, so every physical line gets the level (and
//! optionally a timestamp) in front of it, not only the first one.

use crate::config;
use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt::{self, Write as _};
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

/// Width the level is right-aligned to
pub const LEVEL_PADDING: usize = 5;

/// Prefix every line of `message` with the level and optional timestamp.
///
/// ```
/// use boilerplate_logging::format::prefix_lines;
///
/// let out = prefix_lines("INFO", "first\nsecond", None);
/// assert_eq!(out, " INFO: first\n INFO: second");
/// ```
#[must_use]
pub fn prefix_lines(level: &str, message: &str, timestamp: Option<DateTime<Utc>>) -> String {
    let timestamp_prefix = timestamp
        .map(|ts| format!("{} ", ts.to_rfc3339_opts(SecondsFormat::Millis, true)))
        .unwrap_or_default();
    let level_prefix = format!("{level:>LEVEL_PADDING$}: ");
    message
        .split('\n')
        .map(|line| format!("{timestamp_prefix}{level_prefix}{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Event formatter applying [`prefix_lines`] to every event.
///
/// Span context is rendered as `span1:span2: ` in front of the message, the
/// same way the default formatter does.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrefixedFormat {
    with_target: bool,
}

impl PrefixedFormat {
    /// New formatter without targets
    #[must_use]
    pub const fn new() -> Self {
        Self { with_target: false }
    }

    /// Include the event target before the message
    #[must_use]
    pub const fn with_target(mut self, with_target: bool) -> Self {
        self.with_target = with_target;
        self
    }
}

impl<S, N> FormatEvent<S, N> for PrefixedFormat
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
        let metadata = event.metadata();
        let mut body = String::new();

        if let Some(scope) = ctx.event_scope() {
            for span in scope.from_root() {
                write!(body, "{}:", span.name())?;
            }
            if !body.is_empty() {
                body.push(' ');
            }
        }
        if self.with_target {
            write!(body, "{}: ", metadata.target())?;
        }
        ctx.format_fields(Writer::new(&mut body), event)?;

        let timestamp = config::config().timestamp.then(Utc::now);
        writeln!(
            writer,
            "{}",
            prefix_lines(metadata.level().as_str(), &body, timestamp)
        )
    }
}
