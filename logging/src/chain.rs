//! Error cause-chain rendering.
//!
//! Walks an error and every `source()` below it and renders one diagnostic
//! string:
//!
//! ```text
//! failed to load user 42
//!    0: app::users::load
//!              at ./src/users.rs:12:5
//! [...]
//! Caused by: connection refused
//! ```
//!
//! Backtrace frames that belong to dependencies or the standard library are
//! noise when reading a service log, so runs of such frames collapse into a
//! single `[...]` line.

use std::backtrace::{Backtrace, BacktraceStatus};
use std::error::Error;

/// Line emitted in place of a run of collapsed frames
pub const COLLAPSED_MARKER: &str = "[...]";

/// Maximum number of causes rendered below the top-level error
pub const MAX_CAUSE_DEPTH: usize = 32;

/// Path fragments identifying frames outside the application
pub const DEFAULT_DEPENDENCY_MARKERS: &[&str] = &["/.cargo/registry/", "/.cargo/git/", "/rustc/"];

/// Iterator over an error and its sources
#[derive(Clone)]
pub struct Chain<'a> {
    next: Option<&'a (dyn Error + 'static)>,
}

impl<'a> Iterator for Chain<'a> {
    type Item = &'a (dyn Error + 'static);

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.source();
        Some(current)
    }
}

/// Iterate `err` followed by each of its sources.
#[must_use]
pub fn chain<'a>(err: &'a (dyn Error + 'static)) -> Chain<'a> {
    Chain { next: Some(err) }
}

/// Rendering options
#[derive(Debug, Clone)]
pub struct ChainOptions {
    /// Collapse runs of dependency frames in backtraces
    pub collapse_dependency_frames: bool,
    /// Path fragments marking a frame as a dependency frame
    pub markers: Vec<String>,
}

impl Default for ChainOptions {
    fn default() -> Self {
        Self {
            collapse_dependency_frames: true,
            markers: DEFAULT_DEPENDENCY_MARKERS
                .iter()
                .map(|m| (*m).to_string())
                .collect(),
        }
    }
}

impl ChainOptions {
    /// Options following the current runtime logging switches
    #[must_use]
    pub fn from_runtime() -> Self {
        Self {
            collapse_dependency_frames: crate::config::config().collapse_dependency_frames,
            ..Self::default()
        }
    }
}

/// One backtrace frame (symbol line plus its location lines) or a free line
struct Frame<'a> {
    lines: Vec<&'a str>,
    numbered: bool,
}

fn is_frame_start(line: &str) -> bool {
    let trimmed = line.trim_start();
    let digits = trimmed.chars().take_while(char::is_ascii_digit).count();
    digits > 0 && trimmed[digits..].starts_with(": ")
}

fn is_location_line(line: &str) -> bool {
    line.trim_start().starts_with("at ")
}

fn split_frames(text: &str) -> Vec<Frame<'_>> {
    let mut frames: Vec<Frame<'_>> = Vec::new();
    for line in text.split('\n') {
        if is_frame_start(line) {
            frames.push(Frame {
                lines: vec![line],
                numbered: true,
            });
        } else if is_location_line(line) && frames.last().is_some_and(|f| f.numbered) {
            if let Some(frame) = frames.last_mut() {
                frame.lines.push(line);
            }
        } else {
            frames.push(Frame {
                lines: vec![line],
                numbered: false,
            });
        }
    }
    frames
}

/// Collapse consecutive dependency frames into [`COLLAPSED_MARKER`].
///
/// A frame is the numbered symbol line of a backtrace followed by its
/// `at <path>` lines. Lines that are not part of a frame are matched
/// individually.
///
/// ```
/// use boilerplate_logging::chain::collapse_dependency_frames;
///
/// let text = "boom\n   0: app::run\n   1: tokio::rt\n             at /home/u/.cargo/registry/src/x.rs:1:1\n   2: main";
/// let out = collapse_dependency_frames(text, &["/.cargo/registry/"]);
/// assert_eq!(out, "boom\n   0: app::run\n[...]\n   2: main");
/// ```
#[must_use]
pub fn collapse_dependency_frames<M: AsRef<str>>(text: &str, markers: &[M]) -> String {
    let mut out: Vec<&str> = Vec::new();
    let mut in_dependencies = false;
    for frame in split_frames(text) {
        let noisy = frame
            .lines
            .iter()
            .any(|line| markers.iter().any(|m| line.contains(m.as_ref())));
        if noisy {
            if !in_dependencies {
                in_dependencies = true;
                out.push(COLLAPSED_MARKER);
            }
        } else {
            in_dependencies = false;
            out.extend(frame.lines);
        }
    }
    out.join("\n")
}

/// Render `err`, an optional backtrace, and the cause chain.
///
/// Causes repeating the previous message verbatim are skipped; wrappers
/// commonly forward their source's message unchanged.
#[must_use]
pub fn format_error_chain(
    err: &(dyn Error + 'static),
    backtrace: Option<&Backtrace>,
    options: &ChainOptions,
) -> String {
    let mut lines = vec![err.to_string()];

    if let Some(bt) = backtrace.filter(|bt| bt.status() == BacktraceStatus::Captured) {
        let rendered = bt.to_string();
        let rendered = rendered.trim_end();
        if options.collapse_dependency_frames {
            lines.push(collapse_dependency_frames(rendered, &options.markers));
        } else {
            lines.push(rendered.to_string());
        }
    }

    let mut previous = err.to_string();
    for (depth, cause) in chain(err).skip(1).enumerate() {
        if depth == MAX_CAUSE_DEPTH {
            lines.push(format!("Caused by: {COLLAPSED_MARKER}"));
            break;
        }
        let message = cause.to_string();
        if message != previous {
            lines.push(format!("Caused by: {message}"));
        }
        previous = message;
    }

    lines.join("\n")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::fmt;

    #[derive(Debug)]
    struct Layered {
        message: String,
        source: Option<Box<Layered>>,
    }

    impl Layered {
        fn new(messages: &[&str]) -> Self {
            let mut iter = messages.iter().rev();
            let mut current = Self {
                message: (*iter.next().unwrap()).to_string(),
                source: None,
            };
            for message in iter {
                current = Self {
                    message: (*message).to_string(),
                    source: Some(Box::new(current)),
                };
            }
            current
        }
    }

    impl fmt::Display for Layered {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(&self.message)
        }
    }

    impl Error for Layered {
        fn source(&self) -> Option<&(dyn Error + 'static)> {
            self.source.as_deref().map(|e| e as &(dyn Error + 'static))
        }
    }

    #[test]
    fn test_chain_walks_sources() {
        let err = Layered::new(&["top", "middle", "bottom"]);
        let messages: Vec<String> = chain(&err).map(ToString::to_string).collect();
        assert_eq!(messages, vec!["top", "middle", "bottom"]);
    }

    #[test]
    fn test_format_lists_causes() {
        let err = Layered::new(&["load failed", "query failed", "connection refused"]);
        let out = format_error_chain(&err, None, &ChainOptions::default());
        assert_eq!(
            out,
            "load failed\nCaused by: query failed\nCaused by: connection refused"
        );
    }

    #[test]
    fn test_repeated_messages_skipped() {
        let err = Layered::new(&["io error", "io error", "disk full"]);
        let out = format_error_chain(&err, None, &ChainOptions::default());
        assert_eq!(out, "io error\nCaused by: disk full");
    }

    #[test]
    fn test_depth_is_bounded() {
        let names: Vec<String> = (0..40).map(|i| format!("level {i}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let err = Layered::new(&refs);
        let out = format_error_chain(&err, None, &ChainOptions::default());
        let causes = out.lines().filter(|l| l.starts_with("Caused by:")).count();
        assert_eq!(causes, MAX_CAUSE_DEPTH + 1);
        assert!(out.ends_with("Caused by: [...]"));
    }

    #[test]
    fn test_collapse_merges_consecutive_frames() {
        let text = [
            "   0: app::handler",
            "             at ./src/handler.rs:10:5",
            "   1: hyper::proto::dispatch",
            "             at /home/u/.cargo/registry/src/hyper/src/proto.rs:1:1",
            "   2: tokio::runtime::park",
            "             at /home/u/.cargo/registry/src/tokio/src/park.rs:2:2",
            "   3: app::main",
            "             at ./src/main.rs:3:3",
            "   4: std::rt::lang_start",
            "             at /rustc/abc123/library/std/src/rt.rs:4:4",
        ]
        .join("\n");
        let out = collapse_dependency_frames(&text, DEFAULT_DEPENDENCY_MARKERS);
        assert_eq!(
            out,
            [
                "   0: app::handler",
                "             at ./src/handler.rs:10:5",
                "[...]",
                "   3: app::main",
                "             at ./src/main.rs:3:3",
                "[...]",
            ]
            .join("\n")
        );
    }

    #[test]
    fn test_collapse_keeps_unrelated_lines() {
        let text = "plain message\nsecond line";
        assert_eq!(
            collapse_dependency_frames(text, DEFAULT_DEPENDENCY_MARKERS),
            text
        );
    }

    #[test]
    fn test_disabled_backtrace_is_ignored() {
        let err = Layered::new(&["only"]);
        let bt = Backtrace::disabled();
        let out = format_error_chain(&err, Some(&bt), &ChainOptions::default());
        assert_eq!(out, "only");
    }
}
