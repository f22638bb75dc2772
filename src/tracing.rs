//! A tracing subscriber setup for simulation runs.
//!
//! Events raised while an activity is dispatched are nested in an
//! `activity` span carrying the activity name and the virtual time.
//! [`SimFormat`] prints that span chain in front of each message.

use nu_ansi_term::{Color, Style};
use tracing::{Level, Subscriber};
use tracing_subscriber::{
    filter::Directive,
    fmt::{format::Writer, FmtContext, FormatEvent, FormatFields, FormattedFields},
    registry::LookupSpan,
    util::{SubscriberInitExt, TryInitError},
    EnvFilter,
};

/// The log level that will be used if `RUST_LOG` is not defined.
pub const FALLBACK_LOG_LEVEL: Level = Level::INFO;

/// Create a new tracing subscriber with a sim formatter.
///
/// # Panics
///
/// Panics when subscriber initilization fails.
pub fn init() {
    subscriber().init();
}

/// Create a new tracing subscriber with a sim formatter, if
/// none is installed yet.
///
/// # Errors
///
/// Fails if a global subscriber was allready set.
pub fn try_init() -> Result<(), TryInitError> {
    subscriber().try_init()
}

fn subscriber() -> impl Subscriber + Send + Sync + 'static {
    let subscriber = tracing_subscriber::fmt();
    let subscriber = subscriber.event_format(format());
    let subscriber = subscriber.with_env_filter(
        EnvFilter::builder()
            .with_default_directive(Directive::from(FALLBACK_LOG_LEVEL))
            .from_env_lossy(),
    );
    subscriber.finish()
}

/// An instance of a simulation formatter.
#[must_use]
pub fn format() -> SimFormat {
    SimFormat { _priv: () }
}

/// A formatter that includes simulation specific information into the tracing messages.
#[derive(Debug)]
pub struct SimFormat {
    _priv: (),
}

macro_rules! maybe_ansi {
    ($style:ident, $ansi:ident, $writer:ident: $($t:tt)*) => {
        MaybeAnsi(format!($($t)*), $style, $ansi).write(&mut $writer)
    };
}

impl<S, N> FormatEvent<S, N> for SimFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let meta = event.metadata();
        let ansi = writer.has_ansi_escapes();

        let dimmed = Style::new().dimmed();
        let bold = Style::new().bold();

        let style = match *meta.level() {
            Level::TRACE => Style::new().fg(Color::Cyan),
            Level::DEBUG => Style::new().fg(Color::Purple),
            Level::INFO => Style::new().fg(Color::Green),
            Level::WARN => Style::new().fg(Color::Yellow),
            Level::ERROR => Style::new().fg(Color::Red),
        };
        maybe_ansi!(style, ansi, writer: "{:>5} ", meta.level().as_str())?;

        if let Some(scope) = ctx.event_scope() {
            let mut seen = false;
            for span in scope.from_root() {
                maybe_ansi!(bold, ansi, writer: "{}", span.metadata().name())?;
                seen = true;
                let ext = span.extensions();
                if let Some(fields) = &ext.get::<FormattedFields<N>>() {
                    if !fields.is_empty() {
                        maybe_ansi!(bold, ansi, writer: "{{")?;
                        write!(writer, "{fields}")?;
                        maybe_ansi!(bold, ansi, writer: "}}")?;
                    }
                }
                maybe_ansi!(dimmed, ansi, writer: ":")?;
            }

            if seen {
                writer.write_char(' ')?;
            }
        }

        maybe_ansi!(dimmed, ansi, writer: "{}: ", meta.target())?;

        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

struct MaybeAnsi(String, Style, bool);

impl MaybeAnsi {
    fn write(self, writer: &mut Writer<'_>) -> std::fmt::Result {
        if self.2 {
            write!(writer, "{}", self.1.prefix())?;
            write!(writer, "{}", self.0)?;
            write!(writer, "{}", self.1.suffix())
        } else {
            write!(writer, "{}", self.0)
        }
    }
}
