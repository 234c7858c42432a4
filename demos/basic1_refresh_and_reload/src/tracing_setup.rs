use tracing::Level;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;

pub fn tracing_init() -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    let subscriber = tracing_subscriber::fmt()
        .with_file(false)
        .with_line_number(false)
        .with_thread_names(false)
        .with_thread_ids(true)
        .with_target(false)
        .with_max_level(Level::DEBUG)
        .with_timer(ElapsedTime::default())
        .finish();
    tracing::subscriber::set_global_default(subscriber)
}

/// Prints wall-clock time plus the milliseconds since startup, which makes the
/// loading/refresh interleaving easy to follow.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ElapsedTime {
    start: chrono::DateTime<chrono::offset::Local>,
}

impl Default for ElapsedTime {
    fn default() -> Self {
        Self {
            start: chrono::Local::now(),
        }
    }
}

impl FormatTime for ElapsedTime {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = chrono::Local::now();
        let elapsed = now.signed_duration_since(self.start).num_milliseconds();
        write!(w, "{} +{:>5}ms", now.format("%H:%M:%S"), elapsed)
    }
}
