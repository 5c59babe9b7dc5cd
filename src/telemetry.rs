use tracing_subscriber::fmt::MakeWriter;

/// Service log subscriber writing to `writer`.
pub fn log_subscriber<W>(writer: W) -> impl tracing::Subscriber + Send + Sync + 'static
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_ansi(false)
        .finish()
}

/// Install the process-wide subscriber on stderr. Stdout carries the
/// `std_out` sink's JSON lines and nothing else.
pub fn init() -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    tracing::subscriber::set_global_default(log_subscriber(std::io::stderr))
}
