//! Logging setup for the binaries.
//!
//! Console output always; a daily-rolling file appender is added when
//! `KOLRL_LOG_DIR` (or `LOG_DIR`) names a writable directory.

use tracing_subscriber::EnvFilter;

/// Full logging: env-filtered console plus optional rolling file.
pub fn init_logging() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,kolrl=debug"));

    let log_dir = std::env::var("KOLRL_LOG_DIR").or_else(|_| std::env::var("LOG_DIR")).ok();

    // `tracing_appender::rolling::daily` panics if it cannot create the
    // initial log file, so writability is checked up front.
    let file_layer = log_dir.and_then(|dir| {
        if std::fs::create_dir_all(&dir).is_err() {
            eprintln!("warning: cannot create log directory {dir}, file logging disabled");
            return None;
        }
        let test_path = std::path::Path::new(&dir).join(".kolrl_write_test");
        match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&test_path)
        {
            Ok(_) => {
                let _ = std::fs::remove_file(&test_path);

                let file_appender = tracing_appender::rolling::daily(&dir, "kolrl.log");
                let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

                // Keep the guard alive for the life of the process.
                Box::leak(Box::new(guard));

                Some(
                    tracing_subscriber::fmt::layer()
                        .with_writer(non_blocking)
                        .with_ansi(false)
                        .with_target(true),
                )
            }
            Err(e) => {
                eprintln!("warning: log directory {dir} not writable ({e}), file logging disabled");
                None
            }
        }
    });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .try_init();
}

/// Minimal logging for short-lived CLI commands.
pub fn init_logging_simple() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .try_init();
}
