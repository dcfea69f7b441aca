use crate::config::{LoggingConfig, Section};
use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::level_filters::LevelFilter;
use tracing::Level;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::{fmt, util::SubscriberInitExt, Layer};

use file_rotate::{
    compression::Compression,
    suffix::{AppendTimestamp, FileLimit},
    ContentLimit, FileRotate,
};

const DEFAULT_MAX_SIZE_MB: u64 = 100;

// ================= level helpers =================

fn parse_tracing_level(s: &str) -> Option<Level> {
    match s.to_ascii_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        "off" | "none" => None,
        _ => Some(Level::INFO),
    }
}

fn level_filter(s: &str) -> LevelFilter {
    parse_tracing_level(s)
        .map(LevelFilter::from_level)
        .unwrap_or(LevelFilter::OFF)
}

// ================= rotating file writer =================

#[derive(Clone)]
struct RotWriter(Arc<Mutex<FileRotate<AppendTimestamp>>>);

impl<'a> fmt::MakeWriter<'a> for RotWriter {
    type Writer = RotWriterHandle;
    fn make_writer(&'a self) -> Self::Writer {
        RotWriterHandle(self.0.clone())
    }
}

struct RotWriterHandle(Arc<Mutex<FileRotate<AppendTimestamp>>>);

impl Write for RotWriterHandle {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .write(buf)
    }
    fn flush(&mut self) -> std::io::Result<()> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .flush()
    }
}

fn resolve_log_path(file: &str, base_dir: &Path) -> PathBuf {
    let p = Path::new(file);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}

fn create_rotating_writer(section: &Section, base_dir: &Path) -> std::io::Result<RotWriter> {
    let log_path = resolve_log_path(&section.file, base_dir);
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Prefer MaxFiles if provided, else Age
    let limit = match section.max_backups {
        Some(n) => FileLimit::MaxFiles(n),
        None => FileLimit::Age(chrono::Duration::days(
            i64::from(section.max_age_days.unwrap_or(1)),
        )),
    };
    let max_bytes = section.max_size_mb.unwrap_or(DEFAULT_MAX_SIZE_MB) as usize * 1024 * 1024;

    let rot = FileRotate::new(
        log_path,
        AppendTimestamp::default(limit),
        ContentLimit::BytesSurpassed(max_bytes),
        Compression::None,
        None,
    );
    Ok(RotWriter(Arc::new(Mutex::new(rot))))
}

// ================= targets =================

/// Builds per-sink filters: the "default" section sets the fallback level,
/// every other key is a target prefix such as "modfile" or "modfile::v1".
fn build_targets(cfg: &LoggingConfig, level_of: fn(&Section) -> &str) -> Targets {
    let default_level = cfg
        .get("default")
        .map(|s| level_filter(level_of(s)))
        .unwrap_or(LevelFilter::WARN);

    cfg.iter()
        .filter(|(name, _)| name.as_str() != "default")
        .fold(Targets::new().with_default(default_level), |targets, (name, section)| {
            targets.with_target(name.clone(), level_filter(level_of(section)))
        })
}

// ================= public init =================

/// Installs the global subscriber: human-readable logs on stderr and, when
/// the "default" section names a file, JSON logs in a rotating file.
///
/// Relative log paths are resolved against `base_dir`. `RUST_LOG`, if set,
/// caps both sinks.
pub fn init_logging(cfg: &LoggingConfig, base_dir: &Path) {
    use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Registry};

    // Bridge `log` → `tracing` *before* installing the subscriber
    if let Err(e) = tracing_log::LogTracer::init() {
        eprintln!("LogTracer init skipped: {e}");
    }

    let env: Option<EnvFilter> = EnvFilter::try_from_default_env().ok();

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(true)
        .with_level(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_filter(build_targets(cfg, |s| s.console_level.as_str()));

    let file_writer = cfg
        .get("default")
        .filter(|s| !s.file.trim().is_empty())
        .and_then(|s| match create_rotating_writer(s, base_dir) {
            Ok(w) => Some(w),
            Err(e) => {
                eprintln!("Failed to initialize log file '{}': {e}", s.file);
                None
            }
        });

    let file_layer = file_writer.map(|writer| {
        fmt::layer()
            .json()
            .with_ansi(false)
            .with_target(true)
            .with_level(true)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_writer(writer)
            .with_filter(build_targets(cfg, |s| s.file_level.as_str()))
    });

    let _ = Registry::default()
        .with(env)
        .with(console_layer)
        .with(file_layer)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_logging_config;

    #[test]
    fn level_parsing() {
        assert_eq!(parse_tracing_level("DEBUG"), Some(Level::DEBUG));
        assert_eq!(parse_tracing_level("off"), None);
        assert_eq!(parse_tracing_level("bogus"), Some(Level::INFO));
        assert_eq!(level_filter("none"), LevelFilter::OFF);
    }

    #[test]
    fn targets_follow_sections() {
        let mut cfg = default_logging_config();
        cfg.insert(
            "modfile".to_string(),
            Section {
                console_level: "trace".to_string(),
                file: String::new(),
                file_level: "off".to_string(),
                max_age_days: None,
                max_backups: None,
                max_size_mb: None,
            },
        );

        let console = build_targets(&cfg, |s| s.console_level.as_str());
        assert!(console.would_enable("modfile::compiler", &Level::TRACE));
        assert!(console.would_enable("other", &Level::WARN));
        assert!(!console.would_enable("other", &Level::INFO));

        let file = build_targets(&cfg, |s| s.file_level.as_str());
        assert!(!file.would_enable("modfile", &Level::ERROR));
        assert!(file.would_enable("other", &Level::DEBUG));
    }

    #[test]
    fn relative_log_paths_use_base_dir() {
        let base = Path::new("/var/lib/modfile");
        assert_eq!(
            resolve_log_path("logs/a.log", base),
            PathBuf::from("/var/lib/modfile/logs/a.log")
        );
        assert_eq!(resolve_log_path("/tmp/b.log", base), PathBuf::from("/tmp/b.log"));
    }

    #[test]
    fn rotating_writer_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let mut section = default_logging_config().remove("default").unwrap();
        section.file = "nested/dir/modfile.log".to_string();

        let writer = create_rotating_writer(&section, dir.path()).unwrap();
        let mut handle = fmt::MakeWriter::make_writer(&writer);
        handle.write_all(b"hello\n").unwrap();
        handle.flush().unwrap();

        assert!(dir.path().join("nested/dir").is_dir());
    }
}
