//! The `edge.jsonl` sink.
//!
//! Every crate in the delivery pipeline logs through one registry, so the
//! queue driver task and host threads all end up writing to the same file.

use crate::json_layer::JsonLayer;
use crate::LogConfig;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// `~/.edge/logs/edge.jsonl`, or the system temp dir when there is no home.
fn default_log_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".edge")
        .join("logs")
        .join("edge.jsonl")
}

/// Handle to `edge.jsonl`. Clones share one buffer, and the lock is held
/// for a whole event line, so lines from the driver and the host never
/// interleave.
#[derive(Clone)]
pub(crate) struct EdgeLogFile {
    inner: Arc<Mutex<BufWriter<File>>>,
}

impl EdgeLogFile {
    /// Open for append, creating the `logs` directory on first run.
    pub(crate) fn open(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            inner: Arc::new(Mutex::new(BufWriter::with_capacity(8192, file))),
        })
    }
}

impl io::Write for EdgeLogFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self.inner.lock();
        let written = guard.write(buf)?;
        // JsonLayer hands over one complete event line per write.
        guard.flush()?;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.lock().flush()
    }
}

impl<'a> MakeWriter<'a> for EdgeLogFile {
    type Writer = EdgeLogFile;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Install the registry with the JSONL layer and the optional stderr layer.
///
/// If the log file cannot be opened the stderr layer is installed on its own.
pub fn init_jsonl_subscriber(config: &LogConfig) {
    let log_path = config.log_path.clone().unwrap_or_else(default_log_path);

    let json_layer = match EdgeLogFile::open(&log_path) {
        Ok(writer) => Some(
            JsonLayer::new(config.service_name.clone(), writer)
                .with_filter(env_filter(&config.default_level)),
        ),
        Err(e) => {
            eprintln!("observability: cannot open {}: {}", log_path.display(), e);
            None
        }
    };
    let file_enabled = json_layer.is_some();

    let stderr_layer = if config.also_stderr || !file_enabled {
        Some(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .compact()
                .with_writer(io::stderr)
                .with_filter(env_filter(&config.default_level)),
        )
    } else {
        None
    };

    let installed = tracing_subscriber::registry()
        .with(json_layer)
        .with(stderr_layer)
        .try_init();

    if installed.is_ok() && file_enabled {
        tracing::info!(log_path = %log_path.display(), service = %config.service_name, "logging initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use tempfile::tempdir;

    #[test]
    fn writer_appends_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logs").join("edge.jsonl");

        let mut writer = EdgeLogFile::open(&path).unwrap();
        writer.write_all(b"first\n").unwrap();
        writer.write_all(b"second\n").unwrap();

        let mut content = String::new();
        File::open(&path)
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "first\nsecond\n");
    }

    #[test]
    fn writer_reopen_keeps_existing_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("edge.jsonl");

        EdgeLogFile::open(&path)
            .unwrap()
            .write_all(b"one\n")
            .unwrap();
        EdgeLogFile::open(&path)
            .unwrap()
            .write_all(b"two\n")
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "one\ntwo\n");
    }

    #[test]
    fn clones_write_whole_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("edge.jsonl");
        let writer = EdgeLogFile::open(&path).unwrap();

        let threads: Vec<_> = (0..4)
            .map(|n| {
                let mut writer = writer.clone();
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        let line = format!("{{\"thread\":{}}}\n", n);
                        writer.write_all(line.as_bytes()).unwrap();
                    }
                })
            })
            .collect();
        for thread in threads {
            thread.join().unwrap();
        }

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 200);
        for line in lines {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            assert!(value["thread"].is_u64());
        }
    }

    #[test]
    fn default_path_is_under_edge_logs() {
        let path = default_log_path();
        assert!(path.ends_with(".edge/logs/edge.jsonl"));
    }
}
