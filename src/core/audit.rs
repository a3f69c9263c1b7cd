//! Append-only audit trail for requests rejected by the route table.
//!
//! IP and key rejections are security failures and are not recorded here;
//! only the route-table miss produces an audit line. The sink is injectable
//! so tests can capture exact records, and a write failure is absorbed (with
//! a tracing warning) rather than failing the request.
use std::{
    fs::{File, OpenOptions},
    io::{self, Write},
    net::IpAddr,
    path::Path,
    sync::Mutex,
};

/// One rejected-by-route-table request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRecord {
    pub client_ip: IpAddr,
    pub method: String,
    pub path: String,
    /// Raw query string, empty when the request carried none.
    pub query: String,
    /// User-agent header value, empty when absent.
    pub user_agent: String,
}

impl AuditRecord {
    /// Render the record as a single log line (without timestamp).
    pub fn format(&self) -> String {
        format!(
            "ip={} method={} path=\"{}\" query=\"{}\" ua=\"{}\"",
            self.client_ip, self.method, self.path, self.query, self.user_agent
        )
    }
}

/// Destination for audit records. Implementations must be safe for
/// concurrent appends.
pub trait AuditSink: Send + Sync + 'static {
    fn append(&self, record: &AuditRecord) -> io::Result<()>;
}

/// Line-per-record file sink. Appends are serialized behind a mutex; the
/// file is opened in append mode at construction time.
pub struct FileAuditSink {
    file: Mutex<File>,
}

impl FileAuditSink {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl AuditSink for FileAuditSink {
    fn append(&self, record: &AuditRecord) -> io::Result<()> {
        let line = format!(
            "{} {}\n",
            chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            record.format()
        );
        let mut file = self
            .file
            .lock()
            .map_err(|_| io::Error::other("audit sink mutex poisoned"))?;
        file.write_all(line.as_bytes())?;
        file.flush()
    }
}

/// Front of the audit trail: formats and appends records, absorbing sink
/// failures so the rejection path never blocks on logging.
pub struct UnknownPathLogger {
    sink: Box<dyn AuditSink>,
}

impl UnknownPathLogger {
    pub fn new(sink: Box<dyn AuditSink>) -> Self {
        Self { sink }
    }

    /// Record one route-table rejection. Never fails.
    pub fn record(&self, record: &AuditRecord) {
        if let Err(e) = self.sink.append(record) {
            tracing::warn!(error = %e, "failed to write unknown-path audit record");
        }
    }
}
