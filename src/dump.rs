//! Page dump sink, a debug aid.
//!
//! When enabled, every response body is written to one file per step so a
//! failing navigation can be inspected after the fact. The sink is injected
//! into the executor; the default implementation does nothing.

use std::path::PathBuf;

use tracing::warn;

pub trait PageDump {
    fn write(&self, step: &str, content: &str);
}

/// The default sink. Does nothing.
#[derive(Debug, Default)]
pub struct NoopDump;

impl PageDump for NoopDump {
    fn write(&self, _step: &str, _content: &str) {}
}

/// Writes each page into `dir`, one file per step. Write failures are logged
/// and never fail the check.
#[derive(Debug)]
pub struct DirDump {
    dir: PathBuf,
}

impl DirDump {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn file_name(step: &str) -> String {
        let sanitized: String = step
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        format!("{}.html", sanitized)
    }
}

impl PageDump for DirDump {
    fn write(&self, step: &str, content: &str) {
        let path = self.dir.join(Self::file_name(step));
        if let Err(e) = std::fs::create_dir_all(&self.dir)
            .and_then(|_| std::fs::write(&path, content))
        {
            warn!(step, path = %path.display(), "cannot dump page: {e}");
        }
    }
}
