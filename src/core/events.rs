use std::io::Write;
use std::sync::{Arc, Mutex};

use reelgrab_core::core::events::{EventEmitter, FetchProgress};

/// Writes every progress update as one JSON line. The CLI uses this on stdout
/// so a chat bridge can pick finished paths off the stream.
#[derive(Clone)]
pub struct JsonLinesEmitter {
    out: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl JsonLinesEmitter {
    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Arc::new(Mutex::new(out)),
        }
    }
}

impl EventEmitter for JsonLinesEmitter {
    fn emit_progress(&self, progress: &FetchProgress) {
        let line = match serde_json::to_string(progress) {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!("[events] could not serialize progress: {}", e);
                return;
            }
        };
        let Ok(mut out) = self.out.lock() else {
            return;
        };
        if let Err(e) = writeln!(out, "{}", line).and_then(|_| out.flush()) {
            tracing::warn!("[events] could not write progress: {}", e);
        }
    }
}

/// Keeps every update in memory.
#[cfg(test)]
#[derive(Clone, Default)]
pub struct RecordingEmitter {
    pub events: Arc<Mutex<Vec<FetchProgress>>>,
}

#[cfg(test)]
impl RecordingEmitter {
    pub fn statuses(&self) -> Vec<reelgrab_core::core::events::FetchStatus> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|p| p.status.clone())
            .collect()
    }
}

#[cfg(test)]
impl EventEmitter for RecordingEmitter {
    fn emit_progress(&self, progress: &FetchProgress) {
        self.events.lock().unwrap().push(progress.clone());
    }
}
