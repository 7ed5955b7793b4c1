//! Daemon core
//!
//! Ties the pieces together: compile the extraction script once at
//! startup, then poll the capture device, decode each beacon frame, run
//! the script over it, and record the result in the per-network
//! fingerprint table. A fingerprint that differs from every stored one
//! for the same network is the signal this daemon exists for.

use crate::daemon::capture::CaptureSource;
use crate::daemon::config::DaemonConfig;
use crate::daemon::store::{FingerprintStore, FingerprintTable, CREATION_DATE_COLUMN};
use crate::frame::Frame;
use crate::script::{Compiler, ExecutableTree};
use crate::{ApWatchError, Result};

use std::fs;
use std::time::Duration;
use tokio::time::interval;
use tracing::{debug, info, warn};

/// Daemon lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonState {
    /// Created, not yet polling
    Initializing,
    /// Polling the capture device
    Running,
}

/// Daemon statistics.
#[derive(Debug, Clone, Default)]
pub struct DaemonStats {
    /// Frames decoded and evaluated
    pub frames_processed: u64,
    /// Frames skipped (no data, or no network name)
    pub frames_skipped: u64,
    /// Fingerprints recorded for the first time
    pub fingerprints_new: u64,
    /// Fingerprints matching a stored entry
    pub fingerprints_seen: u64,
    /// Processing errors observed
    pub error_count: u64,
    /// Last error message
    pub last_error: Option<String>,
}

/// The watcher daemon.
#[derive(Debug)]
pub struct Daemon {
    config: DaemonConfig,
    tree: ExecutableTree,
    store: FingerprintStore,
    capture: CaptureSource,
    state: DaemonState,
    stats: DaemonStats,
    /// Table for the network seen most recently, kept open across polls.
    current: Option<(String, FingerprintTable)>,
}

impl Daemon {
    /// Build a daemon from its configuration. The script is read and
    /// compiled here, so a broken script fails startup rather than the
    /// first poll.
    pub fn new(config: DaemonConfig) -> Result<Self> {
        config.validate()?;

        let script_text = fs::read_to_string(&config.script.path).map_err(|e| {
            ApWatchError::Config(format!(
                "Failed to read script {}: {}",
                config.script.path.display(),
                e
            ))
        })?;
        let tree = Compiler::new(&script_text).compile()?;

        let script_name = config
            .script
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "script".to_string());
        let store = FingerprintStore::new(&config.store.root, &script_name, &script_text);
        let capture = CaptureSource::new(&config.capture.device, config.capture.max_frame_size);

        info!(script = %config.script.path.display(), "Compiled extraction script");
        info!("Extraction tree:\n{}", tree.render());

        Ok(Self {
            config,
            tree,
            store,
            capture,
            state: DaemonState::Initializing,
            stats: DaemonStats::default(),
            current: None,
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> DaemonState {
        self.state
    }

    /// Statistics so far.
    pub fn stats(&self) -> &DaemonStats {
        &self.stats
    }

    /// Poll loop. Per-frame failures are counted and logged, never fatal.
    pub async fn run(&mut self) -> Result<()> {
        self.state = DaemonState::Running;
        info!(
            device = %self.config.capture.device.display(),
            store = %self.store.directory().display(),
            interval_ms = self.config.capture.poll_interval_ms,
            "Daemon running"
        );

        let mut ticker = interval(Duration::from_millis(self.config.capture.poll_interval_ms));
        loop {
            ticker.tick().await;
            if let Err(e) = self.process_once().await {
                self.stats.error_count += 1;
                self.stats.last_error = Some(e.to_string());
                warn!(error = %e, "Frame processing failed");
            }
        }
    }

    /// One poll: capture, decode, evaluate, record. Returns `true` when a
    /// fingerprint was recorded or refreshed.
    pub async fn process_once(&mut self) -> Result<bool> {
        let raw = match self.capture.read_frame().await? {
            Some(raw) => raw,
            None => {
                self.stats.frames_skipped += 1;
                return Ok(false);
            }
        };

        let mut frame = Frame::new();
        frame.set_raw_data(raw);
        frame.decode()?;

        let output = self.tree.evaluate(&frame)?;
        self.stats.frames_processed += 1;

        let ssid = frame.get_value("0")?;
        if ssid.is_null() {
            debug!("Frame carries no network name, skipped");
            self.stats.frames_skipped += 1;
            return Ok(false);
        }
        let ssid = ssid.to_text_string()?;

        let table = self.table_for(&ssid)?;
        match table.lookup(&output) {
            Some(row) => {
                table.refresh_entry(row)?;
                self.stats.fingerprints_seen += 1;
                debug!(ssid = %ssid, "Known fingerprint refreshed");
            }
            None => {
                let known_before = !table.is_empty();
                table.add_entry(&output)?;
                self.stats.fingerprints_new += 1;
                if known_before {
                    warn!(
                        ssid = %ssid,
                        fingerprint = %output,
                        "Network fingerprint changed, possible rogue access point"
                    );
                } else {
                    info!(ssid = %ssid, fingerprint = %output, "New access point recorded");
                }
            }
        }

        Ok(true)
    }

    /// First time a fingerprint for `ssid` was recorded, if any.
    pub fn first_seen(&mut self, ssid: &str, output: &str) -> Result<Option<String>> {
        let table = self.table_for(ssid)?;
        match table.lookup(output) {
            Some(row) => Ok(Some(table.get_cell(row, CREATION_DATE_COLUMN)?.to_string())),
            None => Ok(None),
        }
    }

    fn table_for(&mut self, ssid: &str) -> Result<&mut FingerprintTable> {
        let reopen = match &self.current {
            Some((current, _)) => current != ssid,
            None => true,
        };
        if reopen {
            let table = self.store.open_table(ssid)?;
            self.current = Some((ssid.to_string(), table));
        }
        Ok(&mut self.current.as_mut().unwrap().1)
    }
}
