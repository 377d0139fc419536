//! Background line reader.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::{normalize, ChordError, ChordSource};

/// Follows a line-oriented chord stream on its own thread.
///
/// Nothing runs until [`open`](ChordReader::open); [`close`](ChordReader::close)
/// (or drop) stops following.
pub struct ChordReader {
    current: Arc<RwLock<Option<String>>>,
    running: Arc<AtomicBool>,
    worker:  Option<JoinHandle<()>>,
}

impl ChordReader {
    pub fn new() -> Self {
        ChordReader {
            current: Arc::new(RwLock::new(None)),
            running: Arc::new(AtomicBool::new(false)),
            worker:  None,
        }
    }

    /// Start following `source`. Fails if a previous source is still being
    /// read.
    pub fn open<R>(&mut self, source: R) -> Result<(), ChordError>
    where
        R: BufRead + Send + 'static,
    {
        if self.is_running() {
            return Err(ChordError::AlreadyOpen);
        }
        // reap a reader that already hit end of input
        if let Some(done) = self.worker.take() {
            let _ = done.join();
        }

        // a detached reader from an earlier `close` keeps its own flag
        self.running = Arc::new(AtomicBool::new(true));
        let current = self.current.clone();
        let running = self.running.clone();
        let worker = thread::Builder::new()
            .name("chord-reader".into())
            .spawn(move || follow(source, &current, &running))
            .map_err(|e| {
                self.running.store(false, Ordering::Release);
                ChordError::Spawn(e)
            })?;
        self.worker = Some(worker);
        Ok(())
    }

    /// Open a file or character device (a serial tty configured
    /// beforehand, a named pipe, a recorded log).
    pub fn open_path(&mut self, path: &Path) -> Result<(), ChordError> {
        let file = File::open(path).map_err(|source| ChordError::Io {
            path: path.display().to_string(),
            source,
        })?;
        info!(path = %path.display(), "chord source connected");
        self.open(BufReader::new(file))
    }

    /// Stop following. The last chord read stays visible.
    ///
    /// A reader blocked on input that never arrives cannot be interrupted;
    /// its thread is detached and exits at its next line or end of input.
    pub fn close(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            if worker.is_finished() {
                let _ = worker.join();
            }
            info!("stopped reading chord input");
        }
    }

    /// Block until the current source is exhausted.
    pub fn join(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }

    /// True while a source is open and not yet exhausted.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
            && self.worker.as_ref().is_some_and(|w| !w.is_finished())
    }
}

impl Default for ChordReader {
    fn default() -> Self { Self::new() }
}

impl Drop for ChordReader {
    fn drop(&mut self) { self.close(); }
}

impl ChordSource for ChordReader {
    fn current_chord(&self) -> Option<String> {
        self.current.read().clone()
    }
}

fn follow<R: BufRead>(source: R, current: &RwLock<Option<String>>, running: &AtomicBool) {
    for line in source.lines() {
        if !running.load(Ordering::Acquire) {
            break;
        }
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                warn!(%e, "chord source read error");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        let chord = normalize(&line);
        let mut slot = current.write();
        if *slot != chord {
            info!(chord = chord.as_deref().unwrap_or(crate::NO_CHORD), "current chord");
            *slot = chord;
        }
    }
    running.store(false, Ordering::Release);
    debug!("chord source exhausted");
}
