//! # chord_source
//!
//! Where the current chord name comes from when a strum fires.
//!
//! The fretboard controller prints one chord name per line whenever the
//! fingering changes. [`ChordReader`] follows such a stream on a background
//! thread and keeps the latest name; the frame loop reads it without
//! blocking. [`FixedChord`] always answers the same chord, for playing
//! without a controller.
//!
//! ```
//! use chord_source::{ChordReader, ChordSource};
//! use std::io::Cursor;
//!
//! let mut reader = ChordReader::new();
//! reader.open(Cursor::new("G\nC\n")).unwrap();
//! reader.join();
//! assert_eq!(reader.current_chord().as_deref(), Some("C"));
//! ```

mod reader;

pub use reader::ChordReader;

use std::sync::Arc;

/// Name the controller sends when no chord is held.
pub const NO_CHORD: &str = "None";

/// A non-blocking view of the latest chord name.
pub trait ChordSource: Send + Sync {
    /// `None` when no chord is currently held or known.
    fn current_chord(&self) -> Option<String>;
}

impl<T: ChordSource + ?Sized> ChordSource for Arc<T> {
    fn current_chord(&self) -> Option<String> {
        (**self).current_chord()
    }
}

impl<T: ChordSource + ?Sized> ChordSource for Box<T> {
    fn current_chord(&self) -> Option<String> {
        (**self).current_chord()
    }
}

/// Map a raw controller line to a chord: trimmed, with `"None"` and blank
/// lines meaning no chord.
pub fn normalize(raw: &str) -> Option<String> {
    let name = raw.trim();
    if name.is_empty() || name == NO_CHORD {
        None
    } else {
        Some(name.to_string())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// FixedChord
// ════════════════════════════════════════════════════════════════════════════

/// Always the same chord.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FixedChord(Option<String>);

impl FixedChord {
    pub fn new(chord: &str) -> Self {
        FixedChord(normalize(chord))
    }

    pub fn none() -> Self {
        FixedChord(None)
    }
}

impl ChordSource for FixedChord {
    fn current_chord(&self) -> Option<String> {
        self.0.clone()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// ChordError
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, thiserror::Error)]
pub enum ChordError {
    #[error("cannot open chord source {path}: {source}")]
    Io {
        path:   String,
        #[source]
        source: std::io::Error,
    },

    #[error("chord reader is already running")]
    AlreadyOpen,

    #[error("cannot start chord reader thread: {0}")]
    Spawn(std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_rules() {
        assert_eq!(normalize("  Am \r"), Some("Am".to_string()));
        assert_eq!(normalize("None"), None);
        assert_eq!(normalize(""), None);
        assert_eq!(normalize("   "), None);
    }

    #[test]
    fn fixed_chord() {
        assert_eq!(FixedChord::new("D").current_chord().as_deref(), Some("D"));
        assert_eq!(FixedChord::new("None").current_chord(), None);
        assert_eq!(FixedChord::none().current_chord(), None);
    }

    #[test]
    fn shared_sources_delegate() {
        let src: Arc<dyn ChordSource> = Arc::new(FixedChord::new("E"));
        assert_eq!(src.current_chord().as_deref(), Some("E"));
        let boxed: Box<dyn ChordSource> = Box::new(src);
        assert_eq!(boxed.current_chord().as_deref(), Some("E"));
    }
}
