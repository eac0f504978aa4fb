use std::io::Write;
use std::path::Path;

use super::AudioBackend;
use crate::error::PlaybackError;

/// Fallback for builds without sound output: beeps ring the terminal bell,
/// melodies are unavailable.
#[derive(Debug, Default)]
pub struct TerminalBell;

impl TerminalBell {
    pub fn new() -> Self {
        Self
    }
}

fn ring(out: &mut impl Write) -> Result<(), PlaybackError> {
    out.write_all(b"\x07")
        .and_then(|()| out.flush())
        .map_err(|e| PlaybackError::Beep(e.to_string()))
}

impl AudioBackend for TerminalBell {
    fn init(&mut self) -> Result<(), PlaybackError> {
        Ok(())
    }

    fn play_file(&mut self, _path: &Path) -> Result<(), PlaybackError> {
        Err(PlaybackError::BackendUnavailable)
    }

    fn is_playing(&self) -> bool {
        false
    }

    fn beep(&mut self) -> Result<(), PlaybackError> {
        ring(&mut std::io::stderr())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ClosedTerminal;

    impl Write for ClosedTerminal {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn ring_writes_bel() {
        let mut out = Vec::new();
        ring(&mut out).unwrap();
        assert_eq!(out, b"\x07");
    }

    #[test]
    fn write_failure_is_a_beep_error() {
        assert!(matches!(ring(&mut ClosedTerminal), Err(PlaybackError::Beep(_))));
    }

    #[test]
    fn melodies_are_unavailable() {
        let mut bell = TerminalBell::new();
        assert!(matches!(
            bell.play_file(Path::new("tune.mp3")),
            Err(PlaybackError::BackendUnavailable)
        ));
        assert!(!bell.is_playing());
    }
}
