//! Sound output through rodio.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use rodio::source::{SineWave, Source};
use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink};

use super::AudioBackend;
use crate::error::PlaybackError;

const BEEP_FREQUENCY_HZ: f32 = 880.0;
const BEEP_DURATION: Duration = Duration::from_millis(150);
const BEEP_VOLUME: f32 = 0.3;

/// Default output device, opened lazily on first use.
#[derive(Default)]
pub struct RodioBackend {
    stream: Option<OutputStream>,
    melody: Option<Sink>,
}

impl RodioBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn stream(&mut self) -> Result<&OutputStream, PlaybackError> {
        self.init()?;
        self.stream
            .as_ref()
            .ok_or_else(|| PlaybackError::Init("output stream not open".into()))
    }
}

impl AudioBackend for RodioBackend {
    fn init(&mut self) -> Result<(), PlaybackError> {
        if self.stream.is_none() {
            let mut stream = OutputStreamBuilder::open_default_stream()
                .map_err(|e| PlaybackError::Init(e.to_string()))?;
            stream.log_on_drop(false);
            tracing::debug!("audio output opened");
            self.stream = Some(stream);
        }
        Ok(())
    }

    fn play_file(&mut self, path: &Path) -> Result<(), PlaybackError> {
        let load_failed = |message: String| PlaybackError::Load {
            path: path.to_path_buf(),
            message,
        };
        let file = File::open(path).map_err(|e| load_failed(e.to_string()))?;
        let source = Decoder::new(BufReader::new(file)).map_err(|e| load_failed(e.to_string()))?;

        let sink = Sink::connect_new(self.stream()?.mixer());
        sink.append(source);
        self.melody = Some(sink);
        Ok(())
    }

    fn is_playing(&self) -> bool {
        self.melody.as_ref().is_some_and(|sink| !sink.empty())
    }

    fn beep(&mut self) -> Result<(), PlaybackError> {
        let sink = Sink::connect_new(self.stream()?.mixer());
        sink.append(
            SineWave::new(BEEP_FREQUENCY_HZ)
                .take_duration(BEEP_DURATION)
                .amplify(BEEP_VOLUME),
        );
        sink.detach();
        Ok(())
    }
}
