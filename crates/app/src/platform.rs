use std::{
    fmt, fs,
    io::Cursor,
    path::{Path, PathBuf},
    sync::{Arc, OnceLock},
    thread,
    time::{Duration, Instant},
};

use image::{imageops, imageops::FilterType, RgbaImage};
use monorail_core::{
    AssetKey, AudioClip, Platform, ReadyFlag, RenderSurface, SURFACE_HEIGHT, SURFACE_WIDTH,
};
use rodio::{mixer::Mixer, Decoder, OutputStream, OutputStreamBuilder, Sink, Source};

/// Host backed by the local filesystem. Every asset is decoded on its own
/// thread and flagged ready when done; a failed load simply never becomes
/// ready.
///
/// Clips play on the default output device. Without one, clips still track
/// their transport state but stay silent.
pub struct FsPlatform {
    surface_id: String,
    output: Option<OutputStream>,
}

impl FsPlatform {
    pub fn new(surface_id: impl Into<String>) -> Self {
        let output = match OutputStreamBuilder::open_default_stream() {
            Ok(mut stream) => {
                stream.log_on_drop(false);
                Some(stream)
            }
            Err(err) => {
                tracing::warn!(%err, "no audio output, clips will be silent");
                None
            }
        };
        Self {
            surface_id: surface_id.into(),
            output,
        }
    }

    #[cfg(test)]
    fn silent(surface_id: impl Into<String>) -> Self {
        Self {
            surface_id: surface_id.into(),
            output: None,
        }
    }
}

impl fmt::Debug for FsPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FsPlatform")
            .field("surface_id", &self.surface_id)
            .field("audio_output", &self.output.is_some())
            .finish()
    }
}

impl Platform for FsPlatform {
    type Image = LoadedImage;
    type Clip = WavClip;
    type Surface = FrameSurface;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn load_image(&mut self, key: &AssetKey, path: &Path, ready: ReadyFlag) -> LoadedImage {
        let slot = Arc::new(OnceLock::new());
        let target = Arc::clone(&slot);
        let key = key.to_string();
        let path = path.to_path_buf();

        thread::spawn(move || match image::open(&path) {
            Ok(decoded) => {
                let _ = target.set(decoded.to_rgba8());
                ready.mark_ready();
                tracing::debug!(%key, "image loaded");
            }
            Err(err) => tracing::warn!(%key, path = %path.display(), %err, "image failed to load"),
        });

        LoadedImage { slot }
    }

    fn load_clip(&mut self, key: &AssetKey, path: &Path, ready: ReadyFlag) -> WavClip {
        let data = Arc::new(OnceLock::new());
        let target = Arc::clone(&data);
        let name = key.to_string();
        let path = path.to_path_buf();
        let source = path.clone();

        thread::spawn(move || match read_clip(&source) {
            Ok(clip) => {
                let seconds = clip.seconds;
                let _ = target.set(clip);
                ready.mark_ready();
                tracing::debug!(clip = %name, seconds, "clip loaded");
            }
            Err(err) => {
                tracing::warn!(clip = %name, path = %source.display(), %err, "clip failed to load")
            }
        });

        let mixer = self.output.as_ref().map(|stream| stream.mixer().clone());
        WavClip::new(key.to_string(), path, data, mixer)
    }

    fn open_surface(&mut self, id: &str) -> Option<FrameSurface> {
        (id == self.surface_id).then(FrameSurface::new)
    }
}

/// Decoded RGBA pixels, filled in by the loader thread.
pub struct LoadedImage {
    slot: Arc<OnceLock<RgbaImage>>,
}

impl LoadedImage {
    fn pixels(&self) -> Option<&RgbaImage> {
        self.slot.get()
    }
}

impl fmt::Debug for LoadedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedImage")
            .field("loaded", &self.slot.get().is_some())
            .finish()
    }
}

/// Encoded WAV bytes, validated and measured with hound.
struct ClipData {
    bytes: Arc<[u8]>,
    seconds: f32,
}

#[derive(Debug)]
enum ClipError {
    Io(std::io::Error),
    Wav(hound::Error),
}

impl fmt::Display for ClipError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClipError::Io(err) => write!(f, "{err}"),
            ClipError::Wav(err) => write!(f, "{err}"),
        }
    }
}

fn read_clip(path: &Path) -> Result<ClipData, ClipError> {
    let bytes: Arc<[u8]> = fs::read(path).map_err(ClipError::Io)?.into();
    let reader =
        hound::WavReader::new(Cursor::new(Arc::clone(&bytes))).map_err(ClipError::Wav)?;
    let sample_rate = reader.spec().sample_rate.max(1);
    Ok(ClipData {
        seconds: reader.duration() as f32 / sample_rate as f32,
        bytes,
    })
}

/// One WAV clip. Each restart decodes the clip into a fresh rodio sink on
/// the shared mixer.
pub struct WavClip {
    name: String,
    path: PathBuf,
    data: Arc<OnceLock<ClipData>>,
    mixer: Option<Mixer>,
    sink: Option<Sink>,
    started: Option<Instant>,
    looping: bool,
}

impl WavClip {
    fn new(
        name: String,
        path: PathBuf,
        data: Arc<OnceLock<ClipData>>,
        mixer: Option<Mixer>,
    ) -> Self {
        Self {
            name,
            path,
            data,
            mixer,
            sink: None,
            started: None,
            looping: false,
        }
    }

    /// Whether the clip is still audible. One-shots finish on their own once
    /// their duration has passed.
    pub fn is_playing(&self) -> bool {
        if let Some(sink) = &self.sink {
            return !sink.is_paused() && !sink.empty();
        }
        let Some(started) = self.started else {
            return false;
        };
        if self.looping {
            return true;
        }
        match self.data.get() {
            Some(data) => started.elapsed().as_secs_f32() < data.seconds,
            None => false,
        }
    }

    fn open_sink(&self) -> Option<Sink> {
        let mixer = self.mixer.as_ref()?;
        let data = self.data.get()?;
        let decoder = match Decoder::new(Cursor::new(Arc::clone(&data.bytes))) {
            Ok(decoder) => decoder,
            Err(err) => {
                tracing::warn!(clip = %self.name, %err, "clip failed to decode");
                return None;
            }
        };

        let sink = Sink::connect_new(mixer);
        if self.looping {
            sink.append(decoder.repeat_infinite());
        } else {
            sink.append(decoder);
        }
        sink.play();
        Some(sink)
    }
}

impl fmt::Debug for WavClip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WavClip")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("loaded", &self.data.get().is_some())
            .field("playing", &self.is_playing())
            .field("looping", &self.looping)
            .finish()
    }
}

impl AudioClip for WavClip {
    fn restart(&mut self) {
        if let Some(previous) = self.sink.take() {
            previous.stop();
        }
        self.sink = self.open_sink();
        self.started = Some(Instant::now());
        tracing::info!(
            clip = %self.name,
            looping = self.looping,
            audible = self.sink.is_some(),
            "play"
        );
    }

    fn pause(&mut self) {
        if let Some(sink) = &self.sink {
            sink.pause();
        }
        if self.started.take().is_some() {
            tracing::info!(clip = %self.name, "stop");
        }
    }

    fn rewind(&mut self) {
        if let Some(sink) = &self.sink {
            if let Err(err) = sink.try_seek(Duration::ZERO) {
                tracing::debug!(clip = %self.name, %err, "rewind failed, dropping sink");
                self.sink = None;
            }
        }
        if self.started.is_some() {
            self.started = Some(Instant::now());
        }
    }

    fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }
}

/// The 640x480 frame the background is painted into.
#[derive(Debug)]
pub struct FrameSurface {
    frame: RgbaImage,
}

impl FrameSurface {
    fn new() -> Self {
        Self {
            frame: RgbaImage::new(SURFACE_WIDTH, SURFACE_HEIGHT),
        }
    }

    pub fn save(&self, path: &Path) -> image::ImageResult<()> {
        self.frame.save(path)
    }
}

impl RenderSurface for FrameSurface {
    type Image = LoadedImage;

    fn draw_background(&mut self, image: &LoadedImage) {
        let Some(pixels) = image.pixels() else {
            tracing::warn!("background drawn before it finished loading");
            return;
        };

        if pixels.dimensions() == (SURFACE_WIDTH, SURFACE_HEIGHT) {
            imageops::replace(&mut self.frame, pixels, 0, 0);
        } else {
            let scaled =
                imageops::resize(pixels, SURFACE_WIDTH, SURFACE_HEIGHT, FilterType::Triangle);
            imageops::replace(&mut self.frame, &scaled, 0, 0);
        }
    }
}
