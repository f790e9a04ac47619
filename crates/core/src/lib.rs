//! Core library for the Monorail timeline.
//!
//! A year slider drives a background image and a year-specific audio cue.
//! Each module owns one piece of that coordination: asset loading, audio
//! playback, pixel/year mapping, slider input, notification delivery and the
//! engine that ties them together. Rendering, audio output and asset I/O are
//! supplied by the host through the [`Platform`] trait.

pub mod assets;
pub mod audio;
pub mod config;
pub mod error;
pub mod events;
pub mod mapping;
pub mod render;
pub mod slider;
pub mod timeline;

#[cfg(test)]
pub(crate) mod testing;

pub use assets::{AssetEntry, AssetKey, AssetStore, ReadinessPolicy, ReadyFlag};
pub use audio::{AudioClip, AudioController, AudioPlayState};
pub use config::{AssetConfig, TimelineConfig, TrackConfig};
pub use error::{Result, TimelineError};
pub use events::{NotificationBus, YearListener, YearNotification, YearSink};
pub use mapping::{Year, YearMapper, END_YEAR, START_YEAR};
pub use render::{BackgroundLayer, RenderSurface, SURFACE_HEIGHT, SURFACE_WIDTH};
pub use slider::{ArrowKey, DragSession, PointerTarget, SliderController};
pub use timeline::{EngineState, Platform, TimelineEngine};
