use std::path::Path;

use crate::{
    assets::{AssetKey, AssetStore, ReadyFlag},
    events::{YearListener, YearNotification},
    Year,
};

/// Playback hardware for a single loaded clip.
pub trait AudioClip {
    /// Seeks to the beginning and starts playing.
    fn restart(&mut self);
    fn pause(&mut self);
    /// Resets the playback position without changing play/pause state.
    fn rewind(&mut self);
    fn set_looping(&mut self, looping: bool);
}

/// One-shot keys in play order plus the single looping key.
///
/// A key held in `looping` is never on the `playing` stack.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AudioPlayState {
    playing: Vec<AssetKey>,
    looping: Option<AssetKey>,
}

impl AudioPlayState {
    pub fn playing(&self) -> &[AssetKey] {
        &self.playing
    }

    pub fn looping(&self) -> Option<&AssetKey> {
        self.looping.as_ref()
    }
}

/// Play/loop/stop/mute semantics on top of the audio [`AssetStore`].
///
/// Overlapping one-shots are tracked on a stack so `stop()` without a key
/// halts the most recent one. At most one key loops at a time. While muted,
/// `play` and `loop_track` are dropped rather than queued.
#[derive(Debug)]
pub struct AudioController<C> {
    store: AssetStore<C>,
    state: AudioPlayState,
    muted: bool,
}

impl<C: AudioClip> AudioController<C> {
    pub fn new(store: AssetStore<C>) -> Self {
        Self {
            store,
            state: AudioPlayState::default(),
            muted: false,
        }
    }

    /// Starts loading every clip. See [`AssetStore::init`].
    pub fn init<F>(&mut self, loader: F)
    where
        F: FnMut(&AssetKey, &Path, ReadyFlag) -> C,
    {
        self.store.init(loader);
    }

    /// Delegates to the store, which only checks the loop track and the
    /// earliest year's clip.
    pub fn is_ready(&self) -> bool {
        self.store.is_ready()
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn state(&self) -> &AudioPlayState {
        &self.state
    }

    pub fn playing(&self) -> &[AssetKey] {
        self.state.playing()
    }

    pub fn looping(&self) -> Option<&AssetKey> {
        self.state.looping()
    }

    pub fn clip(&self, key: &AssetKey) -> Option<&C> {
        self.store.get(key).map(|entry| entry.handle())
    }

    /// Plays `key` once from the beginning.
    pub fn play(&mut self, key: &AssetKey) {
        if self.muted {
            tracing::trace!(%key, "muted, dropping play");
            return;
        }
        if self.state.looping.as_ref() == Some(key) {
            tracing::debug!(%key, "clip is looping, ignoring one-shot play");
            return;
        }
        let Some(entry) = self.store.get_mut(key) else {
            tracing::warn!(%key, "no such audio clip");
            return;
        };

        entry.handle_mut().restart();
        self.state.playing.retain(|playing| playing != key);
        self.state.playing.push(key.clone());
    }

    /// Loops `key` indefinitely, replacing any other loop.
    pub fn loop_track(&mut self, key: &AssetKey) {
        if self.muted {
            tracing::trace!(%key, "muted, dropping loop");
            return;
        }
        if self.state.looping.as_ref() == Some(key) {
            return;
        }
        if self.store.get(key).is_none() {
            tracing::warn!(%key, "no such audio clip");
            return;
        }

        self.stop_loop();
        self.state.playing.retain(|playing| playing != key);
        if let Some(entry) = self.store.get_mut(key) {
            let clip = entry.handle_mut();
            clip.set_looping(true);
            clip.restart();
        }
        tracing::debug!(%key, "loop started");
        self.state.looping = Some(key.clone());
    }

    /// Halts `key`, or the most recently played one-shot when `key` is
    /// `None`. Does nothing when the stack is empty.
    pub fn stop(&mut self, key: Option<&AssetKey>) {
        let key = match key {
            Some(key) => {
                if self.state.looping.as_ref() == Some(key) {
                    return;
                }
                self.state.playing.retain(|playing| playing != key);
                key.clone()
            }
            None => match self.state.playing.pop() {
                Some(key) => key,
                None => return,
            },
        };

        if let Some(entry) = self.store.get_mut(&key) {
            halt(entry.handle_mut());
        }
    }

    /// Empties the play stack. The loop keeps running.
    pub fn stop_all(&mut self) {
        while !self.state.playing.is_empty() {
            self.stop(None);
        }
    }

    pub fn stop_loop(&mut self) {
        if let Some(key) = self.state.looping.take() {
            if let Some(entry) = self.store.get_mut(&key) {
                halt(entry.handle_mut());
            }
            tracing::debug!(%key, "loop stopped");
        }
    }

    /// Flips the mute flag and returns the new value. Muting silences
    /// everything; unmuting restarts nothing.
    pub fn toggle_mute(&mut self) -> bool {
        self.muted = !self.muted;
        if self.muted {
            self.stop_all();
            self.stop_loop();
        }
        tracing::info!(muted = self.muted, "mute toggled");
        self.muted
    }

    /// Announces `year`: rings the transition ding for any year past the
    /// start, then plays the year's own clip. Earlier one-shots keep playing.
    pub fn play_year_cue(&mut self, year: Year) {
        if !year.is_start() {
            self.play(&AssetKey::ding());
        }
        self.play(&AssetKey::Year(year));
    }
}

/// Only commits are audible; slides would spam clips during a drag.
impl<C: AudioClip> YearListener for AudioController<C> {
    fn on_year(&mut self, notification: YearNotification) {
        if let YearNotification::Commit(year) = notification {
            self.play_year_cue(year);
        }
    }
}

fn halt<C: AudioClip>(clip: &mut C) {
    clip.pause();
    clip.rewind();
    clip.set_looping(false);
}
