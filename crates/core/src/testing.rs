//! Test doubles shared by the unit tests.

use std::{
    cell::{Cell, RefCell},
    path::Path,
    rc::Rc,
    time::{Duration, Instant},
};

use crate::{
    assets::{AssetKey, ReadyFlag},
    audio::AudioClip,
    render::RenderSurface,
    timeline::Platform,
};

/// Loader that never completes on its own; tests raise flags explicitly.
#[derive(Debug, Clone, Default)]
pub(crate) struct ManualLoader {
    flags: Rc<RefCell<Vec<(AssetKey, ReadyFlag)>>>,
}

impl ManualLoader {
    pub fn track(&self, key: &AssetKey, ready: ReadyFlag) {
        self.flags.borrow_mut().push((key.clone(), ready));
    }

    pub fn callback(&self) -> impl FnMut(&AssetKey, &Path, ReadyFlag) -> String {
        self.callback_with(|_: &AssetKey, path: &Path| path.display().to_string())
    }

    pub fn callback_with<H>(
        &self,
        mut make: impl FnMut(&AssetKey, &Path) -> H,
    ) -> impl FnMut(&AssetKey, &Path, ReadyFlag) -> H {
        let loader = self.clone();
        move |key: &AssetKey, path: &Path, ready: ReadyFlag| {
            loader.track(key, ready);
            make(key, path)
        }
    }

    pub fn requested(&self) -> Vec<AssetKey> {
        self.flags.borrow().iter().map(|(key, _)| key.clone()).collect()
    }

    pub fn complete(&self, key: &AssetKey) {
        for (tracked, ready) in self.flags.borrow().iter() {
            if tracked == key {
                ready.mark_ready();
            }
        }
    }

    pub fn complete_all(&self) {
        for (_, ready) in self.flags.borrow().iter() {
            ready.mark_ready();
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ClipCall {
    Restart,
    Pause,
    Rewind,
    Looping(bool),
}

/// Every clip call in order, across all clips.
#[derive(Debug, Clone, Default)]
pub(crate) struct AudioLog(Rc<RefCell<Vec<(AssetKey, ClipCall)>>>);

impl AudioLog {
    fn record(&self, key: &AssetKey, call: ClipCall) {
        self.0.borrow_mut().push((key.clone(), call));
    }

    pub fn calls(&self) -> Vec<(AssetKey, ClipCall)> {
        self.0.borrow().clone()
    }

    pub fn contains(&self, key: &AssetKey, call: ClipCall) -> bool {
        self.0
            .borrow()
            .iter()
            .any(|(logged, logged_call)| logged == key && *logged_call == call)
    }

    /// Keys that were started, in order.
    pub fn restarts(&self) -> Vec<AssetKey> {
        self.0
            .borrow()
            .iter()
            .filter(|(_, call)| *call == ClipCall::Restart)
            .map(|(key, _)| key.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

#[derive(Debug)]
pub(crate) struct FakeClip {
    key: AssetKey,
    log: AudioLog,
    pub playing: bool,
    pub looping: bool,
}

impl FakeClip {
    pub fn new(key: AssetKey, log: AudioLog) -> Self {
        Self {
            key,
            log,
            playing: false,
            looping: false,
        }
    }

    pub fn factory(log: &AudioLog) -> impl FnMut(&AssetKey, &Path) -> FakeClip {
        let log = log.clone();
        move |key: &AssetKey, _: &Path| FakeClip::new(key.clone(), log.clone())
    }
}

impl AudioClip for FakeClip {
    fn restart(&mut self) {
        self.playing = true;
        self.log.record(&self.key, ClipCall::Restart);
    }

    fn pause(&mut self) {
        self.playing = false;
        self.log.record(&self.key, ClipCall::Pause);
    }

    fn rewind(&mut self) {
        self.log.record(&self.key, ClipCall::Rewind);
    }

    fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
        self.log.record(&self.key, ClipCall::Looping(looping));
    }
}

/// Records which image keys were drawn.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeSurface {
    drawn: Rc<RefCell<Vec<AssetKey>>>,
}

impl FakeSurface {
    pub fn drawn(&self) -> Vec<AssetKey> {
        self.drawn.borrow().clone()
    }

    pub fn last(&self) -> Option<AssetKey> {
        self.drawn.borrow().last().cloned()
    }

    pub fn clear(&self) {
        self.drawn.borrow_mut().clear();
    }
}

impl RenderSurface for FakeSurface {
    type Image = AssetKey;

    fn draw_background(&mut self, image: &AssetKey) {
        self.drawn.borrow_mut().push(image.clone());
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ManualClock(Rc<Cell<Instant>>);

impl ManualClock {
    pub fn advance(&self, millis: u64) {
        self.0.set(self.0.get() + Duration::from_millis(millis));
    }

    pub fn now(&self) -> Instant {
        self.0.get()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self(Rc::new(Cell::new(Instant::now())))
    }
}

/// Platform whose time, loads and outputs are all driven by the test.
/// Clones share state, so a test keeps one clone and hands the other to the
/// engine. Image and clip loads are tracked apart since both stores use the
/// same year keys.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakePlatform {
    pub clock: ManualClock,
    pub images: ManualLoader,
    pub clips: ManualLoader,
    pub audio: AudioLog,
    pub surface: FakeSurface,
}

impl FakePlatform {
    pub fn complete_all(&self) {
        self.images.complete_all();
        self.clips.complete_all();
    }

    pub fn requested(&self) -> usize {
        self.images.requested().len() + self.clips.requested().len()
    }
}

pub(crate) const SURFACE_ID: &str = "timeline";

impl Platform for FakePlatform {
    type Image = AssetKey;
    type Clip = FakeClip;
    type Surface = FakeSurface;

    fn now(&self) -> Instant {
        self.clock.now()
    }

    fn load_image(&mut self, key: &AssetKey, _path: &Path, ready: ReadyFlag) -> AssetKey {
        self.images.track(key, ready);
        key.clone()
    }

    fn load_clip(&mut self, key: &AssetKey, _path: &Path, ready: ReadyFlag) -> FakeClip {
        self.clips.track(key, ready);
        FakeClip::new(key.clone(), self.audio.clone())
    }

    fn open_surface(&mut self, id: &str) -> Option<FakeSurface> {
        (id == SURFACE_ID).then(|| self.surface.clone())
    }
}
