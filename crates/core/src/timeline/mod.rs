use std::{
    path::Path,
    time::{Duration, Instant},
};

use crate::{
    assets::{AssetKey, AssetStore, ReadyFlag},
    audio::{AudioClip, AudioController},
    config::{sanitize_timeout, TimelineConfig},
    events::{NotificationBus, YearListener, YearNotification, YearSink},
    render::{BackgroundLayer, RenderSurface},
    slider::{ArrowKey, PointerTarget, SliderController},
    Result, TimelineError, Year,
};

/// Everything the engine needs from its host: a clock, asset loading and the
/// drawing surface.
pub trait Platform {
    type Image;
    type Clip: AudioClip;
    type Surface: RenderSurface<Image = Self::Image>;

    fn now(&self) -> Instant;

    /// Starts loading an image. Raise `ready` once it can be drawn.
    fn load_image(&mut self, key: &AssetKey, path: &Path, ready: ReadyFlag) -> Self::Image;

    /// Starts loading a clip. Raise `ready` once it can be played.
    fn load_clip(&mut self, key: &AssetKey, path: &Path, ready: ReadyFlag) -> Self::Clip;

    fn open_surface(&mut self, id: &str) -> Option<Self::Surface>;
}

/// Loading lifecycle. `Ready` and `TimedOut` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Loading,
    Ready,
    TimedOut,
}

#[derive(Debug, Clone, Copy)]
struct ReadinessPoll {
    started: Instant,
    timeout: Duration,
    interval: Duration,
    next_check: Instant,
}

impl ReadinessPoll {
    fn start(now: Instant, timeout: Duration, interval: Duration) -> Self {
        Self {
            started: now,
            timeout,
            interval,
            next_check: now + interval,
        }
    }

    /// Returns the elapsed time when a check is due and schedules the next.
    fn due(&mut self, now: Instant) -> Option<Duration> {
        if now < self.next_check {
            return None;
        }
        while self.next_check <= now {
            self.next_check += self.interval;
        }
        Some(now.saturating_duration_since(self.started))
    }
}

/// Coordinates year selection, asset readiness, background and audio.
///
/// Input is forwarded by the host. The slider turns it into notifications
/// on the bus, and the engine delivers them to the background layer, the
/// audio controller and any subscribed observers.
pub struct TimelineEngine<P: Platform> {
    platform: P,
    config: TimelineConfig,
    state: EngineState,
    poll: Option<ReadinessPoll>,
    current_year: Year,
    slider: SliderController,
    bus: NotificationBus,
    background: BackgroundLayer<P::Image, P::Surface>,
    audio: AudioController<P::Clip>,
    observers: Vec<Box<dyn YearListener>>,
}

impl<P: Platform> TimelineEngine<P> {
    pub fn new(platform: P, config: TimelineConfig) -> Result<Self> {
        let slider = SliderController::new(config.mapper()?);
        let background = BackgroundLayer::new(AssetStore::images(&config.assets));
        let audio = AudioController::new(AssetStore::audio(&config.assets));

        Ok(Self {
            platform,
            current_year: config.start_year,
            config,
            state: EngineState::Loading,
            poll: None,
            slider,
            bus: NotificationBus::new(),
            background,
            audio,
            observers: Vec::new(),
        })
    }

    /// Opens the surface, starts loading every asset and arms the readiness
    /// poll. Unusable timeouts fall back to the default. Only the first call
    /// has any effect.
    pub fn initialize(&mut self, surface_id: &str, timeout_ms: Option<f64>, start_muted: bool) {
        if self.poll.is_some() || self.state != EngineState::Loading {
            tracing::warn!("timeline already initialised");
            return;
        }

        match self.platform.open_surface(surface_id) {
            Some(surface) => self.background.attach(surface),
            None => tracing::warn!(surface_id, "render surface not found"),
        }

        let platform = &mut self.platform;
        self.background
            .init(|key, path, ready| platform.load_image(key, path, ready));
        self.audio
            .init(|key, path, ready| platform.load_clip(key, path, ready));

        if start_muted && !self.audio.is_muted() {
            self.audio.toggle_mute();
        }

        let timeout = sanitize_timeout(timeout_ms);
        self.poll = Some(ReadinessPoll::start(
            self.platform.now(),
            timeout,
            self.config.poll_interval(),
        ));
        tracing::info!(
            surface_id,
            timeout_ms = timeout.as_millis() as u64,
            start_muted,
            "loading timeline assets"
        );
    }

    /// Runs the readiness check when one is due and returns the state.
    pub fn poll(&mut self) -> EngineState {
        if self.state != EngineState::Loading {
            return self.state;
        }
        let now = self.platform.now();
        let Some(poll) = self.poll.as_mut() else {
            return self.state;
        };
        let Some(elapsed) = poll.due(now) else {
            return self.state;
        };
        let timeout = poll.timeout;

        if self.background.is_ready() && self.audio.is_ready() {
            self.become_ready(elapsed);
        } else if elapsed >= timeout {
            self.state = EngineState::TimedOut;
            tracing::warn!(
                elapsed_ms = elapsed.as_millis() as u64,
                "timed out waiting for assets"
            );
        }
        self.state
    }

    fn become_ready(&mut self, elapsed: Duration) {
        self.state = EngineState::Ready;
        tracing::info!(elapsed_ms = elapsed.as_millis() as u64, "timeline ready");

        self.audio.loop_track(&AssetKey::background_loop());
        self.bus.commit(self.config.start_year.get());
        self.flush();
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == EngineState::Ready
    }

    pub fn is_timed_out(&self) -> bool {
        self.state == EngineState::TimedOut
    }

    /// Reports the load timeout as an error once it has happened.
    pub fn check(&self) -> Result<()> {
        match (self.state, &self.poll) {
            (EngineState::TimedOut, Some(poll)) => Err(TimelineError::LoadTimeout {
                timeout_ms: poll.timeout.as_millis() as u64,
            }),
            _ => Ok(()),
        }
    }

    pub fn current_year(&self) -> Year {
        self.current_year
    }

    /// Monorail position for the host to paint. `None` parks it off track.
    pub fn handle_x(&self) -> Option<f64> {
        self.slider.handle_x(self.current_year)
    }

    pub fn subscribe(&mut self, listener: impl YearListener + 'static) {
        self.observers.push(Box::new(listener));
    }

    pub fn pointer_down(&mut self, target: PointerTarget, x: f64) {
        if self.accepts_input() {
            self.slider.pointer_down(target, x, &mut self.bus);
            self.flush();
        }
    }

    pub fn pointer_move(&mut self, x: f64) {
        if self.accepts_input() {
            self.slider.pointer_move(x, &mut self.bus);
            self.flush();
        }
    }

    pub fn pointer_up(&mut self, x: f64) {
        if self.accepts_input() {
            self.slider.pointer_up(x, &mut self.bus);
            self.flush();
        }
    }

    /// Pointer capture lost mid-drag. Nothing is committed and the
    /// background returns to the committed year.
    pub fn pointer_cancel(&mut self) {
        if self.accepts_input() && self.slider.cancel_drag() {
            tracing::debug!(year = %self.current_year, "drag cancelled");
            self.background.show(self.current_year);
        }
    }

    pub fn key_down(&mut self, key: ArrowKey, repeat: bool) {
        if self.accepts_input() {
            self.slider
                .key_down(key, repeat, self.current_year, &mut self.bus);
            self.flush();
        }
    }

    /// Mute button. Unmuting brings the loop back.
    pub fn toggle_mute(&mut self) -> bool {
        let muted = self.audio.toggle_mute();
        if !muted && self.is_ready() {
            self.audio.loop_track(&AssetKey::background_loop());
        }
        muted
    }

    /// Replays the cue for the committed year.
    pub fn repeat_audio(&mut self) {
        if self.is_ready() {
            self.audio.play_year_cue(self.current_year);
        }
    }

    pub fn audio(&self) -> &AudioController<P::Clip> {
        &self.audio
    }

    pub fn background(&self) -> &BackgroundLayer<P::Image, P::Surface> {
        &self.background
    }

    pub fn slider(&self) -> &SliderController {
        &self.slider
    }

    pub fn config(&self) -> &TimelineConfig {
        &self.config
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    fn accepts_input(&self) -> bool {
        if self.state != EngineState::Ready {
            tracing::trace!(state = ?self.state, "ignoring input");
            return false;
        }
        true
    }

    fn flush(&mut self) {
        for notification in self.bus.take() {
            self.deliver(notification);
        }
    }

    fn deliver(&mut self, notification: YearNotification) {
        tracing::debug!(?notification, "year notification");
        if let YearNotification::Commit(year) = notification {
            self.current_year = year;
        }

        self.background.on_year(notification);
        self.audio.on_year(notification);
        for observer in &mut self.observers {
            observer.on_year(notification);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::*;
    use crate::{
        assets::AssetKey,
        testing::{FakePlatform, SURFACE_ID},
    };

    fn year(value: i32) -> AssetKey {
        AssetKey::Year(Year::clamped(value))
    }

    fn engine() -> (TimelineEngine<FakePlatform>, FakePlatform) {
        let platform = FakePlatform::default();
        let engine = TimelineEngine::new(platform.clone(), TimelineConfig::default()).unwrap();
        (engine, platform)
    }

    fn ready_engine(start_muted: bool) -> (TimelineEngine<FakePlatform>, FakePlatform) {
        let (mut engine, platform) = engine();
        engine.initialize(SURFACE_ID, Some(1_000.0), start_muted);
        platform.complete_all();
        platform.clock.advance(300);
        assert_eq!(engine.poll(), EngineState::Ready);
        platform.audio.clear();
        platform.surface.clear();
        (engine, platform)
    }

    #[test]
    fn times_out_when_assets_never_load() {
        let (mut engine, platform) = engine();
        engine.initialize(SURFACE_ID, Some(1.0), false);
        assert_eq!(engine.poll(), EngineState::Loading);

        platform.clock.advance(300);
        assert_eq!(engine.poll(), EngineState::TimedOut);
        assert!(engine.is_timed_out());
        assert!(!engine.is_ready());
        assert!(matches!(
            engine.check(),
            Err(TimelineError::LoadTimeout { timeout_ms: 1 })
        ));

        platform.complete_all();
        platform.clock.advance(300);
        assert_eq!(engine.poll(), EngineState::TimedOut);
        engine.key_down(ArrowKey::Right, false);
        assert!(platform.audio.calls().is_empty());
        assert!(platform.surface.drawn().is_empty());
    }

    #[test]
    fn keeps_loading_until_the_deadline() {
        let (mut engine, platform) = engine();
        engine.initialize(SURFACE_ID, Some(1_000.0), false);

        platform.clock.advance(900);
        assert_eq!(engine.poll(), EngineState::Loading);
        platform.clock.advance(100);
        assert_eq!(engine.poll(), EngineState::Loading);
        platform.clock.advance(200);
        assert_eq!(engine.poll(), EngineState::TimedOut);
    }

    #[test]
    fn checks_only_on_the_poll_interval() {
        let (mut engine, platform) = engine();
        engine.initialize(SURFACE_ID, Some(1_000.0), false);
        platform.complete_all();

        platform.clock.advance(299);
        assert_eq!(engine.poll(), EngineState::Loading);
        platform.clock.advance(1);
        assert_eq!(engine.poll(), EngineState::Ready);
    }

    #[test]
    fn malformed_timeout_uses_default() {
        let (mut engine, platform) = engine();
        engine.initialize(SURFACE_ID, Some(f64::NAN), false);
        platform.clock.advance(9_900);
        assert_eq!(engine.poll(), EngineState::Loading);
        platform.clock.advance(300);
        assert_eq!(engine.poll(), EngineState::TimedOut);
    }

    #[test]
    fn ready_starts_loop_and_shows_start_year() {
        let (mut engine, platform) = engine();
        engine.initialize(SURFACE_ID, Some(1_000.0), false);
        platform.complete_all();
        platform.clock.advance(300);
        engine.poll();

        assert_eq!(engine.audio().looping(), Some(&AssetKey::background_loop()));
        assert_eq!(
            platform.audio.restarts(),
            vec![AssetKey::background_loop(), year(1970)]
        );
        assert_eq!(platform.surface.drawn(), vec![year(1970)]);
        assert_eq!(engine.current_year(), Year::START);
        assert_eq!(engine.handle_x(), None);
    }

    #[test]
    fn audio_proxy_readiness_is_enough() {
        let (mut engine, platform) = engine();
        engine.initialize(SURFACE_ID, Some(1_000.0), false);
        platform.images.complete_all();
        platform.clips.complete(&AssetKey::background_loop());
        platform.clips.complete(&year(1970));
        platform.clock.advance(300);
        assert_eq!(engine.poll(), EngineState::Ready);
        assert!(engine.audio().clip(&year(1985)).is_some());
    }

    #[test]
    fn waits_for_the_start_year_clip() {
        let (mut engine, platform) = engine();
        engine.initialize(SURFACE_ID, Some(1_000.0), false);
        platform.images.complete_all();
        platform.clips.complete(&AssetKey::background_loop());
        for value in 1971..=1998 {
            platform.clips.complete(&year(value));
        }

        platform.clock.advance(300);
        assert_eq!(engine.poll(), EngineState::Loading);

        platform.clips.complete(&year(1970));
        platform.clock.advance(300);
        assert_eq!(engine.poll(), EngineState::Ready);
    }

    #[test]
    fn start_muted_stays_silent() {
        let (mut engine, platform) = ready_engine(true);
        assert!(engine.audio().is_muted());
        assert!(engine.audio().looping().is_none());

        engine.pointer_down(PointerTarget::Track, 61.0);
        assert!(platform.audio.restarts().is_empty());
        assert_eq!(platform.surface.last(), Some(year(1971)));

        assert!(!engine.toggle_mute());
        assert_eq!(engine.audio().looping(), Some(&AssetKey::background_loop()));
    }

    #[test]
    fn commit_of_start_year_has_no_ding() {
        let (mut engine, platform) = ready_engine(false);
        engine.key_down(ArrowKey::Right, false);
        platform.audio.clear();

        engine.key_down(ArrowKey::Left, false);
        assert_eq!(platform.audio.restarts(), vec![year(1970)]);
        assert_eq!(platform.surface.last(), Some(year(1970)));
    }

    #[test]
    fn commit_rings_ding_then_year_and_falls_back_for_image() {
        let (mut engine, platform) = ready_engine(false);
        engine.pointer_down(PointerTarget::Track, 61.0);

        assert_eq!(engine.current_year().get(), 1972);
        assert_eq!(platform.audio.restarts(), vec![AssetKey::ding(), year(1972)]);
        assert_eq!(platform.surface.drawn(), vec![year(1971)]);
    }

    #[test]
    fn dragging_updates_background_but_stays_silent_until_release() {
        let (mut engine, platform) = ready_engine(false);
        let mapper = *engine.slider().mapper();

        engine.pointer_down(PointerTarget::Handle, 40.0);
        for value in 1975..=1980 {
            let x = mapper.year_x(Year::clamped(value)).unwrap();
            engine.pointer_move(x);
        }

        assert!(platform.audio.calls().is_empty());
        assert_eq!(
            platform.surface.drawn(),
            vec![year(1975), year(1975), year(1977), year(1977), year(1979), year(1979)]
        );
        assert_eq!(engine.current_year(), Year::START);

        let x = mapper.year_x(Year::clamped(1980)).unwrap();
        engine.pointer_up(x);
        assert_eq!(platform.audio.restarts(), vec![AssetKey::ding(), year(1980)]);
        assert_eq!(engine.current_year().get(), 1980);
        assert_eq!(engine.handle_x(), Some(x));
    }

    #[test]
    fn cancelled_drag_restores_the_committed_year() {
        let (mut engine, platform) = ready_engine(false);
        engine.key_down(ArrowKey::Right, false);
        platform.audio.clear();
        platform.surface.clear();

        engine.pointer_down(PointerTarget::Handle, 61.0);
        engine.pointer_move(229.0);
        engine.pointer_cancel();
        assert!(!engine.slider().is_dragging());
        assert_eq!(platform.surface.drawn(), vec![year(1979), year(1971)]);

        engine.pointer_up(229.0);
        assert_eq!(engine.current_year().get(), 1971);
        assert_eq!(engine.handle_x(), Some(40.0));
        assert!(platform.audio.calls().is_empty());
    }

    #[test]
    fn timeout_error_reports_the_effective_deadline() {
        let (mut engine, platform) = engine();
        engine.initialize(SURFACE_ID, Some(-3.0), false);
        platform.clock.advance(10_200);
        assert_eq!(engine.poll(), EngineState::TimedOut);
        assert!(matches!(
            engine.check(),
            Err(TimelineError::LoadTimeout { timeout_ms: 10_000 })
        ));
    }

    #[test]
    fn held_arrow_keys_are_ignored() {
        let (mut engine, platform) = ready_engine(false);
        engine.key_down(ArrowKey::Right, false);
        engine.key_down(ArrowKey::Right, true);
        engine.key_down(ArrowKey::Right, true);
        assert_eq!(engine.current_year().get(), 1971);
        assert_eq!(platform.surface.drawn().len(), 1);
    }

    #[test]
    fn observers_see_every_notification() {
        let (mut engine, _platform) = ready_engine(false);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        engine.subscribe(move |note: YearNotification| sink.borrow_mut().push(note));

        engine.pointer_down(PointerTarget::Handle, 40.0);
        engine.pointer_move(103.0);
        engine.pointer_up(103.0);

        assert_eq!(
            *seen.borrow(),
            vec![
                YearNotification::Slide(1974),
                YearNotification::Commit(Year::clamped(1974)),
            ]
        );
    }

    #[test]
    fn input_before_ready_is_ignored() {
        let (mut engine, platform) = engine();
        engine.initialize(SURFACE_ID, Some(1_000.0), false);
        engine.pointer_down(PointerTarget::Track, 300.0);
        assert_eq!(engine.current_year(), Year::START);
        assert!(platform.surface.drawn().is_empty());
    }

    #[test]
    fn repeat_audio_replays_current_cue() {
        let (mut engine, platform) = ready_engine(false);
        engine.key_down(ArrowKey::Right, false);
        platform.audio.clear();

        engine.repeat_audio();
        assert_eq!(platform.audio.restarts(), vec![AssetKey::ding(), year(1971)]);
    }

    #[test]
    fn second_initialize_is_ignored() {
        let (mut engine, platform) = engine();
        engine.initialize(SURFACE_ID, Some(1_000.0), false);
        let requested = platform.requested();
        assert_eq!(requested, 16 + 31);
        engine.initialize(SURFACE_ID, Some(5.0), true);
        assert_eq!(platform.requested(), requested);
        assert!(!engine.audio().is_muted());
    }

    #[test]
    fn unknown_surface_still_reaches_ready() {
        let (mut engine, platform) = engine();
        engine.initialize("missing", Some(1_000.0), false);
        platform.complete_all();
        platform.clock.advance(300);
        assert_eq!(engine.poll(), EngineState::Ready);
        assert!(engine.background().surface().is_none());
        assert!(platform.surface.drawn().is_empty());
        assert_eq!(engine.background().shown(), Some(Year::START));
    }
}
