use crate::{events::YearSink, Year, YearMapper};

/// Element a pointer press landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerTarget {
    /// The monorail handle; arms a drag.
    Handle,
    /// Anywhere else on the track; commits immediately.
    Track,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrowKey {
    Left,
    Right,
}

/// An active handle drag. It exists from press to release, and while it
/// exists pointer moves and releases are captured regardless of where they
/// happen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragSession {
    x: f64,
}

impl DragSession {
    fn begin(x: f64) -> Self {
        Self { x }
    }

    /// Last pointer position seen by the session.
    pub fn x(&self) -> f64 {
        self.x
    }

    fn update(&mut self, x: f64, mapper: &YearMapper) -> Year {
        self.x = x;
        mapper.year_from_x(x)
    }

    fn finish(self, x: f64, mapper: &YearMapper) -> Year {
        mapper.year_from_x(x)
    }
}

/// Turns pointer and keyboard input into year notifications.
///
/// The controller does not own the committed year; callers pass it in where
/// it is needed.
#[derive(Debug, Clone)]
pub struct SliderController {
    mapper: YearMapper,
    drag: Option<DragSession>,
}

impl SliderController {
    pub fn new(mapper: YearMapper) -> Self {
        Self { mapper, drag: None }
    }

    pub fn mapper(&self) -> &YearMapper {
        &self.mapper
    }

    pub fn drag(&self) -> Option<&DragSession> {
        self.drag.as_ref()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn pointer_down(&mut self, target: PointerTarget, x: f64, sink: &mut impl YearSink) {
        match target {
            PointerTarget::Handle => {
                if self.drag.is_some() {
                    tracing::debug!("replacing stale drag session");
                }
                self.drag = Some(DragSession::begin(x));
            }
            PointerTarget::Track => sink.commit(self.mapper.year_from_x(x).get()),
        }
    }

    /// Document-level pointer move. Ignored unless a drag is active.
    pub fn pointer_move(&mut self, x: f64, sink: &mut impl YearSink) {
        let Some(session) = self.drag.as_mut() else {
            return;
        };
        let year = session.update(x, &self.mapper);
        sink.slide(year.get());
    }

    /// Document-level pointer release. Ends the drag with a commit.
    pub fn pointer_up(&mut self, x: f64, sink: &mut impl YearSink) {
        let Some(session) = self.drag.take() else {
            return;
        };
        sink.commit(session.finish(x, &self.mapper).get());
    }

    /// Drops the drag without committing, e.g. when pointer capture is lost.
    pub fn cancel_drag(&mut self) -> bool {
        self.drag.take().is_some()
    }

    /// Steps the committed year. Auto-repeat events from a held key are
    /// ignored.
    pub fn key_down(
        &mut self,
        key: ArrowKey,
        repeat: bool,
        current: Year,
        sink: &mut impl YearSink,
    ) {
        if repeat {
            return;
        }
        let delta = match key {
            ArrowKey::Left => -1,
            ArrowKey::Right => 1,
        };
        sink.commit(Year::clamped(current.get() + delta).get());
    }

    /// Where the monorail handle sits: under the pointer while dragging,
    /// otherwise on the committed year's marker. `None` parks it off track.
    pub fn handle_x(&self, committed: Year) -> Option<f64> {
        match &self.drag {
            Some(session) => Some(session.x().clamp(self.mapper.left(), self.mapper.right())),
            None => self.mapper.year_x(committed),
        }
    }
}
