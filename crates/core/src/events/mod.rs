use std::collections::VecDeque;

use crate::Year;

/// Year change broadcast to every subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YearNotification {
    /// Finalised selection. Always inside the timeline range.
    Commit(Year),
    /// Provisional value while dragging. Not range checked; listeners clamp
    /// for their own display.
    Slide(i32),
}

/// Narrow capability handed to input handling: the right to announce years.
pub trait YearSink {
    fn commit(&mut self, year: i32);
    fn slide(&mut self, year: i32);
}

/// Receives notifications. Listeners must not rely on being called before
/// or after any other listener.
pub trait YearListener {
    fn on_year(&mut self, notification: YearNotification);
}

impl<F> YearListener for F
where
    F: FnMut(YearNotification),
{
    fn on_year(&mut self, notification: YearNotification) {
        self(notification)
    }
}

/// Queue of notifications waiting to be delivered.
#[derive(Debug, Default)]
pub struct NotificationBus {
    pending: VecDeque<YearNotification>,
}

impl NotificationBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Removes and returns everything queued so far, oldest first.
    pub fn take(&mut self) -> Vec<YearNotification> {
        self.pending.drain(..).collect()
    }
}

impl YearSink for NotificationBus {
    fn commit(&mut self, year: i32) {
        self.pending
            .push_back(YearNotification::Commit(Year::clamped(year)));
    }

    fn slide(&mut self, year: i32) {
        self.pending.push_back(YearNotification::Slide(year));
    }
}
