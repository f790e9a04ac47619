use std::path::Path;

use crate::{
    assets::{AssetKey, AssetStore, ReadyFlag},
    events::{YearListener, YearNotification},
    Year,
};

/// Fixed size of the drawing surface, in pixels.
pub const SURFACE_WIDTH: u32 = 640;
pub const SURFACE_HEIGHT: u32 = 480;

/// Drawing target owned by the host. Backgrounds are always drawn at the
/// origin, stretched over the whole [`SURFACE_WIDTH`] x [`SURFACE_HEIGHT`]
/// area.
pub trait RenderSurface {
    type Image;

    fn draw_background(&mut self, image: &Self::Image);
}

/// Keeps the surface showing the image for the selected year.
#[derive(Debug)]
pub struct BackgroundLayer<I, S> {
    images: AssetStore<I>,
    surface: Option<S>,
    shown: Option<Year>,
}

impl<I, S> BackgroundLayer<I, S>
where
    S: RenderSurface<Image = I>,
{
    pub fn new(images: AssetStore<I>) -> Self {
        Self {
            images,
            surface: None,
            shown: None,
        }
    }

    pub fn attach(&mut self, surface: S) {
        self.surface = Some(surface);
    }

    pub fn surface(&self) -> Option<&S> {
        self.surface.as_ref()
    }

    pub fn init<F>(&mut self, loader: F)
    where
        F: FnMut(&AssetKey, &Path, ReadyFlag) -> I,
    {
        self.images.init(loader);
    }

    pub fn is_ready(&self) -> bool {
        self.images.is_ready()
    }

    /// Year whose image was drawn last.
    pub fn shown(&self) -> Option<Year> {
        self.shown
    }

    /// Picks the image for `year`, falling back to the closest earlier year
    /// that has one.
    pub fn image_year_for(&self, year: Year) -> Option<Year> {
        Year::all()
            .rev()
            .skip_while(|candidate| *candidate > year)
            .find(|candidate| self.images.contains(&AssetKey::Year(*candidate)))
    }

    /// Draws the background for `year`. Leaves the surface untouched when no
    /// image at or before `year` exists.
    pub fn show(&mut self, year: Year) {
        let Some(image_year) = self.image_year_for(year) else {
            tracing::debug!(%year, "no background at or before year");
            return;
        };
        let Some(entry) = self.images.get(&AssetKey::Year(image_year)) else {
            return;
        };
        if let Some(surface) = self.surface.as_mut() {
            surface.draw_background(entry.handle());
        }
        self.shown = Some(image_year);
    }
}

impl<I, S> YearListener for BackgroundLayer<I, S>
where
    S: RenderSurface<Image = I>,
{
    fn on_year(&mut self, notification: YearNotification) {
        match notification {
            YearNotification::Commit(year) => self.show(year),
            YearNotification::Slide(raw) => self.show(Year::clamped(raw)),
        }
    }
}
