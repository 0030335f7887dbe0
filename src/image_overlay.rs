//! A modal overlay that shows a full-resolution image.

use std::sync::Arc;

use image::DynamicImage;

use crate::paint::Size;

/// A full-screen viewer for a single image.
///
/// The overlay doesn't know how to save the image itself; instead, whoever
/// opens it installs a save hook that is invoked when the user asks to save.
pub struct ImageOverlay {
    image: Arc<DynamicImage>,
    on_save: Option<Box<dyn Fn()>>,
}

impl ImageOverlay {
    pub fn new(image: Arc<DynamicImage>) -> Self {
        Self { image, on_save: None }
    }

    /// Sets the hook invoked when the user asks to save the image.
    pub fn on_save(mut self, on_save: impl Fn() + 'static) -> Self {
        self.on_save = Some(Box::new(on_save));
        self
    }

    pub fn image(&self) -> &Arc<DynamicImage> {
        &self.image
    }

    /// Notifies the owner of this overlay that the user asked to save the image.
    ///
    /// Returns `false` if no save hook was installed.
    pub fn request_save(&self) -> bool {
        match &self.on_save {
            Some(on_save) => {
                on_save();
                true
            }
            None => false,
        }
    }

    /// The size at which the image is shown in a viewport of the given size:
    /// the image is shrunk to fit, but never enlarged.
    pub fn display_size(&self, viewport: Size) -> Size {
        let (width, height) = (self.image.width(), self.image.height());
        if width <= viewport.width && height <= viewport.height {
            return Size::new(width, height);
        }
        if width == 0 || height == 0 {
            return Size::default();
        }
        let scale = f64::min(
            viewport.width as f64 / width as f64,
            viewport.height as f64 / height as f64,
        );
        Size::new(
            ((width as f64 * scale).round() as u32).max(1),
            ((height as f64 * scale).round() as u32).max(1),
        )
    }
}

/// Something that can show an [`ImageOverlay`] to the user, e.g., as a modal.
pub trait OverlayPresenter {
    fn show(&self, overlay: ImageOverlay);
}
