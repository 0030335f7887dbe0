//! An inline image attachment shown in a room timeline.
//!
//! An [`ImageItem`] starts downloading its image as soon as it is created.
//! Until the download completes (or if it fails), the item shows the
//! attachment's caption as a clickable link. Once the image is loaded,
//! it is scaled down to fit within the configured bounds and drawn as a
//! rounded thumbnail; hovering over it shows the caption in a bar along
//! the bottom edge.
//!
//! Download results arrive on a background thread. They are pushed into
//! the item's pending update queue through a weak reference, so a result
//! for an item that has since been dropped is simply discarded.
//! The UI thread applies them by calling [`ImageItem::process_updates()`]
//! whenever the [`UiSignal`] fires.

use std::{
    path::{Path, PathBuf},
    rc::Rc,
    sync::{Arc, Weak},
};

use crossbeam_queue::SegQueue;
use image::DynamicImage;
use serde::Deserialize;

use crate::{
    image_overlay::{ImageOverlay, OverlayPresenter},
    image_utils::{decode_image, scale_down},
    link_opener::{LinkOpener, LinkOutcome},
    media_client::{Homeserver, MediaClient, RequestError, mxc_to_http},
    paint::{Color, FontMetrics, FontWeight, Painter, Point, Rect, Size, TextPlacement},
    save_prompt::{SavePathPrompt, suggested_file_name},
    signal::UiSignal,
};

/// The colour of the caption when it's drawn as a link (no image loaded).
const LINK_COLOR: Color = Color::rgb(66, 133, 244);
/// The translucent background of the caption bar drawn over a hovered image.
const CAPTION_BAR_COLOR: Color = Color::rgba(40, 40, 40, 140);
/// Horizontal space reserved around elided captions.
const CAPTION_PADDING: i64 = 10;
const CAPTION_INSET: f64 = 5.0;

/// Identifies the remote image shown by an [`ImageItem`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageAttachmentRef {
    /// The `mxc://` URI (or plain URL) of the image.
    pub url: String,
    /// The caption, i.e., the attachment's filename or the message body.
    pub caption: String,
    /// The size of the image file in bytes, if known.
    pub size: Option<u64>,
}

/// A received `m.room.message` event with an `m.image` msgtype.
#[derive(Clone, Debug, Deserialize)]
pub struct RoomImageEvent {
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default)]
    pub origin_server_ts: Option<u64>,
    pub content: ImageMessageContent,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ImageMessageContent {
    #[serde(default)]
    pub msgtype: Option<String>,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub info: Option<ImageInfo>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ImageInfo {
    pub size: Option<u64>,
    pub w: Option<u32>,
    pub h: Option<u32>,
    pub mimetype: Option<String>,
}

impl From<&RoomImageEvent> for ImageAttachmentRef {
    fn from(event: &RoomImageEvent) -> Self {
        Self {
            url: event.content.url.clone(),
            caption: event.content.body.clone(),
            size: event.content.info.as_ref().and_then(|info| info.size),
        }
    }
}

/// Layout and drawing parameters for an [`ImageItem`].
#[derive(Clone, Debug, PartialEq)]
pub struct ImageItemConfig {
    pub max_width: u32,
    pub max_height: u32,
    pub corner_radius: f64,
    /// The homeserver used to turn `mxc://` URIs into openable links.
    pub homeserver: Homeserver,
}

/// The app services that an [`ImageItem`] relies upon.
#[derive(Clone)]
pub struct ImageItemServices {
    pub client: Arc<dyn MediaClient>,
    pub links: LinkOpener,
    pub overlays: Rc<dyn OverlayPresenter>,
    pub save_prompt: Rc<dyn SavePathPrompt>,
    pub metrics: Rc<dyn FontMetrics>,
    pub signal: UiSignal,
}

/// Updates delivered to an [`ImageItem`] from background tasks or the overlay.
enum ImageItemUpdate {
    /// The image was downloaded; `None` means it couldn't be decoded.
    ImageDownloaded(Option<DynamicImage>),
    /// The original image was downloaded again so that it can be saved to `path`.
    SaveDownloaded {
        path: PathBuf,
        data: Vec<u8>,
    },
    /// The user asked to save the image from the overlay viewer.
    SaveRequested,
}

/// The mutable, derived display state of an [`ImageItem`].
#[derive(Default)]
struct RenderState {
    /// The full-resolution image, once downloaded.
    image: Option<Arc<DynamicImage>>,
    /// `image` scaled down to fit within the item's bounds.
    scaled_image: Option<Arc<DynamicImage>>,
    width: u32,
    height: u32,
    image_region: Rect,
    /// The caption bar, as of the last paint. Only present while hovered.
    text_region: Option<Rect>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Cursor {
    #[default]
    Default,
    PointingHand,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

/// What an [`ImageItem`] did in response to a click.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClickOutcome {
    /// The click was swallowed or not handled.
    Ignored,
    /// The attachment's link was opened.
    /// This is `None` if the attachment has no URL to open.
    OpenedLink(Option<LinkOutcome>),
    /// The full-resolution image was shown in an overlay viewer.
    OpenedOverlay,
}

pub struct ImageItem {
    attachment: ImageAttachmentRef,
    config: ImageItemConfig,
    services: ImageItemServices,
    state: RenderState,
    /// Updates waiting to be applied on the UI thread.
    ///
    /// Background tasks only ever hold a weak reference to this queue.
    pending_updates: Arc<SegQueue<ImageItemUpdate>>,
    fixed_size: Option<Size>,
    is_interactive: bool,
    hovered: bool,
    hover_enabled: bool,
    cursor: Cursor,
    redraw_requested: bool,
}

impl ImageItem {
    /// Creates an item for an attachment that was just sent from this client.
    ///
    /// The `size` is recorded but not used for layout.
    pub fn new(
        url: impl Into<String>,
        filename: impl Into<String>,
        size: Option<u64>,
        config: ImageItemConfig,
        services: ImageItemServices,
    ) -> Self {
        let attachment = ImageAttachmentRef {
            url: url.into(),
            caption: filename.into(),
            size,
        };
        Self::with_attachment(attachment, config, services)
    }

    /// Creates an item for an image message received in a room timeline.
    pub fn from_event(
        event: &RoomImageEvent,
        config: ImageItemConfig,
        services: ImageItemServices,
    ) -> Self {
        Self::with_attachment(ImageAttachmentRef::from(event), config, services)
    }

    fn with_attachment(
        attachment: ImageAttachmentRef,
        config: ImageItemConfig,
        services: ImageItemServices,
    ) -> Self {
        let mut item = Self {
            attachment,
            config,
            services,
            state: RenderState::default(),
            pending_updates: Arc::new(SegQueue::new()),
            fixed_size: None,
            is_interactive: true,
            hovered: false,
            hover_enabled: false,
            cursor: Cursor::Default,
            redraw_requested: false,
        };
        item.init();
        item
    }

    fn init(&mut self) {
        self.hover_enabled = true;
        self.cursor = Cursor::PointingHand;
        let url = self.attachment.url.clone();
        self.download_media(&url);
    }

    /// Starts downloading the image at `url` to be displayed by this item.
    pub fn download_media(&self, url: &str) {
        let pending_updates = Arc::downgrade(&self.pending_updates);
        let signal = self.services.signal.clone();
        let url_owned = url.to_string();
        self.services.client.download(url, Box::new(move |result: Result<Vec<u8>, RequestError>| {
            let data = match result {
                Ok(data) => data,
                Err(e) => {
                    tracing::warn!(target: "net",
                        "failed to retrieve image {url_owned}: {} {}",
                        e.message, e.status_code(),
                    );
                    return;
                }
            };
            if !enqueue_update(&pending_updates, &signal, || ImageItemUpdate::ImageDownloaded(decode_image(&data))) {
                tracing::debug!(target: "ui", "Discarding image {url_owned}: its item no longer exists");
            }
        }));
    }

    /// Applies all updates that have been delivered to this item since the last call.
    ///
    /// Must be called on the UI thread. Returns `true` if the item needs to be redrawn.
    pub fn process_updates(&mut self) -> bool {
        while let Some(update) = self.pending_updates.pop() {
            match update {
                ImageItemUpdate::ImageDownloaded(image) => self.set_image(image),
                ImageItemUpdate::SaveDownloaded { path, data } => {
                    if let Err(e) = save_image(&path, &data) {
                        tracing::warn!(target: "ui", "Error while saving file to {}: {e}", path.display());
                    }
                }
                ImageItemUpdate::SaveRequested => self.save_as(),
            }
        }
        std::mem::take(&mut self.redraw_requested)
    }

    /// Sets the full-resolution image and scales it down for display.
    ///
    /// A `None` image (one that failed to decode) leaves the item showing its caption.
    pub fn set_image(&mut self, image: Option<DynamicImage>) {
        let Some(image) = image else {
            tracing::debug!(target: "ui", "Image {} could not be decoded", self.attachment.url);
            return;
        };
        self.state.image = Some(Arc::new(image));
        self.rescale();
        self.redraw_requested = true;
    }

    fn rescale(&mut self) {
        let Some(image) = self.state.image.as_ref() else { return };
        let scaled = scale_down(self.config.max_width, self.config.max_height, image);
        self.state.width = scaled.width();
        self.state.height = scaled.height();
        self.state.scaled_image = Some(Arc::new(scaled));
        self.fixed_size = Some(Size::new(self.state.width, self.state.height));
    }

    /// The size this item would like to be laid out at.
    pub fn preferred_size(&self) -> Size {
        if self.state.image.is_none() {
            return Size::new(self.config.max_width, self.services.metrics.line_height());
        }
        Size::new(self.state.width, self.state.height)
    }

    /// Handles a change of the bounds this item's image must fit within.
    pub fn on_resize(&mut self, max_bounds: Size) {
        self.config.max_width = max_bounds.width;
        self.config.max_height = max_bounds.height;
        if self.state.image.is_some() {
            self.rescale();
        }
    }

    pub fn paint(&mut self, painter: &mut dyn Painter) {
        let metrics = Rc::clone(&self.services.metrics);
        let font_height = metrics.line_height();

        let Some(scaled_image) = self.state.scaled_image.clone() else {
            let elided = metrics.elided_text(
                &self.attachment.caption,
                self.config.max_width as i64 - CAPTION_PADDING,
            );
            self.fixed_size = Some(Size::new(metrics.horizontal_advance(&elided), font_height));
            painter.draw_text(
                TextPlacement::At(Point::new(0.0, (font_height / 2) as f64)),
                &elided,
                LINK_COLOR,
                FontWeight::Normal,
            );
            return;
        };

        let (width, height) = (self.state.width as f64, self.state.height as f64);
        self.state.image_region = Rect::new(0.0, 0.0, width, height);
        painter.fill_rounded_image(self.state.image_region, self.config.corner_radius, &scaled_image);

        if !(self.is_interactive && self.hovered) {
            self.state.text_region = None;
            return;
        }

        // The caption bar along the bottom edge.
        let text_box_height = (font_height / 2 + 6) as f64;
        let text_region = Rect::new(0.0, height - text_box_height, width, text_box_height);
        painter.fill_rect(text_region, CAPTION_BAR_COLOR);

        let elided = metrics.elided_text(&self.attachment.caption, self.state.width as i64 - CAPTION_PADDING);
        let text_region = text_region.adjusted(CAPTION_INSET, 0.0, CAPTION_INSET, 0.0);
        painter.draw_text(TextPlacement::VCenterIn(text_region), &elided, Color::WHITE, FontWeight::Medium);
        self.state.text_region = Some(text_region);
    }

    /// Handles a mouse button press at `position`, relative to this item's top-left corner.
    pub fn on_click(&mut self, button: MouseButton, position: Point) -> ClickOutcome {
        if !self.is_interactive {
            return ClickOutcome::Ignored;
        }
        if button != MouseButton::Left {
            return ClickOutcome::Ignored;
        }

        let Some(image) = self.state.image.clone() else {
            return ClickOutcome::OpenedLink(self.open_url());
        };
        if self.hovered
            && let Some(text_region) = self.state.text_region
            && text_region.contains(position)
        {
            return ClickOutcome::OpenedLink(self.open_url());
        }

        let pending_updates = Arc::downgrade(&self.pending_updates);
        let signal = self.services.signal.clone();
        let overlay = ImageOverlay::new(image).on_save(move || {
            enqueue_update(&pending_updates, &signal, || ImageItemUpdate::SaveRequested);
        });
        self.services.overlays.show(overlay);
        ClickOutcome::OpenedOverlay
    }

    /// Opens the attachment's canonical link, resolving `mxc://` URIs against the homeserver.
    pub fn open_url(&self) -> Option<LinkOutcome> {
        if self.attachment.url.is_empty() {
            return None;
        }
        let url = mxc_to_http(&self.attachment.url, &self.config.homeserver);
        Some(self.services.links.open_link(&url))
    }

    /// Asks the user where to save the image, then downloads it again and writes it there.
    pub fn save_as(&self) {
        let suggested_name = suggested_file_name(&self.attachment.caption);
        let Some(path) = self.services.save_prompt.choose_save_path("Save image", &suggested_name) else {
            return;
        };

        let url = self.attachment.url.clone();
        let pending_updates = Arc::downgrade(&self.pending_updates);
        let signal = self.services.signal.clone();
        self.services.client.download(&self.attachment.url, Box::new(move |result: Result<Vec<u8>, RequestError>| {
            match result {
                Ok(data) => {
                    enqueue_update(&pending_updates, &signal, || ImageItemUpdate::SaveDownloaded { path, data });
                }
                Err(e) => tracing::warn!(target: "net",
                    "failed to retrieve image {url}: {} {}",
                    e.message, e.status_code(),
                ),
            }
        }));
    }

    /// Sets whether the pointer is currently over this item.
    pub fn set_hovered(&mut self, hovered: bool) {
        self.hovered = hovered && self.hover_enabled;
        if !self.hovered {
            self.state.text_region = None;
        }
        self.redraw_requested = true;
    }

    /// Sets whether this item responds to clicks and shows its caption bar on hover.
    pub fn set_interactive(&mut self, is_interactive: bool) {
        self.is_interactive = is_interactive;
    }

    pub fn attachment(&self) -> &ImageAttachmentRef {
        &self.attachment
    }

    pub fn is_loaded(&self) -> bool {
        self.state.image.is_some()
    }

    pub fn image(&self) -> Option<&Arc<DynamicImage>> {
        self.state.image.as_ref()
    }

    pub fn scaled_image(&self) -> Option<&Arc<DynamicImage>> {
        self.state.scaled_image.as_ref()
    }

    /// The region the image was drawn into by the last paint.
    pub fn image_region(&self) -> Rect {
        self.state.image_region
    }

    /// The caption bar's region as of the last paint, which only exists while hovered.
    pub fn caption_hit_region(&self) -> Option<Rect> {
        self.state.text_region
    }

    /// The size this item was fixed to by the last layout-affecting change, if any.
    pub fn fixed_size(&self) -> Option<Size> {
        self.fixed_size
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }
}

/// Pushes an update into an item's queue if the item still exists, then wakes the UI thread.
///
/// Returns `false` (without calling `make_update`) if the item has been dropped.
fn enqueue_update(
    pending_updates: &Weak<SegQueue<ImageItemUpdate>>,
    signal: &UiSignal,
    make_update: impl FnOnce() -> ImageItemUpdate,
) -> bool {
    let Some(pending_updates) = pending_updates.upgrade() else {
        return false;
    };
    pending_updates.push(make_update());
    signal.set_ui_signal();
    true
}

/// Writes the raw image `data` to `path`.
pub fn save_image(path: &Path, data: &[u8]) -> std::io::Result<()> {
    std::fs::write(path, data)
}
