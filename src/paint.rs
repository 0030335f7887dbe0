//! Geometry, font metrics, and the painter abstraction.
//!
//! Widgets in this crate don't draw to a window directly. Instead they
//! issue paint commands through the [`Painter`] trait, which a host can
//! implement on top of its own rendering backend. The [`DisplayList`]
//! painter simply records those commands.

use std::sync::Arc;

use image::DynamicImage;

/// The ellipsis appended to text that has been elided.
pub const ELLIPSIS: &str = "…";

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}
impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A size in whole pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}
impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}
impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Returns true if `point` lies within this rect.
    /// The left and top edges are inclusive, the right and bottom edges are exclusive.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x && point.x < self.right()
            && point.y >= self.y && point.y < self.bottom()
    }

    /// Moves the left, top, right, and bottom edges by the given deltas.
    pub fn adjusted(&self, dx1: f64, dy1: f64, dx2: f64, dy2: f64) -> Self {
        Self {
            x: self.x + dx1,
            y: self.y + dy1,
            width: self.width - dx1 + dx2,
            height: self.height - dy1 + dy2,
        }
    }
}

/// An 8-bit RGBA colour.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}
impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Formats this colour as `#rrggbb`, or `#rrggbbaa` if it isn't opaque.
    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FontWeight {
    #[default]
    Normal,
    Medium,
}

/// Metrics of the font used to draw captions.
pub trait FontMetrics {
    /// The full height of a line of text.
    fn height(&self) -> u32;
    /// The distance from the baseline to the top of the tallest glyph.
    fn ascent(&self) -> u32;
    /// The horizontal distance the pen moves when drawing `text`.
    fn horizontal_advance(&self, text: &str) -> u32;

    /// The height reserved for a single caption line.
    fn line_height(&self) -> u32 {
        self.height() + self.ascent()
    }

    /// Returns `text` truncated from the right with an ellipsis
    /// such that it fits within `max_width` pixels.
    fn elided_text(&self, text: &str, max_width: i64) -> String {
        if self.horizontal_advance(text) as i64 <= max_width {
            return text.to_string();
        }
        if (self.horizontal_advance(ELLIPSIS) as i64) > max_width {
            return String::new();
        }
        let mut end = text.len();
        for (idx, _) in text.char_indices().rev() {
            end = idx;
            let candidate = format!("{}{ELLIPSIS}", &text[..end]);
            if self.horizontal_advance(&candidate) as i64 <= max_width {
                return candidate;
            }
        }
        format!("{}{ELLIPSIS}", &text[..end])
    }
}

/// Font metrics for a fixed-width font, in which every character has the same advance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedWidthMetrics {
    pub char_width: u32,
    pub height: u32,
    pub ascent: u32,
}
impl Default for FixedWidthMetrics {
    fn default() -> Self {
        Self { char_width: 8, height: 17, ascent: 13 }
    }
}
impl FontMetrics for FixedWidthMetrics {
    fn height(&self) -> u32 {
        self.height
    }

    fn ascent(&self) -> u32 {
        self.ascent
    }

    fn horizontal_advance(&self, text: &str) -> u32 {
        text.chars().count() as u32 * self.char_width
    }
}

/// Where a run of text should be placed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TextPlacement {
    /// The text's baseline starts at the given point.
    At(Point),
    /// The text starts at the rect's left edge and is vertically centred within it.
    VCenterIn(Rect),
}

/// A sink for drawing operations.
pub trait Painter {
    /// Fills a rounded rectangle with the given image as its brush.
    fn fill_rounded_image(&mut self, rect: Rect, corner_radius: f64, image: &Arc<DynamicImage>);
    /// Fills a plain rectangle with a solid colour.
    fn fill_rect(&mut self, rect: Rect, color: Color);
    /// Draws a single line of text.
    fn draw_text(&mut self, placement: TextPlacement, text: &str, color: Color, weight: FontWeight);
}

/// A single recorded drawing operation.
#[derive(Clone, Debug)]
pub enum PaintCommand {
    RoundedImage {
        rect: Rect,
        corner_radius: f64,
        image: Arc<DynamicImage>,
    },
    FillRect {
        rect: Rect,
        color: Color,
    },
    Text {
        placement: TextPlacement,
        text: String,
        color: Color,
        weight: FontWeight,
    },
}

impl std::fmt::Display for PaintCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaintCommand::RoundedImage { rect, corner_radius, image } => write!(
                f, "image {}x{} in ({}, {}, {}, {}) radius {corner_radius}",
                image.width(), image.height(), rect.x, rect.y, rect.width, rect.height,
            ),
            PaintCommand::FillRect { rect, color } => write!(
                f, "fill ({}, {}, {}, {}) with {}",
                rect.x, rect.y, rect.width, rect.height, color.to_hex(),
            ),
            PaintCommand::Text { placement, text, color, weight } => {
                match placement {
                    TextPlacement::At(p) => write!(f, "text {text:?} at ({}, {})", p.x, p.y)?,
                    TextPlacement::VCenterIn(r) => write!(
                        f, "text {text:?} centred in ({}, {}, {}, {})", r.x, r.y, r.width, r.height,
                    )?,
                }
                write!(f, " {} {weight:?}", color.to_hex())
            }
        }
    }
}

/// A painter that records every command it is given.
#[derive(Clone, Debug, Default)]
pub struct DisplayList {
    pub commands: Vec<PaintCommand>,
}
impl DisplayList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the text of every recorded text command, in order.
    pub fn texts(&self) -> Vec<&str> {
        self.commands.iter()
            .filter_map(|cmd| match cmd {
                PaintCommand::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}
impl Painter for DisplayList {
    fn fill_rounded_image(&mut self, rect: Rect, corner_radius: f64, image: &Arc<DynamicImage>) {
        self.commands.push(PaintCommand::RoundedImage { rect, corner_radius, image: Arc::clone(image) });
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.commands.push(PaintCommand::FillRect { rect, color });
    }

    fn draw_text(&mut self, placement: TextPlacement, text: &str, color: Color, weight: FontWeight) {
        self.commands.push(PaintCommand::Text { placement, text: text.to_string(), color, weight });
    }
}
