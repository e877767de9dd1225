use std::io::Cursor;

use crossterm::event::{KeyCode, KeyEvent};
use image::{ColorType, DynamicImage, ImageFormat, ImageReader, Limits, RgbaImage};
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::Color;
use serde::{Deserialize, Serialize};

use crate::theme::Base16Palette;
use crate::viewer::state::{decode_state, encode_state};
use crate::viewer::task::{LoadError, read_to_end_cancellable};
use crate::viewer::{DocumentFile, HostContext, LoadProgress, Viewer, ViewerBase};

use super::{document_block, render_empty};

pub const IMAGE_VIEWER_NAME: &str = "Image Viewer";
const STATE_VERSION: u32 = 1;
const MAX_ALLOCATION: u64 = 1024 * 1024 * 1024;

const ZOOM_IN_FACTOR: f64 = 1.25;
const ZOOM_OUT_FACTOR: f64 = 0.8;
const MIN_ZOOM: f64 = 1.0 / 3.0;
const MAX_ZOOM: f64 = 3.0;
const PAN_STEP: i64 = 4;
/// Pan offsets are kept within this many cells of the centre.
const MAX_PAN: i64 = 1 << 20;

const ACTION_ZOOM_IN: &str = "zoom-in";
const ACTION_ZOOM_OUT: &str = "zoom-out";
const ACTION_ZOOM_RESET: &str = "zoom-reset";

const UPPER_HALF_BLOCK: &str = "\u{2580}";
const PRINT_RAMP: &[u8] = b" .:-=+*#%@";

#[derive(Debug)]
pub struct LoadedImage {
    pixels: RgbaImage,
    color: ColorType,
    format: Option<ImageFormat>,
}

impl LoadedImage {
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    fn depth(&self) -> u16 {
        self.color.bits_per_pixel()
    }

    fn describe(&self) -> String {
        let format = self
            .format
            .map(|f| format!("{f:?}").to_uppercase())
            .unwrap_or_else(|| "unknown".to_string());
        format!("{format} {:?}", self.color)
    }

    fn decode(bytes: &[u8]) -> Result<Self, LoadError> {
        let mut reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(LoadError::Io)?;
        let mut limits = Limits::default();
        limits.max_alloc = Some(MAX_ALLOCATION);
        reader.limits(limits);

        let format = reader.format();
        let image: DynamicImage = reader
            .decode()
            .map_err(|e| LoadError::parse(format!("cannot decode image: {e}")))?;
        if image.width() == 0 || image.height() == 0 {
            return Err(LoadError::parse("image has no pixels"));
        }
        Ok(Self {
            color: image.color(),
            pixels: image.to_rgba8(),
            format,
        })
    }
}

/// Media types whose decoders are compiled into this build.
pub fn decodable_media_types() -> Vec<&'static str> {
    let mut types = vec!["image/png", "image/jpeg", "image/gif", "image/webp"];
    if cfg!(feature = "image-bmp") {
        types.push("image/bmp");
    }
    if cfg!(feature = "image-ico") {
        types.extend(["image/x-icon", "image/vnd.microsoft.icon"]);
    }
    if cfg!(feature = "image-tiff") {
        types.push("image/tiff");
    }
    types
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct ImageState {
    zoom: f64,
    pan_x: i64,
    pan_y: i64,
}

/// Raster image drawn with upper-half-block cells, two pixels per cell.
///
/// Zoom 1.0 fits the image to the viewport; zooming multiplies that scale.
pub struct ImageViewer {
    base: ViewerBase<LoadedImage>,
    image: Option<LoadedImage>,
    zoom: f64,
    pan_x: i64,
    pan_y: i64,
}

impl Default for ImageViewer {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageViewer {
    pub fn new() -> Self {
        Self {
            base: ViewerBase::new(IMAGE_VIEWER_NAME),
            image: None,
            zoom: 1.0,
            pan_x: 0,
            pan_y: 0,
        }
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn image(&self) -> Option<&LoadedImage> {
        self.image.as_ref()
    }

    fn scale_image(&mut self, factor: f64, host: &mut HostContext<'_>) {
        self.zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        if self.zoom <= 1.0 {
            self.pan_x = 0;
            self.pan_y = 0;
        }
        self.sync_actions(host);
        self.base
            .status_message(host, format!("Zoom {:.0}%", self.zoom * 100.0));
    }

    fn reset_zoom(&mut self, host: &mut HostContext<'_>) {
        self.zoom = 1.0;
        self.pan_x = 0;
        self.pan_y = 0;
        self.sync_actions(host);
    }

    fn sync_actions(&self, host: &mut HostContext<'_>) {
        let loaded = self.image.is_some();
        let toolbar = host.toolbar();
        toolbar.set_enabled(ACTION_ZOOM_IN, loaded && self.zoom < MAX_ZOOM - f64::EPSILON);
        toolbar.set_enabled(ACTION_ZOOM_OUT, loaded && self.zoom > MIN_ZOOM + f64::EPSILON);
        toolbar.set_enabled(
            ACTION_ZOOM_RESET,
            loaded && (self.zoom - 1.0).abs() > f64::EPSILON,
        );
    }

    /// Source pixels per target pixel when the image is drawn into a
    /// `cols` x `rows * 2` pixel grid.
    fn source_step(&self, image: &LoadedImage, cols: u32, pixel_rows: u32) -> f64 {
        let fit = f64::min(
            cols as f64 / image.width() as f64,
            pixel_rows as f64 / image.height() as f64,
        );
        1.0 / (fit * self.zoom).max(f64::MIN_POSITIVE)
    }

    fn sample(image: &LoadedImage, x: f64, y: f64, background: Color) -> Color {
        if x < 0.0 || y < 0.0 {
            return background;
        }
        let (x, y) = (x as u32, y as u32);
        if x >= image.width() || y >= image.height() {
            return background;
        }
        let [r, g, b, a] = image.pixels.get_pixel(x, y).0;
        if a < 128 {
            background
        } else {
            Color::Rgb(r, g, b)
        }
    }
}

impl Viewer for ImageViewer {
    fn viewer_name(&self) -> &str {
        IMAGE_VIEWER_NAME
    }

    fn supported_media_types(&self) -> Vec<String> {
        decodable_media_types()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    fn init(&mut self, file: DocumentFile, host: &mut HostContext<'_>) {
        self.base.bind(file);
        let toolbar = host.toolbar();
        toolbar.set_title(IMAGE_VIEWER_NAME);
        toolbar.add_action(ACTION_ZOOM_IN, "Zoom In", '+');
        toolbar.add_action(ACTION_ZOOM_OUT, "Zoom Out", '-');
        toolbar.add_action(ACTION_ZOOM_RESET, "Normal Size", '0');
        self.sync_actions(host);

        self.base.begin_load(host, |file, token| {
            let bytes = read_to_end_cancellable(file, token, Some(MAX_ALLOCATION))?;
            LoadedImage::decode(&bytes)
        });
    }

    fn poll_load(&mut self, host: &mut HostContext<'_>) -> LoadProgress {
        let name = self.base.file_name();
        let slot = &mut self.image;
        let progress = self.base.poll_load(host, |image, host| {
            host.status_message(
                format!(
                    "Opened \"{name}\", {}x{}, Depth: {} ({})",
                    image.width(),
                    image.height(),
                    image.depth(),
                    image.describe()
                ),
                IMAGE_VIEWER_NAME,
            );
            *slot = Some(image);
            Ok(())
        });
        if progress != LoadProgress::Pending {
            self.sync_actions(host);
        }
        #[cfg(feature = "print")]
        self.base.maybe_enable_printing(self.image.is_some());
        progress
    }

    fn has_content(&self) -> bool {
        self.image.is_some()
    }

    fn save_state(&self) -> Vec<u8> {
        encode_state(
            STATE_VERSION,
            &ImageState {
                zoom: self.zoom,
                pan_x: self.pan_x,
                pan_y: self.pan_y,
            },
        )
    }

    fn restore_state(&mut self, blob: &[u8]) -> bool {
        let Some(state) = decode_state::<ImageState>(blob, STATE_VERSION) else {
            return false;
        };
        if !state.zoom.is_finite() {
            return false;
        }
        self.zoom = state.zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        if self.zoom <= 1.0 {
            self.pan_x = 0;
            self.pan_y = 0;
        } else {
            self.pan_x = state.pan_x.clamp(-MAX_PAN, MAX_PAN);
            self.pan_y = state.pan_y.clamp(-MAX_PAN, MAX_PAN);
        }
        true
    }

    fn handle_key(&mut self, key: KeyEvent, _host: &mut HostContext<'_>) -> bool {
        if self.image.is_none() || self.zoom <= 1.0 {
            return false;
        }
        let (dx, dy) = match key.code {
            KeyCode::Char('h') | KeyCode::Left => (-PAN_STEP, 0),
            KeyCode::Char('l') | KeyCode::Right => (PAN_STEP, 0),
            KeyCode::Char('k') | KeyCode::Up => (0, -PAN_STEP),
            KeyCode::Char('j') | KeyCode::Down => (0, PAN_STEP),
            _ => return false,
        };
        self.pan_x = self.pan_x.saturating_add(dx).clamp(-MAX_PAN, MAX_PAN);
        self.pan_y = self.pan_y.saturating_add(dy).clamp(-MAX_PAN, MAX_PAN);
        true
    }

    fn trigger_action(&mut self, id: &str, host: &mut HostContext<'_>) -> bool {
        if self.image.is_none() {
            return false;
        }
        match id {
            ACTION_ZOOM_IN => self.scale_image(ZOOM_IN_FACTOR, host),
            ACTION_ZOOM_OUT => self.scale_image(ZOOM_OUT_FACTOR, host),
            ACTION_ZOOM_RESET => self.reset_zoom(host),
            _ => return false,
        }
        true
    }

    fn render(&mut self, frame: &mut Frame, area: Rect, palette: &Base16Palette) {
        let Some(image) = &self.image else {
            return render_empty(&self.base, frame, area, palette);
        };

        let title = format!("{} ({:.0}%)", self.base.file_name(), self.zoom * 100.0);
        let block = document_block(&title, palette);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        if inner.width == 0 || inner.height == 0 {
            return;
        }

        let cols = inner.width as u32;
        let pixel_rows = inner.height as u32 * 2;
        let step = self.source_step(image, cols, pixel_rows);

        // Center the scaled image, then shift by the pan offset in cells.
        let drawn_w = image.width() as f64 / step;
        let drawn_h = image.height() as f64 / step;
        let origin_x = (cols as f64 - drawn_w) / 2.0 - self.pan_x as f64;
        let origin_y = (pixel_rows as f64 - drawn_h) / 2.0 - self.pan_y.saturating_mul(2) as f64;

        let background = palette.base_00;
        let buf = frame.buffer_mut();
        for row in 0..inner.height {
            for col in 0..inner.width {
                let x = (col as f64 - origin_x) * step;
                let top_y = (row as f64 * 2.0 - origin_y) * step;
                let bottom_y = (row as f64 * 2.0 + 1.0 - origin_y) * step;
                let top = Self::sample(image, x, top_y, background);
                let bottom = Self::sample(image, x, bottom_y, background);
                if let Some(cell) = buf.cell_mut((inner.x + col, inner.y + row)) {
                    cell.set_symbol(UPPER_HALF_BLOCK).set_fg(top).set_bg(bottom);
                }
            }
        }
    }

    #[cfg(feature = "print")]
    fn supports_printing(&self) -> bool {
        self.base.printing_enabled()
    }

    /// Prints a luminance sketch of the image at page width.
    #[cfg(feature = "print")]
    fn print_document(
        &self,
        printer: &mut crate::viewer::Printer,
    ) -> Result<(), crate::viewer::PrintError> {
        let image = self
            .image
            .as_ref()
            .ok_or(crate::viewer::PrintError::NoContent)?;
        printer.print_line(&format!(
            "{} ({}x{})",
            self.base.file_name(),
            image.width(),
            image.height()
        ));
        printer.print_line("");

        let cols = printer.page_width().min(image.width() as usize).max(1);
        // Characters are roughly twice as tall as they are wide.
        let step = image.width() as f64 / cols as f64;
        let rows = ((image.height() as f64 / (step * 2.0)).ceil() as usize).max(1);
        for row in 0..rows {
            let line: String = (0..cols)
                .map(|col| {
                    let x = ((col as f64 * step) as u32).min(image.width() - 1);
                    let y = ((row as f64 * step * 2.0) as u32).min(image.height() - 1);
                    let [r, g, b, a] = image.pixels.get_pixel(x, y).0;
                    let luma = (0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64)
                        * (a as f64 / 255.0);
                    let index = ((255.0 - luma) / 256.0 * PRINT_RAMP.len() as f64) as usize;
                    PRINT_RAMP[index.min(PRINT_RAMP.len() - 1)] as char
                })
                .collect();
            printer.print_line(line.trim_end());
        }
        Ok(())
    }
}
