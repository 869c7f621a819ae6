//! The built-in `Scene` composition.
//!
//! A procedural stand-in for a 3D title card: a scrolling four-stop gradient background, a
//! rotating gradient disc, and a tilting text band, all driven by request parameters.

use std::collections::BTreeMap;
use std::f64::consts::PI;
use std::path::PathBuf;

use crate::foundation::core::{Canvas, Fps, FrameIndex, normalize_rel_path};
use crate::foundation::error::{ReelError, ReelResult};
use crate::request::RenderRequest;
use crate::scene::compiler::{CompositionDescriptor, MediaAsset, Scene};

/// Id the built-in scene is registered under.
pub const SCENE_ID: &str = "Scene";

const DEFAULT_SIZE: u32 = 512;
const DEFAULT_FPS: u32 = 30;
const DEFAULT_DURATION_FRAMES: u64 = 60;
const MAX_SIZE: u32 = 4096;
const MAX_FPS: u32 = 120;
const MAX_DURATION_FRAMES: u64 = 3600;

const DEFAULT_TEXT: &str = "Hello";
const DEFAULT_COLOR_START: Rgb = Rgb(0x1d, 0x2b, 0x64);
const DEFAULT_COLOR_MIDDLE: Rgb = Rgb(0xf8, 0xcd, 0xda);
const DEFAULT_COLOR_END: Rgb = Rgb(0xff, 0xff, 0xff);

/// Fonts the scene knows, with the relative stroke weight used for the text band.
const FONTS: &[(&str, f64)] = &[
    ("anton", 1.15),
    ("playfair", 0.85),
    ("pt-serif", 1.0),
    ("poppins", 1.05),
    ("imperial", 0.7),
    ("marker", 0.95),
    ("alpha-slab", 1.2),
    ("secular-one", 1.0),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Rgb(u8, u8, u8);

impl Rgb {
    fn parse(name: &str, raw: &str) -> ReelResult<Self> {
        let hex = raw.trim().trim_start_matches('#');
        if !hex.is_ascii() {
            return Err(ReelError::invalid_params(format!(
                "{name} is not a hex color: '{raw}'"
            )));
        }
        let expanded: String = match hex.len() {
            3 => hex.chars().flat_map(|c| [c, c]).collect(),
            6 => hex.to_string(),
            _ => {
                return Err(ReelError::invalid_params(format!(
                    "{name} must be a #rgb or #rrggbb color, got '{raw}'"
                )));
            }
        };
        let channel = |i: usize| {
            u8::from_str_radix(&expanded[i..i + 2], 16).map_err(|_| {
                ReelError::invalid_params(format!("{name} is not a hex color: '{raw}'"))
            })
        };
        Ok(Self(channel(0)?, channel(2)?, channel(4)?))
    }

    fn lerp(self, other: Self, t: f64) -> Self {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (f64::from(a) + (f64::from(b) - f64::from(a)) * t).round() as u8;
        Self(
            mix(self.0, other.0),
            mix(self.1, other.1),
            mix(self.2, other.2),
        )
    }

    fn scale(self, k: f64) -> Self {
        let s = |c: u8| (f64::from(c) * k).round().clamp(0.0, 255.0) as u8;
        Self(s(self.0), s(self.1), s(self.2))
    }
}

/// Sample evenly spaced gradient stops at `t` in `[0, 1]`.
fn sample_stops(stops: &[Rgb], t: f64) -> Rgb {
    let t = t.clamp(0.0, 1.0);
    let segments = (stops.len() - 1) as f64;
    let pos = t * segments;
    let i = (pos.floor() as usize).min(stops.len() - 2);
    stops[i].lerp(stops[i + 1], pos - i as f64)
}

/// Parsed per-composition style, derived from `CompositionDescriptor::props`.
#[derive(Clone, Debug, PartialEq)]
struct Style {
    text: String,
    font_weight: f64,
    start: Rgb,
    middle: Rgb,
    end: Rgb,
}

impl Style {
    fn from_props(props: &BTreeMap<String, String>) -> ReelResult<Self> {
        let text = props
            .get("text")
            .cloned()
            .unwrap_or_else(|| DEFAULT_TEXT.to_string());
        let font = props.get("font").map(String::as_str).unwrap_or("anton");
        let font_weight = FONTS
            .iter()
            .find(|(name, _)| *name == font)
            .map(|(_, w)| *w)
            .ok_or_else(|| {
                ReelError::invalid_params(format!(
                    "unknown font '{font}' (expected one of: {})",
                    FONTS.iter().map(|(n, _)| *n).collect::<Vec<_>>().join(", ")
                ))
            })?;
        let color = |key: &str, default: Rgb| match props.get(key) {
            Some(raw) => Rgb::parse(key, raw),
            None => Ok(default),
        };

        Ok(Self {
            text,
            font_weight,
            start: color("colorstart", DEFAULT_COLOR_START)?,
            middle: color("colormiddle", DEFAULT_COLOR_MIDDLE)?,
            end: color("colorend", DEFAULT_COLOR_END)?,
        })
    }
}

fn parse_bounded<T>(request: &RenderRequest, key: &str, default: T, min: T, max: T) -> ReelResult<T>
where
    T: std::str::FromStr + PartialOrd + Copy + std::fmt::Display,
{
    let Some(raw) = request.get(key) else {
        return Ok(default);
    };
    let v: T = raw
        .trim()
        .parse()
        .map_err(|_| ReelError::invalid_params(format!("{key} must be a number, got '{raw}'")))?;
    if v < min || v > max {
        return Err(ReelError::invalid_params(format!(
            "{key} must be within {min}..={max}, got {v}"
        )));
    }
    Ok(v)
}

/// The procedural scene registered as [`SCENE_ID`].
#[derive(Clone, Debug)]
pub struct GradientScene {
    assets_root: PathBuf,
}

impl GradientScene {
    /// Create the scene; `videoSrc` parameters resolve under `assets_root`.
    pub fn new(assets_root: impl Into<PathBuf>) -> Self {
        Self {
            assets_root: assets_root.into(),
        }
    }

    fn resolve_media(&self, raw: &str) -> ReelResult<PathBuf> {
        let rel = normalize_rel_path(raw)?;
        let path = self.assets_root.join(rel);
        if !path.is_file() {
            return Err(ReelError::invalid_params(format!(
                "videoSrc '{raw}' does not exist under the assets directory"
            )));
        }
        Ok(path)
    }
}

impl Scene for GradientScene {
    fn id(&self) -> &str {
        SCENE_ID
    }

    fn compose(&self, request: &RenderRequest) -> ReelResult<CompositionDescriptor> {
        let width = parse_bounded(request, "width", DEFAULT_SIZE, 2, MAX_SIZE)?;
        let height = parse_bounded(request, "height", DEFAULT_SIZE, 2, MAX_SIZE)?;
        let fps = parse_bounded(request, "fps", DEFAULT_FPS, 1, MAX_FPS)?;
        let duration = parse_bounded(
            request,
            "durationInFrames",
            DEFAULT_DURATION_FRAMES,
            1,
            MAX_DURATION_FRAMES,
        )?;

        let props = request.to_sorted();
        Style::from_props(&props)?;
        if let Some(src) = request.get("videoSrc") {
            self.resolve_media(src)?;
        }

        Ok(CompositionDescriptor {
            scene_id: SCENE_ID.to_string(),
            canvas: Canvas { width, height },
            fps: Fps::new(fps, 1)?,
            duration: FrameIndex(duration),
            still_frame: FrameIndex(0),
            props,
        })
    }

    fn paint(
        &self,
        comp: &CompositionDescriptor,
        frame: FrameIndex,
    ) -> ReelResult<image::RgbaImage> {
        if frame >= comp.duration {
            return Err(ReelError::render_failed(format!(
                "frame {} is outside the composition (0..{})",
                frame.0, comp.duration.0
            )));
        }
        let style = Style::from_props(&comp.props)?;
        Ok(paint_frame(&style, comp, frame))
    }

    fn media(&self, comp: &CompositionDescriptor) -> ReelResult<Vec<MediaAsset>> {
        let Some(src) = comp.props.get("videoSrc") else {
            return Ok(Vec::new());
        };
        Ok(vec![MediaAsset {
            path: self.resolve_media(src)?,
            start: FrameIndex(0),
            volume: 1.0,
        }])
    }
}

fn paint_frame(style: &Style, comp: &CompositionDescriptor, frame: FrameIndex) -> image::RgbaImage {
    let w = comp.canvas.width;
    let h = comp.canvas.height;
    let wf = f64::from(w);
    let hf = f64::from(h);
    let f = frame.0 as f64;

    // Timeline phase: six full turns over the composition.
    let time = f / comp.duration.0 as f64 * PI * 12.0;

    let bg_stops = [style.middle, style.start, style.middle, style.start];
    let bg_offset = (f + 4.0) / 90.0 - 0.4;

    let disc_stops = [style.start, style.middle, style.end];
    let disc_r = wf.min(hf) * 0.38;
    let (axis_sin, axis_cos) = (time / (PI * 4.0)).sin_cos();

    let band_tilt = (time / 6.0).sin() * 0.5;
    let band_half_h = hf * 0.06 * style.font_weight;
    let glyphs = style.text.chars().count().max(1) as f64;
    let band_half_w = (wf * 0.03 * glyphs).min(wf * 0.4);

    image::RgbaImage::from_fn(w, h, |x, y| {
        let px = f64::from(x) + 0.5;
        let py = f64::from(y) + 0.5;

        let mut c = sample_stops(&bg_stops, (py / hf + bg_offset).rem_euclid(1.0));

        let dx = px - wf * 0.5;
        let dy = py - hf * 0.5;
        let dist = (dx * dx + dy * dy).sqrt();
        if dist <= disc_r {
            let along = (dx * axis_cos + dy * axis_sin) / disc_r;
            let shade = 1.0 - 0.25 * (dist / disc_r).powi(2);
            c = sample_stops(&disc_stops, (along + 1.0) * 0.5).scale(shade);
        }

        let band_center = dy - dx * band_tilt * 0.4;
        if dx.abs() <= band_half_w && band_center.abs() <= band_half_h {
            c = style.end;
        }

        image::Rgba([c.0, c.1, c.2, 255])
    })
}

#[cfg(test)]
#[path = "../../tests/unit/scene/builtin.rs"]
mod tests;
