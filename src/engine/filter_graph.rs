//! Filter graph construction for the crop, scale and circular mask steps

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::model::CropPlan;

/// Pixels shaved off the inscribed radius so the edge stays clean after chroma subsampling
pub const MASK_EDGE_INSET: f64 = 1.0;

/// Label of the final video stream in every graph
pub const VIDEO_LABEL: &str = "v";

/// Opaque RGB colour painted outside the circle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };

    /// `0xRRGGBB`, as ffmpeg colour options expect it
    pub fn to_ffmpeg(self) -> String {
        format!("0x{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl Default for Rgb {
    fn default() -> Self {
        Rgb::BLACK
    }
}

impl FromStr for Rgb {
    type Err = String;

    /// Accepts `#RRGGBB`, `0xRRGGBB`, `RRGGBB` or `black`/`white`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "black" => return Ok(Rgb::BLACK),
            "white" => return Ok(Rgb { r: 255, g: 255, b: 255 }),
            _ => {}
        }
        let hex = trimmed
            .strip_prefix('#')
            .or_else(|| trimmed.strip_prefix("0x"))
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(format!("Invalid colour '{}'. Expected #RRGGBB", s));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|e| format!("Invalid colour '{}': {}", s, e))
        };
        Ok(Rgb {
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
        })
    }
}

impl TryFrom<String> for Rgb {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Rgb> for String {
    fn from(value: Rgb) -> Self {
        format!("#{:02x}{:02x}{:02x}", value.r, value.g, value.b)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Circle inscribed in a square frame of `size` pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaskGeometry {
    /// Centre coordinate on both axes, in pixel-index space
    pub center: f64,
    pub radius: f64,
}

impl MaskGeometry {
    pub fn for_size(size: u32) -> Self {
        let half = size as f64 / 2.0;
        Self {
            center: half - 0.5,
            radius: (half - MASK_EDGE_INSET).max(0.0),
        }
    }

    /// Whether the pixel at (x, y) is kept
    pub fn contains(&self, x: u32, y: u32) -> bool {
        let dx = x as f64 - self.center;
        let dy = y as f64 - self.center;
        dx.hypot(dy) <= self.radius
    }

    /// The same predicate as an ffmpeg expression over `X`/`Y`
    pub fn predicate(&self) -> String {
        format!(
            "lte(hypot(X-{},Y-{}),{})",
            fmt_num(self.center),
            fmt_num(self.center),
            fmt_num(self.radius)
        )
    }
}

fn fmt_num(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Crop to the planned square, scale to the output edge, force square pixels
pub fn crop_scale_chain(crop: &CropPlan, output_size: u32) -> String {
    format!(
        "crop=w={size}:h={size}:x={x}:y={y},scale={out}:{out},setsar=1",
        size = crop.size,
        x = crop.x_offset,
        y = crop.y_offset,
        out = output_size
    )
}

/// Per-pixel mask: keep pixels inside the circle, paint the rest with `background`
pub fn procedural_mask_chain(output_size: u32, background: Rgb) -> String {
    let predicate = MaskGeometry::for_size(output_size).predicate();
    let component = |name: &str, fill: u8| format!("{name}='if({predicate},{name}(X,Y),{fill})'");
    format!(
        "format=gbrp,geq={}:{}:{},format=yuv420p",
        component("r", background.r),
        component("g", background.g),
        component("b", background.b)
    )
}

/// Single-pass graph: crop, scale and procedural mask
pub fn single_pass_graph(crop: &CropPlan, output_size: u32, background: Rgb) -> String {
    format!(
        "[0:v]{},{}[{}]",
        crop_scale_chain(crop, output_size),
        procedural_mask_chain(output_size, background),
        VIDEO_LABEL
    )
}

/// First stage of the bitmap strategy: the unmasked square
pub fn square_graph(crop: &CropPlan, output_size: u32) -> String {
    format!(
        "[0:v]{},format=yuv420p[{}]",
        crop_scale_chain(crop, output_size),
        VIDEO_LABEL
    )
}

/// Second stage of the bitmap strategy.
///
/// Input 0 is the square video, input 1 the grayscale mask image. The mask frame
/// is repeated for the whole clip; the background is the square painted over.
pub fn bitmap_composite_graph(output_size: u32, background: Rgb) -> String {
    format!(
        "[0:v]split[base][fg];\
         [base]drawbox=x=0:y=0:w=iw:h=ih:color={color}:t=fill,format=gbrp[bg];\
         [fg]format=gbrp[fgp];\
         [1:v]format=gray,scale={size}:{size},format=gbrp[mask];\
         [bg][fgp][mask]maskedmerge,format=yuv420p[{label}]",
        color = background.to_ffmpeg(),
        size = output_size,
        label = VIDEO_LABEL
    )
}
