//! Adaptive magnitude → color mapping.
//!
//! The scale is a peak-hold with decay: a loud frame raises `color_max` at
//! once, and quiet frames let it sink by 2% per frame. Values are normalized
//! against `color_max` on a soft log curve and mapped onto a blue → red hue
//! ramp.
//!
//! ```text
//! t   = clamp01(log10(1 + 9 * v / color_max))
//! hue = (1 - t) * 240          240° blue … 0° red
//! rgb = hsv(hue, 1.0, 0.95)
//! ```

/// Per-frame decay applied to the remembered peak.
pub const DECAY: f64 = 0.98;

/// Lower bound for `color_max`; also its initial value.
pub const FLOOR: f64 = 1e-6;

const SATURATION: f64 = 1.0;
const BRIGHTNESS: f64 = 0.95;

/// 8-bit RGB triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl std::fmt::Display for Rgb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rgb({},{},{})", self.r, self.g, self.b)
    }
}

// ---------------------------------------------------------------------------
// ColorScale
// ---------------------------------------------------------------------------

/// Peak-hold color scale shared by every cell of one waterfall.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorScale {
    color_max: f64,
}

impl Default for ColorScale {
    fn default() -> Self {
        Self { color_max: FLOOR }
    }
}

impl ColorScale {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one row's maximum into the scale and return the new `color_max`.
    ///
    /// `color_max' = max(color_max * DECAY, row_max, FLOOR)`. Non-finite
    /// input is treated as 0.
    pub fn update(&mut self, row_max: f64) -> f64 {
        let row_max = if row_max.is_finite() { row_max } else { 0.0 };
        self.color_max = (self.color_max * DECAY).max(row_max).max(FLOOR);
        self.color_max
    }

    pub fn color_max(&self) -> f64 {
        self.color_max
    }

    /// Color for `value` against the current `color_max`.
    pub fn color_for(&self, value: f64) -> Rgb {
        map_to_color(value, self.color_max)
    }
}

/// Log-curve normalization of `value` into `[0, 1]`.
pub fn normalize(value: f64, color_max: f64) -> f64 {
    let color_max = color_max.max(FLOOR);
    clamp01((1.0 + 9.0 * (value / color_max)).log10() / 10f64.log10())
}

/// Map a magnitude onto the blue → red ramp.
///
/// Out-of-range input saturates: negatives are blue, anything at or above
/// `color_max` is red.
pub fn map_to_color(value: f64, color_max: f64) -> Rgb {
    let t = normalize(value, color_max);
    let hue = (1.0 - t) * 240.0;
    hsv_to_rgb(hue, SATURATION, BRIGHTNESS)
}

/// Sector-based HSV → RGB conversion. `h` in degrees `[0, 360)`, `s`/`v` in
/// `[0, 1]`.
pub fn hsv_to_rgb(h: f64, s: f64, v: f64) -> Rgb {
    let c = v * s;
    let hp = h / 60.0;
    let x = c * (1.0 - ((hp % 2.0) - 1.0).abs());
    let (r, g, b) = if (0.0..1.0).contains(&hp) {
        (c, x, 0.0)
    } else if (1.0..2.0).contains(&hp) {
        (x, c, 0.0)
    } else if (2.0..3.0).contains(&hp) {
        (0.0, c, x)
    } else if (3.0..4.0).contains(&hp) {
        (0.0, x, c)
    } else if (4.0..5.0).contains(&hp) {
        (x, 0.0, c)
    } else if (5.0..6.0).contains(&hp) {
        (c, 0.0, x)
    } else {
        (0.0, 0.0, 0.0)
    };
    let m = v - c;
    Rgb::new(to_byte(r + m), to_byte(g + m), to_byte(b + m))
}

fn to_byte(unit: f64) -> u8 {
    (unit * 255.0).round().clamp(0.0, 255.0) as u8
}

/// NaN maps to 0.
fn clamp01(x: f64) -> f64 {
    if x > 1.0 {
        1.0
    } else if x > 0.0 {
        x
    } else {
        0.0
    }
}
