//! Color values.
//!
//! sRGB colors are stored as 8-bit channels; `hsl()` and `hwb()` convert to
//! them at parse time. Lab-family colors keep their own coordinates so they
//! can be printed unchanged, and convert to sRGB on demand for fallbacks.

use std::fmt;

use crate::compat::Feature;
use crate::printer::{Printer, ToCss};
use crate::values::ComponentValue;
use crate::values::number::format_number;

/// An sRGB color with 8-bit channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgba {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub alpha: u8,
}

impl Rgba {
    pub fn new(red: u8, green: u8, blue: u8, alpha: u8) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    fn from_unit(red: f64, green: f64, blue: f64, alpha: f32) -> Self {
        Self {
            red: unit_to_byte(red),
            green: unit_to_byte(green),
            blue: unit_to_byte(blue),
            alpha: unit_to_byte(alpha as f64),
        }
    }

    /// Alpha as a number between 0 and 1, with the fewest decimals that
    /// round-trip to the same byte.
    pub fn alpha_f32(&self) -> f32 {
        let exact = self.alpha as f32 / 255.0;
        let two = (exact * 100.0).round() / 100.0;
        if unit_to_byte(two as f64) == self.alpha {
            two
        } else {
            (exact * 1000.0).round() / 1000.0
        }
    }
}

fn unit_to_byte(value: f64) -> u8 {
    (value * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Coordinates of a `lab()` or `oklab()` color.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lab {
    pub l: f32,
    pub a: f32,
    pub b: f32,
    pub alpha: f32,
}

/// Coordinates of an `lch()` or `oklch()` color. Hue is in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lch {
    pub l: f32,
    pub c: f32,
    pub h: f32,
    pub alpha: f32,
}

/// A parsed color.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CssColor {
    /// Printed as the shortest hex form.
    Rgba(Rgba),
    /// Printed as `rgba()`, for engines without hex-alpha support.
    LegacyRgba(Rgba),
    Lab(Lab),
    Lch(Lch),
    Oklab(Lab),
    Oklch(Lch),
}

impl CssColor {
    /// Parse the name of a hash token (`fff`, `ff000080`).
    pub fn from_hex(hex: &str) -> Option<CssColor> {
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let digit = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok();
        let pair = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        let rgba = match hex.len() {
            3 => Rgba::new(digit(0)? * 17, digit(1)? * 17, digit(2)? * 17, 255),
            4 => Rgba::new(
                digit(0)? * 17,
                digit(1)? * 17,
                digit(2)? * 17,
                digit(3)? * 17,
            ),
            6 => Rgba::new(pair(0)?, pair(2)?, pair(4)?, 255),
            8 => Rgba::new(pair(0)?, pair(2)?, pair(4)?, pair(6)?),
            _ => return None,
        };
        Some(CssColor::Rgba(rgba))
    }

    /// Parse a color function from its lowercase name and arguments.
    ///
    /// Returns `None` for anything that is not a plain literal color, such as
    /// arguments containing `var()` or `calc()`, so the caller can keep the
    /// function as written.
    pub fn from_function(name: &str, arguments: &[ComponentValue]) -> Option<CssColor> {
        let args = ColorArgs::split(arguments)?;
        match name {
            "rgb" | "rgba" => {
                let [r, g, b] = args.channels;
                let channel = |value: &ComponentValue| match value {
                    ComponentValue::Number(n) => Some(*n as f64 / 255.0),
                    ComponentValue::Percentage(p) => Some(*p as f64 / 100.0),
                    ComponentValue::Ident(i) if i.eq_ignore_ascii_case("none") => Some(0.0),
                    _ => None,
                };
                Some(CssColor::Rgba(Rgba::from_unit(
                    channel(r)?,
                    channel(g)?,
                    channel(b)?,
                    args.alpha()?,
                )))
            }
            "hsl" | "hsla" => {
                let [h, s, l] = args.channels;
                let (r, g, b) = hsl_to_rgb(hue(h)? as f64, fraction(s)?, fraction(l)?);
                Some(CssColor::Rgba(Rgba::from_unit(r, g, b, args.alpha()?)))
            }
            "hwb" if !args.legacy => {
                let [h, w, b] = args.channels;
                let (r, g, b) = hwb_to_rgb(hue(h)? as f64, fraction(w)?, fraction(b)?);
                Some(CssColor::Rgba(Rgba::from_unit(r, g, b, args.alpha()?)))
            }
            "lab" if !args.legacy => {
                let [l, a, b] = args.channels;
                Some(CssColor::Lab(Lab {
                    l: scaled(l, 100.0)?.max(0.0),
                    a: scaled(a, 125.0)?,
                    b: scaled(b, 125.0)?,
                    alpha: args.alpha()?,
                }))
            }
            "lch" if !args.legacy => {
                let [l, c, h] = args.channels;
                Some(CssColor::Lch(Lch {
                    l: scaled(l, 100.0)?.max(0.0),
                    c: scaled(c, 150.0)?.max(0.0),
                    h: hue(h)?,
                    alpha: args.alpha()?,
                }))
            }
            "oklab" if !args.legacy => {
                let [l, a, b] = args.channels;
                Some(CssColor::Oklab(Lab {
                    l: scaled(l, 1.0)?.max(0.0),
                    a: scaled(a, 0.4)?,
                    b: scaled(b, 0.4)?,
                    alpha: args.alpha()?,
                }))
            }
            "oklch" if !args.legacy => {
                let [l, c, h] = args.channels;
                Some(CssColor::Oklch(Lch {
                    l: scaled(l, 1.0)?.max(0.0),
                    c: scaled(c, 0.4)?.max(0.0),
                    h: hue(h)?,
                    alpha: args.alpha()?,
                }))
            }
            _ => None,
        }
    }

    /// The feature an engine must support to understand this color as written.
    pub fn feature(&self) -> Option<Feature> {
        match self {
            CssColor::Rgba(rgba) if rgba.alpha != 255 => Some(Feature::HexAlphaColors),
            CssColor::Rgba(_) | CssColor::LegacyRgba(_) => None,
            CssColor::Lab(_) | CssColor::Lch(_) => Some(Feature::LabColors),
            CssColor::Oklab(_) | CssColor::Oklch(_) => Some(Feature::OklabColors),
        }
    }

    /// Whether this is a lab, lch, oklab or oklch color.
    pub fn is_lab_family(&self) -> bool {
        matches!(
            self,
            CssColor::Lab(_) | CssColor::Lch(_) | CssColor::Oklab(_) | CssColor::Oklch(_)
        )
    }

    /// Convert to sRGB, clamping out-of-gamut channels.
    pub fn to_rgba(&self) -> Rgba {
        match *self {
            CssColor::Rgba(rgba) | CssColor::LegacyRgba(rgba) => rgba,
            CssColor::Lab(lab) => {
                let (r, g, b) = lab_to_srgb(lab.l as f64, lab.a as f64, lab.b as f64);
                Rgba::from_unit(r, g, b, lab.alpha)
            }
            CssColor::Lch(lch) => {
                let (a, b) = polar_to_rect(lch.c as f64, lch.h as f64);
                let (r, g, b) = lab_to_srgb(lch.l as f64, a, b);
                Rgba::from_unit(r, g, b, lch.alpha)
            }
            CssColor::Oklab(lab) => {
                let (r, g, b) = oklab_to_srgb(lab.l as f64, lab.a as f64, lab.b as f64);
                Rgba::from_unit(r, g, b, lab.alpha)
            }
            CssColor::Oklch(lch) => {
                let (a, b) = polar_to_rect(lch.c as f64, lch.h as f64);
                let (r, g, b) = oklab_to_srgb(lch.l as f64, a, b);
                Rgba::from_unit(r, g, b, lch.alpha)
            }
        }
    }
}

/// Color function arguments in either the comma or the space syntax.
struct ColorArgs<'a> {
    channels: [&'a ComponentValue; 3],
    alpha: Option<&'a ComponentValue>,
    legacy: bool,
}

impl<'a> ColorArgs<'a> {
    fn split(arguments: &'a [ComponentValue]) -> Option<Self> {
        let items: Vec<&ComponentValue> = arguments
            .iter()
            .filter(|v| !matches!(v, ComponentValue::Whitespace))
            .collect();
        let legacy = items.iter().any(|v| matches!(v, ComponentValue::Comma));

        if legacy {
            // a, b, c[, d]
            if items.len() % 2 == 0 {
                return None;
            }
            let mut values = Vec::with_capacity(4);
            for (i, value) in items.iter().enumerate() {
                let is_comma = matches!(value, ComponentValue::Comma);
                if (i % 2 == 1) != is_comma {
                    return None;
                }
                if !is_comma {
                    values.push(*value);
                }
            }
            return match values.as_slice() {
                [a, b, c] => Some(Self {
                    channels: [*a, *b, *c],
                    alpha: None,
                    legacy,
                }),
                [a, b, c, d] => Some(Self {
                    channels: [*a, *b, *c],
                    alpha: Some(*d),
                    legacy,
                }),
                _ => None,
            };
        }

        match items.as_slice() {
            [a, b, c] => Some(Self {
                channels: [*a, *b, *c],
                alpha: None,
                legacy,
            }),
            [a, b, c, ComponentValue::Delim('/'), d] => Some(Self {
                channels: [*a, *b, *c],
                alpha: Some(*d),
                legacy,
            }),
            _ => None,
        }
    }

    fn alpha(&self) -> Option<f32> {
        match self.alpha {
            None => Some(1.0),
            Some(ComponentValue::Number(n)) => Some(n.clamp(0.0, 1.0)),
            Some(ComponentValue::Percentage(p)) => Some((p / 100.0).clamp(0.0, 1.0)),
            Some(ComponentValue::Ident(i)) if i.eq_ignore_ascii_case("none") => Some(0.0),
            Some(_) => None,
        }
    }
}

/// A number, or a percentage of `full`.
fn scaled(value: &ComponentValue, full: f32) -> Option<f32> {
    match value {
        ComponentValue::Number(n) => Some(*n),
        ComponentValue::Percentage(p) => Some(p / 100.0 * full),
        ComponentValue::Ident(i) if i.eq_ignore_ascii_case("none") => Some(0.0),
        _ => None,
    }
}

/// A percentage (or bare number) as a fraction of one.
fn fraction(value: &ComponentValue) -> Option<f64> {
    match value {
        ComponentValue::Percentage(p) | ComponentValue::Number(p) => {
            Some((*p as f64 / 100.0).clamp(0.0, 1.0))
        }
        ComponentValue::Ident(i) if i.eq_ignore_ascii_case("none") => Some(0.0),
        _ => None,
    }
}

/// A hue in degrees.
fn hue(value: &ComponentValue) -> Option<f32> {
    match value {
        ComponentValue::Number(n) => Some(*n),
        ComponentValue::Dimension { value, unit } => {
            let degrees = match unit.to_ascii_lowercase().as_str() {
                "deg" => *value,
                "rad" => value.to_degrees(),
                "grad" => value * 0.9,
                "turn" => value * 360.0,
                _ => return None,
            };
            Some(degrees)
        }
        ComponentValue::Ident(i) if i.eq_ignore_ascii_case("none") => Some(0.0),
        _ => None,
    }
}

fn hsl_to_rgb(hue: f64, saturation: f64, lightness: f64) -> (f64, f64, f64) {
    let hue = hue.rem_euclid(360.0) / 360.0;
    if saturation == 0.0 {
        return (lightness, lightness, lightness);
    }
    let t2 = if lightness <= 0.5 {
        lightness * (saturation + 1.0)
    } else {
        lightness + saturation - lightness * saturation
    };
    let t1 = lightness * 2.0 - t2;
    let channel = |h: f64| {
        let h = h.rem_euclid(1.0);
        if h * 6.0 < 1.0 {
            t1 + (t2 - t1) * h * 6.0
        } else if h * 2.0 < 1.0 {
            t2
        } else if h * 3.0 < 2.0 {
            t1 + (t2 - t1) * (2.0 / 3.0 - h) * 6.0
        } else {
            t1
        }
    };
    (
        channel(hue + 1.0 / 3.0),
        channel(hue),
        channel(hue - 1.0 / 3.0),
    )
}

fn hwb_to_rgb(hue: f64, whiteness: f64, blackness: f64) -> (f64, f64, f64) {
    if whiteness + blackness >= 1.0 {
        let gray = whiteness / (whiteness + blackness);
        return (gray, gray, gray);
    }
    let (r, g, b) = hsl_to_rgb(hue, 1.0, 0.5);
    let scale = 1.0 - whiteness - blackness;
    (
        r * scale + whiteness,
        g * scale + whiteness,
        b * scale + whiteness,
    )
}

fn polar_to_rect(chroma: f64, hue: f64) -> (f64, f64) {
    let radians = hue.to_radians();
    (chroma * radians.cos(), chroma * radians.sin())
}

fn lab_to_srgb(l: f64, a: f64, b: f64) -> (f64, f64, f64) {
    const KAPPA: f64 = 24389.0 / 27.0;
    const EPSILON: f64 = 216.0 / 24389.0;
    const D50: [f64; 3] = [0.3457 / 0.3585, 1.0, (1.0 - 0.3457 - 0.3585) / 0.3585];

    let f1 = (l + 16.0) / 116.0;
    let f0 = a / 500.0 + f1;
    let f2 = f1 - b / 200.0;
    let x = if f0.powi(3) > EPSILON {
        f0.powi(3)
    } else {
        (116.0 * f0 - 16.0) / KAPPA
    };
    let y = if l > KAPPA * EPSILON {
        f1.powi(3)
    } else {
        l / KAPPA
    };
    let z = if f2.powi(3) > EPSILON {
        f2.powi(3)
    } else {
        (116.0 * f2 - 16.0) / KAPPA
    };
    let xyz50 = [x * D50[0], y * D50[1], z * D50[2]];

    // Bradford chromatic adaptation, D50 to D65.
    let xyz65 = multiply(
        &[
            [0.955_473_452_704_218_2, -0.023_098_536_874_261_423, 0.063_259_308_661_021_7],
            [-0.028_369_706_963_208_136, 1.009_995_458_005_822_6, 0.021_041_398_966_943_008],
            [0.012_314_001_688_319_899, -0.020_507_696_433_477_912, 1.330_365_936_608_075_3],
        ],
        xyz50,
    );
    let linear = multiply(
        &[
            [3.240_969_941_904_522_6, -1.537_383_177_570_094, -0.498_610_760_293_003_4],
            [-0.969_243_636_280_879_6, 1.875_967_501_507_720_2, 0.041_555_057_407_175_59],
            [0.055_630_079_696_993_66, -0.203_976_958_888_976_52, 1.056_971_514_242_878_6],
        ],
        xyz65,
    );
    (gamma(linear[0]), gamma(linear[1]), gamma(linear[2]))
}

fn oklab_to_srgb(l: f64, a: f64, b: f64) -> (f64, f64, f64) {
    let l_ = l + 0.396_337_777_4 * a + 0.215_803_757_3 * b;
    let m_ = l - 0.105_561_345_8 * a - 0.063_854_172_8 * b;
    let s_ = l - 0.089_484_177_5 * a - 1.291_485_548_0 * b;
    let (l, m, s) = (l_.powi(3), m_.powi(3), s_.powi(3));
    let r = 4.076_741_662_1 * l - 3.307_711_591_3 * m + 0.230_969_929_2 * s;
    let g = -1.268_438_004_6 * l + 2.609_757_401_1 * m - 0.341_319_396_5 * s;
    let b = -0.004_196_086_3 * l - 0.703_418_614_7 * m + 1.707_614_701_0 * s;
    (gamma(r), gamma(g), gamma(b))
}

fn multiply(matrix: &[[f64; 3]; 3], v: [f64; 3]) -> [f64; 3] {
    [
        matrix[0][0] * v[0] + matrix[0][1] * v[1] + matrix[0][2] * v[2],
        matrix[1][0] * v[0] + matrix[1][1] * v[1] + matrix[1][2] * v[2],
        matrix[2][0] * v[0] + matrix[2][1] * v[1] + matrix[2][2] * v[2],
    ]
}

/// Linear-light to sRGB transfer function.
fn gamma(c: f64) -> f64 {
    let abs = c.abs();
    if abs > 0.003_130_8 {
        c.signum() * (1.055 * abs.powf(1.0 / 2.4) - 0.055)
    } else {
        12.92 * c
    }
}

impl ToCss for CssColor {
    fn to_css(&self, dest: &mut Printer<'_>) -> fmt::Result {
        match self {
            CssColor::Rgba(rgba) => write_hex(rgba, dest),
            CssColor::LegacyRgba(rgba) => {
                let name = if rgba.alpha == 255 { "rgb(" } else { "rgba(" };
                dest.write_str(name)?;
                dest.write_number(rgba.red as f32)?;
                dest.delim(',', false)?;
                dest.write_number(rgba.green as f32)?;
                dest.delim(',', false)?;
                dest.write_number(rgba.blue as f32)?;
                if rgba.alpha != 255 {
                    dest.delim(',', false)?;
                    dest.write_number(rgba.alpha_f32())?;
                }
                dest.write_char(')')
            }
            CssColor::Lab(lab) => write_coordinates(dest, "lab", [lab.l, lab.a, lab.b], lab.alpha),
            CssColor::Lch(lch) => write_coordinates(dest, "lch", [lch.l, lch.c, lch.h], lch.alpha),
            CssColor::Oklab(lab) => {
                write_coordinates(dest, "oklab", [lab.l, lab.a, lab.b], lab.alpha)
            }
            CssColor::Oklch(lch) => {
                write_coordinates(dest, "oklch", [lch.l, lch.c, lch.h], lch.alpha)
            }
        }
    }
}

fn write_hex(rgba: &Rgba, dest: &mut Printer<'_>) -> fmt::Result {
    let channels = [rgba.red, rgba.green, rgba.blue, rgba.alpha];
    let channels = if rgba.alpha == 255 {
        &channels[..3]
    } else {
        &channels[..]
    };
    let short = channels.iter().all(|c| c >> 4 == c & 0xf);
    let mut text = String::from("#");
    for c in channels {
        if short {
            text.push_str(&format!("{:x}", c & 0xf));
        } else {
            text.push_str(&format!("{c:02x}"));
        }
    }
    dest.write_str(&text)
}

fn write_coordinates(
    dest: &mut Printer<'_>,
    name: &str,
    coordinates: [f32; 3],
    alpha: f32,
) -> fmt::Result {
    dest.write_str(name)?;
    dest.write_char('(')?;
    for (i, value) in coordinates.iter().enumerate() {
        if i > 0 {
            dest.write_char(' ')?;
        }
        dest.write_str(&format_number(*value, dest.minify))?;
    }
    if alpha != 1.0 {
        dest.delim('/', true)?;
        dest.write_number(alpha)?;
    }
    dest.write_char(')')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[ComponentValue]) -> Vec<ComponentValue> {
        values.to_vec()
    }

    #[test]
    fn test_hex() {
        assert_eq!(
            CssColor::from_hex("f00"),
            Some(CssColor::Rgba(Rgba::new(255, 0, 0, 255)))
        );
        assert_eq!(
            CssColor::from_hex("ff000080"),
            Some(CssColor::Rgba(Rgba::new(255, 0, 0, 128)))
        );
        assert_eq!(CssColor::from_hex("ff00"), Some(CssColor::Rgba(Rgba::new(255, 255, 0, 0))));
        assert_eq!(CssColor::from_hex("main"), None);
        assert_eq!(CssColor::from_hex("12345"), None);
    }

    #[test]
    fn test_shortest_hex() {
        assert_eq!(CssColor::Rgba(Rgba::new(255, 0, 0, 255)).to_css_string(), "#f00");
        assert_eq!(CssColor::Rgba(Rgba::new(18, 52, 86, 255)).to_css_string(), "#123456");
        assert_eq!(CssColor::Rgba(Rgba::new(255, 0, 0, 136)).to_css_string(), "#f008");
        assert_eq!(CssColor::Rgba(Rgba::new(255, 0, 0, 128)).to_css_string(), "#ff000080");
    }

    #[test]
    fn test_legacy_rgba() {
        let color = CssColor::LegacyRgba(Rgba::new(255, 0, 0, 128));
        assert_eq!(color.to_css_string(), "rgba(255, 0, 0, 0.5)");
    }

    #[test]
    fn test_rgb_function_syntaxes() {
        use ComponentValue::*;
        let legacy = args(&[Number(255.0), Comma, Whitespace, Number(0.0), Comma, Number(0.0)]);
        assert_eq!(
            CssColor::from_function("rgb", &legacy),
            Some(CssColor::Rgba(Rgba::new(255, 0, 0, 255)))
        );

        let modern = args(&[
            Number(0.0),
            Whitespace,
            Percentage(100.0),
            Whitespace,
            Number(0.0),
            Whitespace,
            Delim('/'),
            Whitespace,
            Percentage(50.0),
        ]);
        assert_eq!(
            CssColor::from_function("rgb", &modern),
            Some(CssColor::Rgba(Rgba::new(0, 255, 0, 128)))
        );

        let with_var = args(&[Ident("var".into()), Comma, Number(0.0), Comma, Number(0.0)]);
        assert_eq!(CssColor::from_function("rgb", &with_var), None);
    }

    #[test]
    fn test_hsl() {
        use ComponentValue::*;
        let red = args(&[
            Number(0.0),
            Whitespace,
            Percentage(100.0),
            Whitespace,
            Percentage(50.0),
        ]);
        assert_eq!(
            CssColor::from_function("hsl", &red),
            Some(CssColor::Rgba(Rgba::new(255, 0, 0, 255)))
        );
        let blue = args(&[
            Dimension {
                value: 240.0,
                unit: "deg".into(),
            },
            Comma,
            Percentage(100.0),
            Comma,
            Percentage(50.0),
        ]);
        assert_eq!(
            CssColor::from_function("hsl", &blue),
            Some(CssColor::Rgba(Rgba::new(0, 0, 255, 255)))
        );
    }

    #[test]
    fn test_lab_family_to_srgb() {
        let white = CssColor::Lch(Lch {
            l: 100.0,
            c: 0.0,
            h: 0.0,
            alpha: 1.0,
        });
        assert_eq!(white.to_rgba(), Rgba::new(255, 255, 255, 255));

        let black = CssColor::Lab(Lab {
            l: 0.0,
            a: 0.0,
            b: 0.0,
            alpha: 1.0,
        });
        assert_eq!(black.to_rgba(), Rgba::new(0, 0, 0, 255));

        let ok_white = CssColor::Oklab(Lab {
            l: 1.0,
            a: 0.0,
            b: 0.0,
            alpha: 1.0,
        });
        assert_eq!(ok_white.to_rgba(), Rgba::new(255, 255, 255, 255));
    }

    #[test]
    fn test_lab_printing() {
        let color = CssColor::Lch(Lch {
            l: 50.0,
            c: 40.0,
            h: 30.0,
            alpha: 0.5,
        });
        assert_eq!(color.to_css_string(), "lch(50 40 30 / 0.5)");
        assert_eq!(color.feature(), Some(Feature::LabColors));
    }
}
