//! Filament color codes and RGB arithmetic
//!
//! Paint codes are concatenations of two-character segments. Each segment is
//! looked up in [`FILAMENT_CODES`]; its position in the table is the filament
//! index, which the package's slicing metadata maps to an RGB color.
//!
//! All color math happens in the 0-255 domain. Normalization to `[0, 1]`
//! only happens at the presentation boundary ([`Rgb::to_normalized`]).

use std::collections::BTreeMap;

/// Filament segment codes in filament-index order
///
/// Index 0 is the empty-string sentinel. The table is closed: segments not
/// listed here contribute nothing to a blend.
pub const FILAMENT_CODES: [&str; 33] = [
    "", "4", "8", "0C", "1C", "2C", "3C", "4C", "5C", "6C", "7C", "8C", "9C", "AC", "BC", "CC",
    "DC", "EC", "0FC", "1FC", "2FC", "3FC", "4FC", "5FC", "6FC", "7FC", "8FC", "9FC", "AFC", "BFC",
    "CFC", "DFC", "EFC",
];

/// Width of one paint-code segment
pub const SEGMENT_WIDTH: usize = 2;

/// An RGB color with channels in `[0, 255]`
///
/// Channels are floating point because blends of integer colors are not
/// integers (e.g. red and green average to `(127.5, 127.5, 0)`).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Rgb {
    /// Red channel
    pub r: f64,
    /// Green channel
    pub g: f64,
    /// Blue channel
    pub b: f64,
}

impl Rgb {
    /// Magenta: the color could not be resolved
    pub const SENTINEL: Rgb = Rgb::new(255.0, 0.0, 255.0);

    /// Create a color from channel values
    pub const fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    /// Create a color from 8-bit channels
    pub fn from_u8(r: u8, g: u8, b: u8) -> Self {
        Self::new(f64::from(r), f64::from(g), f64::from(b))
    }

    /// Euclidean distance between two colors
    pub fn distance(&self, other: &Rgb) -> f64 {
        let dr = self.r - other.r;
        let dg = self.g - other.g;
        let db = self.b - other.b;
        (dr * dr + dg * dg + db * db).sqrt()
    }

    /// RGBA in `[0, 1]` with opaque alpha, as renderers expect
    pub fn to_normalized(&self) -> [f32; 4] {
        [
            (self.r / 255.0) as f32,
            (self.g / 255.0) as f32,
            (self.b / 255.0) as f32,
            1.0,
        ]
    }

    /// `#RRGGBB` with channels rounded to the nearest integer
    pub fn to_hex(&self) -> String {
        let channel = |v: f64| v.round().clamp(0.0, 255.0) as u8;
        format!(
            "#{:02X}{:02X}{:02X}",
            channel(self.r),
            channel(self.g),
            channel(self.b)
        )
    }
}

/// Arithmetic mean of each channel, or `None` for an empty slice
pub fn blend(colors: &[Rgb]) -> Option<Rgb> {
    if colors.is_empty() {
        return None;
    }
    let n = colors.len() as f64;
    let (r, g, b) = colors
        .iter()
        .fold((0.0, 0.0, 0.0), |(r, g, b), c| (r + c.r, g + c.g, b + c.b));
    Some(Rgb::new(r / n, g / n, b / n))
}

/// Parse a `#RRGGBB` or `#RRGGBBAA` color; alpha is discarded
pub fn parse_hex_color(color_str: &str) -> Option<Rgb> {
    let hex = color_str.strip_prefix('#').unwrap_or(color_str);
    if !(hex.len() == 6 || hex.len() == 8) || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    if hex.len() == 8 {
        u8::from_str_radix(&hex[6..8], 16).ok()?;
    }
    Some(Rgb::from_u8(r, g, b))
}

/// Look up a segment in the filament code table
pub fn filament_index(segment: &str) -> Option<usize> {
    FILAMENT_CODES.iter().position(|code| *code == segment)
}

/// Split a paint code into segments and return the filament index of each
/// segment found in the table, in order
///
/// An odd trailing character is discarded; unknown segments are dropped.
pub fn decode_paint_code(code: &str) -> Vec<usize> {
    code.as_bytes()
        .chunks_exact(SEGMENT_WIDTH)
        .filter_map(|segment| std::str::from_utf8(segment).ok())
        .filter_map(filament_index)
        .collect()
}

/// Filament index to color map read from slicing metadata
///
/// Keys are the metadata's `id` strings. A missing index resolves to
/// [`Rgb::SENTINEL`].
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FilamentColors {
    colors: BTreeMap<String, Rgb>,
}

impl FilamentColors {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a filament color
    pub fn insert(&mut self, id: impl Into<String>, color: Rgb) {
        self.colors.insert(id.into(), color);
    }

    /// Color for a filament index, falling back to the sentinel
    pub fn color_for(&self, index: usize) -> Rgb {
        self.colors
            .get(&index.to_string())
            .copied()
            .unwrap_or(Rgb::SENTINEL)
    }

    /// Color for a raw metadata id
    pub fn get(&self, id: &str) -> Option<Rgb> {
        self.colors.get(id).copied()
    }

    /// Number of filaments
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    /// Check if the map is empty
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Iterate `(id, color)` pairs in id order
    pub fn iter(&self) -> impl Iterator<Item = (&str, Rgb)> {
        self.colors.iter().map(|(id, c)| (id.as_str(), *c))
    }
}

impl<S: Into<String>> FromIterator<(S, Rgb)> for FilamentColors {
    fn from_iter<I: IntoIterator<Item = (S, Rgb)>>(iter: I) -> Self {
        Self {
            colors: iter.into_iter().map(|(id, c)| (id.into(), c)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_layout() {
        assert_eq!(FILAMENT_CODES.len(), 33);
        assert_eq!(filament_index(""), Some(0));
        assert_eq!(filament_index("4"), Some(1));
        assert_eq!(filament_index("0C"), Some(3));
        assert_eq!(filament_index("1C"), Some(4));
        assert_eq!(filament_index("2C"), Some(5));
        assert_eq!(filament_index("EC"), Some(17));
        assert_eq!(filament_index("EFC"), Some(32));
        assert_eq!(filament_index("ZZ"), None);
    }

    #[test]
    fn test_decode_paint_code() {
        assert_eq!(decode_paint_code("1C2C"), vec![4, 5]);
        assert_eq!(decode_paint_code("1CZZ2C"), vec![4, 5]);
        assert!(decode_paint_code("ZZ").is_empty());
        assert!(decode_paint_code("").is_empty());
    }

    #[test]
    fn test_decode_discards_odd_tail() {
        // A lone "4" would match table entry 1 if it were kept
        assert_eq!(decode_paint_code("1C4"), vec![4]);
        assert!(decode_paint_code("4").is_empty());
    }

    #[test]
    fn test_decode_non_ascii_does_not_panic() {
        assert!(decode_paint_code("aé1C").is_empty());
        assert_eq!(decode_paint_code("1Cé"), vec![4]);
    }

    #[test]
    fn test_blend_mean() {
        let red = Rgb::from_u8(255, 0, 0);
        let green = Rgb::from_u8(0, 255, 0);
        assert_eq!(blend(&[red, green]), Some(Rgb::new(127.5, 127.5, 0.0)));
        assert_eq!(blend(&[red]), Some(red));
        assert_eq!(blend(&[]), None);
    }

    #[test]
    fn test_distance() {
        let a = Rgb::from_u8(10, 10, 10);
        let b = Rgb::from_u8(10, 10, 11);
        assert_eq!(a.distance(&b), 1.0);
        assert_eq!(a.distance(&a), 0.0);
        assert_eq!(Rgb::from_u8(0, 0, 0).distance(&Rgb::from_u8(3, 4, 0)), 5.0);
    }

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#FF8000"), Some(Rgb::from_u8(255, 128, 0)));
        assert_eq!(parse_hex_color("00ff00"), Some(Rgb::from_u8(0, 255, 0)));
        assert_eq!(parse_hex_color("#FF800080"), Some(Rgb::from_u8(255, 128, 0)));
        assert_eq!(parse_hex_color("#FF80"), None);
        assert_eq!(parse_hex_color("#GG0000"), None);
        assert_eq!(parse_hex_color("#FF800Z80"), None);
        assert_eq!(parse_hex_color("#ééé"), None);
        // from_str_radix alone would accept a sign
        assert_eq!(parse_hex_color("#+F+F+F"), None);
        assert_eq!(parse_hex_color("#-10000"), None);
        assert_eq!(parse_hex_color("#+F+F+F+F"), None);
    }

    #[test]
    fn test_normalized_and_hex() {
        assert_eq!(Rgb::SENTINEL.to_normalized(), [1.0, 0.0, 1.0, 1.0]);
        assert_eq!(Rgb::SENTINEL.to_hex(), "#FF00FF");
        assert_eq!(Rgb::new(127.5, 127.4, 0.0).to_hex(), "#807F00");
    }

    #[test]
    fn test_filament_colors_fallback() {
        let colors: FilamentColors = [("1", Rgb::from_u8(255, 0, 0))].into_iter().collect();
        assert_eq!(colors.color_for(1), Rgb::from_u8(255, 0, 0));
        assert_eq!(colors.color_for(2), Rgb::SENTINEL);
        assert_eq!(FilamentColors::new().color_for(0), Rgb::SENTINEL);
    }
}
