//! Grade classification for gradient-colored route rendering.
//!
//! A pure mapping from signed grade to a steepness band and a render color:
//! the magnitude selects the band, the sign selects the uphill or downhill
//! palette. Callable independently of any rendering layer.

use serde::{Deserialize, Serialize};

/// Band thresholds on absolute grade: flat below 0.5%, then 3%, 8%, 15%.
const BAND_THRESHOLDS: [f64; 4] = [0.005, 0.03, 0.08, 0.15];

/// Steepness band, ordered by absolute grade magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GradeBand {
    /// Below 0.5%
    Flat,
    /// 0.5% to 3%
    Moderate,
    /// 3% to 8%
    Steep,
    /// 8% to 15%
    VerySteep,
    /// 15% and above
    Extreme,
}

impl GradeBand {
    /// Position in the band ordering (0 = flat .. 4 = extreme).
    pub fn band_index(self) -> u8 {
        match self {
            GradeBand::Flat => 0,
            GradeBand::Moderate => 1,
            GradeBand::Steep => 2,
            GradeBand::VerySteep => 3,
            GradeBand::Extreme => 4,
        }
    }

    fn from_index(index: usize) -> Self {
        match index {
            0 => GradeBand::Flat,
            1 => GradeBand::Moderate,
            2 => GradeBand::Steep,
            3 => GradeBand::VerySteep,
            _ => GradeBand::Extreme,
        }
    }
}

/// Classify a signed grade into its steepness band by magnitude.
///
/// # Example
/// ```
/// use track_exporter::{classify_grade, GradeBand};
///
/// assert_eq!(classify_grade(0.002), GradeBand::Flat);
/// assert_eq!(classify_grade(-0.05), GradeBand::Steep);
/// assert_eq!(classify_grade(0.20), GradeBand::Extreme);
/// ```
pub fn classify_grade(grade: f64) -> GradeBand {
    let magnitude = grade.abs();
    for (i, &threshold) in BAND_THRESHOLDS.iter().enumerate() {
        if magnitude < threshold {
            return GradeBand::from_index(i);
        }
    }
    GradeBand::Extreme
}

/// An RGBA render color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Hex form for platforms that take colors as strings.
    ///
    /// # Example
    /// ```
    /// use track_exporter::Color;
    /// assert_eq!(Color::rgb(76, 175, 80).hex(), "#4CAF50");
    /// ```
    pub fn hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// Uphill palette, green through orange into red as the climb steepens.
const UPHILL_COLORS: [Color; 5] = [
    Color::rgb(0x4C, 0xAF, 0x50), // flat: green
    Color::rgb(0xCD, 0xDC, 0x39), // moderate: lime
    Color::rgb(0xFF, 0xB3, 0x00), // steep: amber
    Color::rgb(0xF5, 0x7C, 0x00), // very steep: orange
    Color::rgb(0xD3, 0x2F, 0x2F), // extreme: red
];

/// Downhill palette, light blue into purple as the drop steepens.
const DOWNHILL_COLORS: [Color; 5] = [
    Color::rgb(0x81, 0xD4, 0xFA), // flat: light blue
    Color::rgb(0x42, 0xA5, 0xF5), // moderate: blue
    Color::rgb(0x5C, 0x6B, 0xC0), // steep: indigo
    Color::rgb(0x7E, 0x57, 0xC2), // very steep: violet
    Color::rgb(0x8E, 0x24, 0xAA), // extreme: purple
];

/// Render color for a signed grade: magnitude picks the band, sign picks
/// the uphill or downhill palette.
pub fn color_for_grade(grade: f64) -> Color {
    let band = classify_grade(grade).band_index() as usize;
    if grade < 0.0 {
        DOWNHILL_COLORS[band]
    } else {
        UPHILL_COLORS[band]
    }
}
