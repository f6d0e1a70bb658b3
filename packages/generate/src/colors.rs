//! Distinct, reproducible marker colors.
//!
//! Hues step around the color wheel by the golden-ratio conjugate, which
//! keeps successive hues far apart. Saturation and brightness cycle with
//! short periods so neighbours also differ in tone. Only the first
//! `max_distinct` keys get a hue; the rest share [`FALLBACK_GRAY`].

use std::collections::BTreeMap;

/// Golden-ratio conjugate, `(sqrt(5) - 1) / 2`.
pub const GOLDEN_RATIO_CONJUGATE: f64 = 0.618_033_988_749_895;

/// Color given to every key past `max_distinct`.
pub const FALLBACK_GRAY: &str = "#808080";

/// How many keys get a distinct color by default.
pub const DEFAULT_MAX_DISTINCT: usize = 50;

/// Mapping from key to `#rrggbb` color.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorAssignment<K: Ord> {
    colors: BTreeMap<K, String>,
}

impl<K: Ord> ColorAssignment<K> {
    /// The color for `key`, or [`FALLBACK_GRAY`] if it was never assigned.
    #[must_use]
    pub fn get(&self, key: &K) -> &str {
        self.colors.get(key).map_or(FALLBACK_GRAY, String::as_str)
    }

    /// Number of keys with an assigned color.
    #[must_use]
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    /// Whether nothing was assigned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

/// Assigns a color to each key by its position in `keys`.
///
/// The result depends only on the order of `keys`. A key listed twice keeps
/// the color of its first position.
#[must_use]
pub fn assign_colors<K: Ord + Clone>(keys: &[K], max_distinct: usize) -> ColorAssignment<K> {
    let mut colors = BTreeMap::new();
    for (i, key) in keys.iter().enumerate() {
        let color = if i < max_distinct {
            color_for_index(i)
        } else {
            FALLBACK_GRAY.to_string()
        };
        colors.entry(key.clone()).or_insert(color);
    }
    ColorAssignment { colors }
}

/// The `#rrggbb` color for position `i`.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::suboptimal_flops)]
pub fn color_for_index(i: usize) -> String {
    let hue = (i as f64 * GOLDEN_RATIO_CONJUGATE) % 1.0;
    let saturation = 0.7 + (i % 3) as f64 * 0.1;
    let value = 0.8 + (i % 2) as f64 * 0.1;
    let (r, g, b) = hsv_to_rgb(hue, saturation, value);
    format!("#{:02x}{:02x}{:02x}", channel(r), channel(g), channel(b))
}

/// Scales a `0.0..=1.0` channel to `0..=255`, truncating.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn channel(c: f64) -> u8 {
    (c * 255.0).clamp(0.0, 255.0) as u8
}

/// Converts HSV (all components in `0.0..=1.0`) to RGB.
///
/// Arithmetic stays unfused; channels are truncated, so a one-ulp change
/// can shift a channel by one.
#[allow(
    clippy::suboptimal_flops,
    clippy::many_single_char_names,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn hsv_to_rgb(h: f64, s: f64, v: f64) -> (f64, f64, f64) {
    if s == 0.0 {
        return (v, v, v);
    }
    let sector = (h * 6.0).floor();
    let f = h * 6.0 - sector;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    match (sector as u8) % 6 {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    }
}
