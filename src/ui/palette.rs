//! Per-channel bar colors sampled evenly along a gradient

use crate::domain::Palette;
use ratatui::style::Color;

const VIRIDIS: [(u8, u8, u8); 5] =
    [(68, 1, 84), (59, 82, 139), (33, 145, 140), (94, 201, 98), (253, 231, 37)];

const PLASMA: [(u8, u8, u8); 5] =
    [(13, 8, 135), (126, 3, 168), (204, 71, 120), (248, 149, 64), (240, 249, 33)];

fn anchors(palette: Palette) -> &'static [(u8, u8, u8); 5] {
    match palette {
        Palette::Viridis => &VIRIDIS,
        Palette::Plasma => &PLASMA,
    }
}

/// Color at position `t` in [0, 1], linear between anchors
pub fn sample(palette: Palette, t: f64) -> Color {
    let stops = anchors(palette);
    let scaled = t.clamp(0.0, 1.0) * (stops.len() - 1) as f64;
    let lower = (scaled.floor() as usize).min(stops.len() - 2);
    let frac = scaled - lower as f64;
    let (a, b) = (stops[lower], stops[lower + 1]);
    let mix = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * frac).round() as u8;
    Color::Rgb(mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
}

/// `count` colors spread from one end of the gradient to the other
pub fn channel_colors(palette: Palette, count: usize) -> Vec<Color> {
    match count {
        0 => Vec::new(),
        1 => vec![sample(palette, 0.0)],
        n => (0..n).map(|i| sample(palette, i as f64 / (n - 1) as f64)).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints() {
        assert_eq!(sample(Palette::Viridis, 0.0), Color::Rgb(68, 1, 84));
        assert_eq!(sample(Palette::Viridis, 1.0), Color::Rgb(253, 231, 37));
        assert_eq!(sample(Palette::Plasma, 1.0), Color::Rgb(240, 249, 33));
        assert_eq!(sample(Palette::Plasma, 7.0), sample(Palette::Plasma, 1.0));
    }

    #[test]
    fn test_channel_colors() {
        let colors = channel_colors(Palette::Plasma, 6);
        assert_eq!(colors.len(), 6);
        assert_eq!(colors[0], Color::Rgb(13, 8, 135));
        assert_eq!(colors[5], Color::Rgb(240, 249, 33));
        assert!(channel_colors(Palette::Viridis, 0).is_empty());
        assert_eq!(channel_colors(Palette::Viridis, 1).len(), 1);
    }
}
