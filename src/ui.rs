// src/ui.rs
use iced::Color;
use once_cell::sync::Lazy;

pub struct Styles {
    pub bg: Color,
    pub fg: Color,
    pub muted_fg: Color,
    pub header_bg: Color,
    pub header_fg: Color,
    pub cell_bg: Color,
    pub error_fg: Color,
    pub plot_bg: Color,
    pub grid: Color,
    pub axis: Color,
    pub tooltip_bg: Color,
    pub highlight: Color,
}

pub static DARK_THEME: Lazy<Styles> = Lazy::new(|| Styles {
    bg: Color::from_rgb(0.07, 0.07, 0.09),
    fg: Color::from_rgb(1.0, 1.0, 1.0),
    muted_fg: Color::from_rgb(0.65, 0.65, 0.7),
    header_bg: Color::from_rgb(0.2, 0.2, 0.2),
    header_fg: Color::from_rgb(1.0, 1.0, 1.0),
    cell_bg: Color::from_rgb(0.11, 0.11, 0.13),
    error_fg: Color::from_rgb(1.0, 0.42, 0.42),
    plot_bg: Color::from_rgb(0.1, 0.11, 0.14),
    grid: Color::from_rgba(1.0, 1.0, 1.0, 0.08),
    axis: Color::from_rgb(0.75, 0.75, 0.8),
    tooltip_bg: Color::from_rgba(0.0, 0.0, 0.0, 0.85),
    highlight: Color::from_rgb(1.0, 1.0, 1.0),
});

pub static LIGHT_THEME: Lazy<Styles> = Lazy::new(|| Styles {
    bg: Color::from_rgb(1.0, 1.0, 1.0),
    fg: Color::from_rgb(0.0, 0.0, 0.0),
    muted_fg: Color::from_rgb(0.35, 0.35, 0.4),
    header_bg: Color::from_rgb(0.8784, 0.8784, 0.8784), // #e0e0e0
    header_fg: Color::from_rgb(0.0, 0.0, 0.0),
    cell_bg: Color::from_rgb(0.97, 0.97, 0.97),
    error_fg: Color::from_rgb(0.75, 0.1, 0.1),
    plot_bg: Color::from_rgb(0.898, 0.925, 0.965), // #e5ecf6
    grid: Color::from_rgb(1.0, 1.0, 1.0),
    axis: Color::from_rgb(0.27, 0.27, 0.3),
    tooltip_bg: Color::from_rgba(1.0, 1.0, 1.0, 0.95),
    highlight: Color::from_rgb(0.0, 0.0, 0.0),
});

/// Discrete series colors, cycled by group index.
pub const SERIES: [(u8, u8, u8); 10] = [
    (0x63, 0x6e, 0xfa),
    (0xef, 0x55, 0x3b),
    (0x00, 0xcc, 0x96),
    (0xab, 0x63, 0xfa),
    (0xff, 0xa1, 0x5a),
    (0x19, 0xd3, 0xf3),
    (0xff, 0x66, 0x92),
    (0xb6, 0xe8, 0x80),
    (0xff, 0x97, 0xff),
    (0xfe, 0xcb, 0x52),
];

// plasma
const SCALE: [(u8, u8, u8); 10] = [
    (0x0d, 0x08, 0x87),
    (0x46, 0x03, 0x9f),
    (0x72, 0x01, 0xa8),
    (0x9c, 0x17, 0x9e),
    (0xbd, 0x37, 0x86),
    (0xd8, 0x57, 0x6b),
    (0xed, 0x79, 0x53),
    (0xfb, 0x9f, 0x3a),
    (0xfd, 0xca, 0x26),
    (0xf0, 0xf9, 0x21),
];

pub fn series_color(index: usize) -> Color {
    let (r, g, b) = SERIES[index % SERIES.len()];
    Color::from_rgb8(r, g, b)
}

/// Color for `t` in `[0, 1]` on the continuous scale.
pub fn scale_color(t: f32) -> Color {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let position = t * (SCALE.len() - 1) as f32;
    let lower = position.floor() as usize;
    let upper = (lower + 1).min(SCALE.len() - 1);
    let fraction = position - lower as f32;

    let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * fraction) / 255.0;
    let (r0, g0, b0) = SCALE[lower];
    let (r1, g1, b1) = SCALE[upper];
    Color::from_rgb(mix(r0, r1), mix(g0, g1), mix(b0, b1))
}

pub fn styles(dark: bool) -> &'static Styles {
    if dark {
        &*DARK_THEME
    } else {
        &*LIGHT_THEME
    }
}
