// src/plot.rs
use std::collections::HashMap;

use iced::alignment::{Horizontal, Vertical};
use iced::widget::canvas::{self, Frame, Geometry, Path, Stroke, Text};
use iced::{mouse, Color, Point, Rectangle, Renderer, Size, Theme};

use crate::chart::{format_number, Axis, Bin, ChartSpec, Group, Marks, ScatterColor};
use crate::ui::{scale_color, series_color, Styles};

const MARGIN_LEFT: f32 = 72.0;
const MARGIN_RIGHT: f32 = 24.0;
const MARGIN_TOP: f32 = 60.0;
const MARGIN_BOTTOM: f32 = 56.0;
const LEGEND_WIDTH: f32 = 160.0;

const HOVER_RADIUS: f32 = 24.0;
const POINT_RADIUS: f32 = 4.0;
const MAX_CATEGORY_TICKS: usize = 20;

const HOUR_MS: f64 = 3_600_000.0;
const DAY_MS: f64 = 24.0 * HOUR_MS;

/// Linear map from a data interval onto a pixel interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scale {
    domain: (f64, f64),
    range: (f32, f32),
}

impl Scale {
    pub fn new(domain: (f64, f64), range: (f32, f32)) -> Self {
        Scale { domain, range }
    }

    pub fn map(&self, value: f64) -> f32 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        r0 + ((value - d0) / (d1 - d0)) as f32 * (r1 - r0)
    }

    pub fn invert(&self, pixel: f32) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        d0 + f64::from((pixel - r0) / (r1 - r0)) * (d1 - d0)
    }

    pub fn domain(&self) -> (f64, f64) {
        self.domain
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layout {
    pub plot: Rectangle,
    pub x: Scale,
    pub y: Scale,
}

impl Layout {
    pub fn new(size: Size, spec: &ChartSpec) -> Option<Self> {
        let right = if has_legend(spec) {
            MARGIN_RIGHT + LEGEND_WIDTH
        } else {
            MARGIN_RIGHT
        };
        let width = size.width - MARGIN_LEFT - right;
        let height = size.height - MARGIN_TOP - MARGIN_BOTTOM;
        if width < 20.0 || height < 20.0 {
            return None;
        }

        let plot = Rectangle::new(Point::new(MARGIN_LEFT, MARGIN_TOP), Size::new(width, height));
        let (x_domain, y_domain) = domains(spec);

        Some(Layout {
            plot,
            x: Scale::new(x_domain, (plot.x, plot.x + plot.width)),
            y: Scale::new(y_domain, (plot.y + plot.height, plot.y)),
        })
    }

    fn project(&self, x: f64, y: f64) -> Point {
        Point::new(self.x.map(x), self.y.map(y))
    }
}

fn has_legend(spec: &ChartSpec) -> bool {
    matches!(
        spec.marks,
        Marks::Scatter {
            color: ScatterColor::Discrete { .. } | ScatterColor::Continuous { .. },
            ..
        }
    )
}

/// A bar segment after stacking, in data units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarRect {
    pub x: f64,
    pub bottom: f64,
    pub top: f64,
}

/// Stacks bars that share an x position: positive values upwards, negative values downwards.
pub fn stack_bars(points: &[crate::chart::Point]) -> Vec<BarRect> {
    let mut above: HashMap<u64, f64> = HashMap::new();
    let mut below: HashMap<u64, f64> = HashMap::new();

    points
        .iter()
        .map(|p| {
            let key = p.x.to_bits();
            let base = if p.y >= 0.0 {
                above.entry(key).or_insert(0.0)
            } else {
                below.entry(key).or_insert(0.0)
            };
            let start = *base;
            *base += p.y;
            BarRect {
                x: p.x,
                bottom: start.min(*base),
                top: start.max(*base),
            }
        })
        .collect()
}

fn bar_width(points: &[crate::chart::Point], axis: &Axis) -> f64 {
    if matches!(axis, Axis::Categorical { .. }) {
        return 0.8;
    }
    let mut xs: Vec<f64> = points.iter().map(|p| p.x).collect();
    xs.sort_by(|a, b| a.total_cmp(b));
    xs.dedup();
    let gap = xs
        .windows(2)
        .map(|w| w[1] - w[0])
        .fold(f64::INFINITY, f64::min);
    if gap.is_finite() && gap > 0.0 {
        gap * 0.8
    } else if matches!(axis, Axis::Temporal) {
        DAY_MS * 0.8
    } else {
        0.8
    }
}

fn extent(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

fn padded(range: Option<(f64, f64)>, fraction: f64) -> (f64, f64) {
    match range {
        None => (0.0, 1.0),
        Some((lo, hi)) if lo == hi => {
            let pad = if lo == 0.0 { 1.0 } else { lo.abs() * 0.1 };
            (lo - pad, hi + pad)
        }
        Some((lo, hi)) => {
            let pad = (hi - lo) * fraction;
            (lo - pad, hi + pad)
        }
    }
}

fn scatter_points(groups: &[Group]) -> impl Iterator<Item = &crate::chart::Point> {
    groups.iter().flat_map(|g| g.points.iter())
}

pub fn domains(spec: &ChartSpec) -> ((f64, f64), (f64, f64)) {
    let categorical = match &spec.x_axis {
        Axis::Categorical { categories } => Some((-0.5, categories.len().max(1) as f64 - 0.5)),
        _ => None,
    };

    match &spec.marks {
        Marks::Line { points } => {
            let x = categorical.unwrap_or_else(|| padded(extent(points.iter().map(|p| p.x)), 0.0));
            let y = padded(extent(points.iter().map(|p| p.y)), 0.05);
            (x, y)
        }
        Marks::Bar { points } => {
            let half = bar_width(points, &spec.x_axis) / 2.0;
            let x = categorical.unwrap_or_else(|| {
                extent(points.iter().map(|p| p.x))
                    .map(|(lo, hi)| (lo - half, hi + half))
                    .unwrap_or((0.0, 1.0))
            });
            let rects = stack_bars(points);
            let lo = rects.iter().map(|r| r.bottom).fold(0.0, f64::min);
            let hi = rects.iter().map(|r| r.top).fold(0.0, f64::max);
            let y = if lo == hi { (0.0, 1.0) } else { (lo, hi + (hi - lo) * 0.05) };
            (x, y)
        }
        Marks::Histogram { bins } => {
            let x = match (bins.first(), bins.last()) {
                (Some(first), Some(last)) => (first.start, last.end),
                _ => (0.0, 1.0),
            };
            let top = bins.iter().map(|b| b.count).max().unwrap_or(0) as f64;
            (x, (0.0, if top > 0.0 { top * 1.05 } else { 1.0 }))
        }
        Marks::Scatter { groups, .. } => {
            let x = padded(extent(scatter_points(groups).map(|p| p.x)), 0.05);
            let y = padded(extent(scatter_points(groups).map(|p| p.y)), 0.05);
            (x, y)
        }
    }
}

fn nice_step(raw: f64) -> f64 {
    let base = 10f64.powf(raw.log10().floor());
    let fraction = raw / base;
    let nice = if fraction < 1.5 {
        1.0
    } else if fraction < 3.0 {
        2.0
    } else if fraction < 7.0 {
        5.0
    } else {
        10.0
    };
    nice * base
}

/// Round tick values covering `[min, max]`, roughly `target` of them.
pub fn nice_ticks(min: f64, max: f64, target: usize) -> Vec<f64> {
    if !(min.is_finite() && max.is_finite()) || max <= min || target == 0 {
        return vec![min];
    }
    let step = nice_step((max - min) / target as f64);
    let first = (min / step).ceil();
    let last = (max / step).floor();

    (0..=((last - first) as i64).max(0))
        .map(|i| {
            let tick = (first + i as f64) * step;
            if tick.abs() < step * 1e-9 {
                0.0
            } else {
                tick
            }
        })
        .collect()
}

fn x_ticks(axis: &Axis, domain: (f64, f64)) -> Vec<f64> {
    let (lo, hi) = domain;
    match axis {
        Axis::Categorical { categories } => {
            let step = categories.len().div_ceil(MAX_CATEGORY_TICKS).max(1);
            (0..categories.len()).step_by(step).map(|i| i as f64).collect()
        }
        Axis::Temporal => {
            let unit = if hi - lo > 2.0 * DAY_MS { DAY_MS } else { HOUR_MS };
            nice_ticks(lo / unit, hi / unit, 6)
                .into_iter()
                .map(|t| t * unit)
                .collect()
        }
        Axis::Linear => nice_ticks(lo, hi, 8),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Hover {
    pub anchor: Point,
    pub lines: Vec<String>,
    pub mark: HoverMark,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HoverMark {
    Dot(Point),
    Outline(Rectangle),
}

fn bar_pixels(layout: &Layout, x: f64, half: f64, bottom: f64, top: f64) -> Rectangle {
    let left = layout.x.map(x - half);
    let right = layout.x.map(x + half);
    let upper = layout.y.map(top);
    let lower = layout.y.map(bottom);
    Rectangle::new(
        Point::new(left.min(right), upper.min(lower)),
        Size::new((right - left).abs(), (lower - upper).abs()),
    )
}

fn bin_pixels(layout: &Layout, bin: &Bin) -> Rectangle {
    let left = layout.x.map(bin.start);
    let right = layout.x.map(bin.end);
    let top = layout.y.map(bin.count as f64);
    let bottom = layout.y.map(0.0);
    Rectangle::new(Point::new(left, top), Size::new(right - left, bottom - top))
}

/// Finds the mark under `cursor` (canvas-relative) and describes it.
pub fn hover_at(spec: &ChartSpec, layout: &Layout, cursor: Point) -> Option<Hover> {
    if !layout.plot.contains(cursor) {
        return None;
    }
    let x_line = |x: f64| format!("{}: {}", spec.x_label, spec.x_axis.format(x));
    let y_line = |y: f64| format!("{}: {}", spec.y_label, format_number(y));

    match &spec.marks {
        Marks::Line { points } => {
            let nearest = points.iter().min_by(|a, b| {
                let da = (layout.x.map(a.x) - cursor.x).abs();
                let db = (layout.x.map(b.x) - cursor.x).abs();
                da.total_cmp(&db)
            })?;
            let at = layout.project(nearest.x, nearest.y);
            Some(Hover {
                anchor: at,
                lines: vec![x_line(nearest.x), y_line(nearest.y)],
                mark: HoverMark::Dot(at),
            })
        }
        Marks::Bar { points } => {
            let half = bar_width(points, &spec.x_axis) / 2.0;
            stack_bars(points).into_iter().find_map(|bar| {
                let rect = bar_pixels(layout, bar.x, half, bar.bottom, bar.top);
                rect.contains(cursor).then(|| Hover {
                    anchor: Point::new(rect.x + rect.width / 2.0, rect.y),
                    lines: vec![x_line(bar.x), y_line(bar.top - bar.bottom)],
                    mark: HoverMark::Outline(rect),
                })
            })
        }
        Marks::Histogram { bins } => {
            let value = layout.x.invert(cursor.x);
            let last = bins.len().checked_sub(1)?;
            let bin = bins
                .iter()
                .enumerate()
                .find(|(i, b)| value >= b.start && (value < b.end || (*i == last && value <= b.end)))
                .map(|(_, b)| b)?;
            let rect = bin_pixels(layout, bin);
            Some(Hover {
                anchor: Point::new(rect.x + rect.width / 2.0, rect.y),
                lines: vec![
                    format!(
                        "{}: {} - {}",
                        spec.x_label,
                        format_number(bin.start),
                        format_number(bin.end)
                    ),
                    format!("count: {}", bin.count),
                ],
                mark: HoverMark::Outline(rect),
            })
        }
        Marks::Scatter { groups, color } => {
            let (group_index, point_index, distance) = groups
                .iter()
                .enumerate()
                .flat_map(|(g, group)| {
                    group.points.iter().enumerate().map(move |(i, p)| (g, i, p))
                })
                .map(|(g, i, p)| (g, i, layout.project(p.x, p.y).distance(cursor)))
                .min_by(|a, b| a.2.total_cmp(&b.2))?;
            if distance > HOVER_RADIUS {
                return None;
            }

            let point = groups[group_index].points[point_index];
            let at = layout.project(point.x, point.y);
            let mut lines = vec![x_line(point.x), y_line(point.y)];
            match color {
                ScatterColor::Uniform => {}
                ScatterColor::Discrete { column } => {
                    lines.push(format!("{}: {}", column, groups[group_index].label));
                }
                ScatterColor::Continuous { column, values, .. } => {
                    let shade = values
                        .get(point_index)
                        .copied()
                        .flatten()
                        .map_or_else(|| "NaN".to_string(), format_number);
                    lines.push(format!("{column}: {shade}"));
                }
            }
            Some(Hover {
                anchor: at,
                lines,
                mark: HoverMark::Dot(at),
            })
        }
    }
}

fn label(content: String, position: Point, color: Color, size: f32) -> Text {
    Text {
        content,
        position,
        color,
        size,
        ..Text::default()
    }
}

pub struct ChartView {
    spec: ChartSpec,
    styles: &'static Styles,
}

impl ChartView {
    pub fn new(spec: ChartSpec, styles: &'static Styles) -> Self {
        ChartView { spec, styles }
    }

    fn draw_frame(&self, frame: &mut Frame, layout: &Layout) {
        let styles = self.styles;
        let plot = layout.plot;

        frame.fill_text(label(
            self.spec.title.clone(),
            Point::new(plot.x, 10.0),
            styles.fg,
            20.0,
        ));
        frame.fill_text(label(
            self.spec.y_label.clone(),
            Point::new(8.0, MARGIN_TOP - 22.0),
            styles.axis,
            14.0,
        ));
        frame.fill_text(Text {
            horizontal_alignment: Horizontal::Center,
            ..label(
                self.spec.x_label.clone(),
                Point::new(plot.x + plot.width / 2.0, plot.y + plot.height + 30.0),
                styles.axis,
                14.0,
            )
        });

        frame.fill_rectangle(plot.position(), plot.size(), styles.plot_bg);

        let grid = Stroke::default().with_width(1.0).with_color(styles.grid);
        let (y_lo, y_hi) = layout.y.domain();
        for tick in nice_ticks(y_lo, y_hi, 6) {
            let y = layout.y.map(tick);
            frame.stroke(
                &Path::line(Point::new(plot.x, y), Point::new(plot.x + plot.width, y)),
                grid.clone(),
            );
            frame.fill_text(Text {
                horizontal_alignment: Horizontal::Right,
                vertical_alignment: Vertical::Center,
                ..label(format_number(tick), Point::new(plot.x - 8.0, y), styles.axis, 12.0)
            });
        }

        for tick in x_ticks(&self.spec.x_axis, layout.x.domain()) {
            let x = layout.x.map(tick);
            if x < plot.x - 0.5 || x > plot.x + plot.width + 0.5 {
                continue;
            }
            frame.stroke(
                &Path::line(Point::new(x, plot.y), Point::new(x, plot.y + plot.height)),
                grid.clone(),
            );
            frame.fill_text(Text {
                horizontal_alignment: Horizontal::Center,
                ..label(
                    self.spec.x_axis.format(tick),
                    Point::new(x, plot.y + plot.height + 8.0),
                    styles.axis,
                    12.0,
                )
            });
        }

        let axis = Stroke::default().with_width(1.0).with_color(styles.axis);
        let origin = Point::new(plot.x, plot.y + plot.height);
        frame.stroke(&Path::line(origin, Point::new(plot.x + plot.width, origin.y)), axis.clone());
        frame.stroke(&Path::line(origin, Point::new(plot.x, plot.y)), axis);
    }

    fn draw_marks(&self, frame: &mut Frame, layout: &Layout) {
        match &self.spec.marks {
            Marks::Line { points } => {
                if points.is_empty() {
                    return;
                }
                let path = Path::new(|builder| {
                    for (i, p) in points.iter().enumerate() {
                        let at = layout.project(p.x, p.y);
                        if i == 0 {
                            builder.move_to(at);
                        } else {
                            builder.line_to(at);
                        }
                    }
                });
                frame.stroke(&path, Stroke::default().with_width(2.0).with_color(series_color(0)));
            }
            Marks::Bar { points } => {
                let half = bar_width(points, &self.spec.x_axis) / 2.0;
                for bar in stack_bars(points) {
                    let rect = bar_pixels(layout, bar.x, half, bar.bottom, bar.top);
                    frame.fill_rectangle(rect.position(), rect.size(), series_color(0));
                }
            }
            Marks::Histogram { bins } => {
                let edge = Stroke::default().with_width(1.0).with_color(self.styles.plot_bg);
                for bin in bins.iter().filter(|b| b.count > 0) {
                    let rect = bin_pixels(layout, bin);
                    frame.fill_rectangle(rect.position(), rect.size(), series_color(0));
                    frame.stroke(&Path::rectangle(rect.position(), rect.size()), edge.clone());
                }
            }
            Marks::Scatter { groups, color } => {
                for (g, group) in groups.iter().enumerate() {
                    for (i, p) in group.points.iter().enumerate() {
                        let fill = match color {
                            ScatterColor::Uniform => series_color(0),
                            ScatterColor::Discrete { .. } => series_color(g),
                            ScatterColor::Continuous { min, max, values, .. } => {
                                match values.get(i).copied().flatten() {
                                    Some(v) if max > min => scale_color(((v - min) / (max - min)) as f32),
                                    Some(_) => scale_color(0.5),
                                    None => self.styles.muted_fg,
                                }
                            }
                        };
                        frame.fill(&Path::circle(layout.project(p.x, p.y), POINT_RADIUS), fill);
                    }
                }
            }
        }
    }

    fn draw_legend(&self, frame: &mut Frame, layout: &Layout) {
        let Marks::Scatter { groups, color } = &self.spec.marks else {
            return;
        };
        let left = layout.plot.x + layout.plot.width + 16.0;
        let top = layout.plot.y;
        let styles = self.styles;

        match color {
            ScatterColor::Uniform => {}
            ScatterColor::Discrete { column } => {
                frame.fill_text(label(column.clone(), Point::new(left, top), styles.fg, 14.0));
                for (g, group) in groups.iter().enumerate() {
                    let y = top + 24.0 + g as f32 * 20.0;
                    frame.fill(&Path::circle(Point::new(left + 6.0, y + 7.0), POINT_RADIUS), series_color(g));
                    frame.fill_text(label(group.label.clone(), Point::new(left + 18.0, y), styles.fg, 13.0));
                }
            }
            ScatterColor::Continuous { column, min, max, .. } => {
                frame.fill_text(label(column.clone(), Point::new(left, top), styles.fg, 14.0));
                let steps = 32;
                let bar_top = top + 24.0;
                let bar_height = (layout.plot.height - 48.0).max(40.0);
                let step = bar_height / steps as f32;
                for s in 0..steps {
                    let t = 1.0 - s as f32 / (steps - 1) as f32;
                    frame.fill_rectangle(
                        Point::new(left, bar_top + s as f32 * step),
                        Size::new(16.0, step + 0.5),
                        scale_color(t),
                    );
                }
                frame.fill_text(label(format_number(*max), Point::new(left + 22.0, bar_top), styles.fg, 12.0));
                frame.fill_text(Text {
                    vertical_alignment: Vertical::Bottom,
                    ..label(
                        format_number(*min),
                        Point::new(left + 22.0, bar_top + bar_height),
                        styles.fg,
                        12.0,
                    )
                });
            }
        }
    }

    fn draw_hover(&self, frame: &mut Frame, hover: &Hover, bounds: Size) {
        let styles = self.styles;
        match hover.mark {
            HoverMark::Dot(at) => {
                frame.stroke(
                    &Path::circle(at, POINT_RADIUS + 3.0),
                    Stroke::default().with_width(2.0).with_color(styles.highlight),
                );
            }
            HoverMark::Outline(rect) => {
                frame.stroke(
                    &Path::rectangle(rect.position(), rect.size()),
                    Stroke::default().with_width(2.0).with_color(styles.highlight),
                );
            }
        }

        let longest = hover.lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
        let size = Size::new(longest as f32 * 7.2 + 16.0, hover.lines.len() as f32 * 18.0 + 10.0);
        let mut origin = Point::new(hover.anchor.x + 12.0, hover.anchor.y - size.height - 8.0);
        if origin.x + size.width > bounds.width {
            origin.x = hover.anchor.x - size.width - 12.0;
        }
        if origin.y < 0.0 {
            origin.y = hover.anchor.y + 12.0;
        }

        frame.fill_rectangle(origin, size, styles.tooltip_bg);
        frame.stroke(
            &Path::rectangle(origin, size),
            Stroke::default().with_width(1.0).with_color(styles.axis),
        );
        for (i, line) in hover.lines.iter().enumerate() {
            frame.fill_text(label(
                line.clone(),
                Point::new(origin.x + 8.0, origin.y + 5.0 + i as f32 * 18.0),
                styles.fg,
                13.0,
            ));
        }
    }
}

impl<Message> canvas::Program<Message> for ChartView {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let mut frame = Frame::new(renderer, bounds.size());
        let Some(layout) = Layout::new(bounds.size(), &self.spec) else {
            return vec![frame.into_geometry()];
        };

        self.draw_frame(&mut frame, &layout);
        self.draw_marks(&mut frame, &layout);
        self.draw_legend(&mut frame, &layout);

        let mut overlay = Frame::new(renderer, bounds.size());
        if let Some(hover) = cursor
            .position_in(bounds)
            .and_then(|position| hover_at(&self.spec, &layout, position))
        {
            self.draw_hover(&mut overlay, &hover, bounds.size());
        }

        vec![frame.into_geometry(), overlay.into_geometry()]
    }

    fn mouse_interaction(
        &self,
        _state: &Self::State,
        bounds: Rectangle,
        cursor: mouse::Cursor,
    ) -> mouse::Interaction {
        if cursor.position_in(bounds).is_some() {
            mouse::Interaction::Crosshair
        } else {
            mouse::Interaction::default()
        }
    }
}
