use std::io::Cursor;

use hsl::HSL;
use plotters::coord::cartesian::Cartesian2d;
use plotters::coord::ranged1d::{DefaultFormatting, KeyPointHint, Ranged};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::series::DashedLineSeries;
use tracing::debug;

use crate::aggregate::Series;
use crate::axis::{AxisSpec, ResolvedAxis, Scale};
use crate::error::{Error, Result};
use crate::labels::UNRANKED;

/// Default figure width in inches
const WIDTH_IN: f64 = 4.5;

/// Default figure height in inches
const HEIGHT_IN: f64 = 3.0;

const DPI: u32 = 150;

const FONT_FAMILY: &str = "sans-serif";

/// Default font size in points
const FONT_SIZE: u32 = 14;

/// Share of a category slot taken by its group of bars.
const BAR_GROUP_WIDTH: f64 = 0.8;

/// Number of distinct hues before colors repeat.
const HUES: usize = 8;

type Coords = Cartesian2d<PlannedRange, PlannedRange>;

/// A resolved axis as a plotters coordinate: plot-space span, with the
/// planned ticks as its only key points.
#[derive(Debug, Clone)]
struct PlannedRange {
    lo: f64,
    hi: f64,
    ticks: Vec<f64>,
}

impl PlannedRange {
    fn new(axis: &ResolvedAxis) -> Self {
        PlannedRange {
            lo: axis.lo,
            hi: axis.hi,
            ticks: axis.ticks.clone(),
        }
    }
}

impl Ranged for PlannedRange {
    type FormatOption = DefaultFormatting;
    type ValueType = f64;

    fn map(&self, value: &f64, limit: (i32, i32)) -> i32 {
        let fraction = (value - self.lo) / (self.hi - self.lo);
        let pixels = f64::from(limit.1 - limit.0);
        limit.0 + (pixels * fraction + 1e-3).floor() as i32
    }

    fn key_points<Hint: KeyPointHint>(&self, hint: Hint) -> Vec<f64> {
        // light grid lines are never drawn
        if hint.max_num_points() == 0 || hint.weight().allow_light_points() {
            return Vec::new();
        }
        self.ticks.clone()
    }

    fn range(&self) -> std::ops::Range<f64> {
        self.lo..self.hi
    }
}

/// Image encoding of a rendered chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ImageFormat {
    #[default]
    Svg,
    Png,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Svg => "svg",
            ImageFormat::Png => "png",
        }
    }
}

/// Figure dimensions and typography, passed per call.
#[derive(Debug, Clone, PartialEq)]
pub struct FigureStyle {
    pub width_in: f64,
    pub height_in: f64,
    pub dpi: u32,
    pub font_family: String,
    /// Points; scaled by `dpi`.
    pub font_size: u32,
}

impl Default for FigureStyle {
    fn default() -> Self {
        FigureStyle {
            width_in: WIDTH_IN,
            height_in: HEIGHT_IN,
            dpi: DPI,
            font_family: FONT_FAMILY.to_string(),
            font_size: FONT_SIZE,
        }
    }
}

impl FigureStyle {
    pub fn pixels(&self) -> (u32, u32) {
        let dpi = self.dpi as f64;
        (
            (self.width_in * dpi).round() as u32,
            (self.height_in * dpi).round() as u32,
        )
    }

    pub fn font_px(&self) -> u32 {
        (self.font_size * self.dpi).div_ceil(72)
    }
}

/// A horizontal reference line at a fixed data value on the primary axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Threshold {
    pub value: f64,
    pub color: (u8, u8, u8),
}

impl Threshold {
    /// Red dashed line, the usual budget marker.
    pub fn new(value: f64) -> Self {
        Threshold {
            value,
            color: (214, 39, 40),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChartBody {
    /// Lines with markers, x is a numeric sweep.
    #[default]
    Lines,
    /// Grouped bars, x is a category index.
    Bars,
}

/// Everything needed to draw one chart besides the data.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartDirective {
    pub caption: Option<String>,
    pub figure: FigureStyle,
    pub x_axis: AxisSpec,
    pub y_axis: AxisSpec,
    /// Independent right-hand axis for the secondary series.
    pub secondary_y: Option<AxisSpec>,
    /// Draw every primary series dashed, whatever its own style.
    pub dashed: bool,
    /// Same for the secondary series.
    pub secondary_dashed: bool,
    pub thresholds: Vec<Threshold>,
    pub legend: bool,
    /// List the primary series in the legend. When off, a secondary layer
    /// takes over the legend.
    pub primary_legend: bool,
    pub body: ChartBody,
    pub format: ImageFormat,
}

impl ChartDirective {
    /// Builder pattern for configuring the chart
    pub fn builder() -> ChartDirectiveBuilder {
        ChartDirectiveBuilder::default()
    }
}

impl Default for ChartDirective {
    fn default() -> Self {
        ChartDirective::builder().build()
    }
}

/// Builder pattern for `ChartDirective` to allow flexible configuration
#[derive(Default)]
pub struct ChartDirectiveBuilder {
    caption: Option<String>,
    figure: Option<FigureStyle>,
    x_axis: Option<AxisSpec>,
    y_axis: Option<AxisSpec>,
    secondary_y: Option<AxisSpec>,
    dashed: bool,
    secondary_dashed: bool,
    thresholds: Vec<Threshold>,
    legend: Option<bool>,
    primary_legend: Option<bool>,
    body: Option<ChartBody>,
    format: Option<ImageFormat>,
}

impl ChartDirectiveBuilder {
    /// Set the caption drawn above the chart
    pub fn caption(mut self, caption: &str) -> Self {
        self.caption = Some(caption.to_string());
        self
    }

    pub fn figure(mut self, figure: FigureStyle) -> Self {
        self.figure = Some(figure);
        self
    }

    /// Set the figure size in inches, keeping the other figure settings
    pub fn size(mut self, width_in: f64, height_in: f64) -> Self {
        let figure = self.figure.get_or_insert_with(FigureStyle::default);
        figure.width_in = width_in;
        figure.height_in = height_in;
        self
    }

    pub fn font(mut self, family: &str, size: u32) -> Self {
        let figure = self.figure.get_or_insert_with(FigureStyle::default);
        figure.font_family = family.to_string();
        figure.font_size = size;
        self
    }

    pub fn x_axis(mut self, axis: AxisSpec) -> Self {
        self.x_axis = Some(axis);
        self
    }

    pub fn y_axis(mut self, axis: AxisSpec) -> Self {
        self.y_axis = Some(axis);
        self
    }

    /// Add a right-hand axis with its own scale and range
    pub fn secondary_y(mut self, axis: AxisSpec) -> Self {
        self.secondary_y = Some(axis);
        self
    }

    pub fn dashed(mut self, dashed: bool) -> Self {
        self.dashed = dashed;
        self
    }

    pub fn secondary_dashed(mut self, dashed: bool) -> Self {
        self.secondary_dashed = dashed;
        self
    }

    /// Add a reference line at `value` on the primary axis
    pub fn threshold(mut self, value: f64) -> Self {
        self.thresholds.push(Threshold::new(value));
        self
    }

    pub fn legend(mut self, legend: bool) -> Self {
        self.legend = Some(legend);
        self
    }

    pub fn primary_legend(mut self, legend: bool) -> Self {
        self.primary_legend = Some(legend);
        self
    }

    pub fn body(mut self, body: ChartBody) -> Self {
        self.body = Some(body);
        self
    }

    pub fn format(mut self, format: ImageFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Build and return the final `ChartDirective`
    pub fn build(self) -> ChartDirective {
        ChartDirective {
            caption: self.caption,
            figure: self.figure.unwrap_or_default(),
            x_axis: self.x_axis.unwrap_or_else(|| AxisSpec::linear("")),
            y_axis: self.y_axis.unwrap_or_else(|| AxisSpec::linear("")),
            secondary_y: self.secondary_y,
            dashed: self.dashed,
            secondary_dashed: self.secondary_dashed,
            thresholds: self.thresholds,
            legend: self.legend.unwrap_or(true),
            primary_legend: self.primary_legend.unwrap_or(true),
            body: self.body.unwrap_or_default(),
            format: self.format.unwrap_or_default(),
        }
    }
}

/// Series to draw, per axis.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartData {
    pub primary: Vec<Series>,
    pub secondary: Vec<Series>,
}

impl ChartData {
    pub fn new(primary: Vec<Series>) -> Self {
        ChartData {
            primary,
            secondary: Vec::new(),
        }
    }

    pub fn with_secondary(mut self, secondary: Vec<Series>) -> Self {
        self.secondary = secondary;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerShape {
    Circle,
    TriangleDown,
    TriangleUp,
    TriangleLeft,
    TriangleRight,
    Octagon,
    Square,
    Pentagon,
    Star,
    Hexagon,
    HexagonFlat,
    Diamond,
    ThinDiamond,
    Plus,
    Cross,
}

/// Marker cycle, one entry per style slot.
pub const MARKERS: [MarkerShape; 15] = [
    MarkerShape::Circle,
    MarkerShape::TriangleDown,
    MarkerShape::TriangleUp,
    MarkerShape::TriangleLeft,
    MarkerShape::TriangleRight,
    MarkerShape::Octagon,
    MarkerShape::Square,
    MarkerShape::Pentagon,
    MarkerShape::Star,
    MarkerShape::Hexagon,
    MarkerShape::HexagonFlat,
    MarkerShape::Diamond,
    MarkerShape::ThinDiamond,
    MarkerShape::Plus,
    MarkerShape::Cross,
];

impl MarkerShape {
    /// Polygon outline centred on the origin, in pixels (y grows downwards).
    pub fn outline(self, radius: u32) -> Vec<(i32, i32)> {
        let r = radius as f64;
        let points = match self {
            MarkerShape::Circle => regular(16, r, 0.0),
            MarkerShape::TriangleDown => regular(3, r, -90.0),
            MarkerShape::TriangleUp => regular(3, r, 90.0),
            MarkerShape::TriangleLeft => regular(3, r, 180.0),
            MarkerShape::TriangleRight => regular(3, r, 0.0),
            MarkerShape::Octagon => regular(8, r, 22.5),
            MarkerShape::Square => regular(4, r, 45.0),
            MarkerShape::Pentagon => regular(5, r, 90.0),
            MarkerShape::Star => star(r),
            MarkerShape::Hexagon => regular(6, r, 90.0),
            MarkerShape::HexagonFlat => regular(6, r, 0.0),
            MarkerShape::Diamond => regular(4, r, 0.0),
            MarkerShape::ThinDiamond => regular(4, r, 0.0)
                .into_iter()
                .map(|(x, y)| (x * 0.6, y))
                .collect(),
            MarkerShape::Plus => plus(r),
            MarkerShape::Cross => plus(r).into_iter().map(|p| rotate(p, 45.0)).collect(),
        };
        points
            .into_iter()
            .map(|(x, y)| (x.round() as i32, y.round() as i32))
            .collect()
    }
}

fn regular(sides: usize, radius: f64, rotation_deg: f64) -> Vec<(f64, f64)> {
    (0..sides)
        .map(|i| {
            let angle = (rotation_deg + i as f64 * 360.0 / sides as f64).to_radians();
            (radius * angle.cos(), -radius * angle.sin())
        })
        .collect()
}

fn star(radius: f64) -> Vec<(f64, f64)> {
    (0..10)
        .map(|i| {
            let r = if i % 2 == 0 { radius } else { radius * 0.45 };
            let angle = (90.0 + i as f64 * 36.0_f64).to_radians();
            (r * angle.cos(), -r * angle.sin())
        })
        .collect()
}

fn plus(radius: f64) -> Vec<(f64, f64)> {
    let (r, w) = (radius, radius * 0.3);
    vec![
        (-w, -r),
        (w, -r),
        (w, -w),
        (r, -w),
        (r, w),
        (w, w),
        (w, r),
        (-w, r),
        (-w, w),
        (-r, w),
        (-r, -w),
        (-w, -w),
    ]
}

fn rotate((x, y): (f64, f64), degrees: f64) -> (f64, f64) {
    let (sin, cos) = degrees.to_radians().sin_cos();
    (x * cos - y * sin, x * sin + y * cos)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashPattern {
    Solid,
    Dashed { dash: u32, gap: u32 },
}

/// Line pattern cycle, one entry per style slot.
pub const DASHES: [DashPattern; 5] = [
    DashPattern::Solid,
    DashPattern::Dashed { dash: 8, gap: 3 },
    DashPattern::Dashed { dash: 2, gap: 2 },
    DashPattern::Dashed { dash: 12, gap: 3 },
    DashPattern::Dashed { dash: 5, gap: 5 },
];

const OVERLAY_DASH: DashPattern = DashPattern::Dashed { dash: 6, gap: 4 };

/// Visual encoding of one variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesStyle {
    pub color: (u8, u8, u8),
    pub marker: MarkerShape,
    pub dash: DashPattern,
}

/// Style for a slot. Each palette is cycled on its own, so slots past the
/// palette lengths still get distinct combinations.
pub fn style_for(slot: usize) -> SeriesStyle {
    // evenly spaced hues starting from blue
    let hue = (210.0 + (slot % HUES) as f64 * 360.0 / HUES as f64) % 360.0;
    let color = HSL {
        h: hue,
        s: 0.7,
        l: 0.45,
    }
    .to_rgb();
    SeriesStyle {
        color,
        marker: MARKERS[slot % MARKERS.len()],
        dash: DASHES[slot % DASHES.len()],
    }
}

/// Style slot per label: the canonical rank for known labels, the slots
/// after the highest known rank for unknown ones in the order they appear.
pub fn style_slots<'a>(labels: impl IntoIterator<Item = (&'a str, usize)>) -> Vec<(String, usize)> {
    let mut unique: Vec<(&str, usize)> = Vec::new();
    for (label, rank) in labels {
        if !unique.iter().any(|(seen, _)| *seen == label) {
            unique.push((label, rank));
        }
    }

    let mut next = unique
        .iter()
        .filter(|(_, rank)| *rank != UNRANKED)
        .map(|(_, rank)| rank + 1)
        .max()
        .unwrap_or(0);

    unique
        .into_iter()
        .map(|(label, rank)| {
            let slot = if rank == UNRANKED {
                next += 1;
                next - 1
            } else {
                rank
            };
            (label.to_string(), slot)
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedSeries {
    pub label: String,
    pub style: SeriesStyle,
    /// Plot-space points, non-drawable ones removed.
    pub points: Vec<(f64, f64)>,
    /// `(left, right, top)` per bar, plot space. Empty for line charts.
    pub bars: Vec<(f64, f64, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedLayer {
    pub axis: ResolvedAxis,
    pub series: Vec<PlannedSeries>,
    pub legend: bool,
}

/// Every decision about a chart, made before anything is drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartPlan {
    pub size: (u32, u32),
    pub caption: Option<String>,
    pub font_family: String,
    pub font_px: u32,
    pub body: ChartBody,
    pub x: ResolvedAxis,
    pub primary: PlannedLayer,
    pub secondary: Option<PlannedLayer>,
    /// Plot-space y on the primary axis, with color.
    pub thresholds: Vec<(f64, (u8, u8, u8))>,
    /// Bar base in plot space.
    pub baseline: f64,
}

impl ChartPlan {
    /// Labels listed in the legend, in order.
    pub fn legend_entries(&self) -> Vec<&str> {
        let mut entries: Vec<&str> = Vec::new();
        let layers = std::iter::once(&self.primary).chain(self.secondary.as_ref());
        for layer in layers.filter(|layer| layer.legend) {
            for series in &layer.series {
                if !entries.contains(&series.label.as_str()) {
                    entries.push(&series.label);
                }
            }
        }
        entries
    }
}

/// Resolve axes, order and style series, and decide on the legend.
pub fn plan(data: &ChartData, directive: &ChartDirective) -> Result<ChartPlan> {
    if data.primary.is_empty() {
        return Err(Error::Config("chart has no series to draw".into()));
    }
    match (&directive.secondary_y, data.secondary.is_empty()) {
        (None, false) => {
            return Err(Error::Config(
                "secondary series given without a secondary axis".into(),
            ))
        }
        (Some(_), true) => {
            return Err(Error::Config(
                "secondary axis given without secondary series".into(),
            ))
        }
        _ => {}
    }

    let mut primary = data.primary.clone();
    let mut secondary = data.secondary.clone();
    primary.sort_by_key(|series| series.rank);
    secondary.sort_by_key(|series| series.rank);

    let slots = style_slots(
        primary
            .iter()
            .chain(&secondary)
            .map(|series| (series.label.as_str(), series.rank)),
    );
    let style_of = |label: &str| {
        let slot = slots
            .iter()
            .find(|(seen, _)| seen == label)
            .map(|(_, slot)| *slot)
            .unwrap_or(0);
        style_for(slot)
    };

    let xs: Vec<f64> = primary
        .iter()
        .chain(&secondary)
        .flat_map(|series| series.points.iter().map(|(x, _)| *x))
        .collect();
    let x = directive.x_axis.resolve(&xs);

    let mut ys: Vec<f64> = primary
        .iter()
        .flat_map(|series| series.points.iter().map(|(_, y)| *y))
        .collect();
    ys.extend(directive.thresholds.iter().map(|threshold| threshold.value));
    if directive.body == ChartBody::Bars && directive.y_axis.scale == Scale::Linear {
        ys.push(0.0);
    }
    let y = directive.y_axis.resolve(&ys);

    let baseline = match y.scale {
        Scale::Log => y.lo,
        Scale::Linear => 0f64.clamp(y.lo, y.hi),
    };

    let bar_count = primary.len().max(1) as f64;
    let bar_width = BAR_GROUP_WIDTH / bar_count;
    let primary_series: Vec<PlannedSeries> = primary
        .iter()
        .enumerate()
        .map(|(index, series)| {
            let points = project_points(&series.points, &x, &y);
            let bars = match directive.body {
                ChartBody::Lines => Vec::new(),
                ChartBody::Bars => points
                    .iter()
                    .map(|(px, py)| {
                        let left = px - BAR_GROUP_WIDTH / 2.0 + index as f64 * bar_width;
                        (left, left + bar_width, *py)
                    })
                    .collect(),
            };
            let mut style = style_of(&series.label);
            if directive.dashed {
                style.dash = OVERLAY_DASH;
            }
            PlannedSeries {
                label: series.label.clone(),
                style,
                points,
                bars,
            }
        })
        .collect();

    let primary_labels: Vec<&str> = primary.iter().map(|series| series.label.as_str()).collect();
    let primary_layer = PlannedLayer {
        axis: y.clone(),
        series: primary_series,
        legend: directive.legend && directive.primary_legend,
    };

    let secondary_layer = directive.secondary_y.as_ref().map(|axis| {
        let ys: Vec<f64> = secondary
            .iter()
            .flat_map(|series| series.points.iter().map(|(_, y)| *y))
            .collect();
        let axis = axis.resolve(&ys);
        let series: Vec<PlannedSeries> = secondary
            .iter()
            .map(|series| {
                let mut style = style_of(&series.label);
                if directive.secondary_dashed {
                    style.dash = OVERLAY_DASH;
                }
                PlannedSeries {
                    label: series.label.clone(),
                    style,
                    points: project_points(&series.points, &x, &axis),
                    bars: Vec::new(),
                }
            })
            .collect();
        // an overlay of the same variants adds nothing to the primary legend
        let redundant = primary_layer.legend
            && series
                .iter()
                .all(|series| primary_labels.contains(&series.label.as_str()));
        PlannedLayer {
            axis,
            series,
            legend: directive.legend && !redundant,
        }
    });

    let thresholds = directive
        .thresholds
        .iter()
        .filter_map(|threshold| y.project(threshold.value).map(|v| (v, threshold.color)))
        .collect();

    debug!(
        series = primary_layer.series.len(),
        secondary = secondary_layer.as_ref().map_or(0, |layer| layer.series.len()),
        "planned chart"
    );

    Ok(ChartPlan {
        size: directive.figure.pixels(),
        caption: directive.caption.clone(),
        font_family: directive.figure.font_family.clone(),
        font_px: directive.figure.font_px(),
        body: directive.body,
        x,
        primary: primary_layer,
        secondary: secondary_layer,
        thresholds,
        baseline,
    })
}

fn project_points(points: &[(f64, f64)], x: &ResolvedAxis, y: &ResolvedAxis) -> Vec<(f64, f64)> {
    let mut projected: Vec<(f64, f64)> = points
        .iter()
        .filter_map(|(px, py)| Some((x.project(*px)?, y.project(*py)?)))
        .collect();
    projected.sort_by(|a, b| a.0.total_cmp(&b.0));
    projected
}

/// A finished chart, encoded and held in memory until the sink writes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub format: ImageFormat,
    pub bytes: Vec<u8>,
}

/// Plan and draw one chart.
pub fn render(data: &ChartData, directive: &ChartDirective) -> Result<Artifact> {
    let plan = plan(data, directive)?;
    render_plan(&plan, directive.format)
}

pub fn render_plan(plan: &ChartPlan, format: ImageFormat) -> Result<Artifact> {
    let (width, height) = plan.size;
    let bytes = match format {
        ImageFormat::Svg => {
            let mut svg = String::new();
            {
                let root = SVGBackend::with_string(&mut svg, plan.size).into_drawing_area();
                draw(&root, plan).map_err(|err| Error::Render(err.to_string()))?;
                root.present()
                    .map_err(|err| Error::Render(err.to_string()))?;
            }
            svg.into_bytes()
        }
        ImageFormat::Png => {
            let mut buffer = vec![0u8; width as usize * height as usize * 3];
            {
                let root = BitMapBackend::with_buffer(&mut buffer, plan.size).into_drawing_area();
                draw(&root, plan).map_err(|err| Error::Render(err.to_string()))?;
                root.present()
                    .map_err(|err| Error::Render(err.to_string()))?;
            }
            let image = image::RgbImage::from_raw(width, height, buffer)
                .ok_or_else(|| Error::Render("pixel buffer does not match figure size".into()))?;
            let mut png = Vec::new();
            image
                .write_to(&mut Cursor::new(&mut png), image::ImageOutputFormat::Png)
                .map_err(|err| Error::Render(err.to_string()))?;
            png
        }
    };
    Ok(Artifact { format, bytes })
}

fn line_width(plan: &ChartPlan) -> u32 {
    (plan.font_px / 14).max(1) * 2
}

fn marker_radius(plan: &ChartPlan) -> u32 {
    (plan.font_px * 9 / 40).max(3)
}

/// Draw lines (or dashes) and markers for every series of a layer.
/// `$draw` is `draw_series` or `draw_secondary_series`.
macro_rules! draw_lines {
    ($chart:expr, $draw:ident, $layer:expr, $plan:expr) => {{
        let width = line_width($plan);
        let radius = marker_radius($plan);
        for series in &$layer.series {
            let (r, g, b) = series.style.color;
            let color = RGBColor(r, g, b);
            let line = color.stroke_width(width);
            match series.style.dash {
                DashPattern::Solid => {
                    $chart.$draw(LineSeries::new(series.points.iter().copied(), line))?;
                }
                DashPattern::Dashed { dash, gap } => {
                    $chart.$draw(DashedLineSeries::new(
                        series.points.clone(),
                        dash * width,
                        gap * width,
                        line,
                    ))?;
                }
            }
            let outline = series.style.marker.outline(radius);
            $chart.$draw(
                series
                    .points
                    .iter()
                    .map(|point| EmptyElement::at(*point) + Polygon::new(outline.clone(), color.filled())),
            )?;
        }
    }};
}

fn draw<DB>(
    root: &DrawingArea<DB, Shift>,
    plan: &ChartPlan,
) -> std::result::Result<(), Box<dyn std::error::Error>>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;

    let font = plan.font_family.as_str();
    let font_px = plan.font_px;

    let mut builder = ChartBuilder::on(root);
    builder
        .margin(font_px / 2)
        .x_label_area_size(font_px * 3)
        .y_label_area_size(font_px * 4);
    if plan.secondary.is_some() {
        builder.right_y_label_area_size(font_px * 4);
    }
    if let Some(caption) = &plan.caption {
        builder.caption(caption, (font, font_px));
    }

    let y_axis = &plan.primary.axis;
    let mut chart =
        builder.build_cartesian_2d(PlannedRange::new(&plan.x), PlannedRange::new(y_axis))?;

    let x_labels = |value: &f64| plan.x.label_for(*value);
    let y_labels = |value: &f64| y_axis.label_for(*value);
    chart
        .configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .x_labels(plan.x.ticks.len().max(1))
        .y_labels(y_axis.ticks.len().max(1))
        .x_label_formatter(&x_labels)
        .y_label_formatter(&y_labels)
        .x_desc(plan.x.label.as_str())
        .y_desc(y_axis.label.as_str())
        .label_style((font, font_px * 4 / 5))
        .axis_desc_style((font, font_px))
        .draw()?;

    match &plan.secondary {
        None => {
            draw_primary(&mut chart, plan)?;
            draw_legend(&mut chart, plan)?;
        }
        Some(layer) => {
            let mut chart = chart
                .set_secondary_coord(PlannedRange::new(&plan.x), PlannedRange::new(&layer.axis));

            let y2_labels = |value: &f64| layer.axis.label_for(*value);
            chart
                .configure_secondary_axes()
                .y_labels(layer.axis.ticks.len().max(1))
                .y_label_formatter(&y2_labels)
                .y_desc(layer.axis.label.as_str())
                .label_style((font, font_px * 4 / 5))
                .axis_desc_style((font, font_px))
                .draw()?;

            draw_primary(&mut *chart, plan)?;
            draw_lines!(chart, draw_secondary_series, layer, plan);
            draw_legend(&mut *chart, plan)?;
        }
    }

    Ok(())
}

fn draw_primary<'a, DB>(
    chart: &mut ChartContext<'a, DB, Coords>,
    plan: &ChartPlan,
) -> std::result::Result<(), Box<dyn std::error::Error>>
where
    DB: DrawingBackend + 'a,
    DB::ErrorType: 'static,
{
    match plan.body {
        ChartBody::Lines => draw_lines!(chart, draw_series, plan.primary, plan),
        ChartBody::Bars => {
            for series in &plan.primary.series {
                let (r, g, b) = series.style.color;
                let fill = RGBColor(r, g, b).filled();
                chart.draw_series(series.bars.iter().map(|(left, right, top)| {
                    Rectangle::new([(*left, plan.baseline), (*right, *top)], fill)
                }))?;
            }
        }
    }

    for (value, (r, g, b)) in &plan.thresholds {
        chart.draw_series(DashedLineSeries::new(
            vec![(plan.x.lo, *value), (plan.x.hi, *value)],
            line_width(plan) * 5,
            line_width(plan) * 3,
            RGBColor(*r, *g, *b).stroke_width(line_width(plan)),
        ))?;
    }
    Ok(())
}

/// Legend entries go through empty anchor series so the legend does not
/// depend on which layer drew the data. No title is ever drawn.
fn draw_legend<'a, DB>(
    chart: &mut ChartContext<'a, DB, Coords>,
    plan: &ChartPlan,
) -> std::result::Result<(), Box<dyn std::error::Error>>
where
    DB: DrawingBackend + 'a,
    DB::ErrorType: 'static,
{
    let entries = plan.legend_entries();
    if entries.is_empty() {
        return Ok(());
    }

    let width = line_width(plan);
    let radius = marker_radius(plan);
    let layers = std::iter::once(&plan.primary).chain(plan.secondary.as_ref());
    let styled: Vec<&PlannedSeries> = layers.flat_map(|layer| layer.series.iter()).collect();

    for label in entries {
        let Some(series) = styled.iter().find(|series| series.label == label) else {
            continue;
        };
        let (r, g, b) = series.style.color;
        let color = RGBColor(r, g, b);
        let anno = chart.draw_series(std::iter::empty::<Circle<(f64, f64), i32>>())?;
        anno.label(label);
        match plan.body {
            ChartBody::Bars => {
                anno.legend(move |(x, y)| {
                    Rectangle::new([(x, y - 5), (x + 20, y + 5)], color.filled())
                });
            }
            ChartBody::Lines => {
                let marker: Vec<(i32, i32)> = series
                    .style
                    .marker
                    .outline(radius)
                    .into_iter()
                    .map(|(mx, my)| (mx + 10, my))
                    .collect();
                anno.legend(move |(x, y)| {
                    EmptyElement::at((x, y))
                        + PathElement::new(vec![(0, 0), (20, 0)], color.stroke_width(width))
                        + Polygon::new(marker.clone(), color.filled())
                });
            }
        }
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK.mix(0.4))
        .label_font((plan.font_family.as_str(), plan.font_px * 4 / 5))
        .draw()?;
    Ok(())
}
