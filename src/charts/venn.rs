//! Venn Diagram Module
//! 2 to 6 set Venn diagrams on a unit square. Two to five sets are drawn as
//! ellipses, six sets as triangles; every region ("petal") is identified by
//! a logic string such as `101` (inside sets 0 and 2, outside set 1).

use crate::charts::palette::{parse_color, rgba_from_unit, VENN_COLORS};
use crate::charts::renderer::{text_style, Figure, PlotError};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::f64::consts::PI;
use tracing::debug;

/// Petal text keyed by logic string.
pub type PetalLabels = BTreeMap<String, String>;

const ELLIPSE_SEGMENTS: usize = 120;

const SHAPE_COORDS_2: [(f64, f64); 2] = [(0.375, 0.500), (0.625, 0.500)];
const SHAPE_COORDS_3: [(f64, f64); 3] = [(0.333, 0.633), (0.666, 0.633), (0.500, 0.310)];
const SHAPE_COORDS_4: [(f64, f64); 4] =
    [(0.350, 0.400), (0.450, 0.500), (0.544, 0.500), (0.644, 0.400)];
const SHAPE_COORDS_5: [(f64, f64); 5] = [
    (0.428, 0.449),
    (0.469, 0.543),
    (0.558, 0.523),
    (0.578, 0.432),
    (0.489, 0.383),
];
const TRIANGLES_6: [[(f64, f64); 3]; 6] = [
    [(0.637, 0.921), (0.649, 0.274), (0.188, 0.667)],
    [(0.981, 0.769), (0.335, 0.191), (0.393, 0.671)],
    [(0.941, 0.397), (0.292, 0.475), (0.456, 0.747)],
    [(0.662, 0.119), (0.316, 0.548), (0.662, 0.700)],
    [(0.309, 0.081), (0.374, 0.718), (0.681, 0.488)],
    [(0.016, 0.626), (0.726, 0.687), (0.522, 0.327)],
];

/// (width, height) shared by every ellipse of an n-set diagram.
fn ellipse_dims(n_sets: usize) -> (f64, f64) {
    match n_sets {
        4 => (0.72, 0.45),
        5 => (0.87, 0.50),
        _ => (0.50, 0.50),
    }
}

fn ellipse_angles(n_sets: usize) -> &'static [f64] {
    match n_sets {
        4 => &[140.0, 140.0, 40.0, 40.0],
        5 => &[155.0, 82.0, 10.0, 118.0, 46.0],
        2 => &[0.0, 0.0],
        _ => &[0.0, 0.0, 0.0],
    }
}

fn ellipse_centers(n_sets: usize) -> &'static [(f64, f64)] {
    match n_sets {
        2 => &SHAPE_COORDS_2,
        3 => &SHAPE_COORDS_3,
        4 => &SHAPE_COORDS_4,
        _ => &SHAPE_COORDS_5,
    }
}

fn petal_coords(n_sets: usize) -> &'static [(&'static str, (f64, f64))] {
    match n_sets {
        2 => &[("01", (0.74, 0.50)), ("10", (0.26, 0.50)), ("11", (0.50, 0.50))],
        3 => &[
            ("001", (0.500, 0.270)),
            ("010", (0.730, 0.650)),
            ("011", (0.610, 0.460)),
            ("100", (0.270, 0.650)),
            ("101", (0.390, 0.460)),
            ("110", (0.500, 0.650)),
            ("111", (0.500, 0.508)),
        ],
        4 => &[
            ("0001", (0.85, 0.42)),
            ("0010", (0.68, 0.72)),
            ("0011", (0.77, 0.59)),
            ("0100", (0.32, 0.72)),
            ("0101", (0.71, 0.30)),
            ("0110", (0.50, 0.66)),
            ("0111", (0.65, 0.50)),
            ("1000", (0.14, 0.42)),
            ("1001", (0.50, 0.17)),
            ("1010", (0.29, 0.30)),
            ("1011", (0.39, 0.24)),
            ("1100", (0.23, 0.59)),
            ("1101", (0.61, 0.24)),
            ("1110", (0.35, 0.50)),
            ("1111", (0.50, 0.38)),
        ],
        5 => &[
            ("00001", (0.27, 0.11)),
            ("00010", (0.72, 0.11)),
            ("00011", (0.55, 0.13)),
            ("00100", (0.91, 0.58)),
            ("00101", (0.78, 0.64)),
            ("00110", (0.84, 0.41)),
            ("00111", (0.76, 0.55)),
            ("01000", (0.51, 0.90)),
            ("01001", (0.39, 0.15)),
            ("01010", (0.42, 0.78)),
            ("01011", (0.50, 0.15)),
            ("01100", (0.67, 0.76)),
            ("01101", (0.70, 0.71)),
            ("01110", (0.51, 0.74)),
            ("01111", (0.64, 0.67)),
            ("10000", (0.10, 0.61)),
            ("10001", (0.20, 0.31)),
            ("10010", (0.76, 0.25)),
            ("10011", (0.65, 0.23)),
            ("10100", (0.18, 0.50)),
            ("10101", (0.21, 0.37)),
            ("10110", (0.81, 0.37)),
            ("10111", (0.74, 0.40)),
            ("11000", (0.27, 0.70)),
            ("11001", (0.34, 0.25)),
            ("11010", (0.33, 0.72)),
            ("11011", (0.51, 0.22)),
            ("11100", (0.25, 0.58)),
            ("11101", (0.28, 0.39)),
            ("11110", (0.36, 0.66)),
            ("11111", (0.51, 0.47)),
        ],
        _ => &[
            ("000001", (0.212, 0.562)),
            ("000010", (0.430, 0.249)),
            ("000011", (0.356, 0.444)),
            ("000100", (0.609, 0.255)),
            ("000101", (0.323, 0.546)),
            ("000110", (0.513, 0.316)),
            ("000111", (0.523, 0.348)),
            ("001000", (0.747, 0.458)),
            ("001001", (0.325, 0.492)),
            ("001010", (0.670, 0.481)),
            ("001011", (0.359, 0.478)),
            ("001100", (0.653, 0.444)),
            ("001101", (0.344, 0.526)),
            ("001110", (0.653, 0.466)),
            ("001111", (0.363, 0.503)),
            ("010000", (0.750, 0.616)),
            ("010001", (0.682, 0.654)),
            ("010010", (0.402, 0.310)),
            ("010011", (0.392, 0.421)),
            ("010100", (0.653, 0.691)),
            ("010101", (0.651, 0.644)),
            ("010110", (0.490, 0.340)),
            ("010111", (0.468, 0.399)),
            ("011000", (0.692, 0.545)),
            ("011001", (0.666, 0.592)),
            ("011010", (0.665, 0.496)),
            ("011011", (0.374, 0.470)),
            ("011100", (0.653, 0.537)),
            ("011101", (0.652, 0.579)),
            ("011110", (0.653, 0.488)),
            ("011111", (0.389, 0.486)),
            ("100000", (0.553, 0.806)),
            ("100001", (0.313, 0.604)),
            ("100010", (0.388, 0.694)),
            ("100011", (0.375, 0.633)),
            ("100100", (0.605, 0.359)),
            ("100101", (0.334, 0.555)),
            ("100110", (0.582, 0.397)),
            ("100111", (0.542, 0.372)),
            ("101000", (0.468, 0.708)),
            ("101001", (0.355, 0.572)),
            ("101010", (0.420, 0.679)),
            ("101011", (0.375, 0.597)),
            ("101100", (0.641, 0.436)),
            ("101101", (0.348, 0.538)),
            ("101110", (0.635, 0.453)),
            ("101111", (0.370, 0.548)),
            ("110000", (0.594, 0.689)),
            ("110001", (0.579, 0.670)),
            ("110010", (0.398, 0.670)),
            ("110011", (0.395, 0.653)),
            ("110100", (0.633, 0.682)),
            ("110101", (0.616, 0.656)),
            ("110110", (0.587, 0.427)),
            ("110111", (0.526, 0.415)),
            ("111000", (0.495, 0.677)),
            ("111001", (0.505, 0.648)),
            ("111010", (0.428, 0.663)),
            ("111011", (0.430, 0.631)),
            ("111100", (0.639, 0.524)),
            ("111101", (0.591, 0.604)),
            ("111110", (0.622, 0.477)),
            ("111111", (0.501, 0.523)),
        ],
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HAlign {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VAlign {
    Top,
    Center,
    Bottom,
}

fn dataset_label_coords(n_sets: usize) -> &'static [(f64, f64, HAlign, VAlign)] {
    use HAlign as H;
    use VAlign as V;
    match n_sets {
        2 => &[(0.20, 0.76, H::Right, V::Bottom), (0.80, 0.76, H::Left, V::Bottom)],
        3 => &[
            (0.15, 0.87, H::Right, V::Bottom),
            (0.85, 0.87, H::Left, V::Bottom),
            (0.50, 0.02, H::Center, V::Top),
        ],
        4 => &[
            (0.13, 0.18, H::Right, V::Center),
            (0.18, 0.83, H::Right, V::Bottom),
            (0.82, 0.83, H::Left, V::Bottom),
            (0.87, 0.18, H::Left, V::Top),
        ],
        5 => &[
            (0.02, 0.72, H::Right, V::Center),
            (0.72, 0.94, H::Center, V::Bottom),
            (0.97, 0.74, H::Left, V::Center),
            (0.88, 0.05, H::Left, V::Center),
            (0.12, 0.05, H::Right, V::Center),
        ],
        _ => &[
            (0.674, 0.824, H::Center, V::Center),
            (0.747, 0.751, H::Center, V::Center),
            (0.739, 0.396, H::Center, V::Center),
            (0.700, 0.247, H::Center, V::Center),
            (0.291, 0.255, H::Center, V::Center),
            (0.203, 0.484, H::Center, V::Center),
        ],
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VennOptions {
    /// Fill colors, one per set; empty means the built-in palette.
    pub palette: Vec<String>,
    /// Alpha applied to a custom palette.
    pub alpha: f64,
    pub fontsize: f64,
    /// Petal text template: `{size}`, `{logic}`, `{percentage}` or
    /// `{percentage:.1f}`.
    pub petal_format: String,
}

impl Default for VennOptions {
    fn default() -> Self {
        Self {
            palette: Vec::new(),
            alpha: 0.4,
            fontsize: 14.0,
            petal_format: "{size}".to_string(),
        }
    }
}

/// All logic strings of `n_sets` sets, from `0..01` to `1..1`.
pub fn generate_logics(n_sets: usize) -> Vec<String> {
    (1..1usize << n_sets)
        .map(|i| format!("{:0width$b}", i, width = n_sets))
        .collect()
}

/// Shortest round-trip text of `value` with a decimal point kept on whole
/// numbers (`25.0`) and an exponent below 1e-4 (`1e-05`).
fn shortest_float(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    if value != 0.0 && value.abs() < 1e-4 {
        let text = format!("{value:e}");
        return match text.split_once('e') {
            Some((mantissa, exp)) => {
                let (sign, digits) = match exp.strip_prefix('-') {
                    Some(digits) => ('-', digits),
                    None => ('+', exp),
                };
                format!("{mantissa}e{sign}{digits:0>2}")
            }
            None => text,
        };
    }
    if value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

fn format_petal(format: &str, logic: &str, size: usize, percentage: f64) -> Result<String, PlotError> {
    let mut out = String::with_capacity(format.len());
    let mut rest = format;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let close = rest[open..]
            .find('}')
            .map(|c| open + c)
            .ok_or_else(|| PlotError::InvalidArgument(format!("unclosed '{{' in '{format}'")))?;
        let field = &rest[open + 1..close];
        match field {
            "size" => out.push_str(&size.to_string()),
            "logic" => out.push_str(logic),
            "percentage" => out.push_str(&shortest_float(percentage)),
            _ => {
                let precision = field
                    .strip_prefix("percentage:.")
                    .and_then(|p| p.strip_suffix('f'))
                    .and_then(|p| p.parse::<usize>().ok())
                    .ok_or_else(|| {
                        PlotError::InvalidArgument(format!("unknown petal field '{{{field}}}'"))
                    })?;
                out.push_str(&format!("{percentage:.precision$}"));
            }
        }
        rest = &rest[close + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Text for every petal of the diagram of `sets`.
///
/// A petal holds the elements that belong to every set marked `1` in its
/// logic and to none marked `0`.
pub fn generate_petal_labels(sets: &[BTreeSet<String>], format: &str) -> Result<PetalLabels, PlotError> {
    let mut membership: HashMap<&str, usize> = HashMap::new();
    for (i, set) in sets.iter().enumerate() {
        let bit = 1usize << (sets.len() - 1 - i);
        for element in set {
            *membership.entry(element.as_str()).or_insert(0) |= bit;
        }
    }

    let mut sizes: HashMap<usize, usize> = HashMap::new();
    for mask in membership.values() {
        *sizes.entry(*mask).or_insert(0) += 1;
    }
    let union_size = membership.len();

    generate_logics(sets.len())
        .into_iter()
        .enumerate()
        .map(|(i, logic)| {
            let size = sizes.get(&(i + 1)).copied().unwrap_or(0);
            let percentage = if union_size == 0 {
                0.0
            } else {
                100.0 * size as f64 / union_size as f64
            };
            let text = format_petal(format, &logic, size, percentage)?;
            Ok((logic, text))
        })
        .collect()
}

/// Make sure every petal key is a valid logic of `n_sets` sets.
pub fn check_petal_labels(petals: &PetalLabels, n_sets: usize) -> Result<(), PlotError> {
    for logic in petals.keys() {
        if logic.len() != n_sets {
            return Err(PlotError::InvalidArgument(format!(
                "Inconsistent petal and dataset labels: {}, {}",
                logic.len(),
                n_sets
            )));
        }
        if !logic.chars().all(|c| c == '0' || c == '1') {
            return Err(PlotError::InvalidArgument(format!("Key not understood: {logic}")));
        }
        if !logic.contains('1') {
            return Err(PlotError::InvalidArgument(format!("Key is not legal: {logic}")));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub enum VennShape {
    Ellipse {
        center: (f64, f64),
        width: f64,
        height: f64,
        /// Degrees, counter-clockwise.
        angle: f64,
    },
    Triangle([(f64, f64); 3]),
}

impl VennShape {
    /// Closed outline as a polygon in unit-square coordinates.
    pub fn outline(&self) -> Vec<(f64, f64)> {
        match self {
            VennShape::Ellipse {
                center: (cx, cy),
                width,
                height,
                angle,
            } => {
                let (sin_a, cos_a) = angle.to_radians().sin_cos();
                let (rx, ry) = (width / 2.0, height / 2.0);
                (0..ELLIPSE_SEGMENTS)
                    .map(|i| {
                        let t = 2.0 * PI * i as f64 / ELLIPSE_SEGMENTS as f64;
                        let (x, y) = (rx * t.cos(), ry * t.sin());
                        (cx + x * cos_a - y * sin_a, cy + x * sin_a + y * cos_a)
                    })
                    .collect()
            }
            VennShape::Triangle(points) => points.to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VennPatch {
    pub shape: VennShape,
    pub fill: RGBAColor,
    pub edge: RGBAColor,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VennText {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub size: f64,
    pub halign: HAlign,
    pub valign: VAlign,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VennLayout {
    pub patches: Vec<VennPatch>,
    pub petals: Vec<VennText>,
    pub dataset_labels: Vec<VennText>,
}

impl VennLayout {
    pub fn compute(
        petals: &PetalLabels,
        dataset_labels: &[String],
        options: &VennOptions,
    ) -> Result<Self, PlotError> {
        let n_sets = dataset_labels.len();
        if !(2..=6).contains(&n_sets) {
            return Err(PlotError::InvalidArgument(format!(
                "Number of sets must be between 2 and 6, got {n_sets}"
            )));
        }
        check_petal_labels(petals, n_sets)?;

        let fills = Self::fills(n_sets, options)?;
        let shapes: Vec<VennShape> = if n_sets == 6 {
            TRIANGLES_6.iter().map(|t| VennShape::Triangle(*t)).collect()
        } else {
            let (width, height) = ellipse_dims(n_sets);
            ellipse_centers(n_sets)
                .iter()
                .zip(ellipse_angles(n_sets))
                .map(|(&center, &angle)| VennShape::Ellipse {
                    center,
                    width,
                    height,
                    angle,
                })
                .collect()
        };

        let patches = shapes
            .into_iter()
            .zip(fills)
            .map(|(shape, fill)| VennPatch {
                shape,
                edge: RGBAColor(fill.0, fill.1, fill.2, (1.0 + fill.3) / 2.0),
                fill,
            })
            .collect();

        let petal_texts = petal_coords(n_sets)
            .iter()
            .filter_map(|(logic, (x, y))| {
                petals.get(*logic).map(|text| VennText {
                    text: text.clone(),
                    x: *x,
                    y: *y,
                    size: options.fontsize,
                    halign: HAlign::Center,
                    valign: VAlign::Center,
                })
            })
            .collect();

        let label_texts = dataset_label_coords(n_sets)
            .iter()
            .zip(dataset_labels)
            .map(|(&(x, y, halign, valign), label)| VennText {
                text: label.clone(),
                x,
                y,
                size: options.fontsize + 2.0,
                halign,
                valign,
            })
            .collect();

        Ok(Self {
            patches,
            petals: petal_texts,
            dataset_labels: label_texts,
        })
    }

    fn fills(n_sets: usize, options: &VennOptions) -> Result<Vec<RGBAColor>, PlotError> {
        if options.palette.is_empty() {
            return Ok(VENN_COLORS[..n_sets]
                .iter()
                .map(|&(r, g, b, a)| rgba_from_unit(r, g, b, a))
                .collect());
        }
        let colors = options
            .palette
            .iter()
            .map(|spec| parse_color(spec))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((0..n_sets)
            .map(|i| colors[i % colors.len()].mix(options.alpha))
            .collect())
    }
}

pub struct VennDiagram {
    layout: VennLayout,
}

impl VennDiagram {
    /// Diagram from precomputed petal labels.
    pub fn new(petals: &PetalLabels, dataset_labels: &[String], options: &VennOptions) -> Result<Self, PlotError> {
        let layout = VennLayout::compute(petals, dataset_labels, options)?;
        Ok(Self { layout })
    }

    /// Diagram of named sets, labelling petals with `options.petal_format`.
    pub fn from_sets(sets: &[(String, BTreeSet<String>)], options: &VennOptions) -> Result<Self, PlotError> {
        let labels: Vec<String> = sets.iter().map(|(label, _)| label.clone()).collect();
        let members: Vec<BTreeSet<String>> = sets.iter().map(|(_, set)| set.clone()).collect();
        if !(2..=6).contains(&members.len()) {
            return Err(PlotError::InvalidArgument(format!(
                "Number of sets must be between 2 and 6, got {}",
                members.len()
            )));
        }
        let petals = generate_petal_labels(&members, &options.petal_format)?;
        debug!(sets = members.len(), petals = petals.len(), "computed venn petals");
        Self::new(&petals, &labels, options)
    }

    pub fn layout(&self) -> &VennLayout {
        &self.layout
    }
}

fn anchor(halign: HAlign, valign: VAlign) -> Pos {
    let h = match halign {
        HAlign::Left => HPos::Left,
        HAlign::Center => HPos::Center,
        HAlign::Right => HPos::Right,
    };
    let v = match valign {
        VAlign::Top => VPos::Top,
        VAlign::Center => VPos::Center,
        VAlign::Bottom => VPos::Bottom,
    };
    Pos::new(h, v)
}

impl Figure for VennDiagram {
    fn draw<DB: DrawingBackend>(&self, area: &DrawingArea<DB, Shift>) -> Result<(), PlotError> {
        let mut chart = ChartBuilder::on(area)
            .margin(10)
            .build_cartesian_2d(0.0..1.0, 0.0..1.0)?;

        for patch in &self.layout.patches {
            let mut outline = patch.shape.outline();
            chart.draw_series(std::iter::once(Polygon::new(
                outline.clone(),
                patch.fill.filled(),
            )))?;
            if let Some(&first) = outline.first() {
                outline.push(first);
            }
            chart.draw_series(std::iter::once(PathElement::new(
                outline,
                patch.edge.stroke_width(1),
            )))?;
        }

        let texts = self.layout.petals.iter().chain(&self.layout.dataset_labels);
        chart.draw_series(texts.map(|t| {
            Text::new(
                t.text.clone(),
                (t.x, t.y),
                text_style(t.size).pos(anchor(t.halign, t.valign)),
            )
        }))?;

        Ok(())
    }
}
