//! Charts module - Layout and rendering of genomics plots

pub mod admixture;
pub mod manhattan;
pub mod palette;
pub mod qq;
mod renderer;
pub mod venn;

pub use admixture::{AdmixtureOptions, AdmixturePlot, SampleSpec};
pub use manhattan::{ManhattanOptions, ManhattanPlot, PlotKind};
pub use qq::{QqOptions, QqPlot};
pub use renderer::{Figure, OutputFormat, PlotError, StaticChartRenderer};
pub use venn::{VennDiagram, VennOptions};

/// Whether a system sans-serif font can be laid out.
///
/// Text rendering needs one; headless machines without fonts can still
/// compute layouts.
pub fn fonts_available() -> bool {
    use plotters::style::{FontDesc, FontFamily, FontStyle};
    FontDesc::new(FontFamily::SansSerif, 12.0, FontStyle::Normal)
        .box_size("Ag")
        .is_ok()
}
