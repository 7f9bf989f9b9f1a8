//! File-to-figure tests across loader, layout and renderer.

use geneview::charts::{
    fonts_available, AdmixtureOptions, AdmixturePlot, ManhattanOptions, ManhattanPlot, QqOptions,
    QqPlot, VennDiagram, VennOptions,
};
use geneview::data::{DataLoader, GwasProcessor};
use geneview::{GeneviewConfig, PlotError, StaticChartRenderer};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

fn gwas_table(dir: &TempDir) -> PathBuf {
    let mut text = String::from("#CHROM\tPOS\tID\tREF\tALT\tP\n");
    for chrom in ["1", "2", "10", "X"] {
        for i in 1..=20u64 {
            let p = if chrom == "2" && i == 10 { 1e-9 } else { 0.5 / i as f64 };
            text.push_str(&format!("{chrom}\t{}\trs{chrom}_{i}\tA\tG\t{p}\n", i * 1000));
        }
    }
    write(dir, "assoc.PHENO1.glm.logistic", &text)
}

#[test]
fn manhattan_from_plink2_table() {
    let dir = TempDir::new().unwrap();
    let path = gwas_table(&dir);

    let mut loader = DataLoader::new();
    let df = loader.load_table(&path, None).unwrap();
    assert_eq!(df.height(), 80);

    let options = ManhattanOptions {
        annotate_top_snp: true,
        ..Default::default()
    };
    let plot = ManhattanPlot::from_dataframe(df, options).unwrap();
    let layout = plot.layout();

    let labels: Vec<&str> = layout.ticks.iter().map(|t| t.label.as_str()).collect();
    assert_eq!(labels, vec!["1", "2", "10", "X"]);
    assert_eq!(layout.points.len(), 80);
    assert_eq!(layout.annotations.len(), 1);
    assert_eq!(layout.annotations[0].label, "rs2_10");

    if fonts_available() {
        let out = dir.path().join("manhattan.png");
        StaticChartRenderer::render_to_file(&plot, &out, (1000, 400)).unwrap();
        assert!(fs::metadata(&out).unwrap().len() > 0);
    }
}

#[test]
fn manhattan_over_several_files() {
    let dir = TempDir::new().unwrap();
    let a = write(&dir, "a.csv", "CHR,BP,PVAL\n1,100,0.1\n1,200,0.01\n");
    let b = write(&dir, "b.csv", "CHR,BP,PVAL\n2,50,0.001\n");

    let mut loader = DataLoader::new();
    let df = loader.load_tables(&[a, b], None).unwrap();

    let mut options = ManhattanOptions::default();
    options.columns.chrom = "CHR".into();
    options.columns.pos = "BP".into();
    options.columns.pv = "PVAL".into();

    let plot = ManhattanPlot::from_dataframe(df, options).unwrap();
    let xs: Vec<f64> = plot.layout().points.iter().map(|p| p.x).collect();
    assert_eq!(xs, vec![100.0, 200.0, 250.0]);
}

#[test]
fn manhattan_keeps_sex_chromosomes_after_many_autosome_rows() {
    let dir = TempDir::new().unwrap();
    let mut text = String::from("#CHROM\tPOS\tID\tP\n");
    for i in 1..=12_000u64 {
        text.push_str(&format!("1\t{i}\trs{i}\t0.5\n"));
    }
    for i in 1..=50u64 {
        text.push_str(&format!("X\t{i}\t.\t1e-12\n"));
    }
    let path = write(&dir, "big.PHENO1.glm.linear", &text);

    let plot = ManhattanPlot::from_files(&[path], None, ManhattanOptions::default()).unwrap();
    let layout = plot.layout();
    assert_eq!(layout.points.len(), 12_050);
    let labels: Vec<&str> = layout.ticks.iter().map(|t| t.label.as_str()).collect();
    assert_eq!(labels, vec!["1", "X"]);
}

#[test]
fn admixture_from_files_reports_loader_errors() {
    let dir = TempDir::new().unwrap();
    let q = write(&dir, "run.2.Q", "0.9 0.1\n0.2 0.8\n");
    let info = write(&dir, "pop.info", "CEU\n");
    let result = AdmixturePlot::from_files(&q, &info, AdmixtureOptions::default());
    assert!(matches!(result, Err(PlotError::Loader(_))));
}

#[test]
fn manhattan_missing_column_is_reported() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "gwas.csv", "CHR,BP,P\n1,100,0.1\n");

    let mut loader = DataLoader::new();
    let df = loader.load_table(&path, None).unwrap();
    let result = ManhattanPlot::from_dataframe(df, ManhattanOptions::default());
    assert!(matches!(result, Err(PlotError::Processor(_))));
}

#[test]
fn qq_from_table_column() {
    let dir = TempDir::new().unwrap();
    let path = gwas_table(&dir);

    let mut loader = DataLoader::new();
    let df = loader.load_table(&path, None).unwrap();
    let pvalues = GwasProcessor::pvalues(df, "P").unwrap();

    let plot = QqPlot::qqplot(&pvalues, None, QqOptions::default()).unwrap();
    assert_eq!(plot.layout().points.len(), 80);
    assert!(plot.layout().lambda.unwrap() > 0.0);

    let image = StaticChartRenderer::render_to_image(&plot, (300, 300));
    if fonts_available() {
        assert_eq!(image.unwrap().dimensions(), (300, 300));
    }
}

#[test]
fn admixture_from_q_file() {
    let dir = TempDir::new().unwrap();
    let q = write(
        &dir,
        "run.3.Q",
        "0.80 0.10 0.10\n0.05 0.90 0.05\n0.75 0.15 0.10\n0.10 0.10 0.80\n0.02 0.95 0.03\n",
    );
    let info = write(&dir, "pop.info", "CEU\nYRI\nCEU\nCHB\nYRI\n");

    let data = DataLoader::load_admixture(&q, &info).unwrap();
    let groups: Vec<&str> = data.iter().map(|(g, _)| g.as_str()).collect();
    assert_eq!(groups, vec!["CEU", "YRI", "CHB"]);

    let options = AdmixtureOptions {
        group_order: Some(vec!["YRI".into(), "CEU".into(), "CHB".into()]),
        ..Default::default()
    };
    let plot = AdmixturePlot::new(&data, options).unwrap();
    assert_eq!(plot.layout().k, 3);
    assert_eq!(plot.layout().boundaries, vec![2.0, 4.0, 5.0]);
    assert_eq!(plot.layout().bars.len(), 15);

    if fonts_available() {
        let out = dir.path().join("admixture.svg");
        StaticChartRenderer::render_to_file(&plot, &out, (800, 200)).unwrap();
        assert!(fs::read_to_string(&out).unwrap().contains("K=3"));
    }
}

#[test]
fn venn_from_set_files() {
    let dir = TempDir::new().unwrap();
    let paths = [
        write(&dir, "a.txt", "BRCA1\nTP53\nEGFR\n"),
        write(&dir, "b.txt", "TP53\nKRAS\n"),
        write(&dir, "c.txt", "TP53\nEGFR\nMYC\n"),
    ];

    let sets: Vec<(String, BTreeSet<String>)> = paths
        .iter()
        .map(|p: &PathBuf| {
            let name = Path::new(p).file_stem().unwrap().to_string_lossy().into_owned();
            let set = DataLoader::load_set_file(p).unwrap().into_iter().collect();
            (name, set)
        })
        .collect();

    let diagram = VennDiagram::from_sets(&sets, &VennOptions::default()).unwrap();
    let layout = diagram.layout();
    let center = layout.petals.iter().find(|t| (t.x, t.y) == (0.5, 0.508)).unwrap();
    assert_eq!(center.text, "1"); // TP53

    if fonts_available() {
        let svg = StaticChartRenderer::render_to_svg_string(&diagram, (400, 400)).unwrap();
        assert!(svg.contains("<polygon"));
    }
}

#[test]
fn config_file_drives_options() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "geneview.json",
        r##"{"width": 640, "height": 480, "manhattan": {"colors": ["#000000,#969696"], "genomewide_line": null}}"##,
    );
    let config = GeneviewConfig::from_file(&path).unwrap();
    assert_eq!(config.size(), (640, 480));

    let table = gwas_table(&dir);
    let mut loader = DataLoader::new();
    let df = loader.load_table(&table, None).unwrap();
    let plot = ManhattanPlot::from_dataframe(df, config.manhattan).unwrap();
    assert_eq!(plot.layout().thresholds.len(), 1);
    assert!(plot
        .layout()
        .points
        .iter()
        .all(|p| p.color.0 == 0 || p.color.0 == 0x96));
}
