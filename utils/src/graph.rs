use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use anyhow::{bail, Context};
use plotters::prelude::*;
use structopt::StructOpt;

#[derive(StructOpt)]
pub struct GraphOptions {
    /// `log.txt` files written by `train`.
    #[structopt(required = true)]
    pub logs: Vec<PathBuf>,
    #[structopt(short, long, default_value = "plots")]
    pub output: PathBuf,
}

const COLOURS: &[RGBColor] = &[
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(227, 119, 194),
    RGBColor(127, 127, 127),
    RGBColor(188, 189, 34),
    RGBColor(23, 190, 207),
];

const CHART_BG_COLOUR: RGBAColor = RGBAColor(234, 234, 242, 1.0);

const LEGEND_STROKE_WIDTH: u32 = 4;
const LINE_STROKE_WIDTH: u32 = 2;

const X_LABEL_AREA_SIZE: i32 = 60;
const Y_LABEL_AREA_SIZE: i32 = 80;
const LEGEND_AREA_SIZE: i32 = 50;
const LEGEND_DRAW_OFFSET: i32 = 40;

const TITLE_FONT_SIZE: i32 = 40;
const LABEL_FONT_SIZE: i32 = 25;
const TICKS_FONT_SIZE: i32 = 20;

const FONT: &str = "sans-serif";

const MARGIN: i32 = 20;

/// 1080p
const IMG_DIMS: (u32, u32) = (1920, 1080);

/// One loss curve per model per log file.
struct Series {
    label: String,
    losses: Vec<f64>,
}

fn field<'a>(entry: &'a str, key: &str) -> Option<&'a str> {
    entry.split(',').find_map(|part| part.strip_prefix(key)?.strip_prefix(':'))
}

fn read_log(path: &Path) -> anyhow::Result<Vec<Series>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let run = path.parent().and_then(Path::file_name).map_or_else(|| "run".into(), |name| name.to_string_lossy());

    let mut series: Vec<(usize, Vec<f64>)> = Vec::new();

    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;

        if line.trim().is_empty() {
            continue;
        }

        let parsed = field(&line, "model")
            .and_then(|m| m.parse::<usize>().ok())
            .zip(field(&line, "loss").and_then(|l| l.parse::<f64>().ok()));

        let Some((model, loss)) = parsed else {
            bail!("{}:{}: expected `model:k,epoch:e,loss:l`", path.display(), idx + 1);
        };

        match series.iter_mut().find(|(m, _)| *m == model) {
            Some((_, losses)) => losses.push(loss),
            None => series.push((model, vec![loss])),
        }
    }

    Ok(series.into_iter().map(|(model, losses)| Series { label: format!("{run} model {model}"), losses }).collect())
}

impl GraphOptions {
    pub fn run(&self) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.output)
            .with_context(|| format!("Failed to create {}", self.output.display()))?;

        let mut all = Vec::new();

        for log in &self.logs {
            all.extend(read_log(log)?);
        }

        let x_max = all.iter().map(|s| s.losses.len()).max().unwrap_or(0) as i32;
        let losses = all.iter().flat_map(|s| s.losses.iter().copied());
        let y_min = losses.clone().fold(f64::INFINITY, f64::min);
        let y_max = losses.fold(f64::NEG_INFINITY, f64::max);

        if x_max == 0 || !y_min.is_finite() || !y_max.is_finite() {
            bail!("No losses to plot");
        }

        let output_path = self.output.join("reconstruction_loss.png");
        let root = BitMapBackend::new(&output_path, IMG_DIMS).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption("Reconstruction loss per epoch", (FONT, TITLE_FONT_SIZE))
            .margin(MARGIN)
            .x_label_area_size(X_LABEL_AREA_SIZE)
            .y_label_area_size(Y_LABEL_AREA_SIZE)
            .build_cartesian_2d(1..x_max + 1, y_min..y_max)?;

        chart.plotting_area().fill(&CHART_BG_COLOUR)?;

        chart
            .configure_mesh()
            .x_label_style((FONT, TICKS_FONT_SIZE).into_font())
            .y_label_style((FONT, TICKS_FONT_SIZE).into_font())
            .axis_desc_style((FONT, LABEL_FONT_SIZE).into_font())
            .x_desc("Epoch")
            .y_desc("Loss")
            .draw()?;

        for (i, series) in all.iter().enumerate() {
            let colour = COLOURS[i % COLOURS.len()];

            chart
                .draw_series(LineSeries::new(
                    series.losses.iter().enumerate().map(|(x, &y)| (x as i32 + 1, y)),
                    ShapeStyle::from(colour).stroke_width(LINE_STROKE_WIDTH),
                ))?
                .label(series.label.as_str())
                .legend(move |(x, y)| {
                    PathElement::new(
                        [(x, y), (x + LEGEND_DRAW_OFFSET, y)],
                        ShapeStyle::from(colour).stroke_width(LEGEND_STROKE_WIDTH),
                    )
                });
        }

        chart
            .configure_series_labels()
            .border_style(BLACK)
            .background_style(WHITE.mix(0.8))
            .position(SeriesLabelPosition::UpperRight)
            .legend_area_size(LEGEND_AREA_SIZE)
            .label_font((FONT, LABEL_FONT_SIZE).into_font())
            .draw()?;

        root.present()?;

        println!("Plot saved to {}", output_path.display());

        Ok(())
    }
}
