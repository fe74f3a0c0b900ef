use crate::aggregate::MonthlyTable;
use crate::error::{CovidError, Result};
use crate::{fmt_cases, min_and_max, suitable_xfmt};
use chrono::prelude::*;
use plotters::prelude::*;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, info};

pub const TITLE: &str = "Monthly Evolution of Total COVID-19 Cases by Country";
pub const X_LABEL: &str = "Month";
pub const Y_LABEL: &str = "Total Cases";
pub const DEFAULT_SIZE: (u32, u32) = (1280, 720);

/// How hover tooltips are grouped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoverMode {
    /// one tooltip per point
    Closest,
    /// one tooltip per x position, listing every series
    XUnified,
}

/// One line of the chart, points sorted by date.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub points: Vec<(NaiveDate, f64)>,
}

/// An interactive multi-series line chart, rendered to svg or html.
#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub hover_mode: HoverMode,
    pub series: Vec<Series>,
    pub size: (u32, u32),
}

/// invisible region over one x position, carrying its tooltip
struct HoverBand {
    x: std::ops::Range<i32>,
    y: std::ops::Range<i32>,
    text: String,
}

/// One series per country of the monthly table, x = month, y = total cases.
/// An empty table gives a figure without series.
pub fn build_chart(monthly: &MonthlyTable) -> Figure {
    let mut series: Vec<Series> = Vec::new();
    for country in monthly.countries() {
        let mut points: Vec<(NaiveDate, f64)> = monthly
            .records()
            .filter(|r| r.country == country)
            .map(|r| (r.date, r.total_cases))
            .collect();
        points.sort_by_key(|p| p.0);
        series.push(Series {
            name: country.to_string(),
            points,
        });
    }
    debug!("built chart with {} series", series.len());
    Figure {
        title: TITLE.to_string(),
        x_label: X_LABEL.to_string(),
        y_label: Y_LABEL.to_string(),
        hover_mode: HoverMode::XUnified,
        series,
        size: DEFAULT_SIZE,
    }
}

fn at_midnight(d: NaiveDate) -> DateTime<Utc> {
    TimeZone::from_utc_datetime(&Utc, &d.and_time(NaiveTime::default()))
}

impl Figure {
    pub fn with_size(mut self, width: u32, height: u32) -> Figure {
        self.size = (width, height);
        self
    }

    /// distinct x values over all series
    pub fn dates(&self) -> BTreeSet<NaiveDate> {
        self.series
            .iter()
            .flat_map(|s| s.points.iter().map(|p| p.0))
            .collect()
    }

    fn x_range(&self) -> (NaiveDate, NaiveDate) {
        let dates: Vec<NaiveDate> = self.dates().into_iter().collect();
        match min_and_max(&dates[..]) {
            Some((min, max)) => {
                let span = max - min;
                let margin = if span < chrono::Duration::days(30) {
                    chrono::Duration::days(15)
                } else {
                    span / 20
                };
                (min - margin, max + margin)
            }
            None => {
                let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default();
                (start, start + chrono::Duration::days(366))
            }
        }
    }

    fn y_max(&self) -> f64 {
        let values: Vec<f64> = self
            .series
            .iter()
            .flat_map(|s| s.points.iter().map(|p| p.1))
            .filter(|w| !w.is_nan())
            .collect();
        match min_and_max(&values[..]) {
            Some((_, max)) if max > 0. => max * 1.05,
            _ => 1.,
        }
    }

    /// text of the unified tooltip at `date`
    fn hover_text(&self, date: NaiveDate) -> String {
        let mut text = date.format("%B %Y").to_string();
        for s in self.series.iter() {
            let at_date = s.points.iter().find(|p| p.0 == date && !p.1.is_nan());
            if let Some((_, w)) = at_date {
                text.push('\n');
                text.push_str(&format!("{}: {}", s.name, fmt_cases(*w)));
            }
        }
        text
    }

    fn draw(&self, buf: &mut String) -> std::result::Result<Vec<HoverBand>, Box<dyn std::error::Error>> {
        let (xmin, xmax) = self.x_range();
        let xfmt = suitable_xfmt(xmax - xmin);
        let ymax = self.y_max();
        let root = SVGBackend::with_string(buf, self.size).into_drawing_area();
        root.fill(&WHITE)?;
        let mut chart = ChartBuilder::on(&root)
            .caption(&self.title, ("sans-serif", 28))
            .margin(20)
            .x_label_area_size(60)
            .y_label_area_size(110)
            .build_cartesian_2d(at_midnight(xmin)..at_midnight(xmax), 0f64..ymax)?;
        chart
            .configure_mesh()
            .light_line_style(&TRANSPARENT)
            .bold_line_style(RGBColor(200, 200, 200).stroke_width(1))
            .label_style(("sans-serif", 16))
            .x_labels(12)
            .y_labels(10)
            .x_label_formatter(&|x: &DateTime<Utc>| x.format(xfmt).to_string())
            .y_label_formatter(&|y: &f64| fmt_cases(*y))
            .x_desc(self.x_label.as_str())
            .y_desc(self.y_label.as_str())
            .draw()?;

        for (idx, s) in self.series.iter().enumerate() {
            let color = Palette99::pick(idx).to_rgba();
            let mut labelled = false;
            // a missing value breaks the line
            for chunk in s.points.split(|p| p.1.is_nan()) {
                if chunk.is_empty() {
                    continue;
                }
                let line = LineSeries::new(
                    chunk.iter().map(|(d, w)| (at_midnight(*d), *w)),
                    color.stroke_width(3),
                );
                let anno = chart.draw_series(line)?;
                if !labelled {
                    anno.label(s.name.as_str()).legend(move |(x, y)| {
                        PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(3))
                    });
                    labelled = true;
                }
            }
            chart.draw_series(
                s.points
                    .iter()
                    .filter(|p| !p.1.is_nan())
                    .map(|(d, w)| Circle::new((at_midnight(*d), *w), 4, color.filled())),
            )?;
        }

        if !self.series.is_empty() {
            chart
                .configure_series_labels()
                .position(SeriesLabelPosition::UpperLeft)
                .label_font(("sans-serif", 16))
                .background_style(&WHITE.mix(0.8))
                .border_style(&BLACK)
                .draw()?;
        }

        let (plot_x, plot_y) = chart.plotting_area().get_pixel_range();
        let xs: Vec<(NaiveDate, i32)> = self
            .dates()
            .into_iter()
            .map(|d| (d, chart.backend_coord(&(at_midnight(d), 0.)).0))
            .collect();
        let mut bands = Vec::with_capacity(xs.len());
        for (i, (d, x)) in xs.iter().enumerate() {
            let left = match i {
                0 => plot_x.start,
                _ => (xs[i - 1].1 + x) / 2,
            };
            let right = match xs.get(i + 1) {
                Some((_, next)) => (x + next) / 2,
                None => plot_x.end,
            };
            bands.push(HoverBand {
                x: left..right,
                y: plot_y.clone(),
                text: self.hover_text(*d),
            });
        }

        root.present()?;
        Ok(bands)
    }

    fn hover_layer(&self, bands: &[HoverBand]) -> String {
        let mut layer = String::from(
            "<style>.hover rect{fill:#000;fill-opacity:0}.hover rect:hover{fill-opacity:0.06}</style>\n<g class=\"hover\">\n",
        );
        for b in bands.iter() {
            let text = match self.hover_mode {
                HoverMode::XUnified => b.text.clone(),
                HoverMode::Closest => b.text.lines().next().unwrap_or_default().to_string(),
            };
            layer.push_str(&format!(
                "<rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\"><title>{}</title></rect>\n",
                b.x.start,
                b.y.start,
                (b.x.end - b.x.start).max(1),
                (b.y.end - b.y.start).max(1),
                xml_escape(&text)
            ));
        }
        layer.push_str("</g>\n");
        layer
    }

    /// renders the chart as a standalone svg document with hover tooltips
    pub fn to_svg(&self) -> Result<String> {
        let mut svg = String::new();
        let bands = self.draw(&mut svg).map_err(CovidError::render)?;
        insert_before_close(svg, &self.hover_layer(&bands))
    }

    /// the svg wrapped in a minimal html page
    pub fn to_html(&self) -> Result<String> {
        let svg = self.to_svg()?;
        Ok(format!(
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n\
             <style>body{{margin:0;display:flex;justify-content:center;background:#fff}}</style>\n\
             </head>\n<body>\n{}</body>\n</html>\n",
            xml_escape(&self.title),
            svg
        ))
    }

    /// writes html for .html/.htm paths, svg otherwise
    pub fn save(&self, fout: impl AsRef<Path>) -> Result<()> {
        let fout = fout.as_ref();
        let is_html = fout
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("html") || e.eq_ignore_ascii_case("htm"))
            .unwrap_or(false);
        let content = if is_html { self.to_html()? } else { self.to_svg()? };
        std::fs::write(fout, content).map_err(|e| CovidError::data_access(fout, e))?;
        info!("chart with {} series written to {}", self.series.len(), fout.display());
        Ok(())
    }
}

/// puts `layer` last inside the root element, so it is drawn on top
fn insert_before_close(mut svg: String, layer: &str) -> Result<String> {
    let end = svg
        .rfind("</svg>")
        .ok_or_else(|| CovidError::render("backend produced no closing svg tag"))?;
    svg.insert_str(end, layer);
    Ok(svg)
}

fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}
