//! Presentation sink: where forms, tables, charts and explanation fragments go.
//!
//! The dashboard drives a [`PresentationSink`]; [`HtmlPage`] is the sink the
//! web server uses. Charts are drawn as inline SVG.

use std::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::explain::html::escape;
use crate::form::{FormField, FormSpec, FormValues};
use crate::predict::Prediction;
use crate::profile::NumericStatistics;

/// Display surface for one dashboard cycle.
pub trait PresentationSink {
    /// Show the input form and return the values currently entered.
    fn render_form(&mut self, form: &FormSpec) -> FormValues;

    fn render_heading(&mut self, text: &str);

    fn render_text(&mut self, text: &str);

    fn render_table(&mut self, table: &TableView);

    fn render_chart(&mut self, chart: &ChartSpec);

    /// Embed an opaque HTML fragment in a frame of roughly `height_hint` pixels.
    fn render_rich_html(&mut self, fragment: &str, height_hint: u32);

    fn render_error(&mut self, message: &str);
}

/// A simple table of display strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableView {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl TableView {
    /// Class probabilities, one row per class, headed by the label column.
    pub fn probabilities(prediction: &Prediction, label_column: &str) -> Self {
        Self {
            headers: vec![label_column.to_string(), "Probability".to_string()],
            rows: prediction
                .probabilities
                .iter()
                .map(|(label, p)| vec![label.clone(), format!("{:.3}", p)])
                .collect(),
        }
    }
}

/// A named series of points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub name: String,
    pub points: Vec<(f64, f64)>,
}

/// Box statistics of one group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxGroup {
    pub label: String,
    pub stats: NumericStatistics,
}

/// Chart description, independent of how it is drawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "chart", rename_all = "snake_case")]
pub enum ChartSpec {
    Bar {
        title: String,
        bars: Vec<(String, f64)>,
    },
    Lines {
        title: String,
        x_label: String,
        series: Vec<Series>,
    },
    Scatter {
        title: String,
        x_label: String,
        y_label: String,
        series: Vec<Series>,
    },
    Boxes {
        title: String,
        y_label: String,
        groups: Vec<BoxGroup>,
    },
}

impl ChartSpec {
    pub fn title(&self) -> &str {
        match self {
            ChartSpec::Bar { title, .. }
            | ChartSpec::Lines { title, .. }
            | ChartSpec::Scatter { title, .. }
            | ChartSpec::Boxes { title, .. } => title,
        }
    }
}

/// HTML page sink; form values come from the submitted query.
pub struct HtmlPage {
    title: String,
    submitted: FormValues,
    body: String,
}

impl HtmlPage {
    pub fn new(title: impl Into<String>, submitted: FormValues) -> Self {
        Self {
            title: title.into(),
            submitted,
            body: String::new(),
        }
    }

    /// Raw HTML appended to the body as is.
    pub fn push_raw(&mut self, html: &str) {
        self.body.push_str(html);
    }

    /// The complete HTML document.
    pub fn finish(self) -> String {
        format!(
            "<!DOCTYPE html>\n<html lang=\"en\"><head><meta charset=\"utf-8\">\
             <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\
             <title>{title}</title><link rel=\"stylesheet\" href=\"/assets/style.css\"></head>\
             <body><nav><a href=\"/\">Classify</a> <a href=\"/explore\">Explore</a></nav>\
             <main><h1>{title}</h1>{body}</main></body></html>\n",
            title = escape(&self.title),
            body = self.body
        )
    }
}

impl PresentationSink for HtmlPage {
    fn render_form(&mut self, form: &FormSpec) -> FormValues {
        let values = self.submitted.clone().with_defaults(form);
        self.body.push_str("<form method=\"get\" class=\"input-form\">");

        for field in &form.fields {
            let current = values.get(field.name()).unwrap_or_default();
            match field {
                FormField::Choice {
                    name,
                    label,
                    options,
                } => {
                    let _ = write!(
                        self.body,
                        "<label>{}<select name=\"{}\">",
                        escape(label),
                        escape(name)
                    );
                    for option in options {
                        let selected = if option == current { " selected" } else { "" };
                        let _ = write!(
                            self.body,
                            "<option{}>{}</option>",
                            selected,
                            escape(option)
                        );
                    }
                    self.body.push_str("</select></label>");
                }
                FormField::Number {
                    name,
                    label,
                    min,
                    max,
                    step,
                    ..
                } => {
                    let _ = write!(
                        self.body,
                        "<label>{}<input type=\"number\" name=\"{}\" min=\"{}\" max=\"{}\" \
                         step=\"{}\" value=\"{}\"></label>",
                        escape(label),
                        escape(name),
                        min,
                        max,
                        step,
                        escape(current)
                    );
                }
            }
        }

        self.body
            .push_str("<button type=\"submit\">Classify</button></form>");
        values
    }

    fn render_heading(&mut self, text: &str) {
        let _ = write!(self.body, "<h2>{}</h2>", escape(text));
    }

    fn render_text(&mut self, text: &str) {
        let _ = write!(self.body, "<p>{}</p>", escape(text));
    }

    fn render_table(&mut self, table: &TableView) {
        self.body.push_str("<table class=\"data\"><thead><tr>");
        for header in &table.headers {
            let _ = write!(self.body, "<th>{}</th>", escape(header));
        }
        self.body.push_str("</tr></thead><tbody>");
        for row in &table.rows {
            self.body.push_str("<tr>");
            for cell in row {
                let _ = write!(self.body, "<td>{}</td>", escape(cell));
            }
            self.body.push_str("</tr>");
        }
        self.body.push_str("</tbody></table>");
    }

    fn render_chart(&mut self, chart: &ChartSpec) {
        self.body.push_str(&svg::chart(chart));
    }

    fn render_rich_html(&mut self, fragment: &str, height_hint: u32) {
        let _ = write!(
            self.body,
            "<div class=\"fragment\" style=\"min-height:{}px\">{}</div>",
            height_hint, fragment
        );
    }

    fn render_error(&mut self, message: &str) {
        let _ = write!(self.body, "<div class=\"error\">{}</div>", escape(message));
    }
}

mod svg {
    use std::fmt::Write;

    use super::{BoxGroup, ChartSpec, Series};
    use crate::explain::html::escape;

    const WIDTH: f64 = 640.0;
    const HEIGHT: f64 = 360.0;
    const LEFT: f64 = 60.0;
    const RIGHT: f64 = 20.0;
    const TOP: f64 = 36.0;
    const BOTTOM: f64 = 50.0;
    const PALETTE: [&str; 6] = ["#1f77b4", "#d62728", "#2ca02c", "#ff7f0e", "#9467bd", "#8c564b"];

    /// Linear map from a data interval onto a pixel interval.
    struct Scale {
        lo: f64,
        hi: f64,
        from: f64,
        to: f64,
    }

    impl Scale {
        fn new(lo: f64, hi: f64, from: f64, to: f64) -> Self {
            Self { lo, hi, from, to }
        }

        fn map(&self, v: f64) -> f64 {
            if self.hi == self.lo {
                (self.from + self.to) / 2.0
            } else {
                self.from + (v - self.lo) / (self.hi - self.lo) * (self.to - self.from)
            }
        }
    }

    fn color(index: usize) -> &'static str {
        PALETTE[index % PALETTE.len()]
    }

    fn extent(values: impl Iterator<Item = f64>) -> (f64, f64) {
        values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        })
    }

    pub(super) fn chart(chart: &ChartSpec) -> String {
        let mut out = format!(
            "<figure class=\"chart\"><svg viewBox=\"0 0 {} {}\" role=\"img\">\
             <text x=\"{}\" y=\"20\" text-anchor=\"middle\" class=\"chart-title\">{}</text>",
            WIDTH,
            HEIGHT,
            WIDTH / 2.0,
            escape(chart.title())
        );
        match chart {
            ChartSpec::Bar { bars, .. } => bar(&mut out, bars),
            ChartSpec::Lines {
                x_label, series, ..
            } => xy(&mut out, x_label, "density", series, true),
            ChartSpec::Scatter {
                x_label,
                y_label,
                series,
                ..
            } => xy(&mut out, x_label, y_label, series, false),
            ChartSpec::Boxes {
                y_label, groups, ..
            } => boxes(&mut out, y_label, groups),
        }
        out.push_str("</svg></figure>");
        out
    }

    fn axes(out: &mut String, x: &Scale, y: &Scale, x_label: &str, y_label: &str) {
        let bottom = HEIGHT - BOTTOM;
        let _ = write!(
            out,
            "<line x1=\"{l}\" y1=\"{b}\" x2=\"{r}\" y2=\"{b}\" stroke=\"#333\"/>\
             <line x1=\"{l}\" y1=\"{t}\" x2=\"{l}\" y2=\"{b}\" stroke=\"#333\"/>",
            l = LEFT,
            r = WIDTH - RIGHT,
            t = TOP,
            b = bottom
        );
        for v in [y.lo, (y.lo + y.hi) / 2.0, y.hi] {
            let _ = write!(
                out,
                "<text x=\"{}\" y=\"{:.1}\" text-anchor=\"end\" class=\"tick\">{}</text>",
                LEFT - 6.0,
                y.map(v) + 4.0,
                tick(v)
            );
        }
        if x.hi > x.lo {
            for v in [x.lo, (x.lo + x.hi) / 2.0, x.hi] {
                let _ = write!(
                    out,
                    "<text x=\"{:.1}\" y=\"{}\" text-anchor=\"middle\" class=\"tick\">{}</text>",
                    x.map(v),
                    bottom + 16.0,
                    tick(v)
                );
            }
        }
        let _ = write!(
            out,
            "<text x=\"{}\" y=\"{}\" text-anchor=\"middle\" class=\"axis\">{}</text>\
             <text x=\"14\" y=\"{}\" text-anchor=\"middle\" class=\"axis\" \
             transform=\"rotate(-90 14 {})\">{}</text>",
            (LEFT + WIDTH - RIGHT) / 2.0,
            HEIGHT - 8.0,
            escape(x_label),
            (TOP + bottom) / 2.0,
            (TOP + bottom) / 2.0,
            escape(y_label)
        );
    }

    fn tick(v: f64) -> String {
        if v.abs() >= 100.0 || v == v.trunc() {
            format!("{:.0}", v)
        } else if v.abs() >= 1.0 {
            format!("{:.1}", v)
        } else {
            format!("{:.3}", v)
        }
    }

    fn legend(out: &mut String, names: impl Iterator<Item = String>) {
        for (index, name) in names.enumerate() {
            let y = TOP + 14.0 * index as f64;
            let _ = write!(
                out,
                "<rect x=\"{}\" y=\"{}\" width=\"10\" height=\"10\" fill=\"{}\"/>\
                 <text x=\"{}\" y=\"{}\" class=\"legend\">{}</text>",
                WIDTH - RIGHT - 110.0,
                y,
                color(index),
                WIDTH - RIGHT - 96.0,
                y + 9.0,
                escape(&name)
            );
        }
    }

    fn bar(out: &mut String, bars: &[(String, f64)]) {
        let max = bars.iter().map(|(_, v)| *v).fold(0.0, f64::max);
        let x = Scale::new(0.0, bars.len() as f64, LEFT, WIDTH - RIGHT);
        let y = Scale::new(0.0, max, HEIGHT - BOTTOM, TOP);
        axes(out, &Scale::new(0.0, 0.0, LEFT, WIDTH - RIGHT), &y, "", "count");

        let slot = x.map(1.0) - x.map(0.0);
        for (index, (label, value)) in bars.iter().enumerate() {
            let left = x.map(index as f64) + slot * 0.15;
            let top = y.map(*value);
            let _ = write!(
                out,
                "<rect x=\"{:.1}\" y=\"{:.1}\" width=\"{:.1}\" height=\"{:.1}\" fill=\"{}\">\
                 <title>{}: {}</title></rect>\
                 <text x=\"{:.1}\" y=\"{}\" text-anchor=\"middle\" class=\"tick\">{}</text>",
                left,
                top,
                slot * 0.7,
                (HEIGHT - BOTTOM) - top,
                color(index),
                escape(label),
                value,
                left + slot * 0.35,
                HEIGHT - BOTTOM + 16.0,
                escape(label)
            );
        }
    }

    fn xy(out: &mut String, x_label: &str, y_label: &str, series: &[Series], lines: bool) {
        let points = || series.iter().flat_map(|s| s.points.iter());
        let (x_lo, x_hi) = extent(points().map(|p| p.0));
        let (y_lo, y_hi) = extent(points().map(|p| p.1));
        if !x_lo.is_finite() {
            out.push_str("<text x=\"320\" y=\"180\" text-anchor=\"middle\">no data</text>");
            return;
        }
        let y_lo = if lines { 0.0 } else { y_lo };
        let x = Scale::new(x_lo, x_hi, LEFT, WIDTH - RIGHT);
        let y = Scale::new(y_lo, y_hi, HEIGHT - BOTTOM, TOP);
        axes(out, &x, &y, x_label, y_label);

        for (index, s) in series.iter().enumerate() {
            if lines {
                let path: Vec<String> = s
                    .points
                    .iter()
                    .map(|(px, py)| format!("{:.1},{:.1}", x.map(*px), y.map(*py)))
                    .collect();
                let _ = write!(
                    out,
                    "<polyline fill=\"none\" stroke=\"{}\" stroke-width=\"2\" points=\"{}\"/>",
                    color(index),
                    path.join(" ")
                );
            } else {
                for (px, py) in &s.points {
                    let _ = write!(
                        out,
                        "<circle cx=\"{:.1}\" cy=\"{:.1}\" r=\"3\" fill=\"{}\" fill-opacity=\"0.7\"/>",
                        x.map(*px),
                        y.map(*py),
                        color(index)
                    );
                }
            }
        }
        legend(out, series.iter().map(|s| s.name.clone()));
    }

    fn boxes(out: &mut String, y_label: &str, groups: &[BoxGroup]) {
        let (lo, hi) = extent(groups.iter().flat_map(|g| [g.stats.min, g.stats.max]));
        if !lo.is_finite() {
            out.push_str("<text x=\"320\" y=\"180\" text-anchor=\"middle\">no data</text>");
            return;
        }
        let x = Scale::new(0.0, groups.len() as f64, LEFT, WIDTH - RIGHT);
        let y = Scale::new(lo, hi, HEIGHT - BOTTOM, TOP);
        axes(out, &Scale::new(0.0, 0.0, LEFT, WIDTH - RIGHT), &y, "", y_label);

        let slot = x.map(1.0) - x.map(0.0);
        for (index, group) in groups.iter().enumerate() {
            let center = x.map(index as f64 + 0.5);
            let half = slot * 0.3;
            let s = &group.stats;
            let _ = write!(
                out,
                "<g><title>{label}: median {median}</title>\
                 <line x1=\"{c:.1}\" y1=\"{min:.1}\" x2=\"{c:.1}\" y2=\"{max:.1}\" stroke=\"#333\"/>\
                 <rect x=\"{bx:.1}\" y=\"{q3:.1}\" width=\"{bw:.1}\" height=\"{bh:.1}\" \
                 fill=\"{fill}\" fill-opacity=\"0.6\" stroke=\"#333\"/>\
                 <line x1=\"{bx:.1}\" y1=\"{med:.1}\" x2=\"{bx2:.1}\" y2=\"{med:.1}\" stroke=\"#000\" stroke-width=\"2\"/>\
                 <text x=\"{c:.1}\" y=\"{ly}\" text-anchor=\"middle\" class=\"tick\">{label}</text></g>",
                label = escape(&group.label),
                median = s.median,
                c = center,
                min = y.map(s.min),
                max = y.map(s.max),
                bx = center - half,
                bx2 = center + half,
                q3 = y.map(s.q3),
                bw = half * 2.0,
                bh = y.map(s.q1) - y.map(s.q3),
                med = y.map(s.median),
                fill = color(index),
                ly = HEIGHT - BOTTOM + 16.0
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use super::*;

    fn form() -> FormSpec {
        FormSpec {
            fields: vec![
                FormField::Choice {
                    name: "island".into(),
                    label: "Select island".into(),
                    options: vec!["Biscoe".into(), "Dream".into()],
                },
                FormField::Number {
                    name: "body_mass_g".into(),
                    label: "Select body_mass_g".into(),
                    min: 2700.0,
                    max: 6300.0,
                    step: 200.0,
                    default: 2700.0,
                },
            ],
        }
    }

    #[test]
    fn test_form_uses_submitted_values() {
        let mut page = HtmlPage::new("Penguins", FormValues::new().with("island", "Dream"));
        let values = page.render_form(&form());

        assert_eq!(values.get("island"), Some("Dream"));
        assert_eq!(values.get("body_mass_g"), Some("2700"));
        let html = page.finish();
        assert!(html.contains("<option selected>Dream</option>"));
        assert!(html.contains("step=\"200\""));
    }

    #[test]
    fn test_rich_html_is_verbatim() {
        let mut page = HtmlPage::new("t", FormValues::new());
        page.render_rich_html("<b>raw</b>", 420);
        page.render_text("<b>escaped</b>");
        let html = page.finish();
        assert!(html.contains("min-height:420px\"><b>raw</b>"));
        assert!(html.contains("&lt;b&gt;escaped"));
    }

    #[test]
    fn test_probability_table() {
        let mut probabilities = IndexMap::new();
        probabilities.insert("Adelie".to_string(), 0.1);
        probabilities.insert("Gentoo".to_string(), 0.9);
        let prediction = Prediction {
            class_index: 1,
            class_label: "Gentoo".into(),
            probabilities,
        };
        let table = TableView::probabilities(&prediction, "species");
        assert_eq!(table.headers, vec!["species", "Probability"]);
        assert_eq!(table.rows[1], vec!["Gentoo", "0.900"]);

        let table = TableView::probabilities(&prediction, "genus");
        assert_eq!(table.headers[0], "genus");
    }

    #[test]
    fn test_charts_render_svg() {
        let charts = [
            ChartSpec::Bar {
                title: "Counts".into(),
                bars: vec![("Adelie".into(), 152.0), ("Gentoo".into(), 124.0)],
            },
            ChartSpec::Scatter {
                title: "Culmen".into(),
                x_label: "length".into(),
                y_label: "depth".into(),
                series: vec![Series {
                    name: "Adelie".into(),
                    points: vec![(39.1, 18.7), (40.3, 18.0)],
                }],
            },
            ChartSpec::Lines {
                title: "Empty".into(),
                x_label: "x".into(),
                series: vec![],
            },
        ];
        let mut page = HtmlPage::new("t", FormValues::new());
        for chart in &charts {
            page.render_chart(chart);
        }
        let html = page.finish();
        assert_eq!(html.matches("<svg").count(), 3);
        assert_eq!(html.matches("<circle").count(), 2);
        assert!(html.contains("no data"));
    }
}
