//! Overview command - class balance and feature distributions.

use std::fs;
use std::path::PathBuf;

use colored::Colorize;
use rookery::{HtmlPage, RookeryConfig, TableView};

use crate::cli::Inputs;

pub fn run(
    config: RookeryConfig,
    inputs: Inputs,
    json_output: bool,
    html: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let dashboard = super::load_dashboard(config, &inputs)?;
    let overview = dashboard
        .overview()
        .map_err(|e| format!("Overview unavailable: {}", e))?;

    if let Some(path) = html {
        let mut page = HtmlPage::new("Palmer penguins", Default::default());
        overview.render(&mut page);
        fs::write(&path, page.finish())?;
        println!("{} {}", "Wrote".green().bold(), path.display());
        return Ok(());
    }

    if json_output {
        println!("{}", serde_json::to_string_pretty(overview)?);
        return Ok(());
    }

    let total: usize = overview.class_counts.values().sum();
    println!(
        "{} {} rows",
        format!("Rows per {}:", overview.label_column).yellow().bold(),
        total
    );
    for (class, count) in &overview.class_counts {
        let width = if total == 0 { 0 } else { count * 40 / total };
        println!("  {:12} {:>5}  {}", class, count, "█".repeat(width).cyan());
    }
    println!();

    println!(
        "{}",
        format!("{} by {}:", overview.box_column, overview.label_column)
            .yellow()
            .bold()
    );
    let boxes = TableView {
        headers: ["Group", "n", "min", "q1", "median", "q3", "max"]
            .iter()
            .map(|h| h.to_string())
            .collect(),
        rows: overview
            .boxes
            .iter()
            .map(|group| {
                let s = &group.stats;
                vec![
                    group.label.clone(),
                    s.count.to_string(),
                    format!("{:.1}", s.min),
                    format!("{:.1}", s.q1),
                    format!("{:.1}", s.median),
                    format!("{:.1}", s.q3),
                    format!("{:.1}", s.max),
                ]
            })
            .collect(),
    };
    super::print_table(&boxes);

    if !overview.links.is_empty() {
        println!();
        println!("{}", "Learn more:".yellow().bold());
        for (class, url) in &overview.links {
            println!("  {:12} {}", class, url);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use rookery::{ChartSpec, FormSpec, FormValues, PresentationSink, TableView};

    /// Sink that only counts what it is asked to draw.
    #[derive(Default)]
    struct Counter {
        tables: usize,
        charts: usize,
    }

    impl PresentationSink for Counter {
        fn render_form(&mut self, _form: &FormSpec) -> FormValues {
            FormValues::new()
        }
        fn render_heading(&mut self, _text: &str) {}
        fn render_text(&mut self, _text: &str) {}
        fn render_table(&mut self, _table: &TableView) {
            self.tables += 1;
        }
        fn render_chart(&mut self, _chart: &ChartSpec) {
            self.charts += 1;
        }
        fn render_rich_html(&mut self, _fragment: &str, _height_hint: u32) {}
        fn render_error(&mut self, _message: &str) {}
    }

    #[test]
    fn test_overview_draws_all_charts() {
        let dashboard = crate::server::tests::dashboard();
        let mut sink = Counter::default();
        dashboard.overview().unwrap().render(&mut sink);
        assert_eq!(sink.charts, 6);
        assert_eq!(sink.tables, 2);
    }
}
