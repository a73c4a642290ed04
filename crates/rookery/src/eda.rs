//! Dataset overview: class balance and per-class feature distributions.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::OverviewConfig;
use crate::error::DataLoadError;
use crate::input::{DataTable, parse_number};
use crate::profile::{DatasetProfile, NumericStatistics};
use crate::render::{BoxGroup, ChartSpec, PresentationSink, Series, TableView};

/// Points on each density curve.
const KDE_GRID: usize = 100;
/// Bandwidths the density grid extends past the data.
const KDE_CUT: f64 = 3.0;

/// Summary of the raw dataset for the overview page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetOverview {
    pub label_column: String,
    /// Rows per class, in class order.
    pub class_counts: IndexMap<String, usize>,
    pub density_column: String,
    pub density: Vec<Series>,
    pub scatter_axes: (String, String),
    pub scatter: Vec<Series>,
    /// Per-class box statistics of each scatter axis, drawn beside the scatter.
    pub scatter_margins: (Vec<BoxGroup>, Vec<BoxGroup>),
    pub box_column: String,
    pub boxes: Vec<BoxGroup>,
    pub preview: TableView,
    pub links: IndexMap<String, String>,
}

impl DatasetOverview {
    pub fn build(
        table: &DataTable,
        profile: &DatasetProfile,
        config: &OverviewConfig,
    ) -> Result<Self, DataLoadError> {
        let column = |name: &str| {
            table
                .column_index(name)
                .ok_or_else(|| DataLoadError::MissingColumn(name.to_string()))
        };
        let label = column(profile.label_column.as_str())?;
        let density_col = column(config.density_column.as_str())?;
        let x_col = column(config.scatter_x.as_str())?;
        let y_col = column(config.scatter_y.as_str())?;
        let box_col = column(config.box_column.as_str())?;
        let group_col = column(config.box_group.as_str())?;

        let labels: Vec<&str> = table.column_values(label).collect();
        let rows_of = |class: &str| -> Vec<usize> {
            labels
                .iter()
                .enumerate()
                .filter(|(_, l)| **l == class)
                .map(|(i, _)| i)
                .collect()
        };
        let number = |row: usize, col: usize| table.get(row, col).and_then(parse_number);

        let mut class_counts = IndexMap::new();
        let mut density = Vec::new();
        let mut scatter = Vec::new();
        let mut margins = (Vec::new(), Vec::new());
        let mut boxes = Vec::new();

        let mut groups: Vec<String> = table
            .column_values(group_col)
            .filter(|v| !DataTable::is_null_value(v))
            .map(|v| v.to_string())
            .collect();
        groups.sort();
        groups.dedup();

        for class in &profile.class_labels {
            let rows = rows_of(class.as_str());
            class_counts.insert(class.clone(), rows.len());

            let values: Vec<f64> = rows.iter().filter_map(|&r| number(r, density_col)).collect();
            if let Some(points) = gaussian_kde(&values, KDE_GRID) {
                density.push(Series {
                    name: class.clone(),
                    points,
                });
            }

            scatter.push(Series {
                name: class.clone(),
                points: rows
                    .iter()
                    .filter_map(|&r| Some((number(r, x_col)?, number(r, y_col)?)))
                    .collect(),
            });

            let margin = |col: usize| {
                NumericStatistics::from_values(rows.iter().filter_map(|&r| number(r, col))).map(
                    |stats| BoxGroup {
                        label: class.clone(),
                        stats,
                    },
                )
            };
            margins.0.extend(margin(x_col));
            margins.1.extend(margin(y_col));

            for group in &groups {
                let values = rows
                    .iter()
                    .filter(|&&r| table.get(r, group_col) == Some(group.as_str()))
                    .filter_map(|&r| number(r, box_col));
                if let Some(stats) = NumericStatistics::from_values(values) {
                    boxes.push(BoxGroup {
                        label: format!("{} / {}", class, group),
                        stats,
                    });
                }
            }
        }

        let preview = TableView {
            headers: table.headers.clone(),
            rows: table.rows.iter().take(config.preview_rows).cloned().collect(),
        };

        tracing::debug!(
            classes = class_counts.len(),
            box_groups = boxes.len(),
            "built dataset overview"
        );

        Ok(Self {
            label_column: profile.label_column.clone(),
            class_counts,
            density_column: config.density_column.clone(),
            density,
            scatter_axes: (config.scatter_x.clone(), config.scatter_y.clone()),
            scatter,
            scatter_margins: margins,
            box_column: config.box_column.clone(),
            boxes,
            preview,
            links: config
                .links
                .iter()
                .filter(|(class, _)| profile.class_labels.contains(*class))
                .map(|(class, url)| (class.clone(), url.clone()))
                .collect(),
        })
    }

    /// Charts in page order.
    pub fn charts(&self) -> Vec<ChartSpec> {
        vec![
            ChartSpec::Bar {
                title: format!("Rows per {}", self.label_column),
                bars: self
                    .class_counts
                    .iter()
                    .map(|(class, n)| (class.clone(), *n as f64))
                    .collect(),
            },
            ChartSpec::Lines {
                title: format!("{} density by {}", self.density_column, self.label_column),
                x_label: self.density_column.clone(),
                series: self.density.clone(),
            },
            ChartSpec::Scatter {
                title: format!("{} vs {}", self.scatter_axes.0, self.scatter_axes.1),
                x_label: self.scatter_axes.0.clone(),
                y_label: self.scatter_axes.1.clone(),
                series: self.scatter.clone(),
            },
            ChartSpec::Boxes {
                title: format!("{} by {}", self.scatter_axes.0, self.label_column),
                y_label: self.scatter_axes.0.clone(),
                groups: self.scatter_margins.0.clone(),
            },
            ChartSpec::Boxes {
                title: format!("{} by {}", self.scatter_axes.1, self.label_column),
                y_label: self.scatter_axes.1.clone(),
                groups: self.scatter_margins.1.clone(),
            },
            ChartSpec::Boxes {
                title: format!("{} by {}", self.box_column, self.label_column),
                y_label: self.box_column.clone(),
                groups: self.boxes.clone(),
            },
        ]
    }

    /// Draw the overview page.
    pub fn render(&self, sink: &mut dyn PresentationSink) {
        if !self.links.is_empty() {
            sink.render_heading("Learn more");
            let table = TableView {
                headers: vec!["Class".to_string(), "Reference".to_string()],
                rows: self
                    .links
                    .iter()
                    .map(|(class, url)| vec![class.clone(), url.clone()])
                    .collect(),
            };
            sink.render_table(&table);
        }

        sink.render_heading("The dataset");
        sink.render_table(&self.preview);

        for chart in self.charts() {
            sink.render_chart(&chart);
        }
    }
}

/// Gaussian kernel density estimate on an even grid.
///
/// Bandwidth follows Scott's rule: sample standard deviation times `n^(-1/5)`.
/// Returns `None` for fewer than two values or zero spread.
pub fn gaussian_kde(values: &[f64], grid: usize) -> Option<Vec<(f64, f64)>> {
    let stats = NumericStatistics::from_values(values.iter().copied())?;
    let n = stats.count as f64;
    if stats.count < 2 || stats.std <= 0.0 || grid < 2 {
        return None;
    }
    let bandwidth = stats.std * n.powf(-0.2);
    let lo = stats.min - KDE_CUT * bandwidth;
    let hi = stats.max + KDE_CUT * bandwidth;
    let step = (hi - lo) / (grid - 1) as f64;
    let norm = 1.0 / (n * bandwidth * (2.0 * std::f64::consts::PI).sqrt());

    Some(
        (0..grid)
            .map(|i| {
                let x = lo + step * i as f64;
                let density = values
                    .iter()
                    .filter(|v| v.is_finite())
                    .map(|v| {
                        let z = (x - v) / bandwidth;
                        (-0.5 * z * z).exp()
                    })
                    .sum::<f64>()
                    * norm;
                (x, density)
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatasetConfig;
    use crate::input::Parser;

    const PENGUINS: &str = "\
species,island,culmen_length_mm,culmen_depth_mm,flipper_length_mm,body_mass_g,gender
Adelie,Torgersen,39.1,18.7,181,3750,male
Adelie,Torgersen,39.5,17.4,186,3800,female
Adelie,Dream,36.7,19.3,193,3450,female
Adelie,Biscoe,38.2,18.1,185,3950,male
Chinstrap,Dream,46.5,17.9,192,3500,female
Chinstrap,Dream,50.0,19.5,196,3900,male
Gentoo,Biscoe,46.1,13.2,211,4500,female
Gentoo,Biscoe,50.0,16.3,230,5700,male
Gentoo,Biscoe,48.7,14.1,210,4450,female
Gentoo,Biscoe,NA,NA,NA,NA,NA
";

    fn overview() -> DatasetOverview {
        let table = Parser::new().parse_bytes(PENGUINS.as_bytes()).unwrap();
        let profile = DatasetProfile::build(&table, &DatasetConfig::default()).unwrap();
        DatasetOverview::build(&table, &profile, &OverviewConfig::default()).unwrap()
    }

    #[test]
    fn test_class_counts_in_class_order() {
        let overview = overview();
        let counts: Vec<(&str, usize)> = overview
            .class_counts
            .iter()
            .map(|(k, v)| (k.as_str(), *v))
            .collect();
        assert_eq!(counts, vec![("Adelie", 4), ("Chinstrap", 2), ("Gentoo", 4)]);
    }

    #[test]
    fn test_scatter_skips_missing_values() {
        let overview = overview();
        assert_eq!(overview.scatter[2].name, "Gentoo");
        assert_eq!(overview.scatter[2].points.len(), 3);
    }

    #[test]
    fn test_box_groups_by_class_and_gender() {
        let overview = overview();
        let labels: Vec<&str> = overview.boxes.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "Adelie / female",
                "Adelie / male",
                "Chinstrap / female",
                "Chinstrap / male",
                "Gentoo / female",
                "Gentoo / male"
            ]
        );
        assert_eq!(overview.boxes[4].stats.median, 4475.0);
    }

    #[test]
    fn test_scatter_margins_per_class() {
        let overview = overview();
        let (x, y) = &overview.scatter_margins;
        let labels: Vec<&str> = x.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["Adelie", "Chinstrap", "Gentoo"]);
        assert_eq!(y.len(), 3);

        // Gentoo culmen lengths 46.1, 50.0, 48.7; the NA row is skipped
        assert_eq!(x[2].stats.count, 3);
        assert_eq!(x[2].stats.median, 48.7);
        assert_eq!(y[1].stats.min, 17.9);
        assert_eq!(y[1].stats.max, 19.5);

        let titles: Vec<String> = overview
            .charts()
            .iter()
            .map(|c| c.title().to_string())
            .collect();
        assert_eq!(titles[3], "culmen_length_mm by species");
        assert_eq!(titles[4], "culmen_depth_mm by species");
    }

    #[test]
    fn test_kde_integrates_to_one() {
        let values = [181.0, 186.0, 193.0, 185.0, 190.0];
        let points = gaussian_kde(&values, 400).unwrap();
        let step = points[1].0 - points[0].0;
        let area: f64 = points.iter().map(|(_, d)| d * step).sum();
        assert!((area - 1.0).abs() < 0.01, "area {}", area);

        assert!(gaussian_kde(&[1.0], 10).is_none());
        assert!(gaussian_kde(&[2.0, 2.0], 10).is_none());
    }

    #[test]
    fn test_links_and_preview() {
        let overview = overview();
        assert_eq!(overview.links.len(), 3);
        assert_eq!(overview.preview.rows.len(), 10);
        assert_eq!(overview.charts().len(), 6);
    }
}
