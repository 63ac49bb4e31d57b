//! Report formatting.
//!
//! Dependence reports and interval comparisons can be rendered as JSON (for
//! downstream tooling such as a plotting layer), as human-readable console
//! text, or as Markdown tables.
//!
//! # Examples
//!
//! ```rust
//! use fast_insights::calculations::DependenceReport;
//! use fast_insights::formatters::{FormatterConfig, HumanFormatter, ReportFormatter};
//!
//! let formatter = HumanFormatter::with_config(FormatterConfig::minimal());
//! let output = formatter.format_report(&DependenceReport::default()).unwrap();
//! assert!(output.contains("no segments"));
//! ```

use std::fmt::Write;

use serde_json::json;

use crate::calculations::{CentralValue, DependenceReport, DependenceRow, IntervalComparison};
use crate::error::{InsightError, Result};

/// Configuration options for formatting reports.
#[derive(Debug, Clone)]
pub struct FormatterConfig {
    /// Maximum number of rows to display (`None` for all)
    pub max_rows: Option<usize>,
    /// Decimal places for percentages
    pub precision: usize,
    /// Whether to use colorized output (for human formatter)
    pub use_colors: bool,
    /// Whether to show base breaks, ranges and categories
    pub include_base_details: bool,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            max_rows: None,
            precision: 2,
            use_colors: true,
            include_base_details: true,
        }
    }
}

impl FormatterConfig {
    /// Creates a minimal configuration: top rows only, no colors, no base details.
    pub fn minimal() -> Self {
        Self {
            max_rows: Some(10),
            precision: 1,
            use_colors: false,
            include_base_details: false,
        }
    }

    /// Creates a configuration suitable for CI logs.
    pub fn ci() -> Self {
        Self {
            max_rows: Some(50),
            precision: 2,
            use_colors: false,
            include_base_details: true,
        }
    }

    /// Sets the maximum number of rows to display.
    pub fn with_max_rows(mut self, max: Option<usize>) -> Self {
        self.max_rows = max;
        self
    }

    /// Sets the number of decimal places.
    pub fn with_precision(mut self, precision: usize) -> Self {
        self.precision = precision;
        self
    }

    /// Sets whether to use colorized output.
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    fn visible<'a, T>(&self, rows: &'a [T]) -> &'a [T] {
        match self.max_rows {
            Some(max) => &rows[..max.min(rows.len())],
            None => rows,
        }
    }
}

/// Renders analysis results.
pub trait ReportFormatter {
    /// Formats a dependence report.
    fn format_report(&self, report: &DependenceReport) -> Result<String>;

    /// Formats the comparisons produced for one selected segment.
    fn format_comparisons(&self, comparisons: &[IntervalComparison]) -> Result<String>;
}

fn fmt_error(err: std::fmt::Error) -> InsightError {
    InsightError::Serialization(format!("failed to render report: {err}"))
}

fn central(value: &Option<CentralValue>, precision: usize) -> String {
    match value {
        Some(CentralValue::Number(v)) => format!("{v:.precision$}"),
        Some(CentralValue::Category(c)) => c.clone(),
        None => "-".to_string(),
    }
}

fn base_details(row: &DependenceRow, precision: usize) -> Option<String> {
    if let Some([min, max]) = row.base_range {
        let breaks = row
            .base_breaks
            .as_ref()
            .map(|b| format!(", breaks {b:?}"))
            .unwrap_or_default();
        return Some(format!("range [{min:.precision$}, {max:.precision$}]{breaks}"));
    }
    row.base_cats
        .as_ref()
        .map(|cats| format!("categories {}", cats.join(", ")))
}

/// Formats results as JSON.
#[derive(Debug, Clone)]
pub struct JsonFormatter {
    config: FormatterConfig,
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter with default configuration.
    pub fn new() -> Self {
        Self::with_config(FormatterConfig::default())
    }

    /// Creates a new JSON formatter with the specified configuration.
    pub fn with_config(config: FormatterConfig) -> Self {
        Self {
            config,
            pretty: true,
        }
    }

    /// Sets whether to use pretty-printed JSON.
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    fn render(&self, value: &serde_json::Value) -> Result<String> {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };
        Ok(rendered)
    }
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportFormatter for JsonFormatter {
    fn format_report(&self, report: &DependenceReport) -> Result<String> {
        let rows = self.config.visible(&report.rows);
        let mut rows = serde_json::to_value(rows)?;
        if !self.config.include_base_details {
            if let Some(rows) = rows.as_array_mut() {
                for row in rows.iter_mut().filter_map(|r| r.as_object_mut()) {
                    row.remove("base_breaks");
                    row.remove("base_range");
                    row.remove("base_cats");
                }
            }
        }
        self.render(&json!({
            "target": report.target,
            "row_count": report.row_count,
            "total_segments": report.rows.len(),
            "rows": rows,
        }))
    }

    fn format_comparisons(&self, comparisons: &[IntervalComparison]) -> Result<String> {
        let visible = self.config.visible(comparisons);
        self.render(&serde_json::to_value(visible)?)
    }
}

/// Formats results as console text.
#[derive(Debug, Clone)]
pub struct HumanFormatter {
    config: FormatterConfig,
}

impl HumanFormatter {
    /// Creates a new human formatter with default configuration.
    pub fn new() -> Self {
        Self::with_config(FormatterConfig::default())
    }

    /// Creates a new human formatter with the specified configuration.
    pub fn with_config(config: FormatterConfig) -> Self {
        Self { config }
    }

    fn paint(&self, text: String, code: &str) -> String {
        if self.config.use_colors {
            format!("\x1b[{code}m{text}\x1b[0m")
        } else {
            text
        }
    }

    fn write_report(&self, out: &mut String, report: &DependenceReport) -> std::fmt::Result {
        let p = self.config.precision;
        writeln!(
            out,
            "Dependence on {} ({} rows, {} segments)",
            report.target,
            report.row_count,
            report.len()
        )?;
        if report.is_empty() {
            writeln!(out, "   no segments to report")?;
            return Ok(());
        }

        let visible = self.config.visible(&report.rows);
        for row in visible {
            let low = format!("{:.p$}%", row.low_perc);
            let low = if row.low_perc > 50.0 {
                self.paint(low, "31")
            } else {
                self.paint(low, "32")
            };
            writeln!(
                out,
                "   {}: size {} ({:.p$}% of rows), worse {low}, target delta {:+.p$}%",
                row.segment, row.total_sum, row.perc_of_total, row.target_delta_perc
            )?;
            if self.config.include_base_details {
                writeln!(out, "      base: {}", row.base_col)?;
                if let Some(details) = base_details(row, p) {
                    writeln!(out, "      {details}")?;
                }
            }
        }
        if report.len() > visible.len() {
            writeln!(out, "   ... and {} more segments", report.len() - visible.len())?;
        }
        Ok(())
    }

    fn write_comparisons(
        &self,
        out: &mut String,
        comparisons: &[IntervalComparison],
    ) -> std::fmt::Result {
        let p = self.config.precision;
        let Some(first) = comparisons.first() else {
            return writeln!(out, "No sibling segments to compare");
        };
        writeln!(
            out,
            "Substituting {} ({} {} -> base {})",
            first.old_col,
            first.metric,
            central(&first.old_value, p),
            central(&first.old_base_value, p)
        )?;
        for c in self.config.visible(comparisons) {
            let change = format!("{:+.p$}%", c.total_target_change_perc);
            let change = if c.total_target_change_perc < 0.0 {
                self.paint(change, "31")
            } else {
                self.paint(change, "32")
            };
            writeln!(
                out,
                "   by {}: total target {change} ({} {} -> base {})",
                c.new_col,
                c.metric,
                central(&c.new_value, p),
                central(&c.new_base_value, p)
            )?;
        }
        Ok(())
    }
}

impl Default for HumanFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportFormatter for HumanFormatter {
    fn format_report(&self, report: &DependenceReport) -> Result<String> {
        let mut out = String::new();
        self.write_report(&mut out, report).map_err(fmt_error)?;
        Ok(out)
    }

    fn format_comparisons(&self, comparisons: &[IntervalComparison]) -> Result<String> {
        let mut out = String::new();
        self.write_comparisons(&mut out, comparisons)
            .map_err(fmt_error)?;
        Ok(out)
    }
}

/// Formats results as Markdown tables.
#[derive(Debug, Clone)]
pub struct MarkdownFormatter {
    config: FormatterConfig,
    heading_level: u8,
}

impl MarkdownFormatter {
    /// Creates a new Markdown formatter with default configuration.
    pub fn new() -> Self {
        Self::with_config(FormatterConfig::default())
    }

    /// Creates a new Markdown formatter with the specified configuration.
    pub fn with_config(config: FormatterConfig) -> Self {
        Self {
            config,
            heading_level: 2,
        }
    }

    /// Sets the base heading level for the output.
    pub fn with_heading_level(mut self, level: u8) -> Self {
        self.heading_level = level.clamp(1, 6);
        self
    }

    fn write_report(&self, out: &mut String, report: &DependenceReport) -> std::fmt::Result {
        let p = self.config.precision;
        let h = "#".repeat(self.heading_level as usize);
        writeln!(out, "{h} Dependence on `{}`", report.target)?;
        writeln!(out)?;
        writeln!(
            out,
            "{} rows, {} segments.",
            report.row_count,
            report.len()
        )?;
        writeln!(out)?;
        writeln!(
            out,
            "| Segment | Size | % of rows | Worse % | Better % | Target delta % | Base |"
        )?;
        writeln!(out, "|---|---:|---:|---:|---:|---:|---|")?;
        for row in self.config.visible(&report.rows) {
            writeln!(
                out,
                "| `{}` | {} | {:.p$} | {:.p$} | {:.p$} | {:+.p$} | `{}` |",
                row.segment.replace('|', "\\|"),
                row.total_sum,
                row.perc_of_total,
                row.low_perc,
                row.high_perc,
                row.target_delta_perc,
                row.base_col.replace('|', "\\|")
            )?;
        }
        Ok(())
    }

    fn write_comparisons(
        &self,
        out: &mut String,
        comparisons: &[IntervalComparison],
    ) -> std::fmt::Result {
        let p = self.config.precision;
        let h = "#".repeat(self.heading_level as usize);
        match comparisons.first() {
            Some(first) => writeln!(out, "{h} Substituting `{}`", first.old_col)?,
            None => {
                writeln!(out, "{h} Substitution")?;
                writeln!(out)?;
                return writeln!(out, "No sibling segments to compare.");
            }
        }
        writeln!(out)?;
        writeln!(
            out,
            "| New segment | Metric | Old value | New value | New base value | Total target change % |"
        )?;
        writeln!(out, "|---|---|---:|---:|---:|---:|")?;
        for c in self.config.visible(comparisons) {
            writeln!(
                out,
                "| `{}` | {} | {} | {} | {} | {:+.p$} |",
                c.new_col,
                c.metric,
                central(&c.old_value, p),
                central(&c.new_value, p),
                central(&c.new_base_value, p),
                c.total_target_change_perc
            )?;
        }
        Ok(())
    }
}

impl Default for MarkdownFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportFormatter for MarkdownFormatter {
    fn format_report(&self, report: &DependenceReport) -> Result<String> {
        let mut out = String::new();
        self.write_report(&mut out, report).map_err(fmt_error)?;
        Ok(out)
    }

    fn format_comparisons(&self, comparisons: &[IntervalComparison]) -> Result<String> {
        let mut out = String::new();
        self.write_comparisons(&mut out, comparisons)
            .map_err(fmt_error)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculations::{calculate_dependence, compare_intervals, CentralMetric};
    use crate::model::ModelData;
    use crate::test_fixtures::{cars_batch, cars_bins, cars_categorical, cars_numeric};

    fn cars_report() -> (DependenceReport, Vec<IntervalComparison>) {
        let mut model = ModelData::builder(cars_batch(), "num_of_sales")
            .categorical(cars_categorical())
            .numeric(cars_numeric())
            .build()
            .unwrap();
        model.convert_to_binary(Some(cars_bins())).unwrap();
        (
            calculate_dependence(&model).unwrap(),
            compare_intervals(&model, "color_green").unwrap(),
        )
    }

    #[test]
    fn test_json_report() {
        let (report, _) = cars_report();
        let output = JsonFormatter::new().format_report(&report).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["target"], "is_num_of_sales_lt_quantile");
        assert_eq!(value["rows"].as_array().unwrap().len(), 9);

        let compact = JsonFormatter::with_config(FormatterConfig::minimal().with_max_rows(Some(3)))
            .with_pretty(false)
            .format_report(&report)
            .unwrap();
        assert!(!compact.contains('\n'));
        let value: serde_json::Value = serde_json::from_str(&compact).unwrap();
        assert_eq!(value["rows"].as_array().unwrap().len(), 3);
        assert_eq!(value["total_segments"], 9);
        assert!(value["rows"][0].get("base_cats").is_none());
    }

    #[test]
    fn test_json_comparisons() {
        let (_, comparisons) = cars_report();
        let output = JsonFormatter::new().format_comparisons(&comparisons).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value[0]["metric"], "mode");
        assert_eq!(value[0]["new_value"], "red");
    }

    #[test]
    fn test_human_report() {
        let (report, _) = cars_report();
        let formatter = HumanFormatter::with_config(FormatterConfig::ci().with_max_rows(Some(2)));
        let output = formatter.format_report(&report).unwrap();
        assert!(output.starts_with("Dependence on is_num_of_sales_lt_quantile (6 rows, 9 segments)"));
        assert!(output.contains("... and 7 more segments"));
        assert!(!output.contains("\x1b["));
    }

    #[test]
    fn test_human_comparisons() {
        let (_, comparisons) = cars_report();
        let output = HumanFormatter::with_config(FormatterConfig::default().with_colors(false))
            .format_comparisons(&comparisons)
            .unwrap();
        assert!(output.contains("Substituting color_green (mode green -> base red)"));
        assert!(output.contains("by color_red: total target -2.68%"));
        assert_eq!(comparisons[0].metric, CentralMetric::Mode);
    }

    #[test]
    fn test_markdown_report() {
        let (report, comparisons) = cars_report();
        let formatter = MarkdownFormatter::new().with_heading_level(3);
        let output = formatter.format_report(&report).unwrap();
        assert!(output.starts_with("### Dependence on `is_num_of_sales_lt_quantile`"));
        assert_eq!(output.lines().filter(|l| l.starts_with("| `")).count(), 9);

        let output = formatter.format_comparisons(&comparisons).unwrap();
        assert!(output.contains("| `color_red` | mode | green | red | red | -2.68 |"));
        assert!(formatter
            .format_comparisons(&[])
            .unwrap()
            .contains("No sibling segments"));
    }
}
