//! LaTeX `tabular` rendering of a balance report
//!
//! The table is assembled as an ordered list of lines. Data lines are rows
//! of cells, each spanning one or more columns; a row whose spans do not add
//! up to the table width is rejected when pushed. Text is produced only by
//! [`LatexTable::render`].

use crate::config::BalanceConfig;
use crate::error::{BalanceError, Result};
use crate::label::LabelFormatter;
use crate::report::{BalanceReport, GroupCell};
use crate::significance::Thresholds;
use crate::summary::Moments;

const GAP: &str = "\\\\[-1.8ex]";

/// One table cell
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub text: String,
    pub span: usize,
}

impl Cell {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            span: 1,
        }
    }

    pub fn empty() -> Self {
        Self::new("")
    }

    /// `\multicolumn{span}{align}{text}`
    pub fn multicolumn(span: usize, align: char, text: &str) -> Self {
        Self {
            text: format!("\\multicolumn{{{}}}{{{}}}{{{}}}", span, align, text),
            span,
        }
    }
}

/// A line of the tabular body
#[derive(Debug, Clone, PartialEq)]
pub enum Line {
    /// Cells joined by `&` and terminated by `\\`
    Row(Vec<Cell>),
    /// Verbatim markup such as rules and spacing
    Markup(String),
}

/// Ordered tabular content with a fixed column count
#[derive(Debug, Clone, PartialEq)]
pub struct LatexTable {
    columns: usize,
    lines: Vec<Line>,
}

impl LatexTable {
    pub fn new(columns: usize) -> Self {
        Self {
            columns,
            lines: Vec::new(),
        }
    }

    pub fn column_count(&self) -> usize {
        self.columns
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    /// Append a row; its spans must cover exactly the table width
    pub fn push_row(&mut self, cells: Vec<Cell>) -> Result<()> {
        let actual: usize = cells.iter().map(|c| c.span).sum();
        if actual != self.columns {
            return Err(BalanceError::ColumnMismatch {
                expected: self.columns,
                actual,
            });
        }
        self.lines.push(Line::Row(cells));
        Ok(())
    }

    pub fn push_markup(&mut self, markup: impl Into<String>) {
        self.lines.push(Line::Markup(markup.into()));
    }

    /// Column spec: one left-aligned label column, the rest centered
    fn column_spec(&self) -> String {
        format!(
            "@{{\\extracolsep{{5pt}}}}l{}",
            "c".repeat(self.columns.saturating_sub(1))
        )
    }

    /// Join everything into the final `tabular` environment
    pub fn render(&self) -> String {
        let mut output = String::new();
        output.push_str(&format!("\\begin{{tabular}}{{{}}}\n", self.column_spec()));

        for line in &self.lines {
            match line {
                Line::Row(cells) => {
                    let texts: Vec<&str> = cells.iter().map(|c| c.text.as_str()).collect();
                    output.push_str(&texts.join(" & "));
                    output.push_str(" \\\\\n");
                }
                Line::Markup(markup) => {
                    output.push_str(markup);
                    output.push('\n');
                }
            }
        }

        output.push_str("\\end{tabular}\n");
        output
    }
}

/// Escape LaTeX special characters in free text
pub fn escape_latex(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => escaped.push_str("\\textbackslash{}"),
            '&' | '%' | '$' | '#' | '_' | '{' | '}' => {
                escaped.push('\\');
                escaped.push(c);
            }
            '~' => escaped.push_str("\\textasciitilde{}"),
            '^' => escaped.push_str("\\textasciicircum{}"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Row label for a covariate: underscores read as spaces
pub fn covariate_label(name: &str) -> String {
    escape_latex(&name.replace('_', " "))
}

/// Threshold as shown in the note: two decimals unless more are needed
fn format_threshold(threshold: f64) -> String {
    let short = format!("{:.2}", threshold);
    match short.parse::<f64>() {
        Ok(parsed) if parsed == threshold => short,
        _ => format!("{}", threshold),
    }
}

fn format_mean(cell: &GroupCell, decimals: usize) -> String {
    if cell.tier.is_significant() {
        format!("${:.*}^{{{}}}$", decimals, cell.mean, cell.tier.stars())
    } else {
        format!("{:.*}", decimals, cell.mean)
    }
}

fn format_sd(sd: f64, decimals: usize) -> String {
    format!("({:.*})", decimals, sd)
}

fn note_text(thresholds: &Thresholds) -> String {
    let [loose, middle, tight] = thresholds.values();
    format!(
        "\\textsuperscript{{*}}p$<${}; \\textsuperscript{{**}}p$<${}; \\textsuperscript{{***}}p$<${}",
        format_threshold(loose),
        format_threshold(middle),
        format_threshold(tight)
    )
}

/// Lay out a report as a balance table
///
/// With `N` groups the table has `N + 2` columns: covariate label, all
/// data, then one per group.
pub fn layout(
    report: &BalanceReport,
    config: &BalanceConfig,
    labels: &dyn LabelFormatter,
) -> Result<LatexTable> {
    let columns = report.groups.len() + 2;
    let decimals = config.decimals;
    let mut table = LatexTable::new(columns);

    table.push_markup(format!("{}\\hline", GAP));
    table.push_markup(format!("\\hline {}", GAP));

    table.push_row(vec![
        Cell::empty(),
        Cell::multicolumn(columns - 1, 'c', "\\textit{Data Groups:}"),
    ])?;
    table.push_markup(format!("\\cline{{2-{}}}", columns));

    let mut header = vec![
        Cell::new("Variables"),
        Cell::multicolumn(1, 'c', "AllData"),
    ];
    header.extend(
        report
            .groups
            .iter()
            .map(|g| Cell::multicolumn(1, 'c', &escape_latex(&labels.format(&g.key)))),
    );
    table.push_row(header)?;
    table.push_markup(format!("\\hline {}", GAP));

    for row in &report.rows {
        let Moments { mean, sd, .. } = row.overall;

        let mut means = vec![
            Cell::new(covariate_label(&row.name)),
            Cell::new(format!("{:.*}", decimals, mean)),
        ];
        means.extend(row.cells.iter().map(|c| Cell::new(format_mean(c, decimals))));
        table.push_row(means)?;

        let mut sds = vec![Cell::empty(), Cell::new(format_sd(sd, decimals))];
        sds.extend(row.cells.iter().map(|c| Cell::new(format_sd(c.sd, decimals))));
        table.push_row(sds)?;

        if config.separator_rows {
            table.push_row(vec![Cell::empty(); columns])?;
        }
    }
    table.push_markup(format!("\\hline {}", GAP));

    let mut observations = vec![
        Cell::new("Observations"),
        Cell::new(report.observations.to_string()),
    ];
    observations.extend(
        report
            .groups
            .iter()
            .map(|g| Cell::new(g.observations.to_string())),
    );
    table.push_row(observations)?;

    table.push_markup("\\hline");
    table.push_markup(format!("\\hline {}", GAP));

    let legend_span = 4.min(columns - 1);
    table.push_row(vec![
        Cell::multicolumn(columns - legend_span, 'r', "\\textit{Note:}"),
        Cell::multicolumn(legend_span, 'r', &note_text(&report.thresholds)),
    ])?;

    Ok(table)
}
