//! Output rendering and formatting

use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, ContentArrangement, Table};
use console::{Style, Term};
use payseq_sequencer::sort_for_display;
use payseq_types::{ColorChoice, OutputFormat, Payload, ResultCode, RunReport};
use serde::Serialize;
use std::io;

/// What a command hands to the renderer
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CommandOutput {
    /// Payloads in operation order
    Order { payloads: Vec<Payload> },
    /// Payloads in operation order with simulated results
    Simulation { payloads: Vec<Payload> },
    /// Finished run
    Run {
        report: RunReport,
        payloads: Vec<Payload>,
    },
}

impl CommandOutput {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Output renderer for CLI results
#[derive(Clone)]
pub struct OutputRenderer {
    format: OutputFormat,
    /// Color configuration
    color_choice: ColorChoice,
    /// Terminal instance
    term: Term,
}

impl OutputRenderer {
    pub fn new(format: OutputFormat, color_choice: ColorChoice) -> Self {
        Self {
            format,
            color_choice,
            term: Term::stdout(),
        }
    }

    /// Render command output
    pub fn render_result(&self, output: &CommandOutput) -> io::Result<()> {
        match self.format {
            OutputFormat::Json => {
                let json = output.to_json().map_err(io::Error::other)?;
                println!("{json}");
                Ok(())
            }
            OutputFormat::Plain => {
                for line in plain_lines(output) {
                    self.term.write_line(&line)?;
                }
                Ok(())
            }
            OutputFormat::Tty => match output {
                CommandOutput::Order { payloads } => self.render_order(payloads),
                CommandOutput::Simulation { payloads } => self.render_results(payloads, None),
                CommandOutput::Run { report, payloads } => {
                    self.render_results(payloads, Some(report))
                }
            },
        }
    }

    fn render_order(&self, payloads: &[Payload]) -> io::Result<()> {
        let mut table = self.table(&["#", "Payload", "Product", "Action", "Media", "Requires"]);
        for (position, payload) in payloads.iter().enumerate() {
            table.add_row(vec![
                Cell::new(position + 1),
                Cell::new(self.style_payload_name(payload.id.as_str())),
                Cell::new(&payload.product_name),
                Cell::new(payload.action),
                Cell::new(media_label(payload)),
                Cell::new(requires_label(payload)),
            ]);
        }
        self.term.write_line(&table.to_string())
    }

    fn render_results(&self, payloads: &[Payload], report: Option<&RunReport>) -> io::Result<()> {
        let mut table = self.table(&["Payload", "Action", "Result", "Code"]);
        for payload in result_rows(payloads) {
            let (label, code) = result_label(payload);
            table.add_row(vec![
                Cell::new(self.style_payload_name(payload.id.as_str())),
                Cell::new(payload.action),
                self.result_cell(label),
                Cell::new(code_label(code)),
            ]);
        }
        self.term.write_line(&table.to_string())?;

        if let Some(report) = report {
            let style = if report.is_success() {
                Style::new().green()
            } else {
                Style::new().yellow()
            };
            self.term
                .write_line(&self.styled(&summary_line(report), &style))?;
        }
        Ok(())
    }

    fn table(&self, headers: &[&str]) -> Table {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(
            headers
                .iter()
                .map(|header| Cell::new(header).add_attribute(Attribute::Bold)),
        );
        if !self.supports_color() {
            table.force_no_tty();
        }
        table
    }

    fn result_cell(&self, label: &str) -> Cell {
        let cell = Cell::new(label);
        if !self.supports_color() {
            return cell;
        }
        match label {
            "ok" => cell.fg(Color::Green),
            "failed" => cell.fg(Color::Red),
            "canceled" => cell.fg(Color::Yellow),
            _ => cell.fg(Color::DarkGrey),
        }
    }

    fn style_payload_name(&self, name: &str) -> String {
        self.styled(name, &Style::new().cyan().bold())
    }

    fn styled(&self, text: &str, style: &Style) -> String {
        if self.supports_color() {
            style.apply_to(text).to_string()
        } else {
            text.to_string()
        }
    }

    fn supports_color(&self) -> bool {
        match self.color_choice {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => self.term.features().colors_supported(),
        }
    }
}

/// Tab-separated lines for `plain` output, one per payload
fn plain_lines(output: &CommandOutput) -> Vec<String> {
    match output {
        CommandOutput::Order { payloads } => payloads
            .iter()
            .enumerate()
            .map(|(position, payload)| {
                format!(
                    "{}\t{}\t{}\t{}\t{}\t{}",
                    position + 1,
                    payload.id,
                    payload.product_name,
                    payload.action,
                    media_label(payload),
                    requires_label(payload)
                )
            })
            .collect(),
        CommandOutput::Simulation { payloads } => plain_result_lines(payloads),
        CommandOutput::Run { report, payloads } => {
            let mut lines = plain_result_lines(payloads);
            lines.push(summary_line(report));
            lines
        }
    }
}

fn plain_result_lines(payloads: &[Payload]) -> Vec<String> {
    result_rows(payloads)
        .into_iter()
        .map(|payload| {
            let (label, code) = result_label(payload);
            format!(
                "{}\t{}\t{label}\t{}",
                payload.id,
                payload.action,
                code_label(code)
            )
        })
        .collect()
}

fn media_label(payload: &Payload) -> String {
    payload
        .media
        .as_ref()
        .map_or_else(|| "-".to_string(), |media| media.media_name.clone())
}

fn requires_label(payload: &Payload) -> String {
    if payload.required.is_empty() {
        return "-".to_string();
    }
    payload
        .required
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn result_label(payload: &Payload) -> (&'static str, Option<ResultCode>) {
    match payload.operation_result() {
        None => ("not run", None),
        Some(result) if result.is_success() => ("ok", Some(result.code())),
        Some(result) if result.code().is_user_cancel() => ("canceled", Some(result.code())),
        Some(result) => ("failed", Some(result.code())),
    }
}

fn code_label(code: Option<ResultCode>) -> String {
    code.map_or_else(|| "-".to_string(), |c| c.to_string())
}

fn summary_line(report: &RunReport) -> String {
    format!(
        "{} succeeded, {} failed, {} canceled, {} not run in {:.1}s",
        report.succeeded.len(),
        report.failed.len(),
        report.canceled.len(),
        report.not_run.len(),
        report.duration_ms as f64 / 1000.0,
    )
}

/// Result rows: session driver first, then by product name
fn result_rows(payloads: &[Payload]) -> Vec<&Payload> {
    let mut rows: Vec<&Payload> = payloads.iter().collect();
    sort_for_display(&mut rows);
    rows
}
