use colored::Colorize;
use serde::Serialize;

use crate::aggregate::{self, Totals};
use crate::model::Record;

/// UTF-8 BOM so spreadsheet tools pick the right encoding.
const CSV_BOM: &str = "\u{feff}";
const CSV_SEP: &str = ";";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Csv,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "text" | "txt" => Some(Self::Text),
            "json" => Some(Self::Json),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }
}

pub fn infer_format_from_path(path: &str) -> Option<OutputFormat> {
    let lower = path.trim().to_lowercase();
    if lower.ends_with(".json") {
        return Some(OutputFormat::Json);
    }
    if lower.ends_with(".csv") {
        return Some(OutputFormat::Csv);
    }
    if lower.ends_with(".txt") {
        return Some(OutputFormat::Text);
    }
    None
}

#[derive(Clone, Debug, Serialize)]
pub struct OutputRecord {
    pub id: String,
    pub producto: String,
    pub requerimiento: Option<i64>,
    pub hecho: Option<i64>,
    pub restan: i64,
    pub fecha: Option<String>,
    pub completado: bool,
}

/// What a list view shows: the visible rows plus totals over the full set.
#[derive(Clone, Debug, Serialize)]
pub struct ListReport {
    pub records: Vec<OutputRecord>,
    pub totals: Totals,
    pub completed: usize,
}

pub fn build_records(records: &[&Record]) -> Vec<OutputRecord> {
    records
        .iter()
        .map(|r| OutputRecord {
            id: r.id.to_string(),
            producto: r.product.clone(),
            requerimiento: r.required,
            hecho: r.done,
            restan: r.remainder(),
            fecha: r.date.map(|d| d.format("%Y-%m-%d").to_string()),
            completado: r.is_complete(),
        })
        .collect()
}

pub fn build_report(visible: &[&Record], all: &[Record]) -> ListReport {
    ListReport {
        records: build_records(visible),
        totals: aggregate::totals(all),
        completed: aggregate::completed_count(all),
    }
}

fn opt_qty(value: Option<i64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

pub fn render_text(report: &ListReport) -> Vec<u8> {
    let id_width = report
        .records
        .iter()
        .map(|r| r.id.chars().count())
        .max()
        .unwrap_or(2)
        .max(2);
    let name_width = report
        .records
        .iter()
        .map(|r| r.producto.chars().count())
        .max()
        .unwrap_or(8)
        .clamp(8, 40);

    let mut out = String::new();
    out.push_str(&format!(
        "{:<id_width$}  {:<name_width$}  {:>9}  {:>9}  {:>8}  {:<10}\n",
        "ID", "Producto", "Qty Total", "Qty Parc.", "Restan", "Fecha"
    ));
    for r in report.records.iter() {
        let restan = format!("{:>8}", r.restan);
        let restan = if r.completado {
            format!("{} {}", restan.green().bold(), "✔".green())
        } else {
            restan
        };
        out.push_str(&format!(
            "{:<id_width$}  {:<name_width$}  {:>9}  {:>9}  {}  {:<10}\n",
            r.id,
            r.producto,
            opt_qty(r.requerimiento),
            opt_qty(r.hecho),
            restan,
            r.fecha.as_deref().unwrap_or(""),
        ));
    }
    out.push('\n');
    out.push_str(&format!(
        ":: Total requerido : {}\n:: Total hecho     : {}\n:: Restan          : {}\n:: Completados     : {}\n",
        report.totals.required, report.totals.done, report.totals.remaining, report.completed
    ));
    out.into_bytes()
}

pub fn render_json(report: &ListReport) -> Result<Vec<u8>, serde_json::Error> {
    let mut out = serde_json::to_vec_pretty(report)?;
    out.push(b'\n');
    Ok(out)
}

fn escape_csv(value: &str) -> String {
    if value.contains(';') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

pub fn render_csv(report: &ListReport) -> Vec<u8> {
    let mut out = String::from(CSV_BOM);
    let headers = [
        "id",
        "producto",
        "requerimiento",
        "hecho",
        "restan",
        "fecha",
        "completado",
    ];
    out.push_str(&headers.join(CSV_SEP));
    out.push('\n');
    for r in report.records.iter() {
        let row = [
            escape_csv(&r.id),
            escape_csv(&r.producto),
            opt_qty(r.requerimiento),
            opt_qty(r.hecho),
            r.restan.to_string(),
            r.fecha.clone().unwrap_or_default(),
            if r.completado { "si" } else { "no" }.to_string(),
        ];
        out.push_str(&row.join(CSV_SEP));
        out.push('\n');
    }
    out.into_bytes()
}

pub fn render(format: OutputFormat, report: &ListReport) -> Result<Vec<u8>, serde_json::Error> {
    match format {
        OutputFormat::Text => Ok(render_text(report)),
        OutputFormat::Json => render_json(report),
        OutputFormat::Csv => Ok(render_csv(report)),
    }
}
