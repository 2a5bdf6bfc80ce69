use chrono::NaiveDate;
use clap::{ArgAction, Args, Parser, Subcommand};

use crate::utils::{parse_date, parse_quantity};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "prodcontrol",
    version,
    about = "production inventory tracker",
    long_about = "prodcontrol registers required vs. completed quantities per product, lists and searches them, and exports completed products as PDF.\n\nThe store endpoint and access key come from PUBLIC_SUPABASE_URL and PUBLIC_SUPABASE_ANON_KEY.\n\nExamples:\n  prodcontrol add --producto Tornillo --requerimiento 10 --hecho 4 --fecha 2024-05-01\n  prodcontrol list --search torn\n  prodcontrol edit 12 --hecho 10\n  prodcontrol export --dir ./pdf"
)]
pub struct CliArgs {
    #[arg(
        short = 'v',
        long = "verbose",
        action = ArgAction::Count,
        global = true,
        help_heading = "Output",
        help = "Increase log verbosity (-v, -vv, -vvv)."
    )]
    pub verbose: u8,

    #[arg(
        short = 'n',
        long = "no-color",
        global = true,
        help_heading = "Output",
        help = "Disable colored output."
    )]
    pub no_color: bool,

    #[arg(
        short = 'C',
        long = "config",
        value_name = "FILE",
        global = true,
        help_heading = "Input",
        help = "Path to config file (defaults to ~/.prodcontrol/config.yml)."
    )]
    pub config: Option<String>,

    #[arg(
        long = "table",
        value_name = "NAME",
        global = true,
        help_heading = "Store",
        help = "Table name (defaults to control)."
    )]
    pub table: Option<String>,

    #[arg(
        short = 'T',
        long = "timeout",
        value_name = "SECONDS",
        global = true,
        help_heading = "Store",
        help = "Per-request timeout in seconds (no timeout by default)."
    )]
    pub timeout: Option<u64>,

    #[arg(
        short = 'p',
        long = "proxy",
        value_name = "URL",
        global = true,
        help_heading = "Store",
        help = "HTTP proxy URL (e.g. http://127.0.0.1:8080)."
    )]
    pub proxy: Option<String>,

    #[arg(
        long = "font-dir",
        value_name = "DIR",
        global = true,
        help_heading = "Export",
        help = "Directory holding the PDF font family TTF files."
    )]
    pub font_dir: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Register a product entry.
    Add(AddArgs),
    /// List records with remainder, totals and completed count.
    List(ListArgs),
    /// Replace fields of an existing record.
    Edit(EditArgs),
    /// Delete a record after confirmation.
    Delete(DeleteArgs),
    /// Show the completed products summary.
    Completed,
    /// Export one completed record, or all completed records, as PDF.
    Export(ExportArgs),
    /// Write a commented default config file if none exists.
    InitConfig,
}

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    #[arg(long = "producto", visible_alias = "product", value_name = "NAME", help = "Product name.")]
    pub product: String,

    #[arg(
        long = "requerimiento",
        visible_alias = "required",
        value_name = "N",
        value_parser = parse_quantity,
        help = "Required quantity."
    )]
    pub required: Option<i64>,

    #[arg(
        long = "hecho",
        visible_alias = "done",
        value_name = "N",
        value_parser = parse_quantity,
        help = "Completed quantity."
    )]
    pub done: i64,

    #[arg(
        long = "fecha",
        visible_alias = "date",
        value_name = "YYYY-MM-DD",
        value_parser = parse_date,
        help = "Date of the entry."
    )]
    pub date: Option<NaiveDate>,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    #[arg(
        short = 's',
        long = "search",
        value_name = "TEXT",
        help = "Only show products containing TEXT (case-insensitive)."
    )]
    pub search: Option<String>,

    #[arg(
        short = 'o',
        long = "output",
        value_name = "FILE",
        help = "Write the list to a file instead of stdout."
    )]
    pub output: Option<String>,

    #[arg(
        short = 'f',
        long = "format",
        value_name = "FORMAT",
        help = "Output format (text, json, csv)."
    )]
    pub format: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct EditArgs {
    #[arg(value_name = "ID", help = "Record id.")]
    pub id: String,

    #[arg(long = "producto", visible_alias = "product", value_name = "NAME")]
    pub product: Option<String>,

    #[arg(
        long = "requerimiento",
        visible_alias = "required",
        value_name = "N",
        value_parser = parse_quantity
    )]
    pub required: Option<i64>,

    #[arg(
        long = "hecho",
        visible_alias = "done",
        value_name = "N",
        value_parser = parse_quantity
    )]
    pub done: Option<i64>,

    #[arg(
        long = "fecha",
        visible_alias = "date",
        value_name = "YYYY-MM-DD",
        value_parser = parse_date
    )]
    pub date: Option<NaiveDate>,
}

#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    #[arg(value_name = "ID", help = "Record id.")]
    pub id: String,

    #[arg(short = 'y', long = "yes", help = "Skip the confirmation prompt.")]
    pub yes: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ExportArgs {
    #[arg(
        value_name = "ID",
        help = "Export a single completed record; omit to export all completed records."
    )]
    pub id: Option<String>,

    #[arg(
        short = 'd',
        long = "dir",
        value_name = "DIR",
        help = "Directory to write the PDF into."
    )]
    pub dir: Option<String>,
}
