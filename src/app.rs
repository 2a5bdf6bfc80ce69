use std::collections::HashMap;
use std::future::Future;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;

use clap::{error::ErrorKind, CommandFactory, Parser};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tracing::debug;

use crate::cli::args::{AddArgs, CliArgs, Command, DeleteArgs, EditArgs, ExportArgs, ListArgs};
use crate::cli::validation;
use crate::config::{self, ConfigFile, StoreCredentials};
use crate::export::{ExportDocument, FontSource, PdfRenderer};
use crate::model::{Record, RecordFields, RecordPatch};
use crate::output::{self, OutputFormat};
use crate::store::supabase::SupabaseSettings;
use crate::store::SupabaseStore;
use crate::tracker::{DeleteOutcome, Tracker};

fn init_tracing(verbose: u8) {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let directive = std::env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| format!("prodcontrol={level}"));
    let _ = fmt()
        .with_env_filter(EnvFilter::new(directive))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn format_kv_line(label: &str, value: &str) {
    println!(":: {:<10}: {}", label, value);
}

fn render_custom_help(cmd: &clap::Command, usage_name: &str) -> String {
    let mut out = String::new();

    if let Some(version) = cmd.get_version() {
        out.push_str(cmd.get_name());
        out.push(' ');
        out.push_str(version);
        out.push('\n');
    }

    if let Some(about) = cmd.get_long_about().or_else(|| cmd.get_about()) {
        out.push_str(&about.to_string());
        out.push('\n');
    }

    out.push('\n');
    out.push_str("Usage: ");
    out.push_str(usage_name);
    if cmd.has_subcommands() {
        out.push_str(" [OPTIONS] <COMMAND>\n\n");
    } else {
        out.push_str(" [OPTIONS]\n\n");
    }

    let subcommands: Vec<&clap::Command> = cmd.get_subcommands().collect();
    if !subcommands.is_empty() {
        out.push_str("Commands:\n");
        for sub in subcommands {
            let about = sub.get_about().map(|a| a.to_string()).unwrap_or_default();
            out.push_str(&format!("  {:<12} {}\n", sub.get_name(), about));
        }
        out.push('\n');
    }

    let mut sections: Vec<(String, Vec<&clap::Arg>)> = Vec::new();
    let mut section_idx: HashMap<String, usize> = HashMap::new();

    for arg in cmd.get_arguments() {
        if arg.is_hide_set() {
            continue;
        }

        let heading = arg.get_help_heading().unwrap_or("Options").to_string();

        let idx = match section_idx.get(&heading).copied() {
            Some(i) => i,
            None => {
                sections.push((heading.clone(), Vec::new()));
                let i = sections.len() - 1;
                section_idx.insert(heading, i);
                i
            }
        };

        sections[idx].1.push(arg);
    }

    for (heading, args) in sections {
        out.push_str(&heading);
        out.push_str(":\n");

        for arg in args {
            let mut parts: Vec<String> = Vec::new();

            if let Some(short) = arg.get_short() {
                parts.push(format!("-{short}"));
            }

            if let Some(long) = arg.get_long() {
                parts.push(format!("--{long}"));
            }

            if let Some(aliases) = arg.get_visible_aliases() {
                for alias in aliases {
                    let rendered = format!("--{alias}");
                    if !parts.iter().any(|p| p == &rendered) {
                        parts.push(rendered);
                    }
                }
            }

            let value_name = arg
                .get_value_names()
                .and_then(|names| names.first())
                .map(|name| name.as_str())
                .unwrap_or("VALUE");
            let mut flags = parts.join(", ");

            if arg.is_positional() {
                flags = format!("<{value_name}>");
            } else if arg.get_action().takes_values() {
                flags.push_str(&format!(" <{value_name}>"));
            }

            out.push_str("  ");
            out.push_str(&flags);
            out.push('\n');

            if let Some(help) = arg.get_help() {
                let help = help.to_string();
                if !help.trim().is_empty() {
                    out.push_str("          ");
                    out.push_str(help.trim());
                    out.push('\n');
                }
            }

            out.push('\n');
        }
    }

    out
}

/// Help for whichever subcommand appears on the command line, else the root.
fn help_for_invocation() -> String {
    let root = CliArgs::command();
    let requested = std::env::args().skip(1).find_map(|arg| {
        root.get_subcommands()
            .find(|sub| sub.get_name() == arg)
            .map(|sub| sub.get_name().to_string())
    });
    match requested.and_then(|name| root.find_subcommand(&name).cloned()) {
        Some(sub) => {
            let usage = format!("{} {}", root.get_name(), sub.get_name());
            render_custom_help(&sub, &usage)
        }
        None => render_custom_help(&root, root.get_name()),
    }
}

#[derive(Clone, Debug)]
struct RunConfig {
    command: Command,
    credentials: Option<StoreCredentials>,
    table: String,
    timeout: Option<Duration>,
    proxy: Option<String>,
    export_dir: PathBuf,
    fonts: FontSource,
    no_color: bool,
}

impl RunConfig {
    fn store_settings(&self) -> Result<SupabaseSettings, String> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or_else(|| "store credentials are not configured".to_string())?;
        Ok(SupabaseSettings {
            endpoint: credentials.endpoint.clone(),
            access_key: credentials.access_key.clone(),
            table: self.table.clone(),
            timeout: self.timeout,
            proxy: self.proxy.clone(),
        })
    }
}

fn build_run_config<F>(args: CliArgs, cfg: ConfigFile, lookup: F) -> Result<RunConfig, String>
where
    F: Fn(&str) -> Option<String>,
{
    validation::validate(&args)?;

    let credentials = match args.command {
        Command::InitConfig => None,
        _ => Some(config::resolve_credentials(&cfg, lookup).map_err(|e| e.to_string())?),
    };

    let no_color = args.no_color || cfg.no_color.unwrap_or(false);
    let table = args
        .table
        .or(cfg.table)
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| config::DEFAULT_TABLE.to_string());
    let timeout = args
        .timeout
        .or(cfg.timeout)
        .filter(|t| *t > 0)
        .map(Duration::from_secs);
    let proxy = args.proxy.or(cfg.proxy).filter(|p| !p.trim().is_empty());

    let export_dir = match &args.command {
        Command::Export(export) => export.dir.clone(),
        _ => None,
    }
    .or(cfg.export_dir)
    .map(|p| config::expand_tilde(&p))
    .unwrap_or_else(|| PathBuf::from("."));

    let mut fonts = FontSource::default();
    if let Some(dir) = args.font_dir.or(cfg.font_dir) {
        fonts.dir = config::expand_tilde(&dir);
    }
    if let Some(family) = cfg.font_family.filter(|f| !f.trim().is_empty()) {
        fonts.family = family;
    }

    Ok(RunConfig {
        command: args.command,
        credentials,
        table,
        timeout,
        proxy,
        export_dir,
        fonts,
        no_color,
    })
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_draw_target(ProgressDrawTarget::stderr());
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

async fn with_spinner<T, Fut>(message: &str, fut: Fut) -> T
where
    Fut: Future<Output = T>,
{
    let pb = spinner(message);
    let out = fut.await;
    pb.finish_and_clear();
    out
}

fn print_record(record: &Record) {
    format_kv_line("id", &record.id.to_string());
    format_kv_line("producto", &record.product);
    format_kv_line(
        "requerido",
        &record.required.map(|v| v.to_string()).unwrap_or_default(),
    );
    format_kv_line(
        "hecho",
        &record.done.map(|v| v.to_string()).unwrap_or_default(),
    );
    let remainder = record.remainder().to_string();
    if record.is_complete() {
        format_kv_line("restan", &format!("{} {}", remainder.green().bold(), "completado".green()));
    } else {
        format_kv_line("restan", &remainder);
    }
    format_kv_line(
        "fecha",
        &record
            .date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
    );
}

fn print_totals(tracker: &Tracker) {
    let totals = tracker.totals();
    println!();
    println!(
        ":: Totals :: requerido {} :: hecho {} :: restan {} :: completados {} ::",
        totals.required,
        totals.done,
        totals.remaining,
        tracker.completed().len()
    );
}

fn confirm_delete(record: &Record) -> bool {
    print!(
        "{} '{}' (id {})? [y/N] ",
        "Delete".red().bold(),
        record.product,
        record.id
    );
    let _ = std::io::stdout().flush();
    let mut line = String::new();
    if std::io::stdin().lock().read_line(&mut line).is_err() {
        return false;
    }
    matches!(line.trim().to_lowercase().as_str(), "y" | "yes" | "s" | "si" | "sí")
}

async fn cmd_add(tracker: &mut Tracker, add: AddArgs) -> Result<(), String> {
    let fields = RecordFields {
        product: add.product.trim().to_string(),
        required: add.required,
        done: Some(add.done),
        date: add.date,
    };
    let created = with_spinner("Saving record", tracker.create(fields))
        .await
        .map_err(|e| e.to_string())?;
    println!("{}", "Record saved".green().bold());
    print_record(&created);
    print_totals(tracker);
    Ok(())
}

async fn cmd_list(tracker: &mut Tracker, list: ListArgs) -> Result<(), String> {
    tracker.set_query(list.search.unwrap_or_default());
    let visible = tracker.visible();
    let report = output::build_report(&visible, tracker.records());

    let format = list
        .format
        .as_deref()
        .and_then(OutputFormat::parse)
        .or_else(|| list.output.as_deref().and_then(output::infer_format_from_path))
        .unwrap_or(OutputFormat::Text);

    if let Some(path) = list.output.as_deref() {
        if format == OutputFormat::Text {
            colored::control::set_override(false);
        }
        let rendered = output::render(format, &report)
            .map_err(|e| format!("failed to render list: {e}"))?;
        let path = config::expand_tilde(path);
        tokio::fs::write(&path, rendered)
            .await
            .map_err(|e| format!("failed to write output file '{}': {e}", path.display()))?;
        format_kv_line("written", &path.display().to_string());
        format_kv_line("records", &report.records.len().to_string());
    } else {
        let rendered = output::render(format, &report)
            .map_err(|e| format!("failed to render list: {e}"))?;
        std::io::stdout()
            .write_all(&rendered)
            .map_err(|e| format!("failed to write to stdout: {e}"))?;
    }
    Ok(())
}

async fn cmd_edit(tracker: &mut Tracker, edit: EditArgs) -> Result<(), String> {
    let id = tracker.resolve(&edit.id);
    let patch = RecordPatch {
        product: edit.product.map(|p| p.trim().to_string()),
        required: edit.required,
        done: edit.done,
        date: edit.date,
    };
    let updated = with_spinner("Updating record", tracker.edit(&id, &patch))
        .await
        .map_err(|e| e.to_string())?;
    println!("{}", "Record updated".green().bold());
    print_record(&updated);
    print_totals(tracker);
    Ok(())
}

async fn cmd_delete(tracker: &mut Tracker, delete: DeleteArgs) -> Result<(), String> {
    let id = tracker.resolve(&delete.id);
    let yes = delete.yes;
    let outcome = tracker
        .delete(&id, |record| yes || confirm_delete(record))
        .await
        .map_err(|e| e.to_string())?;
    match outcome {
        DeleteOutcome::Deleted(record) => {
            println!(
                "{} {} ({})",
                "Deleted".green().bold(),
                record.product,
                record.id
            );
            print_totals(tracker);
        }
        DeleteOutcome::Cancelled => println!("{}", "Cancelled".yellow()),
    }
    Ok(())
}

fn cmd_completed(tracker: &Tracker) {
    let completed = tracker.completed();
    println!(
        "{}",
        format!("Productos Completados ({})", completed.len())
            .green()
            .bold()
    );
    if completed.is_empty() {
        println!("No hay productos completados aún.");
        return;
    }
    for record in completed {
        println!();
        print_record(record);
    }
}

fn cmd_export(
    tracker: &Tracker,
    export: ExportArgs,
    renderer: &PdfRenderer,
    dir: &std::path::Path,
) -> Result<(), String> {
    let today = crate::utils::today();
    let doc = match export.id.as_deref() {
        Some(raw) => {
            let id = tracker.resolve(raw);
            let record = tracker
                .record(&id)
                .ok_or_else(|| format!("record {id} is not in the working set"))?;
            ExportDocument::single(record, today).map_err(|e| e.to_string())?
        }
        None => ExportDocument::completed(tracker.records(), today),
    };
    debug!(entries = doc.entries.len(), file = %doc.file_name, "rendering export");
    let path = renderer
        .write_to_dir(&doc, dir)
        .map_err(|e| e.to_string())?;
    format_kv_line("exported", &path.display().to_string());
    format_kv_line("records", &doc.entries.len().to_string());
    Ok(())
}

async fn run_async(run: RunConfig) -> Result<(), String> {
    if run.no_color {
        colored::control::set_override(false);
    }

    let store = SupabaseStore::new(&run.store_settings()?).map_err(|e| e.to_string())?;
    debug!(table = %run.table, url = %store.table_url(), "store configured");

    let mut tracker = with_spinner("Loading records", Tracker::connect(Box::new(store)))
        .await
        .map_err(|e| e.to_string())?;

    match run.command {
        Command::Add(add) => cmd_add(&mut tracker, add).await,
        Command::List(list) => cmd_list(&mut tracker, list).await,
        Command::Edit(edit) => cmd_edit(&mut tracker, edit).await,
        Command::Delete(delete) => cmd_delete(&mut tracker, delete).await,
        Command::Completed => {
            cmd_completed(&tracker);
            Ok(())
        }
        Command::Export(export) => {
            let renderer = PdfRenderer::new(run.fonts.clone());
            cmd_export(&tracker, export, &renderer, &run.export_dir)
        }
        Command::InitConfig => Ok(()),
    }
}

fn init_config(path: Option<PathBuf>) -> Result<(), String> {
    let path = path.ok_or_else(|| "could not determine a config path, use --config".to_string())?;
    let created = config::ensure_default_config_file(&path).map_err(|e| e.to_string())?;
    if created {
        format_kv_line("created", &path.display().to_string());
    } else {
        format_kv_line("exists", &path.display().to_string());
    }
    Ok(())
}

pub fn run_cli() -> Result<(), String> {
    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                print!("{}", help_for_invocation());
                return Ok(());
            }
            ErrorKind::DisplayVersion => {
                let cmd = CliArgs::command();
                print!("{}", cmd.render_version());
                return Ok(());
            }
            _ => return Err(e.to_string()),
        },
    };

    init_tracing(args.verbose);

    let user_config_path = args.config.clone().map(|p| config::expand_tilde(&p));
    let config_path = user_config_path.clone().or_else(config::default_config_path);

    if matches!(args.command, Command::InitConfig) {
        return init_config(config_path);
    }

    let cfg = match (user_config_path.as_ref(), config_path.as_ref()) {
        (Some(path), _) => config::load_config(path, false).map_err(|e| e.to_string())?,
        (None, Some(path)) => config::load_config(path, true).map_err(|e| e.to_string())?,
        (None, None) => ConfigFile::default(),
    };

    let run = build_run_config(args, cfg, |name| std::env::var(name).ok())?;

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to build runtime: {e}"))?;

    rt.block_on(run_async(run))
}
