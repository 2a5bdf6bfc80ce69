use crate::cli::args::{CliArgs, Command};

pub fn validate(args: &CliArgs) -> Result<(), String> {
    if let Some(timeout) = args.timeout {
        if timeout == 0 {
            return Err("invalid --timeout, expected a positive number of seconds".to_string());
        }
    }
    if let Some(table) = args.table.as_deref() {
        if table.trim().is_empty() {
            return Err("invalid --table, expected a table name".to_string());
        }
    }
    match &args.command {
        Command::Add(add) if add.product.trim().is_empty() => {
            Err("invalid --producto, expected a non-empty name".to_string())
        }
        Command::Edit(edit) => {
            if edit.id.trim().is_empty() {
                return Err("invalid ID, expected a record id".to_string());
            }
            if let Some(product) = edit.product.as_deref() {
                if product.trim().is_empty() {
                    return Err("invalid --producto, expected a non-empty name".to_string());
                }
            }
            if edit.product.is_none()
                && edit.required.is_none()
                && edit.done.is_none()
                && edit.date.is_none()
            {
                return Err(
                    "nothing to edit: pass at least one of --producto, --requerimiento, --hecho, --fecha"
                        .to_string(),
                );
            }
            Ok(())
        }
        Command::List(list) => {
            if let Some(format) = list.format.as_deref() {
                if crate::output::OutputFormat::parse(format).is_none() {
                    return Err(format!(
                        "invalid --format '{format}', expected text, json or csv"
                    ));
                }
            }
            Ok(())
        }
        _ => Ok(()),
    }
}
