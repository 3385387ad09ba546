//! # CLI Layer
//!
//! This module is **one possible UI client** for protodesk.
//!
//! The CLI layer is the **only** place in the codebase that:
//! - Knows about terminal I/O (stdout, stderr, prompts)
//! - Builds the async runtime
//! - Formats output for human consumption
//!
//! ## Responsibilities
//!
//! 1. **Argument Parsing**: clap turns arguments into [`Commands`]
//! 2. **Context Setup**: tracing, [`DeskConfig`], the session and the
//!    database file
//! 3. **Dispatch**: one handler per subcommand, all going through [`DeskApi`]
//! 4. **Output**: tables, clipboard text and styled messages
//! 5. **Errors**: error-level messages and failures become a non-zero exit

use super::clipboard::{copy_to_clipboard, get_from_clipboard};
use super::render::{render_footer, render_messages, render_table};
use super::setup::{Cli, Commands, ViewArgs};
use super::styles;
use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use protodeskapp::api::{CmdResult, DeskApi, GridView, MessageLevel};
use protodeskapp::codec::ClipboardPayload;
use protodeskapp::config::DeskConfig;
use protodeskapp::error::DeskError;
use protodeskapp::literal::parse_literal;
use protodeskapp::query::Filter;
use protodeskapp::schema::{ClassSchema, FieldType};
use protodeskapp::selection::parse_sort;
use protodeskapp::service::fs::FileService;
use protodeskapp::session::{Credentials, FileSessionStore, Session};
use std::collections::HashMap;
use std::io::{IsTerminal, Read, Write};
use std::path::Path;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = DeskConfig::load(cli.config.as_deref())?;
    if let Some(database) = cli.database {
        config.database = database;
    }
    if let Some(limit) = cli.limit {
        config.limit = limit.max(1);
    }
    tracing::debug!(database = %config.database.display(), limit = config.limit, "Loaded config");

    match cli.command {
        Commands::Init { schema, force } => handle_init(&config, &schema, force),
        Commands::Width {
            class,
            column,
            width,
        } => handle_width(&config, &class, column.as_deref(), width),
        Commands::Login { user, pass } => handle_login(&config, user, pass),
        Commands::Logout => handle_logout(&config),
        Commands::Whoami => handle_whoami(&config),
        command => {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .context("Failed to start runtime")?;
            runtime.block_on(dispatch(&config, command))
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();
}

async fn dispatch(config: &DeskConfig, command: Commands) -> Result<()> {
    let service = FileService::open(&config.database)?;
    let mut api = DeskApi::new(service).with_limit(config.limit);

    match command {
        Commands::Schema { class } => handle_schema(&api, class.as_deref()).await,
        Commands::Browse { class, view, json } => {
            open(&mut api, &class, &view).await?;
            handle_browse(&api, config, json)
        }
        Commands::Set {
            class,
            row,
            column,
            value,
            literal,
            view,
        } => {
            open(&mut api, &class, &view).await?;
            let row = row_index(row)?;
            let result = if literal {
                let value = parse_literal(&value).map_err(|e| anyhow!("Invalid literal: {}", e))?;
                api.set_cell(row, &column, value).await?
            } else {
                api.set_cell_text(row, &column, &value).await?
            };
            finish(result)
        }
        Commands::Upload {
            class,
            row,
            column,
            file,
            view,
        } => {
            open(&mut api, &class, &view).await?;
            let bytes = std::fs::read(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let filename = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| anyhow!("Not a file: {}", file.display()))?;
            finish(api.upload(row_index(row)?, &column, &filename, bytes).await?)
        }
        Commands::Copy {
            class,
            rows,
            columns,
            json,
            clipboard,
            view,
        } => {
            open(&mut api, &class, &view).await?;
            let mut result = match columns {
                Some(columns) => api.copy_cells(&rows, &columns)?,
                None => api.copy_rows(&rows)?,
            };
            handle_copy(&mut result, json, clipboard)?;
            finish(result)
        }
        Commands::Paste {
            class,
            rows,
            columns,
            clipboard,
            view,
        } => {
            open(&mut api, &class, &view).await?;
            let text = if clipboard {
                get_from_clipboard()?
            } else {
                let mut text = String::new();
                std::io::stdin()
                    .read_to_string(&mut text)
                    .context("Failed to read stdin")?;
                text
            };
            let payload = payload_from_text(text);
            let result = match columns {
                Some(columns) => api.paste_cells(&rows, &columns, &payload).await?,
                None => api.paste_rows(&rows, &payload).await?,
            };
            finish(result)
        }
        Commands::Delete {
            class,
            rows,
            confirm,
            view,
        } => {
            open(&mut api, &class, &view).await?;
            let result = match api.delete_rows(&rows, confirm.as_deref()).await {
                Err(DeskError::ConfirmationRequired { class_name, count }) => {
                    let answer = prompt_confirmation(&class_name, count, "rows")?;
                    api.delete_rows(&rows, Some(&answer)).await?
                }
                other => other?,
            };
            finish(result)
        }
        Commands::Clear {
            class,
            rows,
            columns,
            confirm,
            view,
        } => {
            open(&mut api, &class, &view).await?;
            let result = match api.delete_cells(&rows, &columns, confirm.as_deref()).await {
                Err(DeskError::ConfirmationRequired { class_name, count }) => {
                    let answer = prompt_confirmation(&class_name, count, "cells")?;
                    api.delete_cells(&rows, &columns, Some(&answer)).await?
                }
                other => other?,
            };
            finish(result)
        }
        Commands::Relate {
            class,
            row,
            column,
            ids,
            view,
        } => {
            open(&mut api, &class, &view).await?;
            finish(api.add_related(row_index(row)?, &column, ids.as_slice()).await?)
        }
        Commands::Init { .. }
        | Commands::Width { .. }
        | Commands::Login { .. }
        | Commands::Logout
        | Commands::Whoami => bail!("Command does not open the database"),
    }
}

/// Open a class with the filter, sort and page given on the command line.
async fn open(api: &mut DeskApi<FileService>, class: &str, view: &ViewArgs) -> Result<()> {
    let mut grid_view = GridView {
        page: view.page.saturating_sub(1),
        ..Default::default()
    };
    if let Some(filter) = &view.filter {
        let json: serde_json::Value =
            serde_json::from_str(filter).context("Filter is not valid JSON")?;
        let filter =
            Filter::from_json(&json).ok_or_else(|| anyhow!("Unsupported filter: {}", filter))?;
        grid_view.filters.push(filter);
    }
    if let Some(sort) = &view.sort {
        grid_view.sort = Some(parse_sort(sort).map_err(|e| anyhow!(e))?);
    }
    let result = api.open_view(class, grid_view).await?;
    // Fetch summaries are noise on the command line; keep only problems.
    for message in &result.messages {
        if !matches!(message.level, MessageLevel::Info | MessageLevel::Success) {
            eprint!("{}", render_messages(std::slice::from_ref(message)));
        }
    }
    Ok(())
}

fn row_index(row: usize) -> Result<usize> {
    row.checked_sub(1)
        .ok_or_else(|| anyhow!("Rows are numbered from 1"))
}

/// Print a command's messages. An error-level message fails the command.
fn finish(result: CmdResult) -> Result<()> {
    let mut failure = None;
    for message in result.messages {
        match message.level {
            MessageLevel::Error => failure = Some(message.content),
            _ => print!("{}", render_messages(std::slice::from_ref(&message))),
        }
    }
    match failure {
        Some(content) => Err(anyhow!(content)),
        None => Ok(()),
    }
}

fn payload_from_text(text: String) -> ClipboardPayload {
    let trimmed = text.trim();
    let looks_like_json = trimmed.starts_with('[') || trimmed.starts_with('{');
    if looks_like_json && serde_json::from_str::<serde_json::Value>(trimmed).is_ok() {
        return ClipboardPayload::from_json(trimmed);
    }
    ClipboardPayload::from_text(text)
}

fn prompt_confirmation(class_name: &str, count: usize, noun: &str) -> Result<String> {
    if !std::io::stdin().is_terminal() {
        bail!(
            "This affects {} {}; pass --confirm {} to proceed",
            count,
            noun,
            class_name
        );
    }
    eprint!(
        "This affects {} {}. Type '{}' to confirm: ",
        count, noun, class_name
    );
    std::io::stderr().flush()?;
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(answer.trim().to_string())
}

fn handle_init(config: &DeskConfig, schema: &Path, force: bool) -> Result<()> {
    if config.database.exists() && !force {
        bail!(
            "{} already exists; use --force to replace it",
            config.database.display()
        );
    }
    let content = std::fs::read_to_string(schema)
        .with_context(|| format!("Failed to read {}", schema.display()))?;
    let json: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("{} is not valid JSON", schema.display()))?;
    let service = FileService::create(&config.database, json)?;
    let classes = service.load()?.schema()?.len();
    println!(
        "{}",
        styles::message(&MessageLevel::Success).apply_to(format!(
            "Created {} with {} {}",
            config.database.display(),
            classes,
            if classes == 1 { "class" } else { "classes" }
        ))
    );
    Ok(())
}

async fn handle_schema(api: &DeskApi<FileService>, only: Option<&str>) -> Result<()> {
    let schema = api.schema().await?;
    if let Some(name) = only {
        if !schema.contains_key(name) {
            return Err(DeskError::ClassNotFound(name.to_string()).into());
        }
    }
    for (name, class) in schema.iter().filter(|(n, _)| only.map_or(true, |o| n.as_str() == o)) {
        println!("{}", styles::header().apply_to(name));
        print!("{}", describe_columns(class));
    }
    Ok(())
}

fn describe_columns(class: &ClassSchema) -> String {
    let columns = class.columns();
    let width = columns.iter().map(|c| c.key.len()).max().unwrap_or(0);
    let mut out = String::new();
    for column in &columns {
        let mut kind = column.field_type.label().to_string();
        match &column.field_type {
            FieldType::Pointer { target } => kind = format!("{} -> {}", kind, target),
            FieldType::Relation {
                target,
                foreign_field: Some(field),
            } => kind = format!("{} <- {}.{}", kind, target, field),
            FieldType::Relation { target, .. } => kind = format!("{} -> {}", kind, target),
            _ => {}
        }
        let mut flags = Vec::new();
        if class.is_read_only(&column.key) {
            flags.push("read-only");
        }
        if class.is_hidden(&column.key) {
            flags.push("hidden");
        }
        let flags = if flags.is_empty() {
            String::new()
        } else {
            format!(" {}", styles::muted().apply_to(format!("({})", flags.join(", "))))
        };
        out.push_str(&format!("  {:<w$}  {}{}\n", column.key, kind, flags, w = width));
    }
    out
}

fn handle_browse(api: &DeskApi<FileService>, config: &DeskConfig, json: bool) -> Result<()> {
    let grid = api.grid()?;
    if json {
        let rows: Vec<serde_json::Value> = grid.rows().iter().map(|r| r.to_json()).collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }
    let session = Session::load(&FileSessionStore::new(config.session_path()))?;
    let saved: HashMap<String, usize> = session
        .column_widths(grid.class_name())
        .into_iter()
        .map(|(k, w)| (k, w.round().max(1.0) as usize))
        .collect();
    let keys: Vec<String> = grid.columns().iter().map(|c| c.key.clone()).collect();
    let page = grid.page();
    print!(
        "{}",
        render_table(&keys, &api.headers()?, &api.render_rows()?, &saved, page.offset())
    );
    let total = grid.total().unwrap_or(grid.len());
    println!("{}", render_footer(page.page, page.page_count(total), total));
    Ok(())
}

fn handle_copy(result: &mut CmdResult, json: bool, clipboard: bool) -> Result<()> {
    let payload = result
        .clipboard
        .take()
        .ok_or_else(|| anyhow!("Nothing was copied"))?;
    let flavour = if json { payload.json } else { payload.text };
    let content = flavour.unwrap_or_default();
    if clipboard {
        copy_to_clipboard(&content)?;
    } else {
        println!("{}", content);
        // The copy summary would corrupt piped output.
        result.messages.clear();
    }
    Ok(())
}

fn open_session(config: &DeskConfig) -> Result<(FileSessionStore, Session)> {
    let store = FileSessionStore::new(config.session_path());
    let session = Session::load(&store)?;
    Ok((store, session))
}

fn handle_width(
    config: &DeskConfig,
    class: &str,
    column: Option<&str>,
    width: Option<f64>,
) -> Result<()> {
    let (store, mut session) = open_session(config)?;
    match (column, width) {
        (Some(column), Some(width)) => {
            if !width.is_finite() || width <= 0.0 {
                bail!("Width must be a positive number");
            }
            session.set_column_width(class, column, width);
            session.save(&store)?;
            println!(
                "{}",
                styles::message(&MessageLevel::Success)
                    .apply_to(format!("Width of {}.{} set to {}", class, column, width))
            );
        }
        (Some(column), None) => match session.column_widths(class).get(column) {
            Some(width) => println!("{}", width),
            None => println!("{}", styles::muted().apply_to("Not set")),
        },
        (None, _) => {
            let widths = session.column_widths(class);
            if widths.is_empty() {
                println!("{}", styles::muted().apply_to("No saved widths"));
            }
            for (column, width) in widths {
                println!("{}  {}", column, width);
            }
        }
    }
    Ok(())
}

fn handle_login(config: &DeskConfig, user: String, pass: String) -> Result<()> {
    if user.is_empty() || pass.is_empty() {
        bail!("User and password must not be empty");
    }
    let (store, mut session) = open_session(config)?;
    let message = format!("Signed in as {}", user);
    session.set_credentials(Some(Credentials { user, pass }));
    session.save(&store)?;
    println!(
        "{}",
        styles::message(&MessageLevel::Success).apply_to(message)
    );
    Ok(())
}

fn handle_logout(config: &DeskConfig) -> Result<()> {
    let (store, mut session) = open_session(config)?;
    session.set_credentials(None);
    session.save(&store)?;
    println!(
        "{}",
        styles::message(&MessageLevel::Success).apply_to("Signed out")
    );
    Ok(())
}

fn handle_whoami(config: &DeskConfig) -> Result<()> {
    let (_, session) = open_session(config)?;
    match session.credentials() {
        Some(credentials) => println!("{}", credentials.user),
        None => println!("{}", styles::muted().apply_to("Not signed in")),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_text_becomes_json_payload() {
        let payload = payload_from_text("[{\"name\": \"Ada\"}]\n".to_string());
        assert_eq!(payload.json.as_deref(), Some("[{\"name\": \"Ada\"}]"));
        assert!(payload.text.is_none());
    }

    #[test]
    fn bracketed_text_stays_text() {
        let payload = payload_from_text("[draft]\tAda\n".to_string());
        assert_eq!(payload.text.as_deref(), Some("[draft]\tAda\n"));
        assert!(payload.json.is_none());
    }

    #[test]
    fn rows_are_one_based() {
        assert_eq!(row_index(1).unwrap(), 0);
        assert!(row_index(0).is_err());
    }

    #[test]
    fn error_message_fails_command() {
        let mut result = CmdResult::default();
        result.add_message(protodeskapp::api::CmdMessage::error("Save failed"));
        let err = finish(result).unwrap_err();
        assert_eq!(err.to_string(), "Save failed");
    }
}
