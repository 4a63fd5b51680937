// csvdb CLI - headless operations on structured CSV databases

mod exit_codes;
mod util;

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;

use csvdb_config::{OutputFormat, Settings};
use csvdb_engine::column::{Column, ColumnType};
use csvdb_engine::{project_view, Action, DatabaseModel, Document, DocumentEvent};
use csvdb_io::{export, file, CodecError};

use exit_codes::{
    codec_exit_code, EXIT_BAD_ACTIONS, EXIT_ERROR, EXIT_INVARIANT, EXIT_IO, EXIT_NOT_CANONICAL,
    EXIT_SUCCESS, EXIT_USAGE,
};

#[derive(Parser)]
#[command(name = "csvdb")]
#[command(about = "Typed tables and saved views in a plain CSV file")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Settings file to use instead of the user config dir
    #[arg(long, env = "CSVDB_CONFIG", global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show columns, views and row count
    #[command(after_help = "\
Examples:
  csvdb inspect tasks.csv
  csvdb inspect tasks.csv --json | jq '.columns[].name'")]
    Inspect {
        file: PathBuf,

        /// Machine-readable output
        #[arg(long)]
        json: bool,
    },

    /// Print the rows a view shows
    #[command(after_help = "\
Examples:
  csvdb view tasks.csv
  csvdb view tasks.csv --view 'Open tasks'
  csvdb view tasks.csv --view 1 --format csv")]
    View {
        file: PathBuf,

        /// View name or index (default: the first view)
        #[arg(long)]
        view: Option<String>,

        /// Output format (default from settings)
        #[arg(long, short = 'f')]
        format: Option<Format>,

        /// Truncate table cells to this many columns (default from settings)
        #[arg(long)]
        width: Option<usize>,
    },

    /// Check that a file decodes into a consistent database
    Validate {
        file: PathBuf,

        /// Also require the file to be byte-identical to its re-encoding
        #[arg(long)]
        strict: bool,
    },

    /// Apply a JSON array of actions and save
    #[command(after_help = "\
The actions file holds a JSON array, applied in order. Positions are storage
positions. Out-of-range positions are ignored.

Example actions.json:
  [
    {\"type\": \"add_row\"},
    {\"type\": \"set_cell\", \"row\": 0, \"col\": 1, \"value\": \"Done\"},
    {\"type\": \"add_select_option\", \"col\": 1, \"value\": \"Blocked\", \"color\": \"red\"}
  ]

Examples:
  csvdb apply tasks.csv actions.json
  csvdb apply tasks.csv actions.json -o edited.csv")]
    Apply {
        file: PathBuf,

        /// JSON file with the actions
        actions: PathBuf,

        /// Write the result here instead of back to FILE
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Convert a plain CSV/TSV into a csvdb file
    #[command(after_help = "\
The delimiter (comma, semicolon, tab or pipe) is detected from the first lines.
Every column becomes a text column; the file gets a single default view.

Example:
  csvdb migrate contacts.tsv -o contacts.csv")]
    Migrate {
        input: PathBuf,

        #[arg(long, short = 'o')]
        output: PathBuf,
    },

    /// Export what a view shows as plain CSV or JSON
    #[command(after_help = "\
The format follows the output extension: .csv or .json.

Examples:
  csvdb export tasks.csv -o open.csv --view 'Open tasks'
  csvdb export tasks.csv -o tasks.json")]
    Export {
        file: PathBuf,

        #[arg(long, short = 'o')]
        output: PathBuf,

        /// View name or index (default: the first view)
        #[arg(long)]
        view: Option<String>,
    },

    /// Append a column
    AddColumn {
        file: PathBuf,

        /// Column name (default from settings; made unique)
        #[arg(long)]
        name: Option<String>,

        /// text, number, date, checkbox, select or multiselect (default from settings)
        #[arg(long = "type", value_parser = parse_column_type)]
        kind: Option<ColumnType>,
    },

    /// Append a view
    AddView {
        file: PathBuf,

        /// View name (default from settings; made unique)
        #[arg(long)]
        name: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Table,
    Csv,
    Json,
}

impl From<OutputFormat> for Format {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Table => Format::Table,
            OutputFormat::Csv => Format::Csv,
            OutputFormat::Json => Format::Json,
        }
    }
}

fn parse_column_type(s: &str) -> Result<ColumnType, String> {
    let tag = s.trim().to_lowercase();
    ColumnType::ALL
        .iter()
        .copied()
        .find(|kind| kind.tag() == tag)
        .ok_or_else(|| {
            let known: Vec<&str> = ColumnType::ALL.iter().map(|k| k.tag()).collect();
            format!("unknown column type '{}' (expected one of: {})", s, known.join(", "))
        })
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nengine:  csvdb-engine ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("TARGET"),
    )
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

fn load_settings(config: Option<&Path>) -> Settings {
    match config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let settings = load_settings(cli.config.as_deref());

    let result = match cli.command {
        Commands::Inspect { file, json } => cmd_inspect(&file, json),
        Commands::View { file, view, format, width } => {
            cmd_view(&file, view.as_deref(), format, width, &settings)
        }
        Commands::Validate { file, strict } => cmd_validate(&file, strict),
        Commands::Apply { file, actions, output } => cmd_apply(&file, &actions, output.as_deref()),
        Commands::Migrate { input, output } => cmd_migrate(&input, &output),
        Commands::Export { file, output, view } => cmd_export(&file, &output, view.as_deref()),
        Commands::AddColumn { file, name, kind } => cmd_add_column(&file, name, kind, &settings),
        Commands::AddView { file, name } => cmd_add_view(&file, name, &settings),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn usage(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self { code: EXIT_INVARIANT, message: msg.into(), hint: None }
    }

    /// Codec error for a file, with the exit code from the registry
    pub fn codec(path: &Path, err: CodecError) -> Self {
        let hint = match &err {
            CodecError::UnterminatedQuote { .. } => {
                Some("a quoted field is never closed; look for a stray '\"'".to_string())
            }
            _ => None,
        };
        Self { code: codec_exit_code(&err), message: format!("{}: {}", path.display(), err), hint }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self { code: EXIT_ERROR, message: e.to_string(), hint: None }
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn load_model(path: &Path) -> Result<DatabaseModel, CliError> {
    file::load(path).map_err(|e| CliError::codec(path, e))
}

fn save_model(model: &DatabaseModel, path: &Path) -> Result<(), CliError> {
    model
        .check_invariants()
        .map_err(|v| CliError::invariant(format!("refusing to save {}: {}", path.display(), v)))?;
    file::save(model, path).map_err(|e| CliError::codec(path, e))
}

/// Resolve `--view`: an exact view name first, then a 0-based index
fn resolve_view(model: &DatabaseModel, selector: Option<&str>) -> Result<usize, CliError> {
    let Some(selector) = selector else {
        return Ok(0);
    };
    if let Some(idx) = model.view_position(selector) {
        return Ok(idx);
    }
    if let Ok(idx) = selector.trim().parse::<usize>() {
        if idx < model.views().len() {
            return Ok(idx);
        }
    }
    let available: Vec<String> = model
        .views()
        .iter()
        .enumerate()
        .map(|(i, v)| format!("{} ({})", v.name, i))
        .collect();
    Err(CliError::usage(format!("no view named \"{}\"", selector))
        .with_hint(format!("available views: {}", available.join(", "))))
}

fn describe_options(column: &Column) -> String {
    column
        .options()
        .iter()
        .map(|o| format!("{} ({})", o.value, o.color.tag()))
        .collect::<Vec<_>>()
        .join(", ")
}

// ============================================================================
// inspect
// ============================================================================

fn cmd_inspect(path: &Path, json: bool) -> Result<(), CliError> {
    let model = load_model(path)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if json {
        let report = json!({
            "columns": model.display_columns(),
            "views": model.views(),
            "rows": model.row_count(),
        });
        let text = serde_json::to_string_pretty(&report).map_err(|e| CliError::io(e.to_string()))?;
        writeln!(out, "{}", text)?;
        return Ok(());
    }

    writeln!(
        out,
        "{}: {} columns, {} rows, {} views",
        path.display(),
        model.column_count(),
        model.row_count(),
        model.views().len()
    )?;

    writeln!(out)?;
    writeln!(out, "Columns:")?;
    let rows: Vec<Vec<String>> = model
        .display_columns()
        .into_iter()
        .map(|c| {
            vec![
                format!("{} {}", c.kind.icon(), c.kind.label()),
                c.name.clone(),
                format!("{}", c.effective_width()),
                describe_options(c),
            ]
        })
        .collect();
    let table = util::render_table(&["TYPE", "NAME", "WIDTH", "OPTIONS"], &rows, 48);
    for line in table.lines() {
        writeln!(out, "  {}", line)?;
    }

    writeln!(out)?;
    writeln!(out, "Views:")?;
    for (i, view) in model.views().iter().enumerate() {
        writeln!(
            out,
            "  {}: {} ({} sorts, {} filters, {} hidden)",
            i,
            view.name,
            view.sorts.len(),
            view.filters.len(),
            view.hidden_columns.len()
        )?;
    }
    Ok(())
}

// ============================================================================
// view / export
// ============================================================================

fn cmd_view(
    path: &Path,
    view: Option<&str>,
    format: Option<Format>,
    width: Option<usize>,
    settings: &Settings,
) -> Result<(), CliError> {
    let model = load_model(path)?;
    let view_idx = resolve_view(&model, view)?;
    let projection = project_view(&model, view_idx);
    log::debug!(
        "view '{}': {} of {} rows, {} of {} columns",
        model.views()[view_idx].name,
        projection.row_count(),
        model.row_count(),
        projection.column_count(),
        model.column_count()
    );

    let text = match format.unwrap_or_else(|| settings.output_format.into()) {
        Format::Table => {
            if projection.column_count() == 0 {
                String::new()
            } else {
                let max_width = width.unwrap_or(settings.max_cell_width);
                util::render_table(&projection.header(), &projection.to_table(), max_width)
            }
        }
        Format::Csv => export::to_csv(&projection).map_err(|e| CliError::codec(path, e))?,
        Format::Json => {
            let mut json = export::to_json(&projection).map_err(|e| CliError::codec(path, e))?;
            json.push('\n');
            json
        }
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    out.write_all(text.as_bytes())?;
    Ok(())
}

fn cmd_export(path: &Path, output: &Path, view: Option<&str>) -> Result<(), CliError> {
    let model = load_model(path)?;
    let view_idx = resolve_view(&model, view)?;
    let projection = project_view(&model, view_idx);

    let ext = output
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    let written = match ext.as_str() {
        "csv" => export::export_csv(&projection, output),
        "json" => export::export_json(&projection, output),
        _ => {
            return Err(CliError::usage(format!("cannot export to '{}'", output.display()))
                .with_hint("use a .csv or .json output path"));
        }
    };
    written.map_err(|e| CliError::codec(output, e))?;

    eprintln!(
        "exported {} rows from view '{}' to {}",
        projection.row_count(),
        model.views()[view_idx].name,
        output.display()
    );
    Ok(())
}

// ============================================================================
// validate
// ============================================================================

fn cmd_validate(path: &Path, strict: bool) -> Result<(), CliError> {
    let text = file::read_file_as_utf8(path).map_err(|e| CliError::codec(path, e))?;
    let model = csvdb_io::decode(&text).map_err(|e| CliError::codec(path, e))?;
    model
        .check_invariants()
        .map_err(|v| CliError::invariant(format!("{}: {}", path.display(), v)))?;

    if strict {
        let canonical = csvdb_io::encode(&model).map_err(|e| CliError::codec(path, e))?;
        if canonical != text {
            let line = first_difference_line(&text, &canonical);
            return Err(CliError {
                code: EXIT_NOT_CANONICAL,
                message: format!("{}: not in canonical form (first difference on line {})", path.display(), line),
                hint: Some(format!(
                    "rewrite it with: csvdb migrate {} -o {}",
                    path.display(),
                    path.display()
                )),
            });
        }
    }

    println!(
        "ok: {} columns, {} rows, {} views",
        model.column_count(),
        model.row_count(),
        model.views().len()
    );
    Ok(())
}

/// 1-based line of the first byte where two texts differ
fn first_difference_line(a: &str, b: &str) -> usize {
    let common = a.bytes().zip(b.bytes()).take_while(|(x, y)| x == y).count();
    a.as_bytes()[..common].iter().filter(|&&b| b == b'\n').count() + 1
}

// ============================================================================
// apply
// ============================================================================

fn cmd_apply(path: &Path, actions_path: &Path, output: Option<&Path>) -> Result<(), CliError> {
    let model = load_model(path)?;

    let actions_text = std::fs::read_to_string(actions_path)
        .map_err(|e| CliError::io(format!("{}: {}", actions_path.display(), e)))?;
    let actions: Vec<Action> = serde_json::from_str(&actions_text).map_err(|e| CliError {
        code: EXIT_BAD_ACTIONS,
        message: format!("{}: {}", actions_path.display(), e),
        hint: Some("expected a JSON array like [{\"type\": \"add_row\"}]".to_string()),
    })?;
    let count = actions.len();

    let mut doc = Document::new(model);
    doc.subscribe(Box::new(|event: &DocumentEvent| log::debug!("{:?}", event)));
    doc.dispatch_all(actions);

    let target = output.unwrap_or(path);
    if doc.is_dirty() || output.is_some() {
        save_model(doc.model(), target)?;
        doc.mark_saved();
    }

    eprintln!("applied {} actions to {} (revision {})", count, target.display(), doc.revision());
    Ok(())
}

// ============================================================================
// migrate
// ============================================================================

fn cmd_migrate(input: &Path, output: &Path) -> Result<(), CliError> {
    let model = file::import_plain(input).map_err(|e| CliError::codec(input, e))?;
    save_model(&model, output)?;
    eprintln!(
        "migrated {} ({} columns, {} rows) to {}",
        input.display(),
        model.column_count(),
        model.row_count(),
        output.display()
    );
    Ok(())
}

// ============================================================================
// add-column / add-view
// ============================================================================

fn cmd_add_column(
    path: &Path,
    name: Option<String>,
    kind: Option<ColumnType>,
    settings: &Settings,
) -> Result<(), CliError> {
    let model = load_model(path)?;
    let name = name.unwrap_or_else(|| settings.new_column_name.clone());
    let kind = kind.unwrap_or(settings.new_column_type);

    let model = model.apply(Action::AddColumn { column: Column::new(name, kind) });
    save_model(&model, path)?;

    if let Some(added) = model.columns().last() {
        println!("{}", added.name);
    }
    Ok(())
}

fn cmd_add_view(path: &Path, name: Option<String>, settings: &Settings) -> Result<(), CliError> {
    let model = load_model(path)?;
    let name = name.unwrap_or_else(|| settings.new_view_name.clone());

    let model = model.apply(Action::AddView { name });
    save_model(&model, path)?;

    if let Some(added) = model.views().last() {
        println!("{}", added.name);
    }
    Ok(())
}
