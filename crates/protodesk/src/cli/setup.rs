use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "protodesk",
    bin_name = "protodesk",
    version,
    disable_help_subcommand = true
)]
#[command(about = "Browse and edit an object database as a spreadsheet", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database file (overrides PROTODESK_DATABASE and the config file)
    #[arg(short, long, global = true, help_heading = "Options")]
    pub database: Option<PathBuf>,

    /// Config file to read instead of the default location
    #[arg(long, global = true, help_heading = "Options")]
    pub config: Option<PathBuf>,

    /// Rows per page
    #[arg(short, long, global = true, help_heading = "Options")]
    pub limit: Option<usize>,

    /// Verbose output
    #[arg(short, long, global = true, help_heading = "Options")]
    pub verbose: bool,
}

/// Which rows of a class the row numbers refer to.
#[derive(Args, Debug, Clone, Default)]
pub struct ViewArgs {
    /// Filter as JSON, e.g. '{"age": {"$gt": 30}}'
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Sort keys, e.g. '-age,name'
    #[arg(short, long)]
    pub sort: Option<String>,

    /// Page number, starting at 1
    #[arg(short, long, default_value_t = 1)]
    pub page: usize,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a database from a schema file
    Init {
        /// JSON schema: {"<Class>": {"fields": {...}}}
        schema: PathBuf,

        /// Replace an existing database
        #[arg(long)]
        force: bool,
    },

    /// List classes and their columns
    Schema {
        /// Only this class
        class: Option<String>,
    },

    /// Show a page of a class as a table
    #[command(alias = "ls")]
    Browse {
        class: String,

        #[command(flatten)]
        view: ViewArgs,

        /// Print rows as JSON records instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Set one cell from text
    Set {
        class: String,
        /// Row number (one past the last row creates an object)
        row: usize,
        column: String,
        /// Value text; empty clears the cell
        value: String,

        /// Parse the value as a literal: {a: 1, when: new Date('2024-01-01')}
        #[arg(long)]
        literal: bool,

        #[command(flatten)]
        view: ViewArgs,
    },

    /// Upload a file into a file cell
    Upload {
        class: String,
        row: usize,
        column: String,
        file: PathBuf,

        #[command(flatten)]
        view: ViewArgs,
    },

    /// Copy rows or a block of cells
    Copy {
        class: String,
        /// Rows: 1-3,5 (a span like 2-4 when --columns is given)
        rows: String,

        /// Column span: name:email
        #[arg(short, long)]
        columns: Option<String>,

        /// Print the JSON encoding instead of TSV
        #[arg(long)]
        json: bool,

        /// Put the TSV on the system clipboard instead of printing it
        #[arg(long)]
        clipboard: bool,

        #[command(flatten)]
        view: ViewArgs,
    },

    /// Paste TSV or JSON from stdin (or the clipboard) onto rows or cells
    Paste {
        class: String,
        /// Rows: 1-3,5, or the anchor row when --columns is given
        rows: String,

        /// Column span, or a single anchor column
        #[arg(short, long)]
        columns: Option<String>,

        /// Read the system clipboard instead of stdin
        #[arg(long)]
        clipboard: bool,

        #[command(flatten)]
        view: ViewArgs,
    },

    /// Delete rows
    #[command(alias = "rm")]
    Delete {
        class: String,
        rows: String,

        /// Class name, required when deleting more than 3 rows
        #[arg(long)]
        confirm: Option<String>,

        #[command(flatten)]
        view: ViewArgs,
    },

    /// Clear a block of cells
    Clear {
        class: String,
        rows: String,
        columns: String,

        /// Class name, required when clearing more than 3 cells
        #[arg(long)]
        confirm: Option<String>,

        #[command(flatten)]
        view: ViewArgs,
    },

    /// Add related objects to a relation cell
    Relate {
        class: String,
        row: usize,
        column: String,
        #[arg(required = true)]
        ids: Vec<String>,

        #[command(flatten)]
        view: ViewArgs,
    },

    /// Show or set saved column widths
    Width {
        class: String,
        column: Option<String>,
        width: Option<f64>,
    },

    /// Remember credentials for this session
    Login { user: String, pass: String },

    /// Forget the session credentials
    Logout,

    /// Show who is signed in
    Whoami,
}
