use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "ledger-doc",
    about = "Load, query, insert and update documents in a ledger table",
    version
)]
pub struct Cli {
    /// Name of the table to work on
    #[arg(short, long)]
    pub table: String,

    /// Identity of the document to load, update or trace
    #[arg(short, long)]
    pub id: Option<String>,

    /// Print every document in the table
    #[arg(short, long)]
    pub all: bool,

    /// Find documents matching `KEY1=VALUE1 KEY2=VALUE2 ...`
    #[arg(long, num_args = 1.., value_parser = parse_key_value, value_name = "KEY=VALUE")]
    pub find: Vec<(String, String)>,

    /// Create a document with `KEY1=VALUE1 KEY2=VALUE2 ...`
    #[arg(long, num_args = 1.., value_parser = parse_key_value, value_name = "KEY=VALUE")]
    pub insert: Vec<(String, String)>,

    /// Update fields of the `--id` document with `KEY1=VALUE1 KEY2=VALUE2 ...`
    #[arg(long, num_args = 1.., value_parser = parse_key_value, value_name = "KEY=VALUE")]
    pub update: Vec<(String, String)>,

    /// Print every revision of the `--id` document
    #[arg(long)]
    pub history: bool,

    /// Include table, ledger, index and revision link id in the output
    #[arg(long)]
    pub reveal: bool,

    /// PostgreSQL connection URL
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Ledger (schema) holding the table
    #[arg(long, env = "LEDGER")]
    pub ledger: String,

    /// Field holding each document's identity
    #[arg(long, env = "LEDGER_INDEX_FIELD", default_value = "id")]
    pub index_field: String,

    /// Log filter, e.g. `warn` or `ledger_document=debug`
    #[arg(long, env = "LOG_LEVEL", default_value = "warn")]
    pub log_level: String,
}

/// Split `KEY=VALUE` at the first `=`. Values are kept as text.
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{}`", s))?;
    if key.is_empty() {
        return Err(format!("empty key in `{}`", s));
    }
    Ok((key.to_string(), value.to_string()))
}
