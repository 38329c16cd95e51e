use anyhow::Context;
use ledger_document::{
    Document, Ledger, LedgerConfig, LedgerConnection, LedgerError, LedgerGateway, Revision,
    Snapshot,
};
use ledger_document_postgres::PgLedger;
use serde_json::Value as JsonValue;
use tracing::{info, warn};

use crate::cli::Cli;

/// The one operation a command line asks for, in precedence order.
#[derive(Debug, Clone, PartialEq)]
enum Action {
    Update { id: String, fields: Vec<(String, String)> },
    Insert { id: Option<String>, fields: Vec<(String, String)> },
    Find(Vec<(String, String)>),
    All,
    History(String),
    Load(String),
    MissingId(&'static str),
    Nothing,
}

impl Action {
    fn from_cli(cli: &Cli) -> Self {
        if !cli.update.is_empty() {
            return match &cli.id {
                Some(id) => Action::Update {
                    id: id.clone(),
                    fields: cli.update.clone(),
                },
                None => Action::MissingId("--update"),
            };
        }
        if !cli.insert.is_empty() {
            return Action::Insert {
                id: cli.id.clone(),
                fields: cli.insert.clone(),
            };
        }
        if !cli.find.is_empty() {
            return Action::Find(cli.find.clone());
        }
        if cli.all {
            return Action::All;
        }
        if cli.history {
            return match &cli.id {
                Some(id) => Action::History(id.clone()),
                None => Action::MissingId("--history"),
            };
        }
        match &cli.id {
            Some(id) => Action::Load(id.clone()),
            None => Action::Nothing,
        }
    }
}

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = LedgerConfig::new(cli.ledger.as_str()).with_index_field(cli.index_field.as_str());

    let gateway = PgLedger::connect(cli.database_url.as_str(), &config)
        .await
        .context("Failed to connect to database")?;
    gateway
        .initialize()
        .await
        .context("Failed to initialize ledger schema")?;

    let ledger = Ledger::new(gateway, config);
    let action = Action::from_cli(&cli);
    info!(table = %cli.table, ?action, "Running");

    match execute(&ledger, &cli.table, action, cli.reveal).await {
        Ok(Some(output)) => println!("{}", serde_json::to_string_pretty(&output)?),
        Ok(None) => {}
        Err(e) => warn!(table = %cli.table, error = %e, "Operation failed"),
    }
    Ok(())
}

/// Run `action` and return what should be printed, if anything.
async fn execute<G: LedgerGateway>(
    ledger: &Ledger<G>,
    table: &str,
    action: Action,
    reveal: bool,
) -> Result<Option<JsonValue>, LedgerError> {
    let output = match action {
        Action::Update { id, fields } => {
            let mut document = ledger.load(table, id).await?;
            for (key, value) in fields {
                document.set(key, value)?;
            }
            document.save().await?;
            render(&document, reveal)
        }
        Action::Insert { id, fields } => {
            let snapshot: Snapshot = fields
                .into_iter()
                .map(|(key, value)| (key, JsonValue::String(value)))
                .collect();
            let mut document = ledger.document_from_snapshot(table, &snapshot).await?;
            if let Some(id) = id {
                document.set(ledger.index_field(), id)?;
            }
            document.save().await?;
            render(&document, reveal)
        }
        Action::Find(fields) => {
            let documents = ledger.query(table).find_by(fields).await?;
            render_all(&documents, reveal)
        }
        Action::All => {
            let documents = ledger.query(table).all().await?;
            render_all(&documents, reveal)
        }
        Action::History(id) => {
            let revisions = ledger.query(table).history_by_id(&id).await?;
            JsonValue::Array(
                revisions
                    .iter()
                    .map(|revision| render_revision(revision, reveal))
                    .collect::<Result<_, _>>()?,
            )
        }
        Action::Load(id) => {
            let document = ledger.load(table, id).await?;
            render(&document, reveal)
        }
        Action::MissingId(flag) => {
            warn!(flag, "No document id specified");
            return Ok(None);
        }
        Action::Nothing => {
            warn!("Nothing to do; pass --id, --all, --find, --insert, --update or --history");
            return Ok(None);
        }
    };
    Ok(Some(output))
}

fn render<G: LedgerGateway>(document: &Document<G>, reveal: bool) -> JsonValue {
    if reveal {
        JsonValue::Object(document.with_metadata())
    } else {
        JsonValue::Object(document.snapshot())
    }
}

fn render_all<G: LedgerGateway>(documents: &[Document<G>], reveal: bool) -> JsonValue {
    JsonValue::Array(documents.iter().map(|d| render(d, reveal)).collect())
}

fn render_revision<G: LedgerGateway>(
    revision: &Revision<G>,
    reveal: bool,
) -> Result<JsonValue, LedgerError> {
    let mut entry = serde_json::Map::new();
    entry.insert("data".into(), render(&revision.document, reveal));
    entry.insert("metadata".into(), serde_json::to_value(&revision.metadata)?);
    Ok(JsonValue::Object(entry))
}
