//! CLI Commands Subcommands
//!
//! Inspect and prune the application commands stored remotely.

use anyhow::{Result, bail};
use clap::Subcommand;
use tracing::info;

use clawcord_core::{CommandPayload, Snowflake};
use clawcord_http::CommandHttp;

use crate::terminal_output::{Column, note_info, note_success, note_warn, render_table};

#[derive(Subcommand)]
pub enum CommandsCommand {
    /// List registered commands
    List {
        /// Guild to list instead of the global set
        #[arg(short, long)]
        guild: Option<Snowflake>,
    },
    /// Delete one registered command
    Delete {
        id: Snowflake,
        /// Guild the command is registered in
        #[arg(short, long)]
        guild: Option<Snowflake>,
    },
    /// Remove every registered command in a scope
    Clear {
        #[arg(short, long)]
        guild: Option<Snowflake>,
        /// Confirm the bulk removal
        #[arg(long)]
        yes: bool,
    },
}

pub async fn run(cmd: CommandsCommand, http: &dyn CommandHttp, app_id: Snowflake) -> Result<()> {
    match cmd {
        CommandsCommand::List { guild } => {
            let records = match guild {
                Some(guild) => http.get_guild_commands(app_id, guild).await?,
                None => http.get_global_commands(app_id).await?,
            };
            if records.is_empty() {
                note_info(&format!("No commands registered in {}", scope(guild)));
            } else {
                print!("{}", render_commands(&records));
            }
        }
        CommandsCommand::Delete { id, guild } => {
            match guild {
                Some(guild) => http.delete_guild_command(app_id, guild, id).await?,
                None => http.delete_global_command(app_id, id).await?,
            }
            note_success(&format!("Deleted command {id} from {}", scope(guild)));
        }
        CommandsCommand::Clear { guild, yes } => {
            if !yes {
                bail!("Refusing to clear {} without --yes", scope(guild));
            }
            let removed = match guild {
                Some(guild) => http.bulk_upsert_guild_commands(app_id, guild, &[]).await?,
                None => http.bulk_upsert_global_commands(app_id, &[]).await?,
            };
            if !removed.is_empty() {
                note_warn(&format!("Server kept {} command(s)", removed.len()));
            }
            info!(scope = %scope(guild), "Cleared application commands");
            note_success(&format!("Cleared all commands in {}", scope(guild)));
        }
    }
    Ok(())
}

fn scope(guild: Option<Snowflake>) -> String {
    match guild {
        Some(guild) => format!("guild {guild}"),
        None => "the global scope".to_string(),
    }
}

/// Table of id, kind, name, option count and description.
pub fn render_commands(records: &[CommandPayload]) -> String {
    let columns = vec![
        Column::right("Id"),
        Column::left("Kind"),
        Column::left("Name"),
        Column::right("Options"),
        Column::left("Description").max_width(48),
    ];
    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|r| {
            vec![
                r.id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string()),
                r.kind.to_string(),
                r.name.clone(),
                r.options.len().to_string(),
                r.description.clone(),
            ]
        })
        .collect();
    render_table(&columns, &rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clawcord_core::CommandKind;

    fn record(id: u64, name: &str, kind: CommandKind) -> CommandPayload {
        CommandPayload {
            id: Some(Snowflake(id)),
            application_id: None,
            guild_id: None,
            version: None,
            kind,
            name: name.to_string(),
            description: String::new(),
            options: vec![],
            default_permission: true,
        }
    }

    #[test]
    fn renders_kind_and_id() {
        let table = render_commands(&[
            record(1001, "ping", CommandKind::ChatInput),
            record(1002, "Inspect", CommandKind::User),
        ]);
        assert!(table.contains("1001"));
        assert!(table.contains("chat_input"));
        assert!(table.contains("Inspect"));
        assert!(table.contains("user"));
    }

    #[test]
    fn scope_names_guild() {
        assert_eq!(scope(Some(Snowflake(7))), "guild 7");
        assert_eq!(scope(None), "the global scope");
    }
}
