//! `gatehouse policy`: inspect and edit policy records

use anyhow::{Context, Result};
use clap::Subcommand;
use gatehouse_core::{Policy, PolicyEngineEffects, PolicyId};
use std::path::PathBuf;
use tracing::info;

/// `gatehouse policy` subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum PolicyCommand {
    /// Print a policy record as JSON
    Get {
        /// Record id, e.g. `user:U1:widgets`
        id: String,
    },

    /// Upsert a policy record read from a JSON file
    Put {
        /// Path to the record
        file: PathBuf,
    },

    /// Remove a policy record
    Delete {
        /// Record id
        id: String,
    },

    /// Print the record id a caller gets on a service
    Id {
        /// Caller id
        #[arg(long)]
        user: String,

        /// Service name
        #[arg(long)]
        service: String,
    },
}

/// Run one policy subcommand and return what to print
pub async fn run(cmd: &PolicyCommand, engine: &dyn PolicyEngineEffects) -> Result<String> {
    match cmd {
        PolicyCommand::Get { id } => {
            let id = PolicyId::from_raw(id.clone());
            match engine.get_policy(&id).await? {
                Some(policy) => Ok(serde_json::to_string_pretty(&policy)?),
                None => Ok("no policy".to_string()),
            }
        }
        PolicyCommand::Put { file } => {
            let content = std::fs::read_to_string(file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let policy: Policy = serde_json::from_str(&content)
                .with_context(|| format!("{} is not a policy record", file.display()))?;
            engine.upsert_policy(&policy).await?;
            info!(policy = %policy.id, "Policy upserted");
            Ok(format!("upserted {}", policy.id))
        }
        PolicyCommand::Delete { id } => {
            engine.delete_policy(&PolicyId::from_raw(id.clone())).await?;
            info!(policy = %id, "Policy deleted");
            Ok(format!("deleted {id}"))
        }
        PolicyCommand::Id { user, service } => Ok(PolicyId::for_caller(user, service).to_string()),
    }
}
