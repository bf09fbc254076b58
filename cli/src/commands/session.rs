//! Session commands

use super::ServerArg;
use crate::client::segment;
use anyhow::Result;
use clap::Subcommand;
use perfkit_collector::store::StoredProfile;
use std::path::Path;

#[derive(Subcommand, Debug)]
pub enum SessionCommand {
    /// List all sessions
    Ls {
        #[command(flatten)]
        server: ServerArg,
    },

    /// List profiles in a session
    Profiles {
        /// Session name
        session: String,

        #[command(flatten)]
        server: ServerArg,
    },
}

pub async fn run(cmd: SessionCommand, config: Option<&Path>) -> Result<()> {
    match cmd {
        SessionCommand::Ls { server } => {
            let sessions: Vec<String> = server.client(config)?.get_json("/api/sessions").await?;
            if sessions.is_empty() {
                println!("No sessions found.");
            }
            for session in sessions {
                println!("{}", session);
            }
        }
        SessionCommand::Profiles { session, server } => {
            let path = format!("/api/sessions/{}/profiles", segment(&session));
            let profiles: Vec<StoredProfile> = server.client(config)?.get_json(&path).await?;
            if profiles.is_empty() {
                println!("No profiles found in session {:?}.", session);
            }
            for p in &profiles {
                println!("{}", profile_line(p));
            }
        }
    }
    Ok(())
}

pub fn profile_line(p: &StoredProfile) -> String {
    format!(
        "{}  {:<12}  {}  {}",
        p.id,
        p.kind.as_str(),
        p.created_at.format("%Y-%m-%d %H:%M:%S"),
        p.name
    )
}
