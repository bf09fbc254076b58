//! Get command implementation

use super::ServerArg;
use crate::client::segment;
use crate::output;
use anyhow::{bail, Context, Result};
use clap::Args;
use perfkit_collector::store::StoredProfile;
use std::io::Write;
use std::path::Path;

#[derive(Args, Debug)]
pub struct GetArgs {
    /// Session the profile belongs to
    pub session: String,

    /// Profile ID
    pub id: String,

    /// Write the raw profile bytes to stdout
    #[arg(long, conflicts_with = "json")]
    pub raw: bool,

    /// Print the full stored record as JSON
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub server: ServerArg,
}

pub async fn run(args: GetArgs, config: Option<&Path>) -> Result<()> {
    let client = args.server.client(config)?;
    let path = format!("/api/profiles/{}", segment(&args.id));
    let profile: StoredProfile = client
        .get_json(&path)
        .await
        .context("Failed to get profile")?;

    if profile.session.as_deref() != Some(args.session.as_str()) {
        bail!(
            "profile {} does not belong to session {:?}",
            args.id,
            args.session
        );
    }

    if args.raw {
        let raw = client.get_bytes(&format!("{}?raw=true", path)).await?;
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(&raw)?;
        stdout.flush()?;
        return Ok(());
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&profile)?);
    } else {
        print!("{}", output::profile_summary(&profile));
    }
    Ok(())
}
