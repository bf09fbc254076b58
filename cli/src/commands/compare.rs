//! Compare command implementation

use super::ServerArg;
use crate::output;
use anyhow::{bail, Context, Result};
use clap::Args;
use perfkit_collector::store::StoredProfile;
use perfkit_shared::{ComparisonReport, ProfileKind};
use serde::Deserialize;
use std::path::Path;

#[derive(Args, Debug)]
pub struct CompareArgs {
    /// Profile IDs to compare (at least two)
    #[arg(conflicts_with = "session")]
    pub ids: Vec<String>,

    /// Compare every profile of a session, oldest first
    #[arg(short, long)]
    pub session: Option<String>,

    /// Restrict the session to one profile type
    #[arg(short = 't', long = "type", requires = "session")]
    pub kind: Option<ProfileKind>,

    /// Print the raw JSON report
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub server: ServerArg,
}

#[derive(Deserialize)]
struct CompareResponse {
    profiles: Vec<StoredProfile>,
    report: ComparisonReport,
}

impl CompareArgs {
    /// Path and query of the compare endpoint for these arguments.
    fn request_path(&self) -> Result<String> {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        if let Some(session) = &self.session {
            query.append_pair("session", session);
            if let Some(kind) = self.kind {
                query.append_pair("type", kind.as_str());
            }
        } else if self.ids.len() >= 2 {
            query.append_pair("ids", &self.ids.join(","));
        } else {
            bail!("provide at least two profile IDs, or --session");
        }
        Ok(format!("/api/profiles/compare?{}", query.finish()))
    }
}

pub async fn run(args: CompareArgs, config: Option<&Path>) -> Result<()> {
    let path = args.request_path()?;
    let client = args.server.client(config)?;
    let body = client
        .get_bytes(&path)
        .await
        .context("Comparison failed")?;

    if args.json {
        let value: serde_json::Value = serde_json::from_slice(&body)?;
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let res: CompareResponse =
        serde_json::from_slice(&body).context("decode comparison response")?;
    let names: Vec<String> = res.profiles.iter().map(|p| p.name.clone()).collect();
    print!("{}", output::comparison_table(&res.report, &names));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(ids: &[&str], session: Option<&str>, kind: Option<ProfileKind>) -> CompareArgs {
        CompareArgs {
            ids: ids.iter().map(|s| s.to_string()).collect(),
            session: session.map(str::to_string),
            kind,
            json: false,
            server: ServerArg::default(),
        }
    }

    #[test]
    fn test_request_path_by_ids() {
        let path = args(&["a", "b", "c"], None, None).request_path().unwrap();
        assert_eq!(path, "/api/profiles/compare?ids=a%2Cb%2Cc");
    }

    #[test]
    fn test_request_path_by_session() {
        let path = args(&[], Some("load test"), Some(ProfileKind::Heap))
            .request_path()
            .unwrap();
        assert_eq!(path, "/api/profiles/compare?session=load+test&type=heap");
    }

    #[test]
    fn test_request_path_needs_two_ids() {
        assert!(args(&["a"], None, None).request_path().is_err());
        assert!(args(&[], None, None).request_path().is_err());
    }
}
