use crate::api;
use crate::cli::{actions::Action, globals::GlobalArgs};
use anyhow::{Context, Result};
use url::Url;

/// Handle the server action
///
/// # Errors
///
/// Returns an error if the DSN is malformed or the server fails to start.
pub async fn handle(action: Action, globals: &GlobalArgs) -> Result<()> {
    match action {
        Action::Server { port, dsn } => {
            // Fail on a malformed DSN here, before touching the network.
            let dsn = Url::parse(&dsn).context("Invalid database DSN")?;

            api::new(port, dsn.to_string(), globals).await?;

            Ok(())
        }
    }
}
