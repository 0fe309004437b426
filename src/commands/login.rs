use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};

use crate::auth::{self, AuthConfig, BrowserOpener};
use crate::credentials;

pub async fn run(file: Option<&Path>, out: Option<&Path>) -> Result<()> {
    let credential = match file {
        Some(path) => credentials::read_credential_file(path)?,
        None => credentials::load_credentials()?,
    };

    if credential.is_user_flow() {
        println!("Opening your browser to authorize...");
    } else {
        println!("Authenticating...");
    }

    let session = auth::send_auth_request(&credential, &AuthConfig::default(), &BrowserOpener)
        .await
        .context("Authentication failed")?;

    match out {
        Some(path) => {
            let mut file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            session.write_to(&mut file)?;
            println!("Session written to {}", path.display());
        }
        None => {
            session.write_to(&mut std::io::stdout())?;
        }
    }

    Ok(())
}
