use std::env;
use std::path::Path;

use anyhow::{Context, Result};

use crate::auth::{Credential, Session};

const SERVICE: &str = "forcedata";

const KEYS: &[&str] = &["username", "password", "client_id", "client_secret", "url"];

/// Stores connected-app credentials in the OS keyring, one entry per field.
/// Empty fields clear any stale entry so the stored shape keeps selecting
/// the intended grant flow.
pub fn store_credentials(credential: &Credential) -> Result<()> {
    let url = credential.base_url.trim_end_matches('/');

    let values = [
        ("username", credential.username.as_str()),
        ("password", credential.password.as_str()),
        ("client_id", credential.client_id.as_str()),
        ("client_secret", credential.client_secret.as_str()),
        ("url", url),
    ];

    for (key, value) in values {
        let entry = keyring::Entry::new(SERVICE, key)
            .with_context(|| format!("Failed to create keyring entry for {}", key))?;

        if value.is_empty() {
            // ignore "no entry" here, it just means there was nothing stale
            let _ = entry.delete_credential();
        } else {
            entry
                .set_password(value)
                .with_context(|| format!("Failed to store {} in keyring", key))?;
        }
    }

    Ok(())
}

/// Loads credentials, trying environment variables first (for CI), then the
/// OS keyring.
pub fn load_credentials() -> Result<Credential> {
    // Environment takes precedence
    if let (Ok(client_id), Ok(url)) = (env::var("FORCEDATA_CLIENT_ID"), env::var("FORCEDATA_URL")) {
        return Ok(Credential {
            username: env::var("FORCEDATA_USERNAME").unwrap_or_default(),
            password: env::var("FORCEDATA_PASSWORD").unwrap_or_default(),
            client_id,
            client_secret: env::var("FORCEDATA_CLIENT_SECRET").unwrap_or_default(),
            base_url: url.trim_end_matches('/').to_string(),
        });
    }

    let mut fields = KEYS.iter().map(|key| {
        keyring::Entry::new(SERVICE, key)
            .ok()
            .and_then(|entry| entry.get_password().ok())
            .unwrap_or_default()
    });

    let credential = Credential {
        username: fields.next().unwrap_or_default(),
        password: fields.next().unwrap_or_default(),
        client_id: fields.next().unwrap_or_default(),
        client_secret: fields.next().unwrap_or_default(),
        base_url: fields.next().unwrap_or_default(),
    };

    if credential.client_id.is_empty() || credential.base_url.is_empty() {
        anyhow::bail!(
            "No credentials found. Run `forcedata auth` first, pass --file, or set \
             FORCEDATA_CLIENT_ID / FORCEDATA_URL (and FORCEDATA_USERNAME / \
             FORCEDATA_PASSWORD / FORCEDATA_CLIENT_SECRET for the credential flow)."
        );
    }

    Ok(credential)
}

/// Reads credentials from a JSON file in the
/// `{username, password, clientID, clientSecret, url}` shape.
pub fn read_credential_file(path: &Path) -> Result<Credential> {
    let contents = std::fs::read(path)
        .with_context(|| format!("Failed to read credential file {}", path.display()))?;

    serde_json::from_slice(&contents)
        .with_context(|| format!("Credential file {} is not valid JSON", path.display()))
}

/// Loads the session written by `forcedata login`: an explicit `--session`
/// file, else the environment, else `./session.json`.
pub fn load_session(path: Option<&Path>) -> Result<Session> {
    let session = if let Some(path) = path {
        read_session_file(path)?
    } else if let Ok(access_token) = env::var("FORCEDATA_ACCESS_TOKEN") {
        Session {
            access_token,
            instance_url: env::var("FORCEDATA_INSTANCE_URL").unwrap_or_default(),
            id: env::var("FORCEDATA_SESSION_ID").unwrap_or_default(),
            ..Default::default()
        }
    } else {
        let default = Path::new("session.json");
        if !default.exists() {
            anyhow::bail!(
                "No session found. Run `forcedata login` and pass the written file via \
                 --session, or set FORCEDATA_ACCESS_TOKEN / FORCEDATA_INSTANCE_URL / \
                 FORCEDATA_SESSION_ID."
            );
        }
        read_session_file(default)?
    };

    session.validate()?;
    Ok(session)
}

fn read_session_file(path: &Path) -> Result<Session> {
    let contents = std::fs::read(path)
        .with_context(|| format!("Failed to read session file {}", path.display()))?;

    serde_json::from_slice(&contents)
        .with_context(|| format!("Session file {} is not valid JSON", path.display()))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn reads_credential_file_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cred.json");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            r#"{{"clientID":"SomeClientId","url":"https://login.salesforce.com"}}"#
        )
        .unwrap();

        let credential = read_credential_file(&path).unwrap();
        assert!(credential.is_user_flow());
        assert_eq!(credential.base_url, "https://login.salesforce.com");
    }

    #[test]
    fn session_file_must_carry_required_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, r#"{{"access_token":"tok"}}"#).unwrap();

        let err = load_session(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("instance_url"));
    }

    #[test]
    fn valid_session_file_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            r#"{{"access_token":"tok","instance_url":"https://na1.salesforce.com","id":"005"}}"#
        )
        .unwrap();

        let session = load_session(Some(&path)).unwrap();
        assert_eq!(session.access_token, "tok");
    }
}
