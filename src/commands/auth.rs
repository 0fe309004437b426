use anyhow::Result;

use crate::auth::Credential;
use crate::credentials;
use crate::error::Error;

pub fn run(
    username: &str,
    password: &str,
    client_id: &str,
    client_secret: &str,
    url: &str,
) -> Result<()> {
    let credential = Credential {
        username: username.to_string(),
        password: password.to_string(),
        client_id: client_id.to_string(),
        client_secret: client_secret.to_string(),
        base_url: url.to_string(),
    };

    // reject shapes that would select neither grant flow at login time
    if !credential.is_cred_flow() && !credential.is_user_flow() {
        return Err(Error::InvalidCredential.into());
    }

    credentials::store_credentials(&credential)?;
    println!("Credentials stored successfully.");
    Ok(())
}
