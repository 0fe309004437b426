use std::time::Duration;

use reqwest::Client;
use tracing::{debug, info};

use crate::auth::credential::Credential;
use crate::auth::listener::{CallbackListener, DEFAULT_CALLBACK_PORT};
use crate::auth::session::Session;
use crate::error::{Error, Result};

pub const DEFAULT_AUTH_TIMEOUT: Duration = Duration::from_secs(180);

/// Dispatcher configuration, passed in explicitly by the caller.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub callback_port: u16,
    pub timeout: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            callback_port: DEFAULT_CALLBACK_PORT,
            timeout: DEFAULT_AUTH_TIMEOUT,
        }
    }
}

/// Hands the authorization URL to the user's browser.
pub trait Opener {
    fn open(&self, url: &str) -> std::io::Result<()>;
}

/// Default opener backed by the platform browser.
pub struct BrowserOpener;

impl Opener for BrowserOpener {
    fn open(&self, url: &str) -> std::io::Result<()> {
        open::that(url)
    }
}

/// Resolves a credential into a session using whichever grant flow its shape
/// selects. A credential satisfying neither flow fails before any network or
/// browser activity.
pub async fn send_auth_request(
    credential: &Credential,
    config: &AuthConfig,
    opener: &dyn Opener,
) -> Result<Session> {
    if credential.is_user_flow() {
        send_user_flow(credential, config, opener).await
    } else if credential.is_cred_flow() {
        send_cred_flow(credential, config).await
    } else {
        Err(Error::InvalidCredential)
    }
}

/// Exchanges username/password credentials for a session in a single POST.
async fn send_cred_flow(credential: &Credential, config: &AuthConfig) -> Result<Session> {
    let redirect_uri = format!("http://localhost:{}/callback", config.callback_port);
    let url = credential.encode(&redirect_uri)?;

    info!("requesting token via credential flow");

    let response = Client::new()
        .post(url)
        .send()
        .await
        .map_err(|source| Error::Http {
            op: "authenticate",
            source,
        })?;

    let status = response.status();
    let body = response.bytes().await.map_err(|source| Error::Http {
        op: "authenticate",
        source,
    })?;

    if !status.is_success() {
        debug!(%status, "token endpoint rejected the request");
        return Err(Error::UnexpectedStatus {
            op: "authenticate",
            status: status.as_u16(),
        });
    }

    serde_json::from_slice(&body).map_err(|source| Error::Parse {
        op: "authenticate",
        source,
    })
}

/// Runs the browser-redirect flow: bind the callback listener, open the
/// authorization URL, then race the redirect against the configured timeout.
/// Exactly one of the two outcomes is observed, and the listener is torn
/// down on both paths.
async fn send_user_flow(
    credential: &Credential,
    config: &AuthConfig,
    opener: &dyn Opener,
) -> Result<Session> {
    let listener = CallbackListener::bind(config.callback_port).await?;
    let url = credential.encode(&listener.redirect_uri())?;

    info!(port = listener.port(), "opening browser for user flow");
    opener.open(url.as_str()).map_err(Error::BrowserOpen)?;

    let (callback, handle) = listener.spawn();

    match tokio::time::timeout(config.timeout, callback).await {
        Ok(Ok(target)) => {
            debug!("received redirect callback");
            Ok(Session::from_fragment(&target))
        }
        Ok(Err(_)) => {
            handle.abort();
            Err(Error::ListenerClosed)
        }
        Err(_) => {
            handle.abort();
            Err(Error::AuthTimeout(config.timeout))
        }
    }
}
