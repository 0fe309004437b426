use serde::Deserialize;
use url::Url;

use crate::error::{Error, Result};

const OAUTH_PATH: &str = "/services/oauth2";

/// Connected-app credentials, loaded from flags, environment, keyring or a
/// JSON file. The populated fields decide which grant flow applies.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Credential {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default, rename = "clientID")]
    pub client_id: String,
    #[serde(default, rename = "clientSecret")]
    pub client_secret: String,
    #[serde(default, rename = "url")]
    pub base_url: String,
}

impl Credential {
    /// True when these credentials select username/password authentication.
    pub fn is_cred_flow(&self) -> bool {
        !self.username.is_empty()
            && !self.password.is_empty()
            && !self.client_id.is_empty()
            && !self.client_secret.is_empty()
    }

    /// True when these credentials select browser-redirect authentication.
    pub fn is_user_flow(&self) -> bool {
        self.username.is_empty()
            && self.password.is_empty()
            && !self.client_id.is_empty()
            && self.client_secret.is_empty()
    }

    /// Builds the fully-qualified authorization URL for the selected flow.
    ///
    /// The credential flow targets the token endpoint with the grant encoded
    /// as query parameters; the user flow targets the authorize endpoint and
    /// carries `redirect_uri`. A credential matching neither flow is an
    /// [`Error::InvalidCredential`].
    pub fn encode(&self, redirect_uri: &str) -> Result<Url> {
        let base = self.base_url.trim_end_matches('/');

        if self.is_user_flow() {
            let mut url = Url::parse(&format!("{}{}/authorize", base, OAUTH_PATH))
                .map_err(Error::InvalidBaseUrl)?;
            url.query_pairs_mut()
                .append_pair("response_type", "token")
                .append_pair("client_id", &self.client_id)
                .append_pair("redirect_uri", redirect_uri);
            Ok(url)
        } else if self.is_cred_flow() {
            let mut url = Url::parse(&format!("{}{}/token", base, OAUTH_PATH))
                .map_err(Error::InvalidBaseUrl)?;
            url.query_pairs_mut()
                .append_pair("grant_type", "password")
                .append_pair("client_id", &self.client_id)
                .append_pair("client_secret", &self.client_secret)
                .append_pair("username", &self.username)
                .append_pair("password", &self.password);
            Ok(url)
        } else {
            Err(Error::InvalidCredential)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cred_flow_credential() -> Credential {
        Credential {
            username: "test@example.com".into(),
            password: "MyPassword123!!!".into(),
            client_id: "SomeReallyLongClientId123456".into(),
            client_secret: "somethingVerySecret".into(),
            base_url: "https://login.salesforce.com".into(),
        }
    }

    #[test]
    fn cred_flow_encode_round_trips_every_field() {
        let c = cred_flow_credential();
        let url = c.encode("http://localhost:42111/callback").unwrap();

        let q: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();

        assert_eq!(q["grant_type"], "password");
        assert_eq!(q["client_id"], c.client_id);
        assert_eq!(q["client_secret"], c.client_secret);
        assert_eq!(q["username"], c.username);
        assert_eq!(q["password"], c.password);
        assert_eq!(url.path(), "/services/oauth2/token");
    }

    #[test]
    fn user_flow_encode_targets_authorize_endpoint() {
        let c = Credential {
            client_id: "SomeClientId".into(),
            base_url: "https://login.salesforce.com/".into(),
            ..Default::default()
        };

        let url = c.encode("http://localhost:42111/callback").unwrap();
        let q: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();

        assert_eq!(url.path(), "/services/oauth2/authorize");
        assert_eq!(q["response_type"], "token");
        assert_eq!(q["client_id"], "SomeClientId");
        assert_eq!(q["redirect_uri"], "http://localhost:42111/callback");
    }

    #[test]
    fn flow_predicates() {
        assert!(cred_flow_credential().is_cred_flow());
        assert!(!cred_flow_credential().is_user_flow());

        let user = Credential {
            client_id: "id".into(),
            base_url: "https://login.salesforce.com".into(),
            ..Default::default()
        };
        assert!(user.is_user_flow());
        assert!(!user.is_cred_flow());
    }

    #[test]
    fn ambiguous_shape_fails_to_encode() {
        // username without a password satisfies neither flow
        let c = Credential {
            username: "test@example.com".into(),
            client_id: "id".into(),
            base_url: "https://login.salesforce.com".into(),
            ..Default::default()
        };

        assert!(matches!(
            c.encode("http://localhost:42111/callback"),
            Err(Error::InvalidCredential)
        ));
    }

    #[test]
    fn deserializes_config_file_shape() {
        let c: Credential = serde_json::from_str(
            r#"{"username":"u","password":"p","clientID":"ci","clientSecret":"cs","url":"https://example.my.salesforce.com"}"#,
        )
        .unwrap();

        assert!(c.is_cred_flow());
        assert_eq!(c.base_url, "https://example.my.salesforce.com");
    }
}
