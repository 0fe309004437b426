use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// An authenticated session, as returned by either grant flow.
///
/// Immutable once obtained. Fields the provider did not send are left empty
/// rather than treated as errors, to tolerate provider variations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub instance_url: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub issued_at: String,
    #[serde(default)]
    pub signature: String,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub state: String,
}

impl Session {
    /// Decodes a session from the URL fragment of a redirect callback.
    ///
    /// The input is split at the first `#` (or taken whole if there is none)
    /// and the remainder read as `key=value` pairs joined by `&`. Unknown
    /// keys are ignored and missing keys leave their field empty.
    pub fn from_fragment(url: &str) -> Session {
        let fragment = match url.find('#') {
            Some(i) => &url[i + 1..],
            None => url,
        };

        let mut session = Session::default();

        for pair in fragment.split('&') {
            let (key, value) = match pair.split_once('=') {
                Some(kv) => kv,
                None => continue,
            };

            match key {
                "access_token" => session.access_token = value.to_string(),
                "instance_url" => session.instance_url = value.to_string(),
                "id" => session.id = value.to_string(),
                "issued_at" => session.issued_at = value.to_string(),
                "signature" => session.signature = value.to_string(),
                "token_type" => session.token_type = value.to_string(),
                "refresh_token" => session.refresh_token = value.to_string(),
                "scope" => session.scope = value.to_string(),
                "state" => session.state = value.to_string(),
                _ => {}
            }
        }

        session
    }

    /// Writes the session as indented JSON.
    pub fn write_to(&self, writer: &mut impl Write) -> Result<()> {
        serde_json::to_writer_pretty(&mut *writer, self).map_err(|source| Error::Parse {
            op: "write session",
            source,
        })?;
        writer.write_all(b"\n")?;
        Ok(())
    }

    /// Checks the fields the job API requires, naming any that are missing.
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();

        if self.access_token.is_empty() {
            missing.push("access_token");
        }
        if self.instance_url.is_empty() {
            missing.push("instance_url");
        }
        if self.id.is_empty() {
            missing.push("id");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::MissingSession(missing.join(", ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_fragment_fields_and_leaves_rest_empty() {
        let session =
            Session::from_fragment("http://localhost:42111/callback#access_token=T&instance_url=U&id=I");

        assert_eq!(session.access_token, "T");
        assert_eq!(session.instance_url, "U");
        assert_eq!(session.id, "I");
        assert_eq!(session.issued_at, "");
        assert_eq!(session.signature, "");
        assert_eq!(session.refresh_token, "");
    }

    #[test]
    fn decodes_input_without_fragment_marker() {
        let session = Session::from_fragment("access_token=tok&signature=sig");

        assert_eq!(session.access_token, "tok");
        assert_eq!(session.signature, "sig");
    }

    #[test]
    fn ignores_unknown_keys_and_bare_words() {
        let session = Session::from_fragment("#access_token=tok&sfdc_community_url=x&noequals");

        assert_eq!(session.access_token, "tok");
        assert_eq!(session, Session {
            access_token: "tok".into(),
            ..Default::default()
        });
    }

    #[test]
    fn write_round_trips_through_json() {
        let session = Session {
            access_token: "token123".into(),
            instance_url: "https://login.salesforce.com".into(),
            id: "123".into(),
            issued_at: "12345".into(),
            signature: "QWERTY".into(),
            ..Default::default()
        };

        let mut buf = Vec::new();
        session.write_to(&mut buf).unwrap();

        let parsed: Session = serde_json::from_slice(&buf).unwrap();
        assert_eq!(parsed, session);
    }

    #[test]
    fn validate_names_missing_fields() {
        let session = Session {
            access_token: "token123".into(),
            ..Default::default()
        };

        let err = session.validate().unwrap_err();
        assert!(err.to_string().contains("instance_url, id"));
    }
}
