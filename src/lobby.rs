//! HTTP establishment: create or join a session before opening its channel.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::protocol::ParticipantId;
use crate::session::LocalIdentity;

const LOG_TARGET: &str = "lobby";

#[derive(Debug, Error)]
pub enum LobbyError {
    #[error("invalid server url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("server url scheme `{0}` is not http or https")]
    UnsupportedScheme(String),
    #[error("{action} request failed: {source}")]
    Request {
        action: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("session `{0}` not found")]
    NotFound(String),
    #[error("display name `{0}` is already taken")]
    NameTaken(String),
    #[error("join rejected with status `{0}`")]
    Rejected(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreatedSession {
    #[serde(alias = "roomID")]
    pub game_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JoinedSession {
    #[serde(default)]
    pub status: String,
    pub game_id: String,
    #[serde(default)]
    pub participant_id: Option<ParticipantId>,
}

#[derive(Serialize)]
struct JoinRequest<'a> {
    player_name: &'a str,
}

/// Where to connect once a session has been joined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTicket {
    pub session_id: String,
    /// The assigned id, or the display name to find it by in the roster.
    pub identity: LocalIdentity,
    pub channel_url: Url,
}

pub struct LobbyClient {
    base: Url,
    http: reqwest::Client,
}

impl LobbyClient {
    pub fn new(base: Url) -> Result<Self, LobbyError> {
        match base.scheme() {
            "http" | "https" => Ok(Self {
                base,
                http: reqwest::Client::new(),
            }),
            other => Err(LobbyError::UnsupportedScheme(other.to_string())),
        }
    }

    pub async fn create_session(&self) -> Result<String, LobbyError> {
        let request = |source| LobbyError::Request {
            action: "create",
            source,
        };
        let created: CreatedSession = self
            .http
            .post(self.base.join("create")?)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(request)?
            .json()
            .await
            .map_err(request)?;

        info!(target = LOG_TARGET, session_id = %created.game_id, "session created");
        Ok(created.game_id)
    }

    pub async fn join_session(
        &self,
        session_id: &str,
        display_name: &str,
    ) -> Result<SessionTicket, LobbyError> {
        let request = |source| LobbyError::Request {
            action: "join",
            source,
        };
        let response = self
            .http
            .post(self.base.join(&format!("join/{session_id}"))?)
            .json(&JoinRequest {
                player_name: display_name,
            })
            .send()
            .await
            .map_err(request)?;

        match response.status() {
            reqwest::StatusCode::NOT_FOUND => {
                return Err(LobbyError::NotFound(session_id.to_string()))
            }
            reqwest::StatusCode::CONFLICT => {
                return Err(LobbyError::NameTaken(display_name.to_string()))
            }
            _ => {}
        }

        let joined: JoinedSession = response
            .error_for_status()
            .map_err(request)?
            .json()
            .await
            .map_err(request)?;
        if !joined.status.is_empty() && joined.status != "joined" {
            return Err(LobbyError::Rejected(joined.status));
        }

        let ticket = self.ticket(joined, display_name)?;
        info!(
            target = LOG_TARGET,
            session_id = %ticket.session_id,
            identity = ?ticket.identity,
            "joined session"
        );
        Ok(ticket)
    }

    /// Channel endpoint for `session_id`: the base with its scheme switched
    /// to ws/wss.
    pub fn channel_url(&self, session_id: &str, display_name: &str) -> Result<Url, LobbyError> {
        let mut url = self.base.join("ws")?;
        let scheme = if self.base.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme)
            .map_err(|_| LobbyError::UnsupportedScheme(scheme.to_string()))?;
        url.query_pairs_mut()
            .clear()
            .append_pair("game_id", session_id)
            .append_pair("name", display_name);
        Ok(url)
    }

    fn ticket(&self, joined: JoinedSession, display_name: &str) -> Result<SessionTicket, LobbyError> {
        let channel_url = self.channel_url(&joined.game_id, display_name)?;
        Ok(SessionTicket {
            identity: match joined.participant_id {
                Some(id) => LocalIdentity::Id(id),
                None => LocalIdentity::DisplayName(display_name.to_string()),
            },
            session_id: joined.game_id,
            channel_url,
        })
    }
}
