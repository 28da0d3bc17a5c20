use std::time::Duration;

use tracing::debug;

use crate::achievement::PendingAchievement;
use crate::challenge::Challenge;
use crate::error::{Error, Result};
use crate::score::PendingScore;
use crate::service::{RemoteProgress, RemoteScore, ScoreService};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// [`ScoreService`] backed by a REST endpoint. One agent is shared across
/// calls; requests carry a bearer token when one is configured.
pub struct HttpScoreService {
    agent: ureq::Agent,
    base: String,
    token: Option<String>,
}

impl HttpScoreService {
    pub fn new(endpoint: &str, token: Option<&str>) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(REQUEST_TIMEOUT))
            .build();
        Self {
            agent: config.into(),
            base: endpoint.trim_end_matches('/').to_string(),
            token: token.map(str::to_string),
        }
    }

    fn player_url(&self, player: &str, resource: &str) -> String {
        format!("{}/players/{}/{}", self.base, player, resource)
    }

    fn with_auth<B>(&self, req: ureq::RequestBuilder<B>) -> ureq::RequestBuilder<B> {
        match &self.token {
            Some(token) => req.header("Authorization", &format!("Bearer {token}")),
            None => req,
        }
    }
}

/// Fold transport-level failures into [`Error::Offline`] so they queue like
/// any other loss of connectivity; anything the server itself said becomes
/// [`Error::Rejected`].
fn map_transport(err: ureq::Error) -> Error {
    match err {
        ureq::Error::StatusCode(code) => Error::Rejected(format!("HTTP {code}")),
        ureq::Error::Timeout(_)
        | ureq::Error::HostNotFound
        | ureq::Error::ConnectionFailed
        | ureq::Error::Io(_) => Error::Offline,
        other => Error::Rejected(other.to_string()),
    }
}

impl ScoreService for HttpScoreService {
    fn submit_score(&self, entry: &PendingScore) -> Result<()> {
        let url = self.player_url(&entry.player, "scores");
        let body = serde_json::json!({
            "leaderboard": entry.leaderboard,
            "value": entry.value,
            "sort": entry.sort,
        });
        self.with_auth(self.agent.post(&url))
            .send_json(&body)
            .map_err(map_transport)?;
        debug!(leaderboard = %entry.leaderboard, value = entry.value, "score submitted");
        Ok(())
    }

    fn submit_achievement(&self, entry: &PendingAchievement) -> Result<()> {
        let url = self.player_url(&entry.player, "achievements");
        let body = serde_json::json!({
            "achievement": entry.achievement,
            "percent": entry.percent,
        });
        self.with_auth(self.agent.post(&url))
            .send_json(&body)
            .map_err(map_transport)?;
        debug!(achievement = %entry.achievement, percent = entry.percent, "achievement submitted");
        Ok(())
    }

    fn fetch_player_scores(&self, player: &str) -> Result<Vec<RemoteScore>> {
        let url = self.player_url(player, "scores");
        let mut response = self
            .with_auth(self.agent.get(&url))
            .call()
            .map_err(map_transport)?;
        response.body_mut().read_json().map_err(map_transport)
    }

    fn fetch_player_achievements(&self, player: &str) -> Result<Vec<RemoteProgress>> {
        let url = self.player_url(player, "achievements");
        let mut response = self
            .with_auth(self.agent.get(&url))
            .call()
            .map_err(map_transport)?;
        response.body_mut().read_json().map_err(map_transport)
    }

    fn fetch_challenges(&self, player: &str) -> Result<Vec<Challenge>> {
        let url = self.player_url(player, "challenges");
        let mut response = self
            .with_auth(self.agent.get(&url))
            .call()
            .map_err(map_transport)?;
        response.body_mut().read_json().map_err(map_transport)
    }

    fn fetch_player_photo(&self, player: &str) -> Result<Vec<u8>> {
        let url = self.player_url(player, "photo");
        let mut response = self
            .with_auth(self.agent.get(&url))
            .call()
            .map_err(map_transport)?;
        let bytes = response.body_mut().read_to_vec().map_err(map_transport)?;
        debug!(player, len = bytes.len(), "photo fetched");
        Ok(bytes)
    }

    fn reset_achievements(&self, player: &str) -> Result<()> {
        let url = self.player_url(player, "achievements");
        self.with_auth(self.agent.delete(&url))
            .call()
            .map_err(map_transport)?;
        debug!(player, "remote achievements reset");
        Ok(())
    }
}
