//! HTTP client for the win-probability service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use shared_types::{MatchupFeatures, Prediction, PredictionProvider};
use tracing::{debug, warn};

use crate::config::PredictionSettings;

/// `POST {p1_rating, p2_rating, p1_win_rate, p2_win_rate}` to the service.
///
/// Every failure (no URL configured, connect error, timeout, non-2xx,
/// malformed or out-of-range body) is reported as unavailable.
pub struct HttpPredictor {
    client: Client,
    url: Option<String>,
}

impl HttpPredictor {
    pub fn new(settings: &PredictionSettings) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .connect_timeout(settings.timeout.min(Duration::from_secs(1)))
            .build()?;
        Ok(Self {
            client,
            url: settings.url.clone(),
        })
    }

    /// Whether a service URL is configured.
    pub fn is_configured(&self) -> bool {
        self.url.is_some()
    }
}

#[async_trait]
impl PredictionProvider for HttpPredictor {
    async fn predict(&self, features: &MatchupFeatures) -> Option<Prediction> {
        let url = self.url.as_deref()?;

        let response = match self.client.post(url).json(features).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, timeout = e.is_timeout(), "[predict] Service unreachable");
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "[predict] Service returned an error status");
            return None;
        }

        match response.json::<Prediction>().await {
            Ok(prediction) if prediction.is_valid() => {
                debug!(
                    win_probability = prediction.win_probability,
                    confidence = prediction.confidence_score,
                    "[predict] Prediction received"
                );
                Some(prediction)
            }
            Ok(prediction) => {
                warn!(
                    win_probability = prediction.win_probability,
                    "[predict] Probability out of range, ignoring"
                );
                None
            }
            Err(e) => {
                warn!(error = %e, "[predict] Malformed response body");
                None
            }
        }
    }
}
