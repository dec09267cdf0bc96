//! Ban sink
//!
//! Production [`ResolutionSink`]: bans the subject when the vote passes and
//! rewrites the announcement with the results.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use super::render;
use crate::channels::ChatApi;
use crate::polls::{Resolution, ResolutionSink, SinkError};

pub struct BanSink {
    api: Arc<dyn ChatApi>,
}

impl BanSink {
    pub fn new(api: Arc<dyn ChatApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl ResolutionSink for BanSink {
    async fn resolve(&self, resolution: &Resolution) -> Result<(), SinkError> {
        let key = resolution.key;

        let ban_error = if resolution.outcome.is_action() {
            match self.api.ban_member(key.chat_id, resolution.subject.id).await {
                Ok(()) => {
                    info!(poll = %key, user_id = resolution.subject.id, "user banned by vote");
                    None
                }
                Err(e) => Some(e),
            }
        } else {
            None
        };

        // The announcement is updated even if the ban failed.
        let text = render::resolution_text(resolution, ban_error.is_some());
        let edited = self
            .api
            .edit_message_text(key.chat_id, key.message_id, &text, None)
            .await;

        if let Some(e) = ban_error {
            if let Err(edit_err) = edited {
                warn!(poll = %key, error = %edit_err, "failed to announce poll result");
            }
            return Err(SinkError::ActionFailed(e.to_string()));
        }
        edited?;
        Ok(())
    }
}
