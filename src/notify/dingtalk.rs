//! DingTalk robot webhook.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::notify::{Notifier, NotifyError, Summary};

#[derive(Debug, Serialize)]
struct MarkdownMessage<'a> {
    msgtype: &'static str,
    markdown: MarkdownBody<'a>,
}

#[derive(Debug, Serialize)]
struct MarkdownBody<'a> {
    title: &'a str,
    text: String,
}

#[derive(Debug, Deserialize)]
struct WebhookReply {
    #[serde(default)]
    errcode: i64,
    #[serde(default)]
    errmsg: String,
}

pub struct DingTalkNotifier {
    client: Client,
    webhook: String,
}

impl DingTalkNotifier {
    pub fn new(webhook: impl Into<String>) -> Result<Self, NotifyError> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            client,
            webhook: webhook.into(),
        })
    }
}

fn message<'a>(title: &'a str, summary: &Summary) -> MarkdownMessage<'a> {
    MarkdownMessage {
        msgtype: "markdown",
        markdown: MarkdownBody {
            title,
            text: summary.render_markdown(),
        },
    }
}

#[async_trait]
impl Notifier for DingTalkNotifier {
    async fn notify(&self, title: &str, summary: &Summary) -> Result<(), NotifyError> {
        let reply: WebhookReply = self
            .client
            .post(&self.webhook)
            .json(&message(title, summary))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if reply.errcode != 0 {
            return Err(NotifyError::Rejected {
                code: reply.errcode,
                message: reply.errmsg,
            });
        }

        tracing::info!("Summary sent to DingTalk");
        Ok(())
    }
}
