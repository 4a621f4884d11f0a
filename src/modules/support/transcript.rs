//! Ticket channel export.

use chrono::DateTime;
use futures::StreamExt;
use poise::serenity_prelude::{ChannelId, Context, Message};
use std::time::Duration;
use tokio::time;

use crate::error::{CogError, CogResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptLine {
    pub author_id: u64,
    pub author: String,
    pub bot: bool,
    pub timestamp: i64,
    pub content: String,
    pub attachments: Vec<String>,
}

impl From<&Message> for TranscriptLine {
    fn from(message: &Message) -> Self {
        Self {
            author_id: message.author.id.get(),
            author: message.author.name.clone(),
            bot: message.author.bot,
            timestamp: message.timestamp.unix_timestamp(),
            content: message.content.clone(),
            attachments: message.attachments.iter().map(|a| a.url.clone()).collect(),
        }
    }
}

/// Fetches up to `limit` messages, oldest first. The whole fetch is bounded
/// by `timeout`; running out of time fails the export instead of returning a
/// partial transcript.
pub async fn export(
    ctx: &Context,
    channel_id: ChannelId,
    limit: usize,
    timeout: Duration,
) -> CogResult<Vec<TranscriptLine>> {
    let fetch = async {
        let mut lines = Vec::new();
        let mut messages = Box::pin(channel_id.messages_iter(ctx).take(limit));
        while let Some(message) = messages.next().await {
            let message = message.map_err(|e| CogError::ExternalFetch(e.to_string()))?;
            lines.push(TranscriptLine::from(&message));
        }
        Ok::<_, CogError>(lines)
    };

    let mut lines = time::timeout(timeout, fetch).await.map_err(|_| {
        CogError::ExternalFetch(format!(
            "history of channel {} not fetched within {}s",
            channel_id,
            timeout.as_secs()
        ))
    })??;
    lines.reverse();
    Ok(lines)
}

pub fn render(index: u64, lines: &[TranscriptLine]) -> String {
    let mut out = format!("Transcript of ticket {index}\n\n");
    for line in lines {
        let when = DateTime::from_timestamp(line.timestamp, 0)
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        out.push_str(&format!("[{}] {}: {}\n", when, line.author, line.content));
        for url in &line.attachments {
            out.push_str(&format!("    attachment: {url}\n"));
        }
    }
    out
}

/// Humans other than the owner who wrote in the ticket, in order of first
/// appearance.
pub fn participants(owner_id: u64, lines: &[TranscriptLine]) -> Vec<u64> {
    let mut seen = Vec::new();
    for line in lines {
        if line.bot || line.author_id == owner_id || seen.contains(&line.author_id) {
            continue;
        }
        seen.push(line.author_id);
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(author_id: u64, bot: bool, content: &str) -> TranscriptLine {
        TranscriptLine {
            author_id,
            author: format!("user{author_id}"),
            bot,
            timestamp: 1_700_000_000,
            content: content.to_string(),
            attachments: Vec::new(),
        }
    }

    #[test]
    fn renders_in_order_with_attachments() {
        let mut first = line(1, false, "help");
        first.attachments.push("https://cdn.example/log.txt".into());
        let text = render(4, &[first, line(2, false, "on it")]);

        assert!(text.starts_with("Transcript of ticket 4"));
        assert!(text.contains("[2023-11-14 22:13:20] user1: help\n    attachment: https://cdn.example/log.txt"));
        assert!(text.find("help").unwrap() < text.find("on it").unwrap());
    }

    #[test]
    fn participants_skip_owner_and_bots() {
        let lines = vec![
            line(1, false, "a"),
            line(99, true, "b"),
            line(2, false, "c"),
            line(3, false, "d"),
            line(2, false, "e"),
        ];
        assert_eq!(participants(1, &lines), vec![2, 3]);
    }
}
