use chrono::{DateTime, Datelike};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::{database::Database, error::CogResult};

/// First instant of the UTC month containing `at`.
pub fn month_start(at: i64) -> i64 {
    DateTime::from_timestamp(at, 0)
        .and_then(|t| t.date_naive().with_day(1))
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc().timestamp())
        .unwrap_or(at)
}

pub fn format_duration(secs: u64) -> String {
    let days = secs / 86400;
    let hours = (secs % 86400) / 3600;
    let mins = (secs % 3600) / 60;

    if days > 0 {
        format!("{}d {}h", days, hours)
    } else if hours > 0 {
        format!("{}h {}m", hours, mins)
    } else {
        format!("{}m", mins)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberStats {
    pub messages: u64,
    pub voice_seconds: u64,
    /// Start of the open voice session.
    pub voice_since: Option<i64>,
}

impl MemberStats {
    /// Opens a session on entering voice and closes it on leaving. Returns
    /// whether anything changed; moving between channels changes nothing.
    pub fn track_voice(&mut self, in_voice: bool, at: i64) -> bool {
        match (in_voice, self.voice_since) {
            (true, None) => {
                self.voice_since = Some(at);
                true
            }
            (false, Some(since)) => {
                self.voice_seconds += (at - since).max(0) as u64;
                self.voice_since = None;
                true
            }
            _ => false,
        }
    }

    /// Voice time including the open session.
    pub fn voice_total(&self, now: i64) -> u64 {
        self.voice_seconds + self.voice_since.map_or(0, |since| (now - since).max(0) as u64)
    }

    fn reset(&mut self, period_start: i64) {
        self.messages = 0;
        self.voice_seconds = 0;
        if let Some(since) = self.voice_since.as_mut() {
            *since = (*since).max(period_start);
        }
    }
}

#[derive(Default, Serialize, Deserialize, Clone, Debug)]
pub struct StatsDatabase {
    pub period_start: i64,
    /// guild id -> member id -> counters
    pub members: HashMap<u64, HashMap<u64, MemberStats>>,
}

impl StatsDatabase {
    /// Starts a new counting period if `now` lies in a later month.
    pub fn reset_if_due(&mut self, now: i64) -> bool {
        let start = month_start(now);
        if start <= self.period_start {
            return false;
        }
        self.period_start = start;
        for members in self.members.values_mut() {
            for stats in members.values_mut() {
                stats.reset(start);
            }
            members.retain(|_, stats| *stats != MemberStats::default());
        }
        self.members.retain(|_, members| !members.is_empty());
        true
    }
}

/// Message counts not yet written, shared by the handler and the flush task.
#[derive(Debug, Clone, Default)]
pub struct PendingMessages(Arc<DashMap<(u64, u64), u64>>);

impl PendingMessages {
    pub fn record(&self, guild_id: u64, user_id: u64) {
        *self.0.entry((guild_id, user_id)).or_default() += 1;
    }

    pub fn pending(&self, guild_id: u64, user_id: u64) -> u64 {
        self.0.get(&(guild_id, user_id)).map_or(0, |count| *count)
    }

    pub fn drain(&self) -> Vec<((u64, u64), u64)> {
        let keys: Vec<(u64, u64)> = self.0.iter().map(|entry| *entry.key()).collect();
        keys.into_iter().filter_map(|key| self.0.remove(&key)).collect()
    }

    /// Puts back counts whose flush failed.
    pub fn restore(&self, counts: Vec<((u64, u64), u64)>) {
        for (key, count) in counts {
            *self.0.entry(key).or_default() += count;
        }
    }
}

pub type StatsRegistry = Database<StatsDatabase>;

impl StatsRegistry {
    pub async fn member(&self, guild_id: u64, user_id: u64) -> Option<MemberStats> {
        self.read(|db| db.members.get(&guild_id)?.get(&user_id).cloned())
            .await
    }

    pub async fn add_messages(&self, counts: &[((u64, u64), u64)]) -> CogResult<()> {
        if counts.is_empty() {
            return Ok(());
        }
        self.transaction(|db| {
            for &((guild_id, user_id), count) in counts {
                db.members
                    .entry(guild_id)
                    .or_default()
                    .entry(user_id)
                    .or_default()
                    .messages += count;
            }
            Ok(())
        })
        .await
    }

    pub async fn track_voice(&self, guild_id: u64, user_id: u64, in_voice: bool, at: i64) -> CogResult<bool> {
        let open = self
            .read(|db| {
                db.members
                    .get(&guild_id)
                    .and_then(|m| m.get(&user_id))
                    .is_some_and(|s| s.voice_since.is_some())
            })
            .await;
        if open == in_voice {
            return Ok(false);
        }
        self.update(|db| {
            let stats = db.members.entry(guild_id).or_default().entry(user_id).or_default();
            let changed = stats.track_voice(in_voice, at);
            Ok((changed, changed))
        })
        .await
    }

    pub async fn reset_if_due(&self, now: i64) -> CogResult<bool> {
        let start = month_start(now);
        if self.read(|db| start <= db.period_start).await {
            return Ok(false);
        }
        self.update(|db| {
            let reset = db.reset_if_due(now);
            Ok((reset, reset))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2024-03-15 12:00:00 UTC
    const MID_MARCH: i64 = 1_710_504_000;
    // 2024-03-01 00:00:00 UTC
    const MARCH: i64 = 1_709_251_200;
    // 2024-04-01 00:00:00 UTC
    const APRIL: i64 = 1_711_929_600;

    async fn registry(dir: &tempfile::TempDir) -> StatsRegistry {
        StatsRegistry::new(dir.path().join("stats.db").display().to_string())
            .await
            .unwrap()
    }

    #[test]
    fn months_start_at_midnight_on_the_first() {
        assert_eq!(month_start(MID_MARCH), MARCH);
        assert_eq!(month_start(MARCH), MARCH);
        assert_eq!(month_start(APRIL - 1), MARCH);
    }

    #[test]
    fn durations_keep_two_units() {
        assert_eq!(format_duration(59), "0m");
        assert_eq!(format_duration(3 * 60), "3m");
        assert_eq!(format_duration(2 * 3600 + 5 * 60), "2h 5m");
        assert_eq!(format_duration(86400 + 3 * 3600 + 59), "1d 3h");
    }

    #[test]
    fn voice_sessions_add_up() {
        let mut stats = MemberStats::default();
        assert!(stats.track_voice(true, 100));
        assert!(!stats.track_voice(true, 150));
        assert_eq!(stats.voice_total(160), 60);
        assert!(stats.track_voice(false, 400));
        assert!(!stats.track_voice(false, 500));
        assert_eq!(stats.voice_seconds, 300);
        assert_eq!(stats.voice_total(1000), 300);
    }

    #[test]
    fn reset_keeps_open_sessions_from_the_month_start() {
        let mut db = StatsDatabase {
            period_start: MARCH,
            ..Default::default()
        };
        let members = db.members.entry(1).or_default();
        members.insert(10, MemberStats { messages: 4, voice_seconds: 60, voice_since: None });
        members.insert(11, MemberStats { messages: 1, voice_seconds: 0, voice_since: Some(APRIL - 30) });

        assert!(!db.reset_if_due(APRIL - 1));
        assert!(db.reset_if_due(APRIL + 10));
        assert_eq!(db.period_start, APRIL);

        let members = &db.members[&1];
        assert!(!members.contains_key(&10));
        assert_eq!(members[&11].voice_since, Some(APRIL));
        assert_eq!(members[&11].voice_total(APRIL + 10), 10);
        assert!(!db.reset_if_due(APRIL + 20));
    }

    #[test]
    fn drained_counts_can_be_restored() {
        let pending = PendingMessages::default();
        pending.record(1, 10);
        pending.record(1, 10);
        pending.record(2, 10);

        let mut counts = pending.drain();
        counts.sort();
        assert_eq!(counts, vec![((1, 10), 2), ((2, 10), 1)]);
        assert_eq!(pending.pending(1, 10), 0);

        pending.record(1, 10);
        pending.restore(counts);
        assert_eq!(pending.pending(1, 10), 3);
    }

    #[tokio::test]
    async fn counters_are_per_guild() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry(&dir).await;

        registry.add_messages(&[((1, 10), 3), ((2, 10), 1)]).await.unwrap();
        registry.add_messages(&[((1, 10), 2)]).await.unwrap();

        assert_eq!(registry.member(1, 10).await.unwrap().messages, 5);
        assert_eq!(registry.member(2, 10).await.unwrap().messages, 1);
        assert!(registry.member(3, 10).await.is_none());
    }

    #[tokio::test]
    async fn repeated_voice_events_do_not_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.db");
        let registry = registry(&dir).await;

        assert!(!registry.track_voice(1, 10, false, MID_MARCH).await.unwrap());
        assert!(!path.exists());

        assert!(registry.track_voice(1, 10, true, MID_MARCH).await.unwrap());
        assert!(!registry.track_voice(1, 10, true, MID_MARCH + 5).await.unwrap());
        assert!(registry.track_voice(1, 10, false, MID_MARCH + 90).await.unwrap());
        assert_eq!(registry.member(1, 10).await.unwrap().voice_seconds, 90);
    }

    #[tokio::test]
    async fn monthly_reset_clears_counts() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry(&dir).await;
        assert!(registry.reset_if_due(MID_MARCH).await.unwrap());
        registry.add_messages(&[((1, 10), 7)]).await.unwrap();

        assert!(!registry.reset_if_due(MID_MARCH + 3600).await.unwrap());
        assert_eq!(registry.member(1, 10).await.unwrap().messages, 7);

        assert!(registry.reset_if_due(APRIL).await.unwrap());
        assert!(registry.member(1, 10).await.is_none());
    }
}
