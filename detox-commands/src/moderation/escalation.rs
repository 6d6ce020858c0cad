//! Escalation engine.
//!
//! Maps a scored message to the tier of the chat's ladder the author is on,
//! emits that tier's actions, and advances the author one tier. A gap longer
//! than the last applied tier's `reset_time` sends the author back to the
//! first tier before the new violation is applied.

use tracing::{debug, info};

use detox_database::ChatStore;
use detox_database::model::{Rule, UserModerationState};
use detox_utils::formatting::score_percent;

use crate::moderation::actions::{ActionSet, ModerationAction};

/// A scored message from one member of a chat.
#[derive(Clone, Copy, Debug)]
pub struct Violation<'a> {
    pub chat_id: u64,
    pub user_id: u64,
    /// Chat administrators are judged by the admin ladder.
    pub is_admin: bool,
    pub score: f32,
    /// Unix seconds.
    pub now: i64,
    pub display_name: &'a str,
}

/// Decide what to do about a message and record the author's new position.
///
/// Messages under the chat's threshold, and chats whose ladder is empty,
/// produce no actions and leave the stored state untouched.
pub async fn decide(store: &impl ChatStore, violation: &Violation<'_>) -> anyhow::Result<ActionSet> {
    let config = store.get_config(violation.chat_id).await?;
    if violation.score < config.tox_level {
        debug!(
            chat_id = violation.chat_id,
            user_id = violation.user_id,
            score = violation.score,
            threshold = config.tox_level,
            "message below toxicity threshold"
        );
        return Ok(ActionSet::new());
    }

    let rules = config.rules_for(violation.is_admin);
    let Some(last_tier) = rules.len().checked_sub(1) else {
        return Ok(ActionSet::new());
    };

    let _guard = store
        .lock_user_state(violation.chat_id, violation.user_id)
        .await;
    let state = store
        .get_user_state(violation.chat_id, violation.user_id)
        .await?;

    // The ladder may have shrunk since the state was written.
    let mut tier = state.tier_index.min(last_tier);
    if let Some(applied) = state.applied_tier {
        let reset_after = seconds_to_i64(rules[applied.min(last_tier)].reset_time);
        if violation.now.saturating_sub(state.last_applied_at) > reset_after {
            tier = 0;
        }
    }

    let actions = actions_for_rule(&rules[tier], violation);

    let next = UserModerationState {
        last_applied_at: violation.now,
        tier_index: (tier + 1).min(last_tier),
        applied_tier: Some(tier),
    };
    store
        .put_user_state(violation.chat_id, violation.user_id, &next)
        .await?;

    info!(
        chat_id = violation.chat_id,
        user_id = violation.user_id,
        score = violation.score,
        tier,
        actions = actions.len(),
        "toxic message escalated"
    );

    Ok(actions)
}

fn actions_for_rule(rule: &Rule, violation: &Violation<'_>) -> ActionSet {
    let mut actions = ActionSet::new();

    if !rule.warn.is_empty() {
        let text = rule
            .warn
            .replace("{score}", &score_percent(violation.score).to_string());
        let text = if rule.delete {
            // The reply outlives the message it answers, so name the author.
            format!("{} {}", violation.display_name, text)
        } else {
            text
        };
        actions.push(ModerationAction::Reply(text));
    }

    if rule.delete {
        actions.push(ModerationAction::Delete);
    }

    if rule.mute_time > 0 {
        actions.push(ModerationAction::Restrict {
            until: violation.now.saturating_add(seconds_to_i64(rule.mute_time)),
        });
    }

    if rule.ban_time > 0 {
        actions.push(ModerationAction::Ban {
            until: violation.now.saturating_add(seconds_to_i64(rule.ban_time)),
        });
    }

    actions
}

fn seconds_to_i64(seconds: u64) -> i64 {
    i64::try_from(seconds).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use detox_database::model::{ChatConfig, DEFAULT_WARN_TEXT, Rule, UserModerationState};
    use detox_database::store::StoreGuard;
    use detox_database::{ChatStore, MemoryStore};

    use super::{Violation, decide};
    use crate::moderation::actions::ModerationAction;

    const CHAT: u64 = 10;
    const USER: u64 = 20;

    fn violation(score: f32, now: i64) -> Violation<'static> {
        Violation {
            chat_id: CHAT,
            user_id: USER,
            is_admin: false,
            score,
            now,
            display_name: "mallory",
        }
    }

    async fn store_with(config: ChatConfig) -> MemoryStore {
        let store = MemoryStore::new();
        store.put_config(CHAT, &config).await.unwrap();
        store
    }

    /// Store whose reads can be made to fail; counts every write.
    #[derive(Default)]
    struct FailingStore {
        fail_config: bool,
        fail_user_state: bool,
        writes: AtomicUsize,
    }

    impl ChatStore for FailingStore {
        async fn get_config(&self, _chat_id: u64) -> anyhow::Result<ChatConfig> {
            if self.fail_config {
                anyhow::bail!("config table unavailable");
            }
            Ok(ChatConfig::default())
        }

        async fn put_config(&self, _chat_id: u64, _config: &ChatConfig) -> anyhow::Result<()> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn get_user_state(
            &self,
            _chat_id: u64,
            _user_id: u64,
        ) -> anyhow::Result<UserModerationState> {
            if self.fail_user_state {
                anyhow::bail!("state table unavailable");
            }
            Ok(UserModerationState::default())
        }

        async fn put_user_state(
            &self,
            _chat_id: u64,
            _user_id: u64,
            _state: &UserModerationState,
        ) -> anyhow::Result<()> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn lock_user_state(&self, _chat_id: u64, _user_id: u64) -> StoreGuard {
            Arc::new(tokio::sync::Mutex::new(())).lock_owned().await
        }

        async fn lock_config(&self, _chat_id: u64) -> StoreGuard {
            Arc::new(tokio::sync::Mutex::new(())).lock_owned().await
        }
    }

    fn reply(text: &str) -> ModerationAction {
        ModerationAction::Reply(text.to_owned())
    }

    #[tokio::test]
    async fn careful_then_muted_then_reset() {
        let store = store_with(ChatConfig {
            tox_level: 0.4,
            rules_user: Some(vec![
                Rule {
                    warn: "careful".to_owned(),
                    reset_time: 3_600,
                    ..Rule::default()
                },
                Rule {
                    warn: "muted".to_owned(),
                    mute_time: 600,
                    ..Rule::default()
                },
            ]),
            rules_admin: None,
        })
        .await;

        let t0 = 1_000_000;
        assert_eq!(
            decide(&store, &violation(0.9, t0)).await.unwrap(),
            vec![reply("careful")]
        );
        assert_eq!(store.get_user_state(CHAT, USER).await.unwrap().tier_index, 1);

        let t1 = t0 + 120;
        assert_eq!(
            decide(&store, &violation(0.95, t1)).await.unwrap(),
            vec![reply("muted"), ModerationAction::Restrict { until: t1 + 600 }]
        );
        assert_eq!(store.get_user_state(CHAT, USER).await.unwrap().tier_index, 1);

        let t2 = t1 + 7_200;
        assert_eq!(
            decide(&store, &violation(0.5, t2)).await.unwrap(),
            vec![reply("careful")]
        );
    }

    #[tokio::test]
    async fn ladder_saturates_and_restarts_after_gap() {
        let tier = |name: &str| Rule {
            warn: name.to_owned(),
            reset_time: 100,
            ..Rule::default()
        };
        let store = store_with(ChatConfig {
            rules_user: Some(vec![tier("A"), tier("B"), tier("C")]),
            ..ChatConfig::default()
        })
        .await;

        let mut now = 0;
        let mut seen = Vec::new();
        for _ in 0..5 {
            now += 50;
            seen.extend(decide(&store, &violation(1.0, now)).await.unwrap());
        }
        assert_eq!(
            seen,
            ["A", "B", "C", "C", "C"].map(reply).to_vec()
        );

        // Exactly `reset_time` is still within the window.
        now += 100;
        assert_eq!(
            decide(&store, &violation(1.0, now)).await.unwrap(),
            vec![reply("C")]
        );

        now += 101;
        assert_eq!(
            decide(&store, &violation(1.0, now)).await.unwrap(),
            vec![reply("A")]
        );
    }

    #[tokio::test]
    async fn below_threshold_changes_nothing() {
        let store = store_with(ChatConfig {
            tox_level: 0.7,
            ..ChatConfig::default()
        })
        .await;

        assert!(decide(&store, &violation(0.69, 5)).await.unwrap().is_empty());
        assert_eq!(
            store.get_user_state(CHAT, USER).await.unwrap(),
            UserModerationState::default()
        );

        // The threshold itself counts as toxic.
        assert_eq!(
            decide(&store, &violation(0.7, 6)).await.unwrap(),
            vec![reply(DEFAULT_WARN_TEXT)]
        );
    }

    #[tokio::test]
    async fn empty_ladder_does_nothing() {
        let store = store_with(ChatConfig {
            rules_user: Some(vec![]),
            ..ChatConfig::default()
        })
        .await;

        assert!(decide(&store, &violation(1.0, 5)).await.unwrap().is_empty());
        assert_eq!(
            store.get_user_state(CHAT, USER).await.unwrap(),
            UserModerationState::default()
        );
    }

    #[tokio::test]
    async fn admins_use_the_admin_ladder() {
        let store = store_with(ChatConfig {
            rules_user: Some(vec![Rule::warn("user tier")]),
            rules_admin: Some(vec![Rule::warn("admin tier")]),
            ..ChatConfig::default()
        })
        .await;

        let admin = Violation {
            is_admin: true,
            ..violation(0.9, 5)
        };
        assert_eq!(
            decide(&store, &admin).await.unwrap(),
            vec![reply("admin tier")]
        );
        assert_eq!(
            decide(&store, &violation(0.9, 6)).await.unwrap(),
            vec![reply("user tier")]
        );
    }

    #[tokio::test]
    async fn unset_ladder_falls_back_to_default() {
        let store = MemoryStore::new();
        assert_eq!(
            decide(&store, &violation(0.9, 5)).await.unwrap(),
            vec![reply(DEFAULT_WARN_TEXT)]
        );
    }

    #[tokio::test]
    async fn reply_expands_score_and_names_author_when_deleting() {
        let store = store_with(ChatConfig {
            rules_user: Some(vec![Rule {
                warn: "that was {score}% toxic".to_owned(),
                delete: true,
                mute_time: 60,
                ban_time: 3_600,
                ..Rule::default()
            }]),
            ..ChatConfig::default()
        })
        .await;

        assert_eq!(
            decide(&store, &violation(0.876, 1_000)).await.unwrap(),
            vec![
                reply("mallory that was 88% toxic"),
                ModerationAction::Delete,
                ModerationAction::Restrict { until: 1_060 },
                ModerationAction::Ban { until: 4_600 },
            ]
        );
    }

    #[tokio::test]
    async fn silent_tier_emits_only_its_sanctions() {
        let store = store_with(ChatConfig {
            rules_user: Some(vec![Rule {
                delete: true,
                ..Rule::default()
            }]),
            ..ChatConfig::default()
        })
        .await;

        assert_eq!(
            decide(&store, &violation(0.9, 1)).await.unwrap(),
            vec![ModerationAction::Delete]
        );
    }

    #[tokio::test]
    async fn stale_state_is_clamped_to_a_shrunk_ladder() {
        let store = store_with(ChatConfig {
            rules_user: Some(vec![Rule::warn("only")]),
            ..ChatConfig::default()
        })
        .await;
        store
            .put_user_state(
                CHAT,
                USER,
                &UserModerationState {
                    last_applied_at: 10,
                    tier_index: 4,
                    applied_tier: Some(3),
                },
            )
            .await
            .unwrap();

        assert_eq!(
            decide(&store, &violation(0.9, 10)).await.unwrap(),
            vec![reply("only")]
        );
        assert_eq!(
            store.get_user_state(CHAT, USER).await.unwrap(),
            UserModerationState {
                last_applied_at: 10,
                tier_index: 0,
                applied_tier: Some(0),
            }
        );
    }

    #[tokio::test]
    async fn concurrent_violations_each_advance_the_ladder() {
        let store = Arc::new(
            store_with(ChatConfig {
                rules_user: Some(
                    (0..8)
                        .map(|i| Rule {
                            warn: format!("tier {i}"),
                            reset_time: 1_000,
                            ..Rule::default()
                        })
                        .collect(),
                ),
                ..ChatConfig::default()
            })
            .await,
        );

        let tasks = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { decide(&*store, &violation(0.9, 50)).await.unwrap() })
            })
            .collect::<Vec<_>>();

        let mut replies = Vec::new();
        for task in tasks {
            replies.extend(task.await.unwrap());
        }
        replies.sort_by_key(|action| match action {
            ModerationAction::Reply(text) => text.clone(),
            _ => String::new(),
        });

        let expected = (0..8).map(|i| reply(&format!("tier {i}"))).collect::<Vec<_>>();
        assert_eq!(replies, expected);
    }

    #[tokio::test]
    async fn state_read_failure_propagates_without_writing() {
        let store = FailingStore {
            fail_user_state: true,
            ..FailingStore::default()
        };

        assert!(decide(&store, &violation(0.9, 5)).await.is_err());
        assert_eq!(store.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn config_read_failure_propagates_without_writing() {
        let store = FailingStore {
            fail_config: true,
            ..FailingStore::default()
        };

        assert!(decide(&store, &violation(0.9, 5)).await.is_err());
        assert_eq!(store.writes.load(Ordering::SeqCst), 0);

        // The same violation goes through once the store recovers.
        let healthy = FailingStore::default();
        assert_eq!(
            decide(&healthy, &violation(0.9, 5)).await.unwrap(),
            vec![reply(DEFAULT_WARN_TEXT)]
        );
        assert_eq!(healthy.writes.load(Ordering::SeqCst), 1);
    }
}
