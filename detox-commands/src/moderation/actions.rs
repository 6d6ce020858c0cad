/// One moderation directive produced for a toxic message.
///
/// Expiry timestamps are unix seconds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModerationAction {
    /// Reply to the offending message with this text.
    Reply(String),
    /// Delete the offending message.
    Delete,
    /// Stop the member from sending messages until `until`.
    Restrict { until: i64 },
    /// Ban the member until `until`.
    Ban { until: i64 },
}

/// Actions for one message, in the order they should be applied.
pub type ActionSet = Vec<ModerationAction>;

impl ModerationAction {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Reply(_) => "reply",
            Self::Delete => "delete",
            Self::Restrict { .. } => "restrict",
            Self::Ban { .. } => "ban",
        }
    }
}
