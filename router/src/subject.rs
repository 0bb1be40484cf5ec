/// The fixed set of inbound subjects the Subject Router subscribes to.
/// Closed by construction; there is no wildcard subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subject {
    TasksReceived,
    TasksCompleted,
    InvoicesCreated,
    Heartbeat,
}

impl Subject {
    pub const ALL: [Subject; 4] =
        [Subject::TasksReceived, Subject::TasksCompleted, Subject::InvoicesCreated, Subject::Heartbeat];

    pub fn as_str(&self) -> &'static str {
        match self {
            Subject::TasksReceived => "truebit.tasks.received",
            Subject::TasksCompleted => "truebit.tasks.completed",
            Subject::InvoicesCreated => "truebit.invoices.created",
            Subject::Heartbeat => "truebit.heartbeat",
        }
    }

    pub fn from_str(subject: &str) -> Option<Self> {
        Subject::ALL.into_iter().find(|s| s.as_str() == subject)
    }
}

/// The single outbound subject.
pub const STATS_AGGREGATED_SUBJECT: &str = "truebit.stats.aggregated";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_subject_name() {
        for subject in Subject::ALL {
            assert_eq!(Subject::from_str(subject.as_str()), Some(subject));
        }
    }

    #[test]
    fn unknown_subject_is_none() {
        assert_eq!(Subject::from_str("truebit.unknown"), None);
    }
}
