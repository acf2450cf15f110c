use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum ObservationError {
    #[error("Session number must be 1, 2 or 3, got {0}")]
    InvalidSessionNumber(i64),

    #[error("Unknown engagement level '{value}' on interval {interval}")]
    InvalidEngagement { value: String, interval: u32 },

    #[error("Interval {interval} recorded twice in session {session}")]
    DuplicateInterval { interval: u32, session: u8 },

    #[error("Malformed interval row {row}: {source}")]
    Csv {
        row: usize,
        #[source]
        source: csv::Error,
    },

    #[error("No observation sessions recorded for schedule {0}")]
    NoSessions(Uuid),

    #[error("Configuration error: {0}")]
    Config(String),
}
