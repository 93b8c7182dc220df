/// The engine's event vocabulary, as seen by an event sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchEvent {
    /// The first successful response of a fetch call was observed.
    Begin { url: String },

    /// Progress reporting starts; always follows `Begin`.
    ProgressStart,

    /// Cumulative progress of the current attempt.
    Tick { current: u64, total: u64 },

    /// A diagnostic, one per classified failure.
    Error(String),
}
