use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("ollama_chat.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter =
    Counter::new("ollama_chat.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("ollama_chat.client.request_duration_seconds");
pub(crate) static CLIENT_PROBES: Counter = Counter::new("ollama_chat.client.probes");

pub(crate) static STREAM_FRAGMENTS: Counter = Counter::new("ollama_chat.stream.fragments");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("ollama_chat.stream.errors");
pub(crate) static STREAM_BYTES: Counter = Counter::new("ollama_chat.stream.bytes");
pub(crate) static STREAM_FIRST_FRAGMENT: Moments =
    Moments::new("ollama_chat.stream.first_fragment_seconds");

pub(crate) static SESSION_TURNS: Counter = Counter::new("ollama_chat.session.turns");
pub(crate) static SESSION_TURN_FAILURES: Counter =
    Counter::new("ollama_chat.session.turn_failures");
pub(crate) static SESSION_CANCELLATIONS: Counter =
    Counter::new("ollama_chat.session.cancellations");
pub(crate) static SESSION_TURN_DURATION: Moments =
    Moments::new("ollama_chat.session.turn_duration_seconds");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);
    collector.register_counter(&CLIENT_PROBES);

    collector.register_counter(&STREAM_FRAGMENTS);
    collector.register_counter(&STREAM_ERRORS);
    collector.register_counter(&STREAM_BYTES);
    collector.register_moments(&STREAM_FIRST_FRAGMENT);

    collector.register_counter(&SESSION_TURNS);
    collector.register_counter(&SESSION_TURN_FAILURES);
    collector.register_counter(&SESSION_CANCELLATIONS);
    collector.register_moments(&SESSION_TURN_DURATION);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_all_biometrics() {
        register_biometrics(Collector::new());
    }
}
