use std::ops::Add;

use serde::{Deserialize, Serialize};

/// Generation counters the server reports with its final chunk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Number of tokens in the prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_eval_count: Option<u64>,

    /// Number of tokens generated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_count: Option<u64>,

    /// Wall time spent on the request, in nanoseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_duration: Option<u64>,
}

impl Usage {
    /// Prompt tokens, or zero when the server did not say.
    pub fn prompt_tokens(&self) -> u64 {
        self.prompt_eval_count.unwrap_or(0)
    }

    /// Generated tokens, or zero when the server did not say.
    pub fn output_tokens(&self) -> u64 {
        self.eval_count.unwrap_or(0)
    }
}

impl Add for Usage {
    type Output = Usage;

    fn add(self, rhs: Usage) -> Usage {
        fn sum(a: Option<u64>, b: Option<u64>) -> Option<u64> {
            match (a, b) {
                (None, None) => None,
                (a, b) => Some(a.unwrap_or(0).saturating_add(b.unwrap_or(0))),
            }
        }
        Usage {
            prompt_eval_count: sum(self.prompt_eval_count, rhs.prompt_eval_count),
            eval_count: sum(self.eval_count, rhs.eval_count),
            total_duration: sum(self.total_duration, rhs.total_duration),
        }
    }
}
