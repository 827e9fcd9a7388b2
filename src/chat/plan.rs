//! The weekly exercise plan form.
//!
//! `/plan` collects a few facts about the user and turns them into a single
//! prompt that is sent as an ordinary user turn.

use std::fmt;

/// Youngest age the form accepts.
pub const MIN_AGE: u32 = 10;
/// Oldest age the form accepts.
pub const MAX_AGE: u32 = 120;
/// Shortest session length, in minutes.
pub const MIN_MINUTES: u32 = 10;
/// Longest session length, in minutes.
pub const MAX_MINUTES: u32 = 240;

/// What the plan should work towards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FitnessGoal {
    /// Lose weight.
    #[default]
    LoseWeight,
    /// Gain muscle mass.
    GainMuscle,
}

impl FitnessGoal {
    fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "lose" | "lose-weight" | "weight" => Some(FitnessGoal::LoseWeight),
            "gain" | "gain-muscle" | "muscle" => Some(FitnessGoal::GainMuscle),
            _ => None,
        }
    }
}

impl fmt::Display for FitnessGoal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FitnessGoal::LoseWeight => write!(f, "Lose weight"),
            FitnessGoal::GainMuscle => write!(f, "Gain muscle mass"),
        }
    }
}

/// The filled-in weekly plan form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeeklyPlanRequest {
    /// Age in years.
    pub age: u32,
    /// Known health problems, free text.
    pub problems: Option<String>,
    /// Minutes available per session.
    pub minutes: u32,
    /// The fitness goal.
    pub goal: FitnessGoal,
}

impl Default for WeeklyPlanRequest {
    fn default() -> Self {
        Self {
            age: 30,
            problems: None,
            minutes: 45,
            goal: FitnessGoal::default(),
        }
    }
}

impl WeeklyPlanRequest {
    /// Parses `key=value` pairs on top of the defaults.
    ///
    /// Keys are `age`, `problems`, `minutes` and `goal`.  A value runs until
    /// the next `key=`, so `problems=bad knees goal=gain` works unquoted.
    pub fn parse(input: &str) -> Result<Self, String> {
        let mut request = Self::default();
        let mut fields: Vec<(String, String)> = Vec::new();

        for word in input.split_whitespace() {
            match word.split_once('=') {
                Some((key, value)) if is_plan_key(key) => {
                    fields.push((key.to_lowercase(), value.to_string()));
                }
                _ => match fields.last_mut() {
                    Some((_, value)) => {
                        if !value.is_empty() {
                            value.push(' ');
                        }
                        value.push_str(word);
                    }
                    None => return Err(format!("expected key=value, got '{word}'")),
                },
            }
        }

        for (key, value) in fields {
            match key.as_str() {
                "age" => request.age = parse_in_range(&value, "age", MIN_AGE, MAX_AGE)?,
                "minutes" => {
                    request.minutes = parse_in_range(&value, "minutes", MIN_MINUTES, MAX_MINUTES)?
                }
                "problems" => {
                    let value = value.trim();
                    request.problems = (!value.is_empty()).then(|| value.to_string());
                }
                "goal" => {
                    request.goal = FitnessGoal::parse(&value)
                        .ok_or_else(|| format!("goal expects 'lose' or 'gain', got '{value}'"))?
                }
                _ => return Err(format!("unknown field '{key}'")),
            }
        }

        Ok(request)
    }

    /// The prompt sent to the model.
    pub fn to_prompt(&self) -> String {
        format!(
            "Create a 7-day weekly exercise plan for a {}-year-old. \
             Known health problems: {}. \
             Available time per session: {} minutes. \
             Fitness goal: {}. \
             Provide a daily breakdown (day name, exercise type, sets/reps or duration, intensity), \
             safety notes, and a short warm-up and cool-down. \
             Be concise and use bullet points.",
            self.age,
            self.problems.as_deref().unwrap_or("None"),
            self.minutes,
            self.goal,
        )
    }
}

fn is_plan_key(key: &str) -> bool {
    matches!(
        key.to_lowercase().as_str(),
        "age" | "problems" | "minutes" | "goal"
    )
}

fn parse_in_range(value: &str, name: &str, min: u32, max: u32) -> Result<u32, String> {
    let parsed: u32 = value
        .trim()
        .parse()
        .map_err(|_| format!("{name} expects a whole number between {min} and {max}"))?;
    if (min..=max).contains(&parsed) {
        Ok(parsed)
    } else {
        Err(format!("{name} expects a whole number between {min} and {max}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_prompt() {
        let prompt = WeeklyPlanRequest::default().to_prompt();
        assert_eq!(
            prompt,
            "Create a 7-day weekly exercise plan for a 30-year-old. Known health problems: None. \
             Available time per session: 45 minutes. Fitness goal: Lose weight. Provide a daily \
             breakdown (day name, exercise type, sets/reps or duration, intensity), safety notes, \
             and a short warm-up and cool-down. Be concise and use bullet points."
        );
    }

    #[test]
    fn parse_all_fields() {
        let request =
            WeeklyPlanRequest::parse("age=52 problems=bad knees, asthma minutes=30 goal=gain")
                .unwrap();
        assert_eq!(request.age, 52);
        assert_eq!(request.problems.as_deref(), Some("bad knees, asthma"));
        assert_eq!(request.minutes, 30);
        assert_eq!(request.goal, FitnessGoal::GainMuscle);

        let prompt = request.to_prompt();
        assert!(prompt.contains("for a 52-year-old."));
        assert!(prompt.contains("Known health problems: bad knees, asthma."));
        assert!(prompt.contains("Available time per session: 30 minutes."));
        assert!(prompt.contains("Fitness goal: Gain muscle mass."));
    }

    #[test]
    fn parse_empty_uses_defaults() {
        assert_eq!(
            WeeklyPlanRequest::parse("").unwrap(),
            WeeklyPlanRequest::default()
        );
        let request = WeeklyPlanRequest::parse("problems=").unwrap();
        assert_eq!(request.problems, None);
    }

    #[test]
    fn parse_rejects_out_of_range() {
        assert!(WeeklyPlanRequest::parse("age=9").unwrap_err().contains("age"));
        assert!(WeeklyPlanRequest::parse("age=121").is_err());
        assert!(WeeklyPlanRequest::parse("minutes=5").unwrap_err().contains("minutes"));
        assert!(WeeklyPlanRequest::parse("minutes=241").is_err());
        assert!(WeeklyPlanRequest::parse("age=old").is_err());
    }

    #[test]
    fn parse_rejects_unknown_input() {
        assert!(WeeklyPlanRequest::parse("goal=flexibility").is_err());
        assert!(WeeklyPlanRequest::parse("hello").unwrap_err().contains("key=value"));
    }

    #[test]
    fn bounds_are_inclusive() {
        let request = WeeklyPlanRequest::parse("age=10 minutes=240").unwrap();
        assert_eq!(request.age, 10);
        assert_eq!(request.minutes, 240);
        let request = WeeklyPlanRequest::parse("AGE=120 Minutes=10 goal=LOSE").unwrap();
        assert_eq!(request.age, 120);
        assert_eq!(request.minutes, 10);
        assert_eq!(request.goal, FitnessGoal::LoseWeight);
    }
}
