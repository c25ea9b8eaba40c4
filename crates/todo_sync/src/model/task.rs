use crate::error::AppError;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub title: String,
    #[serde(default, deserialize_with = "deserialize_time")]
    pub time: u64,
    #[serde(default)]
    pub done: bool,
}

impl Task {
    /// Builds a fresh pending task with a newly generated id.
    pub fn new(title: &str, time: u64) -> Result<Self, AppError> {
        let trimmed = title.trim();
        if trimmed.is_empty() {
            return Err(AppError::invalid_input("title is required"));
        }

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            title: trimmed.to_string(),
            time,
            done: false,
        })
    }

    /// Returns a copy with `done` flipped. Completing a task drops its
    /// remaining time to zero.
    pub fn toggled(&self) -> Self {
        let done = !self.done;
        Self {
            id: self.id.clone(),
            title: self.title.clone(),
            time: if done { 0 } else { self.time },
            done,
        }
    }

    pub fn decremented(&self) -> Self {
        Self {
            time: self.time.saturating_sub(1),
            ..self.clone()
        }
    }

    /// Repairs records coming from outside the process: a done task never
    /// keeps remaining time.
    pub fn normalized(mut self) -> Self {
        if self.done {
            self.time = 0;
        }
        self
    }

    pub fn is_consistent(&self) -> bool {
        !self.done || self.time == 0
    }
}

/// Parses the duration a user typed, in whole seconds.
pub fn parse_duration(input: &str) -> Result<u64, AppError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid_input("duration is required"));
    }

    trimmed.parse::<u64>().map_err(|_| {
        AppError::invalid_input(format!(
            "duration must be a whole number of seconds, got '{trimmed}'"
        ))
    })
}

// Older clients stored random fractions as ids, so numbers are accepted and
// kept in their decimal text form.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Integer(i64),
    Float(f64),
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(text) => text,
        RawId::Integer(value) => value.to_string(),
        RawId::Float(value) => value.to_string(),
    })
}

// Older clients could write `null`, negative or fractional times. Anything
// that is not a whole positive count is clamped rather than rejected so one
// bad record never hides the rest of the collection.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawTime {
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    Null(()),
}

fn deserialize_time<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RawTime::deserialize(deserializer)? {
        RawTime::Unsigned(value) => value,
        RawTime::Signed(_) | RawTime::Null(()) => 0,
        RawTime::Float(value) if value.is_finite() && value > 0.0 => value.trunc() as u64,
        RawTime::Float(_) => 0,
    })
}
