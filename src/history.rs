/**
 * Per-question answer history.
 *
 * Every answer increments one counter for its (course, week, question) key. The whole
 * history is a single JSON value kept under `HISTORY_KEY` in the injected storage:
 *
 * ```text
 * {"cog_psy/week1": {"0": {"correct": 2, "incorrect": 1}}}
 * ```
 */
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::common::{AdminCapability, McqError, Result};
use super::persistence::Storage;


pub const HISTORY_KEY: &str = "mcq_user_history";


#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeRecord {
    pub correct: u32,
    pub incorrect: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_answered: Option<DateTime<Utc>>,
}


impl OutcomeRecord {
    pub fn attempts(&self) -> u64 {
        (self.correct as u64) + (self.incorrect as u64)
    }
}


/// Outcomes for one quiz, keyed by the position of the question in its document.
pub type Outcomes = BTreeMap<usize, OutcomeRecord>;

type HistoryMap = BTreeMap<String, Outcomes>;


pub struct HistoryStore<S: Storage> {
    storage: S,
}


impl<S: Storage> HistoryStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Add one correct or incorrect answer to the record for a question, creating the
    /// record if this is the first answer.
    pub fn record_outcome(
        &mut self, course_id: &str, week_id: &str, original_index: usize, is_correct: bool
    ) -> Result<()> {
        let key = history_key(course_id, week_id)?;
        let mut history = self.load();

        let record = history.entry(key).or_default().entry(original_index).or_default();
        if is_correct {
            record.correct += 1;
        } else {
            record.incorrect += 1;
        }
        record.last_answered = Some(Utc::now());

        self.save(&history)
            .map_err(|e| McqError::HistoryPersistenceFailure(e.to_string()))
    }

    /// Like `record_outcome`, but a failure is only logged. A lost write means the
    /// question may not be resurfaced later; the session carries on.
    pub fn record_or_log(
        &mut self, course_id: &str, week_id: &str, original_index: usize, is_correct: bool
    ) {
        if let Err(e) = self.record_outcome(course_id, week_id, original_index, is_correct) {
            warn!(
                "answer to question {} of {}/{} was not recorded: {}",
                original_index, course_id, week_id, e
            );
        }
    }

    /// Return the recorded outcomes for a quiz. Empty if nothing has been recorded.
    pub fn get_outcomes(&self, course_id: &str, week_id: &str) -> Outcomes {
        match history_key(course_id, week_id) {
            Ok(key) => self.load().remove(&key).unwrap_or_default(),
            Err(_) => Outcomes::new(),
        }
    }

    /// Forget the outcomes for one course, or for one week of it when `week_id` is
    /// given. Returns the number of quizzes whose history was removed.
    pub fn clear(
        &mut self, _admin: &AdminCapability, course_id: &str, week_id: Option<&str>
    ) -> Result<usize> {
        let mut history = self.load();
        let before = history.len();
        match week_id {
            Some(week_id) => {
                let key = history_key(course_id, week_id)?;
                history.remove(&key);
            },
            None => {
                let prefix = format!("{}/", course_id);
                history.retain(|key, _| !key.starts_with(&prefix));
            },
        }

        let removed = before - history.len();
        if removed > 0 {
            self.save(&history)?;
        }
        Ok(removed)
    }

    pub fn clear_all(&mut self, _admin: &AdminCapability) -> Result<()> {
        self.storage.remove(HISTORY_KEY)
    }

    fn load(&self) -> HistoryMap {
        let value = match self.storage.get(HISTORY_KEY) {
            Ok(Some(value)) => value,
            Ok(None) => {
                return HistoryMap::new();
            },
            Err(e) => {
                warn!("could not read answer history, starting fresh: {}", e);
                return HistoryMap::new();
            },
        };

        match serde_json::from_value(value) {
            Ok(history) => history,
            Err(e) => {
                warn!("answer history is malformed, starting fresh: {}", e);
                HistoryMap::new()
            },
        }
    }

    fn save(&mut self, history: &HistoryMap) -> Result<()> {
        let value = serde_json::to_value(history).map_err(McqError::Json)?;
        self.storage.set(HISTORY_KEY, &value)?;
        debug!("saved answer history for {} quizzes", history.len());
        Ok(())
    }
}


fn history_key(course_id: &str, week_id: &str) -> Result<String> {
    if course_id.is_empty() {
        return Err(McqError::InvalidId(course_id.to_string()));
    }
    if week_id.is_empty() {
        return Err(McqError::InvalidId(week_id.to_string()));
    }
    Ok(format!("{}/{}", course_id, week_id))
}
