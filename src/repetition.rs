/**
 * Choose the questions that should come back in a new attempt, based on past results.
 *
 * A question needs practice once it has been missed at least once and its correct
 * answers have not yet reached `MASTERY_RATIO` times its incorrect ones. Each such
 * question is repeated between `MIN_REPEATS` and `MAX_REPEATS` extra times in the
 * next linear session.
 *
 * Both numbers are tuning knobs rather than derived values.
 */
use std::collections::BTreeSet;

use log::debug;
use rand::Rng;

use super::history::{OutcomeRecord, Outcomes};


// How many times the correct answers must outnumber the incorrect ones before a
// question stops being repeated.
pub const MASTERY_RATIO: u32 = 2;
// Extra copies of a flagged question added to a linear session, drawn uniformly.
pub const MIN_REPEATS: usize = 1;
pub const MAX_REPEATS: usize = 2;


pub fn needs_practice(record: &OutcomeRecord) -> bool {
    record.incorrect > 0
        && (record.correct as u64) < (MASTERY_RATIO as u64) * (record.incorrect as u64)
}


/// Return the positions of the questions that need practice.
pub fn select_questions_needing_practice(outcomes: &Outcomes) -> BTreeSet<usize> {
    outcomes.iter()
        .filter(|(_, record)| needs_practice(record))
        .map(|(index, _)| *index)
        .collect()
}


/// Return the positions to insert again into a quiz of `question_count` questions,
/// one element per extra copy. Positions outside the quiz, e.g. left over from an
/// older version of the document, are skipped.
pub fn plan_repeats<R: Rng>(
    flagged: &BTreeSet<usize>, question_count: usize, rng: &mut R
) -> Vec<usize> {
    let mut repeats = Vec::new();
    for &index in flagged.iter() {
        if index >= question_count {
            debug!("ignoring history for question {} (quiz has {})", index, question_count);
            continue;
        }

        let copies = rng.gen_range(MIN_REPEATS..=MAX_REPEATS);
        for _ in 0..copies {
            repeats.push(index);
        }
    }
    repeats
}


/// Return the percentage of correct responses in the record. `None` is returned when
/// the question has never been answered.
pub fn aggregate_results(record: &OutcomeRecord) -> Option<f64> {
    let attempts = record.attempts();
    if attempts > 0 {
        Some(100.0 * (record.correct as f64) / (attempts as f64))
    } else {
        None
    }
}
