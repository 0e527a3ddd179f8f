/**
 * Randomize the order of questions and options without breaking the answer key.
 *
 * Options are never shuffled by value. The index range is shuffled instead and the
 * values are mapped through it, so the new position of the correct answer is found
 * by its original position even when two options have the same text.
 */
use rand::seq::SliceRandom;
use rand::Rng;

use super::quiz::{Question, QuizDocument};


/// A question as it will be presented: options in display order, plus the position
/// of the question in its source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShuffledQuestion {
    pub text: String,
    pub options: Vec<String>,
    pub correct_index: usize,
    pub original_index: usize,
    /// Inserted again because past answers show the question needs practice.
    pub is_repeated: bool,
}


#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShuffledQuiz {
    pub title: String,
    pub questions: Vec<ShuffledQuestion>,
}


#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemappedOptions<T> {
    pub options: Vec<T>,
    pub correct_index: usize,
}


/// Return a shuffled copy of `items`. The input is left alone.
pub fn shuffle<T: Clone, R: Rng>(items: &[T], rng: &mut R) -> Vec<T> {
    let mut shuffled = items.to_vec();
    shuffled.shuffle(rng);
    shuffled
}


/// Shuffle `options` and return them along with the new index of the option that
/// was at `correct_index`.
pub fn shuffle_with_answer_remap<T: Clone, R: Rng>(
    options: &[T], correct_index: usize, rng: &mut R
) -> RemappedOptions<T> {
    let positions: Vec<usize> = (0..options.len()).collect();
    let order = shuffle(&positions, rng);

    let shuffled = order.iter().map(|&i| options[i].clone()).collect();
    // Validated documents always contain `correct_index`.
    let new_index = order.iter()
        .position(|&i| i == correct_index)
        .unwrap_or(correct_index);

    RemappedOptions { options: shuffled, correct_index: new_index }
}


/// Shuffle the options of a single question.
pub fn shuffle_question<R: Rng>(
    question: &Question, original_index: usize, is_repeated: bool, rng: &mut R
) -> ShuffledQuestion {
    let remapped = shuffle_with_answer_remap(&question.options, question.correct_index, rng);
    ShuffledQuestion {
        text: question.text.clone(),
        options: remapped.options,
        correct_index: remapped.correct_index,
        original_index,
        is_repeated,
    }
}


/// Shuffle the order of the questions of `quiz` and the options of each question.
pub fn shuffle_quiz_questions<R: Rng>(quiz: &QuizDocument, rng: &mut R) -> ShuffledQuiz {
    let positions: Vec<usize> = (0..quiz.questions.len()).collect();
    let questions = shuffle(&positions, rng)
        .into_iter()
        .map(|i| shuffle_question(&quiz.questions[i], i, false, rng))
        .collect();

    ShuffledQuiz { title: quiz.title.clone(), questions }
}
