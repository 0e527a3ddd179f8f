/**
 * Take multiple-choice quizzes organized by course and week, and practice the
 * questions that past answers show are not yet mastered.
 */
#[macro_use]
pub mod iohelper;
pub mod common;
pub mod content;
pub mod history;
pub mod persistence;
pub mod quiz;
pub mod repetition;
pub mod session;
pub mod shuffle;
pub mod ui;
