/**
 * A single attempt at a quiz, modelled as a queue of questions still to be presented.
 *
 * Linear sessions present the shuffled quiz once, with extra copies of the questions
 * that past results flag for practice mixed in up front. Mastery sessions start with
 * one copy of every question and put a missed question back into the queue, at least
 * `MIN_REQUEUE_GAP` places ahead, until it has been answered correctly as many times
 * as it was missed.
 *
 * A session is created only after its content has loaded, so its life runs from
 * `InProgress` to `Completed`. Each presented instance is answered exactly once.
 */
use std::collections::{HashMap, VecDeque};

use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;

use super::common::{McqError, Result};
use super::history::Outcomes;
use super::quiz::QuizDocument;
use super::repetition;
use super::shuffle::{self, ShuffledQuestion};


// A missed question is never put back closer than this to the front of the queue.
pub const MIN_REQUEUE_GAP: usize = 2;
// Default number of distinct questions in a practice session across courses.
pub const PRACTICE_LIMIT: usize = 25;


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    Linear,
    Mastery,
}


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    InProgress,
    Completed,
}


/// The quiz a question came from, used to record its outcome.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QuestionSource {
    pub course_id: String,
    pub week_id: String,
}


impl QuestionSource {
    pub fn new(course_id: &str, week_id: &str) -> Self {
        Self { course_id: course_id.to_string(), week_id: week_id.to_string() }
    }
}


/// One presentation of a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Position among the instances presented so far, starting at 1.
    pub number: usize,
    pub source: QuestionSource,
    pub question: ShuffledQuestion,
    pub is_repeated: bool,
}


#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOutcome {
    pub is_correct: bool,
    /// Index of the right option in the order it was presented.
    pub correct_index: usize,
    pub original_index: usize,
    pub source: QuestionSource,
}


#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSummary {
    pub answered: usize,
    pub correct: usize,
    pub incorrect: usize,
    /// Answers given to repeated instances.
    pub repeated: usize,
    pub max_streak: usize,
    /// Percentage of answers that were correct.
    pub score: f64,
}


#[derive(Debug, Clone, PartialEq)]
pub enum Advance {
    Next(Entry),
    Completed(SessionSummary),
}


#[derive(Debug, Clone)]
struct Slot {
    source: QuestionSource,
    question: ShuffledQuestion,
}


#[derive(Debug, Clone, Copy)]
struct Attempt {
    slot: usize,
    is_repeated: bool,
}


#[derive(Debug, Clone, Copy)]
struct Current {
    attempt: Attempt,
    number: usize,
    answered: Option<bool>,
}


pub struct Session<R: Rng> {
    mode: SessionMode,
    state: SessionState,
    slots: Vec<Slot>,
    /// Attempts waiting behind the current one.
    queue: VecDeque<Attempt>,
    current: Option<Current>,
    /// Mastery mode: misses not yet made up for by a later correct answer.
    outstanding: HashMap<usize, u32>,
    presented: usize,
    streak: usize,
    summary: SessionSummary,
    rng: R,
}


impl<R: Rng> Session<R> {
    /// Start a session for one quiz. In linear mode the questions flagged by
    /// `outcomes` are repeated; mastery mode ignores past outcomes.
    pub fn start(
        source: QuestionSource,
        quiz: &QuizDocument,
        outcomes: &Outcomes,
        mode: SessionMode,
        mut rng: R,
    ) -> Result<Self> {
        if quiz.questions.is_empty() {
            return Err(McqError::EmptyQuiz);
        }

        match mode {
            SessionMode::Linear => {
                let flagged = repetition::select_questions_needing_practice(outcomes);
                let repeats = repetition::plan_repeats(&flagged, quiz.questions.len(), &mut rng);
                debug!(
                    "{}/{}: {} questions flagged, {} repeats added",
                    source.course_id, source.week_id, flagged.len(), repeats.len()
                );

                let mut questions = shuffle::shuffle_quiz_questions(quiz, &mut rng).questions;
                for index in repeats {
                    questions.push(
                        shuffle::shuffle_question(&quiz.questions[index], index, true, &mut rng)
                    );
                }
                questions.shuffle(&mut rng);

                let slots = questions.into_iter()
                    .map(|question| Slot { source: source.clone(), question })
                    .collect();
                Ok(Session::from_slots(SessionMode::Linear, slots, rng))
            },
            SessionMode::Mastery => {
                let pool = vec![(source, quiz.clone())];
                Session::start_practice(&pool, quiz.questions.len(), rng)
            },
        }
    }

    /// Start a mastery session over questions drawn from several quizzes, keeping at
    /// most `limit` distinct questions.
    pub fn start_practice(
        pool: &[(QuestionSource, QuizDocument)], limit: usize, mut rng: R
    ) -> Result<Self> {
        let mut candidates = Vec::new();
        for (source, quiz) in pool.iter() {
            for index in 0..quiz.questions.len() {
                candidates.push((source, quiz, index));
            }
        }

        candidates.shuffle(&mut rng);
        candidates.truncate(limit);
        if candidates.is_empty() {
            return Err(McqError::EmptyQuiz);
        }

        let slots = candidates.into_iter()
            .map(|(source, quiz, index)| Slot {
                source: source.clone(),
                question: shuffle::shuffle_question(&quiz.questions[index], index, false, &mut rng),
            })
            .collect();
        Ok(Session::from_slots(SessionMode::Mastery, slots, rng))
    }

    fn from_slots(mode: SessionMode, slots: Vec<Slot>, rng: R) -> Self {
        let mut queue: VecDeque<Attempt> = (0..slots.len())
            .map(|slot| Attempt { slot, is_repeated: slots[slot].question.is_repeated })
            .collect();

        let first = queue.pop_front().map(|attempt| Current { attempt, number: 1, answered: None });
        Session {
            mode,
            state: SessionState::InProgress,
            slots,
            queue,
            current: first,
            outstanding: HashMap::new(),
            presented: 1,
            streak: 0,
            summary: SessionSummary::default(),
            rng,
        }
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Number of attempts waiting behind the current one.
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    /// The instance waiting for an answer, or the one just answered. `None` once the
    /// session is complete.
    pub fn current(&self) -> Option<Entry> {
        let current = self.current?;
        let slot = &self.slots[current.attempt.slot];
        let mut question = slot.question.clone();
        question.is_repeated = current.attempt.is_repeated;
        Some(Entry {
            number: current.number,
            source: slot.source.clone(),
            question,
            is_repeated: current.attempt.is_repeated,
        })
    }

    /// Answer the current instance with the option at `selected`, in presented order.
    pub fn submit_answer(&mut self, selected: usize) -> Result<AnswerOutcome> {
        let mut current = match self.current {
            Some(current) => current,
            None => {
                return Err(McqError::SessionCompleted);
            },
        };
        if current.answered.is_some() {
            return Err(McqError::AlreadyAnswered);
        }

        let slot = &self.slots[current.attempt.slot];
        let available = slot.question.options.len();
        if selected >= available {
            return Err(McqError::OptionOutOfRange { selected, available });
        }

        let is_correct = selected == slot.question.correct_index;
        let outcome = AnswerOutcome {
            is_correct,
            correct_index: slot.question.correct_index,
            original_index: slot.question.original_index,
            source: slot.source.clone(),
        };

        self.tally(is_correct, current.attempt.is_repeated);
        if self.mode == SessionMode::Mastery {
            self.settle_mastery(current.attempt.slot, is_correct);
        }

        current.answered = Some(is_correct);
        self.current = Some(current);
        Ok(outcome)
    }

    /// Move past the answered instance.
    pub fn advance(&mut self) -> Result<Advance> {
        match self.current {
            Some(Current { answered: None, .. }) => {
                return Err(McqError::NotAnswered);
            },
            None => {
                return Err(McqError::SessionCompleted);
            },
            Some(_) => {},
        }

        match self.queue.pop_front() {
            Some(attempt) => {
                self.presented += 1;
                self.current = Some(Current { attempt, number: self.presented, answered: None });
                // `current` was just set, so this is always `Some`.
                match self.current() {
                    Some(entry) => Ok(Advance::Next(entry)),
                    None => Err(McqError::SessionCompleted),
                }
            },
            None => {
                self.current = None;
                self.state = SessionState::Completed;
                Ok(Advance::Completed(self.summary()))
            },
        }
    }

    pub fn summary(&self) -> SessionSummary {
        let mut summary = self.summary.clone();
        summary.score = if summary.answered > 0 {
            100.0 * (summary.correct as f64) / (summary.answered as f64)
        } else {
            0.0
        };
        summary
    }

    fn tally(&mut self, is_correct: bool, is_repeated: bool) {
        self.summary.answered += 1;
        if is_repeated {
            self.summary.repeated += 1;
        }
        if is_correct {
            self.summary.correct += 1;
            self.streak += 1;
            self.summary.max_streak = self.summary.max_streak.max(self.streak);
        } else {
            self.summary.incorrect += 1;
            self.streak = 0;
        }
    }

    fn settle_mastery(&mut self, slot: usize, is_correct: bool) {
        let outstanding = self.outstanding.entry(slot).or_insert(0);
        if is_correct {
            *outstanding = outstanding.saturating_sub(1);
        } else {
            *outstanding += 1;
        }

        if !is_correct || *outstanding > 0 {
            self.requeue(slot);
        }
    }

    /// Put `slot` back at least `MIN_REQUEUE_GAP` places ahead, or last if the queue is
    /// shorter than that.
    fn requeue(&mut self, slot: usize) {
        let len = self.queue.len();
        let position = if len < MIN_REQUEUE_GAP {
            len
        } else {
            self.rng.gen_range(MIN_REQUEUE_GAP..=len)
        };
        self.queue.insert(position, Attempt { slot, is_repeated: true });
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::history::OutcomeRecord;
    use crate::quiz::Question;

    #[test]
    fn empty_quiz_does_not_start() {
        let quiz = QuizDocument { title: s("Empty"), questions: Vec::new() };
        for mode in [SessionMode::Linear, SessionMode::Mastery].iter() {
            let result = Session::start(src(), &quiz, &Outcomes::new(), *mode, rng(1));
            assert!(matches!(result, Err(McqError::EmptyQuiz)));
        }
        assert!(matches!(
            Session::start_practice(&[], PRACTICE_LIMIT, rng(1)),
            Err(McqError::EmptyQuiz)
        ));
    }

    #[test]
    fn linear_session_without_history_presents_each_question_once() {
        let quiz = quiz_of(5);
        let mut session = Session::start(src(), &quiz, &Outcomes::new(), SessionMode::Linear, rng(2))
            .unwrap();

        let mut seen = Vec::new();
        loop {
            let entry = session.current().unwrap();
            assert!(!entry.is_repeated);
            seen.push(entry.question.original_index);
            session.submit_answer(0).unwrap();
            if let Advance::Completed(summary) = session.advance().unwrap() {
                assert_eq!(summary.answered, 5);
                break;
            }
        }

        seen.sort();
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
        assert_eq!(session.state(), SessionState::Completed);
        assert!(session.current().is_none());
    }

    #[test]
    fn linear_session_repeats_flagged_questions() {
        let quiz = quiz_of(4);
        let mut outcomes = Outcomes::new();
        outcomes.insert(1, rec(0, 1));
        outcomes.insert(2, rec(5, 1));

        for seed in 0..20 {
            let mut session =
                Session::start(src(), &quiz, &outcomes, SessionMode::Linear, rng(seed)).unwrap();
            let entries = drain(&mut session, |_| 0);

            let copies_of_1 = entries.iter().filter(|e| e.question.original_index == 1).count();
            let repeats: Vec<&Entry> = entries.iter().filter(|e| e.is_repeated).collect();
            assert!(copies_of_1 == 2 || copies_of_1 == 3);
            assert_eq!(repeats.len(), copies_of_1 - 1);
            assert!(repeats.iter().all(|e| e.question.original_index == 1));
            assert_eq!(entries.iter().filter(|e| e.question.original_index == 2).count(), 1);
        }
    }

    #[test]
    fn linear_restart_reshuffles_without_changing_length() {
        let quiz = quiz_of(8);
        let mut outcomes = Outcomes::new();
        // Answered before, but mastered: no repeats, so every start has 8 entries.
        outcomes.insert(3, rec(4, 1));

        let mut orders = Vec::new();
        for seed in 0..10 {
            let mut session =
                Session::start(src(), &quiz, &outcomes, SessionMode::Linear, rng(100 + seed))
                    .unwrap();
            let entries = drain(&mut session, |_| 0);
            orders.push(entries.iter().map(|e| e.question.original_index).collect::<Vec<_>>());
        }

        assert!(orders.iter().all(|order| order.len() == 8));
        assert!(orders.iter().any(|order| *order != orders[0]));
    }

    #[test]
    fn linear_restart_length_only_varies_with_repeat_draw() {
        let quiz = quiz_of(8);
        let mut outcomes = Outcomes::new();
        outcomes.insert(3, rec(0, 2));

        for seed in 0..10 {
            let mut session =
                Session::start(src(), &quiz, &outcomes, SessionMode::Linear, rng(200 + seed))
                    .unwrap();
            let len = drain(&mut session, |_| 0).len();
            assert!(len == 8 + repetition::MIN_REPEATS || len == 8 + repetition::MAX_REPEATS);
        }
    }

    #[test]
    fn linear_session_never_requeues_missed_questions() {
        let quiz = quiz_of(3);
        let mut session = Session::start(src(), &quiz, &Outcomes::new(), SessionMode::Linear, rng(3))
            .unwrap();
        let entries = drain(&mut session, |entry| wrong(entry));
        assert_eq!(entries.len(), 3);
        assert_eq!(session.summary().incorrect, 3);
    }

    #[test]
    fn mastery_session_ends_after_misses_are_made_up() {
        let quiz = quiz_of(3);
        for seed in 0..20 {
            let mut session =
                Session::start(src(), &quiz, &Outcomes::new(), SessionMode::Mastery, rng(seed))
                    .unwrap();

            let mut missed = Vec::new();
            let entries = drain(&mut session, |entry| {
                let index = entry.question.original_index;
                if missed.contains(&index) {
                    entry.question.correct_index
                } else {
                    missed.push(index);
                    wrong(entry)
                }
            });

            assert_eq!(entries.len(), 6);
            assert_eq!(session.remaining(), 0);
            assert_eq!(session.state(), SessionState::Completed);

            let summary = session.summary();
            assert_eq!(summary.correct, 3);
            assert_eq!(summary.incorrect, 3);
            assert_eq!(summary.repeated, 3);
        }
    }

    #[test]
    fn mastery_needs_one_correct_answer_per_miss() {
        let quiz = quiz_of(1);
        let mut session =
            Session::start(src(), &quiz, &Outcomes::new(), SessionMode::Mastery, rng(4)).unwrap();

        // Miss twice, then answer correctly: two correct answers are needed afterwards.
        let mut answers = vec![false, false, true, true].into_iter();
        let entries = drain(&mut session, |entry| {
            if answers.next().unwrap_or(true) {
                entry.question.correct_index
            } else {
                wrong(entry)
            }
        });
        assert_eq!(entries.len(), 4);
        assert_eq!(session.summary().correct, 2);
    }

    #[test]
    fn requeued_instance_is_marked_repeated_everywhere() {
        let quiz = quiz_of(2);
        let mut session =
            Session::start(src(), &quiz, &Outcomes::new(), SessionMode::Mastery, rng(11)).unwrap();

        let mut first = None;
        let entries = drain(&mut session, |entry| {
            let index = entry.question.original_index;
            if first.is_none() {
                first = Some(index);
                wrong(entry)
            } else {
                entry.question.correct_index
            }
        });

        assert_eq!(entries.len(), 3);
        for entry in entries.iter() {
            assert_eq!(entry.is_repeated, entry.question.is_repeated);
        }
        let repeated: Vec<&Entry> = entries.iter().filter(|e| e.is_repeated).collect();
        assert_eq!(repeated.len(), 1);
        assert_eq!(Some(repeated[0].question.original_index), first);
    }

    #[test]
    fn mastery_correct_first_time_is_not_requeued() {
        let quiz = quiz_of(4);
        let mut session =
            Session::start(src(), &quiz, &Outcomes::new(), SessionMode::Mastery, rng(5)).unwrap();
        let entries = drain(&mut session, |entry| entry.question.correct_index);
        assert_eq!(entries.len(), 4);
        assert!(entries.iter().all(|e| !e.is_repeated));
        assert_eq!(session.summary().max_streak, 4);
        assert_eq!(session.summary().score, 100.0);
    }

    #[test]
    fn missed_question_is_never_next() {
        let quiz = quiz_of(6);
        for seed in 0..100 {
            let mut r = rng(1000 + seed);
            let mut session = Session::start(
                src(), &quiz, &Outcomes::new(), SessionMode::Mastery, rng(seed)
            ).unwrap();

            let mut instances = 0;
            loop {
                let entry = session.current().unwrap();
                let waiting = session.remaining();
                let answer = if r.gen_bool(0.3) { wrong(&entry) } else { entry.question.correct_index };
                let outcome = session.submit_answer(answer).unwrap();

                match session.advance().unwrap() {
                    Advance::Next(next) => {
                        if !outcome.is_correct && waiting > 0 {
                            assert_ne!(next.question.original_index, entry.question.original_index);
                        }
                    },
                    Advance::Completed(_) => break,
                }

                instances += 1;
                assert!(instances < 10_000);
            }
        }
    }

    #[test]
    fn requeue_keeps_minimum_gap() {
        let quiz = quiz_of(10);
        for seed in 0..50 {
            let mut session =
                Session::start(src(), &quiz, &Outcomes::new(), SessionMode::Mastery, rng(seed))
                    .unwrap();
            let entry = session.current().unwrap();
            session.submit_answer(wrong(&entry)).unwrap();

            let position = session.queue.iter()
                .position(|a| session.slots[a.slot].question.original_index
                          == entry.question.original_index)
                .unwrap();
            assert!(position >= MIN_REQUEUE_GAP);
        }
    }

    #[test]
    fn practice_draws_from_several_quizzes() {
        let pool = vec![
            (QuestionSource::new("cog_psy", "week1"), quiz_of(3)),
            (QuestionSource::new("neuro", "week2"), quiz_of(2)),
        ];
        let mut session = Session::start_practice(&pool, PRACTICE_LIMIT, rng(6)).unwrap();
        let entries = drain(&mut session, |entry| entry.question.correct_index);

        assert_eq!(entries.len(), 5);
        assert_eq!(entries.iter().filter(|e| e.source.course_id == "neuro").count(), 2);
        assert_eq!(session.mode(), SessionMode::Mastery);
    }

    #[test]
    fn practice_respects_limit() {
        let pool = vec![(QuestionSource::new("cog_psy", "week1"), quiz_of(10))];
        let mut session = Session::start_practice(&pool, 4, rng(7)).unwrap();
        let entries = drain(&mut session, |entry| entry.question.correct_index);
        assert_eq!(entries.len(), 4);
    }

    #[test]
    fn answers_are_checked_against_presented_order() {
        let quiz = quiz_of(1);
        let mut session =
            Session::start(src(), &quiz, &Outcomes::new(), SessionMode::Linear, rng(8)).unwrap();
        let entry = session.current().unwrap();
        let outcome = session.submit_answer(entry.question.correct_index).unwrap();

        assert!(outcome.is_correct);
        assert_eq!(outcome.original_index, 0);
        assert_eq!(outcome.source, src());
        assert_eq!(entry.question.options[outcome.correct_index], "right 0");
    }

    #[test]
    fn misuse_is_reported() {
        let quiz = quiz_of(1);
        let mut session =
            Session::start(src(), &quiz, &Outcomes::new(), SessionMode::Linear, rng(9)).unwrap();

        assert!(matches!(session.advance(), Err(McqError::NotAnswered)));
        assert!(matches!(
            session.submit_answer(3),
            Err(McqError::OptionOutOfRange { selected: 3, available: 3 })
        ));

        session.submit_answer(0).unwrap();
        assert!(matches!(session.submit_answer(0), Err(McqError::AlreadyAnswered)));

        assert!(matches!(session.advance(), Ok(Advance::Completed(_))));
        assert!(matches!(session.submit_answer(0), Err(McqError::SessionCompleted)));
        assert!(matches!(session.advance(), Err(McqError::SessionCompleted)));
    }

    #[test]
    fn numbers_count_presented_instances() {
        let quiz = quiz_of(2);
        let mut session =
            Session::start(src(), &quiz, &Outcomes::new(), SessionMode::Mastery, rng(10)).unwrap();
        let entries = drain(&mut session, |entry| {
            if entry.number == 1 { wrong(entry) } else { entry.question.correct_index }
        });
        let numbers: Vec<usize> = entries.iter().map(|e| e.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    /// Answer every instance with `choose` until the session completes, returning the
    /// instances in the order they were presented.
    fn drain<F>(session: &mut Session<StdRng>, mut choose: F) -> Vec<Entry>
    where
        F: FnMut(&Entry) -> usize,
    {
        let mut entries = Vec::new();
        loop {
            let entry = session.current().unwrap();
            session.submit_answer(choose(&entry)).unwrap();
            entries.push(entry);
            if let Advance::Completed(_) = session.advance().unwrap() {
                return entries;
            }
            assert!(entries.len() < 1000);
        }
    }

    fn wrong(entry: &Entry) -> usize {
        (entry.question.correct_index + 1) % entry.question.options.len()
    }

    fn quiz_of(count: usize) -> QuizDocument {
        let questions = (0..count)
            .map(|i| Question {
                text: format!("Question {}", i),
                options: vec![format!("wrong {}", i), format!("right {}", i), format!("other {}", i)],
                correct_index: 1,
            })
            .collect();
        QuizDocument { title: s("Test"), questions }
    }

    fn rec(correct: u32, incorrect: u32) -> OutcomeRecord {
        OutcomeRecord { correct, incorrect, last_answered: None }
    }

    fn src() -> QuestionSource {
        QuestionSource::new("cog_psy", "week1")
    }

    fn rng(seed: u64) -> StdRng {
        StdRng::seed_from_u64(seed)
    }

    fn s(mystr: &str) -> String {
        String::from(mystr)
    }
}
