/**
 * The command-line user interface for taking quizzes.
 */
use std::io::Write;

use colored::*;

use super::common::Result;
use super::iohelper::{choice_label, parse_choice, prettyprint, prettyprint_colored, prompt};
use super::session::{Entry, SessionSummary};


pub struct CmdUI {
    show_source: bool,
}


impl CmdUI {
    pub fn new() -> Self {
        Self { show_source: false }
    }

    /// Also print the course and week of each question, for sessions that mix quizzes.
    pub fn with_source() -> Self {
        Self { show_source: true }
    }

    pub fn question(&mut self, entry: &Entry) -> Result<()> {
        my_print!("\n")?;
        if self.show_source {
            let source = format!("{}/{}", entry.source.course_id, entry.source.week_id);
            my_println!("  {}", source.bright_black())?;
        }
        if entry.is_repeated {
            prettyprint_colored(
                "This question needs more practice.", Some("  "), Some(Color::Yellow), None
            )?;
        }

        let prefix = format!("  ({}) ", entry.number);
        prettyprint_colored(&entry.question.text, Some(prefix.as_str()), None, Some(Color::Cyan))?;
        my_print!("\n")?;
        self.choices(&entry.question.options)
    }

    fn choices(&mut self, choices: &[String]) -> Result<()> {
        for (i, choice) in choices.iter().enumerate() {
            let prefix = format!("     ({}) ", choice_label(i));
            prettyprint(choice, Some(prefix.as_str()))?;
        }
        my_print!("\n")
    }

    /// Prompt until the user picks one of `count` options. `Ok(None)` means the user
    /// pressed Ctrl+D.
    pub fn prompt_choice(&mut self, count: usize) -> Result<Option<usize>> {
        loop {
            let response = match prompt("> ")? {
                Some(response) => response,
                None => {
                    return Ok(None);
                },
            };

            if let Some(index) = parse_choice(&response, count) {
                return Ok(Some(index));
            }
            my_println!("Please enter a letter between a and {}.", choice_label(count - 1))?;
        }
    }

    pub fn correct(&mut self) -> Result<()> {
        prettyprint(&format!("{}", "Correct!".green()), None)
    }

    pub fn incorrect(&mut self, entry: &Entry, correct_index: usize) -> Result<()> {
        match entry.question.options.get(correct_index) {
            Some(correction) => {
                let message = format!(
                    "{} The correct answer was ({}) {}.",
                    "Incorrect.".red(),
                    choice_label(correct_index),
                    correction.green(),
                );
                prettyprint(&message, None)
            },
            None => prettyprint(&format!("{}", "Incorrect.".red()), None),
        }
    }

    pub fn status(&mut self, text: &str) -> Result<()> {
        my_println!("{}", text)
    }

    pub fn instructions(&mut self, text: &str) -> Result<()> {
        my_print!("\n")?;
        prettyprint_colored(&text, Some("  "), Some(Color::BrightBlue), None)?;
        my_print!("\n")
    }

    pub fn warning(&mut self, text: &str) -> Result<()> {
        my_print!("\n")?;
        prettyprint_colored(&format!("Warning: {}", text), Some("  "), Some(Color::Red), None)?;
        my_print!("\n")
    }

    pub fn results(&mut self, summary: &SessionSummary) -> Result<()> {
        if summary.answered > 0 {
            let score_as_str = format!("{:.1}%", summary.score);

            my_print!("\n\n")?;
            my_print!("Score: ")?;
            my_print!("{}", score_as_str.cyan())?;
            my_print!(" out of ")?;
            my_print!("{}", format!("{}", summary.answered).cyan())?;
            if summary.answered == 1 {
                my_println!(" question")?;
            } else {
                my_println!(" questions")?;
            }
            my_print!("  {}", format!("{}", summary.correct).green())?;
            my_print!(" correct\n")?;
            my_print!("  {}", format!("{}", summary.incorrect).red())?;
            my_print!(" incorrect\n")?;
            if summary.repeated > 0 {
                my_print!("  {}", format!("{}", summary.repeated).yellow())?;
                my_print!(" repeated\n")?;
            }
            my_println!("  Longest streak: {}", summary.max_streak)?;
        }
        Ok(())
    }
}
