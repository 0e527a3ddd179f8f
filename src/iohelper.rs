/**
 * Helper functions for input and output.
 */
use colored::*;
use std::io::Write;

use rustyline::error::ReadlineError;

use super::common::{McqError, Result};

#[macro_export]
macro_rules! my_println {
    ($($arg:tt)*) => (
        writeln!(std::io::stdout(), $($arg)*).map_err($crate::common::McqError::Io)
    );
}

#[macro_export]
macro_rules! my_print {
    ($($arg:tt)*) => (
        write!(std::io::stdout(), $($arg)*).map_err($crate::common::McqError::Io)
    );
}

/// Display a prompt and read a line from standard input continually until the user
/// enters a line with at least one non-whitespace character. If the user presses Ctrl+D
/// then `Ok(None)` is returned. If the user pressed Ctrl+C then
/// `Err(McqError::ReadlineInterrupted)` is returned. Otherwise, `Ok(Some(line))` is
/// returned where `line` is the last line of input the user entered without leading
/// and trailing whitespace.
pub fn prompt(message: &str) -> Result<Option<String>> {
    let mut rl = rustyline::Editor::<()>::new();
    loop {
        let result = rl.readline(message);
        match result {
            Ok(response) => {
                let response = response.trim();
                if response.len() > 0 {
                    return Ok(Some(response.to_string()));
                }
            }
            // Return immediately if the user hits Ctrl+D or Ctrl+C.
            Err(ReadlineError::Interrupted) => {
                return Err(McqError::ReadlineInterrupted);
            }
            Err(ReadlineError::Eof) => {
                return Ok(None);
            }
            _ => {}
        }
    }
}

/// Prompt the user with a yes-no question and return `true` if they enter yes.
pub fn confirm(message: &str) -> bool {
    match prompt(message) {
        Ok(Some(response)) => {
            response.trim_start().to_lowercase().starts_with("y")
        },
        _ => false
    }
}

/// Print `message` to standard output, breaking lines according to the current width
/// of the terminal. Prepend `prefix` to the first line and indent all subsequent lines
/// by its length.
pub fn prettyprint(message: &str, prefix: Option<&str>) -> Result<()> {
    prettyprint_colored(message, prefix, None, None)
}

pub fn prettyprint_colored(
    message: &str,
    prefix: Option<&str>,
    message_color: Option<Color>,
    prefix_color: Option<Color>,
) -> Result<()> {
    let prefix = prefix.unwrap_or("");
    let width = textwrap::termwidth().saturating_sub(prefix.len()).max(20);
    let mut lines = textwrap::wrap_iter(message, width);

    if let Some(first_line) = lines.next() {
        let colored_prefix = color_optional(&prefix, prefix_color);
        let colored_line = color_optional(&first_line, message_color);
        my_println!("{}{}", colored_prefix, colored_line)?;
    }

    let indent = " ".repeat(prefix.len());
    for line in lines {
        let colored_line = color_optional(&line, message_color);
        my_println!("{}{}", indent, colored_line)?;
    }
    Ok(())
}

fn color_optional(text: &str, color: Option<Color>) -> ColoredString {
    if let Some(color) = color {
        text.color(color)
    } else {
        text.normal()
    }
}

/// Turn a response like `b` or `2` into a zero-based option index, or `None` if the
/// response does not name one of the first `count` options.
pub fn parse_choice(response: &str, count: usize) -> Option<usize> {
    let response = response.trim().to_ascii_lowercase();
    let index = if let Ok(number) = response.parse::<usize>() {
        number.checked_sub(1)?
    } else {
        let mut chars = response.chars();
        let letter = chars.next()?;
        if chars.next().is_some() || !letter.is_ascii_lowercase() {
            return None;
        }
        (letter as u8 - b'a') as usize
    };

    if index < count {
        Some(index)
    } else {
        None
    }
}

/// The label shown before the option at `index`: a letter while they last, then a
/// number.
pub fn choice_label(index: usize) -> String {
    if index < 26 {
        ((b'a' + index as u8) as char).to_string()
    } else {
        (index + 1).to_string()
    }
}
