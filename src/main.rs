/**
 * Take multiple-choice quizzes from the command line.
 */
use std::env;
use std::fs;
use std::io::Write;
use std::path::Path;

use colored::*;
use dotenv::dotenv;
use log::{debug, LevelFilter};
use rand::{thread_rng, Rng};
use structopt::StructOpt;

use mcq::common::{
    is_broken_pipe, AdminCapability, ClearHistoryOptions, Command, DebugOptions, McqError,
    Options, PracticeOptions, Result, ResultsOptions, TakeOptions, UploadOptions,
    ValidateOptions,
};
use mcq::content::{self, ContentStore, FileContentStore, SaveRequest};
use mcq::history::HistoryStore;
use mcq::iohelper::{confirm, prettyprint_colored};
use mcq::persistence::{self, FileStorage};
use mcq::quiz::QuizDocument;
use mcq::repetition;
use mcq::session::{Advance, QuestionSource, Session, SessionMode, SessionSummary};
use mcq::ui::CmdUI;
use mcq::{my_print, my_println};


fn main() {
    dotenv().ok();
    init_logging();

    let options = Options::from_args();
    if options.no_color {
        colored::control::set_override(false);
    }

    let dir = persistence::get_app_dir_path(options.directory.as_ref().map(|p| p.as_path()));
    debug!("using data directory {}", dir.to_string_lossy());
    if let Err(e) = persistence::require_app_dir_path(&dir) {
        eprintln!("{}: {}", "Error".red(), e);
        ::std::process::exit(2);
    }

    let result = match options.cmd {
        Command::Take(options) => main_take(&dir, options),
        Command::Practice(options) => main_practice(&dir, options),
        Command::Ls => main_ls(&dir),
        Command::Upload(options) => main_upload(&dir, options),
        Command::Validate(options) => main_validate(options),
        Command::Results(options) => main_results(&dir, options),
        Command::Debug(options) => main_debug(&dir, options),
        Command::ClearHistory(options) => main_clear_history(&dir, options),
    };

    if let Err(e) = result {
        if !is_broken_pipe(&e) {
            eprintln!("{}: {}", "Error".red(), e);
            ::std::process::exit(2);
        }
    }
}


fn init_logging() {
    let mut builder = pretty_env_logger::formatted_builder();
    builder.filter_level(LevelFilter::Warn);
    if let Ok(filters) = env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.init();
}


/// The main function for the `take` subcommand.
fn main_take(dir: &Path, options: TakeOptions) -> Result<()> {
    let course_id = content::normalize_course_id(&options.course)?;
    let store = open_content(dir);
    let quiz = store.get_quiz(&course_id, &options.week)?;

    let mut history = open_history(dir);
    let outcomes = history.get_outcomes(&course_id, &options.week);
    let source = QuestionSource::new(&course_id, &options.week);
    let session = Session::start(source, &quiz, &outcomes, SessionMode::Linear, thread_rng())?;

    let mut ui = CmdUI::new();
    ui.instructions(&quiz.title)?;
    if options.no_save {
        ui.warning("answers in this session will not be recorded.")?;
    }
    let extra = (session.remaining() + 1).saturating_sub(quiz.questions.len());
    if extra > 0 {
        ui.status(&format!("{} added for practice.", plural(extra, "repeat")))?;
    }

    let summary = run_session(session, &mut ui, &mut history, !options.no_save)?;
    ui.results(&summary)
}


/// The main function for the `practice` subcommand.
fn main_practice(dir: &Path, options: PracticeOptions) -> Result<()> {
    let store = open_content(dir);
    let pool = content::load_practice_pool(&store)?;
    let session = Session::start_practice(&pool, options.limit, thread_rng())?;

    let mut ui = CmdUI::with_source();
    ui.instructions(
        "Each missed question comes back until you have answered it correctly as many \
         times as you missed it."
    )?;
    if options.no_save {
        ui.warning("answers in this session will not be recorded.")?;
    }
    let mut history = open_history(dir);
    let summary = run_session(session, &mut ui, &mut history, !options.no_save)?;
    ui.results(&summary)
}


/// Present questions until the session completes or the user quits. Answers are
/// recorded one at a time, so quitting early keeps what was answered.
fn run_session<R: Rng>(
    mut session: Session<R>,
    ui: &mut CmdUI,
    history: &mut HistoryStore<FileStorage>,
    save: bool,
) -> Result<SessionSummary> {
    let mut entry = match session.current() {
        Some(entry) => entry,
        None => {
            return Ok(session.summary());
        },
    };

    loop {
        ui.question(&entry)?;
        let selected = match ui.prompt_choice(entry.question.options.len()) {
            Ok(Some(selected)) => selected,
            Ok(None) | Err(McqError::ReadlineInterrupted) => {
                break;
            },
            Err(e) => {
                return Err(e);
            },
        };

        let outcome = session.submit_answer(selected)?;
        if outcome.is_correct {
            ui.correct()?;
        } else {
            ui.incorrect(&entry, outcome.correct_index)?;
        }

        if save {
            history.record_or_log(
                &outcome.source.course_id,
                &outcome.source.week_id,
                outcome.original_index,
                outcome.is_correct,
            );
        }

        match session.advance()? {
            Advance::Next(next) => {
                entry = next;
            },
            Advance::Completed(summary) => {
                return Ok(summary);
            },
        }
    }

    Ok(session.summary())
}


/// The main function for the `ls` subcommand.
fn main_ls(dir: &Path) -> Result<()> {
    let courses = open_content(dir).list_courses()?;
    if courses.is_empty() {
        my_println!("No courses found.")?;
        return Ok(());
    }

    my_println!("Available courses:")?;
    for course in courses.iter() {
        my_println!(
            "  {}: {} ({})",
            course.id.cyan(),
            course.name,
            plural(course.total_questions, "question")
        )?;
        for week in course.weeks.iter() {
            my_println!(
                "    {:<8} {} ({})",
                week.id,
                week.name,
                plural(week.question_count, "question")
            )?;
        }
    }
    Ok(())
}


/// The main function for the `upload` subcommand.
fn main_upload(dir: &Path, options: UploadOptions) -> Result<()> {
    let data = fs::read_to_string(&options.path).map_err(McqError::Io)?;
    let document = QuizDocument::from_json(&data)?;

    let admin = match options.admin_token {
        Some(ref token) => Some(AdminCapability::from_env(Some(token.as_str()))?),
        None => None,
    };

    let request = SaveRequest {
        course_id: options.course,
        course_name: options.course_name,
        week_id: options.week,
        overwrite: options.overwrite,
        document,
    };
    let receipt = open_content(dir).save_quiz(&request, admin.as_ref())?;

    if receipt.is_new_course {
        my_println!("Created course {}.", receipt.course_id.cyan())?;
    }
    my_println!(
        "Saved {} to {}/{}.",
        plural(receipt.question_count, "question"),
        receipt.course_id,
        receipt.week_id
    )
}


/// The main function for the `validate` subcommand.
fn main_validate(options: ValidateOptions) -> Result<()> {
    let data = fs::read_to_string(&options.path).map_err(McqError::Io)?;
    let document = QuizDocument::from_json(&data)?;
    my_println!(
        "'{}' is a valid quiz with {}.",
        document.title,
        plural(document.questions.len(), "question")
    )
}


/// The main function for the `results` subcommand.
fn main_results(dir: &Path, options: ResultsOptions) -> Result<()> {
    let course_id = content::normalize_course_id(&options.course)?;
    let quiz = open_content(dir).get_quiz(&course_id, &options.week)?;
    let outcomes = open_history(dir).get_outcomes(&course_id, &options.week);

    if outcomes.is_empty() {
        my_println!("No results have been recorded for this quiz.")?;
        return Ok(());
    }

    let mut flagged = 0;
    for (index, record) in outcomes.iter() {
        let question = match quiz.questions.get(*index) {
            Some(question) => question,
            None => {
                continue;
            },
        };
        // Only include questions that have scored results.
        if let Some(score) = repetition::aggregate_results(record) {
            let first_prefix = format!("{:>5.1}%  of {:>2}   ", score, record.attempts());
            if repetition::needs_practice(record) {
                flagged += 1;
                let text = format!("{} (needs practice)", question.text);
                prettyprint_colored(&text, Some(first_prefix.as_str()), None, Some(Color::Red))?;
            } else {
                prettyprint_colored(
                    &question.text, Some(first_prefix.as_str()), None, Some(Color::Cyan)
                )?;
            }
        }
    }

    my_print!("\n")?;
    my_println!("{} of {} need practice.", flagged, plural(quiz.questions.len(), "question"))
}


/// The main function for the `debug` subcommand.
fn main_debug(dir: &Path, options: DebugOptions) -> Result<()> {
    let admin = AdminCapability::from_env(options.admin_token.as_ref().map(|s| s.as_str()))?;
    let store = open_content(dir);

    if let Some(ref relative) = options.show {
        let contents = store.read_file(&admin, relative)?;
        return my_println!("{}", contents);
    }

    my_println!("{}", persistence::get_courses_dir_path(dir).to_string_lossy())?;
    for (course_id, files) in store.list_files(&admin)? {
        my_println!("  {}/", course_id)?;
        for file in files.iter() {
            my_println!("    {}", file.to_string_lossy())?;
        }
    }
    Ok(())
}


/// The main function for the `clear-history` subcommand.
fn main_clear_history(dir: &Path, options: ClearHistoryOptions) -> Result<()> {
    let admin = AdminCapability::from_env(options.admin_token.as_ref().map(|s| s.as_str()))?;

    let target = match options.course {
        Some(ref course) => {
            let course_id = content::normalize_course_id(course)?;
            match options.week {
                Some(ref week) => format!("{}/{}", course_id, week),
                None => course_id,
            }
        },
        None => String::from("all courses"),
    };

    let ask_prompt = format!("Are you sure you want to clear the history for {}? ", target);
    if !options.force && !confirm(&ask_prompt) {
        return Ok(());
    }

    let mut history = open_history(dir);
    match options.course {
        Some(ref course) => {
            let course_id = content::normalize_course_id(course)?;
            let week_id = options.week.as_ref().map(|s| s.as_str());
            let removed = history.clear(&admin, &course_id, week_id)?;
            my_println!("Cleared history for {}.", plural(removed, "quiz"))
        },
        None => {
            history.clear_all(&admin)?;
            my_println!("Cleared all history.")
        },
    }
}


fn open_content(dir: &Path) -> FileContentStore {
    FileContentStore::new(&persistence::get_courses_dir_path(dir))
}


fn open_history(dir: &Path) -> HistoryStore<FileStorage> {
    HistoryStore::new(FileStorage::new(&persistence::get_storage_dir_path(dir)))
}


fn plural(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("{} {}", n, noun)
    } else if noun.ends_with("z") {
        format!("{} {}zes", n, noun)
    } else {
        format!("{} {}s", n, noun)
    }
}
