/**
 * Definitions of data structures used by several modules, such as `McqError`, the
 * admin capability and the various structs that hold command-line arguments.
 */
use std::env;
use std::error;
use std::fmt;
use std::io;
use std::path::PathBuf;

use structopt::StructOpt;


pub type Result<T> = ::std::result::Result<T, McqError>;


/// Environment variable holding the admin token.
pub const ADMIN_TOKEN_VAR: &str = "MCQ_ADMIN_TOKEN";


#[derive(Debug)]
pub enum McqError {
    /// For when the application directory cannot be created.
    CannotMakeAppDir(PathBuf),
    /// No quiz document exists for the requested course and week.
    ContentNotFound { course_id: String, week_id: String },
    /// A quiz document failed validation. Holds one message per violation.
    InvalidQuizFormat(Vec<String>),
    EmptyQuiz,
    /// Recording an answer failed. Never aborts a session.
    HistoryPersistenceFailure(String),
    /// A course, week or storage identifier that cannot be used as a file name.
    InvalidId(String),
    /// The target file exists and overwriting was not requested.
    Conflict(PathBuf),
    /// The operation needs an admin capability.
    AdminRequired,
    /// For JSON errors.
    Json(serde_json::Error),
    CannotWriteToFile(PathBuf),
    Io(io::Error),
    ReadlineInterrupted,
    AlreadyAnswered,
    NotAnswered,
    SessionCompleted,
    OptionOutOfRange { selected: usize, available: usize },
}


impl fmt::Display for McqError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            McqError::CannotMakeAppDir(ref path) => {
                write!(
                    f, "unable to create application directory at {}",
                    path.to_string_lossy()
                )
            },
            McqError::ContentNotFound { ref course_id, ref week_id } => {
                write!(f, "no quiz found for {}/{}", course_id, week_id)
            },
            McqError::InvalidQuizFormat(ref violations) => {
                write!(f, "invalid quiz format: {}", violations.join("; "))
            },
            McqError::EmptyQuiz => {
                write!(f, "no questions found")
            },
            McqError::HistoryPersistenceFailure(ref reason) => {
                write!(f, "could not save answer history ({})", reason)
            },
            McqError::InvalidId(ref id) => {
                write!(f, "'{}' is not a valid identifier", id)
            },
            McqError::Conflict(ref path) => {
                write!(
                    f, "file already exists at '{}' (pass --overwrite to replace it)",
                    path.to_string_lossy()
                )
            },
            McqError::AdminRequired => {
                write!(f, "admin privileges required (check --admin-token)")
            },
            McqError::Json(ref err) => {
                write!(f, "could not parse JSON ({})", err)
            },
            McqError::CannotWriteToFile(ref path) => {
                write!(f, "cannot write to file '{}'", path.to_string_lossy())
            },
            McqError::Io(ref err) => {
                write!(f, "IO error ({})", err)
            },
            McqError::ReadlineInterrupted => {
                Ok(())
            },
            McqError::AlreadyAnswered => {
                write!(f, "the current question has already been answered")
            },
            McqError::NotAnswered => {
                write!(f, "the current question has not been answered yet")
            },
            McqError::SessionCompleted => {
                write!(f, "the session is already complete")
            },
            McqError::OptionOutOfRange { selected, available } => {
                write!(
                    f, "option {} is out of range (the question has {} options)",
                    selected, available
                )
            },
        }
    }
}


impl error::Error for McqError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            McqError::Json(ref err) => Some(err),
            McqError::Io(ref err) => Some(err),
            _ => None,
        }
    }
}


pub fn is_broken_pipe(e: &McqError) -> bool {
    if let McqError::Io(e) = e {
        if let io::ErrorKind::BrokenPipe = e.kind() {
            return true;
        }
    }
    false
}


/// Proof that the caller presented the configured admin token. Operations that
/// delete or overwrite stored data take a reference to one.
#[derive(Debug)]
pub struct AdminCapability {
    _private: (),
}


impl AdminCapability {
    /// Grant the capability if `presented` matches the configured token. An unset or
    /// empty configured token grants nothing.
    pub fn grant(presented: Option<&str>, configured: Option<&str>) -> Result<Self> {
        match (presented, configured) {
            (Some(presented), Some(configured))
                if !configured.is_empty() && presented == configured =>
            {
                Ok(AdminCapability { _private: () })
            },
            _ => Err(McqError::AdminRequired),
        }
    }

    /// Like `grant`, with the configured token read from `MCQ_ADMIN_TOKEN`.
    pub fn from_env(presented: Option<&str>) -> Result<Self> {
        let configured = env::var(ADMIN_TOKEN_VAR).ok();
        AdminCapability::grant(presented, configured.as_deref())
    }
}


/// Holds the command-line configuration for the application.
#[derive(StructOpt)]
#[structopt(name = "mcq", about = "Practice multiple-choice quizzes from the command line.")]
pub struct Options {
    /// Keep courses and history in a particular directory.
    #[structopt(short = "d", long = "directory", parse(from_os_str))]
    pub directory: Option<PathBuf>,
    /// Do not emit colorized output.
    #[structopt(long = "no-color")]
    pub no_color: bool,
    #[structopt(subcommand)]
    pub cmd: Command,
}

#[derive(StructOpt)]
pub enum Command {
    /// Take the quiz for one week of a course.
    #[structopt(name = "take")]
    Take(TakeOptions),
    /// Practice questions from every course until each one is answered correctly.
    #[structopt(name = "practice")]
    Practice(PracticeOptions),
    /// List courses and their weeks.
    #[structopt(name = "ls")]
    Ls,
    /// Store a quiz JSON file as a new week of a course.
    #[structopt(name = "upload")]
    Upload(UploadOptions),
    /// Check a quiz JSON file without storing it.
    #[structopt(name = "validate")]
    Validate(ValidateOptions),
    /// Report answer history for a quiz.
    #[structopt(name = "results")]
    Results(ResultsOptions),
    /// Inspect the raw content files (admin only).
    #[structopt(name = "debug")]
    Debug(DebugOptions),
    /// Forget recorded answers (admin only).
    #[structopt(name = "clear-history")]
    ClearHistory(ClearHistoryOptions),
}

#[derive(StructOpt)]
pub struct TakeOptions {
    /// The course the quiz belongs to.
    pub course: String,
    /// The week of the course, e.g. `week1`.
    pub week: String,
    /// Do not record answers in the history.
    #[structopt(long = "no-save")]
    pub no_save: bool,
}

#[derive(StructOpt)]
pub struct PracticeOptions {
    /// Limit the number of distinct questions.
    #[structopt(short = "n", default_value = "25")]
    pub limit: usize,
    /// Do not record answers in the history.
    #[structopt(long = "no-save")]
    pub no_save: bool,
}

#[derive(StructOpt)]
pub struct UploadOptions {
    /// Path to the quiz JSON file.
    #[structopt(parse(from_os_str))]
    pub path: PathBuf,
    /// The course to add the quiz to. Created if it does not exist.
    #[structopt(short = "c", long = "course")]
    pub course: String,
    /// Display name for a new course.
    #[structopt(long = "name")]
    pub course_name: Option<String>,
    /// Store under this week instead of the next free one.
    #[structopt(short = "w", long = "week")]
    pub week: Option<String>,
    /// Replace an existing quiz (admin only).
    #[structopt(long = "overwrite")]
    pub overwrite: bool,
    #[structopt(long = "admin-token")]
    pub admin_token: Option<String>,
}

#[derive(StructOpt)]
pub struct ValidateOptions {
    /// Path to the quiz JSON file.
    #[structopt(parse(from_os_str))]
    pub path: PathBuf,
}

#[derive(StructOpt)]
pub struct ResultsOptions {
    pub course: String,
    pub week: String,
}

#[derive(StructOpt)]
pub struct DebugOptions {
    #[structopt(long = "admin-token")]
    pub admin_token: Option<String>,
    /// Print one file, given relative to the courses directory.
    #[structopt(long = "show")]
    pub show: Option<String>,
}

#[derive(StructOpt)]
pub struct ClearHistoryOptions {
    /// Only clear history for this course.
    pub course: Option<String>,
    /// Only clear history for this week of the course.
    pub week: Option<String>,
    #[structopt(long = "admin-token")]
    pub admin_token: Option<String>,
    /// Clear without prompting for confirmation.
    #[structopt(short = "f", long = "force")]
    pub force: bool,
}
