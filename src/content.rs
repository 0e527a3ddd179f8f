/**
 * Functions and data structures for reading and writing quiz documents in the
 * filesystem.
 *
 * Each course is a directory under the courses directory. It holds one file per week,
 * `<week>.json`, and optionally `course.json` with a display name:
 *
 * ```text
 * courses/
 *   cog_psy/
 *     course.json
 *     week1.json
 *     week2.json
 * ```
 */
use std::fs;
use std::path::{Component, Path, PathBuf};

use log::{info, warn};
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use super::common::{AdminCapability, McqError, Result};
use super::quiz::QuizDocument;
use super::session::QuestionSource;


const COURSE_FILE: &str = "course.json";
const COURSE_STEM: &str = "course";
const WEEK_PREFIX: &str = "week";


pub trait ContentStore {
    /// Load and validate the quiz for one week of a course.
    fn get_quiz(&self, course_id: &str, week_id: &str) -> Result<QuizDocument>;
    fn list_courses(&self) -> Result<Vec<CourseSummary>>;
    fn exists(&self, course_id: &str, week_id: &str) -> bool;
    /// Store a quiz. Overwriting an existing week needs `admin`.
    fn save_quiz(
        &self, request: &SaveRequest, admin: Option<&AdminCapability>
    ) -> Result<SaveReceipt>;
}


#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CourseInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}


#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CourseSummary {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub weeks: Vec<WeekSummary>,
    pub total_questions: usize,
}


#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WeekSummary {
    pub id: String,
    pub name: String,
    pub question_count: usize,
}


#[derive(Debug, Clone)]
pub struct SaveRequest {
    /// Course id as the user typed it. Normalized before use.
    pub course_id: String,
    /// Display name for a course that does not exist yet.
    pub course_name: Option<String>,
    /// Store under this week instead of the next free `week<N>`.
    pub week_id: Option<String>,
    pub overwrite: bool,
    pub document: QuizDocument,
}


#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReceipt {
    pub course_id: String,
    pub week_id: String,
    pub path: PathBuf,
    pub is_new_course: bool,
    pub question_count: usize,
}


pub struct FileContentStore {
    root: PathBuf,
}


impl FileContentStore {
    pub fn new(root: &Path) -> Self {
        Self { root: root.to_path_buf() }
    }

    fn course_path(&self, course_id: &str) -> Result<PathBuf> {
        check_id(course_id)?;
        Ok(self.root.join(course_id))
    }

    fn quiz_path(&self, course_id: &str, week_id: &str) -> Result<PathBuf> {
        check_id(week_id)?;
        // `course.json` holds the course metadata, not a quiz.
        if week_id.eq_ignore_ascii_case(COURSE_STEM) {
            return Err(McqError::InvalidId(week_id.to_string()));
        }
        let mut builder = self.course_path(course_id)?;
        builder.push(format!("{}.json", week_id));
        Ok(builder)
    }

    fn load_course_info(&self, course_dir: &Path) -> Option<CourseInfo> {
        let path = course_dir.join(COURSE_FILE);
        let data = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&data) {
            Ok(info) => Some(info),
            Err(e) => {
                warn!("ignoring malformed {}: {}", path.to_string_lossy(), e);
                None
            },
        }
    }

    /// Return the week ids stored for a course, ordered by week number.
    fn week_ids(&self, course_dir: &Path) -> Result<Vec<String>> {
        let mut weeks = Vec::new();
        for entry in course_dir.read_dir().map_err(McqError::Io)? {
            let path = entry.map_err(McqError::Io)?.path();
            if !path.is_file() || path.extension().map_or(true, |e| e != "json") {
                continue;
            }
            if path.file_name().map_or(false, |name| name == COURSE_FILE) {
                continue;
            }
            if let Some(stem) = path.file_stem() {
                weeks.push(String::from(stem.to_string_lossy()));
            }
        }
        weeks.sort_by(|a, b| cmp_week_ids(a, b));
        Ok(weeks)
    }

    fn next_week_id(&self, course_dir: &Path) -> Result<String> {
        let highest = if course_dir.exists() {
            self.week_ids(course_dir)?
                .iter()
                .filter_map(|id| week_number(id))
                .max()
                .unwrap_or(0)
        } else {
            0
        };
        Ok(format!("{}{}", WEEK_PREFIX, highest + 1))
    }

    /// List every content file, grouped by course. Paths are relative to the courses
    /// directory.
    pub fn list_files(&self, _admin: &AdminCapability) -> Result<Vec<(String, Vec<PathBuf>)>> {
        let mut listing = Vec::new();
        for course_id in self.course_ids()? {
            let course_dir = self.root.join(&course_id);
            let mut files = Vec::new();
            for entry in course_dir.read_dir().map_err(McqError::Io)? {
                let path = entry.map_err(McqError::Io)?.path();
                if path.is_file() {
                    if let Some(name) = path.file_name() {
                        files.push(Path::new(&course_id).join(name));
                    }
                }
            }
            files.sort();
            listing.push((course_id, files));
        }
        Ok(listing)
    }

    /// Return the contents of a file below the courses directory, pretty-printed if it
    /// is JSON.
    pub fn read_file(&self, _admin: &AdminCapability, relative: &str) -> Result<String> {
        let relative_path = Path::new(relative);
        let inside = relative_path.components().all(|c| match c {
            Component::Normal(_) => true,
            _ => false,
        });
        if relative.is_empty() || !inside {
            return Err(McqError::InvalidId(relative.to_string()));
        }

        let path = self.root.join(relative_path);
        let data = fs::read_to_string(&path).map_err(McqError::Io)?;
        match serde_json::from_str::<serde_json::Value>(&data) {
            Ok(value) => serde_json::to_string_pretty(&value).map_err(McqError::Json),
            Err(_) => Ok(data),
        }
    }

    fn course_ids(&self) -> Result<Vec<String>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::new();
        for entry in self.root.read_dir().map_err(McqError::Io)? {
            let entry = entry.map_err(McqError::Io)?;
            if let Ok(file_type) = entry.file_type() {
                if !file_type.is_dir() {
                    continue;
                }
            }
            let name = String::from(entry.file_name().to_string_lossy());
            // For example, a .git directory.
            if name.starts_with(".") {
                continue;
            }
            ids.push(name);
        }
        ids.sort();
        Ok(ids)
    }
}


impl ContentStore for FileContentStore {
    fn get_quiz(&self, course_id: &str, week_id: &str) -> Result<QuizDocument> {
        let path = self.quiz_path(course_id, week_id)?;
        if !path.is_file() {
            return Err(McqError::ContentNotFound {
                course_id: course_id.to_string(),
                week_id: week_id.to_string(),
            });
        }

        let data = fs::read_to_string(&path).map_err(McqError::Io)?;
        QuizDocument::from_json(&data)
    }

    fn list_courses(&self) -> Result<Vec<CourseSummary>> {
        let mut courses = Vec::new();
        for course_id in self.course_ids()? {
            let course_dir = self.root.join(&course_id);
            let info = self.load_course_info(&course_dir);

            let mut weeks = Vec::new();
            for week_id in self.week_ids(&course_dir)? {
                match self.get_quiz(&course_id, &week_id) {
                    Ok(quiz) => {
                        weeks.push(WeekSummary {
                            name: week_name(&week_id),
                            id: week_id,
                            question_count: quiz.questions.len(),
                        });
                    },
                    Err(e) => {
                        warn!("skipping {}/{}: {}", course_id, week_id, e);
                    },
                }
            }

            let total_questions = weeks.iter().map(|w| w.question_count).sum();
            let (name, description) = match info {
                Some(info) => (info.name, info.description),
                None => (course_id.clone(), None),
            };
            courses.push(CourseSummary { id: course_id, name, description, weeks, total_questions });
        }
        Ok(courses)
    }

    fn exists(&self, course_id: &str, week_id: &str) -> bool {
        self.quiz_path(course_id, week_id).map(|p| p.is_file()).unwrap_or(false)
    }

    fn save_quiz(
        &self, request: &SaveRequest, admin: Option<&AdminCapability>
    ) -> Result<SaveReceipt> {
        request.document.validate()?;

        let course_id = normalize_course_id(&request.course_id)?;
        let course_dir = self.course_path(&course_id)?;
        let week_id = match &request.week_id {
            Some(week_id) => week_id.trim().to_string(),
            None => self.next_week_id(&course_dir)?,
        };
        let path = self.quiz_path(&course_id, &week_id)?;

        if path.exists() {
            if !request.overwrite {
                return Err(McqError::Conflict(path));
            }
            if admin.is_none() {
                return Err(McqError::AdminRequired);
            }
        }

        let is_new_course = !course_dir.exists();
        if is_new_course {
            fs::create_dir_all(&course_dir).map_err(McqError::Io)?;
            info!("created course directory {}", course_dir.to_string_lossy());
        }

        let info_path = course_dir.join(COURSE_FILE);
        if !info_path.exists() {
            let name = request.course_name.clone()
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| request.course_id.trim().to_string());
            let info = CourseInfo { name, description: Some(request.document.title.clone()) };
            let serialized = serde_json::to_string_pretty(&info).map_err(McqError::Json)?;
            fs::write(&info_path, serialized)
                .or(Err(McqError::CannotWriteToFile(info_path.clone())))?;
        }

        let serialized = request.document.to_json()?;
        fs::write(&path, serialized).or(Err(McqError::CannotWriteToFile(path.clone())))?;
        info!("saved quiz to {}", path.to_string_lossy());

        Ok(SaveReceipt {
            course_id,
            week_id,
            path,
            is_new_course,
            question_count: request.document.questions.len(),
        })
    }
}


/// Load every stored quiz, skipping the ones that fail to load. Used to build a
/// practice session across courses.
pub fn load_practice_pool<C: ContentStore + ?Sized>(
    store: &C
) -> Result<Vec<(QuestionSource, QuizDocument)>> {
    let mut pool = Vec::new();
    for course in store.list_courses()? {
        for week in course.weeks.iter() {
            match store.get_quiz(&course.id, &week.id) {
                Ok(quiz) => pool.push((QuestionSource::new(&course.id, &week.id), quiz)),
                Err(e) => warn!("could not load questions for {}/{}: {}", course.id, week.id, e),
            }
        }
    }
    Ok(pool)
}


/// Lowercase the id and replace runs of whitespace with underscores, e.g.
/// `Cognitive Psychology` becomes `cognitive_psychology`.
pub fn normalize_course_id(raw: &str) -> Result<String> {
    let normalized: String = raw.nfc().collect::<String>().to_lowercase();
    let id = normalized.split_whitespace().collect::<Vec<&str>>().join("_");
    check_id(&id)?;
    Ok(id)
}


/// Ids become file names, so they must be a single, ordinary path component.
fn check_id(id: &str) -> Result<()> {
    let valid = !id.is_empty()
        && !id.starts_with(".")
        && !id.contains(|c: char| c == '/' || c == '\\' || c.is_control());
    if valid {
        Ok(())
    } else {
        Err(McqError::InvalidId(id.to_string()))
    }
}


fn week_number(week_id: &str) -> Option<u32> {
    if week_id.starts_with(WEEK_PREFIX) {
        week_id[WEEK_PREFIX.len()..].parse().ok()
    } else {
        None
    }
}


/// `week3` is shown as `Week 3`; other ids are shown as they are.
pub fn week_name(week_id: &str) -> String {
    match week_number(week_id) {
        Some(n) => format!("Week {}", n),
        None => week_id.to_string(),
    }
}


/// Numbered weeks come first in numeric order, then any other ids alphabetically.
fn cmp_week_ids(a: &str, b: &str) -> std::cmp::Ordering {
    match (week_number(a), week_number(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}
