//! Word list document loading and validation.
//!
//! The input is a JSON array of category objects.  Only the `words` array of
//! each category and the `id` / `name` of each word are read; every other
//! field is ignored.
//!
//! ```json
//! [
//!   { "id": "animals", "words": [ { "id": "cat", "name": "Cat", "image": "…" } ] },
//!   { "id": "food",    "words": [ { "id": "apple", "name": "Apple" } ] }
//! ]
//! ```
//!
//! Entries with a missing or blank `id`/`name` are skipped with a warning.
//! Duplicate ids reject the whole document so that no request is made for an
//! ambiguous list.  So do ids that could escape the output directory once
//! joined into a file name (`/`, `\`, `..`).

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

// ---------------------------------------------------------------------------
// WordListError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum WordListError {
    #[error("failed to read word list {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("word list is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("word list must be a JSON array of categories")]
    NotAnArray,

    #[error("duplicate word id {0:?}")]
    DuplicateId(String),

    #[error("word id {0:?} cannot be used as a file name")]
    UnsafeId(String),
}

// ---------------------------------------------------------------------------
// WordRecord
// ---------------------------------------------------------------------------

/// One word to pronounce.  Both fields are trimmed and non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordRecord {
    /// File-name stem of the generated audio (`{id}_normal.wav`).
    pub id: String,
    /// Text that is spoken.
    pub name: String,
}

impl WordRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Read and validate the word list at `path`.
pub fn load_words(path: &Path) -> Result<Vec<WordRecord>, WordListError> {
    let content = std::fs::read_to_string(path).map_err(|source| WordListError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_words(&content)
}

/// Parse and validate a word list document.
pub fn parse_words(json: &str) -> Result<Vec<WordRecord>, WordListError> {
    let doc: Value = serde_json::from_str(json)?;
    extract_words(&doc)
}

/// Collect the words of every category, in document order.
pub fn extract_words(doc: &Value) -> Result<Vec<WordRecord>, WordListError> {
    let categories = doc.as_array().ok_or(WordListError::NotAnArray)?;

    let mut words = Vec::new();
    let mut seen = HashSet::new();

    for category in categories {
        let Some(entries) = category.get("words").and_then(Value::as_array) else {
            continue;
        };

        for entry in entries {
            let id = trimmed_field(entry, "id");
            let name = trimmed_field(entry, "name");

            let (Some(id), Some(name)) = (id, name) else {
                log::warn!("skipping word entry without id/name: {entry}");
                continue;
            };

            if !is_safe_file_stem(&id) {
                return Err(WordListError::UnsafeId(id));
            }
            if !seen.insert(id.clone()) {
                return Err(WordListError::DuplicateId(id));
            }
            words.push(WordRecord { id, name });
        }
    }

    Ok(words)
}

fn is_safe_file_stem(id: &str) -> bool {
    !id.contains(['/', '\\', '\0']) && !id.contains("..")
}

fn trimmed_field(entry: &Value, key: &str) -> Option<String> {
    entry
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn extracts_words_across_categories_in_order() {
        let words = parse_words(
            r#"[
                {"id": "animals", "words": [{"id": "cat", "name": "Cat", "emoji": "🐱"}]},
                {"id": "food", "words": [{"id": "apple", "name": "Apple"}, {"id": "egg", "name": "Egg"}]}
            ]"#,
        )
        .unwrap();

        assert_eq!(
            words,
            vec![
                WordRecord::new("cat", "Cat"),
                WordRecord::new("apple", "Apple"),
                WordRecord::new("egg", "Egg"),
            ]
        );
    }

    #[test]
    fn trims_and_skips_invalid_entries() {
        let words = parse_words(
            r#"[{"words": [
                {"id": "  dog ", "name": " Dog  "},
                {"id": "", "name": "Blank"},
                {"id": "noname"},
                {"id": 7, "name": "Number"},
                {"id": "ws", "name": "   "},
                "not an object"
            ]}]"#,
        )
        .unwrap();

        assert_eq!(words, vec![WordRecord::new("dog", "Dog")]);
    }

    #[test]
    fn categories_without_words_are_ignored() {
        let words = parse_words(r#"[{"id": "empty"}, {"words": "nope"}, 3, null]"#).unwrap();
        assert!(words.is_empty());
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let err = parse_words(
            r#"[
                {"words": [{"id": "cat", "name": "Cat"}]},
                {"words": [{"id": " cat ", "name": "Kitty"}]}
            ]"#,
        )
        .unwrap_err();

        assert!(matches!(err, WordListError::DuplicateId(ref id) if id == "cat"));
    }

    #[test]
    fn ids_that_escape_the_output_dir_are_rejected() {
        for id in ["../x", "a/b", r"a\b", ".."] {
            let doc = serde_json::json!([{ "words": [{ "id": id, "name": "X" }] }]);
            let err = extract_words(&doc).unwrap_err();
            assert!(
                matches!(err, WordListError::UnsafeId(ref bad) if bad == id),
                "id {id:?}"
            );
        }
    }

    #[test]
    fn dotted_ids_are_fine() {
        let words = parse_words(r#"[{"words": [{"id": "mr.smith", "name": "Mr. Smith"}]}]"#).unwrap();
        assert_eq!(words[0].id, "mr.smith");
    }

    #[test]
    fn top_level_must_be_an_array() {
        let err = parse_words(r#"{"words": []}"#).unwrap_err();
        assert!(matches!(err, WordListError::NotAnArray));
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(matches!(parse_words("[{"), Err(WordListError::Json(_))));
    }

    #[test]
    fn load_from_file() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("categories.json");
        std::fs::write(&path, r#"[{"words": [{"id": "sun", "name": "Sun"}]}]"#).unwrap();

        let words = load_words(&path).unwrap();
        assert_eq!(words, vec![WordRecord::new("sun", "Sun")]);
    }

    #[test]
    fn missing_file_reports_path() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("missing.json");

        let err = load_words(&path).unwrap_err();
        assert!(err.to_string().contains("missing.json"));
    }
}
