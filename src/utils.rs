use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

const DOCUMENT_EXTENSIONS: [&str; 2] = ["txt", "md"];

/// A plain-text document read from disk, before chunking.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDocument {
    pub title: String,
    pub source: String,
    pub content: String,
}

/// Splits text into chunks of at most `max_chars` characters at sentence boundaries.
///
/// Sentences longer than `max_chars` are cut on character boundaries.
pub fn split_into_chunks(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    if max_chars == 0 {
        return chunks;
    }

    let mut current_chunk = String::new();
    let mut current_length = 0;

    for sentence in text.split(['.', '!', '?']) {
        let sentence = sentence.trim();
        if sentence.is_empty() {
            continue;
        }

        // Account for the terminating '.' that gets re-appended.
        let sentence_len = sentence.chars().count() + 1;
        if sentence_len > max_chars {
            if !current_chunk.is_empty() {
                chunks.push(std::mem::take(&mut current_chunk));
                current_length = 0;
            }
            chunks.extend(hard_split(sentence, max_chars));
            continue;
        }

        let separator = usize::from(!current_chunk.is_empty());
        if current_length + separator + sentence_len > max_chars {
            chunks.push(std::mem::take(&mut current_chunk));
            current_length = 0;
        } else if separator == 1 {
            current_chunk.push(' ');
            current_length += 1;
        }

        current_chunk.push_str(sentence);
        current_chunk.push('.');
        current_length += sentence_len;
    }

    if !current_chunk.is_empty() {
        chunks.push(current_chunk);
    }

    chunks
}

fn hard_split(sentence: &str, max_chars: usize) -> Vec<String> {
    let chars: Vec<char> = sentence.chars().collect();
    chars
        .chunks(max_chars)
        .map(|piece| piece.iter().collect::<String>().trim().to_string())
        .filter(|piece| !piece.is_empty())
        .collect()
}

/// Loads every `.txt` and `.md` file under `dir_path`, recursively, sorted by path.
///
/// A missing directory yields no documents.
pub fn load_documents(dir_path: impl AsRef<Path>) -> Result<Vec<SourceDocument>> {
    let dir_path = dir_path.as_ref();
    if !dir_path.exists() {
        return Ok(Vec::new());
    }

    let mut paths = Vec::new();
    collect_document_paths(dir_path, &mut paths)?;
    paths.sort();

    paths
        .into_iter()
        .map(|path| {
            let content = fs::read_to_string(&path)?;
            let title = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default();
            Ok(SourceDocument {
                title,
                source: path.display().to_string(),
                content,
            })
        })
        .collect()
}

fn collect_document_paths(dir: &Path, paths: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();

        if path.is_dir() {
            collect_document_paths(&path, paths)?;
        } else if path.is_file() && has_document_extension(&path) {
            paths.push(path);
        }
    }
    Ok(())
}

fn has_document_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            DOCUMENT_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}
