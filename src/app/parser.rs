use crate::app::models::DirectiveSet;
use std::io::{self, BufRead};
use thiserror::Error;

pub const NEW_STRUCTURE: &str = "[<##NEWSTRUCTURE>]";
pub const REMOVE_START: &str = "[<##FILETOREMOVE>]";
pub const REMOVE_END: &str = "[<##ENDFILETOREMOVE>]";
pub const FILE_OPEN_PREFIX: &str = "[<FILE:";
pub const FILE_CLOSE_PREFIX: &str = "[<ENDFILE:";
pub const MARKER_SUFFIX: &str = ">]";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParseMode {
    /// Unterminated blocks are dropped, duplicate paths overwrite.
    #[default]
    Lenient,
    /// Structural problems are reported as errors.
    Strict,
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to read bundle line {line}: {source}")]
    Io {
        line: usize,
        #[source]
        source: io::Error,
    },
    #[error("file block `{path}` opened on line {line} is never closed")]
    UnterminatedFile { path: String, line: usize },
    #[error("remove block opened on line {line} is never closed")]
    UnterminatedRemove { line: usize },
    #[error("file `{path}` appears more than once (line {line})")]
    DuplicateFile { path: String, line: usize },
    #[error("file block `{inner}` opened on line {line} while `{outer}` is still open")]
    NestedFile {
        outer: String,
        inner: String,
        line: usize,
    },
}

enum State {
    Idle,
    InRemoveBlock { opened: usize },
    InFileBlock {
        path: String,
        opened: usize,
        lines: Vec<String>,
    },
}

pub fn file_open_marker(path: &str) -> String {
    format!("{}{}{}", FILE_OPEN_PREFIX, path, MARKER_SUFFIX)
}

pub fn file_close_marker(path: &str) -> String {
    format!("{}{}{}", FILE_CLOSE_PREFIX, path, MARKER_SUFFIX)
}

/// Returns the path of a `[<FILE:...>]` line. An empty path opens nothing.
fn file_open_path(line: &str) -> Option<&str> {
    line.strip_prefix(FILE_OPEN_PREFIX)?
        .strip_suffix(MARKER_SUFFIX)
        .filter(|path| !path.is_empty())
}

/// Parses a bundle document leniently.
pub fn parse<R: BufRead>(reader: R) -> Result<DirectiveSet, ParseError> {
    parse_with(reader, ParseMode::Lenient)
}

/// Single pass over the line source.
///
/// Inside a file block only the exact close marker of the open path is
/// special; every other line is content, kept byte-for-byte (a trailing
/// `\r` is only ignored while matching markers). That includes
/// `[<##NEWSTRUCTURE>]` and the remove-block markers, so a file that
/// mentions them is stored as written instead of triggering a reset or
/// removal. In lenient mode the only possible error is a failure of the
/// line source itself.
pub fn parse_with<R: BufRead>(mut reader: R, mode: ParseMode) -> Result<DirectiveSet, ParseError> {
    let strict = mode == ParseMode::Strict;
    let mut result = DirectiveSet::default();
    let mut state = State::Idle;
    let mut buf = String::new();
    let mut line_no = 0;

    loop {
        buf.clear();
        let read = reader.read_line(&mut buf).map_err(|source| ParseError::Io {
            line: line_no + 1,
            source,
        })?;
        if read == 0 {
            break;
        }
        line_no += 1;

        let line = buf.strip_suffix('\n').unwrap_or(&buf);
        let bare = line.strip_suffix('\r').unwrap_or(line);

        state = match state {
            State::InFileBlock {
                path,
                opened,
                mut lines,
            } => {
                if bare == file_close_marker(&path) {
                    if strict && result.files.contains_key(&path) {
                        return Err(ParseError::DuplicateFile {
                            path,
                            line: opened,
                        });
                    }
                    result.files.insert(path, lines.join("\n"));
                    State::Idle
                } else {
                    if strict {
                        if let Some(inner) = file_open_path(bare) {
                            return Err(ParseError::NestedFile {
                                outer: path,
                                inner: inner.to_string(),
                                line: line_no,
                            });
                        }
                    }
                    lines.push(line.to_string());
                    State::InFileBlock {
                        path,
                        opened,
                        lines,
                    }
                }
            }
            State::InRemoveBlock { opened } => {
                let trimmed = line.trim();
                if trimmed == NEW_STRUCTURE {
                    result.new_structure = true;
                    State::InRemoveBlock { opened }
                } else if trimmed == REMOVE_END {
                    State::Idle
                } else {
                    if !trimmed.is_empty() && trimmed != REMOVE_START {
                        result.to_remove.push(trimmed.to_string());
                    }
                    State::InRemoveBlock { opened }
                }
            }
            State::Idle => {
                let trimmed = line.trim();
                if trimmed == NEW_STRUCTURE {
                    result.new_structure = true;
                    State::Idle
                } else if trimmed == REMOVE_START {
                    State::InRemoveBlock { opened: line_no }
                } else if let Some(path) = file_open_path(bare) {
                    State::InFileBlock {
                        path: path.to_string(),
                        opened: line_no,
                        lines: Vec::new(),
                    }
                } else {
                    State::Idle
                }
            }
        };
    }

    match state {
        State::InFileBlock { path, opened, .. } => {
            if strict {
                return Err(ParseError::UnterminatedFile { path, line: opened });
            }
            log::warn!("Dropping unterminated file block `{}` (line {})", path, opened);
        }
        State::InRemoveBlock { opened } if strict => {
            return Err(ParseError::UnterminatedRemove { line: opened });
        }
        _ => {}
    }

    Ok(result)
}
