//! Response resource parsing.
//!
//! A response file is line oriented:
//!
//! ```text
//! <regex-pattern>
//! sleep <millis>          (optional)
//! interpreter:start       (optional)
//! <script lines...>
//! interpreter:end
//! <response-message>      (optional, falls back to the default message)
//! ```
//!
//! Directives are only recognised before the message starts; everything from
//! the first non-directive line onwards is the message.

mod cache;

pub use cache::ResponseCache;

use crate::error::RenderError;
use crate::index::strip_line_ending;
use std::path::Path;
use std::sync::Arc;

pub const SCRIPT_START: &str = "interpreter:start";
pub const SCRIPT_END: &str = "interpreter:end";
const SLEEP_DIRECTIVE: &str = "sleep";

/// Parsed content of one response file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseData {
    pub sleep_millis: u64,
    pub script: Option<String>,
    pub message: String,
}

/// Parse the text of a response file. The pattern line is skipped.
pub fn parse_response(content: &str, default_message: &str) -> Result<ResponseData, RenderError> {
    let mut lines = content.lines().map(strip_line_ending).enumerate().skip(1);
    let mut sleep_millis = 0;
    let mut script: Option<String> = None;
    let mut message_lines: Vec<&str> = Vec::new();

    while let Some((idx, line)) = lines.next() {
        let line_no = idx + 1;
        if !message_lines.is_empty() {
            message_lines.push(line);
            continue;
        }

        let trimmed = line.trim();
        if let Some(value) = sleep_value(trimmed) {
            sleep_millis = value.parse().map_err(|_| RenderError::InvalidSleep {
                value: value.to_string(),
                line: line_no,
            })?;
        } else if trimmed == SCRIPT_START {
            let mut body = Vec::new();
            let mut closed = false;
            for (_, script_line) in lines.by_ref() {
                if script_line.trim() == SCRIPT_END {
                    closed = true;
                    break;
                }
                body.push(script_line);
            }
            if !closed {
                return Err(RenderError::UnterminatedScript(line_no));
            }
            script = Some(body.join("\n"));
        } else if trimmed.is_empty() {
            // blank lines between directives carry no meaning
        } else {
            message_lines.push(line);
        }
    }

    let message = message_lines.join("\n");
    let message = if message.trim().is_empty() {
        default_message.to_string()
    } else {
        message.trim_end_matches(['\n', '\r']).to_string()
    };

    Ok(ResponseData {
        sleep_millis,
        script,
        message,
    })
}

fn sleep_value(line: &str) -> Option<&str> {
    let rest = line.strip_prefix(SLEEP_DIRECTIVE)?;
    if rest.starts_with(char::is_whitespace) {
        Some(rest.trim())
    } else {
        None
    }
}

/// Reads response files, optionally through a per-scenario cache
pub struct ResponseRenderer {
    default_message: String,
    cache: Option<ResponseCache>,
}

impl ResponseRenderer {
    pub fn new(default_message: impl Into<String>, cache_enabled: bool) -> Self {
        Self {
            default_message: default_message.into(),
            cache: cache_enabled.then(ResponseCache::new),
        }
    }

    pub fn read(&self, file: &Path) -> Result<Arc<ResponseData>, RenderError> {
        match &self.cache {
            Some(cache) => cache.get_or_load(file, |path| self.parse_file(path)),
            None => self.parse_file(file).map(Arc::new),
        }
    }

    fn parse_file(&self, file: &Path) -> Result<ResponseData, RenderError> {
        let content =
            std::fs::read_to_string(file).map_err(|e| RenderError::Io(file.to_path_buf(), e))?;
        parse_response(&content, &self.default_message)
    }

    pub fn is_caching(&self) -> bool {
        self.cache.is_some()
    }

    /// Drop every cached response
    pub fn clear(&self) {
        if let Some(cache) = &self.cache {
            cache.clear();
        }
    }
}
