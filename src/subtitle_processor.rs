use std::fmt;
use regex::Regex;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use log::debug;

// @module: SRT caption parsing and serialization

// @const: Cue header with comma-delimited milliseconds
static COMMA_CUE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+)\n(\d{1,2}:\d{1,2}:\d{1,2},\d+) --> (\d{1,2}:\d{1,2}:\d{1,2},\d+)")
        .expect("comma cue pattern is valid")
});

// @const: Cue header with period-delimited milliseconds
static PERIOD_CUE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+)\n(\d{1,2}:\d{1,2}:\d{1,2}\.\d+) --> (\d{1,2}:\d{1,2}:\d{1,2}\.\d+)")
        .expect("period cue pattern is valid")
});

// @struct: Single subtitle cue
#[derive(Debug, Clone, PartialEq)]
pub struct Caption {
    // @field: Opaque identifier, kept verbatim
    id: String,

    // @field: Canonical HH:MM:SS,mmm start
    start_time: String,

    // @field: Canonical HH:MM:SS,mmm end
    end_time: String,

    // @field: Start in seconds, 3 decimals
    start_seconds: f64,

    // @field: End in seconds, 3 decimals
    end_seconds: f64,

    // @field: Cue body
    text: String,
}

impl Caption {
    /// Create a caption from raw timestamps.
    ///
    /// Both timestamps are canonicalized and the second values are derived
    /// from them, so the textual and numeric forms always agree. Start and end
    /// are not checked against each other.
    pub fn new(id: impl Into<String>, start_time: &str, end_time: &str, text: impl Into<String>) -> Self {
        let start_time = canonicalize_timestamp(start_time);
        let end_time = canonicalize_timestamp(end_time);

        Caption {
            id: id.into(),
            start_seconds: timestamp_to_seconds(&start_time),
            end_seconds: timestamp_to_seconds(&end_time),
            start_time,
            end_time,
            text: text.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn start_time(&self) -> &str {
        &self.start_time
    }

    pub fn end_time(&self) -> &str {
        &self.end_time
    }

    pub fn start_seconds(&self) -> f64 {
        self.start_seconds
    }

    pub fn end_seconds(&self) -> f64 {
        self.end_seconds
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Copy of this caption with only the body replaced
    pub fn with_text(&self, text: impl Into<String>) -> Self {
        Caption {
            text: text.into(),
            ..self.clone()
        }
    }

    /// The payload sent to a translation backend
    pub fn to_unit(&self) -> TranslationUnit {
        TranslationUnit {
            id: self.id.clone(),
            text: self.text.clone(),
        }
    }
}

impl fmt::Display for Caption {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.id)?;
        writeln!(f, "{} --> {}", self.start_time, self.end_time)?;
        writeln!(f, "{}", self.text)
    }
}

/// Minimal `{id, text}` payload exchanged with translation backends
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TranslationUnit {
    /// Identifier of the caption this text belongs to
    pub id: String,

    /// Text to translate, or the translated text in a response
    pub text: String,
}

impl TranslationUnit {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        TranslationUnit {
            id: id.into(),
            text: text.into(),
        }
    }
}

impl From<&Caption> for TranslationUnit {
    fn from(caption: &Caption) -> Self {
        caption.to_unit()
    }
}

/// Line terminator used when writing SRT text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    /// Unix style `\n`
    Lf,
    /// Windows style `\r\n`
    CrLf,
}

impl LineEnding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
        }
    }
}

impl Default for LineEnding {
    #[cfg(windows)]
    fn default() -> Self {
        Self::CrLf
    }

    #[cfg(not(windows))]
    fn default() -> Self {
        Self::Lf
    }
}

/// SRT codec. Parsing is format-agnostic; the line ending only affects output.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubtitleCodec {
    /// Terminator written after every line
    pub line_ending: LineEnding,
}

impl SubtitleCodec {
    pub fn new(line_ending: LineEnding) -> Self {
        SubtitleCodec { line_ending }
    }

    /// Parse SRT text into captions.
    ///
    /// Cue headers with comma milliseconds are tried first, then the
    /// period-delimited variant. Text that matches neither yields an empty
    /// vector rather than an error.
    pub fn parse(raw: &str) -> Vec<Caption> {
        let content = raw.replace('\r', "");

        let captions = Self::split_cues(&content, &COMMA_CUE_REGEX);
        if !captions.is_empty() {
            return captions;
        }

        let captions = Self::split_cues(&content, &PERIOD_CUE_REGEX);
        if captions.is_empty() {
            debug!("No SRT cue headers found in {} bytes of input", content.len());
        }
        captions
    }

    /// Serialize captions to SRT text in input order, ids written as stored
    pub fn stringify(&self, captions: &[Caption]) -> String {
        let newline = self.line_ending.as_str();
        let mut output = String::new();

        for caption in captions {
            output.push_str(caption.id());
            output.push_str(newline);
            output.push_str(caption.start_time());
            output.push_str(" --> ");
            output.push_str(caption.end_time());
            output.push_str(newline);

            let body = caption.text()
                .split('\n')
                .map(|line| line.strip_suffix('\r').unwrap_or(line))
                .collect::<Vec<_>>()
                .join(newline);
            output.push_str(&body);
            output.push_str(newline);
            output.push_str(newline);
        }

        output
    }

    // Text before the first header is discarded; each body runs up to the next header.
    fn split_cues(content: &str, pattern: &Regex) -> Vec<Caption> {
        let headers: Vec<regex::Captures> = pattern.captures_iter(content).collect();
        let mut captions = Vec::with_capacity(headers.len());

        for (i, caps) in headers.iter().enumerate() {
            let Some(header) = caps.get(0) else {
                continue;
            };
            let body_end = headers.get(i + 1)
                .and_then(|next| next.get(0))
                .map_or(content.len(), |m| m.start());

            let group = |n: usize| caps.get(n).map_or("", |m| m.as_str());

            captions.push(Caption::new(
                group(1).trim(),
                group(2).trim(),
                group(3).trim(),
                content[header.end()..body_end].trim(),
            ));
        }

        captions
    }
}

enum Padding {
    Leading,
    Trailing,
}

// Pads or truncates to exactly `width` characters; truncation keeps the head.
fn fixed_width(value: &str, width: usize, padding: Padding) -> String {
    let len = value.chars().count();
    if len >= width {
        return value.chars().take(width).collect();
    }

    let zeros = "0".repeat(width - len);
    match padding {
        Padding::Leading => format!("{}{}", zeros, value),
        Padding::Trailing => format!("{}{}", value, zeros),
    }
}

/// Canonicalize a timestamp to `HH:MM:SS,mmm`.
///
/// Accepts a period separator and malformed widths such as `1:2:3.4`,
/// which becomes `01:02:03,400`.
pub fn canonicalize_timestamp(timestamp: &str) -> String {
    let normalized = timestamp.trim().replacen('.', ",", 1);
    let mut halves = normalized.split(',');
    let main = halves.next().unwrap_or("");
    let millis = fixed_width(halves.next().unwrap_or(""), 3, Padding::Trailing);

    let mut fields = main.split(':');
    let hours = fixed_width(fields.next().unwrap_or(""), 2, Padding::Leading);
    let minutes = fixed_width(fields.next().unwrap_or(""), 2, Padding::Leading);
    let seconds = fixed_width(fields.next().unwrap_or(""), 2, Padding::Leading);

    format!("{}:{}:{},{}", hours, minutes, seconds, millis)
}

/// Convert a timestamp to seconds, rounded to 3 decimals.
///
/// Unparseable fields count as zero.
pub fn timestamp_to_seconds(timestamp: &str) -> f64 {
    let canonical = canonicalize_timestamp(timestamp);
    let fields: Vec<f64> = canonical
        .split([':', ','])
        .map(|field| field.parse::<f64>().unwrap_or(0.0))
        .collect();

    let field = |i: usize| fields.get(i).copied().unwrap_or(0.0);
    let total = field(0) * 3600.0 + field(1) * 60.0 + field(2) + field(3) / 1000.0;

    (total * 1000.0).round() / 1000.0
}
