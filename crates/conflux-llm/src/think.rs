//! Inline reasoning tag extraction
//!
//! Some vendors deliver reasoning in-band, wrapped in a delimiter pair such
//! as `<think>...</think>` inside the visible token stream. [`TagExtractor`]
//! splits such a stream into a content channel and a reasoning channel while
//! tolerating delimiters split across any number of fragments.

/// Default opening delimiter
pub const THINK_OPEN: &str = "<think>";

/// Default closing delimiter
pub const THINK_CLOSE: &str = "</think>";

/// Scanner state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagState {
    /// Text flows to the content channel
    Outside,
    /// A prefix of the opening delimiter is buffered
    ScanningOpen,
    /// Text flows to the reasoning channel
    Inside,
    /// A prefix of the closing delimiter is buffered
    ScanningClose,
}

impl TagState {
    const fn is_reasoning(self) -> bool {
        matches!(self, Self::Inside | Self::ScanningClose)
    }
}

/// Text routed to one output channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Visible answer text
    Content(String),
    /// Reasoning text
    Reasoning(String),
}

impl Segment {
    fn push(segments: &mut Vec<Self>, reasoning: bool, text: &str) {
        if text.is_empty() {
            return;
        }
        match (segments.last_mut(), reasoning) {
            (Some(Self::Reasoning(buf)), true) | (Some(Self::Content(buf)), false) => buf.push_str(text),
            _ => {
                let text = text.to_owned();
                segments.push(if reasoning { Self::Reasoning(text) } else { Self::Content(text) });
            }
        }
    }
}

/// Streaming splitter for one delimiter pair
///
/// Only one level is modeled: an opening delimiter seen while already inside
/// a reasoning block is literal reasoning text.
#[derive(Debug, Clone)]
pub struct TagExtractor {
    open: String,
    close: String,
    state: TagState,
    /// Matched-so-far prefix of the delimiter being scanned; never longer than it
    pending: String,
}

impl Default for TagExtractor {
    fn default() -> Self {
        Self::new(THINK_OPEN, THINK_CLOSE)
    }
}

impl TagExtractor {
    /// Extractor for an arbitrary delimiter pair
    ///
    /// # Panics
    ///
    /// Panics if either delimiter is empty
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Self {
        let open = open.into();
        let close = close.into();
        assert!(!open.is_empty() && !close.is_empty(), "delimiters must not be empty");

        Self {
            open,
            close,
            state: TagState::Outside,
            pending: String::new(),
        }
    }

    /// Current scanner state
    pub const fn state(&self) -> TagState {
        self.state
    }

    fn delimiter(&self) -> &str {
        if self.state.is_reasoning() { &self.close } else { &self.open }
    }

    /// Consume one fragment, returning the text routed so far
    pub fn push(&mut self, fragment: &str) -> Vec<Segment> {
        let mut out = Vec::new();
        self.feed(fragment, &mut out);
        out
    }

    fn feed(&mut self, text: &str, out: &mut Vec<Segment>) {
        let mut rest = text;

        while let Some(ch) = rest.chars().next() {
            let reasoning = self.state.is_reasoning();

            if self.pending.is_empty() {
                // Text that cannot start the delimiter is routed as one run
                let cut = rest
                    .find(|c| self.delimiter().starts_with(c))
                    .unwrap_or(rest.len());
                if cut > 0 {
                    Segment::push(out, reasoning, &rest[..cut]);
                    rest = &rest[cut..];
                    continue;
                }
            }

            let mut candidate = std::mem::take(&mut self.pending);
            candidate.push(ch);

            if self.delimiter().starts_with(candidate.as_str()) {
                rest = &rest[ch.len_utf8()..];
                if candidate.len() == self.delimiter().len() {
                    self.state = if reasoning { TagState::Outside } else { TagState::Inside };
                } else {
                    self.pending = candidate;
                    self.state = if reasoning {
                        TagState::ScanningClose
                    } else {
                        TagState::ScanningOpen
                    };
                }
                continue;
            }

            // Diverged: release the first buffered char, rescan the rest of the
            // buffer, then retry `ch`
            candidate.pop();
            self.state = if reasoning { TagState::Inside } else { TagState::Outside };
            let split = candidate.chars().next().map_or(0, char::len_utf8);
            let (first, tail) = candidate.split_at(split);
            Segment::push(out, reasoning, first);
            self.feed(tail, out);
        }
    }

    /// Flush a partially matched delimiter at stream end
    pub fn finish(&mut self) -> Option<Segment> {
        let reasoning = self.state.is_reasoning();
        self.state = if reasoning { TagState::Inside } else { TagState::Outside };

        if self.pending.is_empty() {
            return None;
        }

        let text = std::mem::take(&mut self.pending);
        Some(if reasoning { Segment::Reasoning(text) } else { Segment::Content(text) })
    }

    /// Split a complete text in one pass
    pub fn split(mut self, text: &str) -> (String, String) {
        let mut content = String::new();
        let mut reasoning = String::new();

        for segment in self.push(text).into_iter().chain(self.finish()) {
            match segment {
                Segment::Content(t) => content.push_str(&t),
                Segment::Reasoning(t) => reasoning.push_str(&t),
            }
        }

        (content, reasoning)
    }
}
