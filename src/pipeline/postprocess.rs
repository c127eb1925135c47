//! Post-processing: deterministic cleanup of engine-extracted page text.
//!
//! PDF text layers hand back physical lines, not paragraphs: words split
//! across a line break with a hyphen, hard wraps in the middle of sentences,
//! stray zero-width characters and CR/LF mixtures. This module turns one
//! page of raw text into a list of paragraphs ready for the Markdown body.
//!
//! ## Rule Order
//!
//! Line endings are normalised first so every later rule can split on `\n`;
//! invisible characters are removed before de-hyphenation so a soft hyphen
//! cannot hide a real one; paragraph splitting runs last on clean lines.

use once_cell::sync::Lazy;
use regex::Regex;

/// Clean one page of raw text and split it into paragraphs.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF / CR → LF)
/// 2. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 3. Trim trailing whitespace per line
/// 4. Join words hyphenated across a line break (`exam-\nple` → `example`)
/// 5. Split into paragraphs on blank lines and on short sentence-final lines
/// 6. Re-flow each paragraph onto one line with single spaces
pub fn clean_page_text(raw: &str) -> Vec<String> {
    let s = normalise_line_endings(raw);
    let s = remove_invisible_chars(&s);
    let s = trim_trailing_whitespace(&s);
    let s = join_hyphenated(&s);
    split_paragraphs(&s)
        .into_iter()
        .map(|p| reflow(&p))
        .filter(|p| !p.is_empty())
        .collect()
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}', '\u{0002}',
        ],
        "",
    )
}

// ── Rule 3: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 4: De-hyphenate across line breaks ──────────────────────────────────
//
// Only a lower-case letter, a hyphen, a line break and another lower-case
// letter qualifies. "Jean-\nPaul" and "2019-\n2020" keep their hyphen.

static RE_HYPHEN_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\p{Ll})-\n[ \t]*(\p{Ll})").unwrap());

fn join_hyphenated(input: &str) -> String {
    RE_HYPHEN_BREAK.replace_all(input, "$1$2").to_string()
}

// ── Rule 5: Paragraph splitting ─────────────────────────────────────────────
//
// A blank line always ends a paragraph. Without blank lines, a line that ends
// a sentence and is clearly shorter than the block's longest line is treated
// as the last line of its paragraph.

/// A line shorter than this share of the longest line counts as "short".
const SHORT_LINE_RATIO: f32 = 0.75;

static RE_BLANK_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n").unwrap());

fn split_paragraphs(input: &str) -> Vec<String> {
    let mut out = Vec::new();
    for block in RE_BLANK_SPLIT.split(input) {
        let lines: Vec<&str> = block.lines().filter(|l| !l.trim().is_empty()).collect();
        if lines.is_empty() {
            continue;
        }
        let longest = lines
            .iter()
            .map(|l| l.trim().chars().count())
            .max()
            .unwrap_or(0);

        let mut current: Vec<&str> = Vec::new();
        for (i, line) in lines.iter().copied().enumerate() {
            current.push(line);
            let next = lines.get(i + 1);
            if next.is_some() && ends_paragraph(line, longest) {
                out.push(current.join("\n"));
                current.clear();
            }
        }
        if !current.is_empty() {
            out.push(current.join("\n"));
        }
    }
    out
}

fn ends_paragraph(line: &str, longest: usize) -> bool {
    let t = line.trim();
    let sentence_end = t.ends_with(['.', '!', '?', ':']);
    let short = (t.chars().count() as f32) < longest as f32 * SHORT_LINE_RATIO;
    sentence_end && short
}

// ── Rule 6: Re-flow ─────────────────────────────────────────────────────────

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

fn reflow(paragraph: &str) -> String {
    RE_WHITESPACE
        .replace_all(paragraph.trim(), " ")
        .to_string()
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalise_line_endings() {
        assert_eq!(normalise_line_endings("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn test_trim_trailing_whitespace() {
        assert_eq!(
            trim_trailing_whitespace("  hello   \nworld  "),
            "  hello\nworld"
        );
    }

    #[test]
    fn test_remove_invisible() {
        let input = "hello\u{200B}world\u{FEFF}foo\u{00AD}bar";
        assert_eq!(remove_invisible_chars(input), "helloworldfoobar");
    }

    #[test]
    fn test_join_hyphenated() {
        assert_eq!(join_hyphenated("an exam-\nple here"), "an example here");
        assert_eq!(join_hyphenated("Jean-\nPaul"), "Jean-\nPaul");
        assert_eq!(join_hyphenated("2019-\n2020"), "2019-\n2020");
    }

    #[test]
    fn test_blank_lines_split_paragraphs() {
        let paras = clean_page_text("First line\ncontinues here\n\n\nSecond para");
        assert_eq!(paras, ["First line continues here", "Second para"]);
    }

    #[test]
    fn test_short_sentence_end_splits() {
        let raw = "The quarterly figures were strong across all\n\
                   regions and segments this year.\n\
                   Growth was led by the northern markets where\n\
                   demand rose sharply";
        let paras = clean_page_text(raw);
        assert_eq!(paras.len(), 2, "{paras:?}");
        assert!(paras[0].ends_with("this year."));
        assert!(paras[1].starts_with("Growth"));
    }

    #[test]
    fn test_long_sentence_end_does_not_split() {
        let raw = "A line that ends a sentence at the margin.\n\
                   and the paragraph goes on here";
        assert_eq!(clean_page_text(raw).len(), 1);
    }

    #[test]
    fn test_full_page() {
        let raw = "\u{FEFF}Intro-\r\nduction   \r\n\r\nBody text\u{200B} with  gaps\r\n";
        assert_eq!(clean_page_text(raw), ["Introduction", "Body text with gaps"]);
    }

    #[test]
    fn test_empty_page() {
        assert!(clean_page_text("  \n\n \r\n").is_empty());
    }
}
