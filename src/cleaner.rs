//! Text-for-speech cleaning.
//!
//! Reduces markdown to plain speakable text before any synthesis request.
//! Walking the markdown event stream (instead of rewriting with patterns)
//! keeps the ordering constraints for free: code-block contents are consumed
//! before inline-code unwrapping could see them, and math is never confused
//! with emphasis or list markers.

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};

/// Spoken in place of any code block, regardless of its contents.
pub const CODE_BLOCK_PLACEHOLDER: &str = "Code block omitted.";

/// Spoken in place of any inline or display math.
pub const MATH_PLACEHOLDER: &str = "Math equation.";

/// Converts markdown to plain text for speech synthesis.
///
/// Code blocks become [`CODE_BLOCK_PLACEHOLDER`]; inline code is unwrapped
/// to its bare text; links reduce to their link text; images are dropped
/// entirely; emphasis, heading, blockquote, and list markers are stripped;
/// math becomes [`MATH_PLACEHOLDER`]; whitespace runs collapse to single
/// spaces. Empty or whitespace-only input yields an empty string, which
/// callers must treat as "nothing to speak."
pub fn clean_text_for_speech(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_MATH);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = Parser::new_ext(markdown, options);

    let mut out = String::new();
    // Depth of enclosing code blocks / images whose text is swallowed
    let mut suppress = 0usize;

    for event in parser {
        if suppress > 0 {
            match event {
                Event::Start(Tag::CodeBlock(_)) | Event::Start(Tag::Image { .. }) => suppress += 1,
                Event::End(TagEnd::CodeBlock) | Event::End(TagEnd::Image) => suppress -= 1,
                _ => {}
            }
            continue;
        }

        match event {
            Event::Start(Tag::CodeBlock(_)) => {
                out.push(' ');
                out.push_str(CODE_BLOCK_PLACEHOLDER);
                out.push(' ');
                suppress += 1;
            }
            Event::Start(Tag::Image { .. }) => suppress += 1,

            // Inline containers contribute no separator so words stay intact
            Event::Start(Tag::Emphasis)
            | Event::Start(Tag::Strong)
            | Event::Start(Tag::Strikethrough)
            | Event::Start(Tag::Link { .. }) => {}

            Event::End(TagEnd::Emphasis)
            | Event::End(TagEnd::Strong)
            | Event::End(TagEnd::Strikethrough)
            | Event::End(TagEnd::Link) => {}

            // Block boundaries become word separators
            Event::Start(_) => out.push(' '),
            Event::End(_) => out.push(' '),

            Event::Text(text) | Event::Code(text) => out.push_str(&text),

            Event::InlineMath(_) | Event::DisplayMath(_) => {
                out.push(' ');
                out.push_str(MATH_PLACEHOLDER);
                out.push(' ');
            }

            Event::SoftBreak | Event::HardBreak | Event::Rule => out.push(' '),

            Event::Html(_)
            | Event::InlineHtml(_)
            | Event::FootnoteReference(_)
            | Event::TaskListMarker(_) => {}
        }
    }

    collapse_whitespace(&out)
}

/// Collapses all whitespace runs to single spaces and trims the ends.
fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_empty_output() {
        assert_eq!(clean_text_for_speech(""), "");
        assert_eq!(clean_text_for_speech("   \n\t  "), "");
    }

    #[test]
    fn fenced_code_block_becomes_placeholder() {
        let input = "```rust\nlet secret = 42;\n```";
        assert_eq!(clean_text_for_speech(input), CODE_BLOCK_PLACEHOLDER);
    }

    #[test]
    fn code_block_contents_never_leak() {
        let input = "before\n\n```\nanything *at* `all` [here](x)\n```\n\nafter";
        let cleaned = clean_text_for_speech(input);
        assert_eq!(cleaned, format!("before {} after", CODE_BLOCK_PLACEHOLDER));
    }

    #[test]
    fn inline_code_is_unwrapped() {
        assert_eq!(clean_text_for_speech("run `cargo check` now"), "run cargo check now");
    }

    #[test]
    fn links_reduce_to_text_and_images_disappear() {
        assert_eq!(
            clean_text_for_speech("see [the docs](https://example.com) here"),
            "see the docs here"
        );
        assert_eq!(clean_text_for_speech("an image: ![diagram](pic.png) end"), "an image: end");
    }

    #[test]
    fn emphasis_heading_quote_and_list_markers_are_stripped() {
        assert_eq!(clean_text_for_speech("# Big Title"), "Big Title");
        assert_eq!(clean_text_for_speech("**bold** and *italic*"), "bold and italic");
        assert_eq!(clean_text_for_speech("> a quoted line"), "a quoted line");
        assert_eq!(clean_text_for_speech("- first\n- second"), "first second");
        assert_eq!(clean_text_for_speech("1. one\n2. two"), "one two");
    }

    #[test]
    fn math_becomes_placeholder() {
        assert_eq!(
            clean_text_for_speech("solve $x^2 + 1 = 0$ now"),
            format!("solve {} now", MATH_PLACEHOLDER)
        );
        assert_eq!(
            clean_text_for_speech("$$\\int_0^1 x\\,dx$$"),
            MATH_PLACEHOLDER
        );
    }

    #[test]
    fn whitespace_runs_collapse() {
        assert_eq!(
            clean_text_for_speech("a  lot\n\n\nof    space"),
            "a lot of space"
        );
    }

    #[test]
    fn idempotent_on_already_clean_text() {
        let samples = [
            "Hello world. This is plain text.",
            "Code block omitted.",
            "solve Math equation. now",
            "a lot of space",
        ];
        for s in samples {
            let once = clean_text_for_speech(s);
            assert_eq!(clean_text_for_speech(&once), once);
            assert_eq!(once, s);
        }
    }
}
