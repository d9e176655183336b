//! Story artifacts and the offline story writer.

use crate::provider::{OfflineGenerator, Source};
use crate::request::{GenerationRequest, NarrativeStyle, StoryLength};
use once_cell::sync::OnceCell;
use regex::Regex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryArtifact {
    pub title: String,
    /// Style-flavoured opening sentence of an offline story.
    pub intro: Option<String>,
    pub body: Vec<String>,
    pub source: Source,
    /// Full markdown rendering; provider text is kept verbatim.
    pub text: String,
}

impl StoryArtifact {
    /// Splits a provider completion into title and paragraphs. Returns `None`
    /// when no body paragraph survives.
    pub fn from_provider_text(text: &str, topic: &str) -> Option<Self> {
        let mut title = None;
        let mut body = Vec::new();

        for block in paragraph_break().split(text.trim()) {
            let mut lines = Vec::new();
            for line in block.lines().map(str::trim) {
                if let Some(heading) = line.strip_prefix('#') {
                    if title.is_none() && body.is_empty() && lines.is_empty() {
                        let heading = heading.trim_start_matches('#').trim();
                        if !heading.is_empty() {
                            title = Some(heading.to_string());
                        }
                    }
                    continue;
                }
                if !line.is_empty() {
                    lines.push(line);
                }
            }
            if !lines.is_empty() {
                body.push(lines.join(" "));
            }
        }

        if body.is_empty() {
            return None;
        }

        Some(Self {
            title: title.unwrap_or_else(|| title_case(topic)),
            intro: None,
            body,
            source: Source::Provider,
            text: text.to_string(),
        })
    }
}

fn paragraph_break() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"\n[ \t\r]*\n").expect("paragraph regex"))
}

/// Title case where every letter that follows a non-letter is upper-cased and
/// all others lower-cased.
pub fn title_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut prev_alpha = false;
    for ch in input.chars() {
        if ch.is_alphabetic() {
            if prev_alpha {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(ch);
            prev_alpha = false;
        }
    }
    out
}

fn with_article(word: &str) -> String {
    let vowel = word
        .chars()
        .next()
        .map(|c| matches!(c.to_ascii_lowercase(), 'a' | 'e' | 'i' | 'o' | 'u'))
        .unwrap_or(false);
    if vowel {
        format!("an {word}")
    } else {
        format!("a {word}")
    }
}

fn intro_sentence(style: NarrativeStyle, length: StoryLength, topic: &str) -> String {
    let flavour = style.flavour();
    match length {
        StoryLength::Short => format!("A brief story {flavour} about {topic}."),
        StoryLength::Medium => format!("A medium-length story {flavour} about {topic}."),
        StoryLength::Long => format!("A longer story {flavour} about {topic}."),
    }
}

/// Narrative beat `index`: setup, inciting incident, rising complication,
/// decision point, turn, climax, then resolution for everything after.
fn beat(index: usize, topic: &str, style: &str) -> String {
    match index {
        0 => format!(
            "In a world where {topic} was part of everyday life, our heroes stumbled upon something extraordinary. \
             It was an ordinary morning when everything began to change in unexpected ways."
        ),
        1 => format!(
            "The first challenge appeared when they least expected it. \
             Like true heroes of {} story, they faced the problem with determination.",
            with_article(style)
        ),
        2 => format!(
            "As the journey went on, secrets about {topic} began to surface. \
             Every discovery raised more questions than answers."
        ),
        3 => "The characters had to make difficult choices. \
              The path was not easy, but every lesson learned was worth the effort."
            .to_string(),
        4 => format!(
            "Just when all seemed lost, a surprising twist changed the course of the story. \
             It was as if {topic} itself were conspiring in their favour."
        ),
        5 => format!(
            "The final confrontation was near. Every road led to this decisive moment. \
             The tension grew with each passing second, as in any great {style} story."
        ),
        _ => format!(
            "In the end, when the dust settled, the world would never be the same. \
             Their brush with {topic} had changed everyone's lives forever, leaving an unforgettable legacy."
        ),
    }
}

/// Deterministic story for a request. The topic is title-cased in the header
/// and lower-cased inside paragraphs; nothing else is transformed.
pub fn compose_story(request: &GenerationRequest) -> StoryArtifact {
    let topic = request.topic.trim();
    let topic_lower = topic.to_lowercase();
    let style_lower = request.narrative_style.label().to_lowercase();

    let title = title_case(topic);
    let intro = intro_sentence(request.narrative_style, request.length, topic);
    let body: Vec<String> = (0..request.length.paragraphs())
        .map(|i| beat(i, &topic_lower, &style_lower))
        .collect();

    let mut text = format!("# {title}\n\n{intro}\n\n");
    text.push_str(&body.join("\n\n"));
    text.push('\n');

    StoryArtifact {
        title,
        intro: Some(intro),
        body,
        source: Source::Offline,
        text,
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineStoryWriter;

impl OfflineGenerator for OfflineStoryWriter {
    type Output = StoryArtifact;

    fn generate_offline(&self, request: &GenerationRequest) -> StoryArtifact {
        compose_story(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::ImageStyle;

    fn request(style: NarrativeStyle, length: StoryLength) -> GenerationRequest {
        GenerationRequest {
            topic: "a RAINFOREST adventure".into(),
            narrative_style: style,
            length,
            image_description: "dense jungle".into(),
            image_style: ImageStyle::Cartoon,
            video_title: "Jungle Quest".into(),
        }
    }

    #[test]
    fn paragraph_count_follows_length() {
        for style in NarrativeStyle::ALL {
            for (length, expected) in [
                (StoryLength::Short, 3),
                (StoryLength::Medium, 5),
                (StoryLength::Long, 7),
            ] {
                let story = compose_story(&request(style, length));
                assert_eq!(story.body.len(), expected, "{style} / {length}");
                assert_eq!(story.source, Source::Offline);
            }
        }
    }

    #[test]
    fn offline_story_is_deterministic() {
        let req = request(NarrativeStyle::Horror, StoryLength::Long);
        assert_eq!(compose_story(&req).text, compose_story(&req).text);
    }

    #[test]
    fn topic_case_is_normalised() {
        let story = compose_story(&request(NarrativeStyle::Adventure, StoryLength::Short));
        assert_eq!(story.title, "A Rainforest Adventure");
        assert!(story.text.starts_with("# A Rainforest Adventure\n\n"));
        assert!(story.body[0].contains("a rainforest adventure was part of everyday life"));
        assert!(story.body[1].contains("an adventure story"));
        assert_eq!(
            story.intro.as_deref(),
            Some("A brief story full of action and exploration about a RAINFOREST adventure.")
        );
    }

    #[test]
    fn long_story_ends_with_resolution() {
        let story = compose_story(&request(NarrativeStyle::SciFi, StoryLength::Long));
        assert!(story.body[5].contains("great sci-fi story"));
        assert!(story.body[6].starts_with("In the end"));
    }

    #[test]
    fn title_case_matches_word_boundaries() {
        assert_eq!(title_case("the lord's ring-bearer"), "The Lord'S Ring-Bearer");
        assert_eq!(title_case("  mixed CASE  "), "  Mixed Case  ");
    }

    #[test]
    fn provider_text_is_split_into_title_and_paragraphs() {
        let text = "# The Lost Temple\n\nFirst paragraph\ncontinues here.\n\n  \nSecond one.\n\n## Part two\n\nThird.";
        let story = StoryArtifact::from_provider_text(text, "temple").unwrap();
        assert_eq!(story.title, "The Lost Temple");
        assert_eq!(
            story.body,
            vec!["First paragraph continues here.", "Second one.", "Third."]
        );
        assert_eq!(story.text, text);
        assert_eq!(story.source, Source::Provider);
    }

    #[test]
    fn provider_text_without_heading_uses_topic() {
        let story = StoryArtifact::from_provider_text("Once upon a time.", "lost temple").unwrap();
        assert_eq!(story.title, "Lost Temple");
        assert!(StoryArtifact::from_provider_text("# Only a title\n\n", "x").is_none());
        assert!(StoryArtifact::from_provider_text("   ", "x").is_none());
    }
}
