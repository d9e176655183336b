//! The request a caller submits to the pipeline.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {field} '{value}' (expected one of: {expected})")]
pub struct RequestError {
    pub field: &'static str,
    pub value: String,
    pub expected: &'static str,
}

fn normalize(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .flat_map(char::to_lowercase)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NarrativeStyle {
    Adventure,
    Fantasy,
    SciFi,
    Drama,
    Comedy,
    Horror,
    Educational,
}

impl NarrativeStyle {
    pub const ALL: [NarrativeStyle; 7] = [
        Self::Adventure,
        Self::Fantasy,
        Self::SciFi,
        Self::Drama,
        Self::Comedy,
        Self::Horror,
        Self::Educational,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Adventure => "Adventure",
            Self::Fantasy => "Fantasy",
            Self::SciFi => "Sci-Fi",
            Self::Drama => "Drama",
            Self::Comedy => "Comedy",
            Self::Horror => "Horror",
            Self::Educational => "Educational",
        }
    }

    /// Phrase that flavours the offline intro sentence.
    pub fn flavour(self) -> &'static str {
        match self {
            Self::Adventure => "full of action and exploration",
            Self::Fantasy => "with magical elements and fantastic creatures",
            Self::SciFi => "with futuristic technology and scientific ideas",
            Self::Drama => "with emotional intensity and inner conflict",
            Self::Comedy => "with funny situations and witty dialogue",
            Self::Horror => "with frightening moments and suspense",
            Self::Educational => "with interesting facts and important lessons",
        }
    }
}

impl fmt::Display for NarrativeStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for NarrativeStyle {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "adventure" => Ok(Self::Adventure),
            "fantasy" => Ok(Self::Fantasy),
            "scifi" | "sciencefiction" => Ok(Self::SciFi),
            "drama" => Ok(Self::Drama),
            "comedy" => Ok(Self::Comedy),
            "horror" => Ok(Self::Horror),
            "educational" => Ok(Self::Educational),
            _ => Err(RequestError {
                field: "narrative style",
                value: s.to_string(),
                expected: "adventure, fantasy, sci-fi, drama, comedy, horror, educational",
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoryLength {
    Short,
    Medium,
    Long,
}

impl StoryLength {
    /// Paragraph count of an offline story.
    pub fn paragraphs(self) -> usize {
        match self {
            Self::Short => 3,
            Self::Medium => 5,
            Self::Long => 7,
        }
    }

    /// Target word count asked of a remote provider.
    pub fn word_budget(self) -> u32 {
        match self {
            Self::Short => 200,
            Self::Medium => 500,
            Self::Long => 1000,
        }
    }
}

impl fmt::Display for StoryLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Short => "Short",
            Self::Medium => "Medium",
            Self::Long => "Long",
        };
        f.write_str(label)
    }
}

impl FromStr for StoryLength {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "short" => Ok(Self::Short),
            "medium" => Ok(Self::Medium),
            "long" => Ok(Self::Long),
            _ => Err(RequestError {
                field: "story length",
                value: s.to_string(),
                expected: "short, medium, long",
            }),
        }
    }
}

/// Visual style of the still image. Unrecognised labels are kept as
/// `Other` and drawn with the neutral background.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ImageStyle {
    Realistic,
    Cartoon,
    PixelArt,
    Oil,
    Watercolor,
    Minimalist,
    Futuristic,
    Other(String),
}

impl ImageStyle {
    pub const NAMED: [ImageStyle; 7] = [
        Self::Realistic,
        Self::Cartoon,
        Self::PixelArt,
        Self::Oil,
        Self::Watercolor,
        Self::Minimalist,
        Self::Futuristic,
    ];

    pub fn label(&self) -> &str {
        match self {
            Self::Realistic => "Realistic",
            Self::Cartoon => "Cartoon",
            Self::PixelArt => "Pixel Art",
            Self::Oil => "Oil",
            Self::Watercolor => "Watercolor",
            Self::Minimalist => "Minimalist",
            Self::Futuristic => "Futuristic",
            Self::Other(label) => label,
        }
    }
}

impl fmt::Display for ImageStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ImageStyle {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match normalize(s).as_str() {
            "realistic" => Self::Realistic,
            "cartoon" => Self::Cartoon,
            "pixelart" => Self::PixelArt,
            "oil" | "oilpainting" => Self::Oil,
            "watercolor" | "watercolour" => Self::Watercolor,
            "minimalist" => Self::Minimalist,
            "futuristic" => Self::Futuristic,
            _ => Self::Other(s.trim().to_string()),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub topic: String,
    pub narrative_style: NarrativeStyle,
    pub length: StoryLength,
    pub image_description: String,
    pub image_style: ImageStyle,
    pub video_title: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrative_style_accepts_aliases() {
        assert_eq!("Sci-Fi".parse::<NarrativeStyle>(), Ok(NarrativeStyle::SciFi));
        assert_eq!("science fiction".parse::<NarrativeStyle>(), Ok(NarrativeStyle::SciFi));
        assert_eq!("HORROR".parse::<NarrativeStyle>(), Ok(NarrativeStyle::Horror));
        for style in NarrativeStyle::ALL {
            assert_eq!(style.label().parse::<NarrativeStyle>(), Ok(style));
        }
    }

    #[test]
    fn unknown_narrative_style_is_rejected() {
        let err = "mystery".parse::<NarrativeStyle>().unwrap_err();
        assert_eq!(err.field, "narrative style");
        assert!(err.to_string().contains("mystery"));
    }

    #[test]
    fn length_maps_to_paragraphs_and_words() {
        let table = [
            (StoryLength::Short, 3, 200),
            (StoryLength::Medium, 5, 500),
            (StoryLength::Long, 7, 1000),
        ];
        for (length, paragraphs, words) in table {
            assert_eq!(length.paragraphs(), paragraphs);
            assert_eq!(length.word_budget(), words);
        }
        assert!("tiny".parse::<StoryLength>().is_err());
    }

    #[test]
    fn image_style_keeps_unknown_labels() {
        assert_eq!("pixel art".parse::<ImageStyle>(), Ok(ImageStyle::PixelArt));
        assert_eq!("Pixel-Art".parse::<ImageStyle>(), Ok(ImageStyle::PixelArt));
        assert_eq!(
            " Vaporwave ".parse::<ImageStyle>(),
            Ok(ImageStyle::Other("Vaporwave".into()))
        );
        assert_eq!(ImageStyle::Other("Vaporwave".into()).label(), "Vaporwave");
    }
}
