//! Poster configuration, prompts and artifacts.

use crate::error::PosterError;
use crate::image::AspectRatio;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Brand text inserted into every poster unless configured otherwise.
pub const DEFAULT_BRAND: &str = "Ovelhinha Criativa";

/// Requested aspect ratio of a poster.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PosterFormat {
    /// Square, for feed posts.
    #[default]
    #[serde(rename = "1:1")]
    Square,
    /// Vertical, for stories.
    #[serde(rename = "9:16")]
    Story,
    /// Landscape, for the web.
    #[serde(rename = "4:3")]
    Landscape,
}

impl PosterFormat {
    /// All supported formats.
    pub const ALL: [PosterFormat; 3] = [Self::Square, Self::Story, Self::Landscape];

    /// Returns the format tag (e.g. "9:16").
    pub fn as_str(&self) -> &'static str {
        self.aspect_ratio().as_str()
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Square => "Square (Instagram)",
            Self::Story => "Vertical (Stories)",
            Self::Landscape => "Landscape (Web)",
        }
    }

    /// Aspect ratio hint for the image model; always the format itself.
    pub fn aspect_ratio(&self) -> AspectRatio {
        match self {
            Self::Square => AspectRatio::Square,
            Self::Story => AspectRatio::Portrait,
            Self::Landscape => AspectRatio::Standard,
        }
    }

    /// Aspect ratio for the video model, which only accepts 16:9 and 9:16.
    pub fn video_aspect_ratio(&self) -> AspectRatio {
        match self {
            Self::Story => AspectRatio::Portrait,
            Self::Square | Self::Landscape => AspectRatio::Landscape,
        }
    }
}

impl fmt::Display for PosterFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PosterFormat {
    type Err = PosterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == s.trim())
            .ok_or_else(|| {
                PosterError::InvalidRequest(format!(
                    "unsupported format '{s}', expected one of 1:1, 9:16, 4:3"
                ))
            })
    }
}

/// Preset visual styles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PosterStyle {
    /// Clean, thin fonts and neutral colours.
    #[default]
    MinimalistLuxury,
    /// High energy, contrast and joy.
    ColorfulVibrant,
    /// Organic textures and earthy tones.
    VintageRustic,
    /// Neon, gradients and futuristic fonts.
    ModernHighTech,
    /// Soft, handmade and romantic.
    DelicateWatercolor,
}

impl PosterStyle {
    /// All presets in display order.
    pub const ALL: [PosterStyle; 5] = [
        Self::MinimalistLuxury,
        Self::ColorfulVibrant,
        Self::VintageRustic,
        Self::ModernHighTech,
        Self::DelicateWatercolor,
    ];

    /// Short identifier used on the command line.
    pub fn id(&self) -> &'static str {
        match self {
            Self::MinimalistLuxury => "minimalist-luxury",
            Self::ColorfulVibrant => "colorful-vibrant",
            Self::VintageRustic => "vintage-rustic",
            Self::ModernHighTech => "modern-high-tech",
            Self::DelicateWatercolor => "delicate-watercolor",
        }
    }

    /// Label inserted into prompts.
    pub fn label(&self) -> &'static str {
        match self {
            Self::MinimalistLuxury => "Minimalist and Luxurious",
            Self::ColorfulVibrant => "Colorful and Vibrant",
            Self::VintageRustic => "Vintage and Rustic",
            Self::ModernHighTech => "Modern and High-Tech",
            Self::DelicateWatercolor => "Delicate Watercolor",
        }
    }

    /// One-line description of the look.
    pub fn description(&self) -> &'static str {
        match self {
            Self::MinimalistLuxury => "Clean, thin fonts and neutral colors.",
            Self::ColorfulVibrant => "High energy, contrast and joy.",
            Self::VintageRustic => "Organic textures and earthy tones.",
            Self::ModernHighTech => "Neon, gradients and futuristic fonts.",
            Self::DelicateWatercolor => "Softness, handmade and romantic.",
        }
    }
}

impl fmt::Display for PosterStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PosterStyle {
    type Err = PosterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|style| style.id() == wanted || style.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| PosterError::InvalidRequest(format!("unknown style '{s}'")))
    }
}

/// User-selected generation options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PosterConfig {
    /// Requested aspect ratio.
    pub format: PosterFormat,
    /// Visual style preset.
    pub style: PosterStyle,
    /// Free-text additions to the prompt.
    #[serde(default)]
    pub extra_prompt: String,
}

/// Builds the natural-language instructions sent to the models.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    brand: String,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_BRAND)
    }
}

impl PromptBuilder {
    /// Uses `brand` as the poster's brand text.
    pub fn new(brand: impl Into<String>) -> Self {
        Self {
            brand: brand.into(),
        }
    }

    /// Returns the brand text.
    pub fn brand(&self) -> &str {
        &self.brand
    }

    /// Instruction for the poster image.
    pub fn poster_prompt(&self, config: &PosterConfig) -> String {
        let mut prompt = format!(
            "Create a professional poster design for \"{brand}\" using this product. Style: {style}.",
            brand = self.brand,
            style = config.style.label(),
        );
        let extra = config.extra_prompt.trim();
        if !extra.is_empty() {
            prompt.push(' ');
            prompt.push_str(extra);
            if !extra.ends_with(['.', '!', '?']) {
                prompt.push('.');
            }
        }
        prompt.push_str(&format!(
            " Place the name \"{}\" elegantly in the design.",
            self.brand
        ));
        prompt
    }

    /// Instruction for animating a finished poster.
    pub fn animation_prompt(&self, config: &PosterConfig) -> String {
        format!(
            "Luxurious animation of this design in the {} style.",
            config.style.label()
        )
    }
}

/// A generated artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedPoster {
    /// Data URI of the generated image.
    pub url: String,
    /// Data URI of the animated version, once generated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    /// The exact prompt sent to the image model.
    pub prompt: String,
}

impl GeneratedPoster {
    /// Creates a still-image artifact.
    pub fn new(url: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            video_url: None,
            prompt: prompt.into(),
        }
    }

    /// Returns the artifact with the animated version attached.
    pub fn with_video(mut self, video_url: impl Into<String>) -> Self {
        self.video_url = Some(video_url.into());
        self
    }

    /// SHA-256 of the image URL, used to recognise already-saved artifacts.
    pub fn digest(&self) -> String {
        url_digest(&self.url)
    }
}

/// Hex SHA-256 of a URL string.
pub fn url_digest(url: &str) -> String {
    hex::encode(Sha256::digest(url.as_bytes()))
}

/// An artifact committed to the gallery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedItem {
    /// Opaque unique id.
    pub id: String,
    /// Creation instant, milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Downscaled JPEG data URI.
    pub url: String,
    /// Animated version, if one was generated before saving.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    /// Prompt the image was generated from.
    pub prompt: String,
    /// Digest of the original full-resolution URL.
    #[serde(default)]
    pub source_digest: String,
}

impl SavedItem {
    /// The style label embedded in the prompt, for captions.
    pub fn style_caption(&self) -> Option<&str> {
        let (_, rest) = self.prompt.split_once("Style: ")?;
        rest.split('.').next().map(str::trim).filter(|s| !s.is_empty())
    }

    /// Returns true when the item carries an animated version.
    pub fn is_video(&self) -> bool {
        self.video_url.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_tags_and_hints() {
        for format in PosterFormat::ALL {
            assert_eq!(format.aspect_ratio().as_str(), format.as_str());
            assert_eq!(format.as_str().parse::<PosterFormat>().unwrap(), format);
        }
        assert_eq!(PosterFormat::default(), PosterFormat::Square);
        assert!("16:9".parse::<PosterFormat>().is_err());
    }

    #[test]
    fn test_video_aspect_ratio_mapping() {
        assert_eq!(PosterFormat::Square.video_aspect_ratio(), AspectRatio::Landscape);
        assert_eq!(PosterFormat::Landscape.video_aspect_ratio(), AspectRatio::Landscape);
        assert_eq!(PosterFormat::Story.video_aspect_ratio(), AspectRatio::Portrait);
    }

    #[test]
    fn test_format_serde_uses_tag() {
        let json = serde_json::to_string(&PosterFormat::Story).unwrap();
        assert_eq!(json, "\"9:16\"");
        let parsed: PosterFormat = serde_json::from_str("\"4:3\"").unwrap();
        assert_eq!(parsed, PosterFormat::Landscape);
    }

    #[test]
    fn test_style_parse_by_id_or_label() {
        assert_eq!(
            "vintage-rustic".parse::<PosterStyle>().unwrap(),
            PosterStyle::VintageRustic
        );
        assert_eq!(
            "delicate watercolor".parse::<PosterStyle>().unwrap(),
            PosterStyle::DelicateWatercolor
        );
        assert!("baroque".parse::<PosterStyle>().is_err());
        assert_eq!(PosterStyle::ALL.len(), 5);
    }

    #[test]
    fn test_poster_prompt_contents() {
        let builder = PromptBuilder::default();
        let config = PosterConfig {
            format: PosterFormat::Square,
            style: PosterStyle::ColorfulVibrant,
            extra_prompt: "Rose petals in the background".into(),
        };
        let prompt = builder.poster_prompt(&config);
        assert_eq!(
            prompt,
            "Create a professional poster design for \"Ovelhinha Criativa\" using this product. \
             Style: Colorful and Vibrant. Rose petals in the background. \
             Place the name \"Ovelhinha Criativa\" elegantly in the design."
        );
    }

    #[test]
    fn test_poster_prompt_without_extra() {
        let prompt = PromptBuilder::new("Acme").poster_prompt(&PosterConfig::default());
        assert!(prompt.contains("Style: Minimalist and Luxurious. Place the name \"Acme\""));
    }

    #[test]
    fn test_animation_prompt() {
        let config = PosterConfig {
            style: PosterStyle::ModernHighTech,
            ..Default::default()
        };
        assert_eq!(
            PromptBuilder::default().animation_prompt(&config),
            "Luxurious animation of this design in the Modern and High-Tech style."
        );
    }

    #[test]
    fn test_generated_poster_with_video() {
        let poster = GeneratedPoster::new("data:image/png;base64,AA==", "p");
        assert!(poster.video_url.is_none());
        let animated = poster.clone().with_video("data:video/mp4;base64,AA==");
        assert_eq!(animated.url, poster.url);
        assert_eq!(animated.video_url.as_deref(), Some("data:video/mp4;base64,AA=="));
        assert_eq!(poster.digest(), url_digest(&poster.url));
        assert_eq!(poster.digest().len(), 64);
    }

    #[test]
    fn test_saved_item_json_shape() {
        let item = SavedItem {
            id: "item-1".into(),
            timestamp: 1_700_000_000_000,
            url: "data:image/jpeg;base64,AA==".into(),
            video_url: None,
            prompt: "Create ... Style: Vintage and Rustic. More.".into(),
            source_digest: "abc".into(),
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["sourceDigest"], "abc");
        assert!(json.get("videoUrl").is_none());
        assert_eq!(item.style_caption(), Some("Vintage and Rustic"));
        assert!(!item.is_video());
    }
}
