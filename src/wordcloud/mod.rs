pub mod face;
pub mod layout;

use image::{Rgb, RgbImage, Rgba, RgbaImage};
use log::{error, info};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use crate::config::Config;
use crate::error::RenderError;
use crate::models::{LanguageCode, VoteRecord};
use crate::translations::{TranslationTable, resolve_table};
use face::{Face, FontFace};

const HEX_PALETTE: [&str; 9] = [
    "#927BEF", "#F15F30", "#F6920F", "#0556E3", "#F4F3E8", "#6D4DEA", "#034679", "#C87FB7", "#3A94E7",
];

#[derive(Debug, Clone)]
pub struct CloudStyle {
    pub width: u32,
    pub height: u32,
    pub blank_width: u32,
    pub blank_height: u32,
    pub margin: u32,
    pub relative_scaling: f64,
    pub min_font_size: f32,
    pub max_font_size: Option<f32>,
    pub font_step: f32,
    pub palette: Vec<Rgba<u8>>,
}

impl Default for CloudStyle {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 1200,
            blank_width: 1200,
            blank_height: 600,
            margin: 10,
            relative_scaling: 0.5,
            min_font_size: 4.0,
            max_font_size: None,
            font_step: 1.0,
            palette: HEX_PALETTE.iter().filter_map(|hex| parse_hex(hex)).collect(),
        }
    }
}

fn parse_hex(hex: &str) -> Option<Rgba<u8>> {
    let digits = hex.strip_prefix('#')?;
    if digits.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
    Some(Rgba([channel(0)?, channel(2)?, channel(4)?, 255]))
}

// Label to vote count, in item order, zero counts left out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeightedLabels {
    entries: Vec<(String, u64)>,
}

impl WeightedLabels {
    pub fn from_record(record: &VoteRecord, table: &TranslationTable) -> Self {
        let mut labels = Self::default();
        for (item, count) in record.iter() {
            labels.add(&table.label(item), count);
        }
        labels
    }

    // Labels shared by two items accumulate.
    pub fn add(&mut self, label: &str, count: u64) {
        if count == 0 {
            return;
        }
        match self.entries.iter_mut().find(|(existing, _)| existing == label) {
            Some((_, total)) => *total += count,
            None => self.entries.push((label.to_string(), count)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.entries.iter().map(|(label, count)| (label.as_str(), *count))
    }

    pub fn get(&self, label: &str) -> Option<u64> {
        self.iter().find(|(l, _)| *l == label).map(|(_, c)| c)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageLayout {
    PerLanguage,
    Shared,
}

impl FromStr for ImageLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "per-language" => Ok(ImageLayout::PerLanguage),
            "shared" => Ok(ImageLayout::Shared),
            other => Err(format!("unknown wordcloud layout '{}'", other)),
        }
    }
}

impl fmt::Display for ImageLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageLayout::PerLanguage => f.write_str("per-language"),
            ImageLayout::Shared => f.write_str("shared"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchPolicy {
    StopOnError,
    LogAndContinue,
}

pub const LATIN_HEBREW_FONT: &str = "EzerEuro-Medium.otf";
pub const ARABIC_FONT: &str = "Cairo-VariableFont.ttf";

#[derive(Debug, Clone)]
pub struct FontCatalog {
    fonts_dir: PathBuf,
    default_font: Option<PathBuf>,
}

impl FontCatalog {
    pub fn new(fonts_dir: impl Into<PathBuf>, default_font: Option<PathBuf>) -> Self {
        Self {
            fonts_dir: fonts_dir.into(),
            default_font,
        }
    }

    // Languages without a dedicated font use DEFAULT_FONT, else the English one.
    pub fn font_for(&self, language: &LanguageCode) -> PathBuf {
        match language.as_str() {
            "en" | "he" => self.fonts_dir.join(LATIN_HEBREW_FONT),
            "ar" => self.fonts_dir.join(ARABIC_FONT),
            _ => self
                .default_font
                .clone()
                .unwrap_or_else(|| self.fonts_dir.join(LATIN_HEBREW_FONT)),
        }
    }

    pub fn load(&self, language: &LanguageCode) -> Result<FontFace, RenderError> {
        FontFace::load(&self.font_for(language))
    }
}

#[derive(Debug, Clone)]
pub struct CloudRenderer {
    output_dir: PathBuf,
    url_prefix: String,
    translations_dir: PathBuf,
    fonts: FontCatalog,
    layout: ImageLayout,
    style: CloudStyle,
    seed: Option<u64>,
}

impl CloudRenderer {
    pub fn new(config: &Config) -> Self {
        Self {
            output_dir: config.wordcloud_dir.clone(),
            url_prefix: config.wordcloud_url_prefix.trim_end_matches('/').to_string(),
            translations_dir: config.translations_dir.clone(),
            fonts: FontCatalog::new(&config.fonts_dir, config.default_font.clone()),
            layout: config.image_layout,
            style: CloudStyle::default(),
            seed: config.seed,
        }
    }

    pub fn with_style(mut self, style: CloudStyle) -> Self {
        self.style = style;
        self
    }

    pub fn style(&self) -> &CloudStyle {
        &self.style
    }

    fn file_name(&self, language: &LanguageCode) -> String {
        match self.layout {
            ImageLayout::PerLanguage => format!("wordcloud_{}.png", language),
            ImageLayout::Shared => "wordcloud.png".to_string(),
        }
    }

    pub fn output_path(&self, language: &LanguageCode) -> PathBuf {
        self.output_dir.join(self.file_name(language))
    }

    // Timestamp query so browsers refetch the image.
    pub fn image_url(&self, language: &LanguageCode, timestamp: i64) -> String {
        format!("{}/{}?t={}", self.url_prefix, self.file_name(language), timestamp)
    }

    pub fn render(&self, record: &VoteRecord, language: &LanguageCode) -> Result<PathBuf, RenderError> {
        if record.item_sum() == 0 {
            return self.write_blank(language);
        }
        let face = self.fonts.load(language)?;
        self.render_with(record, language, &face)
    }

    pub fn render_with<F: Face + ?Sized>(&self, record: &VoteRecord, language: &LanguageCode, face: &F) -> Result<PathBuf, RenderError> {
        if record.item_sum() == 0 {
            return self.write_blank(language);
        }

        let table = resolve_table(&self.translations_dir, language);
        let labels = WeightedLabels::from_record(record, &table);
        if labels.is_empty() {
            return self.write_blank(language);
        }

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let placements = layout::layout(&labels, face, &self.style, &mut rng)?;

        // Transparent background
        let mut canvas = RgbaImage::new(self.style.width, self.style.height);
        for placement in &placements {
            face.draw(&mut canvas, &placement.label, placement.font_size, placement.x, placement.y, placement.color);
        }

        let path = self.prepare_output(language)?;
        canvas
            .save(&path)
            .map_err(|source| RenderError::Image { path: path.clone(), source })?;

        info!("Rendered {} words for '{}' to {}", placements.len(), language, path.display());
        Ok(path)
    }

    pub fn render_all(&self, record: &VoteRecord, policy: BatchPolicy) -> Result<Vec<PathBuf>, RenderError> {
        render_languages(policy, |language| self.render(record, language))
    }

    fn write_blank(&self, language: &LanguageCode) -> Result<PathBuf, RenderError> {
        let path = self.prepare_output(language)?;
        let blank = RgbImage::from_pixel(self.style.blank_width, self.style.blank_height, Rgb([255, 255, 255]));
        blank
            .save(&path)
            .map_err(|source| RenderError::Image { path: path.clone(), source })?;
        info!("No votes yet, wrote blank cloud for '{}' to {}", language, path.display());
        Ok(path)
    }

    fn prepare_output(&self, language: &LanguageCode) -> Result<PathBuf, RenderError> {
        fs::create_dir_all(&self.output_dir).map_err(|source| RenderError::Io {
            path: self.output_dir.clone(),
            source,
        })?;
        Ok(self.output_path(language))
    }
}

pub fn render_languages<G>(policy: BatchPolicy, mut render_one: G) -> Result<Vec<PathBuf>, RenderError>
where
    G: FnMut(&LanguageCode) -> Result<PathBuf, RenderError>,
{
    let mut written = Vec::new();
    for language in LanguageCode::known() {
        match render_one(&language) {
            Ok(path) => written.push(path),
            Err(e) => {
                error!("Error generating wordcloud for language {}: {}", language, e);
                if policy == BatchPolicy::StopOnError {
                    return Err(e);
                }
            }
        }
    }
    Ok(written)
}
