use log::info;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::wordcloud::ImageLayout;

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub port: u16,
    pub votes_file: PathBuf,
    pub translations_dir: PathBuf,
    pub templates_dir: PathBuf,
    pub static_dir: PathBuf,
    pub wordcloud_dir: PathBuf,
    pub wordcloud_url_prefix: String,
    pub fonts_dir: PathBuf,
    pub default_font: Option<PathBuf>,
    pub image_layout: ImageLayout,
    pub seed: Option<u64>,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Ok(Self {
            bind_addr: try_load("BIND_ADDR", "0.0.0.0")?,
            port: try_load("PORT", "5000")?,
            votes_file: try_load("VOTES_FILE", "votes.json")?,
            translations_dir: try_load("TRANSLATIONS_DIR", "translations")?,
            templates_dir: try_load("TEMPLATES_DIR", "templates")?,
            static_dir: try_load("STATIC_DIR", "static")?,
            wordcloud_dir: try_load("WORDCLOUD_DIR", "static/wordcloud")?,
            wordcloud_url_prefix: try_load("WORDCLOUD_URL_PREFIX", "/static/wordcloud")?,
            fonts_dir: try_load("FONTS_DIR", "static/fonts")?,
            default_font: try_load_optional("DEFAULT_FONT")?,
            image_layout: try_load("WORDCLOUD_LAYOUT", "per-language")?,
            seed: try_load_optional("WORDCLOUD_SEED")?,
        })
    }

    // Everything under `root`, for scratch directories.
    pub fn rooted_at(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            bind_addr: "127.0.0.1".to_string(),
            port: 0,
            votes_file: root.join("votes.json"),
            translations_dir: root.join("translations"),
            templates_dir: root.join("templates"),
            static_dir: root.join("static"),
            wordcloud_dir: root.join("static").join("wordcloud"),
            wordcloud_url_prefix: "/static/wordcloud".to_string(),
            fonts_dir: root.join("static").join("fonts"),
            default_font: None,
            image_layout: ImageLayout::PerLanguage,
            seed: None,
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

fn try_load<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError> {
    let raw = env::var(key).unwrap_or_else(|_| {
        info!("{} not set, using default: {}", key, default);
        default.to_string()
    });
    parse(key, raw)
}

fn try_load_optional<T: FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => parse(key, raw).map(Some),
        _ => Ok(None),
    }
}

fn parse<T: FromStr>(key: &'static str, raw: String) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { key, value: raw })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_reports_the_offending_key() {
        let err = parse::<u16>("PORT", "eighty".to_string()).unwrap_err();
        assert_eq!(err.to_string(), "Invalid value for PORT: eighty");
        assert_eq!(parse::<u16>("PORT", " 8080 ".to_string()).unwrap(), 8080);
    }

    #[test]
    fn layout_values_parse() {
        assert_eq!(parse::<ImageLayout>("WORDCLOUD_LAYOUT", "shared".into()).unwrap(), ImageLayout::Shared);
        assert!(parse::<ImageLayout>("WORDCLOUD_LAYOUT", "tiled".into()).is_err());
    }

    #[test]
    fn rooted_config_keeps_everything_under_root() {
        let config = Config::rooted_at("/srv/vote");
        assert_eq!(config.votes_file, PathBuf::from("/srv/vote/votes.json"));
        assert_eq!(config.wordcloud_dir, PathBuf::from("/srv/vote/static/wordcloud"));
        assert_eq!(config.address(), "127.0.0.1:0");
    }
}
