use std::path::PathBuf;
use std::time::Duration;

use ab_glyph::FontArc;
use clap::Parser;

use crate::error::Result;

pub const DEFAULT_SERVICE_URL: &str = "http://localhost:8000";
pub const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Parser, Debug, Clone)]
#[command(name = "panelpachi")]
#[command(author, version, about = "Mask, inpaint, and translate manga pages", long_about = None)]
pub struct Args {
    /// Image to open on startup
    pub image: Option<PathBuf>,

    /// Base URL of the inpaint/OCR/translate service
    #[arg(long, env = "PANELPACHI_SERVICE_URL", default_value = DEFAULT_SERVICE_URL)]
    pub service_url: String,

    /// TTF/OTF font used to render overlay text into saved images
    #[arg(long)]
    pub font: Option<PathBuf>,

    /// Seconds between service health probes
    #[arg(long, default_value_t = 10)]
    pub health_interval_secs: u64,

    /// Place translated text without an opaque cover behind it
    #[arg(long)]
    pub no_cover: bool,
}

/// Resolved settings the app runs with.
#[derive(Clone)]
pub struct Config {
    pub image: Option<PathBuf>,
    pub service_url: String,
    pub font: Option<FontArc>,
    pub health_interval: Duration,
    pub health_timeout: Duration,
    pub request_timeout: Duration,
    pub with_cover: bool,
}

impl Config {
    pub fn from_args(args: Args) -> Result<Self> {
        let font = match &args.font {
            Some(path) => Some(load_font(path)?),
            None => {
                log::warn!("no --font given; overlay text will be left out of saved images");
                None
            }
        };
        Ok(Self {
            image: args.image,
            service_url: args.service_url.trim_end_matches('/').to_string(),
            font,
            health_interval: Duration::from_secs(args.health_interval_secs.max(1)),
            health_timeout: HEALTH_TIMEOUT,
            request_timeout: REQUEST_TIMEOUT,
            with_cover: !args.no_cover,
        })
    }
}

pub fn load_font(path: &std::path::Path) -> Result<FontArc> {
    let bytes = std::fs::read(path)?;
    FontArc::try_from_vec(bytes).map_err(|e| {
        crate::error::AnnotateError::Decode(format!("{}: {e}", path.display()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = Args::try_parse_from(["panelpachi"]).unwrap();
        assert_eq!(args.health_interval_secs, 10);
        assert!(!args.no_cover);
        assert!(args.image.is_none());
        let config = Config::from_args(args).unwrap();
        assert!(config.with_cover);
        assert_eq!(config.health_timeout, Duration::from_secs(5));
    }

    #[test]
    fn flags_and_positional_image() {
        let args = Args::try_parse_from([
            "panelpachi",
            "page.png",
            "--service-url",
            "http://gpu-box:9000/",
            "--no-cover",
            "--health-interval-secs",
            "0",
        ])
        .unwrap();
        let config = Config::from_args(args).unwrap();
        assert_eq!(config.image, Some(PathBuf::from("page.png")));
        assert_eq!(config.service_url, "http://gpu-box:9000");
        assert!(!config.with_cover);
        assert_eq!(config.health_interval, Duration::from_secs(1));
    }

    #[test]
    fn missing_font_is_an_io_error() {
        let err = load_font(std::path::Path::new("/nonexistent/font.ttf")).err().unwrap();
        assert_eq!(err.kind(), crate::error::ErrorKind::Io);
    }
}
