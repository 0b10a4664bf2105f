use anyhow::{Error, Result, anyhow};
use dotenvy::dotenv;
use serde::Deserialize;

use crate::models::media::MediaLimits;

#[derive(Clone, Deserialize, Debug)]
pub struct Config {
    pub database_url: String,

    pub gateway_api_url: String,
    pub gateway_api_key: String,

    pub server_port: u16,

    #[serde(default = "default_delay_seconds")]
    pub default_delay_seconds: u64,

    #[serde(default = "default_text_timeout_seconds")]
    pub send_text_timeout_seconds: u64,
    #[serde(default = "default_media_timeout_seconds")]
    pub send_media_timeout_seconds: u64,

    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: u64,
    #[serde(default = "default_max_video_bytes")]
    pub max_video_bytes: u64,
}

impl Config {
    pub fn load() -> Result<Self, Error> {
        dotenv().ok();

        let config = envy::from_env::<Self>()
            .map_err(|_| anyhow!("Invalid or missing environmental variable"))?;
        Ok(config)
    }

    pub fn media_limits(&self) -> MediaLimits {
        MediaLimits {
            max_image_bytes: self.max_image_bytes,
            max_video_bytes: self.max_video_bytes,
        }
    }
}

fn default_delay_seconds() -> u64 {
    5
}

fn default_text_timeout_seconds() -> u64 {
    30
}

fn default_media_timeout_seconds() -> u64 {
    60
}

fn default_max_image_bytes() -> u64 {
    10 * 1024 * 1024
}

fn default_max_video_bytes() -> u64 {
    50 * 1024 * 1024
}
