//! Experience configuration for the browser build

use lomundou_core::{ExperienceConfig, SessionError};

/// Served next to `index.html`
pub const CONFIG_URL: &str = "./assets/experience.toml";

/// Fetch the experience config, falling back to the built-in experience when
/// the page ships none. A `?variant=` query parameter selects the audio language.
pub async fn load() -> Result<ExperienceConfig, SessionError> {
    let mut config = match gloo_net::http::Request::get(CONFIG_URL).send().await {
        Ok(response) if response.ok() => {
            let text = response
                .text()
                .await
                .map_err(|e| SessionError::Init(format!("Reading {}: {}", CONFIG_URL, e)))?;
            let config = ExperienceConfig::from_toml_str(&text)?;
            tracing::info!("Loaded experience config from {}", CONFIG_URL);
            config
        }
        Ok(response) => {
            tracing::info!(
                "No experience config at {} (HTTP {}), using built-in experience",
                CONFIG_URL,
                response.status()
            );
            ExperienceConfig::default()
        }
        Err(e) => {
            tracing::warn!("Failed to fetch {}: {:?}, using built-in experience", CONFIG_URL, e);
            ExperienceConfig::default()
        }
    };

    if let Some(variant) = variant_param() {
        tracing::info!("Audio variant {} selected from URL", variant);
        config = config.with_audio_variant(variant);
        config.validate()?;
    }

    Ok(config)
}

fn variant_param() -> Option<String> {
    let search = web_sys::window()?.location().search().ok()?;
    let params = web_sys::UrlSearchParams::new_with_str(&search).ok()?;
    params.get("variant").filter(|v| !v.trim().is_empty())
}
