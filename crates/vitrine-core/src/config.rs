/// Environment variable overriding [`Config::fps_update_frames`].
pub const ENV_FPS_FRAMES: &str = "VITRINE_FPS_FRAMES";
/// Environment variable overriding [`Config::preserve_state_at_destroy`].
pub const ENV_PRESERVE_STATE: &str = "VITRINE_PRESERVE_STATE";
/// Environment variable overriding [`Config::profiling`].
pub const ENV_PROFILING: &str = "VITRINE_PROFILING";

/// Runtime configuration for drawables and their frame accounting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Frames between FPS summaries; `0` disables the periodic summary.
    pub fps_update_frames: u32,
    /// Whether controllers preserve listener state when destroyed.
    pub preserve_state_at_destroy: bool,
    pub profiling: ProfilingMode,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            fps_update_frames: 0,
            preserve_state_at_destroy: false,
            profiling: ProfilingMode::Off,
        }
    }
}

impl Config {
    /// Builds a configuration from the defaults, overridden by `VITRINE_*`
    /// environment variables. Unparsable values are ignored with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::from_env`] with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Config::default();

        if let Some(value) = lookup(ENV_FPS_FRAMES) {
            match value.trim().parse() {
                Ok(frames) => config.fps_update_frames = frames,
                Err(_) => tracing::warn!("ignoring invalid {}={:?}", ENV_FPS_FRAMES, value),
            }
        }

        if let Some(value) = lookup(ENV_PRESERVE_STATE) {
            match parse_bool(&value) {
                Some(flag) => config.preserve_state_at_destroy = flag,
                None => tracing::warn!("ignoring invalid {}={:?}", ENV_PRESERVE_STATE, value),
            }
        }

        if let Some(value) = lookup(ENV_PROFILING) {
            match ProfilingMode::parse(&value) {
                Some(mode) => config.profiling = mode,
                None => tracing::warn!("ignoring invalid {}={:?}", ENV_PROFILING, value),
            }
        }

        config
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProfilingMode {
    /// Profiling is disabled
    #[default]
    Off,
    /// Puffin scopes are recorded
    Scopes,
    /// Puffin scopes are recorded and served to `puffin_viewer` over HTTP
    WithWebserver,
}

impl ProfilingMode {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "off" | "0" | "false" => Some(ProfilingMode::Off),
            "on" | "scopes" | "1" | "true" => Some(ProfilingMode::Scopes),
            "http" | "webserver" => Some(ProfilingMode::WithWebserver),
            _ => None,
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
