use crate::{config::ScreenConfig, Error, Result};

/// Physical monitor geometry for converting between pixels and centimetres
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenGeometry {
    monitor_width_cm: f64,
    monitor_height_cm: f64,
    screen_width_px: f64,
    screen_height_px: f64,
}

impl ScreenGeometry {
    /// # Errors
    ///
    /// Returns an error if any dimension is not a positive finite number
    pub fn new(config: &ScreenConfig) -> Result<Self> {
        let dimensions = [
            config.monitor_width_cm,
            config.monitor_height_cm,
            config.screen_width_px,
            config.screen_height_px,
        ];
        if dimensions.iter().any(|d| !(d.is_finite() && *d > 0.0)) {
            return Err(Error::ConfigError(format!(
                "Screen dimensions must be positive, got {dimensions:?}"
            )));
        }
        Ok(Self {
            monitor_width_cm: config.monitor_width_cm,
            monitor_height_cm: config.monitor_height_cm,
            screen_width_px: config.screen_width_px,
            screen_height_px: config.screen_height_px,
        })
    }

    #[must_use]
    pub fn px_to_cm(&self, x: f64, y: f64) -> (f64, f64) {
        (
            x * self.monitor_width_cm / self.screen_width_px,
            y * self.monitor_height_cm / self.screen_height_px,
        )
    }

    #[must_use]
    pub fn cm_to_px(&self, x: f64, y: f64) -> (f64, f64) {
        (
            x * self.screen_width_px / self.monitor_width_cm,
            y * self.screen_height_px / self.monitor_height_cm,
        )
    }

    /// Render coordinates (pixels) to screen coordinates (centimetres)
    ///
    /// Render and screen pixel frames currently coincide.
    #[must_use]
    pub fn render_to_screen(&self, x: f64, y: f64) -> (f64, f64) {
        self.px_to_cm(x, y)
    }

    /// Screen coordinates (centimetres) to render coordinates (pixels)
    #[must_use]
    pub fn screen_to_render(&self, x: f64, y: f64) -> (f64, f64) {
        self.cm_to_px(x, y)
    }
}

impl Default for ScreenGeometry {
    fn default() -> Self {
        let config = ScreenConfig::default();
        Self {
            monitor_width_cm: config.monitor_width_cm,
            monitor_height_cm: config.monitor_height_cm,
            screen_width_px: config.screen_width_px,
            screen_height_px: config.screen_height_px,
        }
    }
}
