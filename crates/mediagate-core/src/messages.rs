//! Human-facing text for reports and errors, in English or Spanish.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::RequirementType;
use crate::numeric::fmt_num;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Es,
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Locale::En),
            "es" => Ok(Locale::Es),
            other => Err(format!("unsupported locale: {}", other)),
        }
    }
}

/// Report title for a category.
pub fn title(locale: Locale, kind: RequirementType) -> &'static str {
    use RequirementType::*;
    match (locale, kind) {
        (Locale::En, MimeType) => "File Types",
        (Locale::En, Size) => "File Size",
        (Locale::En, Resolution) => "Resolution",
        (Locale::En, MinSize) => "Minimum Dimensions",
        (Locale::En, Duration) => "Duration",
        (Locale::En, FrameRate) => "Frames per Second",
        (Locale::En, AspectRatio) => "Aspect Ratio",
        (Locale::En, AspectRatioInterval) => "Aspect Ratio Interval",
        (Locale::En, SampleRate) => "Sample Rate",
        (Locale::En, Channels) => "Audio Channels",
        (Locale::En, CodecVideo) => "Video Codec",
        (Locale::En, CodecAudio) => "Audio Codec",
        (Locale::En, BitRate) => "Bit-Rate",
        (Locale::Es, MimeType) => "Extensiones",
        (Locale::Es, Size) => "Tamaños",
        (Locale::Es, Resolution) => "Resoluciones",
        (Locale::Es, MinSize) => "Tamaños mínimos",
        (Locale::Es, Duration) => "Duración",
        (Locale::Es, FrameRate) => "Frames por segundo",
        (Locale::Es, AspectRatio) => "Aspect Ratio",
        (Locale::Es, AspectRatioInterval) => "Aspect Ratio Intervalos",
        (Locale::Es, SampleRate) => "Sample Rate",
        (Locale::Es, Channels) => "Canales de Audio",
        (Locale::Es, CodecVideo) => "Codec Video",
        (Locale::Es, CodecAudio) => "Codec Audio",
        (Locale::Es, BitRate) => "Bit-Rate",
    }
}

/// `"<width> x <height>"` observation.
pub fn dimensions(locale: Locale, width: u32, height: u32) -> String {
    match locale {
        Locale::En => format!("Width {} and Height {}", width, height),
        Locale::Es => format!("Ancho {} y Alto {}", width, height),
    }
}

/// Placeholder for an observation the extractor could not provide.
pub fn unknown(locale: Locale) -> &'static str {
    match locale {
        Locale::En => "unknown",
        Locale::Es => "desconocido",
    }
}

pub fn seconds(locale: Locale, secs: f64) -> String {
    match locale {
        Locale::En => format!("{} Seconds.", fmt_num(secs)),
        Locale::Es => format!("{} Segundos.", fmt_num(secs)),
    }
}

pub fn size_bounds(locale: Locale, min: f64, max: f64) -> Vec<String> {
    match locale {
        Locale::En => vec![
            format!("{}MB minimum.", fmt_num(min)),
            format!("{}MB maximum.", fmt_num(max)),
        ],
        Locale::Es => vec![
            format!("{}MB mínimo.", fmt_num(min)),
            format!("{}MB máximo.", fmt_num(max)),
        ],
    }
}

/// Horizontal box then vertical box, width before height.
pub fn resolution_bounds(locale: Locale, h_width: f64, h_height: f64, v_width: f64, v_height: f64) -> Vec<String> {
    match locale {
        Locale::En => vec![
            format!("Horizontal max width {}px.", fmt_num(h_width)),
            format!("Horizontal max height {}px.", fmt_num(h_height)),
            format!("Vertical max width {}px.", fmt_num(v_width)),
            format!("Vertical max height {}px.", fmt_num(v_height)),
        ],
        Locale::Es => vec![
            format!("Horizontal ancho máximo {}px.", fmt_num(h_width)),
            format!("Horizontal alto máximo {}px.", fmt_num(h_height)),
            format!("Vertical ancho máximo {}px.", fmt_num(v_width)),
            format!("Vertical alto máximo {}px.", fmt_num(v_height)),
        ],
    }
}

pub fn min_size_bounds(locale: Locale, min_width: f64, min_height: f64) -> Vec<String> {
    match locale {
        Locale::En => vec![
            format!("{}px minimum width.", fmt_num(min_width)),
            format!("{}px minimum height.", fmt_num(min_height)),
        ],
        Locale::Es => vec![
            format!("{}px Ancho mínimo.", fmt_num(min_width)),
            format!("{}px Alto mínimo.", fmt_num(min_height)),
        ],
    }
}

pub fn duration_bounds(locale: Locale, min: f64, max: f64) -> Vec<String> {
    match locale {
        Locale::En => vec![
            format!("{} seconds minimum.", fmt_num(min)),
            format!("{} seconds maximum.", fmt_num(max)),
        ],
        Locale::Es => vec![
            format!("{} segundos mínimos.", fmt_num(min)),
            format!("{} segundos máximos.", fmt_num(max)),
        ],
    }
}

pub fn frame_rate_bounds(locale: Locale, min: f64, max: f64) -> Vec<String> {
    match locale {
        Locale::En => vec![
            format!("{} FPS minimum.", fmt_num(min)),
            format!("{} FPS maximum.", fmt_num(max)),
        ],
        Locale::Es => vec![
            format!("{} FPS Mínimo.", fmt_num(min)),
            format!("{} FPS Máximos.", fmt_num(max)),
        ],
    }
}

pub fn aspect_interval(locale: Locale, min: &str, max: &str) -> Vec<String> {
    match locale {
        Locale::En => vec![format!("Aspect ratio interval {} - {}", min, max)],
        Locale::Es => vec![format!("Intervalo de aspect ratio {} - {}", min, max)],
    }
}

pub fn sample_rate_bounds(locale: Locale, min: f64, max: f64) -> Vec<String> {
    match locale {
        Locale::En => vec![
            format!("{} Hz minimum.", fmt_num(min)),
            format!("{} Hz maximum.", fmt_num(max)),
        ],
        Locale::Es => vec![
            format!("{} Hz Mínimo.", fmt_num(min)),
            format!("{} Hz Máximo.", fmt_num(max)),
        ],
    }
}

pub fn channel_bounds(locale: Locale, min: f64, max: f64) -> Vec<String> {
    match locale {
        Locale::En => vec![
            format!("{} channels minimum.", fmt_num(min)),
            format!("{} channels maximum.", fmt_num(max)),
        ],
        Locale::Es => vec![
            format!("{} canales mínimo.", fmt_num(min)),
            format!("{} canales máximo.", fmt_num(max)),
        ],
    }
}

pub fn bit_rate_bounds(locale: Locale, min: f64, max: f64, unit: &str) -> Vec<String> {
    match locale {
        Locale::En => vec![
            format!("{} {} minimum.", fmt_num(min), unit),
            format!("{} {} maximum.", fmt_num(max), unit),
        ],
        Locale::Es => vec![
            format!("{} {} Mínimo.", fmt_num(min), unit),
            format!("{} {} Máximo.", fmt_num(max), unit),
        ],
    }
}

/// Static user-facing error texts. Never carries tool output.
pub fn missing_path(locale: Locale) -> &'static str {
    match locale {
        Locale::En => "The file could not be retrieved to continue.",
        Locale::Es => "No se ha podido recuperar el fichero para poder continuar.",
    }
}

pub fn missing_buffer(locale: Locale) -> &'static str {
    match locale {
        Locale::En => "The material could not be retrieved.",
        Locale::Es => "No se ha podido recuperar el material.",
    }
}

pub fn missing_placement(locale: Locale) -> &'static str {
    match locale {
        Locale::En => "The material format could not be retrieved.",
        Locale::Es => "No se ha podido recuperar el formato del material.",
    }
}

pub fn requirements_not_found(locale: Locale) -> &'static str {
    match locale {
        Locale::En => "The format requirements could not be retrieved.",
        Locale::Es => "No se ha podido recuperar los requisitos del formato.",
    }
}

pub fn unreadable(locale: Locale) -> &'static str {
    match locale {
        Locale::En => "The material file could not be read.",
        Locale::Es => "No se ha podido leer el archivo del material.",
    }
}

pub fn catalog_invalid(locale: Locale) -> &'static str {
    match locale {
        Locale::En => "The requirement catalog could not be loaded.",
        Locale::Es => "No se ha podido cargar el catálogo de requisitos.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locale_parse() {
        assert_eq!("ES".parse::<Locale>(), Ok(Locale::Es));
        assert_eq!(" en ".parse::<Locale>(), Ok(Locale::En));
        assert!("fr".parse::<Locale>().is_err());
    }

    #[test]
    fn spanish_titles_and_bounds() {
        assert_eq!(title(Locale::Es, RequirementType::Size), "Tamaños");
        assert_eq!(
            size_bounds(Locale::Es, 0.0, 5.0),
            vec!["0MB mínimo.".to_string(), "5MB máximo.".to_string()]
        );
        assert_eq!(dimensions(Locale::Es, 1920, 1080), "Ancho 1920 y Alto 1080");
    }

    #[test]
    fn english_bit_rate_bounds() {
        assert_eq!(
            bit_rate_bounds(Locale::En, 32.0, 320.0, "kbps"),
            vec!["32 kbps minimum.".to_string(), "320 kbps maximum.".to_string()]
        );
    }
}
