//! Weather badge data and presentation.

use serde::{Deserialize, Deserializer, Serialize};

/// Current conditions for a location, as served by `/api/weather/{location}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub location: String,
    pub temperature: f64,
    pub temperature_unit: String,
    pub weather_code: i32,
    #[serde(deserialize_with = "bool_or_flag")]
    pub is_day: bool,
    pub weather_description: String,
    pub humidity: f64,
    pub wind_speed: f64,
    pub wind_unit: String,
}

/// The upstream provider reports `is_day` as 0/1 rather than a boolean.
fn bool_or_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Number(f64),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Number(n) => n != 0.0,
    })
}

/// Temperature color bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TempBand {
    Hot,
    Warm,
    Mild,
    Cool,
    Cold,
}

impl TempBand {
    pub fn rgb(&self) -> (u8, u8, u8) {
        match self {
            TempBand::Hot => (0xff, 0x57, 0x22),
            TempBand::Warm => (0xff, 0x98, 0x00),
            TempBand::Mild => (0x4c, 0xaf, 0x50),
            TempBand::Cool => (0x21, 0x96, 0xf3),
            TempBand::Cold => (0x9c, 0x27, 0xb0),
        }
    }

    /// CSS-style `#rrggbb` token for the band.
    pub fn hex(&self) -> String {
        let (r, g, b) = self.rgb();
        format!("#{:02x}{:02x}{:02x}", r, g, b)
    }
}

/// Everything the badge shows, already formatted.
#[derive(Debug, Clone, PartialEq)]
pub struct BadgeDisplay {
    pub icon: &'static str,
    pub location: String,
    pub temperature: String,
    pub band: TempBand,
    pub description: String,
    pub humidity: String,
    pub wind: String,
}

pub const DEFAULT_ICON: &str = "🌤️";

/// Glyph for a WMO weather code. Unknown codes get [`DEFAULT_ICON`].
pub fn icon_for(code: i32, is_day: bool) -> &'static str {
    match code {
        // Clear
        0 => if is_day { "☀️" } else { "🌙" },
        1 => if is_day { "🌤️" } else { "🌙" },
        2 => "⛅",
        3 => "☁️",
        // Fog
        45 | 48 => "🌫️",
        // Drizzle
        51 | 53 => "🌦️",
        55 => "🌧️",
        // Rain
        61 | 63 => "🌧️",
        65 => "⛈️",
        // Snow
        71 | 73 => "🌨️",
        75 | 77 => "❄️",
        // Showers
        80 => "🌦️",
        81 => "🌧️",
        82 => "⛈️",
        85 => "🌨️",
        86 => "❄️",
        // Thunderstorm
        95 | 96 | 99 => "⛈️",
        _ => DEFAULT_ICON,
    }
}

pub fn color_for(temp: f64) -> TempBand {
    if temp >= 30.0 {
        TempBand::Hot
    } else if temp >= 20.0 {
        TempBand::Warm
    } else if temp >= 10.0 {
        TempBand::Mild
    } else if temp >= 0.0 {
        TempBand::Cool
    } else {
        TempBand::Cold
    }
}

/// Rounds halves up, so -2.5 becomes -2 and 2.5 becomes 3.
fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

pub fn present(snapshot: &WeatherSnapshot) -> BadgeDisplay {
    BadgeDisplay {
        icon: icon_for(snapshot.weather_code, snapshot.is_day),
        location: snapshot.location.clone(),
        temperature: format!(
            "{}{}",
            round_half_up(snapshot.temperature),
            snapshot.temperature_unit
        ),
        band: color_for(snapshot.temperature),
        description: snapshot.weather_description.clone(),
        humidity: format!("{}%", snapshot.humidity),
        wind: format!("{} {}", round_half_up(snapshot.wind_speed), snapshot.wind_unit),
    }
}
