//! Display helpers for snapshot values.

use crate::model::Unit;

pub fn format_temperature(temperature: f64, unit: Unit) -> String {
    let symbol = match unit {
        Unit::Celsius => "°C",
        Unit::Fahrenheit => "°F",
    };
    // `+ 0.0` folds a rounded -0 into 0.
    format!("{}{symbol}", temperature.round() + 0.0)
}

/// OpenWeather reports m/s for metric requests and mph for imperial ones.
pub fn format_wind_speed(speed: f64, unit: Unit) -> String {
    let unit_text = match unit {
        Unit::Celsius => "m/s",
        Unit::Fahrenheit => "mph",
    };
    format!("{speed:.1} {unit_text}")
}

pub fn format_pressure(pressure: f64) -> String {
    format!("{pressure} hPa")
}

pub fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temperature_is_rounded_with_symbol() {
        assert_eq!(format_temperature(21.6, Unit::Celsius), "22°C");
        assert_eq!(format_temperature(70.0, Unit::Fahrenheit), "70°F");
        assert_eq!(format_temperature(-3.4, Unit::Celsius), "-3°C");
        assert_eq!(format_temperature(-0.4, Unit::Celsius), "0°C");
    }

    #[test]
    fn wind_speed_has_one_decimal() {
        assert_eq!(format_wind_speed(3.0, Unit::Celsius), "3.0 m/s");
        assert_eq!(format_wind_speed(12.34, Unit::Fahrenheit), "12.3 mph");
    }

    #[test]
    fn pressure_in_hectopascal() {
        assert_eq!(format_pressure(1013.0), "1013 hPa");
    }

    #[test]
    fn capitalize_first_letter_only() {
        assert_eq!(capitalize_first("light rain"), "Light rain");
        assert_eq!(capitalize_first("école"), "École");
        assert_eq!(capitalize_first(""), "");
    }
}
