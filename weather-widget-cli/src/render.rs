use chrono::Local;
use weather_widget_core::{
    Configuration, Location, WeatherCache, WeatherSnapshot,
    format::{capitalize_first, format_pressure, format_temperature, format_wind_speed},
};

pub fn print_cities(config: &Configuration) {
    if config.cities.is_empty() {
        println!("No cities tracked. Hint: run `weather-widget add` or `weather-widget locate`.");
        return;
    }

    println!("Unit: {}", config.unit);
    for (i, city) in config.cities.iter().enumerate() {
        println!("{:>3}. {} ({})", i + 1, city.display_name(), city.key());
    }
}

pub fn print_weather(config: &Configuration, cache: &WeatherCache) {
    if config.cities.is_empty() {
        print_cities(config);
        return;
    }

    for city in &config.cities {
        match cache.get(city.key()) {
            Some(snapshot) => print_snapshot(city, snapshot),
            None => println!("{}\n    no data\n", city.display_name()),
        }
    }
}

pub fn print_snapshot(city: &Location, snapshot: &WeatherSnapshot) {
    println!("{}", city.display_name());
    println!(
        "    {}  {} (feels like {})",
        format_temperature(snapshot.temperature, snapshot.unit),
        capitalize_first(&snapshot.description),
        format_temperature(snapshot.feels_like, snapshot.unit),
    );
    println!(
        "    humidity {}%  wind {}  pressure {}",
        snapshot.humidity,
        format_wind_speed(snapshot.wind_speed, snapshot.unit),
        format_pressure(snapshot.pressure),
    );
    println!(
        "    observed {}\n",
        snapshot.observed_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
    );
}
