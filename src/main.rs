use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use skycast_core::{AppError, Config, WeatherError};
use skycast_weather::{
    Fetched, JsonFileStore, Place, SearchOptions, WeatherReport, WeatherServices,
};

/// Weather, air quality and climate for saved and searched places.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List matching places (e.g. "santiago chile")
    Search {
        #[arg(required = true)]
        query: Vec<String>,
    },
    /// Make a search result the current place
    Set {
        #[arg(required = true)]
        query: Vec<String>,
        /// Which result to pick, counting from 1
        #[arg(short, long, default_value_t = 1)]
        index: usize,
    },
    /// Detect the current place from your IP address
    Locate,
    /// Toggle the current place as a favorite
    Favorite,
    /// Show current, recent and favorite places
    Places,
    /// Current conditions and air quality for the current place
    Weather,
    /// Keep printing weather for the current place every `weather.refresh_minutes`
    Watch,
    /// Summary of the configured years of hourly history
    Climate,
}

fn print_place(prefix: &str, place: &Place) {
    println!("{}{} ({:.4}, {:.4})", prefix, place.label(), place.lat, place.lon);
}

fn print_report(place: &Place, report: &WeatherReport) {
    let weather = &report.weather;
    println!("{} [{}]", place.label(), weather.timezone);
    if let Some(temp) = weather.current_f64("temperature_2m") {
        let unit = weather
            .current_units
            .get("temperature_2m")
            .map_or("", String::as_str);
        println!("  Temperature: {temp:.1}{unit}");
    }
    if let Some(condition) = weather.current_condition() {
        println!("  Conditions:  {}", condition.description());
    }
    if let Some(aqi) = report.air.current.us_aqi {
        println!("  US AQI:      {aqi:.0}");
    }
    if let Some(pm) = report.air.current.pm2_5 {
        println!("  PM2.5:       {pm:.1}");
    }
    for day in 0..weather.daily.len() {
        let date = weather.daily.str_at("time", day).unwrap_or("?");
        let max = weather.daily.f64_at("temperature_2m_max", day);
        let min = weather.daily.f64_at("temperature_2m_min", day);
        match (min, max) {
            (Some(min), Some(max)) => println!("  {date}: {min:.0} / {max:.0}"),
            _ => println!("  {date}: -"),
        }
    }
}

async fn show_weather(services: &WeatherServices) -> Result<(), AppError> {
    match services.refresh_current().await {
        Fetched::Current(report) => {
            print_report(&services.locations().current(), &report);
            Ok(())
        }
        Fetched::Stale => Err(WeatherError::Cancelled("weather".into()).into()),
    }
}

async fn run(
    services: &WeatherServices,
    config: &Config,
    command: Command,
) -> Result<(), AppError> {
    let locations = services.locations();
    match command {
        Command::Search { query } => {
            let query = query.join(" ");
            let results = locations.search_city(&query, SearchOptions::default()).await;
            if results.is_empty() {
                println!("No places found for '{query}'");
            }
            for (i, result) in results.iter().enumerate() {
                print_place(&format!("{:>2}. ", i + 1), &result.to_place());
                if let Some(population) = result.population {
                    println!("    {}, pop. {}", result.country, population);
                }
            }
        }
        Command::Set { query, index } => {
            let query = query.join(" ");
            let results = locations.search_city(&query, SearchOptions::default()).await;
            let Some(result) = index.checked_sub(1).and_then(|i| results.get(i)) else {
                return Err(WeatherError::LocationNotFound(format!("#{index} for '{query}'")).into());
            };
            print_place("Current place: ", &locations.set_location_from_result(result));
        }
        Command::Locate => match services.detect_location().await {
            Fetched::Current(Some(place)) => print_place("Current place: ", &place),
            _ => return Err(WeatherError::ServiceUnavailable.into()),
        },
        Command::Favorite => {
            let current = locations.current();
            if locations.toggle_favorite() {
                print_place("Added favorite: ", &current);
            } else {
                print_place("Removed favorite: ", &current);
            }
        }
        Command::Places => {
            let state = locations.state();
            print_place("Current: ", &state.current);
            println!("Recent:");
            for place in &state.recents {
                print_place("  ", place);
            }
            println!("Favorites:");
            for place in &state.favorites {
                print_place("  ", place);
            }
        }
        Command::Weather => show_weather(services).await?,
        Command::Watch => {
            let Some(period) = config.weather.refresh_interval() else {
                return show_weather(services).await;
            };
            let mut ticker = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = ticker.tick() => show_weather(services).await?,
                    _ = tokio::signal::ctrl_c() => break,
                }
            }
        }
        Command::Climate => match services.climate_for_current().await {
            Fetched::Current(climate) => {
                let temps: Vec<f64> = (0..climate.hourly.len())
                    .filter_map(|i| climate.hourly.f64_at("temperature_2m", i))
                    .collect();
                if temps.is_empty() {
                    println!("No climate history available");
                } else {
                    let mean = temps.iter().sum::<f64>() / temps.len() as f64;
                    let max = temps.iter().copied().fold(f64::MIN, f64::max);
                    let min = temps.iter().copied().fold(f64::MAX, f64::min);
                    println!("{} hourly samples", temps.len());
                    println!("  Mean {mean:.1}, min {min:.1}, max {max:.1}");
                }
            }
            Fetched::Stale => return Err(WeatherError::Cancelled("climate".into()).into()),
        },
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    skycast_core::init()?;

    let (config, _) = Config::load_validated()?;
    let store = Arc::new(JsonFileStore::new(config.state_dir()));
    let services = WeatherServices::from_config(&config, store)?;

    tracing::info!("Skycast started");

    let result = run(&services, &config, cli.command).await;
    services.cancel_all("shutdown");

    if let Err(e) = result {
        tracing::error!("{}", e);
        eprintln!("{}", e.user_message());
        return Err(e.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_takes_index_as_a_flag() {
        let cli = Cli::try_parse_from(["skycast", "set", "rio", "de", "janeiro", "--index", "2"])
            .unwrap();
        assert!(matches!(
            cli.command,
            Command::Set { ref query, index: 2 } if query == &["rio", "de", "janeiro"]
        ));
    }

    #[test]
    fn numeric_query_is_not_an_index() {
        let cli = Cli::try_parse_from(["skycast", "set", "2"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Set { ref query, index: 1 } if query == &["2"]
        ));
    }

    #[test]
    fn search_requires_a_query() {
        assert!(Cli::try_parse_from(["skycast", "search"]).is_err());
        assert!(Cli::try_parse_from(["skycast", "bogus"]).is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
