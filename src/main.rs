//! boktaisim CLI - Boktai solar sensor simulator.
//!
//! Looks up the weather for a zip code or coordinate pair (or takes it by
//! hand) and prints the solar gauge the Boktai games would show.

use std::error::Error;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use chrono::{Local, Utc};
use clap::{Parser, Subcommand};
use rand::Rng;
use tracing::{info, warn};

use boktaisim::cache::ObservationCache;
use boktaisim::config::{self, AreaType, Preferences};
use boktaisim::display;
use boktaisim::gauge::GaugeSession;
use boktaisim::ingest::{self, LocationQuery, OpenMeteoClient, ZippopotamClient};
use boktaisim::logging::{self, DataSource};
use boktaisim::manual::{ManualForm, ManualWeather};
use boktaisim::model::{BoktaiError, GameVersion, ResolvedLocation};
use boktaisim::observation::WeatherObservation;
use boktaisim::units::TempScale;

/// Boktai solar sensor simulator.
#[derive(Parser)]
#[command(name = "boktaisim")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Where the weather comes from. Defaults to the last saved choice.
    #[command(subcommand)]
    command: Option<Commands>,

    /// Boktai game whose gauge to imitate (1, 2 or 3).
    #[arg(long, global = true, value_parser = clap::value_parser!(u8).range(1..=3))]
    game: Option<u8>,

    /// Lunar mode: show half the blended value at night instead of zero.
    #[arg(long, global = true, conflicts_with = "no_lunar")]
    lunar: bool,

    /// Turn lunar mode off.
    #[arg(long, global = true)]
    no_lunar: bool,

    /// Temperature scale for display (F or C).
    #[arg(long, global = true)]
    scale: Option<TempScale>,

    /// Keep re-reading the gauge every gui_update_interval seconds.
    #[arg(long, global = true)]
    watch: bool,

    /// Preferences file. Defaults to $BOKTAISIM_CONFIG or ./boktaisim.toml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Also append log output to this file.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up weather for a US zip code.
    Zip {
        /// Five-digit zip code.
        zip: String,
    },

    /// Look up weather for a latitude/longitude pair.
    Coords {
        #[arg(allow_negative_numbers = true)]
        lat: f64,
        #[arg(allow_negative_numbers = true)]
        lon: f64,
    },

    /// Enter the weather by hand.
    Manual {
        /// Today's low.
        #[arg(long)]
        min: String,

        /// Today's average.
        #[arg(long)]
        avg: String,

        /// Today's high.
        #[arg(long)]
        max: String,

        /// Condition name ("Light Cloud") or code ("lc").
        #[arg(long)]
        weather: String,

        /// Sunrise, "HH:MM" or "h:MM AM".
        #[arg(long)]
        sunrise: String,

        /// Sunset, "HH:MM" or "h:MM PM".
        #[arg(long)]
        sunset: String,

        /// Temperatures are in Celsius.
        #[arg(long)]
        celsius: bool,
    },
}

/// What the gauge reads from.
enum Target {
    Lookup(ResolvedLocation),
    Manual(ManualWeather),
}

fn main() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(config::default_path);
    let saved = Preferences::read(&config_path)?;
    let found = saved.is_some();
    let mut prefs = saved.unwrap_or_default();
    logging::init_logger(prefs.log_level()?, cli.log_file.as_deref(), false)?;
    if !found {
        info!(path = %config_path.display(), "no preferences file, using defaults");
    }

    if let Some(game) = cli.game {
        prefs.version = GameVersion::try_from(game)?;
    }
    if cli.lunar {
        prefs.lunar_mode = true;
    } else if cli.no_lunar {
        prefs.lunar_mode = false;
    }
    if let Some(scale) = cli.scale {
        prefs.temp_scale = scale;
    }

    info!(
        source = %DataSource::System,
        version = %prefs.version,
        lunar_mode = prefs.lunar_mode,
        "starting gauge"
    );

    let target = select_target(cli.command.as_ref(), &mut prefs)?;
    prefs.save(&config_path)?;

    let weather_source = OpenMeteoClient::new()?;
    let mut cache = ObservationCache::new(prefs.api_update_interval);
    let observation = match &target {
        Target::Lookup(location) => cache.get_or_fetch(location, &weather_source)?.clone(),
        Target::Manual(weather) => cache
            .insert_manual(WeatherObservation::manual(weather.clone(), Utc::now())?)
            .clone(),
    };

    let mut session = GaugeSession::new(prefs.version, prefs.lunar_mode, observation);
    let mut rng = rand::rng();

    loop {
        print_reading(&session, prefs.temp_scale, &mut rng)?;
        if !cli.watch {
            break;
        }
        thread::sleep(Duration::from_secs(prefs.gui_update_interval));

        if let Target::Lookup(location) = &target {
            match cache.get_or_fetch(location, &weather_source) {
                Ok(observation) => session.replace_observation(observation.clone()),
                Err(_) => warn!(location = %location.id, "keeping previous weather"),
            }
        }
    }

    Ok(())
}

/// Picks the weather target from the subcommand, or from saved preferences
/// when none is given, and records the choice in `prefs`.
fn select_target(command: Option<&Commands>, prefs: &mut Preferences) -> Result<Target, Box<dyn Error>> {
    match command {
        Some(Commands::Zip { zip }) => {
            let location = lookup(&LocationQuery::Zip(zip.trim().to_string()))?;
            prefs.area_type = AreaType::Zipcode;
            prefs.zipcode = Some(zip.trim().to_string());
            Ok(Target::Lookup(location))
        }
        Some(Commands::Coords { lat, lon }) => {
            let location = lookup(&LocationQuery::Coordinates {
                latitude: *lat,
                longitude: *lon,
            })?;
            prefs.area_type = AreaType::Latlon;
            prefs.lat = Some(*lat);
            prefs.lon = Some(*lon);
            Ok(Target::Lookup(location))
        }
        Some(Commands::Manual {
            min,
            avg,
            max,
            weather,
            sunrise,
            sunset,
            celsius,
        }) => {
            let form = ManualForm {
                min: min.as_str(),
                avg: avg.as_str(),
                max: max.as_str(),
                scale: if *celsius { TempScale::Celsius } else { TempScale::Fahrenheit },
                weather: weather.as_str(),
                sunrise: sunrise.as_str(),
                sunset: sunset.as_str(),
            };
            let manual = form
                .parse_at(prefs.version, Local::now().fixed_offset())
                .inspect_err(|e| {
                    logging::log_lookup_failure(DataSource::Manual, "manual", "parse", e);
                })?;
            let (min_f, avg_f, max_f) = form.fahrenheit_range()?;
            prefs.area_type = AreaType::Manual;
            prefs.min_f = Some(min_f);
            prefs.avg_f = Some(avg_f);
            prefs.max_f = Some(max_f);
            prefs.weather = Some(manual.condition.name().to_string());
            prefs.sunrise = Some(sunrise.clone());
            prefs.sunset = Some(sunset.clone());
            Ok(Target::Manual(manual))
        }
        None => saved_target(prefs),
    }
}

fn saved_target(prefs: &Preferences) -> Result<Target, Box<dyn Error>> {
    let missing = || "no saved location; run `boktaisim zip <ZIP>`, `coords` or `manual` first";
    match prefs.area_type {
        AreaType::Zipcode => {
            let zip = prefs.zipcode.as_deref().ok_or_else(missing)?;
            Ok(Target::Lookup(lookup(&LocationQuery::Zip(zip.to_string()))?))
        }
        AreaType::Latlon => {
            let (latitude, longitude) = prefs.lat.zip(prefs.lon).ok_or_else(missing)?;
            Ok(Target::Lookup(lookup(&LocationQuery::Coordinates { latitude, longitude })?))
        }
        AreaType::Manual => {
            let (min, avg, max) = match (prefs.min_f, prefs.avg_f, prefs.max_f) {
                (Some(min), Some(avg), Some(max)) => (min.to_string(), avg.to_string(), max.to_string()),
                _ => return Err(missing().into()),
            };
            let form = ManualForm {
                min: &min,
                avg: &avg,
                max: &max,
                scale: TempScale::Fahrenheit,
                weather: prefs.weather.as_deref().ok_or_else(missing)?,
                sunrise: prefs.sunrise.as_deref().ok_or_else(missing)?,
                sunset: prefs.sunset.as_deref().ok_or_else(missing)?,
            };
            Ok(Target::Manual(form.parse_at(prefs.version, Local::now().fixed_offset())?))
        }
    }
}

fn lookup(query: &LocationQuery) -> Result<ResolvedLocation, BoktaiError> {
    let geocoder = ZippopotamClient::new()?;
    ingest::resolve(query, &geocoder)
        .inspect(|location| info!(location = %location.id, city = %location.city, "resolved {}", query))
        .inspect_err(|e| {
            logging::log_lookup_failure(DataSource::Geocoding, &query.to_string(), "resolve", e);
        })
}

fn print_reading<R: Rng + ?Sized>(session: &GaugeSession, scale: TempScale, rng: &mut R) -> Result<(), BoktaiError> {
    let read = session.read_at(Utc::now(), rng)?;
    let current_temp_c = session.observation().current_temperature(rng)?;
    print!(
        "{}",
        display::render_panel(session.observation(), &read, session.version(), current_temp_c, scale)
    );
    Ok(())
}
