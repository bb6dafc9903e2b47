//! Exogenous inputs: weather records and the holiday calendar
//!
//! Weather is supplied per (tenant-location, date) by an external
//! collaborator. Absence is tolerated everywhere: a missing record falls back
//! to monthly seasonal averages and the consumer flags the degradation.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Debug;

/// Categorical weather condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeatherCondition {
    Clear,
    PartlyCloudy,
    Cloudy,
    Rain,
    Snow,
    Other,
}

impl WeatherCondition {
    /// Numeric category for the feature matrix
    pub fn code(&self) -> f64 {
        match self {
            WeatherCondition::Clear => 0.0,
            WeatherCondition::PartlyCloudy => 1.0,
            WeatherCondition::Cloudy => 2.0,
            WeatherCondition::Rain => 3.0,
            WeatherCondition::Snow => 4.0,
            WeatherCondition::Other => 5.0,
        }
    }

    /// Best-effort mapping from a free-text condition description
    pub fn from_text(text: &str) -> Self {
        let lower = text.to_lowercase();
        let sunny = lower.contains("sunny") || lower.contains("clear");
        let cloudy = lower.contains("cloud") || lower.contains("overcast");

        if sunny {
            if cloudy {
                WeatherCondition::PartlyCloudy
            } else {
                WeatherCondition::Clear
            }
        } else if cloudy {
            WeatherCondition::Cloudy
        } else if lower.contains("rain") || lower.contains("shower") || lower.contains("drizzle") {
            WeatherCondition::Rain
        } else if lower.contains("snow") || lower.contains("sleet") {
            WeatherCondition::Snow
        } else {
            WeatherCondition::Other
        }
    }
}

/// One day's weather, observed or forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub condition: WeatherCondition,
    /// Daily maximum temperature, °C
    pub temp_max: f64,
    /// Daily minimum temperature, °C
    pub temp_min: f64,
    /// Chance of rain, 0-100
    pub precipitation: f64,
    pub humidity: Option<f64>,
    pub wind_speed: Option<f64>,
}

impl WeatherRecord {
    pub fn temp_avg(&self) -> f64 {
        (self.temp_max + self.temp_min) / 2.0
    }

    pub fn temp_range(&self) -> f64 {
        self.temp_max - self.temp_min
    }

    /// Derived business-impact features
    pub fn impact(&self) -> WeatherImpact {
        let temp_avg = self.temp_avg();
        let humidity = self.humidity.unwrap_or(65.0);

        // Comfort blends temperature (optimum around 22°C), rain chance and
        // humidity into a 0-100 score.
        let temp_score = (100.0 - (temp_avg - 22.0).abs() * 5.0).max(0.0);
        let rain_score = (100.0 - self.precipitation).max(0.0);
        let humidity_score = (100.0 - (humidity - 50.0).abs() * 2.0).max(0.0);

        WeatherImpact {
            condition_code: self.condition.code(),
            temp_avg,
            temp_range: self.temp_range(),
            is_rainy: self.precipitation > 50.0,
            is_hot: self.temp_max > 30.0,
            is_cold: self.temp_min < 5.0,
            comfort_index: (temp_score + rain_score + humidity_score) / 3.0,
        }
    }

    /// Monthly seasonal average used when no record exists for a date.
    ///
    /// Values follow a temperate four-season pattern with a wetter early
    /// summer.
    pub fn seasonal_average(date: NaiveDate) -> Self {
        match date.month() {
            12 | 1 | 2 => Self {
                condition: WeatherCondition::Cloudy,
                temp_max: 10.0,
                temp_min: 2.0,
                precipitation: 30.0,
                humidity: Some(60.0),
                wind_speed: Some(15.0),
            },
            3..=5 => Self {
                condition: WeatherCondition::PartlyCloudy,
                temp_max: 20.0,
                temp_min: 12.0,
                precipitation: 40.0,
                humidity: Some(65.0),
                wind_speed: Some(12.0),
            },
            6 => Self {
                condition: WeatherCondition::Rain,
                temp_max: 25.0,
                temp_min: 18.0,
                precipitation: 60.0,
                humidity: Some(75.0),
                wind_speed: Some(10.0),
            },
            7 | 8 => Self {
                condition: WeatherCondition::Clear,
                temp_max: 30.0,
                temp_min: 22.0,
                precipitation: 35.0,
                humidity: Some(75.0),
                wind_speed: Some(10.0),
            },
            _ => Self {
                condition: WeatherCondition::Clear,
                temp_max: 22.0,
                temp_min: 14.0,
                precipitation: 35.0,
                humidity: Some(65.0),
                wind_speed: Some(12.0),
            },
        }
    }
}

/// Weather features as they enter the feature matrix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherImpact {
    pub condition_code: f64,
    pub temp_avg: f64,
    pub temp_range: f64,
    pub is_rainy: bool,
    pub is_hot: bool,
    pub is_cold: bool,
    /// 0-100 blend of temperature, rain and humidity scores
    pub comfort_index: f64,
}

/// Per-date weather history for one tenant location
#[derive(Debug, Clone, Default)]
pub struct ExogenousSeries {
    weather: BTreeMap<NaiveDate, WeatherRecord>,
}

impl ExogenousSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, date: NaiveDate, record: WeatherRecord) {
        self.weather.insert(date, record);
    }

    pub fn get(&self, date: NaiveDate) -> Option<&WeatherRecord> {
        self.weather.get(&date)
    }

    pub fn len(&self) -> usize {
        self.weather.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weather.is_empty()
    }

    /// Record for the date, or the seasonal average with a fallback marker
    pub fn get_or_seasonal(&self, date: NaiveDate) -> (WeatherRecord, bool) {
        match self.weather.get(&date) {
            Some(record) => (record.clone(), false),
            None => (WeatherRecord::seasonal_average(date), true),
        }
    }
}

/// Pure date lookup for public holidays, injected as a collaborator
pub trait HolidayCalendar: Debug {
    fn is_holiday(&self, date: NaiveDate) -> bool;

    fn holiday_name(&self, _date: NaiveDate) -> Option<&str> {
        None
    }
}

/// Calendar with no holidays at all
#[derive(Debug, Clone, Default)]
pub struct NoHolidays;

impl HolidayCalendar for NoHolidays {
    fn is_holiday(&self, _date: NaiveDate) -> bool {
        false
    }
}

/// Calendar backed by an explicit date set
#[derive(Debug, Clone, Default)]
pub struct StaticHolidayCalendar {
    days: BTreeMap<NaiveDate, String>,
}

impl StaticHolidayCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_dates<I: IntoIterator<Item = (NaiveDate, String)>>(dates: I) -> Self {
        Self {
            days: dates.into_iter().collect(),
        }
    }

    pub fn insert(&mut self, date: NaiveDate, name: String) {
        self.days.insert(date, name);
    }
}

impl HolidayCalendar for StaticHolidayCalendar {
    fn is_holiday(&self, date: NaiveDate) -> bool {
        self.days.contains_key(&date)
    }

    fn holiday_name(&self, date: NaiveDate) -> Option<&str> {
        self.days.get(&date).map(|s| s.as_str())
    }
}
