use chrono::NaiveDate;
use rstest::rstest;
use store_forecast::exogenous::{
    HolidayCalendar, StaticHolidayCalendar, WeatherCondition, WeatherRecord,
};

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[rstest]
#[case("Sunny", WeatherCondition::Clear)]
#[case("Clear skies", WeatherCondition::Clear)]
#[case("Partly cloudy and sunny", WeatherCondition::PartlyCloudy)]
#[case("Overcast", WeatherCondition::Cloudy)]
#[case("Light rain shower", WeatherCondition::Rain)]
#[case("Heavy snow", WeatherCondition::Snow)]
#[case("Fog", WeatherCondition::Other)]
fn test_condition_from_text(#[case] text: &str, #[case] expected: WeatherCondition) {
    assert_eq!(WeatherCondition::from_text(text), expected);
}

#[test]
fn test_impact_flags() {
    let hot_day = WeatherRecord {
        condition: WeatherCondition::Clear,
        temp_max: 33.0,
        temp_min: 24.0,
        precipitation: 10.0,
        humidity: Some(70.0),
        wind_speed: None,
    };
    let impact = hot_day.impact();
    assert!(impact.is_hot);
    assert!(!impact.is_cold);
    assert!(!impact.is_rainy);
    assert_eq!(impact.temp_avg, 28.5);
    assert_eq!(impact.temp_range, 9.0);

    let wet_cold_day = WeatherRecord {
        condition: WeatherCondition::Rain,
        temp_max: 8.0,
        temp_min: 1.0,
        precipitation: 80.0,
        humidity: Some(90.0),
        wind_speed: None,
    };
    let impact = wet_cold_day.impact();
    assert!(impact.is_rainy);
    assert!(impact.is_cold);
    assert!(!impact.is_hot);
}

#[test]
fn test_comfort_index_prefers_mild_weather() {
    let mild = WeatherRecord {
        condition: WeatherCondition::Clear,
        temp_max: 25.0,
        temp_min: 19.0,
        precipitation: 5.0,
        humidity: Some(50.0),
        wind_speed: None,
    };
    let harsh = WeatherRecord {
        condition: WeatherCondition::Rain,
        temp_max: 4.0,
        temp_min: -3.0,
        precipitation: 90.0,
        humidity: Some(95.0),
        wind_speed: None,
    };

    let mild_comfort = mild.impact().comfort_index;
    let harsh_comfort = harsh.impact().comfort_index;

    assert!((0.0..=100.0).contains(&mild_comfort));
    assert!((0.0..=100.0).contains(&harsh_comfort));
    assert!(mild_comfort > harsh_comfort);
}

#[rstest]
#[case(1, 10.0)]
#[case(4, 20.0)]
#[case(7, 30.0)]
#[case(10, 22.0)]
fn test_seasonal_average_by_month(#[case] month: u32, #[case] expected_max: f64) {
    let record = WeatherRecord::seasonal_average(day(2024, month, 15));
    assert_eq!(record.temp_max, expected_max);
}

#[test]
fn test_june_is_the_wet_season() {
    let june = WeatherRecord::seasonal_average(day(2024, 6, 10));
    assert_eq!(june.condition, WeatherCondition::Rain);
    assert!(june.precipitation > 50.0);
}

#[test]
fn test_static_holiday_calendar() {
    let mut calendar = StaticHolidayCalendar::new();
    calendar.insert(day(2024, 1, 1), "New Year's Day".to_string());

    assert!(calendar.is_holiday(day(2024, 1, 1)));
    assert!(!calendar.is_holiday(day(2024, 1, 2)));
    assert_eq!(
        calendar.holiday_name(day(2024, 1, 1)),
        Some("New Year's Day")
    );
    assert_eq!(calendar.holiday_name(day(2024, 1, 2)), None);
}
