use crate::validation::{require_latitude, require_longitude, require_value, ValidationError};
use serde::{Deserialize, Serialize};

/// Where prayer times are computed for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Location {
    #[serde(rename = "city")]
    ByCity { city: String, country: String },
    #[serde(rename = "coords")]
    ByCoordinates { latitude: f64, longitude: f64 },
}

impl Location {
    pub fn city(city: &str, country: &str) -> Result<Self, ValidationError> {
        Ok(Location::ByCity {
            city: require_value(city, "city")?,
            country: require_value(country, "country")?,
        })
    }

    pub fn coordinates(latitude: f64, longitude: f64) -> Result<Self, ValidationError> {
        require_latitude(latitude)?;
        require_longitude(longitude)?;
        Ok(Location::ByCoordinates {
            latitude,
            longitude,
        })
    }

    /// Re-checks a location that did not come through the constructors
    /// (deserialized from a request body or the store), returning a copy
    /// with city and country trimmed so `" Homs "` and `"Homs"` share cache
    /// entries.
    pub fn normalized(&self) -> Result<Self, ValidationError> {
        match self {
            Location::ByCity { city, country } => Location::city(city, country),
            Location::ByCoordinates {
                latitude,
                longitude,
            } => Location::coordinates(*latitude, *longitude),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Prayer {
    Fajr,
    Sunrise,
    Dhuhr,
    Asr,
    Maghrib,
    Isha,
}

impl Prayer {
    /// Canonical display and scan order.
    pub const ALL: [Prayer; 6] = [
        Prayer::Fajr,
        Prayer::Sunrise,
        Prayer::Dhuhr,
        Prayer::Asr,
        Prayer::Maghrib,
        Prayer::Isha,
    ];

    pub fn label_ar(self) -> &'static str {
        match self {
            Prayer::Fajr => "الفجر",
            Prayer::Sunrise => "الشروق",
            Prayer::Dhuhr => "الظهر",
            Prayer::Asr => "العصر",
            Prayer::Maghrib => "المغرب",
            Prayer::Isha => "العشاء",
        }
    }
}

/// Raw provider time strings, e.g. `"05:12 (+03)"`. Extra provider keys
/// (Imsak, Midnight, ...) are dropped on deserialization.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Timings {
    #[serde(default)]
    pub fajr: String,
    #[serde(default)]
    pub sunrise: String,
    #[serde(default)]
    pub dhuhr: String,
    #[serde(default)]
    pub asr: String,
    #[serde(default)]
    pub maghrib: String,
    #[serde(default)]
    pub isha: String,
}

impl Timings {
    pub fn get(&self, prayer: Prayer) -> &str {
        match prayer {
            Prayer::Fajr => &self.fajr,
            Prayer::Sunrise => &self.sunrise,
            Prayer::Dhuhr => &self.dhuhr,
            Prayer::Asr => &self.asr,
            Prayer::Maghrib => &self.maghrib,
            Prayer::Isha => &self.isha,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WeekdayLabel {
    pub en: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ar: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GregorianDate {
    /// `DD-MM-YYYY`
    pub date: String,
    #[serde(default)]
    pub weekday: WeekdayLabel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HijriMonth {
    pub number: u32,
    #[serde(default)]
    pub en: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ar: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HijriDate {
    /// `DD-MM-YYYY` in the Hijri calendar
    pub date: String,
    pub month: HijriMonth,
    pub year: String,
    #[serde(default)]
    pub weekday: WeekdayLabel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayDate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readable: Option<String>,
    pub gregorian: GregorianDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hijri: Option<HijriDate>,
}

/// One calendar day of prayer data, as returned by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayEntry {
    pub timings: Timings,
    pub date: DayDate,
}

impl DayEntry {
    pub fn gregorian_date(&self) -> &str {
        &self.date.gregorian.date
    }
}

/// Index 0 is day 1 of the month.
pub type MonthCalendar = Vec<DayEntry>;

pub const WEEK_LENGTH: usize = 7;

/// Exactly [`WEEK_LENGTH`] consecutive days starting at the reference date.
pub type WeekWindow = Vec<DayEntry>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QiblaDirection {
    pub latitude: f64,
    pub longitude: f64,
    /// Degrees clockwise from North.
    pub direction: f64,
}

/// Aladhan wraps every payload in `{ code, status, data }`.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub code: u16,
    #[serde(default)]
    pub status: String,
    pub data: T,
}

#[derive(Debug, Deserialize)]
pub struct HijriConversion {
    pub hijri: HijriDate,
}

#[derive(Debug, Deserialize)]
pub struct GregorianConversion {
    pub gregorian: GregorianDate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_json_shape() {
        let city = Location::city("Homs", "Syria").unwrap();
        let json = serde_json::to_value(&city).unwrap();
        assert_eq!(json["type"], "city");
        assert_eq!(json["city"], "Homs");

        let coords: Location =
            serde_json::from_str(r#"{"type":"coords","latitude":34.72682,"longitude":36.72339}"#)
                .unwrap();
        assert_eq!(
            coords,
            Location::ByCoordinates {
                latitude: 34.72682,
                longitude: 36.72339
            }
        );
    }

    #[test]
    fn test_location_constructors_validate() {
        assert_eq!(
            Location::city("  Homs ", " Syria").unwrap(),
            Location::ByCity {
                city: "Homs".to_string(),
                country: "Syria".to_string()
            }
        );
        assert!(Location::city("", "Syria").is_err());
        assert!(Location::coordinates(91.0, 0.0).is_err());
        assert!(Location::coordinates(0.0, -181.0).is_err());

        let bad = Location::ByCity {
            city: " ".to_string(),
            country: "Syria".to_string(),
        };
        assert_eq!(bad.normalized(), Err(ValidationError::Required("city")));
    }

    #[test]
    fn test_normalized_trims_deserialized_city() {
        let padded: Location =
            serde_json::from_str(r#"{"type":"city","city":" Homs ","country":"Syria "}"#).unwrap();

        assert_eq!(padded.normalized().unwrap(), Location::city("Homs", "Syria").unwrap());
        assert_eq!(
            Location::ByCity {
                city: "Homs".to_string(),
                country: "\t".to_string()
            }
            .normalized(),
            Err(ValidationError::Required("country"))
        );
    }

    #[test]
    fn test_day_entry_from_provider_payload() {
        let raw = r#"{
            "timings": {
                "Fajr": "04:48 (EET)", "Sunrise": "06:13 (EET)", "Dhuhr": "11:58 (EET)",
                "Asr": "15:01 (EET)", "Sunset": "17:43 (EET)", "Maghrib": "17:43 (EET)",
                "Isha": "19:03 (EET)", "Imsak": "04:38 (EET)", "Midnight": "23:58 (EET)"
            },
            "date": {
                "readable": "09 Feb 2026",
                "timestamp": "1770620461",
                "gregorian": {
                    "date": "09-02-2026",
                    "format": "DD-MM-YYYY",
                    "day": "09",
                    "weekday": { "en": "Monday" }
                },
                "hijri": {
                    "date": "21-08-1447",
                    "day": "21",
                    "weekday": { "en": "Al Athnayn", "ar": "الاثنين" },
                    "month": { "number": 8, "en": "Shaʿbān", "ar": "شَعْبان" },
                    "year": "1447"
                }
            },
            "meta": { "timezone": "Asia/Damascus" }
        }"#;

        let entry: DayEntry = serde_json::from_str(raw).unwrap();
        assert_eq!(entry.gregorian_date(), "09-02-2026");
        assert_eq!(entry.date.gregorian.weekday.en, "Monday");
        assert_eq!(entry.timings.get(Prayer::Fajr), "04:48 (EET)");
        assert_eq!(entry.timings.get(Prayer::Isha), "19:03 (EET)");
        assert_eq!(entry.date.hijri.as_ref().unwrap().month.number, 8);
    }
}
