//! # Domain Models
//!
//! Identities, profiles and the geographic/age filters applied to them.
//! We use UUID v7 for time-ordered, globally unique identification.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{DomainError, DomainResult};

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

id_type!(
    /// Opaque identity of a person using the service.
    UserId
);
id_type!(MatchId);
id_type!(MessageId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    NonBinary,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::NonBinary => "non_binary",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "male" => Some(Gender::Male),
            "female" => Some(Gender::Female),
            "non_binary" => Some(Gender::NonBinary),
            _ => None,
        }
    }
}

/// Kilometres spanned by one degree of latitude.
const KM_PER_DEGREE: f64 = 111.0;

/// WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> DomainResult<Self> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(DomainError::invalid_argument(format!(
                "coordinates out of range: ({latitude}, {longitude})"
            )));
        }
        Ok(Self { latitude, longitude })
    }

    /// Rectangle approximating a circle of `radius_km` around this point.
    ///
    /// One degree of latitude is taken as 111 km and longitude degrees shrink
    /// with `cos(latitude)`. Near the poles the box widens to every longitude.
    pub fn bounding_box(&self, radius_km: f64) -> BoundingBox {
        let lat_delta = radius_km / KM_PER_DEGREE;
        let cos_lat = self.latitude.to_radians().cos();
        let lon_delta = if cos_lat.abs() < 1e-6 {
            180.0
        } else {
            (radius_km / (KM_PER_DEGREE * cos_lat)).abs().min(180.0)
        };

        BoundingBox {
            min_latitude: (self.latitude - lat_delta).max(-90.0),
            max_latitude: (self.latitude + lat_delta).min(90.0),
            min_longitude: self.longitude - lon_delta,
            max_longitude: self.longitude + lon_delta,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_latitude: f64,
    pub max_latitude: f64,
    pub min_longitude: f64,
    pub max_longitude: f64,
}

impl BoundingBox {
    pub fn contains(&self, point: &GeoPoint) -> bool {
        (self.min_latitude..=self.max_latitude).contains(&point.latitude)
            && (self.min_longitude..=self.max_longitude).contains(&point.longitude)
    }
}

/// The cached projection of a user: every field a filter or a cache
/// invalidation decision depends on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    pub birth_date: NaiveDate,
    pub gender: Gender,
    pub preferred_gender: Gender,
    pub location: GeoPoint,
    pub last_active: DateTime<Utc>,
}

impl Profile {
    pub fn age_on(&self, today: NaiveDate) -> u32 {
        age_on(self.birth_date, today)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Photo {
    pub url: String,
    pub is_main: bool,
}

/// Profile plus its photo list. Always read from the source of record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileDetails {
    pub profile: Profile,
    pub photos: Vec<Photo>,
}

/// Whole years elapsed between `birth_date` and `today`.
pub fn age_on(birth_date: NaiveDate, today: NaiveDate) -> u32 {
    let mut years = today.year() - birth_date.year();
    if (today.month(), today.day()) < (birth_date.month(), birth_date.day()) {
        years -= 1;
    }
    years.max(0) as u32
}

pub const MIN_AGE: u32 = 18;
pub const MAX_AGE: u32 = 100;

/// Inclusive age bounds, in whole years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeRange {
    min: u32,
    max: u32,
}

impl AgeRange {
    pub fn new(min: Option<u32>, max: Option<u32>) -> DomainResult<Self> {
        let min = min.unwrap_or(MIN_AGE).max(MIN_AGE);
        let max = max.unwrap_or(MAX_AGE);
        if max > MAX_AGE {
            return Err(DomainError::invalid_argument(format!(
                "max age is limited to {MAX_AGE}"
            )));
        }
        if min > max {
            return Err(DomainError::invalid_argument(format!(
                "min age {min} exceeds max age {max}"
            )));
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> u32 {
        self.min
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    /// Birth dates matching this range on `today`, as
    /// `(exclusive lower bound, inclusive upper bound)`.
    pub fn birth_date_bounds(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let earliest = years_before(today, self.max.saturating_add(1));
        let latest = years_before(today, self.min);
        (earliest, latest)
    }

    pub fn admits(&self, birth_date: NaiveDate, today: NaiveDate) -> bool {
        let (earliest, latest) = self.birth_date_bounds(today);
        birth_date > earliest && birth_date <= latest
    }
}

fn years_before(date: NaiveDate, years: u32) -> NaiveDate {
    years
        .checked_mul(12)
        .and_then(|months| date.checked_sub_months(Months::new(months)))
        .unwrap_or(NaiveDate::MIN)
}

/// Everything the candidate selector needs to build a deck.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateQuery {
    pub seeker: UserId,
    pub location: GeoPoint,
    pub max_distance_km: f64,
    pub gender: Gender,
    pub ages: AgeRange,
    pub exclude: HashSet<UserId>,
    pub count: usize,
    pub as_of: NaiveDate,
}
