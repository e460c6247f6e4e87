use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use domains::ports::{CandidateSelector, UserRepository};
use domains::{
    CandidateQuery, DomainError, DomainResult, Gender, GeoPoint, Photo, Profile, ProfileDetails,
    UserId,
};
use uuid::Uuid;

use super::{db_error, parse_gender, PgStore};

const PROFILE_COLUMNS: &str = "id, first_name, last_name, bio, birth_date, gender, \
     preferred_gender, latitude, longitude, last_active";

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    first_name: String,
    last_name: String,
    bio: String,
    birth_date: NaiveDate,
    gender: String,
    preferred_gender: String,
    latitude: f64,
    longitude: f64,
    last_active: DateTime<Utc>,
}

impl TryFrom<UserRow> for Profile {
    type Error = DomainError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(Profile {
            id: UserId(row.id),
            first_name: row.first_name,
            last_name: row.last_name,
            bio: row.bio,
            birth_date: row.birth_date,
            gender: parse_gender(&row.gender)?,
            preferred_gender: parse_gender(&row.preferred_gender)?,
            location: GeoPoint {
                latitude: row.latitude,
                longitude: row.longitude,
            },
            last_active: row.last_active,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PhotoRow {
    user_id: Uuid,
    url: String,
    is_main: bool,
}

impl PgStore {
    async fn fetch_photos(&self, ids: &[Uuid]) -> DomainResult<Vec<PhotoRow>> {
        sqlx::query_as::<_, PhotoRow>(
            r#"
            SELECT user_id, url, is_main
            FROM user_photos
            WHERE user_id = ANY($1)
            ORDER BY user_id, is_main DESC, created_at ASC
            "#,
        )
        .bind(ids)
        .fetch_all(self.pool())
        .await
        .map_err(db_error)
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn get_profile(&self, id: UserId) -> DomainResult<Option<Profile>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(self.pool())
        .await
        .map_err(db_error)?;

        row.map(Profile::try_from).transpose()
    }

    async fn get_details(&self, id: UserId) -> DomainResult<Option<ProfileDetails>> {
        let Some(profile) = self.get_profile(id).await? else {
            return Ok(None);
        };
        let photos = self
            .fetch_photos(&[id.as_uuid()])
            .await?
            .into_iter()
            .map(|row| Photo {
                url: row.url,
                is_main: row.is_main,
            })
            .collect();
        Ok(Some(ProfileDetails { profile, photos }))
    }

    async fn photo_urls(&self, ids: &[UserId]) -> DomainResult<HashMap<UserId, Vec<String>>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let raw: Vec<Uuid> = ids.iter().map(UserId::as_uuid).collect();

        let mut urls: HashMap<UserId, Vec<String>> = HashMap::new();
        for row in self.fetch_photos(&raw).await? {
            urls.entry(UserId(row.user_id)).or_default().push(row.url);
        }
        Ok(urls)
    }

    async fn update_profile(
        &self,
        id: UserId,
        bio: &str,
        preferred_gender: Gender,
        at: DateTime<Utc>,
    ) -> DomainResult<Option<Profile>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET bio = $2, preferred_gender = $3, last_active = $4 \
             WHERE id = $1 RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(bio)
        .bind(preferred_gender.as_str())
        .bind(at)
        .fetch_optional(self.pool())
        .await
        .map_err(db_error)?;

        row.map(Profile::try_from).transpose()
    }

    async fn update_location(
        &self,
        id: UserId,
        location: GeoPoint,
        at: DateTime<Utc>,
    ) -> DomainResult<Option<Profile>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET latitude = $2, longitude = $3, last_active = $4 \
             WHERE id = $1 RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(location.latitude)
        .bind(location.longitude)
        .bind(at)
        .fetch_optional(self.pool())
        .await
        .map_err(db_error)?;

        row.map(Profile::try_from).transpose()
    }
}

#[async_trait]
impl CandidateSelector for PgStore {
    /// Bounding-box search. Exact great-circle distance is not computed.
    async fn select(&self, query: &CandidateQuery) -> DomainResult<Vec<UserId>> {
        let area = query.location.bounding_box(query.max_distance_km);
        let (born_after, born_on_or_before) = query.ages.birth_date_bounds(query.as_of);
        let mut exclude: Vec<Uuid> = query.exclude.iter().map(UserId::as_uuid).collect();
        exclude.push(query.seeker.as_uuid());
        let limit = i64::try_from(query.count).unwrap_or(i64::MAX);

        let ids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT id
            FROM users
            WHERE gender = $1
              AND birth_date > $2 AND birth_date <= $3
              AND latitude BETWEEN $4 AND $5
              AND longitude BETWEEN $6 AND $7
              AND NOT (id = ANY($8))
            ORDER BY last_active DESC
            LIMIT $9
            "#,
        )
        .bind(query.gender.as_str())
        .bind(born_after)
        .bind(born_on_or_before)
        .bind(area.min_latitude)
        .bind(area.max_latitude)
        .bind(area.min_longitude)
        .bind(area.max_longitude)
        .bind(&exclude)
        .bind(limit)
        .fetch_all(self.pool())
        .await
        .map_err(db_error)?;

        Ok(ids.into_iter().map(UserId).collect())
    }
}
