//! Reqwest-backed table adapter for the REST data API.
//!
//! One adapter implements every table-scoped repository port. It owns
//! transport details only: query rendering, status mapping and JSON
//! decoding into domain records.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use super::dto::{
    CounterpartDto, FollowRowDto, GenreDto, NewTrackDto, ProfileRowDto, ProfileSummaryDto,
    ProfileUpsertDto, RestErrorDto, TRACK_LISTING_COLUMNS, TrackRowDto, into_listings,
};
use super::rest_query::{Order, TableQuery};
use super::{BackendClient, RawResponse, execute, header_str, status_message};
use crate::domain::ports::{
    DataStoreError, FollowRepository, GenreRepository, ProfileRepository, TrackRepository,
};
use crate::domain::{
    FollowEdge, Genre, NewTrack, Profile, ProfileRecord, ProfileSummary, RelationKind, Track,
    TrackId, TrackListing, UserId, VisibilityScope,
};

const UNIQUE_VIOLATION: &str = "23505";
const PREFER_MINIMAL: &str = "return=minimal";
const PREFER_UPSERT: &str = "resolution=merge-duplicates,return=minimal";
const PREFER_COUNT: &str = "count=exact";

const TRACKS: &str = "tracks";
const GENRES: &str = "genres";
const PROFILES: &str = "profiles";
const FOLLOWERS: &str = "followers";

/// Data store adapter over the REST table API.
#[derive(Clone)]
pub struct RestDataStore {
    client: BackendClient,
}

impl RestDataStore {
    /// Wrap a shared backend client.
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }

    fn table_url(&self, table: &str, query: &TableQuery) -> Result<Url, DataStoreError> {
        let mut url = self
            .client
            .url(["rest", "v1", table])
            .map_err(DataStoreError::connection)?;
        query.apply_to(&mut url);
        Ok(url)
    }

    fn request(
        &self,
        method: Method,
        table: &str,
        query: &TableQuery,
    ) -> Result<RequestBuilder, DataStoreError> {
        let url = self.table_url(table, query)?;
        self.client
            .request(method, url)
            .map_err(DataStoreError::connection)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<RawResponse, DataStoreError> {
        let response = execute(builder).await.map_err(map_transport_error)?;
        if !response.status.is_success() {
            return Err(map_status_error(response.status, &response.body));
        }
        Ok(response)
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &TableQuery,
    ) -> Result<Vec<T>, DataStoreError> {
        let builder = self.request(Method::GET, table, query)?;
        let response = self.send(builder).await?;
        serde_json::from_slice(&response.body).map_err(|error| {
            DataStoreError::decode(format!("{table} response was not valid JSON: {error}"))
        })
    }

    async fn write_json<B: serde::Serialize + Sync>(
        &self,
        table: &str,
        query: &TableQuery,
        prefer: &str,
        body: &B,
    ) -> Result<(), DataStoreError> {
        let builder = self
            .request(Method::POST, table, query)?
            .header("Prefer", prefer)
            .json(body);
        self.send(builder).await.map(drop)
    }

    async fn remove_rows(&self, table: &str, query: &TableQuery) -> Result<(), DataStoreError> {
        let builder = self
            .request(Method::DELETE, table, query)?
            .header("Prefer", PREFER_MINIMAL);
        self.send(builder).await.map(drop)
    }

    async fn exact_count(&self, table: &str, query: &TableQuery) -> Result<u64, DataStoreError> {
        let builder = self
            .request(Method::HEAD, table, query)?
            .header("Prefer", PREFER_COUNT);
        let response = self.send(builder).await?;
        let range = header_str(&response.headers, "content-range").ok_or_else(|| {
            DataStoreError::decode(format!("{table} count response missing Content-Range"))
        })?;
        parse_content_range_total(range).ok_or_else(|| {
            DataStoreError::decode(format!("{table} count has unreadable Content-Range `{range}`"))
        })
    }
}

fn owner_query(owner: &UserId, scope: VisibilityScope) -> TableQuery {
    let query = TableQuery::new()
        .select(TRACK_LISTING_COLUMNS)
        .eq("user_id", owner);
    let query = match scope {
        VisibilityScope::PublicOnly => query.eq("is_public", true),
        VisibilityScope::All => query,
    };
    query.order("created_at", Order::Descending)
}

fn edge_query(edge: &FollowEdge) -> TableQuery {
    TableQuery::new()
        .eq("follower_id", edge.follower)
        .eq("followed_id", edge.followed)
}

#[async_trait]
impl TrackRepository for RestDataStore {
    async fn list_public(&self, limit: usize) -> Result<Vec<TrackListing>, DataStoreError> {
        let query = TableQuery::new()
            .select(TRACK_LISTING_COLUMNS)
            .eq("is_public", true)
            .order("created_at", Order::Descending)
            .limit(limit);
        let rows: Vec<TrackRowDto> = self.fetch(TRACKS, &query).await?;
        into_listings(rows).map_err(DataStoreError::decode)
    }

    async fn list_by_owner(
        &self,
        owner: &UserId,
        scope: VisibilityScope,
    ) -> Result<Vec<TrackListing>, DataStoreError> {
        let rows: Vec<TrackRowDto> = self.fetch(TRACKS, &owner_query(owner, scope)).await?;
        into_listings(rows).map_err(DataStoreError::decode)
    }

    async fn find_owned(
        &self,
        id: &TrackId,
        owner: &UserId,
    ) -> Result<Option<Track>, DataStoreError> {
        let query = TableQuery::new()
            .select("*")
            .eq("id", id)
            .eq("user_id", owner)
            .limit(1);
        let rows: Vec<TrackRowDto> = self.fetch(TRACKS, &query).await?;
        rows.into_iter()
            .next()
            .map(TrackRowDto::into_track)
            .transpose()
            .map_err(DataStoreError::decode)
    }

    async fn insert(&self, track: &NewTrack) -> Result<(), DataStoreError> {
        self.write_json(
            TRACKS,
            &TableQuery::new(),
            PREFER_MINIMAL,
            &NewTrackDto::from(track),
        )
        .await
    }

    async fn delete(&self, id: &TrackId, owner: &UserId) -> Result<(), DataStoreError> {
        let query = TableQuery::new().eq("id", id).eq("user_id", owner);
        self.remove_rows(TRACKS, &query).await
    }
}

#[async_trait]
impl GenreRepository for RestDataStore {
    async fn list_by_name(&self) -> Result<Vec<Genre>, DataStoreError> {
        let query = TableQuery::new()
            .select("id,name,description")
            .order("name", Order::Ascending);
        let rows: Vec<GenreDto> = self.fetch(GENRES, &query).await?;
        Ok(rows.into_iter().map(Genre::from).collect())
    }
}

#[async_trait]
impl ProfileRepository for RestDataStore {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<Profile>, DataStoreError> {
        let query = TableQuery::new()
            .select("id,username,bio,location,avatar_url")
            .eq("id", id)
            .limit(1);
        let rows: Vec<ProfileRowDto> = self.fetch(PROFILES, &query).await?;
        Ok(rows.into_iter().next().map(Profile::from))
    }

    async fn find_summaries(&self, ids: &[UserId]) -> Result<Vec<ProfileSummary>, DataStoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = TableQuery::new()
            .select("id,username,avatar_url")
            .in_list("id", ids);
        let rows: Vec<ProfileSummaryDto> = self.fetch(PROFILES, &query).await?;
        Ok(rows.into_iter().map(ProfileSummary::from).collect())
    }

    async fn upsert(&self, record: &ProfileRecord) -> Result<(), DataStoreError> {
        self.write_json(
            PROFILES,
            &TableQuery::new().on_conflict("id"),
            PREFER_UPSERT,
            &ProfileUpsertDto::from(record),
        )
        .await
    }
}

#[async_trait]
impl FollowRepository for RestDataStore {
    async fn count(&self, subject: &UserId, kind: RelationKind) -> Result<u64, DataStoreError> {
        let query = TableQuery::new()
            .select(kind.counterpart_column())
            .eq(kind.subject_column(), subject);
        self.exact_count(FOLLOWERS, &query).await
    }

    async fn exists(&self, edge: &FollowEdge) -> Result<bool, DataStoreError> {
        let query = edge_query(edge).select("follower_id").limit(1);
        let rows: Vec<serde_json::Value> = self.fetch(FOLLOWERS, &query).await?;
        Ok(!rows.is_empty())
    }

    async fn insert(&self, edge: &FollowEdge) -> Result<(), DataStoreError> {
        let row = FollowRowDto {
            follower_id: edge.follower.as_uuid(),
            followed_id: edge.followed.as_uuid(),
        };
        self.write_json(FOLLOWERS, &TableQuery::new(), PREFER_MINIMAL, &row)
            .await
    }

    async fn delete(&self, edge: &FollowEdge) -> Result<(), DataStoreError> {
        self.remove_rows(FOLLOWERS, &edge_query(edge)).await
    }

    async fn list_counterparts(
        &self,
        subject: &UserId,
        kind: RelationKind,
    ) -> Result<Vec<UserId>, DataStoreError> {
        let query = TableQuery::new()
            .select(kind.counterpart_column())
            .eq(kind.subject_column(), subject);
        let rows: Vec<CounterpartDto> = self.fetch(FOLLOWERS, &query).await?;
        rows.into_iter()
            .map(|row| row.into_user(kind))
            .collect::<Result<_, _>>()
            .map_err(DataStoreError::decode)
    }
}

fn map_transport_error(error: reqwest::Error) -> DataStoreError {
    if error.is_decode() {
        DataStoreError::decode(error.to_string())
    } else {
        DataStoreError::connection(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> DataStoreError {
    let detail = serde_json::from_slice::<RestErrorDto>(body).unwrap_or_default();
    let message = detail
        .message
        .clone()
        .unwrap_or_else(|| status_message(status, body));
    debug!(status = status.as_u16(), code = ?detail.code, "data store request failed");

    if status == StatusCode::CONFLICT || detail.code.as_deref() == Some(UNIQUE_VIOLATION) {
        return DataStoreError::already_exists(message);
    }
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => DataStoreError::unauthorized(message),
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
            DataStoreError::connection(message)
        }
        _ => DataStoreError::query(message),
    }
}

/// Total from a `Content-Range` header such as `0-24/3573` or `*/0`.
fn parse_content_range_total(raw: &str) -> Option<u64> {
    let (_, total) = raw.trim().rsplit_once('/')?;
    total.parse().ok()
}

#[cfg(test)]
mod tests {
    //! Regression coverage for status mapping and count parsing.

    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(StatusCode::CONFLICT, "", DataStoreError::already_exists("status 409"))]
    #[case(
        StatusCode::BAD_REQUEST,
        r#"{"code":"23505","message":"duplicate key value"}"#,
        DataStoreError::already_exists("duplicate key value")
    )]
    #[case(
        StatusCode::UNAUTHORIZED,
        r#"{"code":"PGRST301","message":"JWT expired"}"#,
        DataStoreError::unauthorized("JWT expired")
    )]
    #[case(StatusCode::FORBIDDEN, "", DataStoreError::unauthorized("status 403"))]
    #[case(
        StatusCode::SERVICE_UNAVAILABLE,
        "upstream down",
        DataStoreError::connection("status 503: upstream down")
    )]
    #[case(
        StatusCode::BAD_REQUEST,
        r#"{"code":"PGRST100","message":"failed to parse filter"}"#,
        DataStoreError::query("failed to parse filter")
    )]
    fn status_mapping(
        #[case] status: StatusCode,
        #[case] body: &str,
        #[case] expected: DataStoreError,
    ) {
        assert_eq!(map_status_error(status, body.as_bytes()), expected);
    }

    #[rstest]
    #[case("0-24/3573", Some(3573))]
    #[case("*/0", Some(0))]
    #[case(" 0-0/1 ", Some(1))]
    #[case("0-24/*", None)]
    #[case("garbage", None)]
    fn content_range_totals(#[case] raw: &str, #[case] expected: Option<u64>) {
        assert_eq!(parse_content_range_total(raw), expected);
    }

    #[rstest]
    fn public_scope_adds_visibility_filter() {
        let owner = UserId::random();
        let public = owner_query(&owner, VisibilityScope::PublicOnly);
        let all = owner_query(&owner, VisibilityScope::All);

        assert!(public
            .pairs()
            .iter()
            .any(|(key, value)| key == "is_public" && value == "eq.true"));
        assert!(!all.pairs().iter().any(|(key, _)| key == "is_public"));
    }

    #[rstest]
    #[tokio::test]
    async fn unconfigured_store_reports_connection_error() {
        let (_sender, receiver) = tokio::sync::watch::channel(None);
        let client = BackendClient::new(None, receiver).expect("client builds");
        let store = RestDataStore::new(client);

        let error = store.list_by_name().await.expect_err("unconfigured");
        assert!(matches!(error, DataStoreError::Connection { .. }));
    }
}
