// HTTP request handlers
use crate::domain::dashboard::Dashboard;
use crate::domain::record::{BandFilter, RecordFilter};
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    /// ISO date (YYYY-MM-DD). Kept as text so a malformed value degrades to
    /// "no data" instead of failing in the extractor.
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// Machine id, or "all" for no filter.
    pub machine: Option<String>,
    /// Client id, or "all" for no filter.
    pub client: Option<String>,
    #[serde(default)]
    pub efficiency: BandFilter,
    #[serde(default)]
    pub utilization: BandFilter,
}

fn parse_date(raw: Option<&str>) -> Result<Option<NaiveDate>, String> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| format!("invalid date filter {raw:?}")),
    }
}

impl DashboardQuery {
    /// "all" (and absence) means no filter. A machine or date value that
    /// parses to neither is a malformed filter.
    fn into_filter(self) -> Result<RecordFilter, String> {
        let start_date = parse_date(self.start_date.as_deref())?;
        let end_date = parse_date(self.end_date.as_deref())?;
        let machine = match self.machine.as_deref() {
            None | Some("all") => None,
            Some(raw) => Some(
                raw.parse::<i64>()
                    .map_err(|_| format!("invalid machine filter {raw:?}"))?,
            ),
        };
        let client = match self.client {
            None => None,
            Some(ref c) if c == "all" => None,
            Some(c) => Some(c),
        };
        Ok(RecordFilter {
            start_date,
            end_date,
            machine,
            client,
            efficiency_band: self.efficiency,
            utilization_band: self.utilization,
        })
    }
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Compute every widget's data for one filter combination. A malformed
/// filter degrades to the empty dashboard rather than a failed page.
pub async fn get_dashboard(
    Query(query): Query<DashboardQuery>,
    State(state): State<Arc<AppState>>,
) -> Json<Dashboard> {
    let filter = match query.into_filter() {
        Ok(filter) => filter,
        Err(reason) => {
            tracing::warn!(%reason, "rejecting malformed dashboard filter");
            return Json(Dashboard::empty());
        }
    };
    Json(state.dashboard_service.get_dashboard(&filter).await)
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub authenticated: bool,
    pub username: String,
    pub is_admin: bool,
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> impl IntoResponse {
    match state
        .account_service
        .authenticate(&request.email, &request.password)
    {
        Ok(Some(user)) => (
            StatusCode::OK,
            Json(LoginResponse {
                authenticated: true,
                username: user.username,
                is_admin: user.is_admin,
            }),
        )
            .into_response(),
        Ok(None) => StatusCode::UNAUTHORIZED.into_response(),
        Err(e) => {
            tracing::error!(error = %e, "account store unavailable during login");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Account representation for the settings screen; hashes stay in the store.
#[derive(Debug, Serialize)]
pub struct UserView {
    pub id: String,
    pub username: String,
    pub email: String,
    pub is_admin: bool,
}

pub async fn list_users(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.account_service.list() {
        Ok(accounts) => {
            let users: Vec<UserView> = accounts
                .into_iter()
                .map(|(id, a)| UserView {
                    id,
                    username: a.username,
                    email: a.email,
                    is_admin: a.is_admin,
                })
                .collect();
            Json(users).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to list accounts");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NewUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub is_admin: bool,
}

pub async fn add_user(
    State(state): State<Arc<AppState>>,
    Json(request): Json<NewUserRequest>,
) -> impl IntoResponse {
    match state.account_service.add(
        &request.username,
        &request.email,
        &request.password,
        request.is_admin,
    ) {
        Ok(Some(id)) => (StatusCode::CREATED, Json(serde_json::json!({ "id": id }))).into_response(),
        Ok(None) => StatusCode::CONFLICT.into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to add account");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct EditUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub is_admin: Option<bool>,
}

pub async fn edit_user(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(request): Json<EditUserRequest>,
) -> impl IntoResponse {
    match state.account_service.edit(
        &id,
        request.username.as_deref(),
        request.email.as_deref(),
        request.password.as_deref(),
        request.is_admin,
    ) {
        Ok(true) => StatusCode::OK.into_response(),
        Ok(false) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to edit account");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn delete_user(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    match state.account_service.remove(&id) {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to delete account");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(machine: Option<&str>, client: Option<&str>) -> DashboardQuery {
        DashboardQuery {
            start_date: None,
            end_date: None,
            machine: machine.map(str::to_string),
            client: client.map(str::to_string),
            efficiency: BandFilter::All,
            utilization: BandFilter::All,
        }
    }

    #[test]
    fn test_all_and_absent_are_equivalent() {
        let a = query(Some("all"), Some("all")).into_filter().unwrap();
        let b = query(None, None).into_filter().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.machine, None);
        assert_eq!(a.client, None);
    }

    #[test]
    fn test_machine_id_parses() {
        let filter = query(Some("2"), None).into_filter().unwrap();
        assert_eq!(filter.machine, Some(2));
    }

    #[test]
    fn test_malformed_machine_is_rejected() {
        assert!(query(Some("two"), None).into_filter().is_err());
    }

    #[test]
    fn test_dates_parse_leniently() {
        let mut q = query(None, None);
        q.start_date = Some("2024-01-01".to_string());
        q.end_date = Some("".to_string());
        let filter = q.into_filter().unwrap();
        assert_eq!(filter.start_date, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(filter.end_date, None);
    }

    #[test]
    fn test_malformed_date_is_rejected_not_a_panic() {
        let mut q = query(None, None);
        q.start_date = Some("01/02/2024".to_string());
        assert!(q.into_filter().is_err());

        let mut q = query(None, None);
        q.end_date = Some("yesterday".to_string());
        assert!(q.into_filter().is_err());
    }
}
