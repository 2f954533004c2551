use axum::{
    Json,
    extract::{Query, State},
};
use leadflow_services::views::CustomerView;
use serde::Deserialize;

use crate::{error::ApiError, extractors::auth::AuthUser, state::AppState};

#[derive(Debug, Deserialize)]
pub struct PhoneQuery {
    pub phone: String,
}

/// Lookup before submitting a lead, so an existing customer is reused.
pub async fn find_by_phone(
    State(state): State<AppState>,
    AuthUser(_ctx): AuthUser,
    Query(query): Query<PhoneQuery>,
) -> Result<Json<CustomerView>, ApiError> {
    let customer = state.engine.customers.find_by_phone(&query.phone).await?;
    Ok(Json(CustomerView::from_customer(&customer)))
}
