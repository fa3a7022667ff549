// src/middleware/entitlement.rs
//
// Plan gating. Placed before the permission guard in handler signatures so a
// business on the wrong plan is told to upgrade, whatever the caller's role.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use std::marker::PhantomData;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, tenancy::caller_business},
    models::business::Plan,
};

/// A paid capability and the cheapest plan that includes it.
pub trait Feature: Send + Sync + 'static {
    fn name() -> &'static str;
    fn minimum_plan() -> Plan;
}

pub struct FeatureCustomRoles;
impl Feature for FeatureCustomRoles {
    fn name() -> &'static str { "custom roles" }
    fn minimum_plan() -> Plan { Plan::Pro }
}

pub fn plan_includes<F: Feature>(plan: Plan) -> bool {
    plan >= F::minimum_plan()
}

pub struct RequireFeature<F>(pub PhantomData<F>);

impl<F, S> FromRequestParts<S> for RequireFeature<F>
where
    F: Feature,
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        let user = parts
            .extensions
            .get::<AuthenticatedUser>()
            .ok_or_else(ApiError::unauthorized)?;
        let business_id = caller_business(&user.0)?;

        let plan = app_state
            .businesses
            .find_by_id(business_id)
            .await?
            .map(|b| b.plan)
            .unwrap_or(Plan::Free);

        if !plan_includes::<F>(plan) {
            tracing::debug!(%business_id, feature = F::name(), ?plan, "Feature not in plan");
            return Err(AppError::PlanUpgradeRequired(F::name()).into());
        }

        Ok(RequireFeature(PhantomData))
    }
}
