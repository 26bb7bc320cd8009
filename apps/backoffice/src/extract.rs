//! # Actor Extractor
//!
//! The upstream identity layer authenticates the user and forwards who they
//! are in two headers:
//!
//! ```text
//! x-actor-id:   u-7f3a
//! x-actor-role: seller        (admin | seller | delivery | collector)
//! ```
//!
//! Handlers take a [`CurrentActor`] argument and call
//! `actor.ensure(action, resource)?` before touching the store.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use aquaroute_core::{Actor, Role};

use crate::error::ApiError;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

/// The identified user making the request.
#[derive(Debug, Clone)]
pub struct CurrentActor(pub Actor);

impl std::ops::Deref for CurrentActor {
    type Target = Actor;

    fn deref(&self) -> &Actor {
        &self.0
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Result<&'a str, ApiError> {
    let value = parts
        .headers
        .get(name)
        .ok_or_else(|| ApiError::unauthenticated(format!("Missing {} header", name)))?;

    let value = value
        .to_str()
        .map_err(|_| ApiError::unauthenticated(format!("Unreadable {} header", name)))?
        .trim();

    if value.is_empty() {
        return Err(ApiError::unauthenticated(format!("Empty {} header", name)));
    }
    Ok(value)
}

impl<S> FromRequestParts<S> for CurrentActor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = header(parts, ACTOR_ID_HEADER)?;
        let role: Role = header(parts, ACTOR_ROLE_HEADER)?
            .parse()
            .map_err(|e: aquaroute_core::CoreError| ApiError::unauthenticated(e.to_string()))?;

        Ok(CurrentActor(Actor::new(id, role)))
    }
}
