// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 SwipesBlue

//! Credential extraction from inbound requests.
//!
//! Partners send keys in several shapes:
//!
//! ```text
//! Authorization: Bearer sb_live_...
//! Authorization: ApiKey sb_live_...
//! Authorization: sb_live_...
//! GET /v1/tiers?api_key=sb_live_...
//! ```
//!
//! Each shape is a [`CredentialStrategy`]; [`extract_api_key`] tries them in
//! order and returns the first match.

use axum::http::{header::AUTHORIZATION, request::Parts};

/// Name of the query-string fallback parameter.
pub const API_KEY_QUERY_PARAM: &str = "api_key";

const AUTH_SCHEMES: [&str; 2] = ["Bearer", "ApiKey"];

/// One way of locating an API key in a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialStrategy {
    /// `Authorization: Bearer <token>`
    BearerScheme,
    /// `Authorization: ApiKey <token>`
    ApiKeyScheme,
    /// `Authorization: <token>` with no recognized scheme
    RawHeader,
    /// `?api_key=<token>`, only consulted when no Authorization header is sent,
    /// even a blank one
    QueryParam,
}

/// Strategies in the order they are tried.
pub const DEFAULT_STRATEGIES: [CredentialStrategy; 4] = [
    CredentialStrategy::BearerScheme,
    CredentialStrategy::ApiKeyScheme,
    CredentialStrategy::RawHeader,
    CredentialStrategy::QueryParam,
];

impl CredentialStrategy {
    /// Try this strategy against the request head.
    pub fn extract(&self, parts: &Parts) -> Option<String> {
        let header = authorization_header(parts);
        match self {
            CredentialStrategy::BearerScheme => header.and_then(|h| scheme_token(h, "Bearer")),
            CredentialStrategy::ApiKeyScheme => header.and_then(|h| scheme_token(h, "ApiKey")),
            CredentialStrategy::RawHeader => header
                .filter(|h| !h.is_empty() && !has_known_scheme(h))
                .map(str::to_string),
            CredentialStrategy::QueryParam => {
                if parts.headers.contains_key(AUTHORIZATION) {
                    return None;
                }
                query_param(parts.uri.query()?, API_KEY_QUERY_PARAM)
            }
        }
    }
}

/// Run [`DEFAULT_STRATEGIES`] in order.
pub fn extract_api_key(parts: &Parts) -> Option<String> {
    extract_with(&DEFAULT_STRATEGIES, parts)
}

pub fn extract_with(strategies: &[CredentialStrategy], parts: &Parts) -> Option<String> {
    strategies.iter().find_map(|strategy| strategy.extract(parts))
}

/// Authorization header value, if present and readable.
fn authorization_header(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
}

/// `"<scheme> <token>"` split on a single space into exactly two parts.
fn split_scheme(value: &str) -> Option<(&str, &str)> {
    let mut parts = value.split(' ');
    let scheme = parts.next()?;
    let token = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    Some((scheme, token))
}

fn scheme_token(value: &str, scheme: &str) -> Option<String> {
    split_scheme(value)
        .filter(|(s, token)| *s == scheme && !token.is_empty())
        .map(|(_, token)| token.to_string())
}

fn has_known_scheme(value: &str) -> bool {
    split_scheme(value)
        .map(|(scheme, _)| AUTH_SCHEMES.contains(&scheme))
        .unwrap_or(false)
}

fn query_param(query: &str, name: &str) -> Option<String> {
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}
