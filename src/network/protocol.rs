//! HTTP Protocol
//!
//! Request parsing and response encoding for the game API.
//!
//! ```text
//!   GET /enter?telegram_id=<u64>
//!   GET /click?telegram_id=<u64>&product_id=<u64>   (or card_id)
//!   GET /buy?telegram_id=<u64>&product_id=<u64>     (or card_id)
//!   GET /reset?telegram_id=<u64>
//! ```
//!
//! Success is 200 with the game view as JSON. Failures carry
//! `{"error": "<message>"}`.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Response, StatusCode};
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::error;

use crate::game::actions::ActionError;
use crate::game::model::{AccountKey, ItemId};

/// Response type produced by every handler.
pub type HttpResponse = Response<Full<Bytes>>;

/// Query parameter carrying the account key.
pub const ACCOUNT_PARAM: &str = "telegram_id";

/// Query parameters carrying the item key, in lookup order.
pub const ITEM_PARAMS: [&str; 2] = ["product_id", "card_id"];

// =============================================================================
// REQUESTS
// =============================================================================

/// A parsed API request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiRequest {
    /// Log in or create the account.
    Enter {
        /// Account key.
        account_key: AccountKey,
    },
    /// Click an item.
    Click {
        /// Account key.
        account_key: AccountKey,
        /// Item key.
        item_id: ItemId,
    },
    /// Buy the next level of an item.
    Buy {
        /// Account key.
        account_key: AccountKey,
        /// Item key.
        item_id: ItemId,
    },
    /// Prestige reset.
    Reset {
        /// Account key.
        account_key: AccountKey,
    },
}

impl ApiRequest {
    /// Account the request acts on.
    pub fn account_key(&self) -> AccountKey {
        match *self {
            ApiRequest::Enter { account_key }
            | ApiRequest::Click { account_key, .. }
            | ApiRequest::Buy { account_key, .. }
            | ApiRequest::Reset { account_key } => account_key,
        }
    }

    /// Route name, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            ApiRequest::Enter { .. } => "enter",
            ApiRequest::Click { .. } => "click",
            ApiRequest::Buy { .. } => "buy",
            ApiRequest::Reset { .. } => "reset",
        }
    }
}

/// Request rejected before reaching the game.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// Identifier missing, zero, or not an unsigned integer.
    #[error("{0} is required")]
    MissingParameter(&'static str),
}

/// Whether `path` is one of the API routes.
pub fn is_api_path(path: &str) -> bool {
    matches!(path, "/enter" | "/click" | "/buy" | "/reset")
}

/// Decode a query string into key/value pairs. Later duplicates win.
pub fn parse_query(query: Option<&str>) -> HashMap<String, String> {
    let Some(query) = query else {
        return HashMap::new();
    };

    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (
                percent_decode_str(key).decode_utf8_lossy().into_owned(),
                percent_decode_str(value).decode_utf8_lossy().into_owned(),
            )
        })
        .collect()
}

/// Positive integer identifier under any of `names`.
///
/// The first name with a valid value wins. On failure the error names the
/// first alias the caller sent, or `names[0]` when none was sent.
fn id_param(params: &HashMap<String, String>, names: &[&'static str]) -> Result<u64, RequestError> {
    let valid = names.iter().find_map(|name| {
        params
            .get(*name)
            .and_then(|value| value.trim().parse::<u64>().ok())
            .filter(|id| *id > 0)
    });
    if let Some(id) = valid {
        return Ok(id);
    }

    let sent = names
        .iter()
        .copied()
        .find(|name| params.contains_key(*name))
        .unwrap_or(names[0]);
    Err(RequestError::MissingParameter(sent))
}

/// Parse an API request. Returns `None` for paths that are not API routes.
pub fn parse_request(path: &str, query: Option<&str>) -> Option<Result<ApiRequest, RequestError>> {
    if !is_api_path(path) {
        return None;
    }
    Some(build_request(path, &parse_query(query)))
}

fn build_request(path: &str, params: &HashMap<String, String>) -> Result<ApiRequest, RequestError> {
    let account_key = id_param(params, &[ACCOUNT_PARAM])?;
    Ok(match path {
        "/enter" => ApiRequest::Enter { account_key },
        "/reset" => ApiRequest::Reset { account_key },
        "/click" => ApiRequest::Click {
            account_key,
            item_id: id_param(params, &ITEM_PARAMS)?,
        },
        _ => ApiRequest::Buy {
            account_key,
            item_id: id_param(params, &ITEM_PARAMS)?,
        },
    })
}

// =============================================================================
// RESPONSES
// =============================================================================

/// JSON error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable message.
    pub error: String,
}

/// Response with `body` and an explicit content type.
pub fn response(status: StatusCode, content_type: HeaderValue, body: impl Into<Bytes>) -> HttpResponse {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response.headers_mut().insert(CONTENT_TYPE, content_type);
    response
}

/// Serialize `value` as a JSON response.
pub fn json_response<T: Serialize>(status: StatusCode, value: &T) -> HttpResponse {
    match serde_json::to_vec(value) {
        Ok(body) => response(status, HeaderValue::from_static("application/json"), body),
        Err(e) => {
            error!("failed to encode response: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to encode response")
        }
    }
}

/// `{"error": message}` with `status`.
pub fn error_response(status: StatusCode, message: &str) -> HttpResponse {
    let body = serde_json::json!({ "error": message }).to_string();
    response(status, HeaderValue::from_static("application/json"), body)
}

/// Status an action failure maps to.
pub fn action_status(err: &ActionError) -> StatusCode {
    if err.is_validation() {
        StatusCode::BAD_REQUEST
    } else if err.is_not_found() {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageError;

    #[test]
    fn test_parse_query() {
        let params = parse_query(Some("telegram_id=42&name=a%20b&flag"));
        assert_eq!(params["telegram_id"], "42");
        assert_eq!(params["name"], "a b");
        assert_eq!(params["flag"], "");
        assert!(parse_query(None).is_empty());
    }

    #[test]
    fn test_parse_enter() {
        let request = parse_request("/enter", Some("telegram_id=42")).unwrap().unwrap();
        assert_eq!(request, ApiRequest::Enter { account_key: 42 });
        assert_eq!(request.account_key(), 42);
        assert_eq!(request.name(), "enter");
    }

    #[test]
    fn test_parse_item_aliases() {
        let click = parse_request("/click", Some("telegram_id=1&product_id=3")).unwrap();
        assert_eq!(click, Ok(ApiRequest::Click { account_key: 1, item_id: 3 }));

        let buy = parse_request("/buy", Some("card_id=4&telegram_id=1")).unwrap();
        assert_eq!(buy, Ok(ApiRequest::Buy { account_key: 1, item_id: 4 }));
    }

    #[test]
    fn test_invalid_alias_falls_through() {
        let click = parse_request("/click", Some("telegram_id=1&product_id=abc&card_id=3")).unwrap();
        assert_eq!(click, Ok(ApiRequest::Click { account_key: 1, item_id: 3 }));

        let buy = parse_request("/buy", Some("telegram_id=1&product_id=0&card_id=5")).unwrap();
        assert_eq!(buy, Ok(ApiRequest::Buy { account_key: 1, item_id: 5 }));
    }

    #[test]
    fn test_error_names_sent_alias() {
        assert_eq!(
            parse_request("/buy", Some("telegram_id=1&card_id=x")).unwrap(),
            Err(RequestError::MissingParameter("card_id"))
        );
        assert_eq!(
            parse_request("/click", Some("telegram_id=1")).unwrap(),
            Err(RequestError::MissingParameter("product_id"))
        );
    }

    #[test]
    fn test_missing_or_zero_ids() {
        assert_eq!(
            parse_request("/enter", None).unwrap(),
            Err(RequestError::MissingParameter("telegram_id"))
        );
        assert_eq!(
            parse_request("/reset", Some("telegram_id=0")).unwrap(),
            Err(RequestError::MissingParameter("telegram_id"))
        );
        assert_eq!(
            parse_request("/click", Some("telegram_id=1&product_id=x")).unwrap(),
            Err(RequestError::MissingParameter("product_id"))
        );
        assert_eq!(
            parse_request("/buy", Some("telegram_id=-3&product_id=1")).unwrap(),
            Err(RequestError::MissingParameter("telegram_id"))
        );
        assert_eq!(
            RequestError::MissingParameter("telegram_id").to_string(),
            "telegram_id is required"
        );
    }

    #[test]
    fn test_non_api_path() {
        assert!(parse_request("/", None).is_none());
        assert!(parse_request("/index.html", Some("telegram_id=1")).is_none());
    }

    #[test]
    fn test_action_status() {
        let insufficient = ActionError::InsufficientCoins { price: 10, balance: 9 };
        assert_eq!(action_status(&insufficient), StatusCode::BAD_REQUEST);
        assert_eq!(
            action_status(&ActionError::CooldownActive { next_click: 5 }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(action_status(&ActionError::UnknownItem(9)), StatusCode::NOT_FOUND);
        assert_eq!(
            action_status(&ActionError::Storage(StorageError::Database("disk".into()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_response_body() {
        let response = error_response(StatusCode::BAD_REQUEST, "not enough coins");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
    }
}
