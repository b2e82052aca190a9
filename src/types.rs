//! Type definitions for the IdeaScanner SDK

use serde::{Deserialize, Serialize};

/// Basic profile info returned with every successful auth call.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserInfo {
    pub email: String,
    pub location: Option<String>,
}

/// Result of register / login / google-login.
///
/// The session token is also written to the credential store by the client,
/// so most callers only look at `user`.
#[derive(Debug, Clone)]
pub struct AuthResult {
    /// Backend-issued bearer token
    pub token: String,
    pub user: Option<UserInfo>,
}

/// API response for the auth endpoints
#[derive(Debug, Deserialize)]
pub(crate) struct AuthResponse {
    #[allow(dead_code)]
    pub ok: bool,
    pub access_token: Option<String>,
    pub user: Option<UserInfo>,
}

/// Outcome of an analyze call.
///
/// HTTP 402 is a business condition, not a failure: it becomes
/// `PaymentRequired` so the caller can offer a credit purchase instead of
/// showing an error.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalyzeOutcome {
    Scored(Analysis),
    /// Free quota and credits exhausted; prompt a purchase
    PaymentRequired,
}

/// A scored analysis of one idea.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    /// Viability score 0-100; absent when the model returned none
    pub score: Option<i64>,
    pub analysis: String,
    /// Remaining free-tier uses after this call
    pub free_uses: Option<i64>,
    /// Remaining purchased credits after this call
    pub credits: Option<i64>,
}

/// API response for the analyze endpoint
#[derive(Debug, Deserialize)]
pub(crate) struct AnalyzeResponse {
    #[allow(dead_code)]
    pub ok: bool,
    pub analysis: Option<String>,
    pub score: Option<i64>,
    pub free_uses: Option<i64>,
    pub credits: Option<i64>,
}

impl From<AnalyzeResponse> for Analysis {
    fn from(r: AnalyzeResponse) -> Self {
        Self {
            score: r.score,
            analysis: r.analysis.unwrap_or_default(),
            free_uses: r.free_uses,
            credits: r.credits,
        }
    }
}

/// One previously analyzed idea, newest first in `history()`.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub idea_text: String,
    pub analysis: Option<String>,
    pub score: Option<i64>,
    pub location: Option<String>,
    pub created_at: String,
}

/// API response for the history endpoint
#[derive(Debug, Deserialize)]
pub(crate) struct HistoryResponse {
    #[allow(dead_code)]
    pub ok: bool,
    pub ideas: Vec<HistoryEntry>,
}

/// Request body for the add-credits endpoint.
///
/// Field names match the backend contract (camelCase on the wire).
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AddCreditsRequest {
    pub package_name: String,
    pub product_id: String,
    pub purchase_token: String,
    pub credits_amount: i64,
}

/// Credit balance after a successful grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreditBalance {
    pub credits: i64,
}

/// API response for the add-credits endpoint
#[derive(Debug, Deserialize)]
pub(crate) struct AddCreditsResponse {
    #[allow(dead_code)]
    pub ok: bool,
    pub credits: i64,
}

impl From<AddCreditsResponse> for CreditBalance {
    fn from(r: AddCreditsResponse) -> Self {
        Self { credits: r.credits }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_credits_request_wire_names() {
        let req = AddCreditsRequest {
            package_name: "com.ideascanner".into(),
            product_id: "ideacredit_10".into(),
            purchase_token: "tok-1".into(),
            credits_amount: 10,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["packageName"], "com.ideascanner");
        assert_eq!(json["productId"], "ideacredit_10");
        assert_eq!(json["purchaseToken"], "tok-1");
        assert_eq!(json["creditsAmount"], 10);
    }

    #[test]
    fn test_analyze_response_conversion() {
        let wire: AnalyzeResponse = serde_json::from_str(
            r#"{"ok":true,"analysis":"Promising niche.","score":78,"free_uses":1,"credits":0}"#,
        )
        .unwrap();
        let analysis: Analysis = wire.into();
        assert_eq!(analysis.score, Some(78));
        assert_eq!(analysis.analysis, "Promising niche.");
        assert_eq!(analysis.free_uses, Some(1));
    }

    #[test]
    fn test_history_response_parses() {
        let wire: HistoryResponse = serde_json::from_str(
            r#"{"ok":true,"ideas":[{"id":3,"idea_text":"plant box","analysis":null,"score":null,"location":"US","created_at":"2024-05-01T10:00:00"}]}"#,
        )
        .unwrap();
        assert_eq!(wire.ideas.len(), 1);
        assert_eq!(wire.ideas[0].id, 3);
        assert!(wire.ideas[0].score.is_none());
    }
}
