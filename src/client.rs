//! IdeaScanner backend client
//!
//! Thin typed wrapper over the fixed REST contract. Stateless apart from the
//! session token, which lives in the [`StorageAdapter`] and is attached as a
//! bearer header to every protected call.

use crate::error::{map_status_to_error_code, Result, ScannerError};
use crate::storage::{keys, MemoryStorage, StorageAdapter};
use crate::types::*;
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Default IdeaScanner API URL
pub const DEFAULT_BASE_URL: &str = "https://api.ideascanner.app";

/// Configuration options for the client
#[derive(Clone, Default)]
pub struct ScannerOptions {
    /// Backend URL (default: [`DEFAULT_BASE_URL`])
    pub base_url: Option<String>,
    /// Custom storage adapter (default: `MemoryStorage`)
    pub storage: Option<Arc<dyn StorageAdapter>>,
}

impl std::fmt::Debug for ScannerOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScannerOptions")
            .field("base_url", &self.base_url)
            .field("storage", &"<storage>")
            .finish()
    }
}

/// The slice of the backend that purchase reconciliation needs.
///
/// Kept narrow so tests can drive the reconciler with a scripted fake instead
/// of a live backend.
#[async_trait]
pub trait CreditsGateway: Send + Sync {
    /// Submit a purchase token for verification and credit grant.
    ///
    /// The backend dedupes by purchase token, so resubmitting the same token
    /// is safe and never double-grants.
    async fn add_credits(&self, req: &AddCreditsRequest) -> Result<CreditBalance>;

    /// Whether a session token is currently stored.
    fn is_authenticated(&self) -> bool;
}

/// IdeaScanner API client.
///
/// # Example
/// ```rust,ignore
/// use ideascanner_sdk::{IdeaScanner, ScannerOptions, AnalyzeOutcome};
///
/// let scanner = IdeaScanner::new(ScannerOptions::default())?;
/// scanner.login("me@example.com", "hunter22").await?;
///
/// match scanner.analyze("A subscription box for rare houseplants", None).await? {
///     AnalyzeOutcome::Scored(a) => println!("Score: {:?}\n\n{}", a.score, a.analysis),
///     AnalyzeOutcome::PaymentRequired => println!("Out of credits - offer a purchase"),
/// }
/// ```
pub struct IdeaScanner {
    base_url: String,
    storage: Arc<dyn StorageAdapter>,
    http: HttpClient,
}

impl IdeaScanner {
    pub fn new(options: ScannerOptions) -> Result<Self> {
        let base_url = options
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let storage: Arc<dyn StorageAdapter> = options
            .storage
            .unwrap_or_else(|| Arc::new(MemoryStorage::new()));

        let http = HttpClient::builder()
            .user_agent("ideascanner-sdk-rust/0.1.0")
            .build()
            .map_err(|e| ScannerError::network(e.to_string()))?;

        Ok(Self {
            base_url,
            storage,
            http,
        })
    }

    // ==================== Auth ====================

    /// Register a new account. Stores the session token on success.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        location: Option<&str>,
    ) -> Result<AuthResult> {
        validate_email(email)?;
        validate_password(password)?;

        #[derive(Serialize)]
        struct RegisterRequest<'a> {
            email: &'a str,
            password: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            location: Option<&'a str>,
        }

        let body = RegisterRequest {
            email,
            password,
            location,
        };

        let response: AuthResponse = self.post("/api/register", &body).await?;
        self.store_session(response)
    }

    /// Log in with email and password. Stores the session token on success.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResult> {
        validate_email(email)?;
        validate_password(password)?;

        #[derive(Serialize)]
        struct LoginRequest<'a> {
            email: &'a str,
            password: &'a str,
        }

        let body = LoginRequest { email, password };

        let response: AuthResponse = self.post("/api/login", &body).await?;
        self.store_session(response)
    }

    /// Log in (or register) with a Google account. The backend links the
    /// Google id to an existing account by email, or creates one.
    pub async fn google_login(
        &self,
        email: &str,
        google_id: &str,
        location: Option<&str>,
    ) -> Result<AuthResult> {
        validate_email(email)?;
        if google_id.is_empty() {
            return Err(ScannerError::validation("google_id is required"));
        }

        #[derive(Serialize)]
        struct GoogleLoginRequest<'a> {
            email: &'a str,
            google_id: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            location: Option<&'a str>,
        }

        let body = GoogleLoginRequest {
            email,
            google_id,
            location,
        };

        let response: AuthResponse = self.post("/api/google_login", &body).await?;
        self.store_session(response)
    }

    // ==================== Analysis ====================

    /// Submit an idea for analysis.
    ///
    /// An HTTP 402 from the backend means the free quota and credits are
    /// exhausted; it is returned as [`AnalyzeOutcome::PaymentRequired`], never
    /// as an error, so the caller can route straight to the purchase flow.
    pub async fn analyze(&self, idea: &str, location: Option<&str>) -> Result<AnalyzeOutcome> {
        if idea.trim().is_empty() {
            return Err(ScannerError::validation("idea text is required"));
        }
        let token = self.require_token()?;

        #[derive(Serialize)]
        struct AnalyzeRequest<'a> {
            idea: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            location: Option<&'a str>,
        }

        let body = AnalyzeRequest { idea, location };

        let result = self
            .post_with_auth::<AnalyzeResponse, _>("/api/analyze", &body, &token)
            .await;
        analyze_outcome(result)
    }

    /// Fetch previously analyzed ideas, newest first.
    pub async fn history(&self) -> Result<Vec<HistoryEntry>> {
        let token = self.require_token()?;
        let response: HistoryResponse = self.get_with_auth("/api/history", &token).await?;
        Ok(response.ideas)
    }

    // ==================== Credits ====================

    /// Forward a purchase token to the backend for verification and credit
    /// grant. Prefer driving this through the reconciler, which owns the
    /// acknowledge-before-verify ordering.
    pub async fn add_credits(&self, req: &AddCreditsRequest) -> Result<CreditBalance> {
        let token = self.require_token()?;
        let response: AddCreditsResponse = self
            .post_with_auth("/api/add_credits", req, &token)
            .await?;
        Ok(response.into())
    }

    // ==================== Session ====================

    /// Get the stored session token.
    pub fn token(&self) -> Option<String> {
        self.storage.get(keys::TOKEN)
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    /// Clear the stored session token.
    pub fn logout(&self) {
        self.storage.remove(keys::TOKEN);
    }

    fn require_token(&self) -> Result<String> {
        self.token().ok_or_else(ScannerError::no_token)
    }

    fn store_session(&self, response: AuthResponse) -> Result<AuthResult> {
        let token = response.access_token.ok_or_else(|| {
            ScannerError::network("Backend returned success without an access token")
        })?;
        self.storage.set(keys::TOKEN, &token);
        Ok(AuthResult {
            token,
            user: response.user,
        })
    }

    // ==================== Internal helpers ====================

    async fn post<T: for<'de> Deserialize<'de>, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| ScannerError::network(e.to_string()))?;

        self.handle_response(response).await
    }

    async fn post_with_auth<T: for<'de> Deserialize<'de>, B: Serialize>(
        &self,
        path: &str,
        body: &B,
        token: &str,
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", token))
            .json(body)
            .send()
            .await
            .map_err(|e| ScannerError::network(e.to_string()))?;

        self.handle_response(response).await
    }

    async fn get_with_auth<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        token: &str,
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .http
            .get(&url)
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await
            .map_err(|e| ScannerError::network(e.to_string()))?;

        self.handle_response(response).await
    }

    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status().as_u16();

        if !response.status().is_success() {
            #[derive(Deserialize)]
            struct ErrorResponse {
                error: Option<String>,
                message: Option<String>,
                details: Option<String>,
            }

            let error_body: ErrorResponse = response.json().await.unwrap_or(ErrorResponse {
                error: None,
                message: None,
                details: None,
            });

            let message = error_body
                .message
                .or(error_body.details)
                .or(error_body.error)
                .unwrap_or_else(|| format!("Request failed: {}", status));

            tracing::warn!(status, %message, "backend request failed");
            return Err(ScannerError::with_status(
                map_status_to_error_code(status),
                message,
                status,
            ));
        }

        response
            .json()
            .await
            .map_err(|e| ScannerError::network(e.to_string()))
    }
}

impl std::fmt::Debug for IdeaScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdeaScanner")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

#[async_trait]
impl CreditsGateway for IdeaScanner {
    async fn add_credits(&self, req: &AddCreditsRequest) -> Result<CreditBalance> {
        IdeaScanner::add_credits(self, req).await
    }

    fn is_authenticated(&self) -> bool {
        IdeaScanner::is_authenticated(self)
    }
}

/// Fold a 402 into the success type. Any other error passes through.
pub(crate) fn analyze_outcome(
    result: Result<AnalyzeResponse>,
) -> Result<AnalyzeOutcome> {
    match result {
        Ok(response) => Ok(AnalyzeOutcome::Scored(response.into())),
        Err(e) if e.is_payment_required() => Ok(AnalyzeOutcome::PaymentRequired),
        Err(e) => Err(e),
    }
}

fn validate_email(email: &str) -> Result<()> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(ScannerError::validation("Invalid email address"))
    }
}

fn validate_password(password: &str) -> Result<()> {
    if password.len() >= 6 {
        Ok(())
    } else {
        Err(ScannerError::validation(
            "Password must be at least 6 characters",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_email_validation() {
        assert!(validate_email("me@example.com").is_ok());
        assert!(validate_email("a@b.co").is_ok());
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("me@nodomain").is_err());
    }

    #[test]
    fn test_password_validation() {
        assert!(validate_password("hunter22").is_ok());
        assert!(validate_password("short").is_err());
    }

    #[test]
    fn test_analyze_402_routes_to_payment_required() {
        // Whatever the body said, a 402 must become PaymentRequired.
        for body in ["payment_required", "", "No free uses or credits left"] {
            let err = ScannerError::with_status(map_status_to_error_code(402), body, 402);
            let outcome = analyze_outcome(Err(err)).unwrap();
            assert_eq!(outcome, AnalyzeOutcome::PaymentRequired);
        }
    }

    #[test]
    fn test_analyze_other_errors_pass_through() {
        let err = ScannerError::with_status(ErrorCode::Server, "boom", 500);
        let result = analyze_outcome(Err(err));
        assert_eq!(result.unwrap_err().code(), ErrorCode::Server);
    }

    #[test]
    fn test_analyze_success_maps_to_scored() {
        let wire: AnalyzeResponse = serde_json::from_str(
            r#"{"ok":true,"analysis":"Viable.","score":78,"free_uses":0,"credits":9}"#,
        )
        .unwrap();
        match analyze_outcome(Ok(wire)).unwrap() {
            AnalyzeOutcome::Scored(a) => {
                assert_eq!(a.score, Some(78));
                assert_eq!(a.analysis, "Viable.");
            }
            other => panic!("expected Scored, got {:?}", other),
        }
    }

    #[test]
    fn test_token_lifecycle() {
        let scanner = IdeaScanner::new(ScannerOptions::default()).unwrap();
        assert!(!scanner.is_authenticated());

        scanner.storage.set(keys::TOKEN, "jwt-1");
        assert!(scanner.is_authenticated());
        assert_eq!(scanner.token().as_deref(), Some("jwt-1"));

        scanner.logout();
        assert!(!scanner.is_authenticated());
        assert_eq!(
            scanner.require_token().unwrap_err().code(),
            ErrorCode::NoToken
        );
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let scanner = IdeaScanner::new(ScannerOptions {
            base_url: Some("https://example.com/".into()),
            storage: None,
        })
        .unwrap();
        assert_eq!(scanner.base_url, "https://example.com");
    }
}
