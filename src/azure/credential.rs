//! Service principal credentials.
//!
//! [`AuthContext::new`] validates the tenant/client/secret triple locally and
//! wraps an `azure_identity` client-secret credential. No token is requested
//! until the first control-plane call.

use crate::error::{Error, Result};
use async_trait::async_trait;
use azure_core::auth::TokenCredential;
use azure_core::Url;
use azure_identity::{ClientSecretCredential, TokenCredentialOptions};
use regex::Regex;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Scope for Azure Resource Manager tokens.
pub const ARM_SCOPE: &str = "https://management.azure.com/.default";

pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

static GUID_REGEX: OnceLock<Regex> = OnceLock::new();
static DOMAIN_REGEX: OnceLock<Regex> = OnceLock::new();

pub(crate) fn is_guid(value: &str) -> bool {
    GUID_REGEX
        .get_or_init(|| {
            Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
                .expect("Invalid Regex")
        })
        .is_match(value)
}

fn is_domain(value: &str) -> bool {
    DOMAIN_REGEX
        .get_or_init(|| {
            Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?(\.[A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?)+$")
                .expect("Invalid Regex")
        })
        .is_match(value)
}

/// Source of bearer tokens for the control plane.
#[async_trait]
pub trait TokenSource: Send + Sync + fmt::Debug {
    async fn bearer_token(&self) -> Result<String>;
}

/// Validated service principal credential, shared read-only by every client
/// built from it.
#[derive(Clone)]
pub struct AuthContext {
    tenant_id: String,
    client_id: String,
    authority_host: Url,
    credential: Arc<ClientSecretCredential>,
}

impl AuthContext {
    /// Build a credential using the public cloud authority.
    pub fn new(tenant_id: &str, client_id: &str, client_secret: &str) -> Result<Self> {
        Self::with_authority(tenant_id, client_id, client_secret, DEFAULT_AUTHORITY_HOST)
    }

    /// # Returns
    /// * `Ok(AuthContext)` - The triple is well formed
    /// * `Err(Error::Authentication)` - A field is empty or malformed
    pub fn with_authority(
        tenant_id: &str,
        client_id: &str,
        client_secret: &str,
        authority_host: &str,
    ) -> Result<Self> {
        let tenant_id = tenant_id.trim();
        let client_id = client_id.trim();
        if tenant_id.is_empty() || client_id.is_empty() || client_secret.is_empty() {
            return Err(Error::Authentication(
                "tenant id, client id and client secret are all required".to_string(),
            ));
        }
        if !is_guid(tenant_id) && !is_domain(tenant_id) {
            return Err(Error::Authentication(format!(
                "tenant id '{tenant_id}' is neither a GUID nor a domain name"
            )));
        }
        if !is_guid(client_id) {
            return Err(Error::Authentication(format!(
                "client id '{client_id}' is not a GUID"
            )));
        }
        if client_secret.trim() != client_secret
            || client_secret.contains(|c: char| c == '\n' || c == '\r')
        {
            return Err(Error::Authentication(
                "client secret contains leading/trailing whitespace or line breaks".to_string(),
            ));
        }
        let authority = Url::parse(authority_host).map_err(|e| {
            Error::Authentication(format!("invalid authority host '{authority_host}': {e}"))
        })?;

        let mut options = TokenCredentialOptions::default();
        options.set_authority_host(authority.clone());
        let credential = ClientSecretCredential::new(
            azure_core::new_http_client(),
            tenant_id.to_string(),
            client_id.to_string(),
            client_secret.to_string(),
            options,
        );
        log::debug!("created client secret credential for client {client_id} in tenant {tenant_id}");

        Ok(AuthContext {
            tenant_id: tenant_id.to_string(),
            client_id: client_id.to_string(),
            authority_host: authority,
            credential: Arc::new(credential),
        })
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Authority the credential requests tokens from.
    pub fn authority_host(&self) -> &Url {
        &self.authority_host
    }
}

impl fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthContext")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("authority_host", &self.authority_host.as_str())
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl TokenSource for AuthContext {
    async fn bearer_token(&self) -> Result<String> {
        let token = self
            .credential
            .get_token(&[ARM_SCOPE])
            .await
            .map_err(|e| {
                Error::Authentication(format!(
                    "token request for client {} in tenant {} failed: {e}",
                    self.client_id, self.tenant_id
                ))
            })?;
        Ok(token.token.secret().to_string())
    }
}

/// A pre-acquired bearer token, e.g. from `az account get-access-token`.
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        StaticToken(token.into())
    }
}

impl fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StaticToken(<redacted>)")
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn bearer_token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}
