use rand::distributions::Alphanumeric;
use rand::Rng;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::model::{ApiTokenId, UnixTimeMs};

pub const TOKEN_PREFIX: &str = "tk_";
pub const TOKEN_SECRET_LEN: usize = 32;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiTokenError {
    #[error("token name cannot be empty")]
    EmptyName,
    #[error("no token with id {0}")]
    NotFound(ApiTokenId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiToken {
    pub id: ApiTokenId,
    pub name: String,
    pub token: TokenSecret,
    pub created_at: UnixTimeMs,
    pub last_used: Option<UnixTimeMs>,
}

/// Token text, redacted in `Debug` output.
#[derive(Debug)]
pub struct TokenSecret(SecretString);

impl TokenSecret {
    #[must_use]
    pub fn new(secret: String) -> Self {
        Self(SecretString::new(secret))
    }

    #[must_use]
    pub fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }
}

impl Clone for TokenSecret {
    fn clone(&self) -> Self {
        Self::new(self.expose_secret().to_string())
    }
}

impl PartialEq for TokenSecret {
    fn eq(&self, other: &Self) -> bool {
        self.expose_secret() == other.expose_secret()
    }
}

impl Eq for TokenSecret {}

// Stored and shown to the user in full, so serialization exposes it.
impl Serialize for TokenSecret {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.expose_secret())
    }
}

impl<'de> Deserialize<'de> for TokenSecret {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        SecretString::deserialize(deserializer).map(Self)
    }
}

/// `tk_` followed by random ASCII alphanumerics.
pub fn generate_secret<R: Rng + ?Sized>(rng: &mut R) -> TokenSecret {
    let mut secret = String::with_capacity(TOKEN_PREFIX.len() + TOKEN_SECRET_LEN);
    secret.push_str(TOKEN_PREFIX);
    secret.extend(
        rng.sample_iter(Alphanumeric)
            .take(TOKEN_SECRET_LEN)
            .map(char::from),
    );
    TokenSecret::new(secret)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiTokenRegistry {
    tokens: Vec<ApiToken>,
}

impl ApiTokenRegistry {
    pub fn create<R: Rng + ?Sized>(
        &mut self,
        name: &str,
        rng: &mut R,
        now: UnixTimeMs,
    ) -> Result<&ApiToken, ApiTokenError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ApiTokenError::EmptyName);
        }

        let token = ApiToken {
            id: ApiTokenId::generate(),
            name: name.to_string(),
            token: generate_secret(rng),
            created_at: now,
            last_used: None,
        };
        tracing::info!(id = %token.id, "api token created");
        self.tokens.push(token);
        let last = self.tokens.len() - 1;
        Ok(&self.tokens[last])
    }

    pub fn delete(&mut self, id: &ApiTokenId) -> Result<ApiToken, ApiTokenError> {
        let index = self
            .tokens
            .iter()
            .position(|t| &t.id == id)
            .ok_or_else(|| ApiTokenError::NotFound(id.clone()))?;
        Ok(self.tokens.remove(index))
    }

    pub fn mark_used(&mut self, id: &ApiTokenId, now: UnixTimeMs) -> Result<(), ApiTokenError> {
        let token = self
            .tokens
            .iter_mut()
            .find(|t| &t.id == id)
            .ok_or_else(|| ApiTokenError::NotFound(id.clone()))?;
        token.last_used = Some(now);
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ApiToken> {
        self.tokens.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_secret_format() {
        let mut rng = StdRng::seed_from_u64(1);
        let secret = generate_secret(&mut rng);
        let secret = secret.expose_secret();
        assert!(secret.starts_with("tk_"));
        assert_eq!(secret.len(), 35);
        assert!(secret[3..].chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_create_trims_and_appends() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut registry = ApiTokenRegistry::default();
        registry.create("first", &mut rng, UnixTimeMs(10)).unwrap();
        let second = registry.create("  second ", &mut rng, UnixTimeMs(20)).unwrap();
        assert_eq!(second.name, "second");
        assert_eq!(second.last_used, None);

        let names: Vec<_> = registry.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["first", "second"]);
    }

    #[test]
    fn test_debug_output_hides_secret() {
        let mut rng = StdRng::seed_from_u64(6);
        let mut registry = ApiTokenRegistry::default();
        let token = registry.create("ci", &mut rng, UnixTimeMs(1)).unwrap().clone();

        let rendered = format!("{token:?} {registry:?}");
        assert!(!rendered.contains(token.token.expose_secret()));
        assert!(rendered.contains("ci"));
    }

    #[test]
    fn test_create_rejects_blank_name() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut registry = ApiTokenRegistry::default();
        assert_eq!(
            registry.create("   ", &mut rng, UnixTimeMs(0)).unwrap_err(),
            ApiTokenError::EmptyName
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn test_delete_and_mark_used() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut registry = ApiTokenRegistry::default();
        let id = registry.create("ci", &mut rng, UnixTimeMs(1)).unwrap().id.clone();

        registry.mark_used(&id, UnixTimeMs(99)).unwrap();
        assert_eq!(registry.iter().next().unwrap().last_used, Some(UnixTimeMs(99)));

        let removed = registry.delete(&id).unwrap();
        assert_eq!(removed.id, id);
        assert!(matches!(registry.delete(&id), Err(ApiTokenError::NotFound(_))));
        assert!(registry.mark_used(&id, UnixTimeMs(100)).is_err());
    }

    #[test]
    fn test_serialized_field_names() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut registry = ApiTokenRegistry::default();
        registry.create("web", &mut rng, UnixTimeMs(5)).unwrap();
        let json = serde_json::to_value(&registry).unwrap();
        assert_eq!(json[0]["createdAt"], "1970-01-01T00:00:00.005Z");
        assert!(json[0]["lastUsed"].is_null());
        let token = registry.iter().next().unwrap();
        assert_eq!(json[0]["token"], token.token.expose_secret());
    }
}
