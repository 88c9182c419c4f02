//! Operator token verification.
//!
//! Admin routes accept HS256 bearer tokens minted by the operator identity
//! service. This server holds the shared secret and only verifies them.

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

/// Clock skew tolerated on `exp`, in seconds.
const DEFAULT_LEEWAY_SECS: u64 = 60;

/// Claims carried by an operator token.
#[derive(Debug, Clone, Deserialize)]
pub struct OperatorClaims {
    /// Operator identifier assigned by the identity service.
    pub sub: String,
    /// Role name, e.g. `"admin"`.
    pub role: String,
    pub exp: i64,
    #[serde(default)]
    pub iss: Option<String>,
}

/// Verification settings for operator tokens.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Shared HMAC secret.
    pub secret: String,
    /// Required `iss` claim. Unchecked when `None`.
    pub issuer: Option<String>,
    pub leeway_secs: u64,
}

impl JwtConfig {
    /// | Env Var           | Required | Default |
    /// |-------------------|----------|---------|
    /// | `JWT_SECRET`      | **yes**  | --      |
    /// | `JWT_ISSUER`      | no       | unset   |
    /// | `JWT_LEEWAY_SECS` | no       | `60`    |
    ///
    /// # Panics
    ///
    /// Panics if `JWT_SECRET` is missing or empty, or the leeway does not parse.
    pub fn from_env() -> Self {
        let secret =
            std::env::var("JWT_SECRET").expect("JWT_SECRET must be set in the environment");
        assert!(!secret.trim().is_empty(), "JWT_SECRET must not be empty");

        let issuer = std::env::var("JWT_ISSUER")
            .ok()
            .filter(|s| !s.trim().is_empty());

        let leeway_secs = match std::env::var("JWT_LEEWAY_SECS") {
            Ok(raw) => raw
                .trim()
                .parse()
                .expect("JWT_LEEWAY_SECS must be a whole number of seconds"),
            Err(_) => DEFAULT_LEEWAY_SECS,
        };

        Self {
            secret,
            issuer,
            leeway_secs,
        }
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = self.leeway_secs;
        validation.set_required_spec_claims(&["exp", "sub"]);
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }
        validation
    }
}

/// Check the signature, expiry and issuer of an operator token.
pub fn verify_operator_token(
    token: &str,
    config: &JwtConfig,
) -> Result<OperatorClaims, jsonwebtoken::errors::Error> {
    let data = decode::<OperatorClaims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &config.validation(),
    )?;
    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    use super::*;

    fn config(issuer: Option<&str>) -> JwtConfig {
        JwtConfig {
            secret: "operator-secret".to_string(),
            issuer: issuer.map(str::to_string),
            leeway_secs: 60,
        }
    }

    fn mint(secret: &str, claims: serde_json::Value) -> String {
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn in_minutes(mins: i64) -> i64 {
        chrono::Utc::now().timestamp() + mins * 60
    }

    #[test]
    fn valid_token_yields_operator_and_role() {
        let token = mint(
            "operator-secret",
            json!({"sub": "ops@parley.dev", "role": "admin", "exp": in_minutes(10)}),
        );
        let claims = verify_operator_token(&token, &config(None)).unwrap();
        assert_eq!(claims.sub, "ops@parley.dev");
        assert_eq!(claims.role, "admin");
        assert!(claims.iss.is_none());
    }

    #[test]
    fn expiry_beyond_leeway_is_rejected() {
        let token = mint(
            "operator-secret",
            json!({"sub": "ops", "role": "admin", "exp": in_minutes(-5)}),
        );
        assert!(verify_operator_token(&token, &config(None)).is_err());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = mint(
            "someone-else",
            json!({"sub": "ops", "role": "admin", "exp": in_minutes(10)}),
        );
        assert!(verify_operator_token(&token, &config(None)).is_err());
    }

    #[test]
    fn issuer_is_enforced_when_configured() {
        let claims = |iss: &str| json!({"sub": "ops", "role": "admin", "exp": in_minutes(10), "iss": iss});
        let cfg = config(Some("parley-identity"));

        let good = mint("operator-secret", claims("parley-identity"));
        let bad = mint("operator-secret", claims("elsewhere"));

        assert_eq!(
            verify_operator_token(&good, &cfg).unwrap().iss.as_deref(),
            Some("parley-identity")
        );
        assert!(verify_operator_token(&bad, &cfg).is_err());
    }

    #[test]
    fn token_without_subject_is_rejected() {
        let token = mint("operator-secret", json!({"role": "admin", "exp": in_minutes(10)}));
        assert!(verify_operator_token(&token, &config(None)).is_err());
    }
}
