use async_trait::async_trait;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};

use crate::services::auth::claims::ClaimSet;
use crate::services::auth::verifier::{TokenVerifier, VerifyError};

/// RS256 identity-token verifier (securetoken-style issuers).
///
/// - Issuer is pinned to `https://securetoken.google.com/<project>`, audience
///   to the project id, the way the issuing service signs them.
/// - Claims beyond the registered ones are passed through untouched as an
///   opaque `ClaimSet`; mapping them is the resolver's business.
/// - Key material is intentionally not printable via Debug.
#[derive(Clone)]
pub struct IdTokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for IdTokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Do not print key material
        f.debug_struct("IdTokenVerifier")
            .field("validation", &self.validation)
            .finish()
    }
}

impl IdTokenVerifier {
    pub fn new(
        public_key_pem: &str,
        project_id: &str,
        leeway_seconds: u64,
    ) -> Result<Self, String> {
        let decoding_key = DecodingKey::from_rsa_pem(public_key_pem.as_bytes())
            .map_err(|e| format!("invalid rsa public key pem: {}", e))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[format!("https://securetoken.google.com/{project_id}")]);
        validation.set_audience(&[project_id]);
        validation.leeway = leeway_seconds;

        Ok(Self {
            decoding_key,
            validation,
        })
    }

    fn decode(&self, token: &str) -> Result<ClaimSet, jsonwebtoken::errors::Error> {
        let data = jsonwebtoken::decode::<serde_json::Map<String, serde_json::Value>>(
            token,
            &self.decoding_key,
            &self.validation,
        )?;

        Ok(ClaimSet::new(data.claims))
    }
}

#[async_trait]
impl TokenVerifier for IdTokenVerifier {
    async fn verify(&self, token: &str) -> Result<ClaimSet, VerifyError> {
        let claims = self.decode(token).map_err(classify)?;

        // The issuer always sets a subject; a token without one is not ours.
        if claims.get_str("sub").is_none() {
            return Err(VerifyError::Invalid("empty 'sub' claim".to_string()));
        }

        Ok(claims)
    }
}

// Expired is the one benign kind; the guard treats it differently from
// everything else, so classification happens here at the adapter boundary.
fn classify(e: jsonwebtoken::errors::Error) -> VerifyError {
    match e.kind() {
        ErrorKind::ExpiredSignature => VerifyError::Expired,
        ErrorKind::InvalidToken
        | ErrorKind::InvalidSignature
        | ErrorKind::InvalidIssuer
        | ErrorKind::InvalidAudience
        | ErrorKind::InvalidSubject
        | ErrorKind::ImmatureSignature
        | ErrorKind::InvalidAlgorithm
        | ErrorKind::Base64(_)
        | ErrorKind::Json(_)
        | ErrorKind::Utf8(_) => VerifyError::Invalid(e.to_string()),
        _ => VerifyError::Verification(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_garbage_key_material() {
        let result = IdTokenVerifier::new("not a pem", "demo-project", 60);
        assert!(result.is_err());
    }

    #[test]
    fn expired_signature_classifies_as_expired() {
        let err = jsonwebtoken::errors::Error::from(ErrorKind::ExpiredSignature);
        assert!(matches!(classify(err), VerifyError::Expired));
    }

    #[test]
    fn invalid_signature_classifies_as_invalid() {
        let err = jsonwebtoken::errors::Error::from(ErrorKind::InvalidSignature);
        assert!(matches!(classify(err), VerifyError::Invalid(_)));
    }
}
