use anyhow::{anyhow, Result};
use pasetors::claims::{Claims, ClaimsValidationRules};
use pasetors::keys::SymmetricKey;
use pasetors::token::UntrustedToken;
use pasetors::{local, version4::V4, Local};
use uuid::Uuid;

pub const TOKEN_ISSUER: &str = "stride";

/// Verifies access tokens minted by the identity service. Issuance lives
/// elsewhere.
#[derive(Clone)]
pub struct TokenVerifier {
    access_key: [u8; 32],
}

impl TokenVerifier {
    pub fn new(access_key: [u8; 32]) -> Self {
        Self { access_key }
    }

    pub fn authenticate_access_token(&self, token: &str) -> Result<Option<Uuid>> {
        let claims = match self.decrypt_claims(token)? {
            Some(claims) => claims,
            None => return Ok(None),
        };
        if !has_token_type(&claims, "access") {
            return Ok(None);
        }
        Ok(Some(claim_uuid(&claims, "sub")?))
    }

    fn decrypt_claims(&self, token: &str) -> Result<Option<Claims>> {
        let key = SymmetricKey::<V4>::from(&self.access_key)?;
        let mut rules = ClaimsValidationRules::new();
        rules.validate_issuer_with(TOKEN_ISSUER);
        rules.validate_audience_with(TOKEN_ISSUER);

        let untrusted = match UntrustedToken::<Local, V4>::try_from(token) {
            Ok(token) => token,
            Err(_) => return Ok(None),
        };
        let trusted = match local::decrypt(&key, &untrusted, &rules, None, None) {
            Ok(token) => token,
            Err(_) => return Ok(None),
        };
        Ok(trusted.payload_claims().cloned())
    }
}

fn claim_uuid(claims: &Claims, name: &str) -> Result<Uuid> {
    let value = claims
        .get_claim(name)
        .and_then(|value| value.as_str())
        .ok_or_else(|| anyhow!("missing {} claim", name))?;
    Ok(Uuid::parse_str(value)?)
}

fn has_token_type(claims: &Claims, expected: &str) -> bool {
    claims
        .get_claim("typ")
        .and_then(|value| value.as_str())
        .map(|value| value == expected)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; 32] = *b"0123456789abcdef0123456789abcdef";

    fn mint(user_id: Uuid, typ: &str) -> String {
        let mut claims = Claims::new().unwrap();
        claims.issuer(TOKEN_ISSUER).unwrap();
        claims.audience(TOKEN_ISSUER).unwrap();
        claims.subject(&user_id.to_string()).unwrap();
        claims.add_additional("typ", typ).unwrap();
        let key = SymmetricKey::<V4>::from(&KEY).unwrap();
        local::encrypt(&key, &claims, None, None).unwrap()
    }

    #[test]
    fn accepts_access_token() {
        let user_id = Uuid::new_v4();
        let verifier = TokenVerifier::new(KEY);
        let token = mint(user_id, "access");
        assert_eq!(verifier.authenticate_access_token(&token).unwrap(), Some(user_id));
    }

    #[test]
    fn rejects_refresh_token_and_garbage() {
        let verifier = TokenVerifier::new(KEY);
        let token = mint(Uuid::new_v4(), "refresh");
        assert_eq!(verifier.authenticate_access_token(&token).unwrap(), None);
        assert_eq!(verifier.authenticate_access_token("not-a-token").unwrap(), None);
    }
}
