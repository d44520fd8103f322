use std::time::{SystemTime, UNIX_EPOCH};

use crate::models::{Claims, TokenType};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

/// Identity fields carried in every token.
#[derive(Debug, Clone)]
pub struct Subject {
    pub user_id: u64,
    pub username: String,
    pub role: u8,
    pub school_id: Option<u64>,
    pub teacher_id: Option<u64>,
    pub student_id: Option<u64>,
}

impl From<&Claims> for Subject {
    fn from(c: &Claims) -> Self {
        Subject {
            user_id: c.user_id,
            username: c.sub.clone(),
            role: c.role,
            school_id: c.school_id,
            teacher_id: c.teacher_id,
            student_id: c.student_id,
        }
    }
}

fn now() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as usize)
        .unwrap_or_default()
}

fn issue(
    subject: &Subject,
    token_type: TokenType,
    secret: &str,
    ttl: usize,
) -> Result<(String, Claims), jsonwebtoken::errors::Error> {
    let claims = Claims {
        user_id: subject.user_id,
        sub: subject.username.clone(),
        role: subject.role,
        exp: now() + ttl,
        jti: Uuid::new_v4().to_string(),
        token_type,
        school_id: subject.school_id,
        teacher_id: subject.teacher_id,
        student_id: subject.student_id,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok((token, claims))
}

pub fn generate_access_token(
    subject: &Subject,
    secret: &str,
    ttl: usize,
) -> Result<String, jsonwebtoken::errors::Error> {
    issue(subject, TokenType::Access, secret, ttl).map(|(token, _)| token)
}

pub fn generate_refresh_token(
    subject: &Subject,
    secret: &str,
    ttl: usize,
) -> Result<(String, Claims), jsonwebtoken::errors::Error> {
    issue(subject, TokenType::Refresh, secret, ttl)
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn teacher() -> Subject {
        Subject {
            user_id: 42,
            username: "amina".into(),
            role: 3,
            school_id: Some(1),
            teacher_id: Some(7),
            student_id: None,
        }
    }

    #[test]
    fn access_token_round_trips_identity() {
        let token = generate_access_token(&teacher(), "secret", 60).unwrap();
        let claims = verify_token(&token, "secret").unwrap();
        assert_eq!(claims.user_id, 42);
        assert_eq!(claims.sub, "amina");
        assert_eq!(claims.school_id, Some(1));
        assert_eq!(claims.teacher_id, Some(7));
        assert_eq!(claims.token_type, TokenType::Access);
    }

    #[test]
    fn refresh_token_has_unique_jti() {
        let (_, a) = generate_refresh_token(&teacher(), "secret", 60).unwrap();
        let (_, b) = generate_refresh_token(&teacher(), "secret", 60).unwrap();
        assert_eq!(a.token_type, TokenType::Refresh);
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = generate_access_token(&teacher(), "secret", 60).unwrap();
        assert!(verify_token(&token, "other").is_err());
    }
}
