use tracing::{info, instrument, warn};

use super::dto::{LoginRequest, LoginResponse};
use super::jwt::JwtKeys;
use super::password::verify_password;
use crate::error::{AppError, AppResult};
use crate::store::Store;
use crate::validation::is_valid_email;

fn invalid_credentials() -> AppError {
    AppError::Unauthorized("Invalid credentials".into())
}

/// Checks the credentials of an active user and issues an access token.
#[instrument(skip(store, keys, payload))]
pub async fn login(
    store: &dyn Store,
    keys: &JwtKeys,
    payload: &LoginRequest,
) -> AppResult<LoginResponse> {
    let email = payload.email.trim().to_lowercase();
    if !is_valid_email(&email) {
        warn!(email = %email, "login with malformed email");
        return Err(invalid_credentials());
    }

    let Some(user) = store.find_user_by_email(&email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(invalid_credentials());
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(invalid_credentials());
    }
    if !user.is_active() {
        warn!(user_id = %user.id, "login by inactive user");
        return Err(AppError::Unauthorized("Account is inactive".into()));
    }

    let access_token = keys.sign(user.id)?;
    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(LoginResponse {
        access_token,
        token_type: "Bearer",
        expires_in: keys.ttl().as_secs(),
        user,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::seed::seed_reference_data;
    use crate::config::AppConfig;
    use crate::store::memory::InMemoryStore;
    use crate::users::dto::UserInput;
    use crate::users::services::create_user;

    async fn setup(status: &str) -> (InMemoryStore, JwtKeys) {
        setup_with_password(status, "analytical").await
    }

    async fn setup_with_password(status: &str, password: &str) -> (InMemoryStore, JwtKeys) {
        let store = InMemoryStore::new();
        seed_reference_data(&store).await.unwrap();
        create_user(
            &store,
            &UserInput {
                name: Some("Ada".into()),
                email: Some("ada@example.com".into()),
                password: Some(password.into()),
                password_confirmation: Some(password.into()),
                role: Some("admin".into()),
                status: Some(status.into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        (store, JwtKeys::new(&AppConfig::for_tests().jwt))
    }

    fn request(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.into(),
            password: password.into(),
        }
    }

    #[tokio::test]
    async fn login_issues_token_for_subject() {
        let (store, keys) = setup("active").await;
        let resp = login(&store, &keys, &request(" ADA@example.com ", "analytical"))
            .await
            .unwrap();
        let claims = keys.verify(&resp.access_token).unwrap();
        assert_eq!(claims.sub, resp.user.id);
        assert_eq!(resp.token_type, "Bearer");
    }

    #[tokio::test]
    async fn login_rejects_bad_credentials_and_inactive_users() {
        let (store, keys) = setup("active").await;
        for req in [
            request("ada@example.com", "wrong-password"),
            request("nobody@example.com", "analytical"),
            request("not-an-email", "analytical"),
        ] {
            let err = login(&store, &keys, &req).await.unwrap_err();
            assert!(matches!(err, AppError::Unauthorized(_)));
        }

        let (store, keys) = setup("inactive").await;
        let err = login(&store, &keys, &request("ada@example.com", "analytical"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn login_with_surrounding_spaces_in_password() {
        let (store, keys) = setup_with_password("active", "  spaced-secret  ").await;
        let resp = login(&store, &keys, &request("ada@example.com", "  spaced-secret  "))
            .await
            .unwrap();
        assert_eq!(resp.user.email, "ada@example.com");

        let err = login(&store, &keys, &request("ada@example.com", "spaced-secret"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }
}
