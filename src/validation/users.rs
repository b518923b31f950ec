use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{is_valid_email, max_chars, one_of, optional, required, FieldErrors};
use crate::error::AppResult;
use crate::model::{RoleType, UserStatus};
use crate::store::Store;
use crate::users::dto::UserInput;

pub const MIN_PASSWORD_CHARS: usize = 8;
pub const MAX_PROFILE_IMAGE_BYTES: u64 = 4096 * 1024;

/// Metadata of an already-received profile picture; the bytes are handled
/// by the web layer, only the stored path is persisted here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageUpload {
    pub path: String,
    pub content_type: String,
    pub size_bytes: u64,
}

/// User fields that passed validation. The password is still plain text.
#[derive(Debug, Clone, PartialEq)]
pub struct UserDraft {
    pub name: String,
    pub email: String,
    pub password: Option<String>,
    pub role: RoleType,
    pub status: UserStatus,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub profile_image: Option<String>,
}

/// Rules for user create (`current = None`) and update (`current = Some(id)`).
/// A password is mandatory on create and optional on update.
pub async fn validate_user(
    store: &dyn Store,
    input: &UserInput,
    current: Option<Uuid>,
) -> AppResult<UserDraft> {
    let mut errors = FieldErrors::default();

    let name = required(&mut errors, "name", input.name.as_deref())
        .filter(|n| max_chars(&mut errors, "name", n, 255))
        .map(str::to_string);

    let email = match required(&mut errors, "email", input.email.as_deref()) {
        Some(raw) => {
            let email = raw.to_lowercase();
            if !is_valid_email(&email) {
                errors.add("email", "The email field must be a valid email address.");
                None
            } else if store.email_taken(&email, current).await? {
                errors.add("email", "The email has already been taken.");
                None
            } else {
                Some(email)
            }
        }
        None => None,
    };

    // Passwords are kept byte for byte; surrounding spaces are part of the secret.
    let password = match input.password.as_deref().filter(|pw| !pw.is_empty()) {
        Some(pw) => {
            if pw.chars().count() < MIN_PASSWORD_CHARS {
                errors.add(
                    "password",
                    format!(
                        "The password field must be at least {} characters.",
                        MIN_PASSWORD_CHARS
                    ),
                );
            }
            if input.password_confirmation.as_deref() != Some(pw) {
                errors.add("password", "The password field confirmation does not match.");
            }
            Some(pw.to_string())
        }
        None if current.is_none() => {
            errors.add("password", "The password field is required.");
            None
        }
        None => None,
    };

    let role = required(&mut errors, "role", input.role.as_deref())
        .and_then(|r| one_of::<RoleType>(&mut errors, "role", r));
    let status = required(&mut errors, "status", input.status.as_deref())
        .and_then(|s| one_of::<UserStatus>(&mut errors, "status", s));

    let phone = optional(input.phone.as_deref())
        .filter(|p| max_chars(&mut errors, "phone", p, 15))
        .map(str::to_string);
    let address = optional(input.address.as_deref())
        .filter(|a| max_chars(&mut errors, "address", a, 255))
        .map(str::to_string);

    let profile_image = match &input.profile_image {
        Some(upload) => {
            if !upload.content_type.starts_with("image/") {
                errors.add("profile_image", "The profile image field must be an image.");
            }
            if upload.size_bytes > MAX_PROFILE_IMAGE_BYTES {
                errors.add(
                    "profile_image",
                    format!(
                        "The profile image field must not be greater than {} kilobytes.",
                        MAX_PROFILE_IMAGE_BYTES / 1024
                    ),
                );
            }
            Some(upload.path.clone())
        }
        None => None,
    };

    if !errors.is_empty() {
        return Err(errors.into());
    }
    // every required field is Some once no error was recorded
    match (name, email, role, status) {
        (Some(name), Some(email), Some(role), Some(status)) => Ok(UserDraft {
            name,
            email,
            password,
            role,
            status,
            phone,
            address,
            profile_image,
        }),
        _ => Err(anyhow::anyhow!("user validation produced an incomplete draft").into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryStore;
    use crate::store::NewUser;
    use crate::validation::RoleDraft;

    fn input() -> UserInput {
        UserInput {
            name: Some("Jane Doe".into()),
            email: Some("Jane@Example.com".into()),
            password: Some("longenough".into()),
            password_confirmation: Some("longenough".into()),
            role: Some("user".into()),
            status: Some("active".into()),
            phone: None,
            address: None,
            profile_image: None,
        }
    }

    async fn seed_user(store: &InMemoryStore, email: &str) -> Uuid {
        let role = store
            .insert_role(&RoleDraft {
                name: RoleType::User,
                description: None,
            })
            .await
            .unwrap();
        store
            .insert_user(NewUser {
                name: "Existing".into(),
                email: email.into(),
                password_hash: "x".into(),
                phone: None,
                address: None,
                profile_image: None,
                status: UserStatus::Active,
                role_id: role.id,
            })
            .await
            .unwrap()
            .id
    }

    fn field_errors(err: crate::error::AppError) -> FieldErrors {
        err.field_errors().cloned().expect("validation failure")
    }

    #[tokio::test]
    async fn valid_input_normalizes_email() {
        let store = InMemoryStore::new();
        let draft = validate_user(&store, &input(), None).await.unwrap();
        assert_eq!(draft.email, "jane@example.com");
        assert_eq!(draft.role, RoleType::User);
        assert_eq!(draft.status, UserStatus::Active);
    }

    #[tokio::test]
    async fn password_rules_on_create() {
        let store = InMemoryStore::new();

        let mut short = input();
        short.password = Some("short".into());
        short.password_confirmation = Some("short".into());
        let errors = field_errors(validate_user(&store, &short, None).await.unwrap_err());
        assert_eq!(
            errors.get("password"),
            ["The password field must be at least 8 characters."]
        );

        let mut mismatch = input();
        mismatch.password_confirmation = Some("different1".into());
        let errors = field_errors(validate_user(&store, &mismatch, None).await.unwrap_err());
        assert_eq!(
            errors.get("password"),
            ["The password field confirmation does not match."]
        );

        let mut missing = input();
        missing.password = None;
        let errors = field_errors(validate_user(&store, &missing, None).await.unwrap_err());
        assert!(errors.has("password"));
    }

    #[tokio::test]
    async fn password_kept_verbatim() {
        let store = InMemoryStore::new();

        let mut spaced = input();
        spaced.password = Some("  spaced-secret  ".into());
        spaced.password_confirmation = Some("  spaced-secret  ".into());
        let draft = validate_user(&store, &spaced, None).await.unwrap();
        assert_eq!(draft.password.as_deref(), Some("  spaced-secret  "));

        let mut trimmed_confirmation = spaced.clone();
        trimmed_confirmation.password_confirmation = Some("spaced-secret".into());
        let errors = field_errors(
            validate_user(&store, &trimmed_confirmation, None)
                .await
                .unwrap_err(),
        );
        assert_eq!(
            errors.get("password"),
            ["The password field confirmation does not match."]
        );

        let mut padded_short = input();
        padded_short.password = Some("  abc   ".into());
        padded_short.password_confirmation = Some("  abc   ".into());
        assert!(validate_user(&store, &padded_short, None).await.is_ok());
    }

    #[tokio::test]
    async fn password_optional_on_update() {
        let store = InMemoryStore::new();
        let id = seed_user(&store, "jane@example.com").await;
        let mut update = input();
        update.password = None;
        update.password_confirmation = None;
        let draft = validate_user(&store, &update, Some(id)).await.unwrap();
        assert_eq!(draft.password, None);
    }

    #[tokio::test]
    async fn email_unique_except_self() {
        let store = InMemoryStore::new();
        let id = seed_user(&store, "jane@example.com").await;

        let errors = field_errors(validate_user(&store, &input(), None).await.unwrap_err());
        assert_eq!(errors.get("email"), ["The email has already been taken."]);

        assert!(validate_user(&store, &input(), Some(id)).await.is_ok());
    }

    #[tokio::test]
    async fn enumerations_and_lengths() {
        let store = InMemoryStore::new();
        let mut bad = input();
        bad.role = Some("superuser".into());
        bad.status = Some("banned".into());
        bad.phone = Some("0123456789012345".into());
        bad.name = Some("x".repeat(256));
        let errors = field_errors(validate_user(&store, &bad, None).await.unwrap_err());
        assert_eq!(errors.get("role"), ["The selected role is invalid."]);
        assert_eq!(errors.get("status"), ["The selected status is invalid."]);
        assert!(errors.has("phone"));
        assert!(errors.has("name"));
        assert!(!errors.has("email"));
    }

    #[tokio::test]
    async fn profile_image_must_be_small_image() {
        let store = InMemoryStore::new();
        let mut with_pdf = input();
        with_pdf.profile_image = Some(ImageUpload {
            path: "avatars/cv.pdf".into(),
            content_type: "application/pdf".into(),
            size_bytes: 5 * 1024 * 1024,
        });
        let errors = field_errors(validate_user(&store, &with_pdf, None).await.unwrap_err());
        assert_eq!(errors.get("profile_image").len(), 2);

        let mut with_png = input();
        with_png.profile_image = Some(ImageUpload {
            path: "avatars/jane.png".into(),
            content_type: "image/png".into(),
            size_bytes: MAX_PROFILE_IMAGE_BYTES,
        });
        let draft = validate_user(&store, &with_png, None).await.unwrap();
        assert_eq!(draft.profile_image.as_deref(), Some("avatars/jane.png"));
    }
}
