use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{Permission, User};
use crate::validation::ImageUpload;

/// Raw body of a user create or update request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub password_confirmation: Option<String>,
    pub role: Option<String>,
    pub status: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub profile_image: Option<ImageUpload>,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub message: String,
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct UserPermissions {
    pub user_id: Uuid,
    pub permissions: Vec<Permission>,
}
