use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Returned when a raw string does not name any case of a closed enumeration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("'{value}' is not a valid {kind}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Declares a closed, string-backed enumeration with its wire value per case.
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $name:ident => $kind:literal {
            $($variant:ident => $value:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $value)] $variant,)+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $value,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($value => Ok($name::$variant),)+
                    _ => Err(UnknownVariant {
                        kind: $kind,
                        value: s.to_string(),
                    }),
                }
            }
        }
    };
}

string_enum! {
    /// Fixed set of role names.
    RoleType => "role" {
        Admin => "admin",
        User => "user",
        Moderator => "moderator",
        Guest => "guest",
    }
}

string_enum! {
    /// Every action identifier a permission (or an activity log entry) may carry.
    PermissionType => "permission" {
        CreateCar => "create_car",
        EditCar => "edit_car",
        DeleteCar => "delete_car",
        ViewCar => "view_car",
        ListCars => "list_cars",
        AssignCar => "assign_car",

        CreateUser => "create_user",
        EditUser => "edit_user",
        DeleteUser => "delete_user",
        ViewUser => "view_user",
        ListUsers => "list_users",
        ActivateUser => "activate_user",
        DeactivateUser => "deactivate_user",

        CreateRole => "create_role",
        EditRole => "edit_role",
        DeleteRole => "delete_role",
        ViewRole => "view_role",
        ListRoles => "list_roles",
        AssignRole => "assign_role",

        CreatePermission => "create_permission",
        EditPermission => "edit_permission",
        DeletePermission => "delete_permission",
        ViewPermission => "view_permission",
        ListPermissions => "list_permissions",
        AssignPermission => "assign_permission",

        SendMessage => "send_message",
        ReadMessage => "read_message",
        DeleteMessage => "delete_message",
        ListMessages => "list_messages",

        ViewActivityLog => "view_activity_log",
        ExportActivityLog => "export_activity_log",

        AccessDashboard => "access_dashboard",
        ManageSettings => "manage_settings",

        EditProfile => "edit_profile",
        ChangePassword => "change_password",
        UploadProfileImage => "upload_profile_image",
        DeleteProfileImage => "delete_profile_image",
        ViewProfile => "view_profile",
    }
}

string_enum! {
    UserStatus => "user status" {
        Active => "active",
        Inactive => "inactive",
    }
}

string_enum! {
    /// Sale state of a car in the inventory.
    CarStatus => "car status" {
        Available => "available",
        Sold => "sold",
        Pending => "pending",
    }
}

string_enum! {
    DriveType => "drive type" {
        Fwd => "FWD",
        Rwd => "RWD",
        Awd => "AWD",
    }
}

string_enum! {
    EngineType => "engine type" {
        V4 => "V4",
        V6 => "V6",
        V8 => "V8",
        Electric => "Electric",
        Hybrid => "Hybrid",
    }
}

string_enum! {
    TransmissionType => "transmission type" {
        Manual => "Manual",
        Automatic => "Automatic",
        SemiAutomatic => "Semi-Automatic",
    }
}

string_enum! {
    FuelType => "fuel type" {
        Petrol => "Petrol",
        Diesel => "Diesel",
        Hybrid => "Hybrid",
        Electric => "Electric",
    }
}

impl Default for UserStatus {
    fn default() -> Self {
        UserStatus::Inactive
    }
}

impl Default for CarStatus {
    fn default() -> Self {
        CarStatus::Available
    }
}
