mod entities;
mod enums;

pub use entities::{ActivityLog, Car, Message, Permission, Role, User};
pub use enums::{
    CarStatus, DriveType, EngineType, FuelType, PermissionType, RoleType, TransmissionType,
    UnknownVariant, UserStatus,
};
