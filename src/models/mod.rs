//! Domain models for the prototype repository.

pub mod department;
pub mod prototype;
pub mod user;

// Re-export commonly used types
pub use department::{CreateDepartmentRequest, DepartmentResponse};
pub use prototype::{
    AssignStorageRequest, AttachmentResponse, CreatePrototypeFields, ListPrototypesQuery,
    PrototypeCountResponse, PrototypeResponse, PrototypeStatus, ReviewRequest, WeekdayUploads,
};
pub use user::{
    ChangePasswordRequest, LoginRequest, ProvisionUserRequest, RegisterRequest, Role,
    SessionClaims, UpdateProfileRequest, User, UserResponse,
};
