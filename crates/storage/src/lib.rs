#![forbid(unsafe_code)]

pub mod repository;
pub mod supabase;

pub use repository::{
    InMemoryStorage, RegistrationRecord, RegistrationRepository, Storage, StorageError,
    TaskRecord, TaskRepository,
};
pub use supabase::{SupabaseConfig, SupabaseStorage};
