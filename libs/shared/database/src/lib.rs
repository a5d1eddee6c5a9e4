pub mod error;
pub mod supabase;

pub use error::{DatabaseError, DbResult};
pub use supabase::{in_list, AuthSession, AuthUser, SupabaseClient};
