pub mod store;
pub use store::{BusinessStore, RbacStore, UserStore};
pub mod user_repo;
pub use user_repo::UserRepository;
pub mod business_repo;
pub use business_repo::BusinessRepository;
pub mod rbac_repo;
pub use rbac_repo::RbacRepository;
pub mod memory;
pub use memory::MemoryStore;
