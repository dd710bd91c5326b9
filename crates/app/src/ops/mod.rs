pub mod delete;
pub mod get;
pub mod list;
pub mod mkdir;
pub mod mv;
pub mod put;
pub mod sync;

pub use delete::Delete;
pub use get::Get;
pub use list::List;
pub use mkdir::Mkdir;
pub use mv::Move;
pub use put::Put;
pub use sync::Sync;
