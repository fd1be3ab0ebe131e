//! Database repositories
//!
//! One trait plus one SQLx implementation per aggregate. Each query is
//! written once and runs on SQLite or MySQL.

pub mod brand;
pub mod category;
pub mod client;
pub mod comment;
pub mod engagement;
pub mod post;
pub mod session;
pub mod team;
pub mod user;

pub use brand::{BrandRepository, SqlxBrandRepository};
pub use category::{CategoryRepository, SqlxCategoryRepository};
pub use client::{ClientRepository, SqlxClientRepository};
pub use comment::{CommentRepository, SqlxCommentRepository};
pub use engagement::{EngagementRepository, SqlxEngagementRepository};
pub use post::{PostCounters, PostRepository, PostStats, SqlxPostRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use team::{SqlxTeamRepository, TeamRepository};
pub use user::{SqlxUserRepository, UserRepository};
