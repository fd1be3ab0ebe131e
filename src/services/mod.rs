//! Services layer - Business logic
//!
//! Services validate input, enforce role rules and coordinate the
//! repositories with the cache. Handlers and pages only talk to services.

pub mod activity_feed;
pub mod brand;
pub mod carousel;
pub mod category;
pub mod client;
pub mod comment;
pub mod engagement;
pub mod password;
pub mod post;
pub mod rate_limiter;
pub mod sanitize;
pub mod slug;
pub mod team;
pub mod upload;
pub mod user;

pub use activity_feed::{ActivityFeedService, DashboardStats, FeedBucket, FeedGroup, FeedItem, FeedKind};
pub use brand::{BrandPalette, BrandService, BrandServiceError, Rgb};
pub use carousel::{Carousel, SlideLayout};
pub use category::{CategoryService, CategoryServiceError};
pub use client::{ClientService, ClientServiceError};
pub use comment::{CommentService, CommentServiceError};
pub use engagement::{generate_fingerprint, EngagementError, EngagementService};
pub use password::{hash_password, verify_password};
pub use post::{PostService, PostServiceError};
pub use rate_limiter::LoginRateLimiter;
pub use slug::generate_slug;
pub use team::{TeamService, TeamServiceError};
pub use upload::{StoredUpload, UploadError, UploadService};
pub use user::{LoginInput, RegisterInput, UserService, UserServiceError};
