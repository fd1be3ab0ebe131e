//! Data models
//!
//! Database entities, API inputs and the pagination containers shared by
//! the service and API layers.

mod brand;
mod category;
mod client;
mod comment;
mod engagement;
mod pagination;
mod post;
mod session;
mod team;
mod user;

pub use brand::{
    BrandActivity, BrandDivision, BrandStat, BrandTeamEntry, CreateActivityInput,
    CreateDivisionInput, DivisionActivity, UpdateActivityInput, UpdateDivisionInput,
};
pub use category::{Category, CategoryWithCount, CreateCategoryInput, UpdateCategoryInput};
pub use client::{Client, CreateClientInput, UpdateClientInput};
pub use comment::{BlogComment, CommentThread, CommentWithPost, CreateCommentInput, UpdateCommentInput};
pub use engagement::{BlogLike, BlogView, LikeStatus, Liker, ViewResult};
pub use pagination::{ListParams, PagedResult};
pub use post::{BlogPost, CreatePostInput, PostFilter, PostStatus, UpdatePostInput};
pub use session::Session;
pub use team::{
    CreateDepartmentInput, CreateTeamMemberInput, Department, DepartmentGroup, TeamMember,
    TeamRole, UpdateDepartmentInput, UpdateTeamMemberInput,
};
pub use user::{CreateUserInput, User, UserRole};
