//! Domain ports: the store capability interfaces adapters implement.

mod macros;
pub(crate) use macros::define_port_error;

mod comment_repository;
mod follow_repository;
mod post_repository;
mod review_repository;
mod user_repository;

#[cfg(test)]
pub use comment_repository::MockCommentRepository;
pub use comment_repository::{CommentRepository, CommentRepositoryError};
#[cfg(test)]
pub use follow_repository::MockFollowRepository;
pub use follow_repository::{FollowRepository, FollowRepositoryError};
#[cfg(test)]
pub use post_repository::MockPostRepository;
pub use post_repository::{PostRepository, PostRepositoryError};
#[cfg(test)]
pub use review_repository::MockReviewRepository;
pub use review_repository::{ReviewRepository, ReviewRepositoryError};
#[cfg(test)]
pub use user_repository::MockUserRepository;
pub use user_repository::{UserRepository, UserRepositoryError};
