//! Follow, comment and review stores against embedded PostgreSQL, plus the
//! flows `Collections` composes over them.

use cocraft::domain::ports::{
    CommentRepository, CommentRepositoryError, FollowRepository, FollowRepositoryError,
    PostRepository, ReviewRepository, ReviewRepositoryError, UserRepository,
};
use cocraft::domain::{
    Collections, CommentId, ErrorCode, FeedQuery, NewComment, NewPost, NewReview, Post, PostId,
    Role, User, UserId, Validator, Viewer,
};
use rstest::{fixture, rstest};

mod support;

use support::{StoreContext, handle_cluster_setup_failure, new_user, setup_store};

const TEST_DB: &str = "diesel_social_flows_test";

struct TestContext {
    store: StoreContext,
    collections: Collections,
}

impl TestContext {
    fn member(&self, name: &str, role: Role) -> User {
        let users = self.collections.users.clone();
        self.store
            .runtime
            .block_on(async move { users.create(&new_user(name, role)).await })
            .expect("create member")
    }

    fn post_by(&self, author: &User, title: &str) -> Post {
        let posts = self.collections.posts.clone();
        let draft = NewPost {
            user_id: author.id,
            user_role: author.role,
            title: title.to_owned(),
            content: format!("{title} body"),
            tags: Vec::new(),
            mentions: Vec::new(),
            images: Vec::new(),
        };
        self.store
            .runtime
            .block_on(async move { posts.create(&draft).await })
            .expect("create post")
    }
}

#[fixture]
fn flow_context() -> Option<TestContext> {
    match setup_store(TEST_DB) {
        Ok(store) => {
            let collections = Collections::diesel(store.pool.clone(), store.clock());
            Some(TestContext { store, collections })
        }
        Err(reason) => handle_cluster_setup_failure(reason),
    }
}

fn comment(author: &User, post: &PostId, parent: Option<CommentId>, text: &str) -> NewComment {
    NewComment {
        user_id: author.id,
        post_id: *post,
        parent_id: parent,
        content: text.to_owned(),
    }
}

#[rstest]
fn follow_is_idempotent_and_reversible(flow_context: Option<TestContext>) {
    let Some(context) = flow_context else {
        eprintln!("SKIP-TEST-CLUSTER: follow_is_idempotent_and_reversible skipped");
        return;
    };
    let ada = context.member("ada", Role::Designer);
    let bob = context.member("bob", Role::Contractor);
    let follows = context.collections.follows.clone();

    context
        .store
        .runtime
        .block_on(async {
            let first = follows.follow(&ada.id, &bob.id).await?;
            assert!(first.is_some_and(|edge| edge.followee_id == bob.id));
            assert!(follows.follow(&ada.id, &bob.id).await?.is_none());

            assert!(follows.is_following(&ada.id, &bob.id).await?);
            assert!(!follows.is_following(&bob.id, &ada.id).await?);
            assert_eq!(follows.following(&ada.id).await?, vec![bob.id]);
            assert_eq!(follows.follower_count(&bob.id).await?, 1);
            assert_eq!(follows.following_count(&ada.id).await?, 1);

            assert_eq!(
                follows.follow(&ada.id, &ada.id).await.expect_err("self follow"),
                FollowRepositoryError::SelfFollow
            );
            assert_eq!(
                follows
                    .follow(&ada.id, &UserId::generate())
                    .await
                    .expect_err("unknown followee"),
                FollowRepositoryError::UserNotFound
            );

            assert!(follows.unfollow(&ada.id, &bob.id).await?);
            assert!(!follows.unfollow(&ada.id, &bob.id).await?);
            assert_eq!(follows.follower_count(&bob.id).await?, 0);
            Ok::<_, FollowRepositoryError>(())
        })
        .expect("follow flow");
}

#[rstest]
fn comments_bump_the_counter_and_carry_context(flow_context: Option<TestContext>) {
    let Some(context) = flow_context else {
        eprintln!("SKIP-TEST-CLUSTER: comments_bump_the_counter_and_carry_context skipped");
        return;
    };
    let ada = context.member("ada", Role::Designer);
    let bob = context.member("bob", Role::Contractor);
    let post = context.post_by(&ada, "Kitchen plan");
    let comments = context.collections.comments.clone();
    let posts = context.collections.posts.clone();

    context
        .store
        .runtime
        .block_on(async {
            let root = comments
                .create(&comment(&bob, &post.id, None, "Love the island"))
                .await?;
            assert_eq!(root.username, "bob");
            assert!(root.parent_comment.is_none());

            let reply = comments
                .create(&comment(&ada, &post.id, Some(root.id), "Thanks!"))
                .await?;
            let parent = reply.parent_comment.as_ref().expect("parent attached");
            assert_eq!(parent.id, root.id);
            assert_eq!(parent.user_id, bob.id);

            assert!(comments.exists(&reply.id).await?);

            let thread = comments.by_post(&post.id).await?;
            let ids: Vec<CommentId> = thread.iter().map(|entry| entry.id).collect();
            assert_eq!(ids, vec![reply.id, root.id]);
            assert!(
                thread
                    .first()
                    .and_then(|entry| entry.parent_comment.as_ref())
                    .is_some_and(|parent| parent.content == "Love the island")
            );

            let stored = posts.get_by_id(&post.id).await.expect("post exists");
            assert_eq!(stored.comment_count, 2);
            Ok::<_, CommentRepositoryError>(())
        })
        .expect("comment flow");
}

#[rstest]
fn failed_comments_leave_the_counter_untouched(flow_context: Option<TestContext>) {
    let Some(context) = flow_context else {
        eprintln!("SKIP-TEST-CLUSTER: failed_comments_leave_the_counter_untouched skipped");
        return;
    };
    let ada = context.member("ada", Role::Designer);
    let post = context.post_by(&ada, "Bathroom tiles");
    let other = context.post_by(&ada, "Garden shed");
    let comments = context.collections.comments.clone();
    let posts = context.collections.posts.clone();

    context
        .store
        .runtime
        .block_on(async {
            let elsewhere = comments
                .create(&comment(&ada, &other.id, None, "On another post"))
                .await
                .expect("seed comment");

            let wrong_parent = comments
                .create(&comment(&ada, &post.id, Some(elsewhere.id), "Misplaced"))
                .await
                .expect_err("parent on another post");
            assert_eq!(wrong_parent, CommentRepositoryError::ParentNotFound);

            let ghost = User {
                id: UserId::generate(),
                ..ada.clone()
            };
            let no_author = comments
                .create(&comment(&ghost, &post.id, None, "Who am I"))
                .await
                .expect_err("unknown author");
            assert_eq!(no_author, CommentRepositoryError::AuthorNotFound);

            let no_post = comments
                .create(&comment(&ada, &PostId::generate(), None, "Nowhere"))
                .await
                .expect_err("unknown post");
            assert_eq!(no_post, CommentRepositoryError::PostNotFound);

            let stored = posts.get_by_id(&post.id).await.expect("post exists");
            assert_eq!(stored.comment_count, 0);
            assert!(
                comments
                    .by_post(&post.id)
                    .await
                    .expect("list comments")
                    .is_empty()
            );
        });
}

#[rstest]
fn reviews_keep_the_rating_aggregate_in_step(flow_context: Option<TestContext>) {
    let Some(context) = flow_context else {
        eprintln!("SKIP-TEST-CLUSTER: reviews_keep_the_rating_aggregate_in_step skipped");
        return;
    };
    let ada = context.member("ada", Role::Homeowner);
    let bob = context.member("bob", Role::Contractor);
    let reviews = context.collections.reviews.clone();
    let users = context.collections.users.clone();

    context
        .store
        .runtime
        .block_on(async {
            let review = |score| NewReview {
                rated_user_id: bob.id,
                rater_id: ada.id,
                rater_username: "ada".to_owned(),
                score,
                comment: Some("Tidy work".to_owned()),
            };

            let first = reviews.create(&review(5)).await?;
            let second = reviews.create(&review(3)).await?;

            let rated = users.get_by_id(&bob.id).await.expect("rated user");
            assert_eq!(rated.rating.total_rating, 8);
            assert_eq!(rated.rating.rating_count, 2);

            let listed: Vec<_> = reviews
                .by_rated_user(&bob.id)
                .await?
                .into_iter()
                .map(|entry| entry.id)
                .collect();
            assert_eq!(listed, vec![second.id, first.id]);

            let withdrawn = reviews.delete(&first.id, &bob.id).await?;
            assert_eq!(withdrawn.score, 5);
            let rated = users.get_by_id(&bob.id).await.expect("rated user");
            assert_eq!(rated.rating.total_rating, 3);
            assert_eq!(rated.rating.rating_count, 1);

            assert_eq!(
                reviews
                    .delete(&second.id, &ada.id)
                    .await
                    .expect_err("wrong rated user"),
                ReviewRepositoryError::NotFound
            );

            let orphan = NewReview {
                rated_user_id: UserId::generate(),
                ..review(4)
            };
            assert_eq!(
                reviews.create(&orphan).await.expect_err("unknown rated user"),
                ReviewRepositoryError::RatedUserNotFound
            );
            Ok::<_, ReviewRepositoryError>(())
        })
        .expect("review flow");
}

#[rstest]
fn personalised_feed_follows_the_follow_graph(flow_context: Option<TestContext>) {
    let Some(context) = flow_context else {
        eprintln!("SKIP-TEST-CLUSTER: personalised_feed_follows_the_follow_graph skipped");
        return;
    };
    let reader = context.member("reader", Role::Homeowner);
    let followed = context.member("followed", Role::Designer);
    let stranger = context.member("stranger", Role::Designer);
    let expected = context.post_by(&followed, "Followed work");
    context.post_by(&stranger, "Stranger work");
    let collections = context.collections.clone();

    context
        .store
        .runtime
        .block_on(async {
            let viewer = Viewer::member(reader.id, "reader");
            let following = FeedQuery {
                show_following: true,
                ..FeedQuery::default()
            };

            let before = collections
                .personalised_feed(viewer.clone(), &following)
                .await
                .expect("feed");
            assert!(before.items().is_empty());

            collections
                .follows
                .follow(&reader.id, &followed.id)
                .await
                .expect("follow");

            let after = collections
                .personalised_feed(viewer.clone(), &following)
                .await
                .expect("feed");
            let ids: Vec<PostId> = after.items().iter().map(|item| item.post.id).collect();
            assert_eq!(ids, vec![expected.id]);

            let everyone = collections
                .personalised_feed(viewer, &FeedQuery::default())
                .await
                .expect("feed");
            assert_eq!(everyone.items().len(), 2);
        });
}

#[rstest]
fn collections_validate_before_storing(flow_context: Option<TestContext>) {
    let Some(context) = flow_context else {
        eprintln!("SKIP-TEST-CLUSTER: collections_validate_before_storing skipped");
        return;
    };
    let ada = context.member("ada", Role::Designer);
    let bob = context.member("bob", Role::Contractor);
    let collections = context.collections.clone();
    let validator = Validator::new();

    context
        .store
        .runtime
        .block_on(async {
            let draft = NewPost {
                user_id: ada.id,
                user_role: ada.role,
                title: "Ask @bob and @nobody".to_owned(),
                content: "Thoughts, @bob? cc @nobody".to_owned(),
                tags: vec!["kitchen".to_owned()],
                mentions: Vec::new(),
                images: Vec::new(),
            };
            let post = collections
                .compose_post(&validator, draft)
                .await
                .expect("compose");
            assert_eq!(post.mentions, vec!["bob".to_owned()]);

            let self_review = NewReview {
                rated_user_id: bob.id,
                rater_id: bob.id,
                rater_username: "bob".to_owned(),
                score: 4,
                comment: None,
            };
            let err = collections
                .add_review(&validator, &self_review)
                .await
                .expect_err("self review");
            assert_eq!(err.code(), ErrorCode::InvalidRequest);

            let stored = collections.users.get_by_id(&bob.id).await.expect("bob");
            assert_eq!(stored.rating.rating_count, 0);
        });
}
