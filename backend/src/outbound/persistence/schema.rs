//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `backend/migrations` exactly. When a
//! migration changes the schema, update this file to match (`diesel
//! print-schema` can generate it from a live database).

diesel::table! {
    /// Accounts. `username` and `email` carry unique constraints.
    users (id) {
        id -> Uuid,
        username -> Varchar,
        email -> Varchar,
        password_hash -> Text,
        role -> Varchar,
        /// Nested profile document (bio, location, contact).
        profile -> Jsonb,
        total_rating -> Int8,
        rating_count -> Int8,
        is_active -> Bool,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Pending activations, one per account.
    invites (user_id) {
        user_id -> Uuid,
        /// SHA-256 hex digest of the emailed token.
        token_hash -> Text,
        created_at -> Timestamptz,
        expires_at -> Timestamptz,
    }
}

diesel::table! {
    /// Posts with denormalised like and comment counters.
    posts (id) {
        id -> Uuid,
        user_id -> Uuid,
        user_role -> Varchar,
        title -> Varchar,
        content -> Text,
        tags -> Array<Text>,
        mentions -> Array<Text>,
        images -> Array<Text>,
        like_by -> Array<Uuid>,
        like_count -> Int8,
        comment_count -> Int8,
        version -> Int8,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    comments (id) {
        id -> Uuid,
        user_id -> Uuid,
        post_id -> Uuid,
        parent_id -> Nullable<Uuid>,
        content -> Varchar,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    reviews (id) {
        id -> Uuid,
        rated_user_id -> Uuid,
        rater_id -> Uuid,
        rater_username -> Varchar,
        score -> Int4,
        comment -> Nullable<Text>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Directed follow edges, unique per pair.
    follows (id) {
        id -> Uuid,
        follower_id -> Uuid,
        followee_id -> Uuid,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(invites -> users (user_id));
diesel::joinable!(posts -> users (user_id));
diesel::joinable!(comments -> posts (post_id));
diesel::joinable!(reviews -> users (rated_user_id));

diesel::allow_tables_to_appear_in_same_query!(users, invites, posts, comments, reviews, follows);
