// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! PostgreSQL implementation of [`Storage`].
//!
//! Every call is bounded by the configured query timeout; the lifecycle
//! units run inside a single transaction that rolls back on any error
//! (the `sqlx` transaction rolls back when dropped uncommitted).

use super::{Storage, StoreError};
use crate::config::DbConfig;
use crate::models::role;
use crate::models::{
    Comment, FeedItem, FeedQuery, NewPost, NewUser, Password, Post, Role, User,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use std::future::Future;
use std::path::Path;
use std::time::Duration;

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

const USER_COLUMNS: &str = "u.id, u.username, u.email, u.password, u.created_at, \
     u.is_active, u.role_id, r.level AS role_level";

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::PoolTimedOut => StoreError::Timeout,
            sqlx::Error::Database(db) => match db.code().as_deref() {
                Some(UNIQUE_VIOLATION) => StoreError::Conflict(db.message().to_string()),
                Some(FOREIGN_KEY_VIOLATION) => StoreError::NotFound,
                _ => StoreError::Backend(err.to_string()),
            },
            _ => StoreError::Backend(err.to_string()),
        }
    }
}

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
    query_timeout: Duration,
}

impl PostgresStore {
    /// Connect a pool and apply pending migrations from `./migrations`.
    pub async fn connect(config: &DbConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.query_timeout)
            .connect(&config.url)
            .await?;

        let migrator = sqlx::migrate::Migrator::new(Path::new("./migrations"))
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to load migrations: {}", e)))?;
        migrator
            .run(&pool)
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to run migrations: {}", e)))?;

        tracing::info!(
            max_connections = config.max_connections,
            "Connected to PostgreSQL"
        );

        Ok(Self::from_pool(pool, config.query_timeout))
    }

    pub fn from_pool(pool: PgPool, query_timeout: Duration) -> Self {
        Self {
            pool,
            query_timeout,
        }
    }

    /// Bound a store call by the per-call deadline.
    async fn deadline<T>(
        &self,
        fut: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        tokio::time::timeout(self.query_timeout, fut)
            .await
            .map_err(|_| StoreError::Timeout)?
    }
}

fn user_from_row(row: &PgRow) -> Result<User, sqlx::Error> {
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        password: Password::from_hash(row.try_get::<String, _>("password")?),
        created_at: row.try_get("created_at")?,
        is_active: row.try_get("is_active")?,
        role_id: row.try_get("role_id")?,
        role_level: row.try_get("role_level")?,
    })
}

fn post_from_row(row: &PgRow) -> Result<Post, sqlx::Error> {
    Ok(Post {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        user_id: row.try_get("user_id")?,
        tags: row.try_get("tags")?,
        version: row.try_get("version")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        comments: Vec::new(),
    })
}

#[async_trait]
impl Storage for PostgresStore {
    async fn create_and_invite(
        &self,
        user: NewUser,
        token_hash: &str,
        expiry: DateTime<Utc>,
    ) -> Result<User, StoreError> {
        self.deadline(async {
            let mut tx = self.pool.begin().await?;

            let role_row = sqlx::query("SELECT id, level FROM roles WHERE name = $1")
                .bind(role::USER)
                .fetch_one(&mut *tx)
                .await?;
            let role_id: i64 = role_row.try_get("id")?;
            let role_level: i32 = role_row.try_get("level")?;

            let row = sqlx::query(
                r#"
                INSERT INTO users (username, email, password, role_id)
                VALUES ($1, $2, $3, $4)
                RETURNING id, created_at
                "#,
            )
            .bind(&user.username)
            .bind(&user.email)
            .bind(user.password.as_hash())
            .bind(role_id)
            .fetch_one(&mut *tx)
            .await?;

            let id: i64 = row.try_get("id")?;
            let created_at: DateTime<Utc> = row.try_get("created_at")?;

            sqlx::query("INSERT INTO user_invitations (token, user_id, expiry) VALUES ($1, $2, $3)")
                .bind(token_hash)
                .bind(id)
                .bind(expiry)
                .execute(&mut *tx)
                .await?;

            tx.commit().await?;

            Ok(User {
                id,
                username: user.username,
                email: user.email,
                password: user.password,
                created_at,
                is_active: false,
                role_id,
                role_level,
            })
        })
        .await
    }

    async fn activate(&self, token_hash: &str, now: DateTime<Utc>) -> Result<i64, StoreError> {
        self.deadline(async {
            let mut tx = self.pool.begin().await?;

            let user_id: i64 = sqlx::query(
                r#"
                SELECT u.id
                FROM users u
                JOIN user_invitations ui ON u.id = ui.user_id
                WHERE ui.token = $1 AND ui.expiry > $2
                FOR UPDATE
                "#,
            )
            .bind(token_hash)
            .bind(now)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(StoreError::NotFound)?
            .try_get("id")?;

            sqlx::query("UPDATE users SET is_active = TRUE WHERE id = $1")
                .bind(user_id)
                .execute(&mut *tx)
                .await?;

            sqlx::query("DELETE FROM user_invitations WHERE user_id = $1")
                .bind(user_id)
                .execute(&mut *tx)
                .await?;

            tx.commit().await?;
            Ok(user_id)
        })
        .await
    }

    async fn delete_user(&self, user_id: i64) -> Result<(), StoreError> {
        self.deadline(async {
            let mut tx = self.pool.begin().await?;

            sqlx::query("DELETE FROM user_invitations WHERE user_id = $1")
                .bind(user_id)
                .execute(&mut *tx)
                .await?;

            let deleted = sqlx::query("DELETE FROM users WHERE id = $1")
                .bind(user_id)
                .execute(&mut *tx)
                .await?
                .rows_affected();

            if deleted == 0 {
                return Err(StoreError::NotFound);
            }

            tx.commit().await?;
            Ok(())
        })
        .await
    }

    async fn get_user_by_id(&self, user_id: i64) -> Result<User, StoreError> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users u JOIN roles r ON r.id = u.role_id \
             WHERE u.id = $1 AND u.is_active = TRUE"
        );
        self.deadline(async {
            let row = sqlx::query(&sql)
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or(StoreError::NotFound)?;
            Ok(user_from_row(&row)?)
        })
        .await
    }

    async fn get_user_by_email(&self, email: &str) -> Result<User, StoreError> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users u JOIN roles r ON r.id = u.role_id \
             WHERE u.email = $1 AND u.is_active = TRUE"
        );
        self.deadline(async {
            let row = sqlx::query(&sql)
                .bind(email)
                .fetch_optional(&self.pool)
                .await?
                .ok_or(StoreError::NotFound)?;
            Ok(user_from_row(&row)?)
        })
        .await
    }

    async fn get_role_by_name(&self, name: &str) -> Result<Role, StoreError> {
        self.deadline(async {
            let row = sqlx::query("SELECT id, name, level, description FROM roles WHERE name = $1")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?
                .ok_or(StoreError::NotFound)?;

            Ok(Role {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                level: row.try_get("level")?,
                description: row.try_get("description")?,
            })
        })
        .await
    }

    async fn follow(&self, user_id: i64, follower_id: i64) -> Result<(), StoreError> {
        self.deadline(async {
            let inserted = sqlx::query(
                r#"
                INSERT INTO followers (user_id, follower_id)
                SELECT $1, $2
                WHERE EXISTS (SELECT 1 FROM users WHERE id = $1 AND is_active)
                "#,
            )
            .bind(user_id)
            .bind(follower_id)
            .execute(&self.pool)
            .await?
            .rows_affected();

            // Pending accounts cannot be followed
            match inserted {
                0 => Err(StoreError::NotFound),
                _ => Ok(()),
            }
        })
        .await
    }

    async fn unfollow(&self, user_id: i64, follower_id: i64) -> Result<(), StoreError> {
        self.deadline(async {
            let removed = sqlx::query("DELETE FROM followers WHERE user_id = $1 AND follower_id = $2")
                .bind(user_id)
                .bind(follower_id)
                .execute(&self.pool)
                .await?
                .rows_affected();

            match removed {
                0 => Err(StoreError::NotFound),
                _ => Ok(()),
            }
        })
        .await
    }

    async fn get_user_feed(
        &self,
        user_id: i64,
        query: &FeedQuery,
    ) -> Result<Vec<FeedItem>, StoreError> {
        let order = query.sort.as_sql();
        let sql = format!(
            r#"
            SELECT p.id, p.user_id, p.title, p.content, p.created_at, p.updated_at,
                   p.version, p.tags, u.username, COUNT(c.id) AS comments_count
            FROM posts p
            LEFT JOIN comments c ON c.post_id = p.id
            LEFT JOIN users u ON p.user_id = u.id
            LEFT JOIN followers f ON f.user_id = p.user_id AND f.follower_id = $1
            WHERE (p.user_id = $1 OR f.user_id IS NOT NULL)
              AND (p.title ILIKE '%' || $4 || '%' OR p.content ILIKE '%' || $4 || '%')
              AND (cardinality($5::text[]) = 0 OR p.tags @> $5::text[])
            GROUP BY p.id, u.username
            ORDER BY p.created_at {order}, p.id {order}
            LIMIT $2 OFFSET $3
            "#
        );

        self.deadline(async {
            let rows = sqlx::query(&sql)
                .bind(user_id)
                .bind(query.limit)
                .bind(query.offset)
                .bind(&query.search)
                .bind(&query.tags)
                .fetch_all(&self.pool)
                .await?;

            rows.iter()
                .map(|row| -> Result<FeedItem, StoreError> {
                    Ok(FeedItem {
                        post: post_from_row(row)?,
                        username: row
                            .try_get::<Option<String>, _>("username")?
                            .unwrap_or_default(),
                        comments_count: row.try_get("comments_count")?,
                    })
                })
                .collect()
        })
        .await
    }

    async fn create_post(&self, post: NewPost) -> Result<Post, StoreError> {
        self.deadline(async {
            let row = sqlx::query(
                r#"
                INSERT INTO posts (title, content, user_id, tags)
                VALUES ($1, $2, $3, $4)
                RETURNING id, title, content, user_id, tags, version, created_at, updated_at
                "#,
            )
            .bind(&post.title)
            .bind(&post.content)
            .bind(post.user_id)
            .bind(&post.tags)
            .fetch_one(&self.pool)
            .await?;
            Ok(post_from_row(&row)?)
        })
        .await
    }

    async fn get_post(&self, post_id: i64) -> Result<Post, StoreError> {
        self.deadline(async {
            let row = sqlx::query(
                r#"
                SELECT id, title, content, user_id, tags, version, created_at, updated_at
                FROM posts WHERE id = $1
                "#,
            )
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)?;
            Ok(post_from_row(&row)?)
        })
        .await
    }

    async fn update_post(&self, post: &Post) -> Result<Post, StoreError> {
        self.deadline(async {
            let row = sqlx::query(
                r#"
                UPDATE posts
                SET title = $1, content = $2, version = version + 1, updated_at = NOW()
                WHERE id = $3 AND version = $4
                RETURNING id, title, content, user_id, tags, version, created_at, updated_at
                "#,
            )
            .bind(&post.title)
            .bind(&post.content)
            .bind(post.id)
            .bind(post.version)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)?;
            Ok(post_from_row(&row)?)
        })
        .await
    }

    async fn delete_post(&self, post_id: i64) -> Result<(), StoreError> {
        self.deadline(async {
            let deleted = sqlx::query("DELETE FROM posts WHERE id = $1")
                .bind(post_id)
                .execute(&self.pool)
                .await?
                .rows_affected();

            match deleted {
                0 => Err(StoreError::NotFound),
                _ => Ok(()),
            }
        })
        .await
    }

    async fn get_comments_for_post(&self, post_id: i64) -> Result<Vec<Comment>, StoreError> {
        self.deadline(async {
            let rows = sqlx::query(
                r#"
                SELECT c.id, c.post_id, c.user_id, c.content, c.created_at, u.username
                FROM comments c
                JOIN users u ON u.id = c.user_id
                WHERE c.post_id = $1
                ORDER BY c.created_at DESC, c.id DESC
                "#,
            )
            .bind(post_id)
            .fetch_all(&self.pool)
            .await?;

            rows.iter()
                .map(|row| -> Result<Comment, StoreError> {
                    Ok(Comment {
                        id: row.try_get("id")?,
                        post_id: row.try_get("post_id")?,
                        user_id: row.try_get("user_id")?,
                        username: row.try_get("username")?,
                        content: row.try_get("content")?,
                        created_at: row.try_get("created_at")?,
                    })
                })
                .collect()
        })
        .await
    }
}
