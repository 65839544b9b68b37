//! PostgreSQL repository implementations.

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
};
use uuid::Uuid;

use quill_core::domain::{Page, PageRequest, Post, PostWithAuthor, User};
use quill_core::error::RepoError;
use quill_core::ports::{PostRepository, UserRepository};

use super::entity::post::{self, Entity as PostEntity};
use super::entity::user::{self, Entity as UserEntity};
use super::postgres_base::{PostgresBaseRepository, map_db_err};

/// PostgreSQL user repository.
pub type PostgresUserRepository = PostgresBaseRepository<UserEntity>;

/// PostgreSQL post repository.
pub type PostgresPostRepository = PostgresBaseRepository<PostEntity>;

/// Mask an email for logging to avoid PII in logs.
fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => {
            let first = local.chars().next();
            match first {
                Some(c) if local.chars().count() > 1 => format!("{c}***@{domain}"),
                _ => format!("***@{domain}"),
            }
        }
        None => "***".to_string(),
    }
}

/// Join a post row with its owner row, which the foreign key guarantees.
fn with_author(row: (post::Model, Option<user::Model>)) -> Result<PostWithAuthor, RepoError> {
    let (post, owner) = row;
    let owner = owner.ok_or_else(|| {
        RepoError::Constraint(format!("post {} has no owner row", post.id))
    })?;

    Ok(PostWithAuthor {
        post: post.into(),
        author: owner.into_author(),
    })
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        tracing::debug!(user_email = %mask_email(email), "Finding user by email");

        let result = UserEntity::find()
            .filter(user::Column::Email.eq(email))
            .one(self.conn())
            .await
            .map_err(map_db_err)?;

        Ok(result.map(Into::into))
    }

    async fn insert(&self, user: User) -> Result<User, RepoError> {
        let model = user::ActiveModel::from(user)
            .insert(self.conn())
            .await
            .map_err(map_db_err)?;

        Ok(model.into())
    }
}

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn insert(&self, post: Post) -> Result<Post, RepoError> {
        let model = post::ActiveModel::from(post)
            .insert(self.conn())
            .await
            .map_err(map_db_err)?;

        Ok(model.into())
    }

    async fn update(&self, post: Post) -> Result<Post, RepoError> {
        let model = post::revision(post)
            .update(self.conn())
            .await
            .map_err(map_db_err)?;

        Ok(model.into())
    }

    async fn find_with_author(&self, id: Uuid) -> Result<Option<PostWithAuthor>, RepoError> {
        PostEntity::find_by_id(id)
            .find_also_related(UserEntity)
            .one(self.conn())
            .await
            .map_err(map_db_err)?
            .map(with_author)
            .transpose()
    }

    async fn paginate_with_authors(
        &self,
        request: PageRequest,
    ) -> Result<Page<PostWithAuthor>, RepoError> {
        let paginator = PostEntity::find()
            .find_also_related(UserEntity)
            .order_by_asc(post::Column::CreatedAt)
            .order_by_asc(post::Column::Id)
            .paginate(self.conn(), request.per_page);

        let total_items = paginator.num_items().await.map_err(map_db_err)?;

        // Past the last page there is nothing to fetch, and the offset of a
        // huge page number would overflow inside the paginator.
        if request.page > total_items.div_ceil(request.per_page) {
            return Ok(Page::new(Vec::new(), request, total_items));
        }

        let rows = paginator
            .fetch_page(request.index())
            .await
            .map_err(map_db_err)?;

        let items = rows
            .into_iter()
            .map(with_author)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page::new(items, request, total_items))
    }
}
