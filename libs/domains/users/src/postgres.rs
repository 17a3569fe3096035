use async_trait::async_trait;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, Order, QueryFilter,
    QueryOrder, SqlErr,
};
use uuid::Uuid;

use crate::{
    entity::{auth_token, user},
    error::{UniqueField, UserError, UserResult},
    models::{OrderField, OrderTerm, User, UserFilter},
    repository::UserRepository,
    tokens::{AuthToken, TokenStore},
};

/// Maps a unique-constraint violation back to the column it guards.
///
/// Constraint names are the Postgres defaults for inline `UNIQUE`
/// (`users_username_key`, `users_email_key`).
fn map_write_error(err: DbErr) -> UserError {
    if let Some(SqlErr::UniqueConstraintViolation(detail)) = err.sql_err() {
        if detail.contains("users_username_key") {
            return UserError::Duplicate(UniqueField::Username);
        }
        if detail.contains("users_email_key") {
            return UserError::Duplicate(UniqueField::Email);
        }
    }
    UserError::Database(err)
}

fn column_for(field: OrderField) -> user::Column {
    match field {
        OrderField::Username => user::Column::Username,
        OrderField::Email => user::Column::Email,
        OrderField::FirstName => user::Column::FirstName,
        OrderField::LastName => user::Column::LastName,
    }
}

pub struct PgUserRepository {
    db: DatabaseConnection,
}

impl PgUserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, input: User) -> UserResult<User> {
        let active_model: user::ActiveModel = input.into();

        let model = active_model
            .insert(&self.db)
            .await
            .map_err(map_write_error)?;

        tracing::info!(user_id = %model.id, username = %model.username, "Created user");
        Ok(model.into())
    }

    async fn get_by_id(&self, id: Uuid) -> UserResult<Option<User>> {
        let model = user::Entity::find_by_id(id).one(&self.db).await?;
        Ok(model.map(Into::into))
    }

    async fn list(&self, filter: UserFilter, ordering: &[OrderTerm]) -> UserResult<Vec<User>> {
        let mut query = user::Entity::find();

        if let Some(username) = filter.username {
            query = query.filter(user::Column::Username.eq(username));
        }
        if let Some(email) = filter.email {
            query = query.filter(user::Column::Email.eq(email));
        }
        if let Some(first_name) = filter.first_name {
            query = query.filter(user::Column::FirstName.eq(first_name));
        }
        if let Some(last_name) = filter.last_name {
            query = query.filter(user::Column::LastName.eq(last_name));
        }

        for term in ordering {
            let order = if term.descending {
                Order::Desc
            } else {
                Order::Asc
            };
            query = query.order_by(column_for(term.field), order);
        }
        // v7 ids sort by creation time
        query = query.order_by_asc(user::Column::Id);

        let models = query.all(&self.db).await?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn update(&self, input: User) -> UserResult<User> {
        let id = input.id;
        let active_model: user::ActiveModel = input.into();

        let model = active_model
            .update(&self.db)
            .await
            .map_err(|e| match e {
                DbErr::RecordNotUpdated => UserError::NotFound(id),
                other => map_write_error(other),
            })?;

        tracing::info!(user_id = %model.id, "Updated user");
        Ok(model.into())
    }

    async fn delete(&self, id: Uuid) -> UserResult<bool> {
        let result = user::Entity::delete_by_id(id).exec(&self.db).await?;

        if result.rows_affected > 0 {
            tracing::info!(user_id = %id, "Deleted user");
        }

        Ok(result.rows_affected > 0)
    }

    async fn is_taken(
        &self,
        field: UniqueField,
        value: &str,
        exclude: Option<Uuid>,
    ) -> UserResult<bool> {
        let column = match field {
            UniqueField::Username => user::Column::Username,
            UniqueField::Email => user::Column::Email,
        };

        let mut query = user::Entity::find().filter(column.eq(value));
        if let Some(id) = exclude {
            query = query.filter(user::Column::Id.ne(id));
        }

        Ok(query.one(&self.db).await?.is_some())
    }
}

pub struct PgTokenStore {
    db: DatabaseConnection,
}

impl PgTokenStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn find_by_user(&self, user_id: Uuid) -> UserResult<Option<AuthToken>> {
        let model = auth_token::Entity::find()
            .filter(auth_token::Column::UserId.eq(user_id))
            .one(&self.db)
            .await?;
        Ok(model.map(Into::into))
    }
}

#[async_trait]
impl TokenStore for PgTokenStore {
    async fn get_or_create(&self, user_id: Uuid) -> UserResult<AuthToken> {
        if let Some(existing) = self.find_by_user(user_id).await? {
            return Ok(existing);
        }

        let candidate = AuthToken::generate(user_id);
        let active_model = auth_token::ActiveModel {
            key: sea_orm::ActiveValue::Set(candidate.key),
            user_id: sea_orm::ActiveValue::Set(candidate.user_id),
            created_at: sea_orm::ActiveValue::Set(candidate.created_at.into()),
        };

        // A concurrent request may have issued one in between; keep theirs.
        auth_token::Entity::insert(active_model)
            .on_conflict(
                OnConflict::column(auth_token::Column::UserId)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        self.find_by_user(user_id).await?.ok_or_else(|| {
            UserError::Internal(format!("Token for user {} vanished after insert", user_id))
        })
    }

    async fn user_for_token(&self, key: &str) -> UserResult<Option<Uuid>> {
        let model = auth_token::Entity::find_by_id(key.to_string())
            .one(&self.db)
            .await?;
        Ok(model.map(|m| m.user_id))
    }

    async fn revoke(&self, user_id: Uuid) -> UserResult<()> {
        auth_token::Entity::delete_many()
            .filter(auth_token::Column::UserId.eq(user_id))
            .exec(&self.db)
            .await?;
        Ok(())
    }
}
