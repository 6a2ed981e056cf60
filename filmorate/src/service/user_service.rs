//! User accounts and the symmetric friendship graph.

use std::sync::Arc;

use chrono::NaiveDate;

use super::validation::{require_positive_id, validate_user};
use crate::error::{CatalogError, CatalogResult};
use crate::model::{User, UserId};
use crate::persistence::UserRepository;

fn system_today() -> NaiveDate {
    chrono::Utc::now().date_naive()
}

pub struct UserService<U> {
    users: Arc<U>,
    today: fn() -> NaiveDate,
}

impl<U: UserRepository> UserService<U> {
    pub fn new(users: Arc<U>) -> Self {
        Self::with_clock(users, system_today)
    }

    /// Use `today` instead of the system clock when checking birthdays.
    pub fn with_clock(users: Arc<U>, today: fn() -> NaiveDate) -> Self {
        Self { users, today }
    }

    pub async fn list_users(&self) -> CatalogResult<Vec<User>> {
        Ok(self.users.list_users().await?)
    }

    pub async fn get_user(&self, id: UserId) -> CatalogResult<User> {
        self.require_user(id)
            .await
            .inspect_err(|e| tracing::debug!(user_id = %id, error = %e, "get_user rejected"))
    }

    pub async fn create_user(&self, user: User) -> CatalogResult<User> {
        self.try_create(user)
            .await
            .inspect(|created| {
                tracing::info!(user_id = ?created.id, login = %created.login, "user created")
            })
            .inspect_err(|e| tracing::debug!(error = %e, "create_user rejected"))
    }

    /// Replace a user's scalar fields. Friends carried by `user` are ignored.
    pub async fn update_user(&self, user: User) -> CatalogResult<User> {
        let requested = user.id;
        self.try_update(user)
            .await
            .inspect(|updated| tracing::info!(user_id = ?updated.id, "user updated"))
            .inspect_err(|e| {
                tracing::debug!(user_id = ?requested, error = %e, "update_user rejected")
            })
    }

    /// Delete a user together with their likes and friendships.
    pub async fn delete_user(&self, id: UserId) -> CatalogResult<()> {
        self.require_user(id).await?;
        self.users.delete_user(id).await?;
        tracing::info!(user_id = %id, "user deleted");
        Ok(())
    }

    /// Befriend both users and return `user_id` as it is afterwards.
    pub async fn add_friend(&self, user_id: UserId, friend_id: UserId) -> CatalogResult<User> {
        self.require_pair(user_id, friend_id)
            .await
            .inspect_err(|e| {
                tracing::debug!(%user_id, %friend_id, error = %e, "add_friend rejected")
            })?;
        self.users.add_friend(user_id, friend_id).await?;
        tracing::info!(%user_id, %friend_id, "friendship added");
        self.require_user(user_id).await
    }

    /// End the friendship in both directions and return `user_id` as it is
    /// afterwards. Ending a friendship that does not exist succeeds.
    pub async fn remove_friend(&self, user_id: UserId, friend_id: UserId) -> CatalogResult<User> {
        self.require_pair(user_id, friend_id)
            .await
            .inspect_err(|e| {
                tracing::debug!(%user_id, %friend_id, error = %e, "remove_friend rejected")
            })?;
        self.users.remove_friend(user_id, friend_id).await?;
        tracing::info!(%user_id, %friend_id, "friendship removed");
        self.require_user(user_id).await
    }

    pub async fn friends(&self, id: UserId) -> CatalogResult<Vec<User>> {
        self.require_user(id).await?;
        Ok(self.users.friends_of(id).await?)
    }

    /// Users who are friends of both `id` and `other_id`.
    pub async fn common_friends(&self, id: UserId, other_id: UserId) -> CatalogResult<Vec<User>> {
        self.require_pair(id, other_id).await?;
        Ok(self.users.common_friends(id, other_id).await?)
    }

    async fn try_create(&self, mut user: User) -> CatalogResult<User> {
        if let Some(id) = user.id {
            return Err(CatalogError::validation(format!(
                "a new user must not carry an id, got {id}"
            )));
        }
        validate_user(&mut user, (self.today)())?;
        Ok(self.users.create_user(&user).await?)
    }

    async fn try_update(&self, mut user: User) -> CatalogResult<User> {
        let id = user
            .id
            .ok_or_else(|| CatalogError::validation("user id must be provided for update"))?;
        require_positive_id("user", id.0)?;
        validate_user(&mut user, (self.today)())?;
        self.require_user(id).await?;
        Ok(self.users.update_user(id, &user).await?)
    }

    async fn require_user(&self, id: UserId) -> CatalogResult<User> {
        require_positive_id("user", id.0)?;
        self.users
            .get_user(id)
            .await?
            .ok_or(CatalogError::NotFound {
                entity: "user",
                id: id.0,
            })
    }

    /// Both users must exist and be distinct.
    async fn require_pair(&self, id: UserId, other_id: UserId) -> CatalogResult<()> {
        self.require_user(id).await?;
        self.require_user(other_id).await?;
        if id == other_id {
            return Err(CatalogError::invalid_relation(format!(
                "user {id} cannot be related to themselves"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::sqlite::{Database, SqliteUserRepository};
    use crate::persistence::MemoryStore;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn fixed_today() -> NaiveDate {
        date(2024, 6, 1)
    }

    fn service() -> UserService<MemoryStore> {
        UserService::with_clock(Arc::new(MemoryStore::new()), fixed_today)
    }

    async fn create(service: &UserService<impl UserRepository>, login: &str) -> UserId {
        service
            .create_user(User::new(format!("{login}@mail.io"), login, "", date(1990, 3, 4)))
            .await
            .unwrap()
            .id
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_fills_name_from_login() {
        let service = service();
        let created = service
            .create_user(User::new("neo@matrix.io", "neo", " ", date(1964, 9, 2)))
            .await
            .unwrap();
        assert_eq!(created.id, Some(UserId(1)));
        assert_eq!(created.name, "neo");
    }

    #[tokio::test]
    async fn test_create_rejects_future_birthday_and_bad_login() {
        let service = service();
        let unborn = User::new("a@b.c", "unborn", "", date(2024, 6, 2));
        assert!(matches!(
            service.create_user(unborn).await,
            Err(CatalogError::Validation(_))
        ));
        let spaced = User::new("a@b.c", "the one", "", date(1990, 1, 1));
        assert!(matches!(
            service.create_user(spaced).await,
            Err(CatalogError::Validation(_))
        ));
        assert!(service.list_users().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update() {
        let service = service();
        let id = create(&service, "trinity").await;

        let mut changed = service.get_user(id).await.unwrap();
        changed.email = "t@zion.io".to_string();
        changed.name = String::new();
        let updated = service.update_user(changed).await.unwrap();
        assert_eq!(updated.email, "t@zion.io");
        assert_eq!(updated.name, "trinity");

        let mut missing = updated.clone();
        missing.id = Some(UserId(9));
        assert!(matches!(
            service.update_user(missing).await,
            Err(CatalogError::NotFound { entity: "user", id: 9 })
        ));

        let mut anonymous = updated;
        anonymous.id = None;
        assert!(matches!(
            service.update_user(anonymous).await,
            Err(CatalogError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_friendship_returns_subject() {
        let service = service();
        let neo = create(&service, "neo").await;
        let tank = create(&service, "tank").await;

        let after = service.add_friend(neo, tank).await.unwrap();
        assert_eq!(after.id, Some(neo));
        assert!(after.friends.contains(&tank));
        assert!(service.get_user(tank).await.unwrap().friends.contains(&neo));

        let after = service.remove_friend(tank, neo).await.unwrap();
        assert!(after.friends.is_empty());
        assert!(service.friends(neo).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_self_relations_rejected() {
        let service = service();
        let neo = create(&service, "neo").await;
        for result in [
            service.add_friend(neo, neo).await.map(|_| ()),
            service.remove_friend(neo, neo).await.map(|_| ()),
            service.common_friends(neo, neo).await.map(|_| ()),
        ] {
            assert!(matches!(result, Err(CatalogError::InvalidRelation(_))));
        }
    }

    #[tokio::test]
    async fn test_existence_checked_before_distinctness() {
        let service = service();
        assert!(matches!(
            service.add_friend(UserId(3), UserId(3)).await,
            Err(CatalogError::NotFound { entity: "user", id: 3 })
        ));
        assert!(matches!(
            service.add_friend(UserId(-1), UserId(2)).await,
            Err(CatalogError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_common_friends_on_sqlite() {
        let db = Database::new_in_memory().await.unwrap();
        let service = UserService::with_clock(
            Arc::new(SqliteUserRepository::new(db.pool().clone())),
            fixed_today,
        );
        let a = create(&service, "a").await;
        let b = create(&service, "b").await;
        let c = create(&service, "c").await;
        service.add_friend(a, c).await.unwrap();
        service.add_friend(b, c).await.unwrap();

        let common = service.common_friends(a, b).await.unwrap();
        assert_eq!(common.iter().map(|u| u.id).collect::<Vec<_>>(), vec![Some(c)]);

        service.delete_user(c).await.unwrap();
        assert!(service.common_friends(a, b).await.unwrap().is_empty());
        assert!(matches!(
            service.friends(c).await,
            Err(CatalogError::NotFound { entity: "user", .. })
        ));
    }
}
