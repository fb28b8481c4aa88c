//! User registry. Authentication and session handling live outside this
//! crate; the domain only needs identities, roles and notification
//! addresses.

use std::sync::Arc;
use tracing::info;

use crate::domain::commands::users::{CreateUserCommand, CreateUserResult};
use crate::domain::errors::{Error, Result};
use crate::domain::models::User;
use crate::storage::csv::{CsvConnection, UserRepository};
use crate::storage::traits::UserStorage;

#[derive(Clone)]
pub struct UserService {
    user_repository: UserRepository,
}

impl UserService {
    pub fn new(connection: Arc<CsvConnection>) -> Self {
        Self {
            user_repository: UserRepository::new((*connection).clone()),
        }
    }

    pub fn create_user(&self, command: CreateUserCommand) -> Result<CreateUserResult> {
        info!("Creating user: {:?}", command.username);

        let username = command.username.trim();
        if username.len() < 3 || username.len() > 30 {
            return Err(Error::Validation(
                "Username must be between 3 and 30 characters".to_string(),
            ));
        }
        if !command.email.contains('@') {
            return Err(Error::Validation(format!(
                "Invalid email address: {}",
                command.email
            )));
        }
        if self.user_repository.get_user_by_username(username)?.is_some() {
            return Err(Error::Validation(format!(
                "Username '{}' is already taken",
                username
            )));
        }

        let user = User {
            id: User::generate_id(),
            username: username.to_string(),
            email: command.email,
            role: command.role,
        };
        self.user_repository.store_user(&user)?;

        info!("Successfully created user: {}", user.id);
        Ok(CreateUserResult {
            user,
            success_message: "User created successfully".to_string(),
        })
    }

    pub fn get_user(&self, user_id: &str) -> Result<User> {
        self.user_repository
            .get_user(user_id)?
            .ok_or_else(|| Error::NotFound(format!("User {}", user_id)))
    }

    pub fn list_users(&self) -> Result<Vec<User>> {
        Ok(self.user_repository.list_users()?)
    }
}
