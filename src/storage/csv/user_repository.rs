//! CSV-based user repository. Users are store-wide, so they live in a
//! single `users.csv` at the root of the data directory.

use anyhow::Result;
use csv::{Reader, Writer};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::connection::CsvConnection;
use crate::domain::models::{Role, User};
use crate::storage::traits::UserStorage;

const USERS_HEADER: &str = "id,username,email,role";

/// CSV record structure for users
#[derive(Debug, Clone, Serialize, Deserialize)]
struct UserRecord {
    id: String,
    username: String,
    email: String,
    role: String,
}

impl From<&User> for UserRecord {
    fn from(user: &User) -> Self {
        UserRecord {
            id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role.as_str().to_string(),
        }
    }
}

impl TryFrom<UserRecord> for User {
    type Error = anyhow::Error;

    fn try_from(record: UserRecord) -> Result<Self> {
        let role = Role::from_string(&record.role)
            .map_err(|e| anyhow::anyhow!("Failed to parse user role: {}", e))?;

        Ok(User {
            id: record.id,
            username: record.username,
            email: record.email,
            role,
        })
    }
}

#[derive(Clone)]
pub struct UserRepository {
    connection: CsvConnection,
}

impl UserRepository {
    pub fn new(connection: CsvConnection) -> Self {
        Self { connection }
    }

    fn read_users(&self) -> Result<Vec<User>> {
        let path = self.connection.users_file_path();
        self.connection.ensure_file_exists(&path, USERS_HEADER)?;

        let mut reader = Reader::from_path(&path)?;
        let mut users = Vec::new();

        for result in reader.deserialize::<UserRecord>() {
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    warn!("Failed to read user record: {}. Skipping.", e);
                    continue;
                }
            };
            match User::try_from(record) {
                Ok(user) => users.push(user),
                Err(e) => warn!("Failed to parse user record: {}. Skipping.", e),
            }
        }

        Ok(users)
    }

    fn write_users(&self, users: &[User]) -> Result<()> {
        let mut writer = Writer::from_writer(Vec::new());
        for user in users {
            writer.serialize(UserRecord::from(user))?;
        }
        let data = writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Failed to flush users CSV: {}", e))?;

        self.connection
            .write_atomic(&self.connection.users_file_path(), &data)
    }
}

impl UserStorage for UserRepository {
    fn store_user(&self, user: &User) -> Result<()> {
        let mut users = self.read_users()?;
        users.push(user.clone());
        self.write_users(&users)
    }

    fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        Ok(self.read_users()?.into_iter().find(|u| u.id == user_id))
    }

    fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self
            .read_users()?
            .into_iter()
            .find(|u| u.username == username))
    }

    fn list_users(&self) -> Result<Vec<User>> {
        let mut users = self.read_users()?;
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }
}
