use crate::domain_model::UserId;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountUser {
    pub user_id: UserId,
    pub email: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password: String,
    pub address: String,
}
