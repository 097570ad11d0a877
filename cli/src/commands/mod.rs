pub mod audit;
pub mod catalog;
pub mod check;
pub mod health;
pub mod password;
pub mod users;
