pub mod auth;
pub mod comments;
pub mod files;
pub mod projects;
pub mod tasks;
