//! Local task store for dayplan

mod connection;
mod migrations;
mod repository;

pub use connection::Database;
pub use repository::{LibSqlTaskRepository, StatusCounts, TaskRepository};

pub(crate) use repository::{integer_or_null, text_or_null};
