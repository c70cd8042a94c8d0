pub mod content_db_operations;
