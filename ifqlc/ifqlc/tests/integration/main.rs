mod error_messages;
mod importer;
mod json;
mod queries;
mod row_compiler;
