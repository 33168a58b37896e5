pub mod import;
pub mod settings;
pub mod upload_error;
