pub mod admin_form;
pub mod app_settings;
pub mod app_state;
pub mod chat;
pub mod messages;
pub mod network;
pub mod refresher;
