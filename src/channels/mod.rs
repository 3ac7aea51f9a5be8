//! Platform adapters. Each one implements `ChannelAdapter`.

pub mod gmail;
pub mod slack;
pub mod telegram;
pub mod whatsapp;

pub use gmail::GmailAdapter;
pub use slack::{SlackAdapter, SlackChannel, SlackChannelInfo};
pub use telegram::TelegramAdapter;
pub use whatsapp::WhatsAppAdapter;
