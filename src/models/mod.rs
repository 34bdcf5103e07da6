pub mod telegram;
pub mod task;
pub mod price_alert;
pub mod alpha_event;

pub use telegram::{CallbackQuery, Chat, InlineKeyboardButton, InlineKeyboardMarkup, Message, Update};
pub use task::{Task, TaskKind};
pub use price_alert::PriceAlert;
pub use alpha_event::AlphaEvent;
