pub mod message;
pub mod room;
pub mod user;

pub use message::{Message, MessageKind, NewMessage};
pub use room::{RoomKey, RoomKind};
pub use user::User;
