/// Event contracts for widget wiring.
pub mod events;
pub mod message_input;
pub mod message_list;
pub mod scroll;
pub mod view;

pub use events::Submit;
pub use message_input::MessageInput;
pub use message_list::MessageList;
pub use scroll::ScrollManager;
pub use view::ChatWidget;
