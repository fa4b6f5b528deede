use gpui::prelude::FluentBuilder as _;
use gpui::*;
use gpui_component::{ActiveTheme, h_flex, label::Label, text::TextView, v_flex};

use sous_chat::{Message, Sender};

use crate::widget::scroll::ScrollManager;

const USER_BUBBLE_MAX_WIDTH: Pixels = px(260.);
pub const LOADING_ROW_TEXT: &str = "Cooking up a response...";
const BOT_SPEAKER_LABEL: &str = "Recipe Assistant";

/// Scrollable, sender-styled rendering of the conversation, with a loading
/// row appended while an exchange is in flight.
pub struct MessageList {
    messages: Vec<Message>,
    is_loading: bool,
    scroll: ScrollManager,
}

impl MessageList {
    pub fn new(_cx: &mut Context<Self>) -> Self {
        Self {
            messages: Vec::new(),
            is_loading: false,
            scroll: ScrollManager::new(),
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn set_messages(
        &mut self,
        messages: Vec<Message>,
        is_loading: bool,
        cx: &mut Context<Self>,
    ) {
        let grew = messages.len() > self.messages.len();

        self.messages = messages;
        self.is_loading = is_loading;

        if grew || is_loading {
            self.scroll.request_scroll_to_bottom_if_following();
        }

        cx.notify();
    }

    fn render_row(
        &self,
        message: &Message,
        index: usize,
        window: &mut Window,
        cx: &mut Context<Self>,
    ) -> AnyElement {
        let theme = cx.theme();

        match message.sender {
            Sender::User => v_flex()
                .w_full()
                .items_end()
                .child(
                    div()
                        .max_w(USER_BUBBLE_MAX_WIDTH)
                        .px_3()
                        .py_2()
                        .rounded_lg()
                        .bg(theme.accent)
                        .text_color(theme.accent_foreground)
                        .child(Label::new(message.text.clone()).text_sm()),
                )
                .into_any_element(),
            Sender::Bot => v_flex()
                .w_full()
                .gap_1()
                .child(
                    Label::new(BOT_SPEAKER_LABEL)
                        .text_xs()
                        .text_color(theme.foreground.opacity(0.5)),
                )
                .child(
                    TextView::markdown(
                        ElementId::Name(SharedString::from(format!("bot-markdown-{index}"))),
                        message.text.clone(),
                        window,
                        cx,
                    )
                    .selectable(true),
                )
                .into_any_element(),
        }
    }

    fn render_loading_row(&self, cx: &Context<Self>) -> AnyElement {
        let theme = cx.theme();

        h_flex()
            .w_full()
            .gap_2()
            .items_center()
            .child(div().size(px(8.)).rounded_full().bg(theme.primary))
            .child(
                Label::new(LOADING_ROW_TEXT)
                    .text_xs()
                    .text_color(theme.foreground.opacity(0.65)),
            )
            .into_any_element()
    }
}

impl Render for MessageList {
    fn render(&mut self, window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        self.scroll.update_follow_state();
        self.scroll.apply_pending_scroll();

        let rows = self
            .messages
            .iter()
            .enumerate()
            .map(|(index, message)| self.render_row(message, index, window, cx))
            .collect::<Vec<_>>();
        let is_loading = self.is_loading;

        div()
            .id("message-list")
            .size_full()
            .min_h_0()
            .overflow_y_scroll()
            .track_scroll(self.scroll.handle())
            .child(
                v_flex()
                    .w_full()
                    .px_3()
                    .py_3()
                    .gap_3()
                    .children(rows)
                    .when(is_loading, |column| {
                        column.child(self.render_loading_row(cx))
                    }),
            )
    }
}
