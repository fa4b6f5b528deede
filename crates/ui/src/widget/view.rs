use std::sync::Arc;

use gpui::prelude::FluentBuilder as _;
use gpui::*;
use gpui_component::{
    ActiveTheme, IconName, Sizable,
    button::{Button, ButtonVariants},
    h_flex,
    label::Label,
    v_flex,
};
use gpui_tokio_bridge::Tokio;

use sous_chat::ChatSession;
use sous_llm::{
    CapabilityConfig, CapabilityError, CapabilityResult, DEFAULT_GEMINI_MODEL, GEMINI_PROVIDER_ID,
    GeminiCapability, GenerateRequest, GenerationCapability, create_capability,
};

use crate::settings::{API_KEY_ENV_VAR, MODEL_ENV_VAR, SettingsStore};
use crate::widget::events::Submit;
use crate::widget::message_input::MessageInput;
use crate::widget::message_list::MessageList;

pub const PANEL_WIDTH: Pixels = px(360.);
pub const PANEL_HEIGHT: Pixels = px(480.);
pub const PANEL_TITLE: &str = "Recipe AI Assistant";

/// The floating chat widget: toggle control, panel, and the coordinator
/// that drives one [`ChatSession`] through the request pipeline.
///
/// Capability calls run on the tokio side of the bridge; session state is
/// only touched on the GPUI thread, before the suspension point in
/// `handle_submit` and after it in `finish_exchange`.
pub struct ChatWidget {
    session: ChatSession,
    message_list: Entity<MessageList>,
    message_input: Entity<MessageInput>,
    is_open: bool,
    probe_task: Option<Task<()>>,
    exchange_task: Option<Task<()>>,
}

impl ChatWidget {
    pub fn new(window: &mut Window, cx: &mut Context<Self>) -> Self {
        let message_list = cx.new(MessageList::new);
        let message_input = cx.new(|cx| MessageInput::new(window, cx));

        cx.subscribe(&message_input, |this, _, event: &Submit, cx| {
            this.handle_submit(event.clone(), cx);
        })
        .detach();

        let session = ChatSession::new(Self::initialize_capability());

        let mut this = Self {
            session,
            message_list,
            message_input,
            is_open: false,
            probe_task: None,
            exchange_task: None,
        };

        this.spawn_probe(cx);
        this
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    fn initialize_capability() -> Arc<dyn GenerationCapability> {
        let settings = SettingsStore::load().settings();

        let config = if settings.is_valid() {
            settings.to_capability_config()
        } else {
            Self::config_from_environment()
        };

        match create_capability(config) {
            Ok(capability) => capability,
            Err(error) => {
                tracing::error!(error = %error, "falling back to an unconfigured Gemini capability");
                Arc::new(GeminiCapability::new(CapabilityConfig::new(
                    GEMINI_PROVIDER_ID,
                    "",
                    "",
                )))
            }
        }
    }

    fn config_from_environment() -> CapabilityConfig {
        let api_key = std::env::var(API_KEY_ENV_VAR)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        let model_id = std::env::var(MODEL_ENV_VAR)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string());

        let Some(api_key) = api_key else {
            // Not fatal here: the widget still mounts and the missing
            // credential surfaces as a failed probe or exchange.
            tracing::error!(
                "no API key in settings or {API_KEY_ENV_VAR}; requests will fail until one is configured"
            );
            return CapabilityConfig::new(GEMINI_PROVIDER_ID, "", model_id);
        };

        CapabilityConfig::new(GEMINI_PROVIDER_ID, api_key, model_id)
    }

    fn spawn_probe(&mut self, cx: &mut Context<Self>) {
        let Some(request) = self.session.begin_probe() else {
            return;
        };

        let worker = Self::spawn_generation(self.session.capability(), request, cx);
        self.probe_task = Some(cx.spawn(async move |this, cx| {
            let result = flatten_worker_result(worker.await);
            let _ = this.update(cx, |this, cx| {
                this.finish_probe(result, cx);
            });
        }));
    }

    fn finish_probe(&mut self, result: CapabilityResult<String>, cx: &mut Context<Self>) {
        self.probe_task = None;
        let _ = self.session.complete_probe(result);
        self.sync_messages(cx);
        cx.notify();
    }

    fn handle_submit(&mut self, event: Submit, cx: &mut Context<Self>) {
        let pending = match self.session.begin_submit(&event.content) {
            Ok(pending) => pending,
            Err(rejection) => {
                tracing::debug!(?rejection, "draft submission rejected");
                return;
            }
        };

        self.message_input.update(cx, |input, cx| {
            input.set_loading(true, cx);
        });
        self.sync_messages(cx);

        let worker = Self::spawn_generation(self.session.capability(), pending.request(), cx);
        self.exchange_task = Some(cx.spawn(async move |this, cx| {
            let result = flatten_worker_result(worker.await);
            let _ = this.update(cx, |this, cx| {
                this.finish_exchange(result, cx);
            });
        }));

        cx.notify();
    }

    fn finish_exchange(&mut self, result: CapabilityResult<String>, cx: &mut Context<Self>) {
        self.exchange_task = None;
        let _ = self.session.complete(result);
        self.message_input.update(cx, |input, cx| {
            input.set_loading(false, cx);
        });
        self.sync_messages(cx);
        cx.notify();
    }

    fn spawn_generation(
        capability: Arc<dyn GenerationCapability>,
        request: GenerateRequest,
        cx: &mut Context<Self>,
    ) -> Task<Result<CapabilityResult<String>, gpui_tokio_bridge::JoinError>> {
        Tokio::spawn(cx, async move { capability.generate(request).await })
    }

    fn sync_messages(&mut self, cx: &mut Context<Self>) {
        let messages = self.session.messages().to_vec();
        let is_loading = self.session.is_loading();

        self.message_list.update(cx, |list, cx| {
            list.set_messages(messages, is_loading, cx);
        });
    }

    fn toggle_open(&mut self, cx: &mut Context<Self>) {
        self.is_open = !self.is_open;
        cx.notify();
    }

    fn close(&mut self, cx: &mut Context<Self>) {
        self.is_open = false;
        cx.notify();
    }

    fn render_panel(&self, cx: &Context<Self>) -> AnyElement {
        let theme = cx.theme();

        v_flex()
            .id("chat-widget-panel")
            .w(PANEL_WIDTH)
            .h(PANEL_HEIGHT)
            .rounded_lg()
            .overflow_hidden()
            .border_1()
            .border_color(theme.border)
            .bg(theme.background)
            .shadow_lg()
            .child(
                h_flex()
                    .w_full()
                    .px_3()
                    .py_2()
                    .flex_shrink_0()
                    .items_center()
                    .justify_between()
                    .border_b_1()
                    .border_color(theme.border)
                    .child(Label::new(PANEL_TITLE).text_sm())
                    .child(
                        Button::new("chat-widget-close")
                            .ghost()
                            .small()
                            .icon(IconName::CircleX)
                            .on_click(cx.listener(|this, _, _window, cx| {
                                this.close(cx);
                            })),
                    ),
            )
            .child(
                div()
                    .flex_1()
                    .min_h_0()
                    .child(self.message_list.clone()),
            )
            .child(
                div()
                    .w_full()
                    .flex_shrink_0()
                    .border_t_1()
                    .border_color(theme.border)
                    .child(self.message_input.clone()),
            )
            .into_any_element()
    }

    fn render_toggle(&self, cx: &Context<Self>) -> AnyElement {
        Button::new("chat-widget-toggle")
            .primary()
            .large()
            .icon(IconName::CircleUser)
            .on_click(cx.listener(|this, _, _window, cx| {
                this.toggle_open(cx);
            }))
            .into_any_element()
    }
}

impl Render for ChatWidget {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        v_flex()
            .id("chat-widget")
            .items_end()
            .gap_3()
            .when(self.is_open, |column| column.child(self.render_panel(cx)))
            .child(self.render_toggle(cx))
    }
}

fn flatten_worker_result(
    joined: Result<CapabilityResult<String>, gpui_tokio_bridge::JoinError>,
) -> CapabilityResult<String> {
    joined.unwrap_or_else(|error| {
        Err(CapabilityError::runtime(
            "join-generation-task",
            error.to_string(),
        ))
    })
}
