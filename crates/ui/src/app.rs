use gpui::*;
use gpui_component::ActiveTheme;

use crate::widget::ChatWidget;

gpui::actions!(shell, [Quit]);

/// Margin between the widget and the window edges.
const WIDGET_INSET: Pixels = px(24.);

/// Stand-in for the hosting page: an empty surface with the chat widget
/// floating in its bottom-right corner. Everything interesting lives in
/// [`ChatWidget`]; this shell only mounts it.
pub struct WidgetShell {
    chat_widget: Entity<ChatWidget>,
}

impl WidgetShell {
    pub fn new(window: &mut Window, cx: &mut Context<Self>) -> Self {
        let chat_widget = cx.new(|cx| ChatWidget::new(window, cx));

        Self { chat_widget }
    }
}

impl Render for WidgetShell {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        let theme = cx.theme();

        div()
            .size_full()
            .relative()
            .bg(theme.background)
            .child(
                div()
                    .absolute()
                    .bottom(WIDGET_INSET)
                    .right(WIDGET_INSET)
                    .child(self.chat_widget.clone()),
            )
    }
}
