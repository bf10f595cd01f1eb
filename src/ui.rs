use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use gpui::{
    App, AppContext, Context, FocusHandle, InteractiveElement, IntoElement, KeyDownEvent,
    ObjectFit, ParentElement, Render, RenderImage, Styled, StyledImage, TitlebarOptions, Window,
    WindowOptions, div, img,
};
use gpui_component::Root;
use image::{Frame as ImageFrame, RgbaImage};

const QUIT_KEY: &str = "q";

pub fn launch_ui(
    app: &mut App,
    title: &'static str,
    frame_rx: Receiver<RgbaImage>,
    quit_tx: Sender<()>,
) -> gpui::Result<()> {
    let window_options = WindowOptions {
        titlebar: Some(TitlebarOptions {
            title: Some(title.into()),
            ..Default::default()
        }),
        ..Default::default()
    };

    app.open_window(window_options, move |window, app| {
        let view = app.new(|cx| DisplayView::new(frame_rx, quit_tx, cx));
        app.new(|cx| Root::new(view, window, cx))
    })?;

    app.on_window_closed(|cx| cx.quit()).detach();

    Ok(())
}

/// Shows the newest annotated frame from the capture thread.
struct DisplayView {
    frame_rx: Option<Receiver<RgbaImage>>,
    quit_tx: Sender<()>,
    latest_image: Option<Arc<RenderImage>>,
    focus_handle: FocusHandle,
    focused: bool,
}

impl DisplayView {
    fn new(frame_rx: Receiver<RgbaImage>, quit_tx: Sender<()>, cx: &mut Context<'_, Self>) -> Self {
        Self {
            frame_rx: Some(frame_rx),
            quit_tx,
            latest_image: None,
            focus_handle: cx.focus_handle(),
            focused: false,
        }
    }

    fn on_key_down(&mut self, event: &KeyDownEvent, _: &mut Window, cx: &mut Context<'_, Self>) {
        if event.keystroke.key.eq_ignore_ascii_case(QUIT_KEY) {
            log::info!("quit key pressed");
            let _ = self.quit_tx.send(());
            // unblocks a capture thread waiting to hand over a frame
            self.frame_rx = None;
            cx.quit();
        }
    }

    /// Pulls every pending frame, keeping only the newest.
    fn poll_frames(&mut self, window: &mut Window, cx: &mut Context<'_, Self>) {
        let Some(frame_rx) = self.frame_rx.as_ref() else {
            return;
        };
        let mut newest = None;
        loop {
            match frame_rx.try_recv() {
                Ok(frame) => newest = Some(frame),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    log::info!("capture stopped, closing window");
                    cx.quit();
                    break;
                }
            }
        }

        if let Some(image) = newest.and_then(to_render_image) {
            self.replace_latest_image(image, window, cx);
        }
    }

    fn replace_latest_image(
        &mut self,
        new_image: Arc<RenderImage>,
        window: &mut Window,
        cx: &mut Context<'_, Self>,
    ) {
        if let Some(old_image) = self.latest_image.replace(new_image) {
            // Without this the sprite atlas keeps every frame.
            cx.drop_image(old_image, Some(window));
        }
    }
}

impl Render for DisplayView {
    fn render(&mut self, window: &mut Window, cx: &mut Context<'_, Self>) -> impl IntoElement {
        if !self.focused {
            self.focus_handle.focus(window);
            self.focused = true;
        }

        cx.defer_in(window, |_, _, cx| {
            cx.notify();
        });
        self.poll_frames(window, cx);

        let mut root = div()
            .size_full()
            .bg(gpui::rgb(0x000000))
            .track_focus(&self.focus_handle)
            .on_key_down(cx.listener(Self::on_key_down));

        if let Some(image) = self.latest_image.as_ref() {
            root = root.child(img(image.clone()).size_full().object_fit(ObjectFit::Contain));
        }

        root
    }
}

/// GPUI expects BGRA; swap in place instead of going through the asset pipeline.
fn to_render_image(mut image: RgbaImage) -> Option<Arc<RenderImage>> {
    if image.width() == 0 || image.height() == 0 {
        return None;
    }
    for px in image.chunks_exact_mut(4) {
        px.swap(0, 2);
    }
    Some(Arc::new(RenderImage::new(vec![ImageFrame::new(image)])))
}
