//! Page-wide mouse and touch listeners feeding the experience queue

use lomundou_core::{EventQueue, Point, PointerEvent, SessionError};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{MouseEvent, TouchEvent, TouchList, Window};

use crate::bindings::js_error_message;

/// Keeps the installed listeners alive and removes them from the window
/// when dropped
pub struct PageListeners {
    window: Window,
    mouse: Vec<(&'static str, Closure<dyn FnMut(MouseEvent)>)>,
    touch: Vec<(&'static str, Closure<dyn FnMut(TouchEvent)>)>,
}

impl PageListeners {
    pub fn install(events: EventQueue) -> Result<Self, SessionError> {
        let window = web_sys::window().ok_or_else(|| SessionError::Input("No window".to_string()))?;
        let mut listeners = Self {
            window,
            mouse: Vec::new(),
            touch: Vec::new(),
        };

        listeners.listen_mouse("mousedown", events.clone(), |e| {
            Some(PointerEvent::MouseDown(client_point(e)))
        })?;
        listeners.listen_mouse("mousemove", events.clone(), |e| {
            Some(PointerEvent::MouseMove(client_point(e)))
        })?;
        listeners.listen_mouse("mouseup", events.clone(), |_| Some(PointerEvent::MouseUp))?;

        listeners.listen_touch("touchstart", events.clone(), |e| {
            Some(PointerEvent::TouchStart(touch_points(&e.touches())))
        })?;
        listeners.listen_touch("touchmove", events.clone(), |e| {
            Some(PointerEvent::TouchMove(touch_points(&e.touches())))
        })?;
        listeners.listen_touch("touchend", events, |_| Some(PointerEvent::TouchEnd))?;

        tracing::info!("Pointer listeners installed");
        Ok(listeners)
    }

    fn listen_mouse(
        &mut self,
        name: &'static str,
        events: EventQueue,
        convert: fn(&MouseEvent) -> Option<PointerEvent>,
    ) -> Result<(), SessionError> {
        let closure = Closure::wrap(Box::new(move |e: MouseEvent| {
            if let Some(event) = convert(&e) {
                events.pointer(event);
            }
        }) as Box<dyn FnMut(MouseEvent)>);
        add_listener(&self.window, name, closure.as_ref())?;
        self.mouse.push((name, closure));
        Ok(())
    }

    fn listen_touch(
        &mut self,
        name: &'static str,
        events: EventQueue,
        convert: fn(&TouchEvent) -> Option<PointerEvent>,
    ) -> Result<(), SessionError> {
        let closure = Closure::wrap(Box::new(move |e: TouchEvent| {
            if let Some(event) = convert(&e) {
                events.pointer(event);
            }
        }) as Box<dyn FnMut(TouchEvent)>);
        add_listener(&self.window, name, closure.as_ref())?;
        self.touch.push((name, closure));
        Ok(())
    }
}

impl Drop for PageListeners {
    fn drop(&mut self) {
        for (name, closure) in &self.mouse {
            remove_listener(&self.window, name, closure.as_ref());
        }
        for (name, closure) in &self.touch {
            remove_listener(&self.window, name, closure.as_ref());
        }
        tracing::debug!("Pointer listeners removed");
    }
}

fn add_listener(window: &Window, name: &str, callback: &JsValue) -> Result<(), SessionError> {
    window
        .add_event_listener_with_callback(name, callback.unchecked_ref())
        .map_err(|e| SessionError::Input(format!("{}: {}", name, js_error_message(&e))))
}

fn remove_listener(window: &Window, name: &str, callback: &JsValue) {
    if let Err(e) = window.remove_event_listener_with_callback(name, callback.unchecked_ref()) {
        tracing::warn!("Failed to remove {} listener: {}", name, js_error_message(&e));
    }
}

fn client_point(event: &MouseEvent) -> Point {
    Point::new(event.client_x() as f32, event.client_y() as f32)
}

fn touch_points(list: &TouchList) -> Vec<Point> {
    (0..list.length())
        .filter_map(|i| list.get(i))
        .map(|t| Point::new(t.client_x() as f32, t.client_y() as f32))
        .collect()
}

#[cfg(all(test, target_arch = "wasm32"))]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn press(window: &Window) {
        let event = MouseEvent::new("mousedown").unwrap();
        window.dispatch_event(&event).unwrap();
    }

    #[wasm_bindgen_test]
    fn test_listeners_feed_queue() {
        let events = EventQueue::default();
        let _listeners = PageListeners::install(events.clone()).unwrap();

        press(&web_sys::window().unwrap());
        assert_eq!(events.len(), 1);
    }

    #[wasm_bindgen_test]
    fn test_dropped_listeners_are_removed() {
        let events = EventQueue::default();
        let window = web_sys::window().unwrap();
        drop(PageListeners::install(events.clone()).unwrap());

        press(&window);
        assert!(events.is_empty());
    }
}
