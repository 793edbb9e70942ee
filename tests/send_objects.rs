#[allow(dead_code)]
fn needs_send<T: Send>() {}

#[allow(dead_code)]
fn needs_send_sync<T: Send + Sync>() {}

#[test]
fn event_loop_proxy_send() {
    // Tasks are dispatched from any thread.
    needs_send_sync::<fenestra::event_loop::EventLoopProxy>();
    needs_send::<fenestra::event_loop::Task>();
}

#[test]
fn headless_handle_send() {
    needs_send_sync::<fenestra::platform::headless::HeadlessHandle>();
    needs_send::<fenestra::platform::headless::NativeEvent>();
    needs_send_sync::<fenestra::platform::headless::DataOffer>();
}

#[test]
fn frame_pump_send() {
    needs_send_sync::<fenestra::frame_pump::FramePump>();
}

#[test]
fn ids_send() {
    needs_send_sync::<fenestra::window::WindowId>();
    needs_send_sync::<fenestra::screen::ScreenId>();
    needs_send_sync::<fenestra::data_transfer::DataTransferSerial>();
}

#[test]
fn events_send() {
    needs_send_sync::<fenestra::event::Event>();
    needs_send_sync::<fenestra::error::RequestError>();
    needs_send_sync::<fenestra::error::EventLoopError>();
}
