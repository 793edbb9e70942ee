#![cfg(feature = "serde")]

use fenestra::data_transfer::{
    DataSource, DataTransferContent, DataTransferSerial, DragAndDropActions,
    DragAndDropQueryResponse,
};
use fenestra::dpi::{LogicalPosition, LogicalSize, PhysicalSize};
use fenestra::event::{Event, MouseButton, Timestamp};
use fenestra::keyboard::{Key, KeyCode, KeyModifiersSet};
use fenestra::platform::headless::{HeadlessConfig, SurfaceConfigure};
use fenestra::screen::{ScreenId, ScreenInfo};
use fenestra::text_input::{TextInputContext, TextInputEvent};
use fenestra::window::{
    DecorationMode, PointerShape, Theme, WindowAttributes, WindowCapabilities, WindowId,
    WindowLifecycle,
};
use serde::{Deserialize, Serialize};

#[allow(dead_code)]
fn needs_serde<S: Serialize + Deserialize<'static>>() {}

#[test]
fn window_serde() {
    needs_serde::<WindowId>();
    needs_serde::<WindowAttributes>();
    needs_serde::<WindowLifecycle>();
    needs_serde::<WindowCapabilities>();
    needs_serde::<DecorationMode>();
    needs_serde::<PointerShape>();
    needs_serde::<Theme>();
    needs_serde::<ScreenId>();
    needs_serde::<ScreenInfo>();
}

#[test]
fn events_serde() {
    needs_serde::<Event>();
    needs_serde::<Timestamp>();
    needs_serde::<MouseButton>();
    needs_serde::<Key>();
    needs_serde::<KeyCode>();
    needs_serde::<KeyModifiersSet>();
    needs_serde::<TextInputEvent>();
    needs_serde::<TextInputContext>();
}

#[test]
fn data_transfer_serde() {
    needs_serde::<DataSource>();
    needs_serde::<DataTransferSerial>();
    needs_serde::<DataTransferContent>();
    needs_serde::<DragAndDropActions>();
    needs_serde::<DragAndDropQueryResponse>();
}

#[test]
fn headless_serde() {
    needs_serde::<HeadlessConfig>();
    needs_serde::<SurfaceConfigure>();
}

#[test]
fn dpi_serde() {
    needs_serde::<LogicalPosition<f64>>();
    needs_serde::<LogicalSize<f64>>();
    needs_serde::<PhysicalSize<u32>>();
}
