//! USB composite device - boot keyboard + bulk-only mass storage.
//!
//! Initialises the Embassy USB stack on the nRF52840 hardware USB
//! peripheral, exposes the HID keyboard interface and the mass-storage
//! interface, and feeds USB bus events into [`DeviceReadiness`].

use super::msc_class::{BulkOnlyClass, MscControl};
use crate::config;
use crate::emitter::ReportSink;
use crate::error::Error;
use crate::hid::{KeyboardReport, KEYBOARD_REPORT_DESCRIPTOR, KEYBOARD_REPORT_SIZE};
use crate::readiness::DeviceReadiness;
use core::sync::atomic::AtomicBool;
use embassy_nrf::usb::vbus_detect::HardwareVbusDetect;
use embassy_nrf::usb::Driver;
use embassy_nrf::{self, bind_interrupts, peripherals};
use embassy_usb::class::hid::{Config as HidConfig, HidWriter, ReportId, RequestHandler, State};
use embassy_usb::control::OutResponse;
use embassy_usb::{Builder, Config, UsbDevice};
use static_cell::StaticCell;

bind_interrupts!(struct Irqs {
    USBD => embassy_nrf::usb::InterruptHandler<peripherals::USBD>;
    CLOCK_POWER => embassy_nrf::usb::vbus_detect::InterruptHandler;
});

/// Concrete USB driver type used by every task.
pub type UsbDriver = Driver<'static, peripherals::USBD, HardwareVbusDetect>;

static KB_STATE: StaticCell<State> = StaticCell::new();
static KB_REQUESTS: StaticCell<KeyboardRequests> = StaticCell::new();
static USB_CONFIG_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static USB_BOS_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static USB_MSOS_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static USB_CTRL_BUF: StaticCell<[u8; 128]> = StaticCell::new();
static USB_STATE_HANDLER: StaticCell<UsbStateHandler> = StaticCell::new();
static MSC_CONTROL: StaticCell<MscControl<'static>> = StaticCell::new();
static MSC_RESET: StaticCell<AtomicBool> = StaticCell::new();

/// Maps USB bus events onto the readiness flags.
struct UsbStateHandler {
    readiness: &'static DeviceReadiness,
}

impl embassy_usb::Handler for UsbStateHandler {
    fn enabled(&mut self, enabled: bool) {
        if !enabled {
            info!("USB disconnected");
            self.readiness.reset();
        }
    }

    fn reset(&mut self) {
        self.readiness.reset();
    }

    fn addressed(&mut self, addr: u8) {
        if self.readiness.mark_link_up() {
            info!("USB connected, address {=u8}", addr);
        }
    }

    fn configured(&mut self, configured: bool) {
        if configured && self.readiness.mark_hid_ready() {
            info!("HID interface ready");
        }
    }
}

/// Class requests on the keyboard interface. LED output reports are
/// accepted and ignored.
struct KeyboardRequests;

impl RequestHandler for KeyboardRequests {
    fn set_report(&mut self, _id: ReportId, data: &[u8]) -> OutResponse {
        debug!("HID LED report {=[u8]} ignored", data);
        OutResponse::Accepted
    }
}

/// The HID keyboard endpoint as a [`ReportSink`].
pub struct KeyboardSink {
    writer: HidWriter<'static, UsbDriver, KEYBOARD_REPORT_SIZE>,
    readiness: &'static DeviceReadiness,
}

impl ReportSink for KeyboardSink {
    fn ready(&self) -> bool {
        self.readiness.hid_ready()
    }

    async fn send(&mut self, report: &KeyboardReport) -> Result<(), Error> {
        let mut buf = [0u8; KEYBOARD_REPORT_SIZE];
        let n = report.serialize(&mut buf);
        self.writer.write(&buf[..n]).await?;
        Ok(())
    }
}

/// Build result containing the USB device runner and both class handles.
pub struct CompositeDevice {
    pub device: UsbDevice<'static, UsbDriver>,
    pub keyboard: KeyboardSink,
    pub msc: BulkOnlyClass<'static, UsbDriver>,
}

/// Initialise the USB stack and create the composite device.
///
/// Must be called exactly once.  All static buffers are consumed here.
pub fn init(usbd: peripherals::USBD, readiness: &'static DeviceReadiness) -> CompositeDevice {
    // Create the low-level USB driver with hardware VBUS detection.
    let driver = Driver::new(usbd, Irqs, HardwareVbusDetect::new(Irqs));

    // USB device-level configuration.
    let mut usb_config = Config::new(config::USB_VID, config::USB_PID);
    usb_config.manufacturer = Some(config::USB_MANUFACTURER);
    usb_config.product = Some(config::USB_PRODUCT);
    usb_config.serial_number = Some(config::USB_SERIAL_NUMBER);
    usb_config.max_power = 100; // mA
    usb_config.max_packet_size_0 = 64;

    // Allocate static descriptor buffers.
    let config_desc = USB_CONFIG_DESC.init([0u8; 256]);
    let bos_desc = USB_BOS_DESC.init([0u8; 256]);
    let msos_desc = USB_MSOS_DESC.init([0u8; 256]);
    let ctrl_buf = USB_CTRL_BUF.init([0u8; 128]);

    // Build the USB device.
    let mut builder = Builder::new(
        driver,
        usb_config,
        config_desc,
        bos_desc,
        msos_desc,
        ctrl_buf,
    );

    let state_handler = USB_STATE_HANDLER.init(UsbStateHandler { readiness });
    builder.handler(state_handler);

    // Interface 0: keyboard (boot protocol)
    let kb_state = KB_STATE.init(State::new());
    let kb_config = HidConfig {
        report_descriptor: KEYBOARD_REPORT_DESCRIPTOR,
        request_handler: Some(KB_REQUESTS.init(KeyboardRequests)),
        poll_ms: config::USB_HID_POLL_MS,
        max_packet_size: KEYBOARD_REPORT_SIZE as u16,
    };
    let writer = HidWriter::new(&mut builder, kb_state, kb_config);

    // Interface 1: mass storage (SCSI, bulk-only)
    let reset_flag: &'static AtomicBool = MSC_RESET.init(AtomicBool::new(false));
    let msc = BulkOnlyClass::new(&mut builder, config::MSC_PACKET_SIZE, reset_flag);
    let msc_control = MSC_CONTROL.init(MscControl::new(msc.interface(), reset_flag));
    builder.handler(msc_control);

    let device = builder.build();

    info!("USB composite device initialised (keyboard + mass storage)");

    CompositeDevice {
        device,
        keyboard: KeyboardSink { writer, readiness },
        msc,
    }
}

/// Run the USB device stack - must be spawned as a dedicated Embassy task.
///
/// This handles USB enumeration, suspend/resume, and control requests.
/// It runs forever.
pub async fn run_usb_device(mut device: UsbDevice<'static, UsbDriver>) -> ! {
    info!("USB device task started");
    device.run().await
}
