//! keyinject firmware entry point (nRF52840).
//!
//! Brings up the composite USB device, serves the mass-storage interface in
//! its own task and runs the injection sequencer once the host has
//! addressed the device.

#![no_std]
#![no_main]

use defmt::{error, info};
use embassy_executor::Spawner;
use embassy_nrf::config::{Config as NrfConfig, HfclkSource};
use embassy_time::{Delay, Timer};
use embassy_usb::UsbDevice;
use keyinject::config::{InjectionConfig, LINK_POLL_MS};
use keyinject::msc::{MassStorage, NullMedium};
use keyinject::readiness::DeviceReadiness;
use keyinject::sequencer::Sequencer;
use keyinject::usb::composite::{self, CompositeDevice, UsbDriver};
use keyinject::usb::msc_class::BulkOnlyClass;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

static READINESS: StaticCell<DeviceReadiness> = StaticCell::new();

#[embassy_executor::task]
async fn usb_task(device: UsbDevice<'static, UsbDriver>) -> ! {
    composite::run_usb_device(device).await
}

#[embassy_executor::task]
async fn msc_task(
    mut class: BulkOnlyClass<'static, UsbDriver>,
    readiness: &'static DeviceReadiness,
) -> ! {
    let mut storage = MassStorage::new(NullMedium::default(), readiness);
    class.run(&mut storage).await
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("=== keyinject starting ===");

    // The USB peripheral needs the external high-frequency crystal.
    let mut nrf_config = NrfConfig::default();
    nrf_config.hfclk_source = HfclkSource::ExternalXtal;
    let p = embassy_nrf::init(nrf_config);

    let readiness: &'static DeviceReadiness = READINESS.init(DeviceReadiness::new());

    let CompositeDevice {
        device,
        keyboard,
        msc,
    } = composite::init(p.USBD, readiness);
    spawner.must_spawn(usb_task(device));
    spawner.must_spawn(msc_task(msc, readiness));

    info!("Waiting for USB connection...");
    while !readiness.link_up() {
        Timer::after_millis(LINK_POLL_MS).await;
    }

    let mut sequencer = Sequencer::new(InjectionConfig::default(), readiness, keyboard, Delay);
    match sequencer.run().await {
        Ok(summary) => info!("Injection complete: {}", summary),
        Err(e) => error!("Injection aborted: {}", e),
    }
    // The USB and mass-storage tasks keep serving the host from here on.
}
