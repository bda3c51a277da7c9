//! Bulk-only mass-storage class on top of embassy-usb endpoints.
//!
//! One command at a time: read a CBW from bulk-OUT, run the data stage the
//! [`MassStorage`] facet asks for, answer with a CSW on bulk-IN.

use crate::error::Error;
use crate::msc::bot::{
    clamp_data_in, CommandBlockWrapper, CommandStatus, CommandStatusWrapper, DataDirection,
    REQ_BULK_ONLY_RESET, REQ_GET_MAX_LUN,
};
use crate::msc::scsi::ScsiCommand;
use crate::msc::{
    BlockMedium, DataStage, MassStorage, CLASS_MASS_STORAGE, PROTOCOL_BULK_ONLY, SUBCLASS_SCSI,
};
use core::sync::atomic::{AtomicBool, Ordering};
use embassy_usb::control::{InResponse, OutResponse, Recipient, Request, RequestType};
use embassy_usb::driver::{Driver, Endpoint, EndpointIn, EndpointOut};
use embassy_usb::types::InterfaceNumber;
use embassy_usb::{Builder, Handler};

/// Largest full-speed bulk packet; also the scratch size for short responses.
const MAX_PACKET: usize = 64;

/// Class-specific control requests addressed to the mass-storage interface.
pub struct MscControl<'d> {
    interface: InterfaceNumber,
    reset: &'d AtomicBool,
}

impl<'d> MscControl<'d> {
    pub fn new(interface: InterfaceNumber, reset: &'d AtomicBool) -> Self {
        Self { interface, reset }
    }

    fn is_ours(&self, req: &Request) -> bool {
        req.request_type == RequestType::Class
            && req.recipient == Recipient::Interface
            && req.index == u16::from(self.interface.0)
    }
}

impl Handler for MscControl<'_> {
    fn control_out(&mut self, req: Request, _data: &[u8]) -> Option<OutResponse> {
        if !self.is_ours(&req) {
            return None;
        }
        match req.request {
            REQ_BULK_ONLY_RESET => {
                info!("MSC: bulk-only reset");
                self.reset.store(true, Ordering::Release);
                Some(OutResponse::Accepted)
            }
            _ => Some(OutResponse::Rejected),
        }
    }

    fn control_in<'a>(&'a mut self, req: Request, buf: &'a mut [u8]) -> Option<InResponse<'a>> {
        if !self.is_ours(&req) {
            return None;
        }
        match req.request {
            REQ_GET_MAX_LUN if !buf.is_empty() => {
                // Single logical unit.
                buf[0] = 0;
                Some(InResponse::Accepted(&buf[..1]))
            }
            _ => Some(InResponse::Rejected),
        }
    }
}

pub struct BulkOnlyClass<'d, D: Driver<'d>> {
    interface: InterfaceNumber,
    read_ep: D::EndpointOut,
    write_ep: D::EndpointIn,
    packet_size: usize,
    reset: &'d AtomicBool,
}

impl<'d, D: Driver<'d>> BulkOnlyClass<'d, D> {
    /// Add the mass-storage interface and its two bulk endpoints.
    pub fn new(
        builder: &mut Builder<'d, D>,
        max_packet_size: u16,
        reset: &'d AtomicBool,
    ) -> Self {
        let mut func = builder.function(CLASS_MASS_STORAGE, SUBCLASS_SCSI, PROTOCOL_BULK_ONLY);
        let mut iface = func.interface();
        let interface = iface.interface_number();
        let mut alt =
            iface.alt_setting(CLASS_MASS_STORAGE, SUBCLASS_SCSI, PROTOCOL_BULK_ONLY, None);
        let read_ep = alt.endpoint_bulk_out(max_packet_size);
        let write_ep = alt.endpoint_bulk_in(max_packet_size);

        Self {
            interface,
            read_ep,
            write_ep,
            packet_size: usize::from(max_packet_size).min(MAX_PACKET),
            reset,
        }
    }

    pub fn interface(&self) -> InterfaceNumber {
        self.interface
    }

    /// Serve the host forever, re-arming whenever the endpoints are
    /// disabled (bus reset, cable pulled).
    pub async fn run<M: BlockMedium>(&mut self, storage: &mut MassStorage<'_, M>) -> ! {
        loop {
            self.read_ep.wait_enabled().await;
            info!("MSC endpoints enabled");
            if let Err(e) = self.serve(storage).await {
                warn!("MSC transport stopped: {}", e);
            }
        }
    }

    async fn serve<M: BlockMedium>(
        &mut self,
        storage: &mut MassStorage<'_, M>,
    ) -> Result<(), Error> {
        let mut packet = [0u8; MAX_PACKET];
        let mut scratch = [0u8; MAX_PACKET];

        loop {
            let n = self.read_ep.read(&mut packet).await?;
            if self.reset.load(Ordering::Acquire) {
                self.reset.store(false, Ordering::Release);
                storage.reset();
            }

            let cbw = match CommandBlockWrapper::parse(&packet[..n]) {
                Ok(cbw) => cbw,
                Err(_) => {
                    // The endpoint traits have no stall; wait for the host's
                    // reset recovery and keep reading.
                    warn!("MSC: dropping invalid CBW ({=usize} bytes)", n);
                    continue;
                }
            };

            let cmd = ScsiCommand::parse(cbw.command_block());
            let reply = storage.handle(&cmd, &mut scratch);
            let expected = cbw.data_transfer_length;

            if !cbw.admits(reply.stage.direction()) {
                warn!("MSC: host data phase does not fit {}", cmd);
                self.skip_data_stage(&cbw).await?;
                let csw = CommandStatusWrapper::new(cbw.tag, expected, CommandStatus::PhaseError);
                self.write_ep.write(&csw.to_bytes()).await?;
                continue;
            }

            let residue = match reply.stage {
                DataStage::None => {
                    self.skip_data_stage(&cbw).await?;
                    expected
                }
                DataStage::In(len) => {
                    let (send, residue) = clamp_data_in(len, expected);
                    self.write_data(&scratch[..send], expected).await?;
                    residue
                }
                DataStage::ReadBlocks { lba, blocks } => {
                    let sent = self.stream_in(storage, lba, blocks, expected).await?;
                    expected - sent
                }
                DataStage::WriteBlocks { lba, blocks } => {
                    let received = self.stream_out(storage, lba, blocks, expected).await?;
                    expected - received
                }
            };

            let csw = CommandStatusWrapper::new(cbw.tag, residue, reply.status);
            if csw.status != CommandStatus::Passed {
                warn!("MSC: command {} failed", cmd);
            }
            self.write_ep.write(&csw.to_bytes()).await?;
        }
    }

    /// Terminate a data stage the command does not use.
    async fn skip_data_stage(&mut self, cbw: &CommandBlockWrapper) -> Result<(), Error> {
        if cbw.data_transfer_length == 0 {
            return Ok(());
        }
        match cbw.direction {
            // A zero-length packet ends the IN stage short.
            DataDirection::In => self.write_ep.write(&[]).await?,
            DataDirection::Out => {
                let mut sink = [0u8; MAX_PACKET];
                let mut left = cbw.data_transfer_length as usize;
                while left > 0 {
                    let n = self.read_ep.read(&mut sink).await?;
                    left = left.saturating_sub(n);
                    if n < self.packet_size {
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    async fn write_data(&mut self, data: &[u8], expected: u32) -> Result<(), Error> {
        for chunk in data.chunks(self.packet_size) {
            self.write_ep.write(chunk).await?;
        }
        self.end_short_in(data.len() as u32, expected).await
    }

    // A transfer shorter than expected that ends on a packet boundary needs
    // a zero-length packet so the host stops waiting for more data.
    async fn end_short_in(&mut self, sent: u32, expected: u32) -> Result<(), Error> {
        if sent < expected && sent as usize % self.packet_size == 0 {
            self.write_ep.write(&[]).await?;
        }
        Ok(())
    }

    async fn stream_in<M: BlockMedium>(
        &mut self,
        storage: &mut MassStorage<'_, M>,
        lba: u32,
        blocks: u16,
        expected: u32,
    ) -> Result<u32, Error> {
        let block_size = storage.block_size();
        let total = (u32::from(blocks) * block_size).min(expected);
        let mut packet = [0u8; MAX_PACKET];
        let mut sent = 0u32;

        while sent < total {
            let len = (self.packet_size as u32).min(total - sent) as usize;
            let n = storage.read(
                lba.wrapping_add(sent / block_size),
                sent % block_size,
                &mut packet[..len],
            );
            if n == 0 {
                break;
            }
            self.write_ep.write(&packet[..n]).await?;
            sent += n as u32;
        }

        self.end_short_in(sent, expected).await?;
        Ok(sent)
    }

    async fn stream_out<M: BlockMedium>(
        &mut self,
        storage: &mut MassStorage<'_, M>,
        lba: u32,
        blocks: u16,
        expected: u32,
    ) -> Result<u32, Error> {
        let block_size = storage.block_size();
        let total = (u32::from(blocks) * block_size).min(expected);
        let mut packet = [0u8; MAX_PACKET];
        let mut received = 0u32;

        while received < total {
            let n = self.read_ep.read(&mut packet).await?;
            let take = (n as u32).min(total - received);
            storage.write(
                lba.wrapping_add(received / block_size),
                received % block_size,
                &packet[..take as usize],
            );
            received += take;
            if n < self.packet_size {
                break;
            }
        }
        Ok(received)
    }
}
