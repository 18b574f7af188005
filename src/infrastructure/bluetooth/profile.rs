//! HID service registration with the BlueZ daemon.
//!
//! Registering the profile publishes the SDP service record so hosts can
//! discover the emulated device; the raw L2CAP channels themselves are
//! handled by the transport module.

use crate::hid::descriptor::{descriptor_hex, HID_REPORT_DESCRIPTOR};
use bluer::rfcomm::{Profile, ProfileHandle, Role};
use bluer::{Adapter, Session, Uuid};
use thiserror::Error;
use tracing::info;

/// Well-known HID service class UUID (0x1124).
pub const HID_SERVICE_UUID: Uuid = Uuid::from_u128(0x00001124_0000_1000_8000_00805f9b34fb);

/// Fixed PSMs assigned by the HID profile convention.
pub const PSM_HID_CONTROL: u16 = 17;
pub const PSM_HID_INTERRUPT: u16 = 19;

/// Class-of-device for a keyboard+pointing combo peripheral.
pub const DEVICE_CLASS_COMBO_PERIPHERAL: u32 = 0x0025C0;

/// Everything a host needs to discover and connect to the emulated device.
/// Built once at startup and never mutated.
#[derive(Debug, Clone)]
pub struct ServiceDescriptor {
    pub service_uuid: Uuid,
    pub name: String,
    pub device_class: u32,
    pub control_psm: u16,
    pub interrupt_psm: u16,
    pub hid_descriptor: &'static [u8],
}

impl ServiceDescriptor {
    pub fn hid_combo(name: &str) -> Self {
        Self {
            service_uuid: HID_SERVICE_UUID,
            name: name.to_string(),
            device_class: DEVICE_CLASS_COMBO_PERIPHERAL,
            control_psm: PSM_HID_CONTROL,
            interrupt_psm: PSM_HID_INTERRUPT,
            hid_descriptor: HID_REPORT_DESCRIPTOR,
        }
    }

    /// SDP record for a Bluetooth HID device, with the report descriptor
    /// hex-injected at attribute 0x0206 and the PSMs in the protocol
    /// descriptor lists.
    pub fn sdp_record_xml(&self) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" ?>
<record>
  <attribute id="0x0001">
    <sequence>
      <uuid value="0x1124" />
    </sequence>
  </attribute>
  <attribute id="0x0004">
    <sequence>
      <sequence>
        <uuid value="0x0100" />
        <uint16 value="{control_psm}" />
      </sequence>
      <sequence>
        <uuid value="0x0011" />
      </sequence>
    </sequence>
  </attribute>
  <attribute id="0x0005">
    <sequence>
      <uuid value="0x1002" />
    </sequence>
  </attribute>
  <attribute id="0x0006">
    <sequence>
      <uint16 value="0x656e" />
      <uint16 value="0x006a" />
      <uint16 value="0x0100" />
    </sequence>
  </attribute>
  <attribute id="0x0009">
    <sequence>
      <sequence>
        <uuid value="0x1124" />
        <uint16 value="0x0100" />
      </sequence>
    </sequence>
  </attribute>
  <attribute id="0x000d">
    <sequence>
      <sequence>
        <sequence>
          <uuid value="0x0100" />
          <uint16 value="{interrupt_psm}" />
        </sequence>
        <sequence>
          <uuid value="0x0011" />
        </sequence>
      </sequence>
    </sequence>
  </attribute>
  <attribute id="0x0100">
    <text value="{name}" />
  </attribute>
  <attribute id="0x0101">
    <text value="{name} Bluetooth" />
  </attribute>
  <attribute id="0x0200">
    <uint16 value="0x0100" />
  </attribute>
  <attribute id="0x0201">
    <uint16 value="0x0111" />
  </attribute>
  <attribute id="0x0202">
    <uint8 value="0x80" />
  </attribute>
  <attribute id="0x0203">
    <uint8 value="0x00" />
  </attribute>
  <attribute id="0x0204">
    <boolean value="true" />
  </attribute>
  <attribute id="0x0205">
    <boolean value="true" />
  </attribute>
  <attribute id="0x0206">
    <sequence>
      <sequence>
        <uint8 value="0x22" />
        <text encoding="hex" value="{descriptor}" />
      </sequence>
    </sequence>
  </attribute>
  <attribute id="0x0207">
    <sequence>
      <sequence>
        <uint16 value="0x0409" />
        <uint16 value="0x0100" />
      </sequence>
    </sequence>
  </attribute>
  <attribute id="0x020e">
    <boolean value="true" />
  </attribute>
</record>
"#,
            control_psm = format!("0x{:04x}", self.control_psm),
            interrupt_psm = format!("0x{:04x}", self.interrupt_psm),
            name = self.name,
            descriptor = descriptor_hex(),
        )
    }
}

#[derive(Debug, Error)]
pub enum RegistrationError {
    /// The BlueZ control API could not be reached. Nothing can be
    /// advertised, so startup must abort.
    #[error("bluetooth daemon unavailable: {0}")]
    DaemonUnavailable(#[source] bluer::Error),
    /// The daemon refused the record (malformed descriptor, PSM already
    /// bound by another service). Also fatal.
    #[error("service record rejected by daemon: {0}")]
    Rejected(#[source] bluer::Error),
}

/// Keeps the HID service visible to hosts. Dropping the handle deregisters
/// the profile with the daemon.
pub struct RegistrationHandle {
    _profile: ProfileHandle,
}

/// Registers the HID service record with bluetoothd.
pub struct ProfileRegistrar {
    session: Session,
    adapter: Adapter,
}

impl ProfileRegistrar {
    /// Open the daemon session and grab the default adapter.
    pub async fn connect() -> Result<Self, RegistrationError> {
        let session = Session::new()
            .await
            .map_err(RegistrationError::DaemonUnavailable)?;
        let adapter = session
            .default_adapter()
            .await
            .map_err(RegistrationError::DaemonUnavailable)?;
        info!("Using Bluetooth adapter: {}", adapter.name());
        Ok(Self { session, adapter })
    }

    pub fn adapter(&self) -> &Adapter {
        &self.adapter
    }

    pub async fn register(
        &self,
        descriptor: &ServiceDescriptor,
    ) -> Result<RegistrationHandle, RegistrationError> {
        self.prepare_adapter(descriptor)
            .await
            .map_err(RegistrationError::DaemonUnavailable)?;

        let profile = Profile {
            uuid: descriptor.service_uuid,
            name: Some(descriptor.name.clone()),
            role: Some(Role::Server),
            require_authentication: Some(false),
            require_authorization: Some(false),
            service_record: Some(descriptor.sdp_record_xml()),
            ..Default::default()
        };

        let handle = self
            .session
            .register_profile(profile)
            .await
            .map_err(RegistrationError::Rejected)?;

        info!(
            "HID profile registered: {} (class 0x{:06x}, control PSM {}, interrupt PSM {})",
            descriptor.name,
            descriptor.device_class,
            descriptor.control_psm,
            descriptor.interrupt_psm
        );
        Ok(RegistrationHandle { _profile: handle })
    }

    /// Power the adapter and make it visible under the advertised name.
    /// The radio's class-of-device itself is daemon configuration.
    async fn prepare_adapter(&self, descriptor: &ServiceDescriptor) -> bluer::Result<()> {
        if !self.adapter.is_powered().await? {
            info!("Powering on Bluetooth adapter");
            self.adapter.set_powered(true).await?;
        }
        self.adapter.set_alias(descriptor.name.clone()).await?;
        self.adapter.set_pairable(true).await?;
        self.adapter.set_discoverable(true).await?;
        Ok(())
    }
}
