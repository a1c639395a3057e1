//! Adapter discovery, opening and the request/response exchange.

use std::fmt;
use std::time::Instant;

use hidapi::HidApi;
use rnt_errors::{RntError, RntResult};
use rnt_hid_common::{FeatureTransport, HidApiTransport, HidDeviceInfo, REPORT_ID, enumerate_vendors};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::compat;
use crate::config::AdapterConfig;
use crate::features::{Features, SupportedSets, derive_features};
use crate::ids::ALL_VENDOR_IDS;
use crate::registry::{AdapterCaps, RegistryEntry, lookup};
use crate::requests::rq;

/// An enumerated interface that matches the registry.
#[derive(Debug, Clone)]
pub struct AdapterInfo {
    pub hid: HidDeviceInfo,
    pub entry: &'static RegistryEntry,
}

impl AdapterInfo {
    /// Keep `hid` only when the registry knows it.
    pub fn from_hid(hid: HidDeviceInfo) -> Option<Self> {
        let entry = lookup(hid.vendor_id, hid.product_id, hid.interface_number)?;
        Some(Self { hid, entry })
    }

    pub fn is_legacy(&self) -> bool {
        self.entry.is_legacy()
    }

    pub fn caps(&self) -> AdapterCaps {
        self.entry.caps
    }

    /// Firmware version as encoded in the USB release number.
    pub fn release_version(&self) -> (u8, u8) {
        self.hid.release_version()
    }

    pub fn name(&self) -> &str {
        self.hid
            .product_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(self.entry.name)
    }
}

impl fmt::Display for AdapterInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04x}:{:04x} {}",
            self.hid.vendor_id,
            self.hid.product_id,
            self.name()
        )?;
        if let Some(serial) = self.hid.serial_number.as_deref() {
            write!(f, " [{serial}]")?;
        }
        if self.is_legacy() {
            write!(f, " (legacy)")?;
        }
        Ok(())
    }
}

/// Keep the registry-known entries among `devices`, in order.
pub fn filter_adapters(devices: impl IntoIterator<Item = HidDeviceInfo>) -> Vec<AdapterInfo> {
    devices
        .into_iter()
        .filter_map(|hid| {
            let found = AdapterInfo::from_hid(hid);
            if let Some(info) = &found {
                trace!("Considering {}", info);
            }
            found
        })
        .collect()
}

/// Enumerate every connected adapter.
pub fn list_adapters(api: &HidApi) -> Vec<AdapterInfo> {
    filter_adapters(enumerate_vendors(api, &ALL_VENDOR_IDS))
}

/// Selects one adapter among the enumerated ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterFilter {
    pub vendor_id: Option<u16>,
    pub product_id: Option<u16>,
    pub serial: Option<String>,
    pub path: Option<String>,
}

impl AdapterFilter {
    pub fn matches(&self, info: &AdapterInfo) -> bool {
        self.vendor_id.is_none_or(|v| v == info.hid.vendor_id)
            && self.product_id.is_none_or(|p| p == info.hid.product_id)
            && self
                .serial
                .as_deref()
                .is_none_or(|s| info.hid.serial_number.as_deref() == Some(s))
            && self.path.as_deref().is_none_or(|p| p == info.hid.path)
    }
}

impl fmt::Display for AdapterFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(v) = self.vendor_id {
            parts.push(format!("vid={v:04x}"));
        }
        if let Some(p) = self.product_id {
            parts.push(format!("pid={p:04x}"));
        }
        if let Some(s) = &self.serial {
            parts.push(format!("serial={s}"));
        }
        if let Some(p) = &self.path {
            parts.push(format!("path={p}"));
        }
        if parts.is_empty() {
            write!(f, "any adapter")
        } else {
            write!(f, "{}", parts.join(", "))
        }
    }
}

/// How capabilities were established at open time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceGeneration {
    /// No management interface at all.
    Legacy,
    /// Capabilities come from the registry only.
    Static(AdapterCaps),
    /// Registry entry plus the sets the firmware enumerated.
    Dynamic {
        caps: AdapterCaps,
        supported: SupportedSets,
    },
}

impl DeviceGeneration {
    /// Advertised features: registry features, plus derived ones for
    /// dynamic firmware.
    pub fn features(&self) -> Features {
        match self {
            Self::Legacy => Features::empty(),
            Self::Static(caps) => caps.features,
            Self::Dynamic { caps, supported } => caps.features | derive_features(supported),
        }
    }

    pub fn supported(&self) -> Option<&SupportedSets> {
        match self {
            Self::Dynamic { supported, .. } => Some(supported),
            _ => None,
        }
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, Self::Legacy)
    }
}

/// Exclusive owner of one adapter connection.
///
/// One exchange is in flight at a time; `&mut self` on every request makes
/// concurrent use a compile error rather than a runtime hazard.
pub struct DeviceHandle {
    transport: Option<Box<dyn FeatureTransport>>,
    info: AdapterInfo,
    report_size: usize,
    generation: DeviceGeneration,
    compat_features: Features,
    version: Option<String>,
    config: AdapterConfig,
}

impl fmt::Debug for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceHandle")
            .field("info", &self.info)
            .field("report_size", &self.report_size)
            .field("generation", &self.generation)
            .field("compat_features", &self.compat_features)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

impl DeviceHandle {
    /// Open `info` over `transport`.
    ///
    /// Negotiates the report size, queries the supported sets of dynamic
    /// firmware (any failure aborts the open) and applies version-based
    /// compatibility features. Legacy adapters need no transport; one passed
    /// anyway is dropped.
    pub fn open(
        info: AdapterInfo,
        transport: Option<Box<dyn FeatureTransport>>,
        config: AdapterConfig,
    ) -> RntResult<Self> {
        let caps = info.caps();
        let transport = if info.is_legacy() {
            None
        } else {
            Some(transport.ok_or_else(|| RntError::io("no transport for managed adapter"))?)
        };

        let mut handle = Self {
            transport,
            report_size: caps.negotiated_report_size(),
            generation: if info.is_legacy() {
                DeviceGeneration::Legacy
            } else {
                DeviceGeneration::Static(caps)
            },
            info,
            compat_features: Features::empty(),
            version: None,
            config,
        };

        if handle.generation.is_legacy() {
            info!("Opened legacy adapter {}", handle.info);
        } else {
            if caps.features.contains(Features::DYNAMIC_FEATURES) {
                let supported = handle.query_supported_sets()?;
                debug!(
                    "Supported requests {:02x?}, params {:02x?}, modes {:02x?}",
                    supported.requests, supported.cfg_params, supported.modes
                );
                handle.generation = DeviceGeneration::Dynamic { caps, supported };
            }
            info!(
                "Opened adapter {} (report size {})",
                handle.info, handle.report_size
            );
        }

        match handle.get_version() {
            Ok(version) => {
                handle.compat_features = compat::version_features(&version);
                if !handle.compat_features.is_empty() {
                    debug!(
                        "Firmware {} implies {:?}",
                        version, handle.compat_features
                    );
                }
                handle.version = Some(version);
            }
            Err(e) => warn!("Could not read firmware version: {}", e),
        }

        Ok(handle)
    }

    /// Open `info` through hidapi.
    pub fn open_hid(api: &HidApi, info: AdapterInfo, config: AdapterConfig) -> RntResult<Self> {
        let transport: Option<Box<dyn FeatureTransport>> = if info.is_legacy() {
            None
        } else {
            Some(Box::new(HidApiTransport::open(api, &info.hid.path)?))
        };
        Self::open(info, transport, config)
    }

    /// Open the first connected adapter accepted by `filter`.
    pub fn open_first(api: &HidApi, filter: &AdapterFilter, config: AdapterConfig) -> RntResult<Self> {
        let info = list_adapters(api)
            .into_iter()
            .find(|info| filter.matches(info))
            .ok_or_else(|| RntError::DeviceNotFound(filter.to_string()))?;
        Self::open_hid(api, info, config)
    }

    pub fn info(&self) -> &AdapterInfo {
        &self.info
    }

    pub fn report_size(&self) -> usize {
        self.report_size
    }

    pub fn generation(&self) -> &DeviceGeneration {
        &self.generation
    }

    pub fn is_legacy(&self) -> bool {
        self.generation.is_legacy()
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Features enabled by compatibility shims rather than advertised.
    pub fn compat_features(&self) -> Features {
        self.compat_features
    }

    /// Everything the adapter can do: advertised plus compatibility features.
    pub fn features(&self) -> Features {
        self.generation.features() | self.compat_features
    }

    pub fn has(&self, feature: Features) -> bool {
        self.features().contains(feature)
    }

    /// Firmware version read at open time.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Send `cmd` and wait for the reply payload.
    ///
    /// The command is zero-padded to the report size. Polls until the
    /// device returns at least one payload byte or the exchange window
    /// elapses.
    pub fn exchange(&mut self, cmd: &[u8]) -> RntResult<Vec<u8>> {
        let report_size = self.report_size;
        let timeout = self.config.exchange_timeout();
        let poll_sleep = self.config.poll_sleep();
        let transport = self.transport.as_mut().ok_or(RntError::LegacyDevice)?;

        if cmd.len() > report_size {
            return Err(RntError::bad_param(format!(
                "command of {} bytes exceeds report size {}",
                cmd.len(),
                report_size
            )));
        }

        let mut frame = Vec::with_capacity(report_size + 1);
        frame.push(REPORT_ID);
        frame.extend_from_slice(cmd);
        frame.resize(report_size + 1, 0);
        trace!("-> {:02x?}", cmd);
        transport.send_feature_report(&frame)?;

        let start = Instant::now();
        let mut buf = vec![0u8; report_size + 1];
        loop {
            buf.fill(0);
            if let Some(id) = buf.first_mut() {
                *id = REPORT_ID;
            }
            let n = transport.get_feature_report(&mut buf)?;
            if n > 1 {
                let reply = buf.get(1..n.min(buf.len())).unwrap_or_default().to_vec();
                trace!("<- {:02x?}", reply);
                return Ok(reply);
            }
            if start.elapsed() > timeout {
                debug!("Exchange timed out after {:?}", timeout);
                return Err(RntError::Timeout {
                    timeout_ms: self.config.exchange_timeout_ms,
                });
            }
            if !poll_sleep.is_zero() {
                std::thread::sleep(poll_sleep);
            }
        }
    }

    /// Send a request whose reply is ignored.
    pub(crate) fn send_only(&mut self, cmd: &[u8]) -> RntResult<()> {
        let report_size = self.report_size;
        let transport = self.transport.as_mut().ok_or(RntError::LegacyDevice)?;
        if cmd.len() > report_size {
            return Err(RntError::bad_param("command exceeds report size"));
        }
        let mut frame = Vec::with_capacity(report_size + 1);
        frame.push(REPORT_ID);
        frame.extend_from_slice(cmd);
        frame.resize(report_size + 1, 0);
        transport.send_feature_report(&frame)?;
        Ok(())
    }

    fn query_id_list(&mut self, opcode: u8) -> RntResult<Vec<u8>> {
        let reply = self.exchange(&[opcode])?;
        match reply.split_first() {
            Some((&echo, ids)) if echo == opcode => Ok(ids.to_vec()),
            _ => Err(RntError::protocol(format!(
                "bad reply to supported-set query {opcode:#04x}"
            ))),
        }
    }

    fn query_supported_sets(&mut self) -> RntResult<SupportedSets> {
        let requests = self.query_id_list(rq::GET_SUPPORTED_REQUESTS)?;
        let cfg_params = self.query_id_list(rq::GET_SUPPORTED_CFG_PARAMS)?;
        let modes = self.query_id_list(rq::GET_SUPPORTED_MODES)?;
        let mappings = if requests.contains(&rq::GET_SUPPORTED_MAPPINGS) {
            Some(self.query_id_list(rq::GET_SUPPORTED_MAPPINGS)?)
        } else {
            None
        };
        Ok(SupportedSets {
            requests,
            cfg_params,
            modes,
            mappings,
        })
    }

    /// Firmware version string, or the USB release number on legacy
    /// adapters.
    pub fn get_version(&mut self) -> RntResult<String> {
        if self.is_legacy() {
            let (major, minor) = self.info.release_version();
            return Ok(format!("{major}.{minor}(.x)"));
        }
        let reply = self.exchange(&[rq::GET_VERSION])?;
        Ok(reply_string(&reply))
    }
}

/// Text following the opcode byte, up to the first NUL.
pub(crate) fn reply_string(reply: &[u8]) -> String {
    let text = reply.get(1..).unwrap_or_default();
    let end = text.iter().position(|&b| b == 0).unwrap_or(text.len());
    String::from_utf8_lossy(text.get(..end).unwrap_or_default()).into_owned()
}
