//! RTC slow-memory adapter for the cycle store.
//!
//! The cycle state lives in a region of RTC slow memory that survives deep
//! sleep but not power loss.  After a power cut the region holds arbitrary
//! bytes, so every record carries a header:
//!
//! ```text
//!   0      4      6      10                       10+len
//!   ┌──────┬──────┬──────┬────────────────────────┐
//!   │magic │ len  │ fnv  │ postcard(CycleState)   │
//!   └──────┴──────┴──────┴────────────────────────┘
//! ```
//!
//! Validity is judged once when the store is opened; the answer tells the
//! feature whether this boot is a warm wake or a cold boot.

use log::{debug, info, warn};

use crate::app::ports::{CycleStorePort, StorageError};
use crate::store::CycleState;

/// Bytes reserved in RTC slow memory for the cycle store.
pub const RTC_REGION_SIZE: usize = 512;

const MAGIC: u32 = 0x5445_4d50;
const HEADER_LEN: usize = 10;
const MAX_PAYLOAD: usize = RTC_REGION_SIZE - HEADER_LEN;

#[cfg(target_os = "espidf")]
#[unsafe(link_section = ".rtc.data")]
static mut RTC_CYCLE_REGION: [u8; RTC_REGION_SIZE] = [0; RTC_REGION_SIZE];

/// Handle on the retained memory region.
///
/// On the device this is the `.rtc.data` static; on the host it is a heap
/// buffer that the simulator keeps across simulated sleeps.
pub struct RtcRegion {
    #[cfg(not(target_os = "espidf"))]
    mem: Box<[u8; RTC_REGION_SIZE]>,
}

impl RtcRegion {
    /// Take the region.  Only one handle may exist per boot.
    #[cfg(target_os = "espidf")]
    pub fn take() -> Self {
        Self {}
    }

    /// Fresh host region with power-on contents.
    #[cfg(not(target_os = "espidf"))]
    pub fn power_on() -> Self {
        let mut region = Self {
            mem: Box::new([0; RTC_REGION_SIZE]),
        };
        region.simulate_power_loss();
        region
    }

    /// Lose the contents the way a brown-out does: the region comes back
    /// holding garbage.
    #[cfg(not(target_os = "espidf"))]
    pub fn simulate_power_loss(&mut self) {
        for (i, b) in self.mem.iter_mut().enumerate() {
            *b = (i as u8).wrapping_mul(31) ^ 0xa5;
        }
    }

    /// Copy raw bytes over the start of the region, as a stray write would.
    #[cfg(not(target_os = "espidf"))]
    pub fn overwrite(&mut self, data: &[u8]) {
        let n = data.len().min(RTC_REGION_SIZE);
        self.mem[..n].copy_from_slice(&data[..n]);
    }

    fn bytes(&self) -> &[u8; RTC_REGION_SIZE] {
        #[cfg(not(target_os = "espidf"))]
        {
            &self.mem
        }

        #[cfg(target_os = "espidf")]
        // SAFETY: the region is only reachable through the single RtcRegion
        // handle, and the firmware runs the feature from one task.
        unsafe {
            &*(&raw const RTC_CYCLE_REGION)
        }
    }

    fn bytes_mut(&mut self) -> &mut [u8; RTC_REGION_SIZE] {
        #[cfg(not(target_os = "espidf"))]
        {
            &mut self.mem
        }

        #[cfg(target_os = "espidf")]
        // SAFETY: see `bytes`.
        unsafe {
            &mut *(&raw mut RTC_CYCLE_REGION)
        }
    }
}

/// 32-bit FNV-1a.
fn fnv1a(data: &[u8]) -> u32 {
    let mut hash: u32 = 0x811c_9dc5;
    for b in data {
        hash ^= u32::from(*b);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash
}

/// Payload slice if the header is intact.
fn valid_payload(mem: &[u8; RTC_REGION_SIZE]) -> Option<&[u8]> {
    let magic = u32::from_le_bytes([mem[0], mem[1], mem[2], mem[3]]);
    if magic != MAGIC {
        return None;
    }
    let len = u16::from_le_bytes([mem[4], mem[5]]) as usize;
    if len == 0 || len > MAX_PAYLOAD {
        return None;
    }
    let stored = u32::from_le_bytes([mem[6], mem[7], mem[8], mem[9]]);
    let payload = &mem[HEADER_LEN..HEADER_LEN + len];
    (fnv1a(payload) == stored).then_some(payload)
}

/// [`CycleStorePort`] over RTC slow memory.
pub struct RtcCycleStore {
    region: RtcRegion,
    survived: bool,
}

impl RtcCycleStore {
    pub fn new(region: RtcRegion) -> Self {
        let survived = valid_payload(region.bytes()).is_some();
        if survived {
            info!("RtcCycleStore: retained state found (warm wake)");
        } else {
            info!("RtcCycleStore: no retained state (cold boot)");
        }
        Self { region, survived }
    }

    /// Give the region back, e.g. to carry it into the next simulated wake.
    pub fn into_region(self) -> RtcRegion {
        self.region
    }
}

impl CycleStorePort for RtcCycleStore {
    fn is_valid(&self) -> bool {
        self.survived
    }

    fn load(&self) -> Option<CycleState> {
        let payload = valid_payload(self.region.bytes())?;
        match postcard::from_bytes(payload) {
            Ok(state) => Some(state),
            Err(_) => {
                warn!("RtcCycleStore: retained record does not decode");
                None
            }
        }
    }

    fn save(&mut self, state: &CycleState) -> Result<(), StorageError> {
        let mem = self.region.bytes_mut();
        let len = postcard::to_slice(state, &mut mem[HEADER_LEN..])
            .map_err(|_| StorageError::Full)?
            .len();
        let checksum = fnv1a(&mem[HEADER_LEN..HEADER_LEN + len]);
        mem[0..4].copy_from_slice(&MAGIC.to_le_bytes());
        mem[4..6].copy_from_slice(&(len as u16).to_le_bytes());
        mem[6..10].copy_from_slice(&checksum.to_le_bytes());
        debug!("RtcCycleStore: saved {} bytes", len);
        Ok(())
    }

    fn invalidate(&mut self) {
        self.region.bytes_mut()[..HEADER_LEN].fill(0);
        info!("RtcCycleStore: retained state invalidated");
    }
}
