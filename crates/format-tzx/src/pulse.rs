//! Pulse generator shared by every playable block kind.
//!
//! A playable block is described by up to four phases: a pilot tone of
//! equal pulses, a list of sync pulses, the data bits (two equal
//! half-pulses per bit, MSB first) and a trailing pause. The EAR level
//! flips at every pulse edge, starting high unless a set-level block said
//! otherwise; the pause and the completed state sit high. Phases with no
//! pulses are skipped.
//!
//! A sample that lands exactly on a pulse boundary belongs to the next pulse.

use crate::tzx::TzxBlock;

/// Pilot pulse length in T-states.
pub const PILOT_PL: u32 = 2168;
/// Pilot pulses before a header block (flag byte < 0x80).
pub const HEADER_PILOT_COUNT: u32 = 8063;
/// Pilot pulses before a data block.
pub const DATA_PILOT_COUNT: u32 = 3223;
pub const SYNC_1_PL: u16 = 667;
pub const SYNC_2_PL: u16 = 735;
/// Half-pulse length of a 0 bit.
pub const BIT_0_PL: u32 = 855;
/// Half-pulse length of a 1 bit.
pub const BIT_1_PL: u32 = 1710;
/// T-states per millisecond of pause at 3.5 MHz.
pub const TACTS_PER_MS: u64 = 3500;

/// Where a block is in its playback. Phases only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayPhase {
    #[default]
    None,
    Pilot,
    Sync,
    Data,
    Pause,
    Completed,
}

/// A playable block together with its playback cursor.
#[derive(Debug, Clone)]
pub struct PulseBlock {
    pilot_pulse: u32,
    pilot_count: u32,
    sync: Vec<u16>,
    zero_pulse: u32,
    one_pulse: u32,
    data: Vec<u8>,
    used_bits: u8,
    pause_ms: u16,

    phase: PlayPhase,
    /// Index of the current pulse within the phase. In the data phase this
    /// counts half-pulses.
    index: usize,
    /// Tact at which the current pulse started.
    pulse_start: u64,
    level: bool,
    last_tact: u64,
}

impl PulseBlock {
    /// A ROM-timed block: the pilot length depends on the flag byte.
    #[must_use]
    pub fn standard(data: Vec<u8>, pause_ms: u16) -> Self {
        let pilot_count = match data.first() {
            Some(flag) if *flag < 0x80 => HEADER_PILOT_COUNT,
            _ => DATA_PILOT_COUNT,
        };
        Self::with_timing(
            PILOT_PL,
            pilot_count,
            vec![SYNC_1_PL, SYNC_2_PL],
            BIT_0_PL,
            BIT_1_PL,
            data,
            8,
            pause_ms,
        )
    }

    /// A block with explicit pulse lengths. `used_bits` applies to the last
    /// data byte; 0 is treated as 8.
    #[must_use]
    pub fn with_timing(
        pilot_pulse: u32,
        pilot_count: u32,
        sync: Vec<u16>,
        zero_pulse: u32,
        one_pulse: u32,
        data: Vec<u8>,
        used_bits: u8,
        pause_ms: u16,
    ) -> Self {
        Self {
            pilot_pulse,
            pilot_count,
            sync,
            zero_pulse,
            one_pulse,
            data,
            used_bits: if used_bits == 0 || used_bits > 8 { 8 } else { used_bits },
            pause_ms,
            phase: PlayPhase::None,
            index: 0,
            pulse_start: 0,
            level: true,
            last_tact: 0,
        }
    }

    /// The generator for a parsed block, or `None` when the block carries
    /// no signal.
    #[must_use]
    pub fn from_block(block: &TzxBlock) -> Option<Self> {
        let pulse = match block {
            TzxBlock::StandardSpeed { pause_ms, data } => Self::standard(data.clone(), *pause_ms),
            TzxBlock::TurboSpeed {
                pilot_pulse,
                sync1,
                sync2,
                zero_pulse,
                one_pulse,
                pilot_count,
                used_bits,
                pause_ms,
                data,
            } => Self::with_timing(
                u32::from(*pilot_pulse),
                u32::from(*pilot_count),
                vec![*sync1, *sync2],
                u32::from(*zero_pulse),
                u32::from(*one_pulse),
                data.clone(),
                *used_bits,
                *pause_ms,
            ),
            TzxBlock::PureTone { pulse_len, count } => Self::with_timing(
                u32::from(*pulse_len),
                u32::from(*count),
                Vec::new(),
                0,
                0,
                Vec::new(),
                8,
                0,
            ),
            TzxBlock::PulseSequence { pulses } => {
                Self::with_timing(0, 0, pulses.clone(), 0, 0, Vec::new(), 8, 0)
            }
            TzxBlock::PureData {
                zero_pulse,
                one_pulse,
                used_bits,
                pause_ms,
                data,
            } => Self::with_timing(
                0,
                0,
                Vec::new(),
                u32::from(*zero_pulse),
                u32::from(*one_pulse),
                data.clone(),
                *used_bits,
                *pause_ms,
            ),
            TzxBlock::Pause { duration_ms } if *duration_ms > 0 => {
                Self::with_timing(0, 0, Vec::new(), 0, 0, Vec::new(), 8, *duration_ms)
            }
            _ => return None,
        };
        Some(pulse)
    }

    /// Rewind the cursor so that playback starts at `start_tact`.
    pub fn init_play(&mut self, start_tact: u64) {
        self.init_play_at_level(start_tact, true);
    }

    /// Like [`init_play`](Self::init_play), with the first pulse at `level`.
    pub fn init_play_at_level(&mut self, start_tact: u64, level: bool) {
        self.index = 0;
        self.pulse_start = start_tact;
        self.last_tact = start_tact;
        self.level = level;
        self.phase = PlayPhase::Pilot;
        self.skip_empty_phases();
    }

    /// EAR level at `tact`. Tacts must not go backwards between calls.
    pub fn get_ear_bit(&mut self, tact: u64) -> bool {
        if self.phase == PlayPhase::None {
            self.init_play(tact);
        }
        self.last_tact = tact;

        loop {
            match self.phase {
                PlayPhase::None | PlayPhase::Completed => return true,
                PlayPhase::Pause => {
                    let end = self.pulse_start + u64::from(self.pause_ms) * TACTS_PER_MS;
                    if tact < end {
                        return true;
                    }
                    self.pulse_start = end;
                    self.phase = PlayPhase::Completed;
                    self.level = true;
                }
                PlayPhase::Pilot | PlayPhase::Sync | PlayPhase::Data => {
                    let end = self.pulse_start + u64::from(self.pulse_length());
                    if tact < end {
                        return self.level;
                    }
                    self.pulse_start = end;
                    self.level = !self.level;
                    self.index += 1;
                    if self.index >= self.pulse_count() {
                        self.index = 0;
                        self.phase = next_phase(self.phase);
                        self.skip_empty_phases();
                    }
                }
            }
        }
    }

    fn pulse_count(&self) -> usize {
        match self.phase {
            PlayPhase::Pilot => self.pilot_count as usize,
            PlayPhase::Sync => self.sync.len(),
            PlayPhase::Data => self.total_bits() * 2,
            _ => 0,
        }
    }

    fn pulse_length(&self) -> u32 {
        match self.phase {
            PlayPhase::Pilot => self.pilot_pulse,
            PlayPhase::Sync => u32::from(self.sync[self.index]),
            PlayPhase::Data => {
                let bit = self.index / 2;
                let mask = 0x80 >> (bit % 8);
                if self.data[bit / 8] & mask == 0 {
                    self.zero_pulse
                } else {
                    self.one_pulse
                }
            }
            _ => 0,
        }
    }

    fn total_bits(&self) -> usize {
        match self.data.len() {
            0 => 0,
            n => (n - 1) * 8 + self.used_bits as usize,
        }
    }

    /// Move past phases without pulses; the pause is entered high.
    fn skip_empty_phases(&mut self) {
        loop {
            match self.phase {
                PlayPhase::Pilot | PlayPhase::Sync | PlayPhase::Data
                    if self.pulse_count() == 0 =>
                {
                    self.phase = next_phase(self.phase);
                }
                PlayPhase::Pause if self.pause_ms == 0 => self.phase = PlayPhase::Completed,
                PlayPhase::Pause | PlayPhase::Completed => {
                    self.level = true;
                    return;
                }
                _ => return,
            }
        }
    }

    /// The last tact passed to [`get_ear_bit`](Self::get_ear_bit) or
    /// [`init_play`](Self::init_play).
    #[must_use]
    pub fn last_tact(&self) -> u64 {
        self.last_tact
    }

    #[must_use]
    pub fn play_phase(&self) -> PlayPhase {
        self.phase
    }

    /// Tact at which the block finished, once it has.
    #[must_use]
    pub fn completion_tact(&self) -> Option<u64> {
        (self.phase == PlayPhase::Completed).then_some(self.pulse_start)
    }

    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[must_use]
    pub fn data_length(&self) -> usize {
        self.data.len()
    }

    /// Pause after the block, in milliseconds.
    #[must_use]
    pub fn pause_after(&self) -> u16 {
        self.pause_ms
    }

    #[must_use]
    pub fn pilot_count(&self) -> u32 {
        self.pilot_count
    }
}

fn next_phase(phase: PlayPhase) -> PlayPhase {
    match phase {
        PlayPhase::None => PlayPhase::Pilot,
        PlayPhase::Pilot => PlayPhase::Sync,
        PlayPhase::Sync => PlayPhase::Data,
        PlayPhase::Data => PlayPhase::Pause,
        PlayPhase::Pause | PlayPhase::Completed => PlayPhase::Completed,
    }
}
