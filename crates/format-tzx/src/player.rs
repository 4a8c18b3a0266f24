//! Tape deck: walks the block list and hands each playable block its start
//! tact.

use crate::error::TzxError;
use crate::pulse::{PlayPhase, PulseBlock};
use crate::tap::TapFile;
use crate::tzx::{TzxBlock, TzxFile};

#[derive(Debug, Clone, Copy)]
struct LoopFrame {
    body_start: usize,
    remaining: u16,
}

/// Plays a list of tape blocks back to back.
///
/// When the active block completes, the next playable block starts at the
/// exact completion tact, so a sample that spans the seam sees the new
/// block's level. Control blocks (groups, loops, text) take no time.
#[derive(Debug, Clone)]
pub struct TapePlayer {
    blocks: Vec<TzxBlock>,
    index: usize,
    current: Option<PulseBlock>,
    loop_stack: Vec<LoopFrame>,
    /// Level of the first pulse of the next playable block, from a $2B block.
    next_level: Option<bool>,
    playing: bool,
    finished: bool,
}

impl TapePlayer {
    #[must_use]
    pub fn new(blocks: Vec<TzxBlock>) -> Self {
        Self {
            blocks,
            index: 0,
            current: None,
            loop_stack: Vec::new(),
            next_level: None,
            playing: false,
            finished: false,
        }
    }

    pub fn from_tzx(data: &[u8]) -> Result<Self, TzxError> {
        Ok(Self::new(TzxFile::parse(data)?.blocks))
    }

    pub fn from_tap(data: &[u8]) -> Result<Self, TzxError> {
        Ok(Self::new(TapFile::parse(data)?.into_blocks()))
    }

    /// Start playback from the first block at `start_tact`.
    pub fn init_play(&mut self, start_tact: u64) {
        self.index = 0;
        self.loop_stack.clear();
        self.next_level = None;
        self.finished = false;
        self.playing = true;
        self.enter_block(start_tact);
    }

    /// EAR level at `tact`. An idle or exhausted tape reads high.
    pub fn get_ear_bit(&mut self, tact: u64) -> bool {
        if !self.playing {
            return true;
        }
        loop {
            let Some(block) = self.current.as_mut() else {
                return true;
            };
            let ear = block.get_ear_bit(tact);
            match block.completion_tact() {
                None => return ear,
                Some(done) => {
                    self.index += 1;
                    self.enter_block(done);
                }
            }
        }
    }

    /// Pause the deck; the EAR line reads high until `init_play`.
    pub fn stop(&mut self) {
        self.playing = false;
    }

    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.playing && !self.finished
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    #[must_use]
    pub fn current_block(&self) -> Option<&PulseBlock> {
        self.current.as_ref()
    }

    pub fn current_block_mut(&mut self) -> Option<&mut PulseBlock> {
        self.current.as_mut()
    }

    /// Index of the active block in [`blocks`](Self::blocks).
    #[must_use]
    pub fn current_index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn blocks(&self) -> &[TzxBlock] {
        &self.blocks
    }

    /// Phase of the active block; `Completed` once the tape has run out.
    #[must_use]
    pub fn phase(&self) -> PlayPhase {
        match &self.current {
            Some(block) => block.play_phase(),
            None if self.finished => PlayPhase::Completed,
            None => PlayPhase::None,
        }
    }

    /// Find the next playable block from `self.index`, running control
    /// blocks on the way, and start it at `start_tact`.
    fn enter_block(&mut self, start_tact: u64) {
        self.current = None;
        while let Some(block) = self.blocks.get(self.index) {
            match block {
                TzxBlock::LoopStart { repetitions } => {
                    log::debug!("Tape loop x{repetitions} at block {}", self.index);
                    self.loop_stack.push(LoopFrame {
                        body_start: self.index + 1,
                        remaining: *repetitions,
                    });
                    self.index += 1;
                }
                TzxBlock::LoopEnd => match self.loop_stack.last_mut() {
                    Some(frame) if frame.remaining > 1 => {
                        frame.remaining -= 1;
                        self.index = frame.body_start;
                    }
                    Some(_) => {
                        self.loop_stack.pop();
                        self.index += 1;
                    }
                    None => self.index += 1,
                },
                TzxBlock::SetSignalLevel { level } => {
                    self.next_level = Some(*level);
                    self.index += 1;
                }
                TzxBlock::StopIf48K | TzxBlock::Pause { duration_ms: 0 } => {
                    log::debug!("Tape stopped by block {} at tact {start_tact}", self.index);
                    self.finished = true;
                    return;
                }
                other => {
                    if let Some(mut pulse) = PulseBlock::from_block(other) {
                        log::debug!(
                            "Tape block {} (${:02X}) starts at tact {start_tact}",
                            self.index,
                            other.id()
                        );
                        let level = self.next_level.take().unwrap_or(true);
                        pulse.init_play_at_level(start_tact, level);
                        self.current = Some(pulse);
                        return;
                    }
                    self.index += 1;
                }
            }
        }
        log::debug!("Tape finished at tact {start_tact}");
        self.finished = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pulse::{PILOT_PL, TACTS_PER_MS};
    use crate::tap::tests::make_tap_record;
    use crate::tzx::tests::{standard_block, tzx_header};

    fn tone(pulse_len: u16, count: u16) -> TzxBlock {
        TzxBlock::PureTone { pulse_len, count }
    }

    #[test]
    fn idle_tape_reads_high() {
        let mut player = TapePlayer::new(vec![tone(100, 2)]);
        assert!(player.get_ear_bit(150));
        assert_eq!(player.phase(), PlayPhase::None);
        assert!(!player.is_playing());
    }

    #[test]
    fn tzx_player_starts_on_first_standard_block() {
        let mut data = tzx_header();
        data.extend_from_slice(&[0x30, 3, b'J', b'S', b'W']);
        data.extend(standard_block(1000, &[0x00, 0x03, 0x41]));
        data.extend(standard_block(0, &[0xFF, 0x01]));

        let mut player = TapePlayer::from_tzx(&data).expect("valid tzx");
        player.init_play(123_456_789);
        assert_eq!(player.current_index(), 1);

        let block = player.current_block_mut().expect("playable block");
        assert_eq!(block.data(), &[0x00, 0x03, 0x41]);
        assert!(block.get_ear_bit(123_456_789 + 50));
        assert!(!block.get_ear_bit(123_456_789 + u64::from(PILOT_PL) + 50));
        assert_eq!(block.play_phase(), PlayPhase::Pilot);
    }

    #[test]
    fn next_block_starts_at_completion_tact() {
        let mut player = TapePlayer::new(vec![tone(100, 3), tone(50, 2)]);
        player.init_play(0);

        assert!(player.get_ear_bit(250));
        // First block ends at 300; the second starts high there.
        assert!(player.get_ear_bit(320));
        assert_eq!(player.current_index(), 1);
        assert!(!player.get_ear_bit(350));
        assert!(player.get_ear_bit(400));
        assert!(player.is_finished());
    }

    #[test]
    fn sample_spanning_several_blocks_lands_in_the_right_one() {
        let mut player = TapePlayer::new(vec![
            tone(100, 1),
            TzxBlock::GroupStart {
                name: "g".to_string(),
            },
            tone(100, 1),
            tone(100, 2),
        ]);
        player.init_play(1000);
        assert!(!player.get_ear_bit(1350));
        assert_eq!(player.current_index(), 3);
    }

    #[test]
    fn loop_repeats_body() {
        let mut player = TapePlayer::new(vec![
            TzxBlock::LoopStart { repetitions: 2 },
            tone(100, 2),
            TzxBlock::LoopEnd,
        ]);
        player.init_play(0);

        assert!(player.get_ear_bit(50));
        assert!(!player.get_ear_bit(150));
        assert!(player.get_ear_bit(250));
        assert!(!player.get_ear_bit(350));
        assert!(!player.is_finished());
        assert!(player.get_ear_bit(400));
        assert!(player.is_finished());
        assert_eq!(player.phase(), PlayPhase::Completed);
    }

    #[test]
    fn stop_if_48k_ends_playback() {
        let mut player = TapePlayer::new(vec![tone(100, 1), TzxBlock::StopIf48K, tone(100, 5)]);
        player.init_play(0);
        assert!(player.get_ear_bit(150));
        assert!(player.is_finished());
        assert!(player.current_block().is_none());
    }

    #[test]
    fn zero_pause_stops_tape() {
        let mut player =
            TapePlayer::new(vec![TzxBlock::Pause { duration_ms: 0 }, tone(100, 2)]);
        player.init_play(0);
        assert!(player.is_finished());
        assert!(player.get_ear_bit(150));
    }

    #[test]
    fn pause_block_holds_high_for_its_duration() {
        let mut player = TapePlayer::new(vec![TzxBlock::Pause { duration_ms: 2 }, tone(100, 2)]);
        player.init_play(0);
        assert!(player.get_ear_bit(2 * TACTS_PER_MS - 1));
        assert_eq!(player.current_index(), 0);
        assert!(!player.get_ear_bit(2 * TACTS_PER_MS + 150));
        assert_eq!(player.current_index(), 1);
    }

    #[test]
    fn tap_records_play_with_one_second_gap() {
        let mut data = make_tap_record(0x00, &[0x03; 17]);
        data.extend(make_tap_record(0xFF, &[1, 2, 3]));

        let mut player = TapePlayer::from_tap(&data).expect("valid tap");
        player.init_play(0);
        let block = player.current_block().expect("first record");
        assert_eq!(block.pause_after(), 1000);
        assert_eq!(block.data_length(), 19);
        assert_eq!(player.blocks().len(), 2);
    }

    #[test]
    fn stop_holds_ear_high() {
        let mut player = TapePlayer::new(vec![tone(100, 4)]);
        player.init_play(0);
        assert!(!player.get_ear_bit(150));
        player.stop();
        assert!(player.get_ear_bit(160));
        assert!(!player.is_playing());
    }

    #[test]
    fn bad_tzx_is_rejected() {
        assert_eq!(
            TapePlayer::from_tzx(b"NotATape!!").map(|_| ()),
            Err(TzxError::BadSignature)
        );
    }

    #[test]
    fn set_signal_level_starts_next_block_low() {
        let mut player = TapePlayer::new(vec![
            TzxBlock::SetSignalLevel { level: false },
            tone(100, 2),
            tone(100, 2),
        ]);
        player.init_play(0);
        assert_eq!(player.current_index(), 1);
        assert!(!player.get_ear_bit(50));
        assert!(player.get_ear_bit(150));
        // Only the block right after the level change is affected.
        assert!(player.get_ear_bit(250));
        assert_eq!(player.current_index(), 2);
        assert!(!player.get_ear_bit(350));
    }
}
